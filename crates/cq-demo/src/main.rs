//! containerq demo - Main Entry Point
//!
//! Builds a small document, attaches container queries, then simulates a
//! resize sequence and prints the derived matching-state annotations.

use std::error::Error;

use cq_dom::Document;
use cq_engine::{
    Attachment, Engine, MATCHES_ATTRIBUTE, Options, QUERIES_ATTRIBUTE, QuerySpec, Target,
    container_query,
};

fn main() -> Result<(), Box<dyn Error>> {
    // Initialize logging
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    log::info!("Starting containerq demo...");

    // Extra query specs from a JSON file when given on the command line
    let specs: Vec<QuerySpec> = match std::env::args().nth(1) {
        Some(path) => serde_json::from_str(&std::fs::read_to_string(path)?)?,
        None => vec![QuerySpec {
            identifier: Some("wide".into()),
            min: Some(600),
            ..Default::default()
        }],
    };

    let mut doc = Document::new();
    let container = doc.create_element("div");
    let card = doc.create_element("section");
    let sidebar = doc.create_element("aside");
    doc.append_child(doc.root(), container)?;
    doc.append_child(container, card)?;
    doc.append_child(container, sidebar)?;
    doc.set_attribute(card, "class", "card")?;
    doc.set_attribute(sidebar, "class", "card")?;
    doc.set_attribute(
        card,
        QUERIES_ATTRIBUTE,
        "phone: <480, tablet: 480..<1024, desktop: >=1024",
    )?;

    let mut engine = Engine::new();
    let attachment = container_query(
        &mut engine,
        &mut doc,
        Target::Selector(".card"),
        &specs,
        &Options::default(),
    )?;
    if let Attachment::Many(multi) = &attachment {
        log::info!("attached container queries to {} node(s)", multi.ids().len());
    }

    // The repeated 480 produces no event: widths only dispatch on real
    // change.
    for width in [320, 480, 480, 768, 1024, 280] {
        doc.set_content_width(container, width);
        engine.pump(&mut doc)?;
        log::info!(
            "container {:>4}px -> card [{}], sidebar [{}]",
            width,
            doc.attribute(card, MATCHES_ATTRIBUTE).unwrap_or(""),
            doc.attribute(sidebar, MATCHES_ATTRIBUTE).unwrap_or(""),
        );
    }

    Ok(())
}
