//! Width-range identifiers
//!
//! Parsing, canonical formatting, and effective-bound computation for
//! range identifiers like `>=500`, `<720`, or `500..<720`.

use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Boundary inclusivity pair
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Inclusivity {
    pub min: bool,
    pub max: bool,
}

impl Inclusivity {
    pub const BOTH: Self = Self { min: true, max: true };

    pub fn both(&self) -> bool {
        self.min && self.max
    }

    pub fn neither(&self) -> bool {
        !self.min && !self.max
    }

    /// Canonical value of this pair
    pub fn value(&self) -> Inclusive {
        match (self.min, self.max) {
            (true, true) => Inclusive::Both,
            (true, false) => Inclusive::Min,
            (false, true) => Inclusive::Max,
            (false, false) => Inclusive::Neither,
        }
    }
}

impl Default for Inclusivity {
    fn default() -> Self {
        Self::BOTH
    }
}

/// Canonical inclusivity value, serialized as `true`, `false`, `"min"`,
/// or `"max"`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Inclusive {
    #[default]
    Both,
    Neither,
    Min,
    Max,
}

impl From<Inclusive> for Inclusivity {
    fn from(value: Inclusive) -> Self {
        match value {
            Inclusive::Both => Self { min: true, max: true },
            Inclusive::Neither => Self { min: false, max: false },
            Inclusive::Min => Self { min: true, max: false },
            Inclusive::Max => Self { min: false, max: true },
        }
    }
}

impl Serialize for Inclusive {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Inclusive::Both => serializer.serialize_bool(true),
            Inclusive::Neither => serializer.serialize_bool(false),
            Inclusive::Min => serializer.serialize_str("min"),
            Inclusive::Max => serializer.serialize_str("max"),
        }
    }
}

impl<'de> Deserialize<'de> for Inclusive {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Repr {
            Flag(bool),
            Side(String),
        }

        match Repr::deserialize(deserializer)? {
            Repr::Flag(true) => Ok(Inclusive::Both),
            Repr::Flag(false) => Ok(Inclusive::Neither),
            Repr::Side(side) => match side.as_str() {
                "min" => Ok(Inclusive::Min),
                "max" => Ok(Inclusive::Max),
                other => Err(D::Error::custom(format!("unknown inclusivity `{other}`"))),
            },
        }
    }
}

/// A parsed width range: optional bounds plus their inclusivity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RangeSpec {
    pub min: Option<u32>,
    pub max: Option<u32>,
    pub inclusivity: Inclusivity,
}

impl RangeSpec {
    /// Canonical identifier for this range, `None` when both bounds are
    /// absent
    pub fn identifier(&self) -> Option<String> {
        match (self.min, self.max) {
            (Some(min), Some(max)) => Some(format!("{min}{}{max}", self.interior())),
            (Some(min), None) => {
                Some(format!("{}{min}", if self.inclusivity.min { ">=" } else { ">" }))
            }
            (None, Some(max)) => {
                Some(format!("{}{max}", if self.inclusivity.max { "<=" } else { "<" }))
            }
            (None, None) => None,
        }
    }

    fn interior(&self) -> String {
        format!(
            "{}{}{}",
            if self.inclusivity.min { "." } else { ">" },
            if self.inclusivity.neither() { ".." } else { "." },
            if self.inclusivity.max { "." } else { "<" },
        )
    }

    /// Integer-adjusted bounds: an exclusive bound moves inward by one,
    /// so predicates reduce to plain `>=`/`<=` comparisons
    pub fn effective(&self) -> EffectiveRange {
        EffectiveRange {
            min: self
                .min
                .map(|m| if self.inclusivity.min { m as i64 } else { m as i64 + 1 }),
            max: self
                .max
                .map(|m| if self.inclusivity.max { m as i64 } else { m as i64 - 1 }),
        }
    }
}

/// Adjusted bounds; an absent side is unconstrained
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EffectiveRange {
    pub min: Option<i64>,
    pub max: Option<i64>,
}

impl EffectiveRange {
    pub fn contains(&self, width: u32) -> bool {
        let width = width as i64;
        width >= self.min.unwrap_or(0) && width <= self.max.unwrap_or(i64::MAX)
    }
}

/// Parse a range identifier
///
/// Never fails: unrecognized input simply leaves both bounds absent. A
/// digit run with a unit suffix (`500px`) is read by value. When only one
/// bound is present the missing side mirrors its inclusivity.
pub fn parse_range(identifier: &str) -> RangeSpec {
    let mut inclusivity = Inclusivity::BOTH;

    let (max, rest) = extract_max(identifier);
    if let Some((_, inclusive)) = max {
        inclusivity.max = inclusive;
    }
    let min = extract_min(&rest);
    if let Some((_, inclusive)) = min {
        inclusivity.min = inclusive;
    }

    if max.is_none() {
        inclusivity.max = inclusivity.min;
    }
    if min.is_none() {
        inclusivity.min = inclusivity.max;
    }

    RangeSpec {
        min: min.and_then(|(value, _)| value),
        max: max.and_then(|(value, _)| value),
        inclusivity,
    }
}

/// Extract the maximum-bound token: the first `<`, `<=`, `.`, or `.=`
/// marker followed by digits. Returns the bound (value, inclusive) and
/// the identifier with the token removed.
fn extract_max(s: &str) -> (Option<(Option<u32>, bool)>, String) {
    let bytes = s.as_bytes();
    for start in 0..bytes.len() {
        let marker = bytes[start];
        if marker != b'<' && marker != b'.' {
            continue;
        }
        let mut cursor = start + 1;
        let mut condition_len = 1;
        if cursor < bytes.len() && bytes[cursor] == b'=' {
            cursor += 1;
            condition_len = 2;
        }
        let digits_start = cursor;
        while cursor < bytes.len() && bytes[cursor].is_ascii_digit() {
            cursor += 1;
        }
        if cursor == digits_start {
            continue;
        }

        // `<` alone is exclusive; `<=` and the dot forms are inclusive.
        let inclusive = marker == b'.' || condition_len == 2;
        let value = s[digits_start..cursor].parse::<u32>().ok();
        let rest = format!("{}{}", &s[..start], &s[cursor..]);
        return (Some((value, inclusive)), rest);
    }
    (None, s.to_string())
}

/// Extract the minimum-bound token: an optional `>`/`>=`/`=` marker,
/// digits, any unit characters, then an optional trailing `>`.
fn extract_min(s: &str) -> Option<(Option<u32>, bool)> {
    let bytes = s.as_bytes();
    for start in 0..bytes.len() {
        // Longest leading marker for which a digit follows.
        let candidates: [&[u8]; 4] = [b">=", b">", b"=", b""];
        let mut found: Option<(usize, &[u8])> = None;
        for marker in candidates {
            let digits_start = start + marker.len();
            if bytes[start..].starts_with(marker)
                && digits_start < bytes.len()
                && bytes[digits_start].is_ascii_digit()
            {
                found = Some((digits_start, marker));
                break;
            }
        }
        let Some((digits_start, marker)) = found else {
            continue;
        };

        let mut cursor = digits_start;
        while cursor < bytes.len() && bytes[cursor].is_ascii_digit() {
            cursor += 1;
        }
        let value = s[digits_start..cursor].parse::<u32>().ok();

        // Skip unit characters, then look for a trailing exclusivity
        // marker.
        while cursor < bytes.len() && bytes[cursor] != b'.' && bytes[cursor] != b'>' {
            cursor += 1;
        }
        let trailing = cursor < bytes.len() && bytes[cursor] == b'>';

        let inclusive = marker == b">=" || (marker.is_empty() && !trailing);
        return Some((value, inclusive));
    }
    None
}
