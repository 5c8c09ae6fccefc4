//! Tag normalization for allergens and season months.
//!
//! Tags reach the system in several shapes: a list, a comma-separated string, or
//! a JSON-encoded list inside a string. They are normalized once, at ingestion,
//! into a [`TagSet`]; costing and nutrition code never sees the raw shapes.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::BTreeSet;
use std::fmt;

/// Ordered, de-duplicated set of trimmed lower-case tags.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TagSet(BTreeSet<String>);

impl TagSet {
    /// Creates an empty set.
    #[must_use]
    pub const fn new() -> Self {
        Self(BTreeSet::new())
    }

    /// Builds a set from any iterator of raw tags, normalizing each one.
    pub fn from_tags<I, S>(tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self(tags.into_iter().filter_map(|t| normalize_tag(t.as_ref())).collect())
    }

    /// Parses free-form text: a JSON list (`["milk","egg"]`) or a comma-separated
    /// string (`"milk, egg"`). Blank input yields an empty set.
    #[must_use]
    pub fn parse(raw: &str) -> Self {
        let trimmed = raw.trim();
        if trimmed.starts_with('[') {
            if let Ok(list) = serde_json::from_str::<Vec<String>>(trimmed) {
                return Self::from_tags(list);
            }
            tracing::debug!("Tag text looked like JSON but did not parse: {trimmed}");
        }
        Self::from_tags(
            trimmed
                .trim_start_matches('[')
                .trim_end_matches(']')
                .split(',')
                .map(|t| t.trim().trim_matches('"')),
        )
    }

    /// Decodes the canonical storage form. Anything unexpected is parsed leniently.
    #[must_use]
    pub fn from_storage(stored: &str) -> Self {
        Self::parse(stored)
    }

    /// Canonical storage form: a compact JSON list.
    #[must_use]
    pub fn to_storage(&self) -> String {
        // Serializing a set of strings cannot fail.
        serde_json::to_string(&self.0).unwrap_or_else(|_| String::from("[]"))
    }

    /// True when `tag` (normalized) is present.
    #[must_use]
    pub fn contains(&self, tag: &str) -> bool {
        normalize_tag(tag).is_some_and(|t| self.0.contains(&t))
    }

    /// Adds every tag of `other`.
    pub fn extend(&mut self, other: &Self) {
        self.0.extend(other.0.iter().cloned());
    }

    /// Iterates tags in order.
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }

    /// Number of tags.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// True when there are no tags.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

fn normalize_tag(raw: &str) -> Option<String> {
    let tag = raw.trim().to_lowercase();
    (!tag.is_empty()).then_some(tag)
}

impl fmt::Display for TagSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let tags: Vec<&str> = self.iter().collect();
        f.write_str(&tags.join(", "))
    }
}

impl Serialize for TagSet {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_seq(self.0.iter())
    }
}

/// Shapes accepted at the ingestion boundary.
#[derive(Deserialize)]
#[serde(untagged)]
enum RawTags {
    List(Vec<String>),
    Text(String),
}

impl<'de> Deserialize<'de> for TagSet {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Ok(match RawTags::deserialize(deserializer)? {
            RawTags::List(list) => Self::from_tags(list),
            RawTags::Text(text) => Self::parse(&text),
        })
    }
}

/// Month tags in calendar order, as used in `season`.
pub const MONTHS: [&str; 12] = [
    "jan", "feb", "mar", "apr", "may", "jun", "jul", "aug", "sep", "oct", "nov", "dec",
];

/// Month tag for a 1-based month number.
#[must_use]
pub fn month_tag(month: u32) -> Option<&'static str> {
    let index = usize::try_from(month.checked_sub(1)?).ok()?;
    MONTHS.get(index).copied()
}
