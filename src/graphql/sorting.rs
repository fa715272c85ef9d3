//! Sort input types
//!
//! An `order` argument maps field names to a direction, or relation names to
//! a nested sort on the related type:
//!
//! ```json
//! { "releaseDate": { "direction": "DESC", "nulls": "NULLS_LAST" },
//!   "users": { "watched": { "direction": "ASC" } } }
//! ```
//!
//! Entry order is significant: earlier keys sort first.

use std::fmt;

use async_graphql::Enum;
use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Sort direction
#[derive(Enum, Copy, Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum SortDirection {
    #[default]
    Asc,
    Desc,
}

impl SortDirection {
    pub fn to_sql(self) -> &'static str {
        match self {
            SortDirection::Asc => "ASC",
            SortDirection::Desc => "DESC",
        }
    }
}

/// Explicit placement of NULLs
#[derive(Enum, Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SortNulls {
    NullsFirst,
    NullsLast,
}

impl SortNulls {
    pub fn to_sql(self) -> &'static str {
        match self {
            SortNulls::NullsFirst => "NULLS FIRST",
            SortNulls::NullsLast => "NULLS LAST",
        }
    }
}

/// Ordering of a single scalar field
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SortField {
    #[serde(default)]
    pub direction: SortDirection,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nulls: Option<SortNulls>,
}

impl SortField {
    pub fn asc() -> Self {
        Self::default()
    }

    pub fn desc() -> Self {
        Self {
            direction: SortDirection::Desc,
            nulls: None,
        }
    }

    pub fn nulls(mut self, nulls: SortNulls) -> Self {
        self.nulls = Some(nulls);
        self
    }
}

/// One key of a [`SortSpec`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SortEntry {
    Field(SortField),
    Nested(SortSpec),
}

/// Ordered sort specification over one record type
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SortSpec {
    entries: Vec<(String, SortEntry)>,
}

impl SortSpec {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn asc(self, field: impl Into<String>) -> Self {
        self.by(field, SortField::asc())
    }

    pub fn desc(self, field: impl Into<String>) -> Self {
        self.by(field, SortField::desc())
    }

    pub fn by(self, field: impl Into<String>, sort: SortField) -> Self {
        self.entry(field, SortEntry::Field(sort))
    }

    /// Sort by fields of a related record
    pub fn relation(self, name: impl Into<String>, nested: SortSpec) -> Self {
        self.entry(name, SortEntry::Nested(nested))
    }

    pub fn entry(mut self, name: impl Into<String>, entry: SortEntry) -> Self {
        self.set(name.into(), entry);
        self
    }

    pub fn entries(&self) -> &[(String, SortEntry)] {
        &self.entries
    }

    pub fn get(&self, name: &str) -> Option<&SortEntry> {
        self.entries
            .iter()
            .find(|(field, _)| field == name)
            .map(|(_, entry)| entry)
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub(crate) fn set(&mut self, name: String, entry: SortEntry) {
        match self.entries.iter_mut().find(|(field, _)| *field == name) {
            Some(existing) => existing.1 = entry,
            None => self.entries.push((name, entry)),
        }
    }

    pub(crate) fn get_mut(&mut self, name: &str) -> Option<&mut SortEntry> {
        self.entries
            .iter_mut()
            .find(|(field, _)| field == name)
            .map(|(_, entry)| entry)
    }

    pub(crate) fn into_entries(self) -> Vec<(String, SortEntry)> {
        self.entries
    }
}

impl Serialize for SortSpec {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (name, entry) in &self.entries {
            map.serialize_entry(name, entry)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for SortSpec {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct SortVisitor;

        impl<'de> Visitor<'de> for SortVisitor {
            type Value = SortSpec;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a map of field names to sort directions")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<Self::Value, A::Error> {
                let mut spec = SortSpec::new();
                while let Some((name, entry)) = map.next_entry::<String, SortEntry>()? {
                    spec.set(name, entry);
                }
                Ok(spec)
            }
        }

        deserializer.deserialize_map(SortVisitor)
    }
}
