//! Filter input types for flexible querying
//!
//! A `where` argument is a [`FilterNode`]: a boolean tree whose keys are
//! either `and` / `or` (lists of child nodes) or field names. A field maps to
//! a [`FieldComparison`] (operator -> operand) or, for relations, to a nested
//! [`FilterNode`] on the related type:
//!
//! ```json
//! {
//!   "title": { "iLike": "%dune%" },
//!   "users": { "watched": { "eq": true } },
//!   "or": [ { "type": { "eq": "movie" } }, { "numberOfEpisodes": { "gt": 10 } } ]
//! }
//! ```
//!
//! Operators: `eq, neq, gt, gte, lt, lte, like, notLike, iLike, notILike, in,
//! notIn, is, isNot, between, notBetween`.
//!
//! Key order is kept exactly as supplied. Both containers are ordered lists of
//! pairs rather than hash maps, because tie-break and grouping order depend on it.

use std::fmt;

use serde::de::{self, MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

// ============================================================================
// Operators
// ============================================================================

/// Comparison operator on a single field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operator {
    Eq,
    Neq,
    Gt,
    Gte,
    Lt,
    Lte,
    Like,
    NotLike,
    ILike,
    NotILike,
    In,
    NotIn,
    Is,
    IsNot,
    Between,
    NotBetween,
}

impl Operator {
    pub const ALL: [Operator; 16] = [
        Operator::Eq,
        Operator::Neq,
        Operator::Gt,
        Operator::Gte,
        Operator::Lt,
        Operator::Lte,
        Operator::Like,
        Operator::NotLike,
        Operator::ILike,
        Operator::NotILike,
        Operator::In,
        Operator::NotIn,
        Operator::Is,
        Operator::IsNot,
        Operator::Between,
        Operator::NotBetween,
    ];

    /// Name as it appears in a `where` argument
    pub fn as_str(self) -> &'static str {
        match self {
            Operator::Eq => "eq",
            Operator::Neq => "neq",
            Operator::Gt => "gt",
            Operator::Gte => "gte",
            Operator::Lt => "lt",
            Operator::Lte => "lte",
            Operator::Like => "like",
            Operator::NotLike => "notLike",
            Operator::ILike => "iLike",
            Operator::NotILike => "notILike",
            Operator::In => "in",
            Operator::NotIn => "notIn",
            Operator::Is => "is",
            Operator::IsNot => "isNot",
            Operator::Between => "between",
            Operator::NotBetween => "notBetween",
        }
    }

    pub fn parse(name: &str) -> Option<Operator> {
        Operator::ALL.into_iter().find(|op| op.as_str() == name)
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// Operands
// ============================================================================

/// Right-hand side of a comparison, as supplied by the caller.
///
/// Typing against the field kind happens at compile time, not here.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Operand {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
    List(Vec<Operand>),
    Range {
        lower: Box<Operand>,
        upper: Box<Operand>,
    },
}

impl Operand {
    pub fn range(lower: impl Into<Operand>, upper: impl Into<Operand>) -> Self {
        Operand::Range {
            lower: Box::new(lower.into()),
            upper: Box::new(upper.into()),
        }
    }

    /// Short human-readable type name for error messages
    pub fn type_name(&self) -> &'static str {
        match self {
            Operand::Null => "null",
            Operand::Bool(_) => "boolean",
            Operand::Int(_) | Operand::Float(_) => "number",
            Operand::Text(_) => "string",
            Operand::List(_) => "list",
            Operand::Range { .. } => "range",
        }
    }
}

impl From<&str> for Operand {
    fn from(value: &str) -> Self {
        Operand::Text(value.to_string())
    }
}

impl From<String> for Operand {
    fn from(value: String) -> Self {
        Operand::Text(value)
    }
}

impl From<i64> for Operand {
    fn from(value: i64) -> Self {
        Operand::Int(value)
    }
}

impl From<i32> for Operand {
    fn from(value: i32) -> Self {
        Operand::Int(value as i64)
    }
}

impl From<f64> for Operand {
    fn from(value: f64) -> Self {
        Operand::Float(value)
    }
}

impl From<bool> for Operand {
    fn from(value: bool) -> Self {
        Operand::Bool(value)
    }
}

impl<T: Into<Operand>> From<Vec<T>> for Operand {
    fn from(values: Vec<T>) -> Self {
        Operand::List(values.into_iter().map(Into::into).collect())
    }
}

impl<T: Into<Operand>> From<Option<T>> for Operand {
    fn from(value: Option<T>) -> Self {
        value.map_or(Operand::Null, Into::into)
    }
}

// ============================================================================
// Field comparisons
// ============================================================================

/// Operators applied to one field. Several operators on the same field are
/// OR'ed together ("any of these conditions on this field").
///
/// Operator names are kept as written; unknown names are reported when the
/// filter is compiled against the field's kind.
#[derive(Debug, Clone, Default)]
pub struct FieldComparison {
    entries: Vec<(String, Operand)>,
}

impl FieldComparison {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an operator, replacing an earlier entry with the same name
    pub fn with(mut self, operator: Operator, operand: impl Into<Operand>) -> Self {
        self.insert(operator.as_str().to_string(), operand.into());
        self
    }

    fn insert(&mut self, name: String, operand: Operand) {
        match self.entries.iter_mut().find(|(existing, _)| *existing == name) {
            Some(entry) => entry.1 = operand,
            None => self.entries.push((name, operand)),
        }
    }

    pub fn entries(&self) -> &[(String, Operand)] {
        &self.entries
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    // ========================================================================
    // Helper constructors for programmatic use
    // ========================================================================

    /// Create an equals filter
    pub fn eq(value: impl Into<Operand>) -> Self {
        Self::new().with(Operator::Eq, value)
    }

    /// Create a not-equals filter
    pub fn neq(value: impl Into<Operand>) -> Self {
        Self::new().with(Operator::Neq, value)
    }

    /// Create a greater-than filter
    pub fn gt(value: impl Into<Operand>) -> Self {
        Self::new().with(Operator::Gt, value)
    }

    /// Create a greater-than-or-equal filter
    pub fn gte(value: impl Into<Operand>) -> Self {
        Self::new().with(Operator::Gte, value)
    }

    /// Create a less-than filter
    pub fn lt(value: impl Into<Operand>) -> Self {
        Self::new().with(Operator::Lt, value)
    }

    /// Create a less-than-or-equal filter
    pub fn lte(value: impl Into<Operand>) -> Self {
        Self::new().with(Operator::Lte, value)
    }

    /// Create a LIKE filter (`%` and `_` wildcards)
    pub fn like(pattern: impl Into<String>) -> Self {
        Self::new().with(Operator::Like, pattern.into())
    }

    /// Create a case-insensitive LIKE filter
    pub fn ilike(pattern: impl Into<String>) -> Self {
        Self::new().with(Operator::ILike, pattern.into())
    }

    /// Create an in-list filter
    pub fn in_list<T: Into<Operand>>(values: Vec<T>) -> Self {
        Self::new().with(Operator::In, values)
    }

    /// Create a not-in-list filter
    pub fn not_in<T: Into<Operand>>(values: Vec<T>) -> Self {
        Self::new().with(Operator::NotIn, values)
    }

    /// Create an inclusive range filter
    pub fn between(lower: impl Into<Operand>, upper: impl Into<Operand>) -> Self {
        Self::new().with(Operator::Between, Operand::range(lower, upper))
    }

    /// Create an exclusive-of-range filter
    pub fn not_between(lower: impl Into<Operand>, upper: impl Into<Operand>) -> Self {
        Self::new().with(Operator::NotBetween, Operand::range(lower, upper))
    }

    /// Create an is-null filter
    pub fn is_null() -> Self {
        Self::new().with(Operator::Is, Operand::Null)
    }

    /// Create an is-not-null filter
    pub fn is_not_null() -> Self {
        Self::new().with(Operator::IsNot, Operand::Null)
    }
}

impl Serialize for FieldComparison {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (name, operand) in &self.entries {
            map.serialize_entry(name, operand)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for FieldComparison {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct ComparisonVisitor;

        impl<'de> Visitor<'de> for ComparisonVisitor {
            type Value = FieldComparison;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a map of comparison operators to operands")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<Self::Value, A::Error> {
                let mut comparison = FieldComparison::new();
                while let Some((name, operand)) = map.next_entry::<String, Operand>()? {
                    comparison.insert(name, operand);
                }
                Ok(comparison)
            }
        }

        deserializer.deserialize_map(ComparisonVisitor)
    }
}

// ============================================================================
// Filter tree
// ============================================================================

/// What a field key in a [`FilterNode`] holds.
///
/// Shape decides the variant when deserializing: a map holding `and` / `or`
/// is a nested relation filter, a map of operands is a comparison, and
/// anything else map-shaped is a nested filter. The compiler checks the
/// choice against the entity's relations.
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum FieldCondition {
    Compare(FieldComparison),
    Nested(FilterNode),
}

impl<'de> Deserialize<'de> for FieldCondition {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = serde_json::Value::deserialize(deserializer)?;

        let is_group = value
            .as_object()
            .is_some_and(|map| map.contains_key("and") || map.contains_key("or"));
        if !is_group {
            if let Ok(comparison) = FieldComparison::deserialize(&value) {
                return Ok(FieldCondition::Compare(comparison));
            }
        }

        FilterNode::deserialize(value)
            .map(FieldCondition::Nested)
            .map_err(de::Error::custom)
    }
}

/// Boolean filter tree over one record type
#[derive(Debug, Clone, Default)]
pub struct FilterNode {
    and: Option<Vec<FilterNode>>,
    or: Option<Vec<FilterNode>>,
    fields: Vec<(String, FieldCondition)>,
}

impl FilterNode {
    pub fn new() -> Self {
        Self::default()
    }

    /// `{ and: filters }`
    pub fn all_of(filters: Vec<FilterNode>) -> Self {
        Self::new().and(filters)
    }

    /// `{ or: filters }`
    pub fn any_of(filters: Vec<FilterNode>) -> Self {
        Self::new().or(filters)
    }

    /// Add a comparison on a scalar field
    pub fn field(self, name: impl Into<String>, comparison: FieldComparison) -> Self {
        self.condition(name, FieldCondition::Compare(comparison))
    }

    /// Add a nested filter on a relation
    pub fn relation(self, name: impl Into<String>, filter: FilterNode) -> Self {
        self.condition(name, FieldCondition::Nested(filter))
    }

    pub fn condition(mut self, name: impl Into<String>, condition: FieldCondition) -> Self {
        self.set(name.into(), condition);
        self
    }

    pub fn and(mut self, filters: Vec<FilterNode>) -> Self {
        self.and = Some(filters);
        self
    }

    pub fn or(mut self, filters: Vec<FilterNode>) -> Self {
        self.or = Some(filters);
        self
    }

    /// Children of `and`, if present
    pub fn ands(&self) -> Option<&[FilterNode]> {
        self.and.as_deref()
    }

    /// Children of `or`, if present
    pub fn ors(&self) -> Option<&[FilterNode]> {
        self.or.as_deref()
    }

    /// Field entries in the order they were supplied
    pub fn fields(&self) -> &[(String, FieldCondition)] {
        &self.fields
    }

    pub fn get(&self, name: &str) -> Option<&FieldCondition> {
        self.fields
            .iter()
            .find(|(field, _)| field == name)
            .map(|(_, condition)| condition)
    }

    /// True when the node constrains nothing
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
            && self.and.as_ref().map_or(true, |v| v.is_empty())
            && self.or.as_ref().map_or(true, |v| v.is_empty())
    }

    /// Replace a field entry in place, or append it
    pub(crate) fn set(&mut self, name: String, condition: FieldCondition) {
        match self.fields.iter_mut().find(|(field, _)| *field == name) {
            Some(entry) => entry.1 = condition,
            None => self.fields.push((name, condition)),
        }
    }

    pub(crate) fn get_mut(&mut self, name: &str) -> Option<&mut FieldCondition> {
        self.fields
            .iter_mut()
            .find(|(field, _)| field == name)
            .map(|(_, condition)| condition)
    }

    pub(crate) fn ands_mut(&mut self) -> &mut Vec<FilterNode> {
        self.and.get_or_insert_with(Vec::new)
    }

    pub(crate) fn ors_mut(&mut self) -> &mut Vec<FilterNode> {
        self.or.get_or_insert_with(Vec::new)
    }

    pub(crate) fn into_parts(
        self,
    ) -> (
        Option<Vec<FilterNode>>,
        Option<Vec<FilterNode>>,
        Vec<(String, FieldCondition)>,
    ) {
        (self.and, self.or, self.fields)
    }
}

impl Serialize for FilterNode {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(None)?;
        if let Some(ref and) = self.and {
            map.serialize_entry("and", and)?;
        }
        if let Some(ref or) = self.or {
            map.serialize_entry("or", or)?;
        }
        for (name, condition) in &self.fields {
            map.serialize_entry(name, condition)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for FilterNode {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct FilterVisitor;

        impl<'de> Visitor<'de> for FilterVisitor {
            type Value = FilterNode;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a filter object")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<Self::Value, A::Error> {
                let mut node = FilterNode::new();
                while let Some(key) = map.next_key::<String>()? {
                    match key.as_str() {
                        // `null` is accepted for optional GraphQL list arguments
                        "and" => node.and = map.next_value::<Option<Vec<FilterNode>>>()?,
                        "or" => node.or = map.next_value::<Option<Vec<FilterNode>>>()?,
                        _ => {
                            let condition = map.next_value::<FieldCondition>()?;
                            node.set(key, condition);
                        }
                    }
                }
                Ok(node)
            }
        }

        deserializer.deserialize_map(FilterVisitor)
    }
}
