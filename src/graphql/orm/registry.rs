//! Per-type field registry
//!
//! Declares which fields of a record type can be filtered and sorted, the
//! scalar kind each field compares as, and which operators are allowed.
//! Built once at startup and shared read-only.

use std::collections::HashMap;

use once_cell::sync::Lazy;

use super::error::{QueryError, QueryResult};
use crate::graphql::filters::Operator;

/// Scalar kind a field compares as
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FieldKind {
    String,
    Number,
    Boolean,
    Date,
    Enum,
}

impl FieldKind {
    pub fn as_str(self) -> &'static str {
        match self {
            FieldKind::String => "string",
            FieldKind::Number => "number",
            FieldKind::Boolean => "boolean",
            FieldKind::Date => "date",
            FieldKind::Enum => "enum",
        }
    }

    /// Operators legal for this kind
    pub fn operators(self) -> &'static [Operator] {
        OPERATORS_BY_KIND.get(&self).copied().unwrap_or(&[])
    }
}

static OPERATORS_BY_KIND: Lazy<HashMap<FieldKind, &'static [Operator]>> = Lazy::new(|| {
    use Operator::*;

    let mut map: HashMap<FieldKind, &'static [Operator]> = HashMap::new();
    map.insert(
        FieldKind::String,
        &[
            Eq, Neq, Gt, Gte, Lt, Lte, Like, NotLike, ILike, NotILike, In, NotIn, Is, IsNot,
        ],
    );
    map.insert(
        FieldKind::Number,
        &[
            Eq, Neq, Gt, Gte, Lt, Lte, In, NotIn, Between, NotBetween, Is, IsNot,
        ],
    );
    map.insert(
        FieldKind::Date,
        &[
            Eq, Neq, Gt, Gte, Lt, Lte, In, NotIn, Between, NotBetween, Is, IsNot,
        ],
    );
    map.insert(FieldKind::Boolean, &[Eq, Neq, Is, IsNot]);
    map.insert(FieldKind::Enum, &[Eq, Neq, In, NotIn, Is, IsNot]);
    map
});

/// One filterable field of a record type
#[derive(Debug, Clone, PartialEq)]
pub struct FieldDescriptor {
    /// Name used in `where` / `order` arguments
    pub field: String,
    /// Backing column
    pub column: String,
    pub kind: FieldKind,
    /// Restricts the kind's operator set when present
    pub allowed_ops: Option<Vec<Operator>>,
    /// Legal values for enum fields; empty means unchecked
    pub enum_values: Vec<String>,
    pub sortable: bool,
    /// Must appear in every top-level `where`
    pub required: bool,
}

impl FieldDescriptor {
    /// Field whose column has the same name
    pub fn new(field: impl Into<String>, kind: FieldKind) -> Self {
        let field = field.into();
        Self {
            column: field.clone(),
            field,
            kind,
            allowed_ops: None,
            enum_values: Vec::new(),
            sortable: true,
            required: false,
        }
    }

    pub fn column(mut self, column: impl Into<String>) -> Self {
        self.column = column.into();
        self
    }

    pub fn allow(mut self, ops: &[Operator]) -> Self {
        self.allowed_ops = Some(ops.to_vec());
        self
    }

    pub fn values<I, S>(mut self, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.enum_values = values.into_iter().map(Into::into).collect();
        self
    }

    /// Filter-only field
    pub fn unsortable(mut self) -> Self {
        self.sortable = false;
        self
    }

    /// Filter must always constrain this field
    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    /// Whether `op` may be applied to this field
    pub fn permits(&self, op: Operator) -> bool {
        self.kind.operators().contains(&op)
            && self
                .allowed_ops
                .as_ref()
                .map_or(true, |allowed| allowed.contains(&op))
    }
}

/// Field metadata for every registered record type
#[derive(Debug, Clone, Default)]
pub struct FieldRegistry {
    fields: HashMap<String, Vec<FieldDescriptor>>,
    parents: HashMap<String, String>,
}

impl FieldRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a field whose column matches its name
    pub fn register(
        &mut self,
        type_name: &str,
        field: &str,
        kind: FieldKind,
        allowed_ops: Option<&[Operator]>,
    ) -> &mut Self {
        let mut descriptor = FieldDescriptor::new(field, kind);
        if let Some(ops) = allowed_ops {
            descriptor = descriptor.allow(ops);
        }
        self.register_field(type_name, descriptor)
    }

    /// Register a fully described field. Re-registering a name replaces it.
    pub fn register_field(&mut self, type_name: &str, descriptor: FieldDescriptor) -> &mut Self {
        let fields = self.fields.entry(type_name.to_string()).or_default();
        match fields.iter_mut().find(|d| d.field == descriptor.field) {
            Some(existing) => *existing = descriptor,
            None => fields.push(descriptor),
        }
        self
    }

    /// Declare `child` a subtype of `parent`; the child inherits its fields
    pub fn extends(&mut self, child: &str, parent: &str) -> &mut Self {
        self.parents.insert(child.to_string(), parent.to_string());
        self
    }

    /// All fields of `type_name`, inherited ones included.
    ///
    /// Inherited fields keep the parent's order. A child entry replaces a
    /// same-named parent entry in place; new child fields are appended.
    pub fn get_fields(&self, type_name: &str) -> QueryResult<Vec<FieldDescriptor>> {
        let merged = self.merged_fields(type_name);
        if merged.is_empty() {
            return Err(QueryError::Schema(type_name.to_string()));
        }
        Ok(merged)
    }

    /// Names of the fields a top-level filter on `type_name` must contain
    pub fn required_fields(&self, type_name: &str) -> Vec<String> {
        self.merged_fields(type_name)
            .into_iter()
            .filter(|d| d.required)
            .map(|d| d.field)
            .collect()
    }

    fn merged_fields(&self, type_name: &str) -> Vec<FieldDescriptor> {
        let mut chain = vec![type_name];
        let mut current = type_name;
        while let Some(parent) = self.parents.get(current) {
            if chain.contains(&parent.as_str()) {
                break;
            }
            chain.push(parent);
            current = parent;
        }

        let mut merged: Vec<FieldDescriptor> = Vec::new();
        for ty in chain.into_iter().rev() {
            for descriptor in self.fields.get(ty).into_iter().flatten() {
                match merged.iter_mut().find(|d| d.field == descriptor.field) {
                    Some(existing) => *existing = descriptor.clone(),
                    None => merged.push(descriptor.clone()),
                }
            }
        }

        merged
    }
}
