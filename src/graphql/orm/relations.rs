//! Relation metadata and join discovery
//!
//! [`MetadataProvider`] tells the query layer which relations a type has and
//! where its rows live. [`RelationResolver`] walks a filter or sort and
//! returns the minimal [`RelationMap`] that has to be joined.

use std::collections::{BTreeMap, HashMap};

use crate::graphql::filters::{FieldCondition, FilterNode};
use crate::graphql::sorting::{SortEntry, SortSpec};

/// A to-one or to-many association from one record type to another.
///
/// Joined as `related.foreign_column = parent.local_column`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Relation {
    pub property_name: String,
    pub related_type: String,
    pub local_column: String,
    pub foreign_column: String,
}

impl Relation {
    pub fn new(
        property_name: impl Into<String>,
        related_type: impl Into<String>,
        local_column: impl Into<String>,
        foreign_column: impl Into<String>,
    ) -> Self {
        Self {
            property_name: property_name.into(),
            related_type: related_type.into(),
            local_column: local_column.into(),
            foreign_column: foreign_column.into(),
        }
    }
}

/// Source of relation and table metadata for record types
pub trait MetadataProvider: Send + Sync {
    /// Declared relations of `type_name`; empty for unknown types
    fn relations_of(&self, type_name: &str) -> &[Relation];

    /// Backing table of `type_name`
    fn table_of(&self, type_name: &str) -> Option<&str>;

    fn relation(&self, type_name: &str, property: &str) -> Option<&Relation> {
        self.relations_of(type_name)
            .iter()
            .find(|r| r.property_name == property)
    }
}

/// Table and relations of one record type
#[derive(Debug, Clone)]
pub struct EntityDef {
    pub type_name: String,
    pub table: String,
    pub relations: Vec<Relation>,
}

impl EntityDef {
    pub fn new(type_name: impl Into<String>, table: impl Into<String>) -> Self {
        Self {
            type_name: type_name.into(),
            table: table.into(),
            relations: Vec::new(),
        }
    }

    pub fn relation(mut self, relation: Relation) -> Self {
        self.relations.push(relation);
        self
    }
}

/// Statically declared [`MetadataProvider`]
#[derive(Debug, Clone, Default)]
pub struct EntityCatalog {
    entities: HashMap<String, EntityDef>,
}

impl EntityCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entity(mut self, def: EntityDef) -> Self {
        self.entities.insert(def.type_name.clone(), def);
        self
    }
}

impl MetadataProvider for EntityCatalog {
    fn relations_of(&self, type_name: &str) -> &[Relation] {
        self.entities
            .get(type_name)
            .map(|def| def.relations.as_slice())
            .unwrap_or(&[])
    }

    fn table_of(&self, type_name: &str) -> Option<&str> {
        self.entities.get(type_name).map(|def| def.table.as_str())
    }
}

/// Alias a joined relation is addressed by, e.g. `users` or `users_user`
pub fn join_alias(parent: Option<&str>, relation: &str) -> String {
    match parent {
        Some(parent) => format!("{}_{}", parent, relation),
        None => relation.to_string(),
    }
}

/// Tree of relations to join, keyed by relation property name
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RelationMap(BTreeMap<String, RelationMap>);

impl RelationMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Union `other` into `self`. Idempotent and order-independent.
    pub fn merge(&mut self, other: RelationMap) {
        for (name, child) in other.0 {
            self.0.entry(name).or_default().merge(child);
        }
    }

    pub fn insert(&mut self, name: impl Into<String>, child: RelationMap) {
        self.0.entry(name.into()).or_default().merge(child);
    }

    pub fn get(&self, name: &str) -> Option<&RelationMap> {
        self.0.get(name)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &RelationMap)> {
        self.0.iter()
    }

    /// Number of joins the map describes, nested ones included
    pub fn join_count(&self) -> usize {
        self.0.values().map(|child| 1 + child.join_count()).sum()
    }
}

/// Collects the relations a filter or sort touches
pub struct RelationResolver<'a> {
    metadata: &'a dyn MetadataProvider,
}

impl<'a> RelationResolver<'a> {
    pub fn new(metadata: &'a dyn MetadataProvider) -> Self {
        Self { metadata }
    }

    /// Relations referenced by `filter`, recursing through `and` / `or`
    pub fn resolve_filter(&self, type_name: &str, filter: &FilterNode) -> RelationMap {
        let mut map = RelationMap::new();

        for child in filter.ands().into_iter().flatten() {
            map.merge(self.resolve_filter(type_name, child));
        }
        for child in filter.ors().into_iter().flatten() {
            map.merge(self.resolve_filter(type_name, child));
        }

        for (name, condition) in filter.fields() {
            let Some(relation) = self.metadata.relation(type_name, name) else {
                continue;
            };
            let nested = match condition {
                FieldCondition::Nested(inner) => self.resolve_filter(&relation.related_type, inner),
                FieldCondition::Compare(_) => RelationMap::new(),
            };
            map.insert(name.clone(), nested);
        }

        map
    }

    /// Relations referenced by `sort`
    pub fn resolve_sort(&self, type_name: &str, sort: &SortSpec) -> RelationMap {
        let mut map = RelationMap::new();

        for (name, entry) in sort.entries() {
            let Some(relation) = self.metadata.relation(type_name, name) else {
                continue;
            };
            let nested = match entry {
                SortEntry::Nested(inner) => self.resolve_sort(&relation.related_type, inner),
                SortEntry::Field(_) => RelationMap::new(),
            };
            map.insert(name.clone(), nested);
        }

        map
    }

    /// Union of both, so a relation used by filter and sort is joined once
    pub fn resolve_all(
        &self,
        type_name: &str,
        filter: Option<&FilterNode>,
        sort: Option<&SortSpec>,
    ) -> RelationMap {
        let mut map = RelationMap::new();
        if let Some(filter) = filter {
            map.merge(self.resolve_filter(type_name, filter));
        }
        if let Some(sort) = sort {
            map.merge(self.resolve_sort(type_name, sort));
        }
        map
    }
}
