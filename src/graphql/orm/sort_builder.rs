//! Sort spec compiler

use super::comparison::qualify;
use super::error::{QueryError, QueryResult};
use super::registry::FieldRegistry;
use super::relations::{MetadataProvider, RelationMap, join_alias};
use crate::graphql::sorting::{SortDirection, SortEntry, SortNulls, SortSpec};

/// One compiled ORDER BY term
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderTerm {
    /// Quoted, alias-qualified column
    pub column: String,
    pub direction: SortDirection,
    pub nulls: Option<SortNulls>,
}

pub struct SortBuilder<'a> {
    registry: &'a FieldRegistry,
    metadata: &'a dyn MetadataProvider,
}

impl<'a> SortBuilder<'a> {
    pub fn new(registry: &'a FieldRegistry, metadata: &'a dyn MetadataProvider) -> Self {
        Self { registry, metadata }
    }

    /// Order terms for `sort`, in the caller's key order
    pub fn build(
        &self,
        type_name: &str,
        sort: &SortSpec,
        relations: &RelationMap,
        alias: Option<&str>,
    ) -> QueryResult<Vec<OrderTerm>> {
        let mut terms = Vec::new();
        self.collect(type_name, sort, relations, alias, None, &mut terms)?;
        Ok(terms)
    }

    fn collect(
        &self,
        type_name: &str,
        sort: &SortSpec,
        relations: &RelationMap,
        alias: Option<&str>,
        join_prefix: Option<&str>,
        terms: &mut Vec<OrderTerm>,
    ) -> QueryResult<()> {
        if sort.is_empty() {
            return Ok(());
        }
        let descriptors = self.registry.get_fields(type_name)?;

        for (name, entry) in sort.entries() {
            match entry {
                SortEntry::Nested(inner) => {
                    let relation = self.metadata.relation(type_name, name).ok_or_else(|| {
                        QueryError::invalid_filter(name, format!("`{}` has no relation `{}`", type_name, name))
                    })?;
                    let joined = relations.get(name).ok_or_else(|| {
                        QueryError::invalid_filter(name, "relation is not joined for this query")
                    })?;
                    let child = join_alias(join_prefix, name);
                    self.collect(
                        &relation.related_type,
                        inner,
                        joined,
                        Some(&child),
                        Some(&child),
                        terms,
                    )?;
                }
                SortEntry::Field(field) => {
                    let descriptor = descriptors
                        .iter()
                        .find(|d| &d.field == name)
                        .ok_or_else(|| {
                            QueryError::invalid_filter(
                                name,
                                format!("`{}` has no sortable field `{}`", type_name, name),
                            )
                        })?;
                    if !descriptor.sortable {
                        return Err(QueryError::invalid_filter(name, "field is not sortable"));
                    }
                    terms.push(OrderTerm {
                        column: qualify(alias, &descriptor.column),
                        direction: field.direction,
                        nulls: field.nulls,
                    });
                }
            }
        }
        Ok(())
    }
}
