//! Filter tree compiler
//!
//! Compiles a [`FilterNode`] into one bracketed [`Predicate`]:
//!
//! - direct field comparisons at a node are AND'ed
//! - several operators on the same field are OR'ed inside that field's group
//! - a relation key is compiled against the related type under its join alias
//! - `and` children form one AND group, `or` children one OR group
//! - an empty node matches everything

use tracing::warn;

use super::comparison::ComparisonCompiler;
use super::error::{QueryError, QueryResult};
use super::predicate::Predicate;
use super::registry::{FieldDescriptor, FieldRegistry};
use super::relations::{MetadataProvider, RelationMap, join_alias};
use crate::graphql::filters::{FieldComparison, FieldCondition, FilterNode};

pub struct WhereBuilder<'a> {
    registry: &'a FieldRegistry,
    metadata: &'a dyn MetadataProvider,
}

impl<'a> WhereBuilder<'a> {
    pub fn new(registry: &'a FieldRegistry, metadata: &'a dyn MetadataProvider) -> Self {
        Self { registry, metadata }
    }

    /// Compile `filter` on `type_name`, whose columns are addressed through `alias`.
    ///
    /// `relations` must contain every relation the filter references, as
    /// returned by [`RelationResolver`](super::relations::RelationResolver).
    /// Fields registered as required must be keys of the top-level node.
    pub fn build(
        &self,
        type_name: &str,
        filter: &FilterNode,
        relations: &RelationMap,
        alias: Option<&str>,
    ) -> QueryResult<Predicate> {
        for field in self.registry.required_fields(type_name) {
            if filter.get(&field).is_none() {
                warn!(type_name, field = %field, "Rejected filter without required field");
                return Err(QueryError::invalid_filter(field, "filter on this field is required"));
            }
        }
        self.compile_node(type_name, filter, relations, alias, None)
    }

    fn compile_node(
        &self,
        type_name: &str,
        node: &FilterNode,
        relations: &RelationMap,
        alias: Option<&str>,
        join_prefix: Option<&str>,
    ) -> QueryResult<Predicate> {
        let mut conjuncts = Vec::new();

        if !node.fields().is_empty() {
            let descriptors = self.registry.get_fields(type_name)?;

            for (name, condition) in node.fields() {
                let part = match self.metadata.relation(type_name, name) {
                    Some(relation) => {
                        let Some(joined) = relations.get(name) else {
                            return Err(QueryError::invalid_filter(
                                name,
                                "relation is not joined for this query",
                            ));
                        };
                        let inner = match condition {
                            FieldCondition::Nested(inner) => inner,
                            // `{}` on a relation parses as an empty comparison
                            FieldCondition::Compare(cmp) if cmp.is_empty() => continue,
                            FieldCondition::Compare(_) => {
                                return Err(QueryError::invalid_filter(
                                    name,
                                    format!("relation expects a {} filter", relation.related_type),
                                ));
                            }
                        };
                        let child = join_alias(join_prefix, name);
                        self.compile_node(
                            &relation.related_type,
                            inner,
                            joined,
                            Some(&child),
                            Some(&child),
                        )?
                    }
                    None => {
                        let Some(descriptor) = descriptors.iter().find(|d| &d.field == name) else {
                            warn!(type_name, field = %name, "Rejected filter on unknown field");
                            return Err(QueryError::invalid_filter(
                                name,
                                format!("`{}` has no filterable field `{}`", type_name, name),
                            ));
                        };
                        match condition {
                            FieldCondition::Compare(cmp) => compile_field(descriptor, cmp, alias)?,
                            FieldCondition::Nested(_) => {
                                return Err(QueryError::invalid_filter(
                                    name,
                                    "expected a comparison, got a nested filter",
                                ));
                            }
                        }
                    }
                };
                conjuncts.push(part);
            }
        }

        if let Some(children) = node.ands().filter(|c| !c.is_empty()) {
            let group = children
                .iter()
                .map(|child| self.compile_node(type_name, child, relations, alias, join_prefix))
                .collect::<QueryResult<Vec<_>>>()?;
            conjuncts.push(Predicate::all(group));
        }

        if let Some(children) = node.ors().filter(|c| !c.is_empty()) {
            let group = children
                .iter()
                .map(|child| self.compile_node(type_name, child, relations, alias, join_prefix))
                .collect::<QueryResult<Vec<_>>>()?;
            conjuncts.push(Predicate::any(group));
        }

        Ok(Predicate::all(conjuncts))
    }
}

/// All operators on one field, OR'ed
fn compile_field(
    descriptor: &FieldDescriptor,
    comparison: &FieldComparison,
    alias: Option<&str>,
) -> QueryResult<Predicate> {
    if comparison.is_empty() {
        return Ok(Predicate::Always);
    }
    let mut parts = comparison
        .entries()
        .iter()
        .map(|(op, operand)| ComparisonCompiler::compile_named(descriptor, op, operand, alias))
        .collect::<QueryResult<Vec<_>>>()?;
    if parts.len() == 1 {
        return Ok(parts.remove(0));
    }
    Ok(Predicate::any(parts))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graphql::filters::Operator;
    use crate::graphql::orm::registry::FieldKind;
    use crate::graphql::orm::relations::RelationResolver;
    use crate::graphql::orm::test_support;
    use crate::graphql::orm::traits::SqlValue;
    use assert_matches::assert_matches;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn compile(filter: &FilterNode) -> QueryResult<(String, Vec<SqlValue>)> {
        let registry = test_support::registry();
        let catalog = test_support::catalog();
        let relations = RelationResolver::new(&catalog).resolve_filter("Media", filter);
        WhereBuilder::new(&registry, &catalog)
            .build("Media", filter, &relations, Some("media"))
            .map(|p| p.to_sql())
    }

    #[test]
    fn test_empty_filter_is_tautology() {
        assert_eq!(compile(&FilterNode::new()).unwrap().0, "1 = 1");
    }

    #[test]
    fn test_fields_are_anded_and_ops_ored() {
        let filter = FilterNode::new()
            .field("id", FieldComparison::lt(3).with(Operator::Gt, 7))
            .field("title", FieldComparison::eq("Dune"));

        let (sql, params) = compile(&filter).unwrap();
        assert_eq!(
            sql,
            "((\"media\".\"id\" < ?1 OR \"media\".\"id\" > ?2) AND \"media\".\"title\" = ?3)"
        );
        assert_eq!(
            params,
            vec![
                SqlValue::Int(3),
                SqlValue::Int(7),
                SqlValue::String("Dune".into())
            ]
        );
    }

    #[test]
    fn test_mixed_node_is_bracketed() {
        let filter: FilterNode = serde_json::from_value(json!({
            "tmdbId": { "gt": 100 },
            "or": [
                { "type": { "eq": "movie" } },
                { "numberOfEpisodes": { "gte": 10 } }
            ],
            "and": [
                { "id": { "gt": 1 } },
                { "id": { "lt": 9 } }
            ]
        }))
        .unwrap();

        let (sql, _) = compile(&filter).unwrap();
        assert_eq!(
            sql,
            "(\"media\".\"tmdb_id\" > ?1 \
             AND ((\"media\".\"id\" > ?2) AND (\"media\".\"id\" < ?3)) \
             AND ((\"media\".\"media_type\" = ?4) OR (\"media\".\"number_of_episodes\" >= ?5)))"
        );
    }

    #[test]
    fn test_relation_uses_join_alias() {
        let filter = FilterNode::new().relation(
            "users",
            FilterNode::new()
                .field("watched", FieldComparison::eq(true))
                .relation(
                    "user",
                    FilterNode::new().field("username", FieldComparison::eq("ann")),
                ),
        );

        let (sql, params) = compile(&filter).unwrap();
        assert_eq!(
            sql,
            "((\"users\".\"watched\" = ?1 AND (\"users_user\".\"username\" = ?2)))"
        );
        assert_eq!(params[0], SqlValue::Bool(true));
    }

    #[test]
    fn test_empty_in_short_circuits() {
        let filter = FilterNode::new()
            .field("id", FieldComparison::in_list(Vec::<i64>::new()))
            .field("title", FieldComparison::eq("Dune"));
        assert_eq!(compile(&filter).unwrap().0, "1 = 0");

        let filter = FilterNode::new().field("id", FieldComparison::not_in(Vec::<i64>::new()));
        assert_eq!(compile(&filter).unwrap().0, "1 = 1");
    }

    #[test]
    fn test_empty_groups_are_ignored() {
        let filter = FilterNode::new()
            .and(vec![])
            .or(vec![])
            .field("id", FieldComparison::eq(1));
        assert_eq!(compile(&filter).unwrap().0, "(\"media\".\"id\" = ?1)");
    }

    #[test]
    fn test_empty_relation_group_adds_nothing() {
        let filter: FilterNode = serde_json::from_value(json!({
            "id": { "eq": 1 },
            "users": { "and": [] }
        }))
        .unwrap();
        assert_eq!(compile(&filter).unwrap().0, "(\"media\".\"id\" = ?1)");

        let filter: FilterNode = serde_json::from_value(json!({ "users": { "or": null } })).unwrap();
        assert_eq!(compile(&filter).unwrap().0, "1 = 1");
    }

    #[test]
    fn test_unknown_field_rejected() {
        let filter = FilterNode::new().field("rating", FieldComparison::gt(5));
        assert_matches!(
            compile(&filter),
            Err(QueryError::InvalidFilter { field, .. }) if field == "rating"
        );
    }

    #[test]
    fn test_shape_mismatch_rejected() {
        let filter = FilterNode::new().relation("title", FilterNode::new());
        assert_matches!(compile(&filter), Err(QueryError::InvalidFilter { .. }));

        let filter = FilterNode::new().field("users", FieldComparison::eq(1));
        assert_matches!(compile(&filter), Err(QueryError::InvalidFilter { .. }));
    }

    #[test]
    fn test_required_field_must_be_present() {
        let mut registry = test_support::registry();
        registry.register_field(
            "Media",
            FieldDescriptor::new("tmdbId", FieldKind::Number).column("tmdb_id").required(),
        );
        let catalog = test_support::catalog();
        let builder = WhereBuilder::new(&registry, &catalog);

        let missing = FilterNode::new().field("title", FieldComparison::eq("Dune"));
        assert_matches!(
            builder.build("Media", &missing, &RelationMap::new(), Some("media")),
            Err(QueryError::InvalidFilter { field, .. }) if field == "tmdbId"
        );
        assert_matches!(
            builder.build("Media", &FilterNode::new(), &RelationMap::new(), Some("media")),
            Err(QueryError::InvalidFilter { .. })
        );

        // nested under `and` does not count
        let nested = FilterNode::all_of(vec![FilterNode::new().field("tmdbId", FieldComparison::eq(1))]);
        assert!(builder.build("Media", &nested, &RelationMap::new(), Some("media")).is_err());

        let present = missing.field("tmdbId", FieldComparison::gt(10));
        let (sql, _) = builder
            .build("Media", &present, &RelationMap::new(), Some("media"))
            .unwrap()
            .to_sql();
        assert_eq!(sql, "(\"media\".\"title\" = ?1 AND \"media\".\"tmdb_id\" > ?2)");
    }

    #[test]
    fn test_required_only_applies_to_root_type() {
        let mut registry = test_support::registry();
        registry.register_field(
            "UserMediaCatalog",
            FieldDescriptor::new("userId", FieldKind::Number).column("user_id").required(),
        );
        let catalog = test_support::catalog();
        let filter = FilterNode::new().field("id", FieldComparison::eq(1));
        assert!(
            WhereBuilder::new(&registry, &catalog)
                .build("Media", &filter, &RelationMap::new(), Some("media"))
                .is_ok()
        );
    }

    #[test]
    fn test_unjoined_relation_rejected() {
        let registry = test_support::registry();
        let catalog = test_support::catalog();
        let filter = FilterNode::new().relation(
            "users",
            FilterNode::new().field("watched", FieldComparison::eq(true)),
        );
        assert_matches!(
            WhereBuilder::new(&registry, &catalog).build("Media", &filter, &RelationMap::new(), Some("media")),
            Err(QueryError::InvalidFilter { .. })
        );
    }
}
