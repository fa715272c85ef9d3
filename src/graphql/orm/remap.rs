//! Field remapping for filters and sorts
//!
//! Transport types sometimes flatten a relation field onto the root type,
//! e.g. a `watched` flag on a media item that really lives on the user's
//! catalog row. These helpers rewrite such keys into relation paths
//! (`watched` -> `users.watched`) before compilation.

use crate::graphql::filters::{FieldCondition, FilterNode};
use crate::graphql::sorting::{SortEntry, SortSpec};

/// Build a mapping from `(field, path)` pairs
pub fn path_map<'a>(pairs: &'a [(&'a str, &'a str)]) -> impl Fn(&str) -> Option<String> + 'a {
    move |field: &str| {
        pairs
            .iter()
            .find(|(from, _)| *from == field)
            .map(|(_, to)| to.to_string())
    }
}

/// Rewrite field keys of `filter` (and of its `and` / `or` children) through `mapping`.
///
/// A key mapped onto a relation that is already present is merged into it.
/// Conflicting comparisons on the same key are kept side by side in `and`.
pub fn remap_filter<F>(filter: FilterNode, mapping: &F) -> FilterNode
where
    F: Fn(&str) -> Option<String>,
{
    let (and, or, fields) = filter.into_parts();
    let mut out = FilterNode::new();

    for (name, condition) in fields {
        let (key, condition) = match mapping(&name) {
            Some(path) => nest_filter(&path, condition),
            None => (name, condition),
        };
        insert_filter(&mut out, key, condition);
    }

    if let Some(children) = and {
        let remapped = children.into_iter().map(|c| remap_filter(c, mapping));
        out.ands_mut().extend(remapped);
    }
    if let Some(children) = or {
        let remapped = children.into_iter().map(|c| remap_filter(c, mapping));
        out.ors_mut().extend(remapped);
    }

    out
}

/// Rewrite field keys of `sort` through `mapping`. Key order is kept.
pub fn remap_sort<F>(sort: SortSpec, mapping: &F) -> SortSpec
where
    F: Fn(&str) -> Option<String>,
{
    let mut out = SortSpec::new();
    for (name, entry) in sort.into_entries() {
        let (key, entry) = match mapping(&name) {
            Some(path) => nest_sort(&path, entry),
            None => (name, entry),
        };
        insert_sort(&mut out, key, entry);
    }
    out
}

/// `("users.watched", c)` -> `("users", { watched: c })`
fn nest_filter(path: &str, condition: FieldCondition) -> (String, FieldCondition) {
    let mut segments = path.rsplit('.');
    let mut key = segments.next().unwrap_or(path).to_string();
    let mut condition = condition;
    for segment in segments {
        condition = FieldCondition::Nested(FilterNode::new().condition(key, condition));
        key = segment.to_string();
    }
    (key, condition)
}

fn nest_sort(path: &str, entry: SortEntry) -> (String, SortEntry) {
    let mut segments = path.rsplit('.');
    let mut key = segments.next().unwrap_or(path).to_string();
    let mut entry = entry;
    for segment in segments {
        entry = SortEntry::Nested(SortSpec::new().entry(key, entry));
        key = segment.to_string();
    }
    (key, entry)
}

fn insert_filter(node: &mut FilterNode, key: String, condition: FieldCondition) {
    match condition {
        FieldCondition::Nested(incoming) => {
            if let Some(FieldCondition::Nested(existing)) = node.get_mut(&key) {
                merge_filter(existing, incoming);
                return;
            }
            place_filter(node, key, FieldCondition::Nested(incoming));
        }
        condition => place_filter(node, key, condition),
    }
}

fn place_filter(node: &mut FilterNode, key: String, condition: FieldCondition) {
    if node.get(&key).is_some() {
        node.ands_mut().push(FilterNode::new().condition(key, condition));
    } else {
        node.set(key, condition);
    }
}

fn merge_filter(target: &mut FilterNode, incoming: FilterNode) {
    let (and, or, fields) = incoming.into_parts();
    for (key, condition) in fields {
        insert_filter(target, key, condition);
    }
    if let Some(children) = and {
        target.ands_mut().extend(children);
    }
    if let Some(children) = or {
        target.ors_mut().extend(children);
    }
}

fn insert_sort(spec: &mut SortSpec, key: String, entry: SortEntry) {
    match entry {
        SortEntry::Nested(incoming) => {
            if let Some(SortEntry::Nested(existing)) = spec.get_mut(&key) {
                for (k, e) in incoming.into_entries() {
                    insert_sort(existing, k, e);
                }
                return;
            }
            spec.set(key, SortEntry::Nested(incoming));
        }
        field => spec.set(key, field),
    }
}
