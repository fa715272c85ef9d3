//! Immutable WHERE predicates
//!
//! The compilers never touch a live query builder. They produce a
//! [`Predicate`] value which the store adapter renders once, at the end.

use super::traits::SqlValue;

/// A compiled boolean condition with its bound parameters.
///
/// `Condition` fragments use bare `?` placeholders. Rendering rewrites them to
/// numbered `?N` placeholders in the order parameters are emitted, so nested
/// predicates can be composed freely.
#[derive(Debug, Clone, PartialEq)]
pub enum Predicate {
    /// Matches every row.
    Always,
    /// Matches no row.
    Never,
    Condition { sql: String, params: Vec<SqlValue> },
    And(Vec<Predicate>),
    Or(Vec<Predicate>),
}

impl Predicate {
    pub fn condition(sql: impl Into<String>, params: Vec<SqlValue>) -> Self {
        Predicate::Condition {
            sql: sql.into(),
            params,
        }
    }

    /// Conjunction. Tautologies are dropped; an empty conjunction is `Always`.
    pub fn all(parts: Vec<Predicate>) -> Self {
        let mut kept = Vec::with_capacity(parts.len());
        for part in parts {
            match part {
                Predicate::Always => {}
                Predicate::Never => return Predicate::Never,
                other => kept.push(other),
            }
        }
        if kept.is_empty() {
            Predicate::Always
        } else {
            Predicate::And(kept)
        }
    }

    /// Disjunction. Contradictions are dropped; an empty disjunction is `Never`.
    pub fn any(parts: Vec<Predicate>) -> Self {
        let mut kept = Vec::with_capacity(parts.len());
        for part in parts {
            match part {
                Predicate::Never => {}
                Predicate::Always => return Predicate::Always,
                other => kept.push(other),
            }
        }
        if kept.is_empty() {
            Predicate::Never
        } else {
            Predicate::Or(kept)
        }
    }

    pub fn is_always(&self) -> bool {
        matches!(self, Predicate::Always)
    }

    /// Render with placeholders numbered from `?1`.
    pub fn to_sql(&self) -> (String, Vec<SqlValue>) {
        let mut sql = String::new();
        let mut params = Vec::new();
        self.render(&mut sql, &mut params);
        (sql, params)
    }

    /// Render into `out`, continuing the numbering of `params`.
    ///
    /// `And`/`Or` groups are always bracketed, so the output never relies on
    /// SQL operator precedence.
    pub fn render(&self, out: &mut String, params: &mut Vec<SqlValue>) {
        match self {
            Predicate::Always => out.push_str("1 = 1"),
            Predicate::Never => out.push_str("1 = 0"),
            Predicate::Condition { sql, params: bound } => {
                let mut values = bound.iter();
                for ch in sql.chars() {
                    if ch == '?' {
                        if let Some(value) = values.next() {
                            params.push(value.clone());
                            out.push_str(&format!("?{}", params.len()));
                            continue;
                        }
                    }
                    out.push(ch);
                }
            }
            Predicate::And(parts) => render_group(parts, " AND ", out, params),
            Predicate::Or(parts) => render_group(parts, " OR ", out, params),
        }
    }
}

fn render_group(parts: &[Predicate], joiner: &str, out: &mut String, params: &mut Vec<SqlValue>) {
    out.push('(');
    for (i, part) in parts.iter().enumerate() {
        if i > 0 {
            out.push_str(joiner);
        }
        part.render(out, params);
    }
    out.push(')');
}
