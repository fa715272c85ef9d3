//! Single-field comparison compiler
//!
//! Turns one `(field, operator, operand)` triple into a [`Predicate`] with
//! bound parameters. Operands are typed against the field's kind here, so a
//! malformed value never reaches the store.

use chrono::{DateTime, NaiveDate, SecondsFormat, Utc};

use super::error::{QueryError, QueryResult};
use super::predicate::Predicate;
use super::registry::{FieldDescriptor, FieldKind};
use super::traits::SqlValue;
use crate::graphql::filters::{Operand, Operator};

/// Quote a column, qualified by `alias` when one is given
pub fn qualify(alias: Option<&str>, column: &str) -> String {
    match alias {
        Some(alias) => format!("\"{}\".\"{}\"", alias, column),
        None => format!("\"{}\"", column),
    }
}

pub struct ComparisonCompiler;

impl ComparisonCompiler {
    /// Compile an operator given by name, as it appears in a `where` argument
    pub fn compile_named(
        field: &FieldDescriptor,
        operator: &str,
        operand: &Operand,
        alias: Option<&str>,
    ) -> QueryResult<Predicate> {
        let op = Operator::parse(operator)
            .ok_or_else(|| QueryError::unsupported_operator(&field.field, operator))?;
        Self::compile(field, op, operand, alias)
    }

    pub fn compile(
        field: &FieldDescriptor,
        op: Operator,
        operand: &Operand,
        alias: Option<&str>,
    ) -> QueryResult<Predicate> {
        if !field.permits(op) {
            return Err(QueryError::unsupported_operator(&field.field, op.as_str()));
        }

        let col = qualify(alias, &field.column);

        let predicate = match op {
            Operator::Eq
            | Operator::Neq
            | Operator::Gt
            | Operator::Gte
            | Operator::Lt
            | Operator::Lte => {
                let symbol = match op {
                    Operator::Eq => "=",
                    Operator::Neq => "<>",
                    Operator::Gt => ">",
                    Operator::Gte => ">=",
                    Operator::Lt => "<",
                    _ => "<=",
                };
                let value = scalar(field, op, operand)?;
                Predicate::condition(format!("{} {} ?", col, symbol), vec![value])
            }
            Operator::Like | Operator::NotLike => {
                let not = if op == Operator::NotLike { "NOT " } else { "" };
                let value = scalar(field, op, operand)?;
                Predicate::condition(format!("{} {}LIKE ?", col, not), vec![value])
            }
            Operator::ILike | Operator::NotILike => {
                let not = if op == Operator::NotILike { "NOT " } else { "" };
                let value = scalar(field, op, operand)?;
                Predicate::condition(format!("LOWER({}) {}LIKE LOWER(?)", col, not), vec![value])
            }
            Operator::In | Operator::NotIn => {
                let Operand::List(items) = operand else {
                    return Err(QueryError::invalid_filter(
                        &field.field,
                        format!("`{}` expects a list, got {}", op, operand.type_name()),
                    ));
                };
                if items.is_empty() {
                    // Nothing is in the empty set; everything is outside it
                    return Ok(if op == Operator::In {
                        Predicate::Never
                    } else {
                        Predicate::Always
                    });
                }
                let values = items
                    .iter()
                    .map(|item| scalar(field, op, item))
                    .collect::<QueryResult<Vec<_>>>()?;
                let placeholders = vec!["?"; values.len()].join(", ");
                let not = if op == Operator::NotIn { "NOT " } else { "" };
                Predicate::condition(format!("{} {}IN ({})", col, not, placeholders), values)
            }
            Operator::Is | Operator::IsNot => {
                let target = match operand {
                    Operand::Null => "NULL",
                    Operand::Bool(true) => "TRUE",
                    Operand::Bool(false) => "FALSE",
                    other => {
                        return Err(QueryError::invalid_filter(
                            &field.field,
                            format!("`{}` expects true, false or null, got {}", op, other.type_name()),
                        ));
                    }
                };
                let not = if op == Operator::IsNot { "NOT " } else { "" };
                Predicate::condition(format!("{} IS {}{}", col, not, target), Vec::new())
            }
            Operator::Between | Operator::NotBetween => {
                let Operand::Range { lower, upper } = operand else {
                    return Err(QueryError::invalid_filter(
                        &field.field,
                        format!("`{}` expects {{ lower, upper }}, got {}", op, operand.type_name()),
                    ));
                };
                let lower = scalar(field, op, lower)?;
                let upper = scalar(field, op, upper)?;
                if exceeds(&lower, &upper) {
                    return Err(QueryError::invalid_filter(
                        &field.field,
                        format!("`{}` lower bound is greater than upper bound", op),
                    ));
                }
                let not = if op == Operator::NotBetween { "NOT " } else { "" };
                Predicate::condition(
                    format!("{} {}BETWEEN ? AND ?", col, not),
                    vec![lower, upper],
                )
            }
        };

        Ok(predicate)
    }
}

/// Convert a single operand to a bindable value of the field's kind
fn scalar(field: &FieldDescriptor, op: Operator, operand: &Operand) -> QueryResult<SqlValue> {
    let mismatch = || {
        QueryError::invalid_filter(
            &field.field,
            format!(
                "`{}` expects a {} value, got {}",
                op,
                field.kind.as_str(),
                operand.type_name()
            ),
        )
    };

    match (field.kind, operand) {
        (FieldKind::Number, Operand::Int(i)) => Ok(SqlValue::Int(*i)),
        (FieldKind::Number, Operand::Float(f)) => Ok(SqlValue::Float(*f)),
        (FieldKind::Boolean, Operand::Bool(b)) => Ok(SqlValue::Bool(*b)),
        (FieldKind::String, Operand::Text(s)) => Ok(SqlValue::String(s.clone())),
        (FieldKind::Enum, Operand::Text(s)) => {
            if !field.enum_values.is_empty() && !field.enum_values.iter().any(|v| v == s) {
                return Err(QueryError::invalid_filter(
                    &field.field,
                    format!(
                        "`{}` is not one of: {}",
                        s,
                        field.enum_values.join(", ")
                    ),
                ));
            }
            Ok(SqlValue::String(s.clone()))
        }
        (FieldKind::Date, Operand::Text(s)) => normalize_date(s)
            .map(SqlValue::String)
            .ok_or_else(|| {
                QueryError::invalid_filter(
                    &field.field,
                    format!("`{}` is not an RFC 3339 timestamp or YYYY-MM-DD date", s),
                )
            }),
        _ => Err(mismatch()),
    }
}

/// Normalize a date operand to the stored form `YYYY-MM-DDTHH:MM:SSZ`
pub(crate) fn normalize_date(input: &str) -> Option<String> {
    if let Ok(ts) = DateTime::parse_from_rfc3339(input) {
        return Some(
            ts.with_timezone(&Utc)
                .to_rfc3339_opts(SecondsFormat::Secs, true),
        );
    }
    NaiveDate::parse_from_str(input, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|dt| dt.and_utc().to_rfc3339_opts(SecondsFormat::Secs, true))
}

/// `lower > upper` for values of the same kind
fn exceeds(lower: &SqlValue, upper: &SqlValue) -> bool {
    match (lower, upper) {
        (SqlValue::Int(a), SqlValue::Int(b)) => a > b,
        (SqlValue::Int(a), SqlValue::Float(b)) => (*a as f64) > *b,
        (SqlValue::Float(a), SqlValue::Int(b)) => *a > (*b as f64),
        (SqlValue::Float(a), SqlValue::Float(b)) => a > b,
        (SqlValue::String(a), SqlValue::String(b)) => a > b,
        _ => false,
    }
}
