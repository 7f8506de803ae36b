use serde_json::Value;

use crate::error::QueryError;

/// A query builder that accepts `column IN (...)` predicates.
pub trait WhereIn {
    fn where_in(&mut self, column: &str, values: Vec<Value>) -> Result<(), QueryError>;
}

/// One `column IN (...)` predicate.
#[derive(Debug, Clone, PartialEq)]
pub struct InPredicate {
    pub column: String,
    pub values: Vec<Value>,
}

/// Minimal parameterized `SELECT` builder.
///
/// Values are never inlined: `to_sql` renders `?` placeholders and
/// `params` returns the bound values in placeholder order.
#[derive(Debug, Clone, PartialEq)]
pub struct SelectQuery {
    table: String,
    columns: Vec<String>,
    predicates: Vec<InPredicate>,
}

/// Accepts `name` or `table.name` made of ASCII letters, digits and underscores.
fn validate_identifier(name: &str) -> Result<(), QueryError> {
    let valid_part = |part: &str| {
        !part.is_empty()
            && !part.starts_with(|c: char| c.is_ascii_digit())
            && part.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
    };
    let parts: Vec<&str> = name.split('.').collect();
    if parts.len() <= 2 && parts.iter().all(|p| valid_part(p)) {
        Ok(())
    } else {
        Err(QueryError::InvalidIdentifier(name.to_string()))
    }
}

impl SelectQuery {
    pub fn new(table: &str) -> Result<Self, QueryError> {
        validate_identifier(table)?;
        Ok(Self {
            table: table.to_string(),
            columns: Vec::new(),
            predicates: Vec::new(),
        })
    }

    /// Restrict the selected columns (defaults to `*`).
    pub fn columns(mut self, columns: &[&str]) -> Result<Self, QueryError> {
        for column in columns {
            validate_identifier(column)?;
            self.columns.push(column.to_string());
        }
        Ok(self)
    }

    pub fn predicates(&self) -> &[InPredicate] {
        &self.predicates
    }

    pub fn to_sql(&self) -> String {
        let columns = if self.columns.is_empty() {
            "*".to_string()
        } else {
            self.columns.join(", ")
        };
        let mut sql = format!("SELECT {columns} FROM {}", self.table);

        let clauses: Vec<String> = self
            .predicates
            .iter()
            .map(|p| {
                if p.values.is_empty() {
                    // IN () never matches.
                    "0 = 1".to_string()
                } else {
                    let placeholders = vec!["?"; p.values.len()].join(", ");
                    format!("{} IN ({placeholders})", p.column)
                }
            })
            .collect();
        if !clauses.is_empty() {
            sql.push_str(" WHERE ");
            sql.push_str(&clauses.join(" AND "));
        }
        sql
    }

    pub fn params(&self) -> Vec<&Value> {
        self.predicates.iter().flat_map(|p| p.values.iter()).collect()
    }
}

impl WhereIn for SelectQuery {
    fn where_in(&mut self, column: &str, values: Vec<Value>) -> Result<(), QueryError> {
        validate_identifier(column)?;
        self.predicates.push(InPredicate {
            column: column.to_string(),
            values,
        });
        Ok(())
    }
}
