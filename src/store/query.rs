//! List query arguments: pagination, filters and ordering.

use crate::error::ApiError;
use crate::schema::TableMeta;
use rusqlite::types::Value as SqlValue;

/// How a filter compares its column
#[derive(Debug, Clone, PartialEq)]
pub enum FilterOp {
    Eq,
    /// `LIKE` with `/` as the escape character
    Like,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Filter {
    pub column: String,
    pub op: FilterOp,
    pub value: SqlValue,
}

/// Parsed query arguments of a collection `GET`
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ListQuery {
    /// 0-based page; `None` returns every row
    pub page: Option<u64>,
    pub filters: Vec<Filter>,
    /// `ORDER BY` columns, ascending, in order of appearance
    pub sort: Vec<String>,
}

impl ListQuery {
    /// Interpret query parameters against `table`.
    ///
    /// - `page=<n>` selects a page
    /// - `sort=<column>` appends an ordering term
    /// - `<column>=%...` is a `LIKE` pattern
    /// - `<column>=<value>` is an equality filter on the coerced value
    ///
    /// Repeated keys are processed in order; filters are ANDed.
    pub fn from_params<K: AsRef<str>>(
        table: &TableMeta,
        params: &[(K, String)],
    ) -> Result<Self, ApiError> {
        let mut query = ListQuery::default();
        for (key, value) in params {
            let key = key.as_ref();
            match key {
                "" => continue,
                "page" => {
                    let page = value.trim().parse::<u64>().map_err(|_| {
                        ApiError::BadRequest(format!("invalid page number [{value}]"))
                    })?;
                    query.page = Some(page);
                }
                "sort" => {
                    let column = table.column(value).ok_or_else(|| {
                        ApiError::BadRequest(format!(
                            "cannot sort [{}] by unknown column [{value}]",
                            table.name
                        ))
                    })?;
                    query.sort.push(column.name.clone());
                }
                _ => {
                    let column = table.column(key).ok_or_else(|| {
                        ApiError::BadRequest(format!(
                            "cannot filter [{}] by unknown column [{key}]",
                            table.name
                        ))
                    })?;
                    let filter = if value.starts_with('%') {
                        Filter {
                            column: column.name.clone(),
                            op: FilterOp::Like,
                            value: SqlValue::Text(value.clone()),
                        }
                    } else {
                        Filter {
                            column: column.name.clone(),
                            op: FilterOp::Eq,
                            value: column.column_type.coerce(value),
                        }
                    };
                    query.filters.push(filter);
                }
            }
        }
        Ok(query)
    }
}

/// Double-quote an SQL identifier, doubling embedded quotes.
#[must_use]
pub fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}
