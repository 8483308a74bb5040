use crate::error::ApiError;
use rusqlite::types::Value as SqlValue;
use serde::Serialize;
use std::borrow::Cow;
use std::sync::Arc;

/// SQLite type affinity of a column, derived from its declared type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ColumnType {
    Integer,
    Text,
    Blob,
    Real,
    Numeric,
}

impl ColumnType {
    /// Apply SQLite's affinity rules (section 3.1 of the datatype docs) in order.
    #[must_use]
    pub fn from_declared(declared: &str) -> Self {
        let upper = declared.to_ascii_uppercase();
        if upper.contains("INT") {
            ColumnType::Integer
        } else if upper.contains("CHAR") || upper.contains("CLOB") || upper.contains("TEXT") {
            ColumnType::Text
        } else if upper.contains("BLOB") || upper.trim().is_empty() {
            ColumnType::Blob
        } else if upper.contains("REAL") || upper.contains("FLOA") || upper.contains("DOUB") {
            ColumnType::Real
        } else {
            ColumnType::Numeric
        }
    }

    /// Convert a textual value (path id, query filter, form field) into the
    /// SQL value this affinity would store. Unparseable values stay text.
    #[must_use]
    pub fn coerce(&self, raw: &str) -> SqlValue {
        let trimmed = raw.trim();
        match self {
            ColumnType::Integer | ColumnType::Numeric => {
                if let Ok(i) = trimmed.parse::<i64>() {
                    SqlValue::Integer(i)
                } else if let Ok(f) = trimmed.parse::<f64>() {
                    SqlValue::Real(f)
                } else {
                    SqlValue::Text(raw.to_string())
                }
            }
            ColumnType::Real => trimmed
                .parse::<f64>()
                .map(SqlValue::Real)
                .unwrap_or_else(|_| SqlValue::Text(raw.to_string())),
            ColumnType::Text | ColumnType::Blob => SqlValue::Text(raw.to_string()),
        }
    }
}

/// A reflected column
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ColumnMeta {
    pub name: String,
    /// Type exactly as written in `CREATE TABLE` (may be empty)
    pub declared_type: String,
    pub column_type: ColumnType,
    pub not_null: bool,
    pub default_value: Option<String>,
    /// 1-based position inside the primary key, `None` when not part of it
    pub primary_key_position: Option<u32>,
}

/// A reflected foreign key constraint (one column of it)
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ForeignKey {
    pub column: String,
    pub ref_table: String,
    pub ref_column: String,
}

/// A reflected table and everything needed to expose it as a resource
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TableMeta {
    /// Table name as stored in the catalog
    pub name: String,
    /// Lower-cased name used as the URL segment
    pub resource_name: String,
    pub columns: Vec<ColumnMeta>,
    /// Key column names in key order
    pub primary_key: Vec<String>,
    pub foreign_keys: Vec<ForeignKey>,
    /// True when the table declares no primary key and every column stands in for one
    pub synthetic_key: bool,
}

impl TableMeta {
    #[must_use]
    pub fn column(&self, name: &str) -> Option<&ColumnMeta> {
        self.columns.iter().find(|c| c.name == name)
    }

    #[must_use]
    pub fn is_key_column(&self, name: &str) -> bool {
        self.primary_key.iter().any(|k| k == name)
    }

    /// Columns that must be supplied when creating or replacing a row
    pub fn required_columns(&self) -> impl Iterator<Item = &ColumnMeta> {
        self.columns
            .iter()
            .filter(move |c| !self.is_key_column(&c.name))
    }

    /// Foreign key declared on `column`, if any
    #[must_use]
    pub fn foreign_key(&self, column: &str) -> Option<&ForeignKey> {
        self.foreign_keys.iter().find(|fk| fk.column == column)
    }

    /// Split a raw (still percent-encoded) resource id path segment into typed
    /// key values.
    ///
    /// Composite keys are comma-separated in key order; each part is decoded
    /// after splitting, so an encoded comma (`%2C`) stays inside its value.
    pub fn parse_key(&self, raw_id: &str) -> Result<Vec<(String, SqlValue)>, ApiError> {
        let parts: Vec<&str> = if self.primary_key.len() == 1 {
            vec![raw_id]
        } else {
            raw_id.split(',').collect()
        };
        if parts.len() != self.primary_key.len() {
            return Err(ApiError::BadRequest(format!(
                "resource id for [{}] needs {} comma-separated values, got {}",
                self.name,
                self.primary_key.len(),
                parts.len()
            )));
        }
        self.primary_key
            .iter()
            .zip(parts)
            .map(|(key, part)| {
                let column_type = self
                    .column(key)
                    .map(|c| c.column_type)
                    .unwrap_or(ColumnType::Numeric);
                let decoded = urlencoding::decode(part).unwrap_or(Cow::Borrowed(part));
                Ok((key.clone(), column_type.coerce(&decoded)))
            })
            .collect()
    }
}

/// The reflected catalog of one database
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Schema {
    pub tables: Vec<Arc<TableMeta>>,
    /// `PRAGMA schema_version` at reflection time
    pub version: i64,
}

impl Schema {
    #[must_use]
    pub fn table(&self, name: &str) -> Option<&Arc<TableMeta>> {
        self.tables.iter().find(|t| t.name == name)
    }

    #[must_use]
    pub fn table_by_resource(&self, resource: &str) -> Option<&Arc<TableMeta>> {
        self.tables.iter().find(|t| t.resource_name == resource)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn column(name: &str, declared: &str, pk: Option<u32>) -> ColumnMeta {
        ColumnMeta {
            name: name.to_string(),
            declared_type: declared.to_string(),
            column_type: ColumnType::from_declared(declared),
            not_null: false,
            default_value: None,
            primary_key_position: pk,
        }
    }

    #[test]
    fn test_affinity_rules() {
        assert_eq!(ColumnType::from_declared("INTEGER"), ColumnType::Integer);
        assert_eq!(ColumnType::from_declared("BIGINT"), ColumnType::Integer);
        assert_eq!(ColumnType::from_declared("NVARCHAR(120)"), ColumnType::Text);
        assert_eq!(ColumnType::from_declared(""), ColumnType::Blob);
        assert_eq!(ColumnType::from_declared("DOUBLE PRECISION"), ColumnType::Real);
        assert_eq!(ColumnType::from_declared("NUMERIC(10,2)"), ColumnType::Numeric);
        assert_eq!(ColumnType::from_declared("DATETIME"), ColumnType::Numeric);
        // "POINT" contains "INT"
        assert_eq!(ColumnType::from_declared("FLOATING POINT"), ColumnType::Integer);
    }

    #[test]
    fn test_coerce() {
        assert_eq!(ColumnType::Integer.coerce("42"), SqlValue::Integer(42));
        assert_eq!(ColumnType::Integer.coerce("4.5"), SqlValue::Real(4.5));
        assert_eq!(
            ColumnType::Integer.coerce("abc"),
            SqlValue::Text("abc".to_string())
        );
        assert_eq!(ColumnType::Real.coerce("1"), SqlValue::Real(1.0));
        assert_eq!(ColumnType::Text.coerce("42"), SqlValue::Text("42".to_string()));
    }

    #[test]
    fn test_parse_composite_key() {
        let table = TableMeta {
            name: "PlaylistTrack".to_string(),
            resource_name: "playlisttrack".to_string(),
            columns: vec![
                column("PlaylistId", "INTEGER", Some(1)),
                column("TrackId", "INTEGER", Some(2)),
            ],
            primary_key: vec!["PlaylistId".to_string(), "TrackId".to_string()],
            foreign_keys: Vec::new(),
            synthetic_key: false,
        };
        let key = table.parse_key("3,17").unwrap();
        assert_eq!(
            key,
            vec![
                ("PlaylistId".to_string(), SqlValue::Integer(3)),
                ("TrackId".to_string(), SqlValue::Integer(17)),
            ]
        );
        assert_eq!(table.parse_key("3").unwrap_err().status(), 400);
        assert_eq!(table.required_columns().count(), 0);
    }

    #[test]
    fn test_encoded_comma_stays_inside_its_key_part() {
        let table = TableMeta {
            name: "Note".to_string(),
            resource_name: "note".to_string(),
            columns: vec![column("body", "TEXT", Some(1)), column("score", "REAL", Some(2))],
            primary_key: vec!["body".to_string(), "score".to_string()],
            foreign_keys: Vec::new(),
            synthetic_key: true,
        };
        let key = table.parse_key("one%2Ctwo,1.5").unwrap();
        assert_eq!(
            key,
            vec![
                ("body".to_string(), SqlValue::Text("one,two".to_string())),
                ("score".to_string(), SqlValue::Real(1.5)),
            ]
        );
    }

    #[test]
    fn test_single_key_keeps_commas() {
        let table = TableMeta {
            name: "Tag".to_string(),
            resource_name: "tag".to_string(),
            columns: vec![column("Label", "TEXT", Some(1)), column("Note", "TEXT", None)],
            primary_key: vec!["Label".to_string()],
            foreign_keys: Vec::new(),
            synthetic_key: false,
        };
        let key = table.parse_key("a,b").unwrap();
        assert_eq!(key[0].1, SqlValue::Text("a,b".to_string()));
        let key = table.parse_key("AC%2FDC").unwrap();
        assert_eq!(key[0].1, SqlValue::Text("AC/DC".to_string()));
        let required: Vec<_> = table.required_columns().map(|c| c.name.as_str()).collect();
        assert_eq!(required, vec!["Note"]);
    }
}
