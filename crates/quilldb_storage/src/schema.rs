//! Table schemas.
//!
//! A schema names a table's primary key and its secondary indexes. It can be
//! built programmatically or parsed from a compact schema string:
//!
//! | entry          | meaning                                    |
//! |----------------|--------------------------------------------|
//! | `++id`         | auto-incremented primary key stored in `id`|
//! | `++`           | auto-incremented key kept outside the record|
//! | `id`           | primary key read from `id`                 |
//! | *(empty)*      | keys always supplied by the caller         |
//! | `[a+b]`        | compound key path                          |
//! | `&email`       | unique index                               |
//! | `*tags`        | multi-valued index (one entry per element) |

use crate::error::{StorageError, StorageResult};
use quilldb_codec::{Key, Record};
use std::collections::BTreeSet;
use std::fmt;

/// Where a key lives inside a record.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum KeyPath {
    /// A single top-level field.
    Field(String),
    /// Several fields forming a compound key.
    Compound(Vec<String>),
}

impl KeyPath {
    /// Parses `field` or `[a+b+c]`.
    pub fn parse(s: &str) -> StorageResult<Self> {
        let s = s.trim();
        if let Some(inner) = s.strip_prefix('[') {
            let inner = inner
                .strip_suffix(']')
                .ok_or_else(|| StorageError::invalid_schema(format!("unterminated '{s}'")))?;
            let fields: Vec<String> = inner.split('+').map(|f| f.trim().to_string()).collect();
            if fields.len() < 2 || fields.iter().any(String::is_empty) {
                return Err(StorageError::invalid_schema(format!(
                    "compound key path '{s}' needs at least two fields"
                )));
            }
            return Ok(KeyPath::Compound(fields));
        }
        if s.is_empty() || s.contains(['+', '[', ']', '&', '*', ' ']) {
            return Err(StorageError::invalid_schema(format!("invalid key path '{s}'")));
        }
        Ok(KeyPath::Field(s.to_string()))
    }

    /// Reads the key at this path.
    ///
    /// Returns `None` when a field is missing, `Null`, or has no key form.
    pub fn extract(&self, record: &Record) -> Option<Key> {
        match self {
            KeyPath::Field(field) => record.get(field).and_then(Key::from_value),
            KeyPath::Compound(fields) => fields
                .iter()
                .map(|f| record.get(f).and_then(Key::from_value))
                .collect::<Option<Vec<_>>>()
                .map(Key::Array),
        }
    }

    /// Writes `key` into the record at this path.
    pub fn assign(&self, record: &mut Record, key: &Key) -> StorageResult<()> {
        match (self, key) {
            (KeyPath::Field(field), key) => {
                record.set(field.clone(), key.to_value());
                Ok(())
            }
            (KeyPath::Compound(fields), Key::Array(parts)) if parts.len() == fields.len() => {
                for (field, part) in fields.iter().zip(parts) {
                    record.set(field.clone(), part.to_value());
                }
                Ok(())
            }
            (KeyPath::Compound(fields), other) => Err(StorageError::invalid_schema(format!(
                "key {other} does not fit compound path of {} fields",
                fields.len()
            ))),
        }
    }

    /// Returns true if this is a single-field path.
    pub fn is_field(&self) -> bool {
        matches!(self, KeyPath::Field(_))
    }
}

impl fmt::Display for KeyPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KeyPath::Field(field) => f.write_str(field),
            KeyPath::Compound(fields) => write!(f, "[{}]", fields.join("+")),
        }
    }
}

/// How a table's primary keys are determined.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PrimaryKeySpec {
    /// Inline key path, or `None` for keys held outside the record.
    pub path: Option<KeyPath>,
    /// Whether the store generates integer keys when none is supplied.
    pub auto_increment: bool,
}

/// Specification of a secondary index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexSpec {
    /// Index name (the display form of its key path).
    pub name: String,
    /// Indexed key path.
    pub path: KeyPath,
    /// Whether the index enforces uniqueness.
    pub unique: bool,
    /// Whether each element of an array value is indexed separately.
    pub multi_entry: bool,
}

impl IndexSpec {
    /// Creates a plain index on a single field.
    pub fn new(field: impl Into<String>) -> Self {
        let field = field.into();
        Self {
            name: field.clone(),
            path: KeyPath::Field(field),
            unique: false,
            multi_entry: false,
        }
    }

    /// Makes this a unique index.
    #[must_use]
    pub fn unique(mut self) -> Self {
        self.unique = true;
        self
    }

    /// Makes this a multi-valued index.
    #[must_use]
    pub fn multi_entry(mut self) -> Self {
        self.multi_entry = true;
        self
    }

    /// Returns the index keys a record contributes to this index.
    ///
    /// A multi-entry index yields one key per distinct element that has a
    /// key form; elements without one are skipped, as is a record whose
    /// value at the path has no key form at all.
    pub fn keys_for(&self, record: &Record) -> Vec<Key> {
        match (&self.path, self.multi_entry) {
            (KeyPath::Field(field), true) => match record.get(field) {
                Some(quilldb_codec::Value::Array(items)) => {
                    let distinct: BTreeSet<Key> = items.iter().filter_map(Key::from_value).collect();
                    distinct.into_iter().collect()
                }
                Some(other) => Key::from_value(other).into_iter().collect(),
                None => Vec::new(),
            },
            (path, _) => path.extract(record).into_iter().collect(),
        }
    }
}

/// Schema of one table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableSchema {
    /// Table name.
    pub name: String,
    /// Primary key definition.
    pub primary_key: PrimaryKeySpec,
    /// Secondary indexes.
    pub indexes: Vec<IndexSpec>,
}

impl TableSchema {
    /// Creates a table whose keys are always supplied by the caller.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            primary_key: PrimaryKeySpec::default(),
            indexes: Vec::new(),
        }
    }

    /// Parses a schema string such as `"++id, name, &email, *tags"`.
    pub fn parse(name: impl Into<String>, spec: &str) -> StorageResult<Self> {
        let mut schema = Self::new(name);
        let mut entries = spec.split(',').map(str::trim);

        let primary = entries.next().unwrap_or("");
        let (auto_increment, path) = match primary.strip_prefix("++") {
            Some(rest) => (true, rest),
            None => (false, primary.strip_prefix('&').unwrap_or(primary)),
        };
        schema.primary_key = PrimaryKeySpec {
            path: if path.is_empty() {
                None
            } else {
                Some(KeyPath::parse(path)?)
            },
            auto_increment,
        };

        for entry in entries.filter(|e| !e.is_empty()) {
            let (unique, rest) = match entry.strip_prefix('&') {
                Some(rest) => (true, rest),
                None => (false, entry),
            };
            let (multi_entry, rest) = match rest.strip_prefix('*') {
                Some(rest) => (true, rest),
                None => (false, rest),
            };
            let path = KeyPath::parse(rest)?;
            schema.indexes.push(IndexSpec {
                name: path.to_string(),
                path,
                unique,
                multi_entry,
            });
        }

        schema.validate()?;
        Ok(schema)
    }

    /// Uses an inline primary key field.
    #[must_use]
    pub fn key_path(mut self, field: impl Into<String>) -> Self {
        self.primary_key.path = Some(KeyPath::Field(field.into()));
        self
    }

    /// Lets the store generate integer keys.
    #[must_use]
    pub fn auto_increment(mut self) -> Self {
        self.primary_key.auto_increment = true;
        self
    }

    /// Adds a secondary index.
    #[must_use]
    pub fn with_index(mut self, index: IndexSpec) -> Self {
        self.indexes.push(index);
        self
    }

    /// Returns the index with the given name.
    pub fn index(&self, name: &str) -> Option<&IndexSpec> {
        self.indexes.iter().find(|i| i.name == name)
    }

    /// Returns true if `field` is the inline primary key path.
    pub fn is_primary_path(&self, name: &str) -> bool {
        self.primary_key
            .path
            .as_ref()
            .is_some_and(|p| p.to_string() == name)
    }

    /// Checks the schema for contradictory definitions.
    pub fn validate(&self) -> StorageResult<()> {
        if self.name.is_empty() {
            return Err(StorageError::invalid_schema("table name must not be empty"));
        }
        if self.primary_key.auto_increment
            && self.primary_key.path.as_ref().is_some_and(|p| !p.is_field())
        {
            return Err(StorageError::invalid_schema(format!(
                "table '{}': auto-increment keys cannot be compound",
                self.name
            )));
        }
        let mut seen = BTreeSet::new();
        for index in &self.indexes {
            if index.multi_entry && !index.path.is_field() {
                return Err(StorageError::invalid_schema(format!(
                    "table '{}': multi-valued index '{}' cannot be compound",
                    self.name, index.name
                )));
            }
            if !seen.insert(index.name.as_str()) {
                return Err(StorageError::invalid_schema(format!(
                    "table '{}': duplicate index '{}'",
                    self.name, index.name
                )));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use quilldb_codec::{record, Value};

    #[test]
    fn parse_auto_increment_inline() {
        let schema = TableSchema::parse("friends", "++id, name, &email, *tags").unwrap();
        assert!(schema.primary_key.auto_increment);
        assert_eq!(schema.primary_key.path, Some(KeyPath::Field("id".into())));
        assert_eq!(schema.indexes.len(), 3);
        assert!(schema.index("email").unwrap().unique);
        assert!(schema.index("tags").unwrap().multi_entry);
        assert!(!schema.index("name").unwrap().unique);
    }

    #[test]
    fn parse_outbound_keys() {
        let schema = TableSchema::parse("blobs", "").unwrap();
        assert_eq!(schema.primary_key, PrimaryKeySpec::default());

        let schema = TableSchema::parse("events", "++,kind").unwrap();
        assert!(schema.primary_key.auto_increment);
        assert!(schema.primary_key.path.is_none());
    }

    #[test]
    fn parse_compound_paths() {
        let schema = TableSchema::parse("people", "[first+last], [city+zip]").unwrap();
        assert_eq!(
            schema.primary_key.path,
            Some(KeyPath::Compound(vec!["first".into(), "last".into()]))
        );
        assert!(schema.index("[city+zip]").is_some());
    }

    #[test]
    fn reject_invalid_schemas() {
        assert!(TableSchema::parse("t", "++[a+b]").is_err());
        assert!(TableSchema::parse("t", "id, *[a+b]").is_err());
        assert!(TableSchema::parse("t", "id, name, name").is_err());
        assert!(TableSchema::parse("t", "id, [a").is_err());
        assert!(TableSchema::parse("", "id").is_err());
    }

    #[test]
    fn extract_treats_null_as_absent() {
        let path = KeyPath::Field("id".into());
        assert_eq!(path.extract(&record! { "id" => 0 }), Some(Key::Integer(0)));
        assert_eq!(path.extract(&record! { "id" => "" }), Some(Key::from("")));
        assert_eq!(path.extract(&record! { "id" => Value::Null }), None);
        assert_eq!(path.extract(&record! {}), None);
    }

    #[test]
    fn multi_entry_keys_are_distinct() {
        let index = IndexSpec::new("tags").multi_entry();
        let keys = index.keys_for(&record! { "tags" => vec!["b", "a", "b"] });
        assert_eq!(keys, vec![Key::from("a"), Key::from("b")]);

        let plain = IndexSpec::new("tags");
        let keys = plain.keys_for(&record! { "tags" => vec!["b", "a"] });
        assert_eq!(keys, vec![Key::Array(vec![Key::from("b"), Key::from("a")])]);
    }

    #[test]
    fn assign_compound_key() {
        let path = KeyPath::Compound(vec!["first".into(), "last".into()]);
        let mut rec = Record::new();
        path.assign(&mut rec, &Key::Array(vec![Key::from("Ada"), Key::from("Lovelace")]))
            .unwrap();
        assert_eq!(rec.get("last"), Some(&Value::from("Lovelace")));
        assert!(path.assign(&mut rec, &Key::Integer(1)).is_err());
    }
}
