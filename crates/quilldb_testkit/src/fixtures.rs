//! Test fixtures and database helpers.
//!
//! Provides schemas, records and pre-populated databases for common test
//! scenarios, plus hook sets shared by several test suites.

use quilldb_codec::{record, Record, Value};
use quilldb_core::{Config, Database, Modifications, Subscription, Table};

/// Name of the friends fixture table.
pub const FRIENDS: &str = "friends";

/// Schema of the friends table: auto-increment inline key, plain indexes on
/// `name` and `age`, a unique `email` index and a multi-valued `tags` index.
pub const FRIENDS_SCHEMA: &str = "++id, name, age, &email, *tags";

/// Name of the outbound-key notes fixture table.
pub const NOTES: &str = "notes";

/// Schema of the notes table: keys are always passed explicitly.
pub const NOTES_SCHEMA: &str = "";

/// Name of the counters fixture table.
pub const COUNTERS: &str = "counters";

/// Schema of the counters table: inline explicit key.
pub const COUNTERS_SCHEMA: &str = "id";

/// Domain tag used by [`install_date_hooks`].
pub const DATE_TAG: &str = "date";

/// Opens an in-memory database with the fixture tables.
pub fn friends_db() -> Database {
    friends_db_with(Config::default())
}

/// Opens an in-memory database with the fixture tables and a configuration.
pub fn friends_db_with(config: Config) -> Database {
    Database::builder()
        .config(config)
        .table(FRIENDS, FRIENDS_SCHEMA)
        .table(NOTES, NOTES_SCHEMA)
        .table(COUNTERS, COUNTERS_SCHEMA)
        .build()
        .expect("Failed to open fixture database")
}

/// Builds a friend record.
pub fn friend(name: &str, age: i64) -> Record {
    record! {
        "name" => name,
        "age" => age,
        "email" => format!("{}@example.com", name.to_lowercase()),
    }
}

/// Builds `n` distinct friend records.
pub fn friends(n: usize) -> Vec<Record> {
    (0..n)
        .map(|i| friend(&format!("Friend{i}"), 20 + (i % 50) as i64))
        .collect()
}

/// Opens a fixture database holding `n` friends with keys `1..=n`.
pub async fn seeded_friends_db(n: usize) -> Database {
    let db = friends_db();
    db.table(FRIENDS)
        .expect("Fixture table missing")
        .bulk_add(friends(n))
        .await
        .expect("Failed to seed friends");
    db
}

/// Installs a `writing` hook that keeps `tags` in sync with `name`: the
/// lower-cased words of the name.
pub fn install_name_tags_hook(table: &Table) -> Subscription {
    table.hook().writing(|mut record| {
        let tags: Vec<String> = record
            .get("name")
            .and_then(Value::as_text)
            .unwrap_or("")
            .split_whitespace()
            .map(str::to_lowercase)
            .collect();
        record.set("tags", tags);
        Ok(record)
    })
}

/// Hooks presenting the stored integer `field` as a `date` domain value.
///
/// - `reading` wraps the stored integer
/// - `updating` unwraps wrapped values in the requested changes
/// - `writing` unwraps a wrapped value left in the record
///
/// Returns the subscriptions in that order.
pub fn install_date_hooks(table: &Table, field: &'static str) -> [Subscription; 3] {
    let hooks = table.hook();
    let reading = hooks.reading(move |mut record| {
        if let Some(stored) = record.remove(field) {
            record.set(field, Value::wrapped(DATE_TAG, stored));
        }
        Ok(record)
    });
    let updating = hooks.updating(move |changes, _, _| {
        Ok(changes.value(field).and_then(Value::as_wrapped).map(|(_, payload)| {
            Modifications::new().set(field, payload.clone())
        }))
    });
    let writing = hooks.writing(move |mut record| {
        if let Some(value) = record.remove(field) {
            record.set(field, value.unwrap_tagged(DATE_TAG));
        }
        Ok(record)
    });
    [reading, updating, writing]
}

/// Builds a wrapped `date` value.
pub fn date(millis: i64) -> Value {
    Value::wrapped(DATE_TAG, millis)
}
