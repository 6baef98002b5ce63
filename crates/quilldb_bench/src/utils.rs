//! Benchmark utilities.

use quilldb_core::{record, Database, Record};
use rand::Rng;

/// Name of the benchmark table.
pub const PEOPLE: &str = "people";

/// Schema of the benchmark table.
pub const PEOPLE_SCHEMA: &str = "++id, name, age, *tags";

const WORDS: &[&str] = &[
    "ada", "alan", "barbara", "edsger", "grace", "john", "ken", "linus", "margaret", "niklaus",
];

/// Generate a random person record with a multi-word name.
pub fn random_person() -> Record {
    let mut rng = rand::thread_rng();
    let words = rng.gen_range(1..=3);
    let name: Vec<&str> = (0..words)
        .map(|_| WORDS[rng.gen_range(0..WORDS.len())])
        .collect();
    record! {
        "name" => name.join(" "),
        "age" => rng.gen_range(18..90i64),
        "counter" => 0,
    }
}

/// Generate `count` random person records.
pub fn generate_people(count: usize) -> Vec<Record> {
    (0..count).map(|_| random_person()).collect()
}

/// Open an in-memory database holding the benchmark table.
pub fn open_db() -> Database {
    Database::open_in_memory(&[(PEOPLE, PEOPLE_SCHEMA)]).expect("Failed to open database")
}

/// Build a current-thread runtime for driving requests.
pub fn runtime() -> tokio::runtime::Runtime {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .expect("Failed to build runtime")
}
