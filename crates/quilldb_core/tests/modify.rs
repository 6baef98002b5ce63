//! Batched modify, update and index queries.

use proptest::prelude::*;
use quilldb_core::{
    record, AccessMode, BoxError, Config, CoreError, Key, Modifications, Record, Value,
};
use quilldb_testkit::prelude::*;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

fn bump(record: &mut Record) {
    let value = record.get("value").and_then(Value::as_integer).unwrap_or(0);
    record.set("value", value + 1);
}

fn counters(n: i64) -> Vec<Record> {
    (0..n).map(|i| record! { "id" => i, "value" => 0 }).collect()
}

#[tokio::test]
async fn queued_modifies_on_one_key_all_apply() {
    init_logging();
    let db = friends_db_with(Config::default().chunk_size(50));
    let table = db.table(COUNTERS).unwrap();
    table.add(record! { "id" => "c", "value" => 0 }).await.unwrap();

    let seen = db
        .transaction(AccessMode::ReadWrite, &[COUNTERS], |tx| async move {
            let table = tx.table(COUNTERS)?;
            for _ in 0..2500 {
                let _ = table.where_key().equals("c").modify(bump);
            }
            let after = table.get("c").await?;
            Ok(after.and_then(|r| r.get("value").and_then(Value::as_integer)))
        })
        .await
        .unwrap();
    assert_eq!(seen, Some(2500));

    let stored = table.get("c").await.unwrap().unwrap();
    assert_eq!(stored.get("value"), Some(&Value::Integer(2500)));
}

#[tokio::test]
async fn large_modify_lets_other_tasks_run() {
    let db = friends_db_with(Config::default().chunk_size(50).yield_between_chunks(true));
    let table = db.table(COUNTERS).unwrap();
    table.bulk_add(counters(3000)).await.unwrap();

    let stop = Arc::new(AtomicBool::new(false));
    let ticks = Arc::new(AtomicUsize::new(0));
    let ticker = {
        let stop = Arc::clone(&stop);
        let ticks = Arc::clone(&ticks);
        tokio::spawn(async move {
            while !stop.load(Ordering::SeqCst) {
                ticks.fetch_add(1, Ordering::SeqCst);
                tokio::task::yield_now().await;
            }
        })
    };

    let before = ticks.load(Ordering::SeqCst);
    let modified = table.to_collection().modify(bump).await.unwrap();
    let during = ticks.load(Ordering::SeqCst) - before;
    stop.store(true, Ordering::SeqCst);
    ticker.await.unwrap();

    assert_eq!(modified, 3000);
    assert!(during >= 5, "ticker advanced only {during} times");
    let total: i64 = table
        .to_array()
        .await
        .unwrap()
        .iter()
        .filter_map(|r| r.get("value").and_then(Value::as_integer))
        .sum();
    assert_eq!(total, 3000);
}

#[tokio::test]
async fn async_mutator_keeps_the_transaction_open() {
    let db = friends_db_with(Config::default().chunk_size(4));
    let table = db.table(COUNTERS).unwrap();
    table.bulk_add(counters(10)).await.unwrap();

    let (modified, total) = db
        .transaction(AccessMode::ReadWrite, &[COUNTERS], |tx| async move {
            let table = tx.table(COUNTERS)?;
            let modified = table
                .to_collection()
                .modify_async(|mut r| async move {
                    tokio::time::sleep(std::time::Duration::from_millis(1)).await;
                    bump(&mut r);
                    Ok::<_, BoxError>(r)
                })
                .await?;
            let followup = table.where_key().below(5).modify(bump).await?;
            assert_eq!(followup, 5);
            let total: i64 = table
                .to_array()
                .await?
                .iter()
                .filter_map(|r| r.get("value").and_then(Value::as_integer))
                .sum();
            Ok((modified, total))
        })
        .await
        .unwrap();
    assert_eq!(modified, 10);
    assert_eq!(total, 15);

    let stored = table.get(0).await.unwrap().unwrap();
    assert_eq!(stored.get("value"), Some(&Value::Integer(2)));
}

#[tokio::test]
async fn per_record_descriptors_from_modify_map() {
    let db = seeded_friends_db(10).await;
    let friends = db.table(FRIENDS).unwrap();
    let n = friends
        .to_collection()
        .modify_map(|r| {
            let id = r.get("id").and_then(Value::as_integer)?;
            (id % 3 == 0).then(|| Modifications::new().set("age", id * 100))
        })
        .await
        .unwrap();
    assert_eq!(n, 10);
    assert_eq!(friends.where_field("age").above_or_equal(300).count().await.unwrap(), 3);
}

#[tokio::test]
async fn update_of_missing_key_is_not_a_failure() {
    let db = friends_db();
    let (missing, key) = db
        .transaction(AccessMode::ReadWrite, &[FRIENDS], |tx| async move {
            let friends = tx.table(FRIENDS)?;
            let missing = friends
                .update(404, Modifications::new().set("age", 1))
                .await?;
            let key = friends.add(friend("Ada", 36)).await?;
            Ok((missing, key))
        })
        .await
        .unwrap();
    assert_eq!(missing, 0);
    assert!(db.table(FRIENDS).unwrap().get(key).await.unwrap().is_some());
}

#[tokio::test]
async fn failing_mutator_changes_nothing() {
    let db = seeded_friends_db(10).await;
    let friends = db.table(FRIENDS).unwrap();

    let err = friends
        .to_collection()
        .try_modify(|r| {
            if r.get("id") == Some(&Value::Integer(7)) {
                return Err("seven".into());
            }
            r.set("age", 0);
            Ok(())
        })
        .await
        .unwrap_err();
    assert!(matches!(err, CoreError::MutatorFailed { .. }), "{err:?}");
    assert_eq!(friends.where_field("age").equals(0).count().await.unwrap(), 0);
}

#[tokio::test]
async fn modify_with_descriptor_and_filters() {
    let db = seeded_friends_db(20).await;
    let friends = db.table(FRIENDS).unwrap();

    let n = friends
        .where_field("age")
        .below(30)
        .filter(|r| r.get("id").and_then(Value::as_integer).is_some_and(|id| id % 2 == 0))
        .modify_with(Modifications::new().set("even", true).remove("email"))
        .await
        .unwrap();
    assert_eq!(n, 5);

    let even = friends
        .filter(|r| r.contains("even"))
        .to_array()
        .await
        .unwrap();
    assert_eq!(even.len(), 5);
    assert!(even.iter().all(|r| !r.contains("email")));

    let limited = friends.to_collection().limit(3).delete().await.unwrap();
    assert_eq!(limited, 3);
    assert_eq!(friends.count().await.unwrap(), 17);
}

#[tokio::test]
async fn modify_that_changes_the_key_moves_the_record() {
    let db = friends_db();
    let table = db.table(COUNTERS).unwrap();
    table.bulk_add(counters(3)).await.unwrap();

    table
        .where_key()
        .equals(1)
        .modify(|r| {
            r.set("id", 100);
        })
        .await
        .unwrap();

    assert!(table.get(1).await.unwrap().is_none());
    assert!(table.get(100).await.unwrap().is_some());
    assert_eq!(
        table.to_collection().primary_keys().await.unwrap(),
        vec![Key::Integer(0), Key::Integer(2), Key::Integer(100)]
    );
}

#[tokio::test]
async fn where_clause_operators() {
    let db = seeded_friends_db(10).await;
    let friends = db.table(FRIENDS).unwrap();

    assert_eq!(friends.where_field("age").any_of(Vec::<i64>::new()).count().await.unwrap(), 0);
    assert_eq!(friends.where_field("age").any_of([20, 21, 99]).count().await.unwrap(), 2);
    assert_eq!(friends.where_field("age").between(22, 25).count().await.unwrap(), 3);
    assert_eq!(friends.where_field("age").above_or_equal(28).count().await.unwrap(), 2);
    assert_eq!(friends.where_field("name").starts_with("Friend").count().await.unwrap(), 10);
    assert_eq!(friends.where_key().below_or_equal(3).count().await.unwrap(), 3);
    let first = friends.where_field("age").above(25).first().await.unwrap().unwrap();
    assert_eq!(first.get("age"), Some(&Value::Integer(26)));

    let err = friends.where_field("nickname").equals("x").count().await.unwrap_err();
    assert!(matches!(err, CoreError::Query { .. }));
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(24))]

    #[test]
    fn any_of_counts_matching_ages(ages in prop::collection::vec(15i64..80, 0..6)) {
        let rt = tokio::runtime::Builder::new_current_thread().enable_all().build().unwrap();
        let (count, expected) = rt.block_on(async {
            let db = seeded_friends_db(60).await;
            let friends = db.table(FRIENDS).unwrap();
            let all = friends.to_array().await.unwrap();
            let expected = all
                .iter()
                .filter(|r| {
                    r.get("age")
                        .and_then(Value::as_integer)
                        .is_some_and(|age| ages.contains(&age))
                })
                .count();
            let count = friends.where_field("age").any_of(ages.clone()).count().await.unwrap();
            (count, expected)
        });
        prop_assert_eq!(count, expected);
    }
}
