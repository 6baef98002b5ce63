//! Transaction ordering, isolation and failure reporting.

use quilldb_core::{record, AccessMode, CoreError, Key, Modifications, TransactionState, Value};
use quilldb_testkit::prelude::*;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::oneshot;

#[tokio::test]
async fn handled_operation_error_still_aborts_exactly_once() {
    init_logging();
    let db = friends_db();
    db.table(FRIENDS)
        .unwrap()
        .add(friend("Ada", 36))
        .await
        .unwrap();

    let op_errors = Arc::new(AtomicUsize::new(0));
    let seen = Arc::clone(&op_errors);
    let err = db
        .transaction(AccessMode::ReadWrite, &[FRIENDS], |tx| async move {
            let friends = tx.table(FRIENDS)?;
            friends.add(friend("Grace", 85)).await?;
            // Same email as Ada: the unique index rejects it.
            if let Err(err) = friends.add(friend("ada", 1)).await {
                assert!(matches!(err, CoreError::Constraint { .. }));
                seen.fetch_add(1, Ordering::SeqCst);
            }
            assert_eq!(tx.state(), TransactionState::Aborting);
            Ok(())
        })
        .await
        .unwrap_err();

    assert_eq!(op_errors.load(Ordering::SeqCst), 1);
    assert!(err.is_aborted());
    assert!(matches!(err.root_cause(), CoreError::Constraint { .. }));
    // Grace was rolled back along with the failed add.
    assert_eq!(db.table(FRIENDS).unwrap().count().await.unwrap(), 1);
}

#[tokio::test]
async fn later_failure_does_not_touch_committed_data() {
    let db = friends_db();

    let key = db
        .transaction(AccessMode::ReadWrite, &[FRIENDS], |tx| async move {
            tx.table(FRIENDS)?.add(friend("Ada", 36)).await
        })
        .await
        .unwrap();

    let chained = async {
        let friends = db.table(FRIENDS)?;
        let stored = friends.get(key.clone()).await?;
        assert!(stored.is_some());
        db.table("enemies")?;
        Ok::<_, CoreError>(())
    }
    .await;
    assert!(matches!(chained, Err(CoreError::UnknownTable { .. })));

    let stored = db.table(FRIENDS).unwrap().get(key).await.unwrap().unwrap();
    assert_eq!(stored.get("name"), Some(&Value::from("Ada")));
}

#[tokio::test]
async fn failure_reported_to_body_and_transaction() {
    let db = friends_db();
    let err = db
        .transaction(AccessMode::ReadWrite, &[NOTES], |tx| async move {
            let notes = tx.table(NOTES)?;
            // Outbound table: no key is a failure.
            notes.add(record! { "text" => "lost" }).await?;
            Ok(())
        })
        .await
        .unwrap_err();

    match err {
        CoreError::TransactionAborted { cause, .. } => {
            assert!(matches!(*cause, CoreError::MissingKey { .. }));
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn unawaited_operations_apply_in_issue_order() {
    let db = friends_db();
    db.transaction(AccessMode::ReadWrite, &[NOTES], |tx| async move {
        let notes = tx.table(NOTES)?;
        let _first = notes.put_with_key(record! { "v" => "a" }, 1);
        let _gone = notes.delete(1);
        let _last = notes.put_with_key(record! { "v" => "c" }, 1);

        let _kept = notes.put_with_key(record! { "v" => "x" }, 2);
        let _removed = notes.delete(2);
        Ok(())
    })
    .await
    .unwrap();

    let notes = db.table(NOTES).unwrap();
    let one = notes.get(1).await.unwrap().unwrap();
    assert_eq!(one.get("v"), Some(&Value::from("c")));
    assert!(notes.get(2).await.unwrap().is_none());
}

#[tokio::test]
async fn reads_issued_after_writes_see_them() {
    let db = friends_db();
    let seen = db
        .transaction(AccessMode::ReadWrite, &[NOTES], |tx| async move {
            let notes = tx.table(NOTES)?;
            let _write = notes.put_with_key(record! { "v" => 1 }, "k");
            let _update = notes.update("k", Modifications::new().set("v", 2));
            let read = notes.get("k");
            Ok(read.await?.and_then(|r| r.get("v").cloned()))
        })
        .await
        .unwrap();
    assert_eq!(seen, Some(Value::Integer(2)));
}

#[tokio::test]
async fn uncommitted_writes_are_invisible_outside() {
    let db = friends_db();
    let (written_tx, written_rx) = oneshot::channel();
    let (release_tx, release_rx) = oneshot::channel::<()>();

    let pending = db.transaction(AccessMode::ReadWrite, &[NOTES], |tx| async move {
        tx.table(NOTES)?
            .put_with_key(record! { "v" => "draft" }, "doc")
            .await?;
        let _ = written_tx.send(());
        let _ = release_rx.await;
        Ok(())
    });

    written_rx.await.unwrap();
    let notes = db.table(NOTES).unwrap();
    assert!(notes.get("doc").await.unwrap().is_none());

    release_tx.send(()).unwrap();
    pending.await.unwrap();
    assert!(notes.get("doc").await.unwrap().is_some());
}

#[tokio::test]
async fn concurrent_change_to_a_read_record_is_a_conflict() {
    let db = seeded_friends_db(1).await;
    let (read_tx, read_rx) = oneshot::channel();
    let (go_tx, go_rx) = oneshot::channel::<()>();

    let slow = db.transaction(AccessMode::ReadWrite, &[FRIENDS], |tx| async move {
        let friends = tx.table(FRIENDS)?;
        let before = friends.get(1).await?;
        let _ = read_tx.send(before.is_some());
        let _ = go_rx.await;
        friends
            .update(1, Modifications::new().set("age", 99))
            .await
    });

    assert!(read_rx.await.unwrap());
    let friends = db.table(FRIENDS).unwrap();
    friends
        .update(1, Modifications::new().set("age", 40))
        .await
        .unwrap();
    go_tx.send(()).unwrap();

    let err = slow.await.unwrap_err();
    assert!(err.is_aborted());
    assert!(matches!(err.root_cause(), CoreError::Conflict { .. }), "{err:?}");
    let stored = friends.get(1).await.unwrap().unwrap();
    assert_eq!(stored.get("age"), Some(&Value::Integer(40)));
}

#[tokio::test]
async fn tables_outside_scope_are_rejected() {
    let db = friends_db();
    let err = db
        .transaction(AccessMode::ReadOnly, &[FRIENDS], |tx| async move {
            tx.table(NOTES)?;
            Ok(())
        })
        .await
        .unwrap_err();
    assert!(matches!(err.root_cause(), CoreError::TableNotInScope { .. }));
}

#[tokio::test]
async fn body_abort_rolls_back() {
    let db = friends_db();
    let err = db
        .transaction(AccessMode::ReadWrite, &[FRIENDS], |tx| async move {
            tx.table(FRIENDS)?.add(friend("Ada", 36)).await?;
            tx.abort();
            Ok(())
        })
        .await
        .unwrap_err();
    assert!(matches!(err.root_cause(), CoreError::AbortRequested));
    assert_eq!(db.table(FRIENDS).unwrap().count().await.unwrap(), 0);
}

#[tokio::test]
async fn disabled_implicit_transactions_require_a_binding() {
    let db = friends_db_with(quilldb_core::Config::default().implicit_transactions(false));
    let friends = db.table(FRIENDS).unwrap();
    let err = friends.add(friend("Ada", 36)).await.unwrap_err();
    assert!(matches!(err, CoreError::NoTransaction { .. }));

    let key = db
        .transaction(AccessMode::ReadWrite, &[FRIENDS], |tx| async move {
            tx.table(FRIENDS)?.add(friend("Ada", 36)).await
        })
        .await
        .unwrap();
    let count = db
        .transaction(AccessMode::ReadOnly, &[FRIENDS], |tx| async move {
            tx.table(FRIENDS)?.count().await
        })
        .await
        .unwrap();
    assert_eq!(count, 1);
    assert!(friends.get(key).await.is_err());
}

#[tokio::test]
async fn panicking_hook_fails_the_transaction() {
    let db = friends_db();
    let notes = db.table(NOTES).unwrap();
    notes.hook().writing(|r| {
        if r.get("v") == Some(&Value::Integer(2)) {
            panic!("writing hook blew up");
        }
        Ok(r)
    });

    let err = db
        .transaction(AccessMode::ReadWrite, &[NOTES], |tx| async move {
            let notes = tx.table(NOTES)?;
            let _first = notes.put_with_key(record! { "v" => 1 }, 1);
            let second = notes.put_with_key(record! { "v" => 2 }, 2).await;
            assert!(matches!(second, Err(CoreError::TaskFailed { .. })), "{second:?}");
            Ok(())
        })
        .await
        .unwrap_err();

    assert!(err.is_aborted());
    assert!(matches!(err.root_cause(), CoreError::TaskFailed { .. }), "{err:?}");
    assert_eq!(notes.count().await.unwrap(), 0);
}

#[tokio::test]
async fn panicking_nested_body_fails_the_parent() {
    let db = friends_db();
    let err = db
        .transaction(AccessMode::ReadWrite, &[FRIENDS], |tx| async move {
            tx.table(FRIENDS)?.add(friend("Ada", 36)).await?;
            let nested = tx
                .transaction(AccessMode::ReadWrite, &[FRIENDS], |inner| async move {
                    let key = inner.table(FRIENDS)?.add(friend("Grace", 85)).await?;
                    if key != Key::Integer(0) {
                        panic!("nested body blew up");
                    }
                    Ok(())
                })
                .await;
            assert!(matches!(nested, Err(CoreError::TaskFailed { .. })), "{nested:?}");
            Ok(())
        })
        .await
        .unwrap_err();

    assert!(matches!(err.root_cause(), CoreError::TaskFailed { .. }), "{err:?}");
    assert_eq!(db.table(FRIENDS).unwrap().count().await.unwrap(), 0);
}
