//! Reads, writes, cascades and hooks against a live database.

mod common;

use common::{child_of, count, note_of, parent, pool, unique, Audit, Note, Parent};
use record_store::prelude::*;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

fn sorted(mut notes: Vec<Note>) -> Vec<Note> {
    notes.sort_by(|a, b| a.id.cmp(&b.id));
    notes
}

#[tokio::test]
async fn create_then_find_by_id_round_trips() {
    let Some(pool) = pool().await else { return };

    let mut created = parent("round trip");
    created.child = Some(child_of(&created));
    created.notes = vec![note_of(&created, "one"), note_of(&created, "two")];
    ops::create(&pool, &mut created, &[], &[]).await.unwrap();

    let found = ops::find_by_id::<Parent, _, _>(&pool, created.id.as_str(), |q| {
        q.relation("child").relation("notes");
    })
    .await
    .unwrap();

    assert_eq!(found.id, created.id);
    assert_eq!(found.name, created.name);
    assert_eq!(found.child, created.child);
    assert_eq!(sorted(found.notes), sorted(created.notes.clone()));
}

#[tokio::test]
async fn relations_are_only_loaded_on_request() {
    let Some(pool) = pool().await else { return };

    let mut created = parent("lazy");
    created.child = Some(child_of(&created));
    ops::create(&pool, &mut created, &[], &[]).await.unwrap();

    let found = ops::find_by_id::<Parent, _, _>(&pool, created.id.as_str(), |_| {})
        .await
        .unwrap();
    assert!(found.child.is_none());
    assert!(found.notes.is_empty());
}

#[tokio::test]
async fn find_returns_empty_and_find_first_not_found() {
    let Some(pool) = pool().await else { return };

    let missing = unique("missing");
    let rows = ops::find::<Parent, _>(&pool, |q| {
        q.eq("id", missing.as_str());
    })
    .await
    .unwrap();
    assert!(rows.is_empty());

    let err = ops::find_first::<Parent, _>(&pool, |q| {
        q.eq("id", missing.as_str());
    })
    .await
    .unwrap_err();
    assert!(err.is_not_found());
}

#[tokio::test]
async fn find_filters_and_orders() {
    let Some(pool) = pool().await else { return };

    let name = unique("shared");
    let mut first = parent(&name);
    let mut second = parent(&name);
    ops::create(&pool, &mut first, &[], &[]).await.unwrap();
    ops::create(&pool, &mut second, &[], &[]).await.unwrap();

    let rows = ops::find::<Parent, _>(&pool, |q| {
        q.eq("name", name.as_str()).order_by("id", SortOrder::Desc);
    })
    .await
    .unwrap();

    let mut expected = vec![first.id.clone(), second.id.clone()];
    expected.sort();
    expected.reverse();
    assert_eq!(rows.into_iter().map(|p| p.id).collect::<Vec<_>>(), expected);
}

#[tokio::test]
async fn unknown_relations_are_rejected() {
    let Some(pool) = pool().await else { return };

    let err = ops::find::<Parent, _>(&pool, |q| {
        q.relation("nope");
    })
    .await
    .unwrap_err();
    assert!(matches!(err, StoreError::UnknownRelation { .. }));
}

#[tokio::test]
async fn update_of_missing_row_writes_nothing() {
    let Some(pool) = pool().await else { return };

    let mut ghost = parent("ghost");
    ghost.child = Some(child_of(&ghost));

    let err = ops::update(&pool, &mut ghost, &[], &[]).await.unwrap_err();
    assert!(err.is_update_not_exists());
    assert!(!err.is_not_found());

    assert_eq!(count(&pool, "ops_parents", &ghost.id).await, 0);
    assert_eq!(count(&pool, "ops_children", &ghost.id).await, 0);
}

#[tokio::test]
async fn update_then_delete_scenario() {
    let Some(pool) = pool().await else { return };

    let mut model = parent("");
    ops::create(&pool, &mut model, &[], &[]).await.unwrap();

    model.name = "x".to_string();
    ops::update(&pool, &mut model, &[], &[]).await.unwrap();
    let found = ops::find_by_id::<Parent, _, _>(&pool, model.id.as_str(), |_| {})
        .await
        .unwrap();
    assert_eq!(found.name, "x");

    ops::delete(&pool, &mut model, None, &[], &[]).await.unwrap();
    let err = ops::find_by_id::<Parent, _, _>(&pool, model.id.as_str(), |_| {})
        .await
        .unwrap_err();
    assert!(err.is_not_found());
}

#[tokio::test]
async fn cascade_replaces_related_rows() {
    let Some(pool) = pool().await else { return };

    let mut model = parent("cascade");
    model.child = Some(child_of(&model));
    model.notes = vec![note_of(&model, "a"), note_of(&model, "b")];
    ops::create(&pool, &mut model, &[], &[]).await.unwrap();

    // A related record with a new identity replaces the old one.
    let replacement = child_of(&model);
    model.child = Some(replacement.clone());
    model.notes = vec![note_of(&model, "c")];
    ops::update(&pool, &mut model, &[], &[]).await.unwrap();

    assert_eq!(count(&pool, "ops_children", &model.id).await, 1);
    assert_eq!(count(&pool, "ops_notes", &model.id).await, 1);

    let found = ops::find_by_id::<Parent, _, _>(&pool, model.id.as_str(), |q| {
        q.relation("child").relation("notes");
    })
    .await
    .unwrap();
    assert_eq!(found.child, Some(replacement));
    assert_eq!(found.notes.len(), 1);
    assert_eq!(found.notes[0].body, "c");

    // Clearing the field removes the related rows.
    model.child = None;
    model.notes.clear();
    ops::update(&pool, &mut model, &[], &[]).await.unwrap();
    assert_eq!(count(&pool, "ops_children", &model.id).await, 0);
    assert_eq!(count(&pool, "ops_notes", &model.id).await, 0);
}

#[tokio::test]
async fn delete_removes_related_rows() {
    let Some(pool) = pool().await else { return };

    let mut model = parent("doomed");
    model.child = Some(child_of(&model));
    model.notes = vec![note_of(&model, "a")];
    ops::create(&pool, &mut model, &[], &[]).await.unwrap();

    ops::delete(&pool, &mut model, None, &[], &[]).await.unwrap();

    assert_eq!(count(&pool, "ops_parents", &model.id).await, 0);
    assert_eq!(count(&pool, "ops_children", &model.id).await, 0);
    assert_eq!(count(&pool, "ops_notes", &model.id).await, 0);
}

#[tokio::test]
async fn delete_criteria_replace_the_primary_key_filter() {
    let Some(pool) = pool().await else { return };

    let name = unique("bulk");
    let mut first = parent(&name);
    let mut second = parent(&name);
    ops::create(&pool, &mut first, &[], &[]).await.unwrap();
    ops::create(&pool, &mut second, &[], &[]).await.unwrap();

    let by_name = name.clone();
    let criteria: DeleteCriteria<'_, Parent> = Box::new(move |q| {
        q.eq("name", by_name);
    });
    ops::delete(&pool, &mut first, Some(criteria), &[], &[])
        .await
        .unwrap();

    assert_eq!(count(&pool, "ops_parents", &first.id).await, 0);
    assert_eq!(count(&pool, "ops_parents", &second.id).await, 0);
}

#[tokio::test]
async fn failing_before_hook_stops_the_chain() {
    let Some(pool) = pool().await else { return };

    let b_ran = Arc::new(AtomicBool::new(false));
    let flag = Arc::clone(&b_ran);
    let before = vec![
        before_fn::<Parent, _>("a", |_conn, _model| {
            Box::pin(async { Err(anyhow::anyhow!("rejected")) })
        }),
        before_fn::<Parent, _>("b", move |_conn, _model| {
            flag.store(true, Ordering::SeqCst);
            Box::pin(async { Ok(()) })
        }),
    ];

    let mut model = parent("rejected");
    let err = ops::create(&pool, &mut model, &before, &[]).await.unwrap_err();

    assert!(matches!(
        &err,
        StoreError::Hook { operation: Operation::Create, hook, .. } if hook == "a"
    ));
    assert_eq!(err.hook_error().map(|e| e.to_string()), Some("rejected".to_string()));
    assert!(!b_ran.load(Ordering::SeqCst));
    assert_eq!(count(&pool, "ops_parents", &model.id).await, 0);
}

#[tokio::test]
async fn hooks_run_in_order_around_commit() {
    let Some(pool) = pool().await else { return };

    let events = Arc::new(Mutex::new(Vec::new()));
    let before_events = Arc::clone(&events);
    let after_a = Arc::clone(&events);
    let after_b = Arc::clone(&events);
    let visible_pool = pool.clone();
    let visible = Arc::new(AtomicBool::new(false));
    let visible_flag = Arc::clone(&visible);

    let before = vec![before_fn::<Parent, _>("rename", move |_conn, model| {
        before_events.lock().unwrap().push("before");
        model.name = "renamed".to_string();
        Box::pin(async { Ok(()) })
    })];
    let after = vec![
        after_fn::<Parent, _>("a", move |model| {
            after_a.lock().unwrap().push("after a");
            assert_eq!(model.name, "renamed");
        }),
        after_fn::<Parent, _>("b", move |_model| {
            after_b.lock().unwrap().push("after b");
        }),
        Arc::new(CommitWatcher {
            pool: visible_pool,
            seen: visible_flag,
        }) as SharedHook<Parent>,
    ];

    let mut model = parent("original");
    ops::create(&pool, &mut model, &before, &after).await.unwrap();

    assert_eq!(model.name, "renamed");
    assert_eq!(
        *events.lock().unwrap(),
        vec!["before", "after a", "after b"]
    );
    assert!(visible.load(Ordering::SeqCst));
}

/// After-hook checking the row is visible outside the write's transaction.
struct CommitWatcher {
    pool: PgPool,
    seen: Arc<AtomicBool>,
}

#[async_trait]
impl Hook<Parent> for CommitWatcher {
    fn name(&self) -> &str {
        "commit_watcher"
    }

    async fn after(&self, record: &Parent) -> anyhow::Result<()> {
        let found = ops::find_by_id::<Parent, _, _>(&self.pool, record.id.as_str(), |_| {})
            .await
            .is_ok();
        self.seen.store(found, Ordering::SeqCst);
        anyhow::ensure!(found, "row not visible after commit");
        Ok(())
    }
}

fn txid_hook<M: Record>(txids: Arc<Mutex<Vec<i64>>>) -> SharedHook<M> {
    before_fn::<M, _>("txid", move |conn, _record| {
        let txids = Arc::clone(&txids);
        Box::pin(async move {
            let txid: i64 = sqlx::query_scalar("SELECT txid_current()")
                .fetch_one(&mut *conn)
                .await?;
            txids.lock().unwrap().push(txid);
            Ok(())
        })
    })
}

fn audit_hook(txids: Arc<Mutex<Vec<i64>>>) -> SharedHook<Parent> {
    before_fn::<Parent, _>("audit", move |conn, model| {
        let mut audit = Audit {
            id: unique("audit"),
            parent_id: model.id.clone(),
        };
        let hooks = vec![txid_hook::<Audit>(Arc::clone(&txids))];
        Box::pin(async move {
            ops::create(&mut *conn, &mut audit, &hooks, &[]).await?;
            Ok(())
        })
    })
}

#[tokio::test]
async fn nested_writes_share_one_transaction() {
    let Some(pool) = pool().await else { return };

    let txids = Arc::new(Mutex::new(Vec::new()));
    let before = vec![
        txid_hook::<Parent>(Arc::clone(&txids)),
        audit_hook(Arc::clone(&txids)),
    ];

    let mut model = parent("audited");
    ops::create(&pool, &mut model, &before, &[]).await.unwrap();

    let txids = txids.lock().unwrap().clone();
    assert_eq!(txids.len(), 2);
    assert_eq!(txids[0], txids[1]);
    assert_eq!(count(&pool, "ops_audits", &model.id).await, 1);
}

#[tokio::test]
async fn nested_writes_roll_back_with_the_outer_write() {
    let Some(pool) = pool().await else { return };

    let before = vec![
        audit_hook(Arc::new(Mutex::new(Vec::new()))),
        before_fn::<Parent, _>("fail", |_conn, _model| {
            Box::pin(async { Err(anyhow::anyhow!("late failure")) })
        }),
    ];

    let mut model = parent("rolled back");
    assert!(ops::create(&pool, &mut model, &before, &[]).await.is_err());

    assert_eq!(count(&pool, "ops_parents", &model.id).await, 0);
    assert_eq!(count(&pool, "ops_audits", &model.id).await, 0);
}

#[tokio::test]
async fn trx_commits_on_success_and_rolls_back_on_error() {
    let Some(pool) = pool().await else { return };

    let mut kept = parent("kept");
    let kept_id = kept.id.clone();
    trx(&pool, |conn| {
        Box::pin(async move {
            ops::create(&mut *conn, &mut kept, &[], &[]).await?;
            Ok::<_, StoreError>(())
        })
    })
    .await
    .unwrap();
    assert_eq!(count(&pool, "ops_parents", &kept_id).await, 1);

    let mut dropped = parent("dropped");
    let dropped_id = dropped.id.clone();
    let result = trx(&pool, |conn| {
        Box::pin(async move {
            ops::create(&mut *conn, &mut dropped, &[], &[]).await?;
            Err::<(), _>(StoreError::UpdateNotExists)
        })
    })
    .await;
    assert!(result.is_err());
    assert_eq!(count(&pool, "ops_parents", &dropped_id).await, 0);
}

#[tokio::test]
async fn caller_transaction_is_joined_not_committed() {
    let Some(pool) = pool().await else { return };

    let mut model = parent("joined");
    let mut tx = pool.begin().await.unwrap();
    ops::create(&mut tx, &mut model, &[], &[]).await.unwrap();

    let inside = ops::find_by_id::<Parent, _, _>(&mut tx, model.id.as_str(), |_| {})
        .await
        .unwrap();
    assert_eq!(inside.id, model.id);
    assert_eq!(count(&pool, "ops_parents", &model.id).await, 0);

    tx.rollback().await.unwrap();
    assert_eq!(count(&pool, "ops_parents", &model.id).await, 0);
}

#[tokio::test]
async fn plain_connection_gets_its_own_transaction() {
    let Some(pool) = pool().await else { return };

    let mut first = parent("taken child");
    first.child = Some(child_of(&first));
    ops::create(&pool, &mut first, &[], &[]).await.unwrap();

    // The related insert collides with the existing child's primary key.
    let mut second = parent("collides");
    second.child = first.child.clone();

    let mut conn = pool.acquire().await.unwrap();
    let mut handle = Handle::from(&mut *conn);
    assert!(!handle.is_in_transaction());

    let err = ops::create(handle.reborrow(), &mut second, &[], &[])
        .await
        .unwrap_err();
    assert!(err.is_unique_violation());
    assert!(!handle.is_in_transaction());
    assert_eq!(count(&pool, "ops_parents", &second.id).await, 0);

    let mut third = parent("committed");
    ops::create(&mut *conn, &mut third, &[], &[]).await.unwrap();
    drop(conn);
    assert_eq!(count(&pool, "ops_parents", &third.id).await, 1);
}

#[tokio::test]
async fn open_transaction_is_reported_by_the_handle() {
    let Some(pool) = pool().await else { return };

    let mut tx = pool.begin().await.unwrap();
    assert!(Handle::from(&mut tx).is_in_transaction());
    assert!(!Handle::from(&pool).is_in_transaction());
    tx.rollback().await.unwrap();
}

#[tokio::test]
async fn skip_locked_reads_do_not_wait() {
    let Some(pool) = pool().await else { return };

    let mut model = parent("locked");
    ops::create(&pool, &mut model, &[], &[]).await.unwrap();

    let mut holder = pool.begin().await.unwrap();
    ops::find_by_id_for_update::<Parent, _, _>(&mut holder, model.id.as_str(), false, |_| {})
        .await
        .unwrap();

    let mut other = pool.begin().await.unwrap();
    let err = ops::find_by_id_for_update::<Parent, _, _>(&mut other, model.id.as_str(), true, |_| {})
        .await
        .unwrap_err();
    assert!(err.is_not_found());

    // Without SKIP LOCKED the read waits for the holder.
    let id = model.id.clone();
    let waiter = tokio::spawn({
        let pool = pool.clone();
        async move {
            let mut tx = pool.begin().await.unwrap();
            let row = ops::find_by_id_for_update::<Parent, _, _>(&mut tx, id.as_str(), false, |_| {})
                .await
                .unwrap();
            tx.commit().await.unwrap();
            row
        }
    });

    tokio::time::sleep(std::time::Duration::from_millis(200)).await;
    assert!(!waiter.is_finished());

    holder.rollback().await.unwrap();
    other.rollback().await.unwrap();
    let row = waiter.await.unwrap();
    assert_eq!(row.id, model.id);
}

#[tokio::test]
async fn local_parameters_apply_to_the_write_transaction() {
    let Some(pool) = pool().await else { return };

    let seen = Arc::new(Mutex::new(None));
    let seen_by_hook = Arc::clone(&seen);
    let before = vec![
        local_parameters::<Parent, _>(|model| {
            let mut parameters = std::collections::BTreeMap::new();
            parameters.insert("app.parent_name".to_string(), model.name.clone());
            parameters
        }),
        before_fn::<Parent, _>("read_setting", move |conn, _model| {
            let seen = Arc::clone(&seen_by_hook);
            Box::pin(async move {
                let value: Option<String> =
                    sqlx::query_scalar("SELECT current_setting('app.parent_name', true)")
                        .fetch_one(&mut *conn)
                        .await?;
                *seen.lock().unwrap() = value;
                Ok(())
            })
        }),
    ];

    let mut model = parent("configured");
    ops::create(&pool, &mut model, &before, &[]).await.unwrap();
    assert_eq!(seen.lock().unwrap().as_deref(), Some("configured"));

    // Settings do not leak past the transaction.
    let after: Option<String> =
        sqlx::query_scalar("SELECT NULLIF(current_setting('app.parent_name', true), '')")
            .fetch_one(&pool)
            .await
            .unwrap();
    assert_eq!(after, None);
}
