//! A failure anywhere inside the transactional window leaves no trace.

use keel_tests::prelude::*;
use pretty_assertions::assert_eq;

fn failing(point: FailPoint) -> Harness<FailingStore> {
    let store = FailingStore::new(seeded_store().unwrap(), point);
    Harness::with_store(store).unwrap()
}

#[test]
fn test_failed_sync_rolls_back_create() {
    // GIVEN
    let mut harness = failing(FailPoint::PivotInsert("post_tag".into()));

    // WHEN
    let (result, state) = harness.persist_tracked(
        "posts",
        None,
        attrs! { "title" => "Doomed", "tags" => vec![1i64, 2] },
    );

    // THEN
    let correlation_id = match result {
        Err(PersistError::Persistence { correlation_id, .. }) => correlation_id,
        other => panic!("expected persistence failure, got {:?}", other),
    };
    assert_eq!(state, PersistState::Failed);
    assert_eq!(harness.store.failures(), 1);
    assert!(harness.store.inner().all("posts").is_empty());
    assert!(harness.store.inner().pivot_rows("post_tag").is_empty());

    let event = harness.log.last().unwrap();
    assert_eq!(event.status, ActionStatus::Failed);
    assert_eq!(event.batch_id.0, correlation_id);
    assert!(event.exception.as_deref().unwrap_or("").contains("injected failure"));
}

#[test]
fn test_failed_sync_restores_updated_attributes() {
    let mut harness = failing(FailPoint::PivotInsert("post_tag".into()));
    let post = harness.create_post("Original").unwrap();

    let result = harness.persist(
        "posts",
        Some(post),
        attrs! { "title" => "Rewritten", "tags" => vec![3i64] },
    );

    assert!(result.is_err());
    let stored = harness.load("posts", post).unwrap();
    assert_eq!(stored.get_attr("title"), Some(&Value::from("Original")));
    assert_eq!(stored.get_attr("slug"), None);
}

#[test]
fn test_failed_save_records_nothing_but_the_failure() {
    let mut harness = failing(FailPoint::Save("posts".into()));

    let result = harness.persist("posts", None, attrs! { "title" => "Unsaved" });

    assert!(matches!(result, Err(PersistError::Persistence { .. })));
    assert_eq!(harness.log.len(), 1);
    assert!(harness.log.last().unwrap().is_failed());
}

#[test]
fn test_failed_commit_rolls_back() {
    let mut harness = failing(FailPoint::Commit);

    let result =
        harness.persist("posts", None, attrs! { "title" => "Almost", "tags" => vec![1i64] });

    assert!(result.is_err());
    assert!(harness.store.inner().all("posts").is_empty());
    assert!(harness.store.inner().pivot_rows("post_tag").is_empty());
    assert!(!harness.store.in_transaction());
    assert_eq!(harness.log.len(), 1);
    assert!(harness.log.events().iter().all(|event| event.is_failed()));
}

#[test]
fn test_partial_sync_is_undone() {
    // GIVEN
    let mut harness = failing(FailPoint::PivotInsert("post_tag".into()));
    let post = harness.create_post("Half synced").unwrap();
    harness.link_tags(post, &[(6, None), (7, None)]).unwrap();

    // WHEN
    let envelope = harness.handler().sync(
        &RequestContext::new(Attributes::new()),
        Target::new("posts", post, "tags"),
        &ids(&[5, 6]),
        &PivotData::None,
        true,
    );

    // THEN
    EnvelopeAssertion::new()
        .failure()
        .message_contains("could not be completed")
        .has_data("correlationId")
        .verify("sync", &envelope)
        .unwrap();
    assert_eq!(harness.tag_ids(post), ids(&[6, 7]));

    let event = harness.log.last().unwrap();
    assert_eq!(event.kind, ActionKind::Sync);
    assert!(event.is_failed());
    assert_eq!(
        envelope.data["correlationId"],
        serde_json::json!(event.batch_id.0.to_string())
    );
}
