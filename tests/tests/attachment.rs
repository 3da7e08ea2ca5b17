//! Attach, detach, sync and attachable listings through the handler.

use std::collections::BTreeMap;

use keel_tests::prelude::*;

fn ctx() -> RequestContext {
    RequestContext::new(Attributes::new())
}

mod attach {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_attach_is_idempotent() {
        // GIVEN
        let mut harness = Harness::new().unwrap();
        let post = harness.create_post("Idempotent").unwrap();
        let target = Target::new("posts", post, "tags");

        // WHEN
        let first = harness.handler().attach(&ctx(), target, &ids(&[1, 2]), &PivotData::None);
        let second = harness.handler().attach(&ctx(), target, &ids(&[2, 3]), &PivotData::None);

        // THEN
        EnvelopeAssertion::new()
            .success()
            .message("Attached 2 records.")
            .data("alreadyAttached", 0)
            .verify("first attach", &first)
            .unwrap();
        EnvelopeAssertion::new()
            .success()
            .message("Attached 1 record.")
            .data("attached", serde_json::json!([3]))
            .data("alreadyAttached", 1)
            .verify("second attach", &second)
            .unwrap();
        assert_eq!(harness.tag_ids(post), ids(&[1, 2, 3]));
        assert_eq!(harness.post_tag_rows(post).len(), 3);
    }

    #[test]
    fn test_limit_counts_only_new_ids() {
        // GIVEN
        let mut harness = Harness::new().unwrap();
        let post = harness.create_post("Limited").unwrap();
        harness.link_tags(post, &[(1, None), (2, None)]).unwrap();
        let target = Target::new("posts", post, "tags");

        // WHEN
        let rejected = harness.handler().attach(&ctx(), target, &ids(&[2, 3, 4]), &PivotData::None);
        let accepted = harness.handler().attach(&ctx(), target, &ids(&[1, 3]), &PivotData::None);

        // THEN
        EnvelopeAssertion::new()
            .failure()
            .message("Cannot attach more than 3 related records.")
            .data("current", 2)
            .data("limit", 3)
            .data("attempted", 2)
            .verify("over limit", &rejected)
            .unwrap();
        EnvelopeAssertion::new()
            .success()
            .data("alreadyAttached", 1)
            .verify("within limit", &accepted)
            .unwrap();
        assert_eq!(harness.tag_ids(post), ids(&[1, 2, 3]));
    }

    #[test]
    fn test_only_declared_pivot_columns_are_written() {
        let mut harness = Harness::new().unwrap();
        let post = harness.create_post("Pivot").unwrap();
        let pivot = PivotData::Uniform(attrs! { "role" => "lead", "is_admin" => true });

        let envelope = harness.handler().attach(
            &ctx(),
            Target::new("posts", post, "tags"),
            &ids(&[4]),
            &pivot,
        );

        assert!(envelope.success);
        let rows = harness.post_tag_rows(post);
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].get("role"), Some(&Value::from("lead")));
        assert!(!rows[0].contains_key("is_admin"));
    }

    #[test]
    fn test_missing_related_writes_nothing() {
        let mut harness = Harness::new().unwrap();
        let post = harness.create_post("Missing").unwrap();

        let result = harness.handler().try_attach(
            &ctx(),
            Target::new("posts", post, "tags"),
            &ids(&[1, 99]),
            &PivotData::None,
        );

        assert!(matches!(result, Err(PersistError::Persistence { .. })));
        assert!(harness.tag_ids(post).is_empty());
    }

    #[test]
    fn test_has_many_attach_sets_foreign_key() {
        let mut harness = Harness::new().unwrap();
        let post = harness.create_post("Owner").unwrap();
        let mut comment = Entity::new("comments").with_attributes(attrs! { "body" => "Orphan" });
        let comment_id = harness.store.save(&mut comment).unwrap();

        let envelope = harness.handler().attach(
            &ctx(),
            Target::new("posts", post, "comments"),
            &[comment_id],
            &PivotData::None,
        );

        assert!(envelope.success);
        let comment = harness.load("comments", comment_id).unwrap();
        assert_eq!(comment.get_attr("post_id"), Some(&Value::from(post)));
    }

    #[test]
    fn test_morph_to_many_stores_parent_alias() {
        let mut harness = Harness::new().unwrap();

        let envelope = harness.handler().attach(
            &ctx(),
            Target::new("videos", EntityId::new(1), "tags"),
            &ids(&[1]),
            &PivotData::None,
        );

        assert!(envelope.success);
        let rows = harness.store.pivot_rows("taggables");
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].get("taggable_type"), Some(&Value::from("video")));
        assert_eq!(rows[0].get("taggable_id"), Some(&Value::from(1i64)));
    }
}

mod detach {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_detach_removes_only_named_ids() {
        let mut harness = Harness::new().unwrap();
        let post = harness.create_post("Detach").unwrap();
        harness.link_tags(post, &[(1, None), (2, None), (3, None)]).unwrap();

        let envelope = harness.handler().detach(
            &ctx(),
            Target::new("posts", post, "tags"),
            &ids(&[2, 5]),
        );

        EnvelopeAssertion::new()
            .success()
            .message("Detached 1 record.")
            .data("detached", 1)
            .verify("detach", &envelope)
            .unwrap();
        assert_eq!(harness.tag_ids(post), ids(&[1, 3]));

        let event = harness.log.last().unwrap();
        assert_eq!(event.kind, ActionKind::Detach);
        assert_eq!(event.changes.get("detached"), Some(&Value::from(ids(&[2]))));
    }
}

mod sync {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_sync_replaces_membership() {
        // GIVEN
        let mut harness = Harness::new().unwrap();
        let post = harness.create_post("Sync").unwrap();
        harness.link_tags(post, &[(6, None), (7, None)]).unwrap();
        let pivot = PivotData::PerId(BTreeMap::from([(
            EntityId::new(5),
            attrs! { "role" => "editor" },
        )]));

        // WHEN
        let changes = harness
            .handler()
            .try_sync(&ctx(), Target::new("posts", post, "tags"), &ids(&[5, 6]), &pivot, true)
            .unwrap();

        // THEN
        assert_eq!(
            changes,
            ChangeSet {
                attached: ids(&[5]),
                detached: ids(&[7]),
                updated: vec![],
            }
        );
        assert_eq!(harness.tag_ids(post), ids(&[5, 6]));
        let editor = harness
            .post_tag_rows(post)
            .into_iter()
            .find(|row| row.get("tag_id") == Some(&Value::from(5i64)))
            .unwrap();
        assert_eq!(editor.get("role"), Some(&Value::from("editor")));
    }

    #[test]
    fn test_sync_updates_changed_pivot_values() {
        let mut harness = Harness::new().unwrap();
        let post = harness.create_post("Roles").unwrap();
        harness.link_tags(post, &[(1, Some("lead")), (2, Some("lead"))]).unwrap();

        let envelope = harness.handler().sync(
            &ctx(),
            Target::new("posts", post, "tags"),
            &ids(&[1, 2]),
            &PivotData::Uniform(attrs! { "role" => "lead" }),
            true,
        );
        let changed = harness.handler().sync(
            &ctx(),
            Target::new("posts", post, "tags"),
            &ids(&[1, 2]),
            &PivotData::PerId(BTreeMap::from([(EntityId::new(2), attrs! { "role" => "backup" })])),
            true,
        );

        EnvelopeAssertion::new()
            .success()
            .message("Synced: 0 attached, 0 detached, 0 updated.")
            .verify("unchanged sync", &envelope)
            .unwrap();
        EnvelopeAssertion::new()
            .success()
            .data("updated", serde_json::json!([2]))
            .verify("changed sync", &changed)
            .unwrap();
    }

    #[test]
    fn test_sync_without_detaching_keeps_existing() {
        let mut harness = Harness::new().unwrap();
        let post = harness.create_post("Additive").unwrap();
        harness.link_tags(post, &[(1, None)]).unwrap();

        let changes = harness
            .handler()
            .try_sync(
                &ctx(),
                Target::new("posts", post, "tags"),
                &ids(&[2]),
                &PivotData::None,
                false,
            )
            .unwrap();

        assert_eq!(changes.attached, ids(&[2]));
        assert!(changes.detached.is_empty());
        assert_eq!(harness.tag_ids(post), ids(&[1, 2]));
    }

    #[test]
    fn test_sync_over_limit_changes_nothing() {
        let mut harness = Harness::new().unwrap();
        let post = harness.create_post("Crowded").unwrap();
        harness.link_tags(post, &[(1, None)]).unwrap();

        let envelope = harness.handler().sync(
            &ctx(),
            Target::new("posts", post, "tags"),
            &ids(&[1, 2, 3, 4]),
            &PivotData::None,
            true,
        );

        EnvelopeAssertion::new()
            .failure()
            .data("current", 1)
            .data("limit", 3)
            .data("attempted", 4)
            .verify("sync over limit", &envelope)
            .unwrap();
        assert_eq!(harness.tag_ids(post), ids(&[1]));
    }

    #[test]
    fn test_sync_on_has_many_is_unsupported() {
        let mut harness = Harness::new().unwrap();
        let post = harness.create_post("Owned").unwrap();

        let envelope = harness.handler().sync(
            &ctx(),
            Target::new("posts", post, "comments"),
            &ids(&[1]),
            &PivotData::None,
            true,
        );

        EnvelopeAssertion::new()
            .failure()
            .message_contains("not supported")
            .no_data()
            .verify("owned sync", &envelope)
            .unwrap();
    }
}

mod attachable {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_listing_excludes_attached_and_searches() {
        // GIVEN
        let mut harness = Harness::new().unwrap();
        let post = harness.create_post("Listing").unwrap();
        harness.link_tags(post, &[(1, None), (7, None)]).unwrap();
        let target = Target::new("posts", post, "tags");

        // WHEN
        let all = harness.handler().list(&ctx(), target, &AttachableRequest::default()).unwrap();
        let envelope = harness
            .handler()
            .attachable(&ctx(), target, &AttachableRequest::default().search("a"));

        // THEN
        assert_eq!(all.ids(), ids(&[2, 3, 4, 5, 6]));
        assert_eq!(all.total, 5);
        EnvelopeAssertion::new()
            .success()
            .message("1 attachable record.")
            .data("total", 1)
            .data("items.0.id", 6)
            .data("items.0.label", "lua")
            .verify("search", &envelope)
            .unwrap();
    }

    #[test]
    fn test_listing_pages() {
        let mut harness = Harness::new().unwrap();
        let post = harness.create_post("Paging").unwrap();

        let page = harness
            .handler()
            .list(
                &ctx(),
                Target::new("posts", post, "tags"),
                &AttachableRequest::default().page(2).per_page(3),
            )
            .unwrap();

        assert_eq!(page.ids(), ids(&[4, 5, 6]));
        assert_eq!(page.total, 7);
        assert_eq!(page.page, 2);
    }
}

mod authorization {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_denied_attach_is_unauthorized() {
        let mut harness = Harness::new()
            .unwrap()
            .with_gate(|ability: Ability, _: &Entity, _: &RequestContext| {
                ability != Ability::Attach
            });
        let post = harness.create_post("Guarded").unwrap();

        let envelope = harness.handler().attach(
            &ctx(),
            Target::new("posts", post, "tags"),
            &ids(&[1]),
            &PivotData::None,
        );

        EnvelopeAssertion::new()
            .failure()
            .message("This action is unauthorized.")
            .no_data()
            .verify("attach", &envelope)
            .unwrap();
        assert!(harness.tag_ids(post).is_empty());
        assert!(harness.log.is_empty());
    }

    #[test]
    fn test_sync_with_detaching_needs_detach_ability() {
        let mut harness = Harness::new()
            .unwrap()
            .with_gate(|ability: Ability, _: &Entity, _: &RequestContext| {
                ability != Ability::Detach
            });
        let post = harness.create_post("Half").unwrap();
        let target = Target::new("posts", post, "tags");

        let detaching =
            harness.handler().try_sync(&ctx(), target, &ids(&[1]), &PivotData::None, true);
        let additive =
            harness.handler().try_sync(&ctx(), target, &ids(&[1]), &PivotData::None, false);

        assert!(matches!(detaching, Err(PersistError::Authorization)));
        assert_eq!(additive.unwrap().attached, ids(&[1]));
    }
}
