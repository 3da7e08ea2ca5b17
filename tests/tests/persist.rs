//! Create and update through the persist operation.

use keel_tests::prelude::*;

mod create {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_post_with_tags_is_saved_and_synced() {
        // GIVEN
        let mut harness = Harness::new().unwrap();
        let input = attrs! {
            "title" => "Hello World",
            "body" => "A first post about relations",
            "author" => 2i64,
            "tags" => vec![1i64, 2],
            "tags_pivot" => attrs! { "role" => "primary" },
        };

        // WHEN
        let (result, state) = harness.persist_tracked("posts", None, input);

        // THEN
        let post = result.unwrap();
        let id = post.id.unwrap();
        assert_eq!(state, PersistState::Completed);
        assert_eq!(post.get_attr("slug"), Some(&Value::from("hello-world")));
        assert_eq!(post.get_attr("author_id"), Some(&Value::from(EntityId::new(2))));
        assert_eq!(harness.tag_ids(id), ids(&[1, 2]));
        for row in harness.post_tag_rows(id) {
            assert_eq!(row.get("role"), Some(&Value::from("primary")));
        }

        let events = harness.log.events();
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].kind, ActionKind::Create);
        assert_eq!(events[1].kind, ActionKind::Sync);
        assert_eq!(events[1].relation.as_deref(), Some("tags"));
        assert_eq!(events[0].batch_id, events[1].batch_id);
    }

    #[test]
    fn test_over_limit_tags_abort_the_whole_create() {
        // GIVEN
        let mut harness = Harness::new().unwrap();
        let input = attrs! { "title" => "Too many tags", "tags" => vec![1i64, 2, 3, 4] };

        // WHEN
        let (result, state) = harness.persist_tracked("posts", None, input);

        // THEN
        assert!(matches!(
            result,
            Err(PersistError::AttachmentLimitExceeded {
                current: 0,
                limit: 3,
                attempted: 4
            })
        ));
        assert_eq!(state, PersistState::Failed);
        assert_eq!(harness.count("posts"), 0);
        assert!(harness.store.pivot_rows("post_tag").is_empty());

        let event = harness.log.last().unwrap();
        assert_eq!(event.kind, ActionKind::Create);
        assert_eq!(event.status, ActionStatus::Failed);
    }

    #[test]
    fn test_computed_and_readonly_input_is_ignored() {
        let mut harness = Harness::new().unwrap();
        let input = attrs! {
            "title" => "Fill Rules",
            "excerpt" => "forged excerpt",
            "slug" => "forged-slug",
        };

        let post = harness.persist("posts", None, input).unwrap();

        assert_eq!(post.get_attr("excerpt"), None);
        assert_eq!(post.get_attr("slug"), Some(&Value::from("fill-rules")));
    }

    #[test]
    fn test_missing_title_is_a_validation_error() {
        let mut harness = Harness::new().unwrap();

        let err = harness
            .persist("posts", None, attrs! { "title" => "   " })
            .unwrap_err();

        assert!(matches!(err, PersistError::Validation(ref errors) if errors.has("title")));
        assert_eq!(harness.count("posts"), 0);
        assert!(harness.log.is_empty());
    }

    #[test]
    fn test_unknown_tag_is_a_validation_error() {
        let mut harness = Harness::new().unwrap();

        let err = harness
            .persist("posts", None, attrs! { "title" => "Hi", "tags" => vec![1i64, 99] })
            .unwrap_err();

        assert!(matches!(err, PersistError::Validation(ref errors) if errors.has("tags")));
        assert_eq!(harness.count("posts"), 0);
    }

    #[test]
    fn test_unknown_morph_alias_fails_validation() {
        let mut harness = Harness::new().unwrap();
        let input = attrs! {
            "body" => "Nice",
            "commentable_type" => "podcast",
            "commentable" => 1i64,
        };

        let err = harness.persist("comments", None, input).unwrap_err();

        assert!(matches!(
            err,
            PersistError::Validation(ref errors) if errors.has("commentable_type")
        ));
    }

    #[test]
    fn test_comment_on_video_stores_alias() {
        let mut harness = Harness::new().unwrap();
        let input = attrs! {
            "body" => "Great talk",
            "commentable_type" => "video",
            "commentable" => 1i64,
        };

        let comment = harness.persist("comments", None, input).unwrap();

        assert_eq!(comment.get_attr("commentable_type"), Some(&Value::from("video")));
        assert_eq!(comment.get_attr("commentable_id"), Some(&Value::from(1i64)));
    }
}

mod update {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_update_records_redacted_diff() {
        // GIVEN
        let mut harness = Harness::new().unwrap();
        let user = EntityId::new(1);

        // WHEN
        harness
            .persist("users", Some(user), attrs! { "name" => "Ada L.", "password" => "hunter2" })
            .unwrap();

        // THEN
        let event = harness.log.last().unwrap();
        assert_eq!(event.kind, ActionKind::Update);
        assert_eq!(event.target_id, Some(user));
        assert_eq!(event.original.get("name"), Some(&Value::from("Ada")));
        assert_eq!(event.changes.get("name"), Some(&Value::from("Ada L.")));
        assert_eq!(event.changes.get("password"), Some(&Value::from("********")));
        assert!(!event.changes.contains_key("email"));
    }

    #[test]
    fn test_update_without_tags_key_keeps_tags() {
        let mut harness = Harness::new().unwrap();
        let post = harness.create_post("Kept").unwrap();
        harness.link_tags(post, &[(1, None), (2, None)]).unwrap();

        harness
            .persist("posts", Some(post), attrs! { "title" => "Kept, renamed" })
            .unwrap();

        assert_eq!(harness.tag_ids(post), ids(&[1, 2]));
        assert_eq!(harness.log.len(), 1);
    }

    #[test]
    fn test_update_with_tags_replaces_membership() {
        let mut harness = Harness::new().unwrap();
        let post = harness.create_post("Retag").unwrap();
        harness.link_tags(post, &[(6, None), (7, None)]).unwrap();

        harness
            .persist("posts", Some(post), attrs! { "title" => "Retag", "tags" => vec![5i64, 6] })
            .unwrap();

        assert_eq!(harness.tag_ids(post), ids(&[5, 6]));
    }

    #[test]
    fn test_missing_entity_is_not_found() {
        let mut harness = Harness::new().unwrap();

        let err = harness
            .persist("posts", Some(EntityId::new(404)), attrs! { "title" => "Ghost" })
            .unwrap_err();

        assert!(matches!(err, PersistError::NotFound { .. }));
        assert!(err.is_client_error());
    }
}

mod authorization {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_denied_create_writes_nothing() {
        let mut harness = Harness::new()
            .unwrap()
            .with_gate(|ability: Ability, _: &Entity, _: &RequestContext| {
                ability != Ability::Create
            });

        let (result, state) = harness.persist_tracked(
            "posts",
            None,
            attrs! { "title" => "Nope", "tags" => vec![1i64] },
        );

        assert!(matches!(result, Err(PersistError::Authorization)));
        assert_eq!(state, PersistState::Failed);
        assert_eq!(harness.count("posts"), 0);
        assert!(harness.log.is_empty());
    }

    #[test]
    fn test_actor_is_recorded() {
        let mut harness = Harness::new().unwrap();
        let ctx = RequestContext::new(attrs! { "title" => "Signed" }).with_actor(EntityId::new(2));

        let mut operation = keel_persist::PersistOperation::new(
            &mut harness.store,
            &harness.registry,
            &AllowAll,
            &harness.log,
        );
        operation.handle(&ctx, "posts", None).unwrap();

        assert_eq!(harness.log.last().unwrap().actor_id, Some(EntityId::new(2)));
    }
}
