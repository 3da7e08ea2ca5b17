//! Field resolution and fill against the fixture domain.

use keel_tests::prelude::*;

fn resolve(harness: &Harness, entity: &Entity, key: &str) -> Resolved {
    let ctx = RequestContext::new(Attributes::new());
    let field = harness
        .registry
        .find_field(&ctx, &entity.entity_type, key)
        .unwrap();
    field.resolve(&ctx, &harness.registry, &harness.store, entity)
}

fn comment_on(harness: &mut Harness, attributes: Attributes) -> Entity {
    let mut comment = Entity::new("comments").with_attributes(attributes);
    harness.store.save(&mut comment).unwrap();
    comment
}

mod labels {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_label_falls_back_to_title() {
        // GIVEN
        let mut harness = Harness::new().unwrap();
        let post = harness.create_post("Label Me").unwrap();
        let comment = comment_on(&mut harness, attrs! { "body" => "Hi", "post_id" => post });

        // WHEN
        let resolved = resolve(&harness, &comment, "post");

        // THEN
        let item = resolved.as_one().unwrap();
        assert_eq!(item.key, post);
        assert_eq!(item.label, "Label Me");
    }

    #[test]
    fn test_label_falls_back_to_id_when_nothing_matches() {
        let config =
            EngineConfig::from_toml_str("[labels]\nfallback_attributes = [\"name\"]\n").unwrap();
        let mut harness = Harness::new().unwrap().with_config(config).unwrap();
        let post = harness.create_post("Untitled by config").unwrap();
        let comment = comment_on(&mut harness, attrs! { "body" => "Hi", "post_id" => post });

        let resolved = resolve(&harness, &comment, "post");

        assert_eq!(resolved.as_one().unwrap().label, post.to_string());
    }

    #[test]
    fn test_display_callback_wins_over_attribute() {
        let mut harness = Harness::new().unwrap();
        let post = harness.create_post("Shadowed").unwrap();
        let comment = comment_on(&mut harness, attrs! { "body" => "Hi", "post_id" => post });
        let field = Field::belongs_to("Post", "post", "posts")
            .display_attribute("title")
            .display_using(|related| {
                format!("Post #{}", related.id.map(|id| id.raw()).unwrap_or(0))
            });

        let ctx = RequestContext::new(Attributes::new());
        let resolved = field.resolve(&ctx, &harness.registry, &harness.store, &comment);

        assert_eq!(resolved.as_one().unwrap().label, format!("Post #{}", post.raw()));
    }

    #[test]
    fn test_missing_related_resolves_to_none() {
        let mut harness = Harness::new().unwrap();
        let comment = comment_on(&mut harness, attrs! { "body" => "Hi", "post_id" => 404i64 });

        let resolved = resolve(&harness, &comment, "post");

        assert_eq!(resolved.as_one(), None);
    }
}

mod morph {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_morph_to_resolves_through_alias() {
        let mut harness = Harness::new().unwrap();
        let comment = comment_on(
            &mut harness,
            attrs! { "body" => "Hi", "commentable_type" => "video", "commentable_id" => 1i64 },
        );

        let resolved = resolve(&harness, &comment, "commentable");

        let item = resolved.as_one().unwrap();
        assert_eq!(item.label, "Intro to Keel");
        assert_eq!(item.morph_type.as_deref(), Some("video"));
    }

    #[test]
    fn test_unknown_alias_fill_clears_both_columns() {
        // GIVEN
        let harness = Harness::new().unwrap();
        let ctx = RequestContext::new(
            attrs! { "commentable_type" => "podcast", "commentable" => 1i64 },
        );
        let field = harness.registry.find_field(&ctx, "comments", "commentable").unwrap();
        let mut comment = Entity::stored(
            "comments",
            EntityId::new(1),
            attrs! { "body" => "Hi", "commentable_type" => "video", "commentable_id" => 1i64 },
        );

        // WHEN
        field.fill(&ctx, &harness.registry, &mut comment);

        // THEN
        assert_eq!(comment.get_attr("commentable_type"), Some(&Value::Null));
        assert_eq!(comment.get_attr("commentable_id"), Some(&Value::Null));
        assert_eq!(comment.get_attr("body"), Some(&Value::from("Hi")));
    }

    #[test]
    fn test_morph_many_lists_video_comments() {
        let mut harness = Harness::new().unwrap();
        comment_on(
            &mut harness,
            attrs! { "body" => "First", "commentable_type" => "video", "commentable_id" => 1i64 },
        );
        comment_on(
            &mut harness,
            attrs! {
                "body" => "Elsewhere",
                "commentable_type" => "post",
                "commentable_id" => 1i64,
            },
        );
        let video = harness.load("videos", EntityId::new(1)).unwrap();

        let resolved = resolve(&harness, &video, "comments");

        let collection = resolved.as_many().unwrap();
        assert_eq!(collection.total, 1);
        assert_eq!(collection.items[0].label, "1");
    }
}

mod collections {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_preview_is_bounded_by_config() {
        let config = EngineConfig::from_toml_str("[relations]\npreview_limit = 2\n").unwrap();
        let mut harness = Harness::new().unwrap().with_config(config).unwrap();
        let post = harness.create_post("Busy").unwrap();
        for body in ["a", "b", "c"] {
            comment_on(&mut harness, attrs! { "body" => body, "post_id" => post });
        }
        let post = harness.load("posts", post).unwrap();

        let resolved = resolve(&harness, &post, "comments");

        let collection = resolved.as_many().unwrap();
        assert_eq!(collection.items.len(), 2);
        assert_eq!(collection.total, 3);
    }

    #[test]
    fn test_tags_carry_declared_pivot_columns() {
        let mut harness = Harness::new().unwrap();
        let post = harness.create_post("Pivoted").unwrap();
        harness.link_tags(post, &[(1, Some("lead"))]).unwrap();
        let post = harness.load("posts", post).unwrap();

        let resolved = resolve(&harness, &post, "tags");

        let item = &resolved.as_many().unwrap().items[0];
        assert_eq!(item.label, "rust");
        assert_eq!(item.pivot, Some(attrs! { "role" => "lead" }));
    }

    #[test]
    fn test_computed_field_resolves_from_callback() {
        let mut harness = Harness::new().unwrap();
        let mut post = Entity::new("posts").with_attributes(attrs! {
            "title" => "Computed",
            "body" => "Twenty characters and then some more",
        });
        harness.store.save(&mut post).unwrap();

        let resolved = resolve(&harness, &post, "excerpt");

        assert_eq!(resolved.as_value(), Some(&Value::from("Twenty characters an")));
    }
}
