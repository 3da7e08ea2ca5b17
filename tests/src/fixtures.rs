//! A small blog domain used across the scenario tests.
//!
//! Seeded rows:
//!
//! | table  | ids  | rows                                    |
//! |--------|------|-----------------------------------------|
//! | users  | 1-2  | Ada, Grace                              |
//! | tags   | 1-7  | rust, sql, go, zig, c, lua, ada         |
//! | videos | 1    | Intro to Keel                           |
//!
//! Posts and comments start empty.

use keel_core::{attrs, EngineConfig, Entity, Value};
use keel_fields::{Field, FieldResult, PivotTable, RequestContext, Resource, ResourceRegistry};
use keel_store::MemoryStore;

use crate::error::ScenarioResult;

pub const TAG_NAMES: [&str; 7] = ["rust", "sql", "go", "zig", "c", "lua", "ada"];

/// Blog posts. Tags are capped at three and carry a `role` pivot column.
pub struct Posts;

impl Resource for Posts {
    fn entity_type(&self) -> &str {
        "posts"
    }

    fn fields(&self, _ctx: &RequestContext) -> Vec<Field> {
        vec![
            Field::text("Title", "title").required(),
            Field::textarea("Body", "body").nullable(),
            Field::text("Excerpt", "excerpt").computed(|post| {
                let body = post.attr_or_null("body").to_text();
                Value::from(body.chars().take(20).collect::<String>())
            }),
            Field::text("Slug", "slug").readonly(),
            Field::belongs_to("Author", "author", "users").nullable(),
            Field::belongs_to_many(
                "Tags",
                "tags",
                "tags",
                PivotTable::new("post_tag", "post_id", "tag_id").with_columns(["role"]),
            )
            .attachment_limit(3),
            Field::has_many("Comments", "comments", "comments", "post_id"),
        ]
    }

    /// Runs before fields are filled, so the slug comes from the submitted title.
    fn before_save(&self, entity: &mut Entity, ctx: &RequestContext) -> FieldResult<()> {
        let title = if ctx.has_input("title") {
            ctx.input_value("title")
        } else {
            entity.attr_or_null("title")
        };
        let slug = title
            .to_text()
            .to_lowercase()
            .split_whitespace()
            .collect::<Vec<_>>()
            .join("-");
        entity.set_attr("slug", Value::from(slug));
        Ok(())
    }
}

pub struct Users;

impl Resource for Users {
    fn entity_type(&self) -> &str {
        "users"
    }

    fn fields(&self, _ctx: &RequestContext) -> Vec<Field> {
        vec![
            Field::text("Name", "name").required(),
            Field::email("Email", "email"),
            Field::password("Password", "password"),
        ]
    }
}

pub struct Tags;

impl Resource for Tags {
    fn entity_type(&self) -> &str {
        "tags"
    }

    fn fields(&self, _ctx: &RequestContext) -> Vec<Field> {
        vec![Field::text("Name", "name").required()]
    }

    fn searchable_attributes(&self) -> Vec<String> {
        vec!["name".to_string()]
    }
}

/// Comments belong to a post and to any commentable (post or video).
pub struct Comments;

impl Resource for Comments {
    fn entity_type(&self) -> &str {
        "comments"
    }

    fn fields(&self, _ctx: &RequestContext) -> Vec<Field> {
        vec![
            Field::textarea("Body", "body").required(),
            Field::belongs_to("Post", "post", "posts").nullable(),
            Field::morph_to("Commentable", "commentable", ["posts", "videos"]),
        ]
    }
}

pub struct Videos;

impl Resource for Videos {
    fn entity_type(&self) -> &str {
        "videos"
    }

    fn fields(&self, _ctx: &RequestContext) -> Vec<Field> {
        vec![
            Field::text("Title", "title").required(),
            Field::morph_to_many(
                "Tags",
                "tags",
                "tags",
                PivotTable::new("taggables", "taggable_id", "tag_id"),
                "taggable",
            ),
            Field::morph_many("Comments", "comments", "comments", "commentable"),
        ]
    }
}

/// Registry over the fixture resources with default configuration.
pub fn registry() -> ScenarioResult<ResourceRegistry> {
    registry_with(EngineConfig::default())
}

pub fn registry_with(config: EngineConfig) -> ScenarioResult<ResourceRegistry> {
    let registry = ResourceRegistry::builder()
        .config(config)
        .resource(Posts)
        .resource(Users)
        .resource(Tags)
        .resource(Comments)
        .resource(Videos)
        .morph_alias("post", "posts")
        .morph_alias("video", "videos")
        .build()?;
    Ok(registry)
}

/// Memory store with every fixture table defined and the reference rows seeded.
pub fn seeded_store() -> ScenarioResult<MemoryStore> {
    let mut store = MemoryStore::new();
    store
        .define_table("posts")
        .define_table("users")
        .define_table("tags")
        .define_table("comments")
        .define_table("videos")
        .define_pivot("post_tag")
        .define_pivot("taggables");

    store.seed("users", attrs! { "name" => "Ada", "email" => "ada@example.com" })?;
    store.seed("users", attrs! { "name" => "Grace", "email" => "grace@example.com" })?;
    for name in TAG_NAMES {
        store.seed("tags", attrs! { "name" => name })?;
    }
    store.seed("videos", attrs! { "title" => "Intro to Keel" })?;
    Ok(store)
}
