//! Keel Core Types
//!
//! This crate provides the foundational types used throughout Keel:
//! - Identity type (EntityId)
//! - Value types (the Value enum and the Attributes map)
//! - The Entity record that fields read from and fill into
//! - Engine configuration (EngineConfig)

pub mod config;
mod entity;
mod error;
mod id;
mod value;

pub use config::EngineConfig;
pub use entity::*;
pub use error::*;
pub use id::*;
pub use value::*;
