//! Plume Core - Foundational types for the Plume particle engine
//!
//! This crate provides the core types that all other Plume crates depend on:
//! - `DefinitionId` - Stable effect definition identifiers
//! - `Vec2`, `Color` - 2D spatial and color types
//! - Error types and Result alias

mod error;
mod id;
mod types;

pub use error::{PlumeError, Result};
pub use id::DefinitionId;
pub use types::{Color, Vec2};
