//! Data models for the game library catalog.
//!
//! Field names serialize in camelCase for the browser client.

mod collection;
mod game;
mod revision;

pub use collection::*;
pub use game::*;
pub use revision::*;
