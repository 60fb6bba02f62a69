//! Shared types used across the pitchwalk crates.

mod color;
mod types;

pub use color::{Color, ColorParseError};
pub use types::NodeId;
