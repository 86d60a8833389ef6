//! Shared types used across the oxy engine crates.

mod types;

pub use types::{Color, Transform};
