//! Renderer-facing data model.
//!
//! # Invariants
//! - Everything here is plain data; no GPU types leak into this crate.
//! - `FrameQueue` preserves submission order; the backend drains it once
//!   per frame.

mod frame;
mod material;
mod pipeline;

pub use frame::{ComputeWork, DrawWork, FrameQueue, FrameWork, RenderView};
pub use material::Material;
pub use pipeline::{BlendMode, CullMode, PipelineOptions, Topology};
