//! wgpu render backend for the oxy engine.
//!
//! Engine shaders are written against the `@oxy:` annotation system and
//! reflected through `oxy-shader`; bind group layouts, pipeline layouts and
//! vertex state are assembled from reflection output rather than declared
//! by hand.
//!
//! # Invariants
//! - Descriptor assembly is reflection-driven; hand-written layout entries
//!   do not appear in this crate.
//! - CPU-side uniform structs match the registry's WGSL layouts byte for
//!   byte (checked by tests).

mod camera;
mod gpu;
pub mod shaders;

pub use camera::{CameraUniform, FlyCamera};
pub use gpu::{RenderError, WgpuRenderer, init_headless};
