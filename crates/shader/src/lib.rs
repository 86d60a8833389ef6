//! WGSL annotation pre-processor and reflection/layout engine.
//!
//! Shader source is written in plain WGSL plus `@oxy:` directives embedded in
//! comment lines. The pre-processor expands those directives into binding
//! declarations and injected struct definitions, then the reflection pipeline
//! derives everything the renderer needs to create GPU objects: bind-group
//! layouts, vertex buffer layouts, entry points and workgroup sizes.
//!
//! Pipeline: raw source -> [`Preprocessor`] -> [`strip_comments`] ->
//! [`parse_structs`] -> [`compute_layouts`] -> binding/vertex extraction ->
//! [`Shader`].
//!
//! # Invariants
//! - Registries are immutable after construction and shared by reference.
//! - A `Preprocessor` owns its declarations list; concurrent `process` calls
//!   on one instance are not supported. One instance per shader is cheap.
//! - All reflection output is recomputed in full on every shader load;
//!   nothing here caches across shaders.

mod annotation;
mod bindings;
mod diagnostics;
mod layout;
mod parse;
mod preprocess;
mod registry;
mod shader;
mod strip;

pub use annotation::{Annotation, AnnotationError, AnnotationKind};
pub use bindings::{
    BindGroups, EntryPoints, VertexLayout, extract_bind_groups, extract_entry_points,
    extract_vertex_layouts, extract_workgroup_size,
};
pub use diagnostics::Warning;
pub use layout::{TypeLayout, align_up, compute_layouts, resolve_type, struct_layout};
pub use parse::{ParsedField, ParsedStruct, parse_structs};
pub use preprocess::{PreprocessError, Preprocessor};
pub use registry::{AddressSpace, BindingRole, ProviderIdentity, RegistryEntry, StructRegistry};
pub use shader::Shader;
pub use strip::strip_comments;
