//! Shader facade: one call from annotated source to consumable reflection.

use std::collections::BTreeMap;

use tracing::debug;

use crate::annotation::Annotation;
use crate::bindings::{
    BindGroups, EntryPoints, VertexLayout, extract_bind_groups, extract_entry_points,
    extract_vertex_layouts, extract_workgroup_size,
};
use crate::diagnostics::Warning;
use crate::layout::{TypeLayout, compute_layouts};
use crate::parse::parse_structs;
use crate::preprocess::{PreprocessError, Preprocessor};
use crate::registry::StructRegistry;
use crate::strip::strip_comments;

/// A fully reflected shader: processed WGSL plus everything the renderer
/// needs to create pipeline and binding objects.
///
/// All fields are recomputed from scratch on every load; a `Shader` is
/// immutable once built.
#[derive(Debug, Clone)]
pub struct Shader {
    /// Annotation-expanded WGSL, ready for module creation.
    pub source: String,
    /// Group index -> layout entries sorted by binding.
    pub bind_group_layouts: BTreeMap<u32, Vec<wgpu::BindGroupLayoutEntry>>,
    /// (group, binding) -> declared variable name.
    pub binding_names: BTreeMap<(u32, u32), String>,
    /// Declared variable name -> (group, binding).
    pub bindings_by_name: BTreeMap<String, (u32, u32)>,
    /// Sequential key -> vertex buffer layout, for vertex shaders.
    pub vertex_layouts: BTreeMap<u32, VertexLayout>,
    /// Entry point names per stage.
    pub entry_points: EntryPoints,
    /// Compute workgroup dimensions; `[1, 1, 1]` when not declared.
    pub workgroup_size: [u32; 3],
    /// Resolved struct layouts (size/alignment) by struct name.
    pub struct_layouts: BTreeMap<String, TypeLayout>,
    /// Binding declarations in source order, for resource wiring.
    pub declarations: Vec<Annotation>,
    /// Non-fatal diagnostics collected along the way.
    pub warnings: Vec<Warning>,
}

impl Shader {
    /// Pre-process and reflect annotated WGSL source.
    pub fn from_source(source: &str, registry: &StructRegistry) -> Result<Self, PreprocessError> {
        let mut pre = Preprocessor::new(registry);
        let processed = pre.process(source)?;
        let declarations = pre.declarations().to_vec();

        let stripped = strip_comments(&processed);
        let structs = parse_structs(&stripped);
        let mut warnings = Vec::new();
        let struct_layouts = compute_layouts(&structs, &mut warnings);
        let vertex_layouts = extract_vertex_layouts(&structs, &mut warnings);
        let groups = extract_bind_groups(&stripped, &struct_layouts);
        let entry_points = extract_entry_points(&stripped);
        let workgroup_size = extract_workgroup_size(&stripped);

        let BindGroups {
            layouts: bind_group_layouts,
            names: binding_names,
            bindings_by_name,
        } = groups;

        debug!(
            groups = bind_group_layouts.len(),
            vertex_layouts = vertex_layouts.len(),
            structs = struct_layouts.len(),
            warnings = warnings.len(),
            "shader reflected"
        );

        Ok(Self {
            source: processed,
            bind_group_layouts,
            binding_names,
            bindings_by_name,
            vertex_layouts,
            entry_points,
            workgroup_size,
            struct_layouts,
            declarations,
            warnings,
        })
    }

    /// Name lookup for a (group, binding) pair.
    pub fn binding_name(&self, group: u32, binding: u32) -> Option<&str> {
        self.binding_names.get(&(group, binding)).map(String::as_str)
    }

    /// Reverse lookup: (group, binding) for a declared variable name.
    pub fn binding_of(&self, name: &str) -> Option<(u32, u32)> {
        self.bindings_by_name.get(name).copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registry() -> StructRegistry {
        StructRegistry::engine()
    }

    const FORWARD_WGSL: &str = r#"
//@oxy:include camera
//@oxy:group 0 0 storage_uniform camera camera

//@oxy:include material
//@oxy:group 1 0 storage_uniform material material

//@oxy:provider 2 0 material diffuse_texture
@group(2) @binding(0) var t_diffuse: texture_2d<f32>;
//@oxy:provider 2 1 material diffuse_sampler
@group(2) @binding(1) var s_diffuse: sampler;

struct VertexInput {
    @location(0) position: vec3<f32>,
    @location(1) normal: vec3<f32>,
    @location(2) uv: vec2<f32>,
}

struct VertexOutput {
    @builtin(position) clip_position: vec4<f32>,
    @location(0) uv: vec2<f32>,
}

@vertex
fn vs_main(in: VertexInput) -> VertexOutput {
    var out: VertexOutput;
    out.clip_position = camera.view_proj * vec4<f32>(in.position, 1.0);
    out.uv = in.uv;
    return out;
}

@fragment
fn fs_main(in: VertexOutput) -> @location(0) vec4<f32> {
    return textureSample(t_diffuse, s_diffuse, in.uv) * material.base_color;
}
"#;

    #[test]
    fn end_to_end_forward_shader() {
        let shader = Shader::from_source(FORWARD_WGSL, &registry()).unwrap();

        assert!(shader.source.contains("struct CameraUniform"));
        assert!(
            shader
                .source
                .contains("@group(0) @binding(0) var<uniform> camera: CameraUniform;")
        );
        assert!(!shader.source.contains("@oxy:"));

        // Groups 0 and 1 synthesized, group 2 hand-written.
        assert_eq!(
            shader.bind_group_layouts.keys().copied().collect::<Vec<_>>(),
            vec![0, 1, 2]
        );
        assert_eq!(shader.bind_group_layouts[&2].len(), 2);

        // CameraUniform: two mat4x4 + one vec4 = 144 bytes.
        assert_eq!(
            shader.struct_layouts["CameraUniform"],
            TypeLayout::new(144, 16)
        );
        match shader.bind_group_layouts[&0][0].ty {
            wgpu::BindingType::Buffer {
                min_binding_size, ..
            } => assert_eq!(min_binding_size, wgpu::BufferSize::new(144)),
            ref other => panic!("unexpected binding type: {other:?}"),
        }

        // VertexInput is the only pure vertex-input struct.
        assert_eq!(shader.vertex_layouts.len(), 1);
        assert_eq!(shader.vertex_layouts[&0].stride, 12 + 12 + 8);

        assert_eq!(shader.entry_points.vertex.as_deref(), Some("vs_main"));
        assert_eq!(shader.entry_points.fragment.as_deref(), Some("fs_main"));
        assert_eq!(shader.workgroup_size, [1, 1, 1]);

        // Declarations in source order: group 0, group 1, two providers.
        assert_eq!(shader.declarations.len(), 4);
        assert_eq!(shader.declarations[0].group, Some(0));
        assert_eq!(shader.declarations[2].args[0], "material");

        assert_eq!(shader.binding_name(2, 0), Some("t_diffuse"));
        assert_eq!(shader.binding_of("s_diffuse"), Some((2, 1)));
        assert!(shader.warnings.is_empty());
    }

    #[test]
    fn compute_shader_reflection() {
        let src = "\
//@oxy:include tiles
//@oxy:include light
//@oxy:group 0 0 storage_read_write tile_grid tiles
//@oxy:group 0 1 storage_read scene_lights array<light>

@compute @workgroup_size(16, 16)
fn cs_cull() {}
";
        let shader = Shader::from_source(src, &registry()).unwrap();
        assert_eq!(shader.entry_points.compute.as_deref(), Some("cs_cull"));
        assert_eq!(shader.workgroup_size, [16, 16, 1]);

        let entries = &shader.bind_group_layouts[&0];
        assert_eq!(entries.len(), 2);
        match entries[0].ty {
            wgpu::BindingType::Buffer {
                ty: wgpu::BufferBindingType::Storage { read_only },
                ..
            } => assert!(!read_only),
            ref other => panic!("unexpected binding type: {other:?}"),
        }
        // array<Light> min size is one 64-byte element.
        match entries[1].ty {
            wgpu::BindingType::Buffer {
                min_binding_size, ..
            } => assert_eq!(min_binding_size, wgpu::BufferSize::new(64)),
            ref other => panic!("unexpected binding type: {other:?}"),
        }
    }

    #[test]
    fn annotation_errors_surface_with_line_numbers() {
        let src = "fn ok() {}\n//@oxy:include nonsense\n";
        let err = Shader::from_source(src, &registry()).unwrap_err();
        assert!(err.to_string().contains("line 2"));
    }

    #[test]
    fn unresolved_struct_reported_not_fatal() {
        let src = "struct Orphan { dep: Missing }\n@vertex\nfn vs() {}\n";
        let shader = Shader::from_source(src, &registry()).unwrap();
        assert!(!shader.struct_layouts.contains_key("Orphan"));
        assert_eq!(
            shader.warnings,
            vec![Warning::UnresolvedStruct {
                name: "Orphan".into()
            }]
        );
    }
}
