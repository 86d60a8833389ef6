//! Bind-group and vertex-layout extraction from stripped WGSL source.
//!
//! Output uses real `wgpu` descriptor types so the render backend can hand
//! them to the device without translation. Visibility on bind-group entries
//! is the union of all stages: text-level reflection cannot attribute a
//! binding to a stage without full semantic analysis.

use std::collections::BTreeMap;

use tracing::{trace, warn};

use crate::diagnostics::Warning;
use crate::layout::{TypeLayout, resolve_type};
use crate::parse::{self, ParsedStruct};

const ALL_STAGES: wgpu::ShaderStages = wgpu::ShaderStages::VERTEX
    .union(wgpu::ShaderStages::FRAGMENT)
    .union(wgpu::ShaderStages::COMPUTE);

/// One vertex buffer: per-attribute formats/offsets plus the total stride.
#[derive(Debug, Clone, PartialEq)]
pub struct VertexLayout {
    pub attributes: Vec<wgpu::VertexAttribute>,
    pub stride: u64,
}

impl VertexLayout {
    /// Borrowed view suitable for `wgpu::VertexState`.
    pub fn as_wgpu(&self) -> wgpu::VertexBufferLayout<'_> {
        wgpu::VertexBufferLayout {
            array_stride: self.stride,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &self.attributes,
        }
    }
}

/// Bind-group reflection: layout entries plus name lookups both ways.
#[derive(Debug, Clone, Default)]
pub struct BindGroups {
    /// Group index -> entries sorted by binding index.
    pub layouts: BTreeMap<u32, Vec<wgpu::BindGroupLayoutEntry>>,
    /// (group, binding) -> declared variable name.
    pub names: BTreeMap<(u32, u32), String>,
    /// Declared variable name -> (group, binding).
    pub bindings_by_name: BTreeMap<String, (u32, u32)>,
}

/// Entry point names per shader stage.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EntryPoints {
    pub vertex: Option<String>,
    pub fragment: Option<String>,
    pub compute: Option<String>,
}

/// Map a WGSL type spelling to a vertex attribute format and byte size.
fn vertex_format(type_name: &str) -> Option<(wgpu::VertexFormat, u64)> {
    use wgpu::VertexFormat::*;
    let pair = match type_name {
        "f32" => (Float32, 4),
        "vec2<f32>" | "vec2f" => (Float32x2, 8),
        "vec3<f32>" | "vec3f" => (Float32x3, 12),
        "vec4<f32>" | "vec4f" => (Float32x4, 16),
        "u32" => (Uint32, 4),
        "vec2<u32>" | "vec2u" => (Uint32x2, 8),
        "vec3<u32>" | "vec3u" => (Uint32x3, 12),
        "vec4<u32>" | "vec4u" => (Uint32x4, 16),
        "i32" => (Sint32, 4),
        "vec2<i32>" | "vec2i" => (Sint32x2, 8),
        "vec3<i32>" | "vec3i" => (Sint32x3, 12),
        "vec4<i32>" | "vec4i" => (Sint32x4, 16),
        _ => return None,
    };
    Some(pair)
}

/// Derive vertex buffer layouts from pure vertex-input structs.
///
/// A pure vertex input has at least one `@location` field and no `@builtin`
/// fields (stage-output structs mix builtins in and are excluded). A struct
/// with any unmapped field type is skipped whole and reported as a warning.
/// Accepted layouts get sequential keys from 0 in discovery order.
pub fn extract_vertex_layouts(
    structs: &[ParsedStruct],
    warnings: &mut Vec<Warning>,
) -> BTreeMap<u32, VertexLayout> {
    let mut out = BTreeMap::new();
    let mut key = 0u32;

    'structs: for s in structs {
        let has_location = s.fields.iter().any(|f| f.location >= 0);
        let has_builtin = s.fields.iter().any(|f| f.is_builtin);
        if !has_location || has_builtin {
            continue;
        }

        let mut attributes = Vec::with_capacity(s.fields.len());
        let mut offset = 0u64;
        for (i, field) in s.fields.iter().enumerate() {
            let Some((format, size)) = vertex_format(&field.type_name) else {
                warn!(name = %s.name, field_type = %field.type_name, "skipping vertex struct");
                warnings.push(Warning::SkippedVertexStruct {
                    name: s.name.clone(),
                    field_type: field.type_name.clone(),
                });
                continue 'structs;
            };
            let shader_location = if field.location >= 0 {
                field.location as u32
            } else {
                i as u32
            };
            attributes.push(wgpu::VertexAttribute {
                format,
                offset,
                shader_location,
            });
            offset += size;
        }

        trace!(name = %s.name, key, stride = offset, "vertex layout");
        out.insert(
            key,
            VertexLayout {
                attributes,
                stride: offset,
            },
        );
        key += 1;
    }

    out
}

/// Extract all `@group(G) @binding(B) var[<space>] name: Type;` declarations.
///
/// Buffer entries get a minimum binding size resolved against the computed
/// struct layouts when that resolution succeeds with a non-zero size.
pub fn extract_bind_groups(
    source: &str,
    struct_layouts: &BTreeMap<String, TypeLayout>,
) -> BindGroups {
    let mut groups = BindGroups::default();
    let mut search = 0;

    while let Some(at) = source[search..].find("@group(").map(|p| search + p) {
        search = at + "@group(".len();
        let Some(decl) = parse_declaration(source, at) else {
            continue;
        };
        let Some(ty) = classify(&decl, struct_layouts) else {
            continue;
        };

        trace!(group = decl.group, binding = decl.binding, name = %decl.name, "binding");
        groups
            .layouts
            .entry(decl.group)
            .or_default()
            .push(wgpu::BindGroupLayoutEntry {
                binding: decl.binding,
                visibility: ALL_STAGES,
                ty,
                count: None,
            });
        groups
            .names
            .insert((decl.group, decl.binding), decl.name.clone());
        groups
            .bindings_by_name
            .insert(decl.name, (decl.group, decl.binding));
    }

    for entries in groups.layouts.values_mut() {
        entries.sort_by_key(|e| e.binding);
    }
    groups
}

struct Declaration {
    group: u32,
    binding: u32,
    /// Text inside `var<...>`, absent for handle types.
    space: Option<String>,
    name: String,
    type_name: String,
}

/// Parse one declaration starting at the `@group(` marker; `None` on any
/// structural mismatch (the occurrence is then skipped).
fn parse_declaration(source: &str, at: usize) -> Option<Declaration> {
    let bytes = source.as_bytes();
    let mut i = at + "@group(".len();

    let (group, next) = take_u32(source, i)?;
    i = expect(bytes, next, b')')?;
    i = parse::skip_whitespace(bytes, i);

    let rest = source.get(i..)?;
    i += rest.strip_prefix("@binding(").map(|_| "@binding(".len())?;
    let (binding, next) = take_u32(source, i)?;
    i = expect(bytes, next, b')')?;
    i = parse::skip_whitespace(bytes, i);

    let rest = source.get(i..)?;
    i += rest.strip_prefix("var").map(|_| "var".len())?;

    let space = if bytes.get(i) == Some(&b'<') {
        let close = source[i + 1..].find('>').map(|p| i + 1 + p)?;
        let text = source[i + 1..close].trim().to_string();
        i = close + 1;
        Some(text)
    } else {
        None
    };

    i = parse::skip_whitespace(bytes, i);
    let (name, next) = parse::take_identifier(source, i);
    if name.is_empty() {
        return None;
    }
    i = parse::skip_whitespace(bytes, next);
    i = expect(bytes, i, b':')?;

    let semi = source[i..].find(';').map(|p| i + p)?;
    let type_name = source[i..semi].trim().to_string();
    if type_name.is_empty() {
        return None;
    }

    Some(Declaration {
        group,
        binding,
        space,
        name: name.to_string(),
        type_name,
    })
}

fn take_u32(source: &str, start: usize) -> Option<(u32, usize)> {
    let bytes = source.as_bytes();
    let mut end = start;
    while end < bytes.len() && bytes[end].is_ascii_digit() {
        end += 1;
    }
    let value = source[start..end].parse().ok()?;
    Some((value, end))
}

fn expect(bytes: &[u8], i: usize, b: u8) -> Option<usize> {
    (bytes.get(i) == Some(&b)).then_some(i + 1)
}

/// Classify a declaration into a `wgpu::BindingType`.
fn classify(
    decl: &Declaration,
    struct_layouts: &BTreeMap<String, TypeLayout>,
) -> Option<wgpu::BindingType> {
    if let Some(space) = &decl.space {
        let ty = if space.contains("uniform") {
            wgpu::BufferBindingType::Uniform
        } else if space.contains("storage") {
            wgpu::BufferBindingType::Storage {
                read_only: !space.contains("read_write"),
            }
        } else {
            return None;
        };
        let min_binding_size = resolve_type(&decl.type_name, struct_layouts)
            .filter(|l| l.size > 0)
            .and_then(|l| wgpu::BufferSize::new(l.size));
        return Some(wgpu::BindingType::Buffer {
            ty,
            has_dynamic_offset: false,
            min_binding_size,
        });
    }

    let type_name = decl.type_name.as_str();
    if type_name.starts_with("sampler") {
        let kind = if type_name == "sampler_comparison" {
            wgpu::SamplerBindingType::Comparison
        } else {
            wgpu::SamplerBindingType::Filtering
        };
        return Some(wgpu::BindingType::Sampler(kind));
    }

    let (base, param) = match type_name.find('<') {
        Some(open) => (
            &type_name[..open],
            Some(type_name[open + 1..].strip_suffix('>')?),
        ),
        None => (type_name, None),
    };

    if base.starts_with("texture_depth") {
        let view_dimension = depth_dimension(base)?;
        return Some(wgpu::BindingType::Texture {
            sample_type: wgpu::TextureSampleType::Depth,
            view_dimension,
            multisampled: base == "texture_depth_multisampled_2d",
        });
    }

    if base.starts_with("texture_storage") {
        let view_dimension = storage_dimension(base)?;
        let mut params = param?.splitn(2, ',');
        let format = texel_format(params.next()?.trim())?;
        let access = match params.next()?.trim() {
            "read" => wgpu::StorageTextureAccess::ReadOnly,
            "write" => wgpu::StorageTextureAccess::WriteOnly,
            "read_write" => wgpu::StorageTextureAccess::ReadWrite,
            _ => return None,
        };
        return Some(wgpu::BindingType::StorageTexture {
            access,
            format,
            view_dimension,
        });
    }

    if base.starts_with("texture") {
        let (view_dimension, multisampled) = sampled_dimension(base)?;
        let sample_type = match param? {
            "f32" => wgpu::TextureSampleType::Float {
                filterable: !multisampled,
            },
            "i32" => wgpu::TextureSampleType::Sint,
            "u32" => wgpu::TextureSampleType::Uint,
            _ => return None,
        };
        return Some(wgpu::BindingType::Texture {
            sample_type,
            view_dimension,
            multisampled,
        });
    }

    None
}

fn depth_dimension(base: &str) -> Option<wgpu::TextureViewDimension> {
    use wgpu::TextureViewDimension::*;
    match base {
        "texture_depth_2d" | "texture_depth_multisampled_2d" => Some(D2),
        "texture_depth_2d_array" => Some(D2Array),
        "texture_depth_cube" => Some(Cube),
        "texture_depth_cube_array" => Some(CubeArray),
        _ => None,
    }
}

fn storage_dimension(base: &str) -> Option<wgpu::TextureViewDimension> {
    use wgpu::TextureViewDimension::*;
    match base {
        "texture_storage_1d" => Some(D1),
        "texture_storage_2d" => Some(D2),
        "texture_storage_2d_array" => Some(D2Array),
        "texture_storage_3d" => Some(D3),
        _ => None,
    }
}

fn sampled_dimension(base: &str) -> Option<(wgpu::TextureViewDimension, bool)> {
    use wgpu::TextureViewDimension::*;
    match base {
        "texture_1d" => Some((D1, false)),
        "texture_2d" => Some((D2, false)),
        "texture_2d_array" => Some((D2Array, false)),
        "texture_3d" => Some((D3, false)),
        "texture_cube" => Some((Cube, false)),
        "texture_cube_array" => Some((CubeArray, false)),
        "texture_multisampled_2d" => Some((D2, true)),
        _ => None,
    }
}

fn texel_format(name: &str) -> Option<wgpu::TextureFormat> {
    use wgpu::TextureFormat::*;
    match name {
        "rgba8unorm" => Some(Rgba8Unorm),
        "rgba8snorm" => Some(Rgba8Snorm),
        "rgba8uint" => Some(Rgba8Uint),
        "rgba8sint" => Some(Rgba8Sint),
        "bgra8unorm" => Some(Bgra8Unorm),
        "rgba16float" => Some(Rgba16Float),
        "rgba16uint" => Some(Rgba16Uint),
        "rgba16sint" => Some(Rgba16Sint),
        "r32float" => Some(R32Float),
        "r32uint" => Some(R32Uint),
        "r32sint" => Some(R32Sint),
        "rg32float" => Some(Rg32Float),
        "rg32uint" => Some(Rg32Uint),
        "rg32sint" => Some(Rg32Sint),
        "rgba32float" => Some(Rgba32Float),
        "rgba32uint" => Some(Rgba32Uint),
        "rgba32sint" => Some(Rgba32Sint),
        _ => None,
    }
}

/// Extract the entry point name for each stage.
///
/// A stage attribute may be followed by further attributes (notably
/// `@workgroup_size`) before the `fn`; the next `fn` keyword after the
/// attribute wins.
pub fn extract_entry_points(source: &str) -> EntryPoints {
    EntryPoints {
        vertex: entry_after(source, "@vertex"),
        fragment: entry_after(source, "@fragment"),
        compute: entry_after(source, "@compute"),
    }
}

fn entry_after(source: &str, attr: &str) -> Option<String> {
    let at = source.find(attr)?;
    let fn_at = parse::find_keyword(source, at + attr.len(), "fn")?;
    let bytes = source.as_bytes();
    let start = parse::skip_whitespace(bytes, fn_at + 2);
    let (name, _) = parse::take_identifier(source, start);
    (!name.is_empty()).then(|| name.to_string())
}

/// Extract `@workgroup_size(x[, y[, z]])`; omitted dimensions default to 1,
/// and a missing directive yields `[1, 1, 1]`.
pub fn extract_workgroup_size(source: &str) -> [u32; 3] {
    let mut size = [1u32; 3];
    let Some(at) = source.find("@workgroup_size(") else {
        return size;
    };
    let start = at + "@workgroup_size(".len();
    let Some(close) = source[start..].find(')').map(|p| start + p) else {
        return size;
    };
    for (i, part) in source[start..close].split(',').take(3).enumerate() {
        if let Ok(v) = part.trim().parse() {
            size[i] = v;
        }
    }
    size
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::compute_layouts;
    use crate::parse::parse_structs;

    fn no_layouts() -> BTreeMap<String, TypeLayout> {
        BTreeMap::new()
    }

    #[test]
    fn pure_vertex_input_is_detected() {
        let structs = parse_structs("struct V { @location(0) pos: vec3<f32> }");
        let mut warnings = Vec::new();
        let layouts = extract_vertex_layouts(&structs, &mut warnings);
        assert_eq!(layouts.len(), 1);
        let v = &layouts[&0];
        assert_eq!(v.stride, 12);
        assert_eq!(v.attributes[0].format, wgpu::VertexFormat::Float32x3);
        assert_eq!(v.attributes[0].shader_location, 0);
    }

    #[test]
    fn builtin_mixed_struct_is_not_vertex_input() {
        let structs = parse_structs(
            "struct VOut { @builtin(position) p: vec4<f32>, @location(0) uv: vec2<f32> }",
        );
        let mut warnings = Vec::new();
        let layouts = extract_vertex_layouts(&structs, &mut warnings);
        assert!(layouts.is_empty());
        assert!(warnings.is_empty());
    }

    #[test]
    fn sequential_offsets_and_stride() {
        let structs = parse_structs(
            "struct V { @location(0) pos: vec3<f32>, @location(1) uv: vec2<f32>, @location(2) joints: vec4<u32> }",
        );
        let mut warnings = Vec::new();
        let layouts = extract_vertex_layouts(&structs, &mut warnings);
        let v = &layouts[&0];
        assert_eq!(v.stride, 12 + 8 + 16);
        assert_eq!(v.attributes[1].offset, 12);
        assert_eq!(v.attributes[2].offset, 20);
        assert_eq!(v.attributes[2].format, wgpu::VertexFormat::Uint32x4);
    }

    #[test]
    fn unmapped_field_skips_whole_struct() {
        let structs = parse_structs(
            "struct Bad { @location(0) pos: vec3<f32>, @location(1) m: mat4x4<f32> } \
             struct Good { @location(0) pos: vec3<f32> }",
        );
        let mut warnings = Vec::new();
        let layouts = extract_vertex_layouts(&structs, &mut warnings);
        // Bad is absent entirely; Good still gets key 0.
        assert_eq!(layouts.len(), 1);
        assert_eq!(layouts[&0].attributes.len(), 1);
        assert_eq!(warnings.len(), 1);
    }

    #[test]
    fn uniform_buffer_with_min_binding_size() {
        let structs = parse_structs("struct Uniforms { m: mat4x4<f32> }");
        let mut warnings = Vec::new();
        let struct_layouts = compute_layouts(&structs, &mut warnings);
        let groups = extract_bind_groups(
            "@group(0) @binding(0) var<uniform> uniforms: Uniforms;",
            &struct_layouts,
        );
        let entry = &groups.layouts[&0][0];
        assert_eq!(entry.binding, 0);
        match entry.ty {
            wgpu::BindingType::Buffer {
                ty: wgpu::BufferBindingType::Uniform,
                min_binding_size,
                ..
            } => assert_eq!(min_binding_size, wgpu::BufferSize::new(64)),
            ref other => panic!("unexpected binding type: {other:?}"),
        }
        assert_eq!(groups.names[&(0, 0)], "uniforms");
        assert_eq!(groups.bindings_by_name["uniforms"], (0, 0));
    }

    #[test]
    fn storage_read_write_classification() {
        let groups = extract_bind_groups(
            "@group(0) @binding(1) var<storage, read_write> out_data: array<vec4<f32>>;",
            &no_layouts(),
        );
        match groups.layouts[&0][0].ty {
            wgpu::BindingType::Buffer {
                ty: wgpu::BufferBindingType::Storage { read_only },
                min_binding_size,
                ..
            } => {
                assert!(!read_only);
                // array<vec4<f32>> minimum size is one element stride.
                assert_eq!(min_binding_size, wgpu::BufferSize::new(16));
            }
            ref other => panic!("unexpected binding type: {other:?}"),
        }
    }

    #[test]
    fn texture_and_sampler_classification() {
        let src = "\
@group(1) @binding(0) var t_diffuse: texture_2d<f32>;
@group(1) @binding(1) var s_diffuse: sampler;
@group(1) @binding(2) var t_shadow: texture_depth_2d;
@group(1) @binding(3) var s_shadow: sampler_comparison;
@group(1) @binding(4) var t_lut: texture_3d<u32>;
";
        let groups = extract_bind_groups(src, &no_layouts());
        let entries = &groups.layouts[&1];
        assert_eq!(entries.len(), 5);
        assert!(matches!(
            entries[0].ty,
            wgpu::BindingType::Texture {
                sample_type: wgpu::TextureSampleType::Float { filterable: true },
                view_dimension: wgpu::TextureViewDimension::D2,
                multisampled: false,
            }
        ));
        assert!(matches!(
            entries[1].ty,
            wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering)
        ));
        assert!(matches!(
            entries[2].ty,
            wgpu::BindingType::Texture {
                sample_type: wgpu::TextureSampleType::Depth,
                ..
            }
        ));
        assert!(matches!(
            entries[3].ty,
            wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Comparison)
        ));
        assert!(matches!(
            entries[4].ty,
            wgpu::BindingType::Texture {
                sample_type: wgpu::TextureSampleType::Uint,
                view_dimension: wgpu::TextureViewDimension::D3,
                ..
            }
        ));
    }

    #[test]
    fn storage_texture_classification() {
        let groups = extract_bind_groups(
            "@group(0) @binding(0) var output: texture_storage_2d<rgba8unorm, write>;",
            &no_layouts(),
        );
        assert!(matches!(
            groups.layouts[&0][0].ty,
            wgpu::BindingType::StorageTexture {
                access: wgpu::StorageTextureAccess::WriteOnly,
                format: wgpu::TextureFormat::Rgba8Unorm,
                view_dimension: wgpu::TextureViewDimension::D2,
            }
        ));
    }

    #[test]
    fn entries_grouped_and_sorted_by_binding() {
        let src = "\
@group(1) @binding(2) var<uniform> b: vec4<f32>;
@group(0) @binding(0) var<uniform> a: vec4<f32>;
@group(1) @binding(0) var<uniform> c: vec4<f32>;
";
        let groups = extract_bind_groups(src, &no_layouts());
        assert_eq!(groups.layouts.keys().copied().collect::<Vec<_>>(), vec![0, 1]);
        let bindings: Vec<u32> = groups.layouts[&1].iter().map(|e| e.binding).collect();
        assert_eq!(bindings, vec![0, 2]);
    }

    #[test]
    fn entry_points_per_stage() {
        let src = "\
@vertex
fn vs_main() -> @builtin(position) vec4<f32> { return vec4<f32>(0.0); }

@fragment
fn fs_main() -> @location(0) vec4<f32> { return vec4<f32>(1.0); }
";
        let eps = extract_entry_points(src);
        assert_eq!(eps.vertex.as_deref(), Some("vs_main"));
        assert_eq!(eps.fragment.as_deref(), Some("fs_main"));
        assert_eq!(eps.compute, None);
    }

    #[test]
    fn compute_entry_skips_workgroup_attribute() {
        let src = "@compute @workgroup_size(8, 8)\nfn cs_main() {}";
        let eps = extract_entry_points(src);
        assert_eq!(eps.compute.as_deref(), Some("cs_main"));
    }

    #[test]
    fn workgroup_size_defaults() {
        assert_eq!(extract_workgroup_size("fn main() {}"), [1, 1, 1]);
        assert_eq!(
            extract_workgroup_size("@compute @workgroup_size(64) fn m() {}"),
            [64, 1, 1]
        );
        assert_eq!(
            extract_workgroup_size("@compute @workgroup_size(8, 8) fn m() {}"),
            [8, 8, 1]
        );
        assert_eq!(
            extract_workgroup_size("@compute @workgroup_size(4, 4, 2) fn m() {}"),
            [4, 4, 2]
        );
    }

    #[test]
    fn vertex_layout_as_wgpu_view() {
        let structs = parse_structs("struct V { @location(0) pos: vec3<f32> }");
        let mut warnings = Vec::new();
        let layouts = extract_vertex_layouts(&structs, &mut warnings);
        let view = layouts[&0].as_wgpu();
        assert_eq!(view.array_stride, 12);
        assert_eq!(view.step_mode, wgpu::VertexStepMode::Vertex);
        assert_eq!(view.attributes.len(), 1);
    }
}
