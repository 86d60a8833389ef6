//! Engine-level registries consumed by the annotation parser and
//! pre-processor.
//!
//! All of these are immutable after construction and passed by reference;
//! there is no package-level mutable state. The struct registry maps the
//! annotation argument keys shader authors write (`camera`, `lights`, ...)
//! to embedded WGSL struct sources and their resolved type names.

use std::collections::BTreeMap;

/// One registered engine struct: its embedded WGSL text and type name.
#[derive(Debug, Clone, Copy)]
pub struct RegistryEntry {
    pub source: &'static str,
    pub type_name: &'static str,
}

/// Immutable key -> engine struct mapping.
#[derive(Debug, Clone)]
pub struct StructRegistry {
    entries: BTreeMap<&'static str, RegistryEntry>,
}

const CAMERA_WGSL: &str = "\
struct CameraUniform {
    view_proj: mat4x4<f32>,
    view: mat4x4<f32>,
    position: vec4<f32>,
}
";

const VERTEX_WGSL: &str = "\
struct VertexIn {
    @location(0) position: vec3<f32>,
    @location(1) normal: vec3<f32>,
    @location(2) uv: vec2<f32>,
}
";

const SKINNED_VERTEX_WGSL: &str = "\
struct SkinnedVertexIn {
    @location(0) position: vec3<f32>,
    @location(1) normal: vec3<f32>,
    @location(2) uv: vec2<f32>,
    @location(3) joints: vec4<u32>,
    @location(4) weights: vec4<f32>,
}
";

const MATERIAL_WGSL: &str = "\
struct MaterialParams {
    base_color: vec4<f32>,
    emissive: vec4<f32>,
    metallic: f32,
    roughness: f32,
    flags: u32,
    _pad: f32,
}
";

const LIGHT_WGSL: &str = "\
struct Light {
    position: vec4<f32>,
    color: vec4<f32>,
    direction: vec4<f32>,
    radius: f32,
    intensity: f32,
    kind: u32,
    _pad: f32,
}
";

const SCENE_LIGHTS_WGSL: &str = "\
struct Light {
    position: vec4<f32>,
    color: vec4<f32>,
    direction: vec4<f32>,
    radius: f32,
    intensity: f32,
    kind: u32,
    _pad: f32,
}

struct SceneLights {
    ambient: vec4<f32>,
    count: u32,
    _pad0: u32,
    _pad1: u32,
    _pad2: u32,
    lights: array<Light, 64>,
}
";

const SHADOW_WGSL: &str = "\
struct ShadowUniform {
    light_view_proj: mat4x4<f32>,
    params: vec4<f32>,
}
";

const TILE_GRID_WGSL: &str = "\
struct LightTile {
    offset: u32,
    count: u32,
}

struct TileGrid {
    tiles_x: u32,
    tiles_y: u32,
    tile_size: u32,
    _pad: u32,
    tiles: array<LightTile>,
}
";

const EFFECT_WGSL: &str = "\
struct EffectParams {
    time: f32,
    delta: f32,
    resolution: vec2<f32>,
}
";

const JOINTS_WGSL: &str = "\
struct JointMatrices {
    matrices: array<mat4x4<f32>, 256>,
}
";

impl StructRegistry {
    /// The engine's built-in struct set.
    pub fn engine() -> Self {
        let mut entries = BTreeMap::new();
        let mut add = |key, source, type_name| {
            entries.insert(key, RegistryEntry { source, type_name });
        };
        add("camera", CAMERA_WGSL, "CameraUniform");
        add("vertex", VERTEX_WGSL, "VertexIn");
        add("skinned_vertex", SKINNED_VERTEX_WGSL, "SkinnedVertexIn");
        add("material", MATERIAL_WGSL, "MaterialParams");
        add("light", LIGHT_WGSL, "Light");
        add("lights", SCENE_LIGHTS_WGSL, "SceneLights");
        add("shadow", SHADOW_WGSL, "ShadowUniform");
        add("tiles", TILE_GRID_WGSL, "TileGrid");
        add("effect", EFFECT_WGSL, "EffectParams");
        add("joints", JOINTS_WGSL, "JointMatrices");
        Self { entries }
    }

    pub fn contains(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    pub fn get(&self, key: &str) -> Option<&RegistryEntry> {
        self.entries.get(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.entries.keys().copied()
    }
}

/// Address spaces a `group` annotation may declare.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddressSpace {
    StorageUniform,
    StorageRead,
    StorageReadWrite,
}

impl AddressSpace {
    pub fn from_token(token: &str) -> Option<Self> {
        match token {
            "storage_uniform" => Some(Self::StorageUniform),
            "storage_read" => Some(Self::StorageRead),
            "storage_read_write" => Some(Self::StorageReadWrite),
            _ => None,
        }
    }

    /// The `var<...>` clause this space synthesizes.
    pub fn wgsl(self) -> &'static str {
        match self {
            Self::StorageUniform => "var<uniform>",
            Self::StorageRead => "var<storage, read>",
            Self::StorageReadWrite => "var<storage, read_write>",
        }
    }
}

/// External resource owners a `provider` annotation may name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderIdentity {
    Camera,
    Material,
    Lights,
    Shadow,
    Tiles,
    Effect,
    Animator,
    AnimatorOutput,
    AnimatorPacked,
    AnimatorScratch,
}

impl ProviderIdentity {
    pub fn from_token(token: &str) -> Option<Self> {
        match token {
            "camera" => Some(Self::Camera),
            "material" => Some(Self::Material),
            "lights" => Some(Self::Lights),
            "shadow" => Some(Self::Shadow),
            "tiles" => Some(Self::Tiles),
            "effect" => Some(Self::Effect),
            "animator" => Some(Self::Animator),
            "animator_output" => Some(Self::AnimatorOutput),
            "animator_packed" => Some(Self::AnimatorPacked),
            "animator_scratch" => Some(Self::AnimatorScratch),
            _ => None,
        }
    }
}

/// Texture/sampler roles a provider binding may refine itself to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BindingRole {
    DiffuseTexture,
    DiffuseSampler,
    NormalTexture,
    NormalSampler,
    MetallicRoughnessTexture,
    MetallicRoughnessSampler,
}

impl BindingRole {
    pub fn from_token(token: &str) -> Option<Self> {
        match token {
            "diffuse_texture" => Some(Self::DiffuseTexture),
            "diffuse_sampler" => Some(Self::DiffuseSampler),
            "normal_texture" => Some(Self::NormalTexture),
            "normal_sampler" => Some(Self::NormalSampler),
            "metallic_roughness_texture" => Some(Self::MetallicRoughnessTexture),
            "metallic_roughness_sampler" => Some(Self::MetallicRoughnessSampler),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::compute_layouts;
    use crate::parse::parse_structs;
    use crate::strip::strip_comments;

    #[test]
    fn engine_registry_has_expected_keys() {
        let registry = StructRegistry::engine();
        for key in ["camera", "vertex", "material", "lights", "tiles", "joints"] {
            assert!(registry.contains(key), "{key}");
        }
        assert!(!registry.contains("bogus"));
    }

    #[test]
    fn every_registered_source_parses_and_resolves() {
        // Registry sources feed straight into the layout engine on include;
        // each must parse and each entry's type must resolve.
        let registry = StructRegistry::engine();
        for key in registry.keys() {
            let entry = registry.get(key).unwrap();
            let structs = parse_structs(&strip_comments(entry.source));
            assert!(!structs.is_empty(), "{key}");
            let mut warnings = Vec::new();
            let layouts = compute_layouts(&structs, &mut warnings);
            assert!(layouts.contains_key(entry.type_name), "{key}");
            assert!(warnings.is_empty(), "{key}: {warnings:?}");
        }
    }

    #[test]
    fn address_space_round_trip() {
        assert_eq!(
            AddressSpace::from_token("storage_uniform"),
            Some(AddressSpace::StorageUniform)
        );
        assert_eq!(
            AddressSpace::StorageReadWrite.wgsl(),
            "var<storage, read_write>"
        );
        assert_eq!(AddressSpace::from_token("uniform"), None);
    }

    #[test]
    fn provider_and_role_closed_sets() {
        assert!(ProviderIdentity::from_token("animator_packed").is_some());
        assert!(ProviderIdentity::from_token("animators").is_none());
        assert!(BindingRole::from_token("normal_sampler").is_some());
        assert!(BindingRole::from_token("specular_texture").is_none());
    }
}
