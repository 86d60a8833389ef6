//! Engine WGSL sources, written against the annotation pre-processor.
//!
//! Binding declarations are either synthesized from `@oxy:group` lines or
//! hand-written below a `@oxy:provider` line; struct definitions come from
//! `@oxy:include`. Raw sources here are not valid WGSL until processed.

/// Forward lit mesh shader: camera + material uniforms, diffuse texture.
pub const MESH_SHADER: &str = r#"
//@oxy:include camera
//@oxy:group 0 0 storage_uniform camera camera

//@oxy:include material
//@oxy:group 1 0 storage_uniform material material

//@oxy:provider 2 0 material diffuse_texture
@group(2) @binding(0) var t_diffuse: texture_2d<f32>;
//@oxy:provider 2 1 material diffuse_sampler
@group(2) @binding(1) var s_diffuse: sampler;

//@oxy:include vertex

struct InstanceIn {
    @location(3) model_0: vec4<f32>,
    @location(4) model_1: vec4<f32>,
    @location(5) model_2: vec4<f32>,
    @location(6) model_3: vec4<f32>,
    @location(7) tint: vec4<f32>,
}

struct VertexOutput {
    @builtin(position) clip_position: vec4<f32>,
    @location(0) world_normal: vec3<f32>,
    @location(1) uv: vec2<f32>,
    @location(2) tint: vec4<f32>,
}

@vertex
fn vs_main(in: VertexIn, inst: InstanceIn) -> VertexOutput {
    let model = mat4x4<f32>(inst.model_0, inst.model_1, inst.model_2, inst.model_3);
    let world_pos = model * vec4<f32>(in.position, 1.0);

    var out: VertexOutput;
    out.clip_position = camera.view_proj * world_pos;
    out.world_normal = normalize((model * vec4<f32>(in.normal, 0.0)).xyz);
    out.uv = in.uv;
    out.tint = inst.tint;
    return out;
}

@fragment
fn fs_main(in: VertexOutput) -> @location(0) vec4<f32> {
    let light_dir = normalize(vec3<f32>(0.3, 1.0, 0.5));
    let diffuse = max(dot(in.world_normal, light_dir), 0.0);
    let lighting = 0.3 + diffuse * 0.7;
    let albedo = textureSample(t_diffuse, s_diffuse, in.uv) * material.base_color * in.tint;
    return vec4<f32>(albedo.rgb * lighting, albedo.a);
}
"#;

/// Debug grid shader: camera uniform only, per-vertex color lines.
pub const GRID_SHADER: &str = r#"
//@oxy:include camera
//@oxy:group 0 0 storage_uniform camera camera

struct GridVertex {
    @location(0) position: vec3<f32>,
    @location(1) color: vec4<f32>,
}

struct GridOutput {
    @builtin(position) clip_position: vec4<f32>,
    @location(0) color: vec4<f32>,
}

@vertex
fn vs_grid(vertex: GridVertex) -> GridOutput {
    var out: GridOutput;
    out.clip_position = camera.view_proj * vec4<f32>(vertex.position, 1.0);
    out.color = vertex.color;
    return out;
}

@fragment
fn fs_grid(in: GridOutput) -> @location(0) vec4<f32> {
    return in.color;
}
"#;

/// Tile light-culling compute shader.
pub const LIGHT_CULL_SHADER: &str = r#"
//@oxy:include camera
//@oxy:group 0 0 storage_uniform camera camera

//@oxy:include light
//@oxy:group 1 0 storage_read scene_lights array<light>
//@oxy:include tiles
//@oxy:group 1 1 storage_read_write tile_grid tiles

@compute @workgroup_size(16, 16)
fn cs_cull(@builtin(global_invocation_id) id: vec3<u32>) {
    if (id.x >= tile_grid.tiles_x || id.y >= tile_grid.tiles_y) {
        return;
    }
    let tile = id.y * tile_grid.tiles_x + id.x;
    tile_grid.tiles[tile].offset = 0u;
    tile_grid.tiles[tile].count = 0u;
}
"#;
