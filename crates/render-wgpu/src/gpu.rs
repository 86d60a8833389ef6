//! wgpu backend wired entirely from shader reflection: bind group layouts,
//! pipeline layouts and vertex state all come out of `oxy_shader::Shader`.

use std::collections::BTreeMap;

use bytemuck::{Pod, Zeroable};
use thiserror::Error;
use tracing::{debug, info};
use wgpu::util::DeviceExt;

use oxy_render::{
    BlendMode, CullMode, FrameQueue, FrameWork, Material, PipelineOptions, Topology,
};
use oxy_shader::{PreprocessError, Shader, StructRegistry};

use crate::camera::FlyCamera;
use crate::shaders;

#[derive(Debug, Error)]
pub enum RenderError {
    #[error(transparent)]
    Shader(#[from] PreprocessError),
    #[error("shader `{shader}` is missing its {stage} entry point")]
    MissingEntryPoint {
        shader: &'static str,
        stage: &'static str,
    },
    #[error("no compatible gpu adapter found")]
    NoAdapter,
    #[error(transparent)]
    Device(#[from] wgpu::RequestDeviceError),
}

/// Headless device for tools and tests; no surface involved.
pub fn init_headless() -> Result<(wgpu::Device, wgpu::Queue), RenderError> {
    let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
        backends: wgpu::Backends::all(),
        ..Default::default()
    });
    let adapter = pollster::block_on(instance.request_adapter(&wgpu::RequestAdapterOptions {
        power_preference: wgpu::PowerPreference::HighPerformance,
        compatible_surface: None,
        force_fallback_adapter: false,
    }))
    .ok_or(RenderError::NoAdapter)?;
    info!(adapter = %adapter.get_info().name, "headless device");
    let (device, queue) = pollster::block_on(adapter.request_device(
        &wgpu::DeviceDescriptor {
            label: Some("oxy_headless_device"),
            required_features: wgpu::Features::empty(),
            required_limits: wgpu::Limits::default(),
            memory_hints: Default::default(),
        },
        None,
    ))?;
    Ok((device, queue))
}

#[repr(C)]
#[derive(Copy, Clone, Pod, Zeroable)]
struct MaterialUniform {
    base_color: [f32; 4],
    emissive: [f32; 4],
    metallic: f32,
    roughness: f32,
    flags: u32,
    _pad: f32,
}

impl MaterialUniform {
    fn from_material(material: &Material) -> Self {
        Self {
            base_color: material.base_color.to_array(),
            emissive: [0.0; 4],
            metallic: material.metallic,
            roughness: material.roughness,
            flags: u32::from(material.has_textures()),
            _pad: 0.0,
        }
    }
}

#[repr(C)]
#[derive(Copy, Clone, Pod, Zeroable)]
struct MeshVertex {
    position: [f32; 3],
    normal: [f32; 3],
    uv: [f32; 2],
}

#[repr(C)]
#[derive(Copy, Clone, Pod, Zeroable)]
struct InstanceData {
    model: [[f32; 4]; 4],
    tint: [f32; 4],
}

#[repr(C)]
#[derive(Copy, Clone, Pod, Zeroable)]
struct GridVertex {
    position: [f32; 3],
    color: [f32; 4],
}

pub(crate) fn map_topology(topology: Topology) -> wgpu::PrimitiveTopology {
    match topology {
        Topology::TriangleList => wgpu::PrimitiveTopology::TriangleList,
        Topology::LineList => wgpu::PrimitiveTopology::LineList,
        Topology::PointList => wgpu::PrimitiveTopology::PointList,
    }
}

pub(crate) fn map_cull_mode(cull: CullMode) -> Option<wgpu::Face> {
    match cull {
        CullMode::Back => Some(wgpu::Face::Back),
        CullMode::Front => Some(wgpu::Face::Front),
        CullMode::None => None,
    }
}

pub(crate) fn map_blend(blend: BlendMode) -> Option<wgpu::BlendState> {
    match blend {
        BlendMode::Replace => Some(wgpu::BlendState::REPLACE),
        BlendMode::Alpha => Some(wgpu::BlendState::ALPHA_BLENDING),
        BlendMode::Additive => Some(wgpu::BlendState {
            color: wgpu::BlendComponent {
                src_factor: wgpu::BlendFactor::One,
                dst_factor: wgpu::BlendFactor::One,
                operation: wgpu::BlendOperation::Add,
            },
            alpha: wgpu::BlendComponent {
                src_factor: wgpu::BlendFactor::One,
                dst_factor: wgpu::BlendFactor::One,
                operation: wgpu::BlendOperation::Add,
            },
        }),
    }
}

pub(crate) fn map_depth(options: &PipelineOptions) -> Option<wgpu::DepthStencilState> {
    options.depth_test.then(|| wgpu::DepthStencilState {
        format: wgpu::TextureFormat::Depth32Float,
        depth_write_enabled: options.depth_write,
        depth_compare: wgpu::CompareFunction::Less,
        stencil: Default::default(),
        bias: Default::default(),
    })
}

/// Unit cube with per-face normals.
fn cube_mesh() -> (Vec<MeshVertex>, Vec<u16>) {
    let p = 0.5_f32;
    let face = |normal: [f32; 3], corners: [[f32; 3]; 4]| {
        corners.map(|position| MeshVertex {
            position,
            normal,
            uv: [0.0, 0.0],
        })
    };
    #[rustfmt::skip]
    let faces = [
        face([0.0, 0.0, 1.0],  [[-p, -p, p], [p, -p, p], [p, p, p], [-p, p, p]]),
        face([0.0, 0.0, -1.0], [[p, -p, -p], [-p, -p, -p], [-p, p, -p], [p, p, -p]]),
        face([1.0, 0.0, 0.0],  [[p, -p, p], [p, -p, -p], [p, p, -p], [p, p, p]]),
        face([-1.0, 0.0, 0.0], [[-p, -p, -p], [-p, -p, p], [-p, p, p], [-p, p, -p]]),
        face([0.0, 1.0, 0.0],  [[-p, p, p], [p, p, p], [p, p, -p], [-p, p, -p]]),
        face([0.0, -1.0, 0.0], [[-p, -p, -p], [p, -p, -p], [p, -p, p], [-p, -p, p]]),
    ];
    let vertices: Vec<MeshVertex> = faces.into_iter().flatten().collect();
    let indices: Vec<u16> = (0..6u16)
        .flat_map(|f| {
            let base = f * 4;
            [base, base + 1, base + 2, base + 2, base + 3, base]
        })
        .collect();
    (vertices, indices)
}

/// Grid floor line vertices.
fn grid_mesh(half_extent: i32, spacing: f32) -> Vec<GridVertex> {
    let mut verts = Vec::new();
    let color = [0.4, 0.4, 0.4, 1.0];
    let extent = half_extent as f32 * spacing;
    for i in -half_extent..=half_extent {
        let offset = i as f32 * spacing;
        verts.push(GridVertex { position: [-extent, 0.0, offset], color });
        verts.push(GridVertex { position: [extent, 0.0, offset], color });
        verts.push(GridVertex { position: [offset, 0.0, -extent], color });
        verts.push(GridVertex { position: [offset, 0.0, extent], color });
    }
    verts
}

/// Create one `wgpu::BindGroupLayout` per reflected group, keyed by group
/// index.
fn create_group_layouts(
    device: &wgpu::Device,
    shader: &Shader,
    label: &str,
) -> BTreeMap<u32, wgpu::BindGroupLayout> {
    shader
        .bind_group_layouts
        .iter()
        .map(|(&group, entries)| {
            let layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                label: Some(&format!("{label}_group{group}")),
                entries,
            });
            (group, layout)
        })
        .collect()
}

fn entry_point(
    shader: &Shader,
    name: &'static str,
    stage: &'static str,
) -> Result<String, RenderError> {
    let found = match stage {
        "vertex" => shader.entry_points.vertex.clone(),
        "fragment" => shader.entry_points.fragment.clone(),
        _ => shader.entry_points.compute.clone(),
    };
    found.ok_or(RenderError::MissingEntryPoint {
        shader: name,
        stage,
    })
}

/// Reflection-driven renderer: mesh pass, grid overlay, tile light culling.
pub struct WgpuRenderer {
    mesh_pipeline: wgpu::RenderPipeline,
    grid_pipeline: wgpu::RenderPipeline,
    cull_pipeline: wgpu::ComputePipeline,
    cull_workgroup_size: [u32; 3],

    camera_buffer: wgpu::Buffer,
    material_buffer: wgpu::Buffer,
    mesh_bind_groups: Vec<wgpu::BindGroup>,
    cull_bind_groups: Vec<wgpu::BindGroup>,
    grid_bind_group: wgpu::BindGroup,

    cube_vertex_buffer: wgpu::Buffer,
    cube_index_buffer: wgpu::Buffer,
    cube_index_count: u32,
    grid_vertex_buffer: wgpu::Buffer,
    grid_vertex_count: u32,
    instance_buffer: wgpu::Buffer,
    max_instances: u32,

    depth_texture: wgpu::TextureView,
    surface_format: wgpu::TextureFormat,
}

impl WgpuRenderer {
    pub fn new(
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        surface_format: wgpu::TextureFormat,
        width: u32,
        height: u32,
    ) -> Result<Self, RenderError> {
        let registry = StructRegistry::engine();
        let mesh = Shader::from_source(shaders::MESH_SHADER, &registry)?;
        let grid = Shader::from_source(shaders::GRID_SHADER, &registry)?;
        let cull = Shader::from_source(shaders::LIGHT_CULL_SHADER, &registry)?;
        debug!(
            mesh_groups = mesh.bind_group_layouts.len(),
            grid_groups = grid.bind_group_layouts.len(),
            "engine shaders reflected"
        );

        let camera_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("camera_buffer"),
            contents: bytemuck::bytes_of(&FlyCamera::default().uniform()),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });
        let material_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("material_buffer"),
            contents: bytemuck::bytes_of(&MaterialUniform::from_material(&Material::default())),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });

        // 1x1 white fallback for unbound texture slots.
        let white = device.create_texture_with_data(
            queue,
            &wgpu::TextureDescriptor {
                label: Some("fallback_texture"),
                size: wgpu::Extent3d::default(),
                mip_level_count: 1,
                sample_count: 1,
                dimension: wgpu::TextureDimension::D2,
                format: wgpu::TextureFormat::Rgba8Unorm,
                usage: wgpu::TextureUsages::TEXTURE_BINDING,
                view_formats: &[],
            },
            Default::default(),
            &[255, 255, 255, 255],
        );
        let white_view = white.create_view(&Default::default());
        let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("default_sampler"),
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            ..Default::default()
        });

        // Mesh pass: groups 0 (camera), 1 (material), 2 (textures).
        let mesh_layouts = create_group_layouts(device, &mesh, "mesh");
        let mesh_bind_groups = vec![
            device.create_bind_group(&wgpu::BindGroupDescriptor {
                label: Some("mesh_camera_bind_group"),
                layout: &mesh_layouts[&0],
                entries: &[wgpu::BindGroupEntry {
                    binding: 0,
                    resource: camera_buffer.as_entire_binding(),
                }],
            }),
            device.create_bind_group(&wgpu::BindGroupDescriptor {
                label: Some("mesh_material_bind_group"),
                layout: &mesh_layouts[&1],
                entries: &[wgpu::BindGroupEntry {
                    binding: 0,
                    resource: material_buffer.as_entire_binding(),
                }],
            }),
            device.create_bind_group(&wgpu::BindGroupDescriptor {
                label: Some("mesh_texture_bind_group"),
                layout: &mesh_layouts[&2],
                entries: &[
                    wgpu::BindGroupEntry {
                        binding: 0,
                        resource: wgpu::BindingResource::TextureView(&white_view),
                    },
                    wgpu::BindGroupEntry {
                        binding: 1,
                        resource: wgpu::BindingResource::Sampler(&sampler),
                    },
                ],
            }),
        ];

        let mesh_module = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("mesh_shader"),
            source: wgpu::ShaderSource::Wgsl(mesh.source.clone().into()),
        });
        let mesh_pipeline_layout =
            device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
                label: Some("mesh_pipeline_layout"),
                bind_group_layouts: &mesh_layouts.values().collect::<Vec<_>>(),
                push_constant_ranges: &[],
            });
        let mesh_options = PipelineOptions::default();
        let mesh_pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("mesh_pipeline"),
            layout: Some(&mesh_pipeline_layout),
            vertex: wgpu::VertexState {
                module: &mesh_module,
                entry_point: Some(&entry_point(&mesh, "mesh", "vertex")?),
                compilation_options: Default::default(),
                buffers: &[
                    mesh.vertex_layouts[&0].as_wgpu(),
                    // Key 1 is the instance stream; reflection cannot see
                    // step mode, so it is overridden here.
                    wgpu::VertexBufferLayout {
                        array_stride: mesh.vertex_layouts[&1].stride,
                        step_mode: wgpu::VertexStepMode::Instance,
                        attributes: &mesh.vertex_layouts[&1].attributes,
                    },
                ],
            },
            fragment: Some(wgpu::FragmentState {
                module: &mesh_module,
                entry_point: Some(&entry_point(&mesh, "mesh", "fragment")?),
                compilation_options: Default::default(),
                targets: &[Some(wgpu::ColorTargetState {
                    format: surface_format,
                    blend: map_blend(mesh_options.blend),
                    write_mask: wgpu::ColorWrites::ALL,
                })],
            }),
            primitive: wgpu::PrimitiveState {
                topology: map_topology(mesh_options.topology),
                cull_mode: map_cull_mode(mesh_options.cull_mode),
                ..Default::default()
            },
            depth_stencil: map_depth(&mesh_options),
            multisample: Default::default(),
            multiview: None,
            cache: None,
        });

        // Grid overlay: camera group only, line topology.
        let grid_layouts = create_group_layouts(device, &grid, "grid");
        let grid_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("grid_bind_group"),
            layout: &grid_layouts[&0],
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: camera_buffer.as_entire_binding(),
            }],
        });
        let grid_module = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("grid_shader"),
            source: wgpu::ShaderSource::Wgsl(grid.source.clone().into()),
        });
        let grid_pipeline_layout =
            device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
                label: Some("grid_pipeline_layout"),
                bind_group_layouts: &grid_layouts.values().collect::<Vec<_>>(),
                push_constant_ranges: &[],
            });
        let grid_options = PipelineOptions::lines();
        let grid_pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("grid_pipeline"),
            layout: Some(&grid_pipeline_layout),
            vertex: wgpu::VertexState {
                module: &grid_module,
                entry_point: Some(&entry_point(&grid, "grid", "vertex")?),
                compilation_options: Default::default(),
                buffers: &[grid.vertex_layouts[&0].as_wgpu()],
            },
            fragment: Some(wgpu::FragmentState {
                module: &grid_module,
                entry_point: Some(&entry_point(&grid, "grid", "fragment")?),
                compilation_options: Default::default(),
                targets: &[Some(wgpu::ColorTargetState {
                    format: surface_format,
                    blend: map_blend(grid_options.blend),
                    write_mask: wgpu::ColorWrites::ALL,
                })],
            }),
            primitive: wgpu::PrimitiveState {
                topology: map_topology(grid_options.topology),
                cull_mode: map_cull_mode(grid_options.cull_mode),
                ..Default::default()
            },
            depth_stencil: map_depth(&grid_options),
            multisample: Default::default(),
            multiview: None,
            cache: None,
        });

        // Light culling: storage buffers sized from reflected minimums.
        let lights_size = cull.bind_group_layouts[&1]
            .first()
            .and_then(|e| match e.ty {
                wgpu::BindingType::Buffer {
                    min_binding_size, ..
                } => min_binding_size,
                _ => None,
            })
            .map_or(64, u64::from);
        let max_lights = 64u64;
        let lights_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("lights_buffer"),
            size: lights_size * max_lights,
            usage: wgpu::BufferUsages::STORAGE | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        let max_tiles = 4096u64;
        let tiles_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("tiles_buffer"),
            // Fixed TileGrid header plus one LightTile per tile.
            size: 16 + max_tiles * 8,
            usage: wgpu::BufferUsages::STORAGE | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        let cull_layouts = create_group_layouts(device, &cull, "cull");
        let cull_bind_groups = vec![
            device.create_bind_group(&wgpu::BindGroupDescriptor {
                label: Some("cull_camera_bind_group"),
                layout: &cull_layouts[&0],
                entries: &[wgpu::BindGroupEntry {
                    binding: 0,
                    resource: camera_buffer.as_entire_binding(),
                }],
            }),
            device.create_bind_group(&wgpu::BindGroupDescriptor {
                label: Some("cull_storage_bind_group"),
                layout: &cull_layouts[&1],
                entries: &[
                    wgpu::BindGroupEntry {
                        binding: 0,
                        resource: lights_buffer.as_entire_binding(),
                    },
                    wgpu::BindGroupEntry {
                        binding: 1,
                        resource: tiles_buffer.as_entire_binding(),
                    },
                ],
            }),
        ];
        let cull_module = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("light_cull_shader"),
            source: wgpu::ShaderSource::Wgsl(cull.source.clone().into()),
        });
        let cull_pipeline_layout =
            device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
                label: Some("cull_pipeline_layout"),
                bind_group_layouts: &cull_layouts.values().collect::<Vec<_>>(),
                push_constant_ranges: &[],
            });
        let cull_pipeline = device.create_compute_pipeline(&wgpu::ComputePipelineDescriptor {
            label: Some("cull_pipeline"),
            layout: Some(&cull_pipeline_layout),
            module: &cull_module,
            entry_point: Some(&entry_point(&cull, "light_cull", "compute")?),
            compilation_options: Default::default(),
            cache: None,
        });

        let (cube_verts, cube_indices) = cube_mesh();
        let cube_vertex_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("cube_vertex_buffer"),
            contents: bytemuck::cast_slice(&cube_verts),
            usage: wgpu::BufferUsages::VERTEX,
        });
        let cube_index_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("cube_index_buffer"),
            contents: bytemuck::cast_slice(&cube_indices),
            usage: wgpu::BufferUsages::INDEX,
        });
        let cube_index_count = cube_indices.len() as u32;

        let grid_verts = grid_mesh(50, 1.0);
        let grid_vertex_count = grid_verts.len() as u32;
        let grid_vertex_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("grid_vertex_buffer"),
            contents: bytemuck::cast_slice(&grid_verts),
            usage: wgpu::BufferUsages::VERTEX,
        });

        let max_instances = 10_000u32;
        let instance_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("instance_buffer"),
            size: u64::from(max_instances) * std::mem::size_of::<InstanceData>() as u64,
            usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let depth_texture = Self::create_depth_texture(device, width, height);

        Ok(Self {
            mesh_pipeline,
            grid_pipeline,
            cull_pipeline,
            cull_workgroup_size: cull.workgroup_size,
            camera_buffer,
            material_buffer,
            mesh_bind_groups,
            cull_bind_groups,
            grid_bind_group,
            cube_vertex_buffer,
            cube_index_buffer,
            cube_index_count,
            grid_vertex_buffer,
            grid_vertex_count,
            instance_buffer,
            max_instances,
            depth_texture,
            surface_format,
        })
    }

    pub fn resize(&mut self, device: &wgpu::Device, width: u32, height: u32) {
        self.depth_texture = Self::create_depth_texture(device, width, height);
    }

    pub fn surface_format(&self) -> wgpu::TextureFormat {
        self.surface_format
    }

    pub fn cull_workgroup_size(&self) -> [u32; 3] {
        self.cull_workgroup_size
    }

    /// Render one frame: compute work first, then grid floor and draws.
    ///
    /// All draws share one material uniform, taken from the first draw of
    /// the frame; per-draw color rides in the instance tint.
    /// TODO: per-material uniforms via dynamic offsets.
    pub fn render(
        &self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        target: &wgpu::TextureView,
        camera: &FlyCamera,
        frame: &mut FrameQueue,
    ) {
        queue.write_buffer(&self.camera_buffer, 0, bytemuck::bytes_of(&camera.uniform()));

        let mut instances: Vec<InstanceData> = Vec::new();
        let mut dispatches: Vec<[u32; 3]> = Vec::new();
        let mut frame_material: Option<Material> = None;
        for work in frame.drain() {
            match work {
                FrameWork::Draw(draw) => {
                    if instances.len() >= self.max_instances as usize {
                        debug!(max = self.max_instances, "instance budget hit, dropping draw");
                        continue;
                    }
                    instances.push(InstanceData {
                        model: draw.model.to_cols_array_2d(),
                        tint: draw.material.base_color.to_array(),
                    });
                    frame_material.get_or_insert(draw.material);
                }
                FrameWork::Compute(compute) => dispatches.push(compute.workgroups),
            }
        }
        if let Some(material) = &frame_material {
            queue.write_buffer(
                &self.material_buffer,
                0,
                bytemuck::bytes_of(&MaterialUniform::from_material(material)),
            );
        }
        if !instances.is_empty() {
            queue.write_buffer(&self.instance_buffer, 0, bytemuck::cast_slice(&instances));
        }

        let mut encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("frame_encoder"),
        });

        if !dispatches.is_empty() {
            let mut pass = encoder.begin_compute_pass(&wgpu::ComputePassDescriptor {
                label: Some("cull_pass"),
                timestamp_writes: None,
            });
            pass.set_pipeline(&self.cull_pipeline);
            for (i, group) in self.cull_bind_groups.iter().enumerate() {
                pass.set_bind_group(i as u32, group, &[]);
            }
            for [x, y, z] in dispatches {
                pass.dispatch_workgroups(x, y, z);
            }
        }

        {
            let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("main_pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: target,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(wgpu::Color {
                            r: 0.1,
                            g: 0.1,
                            b: 0.15,
                            a: 1.0,
                        }),
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                    view: &self.depth_texture,
                    depth_ops: Some(wgpu::Operations {
                        load: wgpu::LoadOp::Clear(1.0),
                        store: wgpu::StoreOp::Store,
                    }),
                    stencil_ops: None,
                }),
                ..Default::default()
            });

            pass.set_pipeline(&self.grid_pipeline);
            pass.set_bind_group(0, &self.grid_bind_group, &[]);
            pass.set_vertex_buffer(0, self.grid_vertex_buffer.slice(..));
            pass.draw(0..self.grid_vertex_count, 0..1);

            if !instances.is_empty() {
                pass.set_pipeline(&self.mesh_pipeline);
                for (i, group) in self.mesh_bind_groups.iter().enumerate() {
                    pass.set_bind_group(i as u32, group, &[]);
                }
                pass.set_vertex_buffer(0, self.cube_vertex_buffer.slice(..));
                pass.set_vertex_buffer(1, self.instance_buffer.slice(..));
                pass.set_index_buffer(self.cube_index_buffer.slice(..), wgpu::IndexFormat::Uint16);
                pass.draw_indexed(0..self.cube_index_count, 0, 0..instances.len() as u32);
            }
        }

        queue.submit(std::iter::once(encoder.finish()));
    }

    fn create_depth_texture(device: &wgpu::Device, width: u32, height: u32) -> wgpu::TextureView {
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some("depth_texture"),
            size: wgpu::Extent3d {
                width: width.max(1),
                height: height.max(1),
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: wgpu::TextureFormat::Depth32Float,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            view_formats: &[],
        });
        texture.create_view(&Default::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn option_mapping_matches_wgpu() {
        assert_eq!(
            map_topology(Topology::LineList),
            wgpu::PrimitiveTopology::LineList
        );
        assert_eq!(map_cull_mode(CullMode::None), None);
        assert_eq!(map_cull_mode(CullMode::Back), Some(wgpu::Face::Back));
        assert_eq!(map_blend(BlendMode::Replace), Some(wgpu::BlendState::REPLACE));
    }

    #[test]
    fn depth_mapping_honors_flags() {
        let opts = PipelineOptions::default();
        let depth = map_depth(&opts).unwrap();
        assert!(depth.depth_write_enabled);

        let opts = PipelineOptions::transparent();
        let depth = map_depth(&opts).unwrap();
        assert!(!depth.depth_write_enabled);

        let opts = PipelineOptions::default().with_depth_test(false);
        assert!(map_depth(&opts).is_none());
    }

    #[test]
    fn cpu_structs_match_reflected_strides() {
        let registry = StructRegistry::engine();
        let mesh = Shader::from_source(shaders::MESH_SHADER, &registry).unwrap();
        assert_eq!(
            std::mem::size_of::<MeshVertex>() as u64,
            mesh.vertex_layouts[&0].stride
        );
        assert_eq!(
            std::mem::size_of::<InstanceData>() as u64,
            mesh.vertex_layouts[&1].stride
        );
        assert_eq!(
            std::mem::size_of::<MaterialUniform>() as u64,
            mesh.struct_layouts["MaterialParams"].size
        );
    }

    #[test]
    fn cube_mesh_is_watertight_quads() {
        let (verts, indices) = cube_mesh();
        assert_eq!(verts.len(), 24);
        assert_eq!(indices.len(), 36);
        assert!(indices.iter().all(|&i| (i as usize) < verts.len()));
    }

    #[test]
    fn grid_mesh_line_count() {
        let verts = grid_mesh(2, 1.0);
        // 5 lines per axis, 2 vertices each.
        assert_eq!(verts.len(), 5 * 2 * 2);
    }
}
