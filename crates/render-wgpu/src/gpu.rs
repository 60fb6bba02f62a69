use crate::camera::{CameraMatrices, clip_plane_above};
use crate::shaders;
use bytemuck::{Pod, Zeroable};
use glam::{Mat4, Vec2, Vec3, Vec4};
use pitchwalk_scene::{ImageRgba8, MeshData, Scene, WaterSurface};
use std::collections::HashMap;
use std::sync::Arc;
use wgpu::util::DeviceExt;

const DEPTH_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Depth32Float;

#[repr(C)]
#[derive(Copy, Clone, Debug, Pod, Zeroable)]
struct FrameUniforms {
    view_proj: [[f32; 4]; 4],
    light_view_proj: [[f32; 4]; 4],
    eye: [f32; 4],
    light_dir: [f32; 4],
    light_color: [f32; 4],
    ambient: [f32; 4],
    fog_color: [f32; 4],
    fog_range: [f32; 4],
    clip_plane: [f32; 4],
}

#[repr(C)]
#[derive(Copy, Clone, Debug, Pod, Zeroable)]
struct ModelUniforms {
    model: [[f32; 4]; 4],
    normal_matrix: [[f32; 4]; 4],
    base_color: [f32; 4],
}

#[repr(C)]
#[derive(Copy, Clone, Debug, Pod, Zeroable)]
struct WaterUniforms {
    model: [[f32; 4]; 4],
    mirror_view_proj: [[f32; 4]; 4],
    sun_direction: [f32; 4],
    sun_color: [f32; 4],
    water_color: [f32; 4],
    params: [f32; 4],
}

#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, Pod, Zeroable)]
struct Vertex {
    position: [f32; 3],
    normal: [f32; 3],
    uv: [f32; 2],
}

const VERTEX_ATTRIBUTES: [wgpu::VertexAttribute; 3] =
    wgpu::vertex_attr_array![0 => Float32x3, 1 => Float32x3, 2 => Float32x2];

fn vertex_layout() -> wgpu::VertexBufferLayout<'static> {
    wgpu::VertexBufferLayout {
        array_stride: std::mem::size_of::<Vertex>() as u64,
        step_mode: wgpu::VertexStepMode::Vertex,
        attributes: &VERTEX_ATTRIBUTES,
    }
}

/// Missing UVs read as zero.
fn interleave(mesh: &MeshData) -> Vec<Vertex> {
    mesh.positions
        .iter()
        .zip(&mesh.normals)
        .enumerate()
        .map(|(i, (p, n))| Vertex {
            position: p.to_array(),
            normal: n.to_array(),
            uv: mesh.uvs.get(i).copied().unwrap_or(Vec2::ZERO).to_array(),
        })
        .collect()
}

fn flag(on: bool) -> f32 {
    if on { 1.0 } else { 0.0 }
}

fn frame_uniforms(
    camera: &CameraMatrices,
    scene: &Scene,
    clip_plane: Vec4,
    mirrored: bool,
) -> FrameUniforms {
    let lighting = scene.lighting();
    let light = &lighting.directional;
    let shadow = &light.shadow;
    let light_rgb = Vec3::from(light.color.to_linear()) * light.intensity;
    let ambient_rgb = Vec3::from(lighting.ambient.color.to_linear()) * lighting.ambient.intensity;
    let (fog_on, fog_rgb, near, far) = match scene.fog() {
        Some(fog) => (true, Vec3::from(fog.color.to_linear()), fog.near, fog.far),
        None => (false, Vec3::ZERO, 0.0, 0.0),
    };

    FrameUniforms {
        view_proj: camera.view_projection().to_cols_array_2d(),
        light_view_proj: light.shadow_view_projection().to_cols_array_2d(),
        eye: camera.eye.extend(flag(fog_on)).to_array(),
        light_dir: (-light.direction()).extend(flag(light.cast_shadow)).to_array(),
        light_color: light_rgb.extend(shadow.bias).to_array(),
        ambient: ambient_rgb
            .extend(1.0 / shadow.map_size.max(1) as f32)
            .to_array(),
        fog_color: fog_rgb.extend(1.0).to_array(),
        fog_range: [near, far, flag(mirrored), 0.0],
        clip_plane: clip_plane.to_array(),
    }
}

fn model_uniforms(world: Mat4, base_color: [f32; 4]) -> ModelUniforms {
    let normal_matrix = world.inverse().transpose();
    let normal_matrix = if normal_matrix.is_finite() {
        normal_matrix
    } else {
        world
    };
    ModelUniforms {
        model: world.to_cols_array_2d(),
        normal_matrix: normal_matrix.to_cols_array_2d(),
        base_color,
    }
}

fn water_uniforms(water: &WaterSurface, mirror_view_proj: Mat4) -> WaterUniforms {
    let cfg = &water.config;
    let sun_direction = cfg
        .sun_direction
        .try_normalize()
        .map_or(Vec4::ZERO, |d| d.extend(1.0));
    WaterUniforms {
        model: water.world_matrix().to_cols_array_2d(),
        mirror_view_proj: mirror_view_proj.to_cols_array_2d(),
        sun_direction: sun_direction.to_array(),
        sun_color: Vec3::from(cfg.sun_color.to_linear())
            .extend(cfg.alpha)
            .to_array(),
        water_color: Vec3::from(cfg.water_color.to_linear())
            .extend(cfg.distortion_scale)
            .to_array(),
        params: [water.time(), cfg.noise_scale, flag(water.fog), 0.0],
    }
}

fn clear_color(scene: &Scene) -> wgpu::Color {
    let [r, g, b] = scene.background().to_linear();
    wgpu::Color {
        r: r as f64,
        g: g as f64,
        b: b as f64,
        a: 1.0,
    }
}

/// Vertex/index buffers for one mesh plus its model bind group.
struct GpuMesh {
    vertex_buffer: wgpu::Buffer,
    index_buffer: wgpu::Buffer,
    index_count: u32,
    bind_group: wgpu::BindGroup,
    /// Base colour texture; scene meshes only.
    material_bind_group: Option<wgpu::BindGroup>,
    double_sided: bool,
}

impl GpuMesh {
    fn new(
        device: &wgpu::Device,
        layout: &wgpu::BindGroupLayout,
        label: &str,
        mesh: &MeshData,
        uniform_bytes: &[u8],
        double_sided: bool,
    ) -> (Self, wgpu::Buffer) {
        let vertex_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(label),
            contents: bytemuck::cast_slice(&interleave(mesh)),
            usage: wgpu::BufferUsages::VERTEX,
        });
        let index_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(label),
            contents: bytemuck::cast_slice(&mesh.indices),
            usage: wgpu::BufferUsages::INDEX,
        });
        let uniform_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(label),
            contents: uniform_bytes,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });
        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some(label),
            layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: uniform_buffer.as_entire_binding(),
            }],
        });
        let gpu = Self {
            vertex_buffer,
            index_buffer,
            index_count: mesh.indices.len() as u32,
            bind_group,
            material_bind_group: None,
            double_sided,
        };
        (gpu, uniform_buffer)
    }

    fn draw(&self, pass: &mut wgpu::RenderPass<'_>) {
        pass.set_bind_group(1, &self.bind_group, &[]);
        pass.set_vertex_buffer(0, self.vertex_buffer.slice(..));
        pass.set_index_buffer(self.index_buffer.slice(..), wgpu::IndexFormat::Uint32);
        pass.draw_indexed(0..self.index_count, 0, 0..1);
    }
}

struct GpuWater {
    mesh: GpuMesh,
    uniform_buffer: wgpu::Buffer,
}

/// Colour + depth attachment pair the reflection pass renders into.
struct ReflectionTarget {
    color: wgpu::TextureView,
    depth: wgpu::TextureView,
}

/// Pipelines for single- and double-sided materials.
struct ScenePipelines {
    single: wgpu::RenderPipeline,
    double: wgpu::RenderPipeline,
}

/// wgpu renderer for the walk-through scene: shadow map, planar water
/// reflection, lit geometry and the water surface.
pub struct WgpuRenderer {
    surface_format: wgpu::TextureFormat,
    uniform_layout: wgpu::BindGroupLayout,
    material_layout: wgpu::BindGroupLayout,
    base_color_sampler: wgpu::Sampler,
    /// Bound for materials without a base colour texture.
    white_texture: wgpu::TextureView,
    main_pipelines: ScenePipelines,
    mirror_pipelines: ScenePipelines,
    shadow_pipeline: wgpu::RenderPipeline,
    water_pipeline: wgpu::RenderPipeline,
    main_frame_buffer: wgpu::Buffer,
    main_frame_bind_group: wgpu::BindGroup,
    mirror_frame_buffer: wgpu::Buffer,
    mirror_frame_bind_group: wgpu::BindGroup,
    shadow_view: wgpu::TextureView,
    shadow_bind_group: wgpu::BindGroup,
    reflection: ReflectionTarget,
    water_textures_bind_group: wgpu::BindGroup,
    meshes: Vec<GpuMesh>,
    water: Option<GpuWater>,
    uploaded_revision: Option<u64>,
    depth_texture: wgpu::TextureView,
}

impl WgpuRenderer {
    pub fn new(
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        surface_format: wgpu::TextureFormat,
        width: u32,
        height: u32,
        scene: &Scene,
        normal_map: &ImageRgba8,
    ) -> Self {
        let uniform_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("uniform_layout"),
            entries: &[wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::VERTEX | wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: false,
                    min_binding_size: None,
                },
                count: None,
            }],
        });

        let shadow_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("shadow_layout"),
            entries: &[
                wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Texture {
                        sample_type: wgpu::TextureSampleType::Depth,
                        view_dimension: wgpu::TextureViewDimension::D2,
                        multisampled: false,
                    },
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 1,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Comparison),
                    count: None,
                },
            ],
        });

        let filtered_texture = |binding| wgpu::BindGroupLayoutEntry {
            binding,
            visibility: wgpu::ShaderStages::FRAGMENT,
            ty: wgpu::BindingType::Texture {
                sample_type: wgpu::TextureSampleType::Float { filterable: true },
                view_dimension: wgpu::TextureViewDimension::D2,
                multisampled: false,
            },
            count: None,
        };
        let filtering_sampler = |binding| wgpu::BindGroupLayoutEntry {
            binding,
            visibility: wgpu::ShaderStages::FRAGMENT,
            ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
            count: None,
        };
        let water_textures_layout =
            device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                label: Some("water_textures_layout"),
                entries: &[
                    filtered_texture(0),
                    filtering_sampler(1),
                    filtered_texture(2),
                    filtering_sampler(3),
                ],
            });

        let material_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("material_layout"),
            entries: &[filtered_texture(0), filtering_sampler(1)],
        });

        let scene_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("scene_pipeline_layout"),
            bind_group_layouts: &[
                &uniform_layout,
                &uniform_layout,
                &shadow_layout,
                &material_layout,
            ],
            push_constant_ranges: &[],
        });
        let shadow_pipeline_layout =
            device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
                label: Some("shadow_pipeline_layout"),
                bind_group_layouts: &[&uniform_layout, &uniform_layout],
                push_constant_ranges: &[],
            });
        let water_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("water_pipeline_layout"),
            bind_group_layouts: &[&uniform_layout, &uniform_layout, &water_textures_layout],
            push_constant_ranges: &[],
        });

        let scene_shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("scene_shader"),
            source: wgpu::ShaderSource::Wgsl(shaders::SCENE_SHADER.into()),
        });
        let water_shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("water_shader"),
            source: wgpu::ShaderSource::Wgsl(shaders::WATER_SHADER.into()),
        });

        let scene_pipeline = |label: &str, cull: Option<wgpu::Face>| {
            color_pipeline(
                device,
                label,
                &scene_layout,
                &scene_shader,
                ("vs_main", "fs_main"),
                surface_format,
                cull,
                wgpu::BlendState::REPLACE,
            )
        };
        // The mirrored view reverses winding, so front and back swap.
        let main_pipelines = ScenePipelines {
            single: scene_pipeline("scene_pipeline", Some(wgpu::Face::Back)),
            double: scene_pipeline("scene_pipeline_double_sided", None),
        };
        let mirror_pipelines = ScenePipelines {
            single: scene_pipeline("mirror_pipeline", Some(wgpu::Face::Front)),
            double: scene_pipeline("mirror_pipeline_double_sided", None),
        };
        let water_pipeline = color_pipeline(
            device,
            "water_pipeline",
            &water_layout,
            &water_shader,
            ("vs_water", "fs_water"),
            surface_format,
            Some(wgpu::Face::Back),
            wgpu::BlendState::ALPHA_BLENDING,
        );

        let shadow_pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("shadow_pipeline"),
            layout: Some(&shadow_pipeline_layout),
            vertex: wgpu::VertexState {
                module: &scene_shader,
                entry_point: Some("vs_shadow"),
                compilation_options: Default::default(),
                buffers: &[vertex_layout()],
            },
            fragment: None,
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::TriangleList,
                cull_mode: None,
                ..Default::default()
            },
            depth_stencil: Some(wgpu::DepthStencilState {
                format: DEPTH_FORMAT,
                depth_write_enabled: true,
                depth_compare: wgpu::CompareFunction::LessEqual,
                stencil: Default::default(),
                bias: Default::default(),
            }),
            multisample: Default::default(),
            multiview: None,
            cache: None,
        });

        let frame_buffer = |label: &str| {
            device.create_buffer(&wgpu::BufferDescriptor {
                label: Some(label),
                size: std::mem::size_of::<FrameUniforms>() as u64,
                usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
                mapped_at_creation: false,
            })
        };
        let uniform_bind_group = |label: &str, buffer: &wgpu::Buffer| {
            device.create_bind_group(&wgpu::BindGroupDescriptor {
                label: Some(label),
                layout: &uniform_layout,
                entries: &[wgpu::BindGroupEntry {
                    binding: 0,
                    resource: buffer.as_entire_binding(),
                }],
            })
        };
        let main_frame_buffer = frame_buffer("main_frame_buffer");
        let main_frame_bind_group = uniform_bind_group("main_frame_bind_group", &main_frame_buffer);
        let mirror_frame_buffer = frame_buffer("mirror_frame_buffer");
        let mirror_frame_bind_group =
            uniform_bind_group("mirror_frame_bind_group", &mirror_frame_buffer);

        // Shadow map
        let map_size = scene.lighting().directional.shadow.map_size.max(1);
        let shadow_view = create_depth_texture(
            device,
            "shadow_map",
            map_size,
            map_size,
            wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::TEXTURE_BINDING,
        );
        let shadow_sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("shadow_sampler"),
            address_mode_u: wgpu::AddressMode::ClampToEdge,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            compare: Some(wgpu::CompareFunction::LessEqual),
            ..Default::default()
        });
        let shadow_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("shadow_bind_group"),
            layout: &shadow_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: wgpu::BindingResource::TextureView(&shadow_view),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::Sampler(&shadow_sampler),
                },
            ],
        });

        // Reflection target
        let (rw, rh) = scene
            .water()
            .map(|w| (w.config.texture_width, w.config.texture_height))
            .unwrap_or((1, 1));
        let reflection = ReflectionTarget {
            color: create_color_texture(device, "reflection_color", rw, rh, surface_format),
            depth: create_depth_texture(
                device,
                "reflection_depth",
                rw,
                rh,
                wgpu::TextureUsages::RENDER_ATTACHMENT,
            ),
        };
        let reflection_sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("reflection_sampler"),
            address_mode_u: wgpu::AddressMode::ClampToEdge,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            ..Default::default()
        });

        // Normal map tiles across the surface.
        let normal_view = upload_image(
            device,
            queue,
            "water_normal_map",
            normal_map,
            wgpu::TextureFormat::Rgba8Unorm,
            ImageRgba8::flat_normal,
        );
        let normal_sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("normal_sampler"),
            address_mode_u: wgpu::AddressMode::Repeat,
            address_mode_v: wgpu::AddressMode::Repeat,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            ..Default::default()
        });
        let water_textures_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("water_textures_bind_group"),
            layout: &water_textures_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: wgpu::BindingResource::TextureView(&reflection.color),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::Sampler(&reflection_sampler),
                },
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: wgpu::BindingResource::TextureView(&normal_view),
                },
                wgpu::BindGroupEntry {
                    binding: 3,
                    resource: wgpu::BindingResource::Sampler(&normal_sampler),
                },
            ],
        });

        let base_color_sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("base_color_sampler"),
            address_mode_u: wgpu::AddressMode::Repeat,
            address_mode_v: wgpu::AddressMode::Repeat,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            ..Default::default()
        });
        let white_texture = upload_image(
            device,
            queue,
            "white_texture",
            &ImageRgba8::solid([255; 4]),
            wgpu::TextureFormat::Rgba8UnormSrgb,
            || ImageRgba8::solid([255; 4]),
        );

        let depth_texture = create_depth_texture(
            device,
            "depth_texture",
            width,
            height,
            wgpu::TextureUsages::RENDER_ATTACHMENT,
        );

        let mut renderer = Self {
            surface_format,
            uniform_layout,
            material_layout,
            base_color_sampler,
            white_texture,
            main_pipelines,
            mirror_pipelines,
            shadow_pipeline,
            water_pipeline,
            main_frame_buffer,
            main_frame_bind_group,
            mirror_frame_buffer,
            mirror_frame_bind_group,
            shadow_view,
            shadow_bind_group,
            reflection,
            water_textures_bind_group,
            meshes: Vec::new(),
            water: None,
            uploaded_revision: None,
            depth_texture,
        };
        renderer.upload_scene(device, queue, scene);
        renderer
    }

    pub fn resize(&mut self, device: &wgpu::Device, width: u32, height: u32) {
        self.depth_texture = create_depth_texture(
            device,
            "depth_texture",
            width,
            height,
            wgpu::TextureUsages::RENDER_ATTACHMENT,
        );
    }

    pub fn surface_format(&self) -> wgpu::TextureFormat {
        self.surface_format
    }

    /// Number of meshes currently resident on the GPU.
    pub fn mesh_count(&self) -> usize {
        self.meshes.len()
    }

    /// Rebuild GPU buffers and textures when the scene's node set has changed.
    pub fn upload_scene(&mut self, device: &wgpu::Device, queue: &wgpu::Queue, scene: &Scene) {
        if self.uploaded_revision == Some(scene.revision()) {
            return;
        }

        // Materials sharing an image share one GPU texture.
        let mut textures: HashMap<*const ImageRgba8, wgpu::TextureView> = HashMap::new();
        let mut meshes = Vec::new();
        for node in scene.nodes().iter().filter(|node| !node.mesh.is_empty()) {
            let uniforms = model_uniforms(node.world, node.material.base_color);
            let (mut mesh, _) = GpuMesh::new(
                device,
                &self.uniform_layout,
                &node.name,
                &node.mesh,
                bytemuck::bytes_of(&uniforms),
                node.material.double_sided,
            );
            let view = match &node.material.base_color_texture {
                Some(image) => &*textures.entry(Arc::as_ptr(image)).or_insert_with(|| {
                    upload_image(
                        device,
                        queue,
                        &node.material.name,
                        image,
                        wgpu::TextureFormat::Rgba8UnormSrgb,
                        || ImageRgba8::solid([255; 4]),
                    )
                }),
                None => &self.white_texture,
            };
            mesh.material_bind_group = Some(self.material_bind_group(device, &node.name, view));
            meshes.push(mesh);
        }
        self.meshes = meshes;

        self.water = scene.water().map(|water| {
            let uniforms = water_uniforms(water, Mat4::IDENTITY);
            let (mesh, uniform_buffer) = GpuMesh::new(
                device,
                &self.uniform_layout,
                "water",
                water.mesh(),
                bytemuck::bytes_of(&uniforms),
                false,
            );
            GpuWater {
                mesh,
                uniform_buffer,
            }
        });

        self.uploaded_revision = Some(scene.revision());
        tracing::info!(
            meshes = self.meshes.len(),
            textures = textures.len(),
            water = self.water.is_some(),
            revision = scene.revision(),
            "scene uploaded to GPU"
        );
    }

    /// Render one frame into `target`.
    pub fn render(
        &mut self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        target: &wgpu::TextureView,
        camera: &CameraMatrices,
        scene: &Scene,
    ) {
        self.upload_scene(device, queue, scene);

        queue.write_buffer(
            &self.main_frame_buffer,
            0,
            bytemuck::bytes_of(&frame_uniforms(camera, scene, Vec4::ZERO, false)),
        );

        let water = scene.water().zip(self.water.as_ref());
        if let Some((surface, gpu)) = water {
            let height = surface.plane_height();
            let mirror = camera.mirrored(height);
            queue.write_buffer(
                &self.mirror_frame_buffer,
                0,
                bytemuck::bytes_of(&frame_uniforms(
                    &mirror,
                    scene,
                    clip_plane_above(height),
                    true,
                )),
            );
            queue.write_buffer(
                &gpu.uniform_buffer,
                0,
                bytemuck::bytes_of(&water_uniforms(surface, mirror.view_projection())),
            );
        }

        let mut encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("render_encoder"),
        });

        if scene.lighting().directional.cast_shadow {
            let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("shadow_pass"),
                color_attachments: &[],
                depth_stencil_attachment: Some(depth_attachment(&self.shadow_view)),
                ..Default::default()
            });
            pass.set_pipeline(&self.shadow_pipeline);
            pass.set_bind_group(0, &self.main_frame_bind_group, &[]);
            for mesh in &self.meshes {
                mesh.draw(&mut pass);
            }
        }

        let background = clear_color(scene);

        if water.is_some() {
            let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("reflection_pass"),
                color_attachments: &[Some(color_attachment(&self.reflection.color, background))],
                depth_stencil_attachment: Some(depth_attachment(&self.reflection.depth)),
                ..Default::default()
            });
            self.draw_meshes(&mut pass, &self.mirror_pipelines, &self.mirror_frame_bind_group);
        }

        {
            let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("main_pass"),
                color_attachments: &[Some(color_attachment(target, background))],
                depth_stencil_attachment: Some(depth_attachment(&self.depth_texture)),
                ..Default::default()
            });
            self.draw_meshes(&mut pass, &self.main_pipelines, &self.main_frame_bind_group);

            if let Some(gpu) = &self.water {
                pass.set_pipeline(&self.water_pipeline);
                pass.set_bind_group(0, &self.main_frame_bind_group, &[]);
                pass.set_bind_group(2, &self.water_textures_bind_group, &[]);
                gpu.mesh.draw(&mut pass);
            }
        }

        queue.submit(std::iter::once(encoder.finish()));
    }

    fn draw_meshes(
        &self,
        pass: &mut wgpu::RenderPass<'_>,
        pipelines: &ScenePipelines,
        frame: &wgpu::BindGroup,
    ) {
        for (double_sided, pipeline) in [(false, &pipelines.single), (true, &pipelines.double)] {
            pass.set_pipeline(pipeline);
            pass.set_bind_group(0, frame, &[]);
            pass.set_bind_group(2, &self.shadow_bind_group, &[]);
            for mesh in self.meshes.iter().filter(|m| m.double_sided == double_sided) {
                if let Some(material) = &mesh.material_bind_group {
                    pass.set_bind_group(3, material, &[]);
                }
                mesh.draw(pass);
            }
        }
    }

    fn material_bind_group(
        &self,
        device: &wgpu::Device,
        label: &str,
        texture: &wgpu::TextureView,
    ) -> wgpu::BindGroup {
        device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some(label),
            layout: &self.material_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: wgpu::BindingResource::TextureView(texture),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::Sampler(&self.base_color_sampler),
                },
            ],
        })
    }
}

#[allow(clippy::too_many_arguments)]
fn color_pipeline(
    device: &wgpu::Device,
    label: &str,
    layout: &wgpu::PipelineLayout,
    module: &wgpu::ShaderModule,
    (vs_entry, fs_entry): (&str, &str),
    format: wgpu::TextureFormat,
    cull_mode: Option<wgpu::Face>,
    blend: wgpu::BlendState,
) -> wgpu::RenderPipeline {
    device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
        label: Some(label),
        layout: Some(layout),
        vertex: wgpu::VertexState {
            module,
            entry_point: Some(vs_entry),
            compilation_options: Default::default(),
            buffers: &[vertex_layout()],
        },
        fragment: Some(wgpu::FragmentState {
            module,
            entry_point: Some(fs_entry),
            compilation_options: Default::default(),
            targets: &[Some(wgpu::ColorTargetState {
                format,
                blend: Some(blend),
                write_mask: wgpu::ColorWrites::ALL,
            })],
        }),
        primitive: wgpu::PrimitiveState {
            topology: wgpu::PrimitiveTopology::TriangleList,
            cull_mode,
            ..Default::default()
        },
        depth_stencil: Some(wgpu::DepthStencilState {
            format: DEPTH_FORMAT,
            depth_write_enabled: true,
            depth_compare: wgpu::CompareFunction::Less,
            stencil: Default::default(),
            bias: Default::default(),
        }),
        multisample: Default::default(),
        multiview: None,
        cache: None,
    })
}

fn color_attachment(
    view: &wgpu::TextureView,
    clear: wgpu::Color,
) -> wgpu::RenderPassColorAttachment<'_> {
    wgpu::RenderPassColorAttachment {
        view,
        resolve_target: None,
        ops: wgpu::Operations {
            load: wgpu::LoadOp::Clear(clear),
            store: wgpu::StoreOp::Store,
        },
    }
}

fn depth_attachment(view: &wgpu::TextureView) -> wgpu::RenderPassDepthStencilAttachment<'_> {
    wgpu::RenderPassDepthStencilAttachment {
        view,
        depth_ops: Some(wgpu::Operations {
            load: wgpu::LoadOp::Clear(1.0),
            store: wgpu::StoreOp::Store,
        }),
        stencil_ops: None,
    }
}

fn create_depth_texture(
    device: &wgpu::Device,
    label: &str,
    width: u32,
    height: u32,
    usage: wgpu::TextureUsages,
) -> wgpu::TextureView {
    let texture = device.create_texture(&wgpu::TextureDescriptor {
        label: Some(label),
        size: wgpu::Extent3d {
            width: width.max(1),
            height: height.max(1),
            depth_or_array_layers: 1,
        },
        mip_level_count: 1,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format: DEPTH_FORMAT,
        usage,
        view_formats: &[],
    });
    texture.create_view(&Default::default())
}

fn create_color_texture(
    device: &wgpu::Device,
    label: &str,
    width: u32,
    height: u32,
    format: wgpu::TextureFormat,
) -> wgpu::TextureView {
    let texture = device.create_texture(&wgpu::TextureDescriptor {
        label: Some(label),
        size: wgpu::Extent3d {
            width: width.max(1),
            height: height.max(1),
            depth_or_array_layers: 1,
        },
        mip_level_count: 1,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format,
        usage: wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::TEXTURE_BINDING,
        view_formats: &[],
    });
    texture.create_view(&Default::default())
}

/// Upload `image` in `format`; an image with inconsistent dimensions is
/// replaced by `fallback`.
fn upload_image(
    device: &wgpu::Device,
    queue: &wgpu::Queue,
    label: &str,
    image: &ImageRgba8,
    format: wgpu::TextureFormat,
    fallback: impl FnOnce() -> ImageRgba8,
) -> wgpu::TextureView {
    let replacement;
    let image = if image.is_consistent() {
        image
    } else {
        tracing::warn!(label, "image has inconsistent dimensions, using a fallback");
        replacement = fallback();
        &replacement
    };
    let texture = device.create_texture_with_data(
        queue,
        &wgpu::TextureDescriptor {
            label: Some(label),
            size: wgpu::Extent3d {
                width: image.width,
                height: image.height,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format,
            usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
            view_formats: &[],
        },
        wgpu::util::TextureDataOrder::LayerMajor,
        &image.pixels,
    );
    texture.create_view(&Default::default())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pitchwalk_common::Color;
    use pitchwalk_kernel::CameraPose;
    use pitchwalk_render::RenderView;
    use pitchwalk_scene::{Fog, Lighting, WaterConfig};

    fn camera() -> CameraMatrices {
        let view = RenderView::from_pose(
            &CameraPose {
                position: Vec3::new(0.0, 1.0, 0.0),
                ..CameraPose::default()
            },
            75.0,
            0.1,
            100.0,
        );
        CameraMatrices::from_view(&view, 1.0)
    }

    #[test]
    fn uniform_structs_are_16_byte_aligned() {
        assert_eq!(std::mem::size_of::<FrameUniforms>() % 16, 0);
        assert_eq!(std::mem::size_of::<ModelUniforms>() % 16, 0);
        assert_eq!(std::mem::size_of::<WaterUniforms>() % 16, 0);
        assert_eq!(std::mem::size_of::<Vertex>(), 32);
    }

    #[test]
    fn interleave_pairs_positions_with_normals_and_uvs() {
        let verts = interleave(&MeshData::plane(2.0, 2.0));
        assert_eq!(verts.len(), 4);
        assert!(verts.iter().all(|v| v.normal == [0.0, 0.0, 1.0]));
        assert_eq!(verts[0].position, [-1.0, 1.0, 0.0]);
        assert_eq!(verts[3].uv, [1.0, 1.0]);
    }

    #[test]
    fn interleave_zero_fills_missing_uvs() {
        let mut mesh = MeshData::plane(2.0, 2.0);
        mesh.uvs.clear();
        assert!(interleave(&mesh).iter().all(|v| v.uv == [0.0, 0.0]));
    }

    #[test]
    fn frame_uniforms_pack_lights_and_flags() {
        let scene = Scene::new(Lighting::default());
        let u = frame_uniforms(&camera(), &scene, Vec4::ZERO, false);
        // Light aims from +Y at the origin, so the to-light vector is +Y.
        assert_eq!(&u.light_dir[..3], &[0.0, 1.0, 0.0]);
        assert_eq!(u.light_dir[3], 1.0);
        assert!((u.light_color[0] - 1.8).abs() < 1e-4);
        assert!((u.ambient[0] - 2.4).abs() < 1e-4);
        assert!((u.ambient[3] - 1.0 / 1024.0).abs() < 1e-9);
        assert_eq!(u.eye, [0.0, 1.0, 0.0, 0.0]);
        assert_eq!(u.fog_range[2], 0.0);
        assert_eq!(u.clip_plane, [0.0; 4]);
    }

    #[test]
    fn frame_uniforms_carry_fog_and_mirror_flag() {
        let mut scene = Scene::new(Lighting::default());
        scene.set_fog(Some(Fog {
            color: Color::WHITE,
            near: 2.0,
            far: 30.0,
        }));
        let u = frame_uniforms(&camera(), &scene, clip_plane_above(0.32), true);
        assert_eq!(u.eye[3], 1.0);
        assert_eq!(&u.fog_range[..3], &[2.0, 30.0, 1.0]);
        assert_eq!(u.clip_plane, [0.0, 1.0, 0.0, -0.32]);
    }

    #[test]
    fn zero_sun_direction_disables_sun_terms() {
        let scene = Scene::new(Lighting::default());
        let water = WaterSurface::new(WaterConfig::default(), &scene);
        let u = water_uniforms(&water, Mat4::IDENTITY);
        assert_eq!(u.sun_direction, [0.0; 4]);
        assert_eq!(u.water_color[3], 3.7);
        assert_eq!(u.sun_color[3], 1.0);

        let mut cfg = WaterConfig::default();
        cfg.sun_direction = Vec3::new(0.0, 2.0, 0.0);
        let water = WaterSurface::new(cfg, &scene);
        let u = water_uniforms(&water, Mat4::IDENTITY);
        assert_eq!(u.sun_direction, [0.0, 1.0, 0.0, 1.0]);
    }

    #[test]
    fn water_time_reaches_the_uniform() {
        let scene = Scene::new(Lighting::default());
        let mut water = WaterSurface::new(WaterConfig::default(), &scene);
        water.advance(0.25);
        assert_eq!(water_uniforms(&water, Mat4::IDENTITY).params[0], 0.25);
    }

    #[test]
    fn normal_matrix_survives_singular_model() {
        let u = model_uniforms(Mat4::ZERO, [1.0; 4]);
        assert!(u.normal_matrix.iter().flatten().all(|v| v.is_finite()));
    }
}
