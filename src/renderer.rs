//! Instanced board renderer.
//!
//! Draws every pool straight out of the shared scene buffer: the vertex
//! shader indexes instance records by pool base and instance index, so no
//! per-frame instance upload happens on the render path.

use wgpu::util::DeviceExt;

use crate::{
    board::GaltonBoard,
    camera::{Camera, CameraUniform},
    error::GaltonError,
    gpu::RenderContext,
    mesh::{self, Mesh, MeshVertex},
    scene::{PoolId, SceneAggregator},
};

const SPHERE_SUBDIVISIONS: u32 = 2;
const CLEAR_COLOR: wgpu::Color = wgpu::Color {
    r: 0.02,
    g: 0.02,
    b: 0.03,
    a: 1.0,
};

// Minimum dynamic uniform offset alignment required by the spec'd limits.
const POOL_INFO_STRIDE: u64 = 256;

/// One uploaded mesh: vertex and index buffers plus draw count.
struct GpuMesh {
    vertex_buffer: wgpu::Buffer,
    index_buffer: wgpu::Buffer,
    index_count: u32,
}

impl GpuMesh {
    fn upload(device: &wgpu::Device, label: &str, mesh: &Mesh) -> Self {
        let vertex_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(&format!("{label} Vertex Buffer")),
            contents: bytemuck::cast_slice(&mesh.vertices),
            usage: wgpu::BufferUsages::VERTEX,
        });
        let index_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(&format!("{label} Index Buffer")),
            contents: bytemuck::cast_slice(&mesh.indices),
            usage: wgpu::BufferUsages::INDEX,
        });
        Self {
            vertex_buffer,
            index_buffer,
            index_count: mesh.index_count(),
        }
    }
}

/// Renders the board's pools as instanced spheres (pegs, balls) and a
/// cube (floor), shaded with a single directional light.
pub struct BoardRenderer {
    pipeline: wgpu::RenderPipeline,
    camera_buffer: wgpu::Buffer,
    camera_bind_group: wgpu::BindGroup,
    scene_bind_group: wgpu::BindGroup,
    depth_view: wgpu::TextureView,
    sphere: GpuMesh,
    cube: GpuMesh,
    camera_uniform: CameraUniform,
}

impl BoardRenderer {
    /// Build pipelines, meshes, and bind groups against an already-bound
    /// scene. The per-pool base indices are written once here; pool order
    /// and offsets never change after registration.
    ///
    /// # Errors
    ///
    /// Returns [`GaltonError::Config`] when the scene has no GPU buffer
    /// yet (the board was not initialized).
    pub fn new(gpu: &RenderContext, scene: &SceneAggregator) -> Result<Self, GaltonError> {
        let device = &gpu.device;
        let scene_buffer = scene.buffer().ok_or_else(|| {
            GaltonError::Config("scene must be bound before creating the renderer".into())
        })?;

        let camera_uniform = CameraUniform::new();
        let camera_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Board Camera Buffer"),
            contents: bytemuck::bytes_of(&camera_uniform),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });

        let camera_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Board Camera Layout"),
            entries: &[wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::VERTEX_FRAGMENT,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: false,
                    min_binding_size: None,
                },
                count: None,
            }],
        });

        let camera_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Board Camera Bind Group"),
            layout: &camera_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: camera_buffer.as_entire_binding(),
            }],
        });

        let scene_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Board Scene Layout"),
            entries: &[
                wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::VERTEX,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Storage { read_only: true },
                        has_dynamic_offset: false,
                        min_binding_size: None,
                    },
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 1,
                    visibility: wgpu::ShaderStages::VERTEX,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Uniform,
                        has_dynamic_offset: true,
                        min_binding_size: wgpu::BufferSize::new(16),
                    },
                    count: None,
                },
            ],
        });

        // One PoolInfo slot per pool, at the dynamic-offset alignment.
        // base = first vec4 index of the pool's record area, past the
        // count header.
        let record_vec4s = crate::scene::RECORD_SIZE as u32 / 16;
        let mut pool_info = vec![0u8; scene.pool_count().max(1) * POOL_INFO_STRIDE as usize];
        for index in 0..scene.pool_count() {
            let region_vec4s = 1 + scene.pool_capacity() as u32 * record_vec4s;
            let base = index as u32 * region_vec4s + 1;
            pool_info[index * POOL_INFO_STRIDE as usize..][..4]
                .copy_from_slice(&base.to_le_bytes());
        }
        let pool_info_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Board Pool Info Buffer"),
            contents: &pool_info,
            usage: wgpu::BufferUsages::UNIFORM,
        });

        let scene_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Board Scene Bind Group"),
            layout: &scene_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: scene_buffer.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::Buffer(wgpu::BufferBinding {
                        buffer: &pool_info_buffer,
                        offset: 0,
                        size: wgpu::BufferSize::new(16),
                    }),
                },
            ],
        });

        let pipeline = Self::create_pipeline(gpu, &camera_layout, &scene_layout);

        Ok(Self {
            pipeline,
            camera_buffer,
            camera_bind_group,
            scene_bind_group,
            depth_view: Self::create_depth_view(gpu),
            sphere: GpuMesh::upload(device, "Sphere", &mesh::icosphere(SPHERE_SUBDIVISIONS)),
            cube: GpuMesh::upload(device, "Cube", &mesh::cube()),
            camera_uniform,
        })
    }

    fn create_pipeline(
        gpu: &RenderContext,
        camera_layout: &wgpu::BindGroupLayout,
        scene_layout: &wgpu::BindGroupLayout,
    ) -> wgpu::RenderPipeline {
        let device = &gpu.device;
        let shader =
            device.create_shader_module(wgpu::include_wgsl!(
                "../assets/shaders/board_instanced.wgsl"
            ));

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Board Pipeline Layout"),
            bind_group_layouts: &[camera_layout, scene_layout],
            push_constant_ranges: &[],
        });

        let vertex_layout = wgpu::VertexBufferLayout {
            array_stride: size_of::<MeshVertex>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &wgpu::vertex_attr_array![0 => Float32x3, 1 => Float32x3],
        };

        device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("Board Render Pipeline"),
            layout: Some(&pipeline_layout),
            vertex: wgpu::VertexState {
                module: &shader,
                entry_point: Some("vs_main"),
                buffers: &[vertex_layout],
                compilation_options: Default::default(),
            },
            fragment: Some(wgpu::FragmentState {
                module: &shader,
                entry_point: Some("fs_main"),
                targets: &[Some(wgpu::ColorTargetState {
                    format: gpu.config.format,
                    blend: Some(wgpu::BlendState::REPLACE),
                    write_mask: wgpu::ColorWrites::ALL,
                })],
                compilation_options: Default::default(),
            }),
            primitive: wgpu::PrimitiveState {
                cull_mode: Some(wgpu::Face::Back),
                ..Default::default()
            },
            depth_stencil: Some(wgpu::DepthStencilState {
                format: wgpu::TextureFormat::Depth32Float,
                depth_write_enabled: true,
                depth_compare: wgpu::CompareFunction::Less,
                stencil: wgpu::StencilState::default(),
                bias: wgpu::DepthBiasState::default(),
            }),
            multisample: wgpu::MultisampleState::default(),
            multiview: None,
            cache: None,
        })
    }

    fn create_depth_view(gpu: &RenderContext) -> wgpu::TextureView {
        let desc = wgpu::TextureDescriptor {
            label: Some("Board Depth Texture"),
            size: wgpu::Extent3d {
                width: gpu.config.width.max(1),
                height: gpu.config.height.max(1),
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: wgpu::TextureFormat::Depth32Float,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            view_formats: &[],
        };

        gpu.device
            .create_texture(&desc)
            .create_view(&wgpu::TextureViewDescriptor::default())
    }

    /// Recreate the depth buffer after a surface resize.
    pub fn resize(&mut self, gpu: &RenderContext) {
        self.depth_view = Self::create_depth_view(gpu);
    }

    /// Draw one frame of the board to the surface.
    ///
    /// # Errors
    ///
    /// Returns [`GaltonError::Viewer`] when the surface cannot provide a
    /// frame and [`GaltonError::DeviceLost`] when the device failed the
    /// submission.
    pub fn render(
        &mut self,
        gpu: &RenderContext,
        board: &GaltonBoard,
        camera: &Camera,
    ) -> Result<(), GaltonError> {
        let surface = gpu
            .surface
            .as_ref()
            .ok_or_else(|| GaltonError::Viewer("render context has no surface".into()))?;
        let frame = surface
            .get_current_texture()
            .map_err(|e| GaltonError::Viewer(format!("surface frame unavailable: {e}")))?;
        let view = frame
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());

        self.camera_uniform.update_view_proj(camera);
        gpu.queue.write_buffer(
            &self.camera_buffer,
            0,
            bytemuck::bytes_of(&self.camera_uniform),
        );

        let mut encoder = gpu.create_encoder();
        {
            let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Board Render Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(CLEAR_COLOR),
                        store: wgpu::StoreOp::Store,
                    },
                    depth_slice: None,
                })],
                depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                    view: &self.depth_view,
                    depth_ops: Some(wgpu::Operations {
                        load: wgpu::LoadOp::Clear(1.0),
                        store: wgpu::StoreOp::Store,
                    }),
                    stencil_ops: None,
                }),
                timestamp_writes: None,
                occlusion_query_set: None,
            });

            pass.set_pipeline(&self.pipeline);
            pass.set_bind_group(0, &self.camera_bind_group, &[]);

            for (id, mesh) in [
                (board.pegs(), &self.sphere),
                (board.balls(), &self.sphere),
                (board.floor(), &self.cube),
            ] {
                self.draw_pool(&mut pass, board.scene(), id, mesh);
            }
        }

        gpu.submit(encoder);
        frame.present();

        if gpu.device_lost() {
            return Err(GaltonError::DeviceLost(
                "device reported an unrecoverable error during rendering".into(),
            ));
        }
        Ok(())
    }

    fn draw_pool(
        &self,
        pass: &mut wgpu::RenderPass<'_>,
        scene: &SceneAggregator,
        id: PoolId,
        mesh: &GpuMesh,
    ) {
        let count = scene.pool(id).instance_count() as u32;
        if count == 0 {
            return;
        }

        let offset = scene.pool_index(id) as u32 * POOL_INFO_STRIDE as u32;
        pass.set_bind_group(1, &self.scene_bind_group, &[offset]);
        pass.set_vertex_buffer(0, mesh.vertex_buffer.slice(..));
        pass.set_index_buffer(mesh.index_buffer.slice(..), wgpu::IndexFormat::Uint32);
        pass.draw_indexed(0..mesh.index_count, 0, 0..count);
    }
}
