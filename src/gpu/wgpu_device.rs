//! [`GraphicsDevice`] on top of wgpu.
//!
//! The engine talks in immediate-mode terms (bind a program, set uniforms,
//! draw) while wgpu wants recorded passes. Each `draw` therefore snapshots the
//! bound program's uniform bytes and texture units into a packet; `present`
//! uploads all snapshots into one dynamic-offset uniform buffer and replays
//! the packets in a single render pass.
//!
//! Binding conventions for WGSL programs:
//! - group 0, binding 0: the uniform struct, addressed through [`reflect`]
//! - group 1, binding `2i` / `2i + 1`: texture and sampler of unit `i`
//! - vertex attributes at consecutive locations from 0, see [`VertexLayout`]

use std::{collections::HashMap, iter, num::NonZeroU64, sync::Arc};

use anyhow::{Context as _, anyhow};
use futures::executor::block_on;
use wgpu::util::DeviceExt;
use winit::window::Window;

use super::{
    GraphicsDevice, ImageData, MAX_TEXTURE_UNITS, ProgramHandle, ShaderError, ShaderStage,
    TextureHandle, TextureOptions, UniformLocation, UniformValue, VertexArrayHandle, VertexLayout,
    reflect::{self, ShaderReflection, UniformField, UniformLayout},
};

pub const DEPTH_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Depth32Float;

struct DepthTarget {
    #[allow(unused)]
    texture: wgpu::Texture,
    view: wgpu::TextureView,
}

impl DepthTarget {
    fn new(device: &wgpu::Device, width: u32, height: u32) -> Self {
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
            format: DEPTH_FORMAT,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            view_formats: &[],
        });
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        Self { texture, view }
    }
}

struct GpuTexture {
    #[allow(unused)]
    texture: wgpu::Texture,
    view: wgpu::TextureView,
    sampler: wgpu::Sampler,
}

struct Program {
    vertex: wgpu::ShaderModule,
    fragment: wgpu::ShaderModule,
    reflection: ShaderReflection,
    /// CPU copy of the uniform struct, snapshotted on every draw.
    staging: Vec<u8>,
    texture_layout: wgpu::BindGroupLayout,
    pipeline_layout: wgpu::PipelineLayout,
}

struct VertexArray {
    vertices: wgpu::Buffer,
    indices: Option<wgpu::Buffer>,
    layout: VertexLayout,
}

/// A recorded draw, replayed by `present`.
struct DrawPacket {
    pipeline: wgpu::RenderPipeline,
    vertices: wgpu::Buffer,
    indices: Option<wgpu::Buffer>,
    count: u32,
    uniform_offset: u32,
    uniform_size: u64,
    textures: wgpu::BindGroup,
}

pub struct WgpuDevice {
    window: Arc<Window>,
    surface: wgpu::Surface<'static>,
    device: wgpu::Device,
    queue: wgpu::Queue,
    config: wgpu::SurfaceConfiguration,
    is_surface_configured: bool,
    depth: DepthTarget,
    clear_colour: wgpu::Color,

    uniform_layout: wgpu::BindGroupLayout,
    uniform_buffer: wgpu::Buffer,
    uniform_groups: HashMap<u64, wgpu::BindGroup>,
    frame_uniforms: Vec<u8>,
    white: GpuTexture,

    next_handle: u32,
    programs: HashMap<ProgramHandle, Program>,
    textures: HashMap<TextureHandle, GpuTexture>,
    vertex_arrays: HashMap<VertexArrayHandle, VertexArray>,
    pipelines: HashMap<(ProgramHandle, VertexLayout), Option<wgpu::RenderPipeline>>,
    locations: HashMap<(ProgramHandle, String), Option<UniformLocation>>,
    location_fields: Vec<(ProgramHandle, UniformField)>,

    current: Option<ProgramHandle>,
    units: Vec<Option<TextureHandle>>,
    packets: Vec<DrawPacket>,
}

fn wrap_mode(wrap: super::WrapMode) -> wgpu::AddressMode {
    match wrap {
        super::WrapMode::Repeat => wgpu::AddressMode::Repeat,
        super::WrapMode::ClampToEdge => wgpu::AddressMode::ClampToEdge,
        super::WrapMode::MirroredRepeat => wgpu::AddressMode::MirrorRepeat,
    }
}

fn filter_mode(filter: super::FilterMode) -> wgpu::FilterMode {
    match filter {
        super::FilterMode::Nearest => wgpu::FilterMode::Nearest,
        super::FilterMode::Linear => wgpu::FilterMode::Linear,
    }
}

/// Halve the image until 1x1.
fn mip_chain(image: &ImageData) -> Vec<image::RgbaImage> {
    let Some(base) = image::RgbaImage::from_raw(image.width, image.height, image.pixels.clone())
    else {
        return Vec::new();
    };
    let mut levels = vec![base];
    while let Some(last) = levels.last() {
        let (w, h) = last.dimensions();
        if w == 1 && h == 1 {
            break;
        }
        let next = image::imageops::resize(
            last,
            (w / 2).max(1),
            (h / 2).max(1),
            image::imageops::FilterType::Triangle,
        );
        levels.push(next);
    }
    levels
}

impl WgpuDevice {
    pub async fn new(window: Arc<Window>, vsync: bool) -> anyhow::Result<Self> {
        let size = window.inner_size();

        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends: wgpu::Backends::PRIMARY,
            ..Default::default()
        });
        let surface = instance.create_surface(window.clone())?;
        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::default(),
                compatible_surface: Some(&surface),
                force_fallback_adapter: false,
            })
            .await
            .context("no suitable graphics adapter")?;
        log::info!("using adapter {:?}", adapter.get_info().name);

        let (device, queue) = adapter
            .request_device(&wgpu::DeviceDescriptor {
                label: None,
                required_features: wgpu::Features::empty(),
                required_limits: wgpu::Limits::default(),
                memory_hints: Default::default(),
                trace: wgpu::Trace::Off,
            })
            .await?;

        let surface_caps = surface.get_capabilities(&adapter);
        let surface_format = surface_caps
            .formats
            .iter()
            .copied()
            .find(|f| f.is_srgb())
            .or_else(|| surface_caps.formats.first().copied())
            .ok_or_else(|| anyhow!("surface reports no formats"))?;
        let config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format: surface_format,
            width: size.width.max(1),
            height: size.height.max(1),
            present_mode: if vsync {
                wgpu::PresentMode::AutoVsync
            } else {
                wgpu::PresentMode::AutoNoVsync
            },
            alpha_mode: surface_caps
                .alpha_modes
                .first()
                .copied()
                .unwrap_or(wgpu::CompositeAlphaMode::Auto),
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        };
        let is_surface_configured = size.width > 0 && size.height > 0;
        if is_surface_configured {
            surface.configure(&device, &config);
        }

        let depth = DepthTarget::new(&device, config.width, config.height);

        let uniform_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("uniform_bind_group_layout"),
            entries: &[wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::VERTEX | wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: true,
                    min_binding_size: None,
                },
                count: None,
            }],
        });
        let uniform_buffer = Self::make_uniform_buffer(&device, 64 * 1024);
        let white = Self::upload_texture(
            &device,
            &queue,
            &ImageData::solid(1, 1, [255, 255, 255, 255]),
            TextureOptions {
                mipmaps: false,
                ..Default::default()
            },
        );

        Ok(Self {
            window,
            surface,
            white,
            device,
            queue,
            config,
            is_surface_configured,
            depth,
            clear_colour: wgpu::Color::BLACK,
            uniform_layout,
            uniform_buffer,
            uniform_groups: HashMap::new(),
            frame_uniforms: Vec::new(),
            next_handle: 1,
            programs: HashMap::new(),
            textures: HashMap::new(),
            vertex_arrays: HashMap::new(),
            pipelines: HashMap::new(),
            locations: HashMap::new(),
            location_fields: Vec::new(),
            current: None,
            units: vec![None; MAX_TEXTURE_UNITS as usize],
            packets: Vec::new(),
        })
    }

    pub fn window(&self) -> &Window {
        &self.window
    }

    fn next(&mut self) -> u32 {
        let handle = self.next_handle;
        self.next_handle += 1;
        handle
    }

    fn make_uniform_buffer(device: &wgpu::Device, size: u64) -> wgpu::Buffer {
        device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("uniform_buffer"),
            size,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        })
    }

    fn upload_texture(
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        image: &ImageData,
        options: TextureOptions,
    ) -> GpuTexture {
        let expected = ImageData::byte_len(image.width, image.height);
        let fallback;
        let image = if image.width == 0 || image.height == 0 || image.pixels.len() != expected {
            log::error!(
                "texture data of {} bytes does not match {}x{}",
                image.pixels.len(),
                image.width,
                image.height
            );
            fallback = ImageData::solid(1, 1, [255, 255, 255, 255]);
            &fallback
        } else {
            image
        };

        let levels = if options.mipmaps {
            mip_chain(image)
        } else {
            image::RgbaImage::from_raw(image.width, image.height, image.pixels.clone())
                .into_iter()
                .collect()
        };
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some("texture_2d"),
            size: wgpu::Extent3d {
                width: image.width,
                height: image.height,
                depth_or_array_layers: 1,
            },
            mip_level_count: levels.len().max(1) as u32,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: wgpu::TextureFormat::Rgba8UnormSrgb,
            usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
            view_formats: &[],
        });
        for (level, pixels) in levels.iter().enumerate() {
            let (width, height) = pixels.dimensions();
            queue.write_texture(
                wgpu::TexelCopyTextureInfo {
                    aspect: wgpu::TextureAspect::All,
                    texture: &texture,
                    mip_level: level as u32,
                    origin: wgpu::Origin3d::ZERO,
                },
                pixels,
                wgpu::TexelCopyBufferLayout {
                    offset: 0,
                    bytes_per_row: Some(4 * width),
                    rows_per_image: Some(height),
                },
                wgpu::Extent3d {
                    width,
                    height,
                    depth_or_array_layers: 1,
                },
            );
        }

        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        let address_mode = wrap_mode(options.wrap);
        let filter = filter_mode(options.filter);
        let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            address_mode_u: address_mode,
            address_mode_v: address_mode,
            address_mode_w: address_mode,
            mag_filter: filter,
            min_filter: filter,
            mipmap_filter: if options.mipmaps {
                wgpu::FilterMode::Linear
            } else {
                wgpu::FilterMode::Nearest
            },
            ..Default::default()
        });
        GpuTexture {
            texture,
            view,
            sampler,
        }
    }

    fn compile(&self, stage: ShaderStage, source: &str) -> Result<wgpu::ShaderModule, ShaderError> {
        if source.trim().is_empty() {
            return Err(ShaderError::Compile {
                stage,
                log: "empty source".to_string(),
            });
        }
        self.device.push_error_scope(wgpu::ErrorFilter::Validation);
        let module = self.device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some(match stage {
                ShaderStage::Vertex => "vertex shader",
                ShaderStage::Fragment => "fragment shader",
            }),
            source: wgpu::ShaderSource::Wgsl(source.into()),
        });
        match block_on(self.device.pop_error_scope()) {
            Some(error) => Err(ShaderError::Compile {
                stage,
                log: error.to_string(),
            }),
            None => Ok(module),
        }
    }

    fn vertex_buffer_layout(layout: VertexLayout) -> (Vec<wgpu::VertexAttribute>, u64) {
        let mut offset = 0;
        let attributes = layout
            .components()
            .iter()
            .enumerate()
            .map(|(location, &components)| {
                let attribute = wgpu::VertexAttribute {
                    offset,
                    shader_location: location as u32,
                    format: if components == 2 {
                        wgpu::VertexFormat::Float32x2
                    } else {
                        wgpu::VertexFormat::Float32x3
                    },
                };
                offset += components as u64 * 4;
                attribute
            })
            .collect();
        (attributes, layout.stride() as u64 * 4)
    }

    /// Pipeline for a program and vertex layout, built on first use.
    fn pipeline(&mut self, handle: ProgramHandle, layout: VertexLayout) -> Option<wgpu::RenderPipeline> {
        if let Some(cached) = self.pipelines.get(&(handle, layout)) {
            return cached.clone();
        }
        let program = self.programs.get(&handle)?;
        let (attributes, stride) = Self::vertex_buffer_layout(layout);

        self.device.push_error_scope(wgpu::ErrorFilter::Validation);
        let pipeline = self.device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            cache: None,
            label: Some("Render Pipeline"),
            layout: Some(&program.pipeline_layout),
            vertex: wgpu::VertexState {
                module: &program.vertex,
                entry_point: None,
                buffers: &[wgpu::VertexBufferLayout {
                    array_stride: stride,
                    step_mode: wgpu::VertexStepMode::Vertex,
                    attributes: &attributes,
                }],
                compilation_options: Default::default(),
            },
            fragment: Some(wgpu::FragmentState {
                module: &program.fragment,
                entry_point: None,
                targets: &[Some(wgpu::ColorTargetState {
                    format: self.config.format,
                    blend: Some(wgpu::BlendState::REPLACE),
                    write_mask: wgpu::ColorWrites::ALL,
                })],
                compilation_options: Default::default(),
            }),
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::TriangleList,
                strip_index_format: None,
                front_face: wgpu::FrontFace::Ccw,
                cull_mode: None,
                polygon_mode: wgpu::PolygonMode::Fill,
                unclipped_depth: false,
                conservative: false,
            },
            depth_stencil: Some(wgpu::DepthStencilState {
                format: DEPTH_FORMAT,
                depth_write_enabled: true,
                depth_compare: wgpu::CompareFunction::Less,
                stencil: wgpu::StencilState::default(),
                bias: wgpu::DepthBiasState::default(),
            }),
            multisample: wgpu::MultisampleState {
                count: 1,
                mask: !0,
                alpha_to_coverage_enabled: false,
            },
            multiview: None,
        });
        let pipeline = match block_on(self.device.pop_error_scope()) {
            Some(error) => {
                log::error!("failed to link program {:?} with {:?}: {}", handle, layout, error);
                None
            }
            None => Some(pipeline),
        };
        self.pipelines.insert((handle, layout), pipeline.clone());
        pipeline
    }

    /// Group 1 for a program from the currently bound units.
    fn texture_group(&self, program: &Program) -> wgpu::BindGroup {
        let unit_texture = |binding: u32| {
            self.units
                .get((binding / 2) as usize)
                .copied()
                .flatten()
                .and_then(|handle| self.textures.get(&handle))
                .unwrap_or(&self.white)
        };
        let entries: Vec<_> = program
            .reflection
            .textures
            .iter()
            .map(|t| wgpu::BindGroupEntry {
                binding: t.binding,
                resource: wgpu::BindingResource::TextureView(&unit_texture(t.binding).view),
            })
            .chain(program.reflection.samplers.iter().map(|s| wgpu::BindGroupEntry {
                binding: s.binding,
                resource: wgpu::BindingResource::Sampler(&unit_texture(s.binding).sampler),
            }))
            .collect();
        self.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("texture_bind_group"),
            layout: &program.texture_layout,
            entries: &entries,
        })
    }

    /// Upload the frame's uniform snapshots, growing the buffer if needed.
    fn upload_uniforms(&mut self) {
        let needed = self.frame_uniforms.len() as u64;
        if needed > self.uniform_buffer.size() {
            let size = needed.next_power_of_two();
            log::debug!("growing uniform buffer to {} bytes", size);
            self.uniform_buffer = Self::make_uniform_buffer(&self.device, size);
            self.uniform_groups.clear();
        }
        if needed > 0 {
            self.queue.write_buffer(&self.uniform_buffer, 0, &self.frame_uniforms);
        }
        for packet in &self.packets {
            self.uniform_groups.entry(packet.uniform_size).or_insert_with(|| {
                self.device.create_bind_group(&wgpu::BindGroupDescriptor {
                    label: Some("uniform_bind_group"),
                    layout: &self.uniform_layout,
                    entries: &[wgpu::BindGroupEntry {
                        binding: 0,
                        resource: wgpu::BindingResource::Buffer(wgpu::BufferBinding {
                            buffer: &self.uniform_buffer,
                            offset: 0,
                            size: NonZeroU64::new(packet.uniform_size),
                        }),
                    }],
                })
            });
        }
    }

    fn reset_frame(&mut self) {
        self.packets.clear();
        self.frame_uniforms.clear();
    }

    fn reconfigure(&mut self) {
        let size = self.window.inner_size();
        self.resize(size.width, size.height);
    }
}

impl GraphicsDevice for WgpuDevice {
    fn create_program(
        &mut self,
        vertex_source: &str,
        fragment_source: &str,
    ) -> Result<ProgramHandle, ShaderError> {
        let vertex = self.compile(ShaderStage::Vertex, vertex_source)?;
        let fragment = if fragment_source == vertex_source {
            vertex.clone()
        } else {
            self.compile(ShaderStage::Fragment, fragment_source)?
        };
        let reflection = reflect::reflect(vertex_source)?.merge(reflect::reflect(fragment_source)?);

        let size = reflection.uniforms.as_ref().map_or(0, |layout| layout.size);
        let staging = vec![0u8; size.max(16).next_multiple_of(16) as usize];

        let texture_entries: Vec<_> = reflection
            .textures
            .iter()
            .map(|t| wgpu::BindGroupLayoutEntry {
                binding: t.binding,
                visibility: wgpu::ShaderStages::VERTEX | wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Texture {
                    multisampled: false,
                    view_dimension: wgpu::TextureViewDimension::D2,
                    sample_type: wgpu::TextureSampleType::Float { filterable: true },
                },
                count: None,
            })
            .chain(reflection.samplers.iter().map(|s| wgpu::BindGroupLayoutEntry {
                binding: s.binding,
                visibility: wgpu::ShaderStages::VERTEX | wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                count: None,
            }))
            .collect();
        let texture_layout = self.device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("texture_bind_group_layout"),
            entries: &texture_entries,
        });
        let pipeline_layout = self.device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Render Pipeline Layout"),
            bind_group_layouts: &[&self.uniform_layout, &texture_layout],
            push_constant_ranges: &[],
        });

        let handle = ProgramHandle(self.next());
        log::debug!(
            "created program {:?} with {} uniform fields and {} texture units",
            handle,
            reflection.uniforms.as_ref().map_or(0, UniformLayout::len),
            reflection.texture_units()
        );
        self.programs.insert(
            handle,
            Program {
                vertex,
                fragment,
                reflection,
                staging,
                texture_layout,
                pipeline_layout,
            },
        );
        Ok(handle)
    }

    fn delete_program(&mut self, program: ProgramHandle) {
        self.programs.remove(&program);
        self.pipelines.retain(|(handle, _), _| *handle != program);
        self.locations.retain(|(handle, _), _| *handle != program);
        if self.current == Some(program) {
            self.current = None;
        }
    }

    fn use_program(&mut self, program: Option<ProgramHandle>) {
        self.current = program;
    }

    fn uniform_location(&mut self, program: ProgramHandle, name: &str) -> Option<UniformLocation> {
        if let Some(cached) = self.locations.get(&(program, name.to_string())) {
            return *cached;
        }
        let field = self
            .programs
            .get(&program)?
            .reflection
            .uniforms
            .as_ref()
            .and_then(|layout| layout.field(name));
        let location = field.map(|field| {
            self.location_fields.push((program, field));
            UniformLocation(self.location_fields.len() as u32 - 1)
        });
        self.locations.insert((program, name.to_string()), location);
        location
    }

    fn set_uniform(&mut self, location: UniformLocation, value: &UniformValue) {
        let Some(&(handle, field)) = self.location_fields.get(location.0 as usize) else {
            return;
        };
        let Some(program) = self.programs.get_mut(&handle) else {
            return;
        };
        if !UniformLayout::write(&mut program.staging, field, value) {
            log::warn!("uniform value {:?} does not fit a {:?} field", value, field.kind);
        }
    }

    fn create_texture(&mut self, image: &ImageData, options: TextureOptions) -> TextureHandle {
        let texture = Self::upload_texture(&self.device, &self.queue, image, options);
        let handle = TextureHandle(self.next());
        self.textures.insert(handle, texture);
        handle
    }

    fn bind_texture(&mut self, unit: u32, texture: Option<TextureHandle>) {
        match self.units.get_mut(unit as usize) {
            Some(slot) => *slot = texture,
            None => log::warn!("texture unit {} out of range", unit),
        }
    }

    fn delete_texture(&mut self, texture: TextureHandle) {
        self.textures.remove(&texture);
        for slot in self.units.iter_mut().filter(|slot| **slot == Some(texture)) {
            *slot = None;
        }
    }

    fn create_vertex_array(
        &mut self,
        vertices: &[f32],
        layout: VertexLayout,
        indices: Option<&[u32]>,
    ) -> VertexArrayHandle {
        let vertex_buffer = self.device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Vertex Buffer"),
            contents: bytemuck::cast_slice(vertices),
            usage: wgpu::BufferUsages::VERTEX,
        });
        let index_buffer = indices.map(|indices| {
            self.device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("Index Buffer"),
                contents: bytemuck::cast_slice(indices),
                usage: wgpu::BufferUsages::INDEX,
            })
        });
        let handle = VertexArrayHandle(self.next());
        self.vertex_arrays.insert(
            handle,
            VertexArray {
                vertices: vertex_buffer,
                indices: index_buffer,
                layout,
            },
        );
        handle
    }

    fn delete_vertex_array(&mut self, vertex_array: VertexArrayHandle) {
        self.vertex_arrays.remove(&vertex_array);
    }

    fn draw(&mut self, vertex_array: VertexArrayHandle, count: u32, indexed: bool) {
        if count == 0 {
            return;
        }
        let Some(handle) = self.current else {
            log::warn!("draw without a bound program");
            return;
        };
        let Some(layout) = self.vertex_arrays.get(&vertex_array).map(|va| va.layout) else {
            log::warn!("draw of unknown vertex array {:?}", vertex_array);
            return;
        };
        let Some(pipeline) = self.pipeline(handle, layout) else {
            return;
        };
        let (Some(program), Some(va)) = (self.programs.get(&handle), self.vertex_arrays.get(&vertex_array))
        else {
            return;
        };
        if indexed && va.indices.is_none() {
            log::warn!("indexed draw of {:?} without indices", vertex_array);
            return;
        }

        let alignment = self.device.limits().min_uniform_buffer_offset_alignment as usize;
        let offset = self.frame_uniforms.len().next_multiple_of(alignment);
        self.frame_uniforms.resize(offset, 0);
        self.frame_uniforms.extend_from_slice(&program.staging);

        let packet = DrawPacket {
            pipeline,
            vertices: va.vertices.clone(),
            indices: if indexed { va.indices.clone() } else { None },
            count,
            uniform_offset: offset as u32,
            uniform_size: program.staging.len() as u64,
            textures: self.texture_group(program),
        };
        self.packets.push(packet);
    }

    fn clear(&mut self, colour: [f32; 4]) {
        let [r, g, b, a] = colour.map(f64::from);
        self.clear_colour = wgpu::Color { r, g, b, a };
    }

    fn present(&mut self) {
        if !self.is_surface_configured {
            self.reset_frame();
            return;
        }
        let output = match self.surface.get_current_texture() {
            Ok(output) => output,
            // Reconfigure the surface if it's lost or outdated
            Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                self.reconfigure();
                self.reset_frame();
                return;
            }
            Err(e) => {
                log::error!("Unable to render {}", e);
                self.reset_frame();
                return;
            }
        };
        self.upload_uniforms();

        let view = output
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());
        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Render Encoder"),
            });
        {
            let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Render Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(self.clear_colour),
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                    view: &self.depth.view,
                    depth_ops: Some(wgpu::Operations {
                        load: wgpu::LoadOp::Clear(1.0),
                        store: wgpu::StoreOp::Store,
                    }),
                    stencil_ops: None,
                }),
                occlusion_query_set: None,
                timestamp_writes: None,
            });

            for packet in &self.packets {
                let Some(uniforms) = self.uniform_groups.get(&packet.uniform_size) else {
                    continue;
                };
                render_pass.set_pipeline(&packet.pipeline);
                render_pass.set_bind_group(0, uniforms, &[packet.uniform_offset]);
                render_pass.set_bind_group(1, &packet.textures, &[]);
                render_pass.set_vertex_buffer(0, packet.vertices.slice(..));
                match &packet.indices {
                    Some(indices) => {
                        render_pass.set_index_buffer(indices.slice(..), wgpu::IndexFormat::Uint32);
                        render_pass.draw_indexed(0..packet.count, 0, 0..1);
                    }
                    None => render_pass.draw(0..packet.count, 0..1),
                }
            }
        }
        self.queue.submit(iter::once(encoder.finish()));
        output.present();
        self.reset_frame();
    }

    fn resize(&mut self, width: u32, height: u32) {
        if width > 0 && height > 0 {
            self.config.width = width;
            self.config.height = height;
            self.is_surface_configured = true;
            self.surface.configure(&self.device, &self.config);
            self.depth = DepthTarget::new(&self.device, width, height);
        }
    }
}
