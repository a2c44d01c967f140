//! GPU backend on top of wgpu, targeting WebGPU or WebGL2.

mod conversion;
mod error_scope;
mod readback;

use ahash::HashMap;
use futures::future::{FutureExt, LocalBoxFuture};
use slotmap::SlotMap;
use smallvec::SmallVec;
use tracing::{debug, info, warn};

use super::error::{
    CreationFailure, DeviceError, DeviceInitError, ReadbackError, RequestedResource,
    ResourceCreationError,
};
use super::format::Format;
use super::interfaces::*;
use super::shader_layout::validate_bindings;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PowerPreference {
    LowPower,
    #[default]
    HighPerformance,
}

/// Adapter selection for [`WgpuDevice::new`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WgpuDeviceConfig {
    /// `WebGpu` selects the primary native/browser backends, `WebGl` the GL backend.
    pub backend: BackendKind,
    pub power_preference: PowerPreference,
    pub label: Option<String>,
}

impl Default for WgpuDeviceConfig {
    fn default() -> Self {
        Self {
            backend: BackendKind::WebGpu,
            power_preference: PowerPreference::default(),
            label: None,
        }
    }
}

struct WgpuBuffer {
    raw: wgpu::Buffer,
    descriptor: BufferDescriptor,
}

struct WgpuTexture {
    raw: wgpu::Texture,
    view: wgpu::TextureView,
    descriptor: TextureDescriptor,
}

enum WgpuRenderTarget {
    /// View onto a texture that stays sampleable.
    Texture {
        texture: TextureHandle,
        view: wgpu::TextureView,
        description: RenderTargetDescription,
    },
    /// Dedicated attachment, multisampled or depth.
    Attachment {
        raw: wgpu::Texture,
        view: wgpu::TextureView,
        description: RenderTargetDescription,
    },
}

impl WgpuRenderTarget {
    fn description(&self) -> RenderTargetDescription {
        match self {
            WgpuRenderTarget::Texture { description, .. }
            | WgpuRenderTarget::Attachment { description, .. } => *description,
        }
    }

    fn view(&self) -> &wgpu::TextureView {
        match self {
            WgpuRenderTarget::Texture { view, .. } | WgpuRenderTarget::Attachment { view, .. } => {
                view
            }
        }
    }
}

struct WgpuProgram {
    module: wgpu::ShaderModule,
    descriptor: ProgramDescriptor,
    uniform_layout: Option<wgpu::BindGroupLayout>,
    sampler_layout: Option<wgpu::BindGroupLayout>,
    pipeline_layout: wgpu::PipelineLayout,
}

struct WgpuPipeline {
    raw: wgpu::RenderPipeline,
    descriptor: RenderPipelineDescriptor,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct BindGroupKey {
    program: ProgramHandle,
    group: u32,
    resources: SmallVec<[ResourceHandle; 4]>,
}

pub struct WgpuDevice {
    adapter: wgpu::Adapter,
    device: wgpu::Device,
    queue: wgpu::Queue,
    backend: BackendKind,
    limits: DeviceLimits,
    buffers: SlotMap<BufferHandle, WgpuBuffer>,
    textures: SlotMap<TextureHandle, WgpuTexture>,
    samplers: SlotMap<SamplerHandle, wgpu::Sampler>,
    render_targets: SlotMap<RenderTargetHandle, WgpuRenderTarget>,
    programs: SlotMap<ProgramHandle, WgpuProgram>,
    pipelines: SlotMap<RenderPipelineHandle, WgpuPipeline>,
    bind_groups: HashMap<BindGroupKey, wgpu::BindGroup>,
    /// Names given through `set_resource_name`, used as labels for views and bind groups.
    names: HashMap<ResourceHandle, String>,
}

/// Label for a bind group: the first named resource it binds, then its program's name.
fn bind_group_label(
    names: &HashMap<ResourceHandle, String>,
    key: &BindGroupKey,
    fallback: &str,
) -> String {
    let named = key
        .resources
        .iter()
        .chain(std::iter::once(&ResourceHandle::Program(key.program)))
        .find_map(|resource| names.get(resource));
    match named {
        Some(name) => format!("{name} group {}", key.group),
        None => fallback.to_string(),
    }
}

fn texture_view(
    raw: &wgpu::Texture,
    dimension: TextureDimension,
    label: Option<&str>,
) -> wgpu::TextureView {
    raw.create_view(&wgpu::TextureViewDescriptor {
        label,
        dimension: Some(match dimension {
            TextureDimension::D2 => wgpu::TextureViewDimension::D2,
            TextureDimension::D2Array => wgpu::TextureViewDimension::D2Array,
        }),
        ..Default::default()
    })
}

impl WgpuDevice {
    /// Negotiates an adapter and a device. This is the only asynchronous step before
    /// resources can be created.
    pub async fn new(config: &WgpuDeviceConfig) -> Result<Self, DeviceInitError> {
        let backends = match config.backend {
            BackendKind::WebGpu => wgpu::Backends::PRIMARY,
            BackendKind::WebGl => wgpu::Backends::GL,
            BackendKind::Software => return Err(DeviceInitError::UnsupportedBackend(config.backend)),
        };

        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends,
            ..Default::default()
        });

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: match config.power_preference {
                    PowerPreference::LowPower => wgpu::PowerPreference::LowPower,
                    PowerPreference::HighPerformance => wgpu::PowerPreference::HighPerformance,
                },
                compatible_surface: None,
                force_fallback_adapter: false,
            })
            .await
            .map_err(|error| DeviceInitError::NoAdapter(error.to_string()))?;

        let required_limits = match config.backend {
            BackendKind::WebGl => wgpu::Limits::downlevel_webgl2_defaults(),
            _ => wgpu::Limits::default(),
        }
        .using_resolution(adapter.limits());

        let (device, queue) = adapter
            .request_device(&wgpu::DeviceDescriptor {
                label: config.label.as_deref(),
                required_features: wgpu::Features::empty(),
                required_limits,
                memory_hints: Default::default(),
                trace: Default::default(),
            })
            .await
            .map_err(|error| DeviceInitError::RequestDevice(error.to_string()))?;

        info!(adapter = ?adapter.get_info().name, backend = ?config.backend, "device ready");
        Ok(Self::from_parts(adapter, device, queue, config.backend))
    }

    /// Wraps primitives the embedder already negotiated, for example alongside a surface.
    pub fn from_parts(
        adapter: wgpu::Adapter,
        device: wgpu::Device,
        queue: wgpu::Queue,
        backend: BackendKind,
    ) -> Self {
        let raw = device.limits();
        let limits = DeviceLimits {
            max_texture_dimension_2d: raw.max_texture_dimension_2d,
            max_buffer_size: raw.max_buffer_size,
            max_sample_count: 4,
            max_vertex_buffers: raw.max_vertex_buffers,
            memory_budget: None,
        };

        Self {
            adapter,
            device,
            queue,
            backend,
            limits,
            buffers: SlotMap::with_key(),
            textures: SlotMap::with_key(),
            samplers: SlotMap::with_key(),
            render_targets: SlotMap::with_key(),
            programs: SlotMap::with_key(),
            pipelines: SlotMap::with_key(),
            bind_groups: HashMap::default(),
            names: HashMap::default(),
        }
    }

    pub fn resource_name(&self, resource: ResourceHandle) -> Option<&str> {
        self.names.get(&resource).map(String::as_str)
    }

    pub fn raw_device(&self) -> &wgpu::Device {
        &self.device
    }

    pub fn raw_queue(&self) -> &wgpu::Queue {
        &self.queue
    }

    /// The wgpu texture behind a handle, for presenting or compositing outside this crate.
    pub fn raw_texture(&self, texture: TextureHandle) -> Option<&wgpu::Texture> {
        self.textures.get(texture).map(|texture| &texture.raw)
    }

    fn reject(requested: RequestedResource, reason: CreationFailure) -> ResourceCreationError {
        let error = ResourceCreationError::new(requested, reason);
        warn!("{error}");
        error
    }

    fn check_extent(
        &self,
        requested: impl Fn() -> RequestedResource,
        width: u32,
        height: u32,
    ) -> Result<(), ResourceCreationError> {
        if width == 0 || height == 0 {
            return Err(Self::reject(requested(), CreationFailure::ZeroSized));
        }
        let largest = width.max(height);
        if largest > self.limits.max_texture_dimension_2d {
            return Err(Self::reject(
                requested(),
                CreationFailure::ExceedsLimit {
                    requested: largest as u64,
                    limit: self.limits.max_texture_dimension_2d as u64,
                },
            ));
        }
        Ok(())
    }

    fn raw_texture_format(
        requested: impl Fn() -> RequestedResource,
        format: Format,
    ) -> Result<wgpu::TextureFormat, ResourceCreationError> {
        conversion::texture_format(format)
            .ok_or_else(|| Self::reject(requested(), CreationFailure::UnsupportedFormat(format)))
    }

    fn uniform_layout(&self, count: u32) -> wgpu::BindGroupLayout {
        let entries: Vec<_> = (0..count)
            .map(|binding| wgpu::BindGroupLayoutEntry {
                binding,
                visibility: wgpu::ShaderStages::VERTEX | wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: false,
                    min_binding_size: None,
                },
                count: None,
            })
            .collect();
        self.device
            .create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                label: Some("tessera uniforms"),
                entries: &entries,
            })
    }

    fn sampler_layout(&self, count: u32) -> wgpu::BindGroupLayout {
        let entries: Vec<_> = (0..count)
            .flat_map(|index| {
                [
                    wgpu::BindGroupLayoutEntry {
                        binding: index * 2,
                        visibility: wgpu::ShaderStages::FRAGMENT,
                        ty: wgpu::BindingType::Texture {
                            sample_type: wgpu::TextureSampleType::Float { filterable: true },
                            view_dimension: wgpu::TextureViewDimension::D2,
                            multisampled: false,
                        },
                        count: None,
                    },
                    wgpu::BindGroupLayoutEntry {
                        binding: index * 2 + 1,
                        visibility: wgpu::ShaderStages::FRAGMENT,
                        ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                        count: None,
                    },
                ]
            })
            .collect();
        self.device
            .create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                label: Some("tessera samplers"),
                entries: &entries,
            })
    }

    /// Makes sure every bind group a draw needs is cached and returns their keys in group
    /// order.
    fn ensure_bind_groups(
        &mut self,
        draw: &DrawCall,
    ) -> Result<SmallVec<[BindGroupKey; 2]>, DeviceError> {
        let pipeline = self
            .pipelines
            .get(draw.pipeline)
            .ok_or(DeviceError::InvalidHandle(draw.pipeline.into()))?;
        let program_handle = pipeline.descriptor.program;
        let program = self
            .programs
            .get(program_handle)
            .ok_or(DeviceError::InvalidHandle(program_handle.into()))?;
        let bindings = program.descriptor.bindings;

        if draw.uniform_buffers.len() as u32 != bindings.num_uniform_buffers
            || draw.samplers.len() as u32 != bindings.num_samplers
        {
            return Err(DeviceError::DrawMismatch(format!(
                "draw binds {} uniform buffer(s) and {} sampler(s), program declares {} and {}",
                draw.uniform_buffers.len(),
                draw.samplers.len(),
                bindings.num_uniform_buffers,
                bindings.num_samplers
            )));
        }

        let mut keys = SmallVec::new();

        if let Some(layout) = &program.uniform_layout {
            let key = BindGroupKey {
                program: program_handle,
                group: 0,
                resources: draw.uniform_buffers.iter().map(|&b| b.into()).collect(),
            };
            if !self.bind_groups.contains_key(&key) {
                let mut entries = Vec::with_capacity(draw.uniform_buffers.len());
                for (binding, &handle) in draw.uniform_buffers.iter().enumerate() {
                    let buffer = self
                        .buffers
                        .get(handle)
                        .ok_or(DeviceError::InvalidHandle(handle.into()))?;
                    entries.push(wgpu::BindGroupEntry {
                        binding: binding as u32,
                        resource: buffer.raw.as_entire_binding(),
                    });
                }
                let label = bind_group_label(&self.names, &key, "tessera uniforms");
                let group = self.device.create_bind_group(&wgpu::BindGroupDescriptor {
                    label: Some(&label),
                    layout,
                    entries: &entries,
                });
                self.bind_groups.insert(key.clone(), group);
            }
            keys.push(key);
        }

        if let Some(layout) = &program.sampler_layout {
            let key = BindGroupKey {
                program: program_handle,
                group: 1,
                resources: draw
                    .samplers
                    .iter()
                    .flat_map(|binding| {
                        [
                            ResourceHandle::from(binding.texture),
                            ResourceHandle::from(binding.sampler),
                        ]
                    })
                    .collect(),
            };
            if !self.bind_groups.contains_key(&key) {
                let mut entries = Vec::with_capacity(draw.samplers.len() * 2);
                for (index, binding) in draw.samplers.iter().enumerate() {
                    let texture = self
                        .textures
                        .get(binding.texture)
                        .ok_or(DeviceError::InvalidHandle(binding.texture.into()))?;
                    let sampler = self
                        .samplers
                        .get(binding.sampler)
                        .ok_or(DeviceError::InvalidHandle(binding.sampler.into()))?;
                    entries.push(wgpu::BindGroupEntry {
                        binding: index as u32 * 2,
                        resource: wgpu::BindingResource::TextureView(&texture.view),
                    });
                    entries.push(wgpu::BindGroupEntry {
                        binding: index as u32 * 2 + 1,
                        resource: wgpu::BindingResource::Sampler(sampler),
                    });
                }
                let label = bind_group_label(&self.names, &key, "tessera samplers");
                let group = self.device.create_bind_group(&wgpu::BindGroupDescriptor {
                    label: Some(&label),
                    layout,
                    entries: &entries,
                });
                self.bind_groups.insert(key.clone(), group);
            }
            keys.push(key);
        }

        Ok(keys)
    }

    fn render_target_view(&self, handle: RenderTargetHandle) -> Result<&wgpu::TextureView, DeviceError> {
        let target = self
            .render_targets
            .get(handle)
            .ok_or(DeviceError::InvalidHandle(handle.into()))?;
        if let WgpuRenderTarget::Texture { texture, .. } = target {
            if !self.textures.contains_key(*texture) {
                return Err(DeviceError::InvalidHandle((*texture).into()));
            }
        }
        Ok(target.view())
    }

    fn encode_pass(
        &self,
        pass: &RenderPassDescriptor<'_>,
        draws: &[DrawCall],
        bind_group_keys: &[SmallVec<[BindGroupKey; 2]>],
    ) -> Result<wgpu::CommandBuffer, DeviceError> {
        let color_view = self.render_target_view(pass.color)?;
        let resolve_view = match pass.resolve_to {
            Some(texture) => Some(
                &self
                    .textures
                    .get(texture)
                    .ok_or(DeviceError::InvalidHandle(texture.into()))?
                    .view,
            ),
            None => None,
        };
        let depth = match pass.depth_stencil {
            Some(attachment) => {
                let target = self
                    .render_targets
                    .get(attachment.target)
                    .ok_or(DeviceError::InvalidHandle(attachment.target.into()))?;
                Some((target, attachment.depth_load))
            }
            None => None,
        };

        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor { label: pass.label });
        {
            let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: pass.label,
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: color_view,
                    resolve_target: resolve_view,
                    ops: wgpu::Operations {
                        load: match pass.color_load {
                            LoadOp::Clear(color) => wgpu::LoadOp::Clear(conversion::clear_color(color)),
                            LoadOp::Load => wgpu::LoadOp::Load,
                        },
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: depth.map(|(target, load)| {
                    let stencil = target.description().pixel_format.has_stencil();
                    wgpu::RenderPassDepthStencilAttachment {
                        view: target.view(),
                        depth_ops: Some(wgpu::Operations {
                            load: match load {
                                LoadOp::Clear(depth) => wgpu::LoadOp::Clear(depth),
                                LoadOp::Load => wgpu::LoadOp::Load,
                            },
                            store: wgpu::StoreOp::Store,
                        }),
                        stencil_ops: stencil.then_some(wgpu::Operations {
                            load: wgpu::LoadOp::Clear(0),
                            store: wgpu::StoreOp::Store,
                        }),
                    }
                }),
                timestamp_writes: None,
                occlusion_query_set: None,
            });

            for (draw, keys) in draws.iter().zip(bind_group_keys) {
                let pipeline = self
                    .pipelines
                    .get(draw.pipeline)
                    .ok_or(DeviceError::InvalidHandle(draw.pipeline.into()))?;
                if draw.vertex_buffers.len() != pipeline.descriptor.vertex_buffers.len() {
                    return Err(DeviceError::DrawMismatch(format!(
                        "{} vertex buffers bound, pipeline expects {}",
                        draw.vertex_buffers.len(),
                        pipeline.descriptor.vertex_buffers.len()
                    )));
                }
                render_pass.set_pipeline(&pipeline.raw);

                for key in keys {
                    if let Some(group) = self.bind_groups.get(key) {
                        render_pass.set_bind_group(key.group, group, &[]);
                    }
                }
                for (slot, &handle) in draw.vertex_buffers.iter().enumerate() {
                    let buffer = self
                        .buffers
                        .get(handle)
                        .ok_or(DeviceError::InvalidHandle(handle.into()))?;
                    render_pass.set_vertex_buffer(slot as u32, buffer.raw.slice(..));
                }
                let index = self
                    .buffers
                    .get(draw.index_buffer)
                    .ok_or(DeviceError::InvalidHandle(draw.index_buffer.into()))?;
                render_pass.set_index_buffer(index.raw.slice(..), wgpu::IndexFormat::Uint32);
                render_pass.draw_indexed(0..draw.index_count, 0, 0..draw.instance_count);
            }
        }
        Ok(encoder.finish())
    }
}

impl Device for WgpuDevice {
    fn backend(&self) -> BackendKind {
        self.backend
    }

    fn limits(&self) -> DeviceLimits {
        self.limits
    }

    fn format_supports_samples(&self, format: Format, sample_count: u32) -> bool {
        let Some(raw) = conversion::texture_format(format) else {
            return false;
        };
        if sample_count == 1 {
            return true;
        }
        sample_count <= self.limits.max_sample_count
            && self
                .adapter
                .get_texture_format_features(raw)
                .flags
                .sample_count_supported(sample_count)
    }

    fn create_buffer(
        &mut self,
        descriptor: &BufferDescriptor,
    ) -> Result<BufferHandle, ResourceCreationError> {
        let requested = || RequestedResource::Buffer(*descriptor);
        if descriptor.byte_size == 0 {
            return Err(Self::reject(requested(), CreationFailure::ZeroSized));
        }
        if descriptor.byte_size > self.limits.max_buffer_size {
            return Err(Self::reject(
                requested(),
                CreationFailure::ExceedsLimit {
                    requested: descriptor.byte_size,
                    limit: self.limits.max_buffer_size,
                },
            ));
        }

        let size = descriptor.byte_size.next_multiple_of(wgpu::COPY_BUFFER_ALIGNMENT);
        let (raw, error) = error_scope::capture(&self.device, || {
            self.device.create_buffer(&wgpu::BufferDescriptor {
                label: None,
                size,
                usage: conversion::buffer_usages(descriptor.usage),
                mapped_at_creation: false,
            })
        });
        if let Some(error) = error {
            return Err(Self::reject(requested(), error_scope::creation_failure(error)));
        }
        Ok(self.buffers.insert(WgpuBuffer {
            raw,
            descriptor: *descriptor,
        }))
    }

    fn upload_buffer_data(
        &mut self,
        buffer: BufferHandle,
        dst_byte_offset: u64,
        data: &[u8],
    ) -> Result<(), DeviceError> {
        let target = self
            .buffers
            .get(buffer)
            .ok_or(DeviceError::InvalidHandle(buffer.into()))?;
        if dst_byte_offset % 4 != 0 || data.len() % 4 != 0 {
            return Err(DeviceError::Misaligned {
                offset: dst_byte_offset,
                len: data.len() as u64,
            });
        }
        let capacity = target.descriptor.byte_size;
        let end = dst_byte_offset.checked_add(data.len() as u64);
        if !matches!(end, Some(end) if end <= capacity) {
            return Err(DeviceError::OutOfBounds {
                offset: dst_byte_offset,
                len: data.len() as u64,
                capacity,
            });
        }
        self.queue.write_buffer(&target.raw, dst_byte_offset, data);
        Ok(())
    }

    fn create_texture(
        &mut self,
        descriptor: &TextureDescriptor,
    ) -> Result<TextureHandle, ResourceCreationError> {
        let requested = || RequestedResource::Texture(*descriptor);
        self.check_extent(requested, descriptor.width, descriptor.height)?;
        let format = Self::raw_texture_format(requested, descriptor.pixel_format)?;

        let mut usage = wgpu::TextureUsages::TEXTURE_BINDING
            | wgpu::TextureUsages::COPY_DST
            | wgpu::TextureUsages::COPY_SRC;
        if descriptor.usage == TextureUsage::RenderTarget {
            usage |= wgpu::TextureUsages::RENDER_ATTACHMENT;
        }

        let (raw, error) = error_scope::capture(&self.device, || {
            self.device.create_texture(&wgpu::TextureDescriptor {
                label: None,
                size: wgpu::Extent3d {
                    width: descriptor.width,
                    height: descriptor.height,
                    depth_or_array_layers: descriptor.depth_or_array_layers,
                },
                mip_level_count: descriptor.mip_level_count,
                sample_count: 1,
                dimension: wgpu::TextureDimension::D2,
                format,
                usage,
                view_formats: &[],
            })
        });
        if let Some(error) = error {
            return Err(Self::reject(requested(), error_scope::creation_failure(error)));
        }

        let view = texture_view(&raw, descriptor.dimension, None);
        Ok(self.textures.insert(WgpuTexture {
            raw,
            view,
            descriptor: *descriptor,
        }))
    }

    fn upload_texture_data(&mut self, texture: TextureHandle, data: &[u8]) -> Result<(), DeviceError> {
        let target = self
            .textures
            .get(texture)
            .ok_or(DeviceError::InvalidHandle(texture.into()))?;
        let descriptor = target.descriptor;
        if data.len() as u64 != descriptor.byte_size() {
            return Err(DeviceError::OutOfBounds {
                offset: 0,
                len: data.len() as u64,
                capacity: descriptor.byte_size(),
            });
        }
        let extent = wgpu::Extent3d {
            width: descriptor.width,
            height: descriptor.height,
            depth_or_array_layers: descriptor.depth_or_array_layers,
        };
        self.queue.write_texture(
            target.raw.as_image_copy(),
            data,
            wgpu::TexelCopyBufferLayout {
                offset: 0,
                bytes_per_row: Some(descriptor.width * descriptor.pixel_format.byte_size()),
                rows_per_image: Some(descriptor.height),
            },
            extent,
        );
        Ok(())
    }

    fn create_texture_from_texture(
        &mut self,
        source: TextureHandle,
    ) -> Result<TextureHandle, ResourceCreationError> {
        let Some(descriptor) = self.textures.get(source).map(|texture| texture.descriptor) else {
            return Err(Self::reject(
                RequestedResource::TextureCopy(source),
                CreationFailure::InvalidSource,
            ));
        };
        let copy = self.create_texture(&descriptor)?;

        if let (Some(from), Some(to)) = (self.textures.get(source), self.textures.get(copy)) {
            let mut encoder = self
                .device
                .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                    label: Some("tessera texture copy"),
                });
            encoder.copy_texture_to_texture(
                from.raw.as_image_copy(),
                to.raw.as_image_copy(),
                wgpu::Extent3d {
                    width: descriptor.width,
                    height: descriptor.height,
                    depth_or_array_layers: descriptor.depth_or_array_layers,
                },
            );
            self.queue.submit(Some(encoder.finish()));
        }
        Ok(copy)
    }

    fn create_sampler(
        &mut self,
        descriptor: &SamplerDescriptor,
    ) -> Result<SamplerHandle, ResourceCreationError> {
        let address_mode = conversion::address_mode(descriptor.address_mode);
        let raw = self.device.create_sampler(&wgpu::SamplerDescriptor {
            label: None,
            address_mode_u: address_mode,
            address_mode_v: address_mode,
            address_mode_w: address_mode,
            mag_filter: conversion::filter_mode(descriptor.mag_filter),
            min_filter: conversion::filter_mode(descriptor.min_filter),
            mipmap_filter: conversion::filter_mode(descriptor.mipmap_filter),
            ..Default::default()
        });
        Ok(self.samplers.insert(raw))
    }

    fn create_render_target(
        &mut self,
        description: &RenderTargetDescription,
    ) -> Result<RenderTargetHandle, ResourceCreationError> {
        let requested = || RequestedResource::RenderTarget(*description);
        self.check_extent(requested, description.width, description.height)?;
        let format = Self::raw_texture_format(requested, description.pixel_format)?;
        if !self.format_supports_samples(description.pixel_format, description.sample_count) {
            return Err(Self::reject(
                requested(),
                CreationFailure::UnsupportedSampleCount(description.sample_count),
            ));
        }

        let (raw, error) = error_scope::capture(&self.device, || {
            self.device.create_texture(&wgpu::TextureDescriptor {
                label: None,
                size: wgpu::Extent3d {
                    width: description.width,
                    height: description.height,
                    depth_or_array_layers: 1,
                },
                mip_level_count: 1,
                sample_count: description.sample_count,
                dimension: wgpu::TextureDimension::D2,
                format,
                usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
                view_formats: &[],
            })
        });
        if let Some(error) = error {
            return Err(Self::reject(requested(), error_scope::creation_failure(error)));
        }

        let view = raw.create_view(&wgpu::TextureViewDescriptor::default());
        Ok(self.render_targets.insert(WgpuRenderTarget::Attachment {
            raw,
            view,
            description: *description,
        }))
    }

    fn create_render_target_from_texture(
        &mut self,
        texture: TextureHandle,
    ) -> Result<RenderTargetHandle, ResourceCreationError> {
        let requested = || RequestedResource::RenderTargetFromTexture(texture);
        let Some(source) = self.textures.get(texture) else {
            return Err(Self::reject(requested(), CreationFailure::InvalidSource));
        };
        if source.descriptor.usage != TextureUsage::RenderTarget {
            return Err(Self::reject(
                requested(),
                CreationFailure::UnsupportedFormat(source.descriptor.pixel_format),
            ));
        }
        let description = RenderTargetDescription::new(
            source.descriptor.pixel_format,
            source.descriptor.width,
            source.descriptor.height,
            1,
        );
        let view = source.raw.create_view(&wgpu::TextureViewDescriptor::default());
        Ok(self.render_targets.insert(WgpuRenderTarget::Texture {
            texture,
            view,
            description,
        }))
    }

    fn create_program(
        &mut self,
        descriptor: &ProgramDescriptor,
    ) -> Result<ProgramHandle, ResourceCreationError> {
        let requested = || RequestedResource::program(descriptor);
        if let Err(message) = validate_bindings(&descriptor.source, &descriptor.bindings) {
            return Err(Self::reject(requested(), CreationFailure::BindingMismatch(message)));
        }

        let (module, error) = error_scope::capture(&self.device, || {
            self.device.create_shader_module(wgpu::ShaderModuleDescriptor {
                label: descriptor.label.as_deref(),
                source: wgpu::ShaderSource::Wgsl(descriptor.source.as_str().into()),
            })
        });
        if let Some(error) = error {
            return Err(Self::reject(requested(), error_scope::creation_failure(error)));
        }

        let bindings = descriptor.bindings;
        let needs_uniform_group = bindings.num_uniform_buffers > 0 || bindings.num_samplers > 0;
        let uniform_layout =
            needs_uniform_group.then(|| self.uniform_layout(bindings.num_uniform_buffers));
        let sampler_layout =
            (bindings.num_samplers > 0).then(|| self.sampler_layout(bindings.num_samplers));
        let layouts: Vec<&wgpu::BindGroupLayout> =
            uniform_layout.iter().chain(sampler_layout.iter()).collect();
        let pipeline_layout = self
            .device
            .create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
                label: descriptor.label.as_deref(),
                bind_group_layouts: &layouts,
                push_constant_ranges: &[],
            });

        Ok(self.programs.insert(WgpuProgram {
            module,
            descriptor: descriptor.clone(),
            uniform_layout,
            sampler_layout,
            pipeline_layout,
        }))
    }

    fn create_render_pipeline(
        &mut self,
        descriptor: &RenderPipelineDescriptor,
    ) -> Result<RenderPipelineHandle, ResourceCreationError> {
        let requested = || RequestedResource::pipeline(descriptor);
        let Some(program) = self.programs.get(descriptor.program) else {
            return Err(Self::reject(requested(), CreationFailure::InvalidSource));
        };
        let color_format = Self::raw_texture_format(requested, descriptor.color_format)?;
        let depth_format = match descriptor.depth_stencil_format {
            Some(format) => Some(Self::raw_texture_format(requested, format)?),
            None => None,
        };

        let mut attributes = Vec::with_capacity(descriptor.vertex_buffers.len());
        for layout in &descriptor.vertex_buffers {
            let mut converted = Vec::with_capacity(layout.attributes.len());
            for attribute in &layout.attributes {
                let format = conversion::vertex_format(attribute.format).ok_or_else(|| {
                    Self::reject(requested(), CreationFailure::UnsupportedFormat(attribute.format))
                })?;
                converted.push(wgpu::VertexAttribute {
                    format,
                    offset: attribute.byte_offset as u64,
                    shader_location: attribute.shader_location,
                });
            }
            attributes.push(converted);
        }
        let buffers: Vec<wgpu::VertexBufferLayout> = descriptor
            .vertex_buffers
            .iter()
            .zip(&attributes)
            .map(|(layout, attributes)| wgpu::VertexBufferLayout {
                array_stride: layout.byte_stride as u64,
                step_mode: conversion::step_mode(layout.frequency),
                attributes,
            })
            .collect();

        let (raw, error) = error_scope::capture(&self.device, || {
            self.device
                .create_render_pipeline(&wgpu::RenderPipelineDescriptor {
                    label: descriptor.label.as_deref(),
                    layout: Some(&program.pipeline_layout),
                    vertex: wgpu::VertexState {
                        module: &program.module,
                        entry_point: Some(program.descriptor.vertex_entry),
                        compilation_options: Default::default(),
                        buffers: &buffers,
                    },
                    fragment: Some(wgpu::FragmentState {
                        module: &program.module,
                        entry_point: Some(program.descriptor.fragment_entry),
                        compilation_options: Default::default(),
                        targets: &[Some(wgpu::ColorTargetState {
                            format: color_format,
                            blend: Some(conversion::blend_state(descriptor.blend)),
                            write_mask: wgpu::ColorWrites::ALL,
                        })],
                    }),
                    primitive: wgpu::PrimitiveState {
                        topology: conversion::topology(descriptor.topology),
                        ..Default::default()
                    },
                    depth_stencil: depth_format.map(|format| wgpu::DepthStencilState {
                        format,
                        depth_write_enabled: false,
                        depth_compare: wgpu::CompareFunction::Always,
                        stencil: Default::default(),
                        bias: Default::default(),
                    }),
                    multisample: wgpu::MultisampleState {
                        count: descriptor.sample_count,
                        mask: !0,
                        alpha_to_coverage_enabled: false,
                    },
                    multiview: None,
                    cache: None,
                })
        });
        if let Some(error) = error {
            return Err(Self::reject(requested(), error_scope::creation_failure(error)));
        }

        Ok(self.pipelines.insert(WgpuPipeline {
            raw,
            descriptor: descriptor.clone(),
        }))
    }

    fn set_resource_name(&mut self, resource: ResourceHandle, name: &str) {
        // wgpu labels are fixed at creation. Views are recreated under the new name and
        // bind groups created from now on carry it.
        match resource {
            ResourceHandle::Texture(handle) => {
                if let Some(texture) = self.textures.get_mut(handle) {
                    texture.view = texture_view(&texture.raw, texture.descriptor.dimension, Some(name));
                }
            }
            ResourceHandle::RenderTarget(handle) => match self.render_targets.get_mut(handle) {
                Some(WgpuRenderTarget::Attachment { raw, view, .. }) => {
                    *view = raw.create_view(&wgpu::TextureViewDescriptor {
                        label: Some(name),
                        ..Default::default()
                    });
                }
                Some(WgpuRenderTarget::Texture { texture, view, .. }) => {
                    if let Some(source) = self.textures.get(*texture) {
                        *view = source.raw.create_view(&wgpu::TextureViewDescriptor {
                            label: Some(name),
                            ..Default::default()
                        });
                    }
                }
                None => {}
            },
            _ => {}
        }
        debug!(?resource, name, "resource named");
        self.names.insert(resource, name.to_string());
    }

    fn destroy(&mut self, resource: ResourceHandle) {
        match resource {
            ResourceHandle::Buffer(handle) => {
                if let Some(buffer) = self.buffers.remove(handle) {
                    buffer.raw.destroy();
                }
            }
            ResourceHandle::Texture(handle) => {
                if let Some(texture) = self.textures.remove(handle) {
                    texture.raw.destroy();
                }
            }
            ResourceHandle::Sampler(handle) => {
                self.samplers.remove(handle);
            }
            ResourceHandle::RenderTarget(handle) => {
                if let Some(WgpuRenderTarget::Attachment { raw, .. }) =
                    self.render_targets.remove(handle)
                {
                    raw.destroy();
                }
            }
            ResourceHandle::Program(handle) => {
                self.programs.remove(handle);
            }
            ResourceHandle::RenderPipeline(handle) => {
                self.pipelines.remove(handle);
            }
        }
        self.bind_groups.retain(|key, _| {
            ResourceHandle::Program(key.program) != resource && !key.resources.contains(&resource)
        });
        self.names.remove(&resource);
    }

    fn submit_pass(
        &mut self,
        pass: &RenderPassDescriptor<'_>,
        draws: &[DrawCall],
    ) -> Result<(), DeviceError> {
        let mut bind_group_keys = Vec::with_capacity(draws.len());
        for draw in draws {
            bind_group_keys.push(self.ensure_bind_groups(draw)?);
        }

        let (command_buffer, error) = error_scope::capture(&self.device, || {
            self.encode_pass(pass, draws, &bind_group_keys)
        });
        let command_buffer = command_buffer?;
        if let Some(error) = error {
            return Err(DeviceError::DrawMismatch(error.to_string()));
        }
        self.queue.submit(Some(command_buffer));
        Ok(())
    }

    fn read_buffer(
        &mut self,
        buffer: BufferHandle,
        byte_offset: u64,
        byte_size: u64,
    ) -> LocalBoxFuture<'static, Result<Vec<u8>, ReadbackError>> {
        let Some(source) = self.buffers.get(buffer) else {
            return futures::future::ready(Err(ReadbackError::InvalidHandle(buffer.into())))
                .boxed_local();
        };
        let capacity = source.descriptor.byte_size;
        let end = byte_offset.checked_add(byte_size);
        if !matches!(end, Some(end) if end <= capacity) {
            return futures::future::ready(Err(ReadbackError::OutOfRange {
                offset: byte_offset,
                end: end.unwrap_or(u64::MAX),
                capacity,
            }))
            .boxed_local();
        }
        if byte_offset % wgpu::COPY_BUFFER_ALIGNMENT != 0
            || byte_size % wgpu::COPY_BUFFER_ALIGNMENT != 0
        {
            return futures::future::ready(Err(ReadbackError::Misaligned)).boxed_local();
        }
        readback::read_buffer(&self.device, &self.queue, &source.raw, byte_offset, byte_size)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bind_group_labels_follow_resource_names() {
        let mut buffers: SlotMap<BufferHandle, ()> = SlotMap::with_key();
        let mut programs: SlotMap<ProgramHandle, ()> = SlotMap::with_key();
        let uniforms = buffers.insert(());
        let program = programs.insert(());
        let key = BindGroupKey {
            program,
            group: 0,
            resources: SmallVec::from_iter([ResourceHandle::from(uniforms)]),
        };

        let mut names = HashMap::default();
        assert_eq!(bind_group_label(&names, &key, "tessera uniforms"), "tessera uniforms");

        names.insert(ResourceHandle::Program(program), "sdf".to_string());
        assert_eq!(bind_group_label(&names, &key, "tessera uniforms"), "sdf group 0");

        names.insert(ResourceHandle::from(uniforms), "scene uniforms".to_string());
        assert_eq!(
            bind_group_label(&names, &key, "tessera uniforms"),
            "scene uniforms group 0"
        );
    }
}
