//! In-memory backend.
//!
//! Keeps every buffer and texture as host bytes and validates every request and draw the
//! way a GPU backend would, without executing shaders. Used by tests and headless tools.

use ahash::HashMap;
use futures::future::{FutureExt, LocalBoxFuture};
use slotmap::{SecondaryMap, SlotMap};
use tracing::{trace, warn};

use super::error::{
    CreationFailure, DeviceError, ReadbackError, RequestedResource, ResourceCreationError,
};
use super::format::Format;
use super::interfaces::*;
use super::shader_layout::validate_bindings;

struct SoftwareBuffer {
    descriptor: BufferDescriptor,
    data: Vec<u8>,
}

struct SoftwareTexture {
    descriptor: TextureDescriptor,
    data: Vec<u8>,
}

enum SoftwareRenderTarget {
    Texture {
        texture: TextureHandle,
        description: RenderTargetDescription,
    },
    Attachment {
        description: RenderTargetDescription,
    },
}

impl SoftwareRenderTarget {
    fn description(&self) -> RenderTargetDescription {
        match self {
            SoftwareRenderTarget::Texture { description, .. }
            | SoftwareRenderTarget::Attachment { description } => *description,
        }
    }

    fn byte_size(&self) -> u64 {
        match self {
            // The texture owns the memory.
            SoftwareRenderTarget::Texture { .. } => 0,
            SoftwareRenderTarget::Attachment { description } => {
                description.width as u64
                    * description.height as u64
                    * description.pixel_format.byte_size() as u64
                    * description.sample_count as u64
            }
        }
    }
}

/// Counters accumulated by [`SoftwareDevice::submit_pass`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SubmissionStats {
    pub passes: u64,
    pub draw_calls: u64,
    pub instances: u64,
    pub indices: u64,
}

pub struct SoftwareDevice {
    limits: DeviceLimits,
    allocated_bytes: u64,
    buffers: SlotMap<BufferHandle, SoftwareBuffer>,
    textures: SlotMap<TextureHandle, SoftwareTexture>,
    samplers: SlotMap<SamplerHandle, SamplerDescriptor>,
    render_targets: SlotMap<RenderTargetHandle, SoftwareRenderTarget>,
    programs: SlotMap<ProgramHandle, ProgramDescriptor>,
    pipelines: SlotMap<RenderPipelineHandle, RenderPipelineDescriptor>,
    last_clear: SecondaryMap<RenderTargetHandle, [f32; 4]>,
    names: HashMap<ResourceHandle, String>,
    stats: SubmissionStats,
}

impl Default for SoftwareDevice {
    fn default() -> Self {
        Self::new(DeviceLimits::default())
    }
}

impl SoftwareDevice {
    pub fn new(limits: DeviceLimits) -> Self {
        Self {
            limits,
            allocated_bytes: 0,
            buffers: SlotMap::with_key(),
            textures: SlotMap::with_key(),
            samplers: SlotMap::with_key(),
            render_targets: SlotMap::with_key(),
            programs: SlotMap::with_key(),
            pipelines: SlotMap::with_key(),
            last_clear: SecondaryMap::new(),
            names: HashMap::default(),
            stats: SubmissionStats::default(),
        }
    }

    pub fn stats(&self) -> SubmissionStats {
        self.stats
    }

    pub fn reset_stats(&mut self) {
        self.stats = SubmissionStats::default();
    }

    /// Number of live resources of every kind.
    pub fn live_resource_count(&self) -> usize {
        self.buffers.len()
            + self.textures.len()
            + self.samplers.len()
            + self.render_targets.len()
            + self.programs.len()
            + self.pipelines.len()
    }

    pub fn allocated_bytes(&self) -> u64 {
        self.allocated_bytes
    }

    pub fn buffer_contents(&self, buffer: BufferHandle) -> Option<&[u8]> {
        self.buffers.get(buffer).map(|buffer| buffer.data.as_slice())
    }

    pub fn texture_contents(&self, texture: TextureHandle) -> Option<&[u8]> {
        self.textures.get(texture).map(|texture| texture.data.as_slice())
    }

    pub fn resource_name(&self, resource: ResourceHandle) -> Option<&str> {
        self.names.get(&resource).map(String::as_str)
    }

    /// Clear color of the most recent pass that cleared `target`.
    pub fn last_clear_color(&self, target: RenderTargetHandle) -> Option<[f32; 4]> {
        self.last_clear.get(target).copied()
    }

    pub fn render_target_texture(&self, target: RenderTargetHandle) -> Option<TextureHandle> {
        match self.render_targets.get(target)? {
            SoftwareRenderTarget::Texture { texture, .. } => Some(*texture),
            SoftwareRenderTarget::Attachment { .. } => None,
        }
    }

    fn supports_texture_format(format: Format) -> bool {
        // Three-component texel layouts have no GPU counterpart.
        format != Format::F32_RGB
    }

    fn reserve(
        &mut self,
        requested: RequestedResource,
        byte_size: u64,
    ) -> Result<(), ResourceCreationError> {
        if let Some(budget) = self.limits.memory_budget {
            if self.allocated_bytes + byte_size > budget {
                return Err(reject(requested, CreationFailure::OutOfMemory));
            }
        }
        self.allocated_bytes += byte_size;
        Ok(())
    }

    fn release(&mut self, byte_size: u64) {
        self.allocated_bytes = self.allocated_bytes.saturating_sub(byte_size);
    }

    fn check_texture_descriptor(
        &self,
        descriptor: &TextureDescriptor,
    ) -> Result<(), ResourceCreationError> {
        let requested = || RequestedResource::Texture(*descriptor);
        if descriptor.width == 0
            || descriptor.height == 0
            || descriptor.depth_or_array_layers == 0
            || descriptor.mip_level_count == 0
        {
            return Err(reject(requested(), CreationFailure::ZeroSized));
        }
        let largest = descriptor.width.max(descriptor.height);
        if largest > self.limits.max_texture_dimension_2d {
            return Err(reject(
                requested(),
                CreationFailure::ExceedsLimit {
                    requested: largest as u64,
                    limit: self.limits.max_texture_dimension_2d as u64,
                },
            ));
        }
        let format = descriptor.pixel_format;
        let usable = match descriptor.usage {
            TextureUsage::Sampled => Self::supports_texture_format(format) && !format.is_depth(),
            TextureUsage::RenderTarget => format.is_color_renderable() || format.is_depth(),
        };
        if !usable {
            return Err(reject(requested(), CreationFailure::UnsupportedFormat(format)));
        }
        Ok(())
    }

    fn check_render_target_description(
        &self,
        description: &RenderTargetDescription,
    ) -> Result<(), ResourceCreationError> {
        let requested = || RequestedResource::RenderTarget(*description);
        if description.width == 0 || description.height == 0 {
            return Err(reject(requested(), CreationFailure::ZeroSized));
        }
        let largest = description.width.max(description.height);
        if largest > self.limits.max_texture_dimension_2d {
            return Err(reject(
                requested(),
                CreationFailure::ExceedsLimit {
                    requested: largest as u64,
                    limit: self.limits.max_texture_dimension_2d as u64,
                },
            ));
        }
        let format = description.pixel_format;
        if !format.is_color_renderable() && !format.is_depth() {
            return Err(reject(requested(), CreationFailure::UnsupportedFormat(format)));
        }
        if !self.format_supports_samples(format, description.sample_count) {
            return Err(reject(
                requested(),
                CreationFailure::UnsupportedSampleCount(description.sample_count),
            ));
        }
        Ok(())
    }

    fn validate_draw(
        &self,
        pass: &RenderPassDescriptor<'_>,
        target: RenderTargetDescription,
        depth_format: Option<Format>,
        draw: &DrawCall,
    ) -> Result<(), DeviceError> {
        let pipeline = self
            .pipelines
            .get(draw.pipeline)
            .ok_or(DeviceError::InvalidHandle(draw.pipeline.into()))?;
        let program = self
            .programs
            .get(pipeline.program)
            .ok_or(DeviceError::InvalidHandle(pipeline.program.into()))?;

        if pipeline.color_format != target.pixel_format
            || pipeline.sample_count != target.sample_count
        {
            return Err(DeviceError::DrawMismatch(format!(
                "pipeline targets {:?}x{} but the pass renders to {:?}x{}",
                pipeline.color_format,
                pipeline.sample_count,
                target.pixel_format,
                target.sample_count
            )));
        }
        if pipeline.depth_stencil_format != depth_format {
            return Err(DeviceError::DrawMismatch(format!(
                "pipeline depth format {:?} differs from the pass depth format {:?}",
                pipeline.depth_stencil_format, depth_format
            )));
        }
        if pass.resolve_to.is_some() && target.sample_count == 1 {
            return Err(DeviceError::DrawMismatch(
                "resolve target on a single-sample pass".to_string(),
            ));
        }

        if draw.vertex_buffers.len() != pipeline.vertex_buffers.len() {
            return Err(DeviceError::DrawMismatch(format!(
                "{} vertex buffers bound, pipeline expects {}",
                draw.vertex_buffers.len(),
                pipeline.vertex_buffers.len()
            )));
        }
        for (buffer, layout) in draw.vertex_buffers.iter().zip(&pipeline.vertex_buffers) {
            let bound = self.buffer_with_usage(*buffer, BufferUsage::Vertex)?;
            if layout.frequency == VertexBufferFrequency::PerInstance {
                let needed = layout.byte_stride as u64 * draw.instance_count as u64;
                if needed > bound.descriptor.byte_size {
                    return Err(DeviceError::DrawMismatch(format!(
                        "{} instances need {needed} bytes, buffer holds {}",
                        draw.instance_count, bound.descriptor.byte_size
                    )));
                }
            }
        }

        let index = self.buffer_with_usage(draw.index_buffer, BufferUsage::Index)?;
        let index_bytes = draw.index_count as u64 * 4;
        if index_bytes > index.descriptor.byte_size {
            return Err(DeviceError::DrawMismatch(format!(
                "{} indices overflow an index buffer of {} bytes",
                draw.index_count, index.descriptor.byte_size
            )));
        }

        if draw.uniform_buffers.len() as u32 != program.bindings.num_uniform_buffers {
            return Err(DeviceError::DrawMismatch(format!(
                "{} uniform buffers bound, program declares {}",
                draw.uniform_buffers.len(),
                program.bindings.num_uniform_buffers
            )));
        }
        for buffer in &draw.uniform_buffers {
            self.buffer_with_usage(*buffer, BufferUsage::Uniform)?;
        }

        if draw.samplers.len() as u32 != program.bindings.num_samplers {
            return Err(DeviceError::DrawMismatch(format!(
                "{} samplers bound, program declares {}",
                draw.samplers.len(),
                program.bindings.num_samplers
            )));
        }
        for binding in &draw.samplers {
            if !self.textures.contains_key(binding.texture) {
                return Err(DeviceError::InvalidHandle(binding.texture.into()));
            }
            if !self.samplers.contains_key(binding.sampler) {
                return Err(DeviceError::InvalidHandle(binding.sampler.into()));
            }
        }
        Ok(())
    }

    fn buffer_with_usage(
        &self,
        handle: BufferHandle,
        usage: BufferUsage,
    ) -> Result<&SoftwareBuffer, DeviceError> {
        let buffer = self
            .buffers
            .get(handle)
            .ok_or(DeviceError::InvalidHandle(handle.into()))?;
        if buffer.descriptor.usage != usage {
            return Err(DeviceError::DrawMismatch(format!(
                "buffer created for {:?} bound as {usage:?}",
                buffer.descriptor.usage
            )));
        }
        Ok(buffer)
    }
}

fn reject(requested: RequestedResource, reason: CreationFailure) -> ResourceCreationError {
    let error = ResourceCreationError::new(requested, reason);
    warn!("{error}");
    error
}

impl Device for SoftwareDevice {
    fn backend(&self) -> BackendKind {
        BackendKind::Software
    }

    fn limits(&self) -> DeviceLimits {
        self.limits
    }

    fn format_supports_samples(&self, format: Format, sample_count: u32) -> bool {
        match sample_count {
            1 => true,
            4 => {
                sample_count <= self.limits.max_sample_count
                    && format != Format::F32_RGBA
                    && (format.is_color_renderable() || format.is_depth())
            }
            _ => false,
        }
    }

    fn create_buffer(
        &mut self,
        descriptor: &BufferDescriptor,
    ) -> Result<BufferHandle, ResourceCreationError> {
        let requested = || RequestedResource::Buffer(*descriptor);
        if descriptor.byte_size == 0 {
            return Err(reject(requested(), CreationFailure::ZeroSized));
        }
        if descriptor.byte_size > self.limits.max_buffer_size {
            return Err(reject(
                requested(),
                CreationFailure::ExceedsLimit {
                    requested: descriptor.byte_size,
                    limit: self.limits.max_buffer_size,
                },
            ));
        }
        self.reserve(requested(), descriptor.byte_size)?;
        let handle = self.buffers.insert(SoftwareBuffer {
            descriptor: *descriptor,
            data: vec![0; descriptor.byte_size as usize],
        });
        trace!(?handle, size = descriptor.byte_size, "created buffer");
        Ok(handle)
    }

    fn upload_buffer_data(
        &mut self,
        buffer: BufferHandle,
        dst_byte_offset: u64,
        data: &[u8],
    ) -> Result<(), DeviceError> {
        let target = self
            .buffers
            .get_mut(buffer)
            .ok_or(DeviceError::InvalidHandle(buffer.into()))?;
        if dst_byte_offset % 4 != 0 || data.len() % 4 != 0 {
            return Err(DeviceError::Misaligned {
                offset: dst_byte_offset,
                len: data.len() as u64,
            });
        }
        let capacity = target.data.len() as u64;
        let end = match dst_byte_offset.checked_add(data.len() as u64) {
            Some(end) if end <= capacity => end,
            _ => {
                return Err(DeviceError::OutOfBounds {
                    offset: dst_byte_offset,
                    len: data.len() as u64,
                    capacity,
                })
            }
        };
        target.data[dst_byte_offset as usize..end as usize].copy_from_slice(data);
        Ok(())
    }

    fn create_texture(
        &mut self,
        descriptor: &TextureDescriptor,
    ) -> Result<TextureHandle, ResourceCreationError> {
        self.check_texture_descriptor(descriptor)?;
        let byte_size = descriptor.byte_size();
        self.reserve(RequestedResource::Texture(*descriptor), byte_size)?;
        Ok(self.textures.insert(SoftwareTexture {
            descriptor: *descriptor,
            data: vec![0; byte_size as usize],
        }))
    }

    fn upload_texture_data(&mut self, texture: TextureHandle, data: &[u8]) -> Result<(), DeviceError> {
        let target = self
            .textures
            .get_mut(texture)
            .ok_or(DeviceError::InvalidHandle(texture.into()))?;
        if data.len() != target.data.len() {
            return Err(DeviceError::OutOfBounds {
                offset: 0,
                len: data.len() as u64,
                capacity: target.data.len() as u64,
            });
        }
        target.data.copy_from_slice(data);
        Ok(())
    }

    fn create_texture_from_texture(
        &mut self,
        source: TextureHandle,
    ) -> Result<TextureHandle, ResourceCreationError> {
        let (descriptor, data) = match self.textures.get(source) {
            Some(texture) => (texture.descriptor, texture.data.clone()),
            None => {
                return Err(reject(
                    RequestedResource::TextureCopy(source),
                    CreationFailure::InvalidSource,
                ))
            }
        };
        self.reserve(RequestedResource::Texture(descriptor), data.len() as u64)?;
        Ok(self.textures.insert(SoftwareTexture { descriptor, data }))
    }

    fn create_sampler(
        &mut self,
        descriptor: &SamplerDescriptor,
    ) -> Result<SamplerHandle, ResourceCreationError> {
        Ok(self.samplers.insert(*descriptor))
    }

    fn create_render_target(
        &mut self,
        description: &RenderTargetDescription,
    ) -> Result<RenderTargetHandle, ResourceCreationError> {
        self.check_render_target_description(description)?;
        let target = SoftwareRenderTarget::Attachment {
            description: *description,
        };
        self.reserve(RequestedResource::RenderTarget(*description), target.byte_size())?;
        Ok(self.render_targets.insert(target))
    }

    fn create_render_target_from_texture(
        &mut self,
        texture: TextureHandle,
    ) -> Result<RenderTargetHandle, ResourceCreationError> {
        let requested = || RequestedResource::RenderTargetFromTexture(texture);
        let descriptor = match self.textures.get(texture) {
            Some(source) => source.descriptor,
            None => return Err(reject(requested(), CreationFailure::InvalidSource)),
        };
        if descriptor.usage != TextureUsage::RenderTarget {
            return Err(reject(
                requested(),
                CreationFailure::UnsupportedFormat(descriptor.pixel_format),
            ));
        }
        let description = RenderTargetDescription::new(
            descriptor.pixel_format,
            descriptor.width,
            descriptor.height,
            1,
        );
        Ok(self.render_targets.insert(SoftwareRenderTarget::Texture {
            texture,
            description,
        }))
    }

    fn create_program(
        &mut self,
        descriptor: &ProgramDescriptor,
    ) -> Result<ProgramHandle, ResourceCreationError> {
        if let Err(message) = validate_bindings(&descriptor.source, &descriptor.bindings) {
            return Err(reject(
                RequestedResource::program(descriptor),
                CreationFailure::BindingMismatch(message),
            ));
        }
        for entry in [descriptor.vertex_entry, descriptor.fragment_entry] {
            if !descriptor.source.contains(&format!("fn {entry}(")) {
                return Err(reject(
                    RequestedResource::program(descriptor),
                    CreationFailure::Backend(format!("entry point `{entry}` not found")),
                ));
            }
        }
        Ok(self.programs.insert(descriptor.clone()))
    }

    fn create_render_pipeline(
        &mut self,
        descriptor: &RenderPipelineDescriptor,
    ) -> Result<RenderPipelineHandle, ResourceCreationError> {
        let requested = || RequestedResource::pipeline(descriptor);
        if !self.programs.contains_key(descriptor.program) {
            return Err(reject(requested(), CreationFailure::InvalidSource));
        }
        if descriptor.vertex_buffers.len() as u32 > self.limits.max_vertex_buffers {
            return Err(reject(
                requested(),
                CreationFailure::ExceedsLimit {
                    requested: descriptor.vertex_buffers.len() as u64,
                    limit: self.limits.max_vertex_buffers as u64,
                },
            ));
        }
        for attribute in descriptor.vertex_buffers.iter().flat_map(|b| &b.attributes) {
            if !attribute.format.is_vertex_format() {
                return Err(reject(
                    requested(),
                    CreationFailure::UnsupportedFormat(attribute.format),
                ));
            }
        }
        if !descriptor.color_format.is_color_renderable() {
            return Err(reject(
                requested(),
                CreationFailure::UnsupportedFormat(descriptor.color_format),
            ));
        }
        if let Some(depth) = descriptor.depth_stencil_format {
            if !depth.is_depth() {
                return Err(reject(requested(), CreationFailure::UnsupportedFormat(depth)));
            }
        }
        if !self.format_supports_samples(descriptor.color_format, descriptor.sample_count) {
            return Err(reject(
                requested(),
                CreationFailure::UnsupportedSampleCount(descriptor.sample_count),
            ));
        }
        Ok(self.pipelines.insert(descriptor.clone()))
    }

    fn set_resource_name(&mut self, resource: ResourceHandle, name: &str) {
        self.names.insert(resource, name.to_string());
    }

    fn destroy(&mut self, resource: ResourceHandle) {
        let freed = match resource {
            ResourceHandle::Buffer(handle) => self
                .buffers
                .remove(handle)
                .map(|buffer| buffer.descriptor.byte_size),
            ResourceHandle::Texture(handle) => self
                .textures
                .remove(handle)
                .map(|texture| texture.data.len() as u64),
            ResourceHandle::Sampler(handle) => self.samplers.remove(handle).map(|_| 0),
            ResourceHandle::RenderTarget(handle) => {
                self.last_clear.remove(handle);
                self.render_targets
                    .remove(handle)
                    .map(|target| target.byte_size())
            }
            ResourceHandle::Program(handle) => self.programs.remove(handle).map(|_| 0),
            ResourceHandle::RenderPipeline(handle) => self.pipelines.remove(handle).map(|_| 0),
        };
        if let Some(bytes) = freed {
            self.release(bytes);
        }
        self.names.remove(&resource);
    }

    fn submit_pass(
        &mut self,
        pass: &RenderPassDescriptor<'_>,
        draws: &[DrawCall],
    ) -> Result<(), DeviceError> {
        let target = self
            .render_targets
            .get(pass.color)
            .ok_or(DeviceError::InvalidHandle(pass.color.into()))?;
        if let SoftwareRenderTarget::Texture { texture, .. } = target {
            if !self.textures.contains_key(*texture) {
                return Err(DeviceError::InvalidHandle((*texture).into()));
            }
        }
        let description = target.description();

        if let Some(resolve) = pass.resolve_to {
            let texture = self
                .textures
                .get(resolve)
                .ok_or(DeviceError::InvalidHandle(resolve.into()))?;
            if texture.descriptor.pixel_format != description.pixel_format {
                return Err(DeviceError::DrawMismatch(
                    "resolve target format differs from the color attachment".to_string(),
                ));
            }
        }

        let depth_format = match pass.depth_stencil {
            Some(attachment) => {
                let depth = self
                    .render_targets
                    .get(attachment.target)
                    .ok_or(DeviceError::InvalidHandle(attachment.target.into()))?
                    .description();
                if depth.sample_count != description.sample_count {
                    return Err(DeviceError::DrawMismatch(
                        "depth attachment sample count differs from the color attachment"
                            .to_string(),
                    ));
                }
                Some(depth.pixel_format)
            }
            None => None,
        };

        for draw in draws {
            self.validate_draw(pass, description, depth_format, draw)?;
        }

        if let LoadOp::Clear(color) = pass.color_load {
            self.last_clear.insert(pass.color, color);
        }
        self.stats.passes += 1;
        for draw in draws {
            self.stats.draw_calls += 1;
            self.stats.instances += draw.instance_count as u64;
            self.stats.indices += draw.index_count as u64 * draw.instance_count as u64;
        }
        trace!(label = ?pass.label, draws = draws.len(), "submitted pass");
        Ok(())
    }

    fn read_buffer(
        &mut self,
        buffer: BufferHandle,
        byte_offset: u64,
        byte_size: u64,
    ) -> LocalBoxFuture<'static, Result<Vec<u8>, ReadbackError>> {
        let result = match self.buffers.get(buffer) {
            None => Err(ReadbackError::InvalidHandle(buffer.into())),
            Some(source) => {
                let capacity = source.data.len() as u64;
                match byte_offset.checked_add(byte_size) {
                    Some(end) if end <= capacity => {
                        Ok(source.data[byte_offset as usize..end as usize].to_vec())
                    }
                    end => Err(ReadbackError::OutOfRange {
                        offset: byte_offset,
                        end: end.unwrap_or(u64::MAX),
                        capacity,
                    }),
                }
            }
        };
        futures::future::ready(result).boxed_local()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::executor::block_on;

    fn vertex_buffer(size: u64) -> BufferDescriptor {
        BufferDescriptor {
            byte_size: size,
            usage: BufferUsage::Vertex,
            hint: BufferFrequencyHint::Static,
        }
    }

    #[test]
    fn upload_past_the_end_is_rejected() {
        let mut device = SoftwareDevice::default();
        let buffer = device.create_buffer(&vertex_buffer(16)).unwrap();
        let result = device.upload_buffer_data(buffer, 12, &[0; 8]);
        assert_eq!(
            result,
            Err(DeviceError::OutOfBounds {
                offset: 12,
                len: 8,
                capacity: 16
            })
        );
    }

    #[test]
    fn overflowing_ranges_are_rejected() {
        let mut device = SoftwareDevice::default();
        let buffer = device.create_buffer(&vertex_buffer(16)).unwrap();
        let offset = u64::MAX - 3;
        assert_eq!(
            device.upload_buffer_data(buffer, offset, &[0; 8]),
            Err(DeviceError::OutOfBounds {
                offset,
                len: 8,
                capacity: 16
            })
        );
        assert_eq!(
            block_on(device.read_buffer(buffer, u64::MAX, 4)),
            Err(ReadbackError::OutOfRange {
                offset: u64::MAX,
                end: u64::MAX,
                capacity: 16
            })
        );
    }

    #[test]
    fn readback_returns_uploaded_bytes() {
        let mut device = SoftwareDevice::default();
        let buffer = device.create_buffer(&vertex_buffer(8)).unwrap();
        device.upload_buffer_data(buffer, 4, &[1, 2, 3, 4]).unwrap();
        let bytes = block_on(device.read_buffer(buffer, 4, 4)).unwrap();
        assert_eq!(bytes, vec![1, 2, 3, 4]);
    }

    #[test]
    fn destroyed_handle_is_reported_not_reused() {
        let mut device = SoftwareDevice::default();
        let buffer = device.create_buffer(&vertex_buffer(8)).unwrap();
        device.destroy(buffer.into());
        let replacement = device.create_buffer(&vertex_buffer(8)).unwrap();
        assert_ne!(buffer, replacement);
        assert_eq!(
            device.upload_buffer_data(buffer, 0, &[0]),
            Err(DeviceError::InvalidHandle(buffer.into()))
        );
    }

    #[test]
    fn oversized_texture_carries_its_description() {
        let mut device = SoftwareDevice::new(DeviceLimits {
            max_texture_dimension_2d: 256,
            ..DeviceLimits::default()
        });
        let descriptor = TextureDescriptor::new_2d(Format::U8_RGBA_NORM, 512, 16, TextureUsage::Sampled);
        let error = device.create_texture(&descriptor).unwrap_err();
        assert_eq!(error.requested, RequestedResource::Texture(descriptor));
        assert_eq!(
            error.reason,
            CreationFailure::ExceedsLimit {
                requested: 512,
                limit: 256
            }
        );
    }

    #[test]
    fn memory_budget_reports_out_of_memory() {
        let mut device = SoftwareDevice::new(DeviceLimits {
            memory_budget: Some(64),
            ..DeviceLimits::default()
        });
        device.create_buffer(&vertex_buffer(48)).unwrap();
        let error = device.create_buffer(&vertex_buffer(32)).unwrap_err();
        assert_eq!(error.reason, CreationFailure::OutOfMemory);
    }

    #[test]
    fn unsupported_sample_count_is_rejected() {
        let mut device = SoftwareDevice::default();
        let description = RenderTargetDescription::new(Format::U8_RGBA_NORM, 32, 32, 8);
        let error = device.create_render_target(&description).unwrap_err();
        assert_eq!(error.reason, CreationFailure::UnsupportedSampleCount(8));
    }

    #[test]
    fn texture_copy_duplicates_contents() {
        let mut device = SoftwareDevice::default();
        let descriptor = TextureDescriptor::new_2d(Format::U8_RGBA_NORM, 1, 2, TextureUsage::Sampled);
        let source = device.create_texture(&descriptor).unwrap();
        device
            .upload_texture_data(source, &[1, 2, 3, 4, 5, 6, 7, 8])
            .unwrap();
        let copy = device.create_texture_from_texture(source).unwrap();
        assert_ne!(copy, source);
        assert_eq!(device.texture_contents(copy), device.texture_contents(source));
    }

    #[test]
    fn render_target_from_sampled_texture_is_rejected() {
        let mut device = SoftwareDevice::default();
        let descriptor = TextureDescriptor::new_2d(Format::U8_RGBA_NORM, 4, 4, TextureUsage::Sampled);
        let texture = device.create_texture(&descriptor).unwrap();
        assert!(device.create_render_target_from_texture(texture).is_err());
    }

    #[test]
    fn destroy_releases_names_and_memory() {
        let mut device = SoftwareDevice::default();
        let buffer = device.create_buffer(&vertex_buffer(32)).unwrap();
        device.set_resource_name(buffer.into(), "positions");
        assert_eq!(device.resource_name(buffer.into()), Some("positions"));
        device.destroy(buffer.into());
        assert_eq!(device.resource_name(buffer.into()), None);
        assert_eq!(device.allocated_bytes(), 0);
        assert_eq!(device.live_resource_count(), 0);
    }
}
