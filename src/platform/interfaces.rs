use futures::future::LocalBoxFuture;
use slotmap::new_key_type;
use smallvec::SmallVec;

use super::error::{DeviceError, ReadbackError, ResourceCreationError};
use super::format::Format;

new_key_type! {
    pub struct BufferHandle;
    pub struct TextureHandle;
    pub struct SamplerHandle;
    pub struct RenderTargetHandle;
    pub struct ProgramHandle;
    pub struct RenderPipelineHandle;
}

/// Any device resource, for the operations that accept every kind of handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceHandle {
    Buffer(BufferHandle),
    Texture(TextureHandle),
    Sampler(SamplerHandle),
    RenderTarget(RenderTargetHandle),
    Program(ProgramHandle),
    RenderPipeline(RenderPipelineHandle),
}

macro_rules! impl_resource_handle_from {
    ($($handle:ident => $variant:ident),* $(,)?) => {
        $(
            impl From<$handle> for ResourceHandle {
                fn from(handle: $handle) -> Self {
                    ResourceHandle::$variant(handle)
                }
            }
        )*
    };
}

impl_resource_handle_from!(
    BufferHandle => Buffer,
    TextureHandle => Texture,
    SamplerHandle => Sampler,
    RenderTargetHandle => RenderTarget,
    ProgramHandle => Program,
    RenderPipelineHandle => RenderPipeline,
);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BackendKind {
    Software,
    WebGl,
    WebGpu,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BufferUsage {
    Vertex,
    Index,
    Uniform,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BufferFrequencyHint {
    Static,
    Dynamic,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BufferDescriptor {
    pub byte_size: u64,
    pub usage: BufferUsage,
    pub hint: BufferFrequencyHint,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TextureDimension {
    D2,
    D2Array,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TextureUsage {
    Sampled,
    RenderTarget,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TextureDescriptor {
    pub dimension: TextureDimension,
    pub pixel_format: Format,
    pub width: u32,
    pub height: u32,
    pub depth_or_array_layers: u32,
    pub mip_level_count: u32,
    pub usage: TextureUsage,
}

impl TextureDescriptor {
    /// A single-level 2D texture.
    pub fn new_2d(pixel_format: Format, width: u32, height: u32, usage: TextureUsage) -> Self {
        Self {
            dimension: TextureDimension::D2,
            pixel_format,
            width,
            height,
            depth_or_array_layers: 1,
            mip_level_count: 1,
            usage,
        }
    }

    /// Bytes of the first mip level, tightly packed.
    pub fn byte_size(&self) -> u64 {
        self.width as u64
            * self.height as u64
            * self.depth_or_array_layers as u64
            * self.pixel_format.byte_size() as u64
    }
}

/// What a render target must look like. Compared by value when pooled targets are matched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RenderTargetDescription {
    pub pixel_format: Format,
    pub width: u32,
    pub height: u32,
    pub sample_count: u32,
}

impl RenderTargetDescription {
    pub fn new(pixel_format: Format, width: u32, height: u32, sample_count: u32) -> Self {
        Self {
            pixel_format,
            width,
            height,
            sample_count,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AddressMode {
    ClampToEdge,
    Repeat,
    MirrorRepeat,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FilterMode {
    Nearest,
    Linear,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SamplerDescriptor {
    pub address_mode: AddressMode,
    pub mag_filter: FilterMode,
    pub min_filter: FilterMode,
    pub mipmap_filter: FilterMode,
}

impl Default for SamplerDescriptor {
    fn default() -> Self {
        Self {
            address_mode: AddressMode::ClampToEdge,
            mag_filter: FilterMode::Linear,
            min_filter: FilterMode::Linear,
            mipmap_filter: FilterMode::Nearest,
        }
    }
}

/// Number of resources a program binds.
///
/// Group 0 holds uniform buffers at bindings `0..num_uniform_buffers`; group 1 holds a
/// texture at `2 * i` and its sampler at `2 * i + 1` for every `i < num_samplers`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct BindingLayout {
    pub num_uniform_buffers: u32,
    pub num_samplers: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ProgramDescriptor {
    pub label: Option<String>,
    /// WGSL module holding both entry points.
    pub source: String,
    pub vertex_entry: &'static str,
    pub fragment_entry: &'static str,
    pub bindings: BindingLayout,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VertexBufferFrequency {
    PerVertex,
    PerInstance,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct VertexAttribute {
    pub format: Format,
    pub byte_offset: u32,
    pub shader_location: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct VertexBufferLayout {
    pub byte_stride: u32,
    pub frequency: VertexBufferFrequency,
    pub attributes: Vec<VertexAttribute>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BlendMode {
    Replace,
    Alpha,
    PremultipliedAlpha,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PrimitiveTopology {
    TriangleList,
    TriangleStrip,
    LineList,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RenderPipelineDescriptor {
    pub label: Option<String>,
    pub program: ProgramHandle,
    pub vertex_buffers: Vec<VertexBufferLayout>,
    pub color_format: Format,
    pub depth_stencil_format: Option<Format>,
    pub sample_count: u32,
    pub blend: BlendMode,
    pub topology: PrimitiveTopology,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LoadOp<T> {
    Clear(T),
    Load,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DepthStencilAttachment {
    pub target: RenderTargetHandle,
    pub depth_load: LoadOp<f32>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RenderPassDescriptor<'a> {
    pub label: Option<&'a str>,
    pub color: RenderTargetHandle,
    pub color_load: LoadOp<[f32; 4]>,
    /// Single-sample texture the multisampled color attachment resolves into.
    pub resolve_to: Option<TextureHandle>,
    pub depth_stencil: Option<DepthStencilAttachment>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SamplerBinding {
    pub texture: TextureHandle,
    pub sampler: SamplerHandle,
}

/// One indexed, instanced draw and everything it binds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DrawCall {
    pub pipeline: RenderPipelineHandle,
    /// Bound to slots in order; slot `i` uses the pipeline's `vertex_buffers[i]` layout.
    pub vertex_buffers: SmallVec<[BufferHandle; 4]>,
    /// 32-bit indices.
    pub index_buffer: BufferHandle,
    pub index_count: u32,
    pub instance_count: u32,
    pub uniform_buffers: SmallVec<[BufferHandle; 2]>,
    pub samplers: SmallVec<[SamplerBinding; 2]>,
}

/// Static capabilities a backend validates resource requests against.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeviceLimits {
    pub max_texture_dimension_2d: u32,
    pub max_buffer_size: u64,
    pub max_sample_count: u32,
    pub max_vertex_buffers: u32,
    /// Total bytes the backend may hold at once; `None` means unbounded.
    pub memory_budget: Option<u64>,
}

impl Default for DeviceLimits {
    fn default() -> Self {
        Self {
            max_texture_dimension_2d: 8192,
            max_buffer_size: 256 << 20,
            max_sample_count: 4,
            max_vertex_buffers: 8,
            memory_budget: None,
        }
    }
}

/// The resource and command surface every backend implements.
///
/// Creation is synchronous and either returns a live handle or fails with a
/// `ResourceCreationError` carrying the requested description. Handles stay valid until
/// passed to [`Device::destroy`]; using a destroyed handle is reported as
/// [`DeviceError::InvalidHandle`].
pub trait Device {
    fn backend(&self) -> BackendKind;

    fn limits(&self) -> DeviceLimits;

    fn format_supports_samples(&self, format: Format, sample_count: u32) -> bool;

    fn create_buffer(
        &mut self,
        descriptor: &BufferDescriptor,
    ) -> Result<BufferHandle, ResourceCreationError>;

    /// Writes `data` at `dst_byte_offset`. The whole range must lie inside the buffer.
    fn upload_buffer_data(
        &mut self,
        buffer: BufferHandle,
        dst_byte_offset: u64,
        data: &[u8],
    ) -> Result<(), DeviceError>;

    fn create_texture(
        &mut self,
        descriptor: &TextureDescriptor,
    ) -> Result<TextureHandle, ResourceCreationError>;

    /// Replaces the first mip level with tightly packed rows.
    fn upload_texture_data(&mut self, texture: TextureHandle, data: &[u8]) -> Result<(), DeviceError>;

    /// Creates a texture with the description of `source` and copies its contents.
    fn create_texture_from_texture(
        &mut self,
        source: TextureHandle,
    ) -> Result<TextureHandle, ResourceCreationError>;

    fn create_sampler(
        &mut self,
        descriptor: &SamplerDescriptor,
    ) -> Result<SamplerHandle, ResourceCreationError>;

    /// Dedicated attachment. Multisampled descriptions get no addressable texture.
    fn create_render_target(
        &mut self,
        description: &RenderTargetDescription,
    ) -> Result<RenderTargetHandle, ResourceCreationError>;

    /// Render-target view onto an existing texture, which stays sampleable.
    fn create_render_target_from_texture(
        &mut self,
        texture: TextureHandle,
    ) -> Result<RenderTargetHandle, ResourceCreationError>;

    fn create_program(
        &mut self,
        descriptor: &ProgramDescriptor,
    ) -> Result<ProgramHandle, ResourceCreationError>;

    fn create_render_pipeline(
        &mut self,
        descriptor: &RenderPipelineDescriptor,
    ) -> Result<RenderPipelineHandle, ResourceCreationError>;

    fn set_resource_name(&mut self, resource: ResourceHandle, name: &str);

    /// Releases the resource. Destroying a dead handle is a no-op.
    fn destroy(&mut self, resource: ResourceHandle);

    fn submit_pass(
        &mut self,
        pass: &RenderPassDescriptor<'_>,
        draws: &[DrawCall],
    ) -> Result<(), DeviceError>;

    /// Copies a byte range of a buffer back to the host.
    ///
    /// The returned future owns everything it needs, so it may be awaited after the
    /// frame that requested it has finished.
    fn read_buffer(
        &mut self,
        buffer: BufferHandle,
        byte_offset: u64,
        byte_size: u64,
    ) -> LocalBoxFuture<'static, Result<Vec<u8>, ReadbackError>>;
}
