use thiserror::Error;

use super::format::Format;
use super::interfaces::{
    BufferDescriptor, ProgramDescriptor, RenderPipelineDescriptor, RenderTargetDescription,
    ResourceHandle, SamplerDescriptor, TextureDescriptor, TextureHandle,
};

/// The description a failed creation call was made with.
#[derive(Debug, Clone, PartialEq)]
pub enum RequestedResource {
    Buffer(BufferDescriptor),
    Texture(TextureDescriptor),
    TextureCopy(TextureHandle),
    Sampler(SamplerDescriptor),
    RenderTarget(RenderTargetDescription),
    RenderTargetFromTexture(TextureHandle),
    Program { label: Option<String> },
    RenderPipeline { label: Option<String> },
}

impl RequestedResource {
    pub(crate) fn program(descriptor: &ProgramDescriptor) -> Self {
        RequestedResource::Program {
            label: descriptor.label.clone(),
        }
    }

    pub(crate) fn pipeline(descriptor: &RenderPipelineDescriptor) -> Self {
        RequestedResource::RenderPipeline {
            label: descriptor.label.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum CreationFailure {
    #[error("format {0:?} is not supported for this use")]
    UnsupportedFormat(Format),
    #[error("requested size {requested} exceeds the backend limit of {limit}")]
    ExceedsLimit { requested: u64, limit: u64 },
    #[error("sample count {0} is not supported")]
    UnsupportedSampleCount(u32),
    #[error("zero-sized resource")]
    ZeroSized,
    #[error("out of memory")]
    OutOfMemory,
    #[error("source resource is not alive")]
    InvalidSource,
    #[error("shader bindings do not match the declared layout: {0}")]
    BindingMismatch(String),
    #[error("backend rejected the request: {0}")]
    Backend(String),
}

/// A resource could not be created. Never retried by the caller.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("failed to create {requested:?}: {reason}")]
pub struct ResourceCreationError {
    pub requested: RequestedResource,
    pub reason: CreationFailure,
}

impl ResourceCreationError {
    pub fn new(requested: RequestedResource, reason: CreationFailure) -> Self {
        Self { requested, reason }
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum DeviceError {
    #[error("handle {0:?} does not refer to a live resource")]
    InvalidHandle(ResourceHandle),
    #[error("write of {len} bytes at offset {offset} overflows a resource of {capacity} bytes")]
    OutOfBounds { offset: u64, len: u64, capacity: u64 },
    #[error("write of {len} bytes at offset {offset} is not 4-byte aligned")]
    Misaligned { offset: u64, len: u64 },
    #[error("draw does not match its pipeline: {0}")]
    DrawMismatch(String),
    #[error(transparent)]
    ResourceCreation(#[from] ResourceCreationError),
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ReadbackError {
    #[error("handle {0:?} does not refer to a live buffer")]
    InvalidHandle(ResourceHandle),
    #[error("range {offset}..{end} is outside a buffer of {capacity} bytes")]
    OutOfRange { offset: u64, end: u64, capacity: u64 },
    #[error("readback range must be 4-byte aligned")]
    Misaligned,
    #[error("buffer mapping failed: {0}")]
    MapFailed(String),
    #[error("readback was cancelled before the device answered")]
    Cancelled,
}

/// Adapter and device negotiation failures.
#[derive(Debug, Error)]
pub enum DeviceInitError {
    #[error("no suitable adapter: {0}")]
    NoAdapter(String),
    #[error("device request failed: {0}")]
    RequestDevice(String),
    #[error("backend {0:?} cannot be created through this path")]
    UnsupportedBackend(super::interfaces::BackendKind),
}
