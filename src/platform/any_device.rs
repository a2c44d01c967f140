use futures::future::LocalBoxFuture;

use super::error::{DeviceError, ReadbackError, ResourceCreationError};
use super::format::Format;
use super::interfaces::*;
use super::software::SoftwareDevice;
use super::webgpu::WgpuDevice;

/// The backend chosen for a session.
pub enum AnyDevice {
    Software(SoftwareDevice),
    Wgpu(Box<WgpuDevice>),
}

impl From<SoftwareDevice> for AnyDevice {
    fn from(device: SoftwareDevice) -> Self {
        AnyDevice::Software(device)
    }
}

impl From<WgpuDevice> for AnyDevice {
    fn from(device: WgpuDevice) -> Self {
        AnyDevice::Wgpu(Box::new(device))
    }
}

macro_rules! dispatch {
    ($self:ident, $device:ident => $call:expr) => {
        match $self {
            AnyDevice::Software($device) => $call,
            AnyDevice::Wgpu($device) => $call,
        }
    };
}

impl Device for AnyDevice {
    fn backend(&self) -> BackendKind {
        dispatch!(self, device => device.backend())
    }

    fn limits(&self) -> DeviceLimits {
        dispatch!(self, device => device.limits())
    }

    fn format_supports_samples(&self, format: Format, sample_count: u32) -> bool {
        dispatch!(self, device => device.format_supports_samples(format, sample_count))
    }

    fn create_buffer(
        &mut self,
        descriptor: &BufferDescriptor,
    ) -> Result<BufferHandle, ResourceCreationError> {
        dispatch!(self, device => device.create_buffer(descriptor))
    }

    fn upload_buffer_data(
        &mut self,
        buffer: BufferHandle,
        dst_byte_offset: u64,
        data: &[u8],
    ) -> Result<(), DeviceError> {
        dispatch!(self, device => device.upload_buffer_data(buffer, dst_byte_offset, data))
    }

    fn create_texture(
        &mut self,
        descriptor: &TextureDescriptor,
    ) -> Result<TextureHandle, ResourceCreationError> {
        dispatch!(self, device => device.create_texture(descriptor))
    }

    fn upload_texture_data(&mut self, texture: TextureHandle, data: &[u8]) -> Result<(), DeviceError> {
        dispatch!(self, device => device.upload_texture_data(texture, data))
    }

    fn create_texture_from_texture(
        &mut self,
        source: TextureHandle,
    ) -> Result<TextureHandle, ResourceCreationError> {
        dispatch!(self, device => device.create_texture_from_texture(source))
    }

    fn create_sampler(
        &mut self,
        descriptor: &SamplerDescriptor,
    ) -> Result<SamplerHandle, ResourceCreationError> {
        dispatch!(self, device => device.create_sampler(descriptor))
    }

    fn create_render_target(
        &mut self,
        description: &RenderTargetDescription,
    ) -> Result<RenderTargetHandle, ResourceCreationError> {
        dispatch!(self, device => device.create_render_target(description))
    }

    fn create_render_target_from_texture(
        &mut self,
        texture: TextureHandle,
    ) -> Result<RenderTargetHandle, ResourceCreationError> {
        dispatch!(self, device => device.create_render_target_from_texture(texture))
    }

    fn create_program(
        &mut self,
        descriptor: &ProgramDescriptor,
    ) -> Result<ProgramHandle, ResourceCreationError> {
        dispatch!(self, device => device.create_program(descriptor))
    }

    fn create_render_pipeline(
        &mut self,
        descriptor: &RenderPipelineDescriptor,
    ) -> Result<RenderPipelineHandle, ResourceCreationError> {
        dispatch!(self, device => device.create_render_pipeline(descriptor))
    }

    fn set_resource_name(&mut self, resource: ResourceHandle, name: &str) {
        dispatch!(self, device => device.set_resource_name(resource, name))
    }

    fn destroy(&mut self, resource: ResourceHandle) {
        dispatch!(self, device => device.destroy(resource))
    }

    fn submit_pass(
        &mut self,
        pass: &RenderPassDescriptor<'_>,
        draws: &[DrawCall],
    ) -> Result<(), DeviceError> {
        dispatch!(self, device => device.submit_pass(pass, draws))
    }

    fn read_buffer(
        &mut self,
        buffer: BufferHandle,
        byte_offset: u64,
        byte_size: u64,
    ) -> LocalBoxFuture<'static, Result<Vec<u8>, ReadbackError>> {
        dispatch!(self, device => device.read_buffer(buffer, byte_offset, byte_size))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn software_variant_reports_its_backend() {
        let device = AnyDevice::from(SoftwareDevice::default());
        assert_eq!(device.backend(), BackendKind::Software);
        assert!(device.format_supports_samples(Format::U8_RGBA_NORM, 4));
    }
}
