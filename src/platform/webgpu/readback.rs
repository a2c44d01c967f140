use futures::channel::oneshot;
use futures::future::{FutureExt, LocalBoxFuture};
use tracing::warn;

use crate::platform::error::ReadbackError;

/// Copies `byte_size` bytes of `source` into a fresh staging buffer and resolves once the
/// staging buffer is mapped.
pub(super) fn read_buffer(
    device: &wgpu::Device,
    queue: &wgpu::Queue,
    source: &wgpu::Buffer,
    byte_offset: u64,
    byte_size: u64,
) -> LocalBoxFuture<'static, Result<Vec<u8>, ReadbackError>> {
    let staging = device.create_buffer(&wgpu::BufferDescriptor {
        label: Some("tessera readback staging"),
        size: byte_size,
        usage: wgpu::BufferUsages::MAP_READ | wgpu::BufferUsages::COPY_DST,
        mapped_at_creation: false,
    });

    let mut encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
        label: Some("tessera readback"),
    });
    encoder.copy_buffer_to_buffer(source, byte_offset, &staging, 0, byte_size);
    queue.submit(Some(encoder.finish()));

    let (sender, receiver) = oneshot::channel();
    staging
        .slice(..)
        .map_async(wgpu::MapMode::Read, move |result| {
            if sender.send(result).is_err() {
                warn!("Readback future dropped before the staging buffer was mapped");
            }
        });

    let device = device.clone();
    async move {
        let _ = device.poll(wgpu::MaintainBase::Wait);

        receiver
            .await
            .map_err(|_| ReadbackError::Cancelled)?
            .map_err(|error| ReadbackError::MapFailed(error.to_string()))?;

        let bytes = staging.slice(..).get_mapped_range().to_vec();
        staging.unmap();
        Ok(bytes)
    }
    .boxed_local()
}
