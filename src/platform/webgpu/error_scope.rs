use futures::executor::block_on;

use crate::platform::error::CreationFailure;

/// Runs `create` inside validation and out-of-memory error scopes and reports what the
/// device raised while it ran.
pub(super) fn capture<T>(device: &wgpu::Device, create: impl FnOnce() -> T) -> (T, Option<wgpu::Error>) {
    device.push_error_scope(wgpu::ErrorFilter::OutOfMemory);
    device.push_error_scope(wgpu::ErrorFilter::Validation);
    let value = create();
    let validation = block_on(device.pop_error_scope());
    let out_of_memory = block_on(device.pop_error_scope());
    (value, validation.or(out_of_memory))
}

pub(super) fn creation_failure(error: wgpu::Error) -> CreationFailure {
    match error {
        wgpu::Error::OutOfMemory { .. } => CreationFailure::OutOfMemory,
        other => CreationFailure::Backend(other.to_string()),
    }
}
