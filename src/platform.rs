//! Device abstraction: backend-neutral resource handles and the [`Device`] trait, with an
//! in-memory backend and a wgpu backend behind it.

mod any_device;
mod error;
mod format;
mod interfaces;
pub(crate) mod shader_layout;
mod software;
mod webgpu;

pub use any_device::AnyDevice;
pub use error::{
    CreationFailure, DeviceError, DeviceInitError, ReadbackError, RequestedResource,
    ResourceCreationError,
};
pub use format::Format;
pub use interfaces::*;
pub use software::{SoftwareDevice, SubmissionStats};
pub use webgpu::{PowerPreference, WgpuDevice, WgpuDeviceConfig};
