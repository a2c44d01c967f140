use thiserror::Error;

use crate::geometry::GeometryError;
use crate::platform::{DeviceError, ResourceCreationError};
use crate::render_target::DescriptionMismatchError;
use crate::scene::EntityId;

/// Everything that can stop a frame.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RenderError {
    #[error(transparent)]
    ResourceCreation(#[from] ResourceCreationError),
    #[error(transparent)]
    Device(#[from] DeviceError),
    #[error(transparent)]
    Geometry(#[from] GeometryError),
    #[error(transparent)]
    DescriptionMismatch(#[from] DescriptionMismatchError),
    #[error("no display object with id {0:?}")]
    UnknownEntity(EntityId),
    #[error("viewport {width}x{height} is empty")]
    EmptyViewport { width: u32, height: u32 },
}
