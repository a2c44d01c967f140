//! Retained-mode 2D rendering core.
//!
//! Display objects are grouped into instanced batches, drawn through a backend-neutral
//! [`platform::Device`], and picked through an R-tree over their world bounds.

pub use lyon;
pub use wgpu;

pub mod batch;
mod cache;
mod camera;
mod color;
pub mod culling;
mod error;
pub mod geometry;
pub mod material;
pub mod mesh;
pub mod picking;
pub mod pipeline;
pub mod platform;
pub mod render_target;
mod renderer;
pub mod scene;
pub mod texture_pool;
mod util;

pub use camera::Camera;
pub use color::Color;
pub use error::RenderError;
pub use renderer::{FrameStats, Renderer, RendererConfig};
pub use scene::{DisplayObject, EntityId, ParsedStyle, StyleAttribute};
pub use util::{transform_affine_point, Mat4};
