//! The retained-mode frame loop.
//!
//! A [`Renderer`] owns one device session. Scene mutations are queued as
//! [`SceneEvent`]s and applied at the start of the next [`Renderer::render`] or pick, so
//! any number of edits between two frames costs one pass over the queue.

mod config;
mod construction;
mod events;
mod metrics;
mod picking;
mod rendering;
mod surface;

use std::collections::VecDeque;

use tracing::{debug, trace, warn};

pub use config::RendererConfig;
pub use metrics::FrameStats;

use crate::batch::BatchManager;
use crate::camera::Camera;
use crate::culling::Culling;
use crate::error::RenderError;
use crate::mesh::FillTessellation;
use crate::picking::Picker;
use crate::pipeline::{PipelineCache, PipelineTargets, SceneUniforms};
use crate::platform::{BufferHandle, Device, TextureHandle};
use crate::render_target::RenderTargetPool;
use crate::scene::{DisplayObject, DisplayObjectPool, DrawOrder, EntityId, SceneEvent, StyleAttribute};
use crate::texture_pool::TexturePool;
use crate::util::Mat4;

pub struct Renderer<D: Device> {
    device: D,
    config: RendererConfig,
    /// Sample count actually used, after validation against the device.
    msaa_sample_count: u32,
    viewport: (u32, u32),
    camera: Camera,

    objects: DisplayObjectPool,
    events: VecDeque<SceneEvent>,
    order: DrawOrder,
    order_dirty: bool,
    /// Set when the order changed since batches were last checked against it.
    resort_batches: bool,

    batches: BatchManager,
    pipelines: PipelineCache,
    targets: RenderTargetPool,
    textures: TexturePool,
    tessellation: FillTessellation,
    picker: Picker,
    culling: Culling,

    scene_uniforms: Option<BufferHandle>,
    /// Single-sample texture holding the last rendered frame.
    output: Option<TextureHandle>,
    frame_index: u64,
    last_frame: FrameStats,
}
