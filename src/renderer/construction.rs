use super::config::validate_sample_count_static;
use super::*;

use crate::platform::{AnyDevice, DeviceInitError, SoftwareDevice, WgpuDevice, WgpuDeviceConfig};

impl<D: Device> Renderer<D> {
    /// Starts a session on `device`. No device resource is created until the first frame.
    pub fn new(device: D, width: u32, height: u32, config: RendererConfig) -> Self {
        let mut msaa_sample_count = validate_sample_count_static(config.msaa_samples);
        if !device.format_supports_samples(config.color_format, msaa_sample_count) {
            warn!(
                format = ?config.color_format,
                msaa_sample_count,
                "color format cannot be multisampled, rendering without MSAA"
            );
            msaa_sample_count = 1;
        }
        debug!(backend = ?device.backend(), width, height, msaa_sample_count, "renderer created");

        Self {
            device,
            msaa_sample_count,
            viewport: (width, height),
            camera: Camera::new(width, height),
            objects: DisplayObjectPool::new(),
            events: VecDeque::new(),
            order: DrawOrder::new(),
            order_dirty: false,
            resort_batches: false,
            batches: BatchManager::new(),
            pipelines: PipelineCache::new(),
            targets: RenderTargetPool::new(),
            textures: TexturePool::new(config.texture_cache_capacity),
            tessellation: FillTessellation::new(config.tessellation_cache_size, config.tolerance),
            picker: Picker::new(config.tolerance),
            culling: Culling::new(config.viewport_culling),
            scene_uniforms: None,
            output: None,
            frame_index: 0,
            last_frame: FrameStats::default(),
            config,
        }
    }

    pub fn device(&self) -> &D {
        &self.device
    }

    pub fn device_mut(&mut self) -> &mut D {
        &mut self.device
    }

    pub fn config(&self) -> &RendererConfig {
        &self.config
    }

    pub fn batches(&self) -> &BatchManager {
        &self.batches
    }

    pub fn render_targets(&self) -> &RenderTargetPool {
        &self.targets
    }

    pub fn pipelines(&self) -> &PipelineCache {
        &self.pipelines
    }

    pub fn textures(&self) -> &TexturePool {
        &self.textures
    }

    /// Releases every device resource the session created. The scene itself is kept, so
    /// the next frame recreates what it needs.
    pub fn destroy(&mut self) {
        self.batches.destroy_all(&mut self.device, &mut self.textures);
        self.textures.destroy_all(&mut self.device);
        self.targets.destroy_all(&mut self.device);
        self.pipelines.destroy_all(&mut self.device);
        if let Some(buffer) = self.scene_uniforms.take() {
            self.device.destroy(buffer.into());
        }
        self.output = None;

        // Re-sync with the pool. Batches regain their members now and their device
        // resources at the next prepare.
        self.picker.index_mut().rebuild(&self.objects);
        for (entity, _) in self.objects.iter() {
            self.batches.insert(entity, &self.objects);
        }
        self.culling.reset();
        self.order_dirty = true;
        debug!("renderer resources destroyed");
    }
}

impl Renderer<SoftwareDevice> {
    /// A renderer on the in-memory backend, for tests and tooling.
    pub fn headless(width: u32, height: u32, config: RendererConfig) -> Self {
        Self::new(SoftwareDevice::default(), width, height, config)
    }
}

impl Renderer<AnyDevice> {
    /// A renderer on a freshly requested wgpu adapter.
    pub async fn with_wgpu(
        device_config: &WgpuDeviceConfig,
        width: u32,
        height: u32,
        config: RendererConfig,
    ) -> Result<Self, DeviceInitError> {
        let device = WgpuDevice::new(device_config).await?;
        Ok(Self::new(device.into(), width, height, config))
    }
}
