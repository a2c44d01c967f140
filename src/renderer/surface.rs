use super::config::validate_sample_count_static;
use super::*;

impl<D: Device> Renderer<D> {
    /// Changes the viewport. Targets of the old size age out of the pool on their own.
    pub fn resize(&mut self, width: u32, height: u32) {
        if self.viewport == (width, height) {
            return;
        }
        debug!(width, height, "viewport resized");
        self.viewport = (width, height);
        self.camera.resize(width, height);
    }

    pub fn size(&self) -> (u32, u32) {
        self.viewport
    }

    pub fn msaa_sample_count(&self) -> u32 {
        self.msaa_sample_count
    }

    /// Switches the sample count and drops the pipelines built for the previous one.
    pub fn set_msaa_samples(&mut self, requested: u32) {
        let mut samples = validate_sample_count_static(requested);
        if !self
            .device
            .format_supports_samples(self.config.color_format, samples)
        {
            warn!(samples, "color format cannot be multisampled, rendering without MSAA");
            samples = 1;
        }
        if samples == self.msaa_sample_count {
            return;
        }
        self.msaa_sample_count = samples;
        self.config.msaa_samples = requested;
        let targets = self.pipeline_targets();
        self.pipelines.retain_targets(&mut self.device, targets);
    }

    pub fn camera(&self) -> &Camera {
        &self.camera
    }

    /// Pans and zooms the scene. Picking takes the same view into account.
    pub fn set_view(&mut self, view: Mat4) {
        self.camera.set_view(view);
    }

    /// The texture holding the last frame, single-sampled.
    pub fn output_texture(&self) -> Option<TextureHandle> {
        self.output
    }

    pub(super) fn pipeline_targets(&self) -> PipelineTargets {
        PipelineTargets {
            color_format: self.config.color_format,
            depth_format: self.config.depth_format,
            sample_count: self.msaa_sample_count,
        }
    }
}
