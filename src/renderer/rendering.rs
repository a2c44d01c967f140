use std::time::Instant;

use super::*;
use crate::platform::{
    BufferDescriptor, BufferFrequencyHint, BufferUsage, DepthStencilAttachment, DrawCall,
    LoadOp, RenderPassDescriptor, RenderTargetDescription, RenderTargetHandle,
};

/// Attachments of one frame.
struct FrameTargets {
    color: RenderTargetHandle,
    resolve_to: Option<TextureHandle>,
    depth: Option<RenderTargetHandle>,
    output: Option<TextureHandle>,
}

impl<D: Device> Renderer<D> {
    /// Applies pending scene edits and draws the scene into a fresh output texture.
    pub fn render(&mut self) -> Result<FrameStats, RenderError> {
        let started = Instant::now();
        let (width, height) = self.viewport;
        if width == 0 || height == 0 {
            return Err(RenderError::EmptyViewport { width, height });
        }

        let mut stats = FrameStats {
            frame: self.frame_index + 1,
            events: self.flush_events(),
            ..FrameStats::default()
        };
        self.refresh_order();
        let resort = std::mem::take(&mut self.resort_batches);
        let culled = self.culling.update(
            &self.objects,
            self.picker.index(),
            self.camera.visible_world_bounds(),
        );
        let prepared = self.batches.prepare(
            &mut self.device,
            &self.objects,
            &self.order,
            &self.culling,
            resort || culled,
            &mut self.textures,
            &mut self.tessellation,
        )?;
        stats.record_prepare(prepared);

        let uniforms = self.upload_scene_uniforms()?;
        let draws = self.collect_draws(uniforms)?;
        let frame = self.acquire_frame_targets()?;

        let pass = RenderPassDescriptor {
            label: Some("tessera scene"),
            color: frame.color,
            color_load: LoadOp::Clear(self.config.clear_color.normalize()),
            resolve_to: frame.resolve_to,
            depth_stencil: frame.depth.map(|target| DepthStencilAttachment {
                target,
                depth_load: LoadOp::Clear(1.0),
            }),
        };
        let submitted = self.device.submit_pass(&pass, &draws);
        self.targets.end_frame();
        submitted?;

        self.output = frame.output;
        let retention = self.config.target_retention_frames.max(1);
        stats.evicted_targets = self
            .targets
            .destroy_where(&mut self.device, |target| target.age() > retention);

        self.frame_index += 1;
        stats.batches = self.batches.len();
        stats.culled = self.objects.len().saturating_sub(self.culling.visible_count());
        stats.draw_calls = draws.len();
        stats.instances = draws.iter().map(|draw| draw.instance_count as u64).sum();
        stats.cpu_time = started.elapsed();
        trace!(?stats, "frame rendered");
        self.last_frame = stats;
        Ok(stats)
    }

    /// Stats of the last successful frame.
    pub fn last_frame(&self) -> FrameStats {
        self.last_frame
    }

    fn upload_scene_uniforms(&mut self) -> Result<BufferHandle, RenderError> {
        let buffer = match self.scene_uniforms {
            Some(buffer) => buffer,
            None => {
                let buffer = self.device.create_buffer(&BufferDescriptor {
                    byte_size: std::mem::size_of::<SceneUniforms>() as u64,
                    usage: BufferUsage::Uniform,
                    hint: BufferFrequencyHint::Dynamic,
                })?;
                self.device
                    .set_resource_name(buffer.into(), "tessera scene uniforms");
                self.scene_uniforms = Some(buffer);
                buffer
            }
        };
        let uniforms = SceneUniforms::new(&self.camera);
        self.device
            .upload_buffer_data(buffer, 0, bytemuck::bytes_of(&uniforms))?;
        Ok(buffer)
    }

    /// One draw per batch with something to draw, back to front.
    fn collect_draws(&mut self, uniforms: BufferHandle) -> Result<Vec<DrawCall>, RenderError> {
        let targets = self.pipeline_targets();
        let mut draws = Vec::with_capacity(self.batches.len());
        for id in self.batches.ordered(&self.order) {
            let Some(batch) = self.batches.batch(id) else {
                continue;
            };
            let geometry = batch.geometry();
            if geometry.index_count() == 0 || geometry.instance_count() == 0 {
                trace!(kind = batch.kind().label(), "skipping batch without triangles");
                continue;
            }
            let pipeline = self.pipelines.get_or_create(
                &mut self.device,
                batch.kind(),
                batch.material(),
                geometry.layouts(),
                targets,
            )?;
            let sampler = if batch.kind().bindings().num_samplers > 0 {
                Some(self.textures.sampler(&mut self.device)?)
            } else {
                None
            };
            match batch.draw_call(pipeline, uniforms, sampler) {
                Some(draw) => draws.push(draw),
                None => trace!(kind = batch.kind().label(), "batch has nothing bound to draw"),
            }
        }
        Ok(draws)
    }

    fn acquire_frame_targets(&mut self) -> Result<FrameTargets, RenderError> {
        let (width, height) = self.viewport;
        let samples = self.msaa_sample_count;
        let color = self.targets.acquire(
            &mut self.device,
            &RenderTargetDescription::new(self.config.color_format, width, height, samples),
            "tessera color",
        )?;

        let (resolve_to, output) = if samples > 1 {
            let resolve = self.targets.acquire(
                &mut self.device,
                &RenderTargetDescription::new(self.config.color_format, width, height, 1),
                "tessera resolve",
            )?;
            (resolve.texture, resolve.texture)
        } else {
            (None, color.texture)
        };

        let depth = match self.config.depth_format {
            Some(format) => {
                let depth = self.targets.acquire(
                    &mut self.device,
                    &RenderTargetDescription::new(format, width, height, samples),
                    "tessera depth",
                )?;
                Some(depth.attachment)
            }
            None => None,
        };

        Ok(FrameTargets {
            color: color.attachment,
            resolve_to,
            depth,
            output,
        })
    }
}
