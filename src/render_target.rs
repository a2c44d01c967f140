use thiserror::Error;
use tracing::debug;

use crate::error::RenderError;
use crate::platform::{
    Device, RenderTargetDescription, RenderTargetHandle, ResourceCreationError,
    TextureDescriptor, TextureHandle, TextureUsage,
};

/// `reset` was asked to repurpose a target for a description it was not created with.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("pooled render target {pooled:?} cannot serve {requested:?}")]
pub struct DescriptionMismatchError {
    pub pooled: RenderTargetDescription,
    pub requested: RenderTargetDescription,
}

/// A render target owned by the pool.
///
/// Single-sample targets are backed by a texture (sampleable after the pass), multisampled
/// ones by a dedicated attachment without an addressable texture.
#[derive(Debug)]
pub struct PooledRenderTarget {
    description: RenderTargetDescription,
    texture: Option<TextureHandle>,
    attachment: RenderTargetHandle,
    age: u32,
    needs_clear: bool,
    in_use: bool,
}

impl PooledRenderTarget {
    pub fn new<D: Device>(
        device: &mut D,
        description: RenderTargetDescription,
        debug_name: &str,
    ) -> Result<Self, ResourceCreationError> {
        let (texture, attachment) = if description.sample_count > 1 {
            let attachment = device.create_render_target(&description)?;
            (None, attachment)
        } else {
            let texture = device.create_texture(&TextureDescriptor::new_2d(
                description.pixel_format,
                description.width,
                description.height,
                TextureUsage::RenderTarget,
            ))?;
            device.set_resource_name(texture.into(), debug_name);
            let attachment = match device.create_render_target_from_texture(texture) {
                Ok(attachment) => attachment,
                Err(error) => {
                    device.destroy(texture.into());
                    return Err(error);
                }
            };
            (Some(texture), attachment)
        };
        device.set_resource_name(attachment.into(), debug_name);

        Ok(Self {
            description,
            texture,
            attachment,
            age: 0,
            needs_clear: true,
            in_use: false,
        })
    }

    pub fn matches_description(&self, description: &RenderTargetDescription) -> bool {
        self.description == *description
    }

    /// Prepares the target for another use: age back to zero and a clear on next bind.
    pub fn reset(
        &mut self,
        description: &RenderTargetDescription,
    ) -> Result<(), DescriptionMismatchError> {
        if !self.matches_description(description) {
            return Err(DescriptionMismatchError {
                pooled: self.description,
                requested: *description,
            });
        }
        self.age = 0;
        self.needs_clear = true;
        Ok(())
    }

    pub fn destroy<D: Device>(self, device: &mut D) {
        device.destroy(self.attachment.into());
        if let Some(texture) = self.texture {
            device.destroy(texture.into());
        }
    }

    pub fn description(&self) -> RenderTargetDescription {
        self.description
    }

    /// Sampleable texture behind a single-sample target.
    pub fn texture(&self) -> Option<TextureHandle> {
        self.texture
    }

    pub fn attachment(&self) -> RenderTargetHandle {
        self.attachment
    }

    /// Frames since the target was last handed out.
    pub fn age(&self) -> u32 {
        self.age
    }

    pub fn needs_clear(&self) -> bool {
        self.needs_clear
    }

    /// Reads the clear flag and lowers it; the caller is about to clear.
    pub fn take_needs_clear(&mut self) -> bool {
        std::mem::take(&mut self.needs_clear)
    }
}

/// What [`RenderTargetPool::acquire`] hands out for the current frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AcquiredTarget {
    pub attachment: RenderTargetHandle,
    pub texture: Option<TextureHandle>,
    pub needs_clear: bool,
}

/// Reuses render targets across frames by exact description match.
///
/// The pool never evicts on its own; callers decide with [`RenderTargetPool::destroy_where`].
#[derive(Debug, Default)]
pub struct RenderTargetPool {
    targets: Vec<PooledRenderTarget>,
}

impl RenderTargetPool {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a matching target not yet used this frame, or creates one.
    ///
    /// Fails with [`RenderError::ResourceCreation`] when a new target cannot be created.
    pub fn acquire<D: Device>(
        &mut self,
        device: &mut D,
        description: &RenderTargetDescription,
        debug_name: &str,
    ) -> Result<AcquiredTarget, RenderError> {
        let found = self
            .targets
            .iter()
            .position(|target| !target.in_use && target.matches_description(description));

        let index = match found {
            Some(index) => {
                self.targets[index].reset(description)?;
                index
            }
            None => {
                debug!(?description, "allocating render target");
                self.targets
                    .push(PooledRenderTarget::new(device, *description, debug_name)?);
                self.targets.len() - 1
            }
        };

        let target = &mut self.targets[index];
        target.in_use = true;
        Ok(AcquiredTarget {
            attachment: target.attachment,
            texture: target.texture,
            needs_clear: target.take_needs_clear(),
        })
    }

    /// Ages every target by one frame and releases this frame's claims.
    pub fn end_frame(&mut self) {
        for target in &mut self.targets {
            target.age = target.age.saturating_add(1);
            target.in_use = false;
        }
    }

    /// Destroys the targets selected by `predicate` and returns how many were removed.
    pub fn destroy_where<D: Device>(
        &mut self,
        device: &mut D,
        mut predicate: impl FnMut(&PooledRenderTarget) -> bool,
    ) -> usize {
        let mut removed = 0;
        let mut index = 0;
        while index < self.targets.len() {
            if predicate(&self.targets[index]) {
                let target = self.targets.swap_remove(index);
                debug!(description = ?target.description, age = target.age, "evicting render target");
                target.destroy(device);
                removed += 1;
            } else {
                index += 1;
            }
        }
        removed
    }

    pub fn destroy_all<D: Device>(&mut self, device: &mut D) {
        for target in self.targets.drain(..) {
            target.destroy(device);
        }
    }

    pub fn get(&self, attachment: RenderTargetHandle) -> Option<&PooledRenderTarget> {
        self.targets
            .iter()
            .find(|target| target.attachment == attachment)
    }

    pub fn iter(&self) -> impl Iterator<Item = &PooledRenderTarget> {
        self.targets.iter()
    }

    pub fn len(&self) -> usize {
        self.targets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.targets.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::RenderError;
use crate::platform::{Format, SoftwareDevice};

    fn color(width: u32, height: u32) -> RenderTargetDescription {
        RenderTargetDescription::new(Format::U8_RGBA_NORM, width, height, 1)
    }

    #[test]
    fn reset_rejects_a_different_description() {
        let mut device = SoftwareDevice::default();
        let mut target = PooledRenderTarget::new(&mut device, color(8, 8), "test").unwrap();
        let error = target.reset(&color(16, 8)).unwrap_err();
        assert_eq!(error.pooled, color(8, 8));
        assert_eq!(error.requested, color(16, 8));
    }

    #[test]
    fn multisampled_targets_have_no_texture() {
        let mut device = SoftwareDevice::default();
        let description = RenderTargetDescription::new(Format::U8_RGBA_NORM, 8, 8, 4);
        let target = PooledRenderTarget::new(&mut device, description, "msaa").unwrap();
        assert!(target.texture().is_none());
        let single = PooledRenderTarget::new(&mut device, color(8, 8), "resolve").unwrap();
        assert!(single.texture().is_some());
    }

    #[test]
    fn same_frame_requests_get_distinct_targets() {
        let mut device = SoftwareDevice::default();
        let mut pool = RenderTargetPool::new();
        let first = pool.acquire(&mut device, &color(8, 8), "a").unwrap();
        let second = pool.acquire(&mut device, &color(8, 8), "b").unwrap();
        assert_ne!(first.attachment, second.attachment);
        assert_eq!(pool.len(), 2);
    }

    #[test]
    fn reuse_resets_age_and_requests_a_clear() {
        let mut device = SoftwareDevice::default();
        let mut pool = RenderTargetPool::new();
        let first = pool.acquire(&mut device, &color(8, 8), "frame").unwrap();
        pool.end_frame();
        pool.end_frame();
        assert_eq!(pool.get(first.attachment).unwrap().age(), 2);

        let again = pool.acquire(&mut device, &color(8, 8), "frame").unwrap();
        assert_eq!(again.attachment, first.attachment);
        assert!(again.needs_clear);
        assert_eq!(pool.get(first.attachment).unwrap().age(), 0);
    }

    #[test]
    fn destroy_where_only_removes_selected_targets() {
        let mut device = SoftwareDevice::default();
        let mut pool = RenderTargetPool::new();
        let stale = pool.acquire(&mut device, &color(8, 8), "stale").unwrap();
        pool.end_frame();
        let fresh = pool.acquire(&mut device, &color(4, 4), "fresh").unwrap();
        pool.end_frame();

        let removed = pool.destroy_where(&mut device, |target| target.age() > 1);
        assert_eq!(removed, 1);
        assert!(pool.get(stale.attachment).is_none());
        assert!(pool.get(fresh.attachment).is_some());
        assert_eq!(device.live_resource_count(), 2);
    }
}
