use std::num::NonZeroUsize;

use ahash::{HashMap, HashMapExt};
use lru::LruCache;
use tracing::trace;

use crate::platform::{
    Device, DeviceError, Format, SamplerDescriptor, SamplerHandle, TextureDescriptor,
    TextureHandle, TextureUsage,
};
use crate::scene::ImageSource;

#[derive(Debug)]
struct ActiveTexture {
    texture: TextureHandle,
    users: usize,
}

/// Device textures for image sources, keyed by source id.
///
/// A texture stays alive while any image uses it. Once the last user lets go it moves to
/// an LRU of idle textures, so a source that comes back soon does not have to be
/// re-uploaded. Textures pushed out of the LRU are destroyed.
#[derive(Debug)]
pub struct TexturePool {
    active: HashMap<u64, ActiveTexture>,
    idle: LruCache<u64, TextureHandle>,
    sampler: Option<SamplerHandle>,
}

impl TexturePool {
    pub fn new(idle_capacity: usize) -> Self {
        Self {
            active: HashMap::new(),
            idle: LruCache::new(NonZeroUsize::new(idle_capacity).unwrap_or(NonZeroUsize::MIN)),
            sampler: None,
        }
    }

    /// Returns the texture for `source`, uploading it on first use.
    pub fn acquire<D: Device>(
        &mut self,
        device: &mut D,
        source: &ImageSource,
    ) -> Result<TextureHandle, DeviceError> {
        if let Some(active) = self.active.get_mut(&source.id()) {
            active.users += 1;
            return Ok(active.texture);
        }

        let texture = match self.idle.pop(&source.id()) {
            Some(texture) => texture,
            None => {
                let texture = device.create_texture(&TextureDescriptor::new_2d(
                    Format::U8_RGBA_SRGB,
                    source.width(),
                    source.height(),
                    TextureUsage::Sampled,
                ))?;
                if let Err(error) = device.upload_texture_data(texture, source.pixels()) {
                    device.destroy(texture.into());
                    return Err(error);
                }
                device.set_resource_name(texture.into(), &format!("image {}", source.id()));
                trace!(id = source.id(), "image texture uploaded");
                texture
            }
        };
        self.active.insert(source.id(), ActiveTexture { texture, users: 1 });
        Ok(texture)
    }

    /// Drops one use of the texture for `source_id`.
    pub fn release<D: Device>(&mut self, device: &mut D, source_id: u64) {
        let Some(active) = self.active.get_mut(&source_id) else {
            return;
        };
        active.users -= 1;
        if active.users > 0 {
            return;
        }
        let texture = active.texture;
        self.active.remove(&source_id);
        if let Some((evicted_id, evicted)) = self.idle.push(source_id, texture) {
            if evicted_id != source_id || evicted != texture {
                trace!(id = evicted_id, "idle image texture evicted");
                device.destroy(evicted.into());
            }
        }
    }

    pub fn get(&self, source_id: u64) -> Option<TextureHandle> {
        self.active.get(&source_id).map(|active| active.texture)
    }

    /// The sampler every image shares.
    pub fn sampler<D: Device>(&mut self, device: &mut D) -> Result<SamplerHandle, DeviceError> {
        if let Some(sampler) = self.sampler {
            return Ok(sampler);
        }
        let sampler = device.create_sampler(&SamplerDescriptor::default())?;
        self.sampler = Some(sampler);
        Ok(sampler)
    }

    pub fn active_count(&self) -> usize {
        self.active.len()
    }

    pub fn idle_count(&self) -> usize {
        self.idle.len()
    }

    pub fn destroy_all<D: Device>(&mut self, device: &mut D) {
        for (_, active) in self.active.drain() {
            device.destroy(active.texture.into());
        }
        while let Some((_, texture)) = self.idle.pop_lru() {
            device.destroy(texture.into());
        }
        if let Some(sampler) = self.sampler.take() {
            device.destroy(sampler.into());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::platform::SoftwareDevice;

    fn source(id: u64) -> ImageSource {
        ImageSource::new(id, 2, 2, vec![255u8; 16])
    }

    #[test]
    fn shared_sources_upload_once() {
        let mut device = SoftwareDevice::default();
        let mut pool = TexturePool::new(4);
        let a = pool.acquire(&mut device, &source(1)).unwrap();
        let b = pool.acquire(&mut device, &source(1)).unwrap();
        assert_eq!(a, b);
        assert_eq!(device.live_resource_count(), 1);
    }

    #[test]
    fn released_textures_are_reused_from_the_idle_cache() {
        let mut device = SoftwareDevice::default();
        let mut pool = TexturePool::new(4);
        let first = pool.acquire(&mut device, &source(1)).unwrap();
        pool.release(&mut device, 1);
        assert_eq!(pool.idle_count(), 1);

        let again = pool.acquire(&mut device, &source(1)).unwrap();
        assert_eq!(first, again);
        assert_eq!(pool.idle_count(), 0);
    }

    #[test]
    fn idle_overflow_destroys_the_least_recent_texture() {
        let mut device = SoftwareDevice::default();
        let mut pool = TexturePool::new(1);
        let first = pool.acquire(&mut device, &source(1)).unwrap();
        pool.acquire(&mut device, &source(2)).unwrap();
        pool.release(&mut device, 1);
        pool.release(&mut device, 2);

        assert_eq!(pool.idle_count(), 1);
        assert!(device.texture_contents(first).is_none());
    }
}
