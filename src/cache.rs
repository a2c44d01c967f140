use crate::mesh::FillMeshVertex;
use lru::LruCache;
use lyon::tessellation::VertexBuffers;
use std::num::NonZeroUsize;
use std::sync::Arc;

pub(crate) type OutlineBuffers = Arc<VertexBuffers<FillMeshVertex, u32>>;

/// Recently tessellated outlines, keyed by a hash of everything the triangles depend on.
///
/// Entries are shared, so a hit hands out the same buffers to every fill mesh using the
/// outline.
pub(crate) struct OutlineCache {
    outlines: LruCache<u64, OutlineBuffers>,
    hits: u64,
    misses: u64,
}

impl OutlineCache {
    pub(crate) fn new(capacity: NonZeroUsize) -> Self {
        Self {
            outlines: LruCache::new(capacity),
            hits: 0,
            misses: 0,
        }
    }

    pub fn len(&self) -> usize {
        self.outlines.len()
    }

    /// Lookups answered from the cache and lookups that had to tessellate.
    pub fn hit_rate(&self) -> (u64, u64) {
        (self.hits, self.misses)
    }

    /// Returns the cached outline for `key`, or tessellates it with `tessellate` and keeps
    /// the result. Failed tessellations are not cached.
    pub(crate) fn get_or_tessellate<E>(
        &mut self,
        key: u64,
        tessellate: impl FnOnce() -> Result<VertexBuffers<FillMeshVertex, u32>, E>,
    ) -> Result<OutlineBuffers, E> {
        if let Some(buffers) = self.outlines.get(&key) {
            self.hits += 1;
            return Ok(Arc::clone(buffers));
        }
        self.misses += 1;
        let buffers = Arc::new(tessellate()?);
        self.outlines.put(key, Arc::clone(&buffers));
        Ok(buffers)
    }
}
