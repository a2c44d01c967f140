use std::time::Duration;

use crate::batch::PrepareStats;

/// What a single [`Renderer::render`](super::Renderer::render) call did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FrameStats {
    /// Index of the frame, starting at 1.
    pub frame: u64,
    /// Scene events applied at the start of the frame.
    pub events: usize,
    pub batches: usize,
    pub draw_calls: usize,
    pub instances: u64,
    /// Scene objects left out of the frame, hidden or outside the view.
    pub culled: usize,
    /// Batches whose geometry was built from scratch.
    pub rebuilt_batches: usize,
    /// Batches that uploaded changed bytes, including rebuilt ones.
    pub uploaded_batches: usize,
    pub destroyed_batches: usize,
    pub evicted_targets: usize,
    /// Wall-clock time spent on the CPU side of the frame.
    pub cpu_time: Duration,
}

impl FrameStats {
    pub(super) fn record_prepare(&mut self, prepared: PrepareStats) {
        self.rebuilt_batches = prepared.rebuilt;
        self.uploaded_batches = prepared.uploaded;
        self.destroyed_batches = prepared.destroyed;
    }

    /// Batches that only received incremental updates.
    pub fn patched_batches(&self) -> usize {
        self.uploaded_batches.saturating_sub(self.rebuilt_batches)
    }
}
