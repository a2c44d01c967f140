use std::num::NonZeroUsize;

use crate::color::Color;
use crate::picking::DEFAULT_PICKING_TOLERANCE;
use crate::platform::Format;

/// Settings fixed when a [`Renderer`](super::Renderer) is created.
#[derive(Debug, Clone, PartialEq)]
pub struct RendererConfig {
    /// Requested MSAA sample count. Normalized to 1 or 4.
    pub msaa_samples: u32,
    pub color_format: Format,
    pub depth_format: Option<Format>,
    pub clear_color: Color,
    /// Frames an unused render target survives before it is destroyed.
    pub target_retention_frames: u32,
    /// Idle image textures kept for reuse.
    pub texture_cache_capacity: usize,
    /// Tessellated outlines remembered across rebuilds.
    pub tessellation_cache_size: NonZeroUsize,
    /// Flattening tolerance for curved outlines, shared by tessellation and picking.
    pub tolerance: f32,
    /// Leave objects outside the camera's view out of the batches.
    pub viewport_culling: bool,
}

impl Default for RendererConfig {
    fn default() -> Self {
        Self {
            msaa_samples: 1,
            color_format: Format::U8_RGBA_SRGB,
            depth_format: None,
            clear_color: Color::TRANSPARENT,
            target_retention_frames: 3,
            texture_cache_capacity: 16,
            tessellation_cache_size: NonZeroUsize::new(256).unwrap_or(NonZeroUsize::MIN),
            tolerance: DEFAULT_PICKING_TOLERANCE,
            viewport_culling: true,
        }
    }
}

impl RendererConfig {
    pub fn with_msaa_samples(mut self, samples: u32) -> Self {
        self.msaa_samples = samples;
        self
    }

    pub fn with_color_format(mut self, format: Format) -> Self {
        self.color_format = format;
        self
    }

    pub fn with_depth_format(mut self, format: Format) -> Self {
        self.depth_format = Some(format);
        self
    }

    pub fn with_clear_color(mut self, color: Color) -> Self {
        self.clear_color = color;
        self
    }

    pub fn with_target_retention_frames(mut self, frames: u32) -> Self {
        self.target_retention_frames = frames;
        self
    }

    pub fn with_texture_cache_capacity(mut self, capacity: usize) -> Self {
        self.texture_cache_capacity = capacity;
        self
    }

    pub fn with_tessellation_cache_size(mut self, size: NonZeroUsize) -> Self {
        self.tessellation_cache_size = size;
        self
    }

    pub fn with_tolerance(mut self, tolerance: f32) -> Self {
        self.tolerance = tolerance;
        self
    }

    pub fn with_viewport_culling(mut self, enabled: bool) -> Self {
        self.viewport_culling = enabled;
        self
    }
}

pub(super) fn validate_sample_count_static(requested: u32) -> u32 {
    match requested {
        0 | 1 => 1,
        2..=4 => 4,
        _ => {
            tracing::warn!(
                requested,
                "requested MSAA sample count is not widely supported, clamping to 4"
            );
            4
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sample_counts_snap_to_one_or_four() {
        assert_eq!(validate_sample_count_static(0), 1);
        assert_eq!(validate_sample_count_static(1), 1);
        assert_eq!(validate_sample_count_static(2), 4);
        assert_eq!(validate_sample_count_static(4), 4);
        assert_eq!(validate_sample_count_static(16), 4);
    }

    #[test]
    fn builders_override_defaults() {
        let config = RendererConfig::default()
            .with_msaa_samples(4)
            .with_depth_format(Format::D24_S8)
            .with_clear_color(Color::WHITE);
        assert_eq!(config.msaa_samples, 4);
        assert_eq!(config.depth_format, Some(Format::D24_S8));
        assert_eq!(config.clear_color, Color::WHITE);
        assert_eq!(config.color_format, Format::U8_RGBA_SRGB);
        assert!(config.viewport_culling);
        assert!(!config.with_viewport_culling(false).viewport_culling);
    }
}
