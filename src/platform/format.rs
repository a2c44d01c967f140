/// Pixel and vertex attribute formats understood by every backend.
///
/// The same enum describes texel layouts and vertex attribute layouts, the way the
/// upper layers describe both with one vocabulary. A backend rejects the formats it cannot
/// express with a `ResourceCreationError` instead of silently substituting another one.
#[allow(non_camel_case_types)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Format {
    F32_R,
    F32_RG,
    F32_RGB,
    F32_RGBA,
    U8_RGBA_NORM,
    U8_RGBA_SRGB,
    BGRA8_UNORM_SRGB,
    F16_RGBA,
    U16_R,
    U32_R,
    D24_S8,
    D32F,
}

impl Format {
    /// Size of one texel or one vertex attribute in bytes.
    pub fn byte_size(self) -> u32 {
        match self {
            Format::F32_R => 4,
            Format::F32_RG => 8,
            Format::F32_RGB => 12,
            Format::F32_RGBA => 16,
            Format::U8_RGBA_NORM | Format::U8_RGBA_SRGB | Format::BGRA8_UNORM_SRGB => 4,
            Format::F16_RGBA => 8,
            Format::U16_R => 2,
            Format::U32_R => 4,
            Format::D24_S8 | Format::D32F => 4,
        }
    }

    pub fn component_count(self) -> u32 {
        match self {
            Format::F32_R | Format::U16_R | Format::U32_R | Format::D32F => 1,
            Format::F32_RG | Format::D24_S8 => 2,
            Format::F32_RGB => 3,
            Format::F32_RGBA
            | Format::U8_RGBA_NORM
            | Format::U8_RGBA_SRGB
            | Format::BGRA8_UNORM_SRGB
            | Format::F16_RGBA => 4,
        }
    }

    pub fn is_depth(self) -> bool {
        matches!(self, Format::D24_S8 | Format::D32F)
    }

    pub fn has_stencil(self) -> bool {
        matches!(self, Format::D24_S8)
    }

    /// Whether the format can be bound as a color attachment.
    pub fn is_color_renderable(self) -> bool {
        matches!(
            self,
            Format::U8_RGBA_NORM
                | Format::U8_RGBA_SRGB
                | Format::BGRA8_UNORM_SRGB
                | Format::F16_RGBA
                | Format::F32_RGBA
        )
    }

    /// Whether the format can describe a vertex attribute.
    pub fn is_vertex_format(self) -> bool {
        matches!(
            self,
            Format::F32_R
                | Format::F32_RG
                | Format::F32_RGB
                | Format::F32_RGBA
                | Format::U8_RGBA_NORM
                | Format::U32_R
        )
    }
}

#[cfg(test)]
mod tests {
    use super::Format;

    #[test]
    fn byte_size_matches_component_layout() {
        assert_eq!(Format::F32_RGB.byte_size(), 12);
        assert_eq!(Format::F32_RG.byte_size(), 8);
        assert_eq!(Format::U8_RGBA_NORM.byte_size(), 4);
    }

    #[test]
    fn depth_formats_are_not_color_renderable() {
        assert!(Format::D24_S8.is_depth());
        assert!(Format::D24_S8.has_stencil());
        assert!(!Format::D32F.has_stencil());
        assert!(!Format::D32F.is_color_renderable());
    }

    #[test]
    fn srgb_targets_cannot_feed_vertex_attributes() {
        assert!(!Format::U8_RGBA_SRGB.is_vertex_format());
        assert!(Format::F32_RGBA.is_vertex_format());
    }
}
