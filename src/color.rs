use crate::util::normalize_rgba_color;

/// An 8-bit RGBA color, straight (not premultiplied) alpha.
///
/// Fill and stroke paints of display objects use this type. Instance records carry the
/// normalized form, see [`Color::normalize`].
///
/// # Examples
///
/// ```
/// use tessera::Color;
///
/// let red = Color::rgb(255, 0, 0);
/// assert_eq!(red.normalize(), [1.0, 0.0, 0.0, 1.0]);
///
/// let semi_blue = Color::rgba(0, 0, 255, 128);
/// assert!(semi_blue.is_visible());
/// assert!(!Color::TRANSPARENT.is_visible());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Color(pub [u8; 4]);

impl Color {
    /// All channels zero.
    pub const TRANSPARENT: Self = Self([0, 0, 0, 0]);
    pub const BLACK: Self = Self([0, 0, 0, 255]);
    pub const WHITE: Self = Self([255, 255, 255, 255]);

    /// Creates a fully opaque color.
    pub fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self([r, g, b, 255])
    }

    pub fn rgba(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self([r, g, b, a])
    }

    /// Channels mapped to `[0.0, 1.0]`.
    pub fn normalize(&self) -> [f32; 4] {
        normalize_rgba_color(&self.0)
    }

    pub fn to_array(&self) -> [u8; 4] {
        self.0
    }

    /// Whether painting with this color leaves a mark.
    pub fn is_visible(&self) -> bool {
        self.0[3] > 0
    }
}
