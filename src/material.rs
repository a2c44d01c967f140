use std::collections::BTreeMap;
use std::fmt::Write;

use crate::platform::TextureHandle;

/// A compile-time constant injected into a shader.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DefineValue {
    Bool(bool),
    Int(i32),
    UInt(u32),
}

impl DefineValue {
    fn wgsl(&self) -> (&'static str, String) {
        match self {
            DefineValue::Bool(value) => ("bool", value.to_string()),
            DefineValue::Int(value) => ("i32", value.to_string()),
            DefineValue::UInt(value) => ("u32", format!("{value}u")),
        }
    }
}

/// Defines ordered by name, so equal sets always produce the same preamble.
pub type Defines = BTreeMap<&'static str, DefineValue>;

/// Renders defines as WGSL `const` declarations.
pub fn defines_preamble(defines: &Defines) -> String {
    let mut preamble = String::new();
    for (name, value) in defines {
        let (ty, literal) = value.wgsl();
        let _ = writeln!(preamble, "const {name}: {ty} = {literal};");
    }
    preamble
}

/// Shader variant and shared uniforms of one batch.
///
/// Defines select the program variant and are fixed for the batch's lifetime: objects that
/// would need different defines do not merge. Texture uniforms may change at any time;
/// every change bumps [`Material::version`] so whatever was drawn with the old binding is
/// known to be stale.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Material {
    defines: Defines,
    textures: BTreeMap<&'static str, TextureHandle>,
    version: u64,
}

impl Material {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_define(mut self, name: &'static str, value: DefineValue) -> Self {
        self.defines.insert(name, value);
        self
    }

    pub fn defines(&self) -> &Defines {
        &self.defines
    }

    pub fn define(&self, name: &str) -> Option<DefineValue> {
        self.defines.get(name).copied()
    }

    /// Binds `texture` to the sampler uniform `name`. Returns whether anything changed.
    pub fn set_texture(&mut self, name: &'static str, texture: TextureHandle) -> bool {
        if self.textures.insert(name, texture) == Some(texture) {
            return false;
        }
        self.version += 1;
        true
    }

    pub fn clear_texture(&mut self, name: &str) -> Option<TextureHandle> {
        let removed = self.textures.remove(name);
        if removed.is_some() {
            self.version += 1;
        }
        removed
    }

    pub fn texture(&self, name: &str) -> Option<TextureHandle> {
        self.textures.get(name).copied()
    }

    /// Texture uniforms in binding order.
    pub fn textures(&self) -> impl Iterator<Item = TextureHandle> + '_ {
        self.textures.values().copied()
    }

    pub fn version(&self) -> u64 {
        self.version
    }

    /// `source` with the defines prepended.
    pub fn shader_source(&self, source: &str) -> String {
        let mut full = defines_preamble(&self.defines);
        full.push_str(source);
        full
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::platform::{Device, Format, SoftwareDevice, TextureDescriptor, TextureUsage};

    #[test]
    fn preamble_lists_defines_by_name() {
        let material = Material::new()
            .with_define("USE_ANTIALIAS", DefineValue::Bool(true))
            .with_define("SHAPE_COUNT", DefineValue::UInt(3));
        assert_eq!(
            defines_preamble(material.defines()),
            "const SHAPE_COUNT: u32 = 3u;\nconst USE_ANTIALIAS: bool = true;\n"
        );
    }

    #[test]
    fn texture_changes_bump_the_version() {
        let mut device = SoftwareDevice::default();
        let descriptor = TextureDescriptor::new_2d(Format::U8_RGBA_SRGB, 1, 1, TextureUsage::Sampled);
        let a = device.create_texture(&descriptor).unwrap();
        let b = device.create_texture(&descriptor).unwrap();

        let mut material = Material::new();
        assert!(material.set_texture("u_Map", a));
        assert!(!material.set_texture("u_Map", a));
        assert_eq!(material.version(), 1);
        assert!(material.set_texture("u_Map", b));
        assert_eq!(material.version(), 2);
        assert_eq!(material.texture("u_Map"), Some(b));
    }
}
