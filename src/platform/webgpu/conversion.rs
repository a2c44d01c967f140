use crate::platform::format::Format;
use crate::platform::interfaces::{
    AddressMode, BlendMode, BufferUsage, FilterMode, PrimitiveTopology, VertexBufferFrequency,
};

pub(super) fn texture_format(format: Format) -> Option<wgpu::TextureFormat> {
    Some(match format {
        Format::F32_R => wgpu::TextureFormat::R32Float,
        Format::F32_RG => wgpu::TextureFormat::Rg32Float,
        Format::F32_RGB => return None,
        Format::F32_RGBA => wgpu::TextureFormat::Rgba32Float,
        Format::U8_RGBA_NORM => wgpu::TextureFormat::Rgba8Unorm,
        Format::U8_RGBA_SRGB => wgpu::TextureFormat::Rgba8UnormSrgb,
        Format::BGRA8_UNORM_SRGB => wgpu::TextureFormat::Bgra8UnormSrgb,
        Format::F16_RGBA => wgpu::TextureFormat::Rgba16Float,
        Format::U16_R => wgpu::TextureFormat::R16Uint,
        Format::U32_R => wgpu::TextureFormat::R32Uint,
        Format::D24_S8 => wgpu::TextureFormat::Depth24PlusStencil8,
        Format::D32F => wgpu::TextureFormat::Depth32Float,
    })
}

pub(super) fn vertex_format(format: Format) -> Option<wgpu::VertexFormat> {
    Some(match format {
        Format::F32_R => wgpu::VertexFormat::Float32,
        Format::F32_RG => wgpu::VertexFormat::Float32x2,
        Format::F32_RGB => wgpu::VertexFormat::Float32x3,
        Format::F32_RGBA => wgpu::VertexFormat::Float32x4,
        Format::U8_RGBA_NORM => wgpu::VertexFormat::Unorm8x4,
        Format::U32_R => wgpu::VertexFormat::Uint32,
        _ => return None,
    })
}

pub(super) fn buffer_usages(usage: BufferUsage) -> wgpu::BufferUsages {
    let base = wgpu::BufferUsages::COPY_DST | wgpu::BufferUsages::COPY_SRC;
    match usage {
        BufferUsage::Vertex => base | wgpu::BufferUsages::VERTEX,
        BufferUsage::Index => base | wgpu::BufferUsages::INDEX,
        BufferUsage::Uniform => base | wgpu::BufferUsages::UNIFORM,
    }
}

pub(super) fn address_mode(mode: AddressMode) -> wgpu::AddressMode {
    match mode {
        AddressMode::ClampToEdge => wgpu::AddressMode::ClampToEdge,
        AddressMode::Repeat => wgpu::AddressMode::Repeat,
        AddressMode::MirrorRepeat => wgpu::AddressMode::MirrorRepeat,
    }
}

pub(super) fn filter_mode(mode: FilterMode) -> wgpu::FilterMode {
    match mode {
        FilterMode::Nearest => wgpu::FilterMode::Nearest,
        FilterMode::Linear => wgpu::FilterMode::Linear,
    }
}

pub(super) fn blend_state(mode: BlendMode) -> wgpu::BlendState {
    match mode {
        BlendMode::Replace => wgpu::BlendState::REPLACE,
        BlendMode::Alpha => wgpu::BlendState::ALPHA_BLENDING,
        BlendMode::PremultipliedAlpha => wgpu::BlendState::PREMULTIPLIED_ALPHA_BLENDING,
    }
}

pub(super) fn topology(topology: PrimitiveTopology) -> wgpu::PrimitiveTopology {
    match topology {
        PrimitiveTopology::TriangleList => wgpu::PrimitiveTopology::TriangleList,
        PrimitiveTopology::TriangleStrip => wgpu::PrimitiveTopology::TriangleStrip,
        PrimitiveTopology::LineList => wgpu::PrimitiveTopology::LineList,
    }
}

pub(super) fn step_mode(frequency: VertexBufferFrequency) -> wgpu::VertexStepMode {
    match frequency {
        VertexBufferFrequency::PerVertex => wgpu::VertexStepMode::Vertex,
        VertexBufferFrequency::PerInstance => wgpu::VertexStepMode::Instance,
    }
}

pub(super) fn clear_color(color: [f32; 4]) -> wgpu::Color {
    wgpu::Color {
        r: color[0] as f64,
        g: color[1] as f64,
        b: color[2] as f64,
        a: color[3] as f64,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn three_component_float_has_no_texel_layout() {
        assert!(texture_format(Format::F32_RGB).is_none());
        assert_eq!(
            vertex_format(Format::F32_RGB),
            Some(wgpu::VertexFormat::Float32x3)
        );
    }

    #[test]
    fn depth_formats_map_to_depth_textures() {
        let format = texture_format(Format::D24_S8).unwrap();
        assert!(format.has_depth_aspect());
        assert!(format.has_stencil_aspect());
    }
}
