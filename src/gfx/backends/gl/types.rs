//! Mappings from the device's descriptor enums onto their OpenGL values.

use gl;
use gl::types::*;

use crate::gfx::assets::prelude::*;
use crate::gfx::errors::{Error, Result};

impl From<BufferUsage> for GLenum {
    fn from(usage: BufferUsage) -> Self {
        match usage {
            BufferUsage::Default => gl::STATIC_DRAW,
            BufferUsage::Dynamic => gl::DYNAMIC_DRAW,
            BufferUsage::Stream => gl::STREAM_DRAW,
        }
    }
}

impl From<Comparison> for GLenum {
    fn from(cmp: Comparison) -> Self {
        match cmp {
            Comparison::Never => gl::NEVER,
            Comparison::Less => gl::LESS,
            Comparison::LessOrEqual => gl::LEQUAL,
            Comparison::Greater => gl::GREATER,
            Comparison::GreaterOrEqual => gl::GEQUAL,
            Comparison::Equal => gl::EQUAL,
            Comparison::NotEqual => gl::NOTEQUAL,
            Comparison::Always => gl::ALWAYS,
        }
    }
}

impl From<Equation> for GLenum {
    fn from(eq: Equation) -> Self {
        match eq {
            Equation::Add => gl::FUNC_ADD,
            Equation::Subtract => gl::FUNC_SUBTRACT,
            Equation::ReverseSubtract => gl::FUNC_REVERSE_SUBTRACT,
        }
    }
}

impl From<BlendFactor> for GLenum {
    fn from(factor: BlendFactor) -> Self {
        match factor {
            BlendFactor::Zero => gl::ZERO,
            BlendFactor::One => gl::ONE,
            BlendFactor::Value(BlendValue::SourceColor) => gl::SRC_COLOR,
            BlendFactor::Value(BlendValue::SourceAlpha) => gl::SRC_ALPHA,
            BlendFactor::Value(BlendValue::DestinationColor) => gl::DST_COLOR,
            BlendFactor::Value(BlendValue::DestinationAlpha) => gl::DST_ALPHA,
            BlendFactor::OneMinusValue(BlendValue::SourceColor) => gl::ONE_MINUS_SRC_COLOR,
            BlendFactor::OneMinusValue(BlendValue::SourceAlpha) => gl::ONE_MINUS_SRC_ALPHA,
            BlendFactor::OneMinusValue(BlendValue::DestinationColor) => gl::ONE_MINUS_DST_COLOR,
            BlendFactor::OneMinusValue(BlendValue::DestinationAlpha) => gl::ONE_MINUS_DST_ALPHA,
        }
    }
}

impl From<VertexFormat> for GLenum {
    fn from(format: VertexFormat) -> Self {
        match format {
            VertexFormat::Byte => gl::BYTE,
            VertexFormat::UByte => gl::UNSIGNED_BYTE,
            VertexFormat::Short => gl::SHORT,
            VertexFormat::UShort => gl::UNSIGNED_SHORT,
            VertexFormat::Float => gl::FLOAT,
        }
    }
}

impl From<Primitive> for GLenum {
    fn from(primitive: Primitive) -> Self {
        match primitive {
            Primitive::Points => gl::POINTS,
            Primitive::Lines => gl::LINES,
            Primitive::LineStrip => gl::LINE_STRIP,
            Primitive::Triangles => gl::TRIANGLES,
            Primitive::TriangleStrip => gl::TRIANGLE_STRIP,
        }
    }
}

impl From<IndexFormat> for GLenum {
    fn from(format: IndexFormat) -> Self {
        match format {
            IndexFormat::U16 => gl::UNSIGNED_SHORT,
            IndexFormat::U32 => gl::UNSIGNED_INT,
        }
    }
}

impl From<SamplerAddress> for GLenum {
    fn from(address: SamplerAddress) -> Self {
        match address {
            SamplerAddress::Repeat => gl::REPEAT,
            SamplerAddress::Mirror => gl::MIRRORED_REPEAT,
            SamplerAddress::Clamp => gl::CLAMP_TO_EDGE,
            SamplerAddress::Border => gl::CLAMP_TO_BORDER,
        }
    }
}

impl From<SamplerFilter> for GLenum {
    fn from(filter: SamplerFilter) -> Self {
        match filter {
            SamplerFilter::Nearest => gl::NEAREST,
            SamplerFilter::Linear => gl::LINEAR,
            SamplerFilter::NearestMipNearest => gl::NEAREST_MIPMAP_NEAREST,
            SamplerFilter::NearestMipLinear => gl::NEAREST_MIPMAP_LINEAR,
            SamplerFilter::LinearMipNearest => gl::LINEAR_MIPMAP_NEAREST,
            SamplerFilter::LinearMipLinear => gl::LINEAR_MIPMAP_LINEAR,
        }
    }
}

/// The native object type of a shader stage. Hull and domain stages have no
/// mapping here, they need tessellation support this backend does not carry.
pub fn shader_stage(stage: ShaderStage) -> Result<GLenum> {
    match stage {
        ShaderStage::Vertex => Ok(gl::VERTEX_SHADER),
        ShaderStage::Pixel => Ok(gl::FRAGMENT_SHADER),
        ShaderStage::Geometry => Ok(gl::GEOMETRY_SHADER),
        ShaderStage::Hull => Err(Error::UnsupportedEnum("ShaderStage::Hull", "OpenGL")),
        ShaderStage::Domain => Err(Error::UnsupportedEnum("ShaderStage::Domain", "OpenGL")),
    }
}

/// The access bits handed to `glMapBufferRange` for a transient mapping.
pub fn map_access(access: MapAccess) -> GLbitfield {
    match access {
        MapAccess::WriteDiscardAll => gl::MAP_WRITE_BIT | gl::MAP_INVALIDATE_BUFFER_BIT,
        MapAccess::WriteDiscardRange => gl::MAP_WRITE_BIT | gl::MAP_INVALIDATE_RANGE_BIT,
        MapAccess::WriteUnsynchronized => gl::MAP_WRITE_BIT | gl::MAP_UNSYNCHRONIZED_BIT,
        MapAccess::ReadOnly => gl::MAP_READ_BIT,
    }
}

/// (internal format, format, pixel type) of a texture. `srgb` selects
/// gamma-corrected storage for the 8-bits color formats and is ignored
/// elsewhere.
pub fn texture_format(format: TextureFormat, srgb: bool) -> (GLenum, GLenum, GLenum) {
    match format {
        TextureFormat::R8 => (gl::R8, gl::RED, gl::UNSIGNED_BYTE),
        TextureFormat::Rg8 => (gl::RG8, gl::RG, gl::UNSIGNED_BYTE),
        TextureFormat::Rgb8 => {
            let internal = if srgb { gl::SRGB8 } else { gl::RGB8 };
            (internal, gl::RGB, gl::UNSIGNED_BYTE)
        }
        TextureFormat::Rgba8 => {
            let internal = if srgb { gl::SRGB8_ALPHA8 } else { gl::RGBA8 };
            (internal, gl::RGBA, gl::UNSIGNED_BYTE)
        }
        TextureFormat::Rgba4 => (gl::RGBA4, gl::RGBA, gl::UNSIGNED_SHORT_4_4_4_4),
        TextureFormat::R16f => (gl::R16F, gl::RED, gl::HALF_FLOAT),
        TextureFormat::Rgba16f => (gl::RGBA16F, gl::RGBA, gl::HALF_FLOAT),
        TextureFormat::R32f => (gl::R32F, gl::RED, gl::FLOAT),
        TextureFormat::Rgba32f => (gl::RGBA32F, gl::RGBA, gl::FLOAT),
        TextureFormat::Depth16 => (gl::DEPTH_COMPONENT16, gl::DEPTH_COMPONENT, gl::FLOAT),
        TextureFormat::Depth24 => (gl::DEPTH_COMPONENT24, gl::DEPTH_COMPONENT, gl::FLOAT),
        TextureFormat::Depth32 => (gl::DEPTH_COMPONENT32, gl::DEPTH_COMPONENT, gl::FLOAT),
        TextureFormat::Depth24Stencil8 => {
            (gl::DEPTH24_STENCIL8, gl::DEPTH_STENCIL, gl::UNSIGNED_INT_24_8)
        }
    }
}
