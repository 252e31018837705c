//! Compiled shader-stage objects, the immutable render state, and the
//! stage combinations that get linked into pipeline objects.

use crate::gfx::errors::{Error, Result};

impl_handle!(ShaderHandle);
impl_handle!(PipelineHandle);

/// The programmable stage a shader object is compiled for.
#[repr(u8)]
#[derive(Debug, PartialEq, Eq, Clone, Copy, Hash, Serialize, Deserialize)]
pub enum ShaderStage {
    Vertex,
    Pixel,
    Geometry,
    Hull,
    Domain,
}

/// The source language of a shader. Every backend accepts exactly one;
/// handing it anything else fails construction.
#[repr(u8)]
#[derive(Debug, PartialEq, Eq, Clone, Copy, Serialize, Deserialize)]
pub enum ShaderLanguage {
    Glsl,
    Hlsl,
}

/// The setup parameters of a shader-stage object.
#[derive(Debug, Clone)]
pub struct ShaderParams {
    pub stage: ShaderStage,
    pub language: ShaderLanguage,
    pub source: String,
    pub entry: String,
}

impl ShaderParams {
    pub fn new<T1, T2>(stage: ShaderStage, language: ShaderLanguage, source: T1, entry: T2) -> Self
    where
        T1: Into<String>,
        T2: Into<String>,
    {
        ShaderParams {
            stage,
            language,
            source: source.into(),
            entry: entry.into(),
        }
    }

    /// Structural validation at construction time. Compile diagnostics are
    /// deliberately not part of this; they land in the compile log instead.
    pub fn validate(&self) -> Result<()> {
        if self.source.is_empty() {
            return Err(Error::ShaderInvalid("source is empty".into()));
        }

        if self.entry.is_empty() {
            return Err(Error::ShaderInvalid("entry point is missing".into()));
        }

        Ok(())
    }
}

/// Specify whether front- or back-facing polygons can be culled.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum CullFace {
    Nothing,
    Front,
    Back,
}

/// Define front- and back-facing polygons.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum FrontFaceOrder {
    Clockwise,
    CounterClockwise,
}

/// A pixel-wise comparison function.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum Comparison {
    Never,
    Less,
    LessOrEqual,
    Greater,
    GreaterOrEqual,
    Equal,
    NotEqual,
    Always,
}

/// Specifies how incoming RGBA values (source) and the RGBA in framebuffer
/// (destination) are combined.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum Equation {
    /// Adds source and destination. Source and destination are multiplied
    /// by blending parameters before addition.
    Add,
    /// Subtracts destination from source. Source and destination are
    /// multiplied by blending parameters before subtraction.
    Subtract,
    /// Subtracts source from destination. Source and destination are
    /// multiplied by blending parameters before subtraction.
    ReverseSubtract,
}

/// Blend values.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum BlendValue {
    SourceColor,
    SourceAlpha,
    DestinationColor,
    DestinationAlpha,
}

/// Blend factors.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum BlendFactor {
    Zero,
    One,
    Value(BlendValue),
    OneMinusValue(BlendValue),
}

/// A struct that encapsulates all the necessary rasterizer, depth-stencil
/// and blend states. This is the unit the backend diffs field by field
/// before every draw; equal fields never reach the native API.
#[derive(Debug, PartialEq, Clone, Copy)]
pub struct RenderState {
    pub cull_face: CullFace,
    pub front_face_order: FrontFaceOrder,
    pub depth_test: Comparison,
    pub depth_write: bool,
    pub depth_write_offset: Option<(f32, f32)>,
    pub color_blend: Option<(Equation, BlendFactor, BlendFactor)>,
    pub color_write: (bool, bool, bool, bool),
}

impl Default for RenderState {
    fn default() -> Self {
        RenderState {
            cull_face: CullFace::Nothing,
            front_face_order: FrontFaceOrder::CounterClockwise,
            depth_test: Comparison::Always, // no depth test,
            depth_write: false,             // no depth write,
            depth_write_offset: None,
            color_blend: None,
            color_write: (true, true, true, true),
        }
    }
}

/// The shader-stage objects a pipeline links together. Vertex and pixel are
/// mandatory; the rest are optional. Pipelines with identical stage sets are
/// structurally deduplicated by the device, so this struct is cheap to pass
/// around per draw.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub struct PipelineStages {
    pub vertex: ShaderHandle,
    pub pixel: ShaderHandle,
    pub geometry: Option<ShaderHandle>,
    pub hull: Option<ShaderHandle>,
    pub domain: Option<ShaderHandle>,
}

impl PipelineStages {
    pub fn new(vertex: ShaderHandle, pixel: ShaderHandle) -> Self {
        PipelineStages {
            vertex,
            pixel,
            geometry: None,
            hull: None,
            domain: None,
        }
    }
}

/// Everything the device needs to configure the programmable and
/// fixed-function pipeline before a draw.
#[derive(Debug, PartialEq, Clone, Copy)]
pub struct PipelineParams {
    pub stages: PipelineStages,
    pub state: RenderState,
    /// How the input vertex data is used to assemble primitives.
    pub primitive: super::vertex::Primitive,
}

impl PipelineParams {
    pub fn new(stages: PipelineStages) -> Self {
        PipelineParams {
            stages,
            state: RenderState::default(),
            primitive: super::vertex::Primitive::Triangles,
        }
    }

    pub fn validate(&self) -> Result<()> {
        if !self.stages.vertex.is_valid() {
            return Err(Error::ShaderInvalid(
                "a vertex stage is required to describe a proper pipeline".into(),
            ));
        }

        if !self.stages.pixel.is_valid() {
            return Err(Error::ShaderInvalid(
                "a pixel stage is required to describe a proper pipeline".into(),
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::utils::handle::HandleLike;

    #[test]
    fn shader_validation() {
        let params = ShaderParams::new(ShaderStage::Vertex, ShaderLanguage::Glsl, "void", "main");
        assert!(params.validate().is_ok());

        let params = ShaderParams::new(ShaderStage::Vertex, ShaderLanguage::Glsl, "", "main");
        assert!(params.validate().is_err());

        let params = ShaderParams::new(ShaderStage::Vertex, ShaderLanguage::Glsl, "void", "");
        assert!(params.validate().is_err());
    }

    #[test]
    fn pipeline_validation() {
        let vs = ShaderHandle::new(1, 1);
        let ps = ShaderHandle::new(2, 1);

        assert!(PipelineParams::new(PipelineStages::new(vs, ps))
            .validate()
            .is_ok());
        assert!(
            PipelineParams::new(PipelineStages::new(ShaderHandle::nil(), ps))
                .validate()
                .is_err()
        );
    }
}
