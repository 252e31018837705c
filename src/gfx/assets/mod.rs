pub mod buffer;
pub mod shader;
pub mod texture;
pub mod vertex;

pub mod prelude {
    pub use super::buffer::{
        BufferAccess, BufferUsage, ConstantBufferHandle, ConstantBufferParams, GpuBufferHandle,
        GpuBufferParams, MapAccess,
    };

    pub use super::vertex::{
        IndexBufferHandle, IndexBufferParams, IndexFormat, Primitive, VertexAttribute,
        VertexBufferHandle, VertexBufferParams, VertexFormat, VertexLayout, VertexSemantic,
    };

    pub use super::texture::{
        RenderTargetHandle, RenderTargetParams, SamplerAddress, SamplerFilter, SamplerHandle,
        SamplerParams, TextureFormat, TextureHandle, TextureParams, TextureRegion, TextureUsage,
    };

    pub use super::shader::{
        BlendFactor, BlendValue, Comparison, CullFace, Equation, FrontFaceOrder, PipelineHandle,
        PipelineParams, PipelineStages, RenderState, ShaderHandle, ShaderLanguage, ShaderParams,
        ShaderStage,
    };
}
