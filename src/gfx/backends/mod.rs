//! The backend seam of the render device. `RenderDevice` validates and
//! resolves handles, a `Visitor` turns them into native API calls.

pub mod headless;
pub mod utils;

#[cfg(not(target_arch = "wasm32"))]
pub mod gl;

use cgmath::Vector2;

use crate::gfx::assets::prelude::*;
use crate::gfx::device::ClearFlags;
use crate::gfx::errors::*;
use crate::gfx::{MAX_CONSTANT_BUFFER_SLOTS, MAX_TEXTURE_SLOTS, MAX_VERTEX_BUFFER_SLOTS};
use crate::utils::color::Color;

/// The rectangle draws are clipped to, in pixels from the bottom-left
/// corner of the render target.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    pub position: Vector2<i32>,
    pub size: Vector2<u32>,
}

/// A vertex buffer slot resolved down to the raw buffer it wraps and the
/// layout the backend needs to source attributes from it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VertexBufferBinding {
    pub buffer: GpuBufferHandle,
    pub layout: VertexLayout,
}

/// The bound index buffer, resolved to the raw buffer and its index width.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IndexBufferBinding {
    pub buffer: GpuBufferHandle,
    pub format: IndexFormat,
}

/// A snapshot of everything bound on the device at draw time. The facade
/// keeps one of these up to date across `set_*` calls; the backend diffs it
/// against what it last applied and only touches the native API for the
/// fields that changed.
#[derive(Debug, Default, Clone, Copy, PartialEq)]
pub struct BoundState {
    pub render_target: Option<RenderTargetHandle>,
    pub viewport: Option<Viewport>,
    pub pipeline: Option<PipelineHandle>,
    pub vertex_buffers: [Option<VertexBufferBinding>; MAX_VERTEX_BUFFER_SLOTS],
    pub index_buffer: Option<IndexBufferBinding>,
    pub constant_buffers: [Option<GpuBufferHandle>; MAX_CONSTANT_BUFFER_SLOTS],
    pub textures: [Option<TextureHandle>; MAX_TEXTURE_SLOTS],
    pub samplers: [Option<SamplerHandle>; MAX_TEXTURE_SLOTS],
}

/// The backend contract. Every method is executed on the thread that owns
/// the native context, with handles the facade has already validated against
/// its own pools; the backend still owns native-side failure reporting.
///
/// All of these are `unsafe` since implementations talk to raw graphics
/// APIs whose invariants the type system can not express.
pub trait Visitor {
    unsafe fn create_buffer(
        &mut self,
        handle: GpuBufferHandle,
        params: &GpuBufferParams,
        data: Option<&[u8]>,
    ) -> Result<()>;

    /// Writes `data` at `offset` through a transient mapping with the given
    /// access hint. The range is validated by the caller.
    unsafe fn update_buffer(
        &mut self,
        handle: GpuBufferHandle,
        offset: usize,
        data: &[u8],
        access: MapAccess,
    ) -> Result<()>;

    /// Reads `dst.len()` bytes at `offset` back into `dst`.
    unsafe fn read_buffer(
        &mut self,
        handle: GpuBufferHandle,
        offset: usize,
        dst: &mut [u8],
    ) -> Result<()>;

    /// Copies `len` bytes between two buffers entirely on the device.
    unsafe fn copy_buffer(
        &mut self,
        src: GpuBufferHandle,
        dst: GpuBufferHandle,
        src_offset: usize,
        dst_offset: usize,
        len: usize,
    ) -> Result<()>;

    unsafe fn delete_buffer(&mut self, handle: GpuBufferHandle) -> Result<()>;

    unsafe fn create_texture(
        &mut self,
        handle: TextureHandle,
        params: &TextureParams,
        data: Option<&[u8]>,
    ) -> Result<()>;

    unsafe fn update_texture(
        &mut self,
        handle: TextureHandle,
        level: u32,
        region: TextureRegion,
        data: &[u8],
    ) -> Result<()>;

    /// Derives the full mip chain from level 0.
    unsafe fn generate_mips(&mut self, handle: TextureHandle) -> Result<()>;

    unsafe fn delete_texture(&mut self, handle: TextureHandle) -> Result<()>;

    unsafe fn create_sampler(&mut self, handle: SamplerHandle, params: &SamplerParams)
        -> Result<()>;

    unsafe fn delete_sampler(&mut self, handle: SamplerHandle) -> Result<()>;

    unsafe fn create_render_target(
        &mut self,
        handle: RenderTargetHandle,
        params: &RenderTargetParams,
    ) -> Result<()>;

    unsafe fn delete_render_target(&mut self, handle: RenderTargetHandle) -> Result<()>;

    /// Creates and compiles a shader-stage object. Backend-specific
    /// construction rules (accepted language, canonical entry point,
    /// supported stages) are enforced here; compile diagnostics are recorded,
    /// not returned.
    unsafe fn create_shader(&mut self, handle: ShaderHandle, params: &ShaderParams) -> Result<()>;

    unsafe fn delete_shader(&mut self, handle: ShaderHandle) -> Result<()>;

    /// Whether the shader stage compiled cleanly. `None` for dead handles.
    fn shader_compiled(&self, handle: ShaderHandle) -> Option<bool>;

    /// The recorded compile log, empty when the compile was clean.
    fn shader_log(&self, handle: ShaderHandle) -> Option<&str>;

    /// Links the stage combination into a native pipeline, deduplicated
    /// through the pipeline cache: stage sets that were linked before reuse
    /// the cached native object.
    unsafe fn create_pipeline(&mut self, handle: PipelineHandle, params: &PipelineParams)
        -> Result<()>;

    unsafe fn delete_pipeline(&mut self, handle: PipelineHandle) -> Result<()>;

    unsafe fn clear(
        &mut self,
        render_target: Option<RenderTargetHandle>,
        flags: ClearFlags,
        color: Color,
        depth: f32,
        stencil: i32,
    ) -> Result<()>;

    /// Applies `state` (diffed against the last applied state) and draws
    /// `count` vertices starting at `first`. Returns the number of
    /// primitives assembled.
    unsafe fn draw(&mut self, state: &BoundState, first: u32, count: u32) -> Result<u32>;

    /// Indexed variant of [`Visitor::draw`]. `base_vertex` is added to every
    /// fetched index.
    unsafe fn draw_indexed(
        &mut self,
        state: &BoundState,
        first: u32,
        count: u32,
        base_vertex: i32,
    ) -> Result<u32>;

    /// The number of distinct native pipelines alive in the pipeline cache.
    fn pipelines_len(&self) -> usize;

    /// The number of distinct vertex-array objects alive in the cache.
    fn vertex_arrays_len(&self) -> usize;
}

/// Creates the native backend for the current platform. Must be called on
/// the thread owning a current OpenGL context.
#[cfg(not(target_arch = "wasm32"))]
pub unsafe fn new() -> Result<Box<dyn Visitor>> {
    let visitor = gl::GLVisitor::new()?;
    Ok(Box::new(visitor))
}

/// Creates the in-memory backend. It simulates the full device contract,
/// byte-accurate buffer storage included, without any native context.
pub fn new_headless() -> Box<dyn Visitor> {
    Box::new(headless::HeadlessVisitor::new())
}
