//! `RenderDevice` is the single entry point of the crate: it owns every GPU
//! resource by versioned handle, tracks what is currently bound, validates
//! each operation against its own records before the backend sees it, and
//! submits draws.

use crate::utils::color::Color;
use crate::utils::object_pool::ObjectPool;

use super::assets::prelude::*;
use super::backends::{
    self, BoundState, IndexBufferBinding, VertexBufferBinding, Viewport, Visitor,
};
use super::errors::*;
use super::{MAX_CONSTANT_BUFFER_SLOTS, MAX_TEXTURE_SLOTS, MAX_VERTEX_BUFFER_SLOTS};

/// Which aspects of the current render target a `clear` touches.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ClearFlags(u8);

impl ClearFlags {
    pub const NONE: ClearFlags = ClearFlags(0);
    pub const COLOR: ClearFlags = ClearFlags(0b001);
    pub const DEPTH: ClearFlags = ClearFlags(0b010);
    pub const STENCIL: ClearFlags = ClearFlags(0b100);
    pub const ALL: ClearFlags = ClearFlags(0b111);

    #[inline]
    pub fn contains(self, other: ClearFlags) -> bool {
        self.0 & other.0 == other.0
    }

    #[inline]
    pub fn is_empty(self) -> bool {
        self.0 == 0
    }
}

impl ::std::ops::BitOr for ClearFlags {
    type Output = ClearFlags;

    fn bitor(self, rhs: Self) -> Self {
        ClearFlags(self.0 | rhs.0)
    }
}

/// A snapshot of the device: alive resources per kind, structural cache
/// sizes, and the draw statistics accumulated since the last `advance`.
#[derive(Debug, Default, Clone, Copy)]
pub struct DeviceInfo {
    pub draw_calls: u32,
    pub primitives: u32,
    pub buffers: usize,
    pub vertex_buffers: usize,
    pub index_buffers: usize,
    pub constant_buffers: usize,
    pub textures: usize,
    pub samplers: usize,
    pub render_targets: usize,
    pub shaders: usize,
    pub pipelines: usize,
    pub cached_pipelines: usize,
    pub cached_vertex_arrays: usize,
}

struct VertexBufferEntry {
    buffer: GpuBufferHandle,
    params: VertexBufferParams,
}

struct IndexBufferEntry {
    buffer: GpuBufferHandle,
    params: IndexBufferParams,
}

struct ConstantBufferEntry {
    buffer: GpuBufferHandle,
    params: ConstantBufferParams,
}

pub struct RenderDevice {
    visitor: Box<dyn Visitor>,
    buffers: ObjectPool<GpuBufferHandle, GpuBufferParams>,
    vertex_buffers: ObjectPool<VertexBufferHandle, VertexBufferEntry>,
    index_buffers: ObjectPool<IndexBufferHandle, IndexBufferEntry>,
    constant_buffers: ObjectPool<ConstantBufferHandle, ConstantBufferEntry>,
    textures: ObjectPool<TextureHandle, TextureParams>,
    samplers: ObjectPool<SamplerHandle, SamplerParams>,
    render_targets: ObjectPool<RenderTargetHandle, RenderTargetParams>,
    shaders: ObjectPool<ShaderHandle, ShaderParams>,
    pipelines: ObjectPool<PipelineHandle, PipelineParams>,
    bound: BoundState,
    draw_calls: u32,
    primitives: u32,
}

impl RenderDevice {
    /// Creates a device over the native backend. The calling thread must own
    /// a current OpenGL context for the whole lifetime of the device.
    #[cfg(not(target_arch = "wasm32"))]
    pub unsafe fn new() -> Result<Self> {
        let visitor = backends::new()?;
        info!("Created render device over the native backend.");
        Ok(Self::with_visitor(visitor))
    }

    /// Creates a device over the in-memory backend. No native context is
    /// required; buffer contents round-trip byte for byte.
    pub fn headless() -> Self {
        Self::with_visitor(backends::new_headless())
    }

    fn with_visitor(visitor: Box<dyn Visitor>) -> Self {
        RenderDevice {
            visitor,
            buffers: ObjectPool::new(),
            vertex_buffers: ObjectPool::new(),
            index_buffers: ObjectPool::new(),
            constant_buffers: ObjectPool::new(),
            textures: ObjectPool::new(),
            samplers: ObjectPool::new(),
            render_targets: ObjectPool::new(),
            shaders: ObjectPool::new(),
            pipelines: ObjectPool::new(),
            bound: BoundState::default(),
            draw_calls: 0,
            primitives: 0,
        }
    }

    /// Snapshots the current device statistics.
    pub fn info(&self) -> DeviceInfo {
        DeviceInfo {
            draw_calls: self.draw_calls,
            primitives: self.primitives,
            buffers: self.buffers.len(),
            vertex_buffers: self.vertex_buffers.len(),
            index_buffers: self.index_buffers.len(),
            constant_buffers: self.constant_buffers.len(),
            textures: self.textures.len(),
            samplers: self.samplers.len(),
            render_targets: self.render_targets.len(),
            shaders: self.shaders.len(),
            pipelines: self.pipelines.len(),
            cached_pipelines: self.visitor.pipelines_len(),
            cached_vertex_arrays: self.visitor.vertex_arrays_len(),
        }
    }

    /// Ends the current frame: returns its statistics and resets the
    /// accumulating counters. Bindings persist across frames.
    pub fn advance(&mut self) -> DeviceInfo {
        let info = self.info();
        self.draw_calls = 0;
        self.primitives = 0;
        info
    }
}

impl RenderDevice {
    /// Creates a raw buffer of `params.len` bytes, optionally filled with
    /// `data` from offset 0. The length is fixed for the buffer's lifetime.
    pub fn create_buffer(
        &mut self,
        params: GpuBufferParams,
        data: Option<&[u8]>,
    ) -> Result<GpuBufferHandle> {
        if params.len == 0 {
            return Err(Error::Allocation("GpuBuffer", "zero length".into()));
        }

        if let Some(buf) = data {
            params.validate_range(0, buf.len())?;
        }

        let handle = self.buffers.create(params);
        if let Err(err) = unsafe { self.visitor.create_buffer(handle, &params, data) } {
            self.buffers.free(handle);
            return Err(err);
        }

        Ok(handle)
    }

    /// Writes `data` into the buffer at `offset` through a transient mapping
    /// with the given access hint. The range is checked against the buffer
    /// extent before any byte is touched; `access` must be a write variant
    /// and the buffer must have been created writable.
    pub fn write_buffer(
        &mut self,
        handle: GpuBufferHandle,
        offset: usize,
        data: &[u8],
        access: MapAccess,
    ) -> Result<()> {
        let params = *self
            .buffers
            .get(handle)
            .ok_or_else(|| Error::HandleInvalid(format!("{}", handle)))?;

        if !access.is_write() {
            return Err(Error::InvalidState(format!(
                "{:?} is not a write mapping",
                access
            )));
        }

        if !params.access.writable() {
            return Err(Error::InvalidState(format!("{} is not writable", handle)));
        }

        params.validate_range(offset, data.len())?;
        unsafe { self.visitor.update_buffer(handle, offset, data, access) }
    }

    /// Reads `dst.len()` bytes from the buffer at `offset` into `dst`. The
    /// buffer must have been created with read access.
    pub fn read_buffer(
        &mut self,
        handle: GpuBufferHandle,
        offset: usize,
        dst: &mut [u8],
    ) -> Result<()> {
        let params = *self
            .buffers
            .get(handle)
            .ok_or_else(|| Error::HandleInvalid(format!("{}", handle)))?;

        if !params.access.readable() {
            return Err(Error::InvalidState(format!("{} is not readable", handle)));
        }

        params.validate_range(offset, dst.len())?;
        unsafe { self.visitor.read_buffer(handle, offset, dst) }
    }

    /// Copies `len` bytes between two buffers without a CPU round-trip. Both
    /// ranges are checked against their buffer extents first.
    pub fn copy_buffer(
        &mut self,
        src: GpuBufferHandle,
        dst: GpuBufferHandle,
        src_offset: usize,
        dst_offset: usize,
        len: usize,
    ) -> Result<()> {
        let src_params = *self
            .buffers
            .get(src)
            .ok_or_else(|| Error::HandleInvalid(format!("{}", src)))?;
        let dst_params = *self
            .buffers
            .get(dst)
            .ok_or_else(|| Error::HandleInvalid(format!("{}", dst)))?;

        src_params.validate_range(src_offset, len)?;
        dst_params.validate_range(dst_offset, len)?;

        unsafe {
            self.visitor
                .copy_buffer(src, dst, src_offset, dst_offset, len)
        }
    }

    pub fn delete_buffer(&mut self, handle: GpuBufferHandle) -> Result<()> {
        self.buffers
            .free(handle)
            .ok_or_else(|| Error::HandleInvalid(format!("{}", handle)))?;

        self.scrub_buffer(handle);
        unsafe { self.visitor.delete_buffer(handle) }
    }

    /// Drops every binding that still references a deleted buffer.
    fn scrub_buffer(&mut self, handle: GpuBufferHandle) {
        for slot in self.bound.vertex_buffers.iter_mut() {
            if slot.map(|v| v.buffer) == Some(handle) {
                *slot = None;
            }
        }

        if self.bound.index_buffer.map(|v| v.buffer) == Some(handle) {
            self.bound.index_buffer = None;
        }

        for slot in self.bound.constant_buffers.iter_mut() {
            if *slot == Some(handle) {
                *slot = None;
            }
        }
    }
}

impl RenderDevice {
    /// Creates a vertex buffer of `params.count` vertices laid out per
    /// `params.layout`. The byte extent is derived once and immutable.
    pub fn create_vertex_buffer(
        &mut self,
        params: VertexBufferParams,
        data: Option<&[u8]>,
    ) -> Result<VertexBufferHandle> {
        params.validate()?;

        let buffer = self.create_buffer(
            GpuBufferParams {
                len: params.len(),
                usage: params.usage,
                access: BufferAccess::WRITE,
            },
            data,
        )?;

        Ok(self.vertex_buffers.create(VertexBufferEntry { buffer, params }))
    }

    /// Writes vertex data at a byte offset, delegating to the wrapped raw
    /// buffer.
    pub fn update_vertex_buffer(
        &mut self,
        handle: VertexBufferHandle,
        offset: usize,
        data: &[u8],
    ) -> Result<()> {
        let buffer = self
            .vertex_buffers
            .get(handle)
            .map(|v| v.buffer)
            .ok_or_else(|| Error::HandleInvalid(format!("{}", handle)))?;

        self.write_buffer(buffer, offset, data, MapAccess::WriteDiscardRange)
    }

    pub fn delete_vertex_buffer(&mut self, handle: VertexBufferHandle) -> Result<()> {
        let entry = self
            .vertex_buffers
            .free(handle)
            .ok_or_else(|| Error::HandleInvalid(format!("{}", handle)))?;

        self.delete_buffer(entry.buffer)
    }

    /// Creates an index buffer of `params.count` indices. The byte extent is
    /// always `count * format.stride()`.
    pub fn create_index_buffer(
        &mut self,
        params: IndexBufferParams,
        data: Option<&[u8]>,
    ) -> Result<IndexBufferHandle> {
        let buffer = self.create_buffer(
            GpuBufferParams {
                len: params.len(),
                usage: params.usage,
                access: BufferAccess::WRITE,
            },
            data,
        )?;

        Ok(self.index_buffers.create(IndexBufferEntry { buffer, params }))
    }

    pub fn update_index_buffer(
        &mut self,
        handle: IndexBufferHandle,
        offset: usize,
        data: &[u8],
    ) -> Result<()> {
        let buffer = self
            .index_buffers
            .get(handle)
            .map(|v| v.buffer)
            .ok_or_else(|| Error::HandleInvalid(format!("{}", handle)))?;

        self.write_buffer(buffer, offset, data, MapAccess::WriteDiscardRange)
    }

    pub fn delete_index_buffer(&mut self, handle: IndexBufferHandle) -> Result<()> {
        let entry = self
            .index_buffers
            .free(handle)
            .ok_or_else(|| Error::HandleInvalid(format!("{}", handle)))?;

        self.delete_buffer(entry.buffer)
    }

    /// Creates a constant buffer of `params.count` blocks of `params.stride`
    /// bytes each.
    pub fn create_constant_buffer(
        &mut self,
        params: ConstantBufferParams,
        data: Option<&[u8]>,
    ) -> Result<ConstantBufferHandle> {
        params.validate()?;

        let buffer = self.create_buffer(
            GpuBufferParams {
                len: params.len(),
                usage: params.usage,
                access: BufferAccess::WRITE,
            },
            data,
        )?;

        Ok(self
            .constant_buffers
            .create(ConstantBufferEntry { buffer, params }))
    }

    /// Writes one constant block at `index`.
    pub fn update_constant_buffer(
        &mut self,
        handle: ConstantBufferHandle,
        index: usize,
        data: &[u8],
    ) -> Result<()> {
        let (buffer, params) = self
            .constant_buffers
            .get(handle)
            .map(|v| (v.buffer, v.params))
            .ok_or_else(|| Error::HandleInvalid(format!("{}", handle)))?;

        if data.len() > params.stride {
            return Err(Error::OutOfRange {
                offset: 0,
                end: data.len(),
                len: params.stride,
            });
        }

        self.write_buffer(
            buffer,
            index * params.stride,
            data,
            MapAccess::WriteDiscardRange,
        )
    }

    pub fn delete_constant_buffer(&mut self, handle: ConstantBufferHandle) -> Result<()> {
        let entry = self
            .constant_buffers
            .free(handle)
            .ok_or_else(|| Error::HandleInvalid(format!("{}", handle)))?;

        self.delete_buffer(entry.buffer)
    }
}

impl RenderDevice {
    /// Creates a texture, optionally uploading `data` to the base level.
    pub fn create_texture(
        &mut self,
        params: TextureParams,
        data: Option<&[u8]>,
    ) -> Result<TextureHandle> {
        params.validate(data)?;

        let handle = self.textures.create(params);
        if let Err(err) = unsafe { self.visitor.create_texture(handle, &params, data) } {
            self.textures.free(handle);
            return Err(err);
        }

        Ok(handle)
    }

    /// Uploads `data` to a rectangular region of one mip level.
    pub fn update_texture(
        &mut self,
        handle: TextureHandle,
        level: u32,
        region: TextureRegion,
        data: &[u8],
    ) -> Result<()> {
        if !self.textures.contains(handle) {
            return Err(Error::HandleInvalid(format!("{}", handle)));
        }

        unsafe { self.visitor.update_texture(handle, level, region, data) }
    }

    /// Derives the full mip chain of a texture from its base level.
    pub fn generate_mips(&mut self, handle: TextureHandle) -> Result<()> {
        if !self.textures.contains(handle) {
            return Err(Error::HandleInvalid(format!("{}", handle)));
        }

        unsafe { self.visitor.generate_mips(handle) }
    }

    pub fn delete_texture(&mut self, handle: TextureHandle) -> Result<()> {
        self.textures
            .free(handle)
            .ok_or_else(|| Error::HandleInvalid(format!("{}", handle)))?;

        for slot in self.bound.textures.iter_mut() {
            if *slot == Some(handle) {
                *slot = None;
            }
        }

        unsafe { self.visitor.delete_texture(handle) }
    }

    pub fn create_sampler(&mut self, params: SamplerParams) -> Result<SamplerHandle> {
        params.validate()?;

        let handle = self.samplers.create(params);
        if let Err(err) = unsafe { self.visitor.create_sampler(handle, &params) } {
            self.samplers.free(handle);
            return Err(err);
        }

        Ok(handle)
    }

    /// Sampler parameters are immutable once initialized; re-applying a
    /// configuration to a live sampler is accepted and ignored.
    pub fn update_sampler(&mut self, handle: SamplerHandle, _params: SamplerParams) -> Result<()> {
        if !self.samplers.contains(handle) {
            return Err(Error::HandleInvalid(format!("{}", handle)));
        }

        debug!("Ignored reconfiguration of initialized {}.", handle);
        Ok(())
    }

    pub fn delete_sampler(&mut self, handle: SamplerHandle) -> Result<()> {
        self.samplers
            .free(handle)
            .ok_or_else(|| Error::HandleInvalid(format!("{}", handle)))?;

        for slot in self.bound.samplers.iter_mut() {
            if *slot == Some(handle) {
                *slot = None;
            }
        }

        unsafe { self.visitor.delete_sampler(handle) }
    }

    /// Creates a render target from up to `MAX_COLOR_ATTACHMENTS` color
    /// textures plus an optional depth(-stencil) texture. A target with no
    /// color attachments renders depth-only.
    pub fn create_render_target(
        &mut self,
        params: RenderTargetParams,
    ) -> Result<RenderTargetHandle> {
        params.validate()?;

        for color in &params.colors {
            if !self.textures.contains(*color) {
                return Err(Error::HandleInvalid(format!("{}", color)));
            }
        }

        if let Some(depth) = params.depth_stencil {
            if !self.textures.contains(depth) {
                return Err(Error::HandleInvalid(format!("{}", depth)));
            }
        }

        let handle = self.render_targets.create(params.clone());
        if let Err(err) = unsafe { self.visitor.create_render_target(handle, &params) } {
            self.render_targets.free(handle);
            return Err(err);
        }

        Ok(handle)
    }

    pub fn delete_render_target(&mut self, handle: RenderTargetHandle) -> Result<()> {
        self.render_targets
            .free(handle)
            .ok_or_else(|| Error::HandleInvalid(format!("{}", handle)))?;

        if self.bound.render_target == Some(handle) {
            self.bound.render_target = None;
        }

        unsafe { self.visitor.delete_render_target(handle) }
    }
}

impl RenderDevice {
    /// Creates and compiles a shader-stage object. Structural problems
    /// (empty source, missing entry point) and backend construction rules
    /// (accepted language, canonical entry point, supported stages) fail
    /// here; mere compile diagnostics do not, they are recorded and
    /// queryable through [`RenderDevice::shader_log`].
    pub fn create_shader(&mut self, params: ShaderParams) -> Result<ShaderHandle> {
        params.validate()?;

        let handle = self.shaders.create(params.clone());
        if let Err(err) = unsafe { self.visitor.create_shader(handle, &params) } {
            self.shaders.free(handle);
            return Err(err);
        }

        Ok(handle)
    }

    pub fn delete_shader(&mut self, handle: ShaderHandle) -> Result<()> {
        self.shaders
            .free(handle)
            .ok_or_else(|| Error::HandleInvalid(format!("{}", handle)))?;

        unsafe { self.visitor.delete_shader(handle) }
    }

    /// Whether the stage compiled cleanly.
    pub fn is_shader_compiled(&self, handle: ShaderHandle) -> Result<bool> {
        self.visitor
            .shader_compiled(handle)
            .ok_or_else(|| Error::HandleInvalid(format!("{}", handle)))
    }

    /// The compile log recorded for the stage, empty when clean.
    pub fn shader_log(&self, handle: ShaderHandle) -> Result<&str> {
        self.visitor
            .shader_log(handle)
            .ok_or_else(|| Error::HandleInvalid(format!("{}", handle)))
    }

    /// Links a stage combination (plus fixed-function state) into a
    /// pipeline. Combinations that were linked before share one native
    /// object through the pipeline cache.
    pub fn create_pipeline(&mut self, params: PipelineParams) -> Result<PipelineHandle> {
        params.validate()?;

        let slots = [
            (Some(params.stages.vertex), ShaderStage::Vertex),
            (Some(params.stages.pixel), ShaderStage::Pixel),
            (params.stages.geometry, ShaderStage::Geometry),
            (params.stages.hull, ShaderStage::Hull),
            (params.stages.domain, ShaderStage::Domain),
        ];

        for (handle, stage) in slots.iter() {
            if let Some(v) = handle {
                let shader = self
                    .shaders
                    .get(*v)
                    .ok_or_else(|| Error::HandleInvalid(format!("{}", v)))?;

                if shader.stage != *stage {
                    return Err(Error::ShaderInvalid(format!(
                        "{} is a {:?} stage, expected {:?}",
                        v, shader.stage, stage
                    )));
                }
            }
        }

        let handle = self.pipelines.create(params);
        if let Err(err) = unsafe { self.visitor.create_pipeline(handle, &params) } {
            self.pipelines.free(handle);
            return Err(err);
        }

        Ok(handle)
    }

    pub fn delete_pipeline(&mut self, handle: PipelineHandle) -> Result<()> {
        self.pipelines
            .free(handle)
            .ok_or_else(|| Error::HandleInvalid(format!("{}", handle)))?;

        if self.bound.pipeline == Some(handle) {
            self.bound.pipeline = None;
        }

        unsafe { self.visitor.delete_pipeline(handle) }
    }
}

impl RenderDevice {
    /// Directs subsequent draws into `handle`, or back into the default
    /// framebuffer for `None`. Like every binding, this persists across
    /// draws until overwritten.
    pub fn set_render_target(&mut self, handle: Option<RenderTargetHandle>) -> Result<()> {
        if let Some(v) = handle {
            if !self.render_targets.contains(v) {
                return Err(Error::HandleInvalid(format!("{}", v)));
            }
        }

        self.bound.render_target = handle;
        Ok(())
    }

    /// Restricts subsequent draws to `viewport`. Applied lazily: the backend
    /// only touches the native viewport when it differs from the last one.
    pub fn set_viewport(&mut self, viewport: Viewport) {
        self.bound.viewport = Some(viewport);
    }

    pub fn set_pipeline(&mut self, handle: PipelineHandle) -> Result<()> {
        if !self.pipelines.contains(handle) {
            return Err(Error::HandleInvalid(format!("{}", handle)));
        }

        self.bound.pipeline = Some(handle);
        Ok(())
    }

    pub fn set_vertex_buffer(&mut self, slot: usize, handle: VertexBufferHandle) -> Result<()> {
        if slot >= MAX_VERTEX_BUFFER_SLOTS {
            return Err(Error::InvalidState(format!(
                "vertex buffer slot {} exceeds {}",
                slot, MAX_VERTEX_BUFFER_SLOTS
            )));
        }

        let entry = self
            .vertex_buffers
            .get(handle)
            .ok_or_else(|| Error::HandleInvalid(format!("{}", handle)))?;

        self.bound.vertex_buffers[slot] = Some(VertexBufferBinding {
            buffer: entry.buffer,
            layout: entry.params.layout,
        });
        Ok(())
    }

    pub fn set_index_buffer(&mut self, handle: IndexBufferHandle) -> Result<()> {
        let entry = self
            .index_buffers
            .get(handle)
            .ok_or_else(|| Error::HandleInvalid(format!("{}", handle)))?;

        self.bound.index_buffer = Some(IndexBufferBinding {
            buffer: entry.buffer,
            format: entry.params.format,
        });
        Ok(())
    }

    pub fn set_constant_buffer(&mut self, slot: usize, handle: ConstantBufferHandle) -> Result<()> {
        if slot >= MAX_CONSTANT_BUFFER_SLOTS {
            return Err(Error::InvalidState(format!(
                "constant buffer slot {} exceeds {}",
                slot, MAX_CONSTANT_BUFFER_SLOTS
            )));
        }

        let entry = self
            .constant_buffers
            .get(handle)
            .ok_or_else(|| Error::HandleInvalid(format!("{}", handle)))?;

        self.bound.constant_buffers[slot] = Some(entry.buffer);
        Ok(())
    }

    pub fn set_texture(&mut self, slot: usize, handle: TextureHandle) -> Result<()> {
        if slot >= MAX_TEXTURE_SLOTS {
            return Err(Error::InvalidState(format!(
                "texture slot {} exceeds {}",
                slot, MAX_TEXTURE_SLOTS
            )));
        }

        if !self.textures.contains(handle) {
            return Err(Error::HandleInvalid(format!("{}", handle)));
        }

        self.bound.textures[slot] = Some(handle);
        Ok(())
    }

    pub fn set_sampler(&mut self, slot: usize, handle: SamplerHandle) -> Result<()> {
        if slot >= MAX_TEXTURE_SLOTS {
            return Err(Error::InvalidState(format!(
                "sampler slot {} exceeds {}",
                slot, MAX_TEXTURE_SLOTS
            )));
        }

        if !self.samplers.contains(handle) {
            return Err(Error::HandleInvalid(format!("{}", handle)));
        }

        self.bound.samplers[slot] = Some(handle);
        Ok(())
    }

    /// Clears the selected aspects of the current render target. An empty
    /// flag set does nothing.
    pub fn clear(
        &mut self,
        flags: ClearFlags,
        color: Color,
        depth: f32,
        stencil: i32,
    ) -> Result<()> {
        if flags.is_empty() {
            return Ok(());
        }

        unsafe {
            self.visitor
                .clear(self.bound.render_target, flags, color, depth, stencil)
        }
    }

    /// Draws `count` vertices starting at `first` with the current
    /// bindings. A pipeline and a vertex buffer in slot 0 must be bound.
    pub fn draw(&mut self, first: u32, count: u32) -> Result<u32> {
        self.check_draw_state()?;

        let primitives = unsafe { self.visitor.draw(&self.bound, first, count)? };
        self.draw_calls += 1;
        self.primitives += primitives;
        Ok(primitives)
    }

    /// Draws `count` indices starting at `first`, adding `base_vertex` to
    /// every fetched index. Additionally requires a bound index buffer.
    pub fn draw_indexed(&mut self, first: u32, count: u32, base_vertex: i32) -> Result<u32> {
        self.check_draw_state()?;

        if self.bound.index_buffer.is_none() {
            return Err(Error::InvalidState("no index buffer is bound".into()));
        }

        let primitives = unsafe {
            self.visitor
                .draw_indexed(&self.bound, first, count, base_vertex)?
        };
        self.draw_calls += 1;
        self.primitives += primitives;
        Ok(primitives)
    }

    fn check_draw_state(&self) -> Result<()> {
        if self.bound.pipeline.is_none() {
            return Err(Error::InvalidState("no pipeline is bound".into()));
        }

        if self.bound.vertex_buffers[0].is_none() {
            return Err(Error::InvalidState("no vertex buffer is bound".into()));
        }

        Ok(())
    }
}
