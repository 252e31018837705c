//! An in-memory backend that honors the whole device contract without a
//! native context. Buffer storage is byte-accurate so write/read round-trips
//! behave exactly as they do against a real driver, and both structural
//! caches are live, which makes this the backend of choice for the test
//! suites and headless runs.

use crate::gfx::assets::prelude::*;
use crate::gfx::device::ClearFlags;
use crate::gfx::errors::*;
use crate::gfx::MAX_VERTEX_BUFFER_SLOTS;
use crate::utils::color::Color;

use super::utils::{DataVec, PipelineCache, VertexArrayCache};
use super::{BoundState, Visitor};

struct HeadlessBuffer {
    id: u32,
    data: Vec<u8>,
}

struct HeadlessTexture {
    params: TextureParams,
}

struct HeadlessShader {
    id: u32,
    compiled: bool,
    log: String,
}

struct HeadlessPipeline {
    vertex_stage: u32,
    primitive: Primitive,
}

pub struct HeadlessVisitor {
    next_id: u32,
    buffers: DataVec<GpuBufferHandle, HeadlessBuffer>,
    textures: DataVec<TextureHandle, HeadlessTexture>,
    samplers: DataVec<SamplerHandle, SamplerParams>,
    render_targets: DataVec<RenderTargetHandle, RenderTargetParams>,
    shaders: DataVec<ShaderHandle, HeadlessShader>,
    pipelines: DataVec<PipelineHandle, HeadlessPipeline>,
    pipeline_cache: PipelineCache,
    vertex_arrays: VertexArrayCache,
}

impl HeadlessVisitor {
    pub fn new() -> Self {
        HeadlessVisitor {
            // 0 is the uninitialized sentinel in cache keys.
            next_id: 1,
            buffers: DataVec::new(),
            textures: DataVec::new(),
            samplers: DataVec::new(),
            render_targets: DataVec::new(),
            shaders: DataVec::new(),
            pipelines: DataVec::new(),
            pipeline_cache: PipelineCache::new(),
            vertex_arrays: VertexArrayCache::new(),
        }
    }

    fn alloc_id(&mut self) -> u32 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }
}

impl Default for HeadlessVisitor {
    fn default() -> Self {
        HeadlessVisitor::new()
    }
}

impl Visitor for HeadlessVisitor {
    unsafe fn create_buffer(
        &mut self,
        handle: GpuBufferHandle,
        params: &GpuBufferParams,
        data: Option<&[u8]>,
    ) -> Result<()> {
        let mut storage = vec![0; params.len];
        if let Some(src) = data {
            storage[..src.len()].copy_from_slice(src);
        }

        let id = self.alloc_id();
        self.buffers.create(handle, HeadlessBuffer { id, data: storage });
        Ok(())
    }

    unsafe fn update_buffer(
        &mut self,
        handle: GpuBufferHandle,
        offset: usize,
        data: &[u8],
        _access: MapAccess,
    ) -> Result<()> {
        let buffer = self
            .buffers
            .get_mut(handle)
            .ok_or_else(|| Error::HandleInvalid(format!("{}", handle)))?;

        buffer.data[offset..offset + data.len()].copy_from_slice(data);
        Ok(())
    }

    unsafe fn read_buffer(
        &mut self,
        handle: GpuBufferHandle,
        offset: usize,
        dst: &mut [u8],
    ) -> Result<()> {
        let buffer = self
            .buffers
            .get(handle)
            .ok_or_else(|| Error::HandleInvalid(format!("{}", handle)))?;

        dst.copy_from_slice(&buffer.data[offset..offset + dst.len()]);
        Ok(())
    }

    unsafe fn copy_buffer(
        &mut self,
        src: GpuBufferHandle,
        dst: GpuBufferHandle,
        src_offset: usize,
        dst_offset: usize,
        len: usize,
    ) -> Result<()> {
        let chunk = {
            let buffer = self
                .buffers
                .get(src)
                .ok_or_else(|| Error::HandleInvalid(format!("{}", src)))?;
            buffer.data[src_offset..src_offset + len].to_vec()
        };

        let buffer = self
            .buffers
            .get_mut(dst)
            .ok_or_else(|| Error::HandleInvalid(format!("{}", dst)))?;
        buffer.data[dst_offset..dst_offset + len].copy_from_slice(&chunk);
        Ok(())
    }

    unsafe fn delete_buffer(&mut self, handle: GpuBufferHandle) -> Result<()> {
        let buffer = self
            .buffers
            .free(handle)
            .ok_or_else(|| Error::HandleInvalid(format!("{}", handle)))?;

        self.vertex_arrays.evict_buffer(buffer.id);
        Ok(())
    }

    unsafe fn create_texture(
        &mut self,
        handle: TextureHandle,
        params: &TextureParams,
        _data: Option<&[u8]>,
    ) -> Result<()> {
        self.textures.create(handle, HeadlessTexture { params: *params });
        Ok(())
    }

    unsafe fn update_texture(
        &mut self,
        handle: TextureHandle,
        level: u32,
        region: TextureRegion,
        data: &[u8],
    ) -> Result<()> {
        let texture = self
            .textures
            .get(handle)
            .ok_or_else(|| Error::HandleInvalid(format!("{}", handle)))?;

        let params = &texture.params;
        if level >= params.levels {
            return Err(Error::InvalidState(format!(
                "level {} exceeds the {} levels of {}",
                level, params.levels, handle
            )));
        }

        let w = (params.dimensions.x >> level).max(1);
        let h = (params.dimensions.y >> level).max(1);
        let outside = region.position.x.checked_add(region.size.x).map_or(true, |v| v > w)
            || region.position.y.checked_add(region.size.y).map_or(true, |v| v > h);
        if outside {
            return Err(Error::InvalidState(format!(
                "region {:?} is outside level {} ({}x{}) of {}",
                region, level, w, h, handle
            )));
        }

        // The native upload would read the whole region from the slice.
        let len = params.format.size() as usize * region.size.x as usize * region.size.y as usize;
        if data.len() != len {
            return Err(Error::OutOfRange {
                offset: 0,
                end: data.len(),
                len,
            });
        }

        Ok(())
    }

    unsafe fn generate_mips(&mut self, handle: TextureHandle) -> Result<()> {
        self.textures
            .get(handle)
            .map(|_| ())
            .ok_or_else(|| Error::HandleInvalid(format!("{}", handle)))
    }

    unsafe fn delete_texture(&mut self, handle: TextureHandle) -> Result<()> {
        self.textures
            .free(handle)
            .map(|_| ())
            .ok_or_else(|| Error::HandleInvalid(format!("{}", handle)))
    }

    unsafe fn create_sampler(
        &mut self,
        handle: SamplerHandle,
        params: &SamplerParams,
    ) -> Result<()> {
        self.samplers.create(handle, *params);
        Ok(())
    }

    unsafe fn delete_sampler(&mut self, handle: SamplerHandle) -> Result<()> {
        self.samplers
            .free(handle)
            .map(|_| ())
            .ok_or_else(|| Error::HandleInvalid(format!("{}", handle)))
    }

    unsafe fn create_render_target(
        &mut self,
        handle: RenderTargetHandle,
        params: &RenderTargetParams,
    ) -> Result<()> {
        for color in &params.colors {
            let texture = self
                .textures
                .get(*color)
                .ok_or_else(|| Error::HandleInvalid(format!("{}", color)))?;

            if texture.params.usage != TextureUsage::Default {
                return Err(Error::FramebufferIncomplete(format!(
                    "{} is not color-renderable",
                    color
                )));
            }
        }

        if let Some(depth) = params.depth_stencil {
            let texture = self
                .textures
                .get(depth)
                .ok_or_else(|| Error::HandleInvalid(format!("{}", depth)))?;

            if texture.params.usage == TextureUsage::Default {
                return Err(Error::FramebufferIncomplete(format!(
                    "{} is not a depth attachment",
                    depth
                )));
            }
        }

        self.render_targets.create(handle, params.clone());
        Ok(())
    }

    unsafe fn delete_render_target(&mut self, handle: RenderTargetHandle) -> Result<()> {
        self.render_targets
            .free(handle)
            .map(|_| ())
            .ok_or_else(|| Error::HandleInvalid(format!("{}", handle)))
    }

    unsafe fn create_shader(&mut self, handle: ShaderHandle, params: &ShaderParams) -> Result<()> {
        // The headless backend mirrors the GL construction rules so tests
        // exercise the same rejection paths.
        match params.stage {
            ShaderStage::Hull => return Err(Error::UnsupportedEnum("ShaderStage::Hull", "headless")),
            ShaderStage::Domain => {
                return Err(Error::UnsupportedEnum("ShaderStage::Domain", "headless"))
            }
            _ => {}
        }

        if params.language != ShaderLanguage::Glsl {
            return Err(Error::ShaderInvalid(format!(
                "{:?} sources are not accepted, only GLSL",
                params.language
            )));
        }

        if params.entry != "main" {
            return Err(Error::ShaderInvalid(format!(
                "entry point must be `main`, not `{}`",
                params.entry
            )));
        }

        let id = self.alloc_id();
        self.shaders.create(
            handle,
            HeadlessShader {
                id,
                compiled: true,
                log: String::new(),
            },
        );
        Ok(())
    }

    unsafe fn delete_shader(&mut self, handle: ShaderHandle) -> Result<()> {
        self.shaders
            .free(handle)
            .map(|_| ())
            .ok_or_else(|| Error::HandleInvalid(format!("{}", handle)))
    }

    fn shader_compiled(&self, handle: ShaderHandle) -> Option<bool> {
        self.shaders.get(handle).map(|v| v.compiled)
    }

    fn shader_log(&self, handle: ShaderHandle) -> Option<&str> {
        self.shaders.get(handle).map(|v| v.log.as_str())
    }

    unsafe fn create_pipeline(
        &mut self,
        handle: PipelineHandle,
        params: &PipelineParams,
    ) -> Result<()> {
        let stage_id = |shaders: &DataVec<ShaderHandle, HeadlessShader>,
                        stage: Option<ShaderHandle>|
         -> Result<u32> {
            match stage {
                Some(v) => shaders
                    .get(v)
                    .map(|shader| shader.id)
                    .ok_or_else(|| Error::HandleInvalid(format!("{}", v))),
                None => Ok(0),
            }
        };

        let key = [
            stage_id(&self.shaders, Some(params.stages.vertex))?,
            stage_id(&self.shaders, Some(params.stages.pixel))?,
            stage_id(&self.shaders, params.stages.geometry)?,
            stage_id(&self.shaders, params.stages.hull)?,
            stage_id(&self.shaders, params.stages.domain)?,
        ];

        let candidate = self.next_id;
        let id = self.pipeline_cache.get_or_create(key, || Ok(candidate))?;
        if id == candidate {
            self.next_id += 1;
        }

        self.pipelines.create(
            handle,
            HeadlessPipeline {
                vertex_stage: key[0],
                primitive: params.primitive,
            },
        );
        Ok(())
    }

    unsafe fn delete_pipeline(&mut self, handle: PipelineHandle) -> Result<()> {
        // The linked native object stays in the cache for reuse.
        self.pipelines
            .free(handle)
            .map(|_| ())
            .ok_or_else(|| Error::HandleInvalid(format!("{}", handle)))
    }

    unsafe fn clear(
        &mut self,
        render_target: Option<RenderTargetHandle>,
        _flags: ClearFlags,
        _color: Color,
        _depth: f32,
        _stencil: i32,
    ) -> Result<()> {
        if let Some(rt) = render_target {
            if self.render_targets.get(rt).is_none() {
                return Err(Error::HandleInvalid(format!("{}", rt)));
            }
        }

        Ok(())
    }

    unsafe fn draw(&mut self, state: &BoundState, _first: u32, count: u32) -> Result<u32> {
        let primitive = self.apply(state)?;
        Ok(primitive.assemble(count))
    }

    unsafe fn draw_indexed(
        &mut self,
        state: &BoundState,
        _first: u32,
        count: u32,
        _base_vertex: i32,
    ) -> Result<u32> {
        let index = state
            .index_buffer
            .ok_or_else(|| Error::InvalidState("no index buffer is bound".into()))?;

        if self.buffers.get(index.buffer).is_none() {
            return Err(Error::HandleInvalid(format!("{}", index.buffer)));
        }

        let primitive = self.apply(state)?;
        Ok(primitive.assemble(count))
    }

    fn pipelines_len(&self) -> usize {
        self.pipeline_cache.len()
    }

    fn vertex_arrays_len(&self) -> usize {
        self.vertex_arrays.len()
    }
}

impl HeadlessVisitor {
    /// Resolves the bound state to native ids and touches the vertex-array
    /// cache exactly as the native backend would.
    fn apply(&mut self, state: &BoundState) -> Result<Primitive> {
        let pipeline_handle = state
            .pipeline
            .ok_or_else(|| Error::InvalidState("no pipeline is bound".into()))?;

        let (vertex_stage, primitive) = {
            let pipeline = self
                .pipelines
                .get(pipeline_handle)
                .ok_or_else(|| Error::HandleInvalid(format!("{}", pipeline_handle)))?;
            (pipeline.vertex_stage, pipeline.primitive)
        };

        let mut slots = [0; MAX_VERTEX_BUFFER_SLOTS];
        for (i, binding) in state.vertex_buffers.iter().enumerate() {
            if let Some(v) = binding {
                slots[i] = self
                    .buffers
                    .get(v.buffer)
                    .map(|buffer| buffer.id)
                    .ok_or_else(|| Error::HandleInvalid(format!("{}", v.buffer)))?;
            }
        }

        let candidate = self.next_id;
        let id = self
            .vertex_arrays
            .get_or_create((vertex_stage, slots), || Ok(candidate))?;
        if id == candidate {
            self.next_id += 1;
        }

        Ok(primitive)
    }
}
