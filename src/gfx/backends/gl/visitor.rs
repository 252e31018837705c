use gl;
use gl::types::*;

use crate::gfx::assets::prelude::*;
use crate::gfx::device::ClearFlags;
use crate::gfx::errors::{Error, Result};
use crate::gfx::{MAX_CONSTANT_BUFFER_SLOTS, MAX_TEXTURE_SLOTS, MAX_VERTEX_BUFFER_SLOTS};
use crate::utils::color::Color;

use super::super::utils::{DataVec, PipelineCache, VertexArrayCache};
use super::super::{BoundState, Viewport, Visitor};
use super::capabilities::{Capabilities, Version};
use super::types;

#[derive(Debug, Clone, Copy)]
struct GLBufferData {
    id: GLuint,
}

#[derive(Debug, Clone, Copy)]
struct GLTextureData {
    id: GLuint,
    params: TextureParams,
}

#[derive(Debug, Clone, Copy)]
struct GLSamplerData {
    id: GLuint,
}

#[derive(Debug, Clone, Copy)]
struct GLRenderTargetData {
    id: GLuint,
}

#[derive(Debug, Clone)]
struct GLShaderData {
    id: GLuint,
    compiled: bool,
    log: String,
}

#[derive(Debug, Clone, Copy)]
struct GLPipelineData {
    program: GLuint,
    vertex_stage: GLuint,
    state: RenderState,
    primitive: Primitive,
}

/// The native state last applied to the context. Every setter below diffs
/// against this before touching the API.
struct GLMutableState {
    render_state: RenderState,
    viewport: Option<Viewport>,
    bound_framebuffer: Option<GLuint>,
    bound_program: Option<GLuint>,
    bound_vertex_array: Option<GLuint>,
    bound_texture_unit: usize,
    bound_textures: [GLuint; MAX_TEXTURE_SLOTS],
    bound_samplers: [GLuint; MAX_TEXTURE_SLOTS],
    bound_uniform_buffers: [GLuint; MAX_CONSTANT_BUFFER_SLOTS],
}

pub struct GLVisitor {
    state: GLMutableState,
    capabilities: Capabilities,
    buffers: DataVec<GpuBufferHandle, GLBufferData>,
    textures: DataVec<TextureHandle, GLTextureData>,
    samplers: DataVec<SamplerHandle, GLSamplerData>,
    render_targets: DataVec<RenderTargetHandle, GLRenderTargetData>,
    shaders: DataVec<ShaderHandle, GLShaderData>,
    pipelines: DataVec<PipelineHandle, GLPipelineData>,
    pipeline_cache: PipelineCache,
    vertex_arrays: VertexArrayCache,
}

impl GLVisitor {
    pub unsafe fn new() -> Result<Self> {
        let capabilities = Capabilities::parse()?;
        info!("GLVisitor {:#?}", capabilities);
        check_capabilities(&capabilities)?;

        let state = GLMutableState {
            render_state: RenderState::default(),
            viewport: None,
            bound_framebuffer: None,
            bound_program: None,
            bound_vertex_array: None,
            bound_texture_unit: 0,
            bound_textures: [0; MAX_TEXTURE_SLOTS],
            bound_samplers: [0; MAX_TEXTURE_SLOTS],
            bound_uniform_buffers: [0; MAX_CONSTANT_BUFFER_SLOTS],
        };

        let mut visitor = GLVisitor {
            state,
            capabilities,
            buffers: DataVec::new(),
            textures: DataVec::new(),
            samplers: DataVec::new(),
            render_targets: DataVec::new(),
            shaders: DataVec::new(),
            pipelines: DataVec::new(),
            pipeline_cache: PipelineCache::new(),
            vertex_arrays: VertexArrayCache::new(),
        };

        Self::reset_render_state(&mut visitor.state)?;
        Ok(visitor)
    }
}

impl Visitor for GLVisitor {
    unsafe fn create_buffer(
        &mut self,
        handle: GpuBufferHandle,
        params: &GpuBufferParams,
        data: Option<&[u8]>,
    ) -> Result<()> {
        let mut id = 0;
        gl::GenBuffers(1, &mut id);
        if id == 0 {
            return Err(Error::Allocation("GpuBuffer", "glGenBuffers failed".into()));
        }

        gl::BindBuffer(gl::COPY_WRITE_BUFFER, id);

        // The initial data may be a prefix of the buffer, and glBufferData
        // reads the full `len` bytes from the pointer. Stage it into zeroed
        // storage, which also zero-fills the remainder.
        let mut staged = vec![0; params.len];
        if let Some(v) = data {
            staged[..v.len()].copy_from_slice(v);
        }

        gl::BufferData(
            gl::COPY_WRITE_BUFFER,
            params.len as GLsizeiptr,
            staged.as_ptr() as *const ::std::os::raw::c_void,
            params.usage.into(),
        );
        check()?;

        self.buffers.create(handle, GLBufferData { id });
        Ok(())
    }

    unsafe fn update_buffer(
        &mut self,
        handle: GpuBufferHandle,
        offset: usize,
        data: &[u8],
        access: MapAccess,
    ) -> Result<()> {
        if data.is_empty() {
            return Ok(());
        }

        let buffer = self
            .buffers
            .get(handle)
            .ok_or_else(|| Error::HandleInvalid(format!("{}", handle)))?;

        gl::BindBuffer(gl::COPY_WRITE_BUFFER, buffer.id);
        let ptr = gl::MapBufferRange(
            gl::COPY_WRITE_BUFFER,
            offset as GLintptr,
            data.len() as GLsizeiptr,
            types::map_access(access),
        );

        if ptr.is_null() {
            check()?;
            return Err(Error::Driver("glMapBufferRange returned null".into()));
        }

        ::std::ptr::copy_nonoverlapping(data.as_ptr(), ptr as *mut u8, data.len());
        gl::UnmapBuffer(gl::COPY_WRITE_BUFFER);
        check()
    }

    unsafe fn read_buffer(
        &mut self,
        handle: GpuBufferHandle,
        offset: usize,
        dst: &mut [u8],
    ) -> Result<()> {
        if dst.is_empty() {
            return Ok(());
        }

        let buffer = self
            .buffers
            .get(handle)
            .ok_or_else(|| Error::HandleInvalid(format!("{}", handle)))?;

        gl::BindBuffer(gl::COPY_READ_BUFFER, buffer.id);
        let ptr = gl::MapBufferRange(
            gl::COPY_READ_BUFFER,
            offset as GLintptr,
            dst.len() as GLsizeiptr,
            types::map_access(MapAccess::ReadOnly),
        );

        if ptr.is_null() {
            check()?;
            return Err(Error::Driver("glMapBufferRange returned null".into()));
        }

        ::std::ptr::copy_nonoverlapping(ptr as *const u8, dst.as_mut_ptr(), dst.len());
        gl::UnmapBuffer(gl::COPY_READ_BUFFER);
        check()
    }

    unsafe fn copy_buffer(
        &mut self,
        src: GpuBufferHandle,
        dst: GpuBufferHandle,
        src_offset: usize,
        dst_offset: usize,
        len: usize,
    ) -> Result<()> {
        if len == 0 {
            return Ok(());
        }

        let src = self
            .buffers
            .get(src)
            .ok_or_else(|| Error::HandleInvalid(format!("{}", src)))?;
        let dst = self
            .buffers
            .get(dst)
            .ok_or_else(|| Error::HandleInvalid(format!("{}", dst)))?;

        gl::BindBuffer(gl::COPY_READ_BUFFER, src.id);
        gl::BindBuffer(gl::COPY_WRITE_BUFFER, dst.id);
        gl::CopyBufferSubData(
            gl::COPY_READ_BUFFER,
            gl::COPY_WRITE_BUFFER,
            src_offset as GLintptr,
            dst_offset as GLintptr,
            len as GLsizeiptr,
        );
        check()
    }

    unsafe fn delete_buffer(&mut self, handle: GpuBufferHandle) -> Result<()> {
        let buffer = self
            .buffers
            .free(handle)
            .ok_or_else(|| Error::HandleInvalid(format!("{}", handle)))?;

        for bound in self.state.bound_uniform_buffers.iter_mut() {
            if *bound == buffer.id {
                *bound = 0;
            }
        }

        // The driver may recycle the name, so no vertex array recorded for
        // this buffer can stay behind.
        for vao in self.vertex_arrays.evict_buffer(buffer.id) {
            gl::DeleteVertexArrays(1, &vao);
            if self.state.bound_vertex_array == Some(vao) {
                self.state.bound_vertex_array = None;
            }
        }

        gl::DeleteBuffers(1, &buffer.id);
        check()
    }

    unsafe fn create_texture(
        &mut self,
        handle: TextureHandle,
        params: &TextureParams,
        data: Option<&[u8]>,
    ) -> Result<()> {
        let mut id = 0;
        gl::GenTextures(1, &mut id);
        if id == 0 {
            return Err(Error::Allocation("Texture", "glGenTextures failed".into()));
        }

        Self::bind_texture(&mut self.state, 0, id)?;
        gl::PixelStorei(gl::UNPACK_ALIGNMENT, 1);

        let (internal, format, pixel_type) = types::texture_format(params.format, params.srgb);
        for level in 0..params.levels {
            let w = (params.dimensions.x >> level).max(1);
            let h = (params.dimensions.y >> level).max(1);

            let value = match data {
                Some(v) if level == 0 && !v.is_empty() => {
                    v.as_ptr() as *const ::std::os::raw::c_void
                }
                _ => ::std::ptr::null(),
            };

            gl::TexImage2D(
                gl::TEXTURE_2D,
                level as GLint,
                internal as GLint,
                w as GLsizei,
                h as GLsizei,
                0,
                format,
                pixel_type,
                value,
            );
        }

        if params.levels > 1 {
            gl::TexParameteri(gl::TEXTURE_2D, gl::TEXTURE_BASE_LEVEL, 0);
            gl::TexParameteri(
                gl::TEXTURE_2D,
                gl::TEXTURE_MAX_LEVEL,
                (params.levels - 1) as GLint,
            );
        }

        check()?;
        self.textures.create(handle, GLTextureData { id, params: *params });
        Ok(())
    }

    unsafe fn update_texture(
        &mut self,
        handle: TextureHandle,
        level: u32,
        region: TextureRegion,
        data: &[u8],
    ) -> Result<()> {
        let texture = *self
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

        // glTexSubImage2D reads the whole region from the slice.
        let len = params.format.size() as usize * region.size.x as usize * region.size.y as usize;
        if data.len() != len {
            return Err(Error::OutOfRange {
                offset: 0,
                end: data.len(),
                len,
            });
        }

        let (_, format, pixel_type) = types::texture_format(params.format, params.srgb);

        Self::bind_texture(&mut self.state, 0, texture.id)?;
        gl::PixelStorei(gl::UNPACK_ALIGNMENT, 1);
        gl::TexSubImage2D(
            gl::TEXTURE_2D,
            level as GLint,
            region.position.x as GLint,
            region.position.y as GLint,
            region.size.x as GLsizei,
            region.size.y as GLsizei,
            format,
            pixel_type,
            data.as_ptr() as *const ::std::os::raw::c_void,
        );
        check()
    }

    unsafe fn generate_mips(&mut self, handle: TextureHandle) -> Result<()> {
        let texture = *self
            .textures
            .get(handle)
            .ok_or_else(|| Error::HandleInvalid(format!("{}", handle)))?;

        Self::bind_texture(&mut self.state, 0, texture.id)?;
        gl::GenerateMipmap(gl::TEXTURE_2D);
        check()
    }

    unsafe fn delete_texture(&mut self, handle: TextureHandle) -> Result<()> {
        let texture = self
            .textures
            .free(handle)
            .ok_or_else(|| Error::HandleInvalid(format!("{}", handle)))?;

        for bound in self.state.bound_textures.iter_mut() {
            if *bound == texture.id {
                *bound = 0;
            }
        }

        gl::DeleteTextures(1, &texture.id);
        check()
    }

    unsafe fn create_sampler(
        &mut self,
        handle: SamplerHandle,
        params: &SamplerParams,
    ) -> Result<()> {
        let mut id = 0;
        gl::GenSamplers(1, &mut id);
        if id == 0 {
            return Err(Error::Allocation("Sampler", "glGenSamplers failed".into()));
        }

        let (u, v, w) = params.address;
        gl::SamplerParameteri(id, gl::TEXTURE_WRAP_S, GLenum::from(u) as GLint);
        gl::SamplerParameteri(id, gl::TEXTURE_WRAP_T, GLenum::from(v) as GLint);
        gl::SamplerParameteri(id, gl::TEXTURE_WRAP_R, GLenum::from(w) as GLint);
        gl::SamplerParameteri(
            id,
            gl::TEXTURE_MIN_FILTER,
            GLenum::from(params.min_filter) as GLint,
        );
        gl::SamplerParameteri(
            id,
            gl::TEXTURE_MAG_FILTER,
            GLenum::from(params.mag_filter) as GLint,
        );

        if u == SamplerAddress::Border || v == SamplerAddress::Border || w == SamplerAddress::Border
        {
            let border: [f32; 4] = params.border.into();
            gl::SamplerParameterfv(id, gl::TEXTURE_BORDER_COLOR, border.as_ptr());
        }

        check()?;
        self.samplers.create(handle, GLSamplerData { id });
        Ok(())
    }

    unsafe fn delete_sampler(&mut self, handle: SamplerHandle) -> Result<()> {
        let sampler = self
            .samplers
            .free(handle)
            .ok_or_else(|| Error::HandleInvalid(format!("{}", handle)))?;

        for bound in self.state.bound_samplers.iter_mut() {
            if *bound == sampler.id {
                *bound = 0;
            }
        }

        gl::DeleteSamplers(1, &sampler.id);
        check()
    }

    unsafe fn create_render_target(
        &mut self,
        handle: RenderTargetHandle,
        params: &RenderTargetParams,
    ) -> Result<()> {
        if params.colors.len() as u32 > self.capabilities.max_color_attachments {
            return Err(Error::FramebufferIncomplete(format!(
                "{} color attachments exceed the {} the driver supports",
                params.colors.len(),
                self.capabilities.max_color_attachments
            )));
        }

        let mut id = 0;
        gl::GenFramebuffers(1, &mut id);
        if id == 0 {
            return Err(Error::Allocation(
                "RenderTarget",
                "glGenFramebuffers failed".into(),
            ));
        }

        gl::BindFramebuffer(gl::FRAMEBUFFER, id);
        self.state.bound_framebuffer = None;

        let mut dimensions = None;
        for (i, attachment) in params.colors.iter().enumerate() {
            let texture = self
                .textures
                .get(*attachment)
                .ok_or_else(|| Error::HandleInvalid(format!("{}", attachment)))?;

            if !texture.params.format.is_color() {
                gl::DeleteFramebuffers(1, &id);
                return Err(Error::FramebufferIncomplete(format!(
                    "{} is not color-renderable",
                    attachment
                )));
            }

            if dimensions.is_some() && dimensions != Some(texture.params.dimensions) {
                gl::DeleteFramebuffers(1, &id);
                return Err(Error::FramebufferIncomplete(
                    "attachments have mismatched dimensions".into(),
                ));
            }

            dimensions = Some(texture.params.dimensions);
            gl::FramebufferTexture2D(
                gl::FRAMEBUFFER,
                gl::COLOR_ATTACHMENT0 + i as u32,
                gl::TEXTURE_2D,
                texture.id,
                0,
            );
        }

        if let Some(v) = params.depth_stencil {
            let texture = self
                .textures
                .get(v)
                .ok_or_else(|| Error::HandleInvalid(format!("{}", v)))?;

            if texture.params.format.is_color() {
                gl::DeleteFramebuffers(1, &id);
                return Err(Error::FramebufferIncomplete(format!(
                    "{} is not a depth format",
                    v
                )));
            }

            if dimensions.is_some() && dimensions != Some(texture.params.dimensions) {
                gl::DeleteFramebuffers(1, &id);
                return Err(Error::FramebufferIncomplete(
                    "attachments have mismatched dimensions".into(),
                ));
            }

            let point = match texture.params.format {
                TextureFormat::Depth24Stencil8 => gl::DEPTH_STENCIL_ATTACHMENT,
                _ => gl::DEPTH_ATTACHMENT,
            };

            gl::FramebufferTexture2D(gl::FRAMEBUFFER, point, gl::TEXTURE_2D, texture.id, 0);
        }

        let has_color = !params.colors.is_empty();
        if has_color {
            let attachments: Vec<GLenum> = (0..params.colors.len())
                .map(|i| gl::COLOR_ATTACHMENT0 + i as u32)
                .collect();
            gl::DrawBuffers(attachments.len() as GLsizei, attachments.as_ptr());
        } else {
            // Depth-only rendering: no color buffer to draw into or read
            // from.
            gl::DrawBuffer(gl::NONE);
            gl::ReadBuffer(gl::NONE);
        }

        let status = gl::CheckFramebufferStatus(gl::FRAMEBUFFER);
        if status != gl::FRAMEBUFFER_COMPLETE {
            gl::DeleteFramebuffers(1, &id);
            gl::BindFramebuffer(gl::FRAMEBUFFER, 0);

            let reason = match status {
                gl::FRAMEBUFFER_INCOMPLETE_ATTACHMENT => "an attachment is incomplete",
                gl::FRAMEBUFFER_INCOMPLETE_MISSING_ATTACHMENT => "no images are attached",
                gl::FRAMEBUFFER_UNSUPPORTED => {
                    "the combination of internal formats violates driver restrictions"
                }
                _ => "unknown",
            };
            return Err(Error::FramebufferIncomplete(reason.into()));
        }

        check()?;
        self.render_targets.create(handle, GLRenderTargetData { id });
        Ok(())
    }

    unsafe fn delete_render_target(&mut self, handle: RenderTargetHandle) -> Result<()> {
        let target = self
            .render_targets
            .free(handle)
            .ok_or_else(|| Error::HandleInvalid(format!("{}", handle)))?;

        if self.state.bound_framebuffer == Some(target.id) {
            gl::BindFramebuffer(gl::FRAMEBUFFER, 0);
            self.state.bound_framebuffer = Some(0);
        }

        gl::DeleteFramebuffers(1, &target.id);
        check()
    }

    unsafe fn create_shader(&mut self, handle: ShaderHandle, params: &ShaderParams) -> Result<()> {
        let stage = types::shader_stage(params.stage)?;

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

        let id = gl::CreateShader(stage);
        if id == 0 {
            return Err(Error::Allocation("Shader", "glCreateShader failed".into()));
        }

        let src = ::std::ffi::CString::new(params.source.as_bytes())
            .map_err(|_| Error::ShaderInvalid("source contains a nul byte".into()))?;
        gl::ShaderSource(id, 1, &src.as_ptr(), ::std::ptr::null());
        gl::CompileShader(id);

        let mut status = GLint::from(gl::FALSE);
        gl::GetShaderiv(id, gl::COMPILE_STATUS, &mut status);
        let compiled = status == GLint::from(gl::TRUE);

        let mut len = 0;
        gl::GetShaderiv(id, gl::INFO_LOG_LENGTH, &mut len);
        let log = if len > 1 {
            let mut buf = vec![0u8; len as usize];
            gl::GetShaderInfoLog(id, len, ::std::ptr::null_mut(), buf.as_mut_ptr() as *mut GLchar);
            buf.truncate(len as usize - 1);
            String::from_utf8_lossy(&buf).into_owned()
        } else {
            String::new()
        };

        if !compiled {
            warn!("{} failed to compile:\n{}", handle, log);
        }

        check()?;
        self.shaders.create(handle, GLShaderData { id, compiled, log });
        Ok(())
    }

    unsafe fn delete_shader(&mut self, handle: ShaderHandle) -> Result<()> {
        let shader = self
            .shaders
            .free(handle)
            .ok_or_else(|| Error::HandleInvalid(format!("{}", handle)))?;

        // Linked programs in the pipeline cache stay valid; GL keeps them
        // alive independently of their stages.
        gl::DeleteShader(shader.id);
        check()
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
        let mut key = [0; 5];
        let slots = [
            Some(params.stages.vertex),
            Some(params.stages.pixel),
            params.stages.geometry,
            params.stages.hull,
            params.stages.domain,
        ];

        for (i, slot) in slots.iter().enumerate() {
            if let Some(v) = slot {
                let shader = self
                    .shaders
                    .get(*v)
                    .ok_or_else(|| Error::HandleInvalid(format!("{}", v)))?;

                if !shader.compiled {
                    return Err(Error::ShaderInvalid(shader.log.clone()));
                }

                key[i] = shader.id;
            }
        }

        let program = self
            .pipeline_cache
            .get_or_create(key, || unsafe { Self::link_program(&key) })?;

        self.pipelines.create(
            handle,
            GLPipelineData {
                program,
                vertex_stage: key[0],
                state: params.state,
                primitive: params.primitive,
            },
        );
        Ok(())
    }

    unsafe fn delete_pipeline(&mut self, handle: PipelineHandle) -> Result<()> {
        // The linked program stays in the pipeline cache for reuse.
        self.pipelines
            .free(handle)
            .map(|_| ())
            .ok_or_else(|| Error::HandleInvalid(format!("{}", handle)))
    }

    unsafe fn clear(
        &mut self,
        render_target: Option<RenderTargetHandle>,
        flags: ClearFlags,
        color: Color,
        depth: f32,
        stencil: i32,
    ) -> Result<()> {
        let id = self.resolve_framebuffer(render_target)?;
        Self::bind_framebuffer(&mut self.state, id)?;

        let mut bits = 0;
        if flags.contains(ClearFlags::COLOR) {
            bits |= gl::COLOR_BUFFER_BIT;
            gl::ClearColor(color.r(), color.g(), color.b(), color.a());
        }

        if flags.contains(ClearFlags::DEPTH) {
            bits |= gl::DEPTH_BUFFER_BIT;
            gl::ClearDepth(f64::from(depth));
        }

        if flags.contains(ClearFlags::STENCIL) {
            bits |= gl::STENCIL_BUFFER_BIT;
            gl::ClearStencil(stencil);
        }

        if bits != 0 {
            gl::Clear(bits);
        }

        check()
    }

    unsafe fn draw(&mut self, state: &BoundState, first: u32, count: u32) -> Result<u32> {
        let primitive = self.apply(state)?;

        gl::DrawArrays(primitive.into(), first as GLint, count as GLsizei);
        check()?;
        Ok(primitive.assemble(count))
    }

    unsafe fn draw_indexed(
        &mut self,
        state: &BoundState,
        first: u32,
        count: u32,
        base_vertex: i32,
    ) -> Result<u32> {
        let binding = state
            .index_buffer
            .ok_or_else(|| Error::InvalidState("no index buffer is bound".into()))?;

        let ibo = self
            .buffers
            .get(binding.buffer)
            .map(|v| v.id)
            .ok_or_else(|| Error::HandleInvalid(format!("{}", binding.buffer)))?;

        let primitive = self.apply(state)?;

        // The element buffer binding is recorded into the vertex array, so
        // it has to happen after the vertex array is bound.
        gl::BindBuffer(gl::ELEMENT_ARRAY_BUFFER, ibo);

        let offset = first as usize * binding.format.stride();
        if base_vertex == 0 {
            gl::DrawElements(
                primitive.into(),
                count as GLsizei,
                binding.format.into(),
                offset as *const ::std::os::raw::c_void,
            );
        } else {
            gl::DrawElementsBaseVertex(
                primitive.into(),
                count as GLsizei,
                binding.format.into(),
                offset as *const ::std::os::raw::c_void,
                base_vertex,
            );
        }

        check()?;
        Ok(primitive.assemble(count))
    }

    fn pipelines_len(&self) -> usize {
        self.pipeline_cache.len()
    }

    fn vertex_arrays_len(&self) -> usize {
        self.vertex_arrays.len()
    }
}

impl GLVisitor {
    /// Applies the bound state, diffing every field against the last applied
    /// native state. Returns the primitive topology of the bound pipeline.
    unsafe fn apply(&mut self, state: &BoundState) -> Result<Primitive> {
        let framebuffer = self.resolve_framebuffer(state.render_target)?;
        Self::bind_framebuffer(&mut self.state, framebuffer)?;

        if let Some(vp) = state.viewport {
            Self::set_viewport(&mut self.state, vp)?;
        }

        let pipeline_handle = state
            .pipeline
            .ok_or_else(|| Error::InvalidState("no pipeline is bound".into()))?;
        let pipeline = *self
            .pipelines
            .get(pipeline_handle)
            .ok_or_else(|| Error::HandleInvalid(format!("{}", pipeline_handle)))?;

        Self::bind_program(&mut self.state, pipeline.program)?;

        let rs = pipeline.state;
        Self::set_cull_face(&mut self.state, rs.cull_face)?;
        Self::set_front_face_order(&mut self.state, rs.front_face_order)?;
        Self::set_depth_test(&mut self.state, rs.depth_write, rs.depth_test)?;
        Self::set_depth_write_offset(&mut self.state, rs.depth_write_offset)?;
        Self::set_color_blend(&mut self.state, rs.color_blend)?;
        Self::set_color_write(&mut self.state, rs.color_write)?;

        let mut bindings: [Option<(GLuint, VertexLayout)>; MAX_VERTEX_BUFFER_SLOTS] =
            [None; MAX_VERTEX_BUFFER_SLOTS];
        let mut slots = [0; MAX_VERTEX_BUFFER_SLOTS];
        for (i, binding) in state.vertex_buffers.iter().enumerate() {
            if let Some(v) = binding {
                let id = self
                    .buffers
                    .get(v.buffer)
                    .map(|buffer| buffer.id)
                    .ok_or_else(|| Error::HandleInvalid(format!("{}", v.buffer)))?;

                bindings[i] = Some((id, v.layout));
                slots[i] = id;
            }
        }

        let vao = self
            .vertex_arrays
            .get_or_create((pipeline.vertex_stage, slots), || unsafe {
                Self::record_vertex_array(&bindings)
            })?;
        Self::bind_vertex_array(&mut self.state, vao)?;

        for slot in 0..MAX_TEXTURE_SLOTS {
            let texture = match state.textures[slot] {
                Some(v) => self
                    .textures
                    .get(v)
                    .map(|t| t.id)
                    .ok_or_else(|| Error::HandleInvalid(format!("{}", v)))?,
                None => 0,
            };
            Self::bind_texture(&mut self.state, slot, texture)?;

            let sampler = match state.samplers[slot] {
                Some(v) => self
                    .samplers
                    .get(v)
                    .map(|s| s.id)
                    .ok_or_else(|| Error::HandleInvalid(format!("{}", v)))?,
                None => 0,
            };
            Self::bind_sampler(&mut self.state, slot, sampler)?;
        }

        for slot in 0..MAX_CONSTANT_BUFFER_SLOTS {
            let id = match state.constant_buffers[slot] {
                Some(v) => self
                    .buffers
                    .get(v)
                    .map(|buffer| buffer.id)
                    .ok_or_else(|| Error::HandleInvalid(format!("{}", v)))?,
                None => 0,
            };

            if self.state.bound_uniform_buffers[slot] != id {
                gl::BindBufferBase(gl::UNIFORM_BUFFER, slot as GLuint, id);
                self.state.bound_uniform_buffers[slot] = id;
            }
        }

        Ok(pipeline.primitive)
    }

    fn resolve_framebuffer(&self, handle: Option<RenderTargetHandle>) -> Result<GLuint> {
        match handle {
            Some(v) => self
                .render_targets
                .get(v)
                .map(|target| target.id)
                .ok_or_else(|| Error::HandleInvalid(format!("{}", v))),
            None => Ok(0),
        }
    }

    /// Links the shader stages into a program, with the vertex semantics
    /// bound to their fixed attribute locations and uniform blocks bound to
    /// their indices.
    unsafe fn link_program(stages: &[GLuint; 5]) -> Result<GLuint> {
        let program = gl::CreateProgram();
        if program == 0 {
            return Err(Error::Allocation("Pipeline", "glCreateProgram failed".into()));
        }

        for stage in stages.iter().filter(|v| **v != 0) {
            gl::AttachShader(program, *stage);
        }

        let semantics = [
            VertexSemantic::Position,
            VertexSemantic::Normal,
            VertexSemantic::Tangent,
            VertexSemantic::Bitangent,
            VertexSemantic::Texcoord0,
            VertexSemantic::Texcoord1,
            VertexSemantic::Color0,
            VertexSemantic::Color1,
        ];
        for semantic in &semantics {
            let name = ::std::ffi::CString::new(semantic.name())
                .map_err(|_| Error::Driver("attribute name contains a nul byte".into()))?;
            gl::BindAttribLocation(program, semantic.location(), name.as_ptr());
        }

        gl::LinkProgram(program);

        let mut status = GLint::from(gl::FALSE);
        gl::GetProgramiv(program, gl::LINK_STATUS, &mut status);
        if status != GLint::from(gl::TRUE) {
            let mut len = 0;
            gl::GetProgramiv(program, gl::INFO_LOG_LENGTH, &mut len);
            let log = if len > 1 {
                let mut buf = vec![0u8; len as usize];
                gl::GetProgramInfoLog(
                    program,
                    len,
                    ::std::ptr::null_mut(),
                    buf.as_mut_ptr() as *mut GLchar,
                );
                buf.truncate(len as usize - 1);
                String::from_utf8_lossy(&buf).into_owned()
            } else {
                String::new()
            };

            gl::DeleteProgram(program);
            return Err(Error::ShaderInvalid(log));
        }

        let mut blocks = 0;
        gl::GetProgramiv(program, gl::ACTIVE_UNIFORM_BLOCKS, &mut blocks);
        for i in 0..blocks as u32 {
            gl::UniformBlockBinding(program, i, i);
        }

        check()?;
        Ok(program)
    }

    /// Records a vertex array for one buffer set: every attribute of every
    /// bound layout is sourced from its slot's buffer at the fixed location
    /// of its semantic.
    unsafe fn record_vertex_array(
        bindings: &[Option<(GLuint, VertexLayout)>; MAX_VERTEX_BUFFER_SLOTS],
    ) -> Result<GLuint> {
        let mut vao = 0;
        gl::GenVertexArrays(1, &mut vao);
        if vao == 0 {
            return Err(Error::Allocation(
                "VertexArray",
                "glGenVertexArrays failed".into(),
            ));
        }

        gl::BindVertexArray(vao);

        for binding in bindings.iter() {
            if let Some((id, layout)) = binding {
                gl::BindBuffer(gl::ARRAY_BUFFER, *id);

                for (element, offset) in layout.iter() {
                    let location = element.semantic.location();
                    gl::EnableVertexAttribArray(location);
                    gl::VertexAttribPointer(
                        location,
                        GLsizei::from(element.size),
                        element.format.into(),
                        element.normalized as u8,
                        GLsizei::from(layout.stride()),
                        offset as usize as *const ::std::os::raw::c_void,
                    );
                }
            }
        }

        check()?;
        Ok(vao)
    }
}

impl GLVisitor {
    unsafe fn reset_render_state(state: &mut GLMutableState) -> Result<()> {
        gl::Disable(gl::CULL_FACE);
        state.render_state.cull_face = CullFace::Nothing;

        gl::FrontFace(gl::CCW);
        state.render_state.front_face_order = FrontFaceOrder::CounterClockwise;

        gl::Disable(gl::DEPTH_TEST);
        gl::DepthMask(gl::FALSE);
        state.render_state.depth_write = false;
        gl::DepthFunc(gl::ALWAYS);
        state.render_state.depth_test = Comparison::Always;
        gl::Disable(gl::POLYGON_OFFSET_FILL);
        state.render_state.depth_write_offset = None;

        gl::Disable(gl::BLEND);
        state.render_state.color_blend = None;

        gl::ColorMask(1, 1, 1, 1);
        state.render_state.color_write = (true, true, true, true);

        gl::PixelStorei(gl::UNPACK_ALIGNMENT, 1);
        gl::BindFramebuffer(gl::FRAMEBUFFER, 0);
        state.bound_framebuffer = Some(0);

        check()
    }

    unsafe fn bind_framebuffer(state: &mut GLMutableState, id: GLuint) -> Result<()> {
        if state.bound_framebuffer != Some(id) {
            gl::BindFramebuffer(gl::FRAMEBUFFER, id);
            state.bound_framebuffer = Some(id);
            check()?;
        }

        Ok(())
    }

    unsafe fn bind_program(state: &mut GLMutableState, program: GLuint) -> Result<()> {
        if state.bound_program != Some(program) {
            gl::UseProgram(program);
            state.bound_program = Some(program);
            check()?;
        }

        Ok(())
    }

    unsafe fn bind_vertex_array(state: &mut GLMutableState, vao: GLuint) -> Result<()> {
        if state.bound_vertex_array != Some(vao) {
            gl::BindVertexArray(vao);
            state.bound_vertex_array = Some(vao);
            check()?;
        }

        Ok(())
    }

    unsafe fn bind_texture(state: &mut GLMutableState, unit: usize, id: GLuint) -> Result<()> {
        if state.bound_textures[unit] != id {
            if state.bound_texture_unit != unit {
                gl::ActiveTexture(gl::TEXTURE0 + unit as GLuint);
                state.bound_texture_unit = unit;
            }

            gl::BindTexture(gl::TEXTURE_2D, id);
            state.bound_textures[unit] = id;
            check()?;
        }

        Ok(())
    }

    unsafe fn bind_sampler(state: &mut GLMutableState, unit: usize, id: GLuint) -> Result<()> {
        if state.bound_samplers[unit] != id {
            gl::BindSampler(unit as GLuint, id);
            state.bound_samplers[unit] = id;
            check()?;
        }

        Ok(())
    }

    /// Specify whether front- or back-facing polygons can be culled.
    unsafe fn set_cull_face(state: &mut GLMutableState, face: CullFace) -> Result<()> {
        let rs = &mut state.render_state;

        if rs.cull_face != face {
            if face != CullFace::Nothing {
                gl::Enable(gl::CULL_FACE);
                gl::CullFace(match face {
                    CullFace::Front => gl::FRONT,
                    CullFace::Back => gl::BACK,
                    CullFace::Nothing => unreachable!(""),
                });
            } else {
                gl::Disable(gl::CULL_FACE);
            }

            rs.cull_face = face;
            check()?;
        }

        Ok(())
    }

    /// Define front- and back-facing polygons.
    unsafe fn set_front_face_order(
        state: &mut GLMutableState,
        front: FrontFaceOrder,
    ) -> Result<()> {
        let rs = &mut state.render_state;

        if rs.front_face_order != front {
            gl::FrontFace(match front {
                FrontFaceOrder::Clockwise => gl::CW,
                FrontFaceOrder::CounterClockwise => gl::CCW,
            });

            rs.front_face_order = front;
            check()?;
        }

        Ok(())
    }

    /// Enable or disable writing into the depth buffer and specify the value
    /// used for depth buffer comparisons.
    unsafe fn set_depth_test(
        state: &mut GLMutableState,
        write: bool,
        comparison: Comparison,
    ) -> Result<()> {
        let rs = &mut state.render_state;

        // Note that even if the depth buffer exists and the depth mask is
        // non-zero, the depth buffer is not updated if the depth test is
        // disabled.
        let enable = comparison != Comparison::Always || write;
        let last_enable = rs.depth_test != Comparison::Always || rs.depth_write;
        if enable != last_enable {
            if enable {
                gl::Enable(gl::DEPTH_TEST);
            } else {
                gl::Disable(gl::DEPTH_TEST);
            }
        }

        if rs.depth_write != write {
            if write {
                gl::DepthMask(gl::TRUE);
            } else {
                gl::DepthMask(gl::FALSE);
            }

            rs.depth_write = write;
        }

        if rs.depth_test != comparison {
            gl::DepthFunc(comparison.into());
            rs.depth_test = comparison;
        }

        check()
    }

    /// Set `offset` to address the scale and units used to calculate depth
    /// values.
    unsafe fn set_depth_write_offset(
        state: &mut GLMutableState,
        offset: Option<(f32, f32)>,
    ) -> Result<()> {
        let rs = &mut state.render_state;

        if rs.depth_write_offset != offset {
            if let Some(v) = offset {
                if v.0 != 0.0 || v.1 != 0.0 {
                    gl::Enable(gl::POLYGON_OFFSET_FILL);
                    gl::PolygonOffset(v.0, v.1);
                } else {
                    gl::Disable(gl::POLYGON_OFFSET_FILL);
                }
            }

            rs.depth_write_offset = offset;
            check()?;
        }

        Ok(())
    }

    /// Specifies how source and destination are combined.
    unsafe fn set_color_blend(
        state: &mut GLMutableState,
        blend: Option<(Equation, BlendFactor, BlendFactor)>,
    ) -> Result<()> {
        let rs = &mut state.render_state;

        if rs.color_blend != blend {
            if let Some((equation, src, dst)) = blend {
                if rs.color_blend == None {
                    gl::Enable(gl::BLEND);
                }

                gl::BlendFunc(src.into(), dst.into());
                gl::BlendEquation(equation.into());
            } else if rs.color_blend != None {
                gl::Disable(gl::BLEND);
            }

            rs.color_blend = blend;
            check()?;
        }

        Ok(())
    }

    /// Enable or disable writing color elements into the color buffer.
    unsafe fn set_color_write(
        state: &mut GLMutableState,
        mask: (bool, bool, bool, bool),
    ) -> Result<()> {
        let rs = &mut state.render_state;

        if rs.color_write != mask {
            rs.color_write = mask;
            gl::ColorMask(mask.0 as u8, mask.1 as u8, mask.2 as u8, mask.3 as u8);
            check()?;
        }

        Ok(())
    }

    /// Set the viewport relative to the bottom-left corner of the target,
    /// in pixels.
    unsafe fn set_viewport(state: &mut GLMutableState, vp: Viewport) -> Result<()> {
        if state.viewport != Some(vp) {
            gl::Viewport(
                vp.position.x,
                vp.position.y,
                vp.size.x as i32,
                vp.size.y as i32,
            );

            state.viewport = Some(vp);
            check()?;
        }

        Ok(())
    }
}

impl Drop for GLVisitor {
    fn drop(&mut self) {
        // Cached programs and vertex arrays outlive the handles that created
        // them, so they are torn down with the backend itself.
        unsafe {
            for program in self.pipeline_cache.values() {
                gl::DeleteProgram(program);
            }

            for vao in self.vertex_arrays.values() {
                gl::DeleteVertexArrays(1, &vao);
            }
        }
    }
}

unsafe fn check_capabilities(caps: &Capabilities) -> Result<()> {
    // GL and ES versions are incomparable, so every gate spells out both
    // bounds; `>=` is false across the API split.
    let v = caps.version;

    if !(v >= Version::GL(3, 0)) && !(v >= Version::ES(3, 0)) {
        return Err(Error::Driver(
            "the OpenGL implementation does not support buffer mapping, vertex array \
             objects and framebuffer objects (3.0 is required)"
                .into(),
        ));
    }

    if !(v >= Version::GL(3, 1))
        && !(v >= Version::ES(3, 0))
        && (!caps.extensions.gl_arb_copy_buffer || !caps.extensions.gl_arb_uniform_buffer_object)
    {
        return Err(Error::Driver(
            "the OpenGL implementation does not support buffer copies and uniform \
             buffer objects"
                .into(),
        ));
    }

    if !(v >= Version::GL(3, 2))
        && !(v >= Version::ES(3, 2))
        && !caps.extensions.gl_arb_draw_elements_base_vertex
    {
        return Err(Error::Driver(
            "the OpenGL implementation does not support base-vertex indexed draws".into(),
        ));
    }

    if !(v >= Version::GL(3, 3))
        && !(v >= Version::ES(3, 0))
        && !caps.extensions.gl_arb_sampler_objects
    {
        return Err(Error::Driver(
            "the OpenGL implementation does not support sampler objects".into(),
        ));
    }

    Ok(())
}

/// Reports errors the driver recorded for the calls issued so far. Compiled
/// down to a no-op outside debug builds.
unsafe fn check() -> Result<()> {
    if !cfg!(debug_assertions) {
        return Ok(());
    }

    match gl::GetError() {
        gl::NO_ERROR => Ok(()),

        gl::INVALID_ENUM => Err(Error::Driver(
            "an unacceptable value is specified for an enumerated argument".into(),
        )),

        gl::INVALID_VALUE => Err(Error::Driver("a numeric argument is out of range".into())),

        gl::INVALID_OPERATION => Err(Error::Driver(
            "the specified operation is not allowed in the current state".into(),
        )),

        gl::INVALID_FRAMEBUFFER_OPERATION => Err(Error::Driver(
            "the command is trying to render to or read from the framebuffer while \
             the currently bound framebuffer is not framebuffer complete"
                .into(),
        )),

        gl::OUT_OF_MEMORY => Err(Error::Driver(
            "there is not enough memory left to execute the command".into(),
        )),

        _ => Err(Error::Driver("unknown OpenGL error".into())),
    }
}
