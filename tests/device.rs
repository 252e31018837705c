use cgmath::Vector2;
use rand::RngCore;

use radiant::prelude::*;

fn headless() -> RenderDevice {
    let _ = env_logger::try_init();
    RenderDevice::headless()
}

fn glsl(stage: ShaderStage) -> ShaderParams {
    ShaderParams::new(stage, ShaderLanguage::Glsl, "void main() {}", "main")
}

fn layout() -> VertexLayout {
    VertexLayout::build()
        .with(VertexSemantic::Position, VertexFormat::Float, 2, false)
        .finish()
}

fn pipeline(device: &mut RenderDevice) -> PipelineHandle {
    let vs = device.create_shader(glsl(ShaderStage::Vertex)).unwrap();
    let ps = device.create_shader(glsl(ShaderStage::Pixel)).unwrap();
    device
        .create_pipeline(PipelineParams::new(PipelineStages::new(vs, ps)))
        .unwrap()
}

fn vertices(device: &mut RenderDevice, count: usize) -> VertexBufferHandle {
    let params = VertexBufferParams {
        layout: layout(),
        count,
        usage: BufferUsage::Default,
    };
    device.create_vertex_buffer(params, None).unwrap()
}

#[test]
fn buffer_round_trip() {
    let mut device = headless();

    let params = GpuBufferParams {
        len: 256,
        usage: BufferUsage::Dynamic,
        access: BufferAccess::READ_WRITE,
    };
    let buffer = device.create_buffer(params, None).unwrap();

    let mut src = vec![0; 256];
    rand::thread_rng().fill_bytes(&mut src);
    device
        .write_buffer(buffer, 0, &src, MapAccess::WriteDiscardAll)
        .unwrap();

    let mut dst = vec![0; 256];
    device.read_buffer(buffer, 0, &mut dst).unwrap();
    assert_eq!(src, dst);

    // Partial writes at an offset only touch the addressed range.
    device
        .write_buffer(buffer, 128, &[0xAB; 4], MapAccess::WriteDiscardRange)
        .unwrap();

    let mut dst = vec![0; 8];
    device.read_buffer(buffer, 126, &mut dst).unwrap();
    assert_eq!(dst[..2], src[126..128]);
    assert_eq!(dst[2..6], [0xAB; 4]);
    assert_eq!(dst[6..], src[132..134]);
}

#[test]
fn buffer_initial_data() {
    let mut device = headless();

    let params = GpuBufferParams {
        len: 8,
        usage: BufferUsage::Default,
        access: BufferAccess::READ_WRITE,
    };
    let buffer = device.create_buffer(params, Some(&[1, 2, 3, 4])).unwrap();

    // Bytes past the initial data are zero-filled.
    let mut dst = vec![0xFF; 8];
    device.read_buffer(buffer, 0, &mut dst).unwrap();
    assert_eq!(dst, [1, 2, 3, 4, 0, 0, 0, 0]);

    // Initial data longer than the buffer is rejected up front.
    assert!(device.create_buffer(params, Some(&[0; 9])).is_err());
}

#[test]
fn buffer_rejects_out_of_range() {
    let mut device = headless();

    let params = GpuBufferParams {
        len: 16,
        usage: BufferUsage::Default,
        access: BufferAccess::READ_WRITE,
    };
    let buffer = device.create_buffer(params, None).unwrap();

    let err = device
        .write_buffer(buffer, 12, &[0xCD; 8], MapAccess::WriteDiscardRange)
        .unwrap_err();
    match err {
        Error::OutOfRange { offset, end, len } => {
            assert_eq!((offset, end, len), (12, 20, 16));
        }
        other => panic!("unexpected error: {}", other),
    }

    // The rejected write must not have touched a single byte.
    let mut dst = vec![0xFF; 16];
    device.read_buffer(buffer, 0, &mut dst).unwrap();
    assert_eq!(dst, [0; 16]);

    let mut dst = vec![0; 4];
    assert!(device.read_buffer(buffer, 14, &mut dst).is_err());
}

#[test]
fn buffer_access_is_enforced() {
    let mut device = headless();

    let write_only = device
        .create_buffer(
            GpuBufferParams {
                len: 16,
                usage: BufferUsage::Default,
                access: BufferAccess::WRITE,
            },
            None,
        )
        .unwrap();

    let mut dst = vec![0; 4];
    match device.read_buffer(write_only, 0, &mut dst).unwrap_err() {
        Error::InvalidState(_) => {}
        other => panic!("unexpected error: {}", other),
    }

    let read_only = device
        .create_buffer(
            GpuBufferParams {
                len: 16,
                usage: BufferUsage::Default,
                access: BufferAccess::READ,
            },
            None,
        )
        .unwrap();

    match device
        .write_buffer(read_only, 0, &[1], MapAccess::WriteDiscardRange)
        .unwrap_err()
    {
        Error::InvalidState(_) => {}
        other => panic!("unexpected error: {}", other),
    }

    // A read-only mapping is not a way to write.
    match device
        .write_buffer(write_only, 0, &[1], MapAccess::ReadOnly)
        .unwrap_err()
    {
        Error::InvalidState(_) => {}
        other => panic!("unexpected error: {}", other),
    }
}

#[test]
fn buffer_copies_on_device() {
    let mut device = headless();

    let params = GpuBufferParams {
        len: 8,
        usage: BufferUsage::Default,
        access: BufferAccess::READ_WRITE,
    };
    let src = device
        .create_buffer(params, Some(&[9, 8, 7, 6, 5, 4, 3, 2]))
        .unwrap();
    let dst = device.create_buffer(params, None).unwrap();

    device.copy_buffer(src, dst, 2, 4, 4).unwrap();

    let mut out = vec![0; 8];
    device.read_buffer(dst, 0, &mut out).unwrap();
    assert_eq!(out, [0, 0, 0, 0, 7, 6, 5, 4]);

    assert!(device.copy_buffer(src, dst, 6, 0, 4).is_err());
    assert!(device.copy_buffer(src, dst, 0, 6, 4).is_err());
}

#[test]
fn buffer_rejects_zero_length() {
    let mut device = headless();
    match device
        .create_buffer(GpuBufferParams::default(), None)
        .unwrap_err()
    {
        Error::Allocation(kind, _) => assert_eq!(kind, "GpuBuffer"),
        other => panic!("unexpected error: {}", other),
    }
}

#[test]
fn deleted_buffer_rejects_stale_handles() {
    let mut device = headless();

    let params = GpuBufferParams {
        len: 16,
        usage: BufferUsage::Default,
        access: BufferAccess::READ_WRITE,
    };
    let buffer = device.create_buffer(params, None).unwrap();
    device.delete_buffer(buffer).unwrap();

    assert!(device.delete_buffer(buffer).is_err());
    assert!(device
        .write_buffer(buffer, 0, &[1], MapAccess::WriteDiscardRange)
        .is_err());

    // The recycled slot hands out a fresh version, so the stale handle
    // stays dead.
    let again = device.create_buffer(params, None).unwrap();
    assert_ne!(buffer, again);
    let mut dst = vec![0; 1];
    assert!(device.read_buffer(buffer, 0, &mut dst).is_err());
}

#[test]
fn typed_buffers_derive_their_extent() {
    let mut device = headless();

    // 64 vertices of 8 bytes each.
    let vb = vertices(&mut device, 64);
    assert!(device.update_vertex_buffer(vb, 0, &[0; 512]).is_ok());
    assert!(device.update_vertex_buffer(vb, 8, &[0; 512]).is_err());

    let ib = device
        .create_index_buffer(
            IndexBufferParams {
                format: IndexFormat::U16,
                count: 6,
                usage: BufferUsage::Default,
            },
            None,
        )
        .unwrap();
    assert!(device.update_index_buffer(ib, 0, &[0; 12]).is_ok());
    assert!(device.update_index_buffer(ib, 0, &[0; 13]).is_err());

    let cb = device
        .create_constant_buffer(
            ConstantBufferParams {
                stride: 64,
                count: 4,
                usage: BufferUsage::Stream,
            },
            None,
        )
        .unwrap();
    assert!(device.update_constant_buffer(cb, 3, &[0; 64]).is_ok());

    // A block never spills into its neighbour.
    match device.update_constant_buffer(cb, 0, &[0; 65]).unwrap_err() {
        Error::OutOfRange { len, .. } => assert_eq!(len, 64),
        other => panic!("unexpected error: {}", other),
    }

    // The last block is still bounded by the buffer extent.
    assert!(device.update_constant_buffer(cb, 4, &[0; 64]).is_err());
}

#[test]
fn constant_buffer_rejects_zero_stride() {
    let mut device = headless();
    let params = ConstantBufferParams {
        stride: 0,
        count: 4,
        usage: BufferUsage::Default,
    };
    assert!(device.create_constant_buffer(params, None).is_err());
}

#[test]
fn draw_requires_pipeline_and_vertices() {
    let mut device = headless();

    match device.draw(0, 3).unwrap_err() {
        Error::InvalidState(reason) => assert_eq!(reason, "no pipeline is bound"),
        other => panic!("unexpected error: {}", other),
    }

    let pso = pipeline(&mut device);
    device.set_pipeline(pso).unwrap();

    match device.draw(0, 3).unwrap_err() {
        Error::InvalidState(reason) => assert_eq!(reason, "no vertex buffer is bound"),
        other => panic!("unexpected error: {}", other),
    }

    let vb = vertices(&mut device, 3);
    device.set_vertex_buffer(0, vb).unwrap();
    assert!(device.draw(0, 3).is_ok());

    match device.draw_indexed(0, 3, 0).unwrap_err() {
        Error::InvalidState(reason) => assert_eq!(reason, "no index buffer is bound"),
        other => panic!("unexpected error: {}", other),
    }

    let ib = device
        .create_index_buffer(
            IndexBufferParams {
                format: IndexFormat::U16,
                count: 3,
                usage: BufferUsage::Default,
            },
            None,
        )
        .unwrap();
    device.set_index_buffer(ib).unwrap();
    assert!(device.draw_indexed(0, 3, 0).is_ok());
}

#[test]
fn draw_statistics_accumulate_per_frame() {
    let mut device = headless();

    let pso = pipeline(&mut device);
    let vb = vertices(&mut device, 6);
    device.set_pipeline(pso).unwrap();
    device.set_vertex_buffer(0, vb).unwrap();

    assert_eq!(device.draw(0, 6).unwrap(), 2);
    assert_eq!(device.draw(0, 3).unwrap(), 1);

    let info = device.advance();
    assert_eq!(info.draw_calls, 2);
    assert_eq!(info.primitives, 3);

    // `advance` resets the frame counters but not the bindings.
    let info = device.info();
    assert_eq!(info.draw_calls, 0);
    assert_eq!(info.primitives, 0);
    assert!(device.draw(0, 3).is_ok());
}

#[test]
fn pipelines_with_identical_stages_share_one_native_object() {
    let mut device = headless();

    let vs = device.create_shader(glsl(ShaderStage::Vertex)).unwrap();
    let ps = device.create_shader(glsl(ShaderStage::Pixel)).unwrap();

    let mut params = PipelineParams::new(PipelineStages::new(vs, ps));
    let first = device.create_pipeline(params).unwrap();

    // A differing render state does not break the structural identity.
    params.state.cull_face = CullFace::Back;
    let second = device.create_pipeline(params).unwrap();

    assert_ne!(first, second);
    let info = device.info();
    assert_eq!(info.pipelines, 2);
    assert_eq!(info.cached_pipelines, 1);

    // A different stage set links a new native object.
    let ps2 = device.create_shader(glsl(ShaderStage::Pixel)).unwrap();
    device
        .create_pipeline(PipelineParams::new(PipelineStages::new(vs, ps2)))
        .unwrap();
    assert_eq!(device.info().cached_pipelines, 2);
}

#[test]
fn pipeline_cache_survives_deletion() {
    let mut device = headless();

    let vs = device.create_shader(glsl(ShaderStage::Vertex)).unwrap();
    let ps = device.create_shader(glsl(ShaderStage::Pixel)).unwrap();
    let params = PipelineParams::new(PipelineStages::new(vs, ps));

    let pso = device.create_pipeline(params).unwrap();
    device.delete_pipeline(pso).unwrap();
    assert_eq!(device.info().cached_pipelines, 1);

    // Re-creating the same combination reuses the cached entry.
    device.create_pipeline(params).unwrap();
    assert_eq!(device.info().cached_pipelines, 1);
}

#[test]
fn vertex_arrays_are_cached_per_buffer_set() {
    let mut device = headless();

    let pso = pipeline(&mut device);
    let a = vertices(&mut device, 3);
    let b = vertices(&mut device, 3);

    device.set_pipeline(pso).unwrap();
    device.set_vertex_buffer(0, a).unwrap();
    device.draw(0, 3).unwrap();
    assert_eq!(device.info().cached_vertex_arrays, 1);

    device.set_vertex_buffer(0, b).unwrap();
    device.draw(0, 3).unwrap();
    assert_eq!(device.info().cached_vertex_arrays, 2);

    // Re-binding a seen buffer set hits the cache.
    device.set_vertex_buffer(0, a).unwrap();
    device.draw(0, 3).unwrap();
    assert_eq!(device.info().cached_vertex_arrays, 2);

    // A second slot changes the set.
    device.set_vertex_buffer(1, b).unwrap();
    device.draw(0, 3).unwrap();
    assert_eq!(device.info().cached_vertex_arrays, 3);
}

#[test]
fn vertex_buffer_slots_are_bounded() {
    let mut device = headless();
    let vb = vertices(&mut device, 3);

    assert!(device.set_vertex_buffer(3, vb).is_ok());
    assert!(device.set_vertex_buffer(4, vb).is_err());
}

#[test]
fn shader_construction_rules() {
    let mut device = headless();

    // Structural validation.
    let params = ShaderParams::new(ShaderStage::Vertex, ShaderLanguage::Glsl, "", "main");
    match device.create_shader(params).unwrap_err() {
        Error::ShaderInvalid(_) => {}
        other => panic!("unexpected error: {}", other),
    }

    // Backend construction rules.
    let params = ShaderParams::new(ShaderStage::Vertex, ShaderLanguage::Hlsl, "float4", "main");
    match device.create_shader(params).unwrap_err() {
        Error::ShaderInvalid(_) => {}
        other => panic!("unexpected error: {}", other),
    }

    let params = ShaderParams::new(
        ShaderStage::Vertex,
        ShaderLanguage::Glsl,
        "void start() {}",
        "start",
    );
    match device.create_shader(params).unwrap_err() {
        Error::ShaderInvalid(_) => {}
        other => panic!("unexpected error: {}", other),
    }

    match device.create_shader(glsl(ShaderStage::Hull)).unwrap_err() {
        Error::UnsupportedEnum(name, _) => assert_eq!(name, "ShaderStage::Hull"),
        other => panic!("unexpected error: {}", other),
    }

    // A failed creation leaves nothing behind.
    assert_eq!(device.info().shaders, 0);

    let vs = device.create_shader(glsl(ShaderStage::Vertex)).unwrap();
    assert_eq!(device.is_shader_compiled(vs).unwrap(), true);
    assert_eq!(device.shader_log(vs).unwrap(), "");
}

#[test]
fn pipeline_rejects_mismatched_stage_roles() {
    let mut device = headless();

    let vs = device.create_shader(glsl(ShaderStage::Vertex)).unwrap();
    let ps = device.create_shader(glsl(ShaderStage::Pixel)).unwrap();

    // Pixel shader in the vertex slot.
    match device
        .create_pipeline(PipelineParams::new(PipelineStages::new(ps, vs)))
        .unwrap_err()
    {
        Error::ShaderInvalid(_) => {}
        other => panic!("unexpected error: {}", other),
    }

    let mut stages = PipelineStages::new(vs, ps);
    stages.geometry = Some(ps);
    match device
        .create_pipeline(PipelineParams::new(stages))
        .unwrap_err()
    {
        Error::ShaderInvalid(_) => {}
        other => panic!("unexpected error: {}", other),
    }

    assert_eq!(device.info().pipelines, 0);
}

#[test]
fn render_target_attachment_rules() {
    let mut device = headless();

    let color = device
        .create_texture(
            TextureParams {
                dimensions: Vector2::new(128, 128),
                ..Default::default()
            },
            None,
        )
        .unwrap();

    let depth = device
        .create_texture(
            TextureParams {
                format: TextureFormat::Depth24,
                usage: TextureUsage::Depth,
                dimensions: Vector2::new(128, 128),
                ..Default::default()
            },
            None,
        )
        .unwrap();

    let mut params = RenderTargetParams::default();
    params.colors.push(color);
    params.depth_stencil = Some(depth);
    let rt = device.create_render_target(params).unwrap();

    device.set_render_target(Some(rt)).unwrap();
    device
        .clear(ClearFlags::COLOR | ClearFlags::DEPTH, Color::black(), 1.0, 0)
        .unwrap();

    // Depth-only targets are a supported configuration.
    let mut params = RenderTargetParams::default();
    params.depth_stencil = Some(depth);
    assert!(device.create_render_target(params).is_ok());

    // No attachments at all is not.
    match device
        .create_render_target(RenderTargetParams::default())
        .unwrap_err()
    {
        Error::FramebufferIncomplete(_) => {}
        other => panic!("unexpected error: {}", other),
    }

    // A depth texture can not fill a color slot.
    let mut params = RenderTargetParams::default();
    params.colors.push(depth);
    match device.create_render_target(params).unwrap_err() {
        Error::FramebufferIncomplete(_) => {}
        other => panic!("unexpected error: {}", other),
    }

    // Deleting the bound target drops it from the bound state.
    device.delete_render_target(rt).unwrap();
    assert!(device.set_render_target(Some(rt)).is_err());
    assert!(device
        .clear(ClearFlags::ALL, Color::black(), 1.0, 0)
        .is_ok());
}

#[test]
fn texture_construction_and_updates() {
    let mut device = headless();

    // Depth usage over a color format is rejected up front.
    let err = device
        .create_texture(
            TextureParams {
                format: TextureFormat::Rgba8,
                usage: TextureUsage::Depth,
                dimensions: Vector2::new(4, 4),
                ..Default::default()
            },
            None,
        )
        .unwrap_err();
    match err {
        Error::Allocation(kind, _) => assert_eq!(kind, "Texture"),
        other => panic!("unexpected error: {}", other),
    }

    let texture = device
        .create_texture(
            TextureParams {
                dimensions: Vector2::new(8, 8),
                levels: 4,
                ..Default::default()
            },
            Some(&[0; 256]),
        )
        .unwrap();

    // 4x4 region of level 1 (4x4 overall).
    let region = TextureRegion::new(0, 0, 4, 4);
    assert!(device.update_texture(texture, 1, region, &[0; 64]).is_ok());

    // Level 4 does not exist.
    assert!(device.update_texture(texture, 4, region, &[0; 64]).is_err());

    // The region must stay inside the level.
    let region = TextureRegion::new(2, 2, 4, 4);
    assert!(device.update_texture(texture, 1, region, &[0; 64]).is_err());

    assert!(device.generate_mips(texture).is_ok());

    device.delete_texture(texture).unwrap();
    assert!(device.generate_mips(texture).is_err());
}

#[test]
fn texture_uploads_fill_their_extent() {
    let mut device = headless();

    // Unlike buffers, texture data is never a prefix: the native upload
    // reads the whole level, so a short slice is rejected up front.
    let params = TextureParams {
        dimensions: Vector2::new(4, 4),
        ..Default::default()
    };
    match device.create_texture(params, Some(&[0; 10])).unwrap_err() {
        Error::OutOfRange { end, len, .. } => assert_eq!((end, len), (10, 64)),
        other => panic!("unexpected error: {}", other),
    }
    assert_eq!(device.info().textures, 0);

    let texture = device.create_texture(params, Some(&[0; 64])).unwrap();

    // Same rule for partial region updates.
    let region = TextureRegion::new(0, 0, 4, 4);
    match device
        .update_texture(texture, 0, region, &[0; 16])
        .unwrap_err()
    {
        Error::OutOfRange { end, len, .. } => assert_eq!((end, len), (16, 64)),
        other => panic!("unexpected error: {}", other),
    }
    assert!(device.update_texture(texture, 0, region, &[0; 64]).is_ok());

    // A region whose end overflows u32 is out of bounds, not wrapped.
    let region = TextureRegion::new(u32::max_value(), 0, 2, 2);
    match device
        .update_texture(texture, 0, region, &[0; 16])
        .unwrap_err()
    {
        Error::InvalidState(_) => {}
        other => panic!("unexpected error: {}", other),
    }
}

#[test]
fn sampler_magnification_rejects_mip_filters() {
    let mut device = headless();

    let params = SamplerParams {
        mag_filter: SamplerFilter::LinearMipLinear,
        ..Default::default()
    };
    match device.create_sampler(params).unwrap_err() {
        Error::Allocation(kind, _) => assert_eq!(kind, "Sampler"),
        other => panic!("unexpected error: {}", other),
    }
    assert_eq!(device.info().samplers, 0);

    // Mip filters are fine on the minification side.
    let params = SamplerParams {
        min_filter: SamplerFilter::LinearMipLinear,
        ..Default::default()
    };
    assert!(device.create_sampler(params).is_ok());
}

#[test]
fn samplers_are_immutable_once_initialized() {
    let mut device = headless();

    let sampler = device.create_sampler(SamplerParams::default()).unwrap();

    let reconfigured = SamplerParams {
        min_filter: SamplerFilter::Nearest,
        ..Default::default()
    };
    assert!(device.update_sampler(sampler, reconfigured).is_ok());

    device.delete_sampler(sampler).unwrap();
    assert!(device.update_sampler(sampler, reconfigured).is_err());
}

#[test]
fn deletions_scrub_the_bound_state() {
    let mut device = headless();

    let pso = pipeline(&mut device);
    let vb = vertices(&mut device, 3);
    device.set_pipeline(pso).unwrap();
    device.set_vertex_buffer(0, vb).unwrap();
    device.draw(0, 3).unwrap();

    device.delete_vertex_buffer(vb).unwrap();
    match device.draw(0, 3).unwrap_err() {
        Error::InvalidState(reason) => assert_eq!(reason, "no vertex buffer is bound"),
        other => panic!("unexpected error: {}", other),
    }
    assert!(device.set_vertex_buffer(0, vb).is_err());

    device.delete_pipeline(pso).unwrap();
    match device.draw(0, 3).unwrap_err() {
        Error::InvalidState(reason) => assert_eq!(reason, "no pipeline is bound"),
        other => panic!("unexpected error: {}", other),
    }
    assert!(device.set_pipeline(pso).is_err());
}

#[test]
fn viewport_is_tracked_lazily() {
    let mut device = headless();

    device.set_viewport(Viewport {
        position: Vector2::new(0, 0),
        size: Vector2::new(640, 480),
    });

    let pso = pipeline(&mut device);
    let vb = vertices(&mut device, 3);
    device.set_pipeline(pso).unwrap();
    device.set_vertex_buffer(0, vb).unwrap();
    assert!(device.draw(0, 3).is_ok());
}

#[test]
fn resource_counters_track_lifecycles() {
    let mut device = headless();

    let vb = vertices(&mut device, 3);
    let texture = device
        .create_texture(
            TextureParams {
                dimensions: Vector2::new(2, 2),
                ..Default::default()
            },
            None,
        )
        .unwrap();

    let info = device.info();
    assert_eq!(info.vertex_buffers, 1);
    assert_eq!(info.buffers, 1);
    assert_eq!(info.textures, 1);

    device.delete_vertex_buffer(vb).unwrap();
    device.delete_texture(texture).unwrap();

    let info = device.info();
    assert_eq!(info.vertex_buffers, 0);
    assert_eq!(info.buffers, 0);
    assert_eq!(info.textures, 0);
}
