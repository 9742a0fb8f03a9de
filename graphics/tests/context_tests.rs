//! Integration tests for the graphics context against the counting dummy
//! backend.
//!
//! # Test Categories
//!
//! - **Residency Tests**: creation rules and dynamic buffer growth
//! - **State Tests**: lazy rebuilds of blend, depth and raster state
//! - **Cache Tests**: `create_or_get_*` identity
//! - **Frame Tests**: the full frame scenario and screenshot coalescing

mod common;

use std::sync::Arc;

use rstest::rstest;

use common::{TEST_HEIGHT, TEST_WIDTH, TestContext, ctx, state_token, texture_token};
use tessera_core::color::Rgba8;
use tessera_core::image::CpuImage;
use tessera_graphics::{
    BlendMode, Buffer, BufferDescriptor, Camera, ChannelDispatcher, ClearPolicy, ContextState,
    DepthState, DynamicBuffer, FillMode, GraphicsError, MaterialDefinition, PipelineStates,
    Residency, Texture, TextureDescriptor, TextureFormat, TextureSlot, TextureUsage,
};

// ============================================================================
// Residency Tests
// ============================================================================

#[rstest]
#[case::gpu_only(Residency::GpuOnly, false, true)]
#[case::static_without_data(Residency::Static, false, false)]
#[case::static_with_data(Residency::Static, true, true)]
#[case::dynamic(Residency::Dynamic, false, true)]
#[case::staging(Residency::Staging, false, true)]
fn test_buffer_creation_residency(
    ctx: TestContext,
    #[case] residency: Residency,
    #[case] with_data: bool,
    #[case] succeeds: bool,
) {
    let data = [1u8; 64];
    let result = Buffer::create(
        &ctx.gpu(),
        BufferDescriptor::vertex(64, 16, residency),
        with_data.then_some(&data[..]),
    );
    assert_eq!(result.is_ok(), succeeds);
    if !succeeds {
        assert!(matches!(result, Err(GraphicsError::ResidencyViolation(_))));
    }
}

#[rstest]
#[case::static_without_data(Residency::Static, false, false)]
#[case::static_with_data(Residency::Static, true, true)]
#[case::gpu_only(Residency::GpuOnly, false, true)]
fn test_texture_creation_residency(
    ctx: TestContext,
    #[case] residency: Residency,
    #[case] with_data: bool,
    #[case] succeeds: bool,
) {
    let pixels = [255u8; 4 * 4 * 4];
    let descriptor = TextureDescriptor::new_2d(
        4,
        4,
        TextureFormat::Rgba8Unorm,
        TextureUsage::SAMPLED,
        residency,
    );
    let result = Texture::create(&ctx.gpu(), descriptor, with_data.then_some(&pixels[..]));
    assert_eq!(result.is_ok(), succeeds);
}

#[rstest]
#[case::gpu_only(Residency::GpuOnly, false)]
#[case::static_data(Residency::Static, false)]
#[case::dynamic(Residency::Dynamic, true)]
#[case::staging(Residency::Staging, true)]
fn test_buffer_copy_residency(
    ctx: TestContext,
    #[case] residency: Residency,
    #[case] writable: bool,
) {
    let data = [1u8; 64];
    let buffer = Buffer::create(
        &ctx.gpu(),
        BufferDescriptor::vertex(64, 16, residency),
        Some(&data[..]),
    )
    .unwrap();
    let before = ctx.stats();

    let result = buffer.copy_cpu_to_gpu(&[2u8; 32]);
    if writable {
        assert!(result.is_ok());
        assert_eq!(ctx.stats().since(&before).buffer_writes, 1);
    } else {
        assert!(matches!(result, Err(GraphicsError::ResidencyViolation(_))));
        assert_eq!(ctx.stats().since(&before).buffer_writes, 0);
    }
}

#[rstest]
#[case::gpu_only(Residency::GpuOnly, TextureUsage::SAMPLED, false)]
#[case::static_data(Residency::Static, TextureUsage::SAMPLED, false)]
#[case::dynamic(Residency::Dynamic, TextureUsage::SAMPLED, true)]
#[case::staging(Residency::Staging, TextureUsage::COPY_DST, true)]
fn test_texture_copy_residency(
    ctx: TestContext,
    #[case] residency: Residency,
    #[case] usage: TextureUsage,
    #[case] writable: bool,
) {
    let pixels = [255u8; 4 * 4 * 4];
    let descriptor = TextureDescriptor::new_2d(4, 4, TextureFormat::Rgba8Unorm, usage, residency);
    let texture = Texture::create(&ctx.gpu(), descriptor, Some(&pixels[..])).unwrap();
    let before = ctx.stats();

    let result = texture.copy_cpu_to_gpu(&pixels);
    if writable {
        assert!(result.is_ok());
        assert_eq!(ctx.stats().since(&before).texture_writes, 1);
    } else {
        assert!(matches!(result, Err(GraphicsError::ResidencyViolation(_))));
        assert_eq!(ctx.stats().since(&before).texture_writes, 0);
    }
}

#[rstest]
fn test_dynamic_growth_releases_old_buffer_once(ctx: TestContext) {
    let mut buffer = DynamicBuffer::new(
        &ctx.gpu(),
        BufferDescriptor::vertex(32, 4, Residency::Dynamic),
        None,
    )
    .unwrap();
    let before = ctx.stats();

    assert!(buffer.copy_cpu_to_gpu(&[3u8; 100]).unwrap());
    let delta = ctx.stats().since(&before);
    assert_eq!(delta.buffers_created, 1);
    assert_eq!(delta.buffers_released, 1);
    assert_eq!(buffer.recreation_count(), 1);
    assert!(buffer.capacity() >= 100);

    // Fits now: written in place.
    let before = ctx.stats();
    assert!(!buffer.copy_cpu_to_gpu(&[4u8; 80]).unwrap());
    let delta = ctx.stats().since(&before);
    assert_eq!(delta.buffers_created, 0);
    assert_eq!(delta.buffer_writes, 1);
}

// ============================================================================
// State Tests
// ============================================================================

fn enter_camera(ctx: &mut TestContext, camera: &mut Camera) {
    ctx.context.begin_frame().unwrap();
    ctx.context.begin_camera(camera).unwrap();
}

#[rstest]
fn test_rebinding_same_shader_rebuilds_nothing(mut ctx: TestContext) {
    let mut camera = Camera::new();
    enter_camera(&mut ctx, &mut camera);
    let shader = ctx.context.create_or_get_shader("Default").unwrap();

    ctx.context.bind_shader(&shader).unwrap();
    let before = ctx.stats();
    ctx.context.bind_shader(&shader).unwrap();
    let delta = ctx.stats().since(&before);
    assert_eq!(delta.state_objects_created(), 0);
    assert_eq!(delta.state_objects_released, 0);
}

#[rstest]
fn test_raster_change_rebuilds_raster_only(mut ctx: TestContext) {
    let mut camera = Camera::new();
    enter_camera(&mut ctx, &mut camera);
    let shader = ctx.context.create_or_get_shader("Default").unwrap();
    ctx.context.bind_shader(&shader).unwrap();

    let blend = shader.cached_blend_state().unwrap();
    let depth = shader.cached_depth_state().unwrap();
    let raster = shader.cached_raster_state().unwrap();

    assert!(shader.set_fill_mode(FillMode::Wireframe));
    let before = ctx.stats();
    ctx.context.bind_shader(&shader).unwrap();
    let delta = ctx.stats().since(&before);

    assert_eq!(delta.raster_states_created, 1);
    assert_eq!(delta.blend_states_created, 0);
    assert_eq!(delta.depth_states_created, 0);
    assert!(Arc::ptr_eq(&blend, &shader.cached_blend_state().unwrap()));
    assert!(Arc::ptr_eq(&depth, &shader.cached_depth_state().unwrap()));
    assert!(!Arc::ptr_eq(&raster, &shader.cached_raster_state().unwrap()));
}

#[rstest]
fn test_unset_material_slots_bind_engine_defaults(mut ctx: TestContext) {
    let mut camera = Camera::new();
    let cube = ctx.cube();
    let material = ctx.context.create_or_get_material("Default").unwrap();
    enter_camera(&mut ctx, &mut camera);

    ctx.context.bind_material(&material).unwrap();
    ctx.context.draw_mesh(&cube).unwrap();

    let record = ctx.backend().last_draw().unwrap();
    let defaults = ctx.context.material_defaults().unwrap();
    for slot in TextureSlot::ALL {
        let bound = record.textures[slot.index()];
        assert!(bound.is_some(), "slot {} bound a null view", slot.key());
        assert_eq!(bound, texture_token(defaults.texture(slot)));
        assert!(record.samplers[slot.index()].is_some());
    }
    assert!(record.indexed);
    assert_eq!(record.count, cube.element_count());
}

#[rstest]
#[case::additive("additive")]
#[case::alpha("alpha")]
fn test_material_states_do_not_leak_between_materials(
    mut ctx: TestContext,
    #[case] blend: &str,
) {
    let mut camera = Camera::new();
    let cube = ctx.cube();
    ctx.context
        .register_material_definition(
            "Blended",
            MaterialDefinition::from_pairs([
                ("shader", "Default"),
                ("blend", blend),
                ("depth", "always"),
            ])
            .unwrap(),
        )
        .unwrap();
    let blended = ctx.context.create_or_get_material("Blended").unwrap();
    let plain = ctx.context.create_or_get_material("Default").unwrap();
    assert!(Arc::ptr_eq(blended.shader(), plain.shader()));
    enter_camera(&mut ctx, &mut camera);

    ctx.context.bind_material(&blended).unwrap();
    ctx.context.draw_mesh(&cube).unwrap();
    let shader = plain.shader();
    assert_ne!(shader.pipeline_states().blend, BlendMode::Opaque);
    let blended_draw = ctx.backend().last_draw().unwrap();

    ctx.context.bind_material(&plain).unwrap();
    ctx.context.draw_mesh(&cube).unwrap();
    assert_eq!(shader.pipeline_states(), PipelineStates::default());
    assert_eq!(shader.pipeline_states().depth, DepthState::default());

    let plain_draw = ctx.backend().last_draw().unwrap();
    assert_eq!(
        plain_draw.blend,
        state_token(&shader.cached_blend_state().unwrap())
    );
    assert_ne!(plain_draw.blend, blended_draw.blend);
    assert_ne!(plain_draw.depth, blended_draw.depth);

    // Back to the blended material: its states come back too.
    ctx.context.bind_material(&blended).unwrap();
    assert_eq!(shader.pipeline_states(), blended.pipeline_states());
}

#[rstest]
fn test_rebinding_same_material_rebuilds_nothing(mut ctx: TestContext) {
    let mut camera = Camera::new();
    let material = ctx.context.create_or_get_material("Default").unwrap();
    enter_camera(&mut ctx, &mut camera);

    ctx.context.bind_material(&material).unwrap();
    let before = ctx.stats();
    ctx.context.bind_material(&material).unwrap();
    assert_eq!(ctx.stats().since(&before).state_objects_created(), 0);
}

// ============================================================================
// Cache Tests
// ============================================================================

#[rstest]
fn test_same_key_returns_same_arc(mut ctx: TestContext) {
    let first = ctx.context.create_or_get_material("Default").unwrap();
    let second = ctx.context.create_or_get_material("Default").unwrap();
    assert!(Arc::ptr_eq(&first, &second));

    let red = ctx.context.create_or_get_texture("#solid:255,0,0,255").unwrap();
    let red_again = ctx.context.create_or_get_texture("#solid:255,0,0,255").unwrap();
    assert!(Arc::ptr_eq(&red, &red_again));
}

#[rstest]
fn test_different_keys_for_one_file_are_distinct(mut ctx: TestContext) {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("checker.png");
    CpuImage::filled(2, 2, Rgba8::new(10, 20, 30, 255))
        .unwrap()
        .save_png(&path)
        .unwrap();

    let direct = path.to_str().unwrap().to_string();
    let dotted = dir
        .path()
        .join(".")
        .join("checker.png")
        .to_str()
        .unwrap()
        .to_string();
    assert_ne!(direct, dotted);

    let before = ctx.stats();
    let a = ctx.context.create_or_get_texture(&direct).unwrap();
    let b = ctx.context.create_or_get_texture(&dotted).unwrap();
    assert!(!Arc::ptr_eq(&a, &b));
    assert_eq!(ctx.stats().since(&before).textures_created, 2);
    assert_eq!(a.width(), 2);
}

#[rstest]
#[case::texture_first(true)]
#[case::font_first(false)]
fn test_font_atlas_shares_texture_cache(mut ctx: TestContext, #[case] texture_first: bool) {
    let dir = tempfile::tempdir().unwrap();
    let stem = dir.path().join("mono").to_str().unwrap().to_string();
    let path = format!("{stem}.png");
    CpuImage::filled(16, 16, Rgba8::WHITE)
        .unwrap()
        .save_png(&path)
        .unwrap();

    let before = ctx.stats();
    let (texture, font) = if texture_first {
        let texture = ctx.context.create_or_get_texture(&path).unwrap();
        (texture, ctx.context.create_or_get_bitmap_font(&stem).unwrap())
    } else {
        let font = ctx.context.create_or_get_bitmap_font(&stem).unwrap();
        (ctx.context.create_or_get_texture(&path).unwrap(), font)
    };

    assert!(Arc::ptr_eq(&texture, font.texture()));
    let again = ctx.context.create_or_get_texture(&path).unwrap();
    assert!(Arc::ptr_eq(&texture, &again));
    assert_eq!(ctx.stats().since(&before).textures_created, 1);
}

#[rstest]
fn test_missing_font_atlas_is_an_error(mut ctx: TestContext) {
    let dir = tempfile::tempdir().unwrap();
    let stem = dir.path().join("absent").to_str().unwrap().to_string();
    let path = format!("{stem}.png");

    assert!(matches!(
        ctx.context.create_or_get_bitmap_font(&stem),
        Err(GraphicsError::ResourceCreationFailed(_))
    ));

    // The plain texture lookup falls back to white; the font still refuses it.
    let fallback = ctx.context.create_or_get_texture(&path).unwrap();
    assert_eq!(fallback.width(), 1);
    assert!(ctx.context.create_or_get_bitmap_font(&stem).is_err());
}

// ============================================================================
// Frame Tests
// ============================================================================

#[rstest]
fn test_uninitialized_context_never_touches_backend() {
    let mut ctx = TestContext::unstarted();
    let mut camera = Camera::new();

    assert!(matches!(
        ctx.context.begin_frame(),
        Err(GraphicsError::InvalidState(_))
    ));
    assert!(matches!(
        ctx.context.begin_camera(&mut camera),
        Err(GraphicsError::InvalidState(_))
    ));
    assert!(matches!(
        ctx.context.create_or_get_material("Default"),
        Err(GraphicsError::InvalidState(_))
    ));
    assert!(matches!(
        ctx.context.end_frame(),
        Err(GraphicsError::InvalidState(_))
    ));
    assert_eq!(ctx.stats(), Default::default());
    assert_eq!(ctx.context.state(), ContextState::Uninitialized);
}

#[rstest]
fn test_frame_scenario(mut ctx: TestContext) {
    let mut camera = Camera::new();
    let cube = ctx.cube();
    let material = ctx.context.create_or_get_material("Default").unwrap();
    let before = ctx.stats();

    ctx.context.begin_frame().unwrap();
    ctx.context.begin_camera(&mut camera).unwrap();
    ctx.context.bind_material(&material).unwrap();
    ctx.context.draw_mesh(&cube).unwrap();
    ctx.context.end_camera(&camera).unwrap();
    ctx.context.end_frame().unwrap();

    let delta = ctx.stats().since(&before);
    assert_eq!(delta.presents, 1);
    assert_eq!(delta.draws, 1);
    assert_eq!(delta.staging_textures_created, 0);
    assert_eq!(delta.back_buffer_acquires, 1);
    assert_eq!(ctx.context.state(), ContextState::Ready);
}

#[rstest]
fn test_clear_nothing_camera_issues_no_clears(mut ctx: TestContext) {
    let mut camera = Camera::new();
    camera.set_clear_policy(ClearPolicy::none());
    ctx.context.begin_frame().unwrap();
    let before = ctx.stats();
    ctx.context.begin_camera(&mut camera).unwrap();
    assert_eq!(ctx.stats().since(&before).clears, 0);
    ctx.context.end_camera(&camera).unwrap();
    ctx.context.end_frame().unwrap();
}

#[rstest]
#[case::once(1)]
#[case::many(5)]
fn test_screenshot_requests_coalesce(mut ctx: TestContext, #[case] requests: usize) {
    let (dispatcher, receiver) = ChannelDispatcher::new();
    ctx.context.set_screenshot_dispatcher(Arc::new(dispatcher));
    let before = ctx.stats();

    ctx.context.begin_frame().unwrap();
    for _ in 0..requests {
        ctx.context.request_screenshot().unwrap();
    }
    ctx.context.end_frame().unwrap();

    let delta = ctx.stats().since(&before);
    assert_eq!(delta.staging_textures_created, 1);
    assert_eq!(delta.readbacks, 1);
    let shots: Vec<_> = receiver.try_iter().collect();
    assert_eq!(shots.len(), 1);
    assert_eq!(shots[0].image().width(), TEST_WIDTH);
    assert_eq!(shots[0].image().height(), TEST_HEIGHT);

    // Nothing requested: nothing captured.
    let before = ctx.stats();
    ctx.context.begin_frame().unwrap();
    ctx.context.end_frame().unwrap();
    assert_eq!(ctx.stats().since(&before).staging_textures_created, 0);
    assert!(receiver.try_recv().is_err());
}

#[rstest]
fn test_shutdown_releases_everything(mut ctx: TestContext) {
    let cube = ctx.cube();
    drop(cube);
    let material = ctx.context.create_or_get_material("Default").unwrap();
    ctx.context.begin_frame().unwrap();
    ctx.context.end_frame().unwrap();
    drop(material);
    ctx.context.shutdown().unwrap();

    let stats = ctx.stats();
    assert_eq!(stats.buffers_created, stats.buffers_released);
    assert_eq!(stats.textures_created, stats.textures_released);
}
