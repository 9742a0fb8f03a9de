//! Tests against a real adapter through the headless wgpu backend.
//!
//! Run with `cargo test -p tessera-graphics -- --ignored` on a machine with a
//! GPU (or a software adapter such as lavapipe).

#![cfg(feature = "wgpu-backend")]

mod common;

use std::sync::Arc;

use common::{TEST_HEIGHT, TEST_WIDTH};
use tessera_core::color::Rgba8;
use tessera_core::mesh::generators::generate_cube;
use tessera_graphics::backend::wgpu_impl::WgpuBackend;
use tessera_graphics::{
    Camera, ChannelDispatcher, ClearPolicy, ColorClear, ContextParameters, GraphicsContext,
    ScreenshotRequest, VertexLayoutDescriptor,
};

fn headless() -> Option<(GraphicsContext, Arc<WgpuBackend>)> {
    let _ = env_logger::builder().is_test(true).try_init();
    let params = ContextParameters::new().with_size(TEST_WIDTH, TEST_HEIGHT);
    let backend = match WgpuBackend::headless(&params) {
        Ok(backend) => Arc::new(backend),
        Err(e) => {
            eprintln!("wgpu backend unavailable, skipping: {e}");
            return None;
        }
    };
    let mut context = GraphicsContext::with_backend(params, backend.clone());
    context.startup().expect("wgpu startup");
    Some((context, backend))
}

fn capture(context: &mut GraphicsContext, camera: &mut Camera) -> ScreenshotRequest {
    let (dispatcher, receiver) = ChannelDispatcher::new();
    context.set_screenshot_dispatcher(Arc::new(dispatcher));
    context.begin_frame().unwrap();
    context.begin_camera(camera).unwrap();
    context.end_camera(camera).unwrap();
    context.request_screenshot().unwrap();
    context.end_frame().unwrap();
    receiver.try_recv().expect("one screenshot per requested frame")
}

#[test]
#[ignore = "requires a GPU adapter"]
fn test_clear_color_reaches_screenshot() {
    let Some((mut context, _backend)) = headless() else {
        return;
    };
    let mut camera = Camera::new();
    camera.set_clear_policy(ClearPolicy {
        color: ColorClear::Color([1.0, 0.0, 0.0, 1.0]),
        depth: Some(1.0),
    });

    let shot = capture(&mut context, &mut camera);
    let image = shot.image();
    assert_eq!(image.width(), TEST_WIDTH);
    assert_eq!(image.height(), TEST_HEIGHT);
    assert_eq!(image.pixel(0, 0), Some(Rgba8::new(255, 0, 0, 255)));
    assert_eq!(
        image.pixel(TEST_WIDTH - 1, TEST_HEIGHT - 1),
        Some(Rgba8::new(255, 0, 0, 255))
    );
}

#[test]
#[ignore = "requires a GPU adapter"]
fn test_pipeline_reused_across_frames() {
    let Some((mut context, backend)) = headless() else {
        return;
    };
    let cube = context
        .create_or_get_mesh("cube", || {
            Ok((generate_cube(0.5, Rgba8::WHITE), VertexLayoutDescriptor::pcutbn()))
        })
        .unwrap();
    let material = context.create_or_get_material("Default").unwrap();
    let mut camera = Camera::new();

    for _ in 0..3 {
        context.begin_frame().unwrap();
        context.begin_camera(&mut camera).unwrap();
        context.bind_material(&material).unwrap();
        context.draw_mesh(&cube).unwrap();
        context.end_camera(&camera).unwrap();
        context.end_frame().unwrap();
    }
    assert_eq!(backend.pipeline_count(), 1);
}

#[test]
#[ignore = "requires a GPU adapter"]
fn test_resize_rebuilds_frame_targets() {
    let Some((mut context, _backend)) = headless() else {
        return;
    };
    context.resize(32, 16).unwrap();
    let mut camera = Camera::new();
    let shot = capture(&mut context, &mut camera);
    assert_eq!(shot.image().width(), 32);
    assert_eq!(shot.image().height(), 16);
}
