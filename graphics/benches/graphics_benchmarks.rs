use std::sync::Arc;

use criterion::{Criterion, black_box, criterion_group, criterion_main};

use tessera_core::color::Rgba8;
use tessera_core::mesh::generators::generate_cube;
use tessera_graphics::{
    Buffer, BufferDescriptor, Camera, ContextParameters, DummyBackend, DynamicBuffer, GpuBackend,
    GraphicsContext, MaterialDefinition, Residency, Texture, TextureDescriptor, TextureFormat,
    TextureUsage, VertexLayoutDescriptor,
};

fn dummy_backend() -> Arc<dyn GpuBackend> {
    Arc::new(DummyBackend::new())
}

fn started_context() -> GraphicsContext {
    let mut context = GraphicsContext::with_backend(ContextParameters::new(), dummy_backend());
    context.startup().unwrap();
    context
}

// ---------------------------------------------------------------------------
// Frame loop
// ---------------------------------------------------------------------------

fn bench_frame_single_draw(c: &mut Criterion) {
    let mut context = started_context();
    let cube = context
        .create_or_get_mesh("cube", || {
            Ok((generate_cube(0.5, Rgba8::WHITE), VertexLayoutDescriptor::pcutbn()))
        })
        .unwrap();
    let material = context.create_or_get_material("Default").unwrap();
    let mut camera = Camera::new();

    c.bench_function("dummy_frame_1_draw", |b| {
        b.iter(|| {
            context.begin_frame().unwrap();
            context.begin_camera(&mut camera).unwrap();
            context.bind_material(&material).unwrap();
            context.draw_mesh(&cube).unwrap();
            context.end_camera(&camera).unwrap();
            context.end_frame().unwrap();
        });
    });
}

fn bench_frame_many_draws(c: &mut Criterion) {
    let mut context = started_context();
    let cube = context
        .create_or_get_mesh("cube", || {
            Ok((generate_cube(0.5, Rgba8::WHITE), VertexLayoutDescriptor::pcutbn()))
        })
        .unwrap();
    let material = context.create_or_get_material("Default").unwrap();
    let mut camera = Camera::new();

    c.bench_function("dummy_frame_256_draws", |b| {
        b.iter(|| {
            context.begin_frame().unwrap();
            context.begin_camera(&mut camera).unwrap();
            context.bind_material(&material).unwrap();
            for _ in 0..256 {
                context.draw_mesh(&cube).unwrap();
            }
            context.end_camera(&camera).unwrap();
            context.end_frame().unwrap();
        });
    });
}

// ---------------------------------------------------------------------------
// Caches and definitions
// ---------------------------------------------------------------------------

fn bench_cache_hit(c: &mut Criterion) {
    let mut context = started_context();
    context.create_or_get_material("Default").unwrap();

    c.bench_function("create_or_get_material_hit", |b| {
        b.iter(|| black_box(context.create_or_get_material(black_box("Default")).unwrap()));
    });
}

fn bench_parse_definition(c: &mut Criterion) {
    let text = "shader = Default\n\
                diffuse = textures/brick.png\n\
                normal = textures/brick_n.png\n\
                blend = alpha\n\
                depth = less\n\
                cull = none\n";
    c.bench_function("material_definition_parse", |b| {
        b.iter(|| black_box(MaterialDefinition::parse(black_box(text)).unwrap()));
    });
}

// ---------------------------------------------------------------------------
// Dummy backend resource creation
// ---------------------------------------------------------------------------

fn bench_dummy_create_buffer(c: &mut Criterion) {
    let backend = dummy_backend();

    c.bench_function("dummy_create_buffer_1kb", |b| {
        b.iter(|| {
            black_box(
                Buffer::create(
                    &backend,
                    BufferDescriptor::vertex(1024, 16, Residency::GpuOnly),
                    None,
                )
                .unwrap(),
            );
        });
    });
}

fn bench_dummy_create_texture(c: &mut Criterion) {
    let backend = dummy_backend();

    c.bench_function("dummy_create_texture_256x256", |b| {
        b.iter(|| {
            black_box(
                Texture::create(
                    &backend,
                    TextureDescriptor::new_2d(
                        256,
                        256,
                        TextureFormat::Rgba8Unorm,
                        TextureUsage::SAMPLED,
                        Residency::GpuOnly,
                    ),
                    None,
                )
                .unwrap(),
            );
        });
    });
}

fn bench_dynamic_buffer_growth(c: &mut Criterion) {
    let backend = dummy_backend();
    let data = vec![0u8; 64 * 1024];

    c.bench_function("dynamic_buffer_grow_to_64kb", |b| {
        b.iter(|| {
            let mut buffer = DynamicBuffer::new(
                &backend,
                BufferDescriptor::vertex(256, 16, Residency::Dynamic),
                None,
            )
            .unwrap();
            for len in [1024, 4096, 16 * 1024, 64 * 1024] {
                buffer.copy_cpu_to_gpu(&data[..len]).unwrap();
            }
            black_box(buffer.capacity())
        });
    });
}

criterion_group!(
    benches,
    bench_frame_single_draw,
    bench_frame_many_draws,
    bench_cache_hit,
    bench_parse_definition,
    bench_dummy_create_buffer,
    bench_dummy_create_texture,
    bench_dynamic_buffer_growth,
);
criterion_main!(benches);
