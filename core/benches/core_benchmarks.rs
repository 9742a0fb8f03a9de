use criterion::{Criterion, black_box, criterion_group, criterion_main};

use tessera_core::color::Rgba8;
use tessera_core::math::{Mat4, Vec3, perspective_rh, placement_looking_at, transform_point_projective};
use tessera_core::mesh::generators::{generate_cube, generate_quad};

// ---------------------------------------------------------------------------
// Mesh generation
// ---------------------------------------------------------------------------

fn bench_generate_quad(c: &mut Criterion) {
    c.bench_function("generate_quad", |b| {
        b.iter(|| generate_quad(black_box(0.5), black_box(0.5), Rgba8::WHITE));
    });
}

fn bench_generate_cube(c: &mut Criterion) {
    c.bench_function("generate_cube", |b| {
        b.iter(|| generate_cube(black_box(1.0), Rgba8::WHITE));
    });
}

fn bench_mesh_validate(c: &mut Criterion) {
    let mesh = generate_cube(1.0, Rgba8::WHITE);
    c.bench_function("cpu_mesh_validate_cube", |b| {
        b.iter(|| black_box(&mesh).validate());
    });
}

// ---------------------------------------------------------------------------
// Unprojection
// ---------------------------------------------------------------------------

fn bench_unproject(c: &mut Criterion) {
    let projection = perspective_rh(1.0, 16.0 / 9.0, 0.1, 100.0);
    let placement = placement_looking_at(&Vec3::new(0.0, 2.0, 5.0), &Vec3::zeros(), &Vec3::y());
    c.bench_function("unproject_point", |b| {
        b.iter(|| {
            let view = placement.try_inverse().unwrap_or_else(Mat4::identity);
            let inverse = (projection * view).try_inverse().unwrap_or_else(Mat4::identity);
            transform_point_projective(&inverse, black_box(&Vec3::new(0.25, -0.5, 1.0)))
        });
    });
}

criterion_group!(
    benches,
    bench_generate_quad,
    bench_generate_cube,
    bench_mesh_validate,
    bench_unproject,
);
criterion_main!(benches);
