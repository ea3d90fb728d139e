//! Benchmarks for the deformation pipeline.

use criterion::{criterion_group, criterion_main, Criterion};
use elastic_mesh::algo::geodesic_distances;
use elastic_mesh::prelude::*;
use nalgebra::Point3;

fn create_grid(n: usize) -> (Vec<Point3<f64>>, Vec<[usize; 3]>) {
    let mut vertices = Vec::with_capacity((n + 1) * (n + 1));
    let mut faces = Vec::with_capacity(n * n * 2);

    for j in 0..=n {
        for i in 0..=n {
            vertices.push(Point3::new(i as f64, j as f64, 0.0));
        }
    }

    for j in 0..n {
        for i in 0..n {
            let v00 = j * (n + 1) + i;
            let v10 = v00 + 1;
            let v01 = v00 + (n + 1);
            let v11 = v01 + 1;

            faces.push([v00, v10, v11]);
            faces.push([v00, v11, v01]);
        }
    }

    (vertices, faces)
}

/// Hold the left edge down and lift the far corner.
fn corner_pins(n: usize, vertices: &[Point3<f64>]) -> Vec<Pin> {
    let mut pins: Vec<Pin> = (0..=n)
        .map(|j| {
            let v = j * (n + 1);
            Pin::new(v, vertices[v]).with_radius(n as f64 / 4.0)
        })
        .collect();
    let corner = (n + 1) * (n + 1) - 1;
    pins.push(Pin::new(corner, vertices[corner] + nalgebra::Vector3::new(0.0, 0.0, n as f64 / 3.0)));
    pins
}

fn bench_deform(c: &mut Criterion) {
    let n = 30;
    let (vertices, faces) = create_grid(n);
    let pins = corner_pins(n, &vertices);

    c.bench_function("deform_grid_30x30", |b| {
        let options = DeformOptions::default();
        b.iter(|| deform(&vertices, &faces, &pins, &options).unwrap());
    });

    c.bench_function("deform_grid_30x30_sequential", |b| {
        let options = DeformOptions::default().with_parallel(false);
        b.iter(|| deform(&vertices, &faces, &pins, &options).unwrap());
    });
}

fn bench_geodesics(c: &mut Criterion) {
    let n = 50;
    let (vertices, faces) = create_grid(n);
    let ctx = MeshContext::new(&vertices, &faces).unwrap();
    let sources: Vec<usize> = (0..16).map(|k| k * (vertices.len() / 16)).collect();

    c.bench_function("geodesic_matrix_16_pins", |b| {
        b.iter(|| geodesic_distances(&ctx, &sources, true));
    });
}

criterion_group!(benches, bench_deform, bench_geodesics);
criterion_main!(benches);
