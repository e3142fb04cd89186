use criterion::{black_box, criterion_group, criterion_main, Criterion};
use eyetrack::core::{fit_circle, fit_ellipse, GrayImage};
use eyetrack::walkout::{pupil_directions, walkout};
use eyetrack::{ProcessorParams, TargetProcessor};
use nalgebra::Point2;

fn build_eye(width: usize, height: usize, r: f64) -> GrayImage {
    let (cx, cy) = (width as f64 / 2.0, height as f64 / 2.0);
    let mut img = GrayImage::new_fill(width, height, 110);
    for y in 0..height {
        for x in 0..width {
            let dx = (x as f64 - cx) / 1.2;
            let dy = y as f64 - cy;
            if dx * dx + dy * dy <= r * r {
                img.set(x, y, 15);
            }
        }
    }
    img
}

fn bench_walkout_and_fit(c: &mut Criterion) {
    let img = build_eye(640, 480, 40.0);
    let binarized = TargetProcessor::pupil(ProcessorParams {
        threshold: 60.0,
        ..ProcessorParams::pupil()
    })
    .binarize(&img.view());
    let view = binarized.view();
    let dirs = pupil_directions();
    let center = Point2::new(320.0, 240.0);

    c.bench_function("walkout_pupil_640x480", |b| {
        b.iter(|| {
            let pts = walkout(black_box(&view), black_box(center), &dirs, 2, 100);
            black_box(pts.map(|p| p.len()).unwrap_or(0));
        });
    });

    let pts = walkout(&view, center, &dirs, 2, 100).expect("boundary");
    c.bench_function("fit_ellipse_32pts", |b| {
        b.iter(|| black_box(fit_ellipse(black_box(&pts)).ok()));
    });
    c.bench_function("fit_circle_32pts", |b| {
        b.iter(|| black_box(fit_circle(black_box(&pts)).ok()));
    });
}

fn bench_track_frame(c: &mut Criterion) {
    let img = build_eye(640, 480, 40.0);
    let view = img.view();
    let mut pupil = TargetProcessor::pupil(ProcessorParams {
        threshold: 60.0,
        ..ProcessorParams::pupil()
    });
    pupil.set_center(Point2::new(320.0, 240.0));

    c.bench_function("track_pupil_640x480", |b| {
        b.iter(|| black_box(pupil.track(black_box(&view))));
    });
}

criterion_group!(benches, bench_walkout_and_fit, bench_track_frame);
criterion_main!(benches);
