use criterion::{black_box, criterion_group, criterion_main, Criterion};
use fillcam_detect::{ContourDetector, ContourDetectorParams};
use image::{Rgb, RgbImage};

fn synthetic_frame(w: u32, h: u32) -> RgbImage {
    let mut img = RgbImage::from_pixel(w, h, Rgb([245, 245, 240]));
    // A spoon-like bar and a cup outline.
    for y in h / 6..h * 5 / 6 {
        for x in w / 8..w / 8 + w / 16 {
            img.put_pixel(x, y, Rgb([150, 90, 40]));
        }
    }
    let (x0, y0, x1, y1) = (w / 2, h / 4, w / 2 + h / 2, h * 3 / 4);
    for y in y0..y1 {
        for x in x0..x1 {
            let border = x < x0 + 4 || x >= x1 - 4 || y < y0 + 4 || y >= y1 - 4;
            if border {
                img.put_pixel(x, y, Rgb([60, 60, 60]));
            }
        }
    }
    img
}

fn bench_binarize(c: &mut Criterion) {
    let det = ContourDetector::new(ContourDetectorParams::default()).expect("params");
    let frame = synthetic_frame(640, 480);
    c.bench_function("binarize_640x480", |b| {
        b.iter(|| black_box(det.binarize(black_box(&frame))))
    });
}

fn bench_detect(c: &mut Criterion) {
    let det = ContourDetector::new(ContourDetectorParams::default()).expect("params");
    for (w, h) in [(640, 480), (1280, 720)] {
        let frame = synthetic_frame(w, h);
        c.bench_function(&format!("contour_detect_{w}x{h}"), |b| {
            b.iter(|| black_box(det.detect(black_box(&frame))))
        });
    }
}

criterion_group!(contour_timing, bench_binarize, bench_detect);
criterion_main!(contour_timing);
