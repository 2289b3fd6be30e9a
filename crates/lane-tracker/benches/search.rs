use criterion::{black_box, criterion_group, criterion_main, Criterion};
use lane_tracker::{blind_search, fit_side, localized_search, LanePair, LaneTracker, PolynomialFit, TrackerConfig};
use road_frame::BinaryFrame;

/// Two gently curving 8 px lines on a 1280x720 top-down frame
fn make_frame() -> BinaryFrame {
    let left = PolynomialFit::new(2.0e-4, -0.1, 330.0);
    let right = PolynomialFit::new(2.0e-4, -0.1, 950.0);
    BinaryFrame::from_fn(1280, 720, |x, y| {
        let (xf, yf) = (x as f64, y as f64);
        (xf - left.eval(yf)).abs() < 4.0 || (xf - right.eval(yf)).abs() < 4.0
    })
}

fn bench_blind_search(c: &mut Criterion) {
    let frame = make_frame();
    let config = TrackerConfig::default();
    c.bench_function("blind_search_1280x720", |b| {
        b.iter(|| {
            let (found, _) = blind_search(black_box(&frame), black_box(&config));
            black_box(found)
        })
    });
}

fn bench_localized_search(c: &mut Criterion) {
    let frame = make_frame();
    let prior = LanePair {
        left: PolynomialFit::new(2.0e-4, -0.1, 335.0),
        right: PolynomialFit::new(2.0e-4, -0.1, 945.0),
    };
    c.bench_function("localized_search_1280x720", |b| {
        b.iter(|| {
            let found = localized_search(black_box(&frame), black_box(&prior), 100)
                .expect("fixture lines lie inside the margin");
            black_box(found)
        })
    });
}

fn bench_fit(c: &mut Criterion) {
    let frame = make_frame();
    let config = TrackerConfig::default();
    let (found, _) = blind_search(&frame, &config);
    c.bench_function("fit_side_left", |b| {
        b.iter(|| {
            let fit = fit_side(black_box(&found.left), &config.scale)
                .expect("fixture has enough rows");
            black_box(fit)
        })
    });
}

fn bench_process_frame(c: &mut Criterion) {
    let frame = make_frame();
    let mut tracker = LaneTracker::new(TrackerConfig::default(), 1280, 720)
        .expect("default config is valid");
    c.bench_function("process_frame_tracking", |b| {
        b.iter(|| black_box(tracker.process_frame(black_box(&frame))))
    });
}

criterion_group!(
    search,
    bench_blind_search,
    bench_localized_search,
    bench_fit,
    bench_process_frame
);
criterion_main!(search);
