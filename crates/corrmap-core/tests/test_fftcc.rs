mod common;

use corrmap_core::fftcc::{
    mean_speckle_size_2d, speckle_size_2d, FftCc2D, FftCc3D, FftCcConfig2D, FftCcConfig3D,
};
use corrmap_core::poi::{poi_grid_2d, Poi2D, Poi3D};

#[test]
fn test_integer_shift_recovered() {
    let reference = common::speckle_image(128, 128, 1.6, 42);
    let target = common::shift_image_integer(&reference, 3, -2);

    let mut estimator = FftCc2D::new(&FftCcConfig2D::default()).unwrap();
    estimator.set_images(&reference, &target);

    let mut poi = Poi2D::new(64, 64);
    estimator.compute(&mut poi).unwrap();

    assert_eq!(poi.deformation.u, 3.0);
    assert_eq!(poi.deformation.v, -2.0);
    assert_eq!(poi.result.u0, 0.0);
    assert!(
        poi.result.zncc > 0.75,
        "zncc={} should be high for a pure shift",
        poi.result.zncc
    );
}

// With the shift already in the initial guess the windows align exactly
// and the normalized peak is 1.
#[test]
fn test_exact_guess_gives_unit_zncc() {
    let reference = common::speckle_image(128, 128, 1.6, 42);
    let target = common::shift_image_integer(&reference, 3, -2);

    let mut estimator = FftCc2D::new(&FftCcConfig2D::default()).unwrap();
    estimator.set_images(&reference, &target);

    let mut poi = Poi2D::new(64, 64);
    poi.deformation.u = 3.0;
    poi.deformation.v = -2.0;
    estimator.compute(&mut poi).unwrap();

    assert_eq!(poi.deformation.u, 3.0);
    assert_eq!(poi.deformation.v, -2.0);
    assert!(
        poi.result.zncc > 0.999,
        "zncc={} should be ~1 for aligned windows",
        poi.result.zncc
    );
}

#[test]
fn test_border_poi_rejected() {
    let reference = common::speckle_image(64, 64, 1.6, 7);
    let target = reference.clone();

    let mut estimator = FftCc2D::new(&FftCcConfig2D::default()).unwrap();
    estimator.set_images(&reference, &target);

    let mut poi = Poi2D::new(5, 32);
    estimator.compute(&mut poi).unwrap();
    assert_eq!(poi.result.zncc, -1.0);
    assert_eq!(poi.deformation.u, 0.0);
    assert_eq!(poi.result.iteration, 0);
}

#[test]
fn test_nan_guess_rejected() {
    let reference = common::speckle_image(64, 64, 1.6, 7);
    let target = reference.clone();

    let mut estimator = FftCc2D::new(&FftCcConfig2D::default()).unwrap();
    estimator.set_images(&reference, &target);

    let mut poi = Poi2D::new(32, 32);
    poi.deformation.u = f64::NAN;
    estimator.compute(&mut poi).unwrap();
    assert_eq!(poi.result.zncc, -1.0);
}

#[test]
fn test_compute_before_set_images_errors() {
    let estimator = FftCc2D::new(&FftCcConfig2D::default()).unwrap();
    let mut poi = Poi2D::new(32, 32);
    assert!(estimator.compute(&mut poi).is_err());
}

#[test]
fn test_batch_matches_serial_and_is_deterministic() {
    let reference = common::speckle_image(128, 128, 1.6, 99);
    let target = common::shift_image_integer(&reference, 2, 1);

    let mut estimator = FftCc2D::new(&FftCcConfig2D::default()).unwrap();
    estimator.set_images(&reference, &target);

    let grid = poi_grid_2d(32, 32, 96, 96, 16);
    let mut batch = grid.clone();
    let mut serial = grid.clone();
    let mut repeat = grid;

    estimator.compute_batch(&mut batch).unwrap();
    for poi in serial.iter_mut() {
        estimator.compute(poi).unwrap();
    }
    estimator.compute_batch(&mut repeat).unwrap();

    for ((b, s), r) in batch.iter().zip(&serial).zip(&repeat) {
        assert_eq!(b.deformation, s.deformation);
        assert_eq!(b.result, s.result);
        assert_eq!(b.result, r.result);
    }
}

#[test]
fn test_integer_shift_recovered_3d() {
    let reference = common::speckle_volume(48, 1.6, 21);
    let target = common::shift_volume_integer(&reference, 2, 1, -1);

    let mut estimator = FftCc3D::new(&FftCcConfig3D::default()).unwrap();
    estimator.set_images(&reference, &target);

    let mut poi = Poi3D::new(24, 24, 24);
    estimator.compute(&mut poi).unwrap();

    assert_eq!(poi.deformation.u, 2.0);
    assert_eq!(poi.deformation.v, 1.0);
    assert_eq!(poi.deformation.w, -1.0);
    assert!(
        poi.result.zncc > 0.6,
        "zncc={} should be high for a pure shift",
        poi.result.zncc
    );
}

// Blob autocorrelation is Gaussian with sigma*sqrt(2); sigma = 1.8 puts
// the full width at half maximum near 6 pixels.
#[test]
fn test_speckle_size_half_peak_width() {
    let image = common::speckle_image(128, 128, 1.8, 33);

    let single = speckle_size_2d(&image, 64, 64, 16, 16, 0.5).unwrap();
    assert!(
        (single.x - 6.0).abs() < 1.5,
        "speckle width x={} should be near 6",
        single.x
    );
    assert!(
        (single.y - 6.0).abs() < 1.5,
        "speckle width y={} should be near 6",
        single.y
    );

    let mean = mean_speckle_size_2d(&image, 16, 16, 32, 0.5).unwrap();
    assert!(
        (mean.x - 6.0).abs() < 1.0,
        "mean speckle width x={} should be near 6",
        mean.x
    );
    assert!(
        (mean.y - 6.0).abs() < 1.0,
        "mean speckle width y={} should be near 6",
        mean.y
    );
}

#[test]
fn test_speckle_size_rejects_border_window() {
    let image = common::speckle_image(64, 64, 1.8, 33);
    assert!(speckle_size_2d(&image, 4, 32, 16, 16, 0.5).is_none());
}
