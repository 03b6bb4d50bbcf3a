mod common;

use corrmap_core::fftcc::{FftCc2D, FftCcConfig2D};
use corrmap_core::icgn::{Icgn2D1, Icgn2D2, Icgn3D1, IcgnConfig2D, IcgnConfig3D};
use corrmap_core::poi::{poi_grid_2d, Poi2D, Poi3D};

#[test]
fn test_identity_deformation_converges_immediately() {
    let reference = common::speckle_image(128, 128, 1.6, 4);
    let target = reference.clone();

    let mut estimator = Icgn2D1::new(&IcgnConfig2D::default()).unwrap();
    estimator.set_images(&reference, &target);
    estimator.prepare().unwrap();

    let mut poi = Poi2D::new(64, 64);
    estimator.compute(&mut poi).unwrap();

    assert!(poi.result.iteration <= 2, "iteration={}", poi.result.iteration);
    assert!(
        poi.result.zncc >= 1.0 - 1e-5,
        "zncc={} should be ~1",
        poi.result.zncc
    );
    assert!(poi.deformation.u.abs() < 1e-4);
    assert!(poi.deformation.v.abs() < 1e-4);
}

#[test]
fn test_subpixel_translation_2d1() {
    let reference = common::smooth_image(256, 256, 0.0, 0.0);
    let target = common::smooth_image(256, 256, 0.4, 0.7);

    let mut estimator = Icgn2D1::new(&IcgnConfig2D::default()).unwrap();
    estimator.set_images(&reference, &target);
    estimator.prepare().unwrap();

    let mut poi = Poi2D::new(128, 128);
    estimator.compute(&mut poi).unwrap();

    assert!(
        (poi.deformation.u - 0.4).abs() < 0.01,
        "u={} should be ~0.4",
        poi.deformation.u
    );
    assert!(
        (poi.deformation.v - 0.7).abs() < 0.01,
        "v={} should be ~0.7",
        poi.deformation.v
    );
    assert!(poi.result.iteration <= 8, "iteration={}", poi.result.iteration);
    assert!(
        poi.result.convergence < 1e-3,
        "convergence={}",
        poi.result.convergence
    );
    assert!(poi.result.zncc > 0.99, "zncc={}", poi.result.zncc);
}

#[test]
fn test_subpixel_translation_2d2() {
    let reference = common::smooth_image(256, 256, 0.0, 0.0);
    let target = common::smooth_image(256, 256, 0.4, 0.7);

    let mut estimator = Icgn2D2::new(&IcgnConfig2D::default()).unwrap();
    estimator.set_images(&reference, &target);
    estimator.prepare().unwrap();

    let mut poi = Poi2D::new(128, 128);
    estimator.compute(&mut poi).unwrap();

    assert!(
        (poi.deformation.u - 0.4).abs() < 0.01,
        "u={} should be ~0.4",
        poi.deformation.u
    );
    assert!(
        (poi.deformation.v - 0.7).abs() < 0.01,
        "v={} should be ~0.7",
        poi.deformation.v
    );
    assert!(poi.result.zncc > 0.99, "zncc={}", poi.result.zncc);
}

// FFT-CC provides the integer part, ICGN refines the fraction.
#[test]
fn test_chained_fftcc_then_icgn() {
    let reference = common::smooth_image(256, 256, 0.0, 0.0);
    let target = common::smooth_image(256, 256, 3.4, -1.7);

    let mut coarse = FftCc2D::new(&FftCcConfig2D::default()).unwrap();
    coarse.set_images(&reference, &target);
    let mut fine = Icgn2D1::new(&IcgnConfig2D::default()).unwrap();
    fine.set_images(&reference, &target);
    fine.prepare().unwrap();

    let mut poi = Poi2D::new(128, 128);
    coarse.compute(&mut poi).unwrap();
    assert!(
        (poi.deformation.u - 3.4).abs() < 1.5,
        "coarse u={} should be near 3.4",
        poi.deformation.u
    );
    assert!(
        (poi.deformation.v + 1.7).abs() < 1.5,
        "coarse v={} should be near -1.7",
        poi.deformation.v
    );

    fine.compute(&mut poi).unwrap();
    assert!(
        (poi.deformation.u - 3.4).abs() < 0.01,
        "refined u={}",
        poi.deformation.u
    );
    assert!(
        (poi.deformation.v + 1.7).abs() < 0.01,
        "refined v={}",
        poi.deformation.v
    );
}

#[test]
fn test_border_poi_rejected() {
    let reference = common::speckle_image(64, 64, 1.6, 13);
    let target = reference.clone();

    let mut estimator = Icgn2D1::new(&IcgnConfig2D::default()).unwrap();
    estimator.set_images(&reference, &target);
    estimator.prepare().unwrap();

    // 5 pixels from the edge with radius 16.
    let mut poi = Poi2D::new(5, 32);
    estimator.compute(&mut poi).unwrap();
    assert_eq!(poi.result.zncc, -1.0);
    assert_eq!(poi.deformation.u, 0.0);
    assert_eq!(poi.result.iteration, 0);
    assert_eq!(poi.result.u0, 0.0);
}

#[test]
fn test_nan_guess_rejected() {
    let reference = common::speckle_image(64, 64, 1.6, 13);
    let target = reference.clone();

    let mut estimator = Icgn2D1::new(&IcgnConfig2D::default()).unwrap();
    estimator.set_images(&reference, &target);
    estimator.prepare().unwrap();

    let mut poi = Poi2D::new(32, 32);
    poi.deformation.u = f64::NAN;
    estimator.compute(&mut poi).unwrap();
    assert_eq!(poi.result.zncc, -1.0);
}

#[test]
fn test_compute_before_prepare_errors() {
    let reference = common::speckle_image(64, 64, 1.6, 13);
    let target = reference.clone();

    let mut estimator = Icgn2D1::new(&IcgnConfig2D::default()).unwrap();
    estimator.set_images(&reference, &target);

    let mut poi = Poi2D::new(32, 32);
    assert!(estimator.compute(&mut poi).is_err());
}

#[test]
fn test_invalid_config_rejected() {
    let config = IcgnConfig2D {
        stop_condition: 0,
        ..Default::default()
    };
    assert!(Icgn2D1::new(&config).is_err());

    let config = IcgnConfig2D {
        subset_radius_x: 0,
        ..Default::default()
    };
    assert!(Icgn2D2::new(&config).is_err());
}

#[test]
fn test_set_criteria_caps_iterations() {
    let reference = common::smooth_image(128, 128, 0.0, 0.0);
    let target = common::smooth_image(128, 128, 0.4, 0.2);

    let mut estimator = Icgn2D1::new(&IcgnConfig2D::default()).unwrap();
    estimator.set_images(&reference, &target);
    estimator.prepare().unwrap();
    estimator.set_criteria(1e-12, 1);

    let mut poi = Poi2D::new(64, 64);
    estimator.compute(&mut poi).unwrap();
    assert_eq!(poi.result.iteration, 1);
    assert!(poi.result.convergence >= 1e-12);
}

#[test]
fn test_batch_matches_serial_and_is_deterministic() {
    let reference = common::smooth_image(160, 160, 0.0, 0.0);
    let target = common::smooth_image(160, 160, 0.3, -0.6);

    let mut estimator = Icgn2D1::new(&IcgnConfig2D::default()).unwrap();
    estimator.set_images(&reference, &target);
    estimator.prepare().unwrap();

    let grid = poi_grid_2d(40, 40, 120, 120, 20);
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
fn test_identity_deformation_3d() {
    let reference = common::speckle_volume(64, 1.8, 17);
    let target = reference.clone();

    let mut estimator = Icgn3D1::new(&IcgnConfig3D::default()).unwrap();
    estimator.set_images(&reference, &target);
    estimator.prepare().unwrap();

    let mut poi = Poi3D::new(32, 32, 32);
    estimator.compute(&mut poi).unwrap();

    assert!(poi.result.iteration <= 3, "iteration={}", poi.result.iteration);
    assert!(
        poi.result.zncc > 0.999,
        "zncc={} should be ~1",
        poi.result.zncc
    );
    assert!(poi.deformation.u.abs() < 1e-3);
    assert!(poi.deformation.v.abs() < 1e-3);
    assert!(poi.deformation.w.abs() < 1e-3);
}

#[test]
fn test_border_poi_rejected_3d() {
    let reference = common::speckle_volume(32, 1.8, 17);
    let target = reference.clone();

    let mut estimator = Icgn3D1::new(&IcgnConfig3D::default()).unwrap();
    estimator.set_images(&reference, &target);
    estimator.prepare().unwrap();

    let mut poi = Poi3D::new(4, 16, 16);
    estimator.compute(&mut poi).unwrap();
    assert_eq!(poi.result.zncc, -1.0);
}
