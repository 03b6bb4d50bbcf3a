use approx::assert_relative_eq;

use corrmap_core::deformation::{Deformation2D1, Deformation2D2, Deformation3D1};
use corrmap_core::point::{Point2D, Point3D};

// The diagonal fields go through `1 + p` and back, so the round trip is
// exact only to machine precision.
#[test]
fn test_affine_2d_round_trip() {
    let mut d = Deformation2D1::new(1.5, 0.01, -0.02, -0.75, 0.03, 0.005);
    d.sync_from_warp();
    assert_eq!(d.u, 1.5);
    assert_relative_eq!(d.ux, 0.01, epsilon = 1e-15);
    assert_eq!(d.uy, -0.02);
    assert_eq!(d.v, -0.75);
    assert_eq!(d.vx, 0.03);
    assert_relative_eq!(d.vy, 0.005, epsilon = 1e-15);
}

#[test]
fn test_quadratic_2d_round_trip() {
    let mut d = Deformation2D2::new(
        0.7, 0.01, -0.02, 1e-4, -2e-4, 3e-4, -0.3, 0.04, 0.02, -1e-4, 2e-4, -3e-4,
    );
    d.sync_from_warp();
    assert_relative_eq!(d.u, 0.7, epsilon = 1e-15);
    assert_relative_eq!(d.ux, 0.01, epsilon = 1e-15);
    assert_relative_eq!(d.uxx, 1e-4, epsilon = 1e-15);
    assert_relative_eq!(d.uxy, -2e-4, epsilon = 1e-15);
    assert_relative_eq!(d.uyy, 3e-4, epsilon = 1e-15);
    assert_relative_eq!(d.vxx, -1e-4, epsilon = 1e-15);
    assert_relative_eq!(d.vy, 0.02, epsilon = 1e-15);
}

#[test]
fn test_affine_3d_round_trip() {
    let mut d = Deformation3D1::new(
        0.4, 0.01, 0.02, -0.01, -0.6, 0.005, -0.03, 0.01, 1.1, -0.02, 0.03, 0.04,
    );
    d.sync_from_warp();
    assert_eq!(d.u, 0.4);
    assert_eq!(d.uz, -0.01);
    assert_eq!(d.v, -0.6);
    assert_eq!(d.w, 1.1);
    assert_relative_eq!(d.wz, 0.04, epsilon = 1e-15);
}

#[test]
fn test_affine_2d_warp_point() {
    let d = Deformation2D1::new(2.0, 0.1, 0.0, -1.0, 0.0, -0.05);
    let p = d.warp_point(Point2D::new(10.0, -4.0));
    assert_relative_eq!(p.x, 10.0 * 1.1 + 2.0, max_relative = 1e-14);
    assert_relative_eq!(p.y, -4.0 * 0.95 - 1.0, max_relative = 1e-14);
}

#[test]
fn test_quadratic_2d_warp_point_matches_polynomial() {
    let (u, ux, uy, uxx, uxy, uyy) = (0.3, 0.02, -0.01, 2e-3, -1e-3, 3e-3);
    let (v, vx, vy, vxx, vxy, vyy) = (-0.2, 0.01, 0.03, -2e-3, 1e-3, -3e-3);
    let d = Deformation2D2::new(u, ux, uy, uxx, uxy, uyy, v, vx, vy, vxx, vxy, vyy);
    let (x, y) = (7.0, -5.0);
    let p = d.warp_point(Point2D::new(x, y));
    let expect_x =
        x + u + ux * x + uy * y + 0.5 * uxx * x * x + uxy * x * y + 0.5 * uyy * y * y;
    let expect_y =
        y + v + vx * x + vy * y + 0.5 * vxx * x * x + vxy * x * y + 0.5 * vyy * y * y;
    assert_relative_eq!(p.x, expect_x, max_relative = 1e-14);
    assert_relative_eq!(p.y, expect_y, max_relative = 1e-14);
}

// compose_inverse implements p <- p o q^-1, so (p o q^-1) o q must give
// back p. Exact for affine warps.
#[test]
fn test_affine_2d_inverse_composition() {
    let p = Deformation2D1::new(1.2, 0.05, -0.03, -0.8, 0.02, 0.04);
    let q = Deformation2D1::new(0.3, -0.01, 0.02, 0.5, 0.015, -0.02);
    let mut r = p;
    assert!(r.compose_inverse(&q));

    for &(x, y) in &[(0.0, 0.0), (5.0, -3.0), (-12.0, 8.0)] {
        let through = r.warp_point(q.warp_point(Point2D::new(x, y)));
        let direct = p.warp_point(Point2D::new(x, y));
        assert_relative_eq!(through.x, direct.x, epsilon = 1e-12);
        assert_relative_eq!(through.y, direct.y, epsilon = 1e-12);
    }
}

// For the quadratic warp, matrix composition equals map composition only
// to second order; with small parameters the truncation error is far
// below the tolerance.
#[test]
fn test_quadratic_2d_inverse_composition() {
    let p = Deformation2D2::new(
        0.6, 0.02, -0.01, 1e-4, -5e-5, 8e-5, -0.4, 0.01, 0.03, -1e-4, 5e-5, -8e-5,
    );
    let q = Deformation2D2::new(
        0.2, -0.01, 0.015, 5e-5, 2e-5, -4e-5, 0.3, 0.02, -0.01, 4e-5, -2e-5, 6e-5,
    );
    let mut r = p;
    assert!(r.compose_inverse(&q));

    for &(x, y) in &[(0.0, 0.0), (6.0, -4.0), (-9.0, 10.0)] {
        let through = r.warp_point(q.warp_point(Point2D::new(x, y)));
        let direct = p.warp_point(Point2D::new(x, y));
        assert_relative_eq!(through.x, direct.x, epsilon = 1e-4);
        assert_relative_eq!(through.y, direct.y, epsilon = 1e-4);
    }
}

#[test]
fn test_affine_3d_inverse_composition() {
    let p = Deformation3D1::new(
        0.9, 0.02, -0.01, 0.03, -0.5, 0.01, 0.02, -0.02, 0.7, -0.03, 0.01, 0.04,
    );
    let q = Deformation3D1::new(
        -0.3, 0.01, 0.02, -0.01, 0.4, -0.02, 0.01, 0.02, -0.6, 0.02, -0.01, 0.03,
    );
    let mut r = p;
    assert!(r.compose_inverse(&q));

    let x = Point3D::new(4.0, -6.0, 3.0);
    let through = r.warp_point(q.warp_point(x));
    let direct = p.warp_point(x);
    assert_relative_eq!(through.x, direct.x, epsilon = 1e-12);
    assert_relative_eq!(through.y, direct.y, epsilon = 1e-12);
    assert_relative_eq!(through.z, direct.z, epsilon = 1e-12);
}

#[test]
fn test_set_rebuilds_warp() {
    let mut d = Deformation2D1::identity();
    d.set(3.0, 0.0, 0.0, -2.0, 0.0, 0.0);
    let p = d.warp_point(Point2D::new(0.0, 0.0));
    assert_eq!(p.x, 3.0);
    assert_eq!(p.y, -2.0);
}
