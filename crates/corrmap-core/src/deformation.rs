use nalgebra::{Matrix3, Matrix4, Matrix6};

use crate::point::{Point2D, Point3D};

/// First-order (affine) 2D shape function.
///
/// Scalar parameters and the 3x3 homogeneous warp matrix are kept in sync:
/// `set` rebuilds the matrix from the scalars, `sync_from_warp` reads the
/// scalars back. The matrix form is what makes the inverse-compositional
/// update a plain matrix product.
#[derive(Clone, Copy, Debug)]
pub struct Deformation2D1 {
    pub u: f64,
    pub ux: f64,
    pub uy: f64,
    pub v: f64,
    pub vx: f64,
    pub vy: f64,
    warp: Matrix3<f64>,
}

impl Deformation2D1 {
    pub fn new(u: f64, ux: f64, uy: f64, v: f64, vx: f64, vy: f64) -> Self {
        let mut d = Self {
            u,
            ux,
            uy,
            v,
            vx,
            vy,
            warp: Matrix3::identity(),
        };
        d.rebuild_warp();
        d
    }

    pub fn identity() -> Self {
        Self::new(0.0, 0.0, 0.0, 0.0, 0.0, 0.0)
    }

    pub fn set(&mut self, u: f64, ux: f64, uy: f64, v: f64, vx: f64, vy: f64) {
        self.u = u;
        self.ux = ux;
        self.uy = uy;
        self.v = v;
        self.vx = vx;
        self.vy = vy;
        self.rebuild_warp();
    }

    fn rebuild_warp(&mut self) {
        self.warp = Matrix3::new(
            1.0 + self.ux,
            self.uy,
            self.u,
            self.vx,
            1.0 + self.vy,
            self.v,
            0.0,
            0.0,
            1.0,
        );
    }

    /// Read the scalar parameters back from the current warp matrix.
    pub fn sync_from_warp(&mut self) {
        self.ux = self.warp[(0, 0)] - 1.0;
        self.uy = self.warp[(0, 1)];
        self.u = self.warp[(0, 2)];
        self.vx = self.warp[(1, 0)];
        self.vy = self.warp[(1, 1)] - 1.0;
        self.v = self.warp[(1, 2)];
    }

    pub fn warp(&self) -> &Matrix3<f64> {
        &self.warp
    }

    /// Apply the warp to a subset-local point.
    pub fn warp_point(&self, p: Point2D) -> Point2D {
        Point2D::new(
            self.warp[(0, 0)] * p.x + self.warp[(0, 1)] * p.y + self.warp[(0, 2)],
            self.warp[(1, 0)] * p.x + self.warp[(1, 1)] * p.y + self.warp[(1, 2)],
        )
    }

    /// Inverse-compositional update: `self <- self o incr^-1`.
    /// Returns false if the increment warp is singular.
    pub fn compose_inverse(&mut self, incr: &Self) -> bool {
        match incr.warp.try_inverse() {
            Some(inv) => {
                self.warp *= inv;
                self.sync_from_warp();
                true
            }
            None => false,
        }
    }
}

/// Second-order (quadratic) 2D shape function.
///
/// The warp acts on the monomial vector `[x^2, xy, y^2, x, y, 1]`. The 6x6
/// matrix entries are the closed-form products for which multiplying two
/// warp matrices equals composing the underlying quadratic maps truncated
/// to second order; a component-wise parameter update would not compose.
#[derive(Clone, Copy, Debug)]
pub struct Deformation2D2 {
    pub u: f64,
    pub ux: f64,
    pub uy: f64,
    pub uxx: f64,
    pub uxy: f64,
    pub uyy: f64,
    pub v: f64,
    pub vx: f64,
    pub vy: f64,
    pub vxx: f64,
    pub vxy: f64,
    pub vyy: f64,
    warp: Matrix6<f64>,
}

impl Deformation2D2 {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        u: f64,
        ux: f64,
        uy: f64,
        uxx: f64,
        uxy: f64,
        uyy: f64,
        v: f64,
        vx: f64,
        vy: f64,
        vxx: f64,
        vxy: f64,
        vyy: f64,
    ) -> Self {
        let mut d = Self {
            u,
            ux,
            uy,
            uxx,
            uxy,
            uyy,
            v,
            vx,
            vy,
            vxx,
            vxy,
            vyy,
            warp: Matrix6::identity(),
        };
        d.rebuild_warp();
        d
    }

    pub fn identity() -> Self {
        Self::new(
            0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0,
        )
    }

    #[allow(clippy::too_many_arguments)]
    pub fn set(
        &mut self,
        u: f64,
        ux: f64,
        uy: f64,
        uxx: f64,
        uxy: f64,
        uyy: f64,
        v: f64,
        vx: f64,
        vy: f64,
        vxx: f64,
        vxy: f64,
        vyy: f64,
    ) {
        self.u = u;
        self.ux = ux;
        self.uy = uy;
        self.uxx = uxx;
        self.uxy = uxy;
        self.uyy = uyy;
        self.v = v;
        self.vx = vx;
        self.vy = vy;
        self.vxx = vxx;
        self.vxy = vxy;
        self.vyy = vyy;
        self.rebuild_warp();
    }

    fn rebuild_warp(&mut self) {
        // x' = a + b x + c y + d x^2 + e xy + f y^2, likewise y' with the
        // primed coefficients. Rows 0..2 carry the second-order expansions
        // of x'^2, x'y', y'^2.
        let a = self.u;
        let b = 1.0 + self.ux;
        let c = self.uy;
        let d = 0.5 * self.uxx;
        let e = self.uxy;
        let f = 0.5 * self.uyy;

        let a2 = self.v;
        let b2 = self.vx;
        let c2 = 1.0 + self.vy;
        let d2 = 0.5 * self.vxx;
        let e2 = self.vxy;
        let f2 = 0.5 * self.vyy;

        let mut w = Matrix6::zeros();

        w[(0, 0)] = b * b + 2.0 * a * d;
        w[(0, 1)] = 2.0 * b * c + 2.0 * a * e;
        w[(0, 2)] = c * c + 2.0 * a * f;
        w[(0, 3)] = 2.0 * a * b;
        w[(0, 4)] = 2.0 * a * c;
        w[(0, 5)] = a * a;

        w[(1, 0)] = b * b2 + a * d2 + a2 * d;
        w[(1, 1)] = b * c2 + b2 * c + a * e2 + a2 * e;
        w[(1, 2)] = c * c2 + a * f2 + a2 * f;
        w[(1, 3)] = a * b2 + a2 * b;
        w[(1, 4)] = a * c2 + a2 * c;
        w[(1, 5)] = a * a2;

        w[(2, 0)] = b2 * b2 + 2.0 * a2 * d2;
        w[(2, 1)] = 2.0 * b2 * c2 + 2.0 * a2 * e2;
        w[(2, 2)] = c2 * c2 + 2.0 * a2 * f2;
        w[(2, 3)] = 2.0 * a2 * b2;
        w[(2, 4)] = 2.0 * a2 * c2;
        w[(2, 5)] = a2 * a2;

        w[(3, 0)] = d;
        w[(3, 1)] = e;
        w[(3, 2)] = f;
        w[(3, 3)] = b;
        w[(3, 4)] = c;
        w[(3, 5)] = a;

        w[(4, 0)] = d2;
        w[(4, 1)] = e2;
        w[(4, 2)] = f2;
        w[(4, 3)] = b2;
        w[(4, 4)] = c2;
        w[(4, 5)] = a2;

        w[(5, 5)] = 1.0;

        self.warp = w;
    }

    /// Read the scalar parameters back from rows 3 and 4 of the warp.
    pub fn sync_from_warp(&mut self) {
        self.uxx = 2.0 * self.warp[(3, 0)];
        self.uxy = self.warp[(3, 1)];
        self.uyy = 2.0 * self.warp[(3, 2)];
        self.ux = self.warp[(3, 3)] - 1.0;
        self.uy = self.warp[(3, 4)];
        self.u = self.warp[(3, 5)];

        self.vxx = 2.0 * self.warp[(4, 0)];
        self.vxy = self.warp[(4, 1)];
        self.vyy = 2.0 * self.warp[(4, 2)];
        self.vx = self.warp[(4, 3)];
        self.vy = self.warp[(4, 4)] - 1.0;
        self.v = self.warp[(4, 5)];
    }

    pub fn warp(&self) -> &Matrix6<f64> {
        &self.warp
    }

    pub fn warp_point(&self, p: Point2D) -> Point2D {
        let xx = p.x * p.x;
        let xy = p.x * p.y;
        let yy = p.y * p.y;
        let w = &self.warp;
        Point2D::new(
            w[(3, 0)] * xx + w[(3, 1)] * xy + w[(3, 2)] * yy
                + w[(3, 3)] * p.x
                + w[(3, 4)] * p.y
                + w[(3, 5)],
            w[(4, 0)] * xx + w[(4, 1)] * xy + w[(4, 2)] * yy
                + w[(4, 3)] * p.x
                + w[(4, 4)] * p.y
                + w[(4, 5)],
        )
    }

    /// Inverse-compositional update: `self <- self o incr^-1`.
    /// Returns false if the increment warp is singular.
    pub fn compose_inverse(&mut self, incr: &Self) -> bool {
        match incr.warp.try_inverse() {
            Some(inv) => {
                self.warp *= inv;
                self.sync_from_warp();
                true
            }
            None => false,
        }
    }
}

/// First-order (affine) 3D shape function with a 4x4 homogeneous warp.
#[derive(Clone, Copy, Debug)]
pub struct Deformation3D1 {
    pub u: f64,
    pub ux: f64,
    pub uy: f64,
    pub uz: f64,
    pub v: f64,
    pub vx: f64,
    pub vy: f64,
    pub vz: f64,
    pub w: f64,
    pub wx: f64,
    pub wy: f64,
    pub wz: f64,
    warp: Matrix4<f64>,
}

impl Deformation3D1 {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        u: f64,
        ux: f64,
        uy: f64,
        uz: f64,
        v: f64,
        vx: f64,
        vy: f64,
        vz: f64,
        w: f64,
        wx: f64,
        wy: f64,
        wz: f64,
    ) -> Self {
        let mut d = Self {
            u,
            ux,
            uy,
            uz,
            v,
            vx,
            vy,
            vz,
            w,
            wx,
            wy,
            wz,
            warp: Matrix4::identity(),
        };
        d.rebuild_warp();
        d
    }

    pub fn identity() -> Self {
        Self::new(
            0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0,
        )
    }

    #[allow(clippy::too_many_arguments)]
    pub fn set(
        &mut self,
        u: f64,
        ux: f64,
        uy: f64,
        uz: f64,
        v: f64,
        vx: f64,
        vy: f64,
        vz: f64,
        w: f64,
        wx: f64,
        wy: f64,
        wz: f64,
    ) {
        self.u = u;
        self.ux = ux;
        self.uy = uy;
        self.uz = uz;
        self.v = v;
        self.vx = vx;
        self.vy = vy;
        self.vz = vz;
        self.w = w;
        self.wx = wx;
        self.wy = wy;
        self.wz = wz;
        self.rebuild_warp();
    }

    fn rebuild_warp(&mut self) {
        self.warp = Matrix4::new(
            1.0 + self.ux,
            self.uy,
            self.uz,
            self.u,
            self.vx,
            1.0 + self.vy,
            self.vz,
            self.v,
            self.wx,
            self.wy,
            1.0 + self.wz,
            self.w,
            0.0,
            0.0,
            0.0,
            1.0,
        );
    }

    pub fn sync_from_warp(&mut self) {
        self.ux = self.warp[(0, 0)] - 1.0;
        self.uy = self.warp[(0, 1)];
        self.uz = self.warp[(0, 2)];
        self.u = self.warp[(0, 3)];
        self.vx = self.warp[(1, 0)];
        self.vy = self.warp[(1, 1)] - 1.0;
        self.vz = self.warp[(1, 2)];
        self.v = self.warp[(1, 3)];
        self.wx = self.warp[(2, 0)];
        self.wy = self.warp[(2, 1)];
        self.wz = self.warp[(2, 2)] - 1.0;
        self.w = self.warp[(2, 3)];
    }

    pub fn warp(&self) -> &Matrix4<f64> {
        &self.warp
    }

    pub fn warp_point(&self, p: Point3D) -> Point3D {
        let w = &self.warp;
        Point3D::new(
            w[(0, 0)] * p.x + w[(0, 1)] * p.y + w[(0, 2)] * p.z + w[(0, 3)],
            w[(1, 0)] * p.x + w[(1, 1)] * p.y + w[(1, 2)] * p.z + w[(1, 3)],
            w[(2, 0)] * p.x + w[(2, 1)] * p.y + w[(2, 2)] * p.z + w[(2, 3)],
        )
    }

    /// Inverse-compositional update: `self <- self o incr^-1`.
    /// Returns false if the increment warp is singular.
    pub fn compose_inverse(&mut self, incr: &Self) -> bool {
        match incr.warp.try_inverse() {
            Some(inv) => {
                self.warp *= inv;
                self.sync_from_warp();
                true
            }
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn affine_warp_round_trip() {
        let mut d = Deformation2D1::new(1.5, 0.01, -0.02, -0.75, 0.03, 0.005);
        d.sync_from_warp();
        assert_eq!(d.u, 1.5);
        assert!((d.ux - 0.01).abs() < 1e-15);
        assert!((d.vy - 0.005).abs() < 1e-15);
    }

    #[test]
    fn quadratic_identity_is_identity_matrix() {
        let d = Deformation2D2::identity();
        assert_eq!(*d.warp(), Matrix6::identity());
    }
}
