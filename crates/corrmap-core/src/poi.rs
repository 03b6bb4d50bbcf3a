/// Full 2D deformation parameter set, second order. First-order estimators
/// read and write only the six first-order fields and leave the quadratic
/// terms untouched.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct DeformationVector2D {
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
}

/// First-order 3D deformation parameter set.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct DeformationVector3D {
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
}

/// Diagnostic record attached to a 2D POI after estimation.
///
/// `u0`/`v0` hold the initial-guess displacement the estimator started
/// from; `convergence` is the final increment norm of the Gauss-Newton
/// refinement (unused by the spectral estimator).
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct PoiResult2D {
    pub u0: f64,
    pub v0: f64,
    pub zncc: f64,
    pub iteration: usize,
    pub convergence: f64,
}

/// Diagnostic record attached to a 3D POI after estimation.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct PoiResult3D {
    pub u0: f64,
    pub v0: f64,
    pub w0: f64,
    pub zncc: f64,
    pub iteration: usize,
    pub convergence: f64,
}

/// A 2D point of interest: an integer pixel center plus the current
/// deformation estimate (doubles as the input initial guess) and the
/// diagnostic record. Estimators mutate `deformation` and `result` in
/// place and never touch the center.
#[derive(Clone, Debug, Default)]
pub struct Poi2D {
    pub x: i32,
    pub y: i32,
    pub deformation: DeformationVector2D,
    pub result: PoiResult2D,
}

impl Poi2D {
    pub fn new(x: i32, y: i32) -> Self {
        Self {
            x,
            y,
            ..Default::default()
        }
    }
}

/// A 3D point of interest.
#[derive(Clone, Debug, Default)]
pub struct Poi3D {
    pub x: i32,
    pub y: i32,
    pub z: i32,
    pub deformation: DeformationVector3D,
    pub result: PoiResult3D,
}

impl Poi3D {
    pub fn new(x: i32, y: i32, z: i32) -> Self {
        Self {
            x,
            y,
            z,
            ..Default::default()
        }
    }
}

/// Build a regular grid of 2D POIs covering `[x0, x1) x [y0, y1)` with the
/// given step. Initial guesses are zero.
pub fn poi_grid_2d(x0: i32, y0: i32, x1: i32, y1: i32, step: i32) -> Vec<Poi2D> {
    let mut pois = Vec::new();
    if step <= 0 {
        return pois;
    }
    let mut y = y0;
    while y < y1 {
        let mut x = x0;
        while x < x1 {
            pois.push(Poi2D::new(x, y));
            x += step;
        }
        y += step;
    }
    pois
}

/// Build a regular grid of 3D POIs covering the given half-open ranges.
pub fn poi_grid_3d(
    x0: i32,
    y0: i32,
    z0: i32,
    x1: i32,
    y1: i32,
    z1: i32,
    step: i32,
) -> Vec<Poi3D> {
    let mut pois = Vec::new();
    if step <= 0 {
        return pois;
    }
    let mut z = z0;
    while z < z1 {
        let mut y = y0;
        while y < y1 {
            let mut x = x0;
            while x < x1 {
                pois.push(Poi3D::new(x, y, z));
                x += step;
            }
            y += step;
        }
        z += step;
    }
    pois
}
