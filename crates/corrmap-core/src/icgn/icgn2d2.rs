use std::sync::Mutex;

use nalgebra::{SMatrix, SVector};
use ndarray::{Array2, Array3};
use rayon::prelude::*;
use tracing::{debug, info};

use super::{check_common, IcgnConfig2D};
use crate::consts::{MIN_SUBSET_NORM, ZNCC_DEGENERATE, ZNCC_OUT_OF_BOUNDS};
use crate::deformation::Deformation2D2;
use crate::error::{CorrError, Result};
use crate::gradient::Gradient2D;
use crate::image::Image2D;
use crate::interp::BicubicBspline;
use crate::point::Point2D;
use crate::poi::Poi2D;
use crate::subset::Subset2D;

type Mat12 = SMatrix<f64, 12, 12>;
type Vec12 = SVector<f64, 12>;

struct Scratch {
    ref_subset: Subset2D,
    tar_subset: Subset2D,
    error_img: Array2<f64>,
    /// Steepest-descent rows, shape `(subset_h, subset_w, 12)`.
    sd_img: Array3<f64>,
}

impl Scratch {
    fn new(radius_x: usize, radius_y: usize) -> Self {
        let h = 2 * radius_y + 1;
        let w = 2 * radius_x + 1;
        Self {
            ref_subset: Subset2D::new(Point2D::default(), radius_x, radius_y),
            tar_subset: Subset2D::new(Point2D::default(), radius_x, radius_y),
            error_img: Array2::zeros((h, w)),
            sd_img: Array3::zeros((h, w, 12)),
        }
    }
}

/// Second-order inverse-compositional Gauss-Newton refinement in 2D.
///
/// Same skeleton as [`super::Icgn2D1`] with the quadratic shape function:
/// twelve parameters, 6x6 warp on the monomial basis, and second-moment
/// terms in the steepest-descent rows and the convergence norm.
pub struct Icgn2D2<'a> {
    radius_x: usize,
    radius_y: usize,
    conv_criterion: f64,
    stop_condition: usize,
    pool: rayon::ThreadPool,
    scratch: Vec<Mutex<Scratch>>,
    ref_img: Option<&'a Image2D>,
    tar_img: Option<&'a Image2D>,
    gradient: Option<Gradient2D>,
    interp: Option<BicubicBspline>,
}

impl<'a> Icgn2D2<'a> {
    pub fn new(config: &IcgnConfig2D) -> Result<Self> {
        check_common(
            &[config.subset_radius_x, config.subset_radius_y],
            config.conv_criterion,
            config.stop_condition,
            config.thread_number,
        )?;
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(config.thread_number)
            .build()?;
        let scratch = (0..config.thread_number)
            .map(|_| Mutex::new(Scratch::new(config.subset_radius_x, config.subset_radius_y)))
            .collect();
        Ok(Self {
            radius_x: config.subset_radius_x,
            radius_y: config.subset_radius_y,
            conv_criterion: config.conv_criterion,
            stop_condition: config.stop_condition,
            pool,
            scratch,
            ref_img: None,
            tar_img: None,
            gradient: None,
            interp: None,
        })
    }

    pub fn set_images(&mut self, ref_img: &'a Image2D, tar_img: &'a Image2D) {
        self.ref_img = Some(ref_img);
        self.tar_img = Some(tar_img);
        self.gradient = None;
        self.interp = None;
    }

    pub fn prepare(&mut self) -> Result<()> {
        let (ref_img, tar_img) = self.images()?;
        debug!(
            width = ref_img.width(),
            height = ref_img.height(),
            "icgn-2d2 prepare"
        );
        self.gradient = Some(Gradient2D::compute(ref_img));
        self.interp = Some(BicubicBspline::prepare(tar_img));
        Ok(())
    }

    pub fn set_criteria(&mut self, conv_criterion: f64, stop_condition: usize) {
        self.conv_criterion = conv_criterion;
        self.stop_condition = stop_condition;
    }

    fn images(&self) -> Result<(&'a Image2D, &'a Image2D)> {
        match (self.ref_img, self.tar_img) {
            (Some(r), Some(t)) => Ok((r, t)),
            _ => Err(CorrError::NotPrepared("Icgn2D2: set_images before compute")),
        }
    }

    pub fn compute(&self, poi: &mut Poi2D) -> Result<()> {
        self.compute_with_slot(poi, rayon::current_thread_index().unwrap_or(0))
    }

    pub fn compute_batch(&self, pois: &mut [Poi2D]) -> Result<()> {
        self.images()?;
        info!(pois = pois.len(), "icgn-2d2 batch");
        self.pool.install(|| {
            pois.par_iter_mut().try_for_each(|poi| {
                self.compute_with_slot(poi, rayon::current_thread_index().unwrap_or(0))
            })
        })
    }

    fn compute_with_slot(&self, poi: &mut Poi2D, slot: usize) -> Result<()> {
        if slot >= self.scratch.len() {
            return Err(CorrError::ScratchExhausted {
                index: slot,
                pool_size: self.scratch.len(),
            });
        }
        let (ref_img, _) = self.images()?;
        let gradient = self
            .gradient
            .as_ref()
            .ok_or(CorrError::NotPrepared("Icgn2D2: prepare before compute"))?;
        let interp = self
            .interp
            .as_ref()
            .ok_or(CorrError::NotPrepared("Icgn2D2: prepare before compute"))?;

        let d = &poi.deformation;
        let guess = [
            d.u, d.ux, d.uy, d.uxx, d.uxy, d.uyy, d.v, d.vx, d.vy, d.vxx, d.vxy, d.vyy,
        ];
        if guess.iter().any(|g| !g.is_finite()) {
            poi.result.zncc = ZNCC_OUT_OF_BOUNDS;
            return Ok(());
        }
        let rx = self.radius_x as i32;
        let ry = self.radius_y as i32;
        if poi.x - rx < 0
            || poi.y - ry < 0
            || poi.x + rx >= ref_img.width() as i32
            || poi.y + ry >= ref_img.height() as i32
        {
            poi.result.zncc = ZNCC_OUT_OF_BOUNDS;
            return Ok(());
        }

        let mut guard = self.scratch[slot].lock().unwrap();
        let s = &mut *guard;
        let sh = s.ref_subset.height();
        let sw = s.ref_subset.width();

        s.ref_subset.center = Point2D::from_indices(poi.x, poi.y);
        s.ref_subset.fill(ref_img);
        let ref_norm = s.ref_subset.zero_mean_norm();
        if ref_norm < MIN_SUBSET_NORM {
            poi.result.zncc = ZNCC_DEGENERATE;
            return Ok(());
        }

        let mut hessian = Mat12::zeros();
        for r in 0..sh {
            let yl = r as i32 - ry;
            for c in 0..sw {
                let xl = c as i32 - rx;
                let idx = [(poi.y + yl) as usize, (poi.x + xl) as usize];
                let gx = gradient.gx[idx];
                let gy = gradient.gy[idx];
                let x = xl as f64;
                let y = yl as f64;
                let sd = [
                    gx,
                    gx * x,
                    gx * y,
                    gx * x * x * 0.5,
                    gx * x * y,
                    gx * y * y * 0.5,
                    gy,
                    gy * x,
                    gy * y,
                    gy * x * x * 0.5,
                    gy * x * y,
                    gy * y * y * 0.5,
                ];
                for (k, v) in sd.iter().enumerate() {
                    s.sd_img[[r, c, k]] = *v;
                }
                for i in 0..12 {
                    for j in 0..12 {
                        hessian[(i, j)] += sd[i] * sd[j];
                    }
                }
            }
        }
        let hessian_inv = match hessian.try_inverse() {
            Some(inv) => inv,
            None => {
                poi.result.zncc = ZNCC_DEGENERATE;
                return Ok(());
            }
        };

        poi.result.u0 = guess[0];
        poi.result.v0 = guess[6];

        let mut p = Deformation2D2::new(
            guess[0], guess[1], guess[2], guess[3], guess[4], guess[5], guess[6], guess[7],
            guess[8], guess[9], guess[10], guess[11],
        );
        let rx2 = (self.radius_x * self.radius_x) as f64;
        let ry2 = (self.radius_y * self.radius_y) as f64;
        let cx = poi.x as f64;
        let cy = poi.y as f64;

        let mut iteration = 0usize;
        let mut dp_norm = f64::MAX;
        let mut znssd = 0.0;
        while iteration < self.stop_condition && dp_norm >= self.conv_criterion {
            iteration += 1;

            for r in 0..sh {
                for c in 0..sw {
                    let local = Point2D::new((c as i32 - rx) as f64, (r as i32 - ry) as f64);
                    let warped = p.warp_point(local);
                    let global = Point2D::new(cx + warped.x, cy + warped.y);
                    s.tar_subset.data[[r, c]] = interp.sample(&global);
                }
            }
            let tar_norm = s.tar_subset.zero_mean_norm();
            if tar_norm < MIN_SUBSET_NORM {
                poi.result.zncc = ZNCC_DEGENERATE;
                return Ok(());
            }
            let scale = ref_norm / tar_norm;

            znssd = 0.0;
            for r in 0..sh {
                for c in 0..sw {
                    let e = s.tar_subset.data[[r, c]] * scale - s.ref_subset.data[[r, c]];
                    s.error_img[[r, c]] = e;
                    znssd += e * e;
                }
            }
            znssd /= ref_norm * ref_norm;

            let mut numerator = Vec12::zeros();
            for r in 0..sh {
                for c in 0..sw {
                    let e = s.error_img[[r, c]];
                    for k in 0..12 {
                        numerator[k] += s.sd_img[[r, c, k]] * e;
                    }
                }
            }

            let dp = hessian_inv * numerator;
            let incr = Deformation2D2::new(
                dp[0], dp[1], dp[2], dp[3], dp[4], dp[5], dp[6], dp[7], dp[8], dp[9], dp[10],
                dp[11],
            );
            if !p.compose_inverse(&incr) {
                poi.result.zncc = ZNCC_DEGENERATE;
                return Ok(());
            }
            dp_norm = (dp[0] * dp[0]
                + dp[6] * dp[6]
                + (dp[1] * dp[1] + dp[7] * dp[7]) * rx2
                + (dp[2] * dp[2] + dp[8] * dp[8]) * ry2
                + (dp[3] * dp[3] + dp[9] * dp[9]) * rx2 * rx2 * 0.25
                + (dp[5] * dp[5] + dp[11] * dp[11]) * ry2 * ry2 * 0.25
                + (dp[4] * dp[4] + dp[10] * dp[10]) * rx2 * ry2)
                .sqrt();
        }

        poi.deformation.u = p.u;
        poi.deformation.ux = p.ux;
        poi.deformation.uy = p.uy;
        poi.deformation.uxx = p.uxx;
        poi.deformation.uxy = p.uxy;
        poi.deformation.uyy = p.uyy;
        poi.deformation.v = p.v;
        poi.deformation.vx = p.vx;
        poi.deformation.vy = p.vy;
        poi.deformation.vxx = p.vxx;
        poi.deformation.vxy = p.vxy;
        poi.deformation.vyy = p.vyy;
        poi.result.zncc = 0.5 * (2.0 - znssd);
        poi.result.iteration = iteration;
        poi.result.convergence = dp_norm;
        Ok(())
    }
}
