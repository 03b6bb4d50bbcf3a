use ndarray::{Array3, Axis};

use super::{bspline_weights, clamp_index, prefilter_line};
use crate::image::Image3D;
use crate::point::Point3D;

/// Tricubic B-spline reconstruction of a volume, the 3D counterpart of
/// [`super::BicubicBspline`]. Evaluation is a 4x4x4 weighted sum.
#[derive(Clone, Debug)]
pub struct TricubicBspline {
    coeffs: Array3<f64>,
    depth: usize,
    height: usize,
    width: usize,
}

impl TricubicBspline {
    pub fn prepare(volume: &Image3D) -> Self {
        let (d, h, w) = volume.data.dim();
        let mut coeffs = volume.data.mapv(|v| v as f64);

        // x lanes are contiguous in the standard layout.
        for mut lane in coeffs.lanes_mut(Axis(2)) {
            prefilter_line(lane.as_slice_mut().unwrap());
        }

        let mut line = vec![0.0; h.max(d)];
        for s in 0..d {
            for c in 0..w {
                for r in 0..h {
                    line[r] = coeffs[[s, r, c]];
                }
                prefilter_line(&mut line[..h]);
                for r in 0..h {
                    coeffs[[s, r, c]] = line[r];
                }
            }
        }
        for r in 0..h {
            for c in 0..w {
                for s in 0..d {
                    line[s] = coeffs[[s, r, c]];
                }
                prefilter_line(&mut line[..d]);
                for s in 0..d {
                    coeffs[[s, r, c]] = line[s];
                }
            }
        }

        Self {
            coeffs,
            depth: d,
            height: h,
            width: w,
        }
    }

    pub fn sample(&self, p: &Point3D) -> f64 {
        let xf = p.x.floor();
        let yf = p.y.floor();
        let zf = p.z.floor();
        let wx = bspline_weights(p.x - xf);
        let wy = bspline_weights(p.y - yf);
        let wz = bspline_weights(p.z - zf);
        let ix = xf as i64;
        let iy = yf as i64;
        let iz = zf as i64;

        let mut acc = 0.0;
        for (k, wzk) in wz.iter().enumerate() {
            let s = clamp_index(iz - 1 + k as i64, self.depth);
            let mut plane_acc = 0.0;
            for (j, wyj) in wy.iter().enumerate() {
                let r = clamp_index(iy - 1 + j as i64, self.height);
                let mut row_acc = 0.0;
                for (i, wxi) in wx.iter().enumerate() {
                    let c = clamp_index(ix - 1 + i as i64, self.width);
                    row_acc += wxi * self.coeffs[[s, r, c]];
                }
                plane_acc += wyj * row_acc;
            }
            acc += wzk * plane_acc;
        }
        acc
    }
}
