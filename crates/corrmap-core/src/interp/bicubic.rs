use ndarray::Array2;

use super::{bspline_weights, clamp_index, prefilter_line};
use crate::image::Image2D;
use crate::point::Point2D;

/// Bicubic B-spline reconstruction of an image at arbitrary real
/// coordinates. `prepare` runs the separable prefilter over the whole
/// image once; `sample` is then a 4x4 weighted sum of coefficients.
#[derive(Clone, Debug)]
pub struct BicubicBspline {
    coeffs: Array2<f64>,
    height: usize,
    width: usize,
}

impl BicubicBspline {
    pub fn prepare(image: &Image2D) -> Self {
        let (h, w) = image.data.dim();
        let mut coeffs = image.data.mapv(|v| v as f64);

        for mut row in coeffs.rows_mut() {
            prefilter_line(row.as_slice_mut().unwrap());
        }

        let mut col = vec![0.0; h];
        for c in 0..w {
            for r in 0..h {
                col[r] = coeffs[[r, c]];
            }
            prefilter_line(&mut col);
            for r in 0..h {
                coeffs[[r, c]] = col[r];
            }
        }

        Self {
            coeffs,
            height: h,
            width: w,
        }
    }

    /// Interpolated value at a real coordinate. Coefficient indices are
    /// clamped to the grid; far out-of-bounds evaluation is unspecified
    /// and callers clip.
    pub fn sample(&self, p: &Point2D) -> f64 {
        let xf = p.x.floor();
        let yf = p.y.floor();
        let wx = bspline_weights(p.x - xf);
        let wy = bspline_weights(p.y - yf);
        let ix = xf as i64;
        let iy = yf as i64;

        let mut acc = 0.0;
        for (j, wyj) in wy.iter().enumerate() {
            let r = clamp_index(iy - 1 + j as i64, self.height);
            let mut row_acc = 0.0;
            for (i, wxi) in wx.iter().enumerate() {
                let c = clamp_index(ix - 1 + i as i64, self.width);
                row_acc += wxi * self.coeffs[[r, c]];
            }
            acc += wyj * row_acc;
        }
        acc
    }
}
