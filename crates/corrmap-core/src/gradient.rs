use ndarray::{Array2, Array3, Axis};
use rayon::prelude::*;

use crate::image::{Image2D, Image3D};

// 4th-order central difference: (1, -8, 0, 8, -1) / 12 over five samples.
// The 2-pixel border stays at zero; estimators reject POIs whose subsets
// reach it.

/// Dense x/y gradients of a 2D reference image.
#[derive(Clone, Debug)]
pub struct Gradient2D {
    pub gx: Array2<f64>,
    pub gy: Array2<f64>,
}

impl Gradient2D {
    pub fn compute(image: &Image2D) -> Self {
        let (h, w) = image.data.dim();
        let mut gx = Array2::<f64>::zeros((h, w));
        let mut gy = Array2::<f64>::zeros((h, w));

        let rows: Vec<(Vec<f64>, Vec<f64>)> = (0..h)
            .into_par_iter()
            .map(|r| {
                let mut gx_row = vec![0.0; w];
                let mut gy_row = vec![0.0; w];
                for c in 2..w.saturating_sub(2) {
                    gx_row[c] = (image.value(r, c - 2) as f64
                        - 8.0 * image.value(r, c - 1) as f64
                        + 8.0 * image.value(r, c + 1) as f64
                        - image.value(r, c + 2) as f64)
                        / 12.0;
                }
                if r >= 2 && r + 2 < h {
                    for c in 0..w {
                        gy_row[c] = (image.value(r - 2, c) as f64
                            - 8.0 * image.value(r - 1, c) as f64
                            + 8.0 * image.value(r + 1, c) as f64
                            - image.value(r + 2, c) as f64)
                            / 12.0;
                    }
                }
                (gx_row, gy_row)
            })
            .collect();

        for (r, (gx_row, gy_row)) in rows.into_iter().enumerate() {
            for c in 0..w {
                gx[[r, c]] = gx_row[c];
                gy[[r, c]] = gy_row[c];
            }
        }

        Self { gx, gy }
    }
}

/// Dense x/y/z gradients of a 3D reference volume.
#[derive(Clone, Debug)]
pub struct Gradient3D {
    pub gx: Array3<f64>,
    pub gy: Array3<f64>,
    pub gz: Array3<f64>,
}

impl Gradient3D {
    pub fn compute(volume: &Image3D) -> Self {
        let (d, h, w) = volume.data.dim();
        let mut gx = Array3::<f64>::zeros((d, h, w));
        let mut gy = Array3::<f64>::zeros((d, h, w));
        let mut gz = Array3::<f64>::zeros((d, h, w));

        let slices: Vec<(Array2<f64>, Array2<f64>, Array2<f64>)> = (0..d)
            .into_par_iter()
            .map(|s| {
                let mut gx_s = Array2::<f64>::zeros((h, w));
                let mut gy_s = Array2::<f64>::zeros((h, w));
                let mut gz_s = Array2::<f64>::zeros((h, w));
                for r in 0..h {
                    for c in 2..w.saturating_sub(2) {
                        gx_s[[r, c]] = (volume.value(s, r, c - 2) as f64
                            - 8.0 * volume.value(s, r, c - 1) as f64
                            + 8.0 * volume.value(s, r, c + 1) as f64
                            - volume.value(s, r, c + 2) as f64)
                            / 12.0;
                    }
                }
                for r in 2..h.saturating_sub(2) {
                    for c in 0..w {
                        gy_s[[r, c]] = (volume.value(s, r - 2, c) as f64
                            - 8.0 * volume.value(s, r - 1, c) as f64
                            + 8.0 * volume.value(s, r + 1, c) as f64
                            - volume.value(s, r + 2, c) as f64)
                            / 12.0;
                    }
                }
                if s >= 2 && s + 2 < d {
                    for r in 0..h {
                        for c in 0..w {
                            gz_s[[r, c]] = (volume.value(s - 2, r, c) as f64
                                - 8.0 * volume.value(s - 1, r, c) as f64
                                + 8.0 * volume.value(s + 1, r, c) as f64
                                - volume.value(s + 2, r, c) as f64)
                                / 12.0;
                        }
                    }
                }
                (gx_s, gy_s, gz_s)
            })
            .collect();

        for (s, (gx_s, gy_s, gz_s)) in slices.into_iter().enumerate() {
            gx.index_axis_mut(Axis(0), s).assign(&gx_s);
            gy.index_axis_mut(Axis(0), s).assign(&gy_s);
            gz.index_axis_mut(Axis(0), s).assign(&gz_s);
        }

        Self { gx, gy, gz }
    }
}
