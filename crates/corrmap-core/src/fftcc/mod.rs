mod fftcc2d;
mod fftcc3d;
mod scratch;
pub mod speckle;

pub use fftcc2d::FftCc2D;
pub use fftcc3d::FftCc3D;
pub use speckle::{
    mean_speckle_size_2d, mean_speckle_size_3d, speckle_size_2d, speckle_size_3d, SpeckleSize2D,
    SpeckleSize3D,
};

use serde::{Deserialize, Serialize};

use crate::consts::DEFAULT_HALF_PEAK_RATIO;

/// Configuration for the 2D spectral displacement estimator.
///
/// The correlation window is `2r` on each side (even, FFT-friendly),
/// unlike the odd `2r+1` refinement subsets.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct FftCcConfig2D {
    pub subset_radius_x: usize,
    pub subset_radius_y: usize,
    /// Worker count; also sizes the per-thread scratch pool.
    pub thread_number: usize,
    /// Ratio for the speckle-size diagnostic.
    pub half_peak_ratio: f64,
}

impl Default for FftCcConfig2D {
    fn default() -> Self {
        Self {
            subset_radius_x: 16,
            subset_radius_y: 16,
            thread_number: 4,
            half_peak_ratio: DEFAULT_HALF_PEAK_RATIO,
        }
    }
}

/// Configuration for the 3D spectral displacement estimator.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct FftCcConfig3D {
    pub subset_radius_x: usize,
    pub subset_radius_y: usize,
    pub subset_radius_z: usize,
    pub thread_number: usize,
    pub half_peak_ratio: f64,
}

impl Default for FftCcConfig3D {
    fn default() -> Self {
        Self {
            subset_radius_x: 8,
            subset_radius_y: 8,
            subset_radius_z: 8,
            thread_number: 4,
            half_peak_ratio: DEFAULT_HALF_PEAK_RATIO,
        }
    }
}
