mod icgn2d1;
mod icgn2d2;
mod icgn3d1;

pub use icgn2d1::Icgn2D1;
pub use icgn2d2::Icgn2D2;
pub use icgn3d1::Icgn3D1;

use serde::{Deserialize, Serialize};

use crate::consts::{DEFAULT_CONV_CRITERION, DEFAULT_STOP_CONDITION};
use crate::error::{CorrError, Result};

/// Configuration shared by the 2D Gauss-Newton estimators. Subsets are
/// `2r+1` on each side, centered on the POI.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct IcgnConfig2D {
    pub subset_radius_x: usize,
    pub subset_radius_y: usize,
    /// Convergence threshold on the radius-weighted increment norm.
    pub conv_criterion: f64,
    /// Iteration cap.
    pub stop_condition: usize,
    /// Worker count; also sizes the per-thread scratch pool.
    pub thread_number: usize,
}

impl Default for IcgnConfig2D {
    fn default() -> Self {
        Self {
            subset_radius_x: 16,
            subset_radius_y: 16,
            conv_criterion: DEFAULT_CONV_CRITERION,
            stop_condition: DEFAULT_STOP_CONDITION,
            thread_number: 4,
        }
    }
}

/// Configuration for the 3D Gauss-Newton estimator.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct IcgnConfig3D {
    pub subset_radius_x: usize,
    pub subset_radius_y: usize,
    pub subset_radius_z: usize,
    pub conv_criterion: f64,
    pub stop_condition: usize,
    pub thread_number: usize,
}

impl Default for IcgnConfig3D {
    fn default() -> Self {
        Self {
            subset_radius_x: 8,
            subset_radius_y: 8,
            subset_radius_z: 8,
            conv_criterion: DEFAULT_CONV_CRITERION,
            stop_condition: DEFAULT_STOP_CONDITION,
            thread_number: 4,
        }
    }
}

fn check_common(
    radii: &[usize],
    conv_criterion: f64,
    stop_condition: usize,
    threads: usize,
) -> Result<()> {
    if radii.iter().any(|&r| r == 0) {
        return Err(CorrError::InvalidConfig(
            "subset radii must be positive".into(),
        ));
    }
    if !conv_criterion.is_finite() || conv_criterion <= 0.0 {
        return Err(CorrError::InvalidConfig(
            "conv_criterion must be positive".into(),
        ));
    }
    if stop_condition == 0 {
        return Err(CorrError::InvalidConfig(
            "stop_condition must be at least 1".into(),
        ));
    }
    if threads == 0 {
        return Err(CorrError::InvalidConfig(
            "thread_number must be positive".into(),
        ));
    }
    Ok(())
}
