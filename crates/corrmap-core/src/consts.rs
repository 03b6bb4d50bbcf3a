/// ZNCC marker for a POI rejected before estimation (subset outside the
/// image, or a non-finite initial guess).
pub const ZNCC_OUT_OF_BOUNDS: f64 = -1.0;

/// ZNCC marker for a degenerate POI (textureless subset or singular
/// Hessian). Distinct from [`ZNCC_OUT_OF_BOUNDS`] so callers can tell the
/// two failure modes apart.
pub const ZNCC_DEGENERATE: f64 = -2.0;

/// Zero-mean subset norms below this threshold count as textureless.
pub const MIN_SUBSET_NORM: f64 = 1e-10;

/// Cubic B-spline prefilter pole, sqrt(3) - 2.
pub const BSPLINE_POLE: f64 = -0.267_949_192_431_122_7;

/// Default convergence threshold on the deformation increment norm.
pub const DEFAULT_CONV_CRITERION: f64 = 0.001;

/// Default iteration cap for Gauss-Newton refinement.
pub const DEFAULT_STOP_CONDITION: usize = 10;

/// Default normalized-correlation ratio for the speckle-size diagnostic.
pub const DEFAULT_HALF_PEAK_RATIO: f64 = 0.5;
