use ndarray::{Array2, Array3};

/// A single grayscale image.
/// Pixel data is row-major with shape `(height, width)`. The view is
/// read-only during a compute call; lookups are unchecked by contract and
/// callers clip coordinates before access.
#[derive(Clone, Debug)]
pub struct Image2D {
    pub data: Array2<f32>,
}

impl Image2D {
    pub fn new(data: Array2<f32>) -> Self {
        Self { data }
    }

    pub fn width(&self) -> usize {
        self.data.ncols()
    }

    pub fn height(&self) -> usize {
        self.data.nrows()
    }

    #[inline]
    pub fn value(&self, y: usize, x: usize) -> f32 {
        self.data[[y, x]]
    }
}

/// A grayscale volume with shape `(depth, height, width)`.
#[derive(Clone, Debug)]
pub struct Image3D {
    pub data: Array3<f32>,
}

impl Image3D {
    pub fn new(data: Array3<f32>) -> Self {
        Self { data }
    }

    pub fn width(&self) -> usize {
        self.data.dim().2
    }

    pub fn height(&self) -> usize {
        self.data.dim().1
    }

    pub fn depth(&self) -> usize {
        self.data.dim().0
    }

    #[inline]
    pub fn value(&self, z: usize, y: usize, x: usize) -> f32 {
        self.data[[z, y, x]]
    }
}
