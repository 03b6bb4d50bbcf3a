use ndarray::{Array2, Array3};

use crate::image::{Image2D, Image3D};
use crate::point::{Point2D, Point3D};

/// A `(2ry+1) x (2rx+1)` neighborhood of image values around a center.
///
/// Callers guarantee the full neighborhood lies inside the image before
/// calling `fill`; estimators reject border POIs up front.
#[derive(Clone, Debug)]
pub struct Subset2D {
    pub center: Point2D,
    pub radius_x: usize,
    pub radius_y: usize,
    pub data: Array2<f64>,
}

impl Subset2D {
    pub fn new(center: Point2D, radius_x: usize, radius_y: usize) -> Self {
        Self {
            center,
            radius_x,
            radius_y,
            data: Array2::zeros((2 * radius_y + 1, 2 * radius_x + 1)),
        }
    }

    pub fn width(&self) -> usize {
        2 * self.radius_x + 1
    }

    pub fn height(&self) -> usize {
        2 * self.radius_y + 1
    }

    /// Copy image values at integer offsets around the truncated center.
    pub fn fill(&mut self, image: &Image2D) {
        let (cx, cy) = self.center.truncate();
        let x0 = cx - self.radius_x as i32;
        let y0 = cy - self.radius_y as i32;
        for r in 0..self.height() {
            for c in 0..self.width() {
                self.data[[r, c]] =
                    image.value((y0 + r as i32) as usize, (x0 + c as i32) as usize) as f64;
            }
        }
    }

    /// Subtract the mean in place and return the L2 norm of the residual.
    /// Afterwards the subset sums to zero within floating-point tolerance.
    pub fn zero_mean_norm(&mut self) -> f64 {
        let mean = self.data.mean().unwrap_or(0.0);
        self.data -= mean;
        self.data.iter().map(|v| v * v).sum::<f64>().sqrt()
    }
}

/// A `(2rz+1) x (2ry+1) x (2rx+1)` neighborhood of volume values.
#[derive(Clone, Debug)]
pub struct Subset3D {
    pub center: Point3D,
    pub radius_x: usize,
    pub radius_y: usize,
    pub radius_z: usize,
    pub data: Array3<f64>,
}

impl Subset3D {
    pub fn new(center: Point3D, radius_x: usize, radius_y: usize, radius_z: usize) -> Self {
        Self {
            center,
            radius_x,
            radius_y,
            radius_z,
            data: Array3::zeros((2 * radius_z + 1, 2 * radius_y + 1, 2 * radius_x + 1)),
        }
    }

    pub fn width(&self) -> usize {
        2 * self.radius_x + 1
    }

    pub fn height(&self) -> usize {
        2 * self.radius_y + 1
    }

    pub fn depth(&self) -> usize {
        2 * self.radius_z + 1
    }

    pub fn fill(&mut self, volume: &Image3D) {
        let (cx, cy, cz) = self.center.truncate();
        let x0 = cx - self.radius_x as i32;
        let y0 = cy - self.radius_y as i32;
        let z0 = cz - self.radius_z as i32;
        for s in 0..self.depth() {
            for r in 0..self.height() {
                for c in 0..self.width() {
                    self.data[[s, r, c]] = volume.value(
                        (z0 + s as i32) as usize,
                        (y0 + r as i32) as usize,
                        (x0 + c as i32) as usize,
                    ) as f64;
                }
            }
        }
    }

    pub fn zero_mean_norm(&mut self) -> f64 {
        let mean = self.data.mean().unwrap_or(0.0);
        self.data -= mean;
        self.data.iter().map(|v| v * v).sum::<f64>().sqrt()
    }
}
