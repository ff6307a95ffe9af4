use ndarray::Array2;

use crate::error::ModelError;

/// Mirrored index for the closed reflective boundary. Out-of-range neighbour
/// positions reflect about the edge cell: -1 maps to 1 and n maps to n - 2,
/// so central differences at the rim see a symmetric extension of the grid.
#[inline]
pub(crate) fn mirror(idx: isize, n: usize) -> usize {
    if idx < 0 {
        (-idx) as usize
    } else if idx as usize >= n {
        2 * n - 2 - idx as usize
    } else {
        idx as usize
    }
}

/// Static bed geometry: elevation, central-difference slopes and the
/// bed-normal cosine. Everything is computed once at construction and
/// immutable afterwards; the solver only reads from it.
#[derive(Debug, Clone)]
pub struct Terrain {
    bed: Array2<f64>,
    grad_x: Array2<f64>,
    grad_y: Array2<f64>,
    cos_beta: Array2<f64>,
    dx: f64,
    dy: f64,
}

impl Terrain {
    /// Build the terrain from a bed elevation grid and cell sizes.
    ///
    /// Rows index y, columns index x. The grid must be at least 3x3 so the
    /// mirrored stencil is well defined.
    pub fn new(bed: Array2<f64>, dx: f64, dy: f64) -> Result<Self, ModelError> {
        if !(dx > 0.0 && dx.is_finite()) || !(dy > 0.0 && dy.is_finite()) {
            return Err(ModelError::InvalidCellSize { dx, dy });
        }
        let (ny, nx) = bed.dim();
        if ny < 3 || nx < 3 {
            return Err(ModelError::GridTooSmall { ny, nx });
        }
        if let Some(v) = bed.iter().find(|v| !v.is_finite()) {
            return Err(ModelError::InvalidParameter {
                name: "bed",
                value: *v,
            });
        }

        let mut grad_x = Array2::zeros((ny, nx));
        let mut grad_y = Array2::zeros((ny, nx));
        let mut cos_beta = Array2::zeros((ny, nx));
        for i in 0..ny {
            for j in 0..nx {
                let jl = mirror(j as isize - 1, nx);
                let jr = mirror(j as isize + 1, nx);
                let il = mirror(i as isize - 1, ny);
                let ir = mirror(i as isize + 1, ny);
                let bx = (bed[[i, jr]] - bed[[i, jl]]) / (2.0 * dx);
                let by = (bed[[ir, j]] - bed[[il, j]]) / (2.0 * dy);
                grad_x[[i, j]] = bx;
                grad_y[[i, j]] = by;
                cos_beta[[i, j]] = 1.0 / (1.0 + bx * bx + by * by).sqrt();
            }
        }

        Ok(Self {
            bed,
            grad_x,
            grad_y,
            cos_beta,
            dx,
            dy,
        })
    }

    pub fn bed(&self) -> &Array2<f64> {
        &self.bed
    }

    /// Bed slope db/dx.
    pub fn grad_x(&self) -> &Array2<f64> {
        &self.grad_x
    }

    /// Bed slope db/dy.
    pub fn grad_y(&self) -> &Array2<f64> {
        &self.grad_y
    }

    /// Cosine of the local bed inclination, in (0, 1].
    pub fn cos_beta(&self) -> &Array2<f64> {
        &self.cos_beta
    }

    pub fn dx(&self) -> f64 {
        self.dx
    }

    pub fn dy(&self) -> f64 {
        self.dy
    }

    /// Grid shape as (ny, nx).
    pub fn shape(&self) -> (usize, usize) {
        self.bed.dim()
    }
}
