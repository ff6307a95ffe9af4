use ndarray::Array2;

use crate::error::ModelError;

/// A rheology parameter that is either uniform over the grid or given per
/// cell. Keeping the two cases in one variant lets the kernel look values up
/// with a single call instead of branching on the configuration per step.
#[derive(Debug, Clone)]
pub enum ParamValue {
    Scalar(f64),
    Field(Array2<f64>),
}

impl ParamValue {
    /// Value at cell `(i, j)`; scalars ignore the indices.
    #[inline]
    pub fn at(&self, i: usize, j: usize) -> f64 {
        match self {
            ParamValue::Scalar(v) => *v,
            ParamValue::Field(a) => a[[i, j]],
        }
    }

    /// Smallest value over the grid.
    pub fn min(&self) -> f64 {
        match self {
            ParamValue::Scalar(v) => *v,
            ParamValue::Field(a) => a.iter().copied().fold(f64::INFINITY, f64::min),
        }
    }

    fn check_shape(&self, name: &'static str, shape: (usize, usize)) -> Result<(), ModelError> {
        match self {
            ParamValue::Scalar(v) => {
                if v.is_finite() {
                    Ok(())
                } else {
                    Err(ModelError::InvalidParameter { name, value: *v })
                }
            }
            ParamValue::Field(a) => {
                if a.dim() != shape {
                    return Err(ModelError::ShapeMismatch {
                        expected: shape,
                        found: a.dim(),
                    });
                }
                match a.iter().find(|v| !v.is_finite()) {
                    Some(v) => Err(ModelError::InvalidParameter { name, value: *v }),
                    None => Ok(()),
                }
            }
        }
    }
}

impl From<f64> for ParamValue {
    fn from(v: f64) -> Self {
        ParamValue::Scalar(v)
    }
}

impl From<Array2<f64>> for ParamValue {
    fn from(a: Array2<f64>) -> Self {
        ParamValue::Field(a)
    }
}

/// Friction and pressure parameters of the modified Voellmy rheology.
#[derive(Debug, Clone)]
pub struct ModelParams {
    /// Coulomb friction coefficient.
    pub mu: ParamValue,
    /// Voellmy bed roughness (m/s^2).
    pub xi: ParamValue,
    /// Crossover velocity at h = 1 m (m/s). Non-positive values select the
    /// conventional Voellmy rheology without a crossover.
    pub v_c: ParamValue,
    /// Thickness below which a cell cannot move (m).
    pub h_min: ParamValue,
    /// Denominator floor of the original pressure model; 0 selects the
    /// modified pressure g*h*cos^2(beta).
    pub d_min: f64,
    /// Include the centripetal term in the effective normal pressure.
    pub cent: bool,
    /// Gravitational acceleration (m/s^2).
    pub g: f64,
}

impl Default for ModelParams {
    fn default() -> Self {
        Self {
            mu: ParamValue::Scalar(0.2),
            xi: ParamValue::Scalar(500.0),
            v_c: ParamValue::Scalar(4.0),
            h_min: ParamValue::Scalar(0.0),
            d_min: 0.0,
            cent: true,
            g: 9.81,
        }
    }
}

impl ModelParams {
    pub(crate) fn validate(&self, shape: (usize, usize)) -> Result<(), ModelError> {
        self.mu.check_shape("mu", shape)?;
        self.xi.check_shape("xi", shape)?;
        self.v_c.check_shape("v_c", shape)?;
        self.h_min.check_shape("h_min", shape)?;
        if self.mu.min() < 0.0 {
            return Err(ModelError::InvalidParameter {
                name: "mu",
                value: self.mu.min(),
            });
        }
        // xi = 0 is a valid degenerate case: the turbulent update collapses
        // to an immediate stop, so only negative roughness is rejected
        if self.xi.min() < 0.0 {
            return Err(ModelError::InvalidParameter {
                name: "xi",
                value: self.xi.min(),
            });
        }
        if self.h_min.min() < 0.0 {
            return Err(ModelError::InvalidParameter {
                name: "h_min",
                value: self.h_min.min(),
            });
        }
        if self.d_min < 0.0 || !self.d_min.is_finite() {
            return Err(ModelError::InvalidParameter {
                name: "d_min",
                value: self.d_min,
            });
        }
        if !(self.g > 0.0) || !self.g.is_finite() {
            return Err(ModelError::InvalidParameter {
                name: "g",
                value: self.g,
            });
        }
        Ok(())
    }
}
