use std::error::Error;
use std::fmt;

/// Errors surfaced by solver construction and stepping.
#[derive(Debug, Clone, PartialEq)]
pub enum ModelError {
    /// Two grids that must share a shape disagree.
    ShapeMismatch {
        expected: (usize, usize),
        found: (usize, usize),
    },
    /// Cell sizes must be strictly positive and finite.
    InvalidCellSize { dx: f64, dy: f64 },
    /// The grid is too small for the mirrored boundary stencil.
    GridTooSmall { ny: usize, nx: usize },
    /// A scalar or per-cell parameter is outside its admissible range.
    InvalidParameter { name: &'static str, value: f64 },
    /// Non-finite thickness or momentum detected after a step; the solver
    /// state is unusable from here on.
    Diverged { step: u64 },
}

impl fmt::Display for ModelError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ModelError::ShapeMismatch { expected, found } => write!(
                f,
                "grid shape mismatch: expected {}x{}, got {}x{}",
                expected.0, expected.1, found.0, found.1
            ),
            ModelError::InvalidCellSize { dx, dy } => {
                write!(f, "cell sizes must be positive, got dx={}, dy={}", dx, dy)
            }
            ModelError::GridTooSmall { ny, nx } => {
                write!(f, "grid must be at least 3x3, got {}x{}", ny, nx)
            }
            ModelError::InvalidParameter { name, value } => {
                write!(f, "parameter {} is out of range: {}", name, value)
            }
            ModelError::Diverged { step } => {
                write!(f, "non-finite state after step {}, simulation diverged", step)
            }
        }
    }
}

impl Error for ModelError {}
