use ndarray::Array2;

use crate::error::ModelError;
use crate::params::{ModelParams, ParamValue};
use crate::terrain::Terrain;

/// A ready-to-run release scenario: terrain, initial thickness and rheology
/// parameters.
pub struct Scene {
    pub name: &'static str,
    pub terrain: Terrain,
    pub h0: Array2<f64>,
    pub params: ModelParams,
}

impl Scene {
    /// Numbered scenario lookup for the command line; unknown numbers fall
    /// back to the inclined slab.
    pub fn from_number(nr: usize) -> Result<Self, ModelError> {
        match nr {
            0 => Self::column_collapse(),
            2 => Self::valley_runout(),
            _ => Self::inclined_slab(),
        }
    }

    /// A square block released on flat ground. Spreads radially and settles
    /// once the surface slopes drop below the Coulomb angle.
    pub fn column_collapse() -> Result<Self, ModelError> {
        let (ny, nx) = (41, 41);
        let dx = 2.0;
        let bed = Array2::zeros((ny, nx));
        let mut h0 = Array2::zeros((ny, nx));
        for i in 18..=22 {
            for j in 18..=22 {
                h0[[i, j]] = 8.0;
            }
        }
        let terrain = Terrain::new(bed, dx, dx)?;
        let params = ModelParams {
            h_min: ParamValue::Scalar(0.05),
            ..ModelParams::default()
        };
        Ok(Self {
            name: "column-collapse",
            terrain,
            h0,
            params,
        })
    }

    /// A slab released on a 40 % ramp that runs out onto a flat plain.
    pub fn inclined_slab() -> Result<Self, ModelError> {
        let (ny, nx) = (35, 121);
        let dx = 2.0;
        let slope = 0.4;
        let ramp_end = 50usize;
        let mut bed = Array2::zeros((ny, nx));
        for i in 0..ny {
            for j in 0..nx {
                if j < ramp_end {
                    bed[[i, j]] = slope * dx * (ramp_end - j) as f64;
                }
            }
        }
        let mut h0 = Array2::zeros((ny, nx));
        for i in 12..=22 {
            for j in 5..=17 {
                h0[[i, j]] = 3.0;
            }
        }
        let terrain = Terrain::new(bed, dx, dx)?;
        let params = ModelParams {
            mu: ParamValue::Scalar(0.25),
            h_min: ParamValue::Scalar(0.05),
            ..ModelParams::default()
        };
        Ok(Self {
            name: "inclined-slab",
            terrain,
            h0,
            params,
        })
    }

    /// A release high on the flank of a parabolic valley; the flow
    /// channelizes before spreading over the outlet plain.
    pub fn valley_runout() -> Result<Self, ModelError> {
        let (ny, nx) = (61, 141);
        let dx = 2.0;
        let slope = 0.35;
        let ramp_end = 70usize;
        let half_width = (ny / 2) as f64;
        let mut bed = Array2::zeros((ny, nx));
        for i in 0..ny {
            for j in 0..nx {
                let down = if j < ramp_end {
                    slope * dx * (ramp_end - j) as f64
                } else {
                    0.0
                };
                let y = (i as f64 - half_width) * dx;
                // the cross-valley parabola fades out over the runout plain
                let channel = if j < ramp_end { 0.004 * y * y } else { 0.0 };
                bed[[i, j]] = down + channel;
            }
        }
        let mut h0 = Array2::zeros((ny, nx));
        for i in 24..=36 {
            for j in 8..=20 {
                h0[[i, j]] = 4.0;
            }
        }
        let terrain = Terrain::new(bed, dx, dx)?;
        let params = ModelParams {
            mu: ParamValue::Scalar(0.2),
            h_min: ParamValue::Scalar(0.05),
            ..ModelParams::default()
        };
        Ok(Self {
            name: "valley-runout",
            terrain,
            h0,
            params,
        })
    }
}
