use ndarray::Array2;
use serde::{Deserialize, Serialize};

use crate::error::ModelError;
use crate::params::ModelParams;
use crate::terrain::Terrain;

/// Cell flow status: at rest.
pub const STAT_STOPPED: u8 = 0;
/// Cell flow status: moving, Coulomb friction active.
pub const STAT_COULOMB: u8 = 1;
/// Cell flow status: moving, Voellmy friction active.
pub const STAT_VOELLMY: u8 = 2;

/// Guard against division by vanishing thickness and gradient weights.
const EPS: f64 = 1e-10;

/// Cells added around the bounding box of moving cells.
const HALO: usize = 2;

/// Rectangular index window `[r0, r1) x [c0, c1)` the step operates on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Window {
    r0: usize,
    r1: usize,
    c0: usize,
    c1: usize,
}

/// Step-to-step work buffers, allocated once at construction and sized to
/// the full grid so no step allocates.
struct Scratch {
    u_face: Array2<f64>,
    v_face: Array2<f64>,
    up_x: Array2<u8>,
    up_y: Array2<u8>,
    new_h: Array2<f64>,
    new_uh: Array2<f64>,
    new_vh: Array2<f64>,
    new_wh: Array2<f64>,
    dsdx: Array2<f64>,
    dsdy: Array2<f64>,
    hcdt: Array2<f64>,
    p: Array2<f64>,
}

impl Scratch {
    fn new(shape: (usize, usize)) -> Self {
        Self {
            u_face: Array2::zeros(shape),
            v_face: Array2::zeros(shape),
            up_x: Array2::zeros(shape),
            up_y: Array2::zeros(shape),
            new_h: Array2::zeros(shape),
            new_uh: Array2::zeros(shape),
            new_vh: Array2::zeros(shape),
            new_wh: Array2::zeros(shape),
            dsdx: Array2::zeros(shape),
            dsdy: Array2::zeros(shape),
            hcdt: Array2::zeros(shape),
            p: Array2::zeros(shape),
        }
    }
}

/// Aggregate flow diagnostics over the whole grid.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FlowDiagnostics {
    /// Mobile-layer volume, sum of h * dx * dy (m^3).
    pub total_volume: f64,
    /// Largest thickness (m).
    pub max_thickness: f64,
    /// Largest planar velocity magnitude (m/s).
    pub max_speed: f64,
    /// Cells moving under Coulomb friction.
    pub coulomb_cells: usize,
    /// Cells moving under Voellmy friction.
    pub voellmy_cells: usize,
}

/// Explicit finite-volume solver for a depth-averaged gravity mass flow.
///
/// Owns the mobile-layer thickness `h`, the three momentum components per
/// unit area `uh, vh, wh` and the per-cell flow status. `step` advances the
/// state by one donor-cell upwind step with bed-plane reprojection,
/// thickness-weighted surface gradients, pressure and two-regime friction,
/// restricted to the bounding rectangle of moving cells.
pub struct AvalancheSolver {
    terrain: Terrain,
    params: ModelParams,
    h: Array2<f64>,
    uh: Array2<f64>,
    vh: Array2<f64>,
    wh: Array2<f64>,
    stat: Array2<u8>,
    scratch: Scratch,
    steps_taken: u64,
    diverged: bool,
}

impl AvalancheSolver {
    /// Create a solver from terrain, initial thickness and parameters.
    /// Momenta start at zero; the first step accelerates the layer from rest.
    pub fn new(
        terrain: Terrain,
        h0: Array2<f64>,
        params: ModelParams,
    ) -> Result<Self, ModelError> {
        let shape = terrain.shape();
        if h0.dim() != shape {
            return Err(ModelError::ShapeMismatch {
                expected: shape,
                found: h0.dim(),
            });
        }
        if let Some(v) = h0.iter().find(|v| !v.is_finite() || **v < 0.0) {
            return Err(ModelError::InvalidParameter {
                name: "h0",
                value: *v,
            });
        }
        params.validate(shape)?;

        Ok(Self {
            terrain,
            params,
            h: h0,
            uh: Array2::zeros(shape),
            vh: Array2::zeros(shape),
            wh: Array2::zeros(shape),
            stat: Array2::zeros(shape),
            scratch: Scratch::new(shape),
            steps_taken: 0,
            diverged: false,
        })
    }

    /// Convenience constructor that builds the terrain in place from a bed
    /// grid and cell sizes.
    pub fn from_grids(
        bed: Array2<f64>,
        h0: Array2<f64>,
        dx: f64,
        dy: f64,
        params: ModelParams,
    ) -> Result<Self, ModelError> {
        Self::new(Terrain::new(bed, dx, dy)?, h0, params)
    }

    pub fn terrain(&self) -> &Terrain {
        &self.terrain
    }

    pub fn params(&self) -> &ModelParams {
        &self.params
    }

    /// Mobile-layer thickness (m).
    pub fn thickness(&self) -> &Array2<f64> {
        &self.h
    }

    /// Momentum per unit area along x (m^2/s).
    pub fn momentum_x(&self) -> &Array2<f64> {
        &self.uh
    }

    /// Momentum per unit area along y (m^2/s).
    pub fn momentum_y(&self) -> &Array2<f64> {
        &self.vh
    }

    /// Momentum per unit area along z (m^2/s).
    pub fn momentum_z(&self) -> &Array2<f64> {
        &self.wh
    }

    /// Per-cell flow status (`STAT_STOPPED`, `STAT_COULOMB`, `STAT_VOELLMY`).
    pub fn status(&self) -> &Array2<u8> {
        &self.stat
    }

    pub fn steps_taken(&self) -> u64 {
        self.steps_taken
    }

    /// Advance the state by one time step and return the step actually used.
    ///
    /// The step is `dt_max`, shortened by the CFL condition when `cfl` is
    /// given. With no cell above the motion threshold the state is left
    /// untouched and the full `dt_max` is consumed.
    pub fn step(&mut self, dt_max: f64, cfl: Option<f64>) -> Result<f64, ModelError> {
        if self.diverged {
            return Err(ModelError::Diverged {
                step: self.steps_taken,
            });
        }
        if !(dt_max > 0.0) || !dt_max.is_finite() {
            return Err(ModelError::InvalidParameter {
                name: "dt_max",
                value: dt_max,
            });
        }
        if let Some(c) = cfl {
            if !(c > 0.0 && c <= 1.0) {
                return Err(ModelError::InvalidParameter {
                    name: "cfl",
                    value: c,
                });
            }
        }

        let win = match self.active_window() {
            Some(w) => w,
            None => {
                self.steps_taken += 1;
                return Ok(dt_max);
            }
        };

        let dt = self.face_velocities(win, dt_max, cfl);
        self.advect(win, dt);
        self.reproject(win);
        self.surface_gradients(win);
        self.apply_pressure(win, dt);
        self.apply_friction(win, dt);
        self.steps_taken += 1;

        if !self.window_is_finite(win) {
            self.diverged = true;
            return Err(ModelError::Diverged {
                step: self.steps_taken,
            });
        }
        Ok(dt)
    }

    /// Tight bounding rectangle of cells above the motion threshold,
    /// expanded by the halo and clamped to the grid. `None` when nothing
    /// can move.
    fn active_window(&self) -> Option<Window> {
        let (ny, nx) = self.h.dim();
        let mut r0 = ny;
        let mut r1 = 0usize;
        let mut c0 = nx;
        let mut c1 = 0usize;
        for i in 0..ny {
            for j in 0..nx {
                if self.h[[i, j]] > self.params.h_min.at(i, j) {
                    r0 = r0.min(i);
                    r1 = r1.max(i + 1);
                    c0 = c0.min(j);
                    c1 = c1.max(j + 1);
                }
            }
        }
        if r1 == 0 {
            return None;
        }
        Some(Window {
            r0: r0.saturating_sub(HALO),
            r1: (r1 + HALO).min(ny),
            c0: c0.saturating_sub(HALO),
            c1: (c1 + HALO).min(nx),
        })
    }

    /// Fill face velocities and upstream pickers, and bound the time step by
    /// the CFL condition. Face velocities are the mean of the two adjacent
    /// nodal velocities; faces on the window rim carry no flow.
    fn face_velocities(&mut self, win: Window, dt_max: f64, cfl: Option<f64>) -> f64 {
        let Self {
            h,
            uh,
            vh,
            scratch,
            terrain,
            ..
        } = self;
        let dx = terrain.dx();
        let dy = terrain.dy();
        let mut rate_max = 0.0f64;
        for i in win.r0..win.r1 {
            for j in win.c0..win.c1 {
                let uf = if j + 1 < win.c1 {
                    0.5 * (uh[[i, j]] / h[[i, j]].max(EPS) + uh[[i, j + 1]] / h[[i, j + 1]].max(EPS))
                } else {
                    0.0
                };
                let vf = if i + 1 < win.r1 {
                    0.5 * (vh[[i, j]] / h[[i, j]].max(EPS) + vh[[i + 1, j]] / h[[i + 1, j]].max(EPS))
                } else {
                    0.0
                };
                scratch.u_face[[i, j]] = uf;
                scratch.v_face[[i, j]] = vf;
                scratch.up_x[[i, j]] = (uf < 0.0) as u8;
                scratch.up_y[[i, j]] = (vf < 0.0) as u8;
                rate_max = rate_max.max(uf.abs() / dx + vf.abs() / dy);
            }
        }
        match cfl {
            Some(c) if rate_max > 0.0 => dt_max.min(c / rate_max),
            _ => dt_max,
        }
    }

    /// Donor-cell advection of thickness and the three momentum components.
    /// All four transports share the face velocities and upstream pickers
    /// computed for this step, so they run independently.
    fn advect(&mut self, win: Window, dt: f64) {
        let Self {
            h,
            uh,
            vh,
            wh,
            scratch,
            terrain,
            ..
        } = self;
        let dx = terrain.dx();
        let dy = terrain.dy();
        let Scratch {
            u_face,
            v_face,
            up_x,
            up_y,
            new_h,
            new_uh,
            new_vh,
            new_wh,
            ..
        } = scratch;
        let u_face = &*u_face;
        let v_face = &*v_face;
        let up_x = &*up_x;
        let up_y = &*up_y;
        let h_src = &*h;
        let uh_src = &*uh;
        let vh_src = &*vh;
        let wh_src = &*wh;

        rayon::join(
            || {
                rayon::join(
                    || advect_quantity(h_src, new_h, u_face, v_face, up_x, up_y, win, dt, dx, dy),
                    || advect_quantity(uh_src, new_uh, u_face, v_face, up_x, up_y, win, dt, dx, dy),
                )
            },
            || {
                rayon::join(
                    || advect_quantity(vh_src, new_vh, u_face, v_face, up_x, up_y, win, dt, dx, dy),
                    || advect_quantity(wh_src, new_wh, u_face, v_face, up_x, up_y, win, dt, dx, dy),
                )
            },
        );

        for i in win.r0..win.r1 {
            for j in win.c0..win.c1 {
                h[[i, j]] = new_h[[i, j]];
                uh[[i, j]] = new_uh[[i, j]];
                vh[[i, j]] = new_vh[[i, j]];
                wh[[i, j]] = new_wh[[i, j]];
            }
        }
    }

    /// Centripetal correction: rotate the momentum vector parallel to the
    /// bed plane, keeping its magnitude. The normal excess `hcdt` is kept
    /// for the friction phase.
    fn reproject(&mut self, win: Window) {
        let Self {
            uh,
            vh,
            wh,
            scratch,
            terrain,
            ..
        } = self;
        let gx = terrain.grad_x();
        let gy = terrain.grad_y();
        let cb = terrain.cos_beta();
        for i in win.r0..win.r1 {
            for j in win.c0..win.c1 {
                let u = uh[[i, j]];
                let v = vh[[i, j]];
                let w = wh[[i, j]];
                let m = (u * u + v * v + w * w).sqrt();
                let c = cb[[i, j]];
                let hc = (u * gx[[i, j]] + v * gy[[i, j]] - w) * c;
                let mut un = u - hc * gx[[i, j]] * c;
                let mut vn = v - hc * gy[[i, j]] * c;
                let mut wn = w + hc * c;
                let m2 = (un * un + vn * vn + wn * wn).sqrt();
                if m2 > 0.0 {
                    let scale = m / m2;
                    un *= scale;
                    vn *= scale;
                    wn *= scale;
                }
                uh[[i, j]] = un;
                vh[[i, j]] = vn;
                wh[[i, j]] = wn;
                scratch.hcdt[[i, j]] = hc;
            }
        }
    }

    /// Thickness-weighted central differences of the free surface b + h.
    /// At a local surface maximum the weight on the less steep side is
    /// dropped, so the two downhill slopes cannot cancel across a ridge;
    /// when both sides fall away equally steeply the weighted mean vanishes
    /// and the crest stays balanced.
    fn surface_gradients(&mut self, win: Window) {
        let Self {
            h,
            scratch,
            terrain,
            ..
        } = self;
        let bed = terrain.bed();
        let dx = terrain.dx();
        let dy = terrain.dy();

        let s = |i: usize, j: usize| bed[[i, j]] + h[[i, j]];
        // gradient and half-thickness at the face between columns j and j+1
        let face_x = |i: usize, j: usize| {
            (
                (s(i, j + 1) - s(i, j)) / dx,
                0.5 * (h[[i, j]] + h[[i, j + 1]]) + EPS,
            )
        };
        // same between rows i and i+1
        let face_y = |i: usize, j: usize| {
            (
                (s(i + 1, j) - s(i, j)) / dy,
                0.5 * (h[[i, j]] + h[[i + 1, j]]) + EPS,
            )
        };

        for i in win.r0..win.r1 {
            for j in win.c0..win.c1 {
                let (dsl, mut hl) = if j > win.c0 {
                    face_x(i, j - 1)
                } else {
                    (0.0, EPS)
                };
                let (dsr, mut hr) = if j + 1 < win.c1 {
                    face_x(i, j)
                } else {
                    (0.0, EPS)
                };
                if dsl > 0.0 && dsr < 0.0 {
                    if dsl < -dsr {
                        hl = 0.0;
                    } else if dsl > -dsr {
                        hr = 0.0;
                    }
                }
                scratch.dsdx[[i, j]] = (dsl * hl + dsr * hr) / (hl + hr);

                let (dsu, mut hu) = if i > win.r0 {
                    face_y(i - 1, j)
                } else {
                    (0.0, EPS)
                };
                let (dsd, mut hd) = if i + 1 < win.r1 {
                    face_y(i, j)
                } else {
                    (0.0, EPS)
                };
                if dsu > 0.0 && dsd < 0.0 {
                    if dsu < -dsd {
                        hu = 0.0;
                    } else if dsu > -dsd {
                        hd = 0.0;
                    }
                }
                scratch.dsdy[[i, j]] = (dsu * hu + dsd * hd) / (hu + hd);
            }
        }
    }

    /// Depth-averaged pressure and its gradient acceleration on all three
    /// momentum components. `d_min > 0` selects the denominator-limited
    /// original pressure, otherwise p = g * h * cos^2(beta).
    fn apply_pressure(&mut self, win: Window, dt: f64) {
        let Self {
            h,
            uh,
            vh,
            wh,
            scratch,
            terrain,
            params,
            ..
        } = self;
        let gx = terrain.grad_x();
        let gy = terrain.grad_y();
        let cb = terrain.cos_beta();
        let g = params.g;
        let d_min = params.d_min;
        for i in win.r0..win.r1 {
            for j in win.c0..win.c1 {
                let sx = scratch.dsdx[[i, j]];
                let sy = scratch.dsdy[[i, j]];
                let sdot = sx * gx[[i, j]] + sy * gy[[i, j]];
                let p = if d_min > 0.0 {
                    g * h[[i, j]] / (1.0 + sdot).max(d_min)
                } else {
                    let c = cb[[i, j]];
                    g * h[[i, j]] * c * c
                };
                scratch.p[[i, j]] = p;
                uh[[i, j]] -= dt * p * sx;
                vh[[i, j]] -= dt * p * sy;
                wh[[i, j]] -= dt * p * sdot;
            }
        }
    }

    /// Two-regime friction update on the momentum magnitude.
    ///
    /// With a positive crossover velocity a cell is in the Voellmy regime
    /// once its momentum exceeds `v_c * h * (h * cos beta)^(1/3)`, otherwise
    /// Coulomb friction applies. A non-positive crossover selects the
    /// conventional rheology: the turbulent update followed by the Coulomb
    /// subtraction in every moving cell, with the status reporting whichever
    /// stress dominates. Cells below the motion threshold or drained of
    /// momentum stop with exactly zero momentum.
    fn apply_friction(&mut self, win: Window, dt: f64) {
        let Self {
            h,
            uh,
            vh,
            wh,
            stat,
            scratch,
            terrain,
            params,
            ..
        } = self;
        let cb = terrain.cos_beta();
        let g = params.g;
        stat.fill(STAT_STOPPED);
        for i in win.r0..win.r1 {
            for j in win.c0..win.c1 {
                let u = uh[[i, j]];
                let v = vh[[i, j]];
                let w = wh[[i, j]];
                let m = (u * u + v * v + w * w).sqrt();
                let hij = h[[i, j]];
                let c = cb[[i, j]];

                let mut p = scratch.p[[i, j]];
                if params.cent {
                    p = (p + scratch.hcdt[[i, j]] * c / dt).max(0.0);
                }

                let mut m_new = 0.0;
                let mut st = STAT_STOPPED;
                if hij > params.h_min.at(i, j) {
                    let mu = params.mu.at(i, j);
                    let xi = params.xi.at(i, j);
                    let v_c = params.v_c.at(i, j);
                    if v_c > 0.0 {
                        if m >= v_c * hij * (hij * c).cbrt() {
                            let f = xi * hij * hij * c / (2.0 * g * dt);
                            m_new = ((f * f + 2.0 * f * m).sqrt() - f).max(0.0);
                            st = STAT_VOELLMY;
                        } else {
                            m_new = (m - mu * p / c * dt).max(0.0);
                            st = STAT_COULOMB;
                        }
                    } else {
                        let f = xi * hij * hij * c / (2.0 * g * dt);
                        m_new = ((f * f + 2.0 * f * m).sqrt() - f).max(0.0);
                        m_new = (m_new - mu * p / c * dt).max(0.0);
                        st = if m_new * m_new > mu * p * xi * hij * hij / g {
                            STAT_VOELLMY
                        } else {
                            STAT_COULOMB
                        };
                    }
                    if m_new <= 0.0 {
                        m_new = 0.0;
                        st = STAT_STOPPED;
                    }
                }

                let scale = m_new / m.max(EPS);
                uh[[i, j]] = u * scale;
                vh[[i, j]] = v * scale;
                wh[[i, j]] = w * scale;
                stat[[i, j]] = st;
            }
        }
    }

    fn window_is_finite(&self, win: Window) -> bool {
        for i in win.r0..win.r1 {
            for j in win.c0..win.c1 {
                if !self.h[[i, j]].is_finite()
                    || !self.uh[[i, j]].is_finite()
                    || !self.vh[[i, j]].is_finite()
                    || !self.wh[[i, j]].is_finite()
                {
                    return false;
                }
            }
        }
        true
    }

    /// Aggregate diagnostics over the whole grid.
    pub fn diagnostics(&self) -> FlowDiagnostics {
        let (ny, nx) = self.h.dim();
        let cell_area = self.terrain.dx() * self.terrain.dy();
        let mut total_volume = 0.0;
        let mut max_thickness = 0.0f64;
        let mut max_speed = 0.0f64;
        let mut coulomb_cells = 0;
        let mut voellmy_cells = 0;
        for i in 0..ny {
            for j in 0..nx {
                let hij = self.h[[i, j]];
                total_volume += hij * cell_area;
                max_thickness = max_thickness.max(hij);
                let u = self.uh[[i, j]] / hij.max(EPS);
                let v = self.vh[[i, j]] / hij.max(EPS);
                max_speed = max_speed.max((u * u + v * v).sqrt());
                match self.stat[[i, j]] {
                    STAT_COULOMB => coulomb_cells += 1,
                    STAT_VOELLMY => voellmy_cells += 1,
                    _ => {}
                }
            }
        }
        FlowDiagnostics {
            total_volume,
            max_thickness,
            max_speed,
            coulomb_cells,
            voellmy_cells,
        }
    }
}

/// Upwind flux-divergence update of one transported quantity over the
/// window. Fluxes through the window rim are zero; the upstream cell per
/// face comes from the shared pickers.
#[allow(clippy::too_many_arguments)]
fn advect_quantity(
    q: &Array2<f64>,
    new_q: &mut Array2<f64>,
    u_face: &Array2<f64>,
    v_face: &Array2<f64>,
    up_x: &Array2<u8>,
    up_y: &Array2<u8>,
    win: Window,
    dt: f64,
    dx: f64,
    dy: f64,
) {
    let flux_x = |i: usize, j: usize| q[[i, j + up_x[[i, j]] as usize]] * u_face[[i, j]];
    let flux_y = |i: usize, j: usize| q[[i + up_y[[i, j]] as usize, j]] * v_face[[i, j]];
    for i in win.r0..win.r1 {
        for j in win.c0..win.c1 {
            let fx_r = if j + 1 < win.c1 { flux_x(i, j) } else { 0.0 };
            let fx_l = if j > win.c0 { flux_x(i, j - 1) } else { 0.0 };
            let fy_d = if i + 1 < win.r1 { flux_y(i, j) } else { 0.0 };
            let fy_u = if i > win.r0 { flux_y(i - 1, j) } else { 0.0 };
            new_q[[i, j]] = q[[i, j]] - dt * ((fx_r - fx_l) / dx + (fy_d - fy_u) / dy);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::params::ParamValue;

    fn flat_solver(ny: usize, nx: usize, h0: Array2<f64>) -> AvalancheSolver {
        let terrain = Terrain::new(Array2::zeros((ny, nx)), 1.0, 1.0).unwrap();
        AvalancheSolver::new(terrain, h0, ModelParams::default()).unwrap()
    }

    #[test]
    fn empty_domain_step_is_a_no_op_consuming_dt_max() {
        let mut solver = flat_solver(10, 10, Array2::zeros((10, 10)));
        for _ in 0..5 {
            let dt = solver.step(1.0, Some(0.7)).unwrap();
            assert_eq!(dt, 1.0);
        }
        assert!(solver.thickness().iter().all(|v| *v == 0.0));
        assert!(solver.momentum_x().iter().all(|v| *v == 0.0));
        assert!(solver.status().iter().all(|v| *v == STAT_STOPPED));
        assert_eq!(solver.steps_taken(), 5);
    }

    #[test]
    fn uniform_layer_on_flat_floor_stays_at_rest() {
        let mut solver = flat_solver(8, 8, Array2::from_elem((8, 8), 2.0));
        for _ in 0..20 {
            solver.step(0.5, Some(0.7)).unwrap();
        }
        for v in solver.thickness().iter() {
            assert!((*v - 2.0).abs() < 1e-12, "thickness drifted: {}", v);
        }
        for v in solver
            .momentum_x()
            .iter()
            .chain(solver.momentum_y().iter())
            .chain(solver.momentum_z().iter())
        {
            assert_eq!(*v, 0.0);
        }
    }

    #[test]
    fn balanced_single_cell_column_generates_no_slope() {
        // both faces of the crest fall away equally steeply, so the
        // thickness-weighted gradient cancels and the column sits still
        let mut h0 = Array2::zeros((9, 9));
        h0[[4, 4]] = 10.0;
        let mut solver = flat_solver(9, 9, h0.clone());
        for _ in 0..10 {
            solver.step(1.0, Some(0.7)).unwrap();
        }
        for i in 0..9 {
            for j in 0..9 {
                assert_eq!(solver.thickness()[[i, j]], h0[[i, j]]);
            }
        }
    }

    #[test]
    fn stopped_cells_hold_exactly_zero_momentum() {
        let mut h0 = Array2::zeros((12, 12));
        for i in 4..8 {
            for j in 4..8 {
                h0[[i, j]] = 3.0;
            }
        }
        let mut solver = flat_solver(12, 12, h0);
        for _ in 0..30 {
            solver.step(0.2, Some(0.7)).unwrap();
        }
        let (ny, nx) = solver.thickness().dim();
        for i in 0..ny {
            for j in 0..nx {
                if solver.status()[[i, j]] == STAT_STOPPED {
                    assert_eq!(solver.momentum_x()[[i, j]], 0.0);
                    assert_eq!(solver.momentum_y()[[i, j]], 0.0);
                    assert_eq!(solver.momentum_z()[[i, j]], 0.0);
                }
            }
        }
    }

    #[test]
    fn invalid_step_arguments_are_rejected() {
        let mut solver = flat_solver(5, 5, Array2::zeros((5, 5)));
        assert!(matches!(
            solver.step(0.0, None),
            Err(ModelError::InvalidParameter { name: "dt_max", .. })
        ));
        assert!(matches!(
            solver.step(1.0, Some(1.5)),
            Err(ModelError::InvalidParameter { name: "cfl", .. })
        ));
        assert!(matches!(
            solver.step(1.0, Some(0.0)),
            Err(ModelError::InvalidParameter { name: "cfl", .. })
        ));
    }

    #[test]
    fn mismatched_thickness_shape_is_rejected() {
        let terrain = Terrain::new(Array2::zeros((6, 6)), 1.0, 1.0).unwrap();
        let err = AvalancheSolver::new(terrain, Array2::zeros((6, 7)), ModelParams::default());
        assert!(matches!(err, Err(ModelError::ShapeMismatch { .. })));
    }

    #[test]
    fn negative_initial_thickness_is_rejected() {
        let terrain = Terrain::new(Array2::zeros((6, 6)), 1.0, 1.0).unwrap();
        let mut h0 = Array2::zeros((6, 6));
        h0[[2, 3]] = -0.1;
        assert!(matches!(
            AvalancheSolver::new(terrain, h0, ModelParams::default()),
            Err(ModelError::InvalidParameter { name: "h0", .. })
        ));
    }

    #[test]
    fn runaway_momentum_poisons_the_solver() {
        // an unbounded step on a steep thickness front blows the momentum
        // past the floating-point range within a few steps
        let terrain = Terrain::new(Array2::zeros((9, 9)), 1.0, 1.0).unwrap();
        let mut h0 = Array2::zeros((9, 9));
        for i in 3..=5 {
            for j in 3..=5 {
                h0[[i, j]] = 4.0;
            }
        }
        let params = ModelParams {
            mu: ParamValue::Scalar(0.0),
            xi: ParamValue::Scalar(1e9),
            v_c: ParamValue::Scalar(0.0),
            h_min: ParamValue::Scalar(0.0),
            ..ModelParams::default()
        };
        let mut solver = AvalancheSolver::new(terrain, h0, params).unwrap();
        let mut diverged = false;
        for _ in 0..10 {
            match solver.step(1e100, None) {
                Ok(_) => {}
                Err(ModelError::Diverged { .. }) => {
                    diverged = true;
                    break;
                }
                Err(e) => panic!("unexpected error: {}", e),
            }
        }
        assert!(diverged, "runaway state never reported divergence");
        // once diverged, the solver refuses every further step
        assert!(matches!(
            solver.step(0.1, Some(0.5)),
            Err(ModelError::Diverged { .. })
        ));
    }

    #[test]
    fn per_cell_friction_field_is_accepted() {
        let terrain = Terrain::new(Array2::zeros((6, 6)), 1.0, 1.0).unwrap();
        let params = ModelParams {
            mu: ParamValue::from(Array2::from_elem((6, 6), 0.3)),
            ..ModelParams::default()
        };
        let mut solver = AvalancheSolver::new(terrain, Array2::from_elem((6, 6), 1.0), params).unwrap();
        solver.step(0.5, Some(0.7)).unwrap();
    }
}
