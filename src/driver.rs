use std::sync::atomic::{AtomicBool, Ordering};

use ndarray::Array2;

use crate::error::ModelError;
use crate::solver::{AvalancheSolver, FlowDiagnostics};

/// Caps and output cadence for a simulation run.
#[derive(Debug, Clone)]
pub struct RunConfig {
    /// Largest admissible step counter; `None` leaves the run bounded by
    /// time alone. A cap of `n` admits steps `0..=n`.
    pub max_steps: Option<u64>,
    /// Simulated-time cap in seconds.
    pub max_time: f64,
    /// Upper bound for a single time step (s).
    pub dt_max: f64,
    /// CFL number in (0, 1]; `None` disables the CFL cap.
    pub cfl: Option<f64>,
    /// Record a snapshot every this many steps; `None` records nothing.
    pub output_every: Option<u64>,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            max_steps: None,
            max_time: 1000.0,
            dt_max: 1.0,
            cfl: Some(0.7),
            output_every: None,
        }
    }
}

/// A recorded (time, thickness) pair with its aggregate diagnostics.
#[derive(Debug, Clone)]
pub struct Snapshot {
    pub time: f64,
    pub thickness: Array2<f64>,
    pub stats: FlowDiagnostics,
}

/// What a run did before it ended.
#[derive(Debug, Clone)]
pub struct RunOutcome {
    /// Number of steps actually executed.
    pub steps: u64,
    /// Simulated time reached (s).
    pub time: f64,
    /// Snapshots recorded at the configured cadence.
    pub snapshots: Vec<Snapshot>,
    /// True when the run ended through the cancellation flag.
    pub cancelled: bool,
}

/// Advance the solver until a step cap, a time cap or cancellation ends the
/// run. A converged flow is not a terminator on its own; quiescent steps
/// keep consuming `dt_max` until a cap is reached.
///
/// The cancellation flag is polled before each step and again before each
/// snapshot; a step in flight is never interrupted, so the state stays
/// consistent.
pub fn run(
    solver: &mut AvalancheSolver,
    config: &RunConfig,
    cancel: Option<&AtomicBool>,
) -> Result<RunOutcome, ModelError> {
    let is_cancelled = || cancel.map_or(false, |flag| flag.load(Ordering::Relaxed));

    let mut snapshots = Vec::new();
    let mut cancelled = false;
    let mut steps = 0u64;
    let mut t = 0.0;
    let mut k = 0u64;
    loop {
        if let Some(cap) = config.max_steps {
            if k > cap {
                break;
            }
        }
        if t > config.max_time {
            break;
        }
        if is_cancelled() {
            cancelled = true;
            break;
        }

        let dt = solver.step(config.dt_max, config.cfl)?;
        t += dt;
        steps += 1;

        if let Some(every) = config.output_every {
            if every > 0 && k % every == 0 {
                if is_cancelled() {
                    cancelled = true;
                    break;
                }
                snapshots.push(Snapshot {
                    time: t,
                    thickness: solver.thickness().clone(),
                    stats: solver.diagnostics(),
                });
            }
        }
        k += 1;
    }

    Ok(RunOutcome {
        steps,
        time: t,
        snapshots,
        cancelled,
    })
}
