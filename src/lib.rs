//! 2D finite-volume solver for rapid gravity-driven mass flows (rock and
//! snow avalanches) over arbitrary terrain, closed by the modified Voellmy
//! rheology with a thickness-dependent crossover velocity.

pub mod driver;
pub mod error;
pub mod params;
pub mod scene;
pub mod solver;
pub mod terrain;
pub mod visualizer;

pub use driver::{run, RunConfig, RunOutcome, Snapshot};
pub use error::ModelError;
pub use params::{ModelParams, ParamValue};
pub use scene::Scene;
pub use solver::{AvalancheSolver, FlowDiagnostics, STAT_COULOMB, STAT_STOPPED, STAT_VOELLMY};
pub use terrain::Terrain;
pub use visualizer::Visualizer;
