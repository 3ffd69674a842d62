//! MS MARCO passage ranking as a yes/no classification scenario.

pub mod config;
pub mod instance;
pub mod loader;
pub mod output;
pub mod provision;
pub mod scenario;
pub mod selector;
pub mod track;
pub mod types;

pub use config::ScenarioConfig;
pub use provision::{PassageDataset, Provisioner, SplitData};
pub use scenario::{PassageScenario, RunSummary, ScenarioRun};
pub use track::{TaskKind, TrackKind};
pub use types::{Instance, Reference, Split};
