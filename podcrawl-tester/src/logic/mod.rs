pub mod loader;
pub mod policy;
pub mod reports;
pub mod simulation;

pub use loader::FileConfigLoader;
pub use policy::Strategy;
pub use simulation::{RunRecord, StrategySummary, run_matrix, summarize};
