//! Contract review pipeline

pub mod driver;
pub mod prompts;
pub mod report;

pub use driver::{PipelineDriver, StageSkips};
pub use report::{FinalReport, Stage, StageStatus};
