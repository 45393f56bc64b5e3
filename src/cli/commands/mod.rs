//! CLI command implementations.

mod ask;
mod config;
mod doctor;
mod serve;

pub use ask::{run_ask, ContextArg, QuestionArg};
pub use config::run_config;
pub use doctor::run_doctor;
pub use serve::{router, run_serve};
