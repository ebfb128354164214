pub mod application;
pub mod infrastructure;

pub use application::{describe, parse_line, run_demo, ConsoleInput, DemoOptions, DemoOutcome};
pub use infrastructure::{CliError, LogConfig, Result};
