pub mod console;
pub mod demo;

pub use console::{describe, parse_line, ConsoleInput, HELP};
pub use demo::{run_demo, DemoOptions, DemoOutcome};
