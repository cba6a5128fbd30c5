pub mod batch_plan;
pub mod cli;
pub mod completion;
pub mod config;
pub mod converter;
pub mod dates;
pub mod discover;
pub mod driver;
pub mod orchestrator;
pub mod priority;
pub mod probe;
pub mod report;
pub mod throttle;
pub mod util;
