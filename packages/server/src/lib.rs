// Contentplan - API Core
//
// Backend for generating website content strategies. A job walks an ordered
// phase machine (research, analysis, theme selection, ideation, editorial),
// pauses once for a human theme selection, and finishes in a background
// continuation that runs at most once per job.

pub mod config;
pub mod domains;
pub mod kernel;
pub mod server;

pub use config::*;
