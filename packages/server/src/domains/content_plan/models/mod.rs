pub mod job;
pub mod theme;

pub use job::*;
pub use theme::*;
