// Business domains
pub mod content_plan;
