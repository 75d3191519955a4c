//! REST endpoint handlers organized by resource.

pub mod dashboard;
pub mod system;
