//! Data Transfer Objects for REST request/response serialization.

pub mod common_dto;
pub mod dashboard_dto;

pub use common_dto::*;
pub use dashboard_dto::*;
