// Common types and utilities shared across the application

pub mod entity_ids;
pub mod id;
pub mod pagination;
pub mod points;

pub use entity_ids::*;
pub use id::{Id, V4, V7};
pub use pagination::{PageArgs, Paginated};
pub use points::Points;
