//! HTTP handlers, one module per resource.

pub mod gestioni;
pub mod health;
pub mod import;
