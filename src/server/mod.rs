//! HTTP read surface — presentation pages and machine endpoints.

pub mod pages;
pub mod routes;

pub use routes::{AppState, routes};
