//! Application services layer.
//!
//! Long-running work that ties the protocol modules (gdm/, connection/)
//! to the shared registry.

pub mod gdm_service;

pub use gdm_service::GdmService;
