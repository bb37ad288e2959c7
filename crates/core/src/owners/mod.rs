//! Registration and sync orchestration of calendar owners

pub mod ports;
pub mod service;

pub use service::OwnerService;
