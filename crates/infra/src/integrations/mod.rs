//! External service integrations

pub mod esi;
