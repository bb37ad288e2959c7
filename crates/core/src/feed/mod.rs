//! Remote in-game calendar feed

pub mod ports;
