//! Local events and the merged calendar view

pub mod ports;
pub mod service;

pub use service::{CalendarService, EventView, MonthView};
