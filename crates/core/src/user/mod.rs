//! Platform users as seen by the calendar

pub mod ports;
