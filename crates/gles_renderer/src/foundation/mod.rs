//! Foundation utilities shared by every renderer component

pub mod collections;
pub mod logging;
pub mod math;
