//! Hardware control modules

pub mod cpu;
pub mod freezer;
pub mod freq;
pub mod governor;
