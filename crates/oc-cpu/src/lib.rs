//! Gekko/Broadway CPU state for oxidized-cube
//!
//! The instruction interpreter lives elsewhere; this crate only holds the architectural state
//! that a boot ROM initializes before handing over to software.

pub mod bat;
pub mod registers;
pub mod spr;

pub use bat::{setup_bat, setup_msr, BatMapping};
pub use registers::{Hid4, Msr, PowerPcState};
