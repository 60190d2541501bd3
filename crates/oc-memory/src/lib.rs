//! Memory emulation for oxidized-cube
//!
//! This crate provides the physical RAM of the emulated machine: MEM1 on every platform and
//! MEM2 on the Wii. Addresses may be given either physically or through the cached/uncached
//! effective windows; both are folded onto the same backing store.

pub mod constants;
pub mod manager;

pub use constants::*;
pub use manager::Memory;
