//! Session provider implementations.

pub mod memory;
