//! Command implementations.

pub mod capacity;
pub mod embed;
pub mod info;
pub mod keygen;
pub mod verify;
