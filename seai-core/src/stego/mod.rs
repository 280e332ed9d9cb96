//! LSB steganography over decoded carrier images.

pub mod capacity;
pub mod carrier;
pub mod lsb;

pub use capacity::{capacity_bits, CapacityPlanner, CapacityReport, HEADER_OVERHEAD_BITS};
pub use carrier::{CarrierImage, PixelLayout};
pub use lsb::{LsbDecoder, LsbEncoder};
