use serde::Serialize;
use tracing::debug;

use super::carrier::CarrierImage;
use crate::config::{ChannelSelection, SealConfig};
use crate::envelope::{Envelope, STREAM_MAGIC};
use crate::error::CapacityError;

/// Bits spent on the stream magic ahead of the envelope.
pub const HEADER_OVERHEAD_BITS: u64 = STREAM_MAGIC.len() as u64 * 8;

/// Embeddable bits: one LSB per used channel per pixel.
pub fn capacity_bits(image: &CarrierImage, channels: ChannelSelection) -> u64 {
    image.pixel_count() * channels.used_per_pixel(image.channels()) as u64
}

/// How much a carrier can hold under a given channel selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CapacityReport {
    pub width: u32,
    pub height: u32,
    /// Channel bytes used per pixel
    pub channels: u8,
    pub capacity_bits: u64,
    /// Largest envelope that fits after the stream magic
    pub max_envelope_bytes: u64,
    /// Largest encoded tag record that fits
    pub max_tag_bytes: u64,
    pub meets_min_dimension: bool,
}

/// Decides whether a carrier can hold a payload. Runs before any pixel is written.
#[derive(Debug, Clone, Copy)]
pub struct CapacityPlanner {
    min_dimension: u32,
    channels: ChannelSelection,
}

impl CapacityPlanner {
    pub fn new(min_dimension: u32, channels: ChannelSelection) -> Self {
        Self {
            min_dimension,
            channels,
        }
    }

    pub fn from_config(config: &SealConfig) -> Self {
        Self::new(config.min_dimension, config.channels)
    }

    pub fn channels(&self) -> ChannelSelection {
        self.channels
    }

    pub fn capacity_bits(&self, image: &CarrierImage) -> u64 {
        capacity_bits(image, self.channels)
    }

    /// Bits needed to embed an envelope of `envelope_len` bytes, magic included.
    pub fn required_bits(envelope_len: usize) -> u64 {
        envelope_len as u64 * 8 + HEADER_OVERHEAD_BITS
    }

    /// Largest envelope, in whole bytes, the image can carry.
    pub fn max_envelope_bytes(&self, image: &CarrierImage) -> u64 {
        self.capacity_bits(image).saturating_sub(HEADER_OVERHEAD_BITS) / 8
    }

    pub fn report(&self, image: &CarrierImage) -> CapacityReport {
        let max_envelope_bytes = self.max_envelope_bytes(image);
        CapacityReport {
            width: image.width(),
            height: image.height(),
            channels: self.channels.used_per_pixel(image.channels()),
            capacity_bits: self.capacity_bits(image),
            max_envelope_bytes,
            max_tag_bytes: max_envelope_bytes.saturating_sub(Envelope::encoded_len(0) as u64),
            meets_min_dimension: self.check_dimensions(image).is_ok(),
        }
    }

    /// Enforce the minimum-dimension policy only.
    pub fn check_dimensions(&self, image: &CarrierImage) -> Result<(), CapacityError> {
        if image.width() < self.min_dimension || image.height() < self.min_dimension {
            return Err(CapacityError::ImageTooSmall {
                width: image.width(),
                height: image.height(),
                min: self.min_dimension,
            });
        }
        Ok(())
    }

    /// Enforce the dimension floor and that `payload_bits` plus the header fit.
    pub fn check(&self, image: &CarrierImage, payload_bits: u64) -> Result<(), CapacityError> {
        self.check_dimensions(image)?;

        let capacity = self.capacity_bits(image);
        let required = payload_bits.saturating_add(HEADER_OVERHEAD_BITS);
        debug!(capacity_bits = capacity, required_bits = required, "Capacity check");
        if required > capacity {
            return Err(CapacityError::CapacityExceeded {
                required_bits: required,
                capacity_bits: capacity,
            });
        }
        Ok(())
    }
}
