//! Least-significant-bit encoder and decoder.
//!
//! Bits are taken MSB-first from each stream byte and written, one per
//! eligible channel byte, in raster order: row-major, left to right, channel
//! order R, G, B (then A only when every channel is selected).

use tracing::debug;

use super::capacity::capacity_bits;
use super::carrier::CarrierImage;
use crate::config::ChannelSelection;
use crate::envelope::{Envelope, ENVELOPE_HEAD_LEN, STREAM_MAGIC};
use crate::error::{CapacityError, ExtractionError};

/// Maps the n-th stream bit to its channel byte in the sample buffer.
#[derive(Debug, Clone, Copy)]
struct BitLayout {
    used: u64,
    channels: u64,
    capacity: u64,
}

impl BitLayout {
    fn new(image: &CarrierImage, selection: ChannelSelection) -> Self {
        Self {
            used: selection.used_per_pixel(image.channels()) as u64,
            channels: image.channels() as u64,
            capacity: capacity_bits(image, selection),
        }
    }

    fn sample_index(&self, bit: u64) -> usize {
        ((bit / self.used) * self.channels + bit % self.used) as usize
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct LsbEncoder {
    channels: ChannelSelection,
}

impl LsbEncoder {
    pub fn new(channels: ChannelSelection) -> Self {
        Self { channels }
    }

    /// Overwrite the LSBs of the first `stream.len() * 8` eligible channel bytes.
    ///
    /// Refuses, without writing anything, a stream that does not fit.
    pub fn encode(
        &self,
        mut image: CarrierImage,
        stream: &[u8],
    ) -> Result<CarrierImage, CapacityError> {
        let layout = BitLayout::new(&image, self.channels);
        let needed = stream.len() as u64 * 8;
        if needed > layout.capacity {
            return Err(CapacityError::CapacityExceeded {
                required_bits: needed,
                capacity_bits: layout.capacity,
            });
        }

        let samples = image.samples_mut();
        for (i, byte) in stream.iter().enumerate() {
            for b in 0..8u64 {
                let bit = (byte >> (7 - b)) & 1;
                let idx = layout.sample_index(i as u64 * 8 + b);
                samples[idx] = (samples[idx] & 0xFE) | bit;
            }
        }

        debug!(bits = needed, capacity_bits = layout.capacity, "Embedded bitstream");
        Ok(image)
    }
}

struct BitReader<'a> {
    samples: &'a [u8],
    layout: BitLayout,
    pos: u64,
}

impl BitReader<'_> {
    fn remaining(&self) -> u64 {
        self.layout.capacity - self.pos
    }

    fn read_into(&mut self, out: &mut [u8]) {
        for byte in out.iter_mut() {
            let mut value = 0u8;
            for _ in 0..8 {
                let idx = self.layout.sample_index(self.pos);
                value = (value << 1) | (self.samples[idx] & 1);
                self.pos += 1;
            }
            *byte = value;
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct LsbDecoder {
    channels: ChannelSelection,
}

impl LsbDecoder {
    pub fn new(channels: ChannelSelection) -> Self {
        Self { channels }
    }

    /// Recover the envelope bytes in the same order the encoder wrote them.
    ///
    /// The declared length is checked against capacity before the envelope
    /// buffer is allocated.
    pub fn decode(&self, image: &CarrierImage) -> Result<Vec<u8>, ExtractionError> {
        let layout = BitLayout::new(image, self.channels);
        let mut reader = BitReader {
            samples: image.samples(),
            layout,
            pos: 0,
        };

        let prefix_bits = (STREAM_MAGIC.len() + ENVELOPE_HEAD_LEN) as u64 * 8;
        if reader.remaining() < STREAM_MAGIC.len() as u64 * 8 {
            return Err(ExtractionError::NoMarker);
        }

        let mut magic = [0u8; 4];
        reader.read_into(&mut magic);
        if &magic != STREAM_MAGIC {
            return Err(ExtractionError::NoMarker);
        }

        if layout.capacity < prefix_bits {
            return Err(ExtractionError::TruncatedStream {
                declared_bits: prefix_bits,
                capacity_bits: layout.capacity,
            });
        }
        let mut head = [0u8; ENVELOPE_HEAD_LEN];
        reader.read_into(&mut head);

        let overflow = ExtractionError::TruncatedStream {
            declared_bits: u64::MAX,
            capacity_bits: layout.capacity,
        };
        let envelope_len = Envelope::declared_len(&head).ok_or_else(|| overflow.clone())?;
        let declared_bits = (envelope_len as u64)
            .checked_add(STREAM_MAGIC.len() as u64)
            .and_then(|n| n.checked_mul(8))
            .ok_or(overflow)?;
        if declared_bits > layout.capacity {
            debug!(
                declared_bits,
                capacity_bits = layout.capacity,
                "Declared stream exceeds capacity"
            );
            return Err(ExtractionError::TruncatedStream {
                declared_bits,
                capacity_bits: layout.capacity,
            });
        }

        let mut envelope = vec![0u8; envelope_len];
        envelope[..ENVELOPE_HEAD_LEN].copy_from_slice(&head);
        reader.read_into(&mut envelope[ENVELOPE_HEAD_LEN..]);
        Ok(envelope)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::{NONCE_LEN, SALT_LEN, TAG_LEN};
    use image::{Rgb, RgbImage, Rgba, RgbaImage};

    fn stream_for(envelope: &Envelope) -> Vec<u8> {
        let mut stream = STREAM_MAGIC.to_vec();
        stream.extend_from_slice(&envelope.to_bytes());
        stream
    }

    fn envelope(ct_len: usize) -> Envelope {
        Envelope {
            salt: [0xA5; SALT_LEN],
            nonce: [0x3C; NONCE_LEN],
            ciphertext: (0..ct_len).map(|i| i as u8).collect(),
            auth_tag: [0x0F; TAG_LEN],
        }
    }

    fn noisy_rgb(w: u32, h: u32) -> CarrierImage {
        CarrierImage::from_rgb(RgbImage::from_fn(w, h, |x, y| {
            Rgb([(x * 7 + y) as u8, (x ^ y) as u8, (x * y) as u8])
        }))
    }

    #[test]
    fn test_bits_are_msb_first_in_raster_order() {
        let image = CarrierImage::from_rgb(RgbImage::from_pixel(4, 1, Rgb([0, 0, 0])));
        let sealed = LsbEncoder::default().encode(image, &[0b1010_0000]).unwrap();
        assert_eq!(&sealed.samples()[..8], &[1, 0, 1, 0, 0, 0, 0, 0]);
    }

    #[test]
    fn test_alpha_channel_skipped() {
        let image = CarrierImage::from_rgba(RgbaImage::from_pixel(3, 1, Rgba([0, 0, 0, 0])));
        let sealed = LsbEncoder::new(ChannelSelection::ColorOnly)
            .encode(image, &[0xFF])
            .unwrap();
        assert_eq!(sealed.samples(), &[1, 1, 1, 0, 1, 1, 1, 0, 1, 1, 0, 0]);
    }

    #[test]
    fn test_decode_recovers_envelope() {
        let env = envelope(40);
        let sealed = LsbEncoder::default()
            .encode(noisy_rgb(32, 32), &stream_for(&env))
            .unwrap();
        let bytes = LsbDecoder::default().decode(&sealed).unwrap();
        assert_eq!(Envelope::from_bytes(&bytes).unwrap(), env);
    }

    #[test]
    fn test_decode_with_all_channels() {
        let image = CarrierImage::from_rgba(RgbaImage::from_pixel(20, 20, Rgba([9, 9, 9, 9])));
        let env = envelope(8);
        let sealed = LsbEncoder::new(ChannelSelection::All)
            .encode(image, &stream_for(&env))
            .unwrap();
        let bytes = LsbDecoder::new(ChannelSelection::All).decode(&sealed).unwrap();
        assert_eq!(Envelope::from_bytes(&bytes).unwrap(), env);

        // Reading with a different channel convention does not find the marker.
        assert!(LsbDecoder::new(ChannelSelection::ColorOnly)
            .decode(&sealed)
            .is_err());
    }

    #[test]
    fn test_only_lsbs_change() {
        let original = noisy_rgb(16, 16);
        let stream = stream_for(&envelope(20));
        let sealed = LsbEncoder::default()
            .encode(original.clone(), &stream)
            .unwrap();

        let touched = stream.len() * 8;
        for (i, (a, b)) in original.samples().iter().zip(sealed.samples()).enumerate() {
            if i < touched {
                assert!(a.abs_diff(*b) <= 1);
            } else {
                assert_eq!(a, b);
            }
        }
    }

    #[test]
    fn test_encode_refuses_oversized_stream_without_writing() {
        let image = noisy_rgb(2, 2);
        let result = LsbEncoder::default().encode(image, &[0u8; 2]);
        assert_eq!(
            result.unwrap_err(),
            CapacityError::CapacityExceeded {
                required_bits: 16,
                capacity_bits: 12
            }
        );
    }

    #[test]
    fn test_unsealed_image_has_no_marker() {
        let image = CarrierImage::from_rgb(RgbImage::from_pixel(50, 50, Rgb([0, 0, 0])));
        assert_eq!(
            LsbDecoder::default().decode(&image),
            Err(ExtractionError::NoMarker)
        );

        let tiny = noisy_rgb(2, 2);
        assert_eq!(
            LsbDecoder::default().decode(&tiny),
            Err(ExtractionError::NoMarker)
        );
    }

    #[test]
    fn test_hostile_length_rejected_before_allocation() {
        let mut stream = stream_for(&envelope(0));
        // ciphertext_len = u32::MAX
        stream[4 + 28..4 + 32].copy_from_slice(&[0xFF; 4]);

        let sealed = LsbEncoder::default()
            .encode(noisy_rgb(40, 40), &stream)
            .unwrap();
        assert!(matches!(
            LsbDecoder::default().decode(&sealed),
            Err(ExtractionError::TruncatedStream { .. })
        ));
    }
}
