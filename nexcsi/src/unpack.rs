//! Conversion of raw 32-bit CSI words to complex values.
//!
//! Chips either report each subcarrier as a pair of `i16`s or as a packed
//! block-floating-point word, see [`Family`].

use num_complex::Complex32;

use crate::device::Family;

/// Exponent bias applied by the firmware to every block-floating-point word.
pub const EXPONENT_BIAS: i32 = 10;

/// Unpacks a word holding two little-endian `i16`s, real part first.
///
/// ```
/// # use nexcsi::unpack::unpack_direct;
/// let word = u32::from_le_bytes([100, 0, 0xce, 0xff]); // (100, -50)
/// assert_eq!(unpack_direct(word), num_complex::Complex32::new(100., -50.));
/// ```
pub fn unpack_direct(word: u32) -> Complex32 {
    let re = word as u16 as i16;
    let im = (word >> 16) as u16 as i16;
    Complex32::new(re as f32, im as f32)
}

/// Unpacks a block-floating-point word.
///
/// From the least significant bit, the word holds an `exponent_bits` wide
/// exponent field, the imaginary magnitude (`mantissa_bits - 1` bits), the
/// imaginary sign, the real magnitude and the real sign. Both parts are
/// scaled by `2^(exponent + 10)`, where the exponent is the low
/// `exponent_bits - 1` bits of its field. The top bit of the field is
/// ignored.
///
/// Bits above `2 * mantissa_bits + exponent_bits` are ignored.
pub fn unpack_block_float(word: u32, mantissa_bits: u32, exponent_bits: u32) -> Complex32 {
    debug_assert!(mantissa_bits >= 2 && exponent_bits >= 1);
    debug_assert!(2 * mantissa_bits + exponent_bits <= 32);

    let man_mask = (1 << (mantissa_bits - 1)) - 1;
    let exp_mask = (1 << (exponent_bits - 1)) - 1;

    let exp = (word & exp_mask) as i32;

    let mut im = ((word >> exponent_bits) & man_mask) as i32;
    if word & 1 << (exponent_bits + mantissa_bits - 1) != 0 {
        im = -im;
    }

    let mut re = ((word >> (exponent_bits + mantissa_bits)) & man_mask) as i32;
    if word & 1 << (exponent_bits + 2 * mantissa_bits - 1) != 0 {
        re = -re;
    }

    // a power of two, so the products below are exact
    let scale = 2f32.powi(exp + EXPONENT_BIAS);

    Complex32::new(re as f32 * scale, im as f32 * scale)
}

/// Unpacks a word according to the chip family.
pub fn unpack(word: u32, family: Family) -> Complex32 {
    match family {
        Family::Direct => unpack_direct(word),
        Family::BlockFloat {
            mantissa_bits,
            exponent_bits,
        } => unpack_block_float(word, mantissa_bits, exponent_bits),
    }
}

/// Packs a block-floating-point word. Magnitudes are truncated to fit.
#[cfg(test)]
pub(crate) fn pack_block_float(
    re: i32,
    im: i32,
    exp: u32,
    mantissa_bits: u32,
    exponent_bits: u32,
) -> u32 {
    let man_mask = (1u32 << (mantissa_bits - 1)) - 1;
    let part = |v: i32| (v.unsigned_abs() & man_mask) | ((v < 0) as u32) << (mantissa_bits - 1);

    exp & ((1 << exponent_bits) - 1)
        | part(im) << exponent_bits
        | part(re) << (exponent_bits + mantissa_bits)
}
