//! Bit-width and mask arithmetic for values of up to 64 bits.
//!
//! Every signal value in the kernel is a `u64` whose bits above the signal's
//! width are always zero. The helpers here are the single place where the
//! `width == 64` edge case is handled, since `1u64 << 64` overflows.

use serde::{Deserialize, Serialize};
use std::fmt;

/// The widest value a signal can carry.
pub const MAX_BITS: u32 = 64;

/// Returns a mask with the low `width` bits set.
///
/// Widths of 64 or more yield `u64::MAX`; a width of zero yields `0`.
pub fn mask(width: u32) -> u64 {
    if width >= MAX_BITS {
        u64::MAX
    } else {
        (1u64 << width) - 1
    }
}

/// Returns a mask with `width` bits set starting at bit `pos`.
///
/// Bits shifted past bit 63 are dropped.
pub fn field_mask(pos: u32, width: u32) -> u64 {
    if pos >= MAX_BITS {
        0
    } else {
        mask(width) << pos
    }
}

/// A validated signal width in the range `1..=64`.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Serialize, Deserialize)]
#[serde(try_from = "u32", into = "u32")]
pub struct BitWidth(u32);

impl BitWidth {
    /// A single bit.
    pub const ONE: BitWidth = BitWidth(1);

    /// Creates a width, returning `None` when `bits` is zero or exceeds [`MAX_BITS`].
    pub fn new(bits: u32) -> Option<Self> {
        if (1..=MAX_BITS).contains(&bits) {
            Some(Self(bits))
        } else {
            None
        }
    }

    /// Returns the number of bits.
    pub fn bits(self) -> u32 {
        self.0
    }

    /// Returns the mask covering every bit of this width.
    pub fn mask(self) -> u64 {
        mask(self.0)
    }

    /// Returns `true` if `value` has no bits set above this width.
    pub fn fits(self, value: u64) -> bool {
        value & !self.mask() == 0
    }
}

impl TryFrom<u32> for BitWidth {
    type Error = String;

    fn try_from(bits: u32) -> Result<Self, Self::Error> {
        BitWidth::new(bits).ok_or_else(|| format!("bit width {bits} not in 1..={MAX_BITS}"))
    }
}

impl From<BitWidth> for u32 {
    fn from(width: BitWidth) -> u32 {
        width.0
    }
}

impl fmt::Display for BitWidth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mask_edges() {
        assert_eq!(mask(0), 0);
        assert_eq!(mask(1), 1);
        assert_eq!(mask(4), 0xF);
        assert_eq!(mask(63), u64::MAX >> 1);
        assert_eq!(mask(64), u64::MAX);
        assert_eq!(mask(100), u64::MAX);
    }

    #[test]
    fn field_mask_positions() {
        assert_eq!(field_mask(0, 4), 0x0F);
        assert_eq!(field_mask(4, 4), 0xF0);
        assert_eq!(field_mask(60, 8), 0xF000_0000_0000_0000);
        assert_eq!(field_mask(64, 1), 0);
    }

    #[test]
    fn width_bounds() {
        assert!(BitWidth::new(0).is_none());
        assert!(BitWidth::new(65).is_none());
        assert_eq!(BitWidth::new(64).unwrap().mask(), u64::MAX);
        assert_eq!(BitWidth::ONE.bits(), 1);
    }

    #[test]
    fn width_fits() {
        let w = BitWidth::new(4).unwrap();
        assert!(w.fits(0xF));
        assert!(!w.fits(0x10));
    }

    #[test]
    fn serde_roundtrip() {
        let w = BitWidth::new(12).unwrap();
        let json = serde_json::to_string(&w).unwrap();
        assert_eq!(json, "12");
        let back: BitWidth = serde_json::from_str(&json).unwrap();
        assert_eq!(w, back);
    }

    #[test]
    fn serde_rejects_zero() {
        assert!(serde_json::from_str::<BitWidth>("0").is_err());
    }
}
