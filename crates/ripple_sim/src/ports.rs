//! Bit-range descriptors and the partition grammar used by splitters.
//!
//! A [`Partition`] is an ordered list of [`Range`]s describing how a bus is cut
//! into ports. It is parsed from a comma-separated description where each
//! token is one of:
//!
//! - `W*C`: `C` consecutive ranges of width `W`
//! - `F-T`: one range covering bits `F` through `T` inclusive
//! - `W`: one range of width `W` placed after the previous token
//!
//! Numbers may be written in decimal, hexadecimal (`0x1F`, `#1F`) or octal
//! (`017`). An empty description yields a single one-bit range.

use std::fmt;

use ripple_common::{field_mask, mask, MAX_BITS};
use serde::Serialize;

use crate::error::SimError;

/// One port of a partition: `width` bits starting at bit `pos`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Range {
    pos: u32,
    width: u32,
    index: usize,
    name: String,
}

impl Range {
    fn new(pos: u32, width: u32, index: usize) -> Self {
        Self {
            pos,
            width,
            index,
            name: range_name(pos, width),
        }
    }

    /// The lowest bit covered.
    pub fn pos(&self) -> u32 {
        self.pos
    }

    /// The number of bits covered; always at least one.
    pub fn width(&self) -> u32 {
        self.width
    }

    /// One past the highest bit covered.
    pub fn end(&self) -> u32 {
        self.pos + self.width
    }

    /// The position of this range within its partition.
    pub fn index(&self) -> usize {
        self.index
    }

    /// The display name: `"3"`, `"3,4"` or `"3-7"`.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The covered bits as a mask over the whole bus.
    pub fn mask(&self) -> u64 {
        field_mask(self.pos, self.width)
    }

    /// Returns `true` if the two ranges share at least one bit.
    pub fn overlaps(&self, other: &Range) -> bool {
        self.pos < other.end() && other.pos < self.end()
    }

    /// Returns `true` if every bit of `other` lies inside this range.
    pub fn contains(&self, other: &Range) -> bool {
        self.pos <= other.pos && other.end() <= self.end()
    }
}

impl fmt::Display for Range {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

fn range_name(pos: u32, width: u32) -> String {
    match width {
        1 => format!("{pos}"),
        2 => format!("{pos},{}", pos + 1),
        _ => format!("{pos}-{}", pos + width - 1),
    }
}

/// An ordered list of ranges partitioning a bus.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Partition {
    ranges: Vec<Range>,
    bits: u32,
    definition: String,
}

impl Partition {
    /// Parses a range description.
    ///
    /// Fails with a bits fault on malformed tokens, reversed `F-T` ranges,
    /// zero-width ranges, or a total width above 64 bits. The result is not
    /// yet checked for being an exact cover; see
    /// [`check_consistency`](Partition::check_consistency).
    pub fn parse(definition: &str) -> Result<Self, SimError> {
        let mut partition = Partition::empty(definition);
        for token in definition.split(',').filter(|t| !t.is_empty()) {
            let token = token.trim();
            if let Some((width, count)) = token.split_once('*') {
                let width = partition.decode(width)?;
                let count = partition.decode(count)?;
                for _ in 0..count {
                    partition.push(partition.bits, width)?;
                }
            } else if let Some((from, to)) = token.split_once('-') {
                let from = partition.decode(from)?;
                let to = partition.decode(to)?;
                let width = to
                    .checked_sub(from)
                    .and_then(|span| span.checked_add(1))
                    .ok_or_else(|| partition.syntax_error())?;
                partition.push(from, width)?;
            } else {
                let width = partition.decode(token)?;
                partition.push(partition.bits, width)?;
            }
        }
        if partition.ranges.is_empty() {
            partition.push(0, 1)?;
        }
        Ok(partition)
    }

    /// A partition with one range covering `bits` bits.
    pub fn single(bits: u32) -> Result<Self, SimError> {
        let mut partition = Partition::empty(&bits.to_string());
        partition.push(0, bits)?;
        Ok(partition)
    }

    /// A partition with one single-bit range per bit.
    pub fn per_bit(bits: u32) -> Result<Self, SimError> {
        let mut partition = Partition::empty(&format!("1*{bits}"));
        if bits == 0 {
            return Err(partition.zero_width_error());
        }
        for pos in 0..bits {
            partition.push(pos, 1)?;
        }
        Ok(partition)
    }

    fn empty(definition: &str) -> Self {
        Self {
            ranges: Vec::new(),
            bits: 0,
            definition: definition.to_string(),
        }
    }

    fn push(&mut self, pos: u32, width: u32) -> Result<(), SimError> {
        if width == 0 {
            return Err(self.zero_width_error());
        }
        let end = pos
            .checked_add(width)
            .filter(|&end| end <= MAX_BITS)
            .ok_or_else(|| {
                SimError::bits(format!(
                    "splitter definition '{}' uses more than {MAX_BITS} bits",
                    self.definition
                ))
            })?;
        self.ranges.push(Range::new(pos, width, self.ranges.len()));
        self.bits = self.bits.max(end);
        Ok(())
    }

    fn decode(&self, literal: &str) -> Result<u32, SimError> {
        let literal = literal.trim();
        let (digits, radix) = if let Some(hex) = literal
            .strip_prefix("0x")
            .or_else(|| literal.strip_prefix("0X"))
            .or_else(|| literal.strip_prefix('#'))
        {
            (hex, 16)
        } else if literal.len() > 1 && literal.starts_with('0') {
            (&literal[1..], 8)
        } else {
            (literal, 10)
        };
        if digits.is_empty() || !digits.chars().all(|c| c.is_digit(radix)) {
            return Err(self.syntax_error());
        }
        u32::from_str_radix(digits, radix).map_err(|_| self.syntax_error())
    }

    fn syntax_error(&self) -> SimError {
        SimError::bits(format!(
            "syntax error in splitter definition '{}'",
            self.definition
        ))
    }

    fn zero_width_error(&self) -> SimError {
        SimError::bits(format!(
            "splitter definition '{}' contains a range of width 0",
            self.definition
        ))
    }

    /// Checks that the ranges cover `[0, bits)` exactly once per bit.
    pub fn check_consistency(&self) -> Result<(), SimError> {
        let mut remaining = mask(self.bits);
        for range in &self.ranges {
            let m = range.mask();
            if remaining & m != m {
                return Err(SimError::bits(format!(
                    "bits of splitter definition '{}' are assigned more than once",
                    self.definition
                )));
            }
            remaining &= !m;
        }
        if remaining != 0 {
            return Err(SimError::bits(format!(
                "not all bits of splitter definition '{}' are assigned",
                self.definition
            )));
        }
        Ok(())
    }

    /// The total width: the highest covered bit plus one.
    pub fn bits(&self) -> u32 {
        self.bits
    }

    /// The number of ranges.
    pub fn len(&self) -> usize {
        self.ranges.len()
    }

    /// Always `false` for a parsed partition.
    pub fn is_empty(&self) -> bool {
        self.ranges.is_empty()
    }

    /// Returns the range at `index`.
    pub fn get(&self, index: usize) -> Option<&Range> {
        self.ranges.get(index)
    }

    /// The ranges in declaration order.
    pub fn ranges(&self) -> &[Range] {
        &self.ranges
    }

    /// Iterates over the ranges in declaration order.
    pub fn iter(&self) -> std::slice::Iter<'_, Range> {
        self.ranges.iter()
    }

    /// The text this partition was built from.
    pub fn definition(&self) -> &str {
        &self.definition
    }

    /// Port names in declaration order.
    pub fn names(&self) -> Vec<String> {
        self.ranges.iter().map(|r| r.name.clone()).collect()
    }
}

impl<'a> IntoIterator for &'a Partition {
    type Item = &'a Range;
    type IntoIter = std::slice::Iter<'a, Range>;

    fn into_iter(self) -> Self::IntoIter {
        self.ranges.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn spans(p: &Partition) -> Vec<(u32, u32)> {
        p.iter().map(|r| (r.pos(), r.width())).collect()
    }

    #[test]
    fn replicated_then_plain() {
        let p = Partition::parse("1*2,2").unwrap();
        assert_eq!(spans(&p), vec![(0, 1), (1, 1), (2, 2)]);
        assert_eq!(p.bits(), 4);
        assert_eq!(p.names(), vec!["0", "1", "2,3"]);
        p.check_consistency().unwrap();
    }

    #[test]
    fn reversed_range_is_syntax_error() {
        let err = Partition::parse("4-1").unwrap_err();
        assert!(matches!(err, SimError::Bits { .. }));
        assert!(err.to_string().contains("syntax error"));
        assert!(err.to_string().contains("'4-1'"));
    }

    #[test]
    fn explicit_ranges() {
        let p = Partition::parse("0-3, 4-7").unwrap();
        assert_eq!(spans(&p), vec![(0, 4), (4, 4)]);
        assert_eq!(p.names(), vec!["0-3", "4-7"]);
    }

    #[test]
    fn plain_width_follows_highest_bit() {
        let p = Partition::parse("4-7,4").unwrap();
        assert_eq!(spans(&p), vec![(4, 4), (8, 4)]);
        assert_eq!(p.bits(), 12);
    }

    #[test]
    fn empty_description_is_one_bit() {
        let p = Partition::parse("").unwrap();
        assert_eq!(spans(&p), vec![(0, 1)]);
        assert_eq!(p.bits(), 1);
    }

    #[test]
    fn numeric_literals() {
        let p = Partition::parse("0x4,#4,010").unwrap();
        assert_eq!(spans(&p), vec![(0, 4), (4, 4), (8, 8)]);
    }

    #[test]
    fn malformed_tokens() {
        for bad in ["a", "4*", "*4", "1- ", " ", "3.5", "-2", "0x"] {
            let err = Partition::parse(bad).unwrap_err();
            assert!(
                matches!(err, SimError::Bits { .. }),
                "'{bad}' should be rejected"
            );
        }
    }

    #[test]
    fn empty_tokens_skipped() {
        let p = Partition::parse("4,,4").unwrap();
        assert_eq!(p.len(), 2);
    }

    #[test]
    fn too_many_bits() {
        assert!(Partition::parse("64").is_ok());
        let err = Partition::parse("32,33").unwrap_err();
        assert!(err.to_string().contains("more than 64 bits"));
        assert!(Partition::parse("60-64").is_err());
        assert!(Partition::parse("1*65").is_err());
    }

    #[test]
    fn extreme_bounds_rejected() {
        for bad in [
            "0-4294967295",
            "0-0xFFFFFFFF",
            "4294967295-4294967295",
            "1*4294967295",
            "0-4294967296",
        ] {
            let err = Partition::parse(bad).unwrap_err();
            assert!(matches!(err, SimError::Bits { .. }), "{bad}");
        }
    }

    #[test]
    fn zero_width_rejected() {
        let err = Partition::parse("4,0").unwrap_err();
        assert!(err.to_string().contains("width 0"));
        assert!(Partition::parse("0*3").is_err());
    }

    #[test]
    fn zero_count_adds_nothing() {
        let p = Partition::parse("4*0,2").unwrap();
        assert_eq!(spans(&p), vec![(0, 2)]);
    }

    #[test]
    fn range_names() {
        assert_eq!(range_name(5, 1), "5");
        assert_eq!(range_name(5, 2), "5,6");
        assert_eq!(range_name(5, 3), "5-7");
    }

    #[test]
    fn overlap_detected() {
        let p = Partition::parse("0-3,2-5").unwrap();
        let err = p.check_consistency().unwrap_err();
        assert!(err.to_string().contains("more than once"));
    }

    #[test]
    fn gap_detected() {
        let p = Partition::parse("0-3,5-7").unwrap();
        let err = p.check_consistency().unwrap_err();
        assert!(err.to_string().contains("not all bits"));
    }

    #[test]
    fn full_width_cover() {
        let p = Partition::parse("32,32").unwrap();
        p.check_consistency().unwrap();
        assert_eq!(p.bits(), 64);
    }

    #[test]
    fn factories() {
        let single = Partition::single(8).unwrap();
        assert_eq!(spans(&single), vec![(0, 8)]);
        let per_bit = Partition::per_bit(3).unwrap();
        assert_eq!(spans(&per_bit), vec![(0, 1), (1, 1), (2, 1)]);
        assert!(Partition::single(65).is_err());
        assert!(Partition::per_bit(0).is_err());
    }

    #[test]
    fn range_relations() {
        let p = Partition::parse("0-7,2-3,6-9").unwrap();
        let (a, b, c) = (&p.ranges()[0], &p.ranges()[1], &p.ranges()[2]);
        assert!(a.contains(b));
        assert!(!b.contains(a));
        assert!(a.overlaps(c));
        assert!(!b.overlaps(c));
        assert_eq!(c.mask(), 0b11_1100_0000);
    }

    /// Widths of 1..=8 bits, at most 8 of them, with their bus positions.
    fn arb_layout() -> impl Strategy<Value = Vec<(u32, u32)>> {
        prop::collection::vec(1u32..=8, 1..8).prop_map(|widths| {
            let mut pos = 0;
            widths
                .into_iter()
                .map(|w| {
                    let span = (pos, w);
                    pos += w;
                    span
                })
                .collect()
        })
    }

    proptest! {
        #[test]
        fn contiguous_widths_cover_exactly(layout in arb_layout()) {
            let text: Vec<String> = layout.iter().map(|(_, w)| w.to_string()).collect();
            let p = Partition::parse(&text.join(",")).unwrap();
            prop_assert!(p.check_consistency().is_ok());

            let union = p.iter().try_fold(0u64, |acc, r| {
                prop_assert_eq!(acc & r.mask(), 0);
                Ok(acc | r.mask())
            })?;
            prop_assert_eq!(union, mask(p.bits()));
            prop_assert_eq!(spans(&p), layout);
        }

        #[test]
        fn shuffled_explicit_ranges_cover_exactly(
            layout in arb_layout().prop_flat_map(|l| Just(l).prop_shuffle())
        ) {
            let text: Vec<String> = layout
                .iter()
                .map(|(pos, w)| format!("{}-{}", pos, pos + w - 1))
                .collect();
            let p = Partition::parse(&text.join(",")).unwrap();
            prop_assert!(p.check_consistency().is_ok());
            prop_assert_eq!(spans(&p), layout);
        }

        #[test]
        fn overlapping_ranges_rejected(
            layout in arb_layout(),
            dup in any::<prop::sample::Index>(),
        ) {
            let (pos, w) = layout[dup.index(layout.len())];
            let mut text: Vec<String> = layout
                .iter()
                .map(|(pos, w)| format!("{}-{}", pos, pos + w - 1))
                .collect();
            text.push(format!("{}-{}", pos, pos + w - 1));
            let p = Partition::parse(&text.join(",")).unwrap();
            prop_assert!(p.check_consistency().is_err());
        }
    }
}
