//! Static address-shape heuristics
//!
//! Real deployed contracts have addresses that look random. Degenerate shapes
//! point at burn addresses, precompiles, or hand-crafted lures.

use serde::Serialize;

use crate::models::EvmAddress;

/// Minimum leading zero bytes for the burn/precompile shape
const LEADING_ZERO_BYTES: usize = 18;

/// A degenerate address shape
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AddressPattern {
    /// 0x0000...0000
    AllZero,
    /// Same byte 20 times, e.g. 0xffff...ffff
    RepeatedByte,
    /// Every byte one more (or one less) than the previous
    SequentialBytes,
    /// Almost all zeros, e.g. 0x000...dead or a precompile
    MostlyZero,
}

impl AddressPattern {
    pub fn description(&self) -> &'static str {
        match self {
            AddressPattern::AllZero => "all-zero address",
            AddressPattern::RepeatedByte => "single repeated byte",
            AddressPattern::SequentialBytes => "strictly sequential bytes",
            AddressPattern::MostlyZero => "almost entirely zero bytes",
        }
    }
}

/// Classify an address, most specific shape first
pub fn detect(address: &EvmAddress) -> Option<AddressPattern> {
    let raw = address.to_alloy();
    let bytes = raw.as_slice();

    if bytes.iter().all(|b| *b == 0) {
        return Some(AddressPattern::AllZero);
    }
    if bytes.iter().all(|b| *b == bytes[0]) {
        return Some(AddressPattern::RepeatedByte);
    }
    let ascending = bytes.windows(2).all(|w| w[1] == w[0].wrapping_add(1));
    let descending = bytes.windows(2).all(|w| w[1] == w[0].wrapping_sub(1));
    if ascending || descending {
        return Some(AddressPattern::SequentialBytes);
    }
    if bytes.iter().take_while(|b| **b == 0).count() >= LEADING_ZERO_BYTES {
        return Some(AddressPattern::MostlyZero);
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    fn shape(s: &str) -> Option<AddressPattern> {
        detect(&EvmAddress::parse(s).unwrap())
    }

    #[test]
    fn test_degenerate_shapes() {
        assert_eq!(
            shape("0x0000000000000000000000000000000000000000"),
            Some(AddressPattern::AllZero)
        );
        assert_eq!(
            shape("0xffffffffffffffffffffffffffffffffffffffff"),
            Some(AddressPattern::RepeatedByte)
        );
        assert_eq!(
            shape("0x0102030405060708090a0b0c0d0e0f1011121314"),
            Some(AddressPattern::SequentialBytes)
        );
        assert_eq!(
            shape("0x14131211100f0e0d0c0b0a090807060504030201"),
            Some(AddressPattern::SequentialBytes)
        );
        assert_eq!(
            shape("0x000000000000000000000000000000000000dEaD"),
            Some(AddressPattern::MostlyZero)
        );
        assert_eq!(
            shape("0x0000000000000000000000000000000000000001"),
            Some(AddressPattern::MostlyZero)
        );
    }

    #[test]
    fn test_ordinary_addresses_pass() {
        assert_eq!(shape("0xdAC17F958D2ee523a2206206994597C13D831ec7"), None);
        assert_eq!(shape("0x1234567890123456789012345678901234567890"), None);
        assert_eq!(shape("0x7a250d5630B4cF539739dF2C5dAcb4c659F2488D"), None);
    }
}
