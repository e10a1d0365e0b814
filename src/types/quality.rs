//! IEC 61850 quality descriptor.

use serde::{Deserialize, Serialize};

/// Validity part of the quality descriptor (bits 0-1).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u16)]
pub enum Validity {
    /// good (0)
    Good = 0,
    /// invalid (1)
    Invalid = 1,
    /// reserved (2)
    Reserved = 2,
    /// questionable (3)
    Questionable = 3,
}

impl std::fmt::Display for Validity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Good => write!(f, "good"),
            Self::Invalid => write!(f, "invalid"),
            Self::Reserved => write!(f, "reserved"),
            Self::Questionable => write!(f, "questionable"),
        }
    }
}

/// Quality of a data attribute.
///
/// Packed into 13 bits following the IEC 61850-8-1 bit string layout:
/// - Bits 0-1: validity
/// - Bit 2: overflow
/// - Bit 3: outOfRange
/// - Bit 4: badReference
/// - Bit 5: oscillatory
/// - Bit 6: failure
/// - Bit 7: oldData
/// - Bit 8: inconsistent
/// - Bit 9: inaccurate
/// - Bit 10: source (0 = process, 1 = substituted)
/// - Bit 11: test
/// - Bit 12: operatorBlocked
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
#[repr(transparent)]
pub struct Quality(u16);

impl Quality {
    const VALIDITY_MASK: u16 = 0b0000_0000_0011;
    const OVERFLOW_MASK: u16 = 1 << 2;
    const OUT_OF_RANGE_MASK: u16 = 1 << 3;
    const BAD_REFERENCE_MASK: u16 = 1 << 4;
    const OSCILLATORY_MASK: u16 = 1 << 5;
    const FAILURE_MASK: u16 = 1 << 6;
    const OLD_DATA_MASK: u16 = 1 << 7;
    const INCONSISTENT_MASK: u16 = 1 << 8;
    const INACCURATE_MASK: u16 = 1 << 9;
    const SUBSTITUTED_MASK: u16 = 1 << 10;
    const TEST_MASK: u16 = 1 << 11;
    const OPERATOR_BLOCKED_MASK: u16 = 1 << 12;
    const ALL_MASK: u16 = 0x1FFF;

    /// Good quality (all flags cleared).
    #[allow(non_upper_case_globals)]
    pub const Good: Self = Self(0);

    /// Invalid validity, no detail flags.
    #[allow(non_upper_case_globals)]
    pub const Invalid: Self = Self(Validity::Invalid as u16);

    /// Questionable validity, no detail flags.
    #[allow(non_upper_case_globals)]
    pub const Questionable: Self = Self(Validity::Questionable as u16);

    #[inline(always)]
    const fn flag(&self, mask: u16) -> bool {
        (self.0 & mask) != 0
    }

    #[inline(always)]
    const fn with_flag(mut self, mask: u16, value: bool) -> Self {
        if value {
            self.0 |= mask;
        } else {
            self.0 &= !mask;
        }
        self
    }

    /// Validity bits.
    #[inline]
    pub const fn validity(&self) -> Validity {
        match self.0 & Self::VALIDITY_MASK {
            0 => Validity::Good,
            1 => Validity::Invalid,
            2 => Validity::Reserved,
            _ => Validity::Questionable,
        }
    }

    /// Replace the validity bits.
    #[inline]
    pub const fn set_validity(mut self, validity: Validity) -> Self {
        self.0 = (self.0 & !Self::VALIDITY_MASK) | validity as u16;
        self
    }

    /// Check if validity is good.
    #[inline]
    pub const fn is_good(&self) -> bool {
        (self.0 & Self::VALIDITY_MASK) == 0
    }

    /// Overflow
    #[inline(always)]
    pub const fn overflow(&self) -> bool {
        self.flag(Self::OVERFLOW_MASK)
    }

    /// Set overflow flag
    #[inline(always)]
    pub const fn set_overflow(self, value: bool) -> Self {
        self.with_flag(Self::OVERFLOW_MASK, value)
    }

    /// Out of range
    #[inline(always)]
    pub const fn out_of_range(&self) -> bool {
        self.flag(Self::OUT_OF_RANGE_MASK)
    }

    /// Set outOfRange flag
    #[inline(always)]
    pub const fn set_out_of_range(self, value: bool) -> Self {
        self.with_flag(Self::OUT_OF_RANGE_MASK, value)
    }

    /// Bad reference
    #[inline(always)]
    pub const fn bad_reference(&self) -> bool {
        self.flag(Self::BAD_REFERENCE_MASK)
    }

    /// Set badReference flag
    #[inline(always)]
    pub const fn set_bad_reference(self, value: bool) -> Self {
        self.with_flag(Self::BAD_REFERENCE_MASK, value)
    }

    /// Oscillatory
    #[inline(always)]
    pub const fn oscillatory(&self) -> bool {
        self.flag(Self::OSCILLATORY_MASK)
    }

    /// Set oscillatory flag
    #[inline(always)]
    pub const fn set_oscillatory(self, value: bool) -> Self {
        self.with_flag(Self::OSCILLATORY_MASK, value)
    }

    /// Failure
    #[inline(always)]
    pub const fn failure(&self) -> bool {
        self.flag(Self::FAILURE_MASK)
    }

    /// Set failure flag
    #[inline(always)]
    pub const fn set_failure(self, value: bool) -> Self {
        self.with_flag(Self::FAILURE_MASK, value)
    }

    /// Old data - value not updated within the expected interval
    #[inline(always)]
    pub const fn old_data(&self) -> bool {
        self.flag(Self::OLD_DATA_MASK)
    }

    /// Set oldData flag
    #[inline(always)]
    pub const fn set_old_data(self, value: bool) -> Self {
        self.with_flag(Self::OLD_DATA_MASK, value)
    }

    /// Inconsistent
    #[inline(always)]
    pub const fn inconsistent(&self) -> bool {
        self.flag(Self::INCONSISTENT_MASK)
    }

    /// Set inconsistent flag
    #[inline(always)]
    pub const fn set_inconsistent(self, value: bool) -> Self {
        self.with_flag(Self::INCONSISTENT_MASK, value)
    }

    /// Inaccurate
    #[inline(always)]
    pub const fn inaccurate(&self) -> bool {
        self.flag(Self::INACCURATE_MASK)
    }

    /// Set inaccurate flag
    #[inline(always)]
    pub const fn set_inaccurate(self, value: bool) -> Self {
        self.with_flag(Self::INACCURATE_MASK, value)
    }

    /// Substituted (source = substituted)
    #[inline(always)]
    pub const fn substituted(&self) -> bool {
        self.flag(Self::SUBSTITUTED_MASK)
    }

    /// Set substituted flag
    #[inline(always)]
    pub const fn set_substituted(self, value: bool) -> Self {
        self.with_flag(Self::SUBSTITUTED_MASK, value)
    }

    /// Test
    #[inline(always)]
    pub const fn test(&self) -> bool {
        self.flag(Self::TEST_MASK)
    }

    /// Set test flag
    #[inline(always)]
    pub const fn set_test(self, value: bool) -> Self {
        self.with_flag(Self::TEST_MASK, value)
    }

    /// Operator blocked
    #[inline(always)]
    pub const fn operator_blocked(&self) -> bool {
        self.flag(Self::OPERATOR_BLOCKED_MASK)
    }

    /// Set operatorBlocked flag
    #[inline(always)]
    pub const fn set_operator_blocked(self, value: bool) -> Self {
        self.with_flag(Self::OPERATOR_BLOCKED_MASK, value)
    }

    /// Get the raw packed value
    #[inline(always)]
    pub const fn as_raw(&self) -> u16 {
        self.0
    }

    /// Create from raw packed value. Bits above 12 are ignored.
    #[inline(always)]
    pub const fn from_raw(raw: u16) -> Self {
        Self(raw & Self::ALL_MASK)
    }
}

impl std::fmt::Debug for Quality {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Quality")
            .field("validity", &self.validity())
            .field("overflow", &self.overflow())
            .field("out_of_range", &self.out_of_range())
            .field("bad_reference", &self.bad_reference())
            .field("oscillatory", &self.oscillatory())
            .field("failure", &self.failure())
            .field("old_data", &self.old_data())
            .field("inconsistent", &self.inconsistent())
            .field("inaccurate", &self.inaccurate())
            .field("substituted", &self.substituted())
            .field("test", &self.test())
            .field("operator_blocked", &self.operator_blocked())
            .finish()
    }
}

impl std::fmt::Display for Quality {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.validity())?;
        let flags = [
            (self.overflow(), "overflow"),
            (self.out_of_range(), "outOfRange"),
            (self.bad_reference(), "badReference"),
            (self.oscillatory(), "oscillatory"),
            (self.failure(), "failure"),
            (self.old_data(), "oldData"),
            (self.inconsistent(), "inconsistent"),
            (self.inaccurate(), "inaccurate"),
            (self.substituted(), "substituted"),
            (self.test(), "test"),
            (self.operator_blocked(), "operatorBlocked"),
        ];
        for (set, name) in flags {
            if set {
                write!(f, "|{}", name)?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_good() {
        let q = Quality::default();
        assert_eq!(q, Quality::Good);
        assert!(q.is_good());
        assert_eq!(q.validity(), Validity::Good);
    }

    #[test]
    fn test_flags_are_independent() {
        let q = Quality::Good.set_old_data(true).set_failure(true);
        assert!(q.old_data());
        assert!(q.failure());
        assert!(!q.overflow());
        assert!(q.is_good());

        let q = q.set_failure(false);
        assert!(!q.failure());
        assert!(q.old_data());
    }

    #[test]
    fn test_validity_round_trip() {
        let q = Quality::Good
            .set_test(true)
            .set_validity(Validity::Questionable);
        assert_eq!(q.validity(), Validity::Questionable);
        assert!(q.test());
        assert!(!q.is_good());

        let q = q.set_validity(Validity::Good);
        assert!(q.is_good());
        assert!(q.test());
    }

    #[test]
    fn test_from_raw_masks_unused_bits() {
        assert_eq!(Quality::from_raw(0xFFFF).as_raw(), 0x1FFF);
    }

    #[test]
    fn test_display() {
        assert_eq!(Quality::Good.to_string(), "good");
        assert_eq!(
            Quality::Invalid.set_old_data(true).to_string(),
            "invalid|oldData"
        );
    }
}
