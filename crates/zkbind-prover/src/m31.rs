//! Mersenne-31 field, p = 2^31 - 1
//!
//! Trace cells, reference string points, constraint coefficients and every
//! opened value live here.

use core::fmt;
use core::iter::Sum;
use core::ops::{Add, AddAssign, Mul, MulAssign, Neg, Sub, SubAssign};

/// The Mersenne-31 prime
pub const M31_PRIME: u32 = (1 << 31) - 1;

/// Encoded size of an element
pub const M31_BYTES: usize = 4;

/// Field element
///
/// The inner value is public so decoders can carry a raw encoding until it is
/// checked with [`M31::is_canonical`]. Arithmetic assumes canonical operands.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(transparent)]
pub struct M31(pub u32);

impl M31 {
    pub const ZERO: Self = Self(0);
    pub const ONE: Self = Self(1);

    /// Reduce any `u32` into the field
    #[inline]
    pub fn new(value: u32) -> Self {
        Self::reduce(u64::from(value))
    }

    /// `x mod p` for `x < 2^62`, folding the high bits onto the low ones
    #[inline]
    pub const fn reduce(x: u64) -> Self {
        let folded = (x & M31_PRIME as u64) + (x >> 31);
        let folded = (folded & M31_PRIME as u64) + (folded >> 31);
        Self(if folded >= M31_PRIME as u64 {
            folded as u32 - M31_PRIME
        } else {
            folded as u32
        })
    }

    #[inline]
    pub fn square(self) -> Self {
        self * self
    }

    #[inline]
    pub const fn is_zero(self) -> bool {
        self.0 == 0
    }

    /// True when the inner value is the representative in `[0, p)`
    #[inline]
    pub const fn is_canonical(self) -> bool {
        self.0 < M31_PRIME
    }

    #[inline]
    pub const fn value(self) -> u32 {
        self.0
    }

    #[inline]
    pub fn to_le_bytes(self) -> [u8; M31_BYTES] {
        self.0.to_le_bytes()
    }

    /// Decode and reduce
    #[inline]
    pub fn from_le_bytes(bytes: [u8; M31_BYTES]) -> Self {
        Self::new(u32::from_le_bytes(bytes))
    }

    /// Decode without reduction; a non-canonical encoding survives for the
    /// verifier to reject
    #[inline]
    pub fn from_raw_le_bytes(bytes: [u8; M31_BYTES]) -> Self {
        Self(u32::from_le_bytes(bytes))
    }
}

impl fmt::Display for M31 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

impl From<u32> for M31 {
    #[inline]
    fn from(value: u32) -> Self {
        Self::new(value)
    }
}

impl From<M31> for u32 {
    #[inline]
    fn from(value: M31) -> Self {
        value.0
    }
}

impl Add for M31 {
    type Output = Self;

    #[inline]
    fn add(self, rhs: Self) -> Self {
        Self::reduce(u64::from(self.0) + u64::from(rhs.0))
    }
}

impl Sub for M31 {
    type Output = Self;

    #[inline]
    fn sub(self, rhs: Self) -> Self {
        Self::reduce(u64::from(self.0) + u64::from(M31_PRIME) - u64::from(rhs.0))
    }
}

impl Mul for M31 {
    type Output = Self;

    #[inline]
    fn mul(self, rhs: Self) -> Self {
        Self::reduce(u64::from(self.0) * u64::from(rhs.0))
    }
}

impl Neg for M31 {
    type Output = Self;

    #[inline]
    fn neg(self) -> Self {
        Self::ZERO - self
    }
}

impl AddAssign for M31 {
    #[inline]
    fn add_assign(&mut self, rhs: Self) {
        *self = *self + rhs;
    }
}

impl SubAssign for M31 {
    #[inline]
    fn sub_assign(&mut self, rhs: Self) {
        *self = *self - rhs;
    }
}

impl MulAssign for M31 {
    #[inline]
    fn mul_assign(&mut self, rhs: Self) {
        *self = *self * rhs;
    }
}

impl Sum for M31 {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::ZERO, Add::add)
    }
}
