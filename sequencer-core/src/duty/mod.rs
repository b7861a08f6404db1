//! Duty value codec for the PWM sequence memory format.
//!
//! Every channel cell the peripheral reads is a 16-bit word: the lower 15 bits
//! hold the compare value (the point inside one PWM period where the output
//! flips) and bit 15 selects the inverted polarity. The codec keeps the two
//! fields orthogonal so a magnitude can never spill into the polarity bit.
//!
//! Magnitudes above the countertop saturate by default. Callers that prefer
//! to reject out-of-range values use [`DutyValue::try_encode`].

use core::fmt;

/// Bit that marks a cell as inverted polarity.
pub const POLARITY_BIT: u16 = 0x8000;

/// Mask covering the usable magnitude field.
pub const MAGNITUDE_MASK: u16 = 0x7FFF;

/// Largest countertop the 15-bit magnitude field can express.
pub const MAX_COUNTERTOP: u16 = MAGNITUDE_MASK;

/// Output polarity for a single channel cell.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub enum Polarity {
    /// Output starts in its active state and flips at the compare value.
    #[default]
    Normal,
    /// Output starts inactive and flips at the compare value.
    Inverted,
}

impl Polarity {
    /// Returns `true` for [`Polarity::Inverted`].
    #[must_use]
    pub const fn is_inverted(self) -> bool {
        matches!(self, Polarity::Inverted)
    }

    const fn bit(self) -> u16 {
        match self {
            Polarity::Normal => 0,
            Polarity::Inverted => POLARITY_BIT,
        }
    }
}

impl fmt::Display for Polarity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Polarity::Normal => f.write_str("normal"),
            Polarity::Inverted => f.write_str("inverted"),
        }
    }
}

/// Error returned by the strict encoder.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum DutyError {
    /// Requested magnitude exceeds the countertop.
    AboveCountertop { magnitude: u32, countertop: u16 },
}

impl fmt::Display for DutyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DutyError::AboveCountertop {
                magnitude,
                countertop,
            } => write!(f, "duty {magnitude} exceeds countertop {countertop}"),
        }
    }
}

impl core::error::Error for DutyError {}

/// One channel's duty value in the peripheral's native cell format.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub struct DutyValue {
    raw: u16,
}

impl DutyValue {
    /// Cell with magnitude 0 and normal polarity.
    pub const ZERO: Self = Self { raw: 0 };

    /// Encodes a magnitude and polarity, saturating the magnitude to `countertop`.
    #[must_use]
    pub const fn encode(magnitude: u32, polarity: Polarity, countertop: u16) -> Self {
        Self::from_parts(saturate(magnitude as u64, clamp_countertop(countertop)), polarity)
    }

    /// Encodes a magnitude and polarity, rejecting magnitudes above `countertop`.
    ///
    /// # Errors
    ///
    /// Returns [`DutyError::AboveCountertop`] when `magnitude > countertop`.
    pub const fn try_encode(
        magnitude: u32,
        polarity: Polarity,
        countertop: u16,
    ) -> Result<Self, DutyError> {
        if magnitude > clamp_countertop(countertop) as u32 {
            Err(DutyError::AboveCountertop {
                magnitude,
                countertop,
            })
        } else {
            Ok(Self::encode(magnitude, polarity, countertop))
        }
    }

    /// Encodes `numerator / denominator` of `countertop`.
    ///
    /// Fractions above one saturate; a zero denominator yields magnitude 0.
    #[must_use]
    pub const fn from_fraction(
        numerator: u32,
        denominator: u32,
        polarity: Polarity,
        countertop: u16,
    ) -> Self {
        let top = clamp_countertop(countertop);
        let magnitude = if denominator == 0 {
            0
        } else {
            (top as u64) * (numerator as u64) / (denominator as u64)
        };
        Self::from_parts(saturate(magnitude, top), polarity)
    }

    /// Normal-polarity cell at `magnitude`, saturated to `countertop`.
    #[must_use]
    pub const fn normal(magnitude: u32, countertop: u16) -> Self {
        Self::encode(magnitude, Polarity::Normal, countertop)
    }

    /// Inverted-polarity cell at `magnitude`, saturated to `countertop`.
    #[must_use]
    pub const fn inverted(magnitude: u32, countertop: u16) -> Self {
        Self::encode(magnitude, Polarity::Inverted, countertop)
    }

    /// Reconstructs a cell from its raw 16-bit representation.
    #[must_use]
    pub const fn from_raw(raw: u16) -> Self {
        Self { raw }
    }

    const fn from_parts(magnitude: u16, polarity: Polarity) -> Self {
        Self {
            raw: (magnitude & MAGNITUDE_MASK) | polarity.bit(),
        }
    }

    /// Raw cell as written to device memory.
    #[must_use]
    pub const fn raw(self) -> u16 {
        self.raw
    }

    /// Compare value without the polarity bit.
    #[must_use]
    pub const fn magnitude(self) -> u16 {
        self.raw & MAGNITUDE_MASK
    }

    /// Polarity encoded in the cell.
    #[must_use]
    pub const fn polarity(self) -> Polarity {
        if self.raw & POLARITY_BIT == 0 {
            Polarity::Normal
        } else {
            Polarity::Inverted
        }
    }

    /// Re-saturates the magnitude against another countertop, keeping polarity.
    #[must_use]
    pub const fn clamped_to(self, countertop: u16) -> Self {
        Self::encode(self.magnitude() as u32, self.polarity(), countertop)
    }
}

/// Encodes a magnitude and polarity, saturating to `countertop`.
#[must_use]
pub const fn encode(magnitude: u32, polarity: Polarity, countertop: u16) -> DutyValue {
    DutyValue::encode(magnitude, polarity, countertop)
}

/// Splits a raw cell into magnitude and polarity.
#[must_use]
pub const fn decode(raw: u16) -> (u16, Polarity) {
    let value = DutyValue::from_raw(raw);
    (value.magnitude(), value.polarity())
}

/// Clamps `magnitude` to `top`; `top` already fits the magnitude field.
#[allow(clippy::cast_possible_truncation)]
const fn saturate(magnitude: u64, top: u16) -> u16 {
    if magnitude > top as u64 {
        top
    } else {
        magnitude as u16
    }
}

const fn clamp_countertop(countertop: u16) -> u16 {
    if countertop > MAX_COUNTERTOP {
        MAX_COUNTERTOP
    } else {
        countertop
    }
}
