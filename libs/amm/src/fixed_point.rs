//! Overflow-safe fixed-point primitives
//!
//! All products are formed in 256-bit precision so `a * b / d` never loses
//! the intermediate. Rounding direction is always explicit: fee math rounds
//! up (in favour of the pool), curve math rounds down (in favour of the
//! invariant).

use crate::error::{AmmError, AmmResult};
use ethnum::U256;
use rust_decimal::Decimal;

/// Number of fractional bits in a Q32 value
pub const Q32_RESOLUTION: u32 = 32;

/// 1.0 in Q32
pub const Q32: u128 = 1u128 << Q32_RESOLUTION;

/// Rounding direction for division
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Rounding {
    /// Towards positive infinity (ceiling)
    Up,
    /// Towards zero (floor)
    Down,
}

impl Rounding {
    pub const fn from_round_up(round_up: bool) -> Self {
        if round_up {
            Self::Up
        } else {
            Self::Down
        }
    }
}

/// Compute `a * b / denominator` with an explicit rounding direction
///
/// # Errors
/// * `DivisionByZero` if `denominator == 0`
/// * `ArithmeticOverflow` if the rounded quotient does not fit in `u128`
pub fn mul_div(a: u128, b: u128, denominator: u128, rounding: Rounding) -> AmmResult<u128> {
    if denominator == 0 {
        return Err(AmmError::division_by_zero("mul_div"));
    }

    let product = U256::from(a) * U256::from(b);
    let denominator = U256::from(denominator);
    let mut quotient = product / denominator;

    if rounding == Rounding::Up && product % denominator != U256::ZERO {
        quotient = quotient
            .checked_add(U256::ONE)
            .ok_or_else(|| AmmError::overflow("mul_div rounding"))?;
    }

    let (high, low) = quotient.into_words();
    if high != 0 {
        return Err(AmmError::overflow("mul_div"));
    }
    Ok(low)
}

/// Ceiling division `ceil(a / b)`
pub fn ceil_div(a: u128, b: u128) -> AmmResult<u128> {
    if b == 0 {
        return Err(AmmError::division_by_zero("ceil_div"));
    }
    let quotient = a / b;
    if a % b == 0 {
        Ok(quotient)
    } else {
        // quotient < a when b > 1, so this cannot overflow
        Ok(quotient + 1)
    }
}

/// Narrow a `u128` result back to the `u64` amount width
pub fn to_u64(value: u128, operation: &'static str) -> AmmResult<u64> {
    u64::try_from(value).map_err(|_| AmmError::overflow(operation))
}

/// Price of one unit of the denominator token in numerator tokens, Q32
///
/// `price_x32(reserve_1, reserve_0)` is the token 0 price quoted in token 1.
pub fn price_x32(numerator_reserve: u64, denominator_reserve: u64) -> AmmResult<u128> {
    if denominator_reserve == 0 {
        return Err(AmmError::division_by_zero("price_x32"));
    }
    Ok((u128::from(numerator_reserve) << Q32_RESOLUTION) / u128::from(denominator_reserve))
}

/// Convert a Q32 value to a `Decimal` for display and logging
///
/// Returns `None` when the integer part exceeds what `Decimal` can hold.
pub fn x32_to_decimal(value: u128) -> Option<Decimal> {
    let integer = i128::try_from(value >> Q32_RESOLUTION).ok()?;
    let integer = Decimal::try_from_i128_with_scale(integer, 0).ok()?;
    let fraction = Decimal::from((value & (Q32 - 1)) as u64) / Decimal::from(Q32 as u64);
    integer.checked_add(fraction)
}
