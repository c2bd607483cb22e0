// 2.0 math.rs: shared position math. ratio conversion for batching, tick/price
// conversion, notional and liquidity sizing for the range strategy.
// integer paths floor, decimal paths are checked and never panic on bad input.

use crate::types::{Bps, SignedSize};
use rust_decimal::prelude::{FromPrimitive, ToPrimitive};
use rust_decimal::{Decimal, MathematicalOps};
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

// ticks beyond this overflow Decimal once squared
pub const MIN_TICK: i32 = -600_000;
pub const MAX_TICK: i32 = 600_000;

pub const PIPS: u32 = 1_000_000;

const TICK_BASE: Decimal = dec!(1.0001);

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum MathError {
    #[error("Arithmetic overflow")]
    Overflow,

    #[error("Division by zero")]
    DivisionByZero,

    #[error("Tick {0} outside supported range")]
    InvalidTick(i32),

    #[error("Price must be positive")]
    InvalidPrice,
}

// 2.1: floor(a * b / c). the batching ledger relies on this rounding toward zero
pub fn mul_div_floor(a: u128, b: u128, c: u128) -> Result<u128, MathError> {
    if c == 0 {
        return Err(MathError::DivisionByZero);
    }
    let product = a.checked_mul(b).ok_or(MathError::Overflow)?;
    Ok(product / c)
}

pub fn to_decimal(value: u128) -> Result<Decimal, MathError> {
    Decimal::from_u128(value).ok_or(MathError::Overflow)
}

// floors toward zero, negative inputs clamp to 0
pub fn to_u128_floor(value: Decimal) -> Result<u128, MathError> {
    if value <= Decimal::ZERO {
        return Ok(0);
    }
    value.floor().to_u128().ok_or(MathError::Overflow)
}

pub fn to_i128(value: u128) -> Result<i128, MathError> {
    i128::try_from(value).map_err(|_| MathError::Overflow)
}

pub fn price_from_sqrt(sqrt_price: Decimal) -> Result<Decimal, MathError> {
    sqrt_price.checked_mul(sqrt_price).ok_or(MathError::Overflow)
}

// 2.2: sqrt(1.0001^tick)
pub fn sqrt_price_at_tick(tick: i32) -> Result<Decimal, MathError> {
    if !(MIN_TICK..=MAX_TICK).contains(&tick) {
        return Err(MathError::InvalidTick(tick));
    }
    let magnitude = TICK_BASE
        .checked_powi(tick.unsigned_abs() as i64)
        .ok_or(MathError::Overflow)?;
    let price = if tick < 0 {
        Decimal::ONE.checked_div(magnitude).ok_or(MathError::DivisionByZero)?
    } else {
        magnitude
    };
    price.sqrt().ok_or(MathError::InvalidPrice)
}

// 2.3: greatest tick whose sqrt price is <= sqrt_price
pub fn tick_at_sqrt_price(sqrt_price: Decimal) -> Result<i32, MathError> {
    if sqrt_price <= Decimal::ZERO {
        return Err(MathError::InvalidPrice);
    }
    let price = price_from_sqrt(sqrt_price)?;
    if price.is_zero() {
        return Err(MathError::InvalidPrice);
    }
    let estimate = (price.ln() / TICK_BASE.ln()).floor();
    let mut tick = estimate
        .to_i32()
        .filter(|t| (MIN_TICK..=MAX_TICK).contains(t))
        .ok_or(MathError::InvalidPrice)?;

    // ln rounding can land one tick off either way
    while tick > MIN_TICK && sqrt_price_at_tick(tick)? > sqrt_price {
        tick -= 1;
    }
    while tick < MAX_TICK && sqrt_price_at_tick(tick + 1)? <= sqrt_price {
        tick += 1;
    }
    Ok(tick)
}

pub fn align_tick(tick: i32, spacing: i32) -> i32 {
    if spacing <= 1 {
        return tick;
    }
    tick - tick.rem_euclid(spacing)
}

// 2.4: |size| * price, priced off a sqrt price
pub fn token_notional(size: SignedSize, sqrt_price: Decimal) -> Result<Decimal, MathError> {
    let price = price_from_sqrt(sqrt_price)?;
    size.abs().checked_mul(price).ok_or(MathError::Overflow)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BaseRange {
    pub tick_lower: i32,
    pub tick_upper: i32,
    pub liquidity: u128,
}

// 2.5: range around the current price with sqrt bounds sqrtP * f and sqrtP / f.
// both token halves of the position are worth L * (sqrtP - sqrtP_lower), so the
// liquidity that spends the whole market value is V / (2 * (sqrtP - sqrtP_lower)).
pub fn base_range(
    sqrt_price: Decimal,
    market_value: Decimal,
    sqrt_price_factor_pips: u32,
    tick_spacing: i32,
) -> Result<BaseRange, MathError> {
    if sqrt_price <= Decimal::ZERO {
        return Err(MathError::InvalidPrice);
    }
    if sqrt_price_factor_pips == 0 || sqrt_price_factor_pips >= PIPS {
        return Err(MathError::InvalidPrice);
    }
    let factor = Decimal::from(sqrt_price_factor_pips) / Decimal::from(PIPS);
    let sqrt_lower = sqrt_price.checked_mul(factor).ok_or(MathError::Overflow)?;
    let sqrt_upper = sqrt_price.checked_div(factor).ok_or(MathError::Overflow)?;

    let tick_lower = align_tick(tick_at_sqrt_price(sqrt_lower)?, tick_spacing);
    let tick_upper = align_tick(tick_at_sqrt_price(sqrt_upper)?, tick_spacing);

    let denominator = dec!(2) * (sqrt_price - sqrt_lower);
    let liquidity = if market_value > Decimal::ZERO {
        to_u128_floor(market_value.checked_div(denominator).ok_or(MathError::DivisionByZero)?)?
    } else {
        0
    };

    Ok(BaseRange {
        tick_lower,
        tick_upper,
        liquidity,
    })
}

// 2.6: slippage-bounded sqrt price for a close trade. buying pushes price up.
pub fn sqrt_price_limit(sqrt_price: Decimal, tokens_to_trade: Decimal, tolerance: Bps) -> Decimal {
    let tolerance = tolerance.as_fraction();
    if tokens_to_trade > Decimal::ZERO {
        sqrt_price * (Decimal::ONE + tolerance)
    } else {
        sqrt_price * (Decimal::ONE - tolerance)
    }
}

// lower/upper price band widened outward by `threshold`
pub fn widened_band(
    tick_lower: i32,
    tick_upper: i32,
    threshold: Bps,
) -> Result<(Decimal, Decimal), MathError> {
    let lower = price_from_sqrt(sqrt_price_at_tick(tick_lower)?)?;
    let upper = price_from_sqrt(sqrt_price_at_tick(tick_upper)?)?;
    let threshold = threshold.as_fraction();
    Ok((
        lower * (Decimal::ONE - threshold),
        upper * (Decimal::ONE + threshold),
    ))
}
