//! USD → wei conversion for the daily allowance.

use stylus_sdk::alloy_primitives::{I256, U256};

/// Decimals of the native value (wei per ETH).
pub const NATIVE_DECIMALS: u8 = 18;

/// Implied decimal places carried by the configured daily limit.
pub const LIMIT_DECIMALS: u8 = 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PriceError {
    /// Feed answered zero or a negative price.
    NonPositivePrice,
    /// Intermediate product does not fit in 256 bits.
    Overflow,
    /// Price is so high that the limit rounds down to nothing.
    ZeroAmount,
}

/// Converts `limit_usd` into wei using a feed `answer` scaled by
/// `feed_decimals`.
///
/// All products are taken before the single division, so the only
/// truncation is the final one.
pub fn limit_in_wei(limit_usd: U256, answer: I256, feed_decimals: u8) -> Result<U256, PriceError> {
    if !answer.is_positive() {
        return Err(PriceError::NonPositivePrice);
    }
    let price = answer.into_raw();

    let exponent = u64::from(NATIVE_DECIMALS) + u64::from(feed_decimals) - u64::from(LIMIT_DECIMALS);
    let scale = U256::from(10)
        .checked_pow(U256::from(exponent))
        .ok_or(PriceError::Overflow)?;
    let numerator = limit_usd.checked_mul(scale).ok_or(PriceError::Overflow)?;

    let amount = numerator / price;
    if amount == U256::ZERO {
        return Err(PriceError::ZeroAmount);
    }
    Ok(amount)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn price(v: i128) -> I256 {
        I256::try_from(v).unwrap()
    }

    #[test]
    fn canonical_regression_value() {
        let amount = limit_in_wei(U256::from(200), price(315_539_418_212), 8).unwrap();
        assert_eq!(amount, U256::from(6_338_352_308_985_590u64));
    }

    #[test]
    fn independent_of_feed_precision() {
        let eight = limit_in_wei(U256::from(200), price(315_539_418_212), 8).unwrap();
        let eighteen =
            limit_in_wei(U256::from(200), price(315_539_418_212 * 10_000_000_000), 18).unwrap();
        assert_eq!(eight, eighteen);
    }

    #[test]
    fn scales_linearly_with_limit() {
        let one = limit_in_wei(U256::from(100), price(200_000_000_000), 8).unwrap();
        let two = limit_in_wei(U256::from(200), price(200_000_000_000), 8).unwrap();
        assert_eq!(two, one * U256::from(2));
        // 10.0 USD at 2000 USD/ETH = 0.005 ETH
        assert_eq!(one, U256::from(5_000_000_000_000_000u64));
    }

    #[test]
    fn rejects_non_positive_prices() {
        assert_eq!(
            limit_in_wei(U256::from(200), I256::ZERO, 8),
            Err(PriceError::NonPositivePrice)
        );
        assert_eq!(
            limit_in_wei(U256::from(200), I256::MINUS_ONE, 8),
            Err(PriceError::NonPositivePrice)
        );
    }

    #[test]
    fn rejects_overflow() {
        assert_eq!(
            limit_in_wei(U256::MAX, price(1), 8),
            Err(PriceError::Overflow)
        );
    }

    #[test]
    fn rejects_amount_that_rounds_to_zero() {
        assert_eq!(
            limit_in_wei(U256::from(1), I256::MAX, 0),
            Err(PriceError::ZeroAmount)
        );
    }
}
