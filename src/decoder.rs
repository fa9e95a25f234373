//! Swap event decoding.
//!
//! [`SwapDecoder`] is a pure transform from a raw pair-contract swap event
//! to a canonical [`Trade`]. Amounts arrive as 256-bit integers and are
//! scaled to decimals without ever passing through binary floating point:
//! a `U256` divmod by `10^decimals` produces the whole part, and the
//! remainder is rescaled to six fractional digits.

use alloy_primitives::U256;
use rust_decimal::Decimal;

use crate::models::{Trade, TradeAction, TradeSource, UNKNOWN_HASH, unix_timestamp};

/// Display ticker for the tracked token on chain-sourced trades.
const TOKEN_TICKER: &str = "TEX";

/// Display image for the tracked token on chain-sourced trades.
const TOKEN_IMAGE: &str = "https://swapfeed.app/assets/tex.png";

/// Fractional digits preserved when scaling raw amounts.
const FRACTIONAL_DIGITS: u32 = 6;

/// Why a raw event produced no trade.
///
/// Rejections are control flow, not failures: the subscription logs them and
/// keeps reading. They never tear down a connection.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DecodeRejection {
    /// The raw record did not have the expected field layout.
    #[error("malformed event: {0}")]
    Malformed(String),

    /// Neither token leg moved; the swap concerns an unrelated pair.
    #[error("no tracked-token movement")]
    NoTokenMovement,

    /// An amount scaled to exactly zero, or arrived as zero.
    #[error("zero amount after scaling")]
    ZeroAmount,

    /// An amount is too large to represent as a decimal.
    #[error("amount exceeds decimal range")]
    AmountOverflow,
}

/// A swap event in the pair contract's positional layout, with its chain
/// coordinates. Constructed by the chain transport and the backfill query.
#[derive(Debug, Clone)]
pub struct RawSwapEvent {
    /// Address that initiated the swap.
    pub sender: Option<String>,
    /// Address that received the swap output.
    pub to: Option<String>,
    /// Native-currency leg in.
    pub amount0_in: U256,
    /// Token leg in.
    pub amount1_in: U256,
    /// Native-currency leg out.
    pub amount0_out: U256,
    /// Token leg out.
    pub amount1_out: U256,
    pub tx_hash: Option<String>,
    pub block_number: u64,
    pub log_index: u64,
}

/// Stateless decoder for one pair contract's swap events.
#[derive(Debug, Clone, Copy)]
pub struct SwapDecoder {
    source: TradeSource,
    token_decimals: u32,
    native_decimals: u32,
}

impl SwapDecoder {
    /// Creates a decoder tagging its output with `source`.
    #[must_use]
    pub fn new(source: TradeSource, token_decimals: u32, native_decimals: u32) -> Self {
        Self {
            source,
            token_decimals,
            native_decimals,
        }
    }

    /// The source tag this decoder stamps on its trades.
    #[must_use]
    pub fn source(&self) -> TradeSource {
        self.source
    }

    /// Decodes a raw swap event into a [`Trade`].
    ///
    /// Direction follows the token legs: token out means the counterparty
    /// bought the token (token amount = `amount1_out`, settled with
    /// `amount0_in`); token in means a sell (token amount = `amount1_in`,
    /// settled with `amount0_out`). A swap moving no token at all is
    /// rejected, as is any amount that scales to exactly zero.
    ///
    /// # Errors
    ///
    /// Returns a [`DecodeRejection`]; callers log and skip, never propagate.
    pub fn decode(&self, raw: &RawSwapEvent) -> Result<Trade, DecodeRejection> {
        let (action, raw_token, raw_base) = if !raw.amount1_out.is_zero() {
            (TradeAction::Buy, raw.amount1_out, raw.amount0_in)
        } else if !raw.amount1_in.is_zero() {
            (TradeAction::Sell, raw.amount1_in, raw.amount0_out)
        } else {
            return Err(DecodeRejection::NoTokenMovement);
        };

        let token_amount = scale_amount(raw_token, self.token_decimals)?;
        let base_amount = scale_amount(raw_base, self.native_decimals)?;
        if token_amount.is_zero() || base_amount.is_zero() {
            return Err(DecodeRejection::ZeroAmount);
        }

        let (buyer, seller) = match action {
            TradeAction::Buy => (raw.to.clone(), None),
            TradeAction::Sell => (None, raw.sender.clone()),
        };

        Ok(Trade {
            hash: raw
                .tx_hash
                .clone()
                .unwrap_or_else(|| UNKNOWN_HASH.to_string()),
            timestamp: unix_timestamp(),
            buyer,
            seller,
            token_amount,
            base_amount,
            action,
            source: self.source,
            ticker: Some(TOKEN_TICKER.to_string()),
            image: Some(TOKEN_IMAGE.to_string()),
        })
    }
}

/// Scales a raw integer amount by `10^decimals`, keeping six fractional
/// digits. Integer arithmetic only; the fractional part is truncated, never
/// rounded up.
///
/// # Errors
///
/// Returns [`DecodeRejection::AmountOverflow`] when the whole part does not
/// fit a `Decimal`.
pub fn scale_amount(value: U256, decimals: u32) -> Result<Decimal, DecodeRejection> {
    let base = U256::from(10u8).pow(U256::from(decimals));
    let (whole, rem) = value.div_rem(base);

    let whole = u128::try_from(whole)
        .ok()
        .and_then(|w| i128::try_from(w).ok())
        .ok_or(DecodeRejection::AmountOverflow)?;
    let whole = Decimal::try_from_i128_with_scale(whole, 0)
        .map_err(|_| DecodeRejection::AmountOverflow)?;

    // rem < 10^decimals, so rescaling to six digits cannot overflow U256.
    let frac_units = rem * U256::from(10u64.pow(FRACTIONAL_DIGITS)) / base;
    let frac = Decimal::new(
        u64::try_from(frac_units).expect("fraction bounded by 10^6") as i64,
        FRACTIONAL_DIGITS,
    );

    Ok((whole + frac).normalize())
}

#[cfg(test)]
mod tests {
    use rust_decimal_macros::dec;

    use super::*;

    #[test]
    fn scales_token_precision_exactly() {
        // 120.5 with six decimals
        assert_eq!(
            scale_amount(U256::from(120_500_000u64), 6).unwrap(),
            dec!(120.5)
        );
    }

    #[test]
    fn scales_native_precision_to_six_digits() {
        // 0.003 native currency at 18 decimals
        let raw = U256::from(3_000_000_000_000_000u64);
        assert_eq!(scale_amount(raw, 18).unwrap(), dec!(0.003));
    }

    #[test]
    fn truncates_below_six_fractional_digits() {
        // 1 wei at 18 decimals is below the retained precision
        assert_eq!(scale_amount(U256::from(1u8), 18).unwrap(), Decimal::ZERO);
    }

    #[test]
    fn handles_amounts_beyond_u64() {
        // 10^21 base units at 18 decimals = 1000 whole
        let raw = U256::from(10u8).pow(U256::from(21u8));
        assert_eq!(scale_amount(raw, 18).unwrap(), dec!(1000));
    }

    #[test]
    fn rejects_amounts_beyond_decimal_range() {
        let raw = U256::MAX;
        assert_eq!(
            scale_amount(raw, 18).unwrap_err(),
            DecodeRejection::AmountOverflow
        );
    }
}
