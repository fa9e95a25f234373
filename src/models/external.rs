//! External transaction stream payload.
//!
//! The external source pushes one JSON object per trade. Every field is
//! optional on the wire; [`ExternalTx::into_trade`] applies the documented
//! defaults and the zero-amount guard.

use rust_decimal::Decimal;
use serde::Deserialize;

use super::{Trade, TradeAction, TradeSource, UNKNOWN_HASH};
use crate::decoder::DecodeRejection;

/// Fallback display ticker when the payload omits token details.
pub const DEFAULT_TICKER: &str = "TOKEN";

/// Fallback display image when the payload omits token details.
pub const DEFAULT_IMAGE: &str = "https://swapfeed.app/assets/token-generic.png";

/// A push notification from the external transaction stream.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExternalTx {
    pub hash: Option<String>,
    pub wallet: Option<String>,
    pub amount_in_token: Option<Decimal>,
    pub amount_in_chain_currency: Option<Decimal>,
    #[serde(rename = "type")]
    pub tpe: Option<String>,
    pub token_details: Option<TokenDetails>,
}

/// Display metadata supplied alongside an external transaction.
#[derive(Debug, Deserialize)]
pub struct TokenDetails {
    pub ticker: Option<String>,
    pub image: Option<String>,
}

impl ExternalTx {
    /// Maps the payload into a canonical [`Trade`].
    ///
    /// Defaults: missing hash and wallet become `"unknown"`, missing type
    /// becomes `"buy"`, missing amounts become zero and are then rejected by
    /// the zero-amount guard, missing token details fall back to the fixed
    /// ticker/image strings.
    ///
    /// # Errors
    ///
    /// Returns [`DecodeRejection::ZeroAmount`] when either amount is absent
    /// or zero.
    pub fn into_trade(self, timestamp: u64) -> Result<Trade, DecodeRejection> {
        let token_amount = self.amount_in_token.unwrap_or_default();
        let base_amount = self.amount_in_chain_currency.unwrap_or_default();
        if token_amount.is_zero() || base_amount.is_zero() {
            return Err(DecodeRejection::ZeroAmount);
        }

        let action = match self.tpe.as_deref() {
            Some("sell") => TradeAction::Sell,
            _ => TradeAction::Buy,
        };
        let wallet = self.wallet.unwrap_or_else(|| UNKNOWN_HASH.to_string());
        let (buyer, seller) = match action {
            TradeAction::Buy => (Some(wallet), None),
            TradeAction::Sell => (None, Some(wallet)),
        };
        let (ticker, image) = match self.token_details {
            Some(details) => (
                details.ticker.unwrap_or_else(|| DEFAULT_TICKER.to_string()),
                details.image.unwrap_or_else(|| DEFAULT_IMAGE.to_string()),
            ),
            None => (DEFAULT_TICKER.to_string(), DEFAULT_IMAGE.to_string()),
        };

        Ok(Trade {
            hash: self.hash.unwrap_or_else(|| UNKNOWN_HASH.to_string()),
            timestamp,
            buyer,
            seller,
            token_amount,
            base_amount,
            action,
            source: TradeSource::External,
            ticker: Some(ticker),
            image: Some(image),
        })
    }
}
