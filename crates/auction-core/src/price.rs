//! Spot price lookup for the fiat conversion shown next to the current bid.

use auction_types::{format_amount, U256};
use serde::Deserialize;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PriceError {
	#[error("Price request failed: {0}")]
	Request(#[from] reqwest::Error),
	#[error("Invalid price payload: {0}")]
	Payload(String),
}

#[derive(Debug, Deserialize)]
struct SpotResponse {
	data: SpotData,
}

#[derive(Debug, Deserialize)]
struct SpotData {
	amount: String,
}

/// Fetches the USD spot price of the native currency.
///
/// The endpoint is expected to answer with `{"data":{"amount":"<decimal>"}}`.
pub struct PriceFeed {
	client: reqwest::Client,
	url: String,
}

impl PriceFeed {
	pub fn new(url: impl Into<String>) -> Result<Self, PriceError> {
		let client = reqwest::Client::builder()
			.timeout(Duration::from_secs(10))
			.build()?;
		Ok(Self {
			client,
			url: url.into(),
		})
	}

	pub async fn fetch_usd(&self) -> Result<f64, PriceError> {
		let response = self
			.client
			.get(&self.url)
			.send()
			.await?
			.error_for_status()?
			.json::<SpotResponse>()
			.await?;
		spot_price(response)
	}
}

fn spot_price(response: SpotResponse) -> Result<f64, PriceError> {
	let price: f64 = response
		.data
		.amount
		.parse()
		.map_err(|_| PriceError::Payload(format!("amount '{}'", response.data.amount)))?;

	if price.is_finite() && price >= 0.0 {
		Ok(price)
	} else {
		Err(PriceError::Payload(format!("amount '{}'", response.data.amount)))
	}
}

/// Formats `amount` wei at `usd_price` per ether, e.g. `≈ $4.12`.
pub fn usd_display(amount: U256, usd_price: f64) -> String {
	let ether: f64 = format_amount(amount).parse().unwrap_or(0.0);
	format!("≈ ${:.2}", ether * usd_price)
}

#[cfg(test)]
mod tests {
	use super::*;
	use auction_types::parse_amount;

	fn response(body: &str) -> Result<SpotResponse, serde_json::Error> {
		serde_json::from_str(body)
	}

	#[test]
	fn test_spot_price() {
		let body = r#"{"data":{"base":"ETH","currency":"USD","amount":"3124.55"}}"#;
		assert_eq!(spot_price(response(body).unwrap()).unwrap(), 3124.55);

		assert!(spot_price(response(r#"{"data":{"amount":"abc"}}"#).unwrap()).is_err());
		assert!(spot_price(response(r#"{"data":{"amount":"-1"}}"#).unwrap()).is_err());
		assert!(response(r#"{"error":"rate limited"}"#).is_err());
	}

	#[test]
	fn test_usd_display() {
		assert_eq!(usd_display(parse_amount("0.5").unwrap(), 3000.0), "≈ $1500.00");
		assert_eq!(usd_display(parse_amount("0.0004").unwrap(), 3124.55), "≈ $1.25");
	}
}
