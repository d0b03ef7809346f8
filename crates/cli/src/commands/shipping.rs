//! Shipping quote command.
//!
//! Resolves a typed address against GHN master data and prints the fee and
//! expected delivery date, the same quote the checkout page shows.
//!
//! # Environment Variables
//!
//! - `GHN_TOKEN`, `GHN_SHOP_ID` - carrier credentials
//! - `GHN_API_URL`, `GHN_SERVICE_ID` - optional overrides

use evmarket_storefront::config::{ConfigError, ShippingConfig};
use evmarket_storefront::shipping::{DeliveryArea, ShippingClient, ShippingError};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum QuoteError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Shipping error: {0}")]
    Shipping(#[from] ShippingError),
}

/// Quote shipping to `ward, district, province`.
///
/// # Errors
///
/// Returns `QuoteError` if the carrier is not configured, does not know the
/// address, or the request fails.
pub async fn quote(province: String, district: String, ward: String) -> Result<(), QuoteError> {
    let config = ShippingConfig::from_env()?;
    let client = ShippingClient::new(&config)?;

    let area = DeliveryArea {
        province,
        district,
        ward,
    };
    tracing::info!(
        province = %area.province,
        district = %area.district,
        ward = %area.ward,
        "Requesting shipping quote..."
    );

    let quote = client.estimate(&area).await?;

    match quote.expected_delivery {
        Some(date) => tracing::info!(
            fee = %quote.fee,
            expected_delivery = %date.format("%d/%m/%Y"),
            "Shipping quote"
        ),
        None => tracing::info!(fee = %quote.fee, "Shipping quote (no delivery date)"),
    }
    Ok(())
}
