//! API configuration

use rust_decimal::Decimal;
use serde::Deserialize;

use core_kernel::Currency;
use domain_pos::{CheckoutSettings, DiscountLimits};

/// API configuration
///
/// Every field has a default, so a partial `API_*` environment still loads.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    /// Server host
    pub host: String,
    /// Server port
    pub port: u16,
    /// JWT secret for authentication
    pub jwt_secret: String,
    /// JWT expiration in seconds
    pub jwt_expiration_secs: u64,
    /// Database URL
    pub database_url: String,
    /// Log level
    pub log_level: String,
    /// Currency every sale is priced in
    pub currency: Currency,
    /// Reject checkouts from cashiers without an open POS session
    pub enforce_pos_session: bool,
    /// Floor for overridden prices, as a percent margin over cost
    pub min_margin_percent: Option<Decimal>,
    /// Global per-line discount cap in percent
    pub max_discount_percent: Decimal,
    /// Global per-line discount cap as an amount
    pub max_discount_amount: Option<Decimal>,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            jwt_secret: "change-me-in-production".to_string(),
            jwt_expiration_secs: 3600,
            database_url: "postgres://localhost/retail_core".to_string(),
            log_level: "info".to_string(),
            currency: Currency::USD,
            enforce_pos_session: true,
            min_margin_percent: None,
            max_discount_percent: Decimal::ONE_HUNDRED,
            max_discount_amount: None,
        }
    }
}

impl ApiConfig {
    /// Loads configuration from environment
    pub fn from_env() -> Result<Self, config::ConfigError> {
        config::Config::builder()
            .add_source(config::Environment::with_prefix("API"))
            .build()?
            .try_deserialize()
    }

    /// Returns the server address
    pub fn server_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Checkout rules shared by every branch served by this process
    pub fn checkout_settings(&self) -> CheckoutSettings {
        CheckoutSettings {
            enforce_pos_session: self.enforce_pos_session,
            min_margin_percent: self.min_margin_percent,
            discount_limits: DiscountLimits {
                max_percent: self.max_discount_percent,
                max_amount: self.max_discount_amount,
            },
            ..CheckoutSettings::new(self.currency)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_default_server_addr() {
        let config = ApiConfig::default();
        assert_eq!(config.server_addr(), "0.0.0.0:8080");
    }

    #[test]
    fn test_checkout_settings_carry_limits() {
        let config = ApiConfig {
            currency: Currency::SAR,
            enforce_pos_session: false,
            max_discount_percent: dec!(20),
            ..ApiConfig::default()
        };
        let settings = config.checkout_settings();
        assert_eq!(settings.currency, Currency::SAR);
        assert!(!settings.enforce_pos_session);
        assert_eq!(settings.discount_limits.max_percent, dec!(20));
        assert_eq!(settings.discount_limits.max_amount, None);
    }
}
