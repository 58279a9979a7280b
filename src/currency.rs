use crate::config::CurrencyConfig;
use crate::error::{Result, SourcingError};
use crate::model::Price;

/// One-way conversion from the marketplace currency to the reporting currency
#[derive(Debug, Clone, PartialEq)]
pub struct CurrencyConverter {
    source_code: String,
    target_code: String,
    rate: f64,
}

impl CurrencyConverter {
    pub fn new(source_code: &str, target_code: &str, rate: f64) -> Result<Self> {
        if !rate.is_finite() || rate <= 0.0 {
            return Err(SourcingError::Config(format!("Invalid conversion rate: {}", rate)));
        }
        Ok(Self {
            source_code: source_code.to_string(),
            target_code: target_code.to_string(),
            rate,
        })
    }

    pub fn from_config(config: &CurrencyConfig) -> Result<Self> {
        Self::new(&config.source_code, &config.target_code, config.rate)
    }

    pub fn source_code(&self) -> &str {
        &self.source_code
    }

    pub fn target_code(&self) -> &str {
        &self.target_code
    }

    /// Rounded to whole units of the target currency
    pub fn convert(&self, amount: f64) -> f64 {
        (amount * self.rate).round()
    }

    pub fn convert_price(&self, price: &Price) -> Price {
        Price {
            min: self.convert(price.min),
            max: self.convert(price.max),
            currency_code: self.target_code.clone(),
        }
    }
}

impl Default for CurrencyConverter {
    fn default() -> Self {
        Self {
            source_code: "CNY".to_string(),
            target_code: "XOF".to_string(),
            rate: 90.0,
        }
    }
}
