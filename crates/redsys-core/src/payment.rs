//! Assembly of a signed payment request from a customer-entered amount.

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::Serialize;
use tracing::info;

use crate::config::GatewayConfig;
use crate::error::{Error, Result};
use crate::order_id;
use crate::params::{MerchantParameters, RequestField};
use crate::signing::SignedRequest;

/// Largest amount accepted from the payment form, in minor units (99 999.99).
pub const MAX_AMOUNT_MINOR: u64 = 9_999_999;

/// Longest product description the gateway accepts.
pub const MAX_CONCEPT_CHARS: usize = 125;

pub const DEFAULT_CONCEPT: &str = "Pago TPV";

/// `DS_MERCHANT_TRANSACTIONTYPE` for a plain authorization.
pub const AUTHORIZATION: u64 = 0;

/// A validated payment the customer asked for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaymentRequest {
    amount_minor: u64,
    concept: String,
}

impl PaymentRequest {
    /// Build from an amount in major units (`25.50`) and an optional concept.
    pub fn new(amount: Decimal, concept: Option<&str>) -> Result<Self> {
        if amount.normalize().scale() > 2 {
            return Err(Error::InvalidPayment {
                message: format!("amount {} has more than two decimals", amount),
            });
        }

        let amount_minor = amount
            .checked_mul(Decimal::ONE_HUNDRED)
            .and_then(|minor| minor.to_u64())
            .ok_or_else(|| Error::InvalidPayment {
                message: format!("amount {} is out of range", amount),
            })?;

        Self::from_minor_units(amount_minor, concept)
    }

    pub fn from_minor_units(amount_minor: u64, concept: Option<&str>) -> Result<Self> {
        if amount_minor == 0 {
            return Err(Error::InvalidPayment {
                message: "amount must be greater than zero".to_string(),
            });
        }
        if amount_minor > MAX_AMOUNT_MINOR {
            return Err(Error::InvalidPayment {
                message: "amount exceeds the 99999.99 maximum".to_string(),
            });
        }

        let concept = concept.map(str::trim).unwrap_or_default();
        let concept = if concept.is_empty() {
            DEFAULT_CONCEPT
        } else {
            concept
        };
        if concept.chars().count() > MAX_CONCEPT_CHARS {
            return Err(Error::InvalidPayment {
                message: format!("concept exceeds {} characters", MAX_CONCEPT_CHARS),
            });
        }

        Ok(Self {
            amount_minor,
            concept: concept.to_string(),
        })
    }

    pub fn amount_minor(&self) -> u64 {
        self.amount_minor
    }

    pub fn concept(&self) -> &str {
        &self.concept
    }

    /// Fill every request field for the given order identifier.
    pub fn build_parameters(&self, config: &GatewayConfig, order: &str) -> Result<MerchantParameters> {
        let url_ok = config.url_ok()?;

        let mut params = MerchantParameters::new();
        params.set(RequestField::Amount, self.amount_minor);
        params.set(RequestField::Order, order);
        params.set(RequestField::MerchantCode, config.merchant_code.as_str());
        params.set(RequestField::Currency, config.currency.numeric_code());
        params.set(RequestField::TransactionType, AUTHORIZATION);
        params.set(RequestField::Terminal, config.terminal.as_str());
        params.set(RequestField::MerchantUrl, config.notification_url()?);
        params.set(RequestField::UrlOk, url_ok);
        params.set(RequestField::UrlKo, config.url_ko()?);
        params.set(RequestField::MerchantName, config.merchant_name.as_str());
        params.set(RequestField::ProductDescription, self.concept.as_str());

        Ok(params)
    }

    /// Generate a fresh order identifier, build the parameters and sign them.
    pub fn prepare(&self, config: &GatewayConfig) -> Result<PaymentForm> {
        config.validate()?;

        let order = order_id::generate(self.amount_minor);
        let params = self.build_parameters(config, &order)?;
        let fields = config.signer().sign(&params)?;

        info!(
            order = %order,
            amount_minor = self.amount_minor,
            environment = config.environment.as_str(),
            "Payment request prepared"
        );

        Ok(PaymentForm {
            endpoint: config.endpoint().to_string(),
            order,
            amount_minor: self.amount_minor,
            fields,
        })
    }
}

/// Everything needed to post the customer to the gateway.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PaymentForm {
    pub endpoint: String,
    pub order: String,
    pub amount_minor: u64,
    #[serde(flatten)]
    pub fields: SignedRequest,
}
