//! Gateway configuration.
//!
//! Values come from an optional `tpv.toml` next to the binary, overridden by
//! `TPV_*` environment variables (`TPV_MERCHANT_CODE`, `TPV_TERMINAL`,
//! `TPV_MERCHANT_KEY`, `TPV_ENVIRONMENT`, ...). A `.env` file is loaded first
//! when present.

use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::{Error, Result};
use crate::signing::{MerchantKey, PaymentSigner};

const TEST_ENDPOINT: &str = "https://sis-t.redsys.es:25443/sis/realizarPago";
const REAL_ENDPOINT: &str = "https://sis.redsys.es/sis/realizarPago";

/// Gateway environment the merchant is configured for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    #[default]
    Test,
    Real,
}

impl Environment {
    /// Payment endpoint the signed form is posted to.
    pub fn endpoint(self) -> &'static str {
        match self {
            Environment::Test => TEST_ENDPOINT,
            Environment::Real => REAL_ENDPOINT,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Environment::Test => "test",
            Environment::Real => "real",
        }
    }
}

/// Settlement currency, sent as its ISO 4217 numeric code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Currency {
    #[default]
    Eur,
    Usd,
}

impl Currency {
    pub fn numeric_code(self) -> &'static str {
        match self {
            Currency::Eur => "978",
            Currency::Usd => "840",
        }
    }
}

impl TryFrom<String> for Currency {
    type Error = String;

    fn try_from(value: String) -> std::result::Result<Self, Self::Error> {
        match value.trim().to_ascii_uppercase().as_str() {
            "978" | "EUR" => Ok(Currency::Eur),
            "840" | "USD" => Ok(Currency::Usd),
            other => Err(format!("unsupported currency `{}`", other)),
        }
    }
}

impl From<Currency> for String {
    fn from(currency: Currency) -> Self {
        currency.numeric_code().to_string()
    }
}

fn default_merchant_name() -> String {
    "TPV Redsys".to_string()
}

fn default_site_url() -> String {
    "http://localhost:3000/".to_string()
}

fn default_ok_path() -> String {
    "/tpv-pago-exitoso/".to_string()
}

fn default_ko_path() -> String {
    "/tpv-pago-error/".to_string()
}

/// Merchant settings needed to sign requests and verify notifications.
#[derive(Debug, Clone, Deserialize)]
pub struct GatewayConfig {
    /// Merchant code (FUC) assigned by the bank.
    #[serde(default)]
    pub merchant_code: String,
    #[serde(default)]
    pub terminal: String,
    #[serde(default)]
    pub currency: Currency,
    /// Secret signing key, standard base64.
    #[serde(default)]
    pub merchant_key: MerchantKey,
    #[serde(default)]
    pub environment: Environment,
    /// Name shown to the customer on the payment page.
    #[serde(default = "default_merchant_name")]
    pub merchant_name: String,
    /// Public base URL of the merchant site.
    #[serde(default = "default_site_url")]
    pub site_url: String,
    #[serde(default = "default_ok_path")]
    pub ok_path: String,
    #[serde(default = "default_ko_path")]
    pub ko_path: String,
    /// Server-to-server notification URL. Falls back to the success URL.
    #[serde(default)]
    pub merchant_url: Option<String>,
}

impl GatewayConfig {
    /// Load from `tpv.toml` and `TPV_*` environment variables, then validate.
    pub fn load() -> Result<Self> {
        dotenvy::dotenv().ok();

        let settings = ::config::Config::builder()
            .add_source(::config::File::with_name("tpv").required(false))
            .add_source(::config::Environment::with_prefix("TPV"))
            .build()?;

        let gateway: Self = settings.try_deserialize()?;
        gateway.validate()?;

        tracing::info!(
            merchant_code = %gateway.merchant_code,
            terminal = %gateway.terminal,
            environment = gateway.environment.as_str(),
            "Gateway configuration loaded"
        );

        Ok(gateway)
    }

    /// Fail fast on settings that would otherwise produce unverifiable
    /// requests.
    pub fn validate(&self) -> Result<()> {
        if self.merchant_code.trim().is_empty() {
            return Err(Error::ConfigMissing {
                field: "merchant_code",
            });
        }
        if self.terminal.trim().is_empty() {
            return Err(Error::ConfigMissing { field: "terminal" });
        }
        if self.merchant_key.is_empty() {
            return Err(Error::ConfigMissing {
                field: "merchant_key",
            });
        }

        self.site_base()?;
        if let Some(url) = &self.merchant_url {
            Url::parse(url).map_err(|e| Error::Config {
                message: format!("invalid merchant_url: {}", e),
            })?;
        }

        Ok(())
    }

    pub fn endpoint(&self) -> &'static str {
        self.environment.endpoint()
    }

    pub fn signer(&self) -> PaymentSigner {
        PaymentSigner::new(self.merchant_key.clone())
    }

    /// Where the customer lands after an authorized payment.
    pub fn url_ok(&self) -> Result<String> {
        self.site_page(&self.ok_path)
    }

    /// Where the customer lands after a failed payment.
    pub fn url_ko(&self) -> Result<String> {
        self.site_page(&self.ko_path)
    }

    pub fn notification_url(&self) -> Result<String> {
        match &self.merchant_url {
            Some(url) => Ok(url.clone()),
            None => self.url_ok(),
        }
    }

    fn site_base(&self) -> Result<Url> {
        Url::parse(&self.site_url).map_err(|e| Error::Config {
            message: format!("invalid site_url: {}", e),
        })
    }

    fn site_page(&self, path: &str) -> Result<String> {
        let page = self.site_base()?.join(path).map_err(|e| Error::Config {
            message: format!("invalid page path `{}`: {}", path, e),
        })?;
        Ok(page.to_string())
    }

    /// Configuration for testing, pointing at the public sandbox merchant.
    pub fn sandbox() -> Self {
        Self {
            merchant_code: "999008881".to_string(),
            terminal: "1".to_string(),
            currency: Currency::Eur,
            merchant_key: MerchantKey::new("sq7HjrUOBfKmC576ILgskD5srU870gJ7"),
            environment: Environment::Test,
            merchant_name: "Example Shop".to_string(),
            site_url: "https://shop.example/".to_string(),
            ok_path: default_ok_path(),
            ko_path: default_ko_path(),
            merchant_url: None,
        }
    }
}
