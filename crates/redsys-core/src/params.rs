//! Merchant parameter sets exchanged with the gateway.
//!
//! Two directions, two vocabularies:
//!
//! - [`MerchantParameters`] holds the `DS_MERCHANT_*` fields of an outbound
//!   payment request. It is serialized to JSON and base64 encoded with the
//!   standard alphabet; those exact bytes are both signed and transmitted.
//! - [`NotificationParameters`] is rebuilt from the URL-safe blob the gateway
//!   sends back. Field names are matched case-insensitively (`Ds_Order` and
//!   `DS_ORDER` are the same field) and duplicates are rejected.

use std::collections::BTreeMap;
use std::fmt;

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use serde::de::{self, MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use tracing::debug;

use crate::encoding;
use crate::error::{DecodeError, Error, Result};

/// A parameter value. Numbers stay numbers and text stays text through
/// serialization, so `2550` and `"2550"` are different values.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParameterValue {
    Integer(u64),
    Text(String),
}

impl ParameterValue {
    /// Numeric view of the value. Text is parsed after trimming, so the
    /// gateway's zero-padded codes (`"0000"`) read as `0`.
    pub fn as_u64(&self) -> Option<u64> {
        match self {
            ParameterValue::Integer(n) => Some(*n),
            ParameterValue::Text(s) => s.trim().parse().ok(),
        }
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, ParameterValue::Text(s) if s.is_empty())
    }
}

impl fmt::Display for ParameterValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParameterValue::Integer(n) => write!(f, "{}", n),
            ParameterValue::Text(s) => f.write_str(s),
        }
    }
}

impl From<u64> for ParameterValue {
    fn from(value: u64) -> Self {
        ParameterValue::Integer(value)
    }
}

impl From<u32> for ParameterValue {
    fn from(value: u32) -> Self {
        ParameterValue::Integer(u64::from(value))
    }
}

impl From<&str> for ParameterValue {
    fn from(value: &str) -> Self {
        ParameterValue::Text(value.to_string())
    }
}

impl From<String> for ParameterValue {
    fn from(value: String) -> Self {
        ParameterValue::Text(value)
    }
}

/// Fields of an outbound payment request.
///
/// Declaration order is serialization order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum RequestField {
    Amount,
    Order,
    MerchantCode,
    Currency,
    TransactionType,
    Terminal,
    MerchantUrl,
    UrlOk,
    UrlKo,
    MerchantName,
    ProductDescription,
}

impl RequestField {
    pub const ALL: [RequestField; 11] = [
        RequestField::Amount,
        RequestField::Order,
        RequestField::MerchantCode,
        RequestField::Currency,
        RequestField::TransactionType,
        RequestField::Terminal,
        RequestField::MerchantUrl,
        RequestField::UrlOk,
        RequestField::UrlKo,
        RequestField::MerchantName,
        RequestField::ProductDescription,
    ];

    /// Wire name of the field.
    pub fn name(self) -> &'static str {
        match self {
            RequestField::Amount => "DS_MERCHANT_AMOUNT",
            RequestField::Order => "DS_MERCHANT_ORDER",
            RequestField::MerchantCode => "DS_MERCHANT_MERCHANTCODE",
            RequestField::Currency => "DS_MERCHANT_CURRENCY",
            RequestField::TransactionType => "DS_MERCHANT_TRANSACTIONTYPE",
            RequestField::Terminal => "DS_MERCHANT_TERMINAL",
            RequestField::MerchantUrl => "DS_MERCHANT_MERCHANTURL",
            RequestField::UrlOk => "DS_MERCHANT_URLOK",
            RequestField::UrlKo => "DS_MERCHANT_URLKO",
            RequestField::MerchantName => "DS_MERCHANT_MERCHANTNAME",
            RequestField::ProductDescription => "DS_MERCHANT_PRODUCTDESCRIPTION",
        }
    }
}

impl Serialize for RequestField {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(self.name())
    }
}

/// Parameters of an outbound payment request.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct MerchantParameters {
    fields: BTreeMap<RequestField, ParameterValue>,
}

impl MerchantParameters {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or overwrite a field, returning the value it replaced.
    pub fn set(
        &mut self,
        field: RequestField,
        value: impl Into<ParameterValue>,
    ) -> Option<ParameterValue> {
        self.fields.insert(field, value.into())
    }

    pub fn get(&self, field: RequestField) -> Option<&ParameterValue> {
        self.fields.get(&field)
    }

    pub fn iter(&self) -> impl Iterator<Item = (RequestField, &ParameterValue)> {
        self.fields.iter().map(|(field, value)| (*field, value))
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// The order identifier the signing key is diversified with.
    pub fn order(&self) -> Result<String> {
        match self.get(RequestField::Order) {
            Some(value) if !value.is_empty() => Ok(value.to_string()),
            _ => Err(Error::MissingParameter(RequestField::Order.name())),
        }
    }

    /// JSON object notation of the parameters.
    pub fn serialize(&self) -> Result<Vec<u8>> {
        Ok(serde_json::to_vec(self)?)
    }

    /// Standard-alphabet base64 of [`serialize`](Self::serialize), the
    /// `Ds_MerchantParameters` value.
    pub fn encode_for_transmission(&self) -> Result<String> {
        Ok(encoding::encode_standard(self.serialize()?))
    }
}

/// Fields the gateway reports in a notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum NotificationField {
    Date,
    Hour,
    Amount,
    Currency,
    Order,
    MerchantCode,
    Terminal,
    Response,
    TransactionType,
    SecurePayment,
    AuthorisationCode,
    MerchantData,
    ConsumerLanguage,
    CardCountry,
    CardBrand,
    CardNumber,
    ProcessedPayMethod,
}

impl NotificationField {
    pub const ALL: [NotificationField; 17] = [
        NotificationField::Date,
        NotificationField::Hour,
        NotificationField::Amount,
        NotificationField::Currency,
        NotificationField::Order,
        NotificationField::MerchantCode,
        NotificationField::Terminal,
        NotificationField::Response,
        NotificationField::TransactionType,
        NotificationField::SecurePayment,
        NotificationField::AuthorisationCode,
        NotificationField::MerchantData,
        NotificationField::ConsumerLanguage,
        NotificationField::CardCountry,
        NotificationField::CardBrand,
        NotificationField::CardNumber,
        NotificationField::ProcessedPayMethod,
    ];

    /// Canonical wire name of the field.
    pub fn name(self) -> &'static str {
        match self {
            NotificationField::Date => "Ds_Date",
            NotificationField::Hour => "Ds_Hour",
            NotificationField::Amount => "Ds_Amount",
            NotificationField::Currency => "Ds_Currency",
            NotificationField::Order => "Ds_Order",
            NotificationField::MerchantCode => "Ds_MerchantCode",
            NotificationField::Terminal => "Ds_Terminal",
            NotificationField::Response => "Ds_Response",
            NotificationField::TransactionType => "Ds_TransactionType",
            NotificationField::SecurePayment => "Ds_SecurePayment",
            NotificationField::AuthorisationCode => "Ds_AuthorisationCode",
            NotificationField::MerchantData => "Ds_MerchantData",
            NotificationField::ConsumerLanguage => "Ds_ConsumerLanguage",
            NotificationField::CardCountry => "Ds_Card_Country",
            NotificationField::CardBrand => "Ds_Card_Brand",
            NotificationField::CardNumber => "Ds_Card_Number",
            NotificationField::ProcessedPayMethod => "Ds_ProcessedPayMethod",
        }
    }

    /// Case-insensitive lookup by wire name.
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|field| field.name().eq_ignore_ascii_case(name))
    }
}

/// Parameters decoded from a gateway notification. Read-only once decoded;
/// [`set`](Self::set) exists for assembling callbacks in sandboxes and tests.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NotificationParameters {
    fields: BTreeMap<NotificationField, ParameterValue>,
    /// Fields outside the known vocabulary, keyed by their name as received.
    unrecognized: BTreeMap<String, ParameterValue>,
}

impl NotificationParameters {
    pub fn new() -> Self {
        Self::default()
    }

    /// Decode a URL-safe base64 blob (padding optional) holding a JSON object.
    pub fn decode_from_notification(blob: &str) -> std::result::Result<Self, DecodeError> {
        let bytes = encoding::decode_url_safe(blob)?;
        let params: Self = serde_json::from_slice(&bytes)?;

        if !params.unrecognized.is_empty() {
            debug!(
                fields = ?params.unrecognized.keys().collect::<Vec<_>>(),
                "Notification carries unrecognized fields"
            );
        }

        Ok(params)
    }

    /// URL-safe base64 of the JSON object, the shape the gateway sends.
    pub fn encode_for_notification(&self) -> Result<String> {
        Ok(encoding::encode_url_safe(serde_json::to_vec(self)?))
    }

    pub fn set(
        &mut self,
        field: NotificationField,
        value: impl Into<ParameterValue>,
    ) -> Option<ParameterValue> {
        self.fields.insert(field, value.into())
    }

    pub fn get(&self, field: NotificationField) -> Option<&ParameterValue> {
        self.fields.get(&field)
    }

    /// A field outside the known vocabulary, by exact name.
    pub fn unrecognized(&self, name: &str) -> Option<&ParameterValue> {
        self.unrecognized.get(name)
    }

    pub fn order(&self) -> std::result::Result<String, DecodeError> {
        match self.get(NotificationField::Order) {
            Some(value) if !value.is_empty() => Ok(value.to_string()),
            _ => Err(DecodeError::MissingField(NotificationField::Order.name())),
        }
    }

    /// `Ds_Response` as an integer. Codes below 100 are authorizations.
    pub fn response_code(&self) -> std::result::Result<u32, DecodeError> {
        let field = NotificationField::Response;
        let value = self
            .get(field)
            .ok_or(DecodeError::MissingField(field.name()))?;

        value
            .as_u64()
            .and_then(|code| u32::try_from(code).ok())
            .ok_or_else(|| DecodeError::InvalidField {
                field: field.name(),
                value: value.to_string(),
            })
    }

    pub fn amount_minor(&self) -> Option<u64> {
        self.get(NotificationField::Amount)
            .and_then(ParameterValue::as_u64)
    }

    pub fn currency(&self) -> Option<String> {
        self.get(NotificationField::Currency).map(ToString::to_string)
    }

    pub fn authorisation_code(&self) -> Option<String> {
        self.get(NotificationField::AuthorisationCode)
            .map(|value| value.to_string().trim().to_string())
            .filter(|code| !code.is_empty())
    }

    /// Transaction timestamp from `Ds_Date` (`dd/mm/yyyy`) and `Ds_Hour`
    /// (`hh:mm`). The gateway percent-escapes the separators.
    pub fn transaction_time(&self) -> Option<NaiveDateTime> {
        let date = self.get(NotificationField::Date)?.to_string();
        let hour = self.get(NotificationField::Hour)?.to_string();

        let date = NaiveDate::parse_from_str(&unescape_separators(&date), "%d/%m/%Y").ok()?;
        let time = NaiveTime::parse_from_str(&unescape_separators(&hour), "%H:%M").ok()?;

        Some(date.and_time(time))
    }
}

fn unescape_separators(raw: &str) -> String {
    raw.replace("%2F", "/")
        .replace("%2f", "/")
        .replace("%3A", ":")
        .replace("%3a", ":")
}

impl Serialize for NotificationParameters {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.fields.len() + self.unrecognized.len()))?;
        for (field, value) in &self.fields {
            map.serialize_entry(field.name(), value)?;
        }
        for (name, value) in &self.unrecognized {
            map.serialize_entry(name, value)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for NotificationParameters {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        deserializer.deserialize_map(NotificationVisitor)
    }
}

struct NotificationVisitor;

impl<'de> Visitor<'de> for NotificationVisitor {
    type Value = NotificationParameters;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("an object of notification parameters")
    }

    fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> std::result::Result<Self::Value, A::Error> {
        let mut params = NotificationParameters::default();

        while let Some((name, value)) = map.next_entry::<String, ParameterValue>()? {
            let duplicate = match NotificationField::from_name(&name) {
                Some(field) => params.fields.insert(field, value).is_some(),
                None => {
                    let seen = params
                        .unrecognized
                        .keys()
                        .any(|known| known.eq_ignore_ascii_case(&name));
                    params.unrecognized.insert(name.clone(), value);
                    seen
                }
            };

            if duplicate {
                return Err(de::Error::custom(format!("duplicate parameter `{}`", name)));
            }
        }

        Ok(params)
    }
}
