//! Payment creation and customer return handlers.

use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Query, State};
use axum::Json;
use chrono::{NaiveDateTime, Utc};
use redsys_core::{
    Error as GatewayError, GatewayCallback, PaymentForm, PaymentRequest, PaymentStatus,
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, warn};
use utoipa::ToSchema;

use crate::error::{ApiError, ApiResult, ErrorResponse};
use crate::nonce::TICK_SECS;
use crate::state::AppState;

/// Form nonce to send back in the `x-tpv-nonce` header.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct NonceResponse {
    pub nonce: String,
    /// Minimum remaining validity in seconds.
    pub valid_for_secs: i64,
}

/// Request to start a card payment.
#[derive(Debug, Deserialize, ToSchema)]
pub struct CreatePaymentRequest {
    /// Amount in major units, at most two decimals (e.g. "25.50").
    #[schema(value_type = String, example = "25.50")]
    pub amount: Decimal,
    /// Product description shown on the payment page. Defaults to "Pago TPV".
    #[serde(default)]
    pub concept: Option<String>,
}

/// Signed form the browser posts to the gateway.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct PaymentFormResponse {
    /// Gateway URL to post the form to.
    pub endpoint: String,
    pub order: String,
    pub amount_minor: u64,
    #[serde(rename = "Ds_SignatureVersion")]
    pub signature_version: String,
    #[serde(rename = "Ds_MerchantParameters")]
    pub merchant_parameters: String,
    #[serde(rename = "Ds_Signature")]
    pub signature: String,
}

impl From<PaymentForm> for PaymentFormResponse {
    fn from(form: PaymentForm) -> Self {
        Self {
            endpoint: form.endpoint,
            order: form.order,
            amount_minor: form.amount_minor,
            signature_version: form.fields.signature_version,
            merchant_parameters: form.fields.merchant_parameters,
            signature: form.fields.signature,
        }
    }
}

/// Outcome of a returned transaction.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct PaymentResultResponse {
    #[schema(value_type = String, example = "authorized")]
    pub status: PaymentStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub order: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response_code: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub amount_minor: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub authorisation_code: Option<String>,
    /// Gateway timestamp from `Ds_Date` and `Ds_Hour`.
    #[serde(skip_serializing_if = "Option::is_none")]
    #[schema(value_type = Option<String>, example = "2026-10-18T12:30:00")]
    pub transaction_time: Option<NaiveDateTime>,
    /// Merchant page to show the customer.
    pub redirect: String,
}

/// Issue a form nonce.
#[utoipa::path(
    get,
    path = "/api/v1/payments/nonce",
    tag = "payments",
    responses(
        (status = 200, description = "Fresh nonce", body = NonceResponse)
    )
)]
pub async fn issue_nonce(State(state): State<Arc<AppState>>) -> Json<NonceResponse> {
    let now = Utc::now();
    let elapsed = now.timestamp().rem_euclid(TICK_SECS);

    Json(NonceResponse {
        nonce: state.nonces.issue(now),
        valid_for_secs: 2 * TICK_SECS - elapsed,
    })
}

/// Create a signed payment request.
#[utoipa::path(
    post,
    path = "/api/v1/payments",
    tag = "payments",
    request_body = CreatePaymentRequest,
    params(
        ("x-tpv-nonce" = String, Header, description = "Nonce from /api/v1/payments/nonce")
    ),
    responses(
        (status = 200, description = "Signed payment form", body = PaymentFormResponse),
        (status = 400, description = "Malformed request body"),
        (status = 403, description = "Missing or invalid nonce"),
        (status = 422, description = "Amount or concept out of range"),
        (status = 500, description = "Merchant configuration problem")
    )
)]
pub async fn create_payment(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<CreatePaymentRequest>, JsonRejection>,
) -> ApiResult<Json<PaymentFormResponse>> {
    let Json(request) = payload?;

    let payment = PaymentRequest::new(request.amount, request.concept.as_deref())?;
    let form = payment.prepare(&state.gateway)?;

    Ok(Json(form.into()))
}

/// Customer return from the gateway.
///
/// Shows the result to the customer; the notification endpoint remains the
/// authoritative record.
#[utoipa::path(
    get,
    path = "/api/v1/payments/return",
    tag = "payments",
    params(
        ("Ds_SignatureVersion" = String, Query, description = "Signature scheme"),
        ("Ds_MerchantParameters" = String, Query, description = "URL-safe base64 response parameters"),
        ("Ds_Signature" = String, Query, description = "URL-safe base64 signature")
    ),
    responses(
        (status = 200, description = "Verification result", body = PaymentResultResponse),
        (status = 400, description = "Missing callback parameters", body = ErrorResponse),
        (status = 500, description = "Merchant configuration problem")
    )
)]
pub async fn payment_return(
    State(state): State<Arc<AppState>>,
    query: Result<Query<GatewayCallback>, QueryRejection>,
) -> ApiResult<Json<PaymentResultResponse>> {
    let Query(callback) = query.map_err(|rejection| {
        warn!(error = %rejection, "Return query could not be parsed");
        ApiError::InvalidCallback(rejection.body_text())
    })?;

    let result = state.signer.verify_callback(&callback);
    let status = PaymentStatus::of(&result).map_err(|e| ApiError::Internal(e.to_string()))?;

    let mut response = PaymentResultResponse {
        status,
        order: None,
        response_code: None,
        amount_minor: None,
        authorisation_code: None,
        transaction_time: None,
        redirect: match status {
            PaymentStatus::Authorized => state.gateway.url_ok()?,
            PaymentStatus::Declined | PaymentStatus::Invalid => state.gateway.url_ko()?,
        },
    };

    match result {
        Ok(payment) => {
            info!(order = %payment.order, "Customer returned from authorized payment");
            response.amount_minor = payment.amount_minor();
            response.authorisation_code = payment.parameters.authorisation_code();
            response.transaction_time = payment.parameters.transaction_time();
            response.order = Some(payment.order);
            response.response_code = Some(payment.response_code);
        }
        Err(GatewayError::DeclinedResponse {
            order,
            response_code,
        }) => {
            response.order = Some(order);
            response.response_code = Some(response_code);
        }
        Err(e) => {
            warn!(error = %e, "Customer returned with an invalid callback");
        }
    }

    Ok(Json(response))
}
