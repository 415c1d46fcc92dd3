//! Server-to-server notification handler.

use axum::extract::rejection::FormRejection;
use axum::extract::State;
use axum::{Form, Json};
use chrono::NaiveDateTime;
use redsys_core::{Error as GatewayError, GatewayCallback, PaymentStatus};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, warn};
use utoipa::ToSchema;

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

/// Form body the gateway posts to the merchant URL.
#[derive(Debug, Deserialize, ToSchema)]
pub struct NotificationForm {
    #[serde(rename = "Ds_SignatureVersion")]
    pub signature_version: String,
    #[serde(rename = "Ds_MerchantParameters")]
    pub merchant_parameters: String,
    #[serde(rename = "Ds_Signature")]
    pub signature: String,
}

/// Acknowledgement of a verified notification.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct NotificationAck {
    #[schema(value_type = String, example = "authorized")]
    pub status: PaymentStatus,
    pub order: String,
    pub response_code: u32,
    /// Gateway timestamp from `Ds_Date` and `Ds_Hour`, on authorizations.
    #[serde(skip_serializing_if = "Option::is_none")]
    #[schema(value_type = Option<String>, example = "2026-10-18T12:30:00")]
    pub transaction_time: Option<NaiveDateTime>,
}

/// Receive a payment notification.
///
/// Authorized and declined callbacks are both acknowledged with 200; only
/// callbacks that fail verification are rejected.
#[utoipa::path(
    post,
    path = "/api/v1/payments/notify",
    tag = "payments",
    request_body(content = NotificationForm, content_type = "application/x-www-form-urlencoded"),
    responses(
        (status = 200, description = "Notification verified", body = NotificationAck),
        (status = 400, description = "Notification failed verification"),
        (status = 500, description = "Merchant configuration problem")
    )
)]
pub async fn payment_notification(
    State(state): State<Arc<AppState>>,
    payload: Result<Form<NotificationForm>, FormRejection>,
) -> ApiResult<Json<NotificationAck>> {
    let Form(form) = payload.map_err(|rejection| {
        warn!(error = %rejection, "Notification body could not be parsed");
        ApiError::InvalidCallback(rejection.body_text())
    })?;

    let callback = GatewayCallback {
        signature_version: form.signature_version,
        merchant_parameters: form.merchant_parameters,
        signature: form.signature,
    };

    let result = state.signer.verify_callback(&callback);
    let status = PaymentStatus::of(&result).map_err(|e| ApiError::Internal(e.to_string()))?;

    match result {
        Ok(payment) => {
            let transaction_time = payment.parameters.transaction_time();
            info!(
                order = %payment.order,
                response_code = payment.response_code,
                amount_minor = ?payment.amount_minor(),
                transaction_time = ?transaction_time,
                "Payment authorized"
            );
            Ok(Json(NotificationAck {
                status,
                order: payment.order,
                response_code: payment.response_code,
                transaction_time,
            }))
        }
        Err(GatewayError::DeclinedResponse {
            order,
            response_code,
        }) => {
            info!(order = %order, response_code, "Payment declined");
            Ok(Json(NotificationAck {
                status,
                order,
                response_code,
                transaction_time: None,
            }))
        }
        Err(e) => {
            warn!(error = %e, "Notification rejected");
            Err(ApiError::from(e))
        }
    }
}
