//! API route definitions.

use axum::middleware;
use axum::routing::{get, post};
use axum::Router;
use std::sync::Arc;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::handlers::{health, notifications, payments};
use crate::middleware::require_nonce;
use crate::state::AppState;

/// OpenAPI documentation.
#[derive(OpenApi)]
#[openapi(
    info(
        title = "TPV Redsys API",
        version = "1.0.0",
        description = "Signed card payments through the Redsys virtual POS"
    ),
    paths(
        health::health_check,
        payments::issue_nonce,
        payments::create_payment,
        payments::payment_return,
        notifications::payment_notification,
    ),
    components(
        schemas(
            crate::error::ErrorResponse,
            health::HealthResponse,
            payments::NonceResponse,
            payments::CreatePaymentRequest,
            payments::PaymentFormResponse,
            payments::PaymentResultResponse,
            notifications::NotificationForm,
            notifications::NotificationAck,
        )
    ),
    tags(
        (name = "health", description = "Health check endpoints"),
        (name = "payments", description = "Payment requests and gateway callbacks"),
    )
)]
pub struct ApiDoc;

/// Create the main router with all routes.
pub fn create_router(state: Arc<AppState>) -> Router {
    // Payment creation needs a form nonce
    let guarded = Router::new()
        .route("/api/v1/payments", post(payments::create_payment))
        .route_layer(middleware::from_fn_with_state(state.clone(), require_nonce));

    Router::new()
        // Health endpoints
        .route("/health", get(health::health_check))

        // Payment endpoints
        .route("/api/v1/payments/nonce", get(payments::issue_nonce))
        .route("/api/v1/payments/return", get(payments::payment_return))
        .route("/api/v1/payments/notify", post(notifications::payment_notification))
        .merge(guarded)

        // Swagger UI
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))

        // Add state
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{to_bytes, Body};
    use axum::http::{header, Request, StatusCode};
    use chrono::Utc;
    use redsys_core::params::{NotificationField, NotificationParameters};
    use serde_json::Value;
    use tower::ServiceExt;

    use crate::nonce::NONCE_HEADER;
    use crate::state::test_state;

    async fn body_json(response: axum::response::Response) -> Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    /// Callback fields for `response`, signed with the sandbox key, as a
    /// urlencoded string.
    fn signed_callback(state: &AppState, response: &str) -> String {
        let mut params = NotificationParameters::new();
        params.set(NotificationField::Date, "18%2F10%2F2026");
        params.set(NotificationField::Hour, "12%3A30");
        params.set(NotificationField::Amount, "2550");
        params.set(NotificationField::Currency, "978");
        params.set(NotificationField::Order, "a1b-2550");
        params.set(NotificationField::Response, response);
        params.set(NotificationField::AuthorisationCode, "123456");
        let blob = params.encode_for_notification().unwrap();
        let signature = state.signer.notification_signature(&blob).unwrap();

        format!(
            "Ds_SignatureVersion=HMAC_SHA256_V1&Ds_MerchantParameters={}&Ds_Signature={}",
            blob.replace('=', "%3D"),
            signature.replace('=', "%3D")
        )
    }

    fn payment_request(nonce: Option<&str>, body: &str) -> Request<Body> {
        let mut builder = Request::builder()
            .method("POST")
            .uri("/api/v1/payments")
            .header(header::CONTENT_TYPE, "application/json");
        if let Some(nonce) = nonce {
            builder = builder.header(NONCE_HEADER, nonce);
        }
        builder.body(Body::from(body.to_string())).unwrap()
    }

    fn notification_request(body: String) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri("/api/v1/payments/notify")
            .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body(Body::from(body))
            .unwrap()
    }

    #[test]
    fn test_openapi_spec() {
        let doc = ApiDoc::openapi();
        let json = doc.to_json().unwrap();
        assert!(json.contains("TPV Redsys API"));
        assert!(json.contains("/api/v1/payments/notify"));
        assert!(json.contains("payments"));
    }

    #[tokio::test]
    async fn test_health_reports_environment() {
        let app = create_router(test_state());
        let response = app
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let json = body_json(response).await;
        assert_eq!(json["status"], "healthy");
        assert_eq!(json["environment"], "test");
    }

    #[tokio::test]
    async fn test_create_payment_requires_nonce() {
        let app = create_router(test_state());
        let response = app
            .oneshot(payment_request(None, r#"{"amount":"25.50"}"#))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::FORBIDDEN);
        let json = body_json(response).await;
        assert_eq!(json["code"], "FORBIDDEN");
    }

    #[tokio::test]
    async fn test_create_payment_rejects_forged_nonce() {
        let app = create_router(test_state());
        let response = app
            .oneshot(payment_request(Some("not-a-nonce"), r#"{"amount":"25.50"}"#))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn test_create_payment_returns_signed_form() {
        let state = test_state();
        let nonce = state.nonces.issue(Utc::now());
        let app = create_router(state);

        let response = app
            .oneshot(payment_request(
                Some(&nonce),
                r#"{"amount":"25.50","concept":"Cuota mensual"}"#,
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let json = body_json(response).await;
        assert_eq!(json["endpoint"], "https://sis-t.redsys.es:25443/sis/realizarPago");
        assert_eq!(json["amount_minor"], 2550);
        assert_eq!(json["Ds_SignatureVersion"], "HMAC_SHA256_V1");
        assert!(json["order"].as_str().unwrap().ends_with("-2550"));
        assert!(!json["Ds_Signature"].as_str().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_create_payment_rejects_out_of_range_amount() {
        let state = test_state();
        let nonce = state.nonces.issue(Utc::now());
        let app = create_router(state);

        let response = app
            .oneshot(payment_request(Some(&nonce), r#"{"amount":"0"}"#))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
        let json = body_json(response).await;
        assert_eq!(json["code"], "VALIDATION_ERROR");
    }

    #[tokio::test]
    async fn test_create_payment_rejects_malformed_json() {
        let state = test_state();
        let nonce = state.nonces.issue(Utc::now());
        let app = create_router(state);

        let response = app
            .oneshot(payment_request(Some(&nonce), "{amount"))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_issued_nonce_unlocks_payment() {
        let state = test_state();
        let app = create_router(state);

        let response = app
            .clone()
            .oneshot(
                Request::builder()
                    .uri("/api/v1/payments/nonce")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let json = body_json(response).await;
        let nonce = json["nonce"].as_str().unwrap().to_string();
        assert!(json["valid_for_secs"].as_i64().unwrap() > 0);

        let response = app
            .oneshot(payment_request(Some(&nonce), r#"{"amount":"1.00"}"#))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_notification_authorized() {
        let state = test_state();
        let body = signed_callback(&state, "0000");
        let app = create_router(state);

        let response = app.oneshot(notification_request(body)).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let json = body_json(response).await;
        assert_eq!(json["status"], "authorized");
        assert_eq!(json["order"], "a1b-2550");
        assert_eq!(json["response_code"], 0);
        assert_eq!(json["transaction_time"], "2026-10-18T12:30:00");
    }

    #[tokio::test]
    async fn test_notification_declined_is_acknowledged() {
        let state = test_state();
        let body = signed_callback(&state, "0190");
        let app = create_router(state);

        let response = app.oneshot(notification_request(body)).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let json = body_json(response).await;
        assert_eq!(json["status"], "declined");
        assert_eq!(json["response_code"], 190);
    }

    #[tokio::test]
    async fn test_notification_with_bad_signature_is_rejected() {
        let state = test_state();
        let body = signed_callback(&state, "0000");
        let tampered = body.replace("Ds_Signature=", "Ds_Signature=A");
        let app = create_router(state);

        let response = app.oneshot(notification_request(tampered)).await.unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let json = body_json(response).await;
        assert_eq!(json["code"], "INVALID_CALLBACK");
    }

    #[tokio::test]
    async fn test_notification_with_missing_fields_is_rejected() {
        let app = create_router(test_state());
        let response = app
            .oneshot(notification_request(
                "Ds_SignatureVersion=HMAC_SHA256_V1".to_string(),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_return_reports_status_and_redirect() {
        let state = test_state();
        let authorized = signed_callback(&state, "0000");
        let declined = signed_callback(&state, "9915");
        let app = create_router(state);

        let response = app
            .clone()
            .oneshot(
                Request::builder()
                    .uri(format!("/api/v1/payments/return?{}", authorized))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let json = body_json(response).await;
        assert_eq!(json["status"], "authorized");
        assert_eq!(json["amount_minor"], 2550);
        assert_eq!(json["authorisation_code"], "123456");
        assert_eq!(json["transaction_time"], "2026-10-18T12:30:00");
        assert_eq!(json["redirect"], "https://shop.example/tpv-pago-exitoso/");

        let response = app
            .clone()
            .oneshot(
                Request::builder()
                    .uri(format!("/api/v1/payments/return?{}", declined))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        let json = body_json(response).await;
        assert_eq!(json["status"], "declined");
        assert_eq!(json["response_code"], 9915);
        assert!(json.get("transaction_time").is_none());
        assert_eq!(json["redirect"], "https://shop.example/tpv-pago-error/");

        let forged = authorized.replace("Ds_Signature=", "Ds_Signature=x");
        let response = app
            .oneshot(
                Request::builder()
                    .uri(format!("/api/v1/payments/return?{}", forged))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        let json = body_json(response).await;
        assert_eq!(json["status"], "invalid");
        assert!(json.get("order").is_none());
    }

    #[tokio::test]
    async fn test_return_with_missing_fields_is_json_error() {
        let app = create_router(test_state());
        let response = app
            .oneshot(
                Request::builder()
                    .uri("/api/v1/payments/return?Ds_SignatureVersion=HMAC_SHA256_V1")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let json = body_json(response).await;
        assert_eq!(json["code"], "INVALID_CALLBACK");
    }
}
