use axum::{
    extract::{rejection::JsonRejection, DefaultBodyLimit},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;
use serde_json::json;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use super::{ServiceChannels, ServiceError};
use crate::settings;

mod kyc;
mod payments;
mod price;
mod transactions;
mod users;
mod wallet;

/// Room for the non-file multipart fields and boundaries of a KYC upload.
const MULTIPART_OVERHEAD_BYTES: usize = 64 * 1024;

#[derive(Clone)]
pub struct AppState {
    channels: ServiceChannels,
}

/// `{"success": true, ...body}`
#[derive(Serialize)]
pub struct Success<T: Serialize> {
    success: bool,
    #[serde(flatten)]
    body: T,
}

pub fn success<T: Serialize>(body: T) -> Json<Success<T>> {
    Json(Success {
        success: true,
        body,
    })
}

pub fn failure(status: StatusCode, message: &str) -> Response {
    (
        status,
        Json(json!({
            "success": false,
            "error": message,
        })),
    )
        .into_response()
}

impl IntoResponse for ServiceError {
    fn into_response(self) -> Response {
        let status = match &self {
            ServiceError::InvalidRequest(_)
            | ServiceError::InvalidSignature
            | ServiceError::InsufficientBalance => StatusCode::BAD_REQUEST,
            ServiceError::NotFound(_) => StatusCode::NOT_FOUND,
            ServiceError::Forbidden(_) => StatusCode::FORBIDDEN,
            ServiceError::Conflict(_) => StatusCode::CONFLICT,
            ServiceError::Internal(_)
            | ServiceError::Repository(_, _)
            | ServiceError::Communication(_, _)
            | ServiceError::ExternalService(_, _, _) => {
                log::error!("Request failed: {}", self);
                return failure(StatusCode::INTERNAL_SERVER_ERROR, "Internal server error");
            }
        };

        failure(status, &self.to_string())
    }
}

/// Unwraps a JSON body, turning malformed input into a 400 with the
/// standard envelope.
pub fn json_body<T>(payload: Result<Json<T>, JsonRejection>) -> Result<T, ServiceError> {
    payload
        .map(|Json(body)| body)
        .map_err(|rejection| ServiceError::InvalidRequest(rejection.body_text()))
}

pub fn router(channels: ServiceChannels, server: &settings::Server) -> Router {
    let app_state = AppState { channels };
    let kyc_body_limit = server.max_upload_bytes * kyc::DOCUMENT_COUNT + MULTIPART_OVERHEAD_BYTES;

    Router::new()
        .route("/health", get(|| async { "OK" }))
        .route("/api/exchange-rate", get(price::get_exchange_rate))
        .route("/api/convert", get(price::convert))
        .route("/api/user/register", post(users::register_user))
        .route("/api/user/{uid}", get(users::get_user_details))
        .route(
            "/api/kyc/upload",
            post(kyc::upload_documents).layer(DefaultBodyLimit::max(kyc_body_limit)),
        )
        .route("/api/kyc/status/{uid}", get(kyc::get_kyc_status))
        .route("/api/payment/create-order", post(payments::create_order))
        .route("/api/payment/verify", post(payments::verify_payment))
        .route("/api/transactions/{uid}", get(transactions::list_transactions))
        .route("/api/wallet/transfer", post(wallet::transfer))
        .with_state(app_state)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}

pub async fn start_http_server(
    channels: ServiceChannels,
    server: &settings::Server,
) -> Result<(), anyhow::Error> {
    let app = router(channels, server);

    let listener = tokio::net::TcpListener::bind(&server.listen).await?;
    log::info!("Listening on {}", listener.local_addr()?);

    axum::serve(listener, app).await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::price::{RateQuote, RateSource};
    use crate::repositories::kyc::{KycRepository, SimulatedKycProvider};
    use crate::repositories::payments::SimulatedRazorpay;
    use crate::repositories::price::PriceRepository;
    use crate::repositories::simulation::RandomizedOutcome;
    use crate::services::kyc::{KycRequestHandler, KycService};
    use crate::services::{spawn_service, spawn_services};
    use crate::settings::Settings;

    use axum::body::{to_bytes, Body};
    use axum::http::{header, Request};
    use chrono::Utc;
    use serde_json::Value;
    use std::sync::Arc;
    use tokio::sync::mpsc;
    use tower::ServiceExt;
    use uuid::Uuid;

    const BOUNDARY: &str = "enkrypt-test-boundary";

    struct TestApp {
        router: Router,
        razorpay: SimulatedRazorpay,
    }

    fn test_settings(success_rate: f64) -> Settings {
        let uploads_dir = std::env::temp_dir().join(format!("enkrypt-uploads-{}", Uuid::new_v4()));
        Settings::for_tests(success_rate, &uploads_dir.to_string_lossy())
    }

    async fn test_app(success_rate: f64, quote: Option<RateQuote>) -> TestApp {
        test_app_with(test_settings(success_rate), quote).await
    }

    async fn test_app_with(settings: Settings, quote: Option<RateQuote>) -> TestApp {
        let price_repository = PriceRepository::new(&settings.price_providers).unwrap();
        if let Some(quote) = quote {
            price_repository.seed(quote).await;
        }

        let channels = spawn_services(&settings, price_repository);

        TestApp {
            router: router(channels, &settings.server),
            razorpay: SimulatedRazorpay::new(
                settings.razorpay.key_id.clone(),
                settings.razorpay.key_secret.clone(),
            ),
        }
    }

    impl TestApp {
        async fn send(&self, request: Request<Body>) -> (StatusCode, Value) {
            let response = self.router.clone().oneshot(request).await.unwrap();
            let status = response.status();
            let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
            let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
            (status, body)
        }

        async fn get(&self, uri: &str) -> (StatusCode, Value) {
            self.send(Request::get(uri).body(Body::empty()).unwrap())
                .await
        }

        async fn post(&self, uri: &str, body: Value) -> (StatusCode, Value) {
            self.send(
                Request::post(uri)
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from(body.to_string()))
                    .unwrap(),
            )
            .await
        }

        async fn register(&self, uid: &str) -> Value {
            let (status, body) = self
                .post(
                    "/api/user/register",
                    json!({"uid": uid, "email": format!("{}@example.com", uid), "displayName": "Test"}),
                )
                .await;
            assert_eq!(status, StatusCode::OK);
            body["user"].clone()
        }

        async fn upload_kyc(&self, uid: &str) -> (StatusCode, Value) {
            let mut body = String::new();
            body.push_str(&format!(
                "--{}\r\nContent-Disposition: form-data; name=\"uid\"\r\n\r\n{}\r\n",
                BOUNDARY, uid
            ));
            for field in ["aadhaar", "pan", "selfie"] {
                body.push_str(&format!(
                    "--{}\r\nContent-Disposition: form-data; name=\"{}\"; filename=\"{}.png\"\r\nContent-Type: image/png\r\n\r\nnot-really-a-png\r\n",
                    BOUNDARY, field, field
                ));
            }
            body.push_str(&format!("--{}--\r\n", BOUNDARY));

            self.send(
                Request::post("/api/kyc/upload")
                    .header(
                        header::CONTENT_TYPE,
                        format!("multipart/form-data; boundary={}", BOUNDARY),
                    )
                    .body(Body::from(body))
                    .unwrap(),
            )
            .await
        }

        async fn create_order(&self, uid: &str, amount: f64) -> (StatusCode, Value) {
            self.post(
                "/api/payment/create-order",
                json!({"uid": uid, "amount": amount}),
            )
            .await
        }

        async fn verify(&self, uid: &str, order_id: &str, signature: &str) -> (StatusCode, Value) {
            self.post(
                "/api/payment/verify",
                json!({
                    "razorpay_order_id": order_id,
                    "razorpay_payment_id": "pay_test",
                    "razorpay_signature": signature,
                    "uid": uid,
                    "usdtAmount": "12.5",
                    "inrAmount": 1000,
                    "rate": 0.0125,
                }),
            )
            .await
        }

        async fn balance(&self, uid: &str) -> f64 {
            let (_, body) = self.get(&format!("/api/user/{}", uid)).await;
            body["user"]["balance"].as_f64().unwrap()
        }

        /// Registers a KYC-verified user holding `amount` USDT bought through
        /// one verified payment.
        async fn funded_user(&self, uid: &str) -> f64 {
            self.register(uid).await;
            let (status, _) = self.upload_kyc(uid).await;
            assert_eq!(status, StatusCode::OK);

            let (_, order) = self.create_order(uid, 1000.0).await;
            let order_id = order["order"]["id"].as_str().unwrap().to_string();
            let signature = self.razorpay.sign(&order_id, "pay_test");
            let (status, _) = self.verify(uid, &order_id, &signature).await;
            assert_eq!(status, StatusCode::OK);

            self.balance(uid).await
        }
    }

    fn live_quote(rate: f64) -> RateQuote {
        RateQuote {
            rate,
            source: RateSource::Coingecko,
            fetched_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn health_check() {
        let app = test_app(1.0, None).await;
        let response = app
            .router
            .clone()
            .oneshot(Request::get("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn register_and_get_user() {
        let app = test_app(1.0, None).await;

        let user = app.register("alice").await;
        assert_eq!(user["uid"], "alice");
        assert_eq!(user["balance"], 0.0);
        assert_eq!(user["kycStatus"], "pending");
        assert!(user["walletAddress"].as_str().unwrap().starts_with('T'));

        let again = app.register("alice").await;
        assert_eq!(again["walletAddress"], user["walletAddress"]);

        let (status, body) = app.get("/api/user/alice").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["success"], true);
        assert_eq!(body["user"]["email"], "alice@example.com");

        let (status, body) = app.get("/api/user/nobody").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["success"], false);
        assert_eq!(body["error"], "User not found");
    }

    #[tokio::test]
    async fn register_requires_uid_and_email() {
        let app = test_app(1.0, None).await;

        let (status, body) = app
            .post("/api/user/register", json!({"uid": "bob"}))
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "Missing required fields");
    }

    #[tokio::test]
    async fn kyc_upload_sets_the_user_status() {
        let app = test_app(1.0, None).await;
        app.register("carol").await;

        let (status, _) = app.get("/api/kyc/status/carol").await;
        assert_eq!(status, StatusCode::OK);

        let (status, body) = app.upload_kyc("carol").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["kycRequest"]["status"], "verified");
        assert!(body["kycRequest"]["verificationId"]
            .as_str()
            .unwrap()
            .starts_with("kyc_"));

        let (_, report) = app.get("/api/kyc/status/carol").await;
        assert_eq!(report["kycStatus"], "verified");
        assert_eq!(report["kycRequest"]["id"], body["kycRequest"]["id"]);
    }

    #[tokio::test]
    async fn each_upload_records_exactly_one_kyc_request() {
        let settings = test_settings(1.0);
        let price_repository = PriceRepository::new(&settings.price_providers).unwrap();
        let mut channels = spawn_services(&settings, price_repository);

        let kyc_repository = KycRepository::new(&settings.server.uploads_dir);
        let (kyc_tx, kyc_rx) = mpsc::channel(8);
        spawn_service(
            "KYC",
            KycService::new(),
            KycRequestHandler::new(
                kyc_repository.clone(),
                Arc::new(SimulatedKycProvider::new(RandomizedOutcome::new(0, 1.0))),
                settings.server.max_upload_bytes,
                channels.users.clone(),
            ),
            kyc_rx,
        );
        channels.kyc = kyc_tx;

        let app = TestApp {
            router: router(channels, &settings.server),
            razorpay: SimulatedRazorpay::new(
                settings.razorpay.key_id.clone(),
                settings.razorpay.key_secret.clone(),
            ),
        };
        app.register("olga").await;
        assert_eq!(kyc_repository.count_for_user("olga"), 0);

        let (status, _) = app.upload_kyc("olga").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(kyc_repository.count_for_user("olga"), 1);

        let (status, second) = app.upload_kyc("olga").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(kyc_repository.count_for_user("olga"), 2);
        assert_eq!(
            kyc_repository.latest_for_user("olga").unwrap().id,
            second["kycRequest"]["id"].as_str().unwrap()
        );

        let mut entries = tokio::fs::read_dir(&settings.server.uploads_dir).await.unwrap();
        let mut files = 0;
        while entries.next_entry().await.unwrap().is_some() {
            files += 1;
        }
        assert_eq!(files, 6);
    }

    #[tokio::test]
    async fn rejected_kyc_blocks_orders() {
        let app = test_app(0.0, None).await;
        app.register("dave").await;

        let (_, body) = app.upload_kyc("dave").await;
        assert_eq!(body["kycRequest"]["status"], "rejected");

        let (status, body) = app.create_order("dave", 500.0).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(body["error"], "KYC verification required");
    }

    #[tokio::test]
    async fn kyc_upload_for_unknown_user() {
        let app = test_app(1.0, None).await;

        let (status, _) = app.upload_kyc("ghost").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn create_order_validates_input() {
        let app = test_app(1.0, None).await;

        let (status, body) = app
            .post("/api/payment/create-order", json!({"uid": "erin"}))
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "Amount and user ID required");

        let (status, _) = app.create_order("erin", 100.0).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn create_order_converts_to_paise() {
        let app = test_app(1.0, None).await;
        app.register("frank").await;
        app.upload_kyc("frank").await;

        let (status, body) = app.create_order("frank", 1234.567).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["order"]["amount"], 123457);
        assert_eq!(body["order"]["currency"], "INR");
        assert_eq!(body["keyId"], "rzp_test_1234567890");
        assert!(body["order"]["id"].as_str().unwrap().starts_with("order_"));
    }

    #[tokio::test]
    async fn create_order_rejects_amounts_past_paise_range() {
        let app = test_app(1.0, None).await;
        app.register("fay").await;
        app.upload_kyc("fay").await;

        let (status, body) = app.create_order("fay", 1e300).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "Amount too large");

        let (status, _) = app.create_order("fay", 1000.0).await;
        assert_eq!(status, StatusCode::OK);
    }

    #[tokio::test]
    async fn tampered_signature_changes_nothing() {
        let app = test_app(1.0, None).await;
        app.register("grace").await;
        app.upload_kyc("grace").await;

        let (_, order) = app.create_order("grace", 1000.0).await;
        let order_id = order["order"]["id"].as_str().unwrap();

        let (status, body) = app.verify("grace", order_id, "deadbeef").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "Invalid payment signature");

        assert_eq!(app.balance("grace").await, 0.0);
        let (_, history) = app.get("/api/transactions/grace").await;
        assert_eq!(history["transactions"].as_array().unwrap().len(), 0);
    }

    #[tokio::test]
    async fn repeated_verify_credits_once() {
        let app = test_app(1.0, None).await;
        app.register("heidi").await;
        app.upload_kyc("heidi").await;

        let (_, order) = app.create_order("heidi", 1000.0).await;
        let order_id = order["order"]["id"].as_str().unwrap().to_string();
        let signature = app.razorpay.sign(&order_id, "pay_test");

        let (status, first) = app.verify("heidi", &order_id, &signature).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(first["transaction"]["status"], "completed");
        assert_eq!(first["transaction"]["usdtAmount"], 12.5);

        let (status, second) = app.verify("heidi", &order_id, &signature).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(second["transaction"]["id"], first["transaction"]["id"]);

        assert_eq!(app.balance("heidi").await, 12.5);
        let (_, history) = app.get("/api/transactions/heidi").await;
        assert_eq!(history["transactions"].as_array().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn verify_checks_order_owner() {
        let app = test_app(1.0, None).await;
        app.register("ivan").await;
        app.register("judy").await;
        app.upload_kyc("ivan").await;

        let (_, order) = app.create_order("ivan", 1000.0).await;
        let order_id = order["order"]["id"].as_str().unwrap().to_string();
        let signature = app.razorpay.sign(&order_id, "pay_test");

        let (status, _) = app.verify("judy", &order_id, &signature).await;
        assert_eq!(status, StatusCode::CONFLICT);

        let signature = app.razorpay.sign("order_missing", "pay_test");
        let (status, _) = app.verify("ivan", "order_missing", &signature).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn failed_settlement_records_a_failed_buy() {
        let mut settings = test_settings(1.0);
        settings.simulation.settlement_success_rate = 0.0;
        let app = test_app_with(settings, None).await;

        app.register("kim").await;
        app.upload_kyc("kim").await;
        let (_, order) = app.create_order("kim", 1000.0).await;
        let order_id = order["order"]["id"].as_str().unwrap().to_string();
        let signature = app.razorpay.sign(&order_id, "pay_test");

        let (status, first) = app.verify("kim", &order_id, &signature).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(first["transaction"]["status"], "failed");
        assert!(first["transaction"]["txHash"].is_null());

        let (_, second) = app.verify("kim", &order_id, &signature).await;
        assert_eq!(second["transaction"]["id"], first["transaction"]["id"]);

        assert_eq!(app.balance("kim").await, 0.0);
        let (_, history) = app.get("/api/transactions/kim").await;
        let transactions = history["transactions"].as_array().unwrap();
        assert_eq!(transactions.len(), 1);
        assert_eq!(transactions[0]["status"], "failed");
        assert_eq!(transactions[0]["inrAmount"], 1000.0);
    }

    #[tokio::test]
    async fn failed_transfer_refunds_the_debit() {
        let mut settings = test_settings(1.0);
        settings.simulation.transfer_success_rate = 0.0;
        let app = test_app_with(settings, None).await;
        let balance = app.funded_user("lena").await;

        let (status, body) = app
            .post(
                "/api/wallet/transfer",
                json!({"uid": "lena", "toAddress": "TExternal", "amount": 5}),
            )
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["success"], false);
        assert!(body["txHash"].is_null());
        assert_eq!(body["newBalance"], balance);

        assert_eq!(app.balance("lena").await, balance);
        let (_, history) = app.get("/api/transactions/lena").await;
        let transactions = history["transactions"].as_array().unwrap();
        assert_eq!(transactions[0]["type"], "transfer");
        assert_eq!(transactions[0]["status"], "failed");
    }

    #[tokio::test]
    async fn transfer_more_than_balance_is_rejected() {
        let app = test_app(1.0, None).await;
        let balance = app.funded_user("leo").await;

        let (status, body) = app
            .post(
                "/api/wallet/transfer",
                json!({"uid": "leo", "toAddress": "TExternal", "amount": balance + 1.0}),
            )
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "Insufficient balance");

        assert_eq!(app.balance("leo").await, balance);
        let (_, history) = app.get("/api/transactions/leo").await;
        assert_eq!(history["transactions"].as_array().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn transfer_debits_and_lists_newest_first() {
        let app = test_app(1.0, None).await;
        let balance = app.funded_user("mia").await;

        let (status, body) = app
            .post(
                "/api/wallet/transfer",
                json!({"uid": "mia", "toAddress": "TExternal", "amount": "2.5"}),
            )
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["success"], true);
        assert_eq!(body["newBalance"], balance - 2.5);
        assert!(body["txHash"].as_str().unwrap().starts_with("0x"));

        let (_, history) = app.get("/api/transactions/mia").await;
        let transactions = history["transactions"].as_array().unwrap();
        assert_eq!(transactions.len(), 2);
        assert_eq!(transactions[0]["type"], "transfer");
        assert_eq!(transactions[0]["toAddress"], "TExternal");
        assert_eq!(transactions[1]["type"], "buy");
    }

    #[tokio::test]
    async fn transfer_requires_fields() {
        let app = test_app(1.0, None).await;

        let (status, body) = app
            .post("/api/wallet/transfer", json!({"uid": "nina", "amount": 1}))
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "Missing required fields");

        let (status, _) = app
            .post(
                "/api/wallet/transfer",
                json!({"uid": "nina", "toAddress": "TExternal", "amount": 1}),
            )
            .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn malformed_json_is_a_bad_request() {
        let app = test_app(1.0, None).await;

        let (status, body) = app
            .send(
                Request::post("/api/wallet/transfer")
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from("{not json"))
                    .unwrap(),
            )
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["success"], false);
    }

    #[tokio::test]
    async fn exchange_rate_serves_live_quote() {
        let app = test_app(1.0, Some(live_quote(0.0125))).await;

        let (status, body) = app.get("/api/exchange-rate").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["rate"], 0.0125);
        assert_eq!(body["source"], "coingecko");
        assert!(body["rateText"].as_str().unwrap().contains("just now"));
    }

    #[tokio::test]
    async fn exchange_rate_falls_back_when_providers_fail() {
        let app = test_app(1.0, None).await;

        let (status, body) = app.get("/api/exchange-rate").await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(body["success"], false);
        assert_eq!(body["error"], "Failed to fetch exchange rate");
        assert_eq!(body["fallbackRate"], 0.012);
    }

    #[tokio::test]
    async fn convert_formats_amounts() {
        let app = test_app(1.0, Some(live_quote(0.0125))).await;

        let (status, body) = app.get("/api/convert?amount=100000").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["inrAmount"], "1,00,000.00");
        assert_eq!(body["usdtAmount"], "1,250.00");

        let (_, body) = app.get("/api/convert?amount=abc").await;
        assert_eq!(body["usdtAmount"], "0.00");

        let (_, body) = app.get("/api/convert").await;
        assert_eq!(body["usdtAmount"], "0.00");
    }
}
