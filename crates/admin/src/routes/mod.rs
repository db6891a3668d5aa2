//! HTTP route handlers for admin.
//!
//! # Route Structure
//!
//! Every rule kind (`discounts`, `free-shipping`, `banners`, `promos`) gets
//! the same set of routes:
//!
//! ```text
//! GET    /{kind}                 - List rules (?status=&limit=&offset=)
//! POST   /{kind}                 - Create a rule
//! GET    /{kind}/{id}            - Rule with targets, eligibility and status
//! PUT    /{kind}/{id}            - Replace a rule
//! DELETE /{kind}/{id}            - Delete a rule
//! PUT    /{kind}/{id}/override   - Force active/expired, or clear the override
//! ```
//!
//! Banner and promo create/update also accept `multipart/form-data` with a
//! `payload` JSON part and an optional `image` file part.

pub mod payload;
pub mod rules;

use axum::Router;
use axum::extract::DefaultBodyLimit;
use axum::routing::{get, put};

use crate::models::{BannerForm, DiscountForm, FreeShippingForm, PromoForm, RuleForm};
use crate::state::AppState;

/// Largest accepted request body, sized for banner images.
const MAX_BODY_BYTES: usize = 10 * 1024 * 1024;

/// Build the rule routes for every kind.
pub fn routes() -> Router<AppState> {
    Router::new()
        .merge(kind_routes::<DiscountForm>())
        .merge(kind_routes::<FreeShippingForm>())
        .merge(kind_routes::<BannerForm>())
        .merge(kind_routes::<PromoForm>())
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
}

fn kind_routes<F: RuleForm>() -> Router<AppState> {
    let base = format!("/{}", F::KIND.path_segment());

    Router::new()
        .route(&base, get(rules::index::<F>).post(rules::create::<F>))
        .route(
            &format!("{base}/{{id}}"),
            get(rules::show::<F>)
                .put(rules::update::<F>)
                .delete(rules::destroy::<F>),
        )
        .route(
            &format!("{base}/{{id}}/override"),
            put(rules::set_override::<F>),
        )
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Arc;

    use axum::body::{Body, to_bytes};
    use axum::http::{Method, Request, StatusCode, header};
    use serde_json::{Value, json};
    use sqlx::PgPool;
    use tower::ServiceExt;

    use super::*;
    use crate::services::storage::MockObjectStorage;

    /// Router whose pool never connects; only paths that fail before the
    /// database are exercised here.
    fn app(storage: MockObjectStorage) -> Router {
        let pool = PgPool::connect_lazy("postgres://localhost:1/unreachable").unwrap();
        let state = AppState::new(pool, Arc::new(storage));

        routes().with_state(state)
    }

    async fn send(app: Router, request: Request<Body>) -> (StatusCode, Value) {
        let response = app.oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, body)
    }

    fn json_request(method: Method, uri: &str, body: &Value) -> Request<Body> {
        Request::builder()
            .method(method)
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    fn multipart_request(uri: &str, payload: &Value, with_image: bool) -> Request<Body> {
        let boundary = "petshop-test-boundary";
        let mut body = format!(
            "--{boundary}\r\nContent-Disposition: form-data; name=\"payload\"\r\n\r\n{payload}\r\n"
        );
        if with_image {
            body.push_str(&format!(
                "--{boundary}\r\nContent-Disposition: form-data; name=\"image\"; filename=\"hero.png\"\r\nContent-Type: image/png\r\n\r\nPNGDATA\r\n"
            ));
        }
        body.push_str(&format!("--{boundary}--\r\n"));

        Request::builder()
            .method(Method::POST)
            .uri(uri)
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={boundary}"),
            )
            .body(Body::from(body))
            .unwrap()
    }

    #[tokio::test]
    async fn test_create_reports_field_errors() {
        let body = json!({
            "applyType": "brands",
            "apply": [],
            "valueType": "percentage",
            "value": 150,
        });
        let (status, body) = send(
            app(MockObjectStorage::new()),
            json_request(Method::POST, "/discounts", &body),
        )
        .await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        let errors = &body["errors"];
        assert_eq!(errors["applyType"], json!("unknown apply type 'brands'"));
        assert_eq!(errors["apply"], json!("must contain at least one target"));
        assert_eq!(errors["title"], json!("is required"));
        assert_eq!(errors["startAt"], json!("is required"));
        assert_eq!(errors["value"], json!("must be at most 100 for a percentage"));
    }

    #[tokio::test]
    async fn test_malformed_json_is_bad_request() {
        let request = Request::builder()
            .method(Method::POST)
            .uri("/free-shipping")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from("{\"name\": "))
            .unwrap();

        let (status, body) = send(app(MockObjectStorage::new()), request).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].is_string());
    }

    #[tokio::test]
    async fn test_wrong_json_types_are_bad_request() {
        let body = json!({"name": "Over 50", "apply": "cat-1"});
        let (status, _) = send(
            app(MockObjectStorage::new()),
            json_request(Method::PUT, "/free-shipping/3", &body),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_invalid_id_is_bad_request() {
        let request = Request::builder()
            .uri("/promos/not-a-number")
            .body(Body::empty())
            .unwrap();
        let response = app(MockObjectStorage::new()).oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_list_query_is_validated() {
        let request = Request::builder()
            .uri("/banners?status=paused&limit=1000")
            .body(Body::empty())
            .unwrap();
        let (status, body) = send(app(MockObjectStorage::new()), request).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["errors"]["status"], json!("invalid rule status: paused"));
        assert_eq!(body["errors"]["limit"], json!("must be between 1 and 200"));
    }

    #[tokio::test]
    async fn test_override_requires_field() {
        let (status, body) = send(
            app(MockObjectStorage::new()),
            json_request(Method::PUT, "/discounts/1/override", &json!({})),
        )
        .await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["errors"]["activeOverride"].is_string());
    }

    #[tokio::test]
    async fn test_multipart_invalid_payload_never_touches_storage() {
        let mut storage = MockObjectStorage::new();
        storage.expect_put().never();
        storage.expect_delete().never();

        let payload = json!({"title": "", "applyType": "pets", "apply": ["dog"]});
        let (status, body) =
            send(app(storage), multipart_request("/banners", &payload, true)).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["errors"]["title"], json!("is required"));
    }

    #[tokio::test]
    async fn test_multipart_requires_payload_part() {
        let boundary = "b";
        let request = Request::builder()
            .method(Method::POST)
            .uri("/promos")
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={boundary}"),
            )
            .body(Body::from(format!("--{boundary}--\r\n")))
            .unwrap();

        let (status, body) = send(app(MockObjectStorage::new()), request).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], json!("missing 'payload' part"));
    }

    #[tokio::test]
    async fn test_image_rejected_for_kinds_without_one() {
        let mut storage = MockObjectStorage::new();
        storage.expect_put().never();

        let payload = json!({
            "name": "Over 50",
            "applyType": "categories",
            "apply": ["cat-1"],
            "startAt": "2026-06-01T00:00:00Z",
        });
        let (status, body) = send(
            app(storage),
            multipart_request("/free-shipping", &payload, true),
        )
        .await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], json!("free_shipping rules do not accept an image"));
    }

    #[tokio::test]
    async fn test_unknown_kind_is_not_found() {
        let request = Request::builder()
            .uri("/coupons/1")
            .body(Body::empty())
            .unwrap();
        let response = app(MockObjectStorage::new()).oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
