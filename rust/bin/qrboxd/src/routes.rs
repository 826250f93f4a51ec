//! Route registration: module routes plus system endpoints.

use std::time::Duration;

use axum::Router;
use axum::http::{HeaderValue, Method, header};
use axum::response::IntoResponse;
use axum::routing::get;
use qrbox_core::{Module, now_rfc3339};
use tower_http::cors::{AllowOrigin, CorsLayer};
use tracing::info;

/// Build the complete router.
///
/// Each module is nested under its mount path; `/api/health` is public.
/// Browser calls are limited to `origins`.
pub fn build_router(modules: &[&dyn Module], origins: &[String]) -> anyhow::Result<Router> {
    let mut app = Router::new().route("/api/health", get(health));

    for module in modules {
        info!(module = module.name(), path = module.mount_path(), "mounting module");
        app = app.nest(module.mount_path(), module.routes());
    }

    Ok(app.layer(cors(origins)?))
}

fn cors(origins: &[String]) -> anyhow::Result<CorsLayer> {
    let origins = origins
        .iter()
        .map(|o| {
            HeaderValue::from_str(o).map_err(|e| anyhow::anyhow!("invalid CORS origin '{o}': {e}"))
        })
        .collect::<anyhow::Result<Vec<_>>>()?;

    Ok(CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE, header::ACCEPT])
        .max_age(Duration::from_secs(300)))
}

async fn health() -> impl IntoResponse {
    axum::Json(serde_json::json!({
        "status": "ok",
        "timestamp": now_rfc3339(),
        "version": env!("CARGO_PKG_VERSION"),
        "service": "qrboxd",
    }))
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use boxes::BoxesModule;
    use boxes::service::BoxesConfig;
    use qrbox_core::{OwnerId, StaticAuthenticator};
    use qrbox_sql::SqliteStore;
    use tower::ServiceExt;

    fn app() -> Router {
        let db = Arc::new(SqliteStore::open_in_memory().unwrap());
        let module = BoxesModule::new(
            db,
            BoxesConfig {
                public_base_url: "https://boxes.example".into(),
            },
            Arc::new(StaticAuthenticator(OwnerId::from("alice"))),
        )
        .unwrap();
        build_router(&[&module], &["https://boxes.example".to_string()]).unwrap()
    }

    async fn body_json(resp: axum::response::Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(resp.into_body(), 1 << 20).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn health_reports_service() {
        let req = Request::builder().uri("/api/health").body(Body::empty()).unwrap();
        let resp = app().oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);

        let json = body_json(resp).await;
        assert_eq!(json["status"], "ok");
        assert_eq!(json["service"], "qrboxd");
        assert_eq!(json["version"], env!("CARGO_PKG_VERSION"));
        assert!(json["timestamp"].as_str().unwrap().ends_with('Z'));
    }

    #[tokio::test]
    async fn module_is_nested_under_api() {
        let req = Request::builder()
            .method("POST")
            .uri("/api/boxes")
            .header("content-type", "application/json")
            .body(Body::from(r#"{"name":"Garage","items":"rake"}"#))
            .unwrap();
        let resp = app().oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::CREATED);

        let json = body_json(resp).await;
        let id = json["box"]["id"].as_str().unwrap();
        assert_eq!(
            json["box"]["qrPayload"],
            format!("https://boxes.example/box/{id}")
        );

        let req = Request::builder().uri("/boxes").body(Body::empty()).unwrap();
        let resp = app().oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn cors_allows_configured_origin_only() {
        let preflight = |origin: &str| {
            Request::builder()
                .method("OPTIONS")
                .uri("/api/boxes")
                .header("origin", origin)
                .header("access-control-request-method", "POST")
                .body(Body::empty())
                .unwrap()
        };

        let resp = app().oneshot(preflight("https://boxes.example")).await.unwrap();
        assert_eq!(
            resp.headers().get("access-control-allow-origin").unwrap(),
            "https://boxes.example"
        );

        let resp = app().oneshot(preflight("https://evil.example")).await.unwrap();
        assert!(resp.headers().get("access-control-allow-origin").is_none());
    }

    #[test]
    fn invalid_origin_is_an_error() {
        assert!(cors(&["bad\norigin".to_string()]).is_err());
    }
}
