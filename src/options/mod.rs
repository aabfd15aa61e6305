//! Options server: the settings page plus a small JSON API.
//!
//! # Routes
//! - `GET /options`, `POST /options`: the settings page
//! - `GET|PUT /api/destination`, `GET /api/status`, `GET /api/version`

pub mod auth;
pub mod handlers;
pub mod page;

use std::sync::Arc;

use axum::{
    middleware,
    routing::get,
    Router,
};
use tower_http::trace::TraceLayer;

use self::auth::api_auth_middleware;
use self::handlers::*;
use crate::relay::StatusIndicator;
use crate::settings::DestinationSetting;

#[derive(Clone)]
pub struct OptionsState {
    pub destination: DestinationSetting,
    pub indicator: Arc<StatusIndicator>,
    pub api_key: Option<String>,
}

pub fn setup_options_router(state: OptionsState) -> Router {
    let api = Router::new()
        .route("/api/destination", get(get_destination).put(put_destination))
        .route("/api/status", get(get_status))
        .route("/api/version", get(get_version))
        .route_layer(middleware::from_fn_with_state(state.clone(), api_auth_middleware));

    Router::new()
        .route("/", get(index))
        .route("/options", get(options_page).post(save_options))
        .merge(api)
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::relay::StatusSink;
    use crate::settings::{destination::DEFAULT_DESTINATION, MemoryStore};
    use axum::body::{to_bytes, Body};
    use axum::http::{header, Request, StatusCode};
    use tower::ServiceExt;

    fn state(api_key: Option<&str>) -> OptionsState {
        OptionsState {
            destination: DestinationSetting::new(Arc::new(MemoryStore::new()), DEFAULT_DESTINATION),
            indicator: Arc::new(StatusIndicator::default()),
            api_key: api_key.map(str::to_string),
        }
    }

    async fn body_text(response: axum::response::Response) -> String {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    #[tokio::test]
    async fn test_page_shows_default_when_unset() {
        let app = setup_options_router(state(None));
        let response = app
            .oneshot(Request::get("/options").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let page = body_text(response).await;
        assert_eq!(page::input_value(&page).as_deref(), Some(DEFAULT_DESTINATION));
    }

    #[tokio::test]
    async fn test_save_then_reload_shows_new_value() {
        let app = setup_options_router(state(None));

        let saved = app
            .clone()
            .oneshot(
                Request::post("/options")
                    .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
                    .body(Body::from("url=http%3A%2F%2Flocalhost%3A9090"))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(saved.status(), StatusCode::OK);
        assert!(body_text(saved).await.contains("Options saved."));

        let reloaded = app
            .oneshot(Request::get("/options").body(Body::empty()).unwrap())
            .await
            .unwrap();
        let page = body_text(reloaded).await;
        assert_eq!(page::input_value(&page).as_deref(), Some("http://localhost:9090"));
        assert!(!page.contains("Options saved."));
    }

    #[tokio::test]
    async fn test_saving_empty_value_shows_default() {
        let app = setup_options_router(state(None));

        let saved = app
            .clone()
            .oneshot(
                Request::post("/options")
                    .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
                    .body(Body::from("url="))
                    .unwrap(),
            )
            .await
            .unwrap();
        let saved_page = body_text(saved).await;
        assert!(saved_page.contains("Options saved."));
        assert_eq!(page::input_value(&saved_page).as_deref(), Some(DEFAULT_DESTINATION));

        let reloaded = app
            .clone()
            .oneshot(Request::get("/options").body(Body::empty()).unwrap())
            .await
            .unwrap();
        let reloaded_page = body_text(reloaded).await;
        assert_eq!(page::input_value(&reloaded_page), page::input_value(&saved_page));

        let api = app
            .oneshot(
                Request::put("/api/destination")
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from(r#"{"url":""}"#))
                    .unwrap(),
            )
            .await
            .unwrap();
        let json: serde_json::Value = serde_json::from_str(&body_text(api).await).unwrap();
        assert_eq!(json["url"], DEFAULT_DESTINATION);
    }

    #[tokio::test]
    async fn test_status_reflects_indicator() {
        let state = state(None);
        state.indicator.report_failure();
        let app = setup_options_router(state);

        let response = app
            .oneshot(Request::get("/api/status").body(Body::empty()).unwrap())
            .await
            .unwrap();
        let json: serde_json::Value = serde_json::from_str(&body_text(response).await).unwrap();
        assert_eq!(json["status"], "failure");
        assert_eq!(json["icon"], "images/red.png");
    }

    #[tokio::test]
    async fn test_api_key_guards_api_only() {
        let app = setup_options_router(state(Some("secret")));

        let denied = app
            .clone()
            .oneshot(Request::get("/api/destination").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(denied.status(), StatusCode::UNAUTHORIZED);

        let allowed = app
            .clone()
            .oneshot(
                Request::put("/api/destination")
                    .header(header::AUTHORIZATION, "Bearer secret")
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from(r#"{"url":"http://localhost:9090"}"#))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(allowed.status(), StatusCode::OK);
        let json: serde_json::Value = serde_json::from_str(&body_text(allowed).await).unwrap();
        assert_eq!(json["notice"]["message"], "Options saved.");

        let page = app
            .oneshot(Request::get("/options").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(page.status(), StatusCode::OK);
    }
}
