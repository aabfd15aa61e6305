use axum::{
    extract::State,
    http::StatusCode,
    response::{Html, IntoResponse, Redirect, Response},
    Form, Json,
};
use serde::{Deserialize, Serialize};

use super::{page, OptionsState};
use crate::relay::RelayStatus;
use crate::settings::SaveNotice;

#[derive(Debug, Deserialize)]
pub struct OptionsForm {
    pub url: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct DestinationBody {
    pub url: String,
}

#[derive(Serialize)]
pub struct SavedResponse {
    pub url: String,
    pub notice: SaveNotice,
}

#[derive(Serialize)]
pub struct StatusResponse {
    pub status: RelayStatus,
    pub icon: Option<String>,
}

#[derive(Serialize)]
pub struct VersionResponse {
    pub version: &'static str,
}

pub async fn index() -> Redirect {
    Redirect::to("/options")
}

pub async fn options_page(State(state): State<OptionsState>) -> Html<String> {
    let url = state.destination.read_destination().await;
    Html(page::render(&url, None))
}

pub async fn save_options(
    State(state): State<OptionsState>,
    Form(form): Form<OptionsForm>,
) -> Response {
    match state.destination.write_destination(&form.url).await {
        Ok(notice) => {
            // Show what a reload would show; an empty value reads as the default.
            let url = state.destination.read_destination().await;
            Html(page::render(&url, Some(&notice))).into_response()
        }
        Err(e) => {
            tracing::error!(error = %e, "Failed to save options");
            (StatusCode::INTERNAL_SERVER_ERROR, "Failed to save options.").into_response()
        }
    }
}

pub async fn get_destination(State(state): State<OptionsState>) -> Json<DestinationBody> {
    Json(DestinationBody {
        url: state.destination.read_destination().await,
    })
}

pub async fn put_destination(
    State(state): State<OptionsState>,
    Json(body): Json<DestinationBody>,
) -> Result<Json<SavedResponse>, (StatusCode, String)> {
    let notice = state
        .destination
        .write_destination(&body.url)
        .await
        .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))?;
    Ok(Json(SavedResponse {
        url: state.destination.read_destination().await,
        notice,
    }))
}

pub async fn get_status(State(state): State<OptionsState>) -> Json<StatusResponse> {
    Json(StatusResponse {
        status: state.indicator.status(),
        icon: state.indicator.icon().map(str::to_string),
    })
}

pub async fn get_version() -> Json<VersionResponse> {
    Json(VersionResponse {
        version: env!("CARGO_PKG_VERSION"),
    })
}
