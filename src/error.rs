//! API 错误类型

use crate::aniskip::AniskipError;
use crate::extract::ExtractError;
use crate::http_client::HttpClientError;
use crate::movie_page::MoviePageError;
use crate::tabs::TabError;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use thiserror::Error;
use tracing::warn;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("{0}")]
    BadRequest(String),
    #[error(transparent)]
    Tab(#[from] TabError),
    #[error(transparent)]
    Extract(#[from] ExtractError),
    #[error(transparent)]
    Upstream(#[from] HttpClientError),
    #[error(transparent)]
    Aniskip(#[from] AniskipError),
    #[error(transparent)]
    MoviePage(#[from] MoviePageError),
    #[error("JSON 序列化失败: {0}")]
    Json(#[from] serde_json::Error),
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::BadRequest(_) | AppError::Extract(_) | AppError::MoviePage(_) => {
                StatusCode::BAD_REQUEST
            }
            AppError::Tab(TabError::InvalidRow(_)) => StatusCode::BAD_REQUEST,
            AppError::Tab(_) => StatusCode::NOT_FOUND,
            AppError::Upstream(e) if e.is_not_found() => StatusCode::NOT_FOUND,
            AppError::Upstream(_) => StatusCode::BAD_GATEWAY,
            AppError::Aniskip(AniskipError::NotFound) => StatusCode::NOT_FOUND,
            AppError::Aniskip(AniskipError::Http(e)) if e.is_not_found() => StatusCode::NOT_FOUND,
            AppError::Aniskip(AniskipError::Http(_)) => StatusCode::BAD_GATEWAY,
            AppError::Aniskip(_) => StatusCode::BAD_REQUEST,
            AppError::Json(_) | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            warn!("请求失败 ({}): {}", status, self);
        }
        (status, Json(json!({"error": self.to_string()}))).into_response()
    }
}
