// src/error.rs
use log::error;
use serde_json::json;
use std::convert::Infallible;
use thiserror::Error;
use warp::http::StatusCode;
use warp::reject::Reject;
use warp::{Rejection, Reply};

#[derive(Debug, Error)]
pub enum DashboardError {
    #[error("entity store error: {0}")]
    Store(String),

    #[error("insight service error: {0}")]
    Insight(String),

    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("{0} not found")]
    NotFound(String),

    #[error("invalid input: {0}")]
    InvalidInput(String),
}

impl Reject for DashboardError {}

pub type Result<T> = std::result::Result<T, DashboardError>;

impl DashboardError {
    fn status(&self) -> StatusCode {
        match self {
            DashboardError::NotFound(_) => StatusCode::NOT_FOUND,
            DashboardError::InvalidInput(_) => StatusCode::BAD_REQUEST,
            DashboardError::Insight(_) | DashboardError::Http(_) => StatusCode::BAD_GATEWAY,
            DashboardError::Store(_) | DashboardError::Json(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

pub async fn handle_rejection(err: Rejection) -> std::result::Result<impl Reply, Infallible> {
    let (status, message) = if let Some(e) = err.find::<DashboardError>() {
        (e.status(), e.to_string())
    } else if err.is_not_found() {
        (StatusCode::NOT_FOUND, "route not found".to_string())
    } else if let Some(e) = err.find::<warp::filters::body::BodyDeserializeError>() {
        (StatusCode::BAD_REQUEST, e.to_string())
    } else if let Some(e) = err.find::<warp::reject::InvalidQuery>() {
        (StatusCode::BAD_REQUEST, e.to_string())
    } else if err.find::<warp::reject::MethodNotAllowed>().is_some() {
        (StatusCode::METHOD_NOT_ALLOWED, "method not allowed".to_string())
    } else {
        error!("Unhandled rejection: {:?}", err);
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            "internal server error".to_string(),
        )
    };

    Ok(warp::reply::with_status(
        warp::reply::json(&json!({ "error": message })),
        status,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn maps_variants_to_status_codes() {
        assert_eq!(
            DashboardError::NotFound("holding".into()).status(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            DashboardError::InvalidInput("quantity".into()).status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            DashboardError::Insight("timeout".into()).status(),
            StatusCode::BAD_GATEWAY
        );
        assert_eq!(
            DashboardError::Store("down".into()).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn display_includes_context() {
        let e = DashboardError::NotFound("holding abc".into());
        assert_eq!(e.to_string(), "holding abc not found");
    }
}
