//! Loopback HTTP surface for the browser client.

use std::io;
use std::net::SocketAddr;
use std::path::PathBuf;

use axum::{
    body::Bytes,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::net::TcpListener;
use tower_http::services::ServeDir;
use tracing::{info, warn};

use crate::commands::{self, CommandName};
use crate::session::Session;

const INVALID_REQUEST: &str = "Invalid request";
const BAD_JSON: &str = "Error parsing JSON request body";

#[derive(Clone, Debug)]
pub struct HttpSettings {
    pub addr: SocketAddr,
    pub assets_dir: PathBuf,
}

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("failed to bind {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        #[source]
        source: io::Error,
    },
    #[error("server error: {0}")]
    Serve(#[source] io::Error),
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct SendSpoofedRequest {
    pub chat_id: String,
    pub message_id: String,
    pub spoofed_id: String,
    pub spoofed_message: String,
    pub reply_message: String,
}

impl SendSpoofedRequest {
    /// Router arguments for `send-spoofed-reply`, or `None` when a field is
    /// blank or the quoted text would be cut by the `|` separator.
    fn into_args(self) -> Option<Vec<String>> {
        let fields = [
            &self.chat_id,
            &self.message_id,
            &self.spoofed_id,
            &self.spoofed_message,
            &self.reply_message,
        ];
        if fields.iter().any(|field| field.trim().is_empty()) || self.spoofed_message.contains('|') {
            return None;
        }
        Some(vec![
            self.chat_id,
            self.message_id,
            self.spoofed_id,
            format!("{}|{}", self.spoofed_message, self.reply_message),
        ])
    }
}

#[derive(Debug, Serialize)]
pub struct SendSpoofedResponse {
    pub ok: bool,
    pub message: String,
}

pub fn router(session: Session, assets_dir: PathBuf) -> Router {
    Router::new()
        .route("/send-spoofed", post(send_spoofed).fallback(invalid_request))
        .route("/get-groups", get(get_groups).fallback(invalid_request))
        .fallback_service(ServeDir::new(assets_dir))
        .with_state(session)
}

pub async fn serve(session: Session, settings: HttpSettings) -> Result<(), ServerError> {
    let listener = TcpListener::bind(settings.addr)
        .await
        .map_err(|source| ServerError::Bind {
            addr: settings.addr,
            source,
        })?;
    info!("Listening on {}", settings.addr);
    axum::serve(listener, router(session, settings.assets_dir))
        .await
        .map_err(ServerError::Serve)
}

async fn send_spoofed(State(session): State<Session>, body: Bytes) -> Response {
    info!("HTTP Request: /send-spoofed");
    let request: SendSpoofedRequest = match serde_json::from_slice(&body) {
        Ok(request) => request,
        Err(err) => {
            warn!("rejecting /send-spoofed body: {err}");
            return (StatusCode::BAD_REQUEST, BAD_JSON).into_response();
        }
    };
    let Some(args) = request.into_args() else {
        return (StatusCode::BAD_REQUEST, INVALID_REQUEST).into_response();
    };

    match commands::dispatch(&session, CommandName::SendSpoofedReply.as_str(), &args, None).await {
        Ok(output) => (
            StatusCode::OK,
            Json(SendSpoofedResponse {
                ok: true,
                message: output.to_string(),
            }),
        )
            .into_response(),
        Err(err) => (
            failure_status(err.is_usage()),
            Json(SendSpoofedResponse {
                ok: false,
                message: err.to_string(),
            }),
        )
            .into_response(),
    }
}

async fn get_groups(State(session): State<Session>) -> Response {
    info!("HTTP Request: /get-groups");
    match commands::dispatch(&session, CommandName::ListGroups.as_str(), &[], None).await {
        Ok(output) => (StatusCode::OK, output.to_string()).into_response(),
        Err(err) => (failure_status(err.is_usage()), err.to_string()).into_response(),
    }
}

async fn invalid_request() -> (StatusCode, &'static str) {
    (StatusCode::BAD_REQUEST, INVALID_REQUEST)
}

fn failure_status(is_usage: bool) -> StatusCode {
    if is_usage {
        StatusCode::BAD_REQUEST
    } else {
        StatusCode::BAD_GATEWAY
    }
}
