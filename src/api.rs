use futures_util::StreamExt;
use reqwest::Client;
use serde::Deserialize;
use thiserror::Error;

use crate::client::{MediaRef, MediaType, UploadResponse};

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("unexpected status: {0}")]
    Status(u16),
    #[error("api error: {error} ({description})")]
    Api { error: String, description: String },
}

/// HTTP side of the bridge: encrypted media goes through here rather than
/// over the websocket.
#[derive(Clone)]
pub struct MediaApi {
    base_url: String,
    token: String,
    http: Client,
}

impl MediaApi {
    pub fn new(base_url: String, token: String) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            token,
            http: Client::new(),
        }
    }

    pub async fn upload(
        &self,
        data: Vec<u8>,
        media_type: MediaType,
    ) -> Result<UploadResponse, ApiError> {
        let url = format!("{}/upload", self.base_url);
        let file_part = reqwest::multipart::Part::bytes(data).file_name(media_type.as_str());
        let form = reqwest::multipart::Form::new()
            .text("type", media_type.as_str())
            .part("file", file_part);

        let response = self
            .http
            .post(url)
            .bearer_auth(&self.token)
            .multipart(form)
            .send()
            .await?;
        let status = response.status();
        if !status.is_success() {
            return Err(ApiError::Status(status.as_u16()));
        }
        let api_response: ApiResponse<UploadResponse> = response.json().await?;
        api_response.into_result()
    }

    pub async fn download(&self, media: &MediaRef) -> Result<Vec<u8>, ApiError> {
        let url = format!("{}/download", self.base_url);
        let response = self
            .http
            .post(url)
            .bearer_auth(&self.token)
            .json(media)
            .send()
            .await?;
        let status = response.status();
        if !status.is_success() {
            return Err(ApiError::Status(status.as_u16()));
        }
        let mut data = Vec::with_capacity(media.file_length.unwrap_or(0) as usize);
        let mut stream = response.bytes_stream();
        while let Some(chunk) = stream.next().await {
            data.extend_from_slice(&chunk?);
        }
        Ok(data)
    }
}

#[derive(Debug, Deserialize)]
#[serde(untagged, rename_all = "camelCase")]
enum ApiResponse<T> {
    Ok {
        #[allow(dead_code)]
        ok: bool,
        result: T,
    },
    Err {
        #[allow(dead_code)]
        ok: bool,
        error: String,
        description: Option<String>,
    },
}

impl<T> ApiResponse<T> {
    fn into_result(self) -> Result<T, ApiError> {
        match self {
            ApiResponse::Ok { result, .. } => Ok(result),
            ApiResponse::Err {
                error, description, ..
            } => Err(ApiError::Api {
                error,
                description: description.unwrap_or_else(|| "Unknown error".to_string()),
            }),
        }
    }
}
