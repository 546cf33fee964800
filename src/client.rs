use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::api::ApiError;
use crate::jid::Jid;
use crate::protocol::{proto, waproto};

pub type SendResponse = proto::SendMessageResult;
pub type GroupInfo = proto::GroupInfo;

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("websocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),
    #[error("url error: {0}")]
    Url(#[from] url::ParseError),
    #[error("protocol error: {0}")]
    Protocol(#[from] prost::DecodeError),
    #[error("media error: {0}")]
    Media(#[from] ApiError),
    #[error("connection closed")]
    Closed,
    #[error("connection error: {0}")]
    Connection(String),
    #[error("request timed out")]
    Timeout,
    #[error("missing rpc result")]
    MissingResult,
    #[error("unexpected rpc result for {0}")]
    UnexpectedResult(&'static str),
    #[error("{friendly}")]
    Rpc {
        code: i32,
        error_code: i32,
        message: String,
        friendly: String,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaType {
    Image,
    Video,
    Audio,
    Document,
    Sticker,
}

impl MediaType {
    pub fn as_str(&self) -> &'static str {
        match self {
            MediaType::Image => "image",
            MediaType::Video => "video",
            MediaType::Audio => "audio",
            MediaType::Document => "document",
            MediaType::Sticker => "sticker",
        }
    }
}

/// What the media server handed back for an uploaded blob.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadResponse {
    pub url: String,
    pub direct_path: String,
    pub media_key: Vec<u8>,
    pub file_enc_sha256: Vec<u8>,
    pub file_sha256: Vec<u8>,
    pub file_length: u64,
}

/// Enough of a media message to fetch and decrypt its payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MediaRef {
    pub media_type: MediaType,
    pub url: Option<String>,
    pub direct_path: Option<String>,
    pub media_key: Vec<u8>,
    pub file_enc_sha256: Vec<u8>,
    pub file_sha256: Vec<u8>,
    pub file_length: Option<u64>,
    pub mimetype: Option<String>,
}

/// The messaging protocol client. Session storage, encryption and the wire
/// protocol live behind this boundary.
#[async_trait]
pub trait ProtocolClient: Send + Sync {
    async fn send_message(&self, to: &Jid, message: waproto::Message) -> Result<SendResponse, ClientError>;

    async fn get_group_info(&self, jid: &Jid) -> Result<GroupInfo, ClientError>;

    async fn get_joined_groups(&self) -> Result<Vec<GroupInfo>, ClientError>;

    async fn upload(&self, data: Vec<u8>, media_type: MediaType) -> Result<UploadResponse, ClientError>;

    async fn download(&self, media: &MediaRef) -> Result<Vec<u8>, ClientError>;

    fn generate_message_id(&self) -> String;

    async fn send_presence(&self, presence: proto::Presence) -> Result<(), ClientError>;

    async fn answer_pair_request(&self, request_id: &str, accept: bool) -> Result<(), ClientError>;

    /// The logged-in account, once the bridge has reported it.
    fn own_jid(&self) -> Option<Jid>;

    fn push_name(&self) -> Option<String>;

    async fn disconnect(&self);
}
