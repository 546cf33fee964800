//! Inbound bridge events and the self-chat remote control.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tracing::{debug, error, info, warn};

use crate::client::{MediaRef, MediaType};
use crate::commands;
use crate::jid::{parse_jid, Jid};
use crate::journal::EventJournal;
use crate::message::send_conversation_message;
use crate::pairing::{render_qr, PairingGate};
use crate::protocol::{proto, waproto};
use crate::server::{self, HttpSettings};
use crate::session::Session;
use crate::state::{AccountRecord, LocalDb};

const CRITICAL_BLOCK: &str = "critical_block";
const OUTPUT_PREFIX: &str = "-> Cmd output:";
const SET_SECRET: &str = "/setSecrete";
const RUN_COMMAND: &str = "/cmd";

#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    Connected,
    PushNameSetting { push_name: String },
    AppStateSyncComplete { name: String },
    StreamReplaced,
    LoggedOut { reason: Option<String> },
    Disconnected,
    QrCode { code: String },
    PairRequest {
        request_id: String,
        jid: String,
        platform: String,
        business_name: String,
    },
    PairSuccess { jid: String, push_name: Option<String> },
    Message(MessageEvent),
}

impl Event {
    pub fn from_proto(event: proto::ServerEvent) -> Option<Self> {
        use proto::server_event::Kind;

        Some(match event.kind? {
            Kind::Connected(_) => Event::Connected,
            Kind::PushNameSetting(setting) => Event::PushNameSetting {
                push_name: setting.push_name,
            },
            Kind::AppStateSyncComplete(sync) => Event::AppStateSyncComplete { name: sync.name },
            Kind::StreamReplaced(_) => Event::StreamReplaced,
            Kind::LoggedOut(logged_out) => Event::LoggedOut {
                reason: logged_out.reason,
            },
            Kind::Disconnected(_) => Event::Disconnected,
            Kind::QrCode(qr) => Event::QrCode { code: qr.code },
            Kind::PairRequest(request) => Event::PairRequest {
                request_id: request.request_id,
                jid: request.jid,
                platform: request.platform,
                business_name: request.business_name,
            },
            Kind::PairSuccess(success) => Event::PairSuccess {
                jid: success.jid,
                push_name: success.push_name,
            },
            Kind::Message(message) => Event::Message(MessageEvent {
                info: message.info?,
                message: message.message.unwrap_or_default(),
            }),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MessageEvent {
    pub info: proto::MessageInfo,
    pub message: waproto::Message,
}

impl MessageEvent {
    pub fn text(&self) -> &str {
        self.message
            .conversation
            .as_deref()
            .or_else(|| {
                self.message
                    .extended_text_message
                    .as_ref()
                    .and_then(|extended| extended.text.as_deref())
            })
            .unwrap_or_default()
    }

    pub fn chat(&self) -> Option<Jid> {
        parse_jid(&self.info.chat).ok()
    }
}

#[derive(Debug, PartialEq, Eq)]
pub enum Trigger<'a> {
    /// Message starts with the echo secret: report the chat id.
    SecretEcho,
    SetSecret(Option<&'a str>),
    Command(Option<(&'a str, Vec<&'a str>)>),
    None,
}

/// Decides what an inbound message asks for. Only the operator's own
/// messages can trigger anything; `/setSecrete` and `/cmd` additionally have
/// to be sent in the operator's own chat.
pub fn classify<'a>(event: &'a MessageEvent, secret: &str, own_chat: Option<&Jid>) -> Trigger<'a> {
    if !event.info.is_from_me {
        return Trigger::None;
    }
    let text = event.text();
    if !secret.is_empty() && text.starts_with(secret) {
        return Trigger::SecretEcho;
    }

    let in_own_chat = matches!((own_chat, event.chat()), (Some(own), Some(chat)) if *own == chat.to_non_ad());
    if !in_own_chat {
        return Trigger::None;
    }
    if let Some(rest) = directive(text, SET_SECRET) {
        return Trigger::SetSecret(Some(rest).filter(|value| !value.is_empty()));
    }
    if let Some(rest) = directive(text, RUN_COMMAND) {
        let mut tokens = rest.split_whitespace();
        return Trigger::Command(tokens.next().map(|name| (name, tokens.collect())));
    }
    Trigger::None
}

// "/cmd" and "/cmd args" match, "/cmdx" does not.
fn directive<'a>(text: &'a str, name: &str) -> Option<&'a str> {
    let rest = text.strip_prefix(name)?;
    if rest.is_empty() || rest.starts_with(char::is_whitespace) {
        Some(rest.trim())
    } else {
        None
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Shutdown,
}

enum Attachment {
    Download { kind: &'static str, media: MediaRef },
    Inline {
        kind: &'static str,
        mimetype: &'static str,
        data: Vec<u8>,
    },
}

fn attachment(message: &waproto::Message) -> Option<Attachment> {
    macro_rules! media_ref {
        ($media:expr, $media_type:expr) => {
            MediaRef {
                media_type: $media_type,
                url: $media.url.clone(),
                direct_path: $media.direct_path.clone(),
                media_key: $media.media_key.clone().unwrap_or_default(),
                file_enc_sha256: $media.file_enc_sha256.clone().unwrap_or_default(),
                file_sha256: $media.file_sha256.clone().unwrap_or_default(),
                file_length: $media.file_length,
                mimetype: $media.mimetype.clone(),
            }
        };
    }

    if let Some(image) = &message.image_message {
        return Some(Attachment::Download {
            kind: "Message.ImageMessage",
            media: media_ref!(image, MediaType::Image),
        });
    }
    if let Some(audio) = &message.audio_message {
        return Some(Attachment::Download {
            kind: "Message.AudioMessage",
            media: media_ref!(audio, MediaType::Audio),
        });
    }
    if let Some(video) = &message.video_message {
        return Some(Attachment::Download {
            kind: "Message.VideoMessage",
            media: media_ref!(video, MediaType::Video),
        });
    }
    if let Some(document) = &message.document_message {
        return Some(Attachment::Download {
            kind: "Message.DocumentMessage",
            media: media_ref!(document, MediaType::Document),
        });
    }
    if let Some(sticker) = &message.sticker_message {
        return Some(Attachment::Download {
            kind: "Message.StickerMessage",
            media: media_ref!(sticker, MediaType::Sticker),
        });
    }
    let contact = message.contact_message.as_ref()?;
    Some(Attachment::Inline {
        kind: "Message.ContactMessage",
        mimetype: "text/vcard",
        data: contact.vcard.clone().unwrap_or_default().into_bytes(),
    })
}

pub struct EventHandler {
    session: Session,
    journal: EventJournal,
    pairing: Arc<PairingGate>,
    pair_window: Duration,
    http: Option<HttpSettings>,
    http_started: AtomicBool,
    state: Option<LocalDb>,
}

impl EventHandler {
    pub fn new(session: Session, journal: EventJournal, pairing: Arc<PairingGate>, pair_window: Duration) -> Self {
        Self {
            session,
            journal,
            pairing,
            pair_window,
            http: None,
            http_started: AtomicBool::new(false),
            state: None,
        }
    }

    pub fn with_http(mut self, settings: HttpSettings) -> Self {
        self.http = Some(settings);
        self
    }

    pub fn with_state(mut self, state: LocalDb) -> Self {
        self.state = Some(state);
        self
    }

    #[cfg(test)]
    fn http_started(&self) -> bool {
        self.http_started.load(Ordering::SeqCst)
    }

    pub async fn handle(&self, event: Event) -> Flow {
        match event {
            Event::Connected | Event::PushNameSetting { .. } => {
                if self.session.client().push_name().is_none() {
                    debug!("no push name yet, staying invisible");
                    return Flow::Continue;
                }
                self.remember_account();
                self.announce_presence().await;
                self.start_http();
            }
            Event::AppStateSyncComplete { name } => {
                if name == CRITICAL_BLOCK && self.session.client().push_name().is_some() {
                    self.announce_presence().await;
                }
            }
            Event::StreamReplaced => {
                warn!("stream replaced by another connection, shutting down");
                return Flow::Shutdown;
            }
            Event::LoggedOut { reason } => {
                error!("logged out: {}", reason.as_deref().unwrap_or("no reason given"));
                return Flow::Shutdown;
            }
            Event::Disconnected => warn!("bridge reported a disconnect"),
            Event::QrCode { code } => match render_qr(&code) {
                Ok(rendered) => println!("{rendered}"),
                Err(err) => warn!("{err}"),
            },
            Event::PairRequest {
                request_id,
                jid,
                platform,
                business_name,
            } => {
                info!(
                    "Pairing {jid} (platform: {platform:?}, business name: {business_name:?}). Type r within {} seconds to reject pair",
                    self.pair_window.as_secs()
                );
                let accept = self.pairing.decide(self.pair_window).await;
                if let Err(err) = self.session.client().answer_pair_request(&request_id, accept).await {
                    error!("failed to answer pair request: {err}");
                }
            }
            Event::PairSuccess { jid, .. } => {
                info!("paired as {jid}");
                self.remember_account();
            }
            Event::Message(message) => self.handle_message(message).await,
        }
        Flow::Continue
    }

    async fn handle_message(&self, event: MessageEvent) {
        info!(
            "Received message {} from {} in {}",
            event.info.id, event.info.sender, event.info.chat
        );
        let own_chat = self.session.own_chat();
        let secret = self.session.echo_secret();

        let reply = match classify(&event, &secret, own_chat.as_ref()) {
            Trigger::SecretEcho => format!("{OUTPUT_PREFIX} \nChatID {}", event.info.chat),
            Trigger::SetSecret(Some(value)) => {
                self.session.set_echo_secret(value);
                format!("{OUTPUT_PREFIX} \nSecret set to {value}")
            }
            Trigger::SetSecret(None) => format!("{OUTPUT_PREFIX} \nYou need to set a secret"),
            Trigger::Command(Some((name, args))) => {
                let args: Vec<String> = args.into_iter().map(str::to_string).collect();
                let rendered = match commands::dispatch(&self.session, name, &args, Some(&event.message)).await {
                    Ok(output) => output.to_string(),
                    Err(err) => err.to_string(),
                };
                format!("{OUTPUT_PREFIX} \n{rendered}")
            }
            Trigger::Command(None) => format!("{OUTPUT_PREFIX} \nYou need send a valid command"),
            Trigger::None => {
                self.journal_message(&event).await;
                return;
            }
        };

        let Some(own_chat) = own_chat else {
            warn!("own account unknown, dropping reply");
            return;
        };
        if let Err(err) = send_conversation_message(self.session.client(), &own_chat, &reply).await {
            error!("failed to reply in own chat: {err}");
        }
    }

    async fn journal_message(&self, event: &MessageEvent) {
        let saved = match attachment(&event.message) {
            Some(Attachment::Download { kind, media }) => match self.session.client().download(&media).await {
                Ok(data) => {
                    let mimetype = media.mimetype.as_deref().unwrap_or("application/octet-stream");
                    Some(self.journal.record_file(kind, event, mimetype, &data).await)
                }
                Err(err) => {
                    warn!("failed to download {kind}: {err}");
                    None
                }
            },
            Some(Attachment::Inline { kind, mimetype, data }) => {
                Some(self.journal.record_file(kind, event, mimetype, &data).await)
            }
            None => None,
        };

        let result = match saved {
            Some(result) => result.map(|_| ()),
            None => self.journal.record("Message", event).await,
        };
        if let Err(err) = result {
            error!("failed to journal message {}: {err}", event.info.id);
        }
    }

    async fn announce_presence(&self) {
        if let Err(err) = self
            .session
            .client()
            .send_presence(proto::Presence::Available)
            .await
        {
            error!("failed to send presence: {err}");
        }
    }

    fn start_http(&self) {
        if self.http_started.swap(true, Ordering::SeqCst) {
            return;
        }
        let Some(settings) = self.http.clone() else {
            return;
        };
        let session = self.session.clone();
        tokio::spawn(async move {
            if let Err(err) = server::serve(session, settings).await {
                error!("Failed to start server: {err}");
            }
        });
    }

    fn remember_account(&self) {
        let (Some(state), Some(jid)) = (&self.state, self.session.client().own_jid()) else {
            return;
        };
        let record = AccountRecord {
            jid: jid.to_string(),
            push_name: self.session.client().push_name(),
        };
        if let Err(err) = state.set_account(record) {
            warn!("failed to save account: {err}");
        }
    }
}

#[cfg(test)]
mod tests {
    use std::path::Path;

    use super::*;
    use crate::message::{conversation, spoofed_reply, QuotedPayload};
    use crate::testing::{group, MockClient};

    const OWN: &str = "15551234567@s.whatsapp.net";

    fn message_event(chat: &str, from_me: bool, message: waproto::Message) -> MessageEvent {
        MessageEvent {
            info: proto::MessageInfo {
                id: "MSG1".to_string(),
                chat: chat.to_string(),
                sender: if from_me { OWN.to_string() } else { chat.to_string() },
                is_from_me: from_me,
                ..Default::default()
            },
            message,
        }
    }

    fn text_event(chat: &str, from_me: bool, text: &str) -> MessageEvent {
        message_event(chat, from_me, conversation(text))
    }

    struct Harness {
        client: Arc<MockClient>,
        session: Session,
        handler: EventHandler,
        _dir: tempfile::TempDir,
    }

    fn harness(client: MockClient) -> Harness {
        let dir = tempfile::tempdir().expect("tempdir");
        let client = Arc::new(client);
        let session = Session::new(client.clone(), "3EB0SECRET".to_string());
        let journal = EventJournal::new(dir.path().join("history"), dir.path().join("media"));
        let handler = EventHandler::new(
            session.clone(),
            journal,
            Arc::new(PairingGate::new()),
            Duration::from_millis(20),
        );
        Harness {
            client,
            session,
            handler,
            _dir: dir,
        }
    }

    fn operator() -> MockClient {
        MockClient::new().with_own_jid("15551234567:7@s.whatsapp.net")
    }

    fn last_reply(client: &MockClient) -> (String, String) {
        let (to, message) = client.sent().pop().expect("a reply");
        (to.to_string(), message.conversation.unwrap_or_default())
    }

    fn history_lines(dir: &Path) -> Vec<serde_json::Value> {
        let Ok(entries) = std::fs::read_dir(dir) else {
            return Vec::new();
        };
        entries
            .flat_map(|entry| {
                let contents = std::fs::read_to_string(entry.expect("entry").path()).expect("read");
                contents
                    .lines()
                    .map(|line| serde_json::from_str(line).expect("json"))
                    .collect::<Vec<_>>()
            })
            .collect()
    }

    #[test]
    fn converts_bridge_events() {
        let event = proto::ServerEvent {
            kind: Some(proto::server_event::Kind::AppStateSyncComplete(
                proto::AppStateSyncCompleteEvent {
                    name: "critical_block".to_string(),
                },
            )),
        };
        assert_eq!(
            Event::from_proto(event),
            Some(Event::AppStateSyncComplete {
                name: "critical_block".to_string()
            })
        );
        assert_eq!(Event::from_proto(proto::ServerEvent { kind: None }), None);

        let without_info = proto::ServerEvent {
            kind: Some(proto::server_event::Kind::Message(proto::MessageEvent {
                info: None,
                message: None,
            })),
        };
        assert_eq!(Event::from_proto(without_info), None);
    }

    #[test]
    fn text_comes_from_conversation_or_extended_text() {
        assert_eq!(text_event(OWN, true, "plain").text(), "plain");
        let reply = spoofed_reply("X", &parse_jid("1").expect("jid"), QuotedPayload::Text("q".into()), "extended");
        assert_eq!(message_event(OWN, true, reply).text(), "extended");
    }

    #[test]
    fn triggers_require_the_operator() {
        let own = parse_jid(OWN).expect("jid");
        let secret = "3EB0SECRET";

        let from_other = text_event(OWN, false, "/cmd listgroups");
        assert_eq!(classify(&from_other, secret, Some(&own)), Trigger::None);

        let echo_elsewhere = text_event("1999@s.whatsapp.net", true, "3EB0SECRET please");
        assert_eq!(classify(&echo_elsewhere, secret, Some(&own)), Trigger::SecretEcho);

        let cmd_elsewhere = text_event("1999@s.whatsapp.net", true, "/cmd listgroups");
        assert_eq!(classify(&cmd_elsewhere, secret, Some(&own)), Trigger::None);

        let cmd = text_event(OWN, true, "/cmd getgroup  123@g.us");
        assert_eq!(
            classify(&cmd, secret, Some(&own)),
            Trigger::Command(Some(("getgroup", vec!["123@g.us"])))
        );
        assert_eq!(
            classify(&text_event(OWN, true, "/cmd"), secret, Some(&own)),
            Trigger::Command(None)
        );
        assert_eq!(
            classify(&text_event(OWN, true, "/cmdlistgroups"), secret, Some(&own)),
            Trigger::None
        );
        assert_eq!(
            classify(&text_event(OWN, true, "/setSecrete  "), secret, Some(&own)),
            Trigger::SetSecret(None)
        );
        assert_eq!(
            classify(&text_event(OWN, true, "/setSecrete "), "", None),
            Trigger::None
        );
    }

    #[tokio::test]
    async fn secret_echo_reports_chat_to_own_chat() {
        let h = harness(operator());
        let event = text_event("120363@g.us", true, "3EB0SECRET");

        assert_eq!(h.handler.handle(Event::Message(event)).await, Flow::Continue);

        assert_eq!(
            last_reply(&h.client),
            (OWN.to_string(), "-> Cmd output: \nChatID 120363@g.us".to_string())
        );
    }

    #[tokio::test]
    async fn set_secret_replaces_the_echo_secret() {
        let h = harness(operator());

        h.handler
            .handle(Event::Message(text_event(OWN, true, "/setSecrete opensesame")))
            .await;
        assert_eq!(h.session.echo_secret(), "opensesame");
        assert_eq!(last_reply(&h.client).1, "-> Cmd output: \nSecret set to opensesame");

        h.handler
            .handle(Event::Message(text_event(OWN, true, "/setSecrete")))
            .await;
        assert_eq!(h.session.echo_secret(), "opensesame");
        assert_eq!(last_reply(&h.client).1, "-> Cmd output: \nYou need to set a secret");
    }

    #[tokio::test]
    async fn remote_command_runs_once_and_replies() {
        let h = harness(operator().with_groups(vec![group("120363@g.us", "Team")]));

        h.handler
            .handle(Event::Message(text_event(OWN, true, "/cmd listgroups")))
            .await;

        assert_eq!(h.client.calls(), 2);
        assert_eq!(last_reply(&h.client).1, "-> Cmd output: \nTeam: 120363@g.us\n");

        h.handler.handle(Event::Message(text_event(OWN, true, "/cmd "))).await;
        assert_eq!(last_reply(&h.client).1, "-> Cmd output: \nYou need send a valid command");
    }

    #[tokio::test]
    async fn remote_usage_errors_are_replied() {
        let h = harness(operator());

        h.handler
            .handle(Event::Message(text_event(OWN, true, "/cmd send-spoofed-reply 1555")))
            .await;

        let (_, text) = last_reply(&h.client);
        assert!(text.starts_with("-> Cmd output: \n[send-spoofed-reply] Usage:"), "{text}");
    }

    #[tokio::test]
    async fn ordinary_messages_are_journaled() {
        let h = harness(operator());

        h.handler
            .handle(Event::Message(text_event("1999@s.whatsapp.net", false, "hello")))
            .await;

        assert!(h.client.sent().is_empty());
        let lines = history_lines(&h._dir.path().join("history"));
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0]["kind"], "Message");
        assert_eq!(lines[0]["event"]["info"]["id"], "MSG1");
    }

    #[tokio::test]
    async fn media_is_downloaded_and_saved() {
        let h = harness(operator().with_download(b"\x89PNG fake"));
        let image = waproto::Message {
            image_message: Some(waproto::ImageMessage {
                mimetype: Some("image/png".to_string()),
                direct_path: Some("/v/t62/abc".to_string()),
                media_key: Some(vec![9; 32]),
                ..Default::default()
            }),
            ..Default::default()
        };

        h.handler
            .handle(Event::Message(message_event("1999@s.whatsapp.net", false, image)))
            .await;

        let downloads = h.client.downloads();
        assert_eq!(downloads.len(), 1);
        assert_eq!(downloads[0].media_type, MediaType::Image);
        assert_eq!(downloads[0].direct_path.as_deref(), Some("/v/t62/abc"));

        let lines = history_lines(&h._dir.path().join("history"));
        assert_eq!(lines[0]["kind"], "Message.ImageMessage");
        let file = lines[0]["file"].as_str().expect("file path");
        assert!(file.ends_with(".png"));
        assert_eq!(std::fs::read(file).expect("media"), b"\x89PNG fake");
    }

    #[tokio::test]
    async fn contact_cards_are_saved_without_download() {
        let h = harness(operator());
        let contact = waproto::Message {
            contact_message: Some(waproto::ContactMessage {
                display_name: Some("Ana".to_string()),
                vcard: Some("BEGIN:VCARD\nEND:VCARD".to_string()),
                context_info: None,
            }),
            ..Default::default()
        };

        h.handler
            .handle(Event::Message(message_event("1999@s.whatsapp.net", false, contact)))
            .await;

        assert!(h.client.downloads().is_empty());
        let lines = history_lines(&h._dir.path().join("history"));
        assert_eq!(lines[0]["kind"], "Message.ContactMessage");
    }

    #[tokio::test]
    async fn connected_with_push_name_goes_online_once() {
        let h = harness(operator().with_push_name("Operator"));

        h.handler.handle(Event::Connected).await;
        h.handler
            .handle(Event::PushNameSetting {
                push_name: "Operator".to_string(),
            })
            .await;

        assert_eq!(h.client.presences(), vec![proto::Presence::Available; 2]);
        assert!(h.handler.http_started());
    }

    #[tokio::test]
    async fn connected_without_push_name_stays_quiet() {
        let h = harness(operator());

        h.handler.handle(Event::Connected).await;
        h.handler
            .handle(Event::AppStateSyncComplete {
                name: CRITICAL_BLOCK.to_string(),
            })
            .await;

        assert!(h.client.presences().is_empty());
        assert!(!h.handler.http_started());
    }

    #[tokio::test]
    async fn critical_block_sync_announces_presence() {
        let h = harness(operator().with_push_name("Operator"));

        h.handler
            .handle(Event::AppStateSyncComplete {
                name: "regular".to_string(),
            })
            .await;
        assert!(h.client.presences().is_empty());

        h.handler
            .handle(Event::AppStateSyncComplete {
                name: CRITICAL_BLOCK.to_string(),
            })
            .await;
        assert_eq!(h.client.presences(), vec![proto::Presence::Available]);
    }

    #[tokio::test]
    async fn fatal_events_shut_down() {
        let h = harness(operator());
        assert_eq!(h.handler.handle(Event::StreamReplaced).await, Flow::Shutdown);
        assert_eq!(h.handler.handle(Event::LoggedOut { reason: None }).await, Flow::Shutdown);
        assert_eq!(h.handler.handle(Event::Disconnected).await, Flow::Continue);
    }

    #[tokio::test]
    async fn unanswered_pair_request_is_accepted() {
        let h = harness(operator());

        h.handler
            .handle(Event::PairRequest {
                request_id: "pair-1".to_string(),
                jid: OWN.to_string(),
                platform: "android".to_string(),
                business_name: String::new(),
            })
            .await;

        assert_eq!(h.client.pair_answers(), vec![("pair-1".to_string(), true)]);
    }
}
