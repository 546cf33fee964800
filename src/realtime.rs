use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock};
use std::time::Duration;

use async_trait::async_trait;
use futures_util::stream::SplitStream;
use futures_util::{SinkExt, StreamExt};
use prost::Message;
use rand::{rngs::OsRng, RngCore};
use tokio::sync::{mpsc, oneshot};
use tokio_tungstenite::tungstenite::Message as WsMessage;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tracing::{debug, error, warn};
use url::Url;

use crate::api::MediaApi;
use crate::client::{ClientError, GroupInfo, MediaRef, MediaType, ProtocolClient, SendResponse, UploadResponse};
use crate::jid::{parse_jid, Jid};
use crate::protocol::{proto, waproto};

const RPC_TIMEOUT: Duration = Duration::from_secs(30);

type WsStream = WebSocketStream<MaybeTlsStream<tokio::net::TcpStream>>;
type RpcReply = Result<proto::rpc_result::Result, ClientError>;
type Pending = Arc<Mutex<HashMap<u64, oneshot::Sender<RpcReply>>>>;

#[derive(Clone, Debug)]
pub struct BridgeOptions {
    pub url: String,
    pub media_url: String,
    pub token: String,
    pub device_name: Option<String>,
    pub request_full_sync: bool,
}

#[derive(Default)]
struct Account {
    jid: Option<Jid>,
    push_name: Option<String>,
}

/// Websocket client for the protocol bridge.
///
/// RPC calls are multiplexed over one connection: each call parks a oneshot
/// keyed by its frame id and the reader task completes it. Pushed events are
/// forwarded to the receiver returned from [`BridgeClient::connect`].
pub struct BridgeClient {
    outgoing: mpsc::UnboundedSender<WsMessage>,
    pending: Pending,
    closed: Arc<AtomicBool>,
    id_gen: Mutex<IdGenerator>,
    seq: AtomicU32,
    account: Arc<RwLock<Account>>,
    media: MediaApi,
    rpc_timeout: Duration,
}

impl BridgeClient {
    /// Opens the websocket and sends `ConnectionInit`. Returns as soon as the
    /// init frame is written: QR codes and pair requests arrive before the
    /// bridge opens the session and need a live client to be answered.
    /// `ConnectionOpen` fills in the account from the reader task.
    pub async fn connect(
        options: BridgeOptions,
    ) -> Result<(Self, mpsc::UnboundedReceiver<proto::ServerEvent>), ClientError> {
        let url = Url::parse(&options.url)?;
        let (mut ws, _) = connect_async(url).await?;
        let mut id_gen = IdGenerator::new();

        let init = proto::ConnectionInit {
            token: options.token.clone(),
            client_version: Some(env!("CARGO_PKG_VERSION").to_string()),
            device_name: options.device_name.clone(),
            request_full_sync: options.request_full_sync,
        };
        let message = proto::ClientMessage {
            id: id_gen.next_id(),
            seq: 1,
            body: Some(proto::client_message::Body::ConnectionInit(init)),
        };
        ws.send(WsMessage::Binary(message.encode_to_vec())).await?;

        let (mut sink, stream) = ws.split();
        let (outgoing, mut outgoing_rx) = mpsc::unbounded_channel::<WsMessage>();
        tokio::spawn(async move {
            while let Some(message) = outgoing_rx.recv().await {
                if let Err(err) = sink.send(message).await {
                    warn!("bridge write failed: {err}");
                    break;
                }
            }
            let _ = sink.close().await;
        });

        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let account = Arc::new(RwLock::new(Account::default()));
        let pending: Pending = Arc::new(Mutex::new(HashMap::new()));
        let closed = Arc::new(AtomicBool::new(false));
        tokio::spawn(read_loop(
            stream,
            pending.clone(),
            closed.clone(),
            account.clone(),
            events_tx,
        ));

        let client = Self {
            outgoing,
            pending,
            closed,
            id_gen: Mutex::new(id_gen),
            seq: AtomicU32::new(1),
            account,
            media: MediaApi::new(options.media_url, options.token),
            rpc_timeout: RPC_TIMEOUT,
        };
        Ok((client, events_rx))
    }

    #[cfg(test)]
    fn with_rpc_timeout(mut self, timeout: Duration) -> Self {
        self.rpc_timeout = timeout;
        self
    }

    async fn call_rpc(&self, method: proto::Method, input: proto::rpc_call::Input) -> RpcReply {
        let message_id = self.next_id();
        let (tx, rx) = oneshot::channel();
        lock_pending(&self.pending).insert(message_id, tx);
        // The reader raises `closed` before draining, so a call registered
        // after the drain is caught here.
        if self.closed.load(Ordering::SeqCst) {
            lock_pending(&self.pending).remove(&message_id);
            return Err(ClientError::Closed);
        }

        let message = proto::ClientMessage {
            id: message_id,
            seq: self.next_seq(),
            body: Some(proto::client_message::Body::RpcCall(proto::RpcCall {
                method: method as i32,
                input: Some(input),
            })),
        };
        if self.outgoing.send(WsMessage::Binary(message.encode_to_vec())).is_err() {
            lock_pending(&self.pending).remove(&message_id);
            return Err(ClientError::Closed);
        }

        match tokio::time::timeout(self.rpc_timeout, rx).await {
            Ok(Ok(reply)) => reply,
            Ok(Err(_)) => Err(ClientError::Closed),
            Err(_) => {
                lock_pending(&self.pending).remove(&message_id);
                Err(ClientError::Timeout)
            }
        }
    }

    fn next_seq(&self) -> u32 {
        self.seq.fetch_add(1, Ordering::Relaxed).wrapping_add(1)
    }

    fn next_id(&self) -> u64 {
        self.id_gen
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .next_id()
    }
}

#[async_trait]
impl ProtocolClient for BridgeClient {
    async fn send_message(&self, to: &Jid, message: waproto::Message) -> Result<SendResponse, ClientError> {
        let input = proto::SendMessageInput {
            to: to.to_string(),
            message: Some(message),
        };
        match self
            .call_rpc(proto::Method::SendMessage, proto::rpc_call::Input::SendMessage(input))
            .await?
        {
            proto::rpc_result::Result::SendMessage(payload) => Ok(payload),
            _ => Err(ClientError::UnexpectedResult("sendMessage")),
        }
    }

    async fn get_group_info(&self, jid: &Jid) -> Result<GroupInfo, ClientError> {
        let input = proto::GetGroupInfoInput { jid: jid.to_string() };
        match self
            .call_rpc(proto::Method::GetGroupInfo, proto::rpc_call::Input::GetGroupInfo(input))
            .await?
        {
            proto::rpc_result::Result::GetGroupInfo(payload) => Ok(payload),
            _ => Err(ClientError::UnexpectedResult("getGroupInfo")),
        }
    }

    async fn get_joined_groups(&self) -> Result<Vec<GroupInfo>, ClientError> {
        match self
            .call_rpc(
                proto::Method::GetJoinedGroups,
                proto::rpc_call::Input::GetJoinedGroups(proto::GetJoinedGroupsInput {}),
            )
            .await?
        {
            proto::rpc_result::Result::GetJoinedGroups(payload) => Ok(payload.groups),
            _ => Err(ClientError::UnexpectedResult("getJoinedGroups")),
        }
    }

    async fn upload(&self, data: Vec<u8>, media_type: MediaType) -> Result<UploadResponse, ClientError> {
        Ok(self.media.upload(data, media_type).await?)
    }

    async fn download(&self, media: &MediaRef) -> Result<Vec<u8>, ClientError> {
        Ok(self.media.download(media).await?)
    }

    fn generate_message_id(&self) -> String {
        let mut bytes = [0u8; 8];
        OsRng.fill_bytes(&mut bytes);
        let mut id = String::from("3EB0");
        for byte in bytes {
            id.push_str(&format!("{byte:02X}"));
        }
        id
    }

    async fn send_presence(&self, presence: proto::Presence) -> Result<(), ClientError> {
        let input = proto::SendPresenceInput {
            presence: presence as i32,
        };
        self.call_rpc(proto::Method::SendPresence, proto::rpc_call::Input::SendPresence(input))
            .await
            .map(|_| ())
    }

    async fn answer_pair_request(&self, request_id: &str, accept: bool) -> Result<(), ClientError> {
        let input = proto::AnswerPairRequestInput {
            request_id: request_id.to_string(),
            accept,
        };
        self.call_rpc(
            proto::Method::AnswerPairRequest,
            proto::rpc_call::Input::AnswerPairRequest(input),
        )
        .await
        .map(|_| ())
    }

    fn own_jid(&self) -> Option<Jid> {
        self.account
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .jid
            .clone()
    }

    fn push_name(&self) -> Option<String> {
        self.account
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .push_name
            .clone()
    }

    async fn disconnect(&self) {
        let result = self
            .call_rpc(
                proto::Method::Disconnect,
                proto::rpc_call::Input::Disconnect(proto::DisconnectInput {}),
            )
            .await;
        if let Err(err) = result {
            debug!("disconnect: {err}");
        }
        let _ = self.outgoing.send(WsMessage::Close(None));
    }
}

async fn read_loop(
    mut stream: SplitStream<WsStream>,
    pending: Pending,
    closed: Arc<AtomicBool>,
    account: Arc<RwLock<Account>>,
    events: mpsc::UnboundedSender<proto::ServerEvent>,
) {
    let mut refused = None;
    while let Some(message) = stream.next().await {
        let data = match message {
            Ok(WsMessage::Binary(data)) => data,
            Ok(WsMessage::Close(_)) => break,
            Ok(_) => continue,
            Err(err) => {
                warn!("bridge read failed: {err}");
                break;
            }
        };
        let decoded = match proto::ServerProtocolMessage::decode(&*data) {
            Ok(decoded) => decoded,
            Err(err) => {
                warn!("dropping undecodable bridge frame: {err}");
                continue;
            }
        };

        match decoded.body {
            Some(proto::server_protocol_message::Body::ConnectionOpen(open)) => {
                debug!("bridge session open");
                open_account(&account, open);
            }
            Some(proto::server_protocol_message::Body::RpcResult(result)) => {
                let reply = result.result.ok_or(ClientError::MissingResult);
                complete(&pending, result.req_msg_id, reply);
            }
            Some(proto::server_protocol_message::Body::RpcError(rpc_error)) => {
                let req_msg_id = rpc_error.req_msg_id;
                let friendly = format_rpc_error(rpc_error.error_code, &rpc_error.message, rpc_error.code);
                complete(
                    &pending,
                    req_msg_id,
                    Err(ClientError::Rpc {
                        code: rpc_error.code,
                        error_code: rpc_error.error_code,
                        message: rpc_error.message,
                        friendly,
                    }),
                );
            }
            Some(proto::server_protocol_message::Body::Event(event)) => {
                track_account(&account, &event);
                if events.send(event).is_err() {
                    debug!("event receiver dropped");
                }
            }
            Some(proto::server_protocol_message::Body::ConnectionError(connection_error)) => {
                let reason = connection_error
                    .reason
                    .unwrap_or_else(|| "rejected by bridge".to_string());
                error!("bridge connection error: {reason}");
                refused = Some(reason);
                break;
            }
            None => {}
        }
    }

    closed.store(true, Ordering::SeqCst);
    let waiting: Vec<_> = lock_pending(&pending).drain().collect();
    for (_, tx) in waiting {
        let error = match &refused {
            Some(reason) => ClientError::Connection(reason.clone()),
            None => ClientError::Closed,
        };
        let _ = tx.send(Err(error));
    }
}

fn complete(pending: &Pending, req_msg_id: u64, reply: RpcReply) {
    match lock_pending(pending).remove(&req_msg_id) {
        Some(tx) => {
            let _ = tx.send(reply);
        }
        None => debug!("reply for unknown request {req_msg_id}"),
    }
}

fn open_account(account: &RwLock<Account>, open: proto::ConnectionOpen) {
    let mut account = account.write().unwrap_or_else(PoisonError::into_inner);
    if let Some(jid) = open.own_jid.as_deref().and_then(|jid| parse_jid(jid).ok()) {
        account.jid = Some(jid);
    }
    if let Some(push_name) = open.push_name.filter(|name| !name.is_empty()) {
        account.push_name = Some(push_name);
    }
}

fn track_account(account: &RwLock<Account>, event: &proto::ServerEvent) {
    let mut account = account.write().unwrap_or_else(PoisonError::into_inner);
    match &event.kind {
        Some(proto::server_event::Kind::PushNameSetting(setting)) => {
            account.push_name = Some(setting.push_name.clone()).filter(|name| !name.is_empty());
        }
        Some(proto::server_event::Kind::PairSuccess(success)) => {
            account.jid = parse_jid(&success.jid).ok();
            if let Some(push_name) = success.push_name.clone().filter(|name| !name.is_empty()) {
                account.push_name = Some(push_name);
            }
        }
        _ => {}
    }
}

fn lock_pending(pending: &Pending) -> MutexGuard<'_, HashMap<u64, oneshot::Sender<RpcReply>>> {
    pending.lock().unwrap_or_else(PoisonError::into_inner)
}

fn format_rpc_error(error_code: i32, message: &str, status_code: i32) -> String {
    let label = match error_code {
        1 => "Bad request",
        2 => "Not authenticated",
        3 => "Rate limited",
        4 => "Internal bridge error",
        5 => "Invalid JID",
        6 => "Not logged in",
        7 => "Group not found",
        8 => "Not a group participant",
        9 => "Media upload failed",
        10 => "Message rejected by server",
        _ => "Unknown RPC error",
    };

    let mut formatted = String::from(label);
    if !message.is_empty() && !message.eq_ignore_ascii_case(label) {
        formatted.push_str(": ");
        formatted.push_str(message);
    }
    if status_code != 0 {
        formatted.push_str(&format!(" (code {status_code})"));
    }
    formatted
}

struct IdGenerator {
    last_timestamp: u64,
    sequence: u32,
}

impl IdGenerator {
    fn new() -> Self {
        Self {
            last_timestamp: 0,
            sequence: 0,
        }
    }

    fn next_id(&mut self) -> u64 {
        let timestamp = current_epoch_seconds().saturating_sub(EPOCH_SECONDS);
        if timestamp == self.last_timestamp {
            self.sequence = self.sequence.wrapping_add(1);
        } else {
            self.sequence = 0;
            self.last_timestamp = timestamp;
        }

        (timestamp << 32) | self.sequence as u64
    }
}

const EPOCH_SECONDS: u64 = 1_735_689_600; // 2025-01-01T00:00:00Z

fn current_epoch_seconds() -> u64 {
    use std::time::{SystemTime, UNIX_EPOCH};
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}

#[cfg(test)]
mod tests {
    use tokio::net::{TcpListener, TcpStream};
    use tokio_tungstenite::accept_async;

    use super::*;
    use crate::events::{Event, EventHandler, Flow};
    use crate::journal::EventJournal;
    use crate::message::conversation;
    use crate::pairing::PairingGate;
    use crate::session::Session;

    use proto::server_protocol_message::Body;

    type BridgeSocket = WebSocketStream<TcpStream>;

    async fn connect_pair() -> (BridgeClient, mpsc::UnboundedReceiver<proto::ServerEvent>, BridgeSocket) {
        let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
        let addr = listener.local_addr().expect("addr");
        let accept = tokio::spawn(async move {
            let (stream, _) = listener.accept().await.expect("accept");
            accept_async(stream).await.expect("websocket handshake")
        });

        let options = BridgeOptions {
            url: format!("ws://{addr}/bridge"),
            media_url: format!("http://{addr}/media"),
            token: "bridge-token".to_string(),
            device_name: Some("test-host".to_string()),
            request_full_sync: false,
        };
        let (client, events) = tokio::time::timeout(Duration::from_secs(2), BridgeClient::connect(options))
            .await
            .expect("connect returns before the session opens")
            .expect("connect");
        let mut bridge = accept.await.expect("accept task");

        let init = read_frame(&mut bridge).await;
        match init.body {
            Some(proto::client_message::Body::ConnectionInit(init)) => {
                assert_eq!(init.token, "bridge-token");
                assert_eq!(init.device_name.as_deref(), Some("test-host"));
            }
            other => panic!("expected ConnectionInit, got {other:?}"),
        }
        (client, events, bridge)
    }

    async fn read_frame(bridge: &mut BridgeSocket) -> proto::ClientMessage {
        loop {
            match bridge.next().await.expect("client frame").expect("frame") {
                WsMessage::Binary(data) => return proto::ClientMessage::decode(&*data).expect("decode"),
                _ => continue,
            }
        }
    }

    async fn read_call(bridge: &mut BridgeSocket) -> (u64, proto::RpcCall) {
        let message = read_frame(bridge).await;
        match message.body {
            Some(proto::client_message::Body::RpcCall(call)) => (message.id, call),
            other => panic!("expected RpcCall, got {other:?}"),
        }
    }

    async fn push(bridge: &mut BridgeSocket, body: Body) {
        let message = proto::ServerProtocolMessage { id: 0, body: Some(body) };
        bridge
            .send(WsMessage::Binary(message.encode_to_vec()))
            .await
            .expect("push frame");
    }

    fn event(kind: proto::server_event::Kind) -> Body {
        Body::Event(proto::ServerEvent { kind: Some(kind) })
    }

    fn empty_result(req_msg_id: u64) -> Body {
        Body::RpcResult(proto::RpcResult {
            req_msg_id,
            result: Some(proto::rpc_result::Result::Empty(proto::EmptyResult {})),
        })
    }

    #[tokio::test]
    async fn pairing_is_answered_before_the_session_opens() {
        let (client, mut events, mut bridge) = connect_pair().await;
        push(
            &mut bridge,
            event(proto::server_event::Kind::QrCode(proto::QrCodeEvent {
                code: "2@abc".to_string(),
            })),
        )
        .await;
        push(
            &mut bridge,
            event(proto::server_event::Kind::PairRequest(proto::PairRequestEvent {
                request_id: "pair-1".to_string(),
                jid: "15551234567:4@s.whatsapp.net".to_string(),
                platform: "chrome".to_string(),
                business_name: String::new(),
            })),
        )
        .await;

        let bridge_side = tokio::spawn(async move {
            let (id, call) = read_call(&mut bridge).await;
            push(&mut bridge, empty_result(id)).await;
            push(
                &mut bridge,
                Body::ConnectionOpen(proto::ConnectionOpen {
                    own_jid: Some("15551234567:4@s.whatsapp.net".to_string()),
                    push_name: Some("Operator".to_string()),
                }),
            )
            .await;
            push(
                &mut bridge,
                event(proto::server_event::Kind::Connected(proto::ConnectedEvent {})),
            )
            .await;
            (call, bridge)
        });

        let client = Arc::new(client);
        let dir = tempfile::tempdir().expect("tempdir");
        let handler = EventHandler::new(
            Session::new(client.clone(), String::new()),
            EventJournal::new(dir.path().join("history"), dir.path().join("media")),
            Arc::new(PairingGate::new()),
            Duration::from_millis(20),
        );

        let qr = Event::from_proto(events.recv().await.expect("qr event")).expect("known event");
        assert_eq!(qr, Event::QrCode { code: "2@abc".to_string() });
        assert_eq!(handler.handle(qr).await, Flow::Continue);
        let pair = Event::from_proto(events.recv().await.expect("pair event")).expect("known event");
        assert!(matches!(pair, Event::PairRequest { .. }));
        assert_eq!(handler.handle(pair).await, Flow::Continue);

        let (call, _bridge) = bridge_side.await.expect("bridge task");
        assert_eq!(call.method, proto::Method::AnswerPairRequest as i32);
        assert_eq!(
            call.input,
            Some(proto::rpc_call::Input::AnswerPairRequest(proto::AnswerPairRequestInput {
                request_id: "pair-1".to_string(),
                accept: true,
            }))
        );

        let connected = events.recv().await.expect("connected event");
        assert!(matches!(connected.kind, Some(proto::server_event::Kind::Connected(_))));
        assert_eq!(client.own_jid().map(|jid| jid.user), Some("15551234567".to_string()));
        assert_eq!(client.push_name().as_deref(), Some("Operator"));
    }

    #[tokio::test]
    async fn rpc_replies_are_matched_by_request_id() {
        let (client, _events, mut bridge) = connect_pair().await;
        let bridge_side = tokio::spawn(async move {
            let (id, call) = read_call(&mut bridge).await;
            push(
                &mut bridge,
                Body::RpcResult(proto::RpcResult {
                    req_msg_id: id.wrapping_add(1_000),
                    result: Some(proto::rpc_result::Result::SendMessage(proto::SendMessageResult {
                        id: "STRAY".to_string(),
                        timestamp: 1,
                    })),
                }),
            )
            .await;
            push(
                &mut bridge,
                Body::RpcResult(proto::RpcResult {
                    req_msg_id: id,
                    result: Some(proto::rpc_result::Result::SendMessage(proto::SendMessageResult {
                        id: "3EB0CAFE".to_string(),
                        timestamp: 1_700_000_000,
                    })),
                }),
            )
            .await;

            let (id, _) = read_call(&mut bridge).await;
            push(
                &mut bridge,
                Body::RpcError(proto::RpcError {
                    req_msg_id: id,
                    error_code: 7,
                    message: "120363@g.us".to_string(),
                    code: 404,
                    ..Default::default()
                }),
            )
            .await;
            (call, bridge)
        });

        let to = parse_jid("+15551234567").expect("jid");
        let response = client.send_message(&to, conversation("hi")).await.expect("send");
        assert_eq!(response.id, "3EB0CAFE");
        assert_eq!(response.timestamp, 1_700_000_000);

        let err = client
            .get_group_info(&parse_jid("120363@g.us").expect("jid"))
            .await
            .expect_err("group lookup fails");
        match err {
            ClientError::Rpc { code, friendly, .. } => {
                assert_eq!(code, 404);
                assert_eq!(friendly, "Group not found: 120363@g.us (code 404)");
            }
            other => panic!("expected rpc error, got {other:?}"),
        }

        let (call, _bridge) = bridge_side.await.expect("bridge task");
        assert_eq!(call.method, proto::Method::SendMessage as i32);
        match call.input {
            Some(proto::rpc_call::Input::SendMessage(input)) => {
                assert_eq!(input.to, "15551234567@s.whatsapp.net");
                assert_eq!(
                    input.message.and_then(|message| message.conversation).as_deref(),
                    Some("hi")
                );
            }
            other => panic!("expected SendMessage input, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn closing_the_socket_fails_pending_calls() {
        let (client, mut events, mut bridge) = connect_pair().await;
        let bridge_side = tokio::spawn(async move {
            read_call(&mut bridge).await;
            bridge.close(None).await.expect("close");
        });

        let result = client.get_joined_groups().await;
        assert!(matches!(result, Err(ClientError::Closed)));
        bridge_side.await.expect("bridge task");
        assert!(events.recv().await.is_none());

        let after = client.send_presence(proto::Presence::Available).await;
        assert!(matches!(after, Err(ClientError::Closed)));
    }

    #[tokio::test]
    async fn refused_session_fails_pending_calls_with_the_reason() {
        let (client, mut events, mut bridge) = connect_pair().await;
        let bridge_side = tokio::spawn(async move {
            read_call(&mut bridge).await;
            push(
                &mut bridge,
                Body::ConnectionError(proto::ConnectionError {
                    reason: Some("token revoked".to_string()),
                }),
            )
            .await;
            bridge
        });

        let result = client.get_joined_groups().await;
        match result {
            Err(ClientError::Connection(reason)) => assert_eq!(reason, "token revoked"),
            other => panic!("expected connection error, got {other:?}"),
        }
        let _bridge = bridge_side.await.expect("bridge task");
        assert!(events.recv().await.is_none());
    }

    #[tokio::test]
    async fn unanswered_calls_time_out() {
        let (client, _events, mut bridge) = connect_pair().await;
        let client = client.with_rpc_timeout(Duration::from_millis(50));
        let bridge_side = tokio::spawn(async move {
            read_call(&mut bridge).await;
            bridge
        });

        let result = client.send_presence(proto::Presence::Available).await;
        assert!(matches!(result, Err(ClientError::Timeout)));
        assert!(lock_pending(&client.pending).is_empty());
        let _bridge = bridge_side.await.expect("bridge task");
    }

    #[test]
    fn rpc_error_label_includes_detail_and_code() {
        assert_eq!(
            format_rpc_error(7, "120363@g.us", 404),
            "Group not found: 120363@g.us (code 404)"
        );
        assert_eq!(format_rpc_error(2, "not authenticated", 0), "Not authenticated");
        assert_eq!(format_rpc_error(99, "", 0), "Unknown RPC error");
    }

    #[test]
    fn id_generator_is_monotonic_within_a_second() {
        let mut id_gen = IdGenerator::new();
        let first = id_gen.next_id();
        let second = id_gen.next_id();
        assert!(second > first);
    }

    #[test]
    fn push_name_and_pairing_update_account() {
        let account = RwLock::new(Account::default());
        track_account(
            &account,
            &proto::ServerEvent {
                kind: Some(proto::server_event::Kind::PairSuccess(proto::PairSuccessEvent {
                    jid: "15551234567:3@s.whatsapp.net".to_string(),
                    push_name: None,
                })),
            },
        );
        track_account(
            &account,
            &proto::ServerEvent {
                kind: Some(proto::server_event::Kind::PushNameSetting(proto::PushNameSettingEvent {
                    push_name: "Operator".to_string(),
                })),
            },
        );

        let account = account.read().expect("lock");
        assert_eq!(account.jid.as_ref().map(|jid| jid.user.as_str()), Some("15551234567"));
        assert_eq!(account.push_name.as_deref(), Some("Operator"));
    }

    #[test]
    fn pending_calls_fail_when_completed_with_unknown_id() {
        let pending: Pending = Arc::new(Mutex::new(HashMap::new()));
        let (tx, mut rx) = oneshot::channel();
        lock_pending(&pending).insert(5, tx);
        complete(&pending, 6, Err(ClientError::Closed));
        assert!(rx.try_recv().is_err());
        complete(&pending, 5, Err(ClientError::Timeout));
        assert!(matches!(rx.try_recv(), Ok(Err(ClientError::Timeout))));
    }
}
