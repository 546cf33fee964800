//! Wire types shared with the protocol bridge.
//!
//! `waproto` mirrors the subset of the messaging payload schema this relay
//! builds or inspects. `proto` holds the bridge framing: the handshake, RPC
//! calls and results, and the pushed event stream.

pub mod waproto {
    use serde::{Deserialize, Serialize};

    #[derive(Clone, PartialEq, ::prost::Message, Serialize, Deserialize)]
    pub struct Message {
        #[prost(string, optional, tag = "1")]
        pub conversation: Option<String>,
        #[prost(message, optional, tag = "3")]
        pub image_message: Option<ImageMessage>,
        #[prost(message, optional, tag = "4")]
        pub contact_message: Option<ContactMessage>,
        #[prost(message, optional, tag = "5")]
        pub location_message: Option<LocationMessage>,
        #[prost(message, optional, tag = "6")]
        pub extended_text_message: Option<ExtendedTextMessage>,
        #[prost(message, optional, tag = "7")]
        pub document_message: Option<DocumentMessage>,
        #[prost(message, optional, tag = "8")]
        pub audio_message: Option<AudioMessage>,
        #[prost(message, optional, tag = "9")]
        pub video_message: Option<VideoMessage>,
        #[prost(message, optional, tag = "26")]
        pub sticker_message: Option<StickerMessage>,
    }

    /// Reply metadata. `participant` is asserted by the sender and is not
    /// checked by receiving clients.
    #[derive(Clone, PartialEq, ::prost::Message, Serialize, Deserialize)]
    pub struct ContextInfo {
        #[prost(string, optional, tag = "1")]
        pub stanza_id: Option<String>,
        #[prost(string, optional, tag = "2")]
        pub participant: Option<String>,
        #[prost(message, optional, boxed, tag = "3")]
        pub quoted_message: Option<Box<Message>>,
        #[prost(string, optional, tag = "4")]
        pub remote_jid: Option<String>,
    }

    #[derive(Clone, PartialEq, ::prost::Message, Serialize, Deserialize)]
    pub struct ExtendedTextMessage {
        #[prost(string, optional, tag = "1")]
        pub text: Option<String>,
        #[prost(message, optional, tag = "17")]
        pub context_info: Option<ContextInfo>,
    }

    #[derive(Clone, PartialEq, ::prost::Message, Serialize, Deserialize)]
    pub struct ImageMessage {
        #[prost(string, optional, tag = "1")]
        pub url: Option<String>,
        #[prost(string, optional, tag = "2")]
        pub mimetype: Option<String>,
        #[prost(string, optional, tag = "3")]
        pub caption: Option<String>,
        #[prost(bytes = "vec", optional, tag = "4")]
        pub file_sha256: Option<Vec<u8>>,
        #[prost(uint64, optional, tag = "5")]
        pub file_length: Option<u64>,
        #[prost(uint32, optional, tag = "6")]
        pub height: Option<u32>,
        #[prost(uint32, optional, tag = "7")]
        pub width: Option<u32>,
        #[prost(bytes = "vec", optional, tag = "8")]
        pub media_key: Option<Vec<u8>>,
        #[prost(bytes = "vec", optional, tag = "9")]
        pub file_enc_sha256: Option<Vec<u8>>,
        #[prost(string, optional, tag = "11")]
        pub direct_path: Option<String>,
        #[prost(bytes = "vec", optional, tag = "16")]
        pub jpeg_thumbnail: Option<Vec<u8>>,
        #[prost(message, optional, tag = "17")]
        pub context_info: Option<ContextInfo>,
    }

    #[derive(Clone, PartialEq, ::prost::Message, Serialize, Deserialize)]
    pub struct LocationMessage {
        #[prost(double, optional, tag = "1")]
        pub degrees_latitude: Option<f64>,
        #[prost(double, optional, tag = "2")]
        pub degrees_longitude: Option<f64>,
        #[prost(string, optional, tag = "3")]
        pub name: Option<String>,
        #[prost(string, optional, tag = "4")]
        pub address: Option<String>,
        #[prost(bytes = "vec", optional, tag = "16")]
        pub jpeg_thumbnail: Option<Vec<u8>>,
        #[prost(message, optional, tag = "17")]
        pub context_info: Option<ContextInfo>,
    }

    #[derive(Clone, PartialEq, ::prost::Message, Serialize, Deserialize)]
    pub struct ContactMessage {
        #[prost(string, optional, tag = "1")]
        pub display_name: Option<String>,
        #[prost(string, optional, tag = "16")]
        pub vcard: Option<String>,
        #[prost(message, optional, tag = "17")]
        pub context_info: Option<ContextInfo>,
    }

    #[derive(Clone, PartialEq, ::prost::Message, Serialize, Deserialize)]
    pub struct DocumentMessage {
        #[prost(string, optional, tag = "1")]
        pub url: Option<String>,
        #[prost(string, optional, tag = "2")]
        pub mimetype: Option<String>,
        #[prost(string, optional, tag = "3")]
        pub title: Option<String>,
        #[prost(bytes = "vec", optional, tag = "4")]
        pub file_sha256: Option<Vec<u8>>,
        #[prost(uint64, optional, tag = "5")]
        pub file_length: Option<u64>,
        #[prost(bytes = "vec", optional, tag = "7")]
        pub media_key: Option<Vec<u8>>,
        #[prost(string, optional, tag = "8")]
        pub file_name: Option<String>,
        #[prost(bytes = "vec", optional, tag = "9")]
        pub file_enc_sha256: Option<Vec<u8>>,
        #[prost(string, optional, tag = "10")]
        pub direct_path: Option<String>,
    }

    #[derive(Clone, PartialEq, ::prost::Message, Serialize, Deserialize)]
    pub struct AudioMessage {
        #[prost(string, optional, tag = "1")]
        pub url: Option<String>,
        #[prost(string, optional, tag = "2")]
        pub mimetype: Option<String>,
        #[prost(bytes = "vec", optional, tag = "3")]
        pub file_sha256: Option<Vec<u8>>,
        #[prost(uint64, optional, tag = "4")]
        pub file_length: Option<u64>,
        #[prost(bytes = "vec", optional, tag = "7")]
        pub media_key: Option<Vec<u8>>,
        #[prost(bytes = "vec", optional, tag = "8")]
        pub file_enc_sha256: Option<Vec<u8>>,
        #[prost(string, optional, tag = "9")]
        pub direct_path: Option<String>,
    }

    #[derive(Clone, PartialEq, ::prost::Message, Serialize, Deserialize)]
    pub struct VideoMessage {
        #[prost(string, optional, tag = "1")]
        pub url: Option<String>,
        #[prost(string, optional, tag = "2")]
        pub mimetype: Option<String>,
        #[prost(bytes = "vec", optional, tag = "3")]
        pub file_sha256: Option<Vec<u8>>,
        #[prost(uint64, optional, tag = "4")]
        pub file_length: Option<u64>,
        #[prost(bytes = "vec", optional, tag = "6")]
        pub media_key: Option<Vec<u8>>,
        #[prost(string, optional, tag = "7")]
        pub caption: Option<String>,
        #[prost(bytes = "vec", optional, tag = "11")]
        pub file_enc_sha256: Option<Vec<u8>>,
        #[prost(string, optional, tag = "13")]
        pub direct_path: Option<String>,
    }

    #[derive(Clone, PartialEq, ::prost::Message, Serialize, Deserialize)]
    pub struct StickerMessage {
        #[prost(string, optional, tag = "1")]
        pub url: Option<String>,
        #[prost(bytes = "vec", optional, tag = "2")]
        pub file_sha256: Option<Vec<u8>>,
        #[prost(bytes = "vec", optional, tag = "3")]
        pub file_enc_sha256: Option<Vec<u8>>,
        #[prost(bytes = "vec", optional, tag = "4")]
        pub media_key: Option<Vec<u8>>,
        #[prost(string, optional, tag = "5")]
        pub mimetype: Option<String>,
        #[prost(string, optional, tag = "8")]
        pub direct_path: Option<String>,
        #[prost(uint64, optional, tag = "9")]
        pub file_length: Option<u64>,
    }
}

pub mod proto {
    use serde::{Deserialize, Serialize};

    use super::waproto;

    #[derive(Clone, PartialEq, ::prost::Message, Serialize, Deserialize)]
    pub struct ClientMessage {
        #[prost(uint64, tag = "1")]
        pub id: u64,
        #[prost(uint32, tag = "2")]
        pub seq: u32,
        #[prost(oneof = "client_message::Body", tags = "3, 4")]
        pub body: Option<client_message::Body>,
    }

    pub mod client_message {
        use serde::{Deserialize, Serialize};

        #[derive(Clone, PartialEq, ::prost::Oneof, Serialize, Deserialize)]
        pub enum Body {
            #[prost(message, tag = "3")]
            ConnectionInit(super::ConnectionInit),
            #[prost(message, tag = "4")]
            RpcCall(super::RpcCall),
        }
    }

    #[derive(Clone, PartialEq, ::prost::Message, Serialize, Deserialize)]
    pub struct ConnectionInit {
        #[prost(string, tag = "1")]
        pub token: String,
        #[prost(string, optional, tag = "2")]
        pub client_version: Option<String>,
        #[prost(string, optional, tag = "3")]
        pub device_name: Option<String>,
        #[prost(bool, tag = "4")]
        pub request_full_sync: bool,
    }

    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, ::prost::Enumeration, Serialize, Deserialize)]
    #[repr(i32)]
    pub enum Method {
        Unspecified = 0,
        SendMessage = 1,
        GetGroupInfo = 2,
        GetJoinedGroups = 3,
        SendPresence = 4,
        AnswerPairRequest = 5,
        Disconnect = 6,
    }

    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, ::prost::Enumeration, Serialize, Deserialize)]
    #[repr(i32)]
    pub enum Presence {
        Available = 0,
        Unavailable = 1,
    }

    #[derive(Clone, PartialEq, ::prost::Message, Serialize, Deserialize)]
    pub struct RpcCall {
        #[prost(enumeration = "Method", tag = "1")]
        pub method: i32,
        #[prost(oneof = "rpc_call::Input", tags = "2, 3, 4, 5, 6, 7")]
        pub input: Option<rpc_call::Input>,
    }

    pub mod rpc_call {
        use serde::{Deserialize, Serialize};

        #[derive(Clone, PartialEq, ::prost::Oneof, Serialize, Deserialize)]
        pub enum Input {
            #[prost(message, tag = "2")]
            SendMessage(super::SendMessageInput),
            #[prost(message, tag = "3")]
            GetGroupInfo(super::GetGroupInfoInput),
            #[prost(message, tag = "4")]
            GetJoinedGroups(super::GetJoinedGroupsInput),
            #[prost(message, tag = "5")]
            SendPresence(super::SendPresenceInput),
            #[prost(message, tag = "6")]
            AnswerPairRequest(super::AnswerPairRequestInput),
            #[prost(message, tag = "7")]
            Disconnect(super::DisconnectInput),
        }
    }

    #[derive(Clone, PartialEq, ::prost::Message, Serialize, Deserialize)]
    pub struct SendMessageInput {
        #[prost(string, tag = "1")]
        pub to: String,
        #[prost(message, optional, tag = "2")]
        pub message: Option<waproto::Message>,
    }

    #[derive(Clone, PartialEq, ::prost::Message, Serialize, Deserialize)]
    pub struct GetGroupInfoInput {
        #[prost(string, tag = "1")]
        pub jid: String,
    }

    #[derive(Clone, PartialEq, ::prost::Message, Serialize, Deserialize)]
    pub struct GetJoinedGroupsInput {}

    #[derive(Clone, PartialEq, ::prost::Message, Serialize, Deserialize)]
    pub struct SendPresenceInput {
        #[prost(enumeration = "Presence", tag = "1")]
        pub presence: i32,
    }

    #[derive(Clone, PartialEq, ::prost::Message, Serialize, Deserialize)]
    pub struct AnswerPairRequestInput {
        #[prost(string, tag = "1")]
        pub request_id: String,
        #[prost(bool, tag = "2")]
        pub accept: bool,
    }

    #[derive(Clone, PartialEq, ::prost::Message, Serialize, Deserialize)]
    pub struct DisconnectInput {}

    #[derive(Clone, PartialEq, ::prost::Message, Serialize, Deserialize)]
    pub struct ServerProtocolMessage {
        #[prost(uint64, tag = "1")]
        pub id: u64,
        #[prost(oneof = "server_protocol_message::Body", tags = "2, 3, 4, 5, 6")]
        pub body: Option<server_protocol_message::Body>,
    }

    pub mod server_protocol_message {
        use serde::{Deserialize, Serialize};

        #[derive(Clone, PartialEq, ::prost::Oneof, Serialize, Deserialize)]
        pub enum Body {
            #[prost(message, tag = "2")]
            ConnectionOpen(super::ConnectionOpen),
            #[prost(message, tag = "3")]
            ConnectionError(super::ConnectionError),
            #[prost(message, tag = "4")]
            RpcResult(super::RpcResult),
            #[prost(message, tag = "5")]
            RpcError(super::RpcError),
            #[prost(message, tag = "6")]
            Event(super::ServerEvent),
        }
    }

    #[derive(Clone, PartialEq, ::prost::Message, Serialize, Deserialize)]
    pub struct ConnectionOpen {
        #[prost(string, optional, tag = "1")]
        pub own_jid: Option<String>,
        #[prost(string, optional, tag = "2")]
        pub push_name: Option<String>,
    }

    #[derive(Clone, PartialEq, ::prost::Message, Serialize, Deserialize)]
    pub struct ConnectionError {
        #[prost(string, optional, tag = "1")]
        pub reason: Option<String>,
    }

    #[derive(Clone, PartialEq, ::prost::Message, Serialize, Deserialize)]
    pub struct RpcResult {
        #[prost(uint64, tag = "1")]
        pub req_msg_id: u64,
        #[prost(oneof = "rpc_result::Result", tags = "2, 3, 4, 5")]
        pub result: Option<rpc_result::Result>,
    }

    pub mod rpc_result {
        use serde::{Deserialize, Serialize};

        #[derive(Clone, PartialEq, ::prost::Oneof, Serialize, Deserialize)]
        pub enum Result {
            #[prost(message, tag = "2")]
            SendMessage(super::SendMessageResult),
            #[prost(message, tag = "3")]
            GetGroupInfo(super::GroupInfo),
            #[prost(message, tag = "4")]
            GetJoinedGroups(super::GetJoinedGroupsResult),
            #[prost(message, tag = "5")]
            Empty(super::EmptyResult),
        }
    }

    #[derive(Clone, PartialEq, ::prost::Message, Serialize, Deserialize)]
    pub struct RpcError {
        #[prost(uint64, tag = "1")]
        pub req_msg_id: u64,
        #[prost(int32, tag = "2")]
        pub error_code: i32,
        #[prost(string, tag = "3")]
        pub message: String,
        #[prost(int32, tag = "4")]
        pub code: i32,
    }

    #[derive(Clone, PartialEq, ::prost::Message, Serialize, Deserialize)]
    pub struct SendMessageResult {
        #[prost(string, tag = "1")]
        pub id: String,
        #[prost(int64, tag = "2")]
        pub timestamp: i64,
    }

    #[derive(Clone, PartialEq, ::prost::Message, Serialize, Deserialize)]
    pub struct EmptyResult {}

    #[derive(Clone, PartialEq, ::prost::Message, Serialize, Deserialize)]
    pub struct GroupParticipant {
        #[prost(string, tag = "1")]
        pub jid: String,
        #[prost(bool, tag = "2")]
        pub is_admin: bool,
        #[prost(bool, tag = "3")]
        pub is_super_admin: bool,
    }

    #[derive(Clone, PartialEq, ::prost::Message, Serialize, Deserialize)]
    pub struct GroupInfo {
        #[prost(string, tag = "1")]
        pub jid: String,
        #[prost(string, tag = "2")]
        pub name: String,
        #[prost(string, optional, tag = "3")]
        pub topic: Option<String>,
        #[prost(string, optional, tag = "4")]
        pub owner_jid: Option<String>,
        #[prost(int64, optional, tag = "5")]
        pub created_at: Option<i64>,
        #[prost(bool, tag = "6")]
        pub is_announce: bool,
        #[prost(bool, tag = "7")]
        pub is_locked: bool,
        #[prost(message, repeated, tag = "8")]
        pub participants: Vec<GroupParticipant>,
    }

    #[derive(Clone, PartialEq, ::prost::Message, Serialize, Deserialize)]
    pub struct GetJoinedGroupsResult {
        #[prost(message, repeated, tag = "1")]
        pub groups: Vec<GroupInfo>,
    }

    #[derive(Clone, PartialEq, ::prost::Message, Serialize, Deserialize)]
    pub struct MessageInfo {
        #[prost(string, tag = "1")]
        pub id: String,
        #[prost(string, tag = "2")]
        pub chat: String,
        #[prost(string, tag = "3")]
        pub sender: String,
        #[prost(bool, tag = "4")]
        pub is_from_me: bool,
        #[prost(bool, tag = "5")]
        pub is_group: bool,
        #[prost(string, optional, tag = "6")]
        pub push_name: Option<String>,
        #[prost(int64, tag = "7")]
        pub timestamp: i64,
    }

    #[derive(Clone, PartialEq, ::prost::Message, Serialize, Deserialize)]
    pub struct ServerEvent {
        #[prost(oneof = "server_event::Kind", tags = "1, 2, 3, 4, 5, 6, 7, 8, 9, 10")]
        pub kind: Option<server_event::Kind>,
    }

    pub mod server_event {
        use serde::{Deserialize, Serialize};

        #[derive(Clone, PartialEq, ::prost::Oneof, Serialize, Deserialize)]
        pub enum Kind {
            #[prost(message, tag = "1")]
            Connected(super::ConnectedEvent),
            #[prost(message, tag = "2")]
            PushNameSetting(super::PushNameSettingEvent),
            #[prost(message, tag = "3")]
            AppStateSyncComplete(super::AppStateSyncCompleteEvent),
            #[prost(message, tag = "4")]
            StreamReplaced(super::StreamReplacedEvent),
            #[prost(message, tag = "5")]
            LoggedOut(super::LoggedOutEvent),
            #[prost(message, tag = "6")]
            Disconnected(super::DisconnectedEvent),
            #[prost(message, tag = "7")]
            QrCode(super::QrCodeEvent),
            #[prost(message, tag = "8")]
            PairRequest(super::PairRequestEvent),
            #[prost(message, tag = "9")]
            PairSuccess(super::PairSuccessEvent),
            #[prost(message, tag = "10")]
            Message(super::MessageEvent),
        }
    }

    #[derive(Clone, PartialEq, ::prost::Message, Serialize, Deserialize)]
    pub struct ConnectedEvent {}

    #[derive(Clone, PartialEq, ::prost::Message, Serialize, Deserialize)]
    pub struct PushNameSettingEvent {
        #[prost(string, tag = "1")]
        pub push_name: String,
    }

    #[derive(Clone, PartialEq, ::prost::Message, Serialize, Deserialize)]
    pub struct AppStateSyncCompleteEvent {
        #[prost(string, tag = "1")]
        pub name: String,
    }

    #[derive(Clone, PartialEq, ::prost::Message, Serialize, Deserialize)]
    pub struct StreamReplacedEvent {}

    #[derive(Clone, PartialEq, ::prost::Message, Serialize, Deserialize)]
    pub struct LoggedOutEvent {
        #[prost(string, optional, tag = "1")]
        pub reason: Option<String>,
    }

    #[derive(Clone, PartialEq, ::prost::Message, Serialize, Deserialize)]
    pub struct DisconnectedEvent {}

    #[derive(Clone, PartialEq, ::prost::Message, Serialize, Deserialize)]
    pub struct QrCodeEvent {
        #[prost(string, tag = "1")]
        pub code: String,
    }

    #[derive(Clone, PartialEq, ::prost::Message, Serialize, Deserialize)]
    pub struct PairRequestEvent {
        #[prost(string, tag = "1")]
        pub request_id: String,
        #[prost(string, tag = "2")]
        pub jid: String,
        #[prost(string, tag = "3")]
        pub platform: String,
        #[prost(string, tag = "4")]
        pub business_name: String,
    }

    #[derive(Clone, PartialEq, ::prost::Message, Serialize, Deserialize)]
    pub struct PairSuccessEvent {
        #[prost(string, tag = "1")]
        pub jid: String,
        #[prost(string, optional, tag = "2")]
        pub push_name: Option<String>,
    }

    #[derive(Clone, PartialEq, ::prost::Message, Serialize, Deserialize)]
    pub struct MessageEvent {
        #[prost(message, optional, tag = "1")]
        pub info: Option<MessageInfo>,
        #[prost(message, optional, tag = "2")]
        pub message: Option<waproto::Message>,
    }
}
