//! In-memory protocol client for unit tests.

use std::collections::HashSet;
use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;

use crate::client::{ClientError, GroupInfo, MediaRef, MediaType, ProtocolClient, SendResponse, UploadResponse};
use crate::jid::{parse_jid, Jid};
use crate::protocol::{proto, waproto};

#[derive(Default)]
struct Recorded {
    calls: usize,
    send_attempts: usize,
    generated: usize,
    sent: Vec<(Jid, waproto::Message)>,
    uploads: Vec<(usize, MediaType)>,
    downloads: Vec<MediaRef>,
    presences: Vec<proto::Presence>,
    pair_answers: Vec<(String, bool)>,
}

#[derive(Default)]
pub struct MockClient {
    recorded: Mutex<Recorded>,
    groups: Vec<GroupInfo>,
    own_jid: Option<Jid>,
    push_name: Option<String>,
    failing_sends: HashSet<usize>,
    download_data: Vec<u8>,
}

impl MockClient {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_own_jid(mut self, jid: &str) -> Self {
        self.own_jid = parse_jid(jid).ok();
        self
    }

    pub fn with_push_name(mut self, name: &str) -> Self {
        self.push_name = Some(name.to_string());
        self
    }

    pub fn with_groups(mut self, groups: Vec<GroupInfo>) -> Self {
        self.groups = groups;
        self
    }

    pub fn with_download(mut self, data: &[u8]) -> Self {
        self.download_data = data.to_vec();
        self
    }

    /// Send attempts (zero-based) that fail with a bridge error.
    pub fn failing_sends(mut self, attempts: &[usize]) -> Self {
        self.failing_sends = attempts.iter().copied().collect();
        self
    }

    pub fn sent(&self) -> Vec<(Jid, waproto::Message)> {
        self.lock().sent.clone()
    }

    pub fn uploads(&self) -> Vec<(usize, MediaType)> {
        self.lock().uploads.clone()
    }

    pub fn downloads(&self) -> Vec<MediaRef> {
        self.lock().downloads.clone()
    }

    pub fn presences(&self) -> Vec<proto::Presence> {
        self.lock().presences.clone()
    }

    pub fn pair_answers(&self) -> Vec<(String, bool)> {
        self.lock().pair_answers.clone()
    }

    /// Number of calls that would have reached the network.
    pub fn calls(&self) -> usize {
        self.lock().calls
    }

    fn lock(&self) -> MutexGuard<'_, Recorded> {
        self.recorded.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

pub fn group(jid: &str, name: &str) -> GroupInfo {
    GroupInfo {
        jid: jid.to_string(),
        name: name.to_string(),
        ..Default::default()
    }
}

fn rejected() -> ClientError {
    ClientError::Rpc {
        code: 500,
        error_code: 10,
        message: "rejected".to_string(),
        friendly: "Message rejected by server: rejected (code 500)".to_string(),
    }
}

#[async_trait]
impl ProtocolClient for MockClient {
    async fn send_message(&self, to: &Jid, message: waproto::Message) -> Result<SendResponse, ClientError> {
        let mut recorded = self.lock();
        recorded.calls += 1;
        let attempt = recorded.send_attempts;
        recorded.send_attempts += 1;
        if self.failing_sends.contains(&attempt) {
            return Err(rejected());
        }
        recorded.sent.push((to.clone(), message));
        let n = recorded.sent.len();
        Ok(SendResponse {
            id: format!("SENT-{n}"),
            timestamp: 1_700_000_000 + n as i64,
        })
    }

    async fn get_group_info(&self, jid: &Jid) -> Result<GroupInfo, ClientError> {
        self.lock().calls += 1;
        let wanted = jid.to_string();
        self.groups
            .iter()
            .find(|group| group.jid == wanted)
            .cloned()
            .ok_or_else(|| ClientError::Rpc {
                code: 404,
                error_code: 7,
                message: wanted.clone(),
                friendly: format!("Group not found: {wanted} (code 404)"),
            })
    }

    async fn get_joined_groups(&self) -> Result<Vec<GroupInfo>, ClientError> {
        self.lock().calls += 1;
        Ok(self.groups.clone())
    }

    async fn upload(&self, data: Vec<u8>, media_type: MediaType) -> Result<UploadResponse, ClientError> {
        let mut recorded = self.lock();
        recorded.calls += 1;
        recorded.uploads.push((data.len(), media_type));
        Ok(UploadResponse {
            url: "https://mmg.mock/upload".to_string(),
            direct_path: "/mock/direct".to_string(),
            media_key: vec![1; 32],
            file_enc_sha256: vec![2; 32],
            file_sha256: vec![3; 32],
            file_length: data.len() as u64,
        })
    }

    async fn download(&self, media: &MediaRef) -> Result<Vec<u8>, ClientError> {
        let mut recorded = self.lock();
        recorded.calls += 1;
        recorded.downloads.push(media.clone());
        Ok(self.download_data.clone())
    }

    fn generate_message_id(&self) -> String {
        let mut recorded = self.lock();
        recorded.generated += 1;
        format!("GEN-{}", recorded.generated)
    }

    async fn send_presence(&self, presence: proto::Presence) -> Result<(), ClientError> {
        let mut recorded = self.lock();
        recorded.calls += 1;
        recorded.presences.push(presence);
        Ok(())
    }

    async fn answer_pair_request(&self, request_id: &str, accept: bool) -> Result<(), ClientError> {
        let mut recorded = self.lock();
        recorded.calls += 1;
        recorded.pair_answers.push((request_id.to_string(), accept));
        Ok(())
    }

    fn own_jid(&self) -> Option<Jid> {
        self.own_jid.clone()
    }

    fn push_name(&self) -> Option<String> {
        self.push_name.clone()
    }

    async fn disconnect(&self) {}
}
