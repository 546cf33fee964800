use std::sync::{Arc, PoisonError, RwLock};

use crate::client::ProtocolClient;
use crate::jid::Jid;

/// Per-process context handed to the router, the event handler and the HTTP
/// surface.
#[derive(Clone)]
pub struct Session {
    client: Arc<dyn ProtocolClient>,
    echo_secret: Arc<RwLock<String>>,
}

impl Session {
    pub fn new(client: Arc<dyn ProtocolClient>, echo_secret: String) -> Self {
        Self {
            client,
            echo_secret: Arc::new(RwLock::new(echo_secret)),
        }
    }

    pub fn client(&self) -> &dyn ProtocolClient {
        self.client.as_ref()
    }

    pub fn echo_secret(&self) -> String {
        self.echo_secret
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn set_echo_secret(&self, secret: impl Into<String>) {
        *self.echo_secret.write().unwrap_or_else(PoisonError::into_inner) = secret.into();
    }

    /// The operator's own chat (account address without device part).
    pub fn own_chat(&self) -> Option<Jid> {
        self.client.own_jid().map(|jid| jid.to_non_ad())
    }
}
