use std::fmt;
use std::str::FromStr;

use serde::Serialize;
use thiserror::Error;

pub const DEFAULT_USER_SERVER: &str = "s.whatsapp.net";
pub const GROUP_SERVER: &str = "g.us";
pub const LEGACY_USER_SERVER: &str = "c.us";
pub const BROADCAST_SERVER: &str = "broadcast";
pub const HIDDEN_USER_SERVER: &str = "lid";
pub const NEWSLETTER_SERVER: &str = "newsletter";

const KNOWN_SERVERS: [&str; 6] = [
    DEFAULT_USER_SERVER,
    GROUP_SERVER,
    LEGACY_USER_SERVER,
    BROADCAST_SERVER,
    HIDDEN_USER_SERVER,
    NEWSLETTER_SERVER,
];

#[derive(Debug, Error, PartialEq, Eq)]
pub enum JidError {
    #[error("empty address")]
    Empty,
    #[error("missing user part in {0:?}")]
    EmptyUser(String),
    #[error("unknown server {0:?}")]
    UnknownServer(String),
    #[error("invalid device suffix {0:?}")]
    InvalidDevice(String),
}

/// A contact, group or broadcast address.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct Jid {
    pub user: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub device: Option<u16>,
    pub server: String,
}

impl Jid {
    pub fn new(user: impl Into<String>, server: impl Into<String>) -> Self {
        Self {
            user: user.into(),
            device: None,
            server: server.into(),
        }
    }

    pub fn is_group(&self) -> bool {
        self.server == GROUP_SERVER
    }

    /// Drops the device part so addresses of the same account compare equal.
    pub fn to_non_ad(&self) -> Self {
        Self {
            user: self.user.clone(),
            device: None,
            server: self.server.clone(),
        }
    }
}

impl fmt::Display for Jid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.device {
            Some(device) if device > 0 => write!(f, "{}:{}@{}", self.user, device, self.server),
            _ => write!(f, "{}@{}", self.user, self.server),
        }
    }
}

impl FromStr for Jid {
    type Err = JidError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        parse_jid(value)
    }
}

/// Parses operator input into an address.
///
/// A leading `+` is phone-number formatting and is dropped. Input without
/// `@` is a bare user in the default user namespace.
pub fn parse_jid(raw: &str) -> Result<Jid, JidError> {
    let value = raw.trim();
    let value = value.strip_prefix('+').unwrap_or(value);
    if value.is_empty() {
        return Err(JidError::Empty);
    }

    let Some((user, server)) = value.split_once('@') else {
        return Ok(Jid::new(value, DEFAULT_USER_SERVER));
    };

    if !KNOWN_SERVERS.contains(&server) {
        return Err(JidError::UnknownServer(server.to_string()));
    }

    let (user, device) = match user.split_once(':') {
        Some((user, device)) => {
            let device = device
                .parse::<u16>()
                .map_err(|_| JidError::InvalidDevice(device.to_string()))?;
            (user, Some(device))
        }
        None => (user, None),
    };

    if user.is_empty() {
        return Err(JidError::EmptyUser(raw.to_string()));
    }

    Ok(Jid {
        user: user.to_string(),
        device,
        server: server.to_string(),
    })
}
