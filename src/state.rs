use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StateError {
    #[error("io error: {0}")]
    Io(#[from] io::Error),
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountRecord {
    pub jid: String,
    pub push_name: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct LocalState {
    pub token: Option<String>,
    pub bridge_url: Option<String>,
    pub account: Option<AccountRecord>,
    pub updated_at: Option<i64>,
}

/// Bridge token and last known account, kept in one JSON file readable only
/// by the owner. A file written for a different bridge is ignored.
#[derive(Clone)]
pub struct LocalDb {
    path: PathBuf,
    bridge_url: String,
}

impl LocalDb {
    pub fn new(path: PathBuf, bridge_url: String) -> Self {
        Self { path, bridge_url }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn load(&self) -> Result<LocalState, StateError> {
        let contents = match fs::read_to_string(&self.path) {
            Ok(contents) => contents,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(LocalState::default()),
            Err(err) => return Err(StateError::Io(err)),
        };
        let state: LocalState = serde_json::from_str(&contents)?;
        if let Some(bridge_url) = state.bridge_url.as_deref() {
            if bridge_url != self.bridge_url {
                return Ok(LocalState::default());
            }
        }
        Ok(state)
    }

    pub fn save(&self, state: &LocalState) -> Result<(), StateError> {
        if let Some(parent) = self.path.parent() {
            ensure_dir(parent)?;
        }
        let payload = serde_json::to_string_pretty(state)?;
        fs::write(&self.path, payload)?;
        set_file_permissions(&self.path, 0o600)?;
        Ok(())
    }

    pub fn load_token(&self) -> Result<Option<String>, StateError> {
        Ok(self.load()?.token.filter(|token| !token.trim().is_empty()))
    }

    pub fn store_token(&self, token: &str) -> Result<(), StateError> {
        self.update(|state| state.token = Some(token.trim().to_string()))
    }

    pub fn set_account(&self, account: AccountRecord) -> Result<(), StateError> {
        self.update(|state| state.account = Some(account))
    }

    /// Forgets the token and the account but keeps the file.
    pub fn clear(&self) -> Result<(), StateError> {
        self.update(|state| {
            state.token = None;
            state.account = None;
        })
    }

    fn update(&self, apply: impl FnOnce(&mut LocalState)) -> Result<(), StateError> {
        let mut state = self.load()?;
        apply(&mut state);
        state.bridge_url = Some(self.bridge_url.clone());
        state.updated_at = Some(current_epoch_seconds() as i64);
        self.save(&state)
    }
}

fn ensure_dir(path: &Path) -> Result<(), io::Error> {
    fs::create_dir_all(path)?;
    set_dir_permissions(path, 0o700)?;
    Ok(())
}

fn current_epoch_seconds() -> u64 {
    use std::time::{SystemTime, UNIX_EPOCH};
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}

#[cfg(unix)]
fn set_file_permissions(path: &Path, mode: u32) -> Result<(), io::Error> {
    use std::os::unix::fs::PermissionsExt;
    let perm = fs::Permissions::from_mode(mode);
    fs::set_permissions(path, perm)
}

#[cfg(unix)]
fn set_dir_permissions(path: &Path, mode: u32) -> Result<(), io::Error> {
    use std::os::unix::fs::PermissionsExt;
    let perm = fs::Permissions::from_mode(mode);
    fs::set_permissions(path, perm)
}

#[cfg(not(unix))]
fn set_file_permissions(_path: &Path, _mode: u32) -> Result<(), io::Error> {
    Ok(())
}

#[cfg(not(unix))]
fn set_dir_permissions(_path: &Path, _mode: u32) -> Result<(), io::Error> {
    Ok(())
}
