//! The scripted conversation demo.

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::Serialize;
use thiserror::Error;
use tracing::{info, warn};

use crate::client::{ProtocolClient, SendResponse};
use crate::jid::Jid;
use crate::message::{self, SendError};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ScriptError {
    #[error("unknown language {0:?} (expected br or en)")]
    UnknownLanguage(String),
    #[error("unknown recipient {0:?} (expected boy or girl)")]
    UnknownRecipient(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    Br,
    En,
}

impl FromStr for Language {
    type Err = ScriptError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "br" => Ok(Language::Br),
            "en" => Ok(Language::En),
            other => Err(ScriptError::UnknownLanguage(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Generic,
    Boy,
    Girl,
}

impl Role {
    /// Parses who the demo is addressed to. `generic` holds shared lines
    /// and is not a valid recipient.
    pub fn recipient(value: &str) -> Result<Self, ScriptError> {
        match value {
            "boy" => Ok(Role::Boy),
            "girl" => Ok(Role::Girl),
            other => Err(ScriptError::UnknownRecipient(other.to_string())),
        }
    }
}

type Lines = HashMap<Language, HashMap<Role, BTreeMap<u8, &'static str>>>;

fn templates() -> Lines {
    let mut lines: Lines = HashMap::new();

    let en = lines.entry(Language::En).or_default();
    en.insert(
        Role::Generic,
        BTreeMap::from([
            (1, "Hey! 👋"),
            (2, "Remember what you told me last night?"),
            (3, "❤️"),
            (4, "Anyway, I'm free all afternoon today"),
            (6, "Look what I found 😂"),
            (7, "I can't believe you sent me this"),
        ]),
    );
    en.insert(
        Role::Boy,
        BTreeMap::from([
            (3, "You're the best friend anyone could ask for, I owe you one"),
            (5, "Call me when you see this, bro"),
        ]),
    );
    en.insert(
        Role::Girl,
        BTreeMap::from([
            (3, "You're the best friend anyone could ask for, I owe you one"),
            (5, "Call me when you see this, girl"),
        ]),
    );

    let br = lines.entry(Language::Br).or_default();
    br.insert(
        Role::Generic,
        BTreeMap::from([
            (1, "Oi! 👋"),
            (2, "Lembra do que você me disse ontem à noite?"),
            (3, "❤️"),
            (4, "Enfim, estou livre a tarde toda hoje"),
            (6, "Olha o que eu achei 😂"),
            (7, "Não acredito que você me mandou isso"),
        ]),
    );
    br.insert(
        Role::Boy,
        BTreeMap::from([
            (3, "Você é o melhor amigo que alguém poderia ter, te devo uma"),
            (5, "Me liga quando vir isso, mano"),
        ]),
    );
    br.insert(
        Role::Girl,
        BTreeMap::from([
            (3, "Você é a melhor amiga que alguém poderia ter, te devo uma"),
            (5, "Me liga quando vir isso, amiga"),
        ]),
    );

    lines
}

fn line(lines: &Lines, language: Language, role: Role, ordinal: u8) -> &'static str {
    lines
        .get(&language)
        .and_then(|roles| roles.get(&role))
        .and_then(|ordinals| ordinals.get(&ordinal))
        .copied()
        .unwrap_or_default()
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum DemoStep {
    Plain {
        text: &'static str,
    },
    SpoofedReply {
        quoted: &'static str,
        text: &'static str,
    },
    SpoofedImageReply {
        image: PathBuf,
        quoted: &'static str,
        text: &'static str,
    },
}

impl fmt::Display for DemoStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DemoStep::Plain { text } => write!(f, "{text}"),
            DemoStep::SpoofedReply { quoted, text } => write!(f, "[quoting \"{quoted}\"] {text}"),
            DemoStep::SpoofedImageReply { image, quoted, text } => {
                write!(f, "[quoting image {} \"{quoted}\"] {text}", image.display())
            }
        }
    }
}

/// Steps of the demo for the given language and recipient: greeting,
/// follow-up, forged reply with a heart, availability, call-me, then the
/// image exchange when an image is supplied.
pub fn demo_steps(language: Language, recipient: Role, image: Option<&Path>) -> Vec<DemoStep> {
    let lines = templates();
    let generic = |ordinal| line(&lines, language, Role::Generic, ordinal);
    let personal = |ordinal| line(&lines, language, recipient, ordinal);

    let mut steps = vec![
        DemoStep::Plain { text: generic(1) },
        DemoStep::Plain { text: generic(2) },
        DemoStep::SpoofedReply {
            quoted: personal(3),
            text: generic(3),
        },
        DemoStep::Plain { text: generic(4) },
        DemoStep::Plain { text: personal(5) },
    ];
    if let Some(image) = image {
        steps.push(DemoStep::SpoofedImageReply {
            image: image.to_path_buf(),
            quoted: generic(6),
            text: generic(7),
        });
    }
    steps
}

#[derive(Debug)]
pub struct StepOutcome {
    pub step: DemoStep,
    pub result: Result<SendResponse, SendError>,
}

#[derive(Debug, Default)]
pub struct DemoReport {
    pub outcomes: Vec<StepOutcome>,
}

impl DemoReport {
    pub fn failures(&self) -> impl Iterator<Item = (usize, &StepOutcome)> {
        self.outcomes
            .iter()
            .enumerate()
            .filter(|(_, outcome)| outcome.result.is_err())
    }

    pub fn sent(&self) -> usize {
        self.outcomes.iter().filter(|outcome| outcome.result.is_ok()).count()
    }

    pub fn is_complete(&self) -> bool {
        self.failures().next().is_none()
    }
}

/// Sends every step in order. A failed step is recorded and the next one is
/// still attempted; nothing already sent is undone.
pub async fn play_demo(
    client: &dyn ProtocolClient,
    chat: &Jid,
    spoofed: &Jid,
    steps: Vec<DemoStep>,
) -> DemoReport {
    let mut report = DemoReport::default();
    let total = steps.len();
    for (idx, step) in steps.into_iter().enumerate() {
        let result = match &step {
            DemoStep::Plain { text } => message::send_conversation_message(client, chat, text).await,
            DemoStep::SpoofedReply { quoted, text } => {
                let msg_id = client.generate_message_id();
                message::send_spoofed_reply(client, chat, spoofed, &msg_id, quoted, text).await
            }
            DemoStep::SpoofedImageReply { image, quoted, text } => {
                let msg_id = client.generate_message_id();
                message::send_spoofed_img_reply(client, chat, spoofed, &msg_id, image, quoted, text).await
            }
        };
        match &result {
            Ok(_) => info!("demo step {}/{} sent to {chat}", idx + 1, total),
            Err(err) => warn!("demo step {}/{} failed: {err}", idx + 1, total),
        }
        report.outcomes.push(StepOutcome { step, result });
    }
    report
}
