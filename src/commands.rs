//! Operator commands shared by the console, the self-chat trigger and the
//! HTTP surface.

use std::fmt;
use std::path::Path;

use chrono::DateTime;
use thiserror::Error;
use tracing::{error, info};

use crate::client::{ClientError, GroupInfo, ProtocolClient, SendResponse};
use crate::jid::{parse_jid, Jid, JidError};
use crate::message::{self, SendError};
use crate::protocol::waproto;
use crate::script::{self, DemoReport, Language, Role, ScriptError};
use crate::session::Session;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CommandName {
    GetGroup,
    ListGroups,
    SendSpoofedReply,
    SendSpoofedImgReply,
    SendSpoofedLocationReply,
    SendSpoofedDemo,
    SendSpoofedDemoImg,
    SpoofedReplyThis,
}

impl CommandName {
    pub const ALL: [CommandName; 8] = [
        CommandName::GetGroup,
        CommandName::ListGroups,
        CommandName::SendSpoofedReply,
        CommandName::SendSpoofedImgReply,
        CommandName::SendSpoofedLocationReply,
        CommandName::SendSpoofedDemo,
        CommandName::SendSpoofedDemoImg,
        CommandName::SpoofedReplyThis,
    ];

    pub fn parse(name: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|command| command.as_str().eq_ignore_ascii_case(name))
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            CommandName::GetGroup => "getgroup",
            CommandName::ListGroups => "listgroups",
            CommandName::SendSpoofedReply => "send-spoofed-reply",
            CommandName::SendSpoofedImgReply => "send-spoofed-img-reply",
            CommandName::SendSpoofedLocationReply => "send-spoofed-location-reply",
            CommandName::SendSpoofedDemo => "send-spoofed-demo",
            CommandName::SendSpoofedDemoImg => "send-spoofed-demo-img",
            CommandName::SpoofedReplyThis => "spoofed-reply-this",
        }
    }

    pub fn min_args(&self) -> usize {
        match self {
            CommandName::GetGroup => 1,
            CommandName::ListGroups => 0,
            CommandName::SendSpoofedReply
            | CommandName::SendSpoofedLocationReply
            | CommandName::SendSpoofedDemo
            | CommandName::SpoofedReplyThis => 4,
            CommandName::SendSpoofedImgReply | CommandName::SendSpoofedDemoImg => 5,
        }
    }

    pub fn usage(&self) -> &'static str {
        match self {
            CommandName::GetGroup => "getgroup <jid>",
            CommandName::ListGroups => "listgroups",
            CommandName::SendSpoofedReply => {
                "send-spoofed-reply <chat_jid> <msgID:!|#ID> <spoofed_jid> <spoofed_text>|<text>"
            }
            CommandName::SendSpoofedImgReply => {
                "send-spoofed-img-reply <chat_jid> <msgID:!|#ID> <spoofed_jid> <spoofed_file> <spoofed_text>|<text>"
            }
            CommandName::SendSpoofedLocationReply => {
                "send-spoofed-location-reply <chat_jid> <msgID:!|#ID> <spoofed_jid> <text>"
            }
            CommandName::SendSpoofedDemo => {
                "send-spoofed-demo <toGender:boy|girl> <language:br|en> <chat_jid> <spoofed_jid>"
            }
            CommandName::SendSpoofedDemoImg => {
                "send-spoofed-demo-img <toGender:boy|girl> <language:br|en> <chat_jid> <spoofed_jid> <spoofed_img>"
            }
            CommandName::SpoofedReplyThis => "spoofed-reply-this <chat_jid> <msgID:!|#ID> <spoofed_jid> <text>",
        }
    }
}

impl fmt::Display for CommandName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error)]
pub enum CommandError {
    #[error("[{command}] Usage: {}", .command.usage())]
    Usage { command: CommandName },
    #[error("[{command}] You need to specify a valid {what}: {source}")]
    InvalidJid {
        command: CommandName,
        what: &'static str,
        #[source]
        source: JidError,
    },
    #[error("[getgroup] Input must be a group JID (@g.us), got {0}")]
    NotAGroup(Jid),
    #[error("[{command}] Separate the quoted text from the reply with '|'")]
    MissingReplySeparator { command: CommandName },
    #[error("[{command}] {source}")]
    InvalidScript {
        command: CommandName,
        #[source]
        source: ScriptError,
    },
    #[error("unknown command {0:?}")]
    UnknownCommand(String),
    #[error("[spoofed-reply-this] only works from an inbound message")]
    NoReplyContext,
    #[error("[spoofed-reply-this] the triggering message does not quote anything")]
    NotAReply,
    #[error("[{command}] Error on sending spoofed msg: {source}")]
    Send {
        command: CommandName,
        #[source]
        source: SendError,
    },
    #[error("[{command}] Request failed: {source}")]
    Client {
        command: CommandName,
        #[source]
        source: ClientError,
    },
}

impl CommandError {
    /// Whether the invocation itself was wrong, as opposed to the messaging
    /// service failing it.
    pub fn is_usage(&self) -> bool {
        !matches!(self, CommandError::Send { .. } | CommandError::Client { .. })
    }
}

#[derive(Debug)]
pub enum CommandOutput {
    GroupInfo(GroupInfo),
    Groups(Vec<GroupInfo>),
    Sent {
        command: CommandName,
        chat: Jid,
        response: SendResponse,
    },
    Demo {
        command: CommandName,
        chat: Jid,
        spoofed: Jid,
        report: DemoReport,
    },
}

impl fmt::Display for CommandOutput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CommandOutput::GroupInfo(group) => {
                write!(f, "[getgroup] Group info: {} ({})", group.name, group.jid)?;
                if let Some(topic) = group.topic.as_deref().filter(|topic| !topic.is_empty()) {
                    write!(f, "\n  topic: {topic}")?;
                }
                if let Some(owner) = group.owner_jid.as_deref() {
                    write!(f, "\n  owner: {owner}")?;
                }
                if let Some(created) = group.created_at {
                    write!(f, "\n  created: {}", format_timestamp(created))?;
                }
                write!(f, "\n  participants: {}", group.participants.len())?;
                for participant in &group.participants {
                    let role = if participant.is_super_admin {
                        " (superadmin)"
                    } else if participant.is_admin {
                        " (admin)"
                    } else {
                        ""
                    };
                    write!(f, "\n    {}{role}", participant.jid)?;
                }
                Ok(())
            }
            CommandOutput::Groups(groups) => {
                for group in groups {
                    writeln!(f, "{}: {}", group.name, group.jid)?;
                }
                Ok(())
            }
            CommandOutput::Sent {
                command,
                chat,
                response,
            } => write!(
                f,
                "[{command}] spoofed msg sent to {chat}: id {} at {} ({})",
                response.id,
                format_timestamp(response.timestamp),
                response.timestamp
            ),
            CommandOutput::Demo {
                command,
                chat,
                spoofed,
                report,
            } => {
                write!(
                    f,
                    "[{command}] spoofed msg sent to {chat} as {spoofed}: {}/{} steps delivered",
                    report.sent(),
                    report.outcomes.len()
                )?;
                if report.is_complete() {
                    return Ok(());
                }
                for (idx, outcome) in report.failures() {
                    if let Err(err) = &outcome.result {
                        write!(f, "\n  step {} failed: {err}", idx + 1)?;
                    }
                }
                Ok(())
            }
        }
    }
}

fn format_timestamp(timestamp: i64) -> String {
    DateTime::from_timestamp(timestamp, 0)
        .map(|time| time.format("%Y-%m-%d %H:%M:%S UTC").to_string())
        .unwrap_or_else(|| timestamp.to_string())
}

/// Splits a console line into a command name and its arguments.
pub fn parse_line(line: &str) -> Option<(String, Vec<String>)> {
    let mut tokens = line.split_whitespace();
    let name = tokens.next()?.to_string();
    Some((name, tokens.map(str::to_string).collect()))
}

/// Runs one command. `origin` is the inbound message that triggered it, if
/// any; only `spoofed-reply-this` uses it.
pub async fn dispatch(
    session: &Session,
    name: &str,
    args: &[String],
    origin: Option<&waproto::Message>,
) -> Result<CommandOutput, CommandError> {
    let result = match CommandName::parse(name) {
        Some(command) => run(session.client(), command, args, origin).await,
        None => Err(CommandError::UnknownCommand(name.to_string())),
    };
    match &result {
        Ok(output) => info!("{output}"),
        Err(err) => error!("{err}"),
    }
    result
}

async fn run(
    client: &dyn ProtocolClient,
    command: CommandName,
    args: &[String],
    origin: Option<&waproto::Message>,
) -> Result<CommandOutput, CommandError> {
    if args.len() < command.min_args() {
        return Err(CommandError::Usage { command });
    }

    match command {
        CommandName::GetGroup => {
            let group = jid_arg(command, &args[0], "group JID")?;
            if !group.is_group() {
                return Err(CommandError::NotAGroup(group));
            }
            let info = client
                .get_group_info(&group)
                .await
                .map_err(|source| CommandError::Client { command, source })?;
            Ok(CommandOutput::GroupInfo(info))
        }
        CommandName::ListGroups => {
            let groups = client
                .get_joined_groups()
                .await
                .map_err(|source| CommandError::Client { command, source })?;
            Ok(CommandOutput::Groups(groups))
        }
        CommandName::SendSpoofedReply => {
            let (chat, spoofed) = chat_and_spoofed(command, &args[0], &args[2])?;
            let (quoted, text) = split_reply(command, &args[3..].join(" "))?;
            let msg_id = resolve_message_id(client, &args[1]);
            let response = message::send_spoofed_reply(client, &chat, &spoofed, &msg_id, &quoted, &text)
                .await
                .map_err(|source| CommandError::Send { command, source })?;
            Ok(CommandOutput::Sent {
                command,
                chat,
                response,
            })
        }
        CommandName::SendSpoofedImgReply => {
            let (chat, spoofed) = chat_and_spoofed(command, &args[0], &args[2])?;
            let image = Path::new(&args[3]);
            let (quoted, text) = split_reply(command, &args[4..].join(" "))?;
            let msg_id = resolve_message_id(client, &args[1]);
            let response =
                message::send_spoofed_img_reply(client, &chat, &spoofed, &msg_id, image, &quoted, &text)
                    .await
                    .map_err(|source| CommandError::Send { command, source })?;
            Ok(CommandOutput::Sent {
                command,
                chat,
                response,
            })
        }
        CommandName::SendSpoofedLocationReply => {
            let (chat, spoofed) = chat_and_spoofed(command, &args[0], &args[2])?;
            let text = args[3..].join(" ");
            let msg_id = resolve_message_id(client, &args[1]);
            let response = message::send_spoofed_location_reply(client, &chat, &spoofed, &msg_id, &text)
                .await
                .map_err(|source| CommandError::Send { command, source })?;
            Ok(CommandOutput::Sent {
                command,
                chat,
                response,
            })
        }
        CommandName::SendSpoofedDemo | CommandName::SendSpoofedDemoImg => {
            let recipient =
                Role::recipient(&args[0]).map_err(|source| CommandError::InvalidScript { command, source })?;
            let language = args[1]
                .parse::<Language>()
                .map_err(|source| CommandError::InvalidScript { command, source })?;
            let (chat, spoofed) = chat_and_spoofed(command, &args[2], &args[3])?;
            let image = match command {
                CommandName::SendSpoofedDemoImg => Some(Path::new(&args[4])),
                _ => None,
            };
            let steps = script::demo_steps(language, recipient, image);
            let report = script::play_demo(client, &chat, &spoofed, steps).await;
            Ok(CommandOutput::Demo {
                command,
                chat,
                spoofed,
                report,
            })
        }
        CommandName::SpoofedReplyThis => {
            let origin = origin.ok_or(CommandError::NoReplyContext)?;
            if message::quoted_in_reply(origin).is_none() {
                return Err(CommandError::NotAReply);
            }
            let (chat, spoofed) = chat_and_spoofed(command, &args[0], &args[2])?;
            let text = args[3..].join(" ");
            let msg_id = resolve_message_id(client, &args[1]);
            let response = message::send_spoofed_reply_this(client, &chat, &spoofed, &msg_id, &text, origin)
                .await
                .map_err(|source| CommandError::Send { command, source })?;
            Ok(CommandOutput::Sent {
                command,
                chat,
                response,
            })
        }
    }
}

fn jid_arg(command: CommandName, raw: &str, what: &'static str) -> Result<Jid, CommandError> {
    parse_jid(raw).map_err(|source| CommandError::InvalidJid { command, what, source })
}

fn chat_and_spoofed(command: CommandName, chat: &str, spoofed: &str) -> Result<(Jid, Jid), CommandError> {
    let chat = jid_arg(command, chat, "Chat ID (Group or User)")?;
    let spoofed = jid_arg(command, spoofed, "User ID to spoof")?;
    Ok((chat, spoofed))
}

/// `!` asks the client for a fresh id; anything else is used as given.
fn resolve_message_id(client: &dyn ProtocolClient, raw: &str) -> String {
    if raw.starts_with('!') {
        client.generate_message_id()
    } else {
        raw.to_string()
    }
}

/// Splits `quoted|reply` on the first `|`.
fn split_reply(command: CommandName, text: &str) -> Result<(String, String), CommandError> {
    text.split_once('|')
        .map(|(quoted, reply)| (quoted.to_string(), reply.to_string()))
        .ok_or(CommandError::MissingReplySeparator { command })
}
