use serde::Serialize;
use thiserror::Error;
use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};

use crate::client::GroupInfo;
use crate::commands::CommandOutput;
use crate::jid::Jid;
use crate::script::DemoStep;

#[derive(Debug, Error)]
pub enum OutputError {
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Clone, Copy)]
pub enum JsonFormat {
    Pretty,
    Compact,
}

#[derive(Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct JidSummary {
    pub input: String,
    pub jid: String,
    pub user: String,
    pub device: Option<u16>,
    pub server: String,
    pub is_group: bool,
}

impl JidSummary {
    pub fn new(input: &str, jid: &Jid) -> Self {
        Self {
            input: input.to_string(),
            jid: jid.to_string(),
            user: jid.user.clone(),
            device: jid.device,
            server: jid.server.clone(),
            is_group: jid.is_group(),
        }
    }
}

#[derive(Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusOutput {
    pub data_dir: String,
    pub state_path: String,
    pub bridge_url: String,
    pub media_url: String,
    pub has_token: bool,
    pub account_jid: Option<String>,
    pub push_name: Option<String>,
    pub updated_at: Option<i64>,
}

pub fn json_string<T: Serialize + ?Sized>(value: &T, format: JsonFormat) -> Result<String, OutputError> {
    let payload = match format {
        JsonFormat::Pretty => serde_json::to_string_pretty(value)?,
        JsonFormat::Compact => serde_json::to_string(value)?,
    };
    Ok(payload)
}

pub fn print_json<T: Serialize + ?Sized>(value: &T, format: JsonFormat) -> Result<(), OutputError> {
    let payload = json_string(value, format)?;
    println!("{payload}");
    Ok(())
}

pub fn print_jid(summary: &JidSummary, json: bool) -> Result<(), OutputError> {
    if json {
        return print_json(summary, JsonFormat::Pretty);
    }
    println!("{}  {}", pad_right("jid", 8), summary.jid);
    println!("{}  {}", pad_right("user", 8), summary.user);
    println!(
        "{}  {}",
        pad_right("device", 8),
        summary.device.map(|device| device.to_string()).as_deref().unwrap_or("-")
    );
    println!("{}  {}", pad_right("server", 8), summary.server);
    println!("{}  {}", pad_right("group", 8), if summary.is_group { "yes" } else { "no" });
    Ok(())
}

pub fn print_script(steps: &[DemoStep], json: bool) -> Result<(), OutputError> {
    if json {
        return print_json(steps, JsonFormat::Pretty);
    }
    print!("{}", format_script(steps));
    Ok(())
}

pub fn print_status(status: &StatusOutput, json: bool) -> Result<(), OutputError> {
    if json {
        return print_json(status, JsonFormat::Pretty);
    }
    let rows = [
        ("data", status.data_dir.as_str()),
        ("state", status.state_path.as_str()),
        ("bridge", status.bridge_url.as_str()),
        ("media", status.media_url.as_str()),
        ("token", if status.has_token { "saved" } else { "missing" }),
        ("account", status.account_jid.as_deref().unwrap_or("-")),
        ("name", status.push_name.as_deref().unwrap_or("-")),
    ];
    for (label, value) in rows {
        println!("{}  {}", pad_right(label, 8), value);
    }
    Ok(())
}

/// Console rendering of a command result; group lists become a table.
pub fn format_command_output(output: &CommandOutput) -> String {
    match output {
        CommandOutput::Groups(groups) => format_groups(groups),
        other => other.to_string(),
    }
}

fn format_groups(groups: &[GroupInfo]) -> String {
    if groups.is_empty() {
        return "<no groups>\n".to_string();
    }
    let mut name_width = display_width("name");
    let mut jid_width = display_width("jid");
    for group in groups {
        name_width = name_width.max(display_width(&group.name));
        jid_width = jid_width.max(display_width(&group.jid));
    }
    name_width = name_width.min(32);

    let mut out = format!(
        "{}  {}  {}\n",
        pad_right("name", name_width),
        pad_right("jid", jid_width),
        pad_left("members", 7),
    );
    for group in groups {
        out.push_str(&format!(
            "{}  {}  {}\n",
            pad_right(&truncate_display(&group.name, name_width), name_width),
            pad_right(&group.jid, jid_width),
            pad_left(&group.participants.len().to_string(), 7),
        ));
    }
    out
}

fn format_script(steps: &[DemoStep]) -> String {
    let mut out = String::new();
    for (idx, step) in steps.iter().enumerate() {
        let kind = match step {
            DemoStep::Plain { .. } => "text",
            DemoStep::SpoofedReply { .. } => "reply",
            DemoStep::SpoofedImageReply { .. } => "image",
        };
        out.push_str(&format!(
            "{}  {}  {}\n",
            pad_left(&(idx + 1).to_string(), 2),
            pad_right(kind, 5),
            truncate_display(&step.to_string(), 96),
        ));
    }
    out
}

fn display_width(value: &str) -> usize {
    UnicodeWidthStr::width(value)
}

fn truncate_display(value: &str, max_width: usize) -> String {
    if display_width(value) <= max_width {
        return value.to_string();
    }
    let ellipsis = "...";
    let mut width = 0usize;
    let mut output = String::new();
    for ch in value.chars() {
        let ch_width = UnicodeWidthChar::width(ch).unwrap_or(0);
        if width + ch_width + ellipsis.len() > max_width {
            break;
        }
        output.push(ch);
        width += ch_width;
    }
    output.push_str(ellipsis);
    output
}

fn pad_right(value: &str, width: usize) -> String {
    let mut output = value.to_string();
    let current = display_width(value);
    if current < width {
        output.push_str(&" ".repeat(width - current));
    }
    output
}

fn pad_left(value: &str, width: usize) -> String {
    let current = display_width(value);
    if current >= width {
        return value.to_string();
    }
    let mut output = " ".repeat(width - current);
    output.push_str(value);
    output
}
