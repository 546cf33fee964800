mod api;
mod client;
mod commands;
mod config;
mod events;
mod jid;
mod journal;
mod logging;
mod message;
mod output;
mod pairing;
mod protocol;
mod realtime;
mod script;
mod server;
mod session;
mod state;
#[cfg(test)]
mod testing;

use clap::{Args, Parser, Subcommand};
use dialoguer::Input;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tracing::{info, warn};

use crate::client::ProtocolClient;
use crate::config::{Config, ConfigOverrides};
use crate::events::{Event, EventHandler, Flow};
use crate::journal::EventJournal;
use crate::output::{JidSummary, StatusOutput};
use crate::pairing::{PairingGate, PAIR_DECISION_WINDOW};
use crate::realtime::{BridgeClient, BridgeOptions};
use crate::script::{Language, Role};
use crate::server::HttpSettings;
use crate::session::Session;
use crate::state::LocalDb;

#[derive(Parser)]
#[command(
    name = "wa-relay",
    version,
    about = "WhatsApp command relay",
    after_help = "Examples:\n  wa-relay login --token <bridge token>\n  wa-relay\n  wa-relay --debug --http-addr 127.0.0.1:9090\n  wa-relay status --json\n  wa-relay parse-jid +15551234567\n  wa-relay script --lang br --role girl --image ./cat.jpg\n\nConsole commands once running:\n  send-spoofed-reply <chat> <msgID|!> <spoofedJID> <quoted>|<reply>\n  send-spoofed-img-reply <chat> <msgID|!> <spoofedJID> <image> <quoted>|<reply>\n  send-spoofed-demo <boy|girl> <br|en> <chat> <spoofedJID>\n  listgroups\n  getgroup <groupJID>"
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,

    #[arg(long, global = true, help = "Output JSON instead of a table")]
    json: bool,

    #[arg(long, global = true, help = "Log at debug level unless RUST_LOG is set")]
    debug: bool,

    #[command(flatten)]
    connection: ConnectionArgs,
}

#[derive(Args)]
struct ConnectionArgs {
    #[arg(long, global = true, value_name = "URL", help = "Bridge websocket URL")]
    bridge_url: Option<String>,

    #[arg(long, global = true, value_name = "URL", help = "Bridge media endpoint")]
    media_url: Option<String>,

    #[arg(long, global = true, value_name = "DIR", help = "Directory for state, history and media")]
    data_dir: Option<PathBuf>,

    #[arg(long, global = true, value_name = "ADDR", help = "Loopback address for the HTTP surface")]
    http_addr: Option<String>,

    #[arg(long, global = true, value_name = "DIR", help = "Static files served over HTTP")]
    assets_dir: Option<PathBuf>,

    #[arg(long, global = true, help = "Ask the bridge for a full history sync")]
    request_full_sync: bool,
}

impl From<ConnectionArgs> for ConfigOverrides {
    fn from(args: ConnectionArgs) -> Self {
        Self {
            bridge_url: args.bridge_url,
            media_url: args.media_url,
            data_dir: args.data_dir,
            http_addr: args.http_addr,
            assets_dir: args.assets_dir,
            request_full_sync: args.request_full_sync,
        }
    }
}

#[derive(Subcommand)]
enum Command {
    #[command(about = "Connect to the bridge and relay commands (default)")]
    Run,
    #[command(about = "Save the bridge token")]
    Login(LoginArgs),
    #[command(about = "Clear the saved token and account")]
    Logout,
    #[command(about = "Show saved state")]
    Status,
    #[command(about = "Normalize an address the way commands do")]
    ParseJid(ParseJidArgs),
    #[command(about = "Print the demo conversation without sending it")]
    Script(ScriptArgs),
}

#[derive(Args)]
struct LoginArgs {
    #[arg(long, help = "Bridge token; prompted for when omitted")]
    token: Option<String>,
}

#[derive(Args)]
struct ParseJidArgs {
    #[arg(help = "Phone number or full address")]
    jid: String,
}

#[derive(Args)]
struct ScriptArgs {
    #[arg(long, default_value = "en", help = "Script language (br or en)")]
    lang: String,

    #[arg(long, default_value = "boy", help = "Recipient (boy or girl)")]
    role: String,

    #[arg(long, help = "Image for the closing forged reply")]
    image: Option<PathBuf>,
}

#[tokio::main]
async fn main() {
    if let Err(error) = run().await {
        eprintln!("{error}");
        std::process::exit(1);
    }
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    logging::init(cli.debug);
    let config = Config::load(cli.connection.into())?;
    let local_db = LocalDb::new(config.state_path.clone(), config.bridge_url.clone());

    match cli.command.unwrap_or(Command::Run) {
        Command::Run => run_relay(config, local_db).await?,
        Command::Login(args) => {
            let token = match args.token {
                Some(token) => token,
                None => prompt_token()?,
            };
            if token.trim().is_empty() {
                return Err("Token cannot be empty".into());
            }
            local_db.store_token(&token)?;
            println!("Token saved to {}.", local_db.path().display());
        }
        Command::Logout => {
            local_db.clear()?;
            println!("Logged out.");
        }
        Command::Status => {
            let state = local_db.load()?;
            let account = state.account.as_ref();
            let status = StatusOutput {
                data_dir: config.data_dir.display().to_string(),
                state_path: local_db.path().display().to_string(),
                bridge_url: config.bridge_url.clone(),
                media_url: config.media_url.clone(),
                has_token: config.token.is_some() || state.token.is_some(),
                account_jid: account.map(|account| account.jid.clone()),
                push_name: account.and_then(|account| account.push_name.clone()),
                updated_at: state.updated_at,
            };
            output::print_status(&status, cli.json)?;
        }
        Command::ParseJid(args) => {
            let jid = jid::parse_jid(&args.jid)?;
            output::print_jid(&JidSummary::new(&args.jid, &jid), cli.json)?;
        }
        Command::Script(args) => {
            let language: Language = args.lang.parse()?;
            let role = Role::recipient(&args.role)?;
            let steps = script::demo_steps(language, role, args.image.as_deref());
            output::print_script(&steps, cli.json)?;
        }
    }

    Ok(())
}

fn prompt_token() -> Result<String, Box<dyn std::error::Error>> {
    let token: String = Input::new().with_prompt("Bridge token").interact_text()?;
    Ok(token.trim().to_string())
}

fn require_token(config: &Config, local_db: &LocalDb) -> Result<String, Box<dyn std::error::Error>> {
    if let Some(token) = &config.token {
        return Ok(token.clone());
    }
    match local_db.load_token()? {
        Some(token) => Ok(token),
        None => Err("No token found. Run `wa-relay login` first.".into()),
    }
}

async fn run_relay(config: Config, local_db: LocalDb) -> Result<(), Box<dyn std::error::Error>> {
    let options = BridgeOptions {
        url: config.bridge_url.clone(),
        media_url: config.media_url.clone(),
        token: require_token(&config, &local_db)?,
        device_name: config.device_name.clone(),
        request_full_sync: config.request_full_sync,
    };
    let (bridge, mut bridge_events) = BridgeClient::connect(options).await?;
    let client: Arc<dyn ProtocolClient> = Arc::new(bridge);
    info!("bridge connection to {} started", config.bridge_url);

    let secret = config
        .echo_secret
        .clone()
        .unwrap_or_else(|| client.generate_message_id());
    info!("Echo secret: {secret}");

    let session = Session::new(client.clone(), secret);
    let pairing = Arc::new(PairingGate::new());
    let journal = EventJournal::new(config.history_dir.clone(), config.media_dir.clone());
    let handler = EventHandler::new(session.clone(), journal, pairing.clone(), PAIR_DECISION_WINDOW)
        .with_http(HttpSettings {
            addr: config.http_addr,
            assets_dir: config.assets_dir.clone(),
        })
        .with_state(local_db);

    let (shutdown_tx, mut shutdown_rx) = mpsc::channel::<()>(1);
    tokio::spawn(async move {
        while let Some(raw) = bridge_events.recv().await {
            let Some(event) = Event::from_proto(raw) else {
                continue;
            };
            if handler.handle(event).await == Flow::Shutdown {
                break;
            }
        }
        let _ = shutdown_tx.send(()).await;
    });

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let ctrl_c = tokio::signal::ctrl_c();
    let terminate = terminate_signal();
    tokio::pin!(ctrl_c, terminate);

    loop {
        tokio::select! {
            line = lines.next_line() => match line? {
                Some(line) => handle_console_line(&session, &pairing, &line),
                None => {
                    info!("stdin closed, shutting down");
                    break;
                }
            },
            _ = &mut ctrl_c => {
                info!("interrupted, shutting down");
                break;
            }
            _ = &mut terminate => {
                info!("terminated, shutting down");
                break;
            }
            _ = shutdown_rx.recv() => {
                warn!("bridge session ended");
                break;
            }
        }
    }

    client.disconnect().await;
    Ok(())
}

/// Answers a pending pair prompt, otherwise runs the line as a command on
/// its own task so a long demo does not block the console.
fn handle_console_line(session: &Session, pairing: &PairingGate, line: &str) {
    if pairing.answer(line) {
        return;
    }
    let Some((name, args)) = commands::parse_line(line) else {
        return;
    };
    let session = session.clone();
    tokio::spawn(async move {
        match commands::dispatch(&session, &name, &args, None).await {
            Ok(result) => println!("{}", output::format_command_output(&result).trim_end()),
            Err(err) => eprintln!("{err}"),
        }
    });
}

#[cfg(unix)]
async fn terminate_signal() {
    use tokio::signal::unix::{signal, SignalKind};

    match signal(SignalKind::terminate()) {
        Ok(mut stream) => {
            stream.recv().await;
        }
        Err(err) => {
            warn!("cannot listen for SIGTERM: {err}");
            std::future::pending::<()>().await;
        }
    }
}

#[cfg(not(unix))]
async fn terminate_signal() {
    std::future::pending::<()>().await;
}
