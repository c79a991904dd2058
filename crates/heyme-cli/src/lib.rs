//! Terminal shell for the HeyMe client.
//!
//! Shows the login prompt whenever the session needs credentials, then
//! lists the conference tiles and accepts control-bar commands until the
//! user leaves or the room closes.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use heyme_core::{
    AuthMode, ConnectionStatus, HeymeClient, HeymeEvent, HeymeEventListener, LoginForm,
    SettingsStore, Tile, TrackSource,
};
use tokio::io::{AsyncBufReadExt, BufReader, Lines, Stdin};
use tokio::sync::mpsc;

#[derive(Parser, Debug)]
#[command(author, version, about = "Join a HeyMe video meeting", long_about = None)]
pub struct Args {
    /// Directory holding settings.json (defaults to the user config dir)
    #[arg(long)]
    pub data_dir: Option<PathBuf>,

    /// HeyMe API base URL, overrides settings.json for this run
    #[arg(long, env = "HEYME_API_URL")]
    pub api_url: Option<String>,

    /// LiveKit server URL, overrides settings.json for this run
    #[arg(long, env = "HEYME_SERVER_URL")]
    pub server_url: Option<String>,

    /// Connect straight away with this LiveKit token
    #[arg(long)]
    pub token: Option<String>,
}

pub fn init_logging() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("heyme_core=info,heyme_cli=info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

/// Forwards core events into the shell loop.
struct ChannelListener(mpsc::UnboundedSender<HeymeEvent>);

impl HeymeEventListener for ChannelListener {
    fn on_event(&self, event: HeymeEvent) {
        let _ = self.0.send(event);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Command {
    Toggle { source: TrackSource, enabled: bool },
    Tiles,
    Leave,
    Help,
    Unknown,
}

fn parse_command(line: &str) -> Command {
    let mut words = line.split_whitespace();
    let source = match words.next() {
        Some("mic") => TrackSource::Microphone,
        Some("cam") | Some("camera") => TrackSource::Camera,
        Some("screen") => TrackSource::ScreenShare,
        Some("tiles") => return Command::Tiles,
        Some("leave") | Some("quit") => return Command::Leave,
        Some("help") | None => return Command::Help,
        Some(_) => return Command::Unknown,
    };
    match words.next() {
        Some("on") => Command::Toggle { source, enabled: true },
        Some("off") => Command::Toggle { source, enabled: false },
        _ => Command::Unknown,
    }
}

fn format_tile(tile: &Tile) -> String {
    let kind = match tile.source {
        TrackSource::ScreenShare => "screen",
        _ => "camera",
    };
    let video = match &tile.track_sid {
        Some(sid) => sid.as_str(),
        None => "(no video)",
    };
    let mut line = format!("[{kind}] {} {video}", tile.display_name);
    if tile.is_muted {
        line.push_str(" muted");
    }
    if tile.is_speaking {
        line.push_str(" speaking");
    }
    line
}

fn print_tiles(tiles: &[Tile]) {
    println!("--- {} tile(s) ---", tiles.len());
    for tile in tiles {
        println!("{}", format_tile(tile));
    }
}

/// Read one line, showing `current` as the value kept on empty input.
async fn prompt(
    stdin: &mut Lines<BufReader<Stdin>>,
    label: &str,
    current: &str,
) -> anyhow::Result<Option<String>> {
    if current.is_empty() {
        println!("{label}:");
    } else {
        println!("{label} [{current}]:");
    }
    let Some(line) = stdin.next_line().await? else {
        return Ok(None);
    };
    let line = line.trim_end_matches(['\r', '\n']);
    Ok(Some(if line.is_empty() { current.to_string() } else { line.to_string() }))
}

/// Fill the login form from stdin. Returns `false` on end of input.
async fn prompt_login(
    stdin: &mut Lines<BufReader<Stdin>>,
    form: &mut LoginForm,
) -> anyhow::Result<bool> {
    println!("=== Login to HeyMe ===");
    if let Some(error) = &form.error {
        println!("error: {error}");
    }

    let current_mode = match form.mode {
        AuthMode::Credentials => "credentials",
        AuthMode::Token => "token",
    };
    let Some(mode) = prompt(stdin, "Mode (credentials/token)", current_mode).await? else {
        return Ok(false);
    };
    form.mode = if mode.trim() == "token" { AuthMode::Token } else { AuthMode::Credentials };

    match form.mode {
        AuthMode::Token => {
            let Some(token) = prompt(stdin, "LiveKit Token", &form.token).await? else {
                return Ok(false);
            };
            form.token = token;
        }
        AuthMode::Credentials => {
            let Some(email) = prompt(stdin, "Email", &form.email).await? else {
                return Ok(false);
            };
            form.email = email;
            let masked = if form.password.is_empty() { "" } else { "********" };
            let Some(password) = prompt(stdin, "Password", masked).await? else {
                return Ok(false);
            };
            if password != masked {
                form.password = password;
            }
        }
    }

    println!("{}", form.submit_label());
    Ok(true)
}

async fn handle_command(client: &HeymeClient, command: Command) -> bool {
    match command {
        Command::Toggle { source, enabled } => {
            let controls = client.controls();
            let result = match source {
                TrackSource::Microphone => controls.set_microphone_enabled(enabled).await,
                TrackSource::Camera => controls.set_camera_enabled(enabled).await,
                _ => controls.set_screen_share_enabled(enabled).await,
            };
            match result {
                Ok(()) => println!("{source:?} {}", if enabled { "on" } else { "off" }),
                Err(e) => println!("error: {e}"),
            }
        }
        Command::Tiles => print_tiles(&client.tiles().await),
        Command::Leave => return false,
        Command::Help | Command::Unknown => {
            println!("commands: mic on|off, cam on|off, screen on|off, tiles, leave");
        }
    }
    true
}

pub async fn run(args: Args) -> anyhow::Result<()> {
    let data_dir = match args.data_dir {
        Some(dir) => dir,
        None => dirs::config_dir()
            .context("no config directory on this platform, pass --data-dir")?
            .join("heyme"),
    };
    let mut settings = SettingsStore::new(&data_dir).get();
    if let Some(url) = args.api_url {
        settings.api_base_url = url;
    }
    if let Some(url) = args.server_url {
        settings.server_url = url;
    }

    let client = HeymeClient::new(&settings)?;
    let (tx, mut events) = mpsc::unbounded_channel();
    client.add_listener(Arc::new(ChannelListener(tx)));

    let mut stdin = BufReader::new(tokio::io::stdin()).lines();
    let mut form = LoginForm::new(settings.default_auth_mode);

    if let Some(token) = args.token {
        form.mode = AuthMode::Token;
        form.token = token;
        client.submit_form(&mut form).await;
    }

    loop {
        let status = client.status().await;
        if status.needs_credentials() {
            if !prompt_login(&mut stdin, &mut form).await? {
                break;
            }
            if client.submit_form(&mut form).await == ConnectionStatus::Connected {
                println!("connected, type 'help' for commands");
                print_tiles(&client.tiles().await);
            }
            continue;
        }

        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            line = stdin.next_line() => match line? {
                Some(line) => {
                    if !handle_command(&client, parse_command(&line)).await {
                        break;
                    }
                }
                None => break,
            },
            event = events.recv() => match event {
                Some(HeymeEvent::RoomDisconnected) | None => {
                    client.leave().await;
                    form.error = Some("Disconnected from room".to_string());
                }
                Some(
                    HeymeEvent::ParticipantJoined(_)
                    | HeymeEvent::ParticipantLeft(_)
                    | HeymeEvent::TrackSubscribed(_)
                    | HeymeEvent::TrackUnsubscribed(_),
                ) => print_tiles(&client.tiles().await),
                Some(other) => tracing::debug!("event: {other:?}"),
            },
        }
    }

    client.leave().await;
    Ok(())
}
