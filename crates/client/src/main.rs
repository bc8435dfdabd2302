//! Athena headless client
//!
//! Logs in, picks the configured char server and character, enters the map
//! and prints every session event until the connection ends or the login is
//! refused. Ctrl-C logs out first.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::Context;
use athena_config::ClientConfig;
use athena_game::ClientEvent;
use athena_session::{Credentials, Session, SessionEvent, SessionState};
use clap::Parser;
use tokio::sync::mpsc::UnboundedReceiver;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

/// Logic loop period
const TICK: Duration = Duration::from_millis(10);

/// How long a clean logout may take after Ctrl-C
const QUIT_GRACE: Duration = Duration::from_secs(5);

#[derive(Parser, Debug)]
#[command(name = "athena-client", about = "Headless client for Athena servers")]
struct Args {
    /// Configuration file (default: config/client.conf)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Print events as JSON lines on stdout
    #[arg(long)]
    json: bool,

    /// Account name, overrides the config file
    #[arg(short, long)]
    username: Option<String>,

    /// Account password, overrides the config file
    #[arg(short, long)]
    password: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => ClientConfig::load_from_file(path)
            .with_context(|| format!("reading {}", path.display()))?,
        None => ClientConfig::load_default(),
    };
    if let Some(username) = args.username {
        config.username = username;
    }
    if let Some(password) = args.password {
        config.password = password;
    }

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.log_filter));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    config.display();
    if config.username.is_empty() {
        anyhow::bail!("no account name, set `username` in the config or pass --username");
    }

    let credentials = Credentials::new(config.username.clone(), config.password.clone());
    let mut session = Session::new(config).context("building handler set")?;
    let mut events = session.subscribe();

    session
        .connect_login(credentials)
        .await
        .context("connecting to login server")?;

    let mut autopilot = Autopilot::default();
    let mut refusal = None;
    let mut ticker = tokio::time::interval(TICK);
    let outcome = loop {
        tokio::select! {
            _ = ticker.tick() => {
                session.tick().await;
                if let Some(reason) = print_events(&mut events, args.json)? {
                    refusal = Some(reason);
                }
                autopilot.advance(&mut session).await;
                if let Some(outcome) = finished(session.state(), &mut refusal) {
                    break outcome;
                }
            }
            _ = tokio::signal::ctrl_c() => {
                info!("Interrupted, leaving");
                shut_down(&mut session, &mut events, args.json).await?;
                break Ok(());
            }
        }
    };

    print_events(&mut events, args.json)?;
    info!("Session ended");
    outcome
}

/// How the run ends in `state`, if it does
///
/// A refused login leaves nothing to drive, so it ends the run with an
/// error carrying the server's reason.
fn finished(state: SessionState, refusal: &mut Option<String>) -> Option<anyhow::Result<()>> {
    match state {
        SessionState::Disconnected => Some(Ok(())),
        SessionState::LoginError => {
            let reason = refusal.take().unwrap_or_else(|| "refused by server".to_string());
            error!("Login failed: {}", reason);
            Some(Err(anyhow::anyhow!("login failed: {}", reason)))
        }
        _ => None,
    }
}

/// Makes the choices an interactive client would ask the player for
#[derive(Default)]
struct Autopilot {
    /// A select request is out and the char server has not answered yet
    selecting: bool,
}

impl Autopilot {
    async fn advance(&mut self, session: &mut Session) {
        if session.state() != SessionState::CharSelect {
            self.selecting = false;
        }

        let result = match session.state() {
            SessionState::LoginOk => {
                let index = session.config().char_server_index;
                session.connect_char_server(index).await
            }
            SessionState::CharSelect if !self.selecting => {
                self.selecting = true;
                let slot = session.config().character_slot;
                session.select_character(slot)
            }
            _ if session.map_load_pending() => session.map_loaded(),
            _ => Ok(()),
        };

        if let Err(e) = result {
            error!("{}", e);
            session.disconnect();
        }
    }
}

/// Log out politely when in game, otherwise just hang up
async fn shut_down(
    session: &mut Session,
    events: &mut UnboundedReceiver<SessionEvent>,
    json: bool,
) -> anyhow::Result<()> {
    if session.state() != SessionState::InGame || session.quit().is_err() {
        session.disconnect();
        return Ok(());
    }

    let deadline = tokio::time::Instant::now() + QUIT_GRACE;
    while session.state() != SessionState::Disconnected {
        if tokio::time::Instant::now() >= deadline {
            warn!("No logout answer within {:?}, dropping connection", QUIT_GRACE);
            session.disconnect();
            break;
        }
        session.tick().await;
        print_events(events, json)?;
        tokio::time::sleep(TICK).await;
    }
    Ok(())
}

/// Print pending events, returning the reason of the last login refusal
fn print_events(
    events: &mut UnboundedReceiver<SessionEvent>,
    json: bool,
) -> anyhow::Result<Option<String>> {
    let mut refusal = None;
    while let Ok(event) = events.try_recv() {
        if let SessionEvent::Decoded(ClientEvent::LoginFailed { reason, .. }) = &event {
            refusal = Some(reason.clone());
        }
        if json {
            println!("{}", serde_json::to_string(&event)?);
            continue;
        }
        match &event {
            SessionEvent::NetworkError { role, error } => warn!("{:?}: {}", role, error),
            SessionEvent::PingTimeout { role, silent_ms } => {
                warn!("{:?} silent for {} ms", role, silent_ms)
            }
            SessionEvent::MessageDropped { role, opcode, error } => {
                warn!("{:?} message 0x{:04x} dropped: {}", role, opcode, error)
            }
            SessionEvent::StateChanged { from, to } => info!("{} -> {}", from, to),
            SessionEvent::Decoded(decoded) => info!("{:?}", decoded),
        }
    }
    Ok(refusal)
}
