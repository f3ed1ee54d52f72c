//! aquos: command-line remote for Sharp AQUOS TVs.
//!
//! ```text
//! aquos power on                   Turn the TV on
//! aquos volume                     Query the volume
//! aquos volume 20                  Set the volume
//! aquos send channel 12            Send a command in text form
//! aquos shell                      Read commands from stdin, one per line
//! aquos --gen-config               Write default config to stdout
//! ```

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

use aquos_cli::config::CliConfig;
use aquos_cli::output::Outcome;
use aquos_core::{AquosClient, AquosError, Command};

// ── CLI ──────────────────────────────────────────────────────────

#[derive(Parser, Debug)]
#[command(name = "aquos", about = "Remote control for Sharp AQUOS TVs", version)]
struct Cli {
    /// Path to configuration TOML file.
    #[arg(short, long, default_value = "aquos.toml")]
    config: PathBuf,

    /// TV address; overrides the config file.
    #[arg(long)]
    host: Option<String>,

    /// TV control port; overrides the config file.
    #[arg(short, long)]
    port: Option<u16>,

    #[arg(short, long)]
    username: Option<String>,

    #[arg(long)]
    password: Option<String>,

    /// Print each outcome as one JSON object per line.
    #[arg(long)]
    json: bool,

    /// Print the default configuration to stdout and exit.
    #[arg(long)]
    gen_config: bool,

    #[command(subcommand)]
    action: Option<Action>,
}

#[derive(Subcommand, Debug)]
enum Action {
    /// Query or set the power state.
    Power { state: Option<Switch> },
    /// Query or set muting.
    Mute { state: Option<Switch> },
    /// Query or set the volume (0-60).
    Volume {
        #[arg(allow_negative_numbers = true)]
        level: Option<i64>,
    },
    /// Query or select an input (1-9).
    Input {
        #[arg(allow_negative_numbers = true)]
        input: Option<i64>,
    },
    /// Query or tune a channel.
    Channel {
        #[arg(allow_negative_numbers = true)]
        code: Option<i64>,
    },
    /// Query or set closed captioning.
    Captioning {
        #[arg(allow_negative_numbers = true)]
        level: Option<i64>,
    },
    ChannelUp,
    ChannelDown,
    Netflix,
    /// Press a remote key by code.
    Key {
        #[arg(allow_negative_numbers = true)]
        code: i64,
    },
    /// Send a raw button code.
    Button { code: String },
    /// Send a command written as text, e.g. `send volume 20`.
    Send {
        #[arg(required = true, num_args = 1..)]
        words: Vec<String>,
    },
    /// Read commands from stdin until EOF or `quit`.
    Shell,
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum Switch {
    On,
    Off,
}

impl From<Switch> for bool {
    fn from(s: Switch) -> Self {
        matches!(s, Switch::On)
    }
}

impl Action {
    /// The single command this action sends. `None` for the shell.
    fn command(self) -> Option<Result<Command, AquosError>> {
        let cmd = match self {
            Self::Power { state } => Ok(Command::power(state.map(Into::into))),
            Self::Mute { state } => Ok(Command::mute(state.map(Into::into))),
            Self::Volume { level } => Command::volume(level),
            Self::Input { input } => Command::input(input),
            Self::Channel { code } => Command::channel(code),
            Self::Captioning { level } => Command::captioning(level),
            Self::ChannelUp => Ok(Command::ChannelUp),
            Self::ChannelDown => Ok(Command::ChannelDown),
            Self::Netflix => Ok(Command::netflix()),
            Self::Key { code } => Command::remote_key(code),
            Self::Button { code } => Command::button(code),
            Self::Send { words } => words.join(" ").parse(),
            Self::Shell => return None,
        };
        Some(cmd)
    }
}

// ── Main ─────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // --gen-config: dump defaults and exit.
    if cli.gen_config {
        let text = toml::to_string_pretty(&CliConfig::default())?;
        println!("{text}");
        return Ok(());
    }

    let mut config = CliConfig::load(&cli.config);

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.logging.level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    if let Some(host) = cli.host {
        config.tv.host = host;
    }
    if let Some(port) = cli.port {
        config.tv.port = port;
    }
    if cli.username.is_some() {
        config.tv.username = cli.username;
    }
    if cli.password.is_some() {
        config.tv.password = cli.password;
    }

    let Some(action) = cli.action else {
        eprintln!("no command given; try `aquos --help`");
        std::process::exit(2);
    };

    // Parse before connecting so bad input never opens a socket.
    let single = action.command().transpose()?;

    info!("aquos v{}", env!("CARGO_PKG_VERSION"));
    let client = AquosClient::connect(config.tv).await?;
    debug!(addr = %client.config().connection_info(), state = %client.state(), "connected");

    let result = match single {
        Some(cmd) => run_one(&client, cmd, cli.json).await,
        None => run_shell(&client, cli.json).await,
    };

    client.close().await;
    result
}

async fn run_one(
    client: &AquosClient,
    cmd: Command,
    json: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let result = client.send(cmd.clone()).await;
    println!("{}", Outcome::new(&cmd, &result).render(json));
    result?;
    Ok(())
}

async fn run_shell(client: &AquosClient, json: bool) -> Result<(), Box<dyn std::error::Error>> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    while let Some(line) = lines.next_line().await? {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        if matches!(line, "quit" | "exit") {
            break;
        }

        let cmd = match line.parse::<Command>() {
            Ok(cmd) => cmd,
            Err(e) => {
                eprintln!("{e}");
                continue;
            }
        };
        let result = client.send(cmd.clone()).await;
        println!("{}", Outcome::new(&cmd, &result).render(json));

        // Nothing more can succeed once the client is gone.
        if let Err(e) = result
            && e.is_terminal()
        {
            return Err(e.into());
        }
    }
    Ok(())
}
