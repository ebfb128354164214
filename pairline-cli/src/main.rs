use clap::{Args, Parser, Subcommand};
use pairline_cli::application::HELP;
use pairline_cli::{
    describe, parse_line, run_demo, CliError, ConsoleInput, DemoOptions, LogConfig, Result,
};
use pairline_core::{
    BlockList, JsonFileBlockStore, Preferences, SessionConfig, SessionEvent, SignalingMessage,
    UserCommand,
};
use pairline_p2p::{IceServer, ParticipantLoopBuilder, RuntimeConfig};
use std::path::PathBuf;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tracing::info;

#[derive(Parser)]
#[command(name = "pairline")]
#[command(version, about = "Pairline - anonymous 1:1 video chat matchmaking and signaling")]
struct Cli {
    /// Debug-level logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    json_logs: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Pair two in-process participants and walk one session
    Demo {
        #[command(flatten)]
        session: SessionArgs,
    },

    /// Join a signalling room and chat with strangers from the terminal
    Join {
        /// Matchbox signalling server URL
        #[arg(short = 's', long, default_value = "ws://localhost:3536")]
        server: String,

        /// Room everyone who wants to match joins
        #[arg(short = 'r', long, default_value = "pairline")]
        room: String,

        #[command(flatten)]
        session: SessionArgs,

        /// ICE server as `url` or `url|username|credential`; replaces the default STUN list
        #[arg(long = "ice-server")]
        ice_servers: Vec<String>,

        /// TURN server URL (optional, format: turn:host:port)
        #[arg(long)]
        turn_server: Option<String>,

        /// TURN username (required if turn-server is set)
        #[arg(long)]
        turn_username: Option<String>,

        /// TURN credential (required if turn-server is set)
        #[arg(long)]
        turn_credential: Option<String>,

        /// File the block list is kept in
        #[arg(long)]
        block_file: Option<PathBuf>,

        /// Start searching again after a pairing ends
        #[arg(long)]
        auto_requeue: bool,
    },

    /// Print the JSON schema of the signaling wire format
    Schema {
        /// Write to a file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

#[derive(Args)]
struct SessionArgs {
    /// Only match people with this language
    #[arg(short = 'l', long)]
    language: Option<String>,

    /// Comma-separated interests
    #[arg(short = 'i', long, value_delimiter = ',')]
    interests: Vec<String>,

    /// Show video as soon as the connection is up
    #[arg(long)]
    no_safe_mode: bool,
}

impl SessionArgs {
    fn into_config(self) -> SessionConfig {
        let mut preferences = Preferences::new().with_interests(self.interests);
        if let Some(language) = self.language {
            preferences = preferences.with_language(language);
        }

        SessionConfig::default()
            .with_preferences(preferences)
            .with_safe_mode(!self.no_safe_mode)
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut logging = if cli.verbose {
        LogConfig::dev()
    } else {
        LogConfig::default()
    };
    if cli.json_logs {
        logging = logging.with_json();
    }
    logging.init().map_err(CliError::Logging)?;

    match cli.command {
        Commands::Demo { session } => {
            let options = DemoOptions {
                session: session
                    .into_config()
                    .with_beacon_interval(std::time::Duration::from_millis(200)),
                ..DemoOptions::default()
            };
            let outcome = run_demo(options).await?;
            println!(
                "✅ Demo finished: revealed={}, chat delivered={}",
                outcome.revealed(),
                outcome.bob_received_chat()
            );
        }
        Commands::Join {
            server,
            room,
            session,
            ice_servers,
            turn_server,
            turn_username,
            turn_credential,
            block_file,
            auto_requeue,
        } => {
            let runtime = build_runtime_config(
                &server,
                &room,
                &ice_servers,
                turn_server,
                turn_username,
                turn_credential,
            )?;
            let session = session.into_config().with_auto_requeue(auto_requeue);
            join(runtime, session, block_file).await?;
        }
        Commands::Schema { output } => {
            let schema = schemars::schema_for!(SignalingMessage);
            let json = serde_json::to_string_pretty(&schema)?;
            match output {
                Some(path) => {
                    std::fs::write(&path, json)?;
                    info!("📄 Schema written to {}", path.display());
                }
                None => println!("{}", json),
            }
        }
    }

    Ok(())
}

fn build_runtime_config(
    server: &str,
    room: &str,
    ice_server_args: &[String],
    turn_server: Option<String>,
    turn_username: Option<String>,
    turn_credential: Option<String>,
) -> Result<RuntimeConfig> {
    let mut ice_servers = if ice_server_args.is_empty() {
        IceServer::default_stun_servers()
    } else {
        ice_server_args
            .iter()
            .map(|arg| {
                IceServer::parse(arg)
                    .ok_or_else(|| CliError::InvalidConfig(format!("Bad ICE server: {}", arg)))
            })
            .collect::<Result<Vec<_>>>()?
    };

    if let Some(turn_url) = turn_server {
        match (turn_username, turn_credential) {
            (Some(username), Some(credential)) => {
                info!("Using TURN server: {}", turn_url);
                ice_servers.insert(0, IceServer::turn(turn_url, username, credential));
            }
            _ => {
                return Err(CliError::InvalidConfig(
                    "TURN server requires both username and credential".to_string(),
                ));
            }
        }
    }

    Ok(RuntimeConfig::new(server)
        .with_room(room)
        .with_ice_servers(ice_servers))
}

async fn join(
    runtime: RuntimeConfig,
    session: SessionConfig,
    block_file: Option<PathBuf>,
) -> Result<()> {
    info!(
        "Connecting to signalling server: {} (room {})",
        runtime.signalling_server, runtime.room
    );

    let blocks = match block_file {
        Some(path) => BlockList::load_or_empty(JsonFileBlockStore::new(path)),
        None => BlockList::in_memory(),
    };

    let participant = ParticipantLoopBuilder::new()
        .session_config(session)
        .runtime_config(runtime)
        .block_list(blocks)
        .build_matchbox()
        .await?;

    println!(
        "🟢 Joined as {}. Type /search to find someone, /help for commands.",
        participant.id().short()
    );

    let (command_tx, command_rx) = mpsc::unbounded_channel();
    let (event_tx, event_rx) = mpsc::unbounded_channel();

    let input = tokio::spawn(read_console(command_tx));
    let printer = tokio::spawn(print_events(event_rx));

    // The matchbox socket stays on this task
    participant.run(command_rx, event_tx).await;

    input.abort();
    if let Err(e) = printer.await {
        tracing::warn!("Event printer failed: {}", e);
    }
    println!("👋 Bye");
    Ok(())
}

/// Turn stdin lines into commands until /quit, EOF or Ctrl+C
async fn read_console(commands: mpsc::UnboundedSender<UserCommand>) {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        let line = tokio::select! {
            line = lines.next_line() => line,
            _ = tokio::signal::ctrl_c() => break,
        };

        let line = match line {
            Ok(Some(line)) => line,
            Ok(None) => break,
            Err(e) => {
                tracing::warn!("Failed to read stdin: {}", e);
                break;
            }
        };

        match parse_line(&line) {
            Some(ConsoleInput::Command(command)) => {
                if commands.send(command).is_err() {
                    break;
                }
            }
            Some(ConsoleInput::Help) => println!("{}", HELP),
            Some(ConsoleInput::Quit) => break,
            Some(ConsoleInput::Invalid(message)) => println!("❓ {}", message),
            None => {}
        }
    }
}

async fn print_events(mut events: mpsc::UnboundedReceiver<SessionEvent>) {
    while let Some(event) = events.recv().await {
        println!("{}", describe(&event));
    }
}
