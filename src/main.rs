use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use dialoguer::Input;
use tracing_subscriber::EnvFilter;

use jamie_voicebot::api::ApiServerBuilder;
use jamie_voicebot::controller::{TurnController, TurnOutcome};
use jamie_voicebot::gateway::{AudioFormat, Gateways, Transcription};
use jamie_voicebot::presentation::TranscriptView;
use jamie_voicebot::voice::{AudioPlayback, inspect_wav};
use jamie_voicebot::Config;

/// Jamie - a voice chat companion
#[derive(Parser)]
#[command(name = "jamie", version, about)]
struct Cli {
    /// Port to listen on (overrides the config file)
    #[arg(short, long, env = "JAMIE_PORT")]
    port: Option<u16>,

    /// Address to bind (overrides the config file)
    #[arg(long, env = "JAMIE_BIND")]
    bind: Option<String>,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Serve the browser chat page (default)
    Serve,
    /// Chat in the terminal, hearing replies through a local player
    Chat {
        /// Print replies without playing audio
        #[arg(long)]
        mute: bool,
    },
    /// Transcribe a 16-bit PCM WAV file
    Transcribe {
        /// Path to the WAV file
        path: PathBuf,
    },
    /// Synthesize text with the configured voice
    Speak {
        /// Text to speak
        #[arg(default_value = "Hi! I'm Jamie. What's on your mind?")]
        text: String,
        /// Write the audio here instead of playing it
        #[arg(short, long)]
        out: Option<PathBuf>,
    },
    /// Interactive first-run setup
    Setup,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let filter = match cli.verbose {
        0 => "info,jamie_voicebot=info",
        1 => "info,jamie_voicebot=debug",
        2 => "debug",
        _ => "trace",
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)))
        .init();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("fatal: {e:#}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let command = cli.command.unwrap_or(Command::Serve);
    if matches!(command, Command::Setup) {
        return jamie_voicebot::setup::run_setup();
    }

    let mut config = Config::load()?;
    if let Some(port) = cli.port {
        config.server.port = port;
    }
    if let Some(bind) = cli.bind {
        config.server.bind = bind;
    }
    tracing::debug!(?config, "loaded configuration");

    let gateways = Gateways::from_config(&config)?;

    match command {
        Command::Serve => serve(&config, gateways).await,
        Command::Chat { mute } => chat(config, gateways, mute).await,
        Command::Transcribe { path } => transcribe(&gateways, &path).await,
        Command::Speak { text, out } => speak(&gateways, &text, out).await,
        Command::Setup => Ok(()),
    }
}

/// Run the HTTP server until interrupted
async fn serve(config: &Config, gateways: Gateways) -> anyhow::Result<()> {
    let persona = Arc::new(config.persona.clone());

    tracing::info!(
        persona = persona.name(),
        model = %config.llm.model,
        voice = %config.speech.voice,
        "starting jamie"
    );
    println!(
        "Jamie is listening on http://{}:{}/",
        config.server.bind, config.server.port
    );

    ApiServerBuilder::new(gateways, persona)
        .config(config)
        .build()
        .run()
        .await?;

    Ok(())
}

/// Terminal conversation loop over a single controller
async fn chat(config: Config, gateways: Gateways, mute: bool) -> anyhow::Result<()> {
    let persona = Arc::new(config.persona);
    let name = persona.name().to_string();
    let mut controller = TurnController::new(gateways, persona);

    let playback = if mute {
        None
    } else {
        match AudioPlayback::detect() {
            Ok(p) => Some(p),
            Err(e) => {
                tracing::warn!(error = %e, "replies will be text only");
                None
            }
        }
    };

    println!("Chatting with {name}. Type /wav <file> to send a recording, /history to see the conversation, /quit to leave.\n");

    loop {
        let line: String = match Input::new().with_prompt("You").allow_empty(true).interact_text() {
            Ok(line) => line,
            // stdin closed
            Err(_) => break,
        };

        let result = match line.trim() {
            "/quit" | "/exit" => break,
            "/history" => {
                let view = TranscriptView::render(controller.history(), &name, None);
                println!("\nFull Conversation Memory\n{}", view.memory_lines());
                continue;
            }
            cmd => match cmd.strip_prefix("/wav ") {
                Some(path) => match std::fs::read(path.trim()) {
                    Ok(audio) => controller.on_audio_captured(&audio).await,
                    Err(e) => {
                        eprintln!("error: {e}\n");
                        continue;
                    }
                },
                None => controller.on_text_submitted(&line).await,
            },
        };

        match result {
            Ok(TurnOutcome::Idle) => {}
            Ok(TurnOutcome::Replied { assistant, audio, .. }) => {
                println!("{name}: {}\n", assistant.text());
                let Some(playback) = &playback else { continue };
                if let Err(e) = playback.play(&audio).await {
                    tracing::warn!(error = %e, "playback failed");
                }
            }
            Err(e) => eprintln!("error: {e}\n"),
        }
    }

    Ok(())
}

/// Print the transcription of a WAV file
async fn transcribe(gateways: &Gateways, path: &Path) -> anyhow::Result<()> {
    let audio = std::fs::read(path)?;
    let info = inspect_wav(&audio)?;
    tracing::info!(
        path = %path.display(),
        sample_rate = info.sample_rate,
        channels = info.channels,
        duration_ms = info.duration_ms,
        "transcribing file"
    );

    match gateways.transcribe(&audio, AudioFormat::WavPcm16).await? {
        Transcription::Recognized(text) => println!("{text}"),
        Transcription::NoSpeech => println!("(no speech recognized)"),
    }

    Ok(())
}

/// Synthesize text and play it or write it to a file
async fn speak(gateways: &Gateways, text: &str, out: Option<PathBuf>) -> anyhow::Result<()> {
    let artifact = gateways.synthesize(text).await?;
    println!("Got {} bytes of {}", artifact.bytes.len(), artifact.mime_type);

    match out {
        Some(path) => {
            std::fs::write(&path, &artifact.bytes)?;
            println!("Wrote {}", path.display());
        }
        None => AudioPlayback::detect()?.play(&artifact).await?,
    }

    Ok(())
}
