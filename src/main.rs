use std::process::ExitCode;
use std::time::Duration;

use clap::{Parser, Subcommand};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::EnvFilter;
use url::Url;

use pot_simulator::{
    AudioPlayback, CaptureSession, Config, HttpBackend, Orchestrator, QueryEnvelope,
    SensorSnapshot, Speaker, SpeakerPlayer, Status,
};

/// Pot Simulator - voice-activated smart plant pot device simulator
#[derive(Parser)]
#[command(name = "pot-sim", version, about)]
struct Cli {
    /// Backend base URL
    #[arg(long, env = "POT_SIM_BACKEND_URL")]
    backend_url: Option<String>,

    /// Device identifier
    #[arg(long, env = "POT_SIM_DEVICE_ID")]
    device_id: Option<String>,

    /// Simulated temperature in degrees Celsius
    #[arg(long)]
    temperature: Option<f32>,

    /// Simulated soil moisture in percent
    #[arg(long)]
    moisture: Option<f32>,

    /// Simulated ambient light in percent
    #[arg(long)]
    light: Option<f32>,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Send a one-shot text query
    Text {
        /// Query text
        query: String,
    },
    /// Fire a manual low-moisture alert
    Alert,
    /// Update the configured plant species
    Species {
        /// Species name (e.g. "Basil")
        species: String,
    },
    /// Test microphone input
    TestMic {
        /// Duration in seconds
        #[arg(short, long, default_value = "5")]
        duration: u64,
    },
    /// Test speaker output
    TestSpeaker,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // Set up logging based on verbosity
    let filter = match cli.verbose {
        0 => "warn,pot_simulator=info",
        1 => "info,pot_simulator=debug",
        2 => "debug",
        _ => "trace",
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(filter))
        .init();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("fatal: {e}");
            ExitCode::FAILURE
        }
    }
}

#[allow(clippy::future_not_send)]
async fn run(cli: Cli) -> anyhow::Result<()> {
    let mut config = Config::load()?;
    if let Some(url) = cli.backend_url {
        config.backend_url = url;
    }
    if let Some(id) = cli.device_id {
        config.device_id = id;
    }
    if let Some(v) = cli.temperature {
        config.sensors.temperature = v;
    }
    if let Some(v) = cli.moisture {
        config.sensors.moisture = v;
    }
    if let Some(v) = cli.light {
        config.sensors.light = v;
    }

    // Hardware self-tests don't need a backend.
    match &cli.command {
        Some(Command::TestMic { duration }) => return test_mic(*duration).await,
        Some(Command::TestSpeaker) => return test_speaker(),
        _ => {}
    }

    let base_url = Url::parse(&config.backend_url)
        .map_err(|e| anyhow::anyhow!("bad backend url {}: {e}", config.backend_url))?;
    let client = reqwest::Client::new();
    let backend = HttpBackend::new(client.clone(), base_url.clone());
    let player = SpeakerPlayer::new(client, base_url);
    let mut orchestrator = Orchestrator::new(backend, player, &config);

    match cli.command {
        Some(Command::Text { query }) => {
            let envelope = QueryEnvelope::text(&config.device_id, config.sensors, query);
            orchestrator.run_query(envelope).await;
            report_cycle(&orchestrator, 0);
            Ok(())
        }
        Some(Command::Alert) => {
            let envelope = QueryEnvelope::alert(&config.device_id, config.sensors);
            orchestrator.run_query(envelope).await;
            report_cycle(&orchestrator, 0);
            Ok(())
        }
        Some(Command::Species { species }) => {
            orchestrator.update_species(&species).await;
            println!("[{}]", orchestrator.status());
            Ok(())
        }
        Some(Command::TestMic { .. } | Command::TestSpeaker) => unreachable!("handled above"),
        None => interactive(&config, &mut orchestrator).await,
    }
}

/// Interactive simulator loop on stdin
#[allow(clippy::future_not_send)]
async fn interactive(
    config: &Config,
    orchestrator: &mut Orchestrator<HttpBackend, SpeakerPlayer>,
) -> anyhow::Result<()> {
    let mut sensors = config.sensors;
    let mut session: Option<CaptureSession> = None;
    let mut printed = 0usize;

    println!("Pot simulator - device {} - backend {}", config.device_id, config.backend_url);
    println!("Empty line toggles recording; plain text sends a text query.");
    println!("Commands: /moisture N, /temperature N, /light N, /species NAME, /alert, /quit");
    println!("[{}]", Status::Ready);

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        let line = line.trim().to_string();

        match line.as_str() {
            "" => {
                if let Some(active) = session.take() {
                    orchestrator.set_status(Status::Analyzing);
                    println!("[{}]", orchestrator.status());
                    match active.stop() {
                        Ok(blob) => {
                            let envelope =
                                QueryEnvelope::voice(&config.device_id, sensors, blob);
                            orchestrator.run_query(envelope).await;
                        }
                        Err(pot_simulator::Error::EmptyCapture) => {
                            orchestrator.set_status(Status::NoAudio);
                        }
                        Err(e) => {
                            orchestrator.set_status(Status::Error(e.to_string()));
                        }
                    }
                    printed = report_cycle(orchestrator, printed);
                } else {
                    match CaptureSession::start() {
                        Ok(active) => {
                            println!("[{} at {} Hz]", Status::Listening, active.native_rate());
                            session = Some(active);
                        }
                        Err(e) => {
                            orchestrator.set_status(Status::Error(e.to_string()));
                            println!("[{}]", orchestrator.status());
                        }
                    }
                }
            }
            "/quit" | "/exit" => break,
            "/alert" => {
                let envelope = QueryEnvelope::alert(&config.device_id, sensors);
                orchestrator.run_query(envelope).await;
                printed = report_cycle(orchestrator, printed);
            }
            _ => {
                if let Some((command, value)) = line.split_once(' ') {
                    match command {
                        "/moisture" | "/temperature" | "/light" => {
                            match value.trim().parse::<f32>() {
                                Ok(v) => {
                                    apply_sensor(&mut sensors, command, v);
                                    println!(
                                        "[sensors: {:.1} C, {:.1}% moisture, {:.1}% light]",
                                        sensors.temperature, sensors.moisture, sensors.light
                                    );
                                }
                                Err(_) => println!("[invalid value: {value}]"),
                            }
                            continue;
                        }
                        "/species" => {
                            orchestrator.update_species(value.trim()).await;
                            println!("[{}]", orchestrator.status());
                            continue;
                        }
                        _ => {}
                    }
                }
                if line.starts_with('/') {
                    println!("[unknown command: {line}]");
                    continue;
                }
                let envelope = QueryEnvelope::text(&config.device_id, sensors, line);
                orchestrator.run_query(envelope).await;
                printed = report_cycle(orchestrator, printed);
            }
        }
    }

    Ok(())
}

fn apply_sensor(sensors: &mut SensorSnapshot, command: &str, value: f32) {
    match command {
        "/moisture" => sensors.moisture = value,
        "/temperature" => sensors.temperature = value,
        "/light" => sensors.light = value,
        _ => {}
    }
}

/// Print transcript entries added since the last report, plus status and mood
fn report_cycle<B: pot_simulator::Backend, P: pot_simulator::Player + 'static>(
    orchestrator: &Orchestrator<B, P>,
    printed: usize,
) -> usize {
    let transcript = orchestrator.transcript();
    for entry in &transcript[printed.min(transcript.len())..] {
        match entry.speaker {
            Speaker::User => println!("  you:   {}", entry.text),
            Speaker::Plant => println!("  plant: \"{}\"", entry.text),
        }
    }
    println!("[{} | mood: {}]", orchestrator.status(), orchestrator.mood());
    transcript.len()
}

/// Test microphone input
#[allow(clippy::future_not_send)]
async fn test_mic(duration: u64) -> anyhow::Result<()> {
    println!("Testing microphone for {duration} seconds...");
    println!("Speak into your microphone!\n");

    let session = CaptureSession::start()?;
    println!("Native rate: {} Hz", session.native_rate());
    println!("---");

    let mut last = 0usize;
    for i in 0..duration {
        tokio::time::sleep(Duration::from_secs(1)).await;
        let total = session.captured_samples();
        println!("[{:2}s] samples: {total} (+{})", i + 1, total - last);
        last = total;
    }

    match session.stop() {
        Ok(blob) => {
            println!("\n---");
            println!("Captured and encoded {} WAV bytes at 16 kHz.", blob.len());
            println!("If the sample count grew each second, your mic is working!");
        }
        Err(pot_simulator::Error::EmptyCapture) => {
            println!("\n---");
            println!("No samples captured. Check:");
            println!("  1. Is your mic plugged in?");
            println!("  2. Run: pactl info | grep 'Default Source'");
            println!("  3. Run: arecord -l (to list devices)");
        }
        Err(e) => return Err(e.into()),
    }

    Ok(())
}

/// Test speaker output with a sine wave
fn test_speaker() -> anyhow::Result<()> {
    println!("Testing speaker output...");
    println!("You should hear a 440Hz tone for 2 seconds\n");

    let playback = AudioPlayback::new()?;

    let sample_rate = 16_000_u32;
    let frequency = 440.0_f32;
    let duration_secs = 2.0_f32;
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let num_samples = (sample_rate as f32 * duration_secs) as usize;

    #[allow(clippy::cast_precision_loss)]
    let samples: Vec<f32> = (0..num_samples)
        .map(|i| {
            let t = i as f32 / sample_rate as f32;
            (2.0 * std::f32::consts::PI * frequency * t).sin() * 0.3
        })
        .collect();

    println!("Playing {} samples at {sample_rate} Hz...", samples.len());
    playback.play_blocking(&samples, sample_rate)?;

    println!("\n---");
    println!("If you heard the tone, your speakers are working!");

    Ok(())
}
