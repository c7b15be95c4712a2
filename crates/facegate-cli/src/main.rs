use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use facegate_core::{Encoding, ProjectionModel, SessionMode, Submission};
use std::path::{Path, PathBuf};

mod replay;

#[zbus::proxy(
    interface = "org.freedesktop.Facegate1",
    default_service = "org.freedesktop.Facegate1",
    default_path = "/org/freedesktop/Facegate1"
)]
trait Facegate {
    async fn available(&self, identity: &str) -> zbus::Result<(bool, bool)>;
    async fn register(
        &self,
        identity: &str,
        encodings: &[Vec<f64>],
        quality_scores: &[f64],
    ) -> zbus::Result<(bool, String, String)>;
    async fn verify(&self, identity: &str, encoding: &[f64]) -> zbus::Result<(bool, String, String)>;
    async fn delete_user(&self, identity: &str, token: &str) -> zbus::Result<bool>;
    async fn status(&self) -> zbus::Result<String>;
}

#[derive(Parser)]
#[command(name = "facegate", about = "facegate face-encoding verification CLI")]
struct Cli {
    /// Talk to a daemon on the session bus instead of the system bus
    #[arg(long, global = true)]
    session: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Check whether an identity is free and whether it has encodings
    Available { identity: String },
    /// Register encodings from a JSON array of encodings
    Register {
        identity: String,
        #[arg(long)]
        scans: PathBuf,
    },
    /// Verify one encoding (JSON array) against the claimed identity
    Verify {
        identity: String,
        #[arg(long)]
        scan: PathBuf,
    },
    /// Delete an identity and everything stored for it
    Delete {
        identity: String,
        /// Token issued to this identity by register or verify
        #[arg(long)]
        token: String,
    },
    /// Show daemon status
    Status,
    /// Encode one landmark mesh offline
    Encode {
        /// PCA model JSON
        #[arg(long)]
        model: PathBuf,
        /// JSON array of [x, y, z] landmarks
        #[arg(long)]
        landmarks: PathBuf,
    },
    /// Run a recorded frame stream (JSON lines) through a capture session
    Replay {
        #[arg(long)]
        model: PathBuf,
        #[arg(long)]
        frames: PathBuf,
        #[arg(long)]
        identity: String,
        /// Collect a single verification scan instead of a registration set
        #[arg(long)]
        verify: bool,
        /// Frames come from a front-facing (mirrored) camera
        #[arg(long)]
        mirrored: bool,
        #[arg(long, default_value_t = 640.0)]
        width: f32,
        #[arg(long, default_value_t = 480.0)]
        height: f32,
        /// TOML policy overriding the default thresholds
        #[arg(long)]
        policy: Option<PathBuf>,
        /// Send the completed session to the daemon
        #[arg(long)]
        submit: bool,
    },
}

async fn connect(session: bool) -> Result<FacegateProxy<'static>> {
    tracing::debug!(session, "connecting to facegated");
    let conn = if session {
        zbus::Connection::session().await
    } else {
        zbus::Connection::system().await
    }
    .context("failed to connect to D-Bus")?;
    Ok(FacegateProxy::new(&conn).await?)
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    serde_json::from_str(&raw).with_context(|| format!("failed to parse {}", path.display()))
}

fn wire(encoding: &Encoding) -> Vec<f64> {
    encoding.as_slice().iter().map(|&v| v as f64).collect()
}

fn print_approval((approved, message, token): (bool, String, String)) -> Result<()> {
    if approved {
        println!("approved: {message}");
        println!("token: {token}");
        Ok(())
    } else {
        bail!("rejected: {message}")
    }
}

async fn submit(proxy: &FacegateProxy<'_>, submission: &Submission) -> Result<()> {
    let reply = match submission {
        Submission::Register {
            identity,
            encodings,
            quality_scores,
        } => {
            let payload: Vec<Vec<f64>> = encodings.iter().map(wire).collect();
            let scores: Vec<f64> = quality_scores.iter().map(|&q| q as f64).collect();
            proxy.register(identity, &payload, &scores).await?
        }
        Submission::Verify { identity, encoding } => proxy.verify(identity, &wire(encoding)).await?,
    };
    print_approval(reply)
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Available { identity } => {
            let proxy = connect(cli.session).await?;
            let (available, registered) = proxy.available(&identity).await?;
            println!("available:  {available}");
            println!("registered: {registered}");
        }
        Commands::Register { identity, scans } => {
            let encodings: Vec<Encoding> = read_json(&scans)?;
            let proxy = connect(cli.session).await?;
            let submission = Submission::Register {
                identity,
                encodings,
                quality_scores: Vec::new(),
            };
            submit(&proxy, &submission).await?;
        }
        Commands::Verify { identity, scan } => {
            let encoding: Encoding = read_json(&scan)?;
            let proxy = connect(cli.session).await?;
            submit(&proxy, &Submission::Verify { identity, encoding }).await?;
        }
        Commands::Delete { identity, token } => {
            let proxy = connect(cli.session).await?;
            if proxy.delete_user(&identity, &token).await? {
                println!("deleted {identity}");
            } else {
                println!("{identity}: not found");
            }
        }
        Commands::Status => {
            let proxy = connect(cli.session).await?;
            let status: serde_json::Value = serde_json::from_str(&proxy.status().await?)?;
            println!("{}", serde_json::to_string_pretty(&status)?);
        }
        Commands::Encode { model, landmarks } => replay::run_encode(&model, &landmarks)?,
        Commands::Replay {
            model,
            frames,
            identity,
            verify,
            mirrored,
            width,
            height,
            policy,
            submit: send,
        } => {
            let model = ProjectionModel::load(&model)?;
            let file = std::fs::File::open(&frames)
                .with_context(|| format!("failed to open {}", frames.display()))?;
            let frames = replay::read_frames(std::io::BufReader::new(file))?;
            let opts = replay::ReplayOptions {
                identity: &identity,
                mode: if verify {
                    SessionMode::Verification
                } else {
                    SessionMode::Registration
                },
                mirrored,
                width,
                height,
                policy: replay::load_policy(policy.as_deref())?,
            };
            let submission = replay::replay(&frames, &model, opts)?;
            println!("{}", serde_json::to_string(&submission)?);
            if send {
                let proxy = connect(cli.session).await?;
                submit(&proxy, &submission).await?;
            }
        }
    }

    Ok(())
}
