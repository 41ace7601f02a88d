use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use qr_scan::tools::{ReadingRate, bench_limit_from_env, dataset_iter, dataset_root_from_env, scan_paths};
use qr_scan::{BackendKind, ReplayCamera, ScanConfig, ScanSession, ScanSnapshot, ScanState};
use tracing::info;

#[derive(Parser)]
#[command(name = "qrscan", version, about = "QR scan session CLI")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Scan a single image file
    Image {
        #[arg(long)]
        path: PathBuf,
        /// Backend to try first (`rqrr` or `binarized`)
        #[arg(long)]
        primary: Option<BackendKind>,
    },
    /// Replay a directory of images as a camera feed until a code decodes
    Camera {
        #[arg(long)]
        frames: PathBuf,
        /// Restart from the first frame when the feed runs out
        #[arg(long = "loop")]
        looping: bool,
        /// Give up (cancel the scan) after this many seconds
        #[arg(long, default_value_t = 30)]
        timeout_secs: u64,
    },
    /// Compute reading rate on a dataset
    Batch {
        #[arg(long)]
        root: Option<PathBuf>,
        #[arg(long)]
        limit: Option<usize>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();
    let config = ScanConfig::from_env();

    match cli.command {
        Command::Image { path, primary } => image_cmd(config, &path, primary).await,
        Command::Camera {
            frames,
            looping,
            timeout_secs,
        } => camera_cmd(config, &frames, looping, Duration::from_secs(timeout_secs)).await,
        Command::Batch { root, limit } => batch_cmd(config, root, limit).await,
    }
}

fn init_tracing() {
    use tracing_subscriber::{EnvFilter, FmtSubscriber};
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .finish();
    let _ = tracing::subscriber::set_global_default(subscriber);
}

async fn image_cmd(config: ScanConfig, path: &Path, primary: Option<BackendKind>) -> Result<()> {
    let config = match primary {
        Some(kind) => config.with_primary(kind),
        None => config,
    };
    // Still images never touch the camera
    let camera = Arc::new(ReplayCamera::new(Vec::new()).unsupported());
    let session = ScanSession::new(config, camera).context("invalid scan configuration")?;

    let start = Instant::now();
    session.start_with_image(path.to_path_buf());
    let snapshot = session.settled().await;
    info!(elapsed_ms = start.elapsed().as_millis() as u64, "image scan settled");

    println!("Image: {}", path.display());
    report(&snapshot)
}

async fn camera_cmd(config: ScanConfig, frames: &Path, looping: bool, timeout: Duration) -> Result<()> {
    let dir = frames.to_path_buf();
    let max_dim = config.max_image_dim;
    let camera = tokio::task::spawn_blocking(move || ReplayCamera::from_dir(&dir, max_dim))
        .await
        .context("frame loader panicked")?
        .with_context(|| format!("load frames from {}", frames.display()))?
        .looping(looping);
    let camera = Arc::new(camera);
    let session = ScanSession::new(config, camera.clone()).context("invalid scan configuration")?;

    session.start_with_camera().await;
    let snapshot = match tokio::time::timeout(timeout, session.settled()).await {
        Ok(snapshot) => snapshot,
        Err(_) => {
            session.cancel();
            bail!(
                "no QR code after {}s ({} frames sampled)",
                timeout.as_secs(),
                camera.frames_served()
            );
        }
    };

    println!("Frames sampled: {}", camera.frames_served());
    report(&snapshot)
}

async fn batch_cmd(config: ScanConfig, root: Option<PathBuf>, limit: Option<usize>) -> Result<()> {
    let root = root.unwrap_or_else(dataset_root_from_env);
    let limit = limit.or_else(bench_limit_from_env);
    let images: Vec<PathBuf> = dataset_iter(&root, limit).collect();
    if images.is_empty() {
        bail!("no images found under {}", root.display());
    }

    let chain = config.decoder_chain().context("invalid scan configuration")?;
    let max_dim = config.max_image_dim;
    let start = Instant::now();
    let entries = tokio::task::spawn_blocking(move || scan_paths(&chain, &images, max_dim))
        .await
        .context("batch worker panicked")?;
    let elapsed = start.elapsed();

    for entry in &entries {
        match &entry.outcome {
            Ok(decoded) => println!("ok    {} [{}]", entry.path.display(), decoded.backend),
            Err(err) => println!("fail  {} ({err})", entry.path.display()),
        }
    }

    let rate = ReadingRate::from_entries(&entries);
    println!("Root: {}", root.display());
    println!("Images: {}", rate.total);
    println!("Decoded: {}", rate.decoded);
    println!("Load errors: {}", rate.load_errors);
    println!("Reading rate: {:.2}%", rate.percent());
    println!("Elapsed: {:.2}s", elapsed.as_secs_f64());
    Ok(())
}

fn report(snapshot: &ScanSnapshot) -> Result<()> {
    match &snapshot.state {
        ScanState::Success(result) => {
            println!("{}", result.message());
            if let Some(version) = result.decoded.version {
                println!("Version: {version}");
            }
            if let Some(level) = result.decoded.error_correction {
                println!("Error correction: {level:?}");
            }
            println!("Content: {}", result.payload());
            Ok(())
        }
        ScanState::Error(failure) => bail!("{}", failure.message),
        other => bail!("scan ended in unexpected state {:?}", other.status()),
    }
}
