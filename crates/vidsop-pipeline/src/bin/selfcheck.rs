//! Environment self-check for pipeline deployments: verifies the work
//! directory is writable and the ffmpeg tools are on PATH.

use std::path::Path;

use vidsop_media::{check_ffmpeg, check_ffprobe};
use vidsop_pipeline::{logging::init_logging, PipelineConfig};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    init_logging();

    let config = PipelineConfig::from_env();
    println!("vidsop-selfcheck: work_dir={}", config.work_dir);

    ensure_workdir(&config.work_dir).await?;

    let ffmpeg = check_ffmpeg()?;
    println!("vidsop-selfcheck: ffmpeg at {}", ffmpeg.display());
    let ffprobe = check_ffprobe()?;
    println!("vidsop-selfcheck: ffprobe at {}", ffprobe.display());

    if config.worker_pool_size == 0 {
        anyhow::bail!("VIDSOP_WORKER_POOL_SIZE must be at least 1");
    }

    println!("vidsop-selfcheck: ok");
    Ok(())
}

async fn ensure_workdir<P: AsRef<Path>>(path: P) -> anyhow::Result<()> {
    let path = path.as_ref();
    tokio::fs::create_dir_all(path).await?;
    let probe = path.join(".selfcheck");
    tokio::fs::write(&probe, b"ok").await?;
    tokio::fs::remove_file(&probe).await?;
    Ok(())
}
