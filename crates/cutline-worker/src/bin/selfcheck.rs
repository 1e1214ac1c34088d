use std::process::Command;

use cutline_media::{check_ffmpeg, check_ffprobe};
use cutline_worker::WorkerConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = WorkerConfig::from_env();

    println!(
        "cutline-selfcheck: starting with work_dir={} output_dir={}",
        config.work_dir.display(),
        config.output_dir.display()
    );
    config.ensure_dirs().await?;

    let ffmpeg = check_ffmpeg()?;
    ensure_runs(&ffmpeg)?;
    let ffprobe = check_ffprobe()?;
    ensure_runs(&ffprobe)?;

    println!("cutline-selfcheck: ok");
    Ok(())
}

fn ensure_runs(binary: &std::path::Path) -> anyhow::Result<()> {
    let output = Command::new(binary)
        .arg("-version")
        .output()
        .map_err(|e| anyhow::anyhow!("{} not available: {}", binary.display(), e))?;

    if !output.status.success() {
        return Err(anyhow::anyhow!(
            "{} -version failed: {:?}",
            binary.display(),
            output.status
        ));
    }
    Ok(())
}
