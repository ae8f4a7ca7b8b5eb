use std::{
    path::{Path, PathBuf},
    process::Stdio,
    sync::LazyLock,
    time::Duration,
};

use gallerist_model::ContentKind;
use regex::Regex;
use tokio::process::Command;
use tracing::debug;

use super::Dimensions;
use crate::error::ProbeError;

static DIMENSIONS_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?m)^\s*(\d+)\s*x\s*(\d+)").expect("dimension pattern")
});

/// Where to find `ffprobe` and how long one invocation may run.
#[derive(Debug, Clone)]
pub struct FfprobeConfig {
    pub program: PathBuf,
    pub timeout: Duration,
}

impl Default for FfprobeConfig {
    fn default() -> Self {
        Self {
            program: PathBuf::from("ffprobe"),
            timeout: Duration::from_secs(30),
        }
    }
}

/// Run `ffprobe` against the first video stream of `path`.
///
/// The child is killed if the timeout elapses.
pub async fn probe_video(
    config: &FfprobeConfig,
    path: &Path,
) -> Result<Dimensions, ProbeError> {
    let mut command = Command::new(&config.program);
    command
        .args([
            "-v",
            "error",
            "-select_streams",
            "v:0",
            "-show_entries",
            "stream=width,height",
            "-of",
            "csv=s=x:p=0",
        ])
        .arg(path)
        .stdin(Stdio::null())
        .kill_on_drop(true);

    let output = tokio::time::timeout(config.timeout, command.output())
        .await
        .map_err(|_| ProbeError::Timeout(config.timeout))?
        .map_err(|err| {
            ProbeError::Tool(format!(
                "failed to run {}: {err}",
                config.program.display()
            ))
        })?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(ProbeError::Tool(format!(
            "{} exited with {}: {}",
            config.program.display(),
            output.status,
            stderr.trim()
        )));
    }

    let stdout = String::from_utf8_lossy(&output.stdout);
    let (width, height) = parse_dimensions(&stdout).ok_or_else(|| {
        ProbeError::Undeterminable(format!(
            "no WIDTHxHEIGHT in ffprobe output for {}",
            path.display()
        ))
    })?;

    debug!(path = %path.display(), width, height, "video dimensions probed");

    Ok(Dimensions {
        kind: ContentKind::Video,
        width,
        height,
    })
}

/// First non-zero `WIDTHxHEIGHT` pair in the probe output.
pub(crate) fn parse_dimensions(output: &str) -> Option<(u32, u32)> {
    DIMENSIONS_PATTERN.captures_iter(output).find_map(|caps| {
        let width = caps.get(1)?.as_str().parse::<u32>().ok()?;
        let height = caps.get(2)?.as_str().parse::<u32>().ok()?;
        (width > 0 && height > 0).then_some((width, height))
    })
}
