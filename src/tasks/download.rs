use std::path::{Path, PathBuf};
use tokio::fs::OpenOptions;
use tokio::io::AsyncWriteExt;
use tracing::{info, warn};

use crate::error::{ViduError, ViduResult};
use crate::vidu::ViduClient;

/// Stream a finished video into `dir` as `{prefix}_{unix_seconds}.mp4`.
pub async fn download_video(
    client: &ViduClient,
    url: &str,
    dir: &Path,
    prefix: &str,
) -> ViduResult<PathBuf> {
    if url.is_empty() || !(url.starts_with("http://") || url.starts_with("https://")) {
        return Err(ViduError::validation(format!("invalid video url: \"{url}\"")));
    }

    tokio::fs::create_dir_all(dir).await?;

    let mut resp = client.http().get(url).send().await?;
    let status = resp.status();
    if !status.is_success() {
        let body = resp.text().await.unwrap_or_default();
        return Err(ViduError::Api {
            status: status.as_u16(),
            body,
        });
    }

    let (path, mut file) = create_target(dir, prefix).await?;
    info!(url, path = %path.display(), "downloading video");

    let mut written: u64 = 0;
    let streamed: ViduResult<()> = async {
        while let Some(chunk) = resp.chunk().await? {
            file.write_all(&chunk).await?;
            written += chunk.len() as u64;
        }
        file.flush().await?;
        Ok(())
    }
    .await;

    if let Err(e) = streamed {
        drop(file);
        if let Err(rm) = tokio::fs::remove_file(&path).await {
            warn!(path = %path.display(), "failed to remove partial download: {rm}");
        }
        return Err(e);
    }

    info!(path = %path.display(), bytes = written, "video downloaded");
    Ok(path)
}

/// Open a fresh file for the download. Two downloads with the same prefix in
/// the same second get distinct names instead of clobbering each other.
async fn create_target(dir: &Path, prefix: &str) -> ViduResult<(PathBuf, tokio::fs::File)> {
    let stamp = chrono::Utc::now().timestamp();
    let primary = dir.join(format!("{prefix}_{stamp}.mp4"));

    match OpenOptions::new().write(true).create_new(true).open(&primary).await {
        Ok(file) => Ok((primary, file)),
        Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => {
            let suffix = &uuid::Uuid::new_v4().simple().to_string()[..8];
            let fallback = dir.join(format!("{prefix}_{stamp}_{suffix}.mp4"));
            let file = OpenOptions::new()
                .write(true)
                .create_new(true)
                .open(&fallback)
                .await?;
            Ok((fallback, file))
        }
        Err(e) => Err(e.into()),
    }
}
