use std::fs::{self, File};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use std::thread;
use std::time::Duration;

use anyhow::{Context, Result};
use modlayer_installer::ArchiveFetcher;
use reqwest::blocking::Client;

use crate::render::TerminalRenderer;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10 * 60);
const USER_AGENT: &str =
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0 Safari/537.36";
const DOWNLOAD_CHUNK_SIZE: usize = 64 * 1024;

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub(crate) struct RetryPolicy {
    pub(crate) attempts: usize,
    pub(crate) backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            attempts: 3,
            backoff: Duration::from_secs(2),
        }
    }
}

/// Blocking HTTP access for the spec file and component archives.
pub(crate) struct HttpClient {
    client: Client,
    retry: RetryPolicy,
    renderer: TerminalRenderer,
}

impl HttpClient {
    pub(crate) fn new(renderer: TerminalRenderer) -> Result<Self> {
        Self::with_retry(renderer, RetryPolicy::default())
    }

    pub(crate) fn with_retry(renderer: TerminalRenderer, retry: RetryPolicy) -> Result<Self> {
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .user_agent(USER_AGENT)
            .build()
            .context("failed to build HTTP client")?;
        Ok(Self {
            client,
            retry,
            renderer,
        })
    }

    pub(crate) fn fetch_text(&self, url: &str) -> Result<String> {
        with_retries(self.retry, || {
            let response = self
                .client
                .get(url)
                .send()
                .with_context(|| format!("request failed: {url}"))?
                .error_for_status()
                .with_context(|| format!("server rejected request: {url}"))?;
            response
                .text()
                .with_context(|| format!("failed to read response body: {url}"))
        })
        .with_context(|| format!("failed to fetch {url}"))
    }

    /// Streams `url` into a `.part` sibling of `destination` and renames it
    /// into place once complete. The part file never outlives a failure.
    pub(crate) fn download_file_with_progress<F>(
        &self,
        url: &str,
        destination: &Path,
        mut on_progress: F,
    ) -> Result<()>
    where
        F: FnMut(u64, Option<u64>),
    {
        if let Some(parent) = destination.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("failed to create download dir: {}", parent.display()))?;
        }

        let part_path = part_path_for(destination);
        let result = with_retries(self.retry, || {
            stream_to_file(&self.client, url, &part_path, &mut on_progress)
        });
        if let Err(err) = result {
            let _ = fs::remove_file(&part_path);
            return Err(err.context(format!("failed to download {url}")));
        }

        if destination.exists() {
            fs::remove_file(destination).with_context(|| {
                format!("failed to replace existing file: {}", destination.display())
            })?;
        }
        fs::rename(&part_path, destination).with_context(|| {
            format!(
                "failed to move downloaded archive into place: {}",
                destination.display()
            )
        })?;
        Ok(())
    }
}

impl ArchiveFetcher for HttpClient {
    fn download(&self, url: &str, destination: &Path) -> Result<()> {
        let label = destination
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| "download".to_string());
        let mut progress = self.renderer.start_progress(&label);
        let result = self.download_file_with_progress(url, destination, |downloaded, total| {
            progress.set(downloaded, total)
        });
        match result {
            Ok(()) => {
                progress.finish_success();
                Ok(())
            }
            Err(err) => {
                progress.finish_abandon();
                Err(err)
            }
        }
    }
}

/// Runs `op` until it succeeds or the policy's attempts are spent, sleeping
/// a fixed backoff between attempts. Returns the last error.
pub(crate) fn with_retries<T, F>(policy: RetryPolicy, mut op: F) -> Result<T>
where
    F: FnMut() -> Result<T>,
{
    let attempts = policy.attempts.max(1);
    let mut attempt = 1;
    loop {
        match op() {
            Ok(value) => return Ok(value),
            Err(err) if attempt >= attempts => {
                return Err(err.context(format!("giving up after {attempts} attempts")));
            }
            Err(_) => {
                attempt += 1;
                thread::sleep(policy.backoff);
            }
        }
    }
}

fn stream_to_file<F>(client: &Client, url: &str, part_path: &Path, on_progress: &mut F) -> Result<()>
where
    F: FnMut(u64, Option<u64>),
{
    let mut response = client
        .get(url)
        .send()
        .with_context(|| format!("request failed: {url}"))?
        .error_for_status()
        .with_context(|| format!("server rejected request: {url}"))?;
    let total = response.content_length();

    let mut file = File::create(part_path)
        .with_context(|| format!("failed to create {}", part_path.display()))?;
    let mut buffer = vec![0_u8; DOWNLOAD_CHUNK_SIZE];
    let mut downloaded = 0_u64;
    on_progress(downloaded, total);
    loop {
        let read = response
            .read(&mut buffer)
            .with_context(|| format!("failed reading response body: {url}"))?;
        if read == 0 {
            break;
        }
        file.write_all(&buffer[..read])
            .with_context(|| format!("failed to write {}", part_path.display()))?;
        downloaded += read as u64;
        on_progress(downloaded, total);
    }
    file.flush()
        .with_context(|| format!("failed to flush {}", part_path.display()))?;
    Ok(())
}

pub(crate) fn part_path_for(destination: &Path) -> PathBuf {
    let file_name = destination
        .file_name()
        .and_then(|value| value.to_str())
        .unwrap_or("archive");
    destination.with_file_name(format!("{file_name}.part"))
}
