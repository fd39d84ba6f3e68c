use crate::models::error::SError;
use crate::models::remote::RemoteModRecord;
use crate::utils::file::FileUtils;
use camino::Utf8Path;
use std::fs::File;
use std::io::{Read, Write};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tracing::{debug, info};

const USER_AGENT: &str = concat!("overlay_keeper/", env!("CARGO_PKG_VERSION"));
const READ_CHUNK: usize = 64 * 1024;

/// Everything the manager needs from the network.
pub trait RemoteSource: Send + Sync {
    /// GETs a text document (the metadata post).
    fn fetch_text(&self, url: &str) -> Result<String, SError>;

    /// Streams `url` into `dest`, reporting whole percentages when the size is known.
    fn download(
        &self,
        url: &str,
        dest: &Utf8Path,
        progress: &mut dyn FnMut(u8),
        cancel: &AtomicBool,
    ) -> Result<u64, SError>;

    /// Fetches the unmodified asset at `rel` (relative to the target root) into `dest`.
    fn fetch_original(&self, rel: &Utf8Path, dest: &Utf8Path) -> Result<(), SError>;

    fn fetch_record(&self, url: &str) -> Result<RemoteModRecord, SError> {
        RemoteModRecord::from_json(&self.fetch_text(url)?)
    }
}

pub struct HttpSource {
    agent: ureq::Agent,
    patch_base_url: Option<String>,
}

impl HttpSource {
    pub fn new(timeout_secs: u64, patch_base_url: Option<String>) -> Self {
        let agent = ureq::AgentBuilder::new()
            .timeout_connect(Duration::from_secs(5))
            .timeout_read(Duration::from_secs(timeout_secs))
            .timeout_write(Duration::from_secs(timeout_secs))
            .build();

        Self {
            agent,
            patch_base_url: patch_base_url.filter(|url| !url.trim().is_empty()),
        }
    }

    fn stream(
        &self,
        url: &str,
        output: &mut File,
        progress: &mut dyn FnMut(u8),
        cancel: &AtomicBool,
    ) -> Result<u64, SError> {
        let response = self.agent.get(url).set("User-Agent", USER_AGENT).call()?;
        let total = response
            .header("Content-Length")
            .and_then(|len| len.parse::<u64>().ok())
            .filter(|len| *len > 0);

        let mut reader = response.into_reader();
        let mut buffer = vec![0u8; READ_CHUNK];
        let mut received = 0u64;
        let mut last_percent = None;

        loop {
            if cancel.load(Ordering::Relaxed) {
                return Err(SError::Cancelled);
            }
            let read = reader
                .read(&mut buffer)
                .map_err(|e| SError::Network(e.to_string()))?;
            if read == 0 {
                break;
            }
            output.write_all(&buffer[..read])?;
            received += read as u64;

            if let Some(total) = total {
                let percent = (received.min(total) * 100 / total) as u8;
                if last_percent != Some(percent) {
                    last_percent = Some(percent);
                    progress(percent);
                }
            }
        }

        output.sync_all()?;
        Ok(received)
    }
}

impl RemoteSource for HttpSource {
    fn fetch_text(&self, url: &str) -> Result<String, SError> {
        debug!("GET {url}");
        let response = self.agent.get(url).set("User-Agent", USER_AGENT).call()?;
        response
            .into_string()
            .map_err(|e| SError::Network(e.to_string()))
    }

    fn download(
        &self,
        url: &str,
        dest: &Utf8Path,
        progress: &mut dyn FnMut(u8),
        cancel: &AtomicBool,
    ) -> Result<u64, SError> {
        info!("downloading {url}");
        FileUtils::ensure_parent(dest)?;

        let partial = FileUtils::sibling(dest, "partial");
        let mut output = File::create(&partial)?;

        match self.stream(url, &mut output, progress, cancel) {
            Ok(bytes) => {
                drop(output);
                std::fs::rename(&partial, dest)?;
                Ok(bytes)
            }
            Err(e) => {
                drop(output);
                let _ = std::fs::remove_file(&partial);
                Err(e)
            }
        }
    }

    fn fetch_original(&self, rel: &Utf8Path, dest: &Utf8Path) -> Result<(), SError> {
        let base = self
            .patch_base_url
            .as_deref()
            .ok_or_else(|| SError::Network("no patch server configured".into()))?;

        let url = original_url(base, rel);
        self.download(&url, dest, &mut |_| {}, &AtomicBool::new(false))?;
        Ok(())
    }
}

fn original_url(base: &str, rel: &Utf8Path) -> String {
    let rel = rel.as_str().replace('\\', "/");
    format!("{}/{}", base.trim_end_matches('/'), rel.trim_start_matches('/'))
}
