//! Source video acquisition.
//!
//! [`MediaDownloader`] turns a URL into a local file. [`YtDlpDownloader`]
//! implements it by running the `yt-dlp` executable, which must be on
//! `PATH` (or configured with [`YtDlpDownloader::with_program`]).

use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

use serde::{Deserialize, Serialize};

use crate::error::StillshotError;

/// Format selector: best MP4 video with M4A audio, else the best MP4, else
/// anything.
pub const DEFAULT_FORMAT: &str = "bestvideo[ext=mp4]+bestaudio[ext=m4a]/best[ext=mp4]/best";

/// What the downloader knows about a remote video.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaInfo {
    /// Site-specific identifier; names the job's output folder.
    pub id: String,
    /// Container extension of the downloaded file.
    #[serde(rename = "ext")]
    pub extension: String,
    /// Human-readable title; names the catalog folder.
    #[serde(default)]
    pub title: String,
}

/// A video fetched to local disk.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DownloadedMedia {
    /// Local path of the downloaded file.
    pub path: PathBuf,
    /// Metadata reported by the downloader.
    pub info: MediaInfo,
}

/// Fetches remote videos.
pub trait MediaDownloader {
    /// Look up metadata without downloading.
    ///
    /// # Errors
    ///
    /// [`StillshotError::Acquisition`] for unsupported URLs or network errors.
    fn probe(&self, url: &str) -> Result<MediaInfo, StillshotError>;

    /// Download `url` into `dest_dir`.
    ///
    /// # Errors
    ///
    /// [`StillshotError::Acquisition`] if the download fails or leaves no file.
    fn fetch(&self, url: &str, dest_dir: &Path) -> Result<DownloadedMedia, StillshotError>;
}

/// Downloads with the `yt-dlp` command-line tool.
#[derive(Debug, Clone)]
pub struct YtDlpDownloader {
    program: PathBuf,
    format: String,
}

impl Default for YtDlpDownloader {
    fn default() -> Self {
        Self::new()
    }
}

impl YtDlpDownloader {
    /// Use `yt-dlp` from `PATH` with [`DEFAULT_FORMAT`].
    pub fn new() -> Self {
        Self {
            program: PathBuf::from("yt-dlp"),
            format: DEFAULT_FORMAT.to_string(),
        }
    }

    /// Use a specific executable.
    #[must_use]
    pub fn with_program(mut self, program: impl Into<PathBuf>) -> Self {
        self.program = program.into();
        self
    }

    /// Use a different format selector.
    #[must_use]
    pub fn with_format(mut self, format: impl Into<String>) -> Self {
        self.format = format.into();
        self
    }

    fn run(&self, url: &str, arguments: &[&str]) -> Result<Vec<u8>, StillshotError> {
        log::debug!("Running {} {} {url}", self.program.display(), arguments.join(" "));
        let output = Command::new(&self.program)
            .args(arguments)
            .arg(url)
            .output()
            .map_err(|error| {
                StillshotError::acquisition(
                    url,
                    format!("cannot run {}: {error}", self.program.display()),
                )
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let reason = stderr
                .lines()
                .rev()
                .find(|line| !line.trim().is_empty())
                .unwrap_or("downloader exited with an error");
            return Err(StillshotError::acquisition(url, reason.trim()));
        }
        Ok(output.stdout)
    }
}

impl MediaDownloader for YtDlpDownloader {
    fn probe(&self, url: &str) -> Result<MediaInfo, StillshotError> {
        let stdout = self.run(url, &["--dump-single-json", "--no-playlist", "--no-warnings"])?;
        serde_json::from_slice(&stdout).map_err(|error| {
            StillshotError::acquisition(url, format!("unreadable video metadata: {error}"))
        })
    }

    fn fetch(&self, url: &str, dest_dir: &Path) -> Result<DownloadedMedia, StillshotError> {
        let info = self.probe(url)?;
        fs::create_dir_all(dest_dir).map_err(|error| StillshotError::acquisition(url, error))?;

        let template = dest_dir.join("%(id)s.%(ext)s");
        let template = template.to_string_lossy();
        self.run(
            url,
            &["--no-playlist", "--no-warnings", "-f", &self.format, "-o", &template],
        )?;

        let path = locate_download(dest_dir, &info).ok_or_else(|| {
            StillshotError::acquisition(url, "download finished but produced no file")
        })?;
        log::info!("Downloaded {url} to {}", path.display());
        Ok(DownloadedMedia { path, info })
    }
}

/// Find the file yt-dlp wrote. Merging formats can change the extension
/// from the one reported up front, so fall back to matching the id.
fn locate_download(dest_dir: &Path, info: &MediaInfo) -> Option<PathBuf> {
    let expected = dest_dir.join(format!("{}.{}", info.id, info.extension));
    if expected.is_file() {
        return Some(expected);
    }

    let mut candidates: Vec<PathBuf> = fs::read_dir(dest_dir)
        .ok()?
        .filter_map(Result::ok)
        .map(|entry| entry.path())
        .filter(|path| {
            path.is_file()
                && path.file_stem().is_some_and(|stem| stem == info.id.as_str())
                && path.extension().is_some_and(|extension| extension != "part")
        })
        .collect();
    candidates.sort();
    candidates.into_iter().next()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn info(id: &str, extension: &str) -> MediaInfo {
        MediaInfo {
            id: id.to_string(),
            extension: extension.to_string(),
            title: String::new(),
        }
    }

    #[test]
    fn media_info_reads_yt_dlp_json() {
        let json = r#"{"id": "abc123", "ext": "mp4", "title": "A talk", "duration": 130}"#;
        let parsed: MediaInfo = serde_json::from_str(json).unwrap();
        assert_eq!(parsed.id, "abc123");
        assert_eq!(parsed.extension, "mp4");
        assert_eq!(parsed.title, "A talk");
    }

    #[test]
    fn locate_prefers_reported_extension() {
        let directory = tempfile::tempdir().unwrap();
        fs::write(directory.path().join("abc.mp4"), b"video").unwrap();
        fs::write(directory.path().join("abc.webm"), b"video").unwrap();
        let found = locate_download(directory.path(), &info("abc", "mp4")).unwrap();
        assert_eq!(found, directory.path().join("abc.mp4"));
    }

    #[test]
    fn locate_falls_back_to_merged_file() {
        let directory = tempfile::tempdir().unwrap();
        fs::write(directory.path().join("abc.mkv"), b"video").unwrap();
        fs::write(directory.path().join("abc.part"), b"partial").unwrap();
        let found = locate_download(directory.path(), &info("abc", "mp4")).unwrap();
        assert_eq!(found, directory.path().join("abc.mkv"));
    }

    #[test]
    fn locate_reports_missing_download() {
        let directory = tempfile::tempdir().unwrap();
        assert!(locate_download(directory.path(), &info("abc", "mp4")).is_none());
    }

    #[test]
    fn missing_program_is_an_acquisition_error() {
        let downloader = YtDlpDownloader::new().with_program("/nonexistent/yt-dlp");
        let error = downloader.probe("https://example.com/video").unwrap_err();
        assert_eq!(error.kind(), crate::FailureKind::Acquisition);
    }
}
