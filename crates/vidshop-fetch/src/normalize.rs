//! Reference and filename normalization.
//!
//! Catalog items store whatever link an admin pasted. Google Drive sharing
//! links come in several shapes; all of them are rewritten to the one
//! direct-download form before anything is requested.

use reqwest::Url;

use vidshop_core::DEFAULT_FILENAME;

use crate::error::{FetchError, Result};

/// Direct-download endpoint for Drive file IDs.
pub const DRIVE_DOWNLOAD_URL: &str = "https://drive.google.com/uc";

/// Extensions accepted as-is on a filename hint.
pub const VIDEO_EXTENSIONS: &[&str] = &["mp4", "mov", "mkv", "webm", "m4v", "avi"];

/// Extension appended when a hint has no recognized one.
pub const DEFAULT_EXTENSION: &str = "mp4";

const DRIVE_HOSTS: &[&str] = &["drive.google.com", "docs.google.com"];

/// Shortest string accepted as a bare Drive file ID.
const MIN_DRIVE_ID_LEN: usize = 10;

/// Rewrite a stored reference into the URL to download.
///
/// - Drive links (`/file/d/<id>/...`, `open?id=<id>`, `uc?id=<id>`) and bare
///   Drive IDs become `https://drive.google.com/uc?export=download&id=<id>`.
/// - Other `http`/`https` URLs are returned unchanged.
///
/// # Errors
///
/// Returns `FetchError::InvalidReference` for anything else, including a
/// Drive link with no recognizable file ID.
pub fn normalize_reference(reference: &str) -> Result<Url> {
    let trimmed = reference.trim();
    if trimmed.is_empty() {
        return Err(FetchError::InvalidReference("empty reference".into()));
    }

    let candidate = if !trimmed.contains("://")
        && DRIVE_HOSTS.iter().any(|host| trimmed.starts_with(host))
    {
        format!("https://{trimmed}")
    } else {
        trimmed.to_string()
    };

    if let Ok(url) = Url::parse(&candidate) {
        if !matches!(url.scheme(), "http" | "https") {
            return Err(FetchError::InvalidReference(trimmed.to_string()));
        }
        if url.host_str().is_some_and(|host| DRIVE_HOSTS.contains(&host)) {
            let id = drive_file_id(&url)
                .ok_or_else(|| FetchError::InvalidReference(trimmed.to_string()))?;
            return drive_download_url(&id);
        }
        return Ok(url);
    }

    if is_drive_id(trimmed) {
        return drive_download_url(trimmed);
    }

    Err(FetchError::InvalidReference(trimmed.to_string()))
}

/// Build the direct-download URL for a Drive file ID.
///
/// # Errors
///
/// Returns `FetchError::InvalidReference` if the URL cannot be built.
pub fn drive_download_url(id: &str) -> Result<Url> {
    Url::parse_with_params(DRIVE_DOWNLOAD_URL, &[("export", "download"), ("id", id)])
        .map_err(|e| FetchError::InvalidReference(e.to_string()))
}

fn drive_file_id(url: &Url) -> Option<String> {
    if let Some(segments) = url.path_segments() {
        let segments: Vec<&str> = segments.collect();
        if let Some(pos) = segments.iter().position(|segment| *segment == "d") {
            return segments
                .get(pos + 1)
                .filter(|id| is_drive_id(id))
                .map(|id| (*id).to_string());
        }
    }

    url.query_pairs()
        .find(|(key, _)| key == "id")
        .map(|(_, value)| value.into_owned())
        .filter(|id| is_drive_id(id))
}

fn is_drive_id(candidate: &str) -> bool {
    candidate.len() >= MIN_DRIVE_ID_LEN
        && candidate
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}

/// Name for the delivered file, derived from an item's filename hint.
///
/// Directory components are dropped. A hint that already ends in one of
/// [`VIDEO_EXTENSIONS`] is kept; otherwise `.mp4` is appended. An empty hint
/// becomes [`DEFAULT_FILENAME`].
#[must_use]
pub fn output_filename(hint: &str) -> String {
    let base = hint
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or_default()
        .trim()
        .trim_start_matches('.');

    if base.is_empty() {
        return DEFAULT_FILENAME.to_string();
    }

    let recognized = base.rsplit_once('.').is_some_and(|(stem, ext)| {
        !stem.is_empty()
            && VIDEO_EXTENSIONS
                .iter()
                .any(|known| ext.eq_ignore_ascii_case(known))
    });

    if recognized {
        base.to_string()
    } else {
        format!("{base}.{DEFAULT_EXTENSION}")
    }
}
