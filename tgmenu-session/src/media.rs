//! Picture and sticker sources returned by button callbacks.
//!
//! The format is inferred from the file extension with `mime_guess`. Pictures accept any `image/*`
//! type; stickers accept WEBP, WEBM and animated TGS, the formats Telegram takes for stickers.

use std::path::{Path, PathBuf};

use reqwest::Url;
use tgmenu_core::{MediaKind, MediaSource};
use tracing::error;

/// Animated sticker extension; it has no registered MIME type.
const TGS_EXTENSION: &str = "tgs";

/// Resolves `path` to a sendable source of `kind`.
///
/// Anything that is not a valid source is replaced by `fallback`, logged, and always sent as a
/// photo since the default asset is a picture.
pub async fn resolve_media(path: &str, kind: MediaKind, fallback: &str) -> (MediaKind, MediaSource) {
    if let Some(source) = media_source(path, kind).await {
        return (kind, source);
    }
    error!(path = %path, kind = ?kind, fallback = %fallback, "Invalid media path, using default");
    let source = media_source(fallback, MediaKind::Photo)
        .await
        .unwrap_or_else(|| MediaSource::File(PathBuf::from(fallback)));
    (MediaKind::Photo, source)
}

/// http(s) URL, or an existing local file, whose extension matches `kind`.
pub async fn media_source(path: &str, kind: MediaKind) -> Option<MediaSource> {
    if let Ok(url) = Url::parse(path) {
        if matches!(url.scheme(), "http" | "https") {
            return accepts(url.path(), kind).then_some(MediaSource::Url(url));
        }
    }
    if !accepts(path, kind) {
        return None;
    }
    match tokio::fs::metadata(path).await {
        Ok(meta) if meta.is_file() => Some(MediaSource::File(PathBuf::from(path))),
        _ => None,
    }
}

/// True when the extension of `path` is a format `kind` can be sent as.
pub fn accepts(path: &str, kind: MediaKind) -> bool {
    let mime = mime_guess::from_path(path).first();
    match kind {
        MediaKind::Photo => mime.is_some_and(|m| m.type_() == mime_guess::mime::IMAGE),
        MediaKind::Sticker => {
            let animated = Path::new(path)
                .extension()
                .and_then(|ext| ext.to_str())
                .is_some_and(|ext| ext.eq_ignore_ascii_case(TGS_EXTENSION));
            animated
                || mime.is_some_and(|m| matches!(m.essence_str(), "image/webp" | "video/webm"))
        }
    }
}
