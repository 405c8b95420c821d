use std::fs;
use std::path::Path;

use crate::api::{MessageKind, Upload};
use crate::core::error::ClientError;
use crate::core::recorder::AudioClip;

/// A local file staged for a media message or an avatar upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attachment {
    pub kind: MessageKind,
    pub upload: Upload,
}

/// Mime type for a file extension, limited to what the server accepts.
pub fn mime_for_extension(ext: &str) -> Option<&'static str> {
    let mime = match ext.to_ascii_lowercase().as_str() {
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "mp4" => "video/mp4",
        "webm" => "video/webm",
        "mov" => "video/quicktime",
        "mkv" => "video/x-matroska",
        "mp3" => "audio/mpeg",
        "wav" => "audio/wav",
        "ogg" => "audio/ogg",
        "m4a" => "audio/mp4",
        "aac" => "audio/aac",
        "flac" => "audio/flac",
        _ => return None,
    };
    Some(mime)
}

impl Attachment {
    /// Read `path` and infer the message kind from its extension.
    pub fn from_path(path: &Path) -> Result<Self, ClientError> {
        let ext = path.extension().and_then(|e| e.to_str()).unwrap_or_default();
        let mime = mime_for_extension(ext)
            .ok_or_else(|| ClientError::skipped(format!("Unsupported file type: {}", path.display())))?;
        let kind = MessageKind::from_mime(mime)
            .ok_or_else(|| ClientError::skipped(format!("Unsupported file type: {}", path.display())))?;
        let bytes = fs::read(path)
            .map_err(|e| ClientError::skipped(format!("Cannot read {}: {}", path.display(), e)))?;
        let file_name = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("upload")
            .to_string();

        Ok(Self {
            kind,
            upload: Upload { file_name, mime: mime.to_string(), bytes },
        })
    }

    pub fn from_clip(clip: AudioClip) -> Self {
        Self {
            kind: MessageKind::Audio,
            upload: clip.into_upload(),
        }
    }

    pub fn file_name(&self) -> &str {
        &self.upload.file_name
    }

    pub fn size(&self) -> usize {
        self.upload.bytes.len()
    }
}
