use std::io;
use std::path::PathBuf;
use thiserror::Error;
use super::http::InboundRequest;

/// What a resolved file is served as, decided by its extension alone.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentKind {
    Html,
    Png,
    Jpeg,
    Wasm,
    Pdf,
    PlainText,
    /// Run as a subprocess; its stdout becomes the body.
    Delegated
}

impl ContentKind {
    pub fn from_file_name(file_name: &str, delegate_extension: &str) -> ContentKind {
        let extension = match file_name.rsplit_once('.') {
            Some((_, extension)) => extension,
            None => return ContentKind::PlainText
        };
        match extension {
            "html" => ContentKind::Html,
            "png" => ContentKind::Png,
            "jpg" | "jpeg" => ContentKind::Jpeg,
            "wasm" => ContentKind::Wasm,
            "pdf" => ContentKind::Pdf,
            ext if !delegate_extension.is_empty() && ext == delegate_extension => ContentKind::Delegated,
            _ => ContentKind::PlainText
        }
    }

    /// Delegated output is always sent as HTML.
    pub fn mime_type(&self) -> &'static str {
        match *self {
            ContentKind::Html | ContentKind::Delegated => "text/html",
            ContentKind::Png => "image/png",
            ContentKind::Jpeg => "image/jpeg",
            ContentKind::Wasm => "application/wasm",
            ContentKind::Pdf => "application/pdf",
            ContentKind::PlainText => "text/plain"
        }
    }
}

#[derive(Debug)]
pub struct Content {
    pub content_type: &'static str,
    pub body: Vec<u8>
}

#[derive(Debug, Error)]
pub enum ContentError {
    #[error("not found: {}", .0.display())]
    NotFound(PathBuf),
    #[error("error reading {}: {source}", .path.display())]
    Io { path: PathBuf, source: io::Error }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fallback {
    NotFound,
    NotSupported
}

pub trait ContentManager {
    fn find_content(&self, request: &InboundRequest) -> Result<Content, ContentError>;

    fn fallback_page(&self, which: Fallback) -> io::Result<Vec<u8>>;
}
