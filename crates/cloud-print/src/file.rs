//! Documents handed to the printer

use std::io;
use std::path::Path;

/// File extensions the printer accepts.
pub const SUPPORTED_EXTENSIONS: [&str; 10] = [
    "txt", "pdf", "docx", "doc", "xps", "odt", "png", "jpg", "jpeg", "gif",
];

/// A named document ready for submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrintFile {
    file_name: String,
    content: Vec<u8>,
}

impl PrintFile {
    /// Keeps only the base name of `file_name`.
    pub fn new(file_name: &str, content: Vec<u8>) -> Self {
        let base = file_name
            .rsplit(['/', '\\'])
            .next()
            .unwrap_or(file_name)
            .to_owned();
        Self {
            file_name: base,
            content,
        }
    }

    /// Read a document from disk.
    pub async fn from_path(path: impl AsRef<Path>) -> io::Result<Self> {
        let path = path.as_ref();
        let content = tokio::fs::read(path).await?;
        let file_name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .ok_or_else(|| {
                io::Error::new(io::ErrorKind::InvalidInput, "path has no file name")
            })?;
        Ok(Self::new(&file_name, content))
    }

    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    pub fn content(&self) -> &[u8] {
        &self.content
    }

    /// Lower-cased extension, if the name has one.
    pub fn extension(&self) -> Option<String> {
        Path::new(&self.file_name)
            .extension()
            .map(|ext| ext.to_string_lossy().to_ascii_lowercase())
    }

    /// Whether the printer can render this file type.
    pub fn is_supported(&self) -> bool {
        self.extension()
            .is_some_and(|ext| SUPPORTED_EXTENSIONS.contains(&ext.as_str()))
    }

    /// MIME type sent with the upload.
    pub fn content_type(&self) -> &'static str {
        match self.extension().as_deref() {
            Some("txt") => "text/plain",
            Some("pdf") => "application/pdf",
            Some("docx") => {
                "application/vnd.openxmlformats-officedocument.wordprocessingml.document"
            }
            Some("doc") => "application/msword",
            Some("xps") => "application/vnd.ms-xpsdocument",
            Some("odt") => "application/vnd.oasis.opendocument.text",
            Some("png") => "image/png",
            Some("jpg" | "jpeg") => "image/jpeg",
            Some("gif") => "image/gif",
            _ => "application/octet-stream",
        }
    }
}
