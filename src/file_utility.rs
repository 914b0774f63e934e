use std::path::is_separator;

use async_trait::async_trait;
use reqwest::header::CONTENT_LENGTH;
use tracing::{debug, warn};

use crate::config::Config;
use crate::error::{FileError, FileResult};
use crate::extensions::{classify, DocumentType, ExtensionClass};

/// Filename and extension helpers for the document server
///
/// Implementations are injected into the server so tests can swap them out.
#[async_trait]
pub trait FileUtility: Send + Sync {
    /// Sends a HEAD request to `url` and checks its `Content-Length` against `limit`
    ///
    /// # Returns
    /// * `Ok(())` - The header is present and does not exceed `limit`
    /// * `Err(FileError::InvalidContentLength)` - Header missing, malformed or too large
    /// * `Err(FileError::Network)` - The request itself failed
    async fn validate_file_size(&self, limit: u64, url: &str) -> FileResult<()>;

    /// Replaces path separators so the name can be used as a single path element
    fn escape_filename(&self, filename: &str) -> String;

    /// Checks every extension table
    fn is_extension_supported(&self, file_ext: &str) -> bool;

    fn is_extension_editable(&self, file_ext: &str) -> bool;

    fn is_extension_view_only(&self, file_ext: &str) -> bool;

    fn is_extension_loss_editable(&self, file_ext: &str) -> bool;

    fn is_extension_ooxml_convertible(&self, file_ext: &str) -> bool;

    /// Strips the extension (and its dot) from `filename`
    fn filename_without_extension(&self, filename: &str) -> String;

    /// Maps an extension to its document type
    fn file_type(&self, file_ext: &str) -> FileResult<DocumentType>;

    /// Returns the extension of `filename` without any dots
    fn file_ext(&self, filename: &str) -> String;
}

/// Default `FileUtility` backed by the static extension tables
#[derive(Debug, Clone)]
pub struct OfficeFileUtility {
    client: reqwest::Client,
}

impl OfficeFileUtility {
    pub fn new() -> Self {
        Self {
            client: reqwest::Client::new(),
        }
    }

    pub fn with_config(config: &Config) -> FileResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout())
            .build()
            .map_err(|e| FileError::Client {
                message: format!("Failed to create HTTP client: {}", e),
            })?;

        Ok(Self { client })
    }
}

impl Default for OfficeFileUtility {
    fn default() -> Self {
        Self::new()
    }
}

/// Suffix of the final path element starting at its last dot, or "" when there is none
fn extension_with_dot(filename: &str) -> &str {
    for (idx, c) in filename.char_indices().rev() {
        if is_separator(c) {
            break;
        }
        if c == '.' {
            return &filename[idx..];
        }
    }
    ""
}

fn in_class(class: ExtensionClass, file_ext: &str) -> bool {
    class.contains(&file_ext.to_lowercase())
}

#[async_trait]
impl FileUtility for OfficeFileUtility {
    async fn validate_file_size(&self, limit: u64, url: &str) -> FileResult<()> {
        debug!(url, limit, "Sending HEAD request");

        let response = self.client.head(url).send().await?;

        let content_length = response
            .headers()
            .get(CONTENT_LENGTH)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.parse::<u64>().ok());

        match content_length {
            Some(length) if length <= limit => {
                debug!(url, length, limit, "Content length within limit");
                Ok(())
            }
            Some(length) => {
                warn!(url, length, limit, "Content length exceeds limit");
                Err(FileError::InvalidContentLength)
            }
            None => {
                warn!(url, status = %response.status(), "Missing or malformed Content-Length header");
                Err(FileError::InvalidContentLength)
            }
        }
    }

    fn escape_filename(&self, filename: &str) -> String {
        filename.replace(['\\', '/'], ":")
    }

    fn is_extension_supported(&self, file_ext: &str) -> bool {
        classify(file_ext).is_some()
    }

    fn is_extension_editable(&self, file_ext: &str) -> bool {
        in_class(ExtensionClass::Editable, file_ext)
    }

    fn is_extension_view_only(&self, file_ext: &str) -> bool {
        in_class(ExtensionClass::ViewOnly, file_ext)
    }

    fn is_extension_loss_editable(&self, file_ext: &str) -> bool {
        in_class(ExtensionClass::LossEditable, file_ext)
    }

    fn is_extension_ooxml_convertible(&self, file_ext: &str) -> bool {
        in_class(ExtensionClass::OoxmlConvertible, file_ext)
    }

    fn filename_without_extension(&self, filename: &str) -> String {
        let ext = extension_with_dot(filename);
        filename[..filename.len() - ext.len()].to_string()
    }

    fn file_type(&self, file_ext: &str) -> FileResult<DocumentType> {
        classify(file_ext)
            .map(|(doc_type, _)| doc_type)
            .ok_or(FileError::ExtensionNotSupported)
    }

    fn file_ext(&self, filename: &str) -> String {
        extension_with_dot(filename).replace('.', "")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    /// Accepts one connection and answers it with `response`
    async fn serve_once(response: &'static str) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut buf = [0u8; 4096];
            let _ = socket.read(&mut buf).await;
            socket.write_all(response.as_bytes()).await.unwrap();
            let _ = socket.shutdown().await;
        });

        format!("http://{}/files/report.docx", addr)
    }

    #[test]
    fn test_escape_filename_replaces_separators() {
        let util = OfficeFileUtility::new();
        assert_eq!(util.escape_filename("a/b\\c.docx"), "a:b:c.docx");
        assert_eq!(util.escape_filename("plain.txt"), "plain.txt");
        assert_eq!(util.escape_filename("//"), "::");
    }

    #[test]
    fn test_extension_flags() {
        let util = OfficeFileUtility::new();

        assert!(util.is_extension_editable("DOCX"));
        assert!(!util.is_extension_editable("doc"));

        assert!(util.is_extension_ooxml_convertible("doc"));
        assert!(util.is_extension_ooxml_convertible("Xlsb"));
        assert!(!util.is_extension_ooxml_convertible("docx"));

        assert!(util.is_extension_loss_editable("odt"));
        assert!(!util.is_extension_loss_editable("pdf"));

        assert!(util.is_extension_view_only("PDF"));
        assert!(!util.is_extension_view_only("txt"));
    }

    #[test]
    fn test_is_extension_supported() {
        let util = OfficeFileUtility::new();
        for ext in ["docxf", "mhtml", "fb2", "oxps", "XLSX"] {
            assert!(util.is_extension_supported(ext), "{} should be supported", ext);
        }
        for ext in ["", "exe", ".docx", "docx "] {
            assert!(!util.is_extension_supported(ext), "{:?} should not be supported", ext);
        }
    }

    #[test]
    fn test_file_type() {
        let util = OfficeFileUtility::new();
        assert_eq!(util.file_type("docx").unwrap(), DocumentType::Word);
        assert_eq!(util.file_type("ODS").unwrap(), DocumentType::Cell);
        assert_eq!(util.file_type("dps").unwrap(), DocumentType::Slide);
        assert_eq!(util.file_type("xps").unwrap(), DocumentType::Word);

        let err = util.file_type("zip").unwrap_err();
        assert!(matches!(err, FileError::ExtensionNotSupported));
        assert_eq!(err.to_string(), "file extension is not supported");
    }

    #[test]
    fn test_file_ext() {
        let util = OfficeFileUtility::new();
        assert_eq!(util.file_ext("report.docx"), "docx");
        assert_eq!(util.file_ext("archive.tar.GZ"), "GZ");
        assert_eq!(util.file_ext("noext"), "");
        assert_eq!(util.file_ext(".bashrc"), "bashrc");
        assert_eq!(util.file_ext("trailing."), "");
        assert_eq!(util.file_ext("dir.d/file"), "");
        assert_eq!(util.file_ext("dir/sub/slides.pptx"), "pptx");
    }

    #[test]
    fn test_filename_without_extension() {
        let util = OfficeFileUtility::new();
        assert_eq!(util.filename_without_extension("report.docx"), "report");
        assert_eq!(util.filename_without_extension("archive.tar.gz"), "archive.tar");
        assert_eq!(util.filename_without_extension("noext"), "noext");
        assert_eq!(util.filename_without_extension("trailing."), "trailing");
        assert_eq!(util.filename_without_extension("dir.d/file"), "dir.d/file");
        assert_eq!(util.filename_without_extension("dir/слайды.pptx"), "dir/слайды");
    }

    #[tokio::test]
    async fn test_validate_file_size_within_limit() {
        let url = serve_once("HTTP/1.1 200 OK\r\nContent-Length: 2048\r\nConnection: close\r\n\r\n").await;
        let util = OfficeFileUtility::new();
        assert!(util.validate_file_size(4096, &url).await.is_ok());
    }

    #[tokio::test]
    async fn test_validate_file_size_accepts_exact_limit() {
        let url = serve_once("HTTP/1.1 200 OK\r\nContent-Length: 2048\r\nConnection: close\r\n\r\n").await;
        let util = OfficeFileUtility::new();
        assert!(util.validate_file_size(2048, &url).await.is_ok());
    }

    #[tokio::test]
    async fn test_validate_file_size_over_limit() {
        let url = serve_once("HTTP/1.1 200 OK\r\nContent-Length: 2049\r\nConnection: close\r\n\r\n").await;
        let util = OfficeFileUtility::new();
        let result = util.validate_file_size(2048, &url).await;
        assert!(matches!(result, Err(FileError::InvalidContentLength)));
    }

    #[tokio::test]
    async fn test_validate_file_size_missing_header() {
        let url = serve_once("HTTP/1.1 200 OK\r\nConnection: close\r\n\r\n").await;
        let util = OfficeFileUtility::new();
        let result = util.validate_file_size(u64::MAX, &url).await;
        assert!(matches!(result, Err(FileError::InvalidContentLength)));
    }

    #[tokio::test]
    async fn test_validate_file_size_unparsable_header() {
        let url = serve_once("HTTP/1.1 200 OK\r\nContent-Length: abc\r\nConnection: close\r\n\r\n").await;
        let util = OfficeFileUtility::new();
        let result = util.validate_file_size(u64::MAX, &url).await;
        assert!(matches!(result, Err(FileError::InvalidContentLength)));
    }

    #[tokio::test]
    async fn test_validate_file_size_negative_length_is_rejected() {
        let url = serve_once("HTTP/1.1 200 OK\r\nContent-Length: -1\r\nConnection: close\r\n\r\n").await;
        let util = OfficeFileUtility::new();
        let result = util.validate_file_size(u64::MAX, &url).await;
        assert!(matches!(result, Err(FileError::InvalidContentLength)));
    }

    #[tokio::test]
    async fn test_validate_file_size_ignores_status_code() {
        let url = serve_once("HTTP/1.1 404 Not Found\r\nContent-Length: 10\r\nConnection: close\r\n\r\n").await;
        let util = OfficeFileUtility::new();
        assert!(util.validate_file_size(100, &url).await.is_ok());
    }

    #[tokio::test]
    async fn test_validate_file_size_connection_refused() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let util = OfficeFileUtility::with_config(&Config::default()).unwrap();
        let result = util.validate_file_size(1024, &format!("http://{}/missing.pdf", addr)).await;
        assert!(matches!(result, Err(FileError::Network(_))));
    }
}
