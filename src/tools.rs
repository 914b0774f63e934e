use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::config::Config;
use crate::extensions::{classify, mime_type, DocumentType, ExtensionClass};
use crate::file_utility::FileUtility;

/// Tool parameter for get_file_type
#[derive(Debug, Deserialize)]
pub struct GetFileTypeParams {
    pub file_ext: String,
}

/// Tool parameter for get_file_info and escape_filename
#[derive(Debug, Deserialize)]
pub struct FilenameParams {
    pub filename: String,
}

/// Tool parameter for validate_file_size
#[derive(Debug, Deserialize)]
pub struct ValidateFileSizeParams {
    pub url: String,
    /// Optional limit in bytes. If not provided, uses the configured max_file_size.
    pub limit: Option<u64>,
}

/// Tool result for get_file_type
#[derive(Debug, Serialize)]
pub struct GetFileTypeResult {
    pub file_ext: String,
    pub document_type: DocumentType,
}

/// Tool result for get_file_info
#[derive(Debug, Serialize)]
pub struct FileInfo {
    pub filename: String,
    pub name: String,
    pub extension: String,
    pub document_type: Option<DocumentType>,
    pub class: Option<ExtensionClass>,
    pub mime_type: String,
    pub supported: bool,
    pub editable: bool,
    pub view_only: bool,
    pub loss_editable: bool,
    pub ooxml_convertible: bool,
}

/// Tool result for escape_filename
#[derive(Debug, Serialize)]
pub struct EscapeFilenameResult {
    pub filename: String,
}

/// Tool result for validate_file_size
#[derive(Debug, Serialize)]
pub struct ValidateFileSizeResult {
    pub url: String,
    pub limit: u64,
    pub valid: bool,
}

/// Extensions grouped by the table they belong to
#[derive(Debug, Serialize)]
pub struct SupportedExtension {
    pub extension: &'static str,
    pub document_type: DocumentType,
}

/// Tool result for list_supported_extensions
#[derive(Debug, Serialize)]
pub struct ListSupportedExtensionsResult {
    pub editable: Vec<SupportedExtension>,
    pub loss_editable: Vec<SupportedExtension>,
    pub ooxml_convertible: Vec<SupportedExtension>,
    pub view_only: Vec<SupportedExtension>,
}

/// Tool 1: Map a file extension to its document type
pub fn get_file_type(utility: &dyn FileUtility, params: GetFileTypeParams) -> Result<GetFileTypeResult> {
    let document_type = utility
        .file_type(&params.file_ext)
        .with_context(|| format!("Cannot determine document type for extension: {}", params.file_ext))?;

    Ok(GetFileTypeResult {
        file_ext: params.file_ext,
        document_type,
    })
}

/// Tool 2: Describe a filename
/// Splits the name, classifies the extension and reports every capability flag.
pub fn get_file_info(utility: &dyn FileUtility, params: FilenameParams) -> Result<FileInfo> {
    if params.filename.is_empty() {
        return Err(anyhow::anyhow!("Filename cannot be empty"));
    }

    let extension = utility.file_ext(&params.filename);
    let classification = classify(&extension);

    Ok(FileInfo {
        name: utility.filename_without_extension(&params.filename),
        document_type: classification.map(|(doc_type, _)| doc_type),
        class: classification.map(|(_, class)| class),
        mime_type: mime_type(&extension).to_string(),
        supported: utility.is_extension_supported(&extension),
        editable: utility.is_extension_editable(&extension),
        view_only: utility.is_extension_view_only(&extension),
        loss_editable: utility.is_extension_loss_editable(&extension),
        ooxml_convertible: utility.is_extension_ooxml_convertible(&extension),
        filename: params.filename,
        extension,
    })
}

/// Tool 3: Sanitize a filename
pub fn escape_filename(utility: &dyn FileUtility, params: FilenameParams) -> Result<EscapeFilenameResult> {
    Ok(EscapeFilenameResult {
        filename: utility.escape_filename(&params.filename),
    })
}

/// Tool 4: Check a remote file's Content-Length against a limit
/// If no limit is provided, uses the configured max_file_size.
pub async fn validate_file_size(
    utility: &dyn FileUtility,
    config: &Config,
    params: ValidateFileSizeParams,
) -> Result<ValidateFileSizeResult> {
    if !params.url.starts_with("http://") && !params.url.starts_with("https://") {
        return Err(anyhow::anyhow!("URL must start with http:// or https://: {}", params.url));
    }

    let limit = params.limit.unwrap_or(config.max_file_size);

    utility
        .validate_file_size(limit, &params.url)
        .await
        .with_context(|| format!("File size validation failed for: {}", params.url))?;

    Ok(ValidateFileSizeResult {
        url: params.url,
        limit,
        valid: true,
    })
}

/// Tool 5: List every supported extension
pub fn list_supported_extensions() -> ListSupportedExtensionsResult {
    let collect = |class: ExtensionClass| {
        class
            .table()
            .iter()
            .map(|(extension, document_type)| SupportedExtension {
                extension: *extension,
                document_type: *document_type,
            })
            .collect::<Vec<_>>()
    };

    ListSupportedExtensionsResult {
        editable: collect(ExtensionClass::Editable),
        loss_editable: collect(ExtensionClass::LossEditable),
        ooxml_convertible: collect(ExtensionClass::OoxmlConvertible),
        view_only: collect(ExtensionClass::ViewOnly),
    }
}
