use std::fmt;

use serde::{Deserialize, Serialize};

/// Document category an extension opens as in the document server
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DocumentType {
    Word,
    Cell,
    Slide,
}

impl DocumentType {
    pub fn as_str(&self) -> &'static str {
        match self {
            DocumentType::Word => "word",
            DocumentType::Cell => "cell",
            DocumentType::Slide => "slide",
        }
    }
}

impl fmt::Display for DocumentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which extension table a lookup matched
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExtensionClass {
    Editable,
    LossEditable,
    OoxmlConvertible,
    ViewOnly,
}

use DocumentType::{Cell, Slide, Word};

/// Extensions the document server edits natively
pub const EDITABLE_EXTENSIONS: &[(&str, DocumentType)] = &[
    ("docm", Word),
    ("docx", Word),
    ("docxf", Word),
    ("oform", Word),
    ("dotm", Word),
    ("dotx", Word),
    ("xlsm", Cell),
    ("xlsx", Cell),
    ("xltm", Cell),
    ("xltx", Cell),
    ("potm", Slide),
    ("potx", Slide),
    ("ppsm", Slide),
    ("ppsx", Slide),
    ("pptm", Slide),
    ("pptx", Slide),
];

/// Extensions that become editable after conversion to OOXML
pub const OOXML_CONVERTIBLE_EXTENSIONS: &[(&str, DocumentType)] = &[
    ("doc", Word),
    ("dot", Word),
    ("fodt", Word),
    ("mht", Word),
    ("xml", Word),
    ("sxw", Word),
    ("stw", Word),
    ("htm", Word),
    ("mhtml", Word),
    ("wps", Word),
    ("wpt", Word),
    ("fods", Cell),
    ("xls", Cell),
    ("xlt", Cell),
    ("sxc", Cell),
    ("et", Cell),
    ("ett", Cell),
    ("xlsb", Cell),
    ("fodp", Slide),
    ("pot", Slide),
    ("pps", Slide),
    ("ppt", Slide),
    ("sxi", Slide),
    ("dps", Slide),
    ("dpt", Slide),
];

/// Extensions that can be edited but may lose formatting on save
pub const LOSS_EDITABLE_EXTENSIONS: &[(&str, DocumentType)] = &[
    ("epub", Word),
    ("fb2", Word),
    ("html", Word),
    ("odt", Word),
    ("ott", Word),
    ("rtf", Word),
    ("txt", Word),
    ("csv", Cell),
    ("ods", Cell),
    ("ots", Cell),
    ("odp", Slide),
    ("otp", Slide),
];

/// Extensions that can only be opened read-only
pub const VIEW_ONLY_EXTENSIONS: &[(&str, DocumentType)] = &[
    ("djvu", Word),
    ("oxps", Word),
    ("pdf", Word),
    ("xps", Word),
];

/// Tables in the order `classify` consults them
const LOOKUP_ORDER: &[(ExtensionClass, &[(&str, DocumentType)])] = &[
    (ExtensionClass::Editable, EDITABLE_EXTENSIONS),
    (ExtensionClass::LossEditable, LOSS_EDITABLE_EXTENSIONS),
    (ExtensionClass::OoxmlConvertible, OOXML_CONVERTIBLE_EXTENSIONS),
    (ExtensionClass::ViewOnly, VIEW_ONLY_EXTENSIONS),
];

impl ExtensionClass {
    /// The table backing this class
    pub fn table(&self) -> &'static [(&'static str, DocumentType)] {
        match self {
            ExtensionClass::Editable => EDITABLE_EXTENSIONS,
            ExtensionClass::LossEditable => LOSS_EDITABLE_EXTENSIONS,
            ExtensionClass::OoxmlConvertible => OOXML_CONVERTIBLE_EXTENSIONS,
            ExtensionClass::ViewOnly => VIEW_ONLY_EXTENSIONS,
        }
    }

    pub fn contains(&self, extension: &str) -> bool {
        lookup(self.table(), extension).is_some()
    }
}

/// Look up an already-lowercased extension in a single table
pub fn lookup(table: &[(&str, DocumentType)], extension: &str) -> Option<DocumentType> {
    table
        .iter()
        .find(|(key, _)| *key == extension)
        .map(|(_, doc_type)| *doc_type)
}

/// Classify an extension (case-insensitive, without the leading dot)
///
/// Tables are checked editable first, then loss-editable, OOXML-convertible
/// and view-only. The first match wins.
pub fn classify(extension: &str) -> Option<(DocumentType, ExtensionClass)> {
    let extension = extension.to_lowercase();
    LOOKUP_ORDER.iter().find_map(|(class, table)| {
        lookup(table, &extension).map(|doc_type| (doc_type, *class))
    })
}

/// Get MIME type for a given file extension
///
/// # Arguments
/// * `extension` - File extension (case-insensitive)
///
/// # Returns
/// MIME type string, or "application/octet-stream" if extension is not recognized
pub fn mime_type(extension: &str) -> &'static str {
    match extension.to_lowercase().as_str() {
        "docx" => "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
        "docm" => "application/vnd.ms-word.document.macroEnabled.12",
        "dotx" => "application/vnd.openxmlformats-officedocument.wordprocessingml.template",
        "dotm" => "application/vnd.ms-word.template.macroEnabled.12",
        "docxf" => "application/vnd.openxmlformats-officedocument.wordprocessingml.document.docxf",
        "oform" => "application/vnd.openxmlformats-officedocument.wordprocessingml.document.oform",
        "fodt" => "application/vnd.oasis.opendocument.text-flat-xml",
        "fods" => "application/vnd.oasis.opendocument.spreadsheet-flat-xml",
        "fodp" => "application/vnd.oasis.opendocument.presentation-flat-xml",
        "xltm" => "application/vnd.ms-excel.template.macroEnabled.12",
        "potm" => "application/vnd.ms-powerpoint.template.macroEnabled.12",
        "ppsm" => "application/vnd.ms-powerpoint.slideshow.macroEnabled.12",
        "doc" | "dot" => "application/msword",
        "xlsx" => "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
        "xlsm" => "application/vnd.ms-excel.sheet.macroEnabled.12",
        "xltx" => "application/vnd.openxmlformats-officedocument.spreadsheetml.template",
        "xlsb" => "application/vnd.ms-excel.sheet.binary.macroEnabled.12",
        "xls" | "xlt" => "application/vnd.ms-excel",
        "pptx" => "application/vnd.openxmlformats-officedocument.presentationml.presentation",
        "pptm" => "application/vnd.ms-powerpoint.presentation.macroEnabled.12",
        "ppsx" => "application/vnd.openxmlformats-officedocument.presentationml.slideshow",
        "potx" => "application/vnd.openxmlformats-officedocument.presentationml.template",
        "ppt" | "pps" | "pot" => "application/vnd.ms-powerpoint",
        "odt" => "application/vnd.oasis.opendocument.text",
        "ott" => "application/vnd.oasis.opendocument.text-template",
        "ods" => "application/vnd.oasis.opendocument.spreadsheet",
        "ots" => "application/vnd.oasis.opendocument.spreadsheet-template",
        "odp" => "application/vnd.oasis.opendocument.presentation",
        "otp" => "application/vnd.oasis.opendocument.presentation-template",
        "rtf" => "application/rtf",
        "txt" => "text/plain",
        "csv" => "text/csv",
        "html" | "htm" => "text/html",
        "xml" => "application/xml",
        "epub" => "application/epub+zip",
        "pdf" => "application/pdf",
        "djvu" => "image/vnd.djvu",
        "xps" => "application/vnd.ms-xpsdocument",
        "oxps" => "application/oxps",
        _ => "application/octet-stream",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    fn all_tables() -> [&'static [(&'static str, DocumentType)]; 4] {
        [
            EDITABLE_EXTENSIONS,
            OOXML_CONVERTIBLE_EXTENSIONS,
            LOSS_EDITABLE_EXTENSIONS,
            VIEW_ONLY_EXTENSIONS,
        ]
    }

    #[test]
    fn test_table_keys_are_lowercase_and_unique() {
        let mut seen = HashSet::new();
        for table in all_tables() {
            for (key, _) in table {
                assert_eq!(*key, key.to_lowercase(), "key should be lowercase: {}", key);
                assert!(!key.starts_with('.'), "key should not carry a dot: {}", key);
                assert!(seen.insert(*key), "duplicate key across tables: {}", key);
            }
        }
        assert_eq!(seen.len(), 16 + 25 + 12 + 4);
    }

    #[test]
    fn test_classify_picks_the_right_table() {
        assert_eq!(classify("docx"), Some((Word, ExtensionClass::Editable)));
        assert_eq!(classify("xlsb"), Some((Cell, ExtensionClass::OoxmlConvertible)));
        assert_eq!(classify("otp"), Some((Slide, ExtensionClass::LossEditable)));
        assert_eq!(classify("pdf"), Some((Word, ExtensionClass::ViewOnly)));
        assert_eq!(classify("exe"), None);
        assert_eq!(classify(""), None);
    }

    #[test]
    fn test_classify_is_case_insensitive() {
        assert_eq!(classify("PPTX"), Some((Slide, ExtensionClass::Editable)));
        assert_eq!(classify("Csv"), Some((Cell, ExtensionClass::LossEditable)));
    }

    #[test]
    fn test_class_contains_matches_only_its_table() {
        assert!(ExtensionClass::ViewOnly.contains("djvu"));
        assert!(!ExtensionClass::Editable.contains("djvu"));
        assert!(ExtensionClass::OoxmlConvertible.contains("et"));
        assert!(!ExtensionClass::LossEditable.contains("et"));
    }

    #[test]
    fn test_document_type_serializes_lowercase() {
        assert_eq!(serde_json::to_string(&Cell).unwrap(), "\"cell\"");
        assert_eq!(Slide.to_string(), "slide");
        let parsed: DocumentType = serde_json::from_str("\"word\"").unwrap();
        assert_eq!(parsed, Word);
    }

    #[test]
    fn test_mime_type_falls_back_to_octet_stream() {
        assert_eq!(mime_type("PDF"), "application/pdf");
        assert_eq!(mime_type("csv"), "text/csv");
        assert_eq!(mime_type("fb2"), "application/octet-stream");
    }

    #[test]
    fn test_every_editable_extension_has_a_mime_type() {
        for (extension, _) in EDITABLE_EXTENSIONS {
            assert_ne!(
                mime_type(extension),
                "application/octet-stream",
                "editable extension without a MIME type: {}",
                extension
            );
        }
        assert_eq!(mime_type("XLTM"), "application/vnd.ms-excel.template.macroEnabled.12");
        assert_eq!(mime_type("ppsm"), "application/vnd.ms-powerpoint.slideshow.macroEnabled.12");
        assert_eq!(mime_type("fods"), "application/vnd.oasis.opendocument.spreadsheet-flat-xml");
    }
}
