// src/models/document.rs

use serde::Deserialize;
use utoipa::ToSchema;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    #[default]
    Word,
    Pdf,
}

impl ExportFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            ExportFormat::Word => "docx",
            ExportFormat::Pdf => "pdf",
        }
    }

    pub fn content_type(&self) -> &'static str {
        match self {
            ExportFormat::Word => {
                "application/vnd.openxmlformats-officedocument.wordprocessingml.document"
            }
            ExportFormat::Pdf => "application/pdf",
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct ExportOptions {
    pub format: ExportFormat,
    // `None` for a form that was never saved
    pub record_id: Option<i64>,
    pub prefix: Option<String>,
}

/// One printable element of an exported document.
#[derive(Debug, Clone, PartialEq)]
pub enum Block {
    Title(String),
    // Level 1 = wizard step, 2 = section, deeper = nested objects and array items
    Heading { level: u8, text: String },
    // Opens one lot's part of a lot-scoped section ("Sklop 1: Prenosniki")
    LotHeading(String),
    Field { label: String, value: String },
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct DocumentLayout {
    pub title: String,
    pub blocks: Vec<Block>,
}

#[derive(Debug, Clone)]
pub struct ExportedFile {
    pub path: std::path::PathBuf,
    pub file_name: String,
    pub format: ExportFormat,
    pub bytes: Vec<u8>,
}
