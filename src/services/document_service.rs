// src/services/document_service.rs

use std::{path::PathBuf, sync::Arc};

use chrono::Local;
use genpdf::{elements, style, Element};
use serde_json::Value;

use crate::{
    common::error::AppError,
    models::{
        document::{Block, DocumentLayout, ExportFormat, ExportOptions, ExportedFile},
        schema::FormSchema,
    },
    services::{document_layout::build_layout, word_export::render_word},
};

pub const DEFAULT_FILE_PREFIX: &str = "javno_narocilo";
const UNSAVED_ID: &str = "novo";

#[derive(Debug, Clone)]
pub struct ExportSettings {
    pub export_dir: PathBuf,
    pub fonts_dir: PathBuf,
    pub font_family: String,
}

#[derive(Clone)]
pub struct DocumentService {
    schema: Arc<FormSchema>,
    settings: ExportSettings,
}

impl DocumentService {
    pub fn new(schema: Arc<FormSchema>, settings: ExportSettings) -> Self {
        Self { schema, settings }
    }

    /// Renders `document` and writes it to the export directory.
    pub async fn generate(
        &self,
        document: &Value,
        options: &ExportOptions,
    ) -> Result<ExportedFile, AppError> {
        // Layout and rendering are CPU-bound; keep them off the async workers
        let schema = Arc::clone(&self.schema);
        let settings = self.settings.clone();
        let document = document.clone();
        let format = options.format;
        let bytes = tokio::task::spawn_blocking(move || {
            let layout = build_layout(&schema, &document);
            match format {
                ExportFormat::Word => render_word(&layout),
                ExportFormat::Pdf => render_pdf(&settings, &layout),
            }
        })
        .await
        .map_err(|e| anyhow::anyhow!("Export render task failed: {}", e))??;

        let file_name = export_file_name(options, &Local::now().format("%Y%m%d_%H%M%S").to_string());
        tokio::fs::create_dir_all(&self.settings.export_dir).await?;
        let path = self.settings.export_dir.join(&file_name);
        tokio::fs::write(&path, &bytes).await?;

        tracing::info!("Document exported to {}", path.display());
        Ok(ExportedFile {
            path,
            file_name,
            format: options.format,
            bytes,
        })
    }
}

fn render_pdf(settings: &ExportSettings, layout: &DocumentLayout) -> Result<Vec<u8>, AppError> {
    let font_family = genpdf::fonts::from_files(
        &settings.fonts_dir,
        &settings.font_family,
        None,
    )
    .map_err(|_| {
        AppError::FontNotFound(format!(
            "{} in {}",
            settings.font_family,
            settings.fonts_dir.display()
        ))
    })?;

    let mut doc = genpdf::Document::new(font_family);
    doc.set_title(layout.title.clone());
    let mut decorator = genpdf::SimplePageDecorator::new();
    decorator.set_margins(15);
    doc.set_page_decorator(decorator);

    for block in &layout.blocks {
        match block {
            Block::Title(text) => {
                let mut title = elements::Paragraph::new(text.clone());
                title.set_alignment(genpdf::Alignment::Center);
                doc.push(title.styled(style::Style::new().bold().with_font_size(18)));
                doc.push(elements::Break::new(1.5));
            }
            Block::Heading { level, text } => {
                let size = match level {
                    1 => 15,
                    2 => 13,
                    _ => 11,
                };
                if *level <= 2 {
                    doc.push(elements::Break::new(1));
                }
                doc.push(
                    elements::Paragraph::new(text.clone())
                        .styled(style::Style::new().bold().with_font_size(size)),
                );
            }
            Block::LotHeading(text) => {
                doc.push(elements::Break::new(0.5));
                doc.push(
                    elements::Paragraph::new(text.clone())
                        .styled(style::Style::new().bold().italic().with_font_size(12)),
                );
            }
            Block::Field { label, value } => {
                let mut lines = value.lines();
                let first = lines.next().unwrap_or_default();
                let paragraph = elements::Paragraph::default()
                    .styled_string(format!("{}: ", label), style::Style::new().bold())
                    .string(first.to_string());
                doc.push(paragraph.styled(style::Style::new().with_font_size(10)));
                for line in lines {
                    doc.push(
                        elements::Paragraph::new(line.to_string())
                            .styled(style::Style::new().with_font_size(10)),
                    );
                }
            }
        }
    }

    let mut buffer = Vec::new();
    doc.render(&mut buffer)
        .map_err(|e| AppError::ExportFailed(e.to_string()))?;
    Ok(buffer)
}

/// `<prefix>_<id|novo>_<timestamp>.<docx|pdf>`
pub fn export_file_name(options: &ExportOptions, timestamp: &str) -> String {
    let prefix = options
        .prefix
        .as_deref()
        .map(sanitize_prefix)
        .filter(|p| !p.is_empty())
        .unwrap_or_else(|| DEFAULT_FILE_PREFIX.to_string());
    let id = options
        .record_id
        .map(|id| id.to_string())
        .unwrap_or_else(|| UNSAVED_ID.to_string());
    format!("{}_{}_{}.{}", prefix, id, timestamp, options.format.extension())
}

// Keeps the prefix a plain file name on every platform.
fn sanitize_prefix(prefix: &str) -> String {
    prefix
        .trim()
        .chars()
        .map(|c| if c.is_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::schema::tests::bundled_schema;
    use crate::services::word_export::tests::document_xml_of;
    use serde_json::json;

    fn service(dir: &std::path::Path) -> DocumentService {
        DocumentService::new(
            Arc::new(bundled_schema()),
            ExportSettings {
                export_dir: dir.join("exports"),
                fonts_dir: dir.join("fonts"),
                font_family: "LiberationSans".to_string(),
            },
        )
    }

    fn document() -> Value {
        json!({
            "projectInfo": { "projectName": "Obnova ceste", "projectSubject": "Asfaltiranje" },
            "general": { "orderType": { "type": "gradnje", "estimatedValue": 150000 } }
        })
    }

    #[test]
    fn file_names_follow_the_pattern() {
        let saved = ExportOptions {
            format: ExportFormat::Pdf,
            record_id: Some(17),
            prefix: None,
        };
        let unsaved = ExportOptions {
            format: ExportFormat::Word,
            record_id: None,
            prefix: Some("razpis/2026 ".to_string()),
        };

        assert_eq!(
            export_file_name(&saved, "20260301_101500"),
            "javno_narocilo_17_20260301_101500.pdf"
        );
        assert_eq!(
            export_file_name(&unsaved, "20260301_101500"),
            "razpis_2026_novo_20260301_101500.docx"
        );
    }

    #[tokio::test]
    async fn word_export_is_written_to_the_export_dir() {
        let dir = tempfile::tempdir().unwrap();
        let service = service(dir.path());

        let exported = service
            .generate(&document(), &ExportOptions::default())
            .await
            .unwrap();

        assert!(exported.path.starts_with(dir.path().join("exports")));
        assert!(exported.file_name.starts_with("javno_narocilo_novo_"));
        assert!(exported.file_name.ends_with(".docx"));
        let written = std::fs::read(&exported.path).unwrap();
        assert_eq!(written, exported.bytes);
        let body = document_xml_of(&written);
        assert!(body.contains("Obnova ceste"));
        assert!(body.contains("Gradnje"));
    }

    #[tokio::test]
    async fn word_export_is_deterministic() {
        let dir = tempfile::tempdir().unwrap();
        let service = service(dir.path());
        let options = ExportOptions {
            record_id: Some(3),
            ..ExportOptions::default()
        };

        let first = service.generate(&document(), &options).await.unwrap();
        let second = service.generate(&document(), &options).await.unwrap();

        assert_eq!(first.bytes, second.bytes);
    }

    #[tokio::test]
    async fn pdf_without_fonts_fails_cleanly() {
        let dir = tempfile::tempdir().unwrap();
        let options = ExportOptions {
            format: ExportFormat::Pdf,
            ..ExportOptions::default()
        };

        let result = service(dir.path()).generate(&document(), &options).await;

        assert!(matches!(result, Err(AppError::FontNotFound(_))));
    }
}
