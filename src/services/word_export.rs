// src/services/word_export.rs
//
// Office Open XML (.docx) writer. The package holds the minimal set of parts
// Word needs; every entry carries a fixed timestamp so the bytes depend only
// on the layout.

use std::io::{Cursor, Write};

use zip::{write::SimpleFileOptions, CompressionMethod, DateTime, ZipWriter};

use crate::{
    common::error::AppError,
    models::document::{Block, DocumentLayout},
};

const TITLE_SIZE: u32 = 36;
const BODY_SIZE: u32 = 22;
const LOT_HEADING_SIZE: u32 = 26;

const XML_HEADER: &str = "<?xml version=\"1.0\" encoding=\"UTF-8\" standalone=\"yes\"?>\n";

const CONTENT_TYPES: &str = concat!(
    "<Types xmlns=\"http://schemas.openxmlformats.org/package/2006/content-types\">",
    "<Default Extension=\"rels\" ContentType=\"application/vnd.openxmlformats-package.relationships+xml\"/>",
    "<Default Extension=\"xml\" ContentType=\"application/xml\"/>",
    "<Override PartName=\"/word/document.xml\" ContentType=\"application/vnd.openxmlformats-officedocument.wordprocessingml.document.main+xml\"/>",
    "<Override PartName=\"/docProps/core.xml\" ContentType=\"application/vnd.openxmlformats-package.core-properties+xml\"/>",
    "</Types>"
);

const PACKAGE_RELS: &str = concat!(
    "<Relationships xmlns=\"http://schemas.openxmlformats.org/package/2006/relationships\">",
    "<Relationship Id=\"rId1\" Type=\"http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument\" Target=\"word/document.xml\"/>",
    "<Relationship Id=\"rId2\" Type=\"http://schemas.openxmlformats.org/package/2006/relationships/metadata/core-properties\" Target=\"docProps/core.xml\"/>",
    "</Relationships>"
);

/// Packs the layout into a `.docx` archive.
pub fn render_word(layout: &DocumentLayout) -> Result<Vec<u8>, AppError> {
    let parts = [
        ("[Content_Types].xml", format!("{}{}", XML_HEADER, CONTENT_TYPES)),
        ("_rels/.rels", format!("{}{}", XML_HEADER, PACKAGE_RELS)),
        ("docProps/core.xml", core_xml(&layout.title)),
        ("word/document.xml", document_xml(layout)),
    ];

    let options = SimpleFileOptions::default()
        .compression_method(CompressionMethod::Deflated)
        .last_modified_time(DateTime::default());

    let mut archive = ZipWriter::new(Cursor::new(Vec::new()));
    for (name, content) in parts {
        archive
            .start_file(name, options)
            .map_err(|e| AppError::ExportFailed(e.to_string()))?;
        archive.write_all(content.as_bytes())?;
    }
    let cursor = archive
        .finish()
        .map_err(|e| AppError::ExportFailed(e.to_string()))?;

    Ok(cursor.into_inner())
}

fn core_xml(title: &str) -> String {
    format!(
        "{}<cp:coreProperties xmlns:cp=\"http://schemas.openxmlformats.org/package/2006/metadata/core-properties\" \
         xmlns:dc=\"http://purl.org/dc/elements/1.1/\"><dc:title>{}</dc:title></cp:coreProperties>",
        XML_HEADER,
        escape_xml(title)
    )
}

fn document_xml(layout: &DocumentLayout) -> String {
    let mut xml = String::from(XML_HEADER);
    xml.push_str(
        "<w:document xmlns:w=\"http://schemas.openxmlformats.org/wordprocessingml/2006/main\">\n",
    );
    xml.push_str("<w:body>\n");

    for block in &layout.blocks {
        match block {
            Block::Title(text) => {
                paragraph(&mut xml, Some("center"), &[run(text, true, TITLE_SIZE)]);
            }
            Block::Heading { level, text } => {
                paragraph(&mut xml, None, &[run(text, true, heading_size(*level))]);
            }
            Block::LotHeading(text) => {
                paragraph(&mut xml, None, &[run(text, true, LOT_HEADING_SIZE)]);
            }
            Block::Field { label, value } => {
                let label = format!("{}: ", label);
                paragraph(
                    &mut xml,
                    None,
                    &[run(&label, true, BODY_SIZE), run(value, false, BODY_SIZE)],
                );
            }
        }
    }

    // A4, 2 cm margins (twentieths of a point)
    xml.push_str(
        "<w:sectPr><w:pgSz w:w=\"11906\" w:h=\"16838\"/>\
         <w:pgMar w:top=\"1134\" w:right=\"1134\" w:bottom=\"1134\" w:left=\"1134\" \
         w:header=\"709\" w:footer=\"709\" w:gutter=\"0\"/></w:sectPr>\n",
    );
    xml.push_str("</w:body>\n</w:document>\n");
    xml
}

// Half-points, as Word stores font sizes.
fn heading_size(level: u8) -> u32 {
    match level {
        1 => 32,
        2 => 28,
        3 => 26,
        _ => 24,
    }
}

fn paragraph(xml: &mut String, align: Option<&str>, runs: &[String]) {
    xml.push_str("<w:p>");
    if let Some(align) = align {
        xml.push_str(&format!("<w:pPr><w:jc w:val=\"{}\"/></w:pPr>", align));
    }
    for r in runs {
        xml.push_str(r);
    }
    xml.push_str("</w:p>\n");
}

fn run(text: &str, bold: bool, size: u32) -> String {
    let mut out = String::from("<w:r><w:rPr>");
    if bold {
        out.push_str("<w:b/>");
    }
    out.push_str(&format!("<w:sz w:val=\"{}\"/></w:rPr>", size));
    // Line breaks of multi-line answers stay visible
    for (i, line) in text.split('\n').enumerate() {
        if i > 0 {
            out.push_str("<w:br/>");
        }
        out.push_str("<w:t xml:space=\"preserve\">");
        out.push_str(&escape_xml(line.trim_end_matches('\r')));
        out.push_str("</w:t>");
    }
    out.push_str("</w:r>");
    out
}

pub fn escape_xml(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&apos;"),
            // Control characters are not allowed in XML 1.0
            c if c.is_control() && c != '\t' => {}
            c => escaped.push(c),
        }
    }
    escaped
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::io::Read;

    /// Body XML of an exported `.docx`.
    pub(crate) fn document_xml_of(bytes: &[u8]) -> String {
        let mut archive = zip::ZipArchive::new(Cursor::new(bytes)).unwrap();
        let mut xml = String::new();
        archive
            .by_name("word/document.xml")
            .unwrap()
            .read_to_string(&mut xml)
            .unwrap();
        xml
    }

    fn layout() -> DocumentLayout {
        DocumentLayout {
            title: "Javno naročilo".to_string(),
            blocks: vec![
                Block::Title("Javno naročilo".to_string()),
                Block::Heading {
                    level: 1,
                    text: "Podatki o projektu".to_string(),
                },
                Block::Field {
                    label: "Naziv".to_string(),
                    value: "Vrtec <Mavrica> & šola".to_string(),
                },
                Block::Field {
                    label: "Opis".to_string(),
                    value: "prva vrstica\ndruga vrstica".to_string(),
                },
                Block::LotHeading("Sklop 1: Papir & toner".to_string()),
            ],
        }
    }

    #[test]
    fn output_is_deterministic() {
        assert_eq!(render_word(&layout()).unwrap(), render_word(&layout()).unwrap());
    }

    #[test]
    fn package_holds_the_parts_word_needs() {
        let bytes = render_word(&layout()).unwrap();
        let mut archive = zip::ZipArchive::new(Cursor::new(bytes.as_slice())).unwrap();

        let mut names: Vec<&str> = archive.file_names().collect();
        names.sort_unstable();
        assert_eq!(
            names,
            vec!["[Content_Types].xml", "_rels/.rels", "docProps/core.xml", "word/document.xml"]
        );

        let mut core = String::new();
        archive
            .by_name("docProps/core.xml")
            .unwrap()
            .read_to_string(&mut core)
            .unwrap();
        assert!(core.contains("<dc:title>Javno naročilo</dc:title>"));
    }

    #[test]
    fn lot_headings_are_bold_paragraphs() {
        let xml = document_xml_of(&render_word(&layout()).unwrap());
        assert!(xml.contains(
            "<w:b/><w:sz w:val=\"26\"/></w:rPr><w:t xml:space=\"preserve\">Sklop 1: Papir &amp; toner</w:t>"
        ));
    }

    #[test]
    fn text_is_escaped_and_line_breaks_kept() {
        let xml = document_xml_of(&render_word(&layout()).unwrap());
        assert!(xml.starts_with("<?xml"));
        assert!(xml.contains("Vrtec &lt;Mavrica&gt; &amp; šola"));
        assert!(xml.contains(
            "<w:t xml:space=\"preserve\">prva vrstica</w:t><w:br/><w:t xml:space=\"preserve\">druga vrstica</w:t>"
        ));
        assert!(xml.trim_end().ends_with("</w:document>"));
    }

    #[test]
    fn escape_drops_control_characters() {
        assert_eq!(escape_xml("a\u{0007}b\t\"c\""), "ab\t&quot;c&quot;");
    }
}
