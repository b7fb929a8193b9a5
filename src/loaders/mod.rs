//! Document loader registry: maps a file extension to a text extractor.

use std::fs::File;
use std::io::Read;
use std::path::Path;

use quick_xml::events::Event;
use quick_xml::Reader;

use crate::error::{DocError, DocResult};

/// Extensions accepted for ingestion, lowercase with leading dot.
pub const SUPPORTED_EXTENSIONS: [&str; 4] = [".pdf", ".txt", ".docx", ".csv"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoaderKind {
    Pdf,
    Text,
    Docx,
    Csv,
}

impl LoaderKind {
    /// Resolve the loader from the file extension (case-insensitive).
    pub fn for_path(path: &Path) -> DocResult<Self> {
        let extension = path
            .extension()
            .map(|e| format!(".{}", e.to_string_lossy().to_lowercase()))
            .unwrap_or_default();

        match extension.as_str() {
            ".pdf" => Ok(LoaderKind::Pdf),
            ".txt" => Ok(LoaderKind::Text),
            ".docx" => Ok(LoaderKind::Docx),
            ".csv" => Ok(LoaderKind::Csv),
            _ => Err(DocError::UnsupportedFormat {
                extension,
                supported: SUPPORTED_EXTENSIONS.to_vec(),
            }),
        }
    }

    pub fn load(&self, path: &Path) -> DocResult<String> {
        let result = match self {
            LoaderKind::Pdf => load_pdf(path),
            LoaderKind::Text => load_text(path),
            LoaderKind::Docx => load_docx(path),
            LoaderKind::Csv => load_csv(path),
        };
        result.map_err(|message| DocError::Load {
            path: path.to_path_buf(),
            message,
        })
    }
}

/// Load the raw text of a document, picking the loader by extension.
pub fn load_document(path: &Path) -> DocResult<String> {
    let kind = LoaderKind::for_path(path)?;
    if !path.exists() {
        return Err(DocError::FileNotFound(path.to_path_buf()));
    }
    kind.load(path)
}

fn load_pdf(path: &Path) -> Result<String, String> {
    pdf_extract::extract_text(path).map_err(|e| e.to_string())
}

fn load_text(path: &Path) -> Result<String, String> {
    let bytes = std::fs::read(path).map_err(|e| e.to_string())?;
    String::from_utf8(bytes).map_err(|e| format!("not valid UTF-8: {e}"))
}

/// Extract paragraph text from `word/document.xml` inside the .docx archive.
fn load_docx(path: &Path) -> Result<String, String> {
    let file = File::open(path).map_err(|e| e.to_string())?;
    let mut archive = zip::ZipArchive::new(file).map_err(|e| e.to_string())?;
    let mut xml = String::new();
    archive
        .by_name("word/document.xml")
        .map_err(|e| e.to_string())?
        .read_to_string(&mut xml)
        .map_err(|e| e.to_string())?;

    docx_xml_to_text(&xml)
}

fn docx_xml_to_text(xml: &str) -> Result<String, String> {
    let mut reader = Reader::from_str(xml);
    let mut text = String::new();
    let mut in_run_text = false;

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) if e.name().as_ref() == b"w:t" => in_run_text = true,
            Ok(Event::End(e)) => match e.name().as_ref() {
                b"w:t" => in_run_text = false,
                b"w:p" => text.push('\n'),
                _ => {}
            },
            Ok(Event::Empty(e)) => match e.name().as_ref() {
                b"w:tab" => text.push('\t'),
                b"w:br" => text.push('\n'),
                _ => {}
            },
            Ok(Event::Text(t)) if in_run_text => {
                let unescaped = t.unescape().map_err(|e| e.to_string())?;
                text.push_str(&unescaped);
            }
            Ok(Event::Eof) => break,
            Err(e) => {
                return Err(format!(
                    "malformed document.xml at position {}: {e}",
                    reader.buffer_position()
                ))
            }
            _ => {}
        }
    }

    Ok(text)
}

/// Render each CSV record as `column: value` lines, records separated by a blank line.
fn load_csv(path: &Path) -> Result<String, String> {
    let mut reader = csv::Reader::from_path(path).map_err(|e| e.to_string())?;
    let headers = reader.headers().map_err(|e| e.to_string())?.clone();

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record.map_err(|e| e.to_string())?;
        let row = headers
            .iter()
            .zip(record.iter())
            .map(|(column, value)| format!("{}: {}", column.trim(), value.trim()))
            .collect::<Vec<_>>()
            .join("\n");
        rows.push(row);
    }

    Ok(rows.join("\n\n"))
}
