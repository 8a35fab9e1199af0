//! DOCX text: paragraph text from `word/document.xml`, one line per paragraph.

use std::io::Read;
use std::path::Path;

use quick_xml::events::Event;
use quick_xml::Reader;

use super::ExtractError;

const DOCUMENT_PART: &str = "word/document.xml";

pub fn extract(path: &Path) -> Result<String, ExtractError> {
    let file = std::fs::File::open(path)?;
    let mut archive =
        zip::ZipArchive::new(file).map_err(|e| ExtractError::Docx(e.to_string()))?;
    let mut part = archive
        .by_name(DOCUMENT_PART)
        .map_err(|e| ExtractError::Docx(format!("{DOCUMENT_PART}: {e}")))?;

    let mut xml = String::new();
    part.read_to_string(&mut xml)?;
    paragraphs_from_xml(&xml)
}

/// Collects `<w:t>` runs, breaking lines at `</w:p>` and `<w:br/>`.
fn paragraphs_from_xml(xml: &str) -> Result<String, ExtractError> {
    let mut reader = Reader::from_str(xml);
    let mut text = String::new();
    let mut in_run_text = false;

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) if e.name().as_ref() == b"w:t" => in_run_text = true,
            Ok(Event::End(e)) if e.name().as_ref() == b"w:t" => in_run_text = false,
            Ok(Event::End(e)) if e.name().as_ref() == b"w:p" => text.push('\n'),
            Ok(Event::Empty(e)) if e.name().as_ref() == b"w:br" => text.push('\n'),
            Ok(Event::Empty(e)) if e.name().as_ref() == b"w:tab" => text.push('\t'),
            Ok(Event::Text(t)) if in_run_text => {
                let unescaped = t.unescape().map_err(|e| ExtractError::Docx(e.to_string()))?;
                text.push_str(&unescaped);
            }
            Ok(Event::Eof) => break,
            Ok(_) => {}
            Err(e) => {
                return Err(ExtractError::Docx(format!(
                    "XML error at position {}: {e}",
                    reader.buffer_position()
                )))
            }
        }
    }

    Ok(text)
}
