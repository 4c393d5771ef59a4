//! DOCX text extraction.
//!
//! A `.docx` file is a zip container; the body lives in
//! `word/document.xml`. Text is carried by `<w:t>` runs, paragraph and
//! explicit line breaks become newlines. Styling and tables are ignored;
//! the pipeline only needs the raw text.

use std::path::Path;

use quick_xml::events::Event;
use quick_xml::Reader;

use crate::{read_archive_entry, ExtractError};

pub fn extract_docx(path: &Path) -> Result<String, ExtractError> {
    let xml = read_archive_entry(path, "word/document.xml")?;
    document_text(&xml)
}

fn document_text(xml: &str) -> Result<String, ExtractError> {
    let mut reader = Reader::from_str(xml);
    let mut in_text_run = false;
    let mut out = String::new();

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => {
                if e.name().as_ref() == b"w:t" {
                    in_text_run = true;
                }
            }
            Ok(Event::End(e)) => match e.name().as_ref() {
                b"w:t" => in_text_run = false,
                b"w:p" => out.push('\n'),
                _ => {}
            },
            Ok(Event::Empty(e)) if e.name().as_ref() == b"w:br" => out.push('\n'),
            Ok(Event::Text(t)) if in_text_run => {
                let text = t
                    .unescape()
                    .map_err(|e| ExtractError::Docx(format!("invalid text run: {e}")))?;
                out.push_str(&text);
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(ExtractError::Docx(format!("invalid XML: {e}"))),
            _ => {}
        }
    }

    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const SAMPLE: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<w:document xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main">
  <w:body>
    <w:p><w:r><w:t>1. Vérifier le login</w:t></w:r></w:p>
    <w:p><w:r><w:t>2) Vérifier le solde &amp; le plafond</w:t></w:r></w:p>
  </w:body>
</w:document>"#;

    #[test]
    fn paragraphs_become_lines_and_entities_unescape() {
        let text = document_text(SAMPLE).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "1. Vérifier le login");
        assert_eq!(lines[1], "2) Vérifier le solde & le plafond");
    }

    #[test]
    fn text_outside_runs_is_ignored() {
        let xml = r#"<w:document xmlns:w="x"><w:body>
            <w:p><w:pPr>ignored</w:pPr><w:r><w:t>garde ceci</w:t></w:r></w:p>
        </w:body></w:document>"#;
        assert_eq!(document_text(xml).unwrap().trim(), "garde ceci");
    }

    #[test]
    fn extracts_from_a_real_container() {
        let mut file = tempfile::Builder::new().suffix(".docx").tempfile().unwrap();
        {
            let mut writer = zip::ZipWriter::new(file.as_file_mut());
            writer
                .start_file("word/document.xml", zip::write::FileOptions::default())
                .unwrap();
            writer.write_all(SAMPLE.as_bytes()).unwrap();
            writer.finish().unwrap();
        }

        let text = extract_docx(file.path()).unwrap();
        assert!(text.contains("Vérifier le login"));
    }
}
