//! Rendering of stage outputs.
//!
//! Opaque adapters from the pipeline's point of view: ordered items in,
//! a string or binary blob out. Each stage output renders to plain text,
//! XLSX or DOCX, mirroring what users download after each stage.
//! Test-case bodies arrive as markdown; the text and table renderers
//! strip the heading/bold syntax before writing.

use casgen_core::{Checkpoint, Provenance, TestCase};
use docx_rs::{Docx, Paragraph, Run};
use regex::Regex;
use rust_xlsxwriter::{Format, Workbook};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("XLSX rendering failed: {0}")]
    Xlsx(#[from] rust_xlsxwriter::XlsxError),
    #[error("DOCX rendering failed: {0}")]
    Docx(String),
}

fn generated_on() -> String {
    format!(
        "Généré le {}",
        chrono::Local::now().format("%d/%m/%Y à %H:%M")
    )
}

/// Strip markdown headings and bold markers from a test-case body.
pub fn clean_markdown(text: &str) -> String {
    let headings = Regex::new(r"#+\s*").unwrap();
    let bold = Regex::new(r"\*\*(.*?)\*\*").unwrap();
    let cleaned = headings.replace_all(text, "");
    bold.replace_all(&cleaned, "$1").into_owned()
}

// ============================================================================
// Plain text
// ============================================================================

/// Numbered list under a title, e.g. the rules export.
pub fn export_items_text(title: &str, items: &[String]) -> String {
    let mut out = format!("{}\n\n{}\n\n", title.to_uppercase(), generated_on());
    for (i, item) in items.iter().enumerate() {
        out.push_str(&format!("{}. {}\n", i + 1, item));
    }
    out
}

/// Checkpoint export with existing/new sections, existing first.
pub fn export_checkpoints_text(checkpoints: &[Checkpoint]) -> String {
    let mut out = format!("POINTS DE CONTRÔLE\n\n{}\n\n", generated_on());

    let (existing, new): (Vec<_>, Vec<_>) = checkpoints
        .iter()
        .partition(|c| c.provenance == Provenance::Existing);

    if !existing.is_empty() {
        out.push_str("=== POINTS EXISTANTS ===\n");
        for point in &existing {
            out.push_str(&format!("• {}\n", point.text));
        }
        out.push('\n');
    }
    if !new.is_empty() {
        out.push_str("=== NOUVEAUX POINTS ===\n");
        for point in &new {
            out.push_str(&format!("• {}\n", point.text));
        }
    }
    out
}

pub fn export_test_cases_text(cases: &[TestCase]) -> String {
    let mut out = format!("CAS DE TEST\n\n{}\n\n", generated_on());
    for (i, case) in cases.iter().enumerate() {
        out.push_str(&format!(
            "=== CAS DE TEST {} ===\n{}\n\n",
            i + 1,
            clean_markdown(&case.body)
        ));
    }
    out
}

// ============================================================================
// XLSX
// ============================================================================

/// Two-column sheet: item number and description.
pub fn export_items_xlsx(items: &[String], sheet_name: &str) -> Result<Vec<u8>, ExportError> {
    let mut workbook = Workbook::new();
    let bold = Format::new().set_bold();
    {
        let worksheet = workbook.add_worksheet();
        worksheet.set_name(sheet_name)?;
        worksheet.write_string_with_format(0, 0, "N°", &bold)?;
        worksheet.write_string_with_format(0, 1, "Description", &bold)?;
        worksheet.set_column_width(1, 90)?;

        for (i, item) in items.iter().enumerate() {
            let row = (i + 1) as u32;
            worksheet.write_number(row, 0, (i + 1) as f64)?;
            worksheet.write_string(row, 1, item)?;
        }
    }
    Ok(workbook.save_to_buffer()?)
}

/// Three-column sheet: number, source checkpoint, cleaned test case.
pub fn export_test_cases_xlsx(cases: &[TestCase]) -> Result<Vec<u8>, ExportError> {
    let mut workbook = Workbook::new();
    let bold = Format::new().set_bold();
    {
        let worksheet = workbook.add_worksheet();
        worksheet.set_name("Cas_de_test")?;
        worksheet.write_string_with_format(0, 0, "N°", &bold)?;
        worksheet.write_string_with_format(0, 1, "Point de contrôle", &bold)?;
        worksheet.write_string_with_format(0, 2, "Cas de test", &bold)?;
        worksheet.set_column_width(1, 50)?;
        worksheet.set_column_width(2, 90)?;

        for (i, case) in cases.iter().enumerate() {
            let row = (i + 1) as u32;
            worksheet.write_number(row, 0, (i + 1) as f64)?;
            worksheet.write_string(row, 1, &case.checkpoint)?;
            worksheet.write_string(row, 2, &clean_markdown(&case.body))?;
        }
    }
    Ok(workbook.save_to_buffer()?)
}

// ============================================================================
// DOCX
// ============================================================================

fn heading(text: &str, size: usize) -> Paragraph {
    Paragraph::new().add_run(Run::new().add_text(text).bold().size(size))
}

fn bullet(text: &str) -> Paragraph {
    Paragraph::new().add_run(Run::new().add_text(format!("• {text}")))
}

fn pack(docx: Docx) -> Result<Vec<u8>, ExportError> {
    let mut cursor = std::io::Cursor::new(Vec::new());
    docx.build()
        .pack(&mut cursor)
        .map_err(|e| ExportError::Docx(e.to_string()))?;
    Ok(cursor.into_inner())
}

/// Bulleted list under a title, e.g. the rules export.
pub fn export_items_docx(title: &str, items: &[String]) -> Result<Vec<u8>, ExportError> {
    let mut docx = Docx::new().add_paragraph(heading(title, 32));
    for item in items {
        docx = docx.add_paragraph(bullet(item));
    }
    pack(docx)
}

/// Checkpoint document with existing/new sub-headings.
pub fn export_checkpoints_docx(checkpoints: &[Checkpoint]) -> Result<Vec<u8>, ExportError> {
    let mut docx = Docx::new().add_paragraph(heading("Points de Contrôle", 32));

    let (existing, new): (Vec<_>, Vec<_>) = checkpoints
        .iter()
        .partition(|c| c.provenance == Provenance::Existing);

    if !existing.is_empty() {
        docx = docx.add_paragraph(heading("Points Existants", 26));
        for point in &existing {
            docx = docx.add_paragraph(bullet(&point.text));
        }
    }
    if !new.is_empty() {
        docx = docx.add_paragraph(heading("Nouveaux Points", 26));
        for point in &new {
            docx = docx.add_paragraph(bullet(&point.text));
        }
    }
    pack(docx)
}

pub fn export_test_cases_docx(cases: &[TestCase]) -> Result<Vec<u8>, ExportError> {
    let mut docx = Docx::new().add_paragraph(heading("Cas de Test", 32));
    for (i, case) in cases.iter().enumerate() {
        docx = docx.add_paragraph(heading(&format!("Cas de test {}", i + 1), 26));
        docx = docx
            .add_paragraph(Paragraph::new().add_run(Run::new().add_text(clean_markdown(&case.body))));
    }
    pack(docx)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn checkpoint(text: &str, provenance: Provenance) -> Checkpoint {
        Checkpoint {
            text: text.to_string(),
            provenance,
        }
    }

    #[test]
    fn markdown_cleanup_strips_headings_and_bold() {
        let body = "## Objectif\n**Vérifier** le solde";
        assert_eq!(clean_markdown(body), "Objectif\nVérifier le solde");
    }

    #[test]
    fn items_text_is_numbered_in_order() {
        let items = vec!["première règle".to_string(), "seconde règle".to_string()];
        let out = export_items_text("Règles de gestion", &items);
        assert!(out.starts_with("RÈGLES DE GESTION\n"));
        assert!(out.contains("1. première règle\n"));
        assert!(out.contains("2. seconde règle\n"));
    }

    #[test]
    fn checkpoints_text_keeps_existing_section_first() {
        let points = vec![
            checkpoint("ancien", Provenance::Existing),
            checkpoint("nouveau", Provenance::Generated),
        ];
        let out = export_checkpoints_text(&points);
        let existing_at = out.find("POINTS EXISTANTS").unwrap();
        let new_at = out.find("NOUVEAUX POINTS").unwrap();
        assert!(existing_at < new_at);
        assert!(out.contains("• ancien"));
        assert!(out.contains("• nouveau"));
    }

    #[test]
    fn empty_sections_are_omitted() {
        let points = vec![checkpoint("nouveau", Provenance::Generated)];
        let out = export_checkpoints_text(&points);
        assert!(!out.contains("POINTS EXISTANTS"));
        assert!(out.contains("NOUVEAUX POINTS"));
    }

    #[test]
    fn xlsx_export_produces_a_workbook() {
        let items = vec!["Vérifier le solde".to_string()];
        let bytes = export_items_xlsx(&items, "Points_de_controle").unwrap();
        // XLSX containers start with the zip magic.
        assert_eq!(&bytes[..2], b"PK");
    }

    #[test]
    fn docx_export_produces_a_document() {
        let cases = vec![TestCase {
            checkpoint: "le solde est positif".to_string(),
            body: "## Cas\n**Étapes**: ...".to_string(),
        }];
        let bytes = export_test_cases_docx(&cases).unwrap();
        assert_eq!(&bytes[..2], b"PK");
    }
}
