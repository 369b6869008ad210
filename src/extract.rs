//! Multi-format text extraction for uploaded documents.
//!
//! Dispatches on the file extension and returns plain-text segments in
//! document order: one segment per page for PDFs, per slide/sheet for
//! PPTX/XLSX, a single segment for DOCX bodies and plain text. Extraction
//! failures are per-file; the ingestion coordinator reports them without
//! aborting sibling files.

use std::io::Read;

/// Maximum slides/sheets to process in one OOXML archive.
const OOXML_MAX_PARTS: usize = 200;
/// Maximum decompressed bytes to read from a single ZIP entry (zip-bomb protection).
const MAX_XML_ENTRY_BYTES: u64 = 50 * 1024 * 1024;
/// Maximum cells to read per worksheet.
const XLSX_MAX_CELLS_PER_SHEET: usize = 100_000;

#[derive(Debug)]
pub enum ExtractError {
    Pdf(String),
    Ooxml(String),
    Encoding(String),
}

impl std::fmt::Display for ExtractError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ExtractError::Pdf(e) => write!(f, "PDF extraction failed: {}", e),
            ExtractError::Ooxml(e) => write!(f, "OOXML extraction failed: {}", e),
            ExtractError::Encoding(e) => write!(f, "text decoding failed: {}", e),
        }
    }
}

impl std::error::Error for ExtractError {}

/// Extract plain-text segments from file bytes, dispatched on the
/// lowercased extension of `filename`. Unrecognized extensions are treated
/// as plain text. Segments are returned in document order and must be
/// chunked in that order to keep chunk numbering reproducible.
pub fn extract_segments(filename: &str, bytes: &[u8]) -> Result<Vec<String>, ExtractError> {
    match extension(filename).as_deref() {
        Some("pdf") => extract_pdf(bytes),
        Some("docx") => extract_docx(bytes).map(|text| vec![text]),
        Some("pptx") => extract_pptx(bytes),
        Some("xlsx") => extract_xlsx(bytes),
        _ => extract_plain(bytes).map(|text| vec![text]),
    }
}

fn extension(filename: &str) -> Option<String> {
    filename
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase())
}

fn extract_plain(bytes: &[u8]) -> Result<String, ExtractError> {
    String::from_utf8(bytes.to_vec()).map_err(|e| ExtractError::Encoding(e.to_string()))
}

/// One segment per page, in page order.
fn extract_pdf(bytes: &[u8]) -> Result<Vec<String>, ExtractError> {
    pdf_extract::extract_text_from_mem_by_pages(bytes).map_err(|e| ExtractError::Pdf(e.to_string()))
}

fn read_zip_entry_bounded(
    archive: &mut zip::ZipArchive<std::io::Cursor<&[u8]>>,
    name: &str,
    max_bytes: u64,
) -> Result<Vec<u8>, ExtractError> {
    let entry = archive
        .by_name(name)
        .map_err(|e| ExtractError::Ooxml(e.to_string()))?;
    let mut out = Vec::new();
    entry
        .take(max_bytes)
        .read_to_end(&mut out)
        .map_err(|e| ExtractError::Ooxml(e.to_string()))?;
    if out.len() as u64 >= max_bytes {
        return Err(ExtractError::Ooxml(format!(
            "ZIP entry {} exceeds size limit ({} bytes)",
            name, max_bytes
        )));
    }
    Ok(out)
}

/// Collect `<t>` text nodes from an OOXML part (`w:t` for docx, `a:t` for pptx).
fn collect_t_elements(xml: &[u8]) -> Result<String, ExtractError> {
    let mut out = String::new();
    let mut reader = quick_xml::Reader::from_reader(xml);
    reader.config_mut().trim_text(true);
    let mut buf = Vec::new();
    loop {
        match reader.read_event_into(&mut buf) {
            Ok(quick_xml::events::Event::Start(e)) => {
                if e.local_name().as_ref() == b"t" {
                    if let Ok(quick_xml::events::Event::Text(te)) = reader.read_event_into(&mut buf)
                    {
                        if !out.is_empty() {
                            out.push(' ');
                        }
                        out.push_str(te.unescape().unwrap_or_default().as_ref());
                    }
                }
            }
            Ok(quick_xml::events::Event::Eof) => break,
            Err(e) => return Err(ExtractError::Ooxml(e.to_string())),
            _ => {}
        }
        buf.clear();
    }
    Ok(out)
}

fn extract_docx(bytes: &[u8]) -> Result<String, ExtractError> {
    let mut archive = zip::ZipArchive::new(std::io::Cursor::new(bytes))
        .map_err(|e| ExtractError::Ooxml(e.to_string()))?;
    if !archive.file_names().any(|n| n == "word/document.xml") {
        return Err(ExtractError::Ooxml(
            "word/document.xml not found".to_string(),
        ));
    }
    let xml = read_zip_entry_bounded(&mut archive, "word/document.xml", MAX_XML_ENTRY_BYTES)?;
    collect_t_elements(&xml)
}

/// One segment per slide, in slide-number order.
fn extract_pptx(bytes: &[u8]) -> Result<Vec<String>, ExtractError> {
    let mut archive = zip::ZipArchive::new(std::io::Cursor::new(bytes))
        .map_err(|e| ExtractError::Ooxml(e.to_string()))?;
    let slide_names = numbered_part_names(&archive, "ppt/slides/slide");
    let mut segments = Vec::new();
    for name in slide_names.into_iter().take(OOXML_MAX_PARTS) {
        let xml = read_zip_entry_bounded(&mut archive, &name, MAX_XML_ENTRY_BYTES)?;
        segments.push(collect_t_elements(&xml)?);
    }
    Ok(segments)
}

/// One segment per worksheet of shared-string cell text, in sheet order.
fn extract_xlsx(bytes: &[u8]) -> Result<Vec<String>, ExtractError> {
    let mut archive = zip::ZipArchive::new(std::io::Cursor::new(bytes))
        .map_err(|e| ExtractError::Ooxml(e.to_string()))?;
    let shared_strings = read_shared_strings(&mut archive)?;
    let sheet_names = numbered_part_names(&archive, "xl/worksheets/sheet");
    let mut segments = Vec::new();
    for name in sheet_names.into_iter().take(OOXML_MAX_PARTS) {
        let xml = read_zip_entry_bounded(&mut archive, &name, MAX_XML_ENTRY_BYTES)?;
        segments.push(extract_sheet_cells(&xml, &shared_strings)?);
    }
    Ok(segments)
}

fn numbered_part_names(
    archive: &zip::ZipArchive<std::io::Cursor<&[u8]>>,
    prefix: &str,
) -> Vec<String> {
    let mut names: Vec<String> = archive
        .file_names()
        .filter(|n| n.starts_with(prefix) && n.ends_with(".xml"))
        .map(|s| s.to_string())
        .collect();
    names.sort_by_key(|name| {
        name.trim_start_matches(prefix)
            .trim_end_matches(".xml")
            .parse::<u32>()
            .unwrap_or(u32::MAX)
    });
    names
}

fn read_shared_strings(
    archive: &mut zip::ZipArchive<std::io::Cursor<&[u8]>>,
) -> Result<Vec<String>, ExtractError> {
    if !archive.file_names().any(|n| n == "xl/sharedStrings.xml") {
        return Ok(Vec::new());
    }
    let xml = read_zip_entry_bounded(archive, "xl/sharedStrings.xml", MAX_XML_ENTRY_BYTES)?;
    let mut strings = Vec::new();
    let mut reader = quick_xml::Reader::from_reader(xml.as_slice());
    reader.config_mut().trim_text(true);
    let mut buf = Vec::new();
    let mut in_si = false;
    loop {
        match reader.read_event_into(&mut buf) {
            Ok(quick_xml::events::Event::Start(e)) => {
                if e.local_name().as_ref() == b"si" {
                    in_si = true;
                } else if in_si && e.local_name().as_ref() == b"t" {
                    if let Ok(quick_xml::events::Event::Text(te)) = reader.read_event_into(&mut buf)
                    {
                        strings.push(te.unescape().unwrap_or_default().into_owned());
                    }
                }
            }
            Ok(quick_xml::events::Event::End(e)) => {
                if e.local_name().as_ref() == b"si" {
                    in_si = false;
                }
            }
            Ok(quick_xml::events::Event::Eof) => break,
            Err(e) => return Err(ExtractError::Ooxml(e.to_string())),
            _ => {}
        }
        buf.clear();
    }
    Ok(strings)
}

fn extract_sheet_cells(xml: &[u8], shared_strings: &[String]) -> Result<String, ExtractError> {
    let mut cells: Vec<String> = Vec::new();
    let mut reader = quick_xml::Reader::from_reader(xml);
    reader.config_mut().trim_text(true);
    let mut buf = Vec::new();
    let mut in_v = false;
    let mut cell_is_shared_str = false;
    let mut cell_count = 0usize;
    loop {
        if cell_count >= XLSX_MAX_CELLS_PER_SHEET {
            break;
        }
        match reader.read_event_into(&mut buf) {
            Ok(quick_xml::events::Event::Start(e)) => {
                if e.local_name().as_ref() == b"c" {
                    cell_count += 1;
                    cell_is_shared_str = e.attributes().any(|a| {
                        a.as_ref()
                            .map(|a| a.key.as_ref() == b"t" && a.value.as_ref() == b"s")
                            .unwrap_or(false)
                    });
                } else if e.local_name().as_ref() == b"v" {
                    in_v = true;
                }
            }
            Ok(quick_xml::events::Event::Text(te)) if in_v => {
                let v = te.unescape().unwrap_or_default();
                let s = v.trim();
                if !s.is_empty() && cell_is_shared_str {
                    if let Ok(i) = s.parse::<usize>() {
                        if i < shared_strings.len() {
                            cells.push(shared_strings[i].clone());
                        }
                    }
                }
                in_v = false;
            }
            Ok(quick_xml::events::Event::End(e)) => {
                if e.local_name().as_ref() == b"v" {
                    in_v = false;
                } else if e.local_name().as_ref() == b"c" {
                    cell_is_shared_str = false;
                }
            }
            Ok(quick_xml::events::Event::Eof) => break,
            Err(e) => return Err(ExtractError::Ooxml(e.to_string())),
            _ => {}
        }
        buf.clear();
    }
    Ok(cells.join(" "))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_extension_is_plain_text() {
        let segments = extract_segments("notes.log", b"line one\nline two").unwrap();
        assert_eq!(segments, vec!["line one\nline two".to_string()]);
    }

    #[test]
    fn invalid_utf8_is_encoding_error() {
        let err = extract_segments("notes.txt", &[0xff, 0xfe, 0x00]).unwrap_err();
        assert!(matches!(err, ExtractError::Encoding(_)));
    }

    #[test]
    fn invalid_pdf_returns_error() {
        let err = extract_segments("broken.pdf", b"not a pdf").unwrap_err();
        assert!(matches!(err, ExtractError::Pdf(_)));
    }

    #[test]
    fn invalid_zip_returns_error_for_docx() {
        let err = extract_segments("broken.docx", b"not a zip").unwrap_err();
        assert!(matches!(err, ExtractError::Ooxml(_)));
    }

    #[test]
    fn sheet_cells_resolve_shared_strings() {
        let xml = br#"<worksheet><sheetData><row>
            <c t="s"><v>1</v></c>
            <c><v>42</v></c>
            <c t="s"><v>0</v></c>
        </row></sheetData></worksheet>"#;
        let shared = vec!["beta".to_string(), "alpha".to_string()];
        let out = extract_sheet_cells(xml, &shared).unwrap();
        assert_eq!(out, "alpha beta");
    }

    #[test]
    fn sheet_cell_cap_bounds_extraction() {
        let total = XLSX_MAX_CELLS_PER_SHEET + 50;
        let mut xml = String::from("<worksheet><sheetData><row>");
        for _ in 0..total {
            xml.push_str(r#"<c t="s"><v>0</v></c>"#);
        }
        xml.push_str("</row></sheetData></worksheet>");
        let shared = vec!["x".to_string()];

        let out = extract_sheet_cells(xml.as_bytes(), &shared).unwrap();
        let cells = out.split_whitespace().count();
        assert!(cells <= XLSX_MAX_CELLS_PER_SHEET);
        assert!(cells < total);
    }

    #[test]
    fn extension_dispatch_is_case_insensitive() {
        let err = extract_segments("REPORT.PDF", b"not a pdf").unwrap_err();
        assert!(matches!(err, ExtractError::Pdf(_)));
    }
}
