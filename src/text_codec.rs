//! Newline-delimited text files used to import and export option lists.

use encoding_rs::{SHIFT_JIS, UTF_16BE, UTF_16LE, UTF_8};
use log::debug;

use crate::local_db_model::ListId;

const UTF8_BOM: [u8; 3] = [0xEF, 0xBB, 0xBF];

/// A file ready to be handed to the platform's download mechanism.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportFile {
    pub filename: String,
    pub bytes: Vec<u8>,
}

/// Decodes an imported file.
///
/// A byte order mark selects UTF-8, UTF-16LE or UTF-16BE. Without one the
/// bytes must be valid UTF-8, otherwise they are read as Shift_JIS, the
/// encoding spreadsheet tools commonly emit in Japan.
pub fn decode_text(bytes: &[u8]) -> String {
    if let Some(rest) = bytes.strip_prefix(&UTF8_BOM) {
        return UTF_8.decode_without_bom_handling(rest).0.into_owned();
    }
    if let Some(rest) = bytes.strip_prefix(&[0xFF_u8, 0xFE]) {
        return UTF_16LE.decode_without_bom_handling(rest).0.into_owned();
    }
    if let Some(rest) = bytes.strip_prefix(&[0xFE_u8, 0xFF]) {
        return UTF_16BE.decode_without_bom_handling(rest).0.into_owned();
    }
    match std::str::from_utf8(bytes) {
        Ok(text) => text.to_string(),
        Err(_) => {
            let (text, had_errors) = SHIFT_JIS.decode_without_bom_handling(bytes);
            if had_errors {
                debug!("Shift_JIS fallback replaced malformed sequences");
            }
            text.into_owned()
        }
    }
}

/// Splits on `\n` or `\r\n`, drops blank lines and keeps the first
/// occurrence of each line.
pub fn parse_lines(text: &str) -> Vec<String> {
    let mut lines: Vec<String> = Vec::new();
    for line in text.split('\n') {
        let line = line.strip_suffix('\r').unwrap_or(line);
        if line.trim().is_empty() {
            continue;
        }
        if !lines.iter().any(|existing| existing == line) {
            lines.push(line.to_string());
        }
    }
    lines
}

/// Extracts the group from names like `設備(現場A).txt`.
pub fn group_from_filename(file_name: &str) -> Option<String> {
    let inner = file_name.strip_suffix(").txt")?;
    let start = inner.find('(')?;
    let group = inner[start + 1..].trim();
    if group.is_empty() {
        None
    } else {
        Some(group.to_string())
    }
}

/// `{label}({group}).txt`, which [`group_from_filename`] reads back.
pub fn export_filename(list_id: ListId, group: &str) -> String {
    format!("{}({}).txt", list_id.label(), group)
}

/// UTF-8 with a byte order mark so spreadsheet tools detect the encoding.
pub fn encode_export(items: &[String]) -> Vec<u8> {
    let body = items.join("\n");
    let mut bytes = Vec::with_capacity(UTF8_BOM.len() + body.len());
    bytes.extend_from_slice(&UTF8_BOM);
    bytes.extend_from_slice(body.as_bytes());
    bytes
}
