//! Office Open XML documents (`.docx`, `.pptx`, `.xlsx`): zip archives of
//! XML parts. Text is read from the parts that carry visible content.

use std::io::{Read, Seek};
use std::path::Path;

use quick_xml::events::Event;
use quick_xml::Reader;

use crate::content::extract::DocumentExtractor;
use crate::error::ProcessError;

/// Default cap on the decompressed XML read from one archive.
pub const DEFAULT_EXPANDED_LIMIT: u64 = 64 * 1024 * 1024;

pub struct OoxmlExtractor {
    max_expanded_bytes: u64,
}

impl OoxmlExtractor {
    pub fn new() -> Self {
        Self::with_limit(DEFAULT_EXPANDED_LIMIT)
    }

    /// Caps the total decompressed size of the parts read from one archive.
    /// A small archive can inflate far beyond its download size.
    pub fn with_limit(max_expanded_bytes: u64) -> Self {
        Self { max_expanded_bytes }
    }
}

impl Default for OoxmlExtractor {
    fn default() -> Self {
        Self::new()
    }
}

impl DocumentExtractor for OoxmlExtractor {
    fn extract(&self, path: &Path) -> Result<String, ProcessError> {
        let file = std::fs::File::open(path).map_err(|e| ProcessError::ReadDocument {
            path: path.to_path_buf(),
            source: e,
        })?;

        let archive = zip::ZipArchive::new(file).map_err(|e| {
            ProcessError::OfficeProcessing(format!("Failed to open archive: {}", e))
        })?;
        let mut parts = Parts {
            archive,
            remaining: self.max_expanded_bytes,
            limit: self.max_expanded_bytes,
        };

        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("")
            .to_lowercase();

        match extension.as_str() {
            "docx" => {
                let xml = parts.read("word/document.xml")?;
                parse_paragraphs(&xml)
            }
            "pptx" => extract_slides(&mut parts),
            "xlsx" => extract_workbook(&mut parts),
            other => Err(ProcessError::UnsupportedFormat(other.to_string())),
        }
    }

    fn supports(&self, extension: &str) -> bool {
        matches!(extension, "docx" | "pptx" | "xlsx")
    }
}

/// An open archive plus what is left of its decompression budget.
struct Parts<R> {
    archive: zip::ZipArchive<R>,
    remaining: u64,
    limit: u64,
}

impl<R: Read + Seek> Parts<R> {
    fn contains(&self, name: &str) -> bool {
        self.archive.file_names().any(|n| n == name)
    }

    fn read(&mut self, name: &str) -> Result<String, ProcessError> {
        let part = self.archive.by_name(name).map_err(|e| {
            ProcessError::OfficeProcessing(format!("Failed to find {}: {}", name, e))
        })?;

        let mut xml = String::new();
        let read = part
            .take(self.remaining.saturating_add(1))
            .read_to_string(&mut xml)
            .map_err(|e| {
                ProcessError::OfficeProcessing(format!("Failed to read {}: {}", name, e))
            })? as u64;
        if read > self.remaining {
            return Err(ProcessError::OfficeProcessing(format!(
                "decompressed content exceeds limit of {} bytes",
                self.limit
            )));
        }
        self.remaining -= read;
        Ok(xml)
    }
}

/// Names of numbered parts such as `ppt/slides/slide3.xml`, in numeric order.
fn numbered_parts<R: Read + Seek>(
    archive: &zip::ZipArchive<R>,
    prefix: &str,
) -> Vec<String> {
    let mut parts: Vec<(u32, String)> = archive
        .file_names()
        .filter_map(|name| {
            let n = name.strip_prefix(prefix)?.strip_suffix(".xml")?.parse().ok()?;
            Some((n, name.to_string()))
        })
        .collect();
    parts.sort();
    parts.into_iter().map(|(_, name)| name).collect()
}

fn extract_slides<R: Read + Seek>(parts: &mut Parts<R>) -> Result<String, ProcessError> {
    let mut text = String::new();
    for name in numbered_parts(&parts.archive, "ppt/slides/slide") {
        let xml = parts.read(&name)?;
        text.push_str(&parse_paragraphs(&xml)?);
    }
    Ok(text)
}

fn extract_workbook<R: Read + Seek>(parts: &mut Parts<R>) -> Result<String, ProcessError> {
    // Workbooks without any text cells have no shared strings part.
    let shared = if parts.contains("xl/sharedStrings.xml") {
        parse_shared_strings(&parts.read("xl/sharedStrings.xml")?)?
    } else {
        Vec::new()
    };

    let mut text = String::new();
    for name in numbered_parts(&parts.archive, "xl/worksheets/sheet") {
        let xml = parts.read(&name)?;
        text.push_str(&parse_sheet(&xml, &shared)?);
    }
    Ok(text)
}

/// Collects `t` runs, ending each `p` paragraph with a newline. Word
/// (`w:`) and DrawingML (`a:`) share these local names.
fn parse_paragraphs(xml: &str) -> Result<String, ProcessError> {
    let mut reader = Reader::from_str(xml);

    let mut text = String::new();
    let mut in_text_element = false;

    loop {
        match reader.read_event() {
            Ok(Event::Start(ref e)) => {
                if e.local_name().as_ref() == b"t" {
                    in_text_element = true;
                }
            }
            Ok(Event::End(ref e)) => match e.local_name().as_ref() {
                b"t" => in_text_element = false,
                b"p" => text.push('\n'),
                _ => {}
            },
            Ok(Event::Text(e)) if in_text_element => {
                text.push_str(&decode_text(&reader, &e)?);
            }
            Ok(Event::GeneralRef(e)) if in_text_element => {
                push_entity(&mut text, &e);
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(xml_error(e)),
            _ => {}
        }
    }

    Ok(text)
}

/// The `si` entries of `sharedStrings.xml`, each the concatenation of its
/// `t` runs.
fn parse_shared_strings(xml: &str) -> Result<Vec<String>, ProcessError> {
    let mut reader = Reader::from_str(xml);

    let mut strings = Vec::new();
    let mut current = String::new();
    let mut in_text_element = false;

    loop {
        match reader.read_event() {
            Ok(Event::Start(ref e)) => match e.local_name().as_ref() {
                b"si" => current.clear(),
                b"t" => in_text_element = true,
                _ => {}
            },
            Ok(Event::End(ref e)) => match e.local_name().as_ref() {
                b"si" => strings.push(std::mem::take(&mut current)),
                b"t" => in_text_element = false,
                _ => {}
            },
            Ok(Event::Text(e)) if in_text_element => {
                current.push_str(&decode_text(&reader, &e)?);
            }
            Ok(Event::GeneralRef(e)) if in_text_element => {
                push_entity(&mut current, &e);
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(xml_error(e)),
            _ => {}
        }
    }

    Ok(strings)
}

/// Cell values of one worksheet, space separated, one line per row.
/// Shared-string cells (`t="s"`) are resolved through `shared`.
fn parse_sheet(xml: &str, shared: &[String]) -> Result<String, ProcessError> {
    let mut reader = Reader::from_str(xml);

    let mut text = String::new();
    let mut row: Vec<String> = Vec::new();
    let mut cell_is_shared = false;
    let mut in_value = false;
    let mut value = String::new();

    loop {
        match reader.read_event() {
            Ok(Event::Start(ref e)) => match e.local_name().as_ref() {
                b"c" => {
                    cell_is_shared = e
                        .try_get_attribute("t")
                        .ok()
                        .flatten()
                        .is_some_and(|a| a.value.as_ref() == b"s");
                    value.clear();
                }
                b"v" | b"t" => in_value = true,
                _ => {}
            },
            Ok(Event::End(ref e)) => match e.local_name().as_ref() {
                b"v" | b"t" => in_value = false,
                b"c" => {
                    let cell = if cell_is_shared {
                        value
                            .trim()
                            .parse::<usize>()
                            .ok()
                            .and_then(|i| shared.get(i))
                            .cloned()
                            .unwrap_or_default()
                    } else {
                        value.clone()
                    };
                    if !cell.is_empty() {
                        row.push(cell);
                    }
                }
                b"row" => {
                    if !row.is_empty() {
                        text.push_str(&row.join(" "));
                        text.push('\n');
                        row.clear();
                    }
                }
                _ => {}
            },
            Ok(Event::Text(e)) if in_value => {
                value.push_str(&decode_text(&reader, &e)?);
            }
            Ok(Event::GeneralRef(e)) if in_value => {
                push_entity(&mut value, &e);
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(xml_error(e)),
            _ => {}
        }
    }

    Ok(text)
}

fn decode_text<'a>(
    reader: &Reader<&[u8]>,
    e: &'a quick_xml::events::BytesText<'a>,
) -> Result<std::borrow::Cow<'a, str>, ProcessError> {
    reader
        .decoder()
        .decode(e.as_ref())
        .map_err(|e| ProcessError::OfficeProcessing(format!("Invalid text encoding: {}", e)))
}

/// Appends the character an entity reference (`amp`, `#38`, `#x26`) names.
/// Unknown entities are dropped.
fn push_entity(out: &mut String, name: &[u8]) {
    let resolved = match name {
        b"amp" => Some('&'),
        b"lt" => Some('<'),
        b"gt" => Some('>'),
        b"quot" => Some('"'),
        b"apos" => Some('\''),
        _ => std::str::from_utf8(name)
            .ok()
            .and_then(|n| n.strip_prefix('#'))
            .and_then(|n| match n.strip_prefix('x') {
                Some(hex) => u32::from_str_radix(hex, 16).ok(),
                None => n.parse().ok(),
            })
            .and_then(char::from_u32),
    };
    if let Some(c) = resolved {
        out.push(c);
    }
}

fn xml_error(e: quick_xml::Error) -> ProcessError {
    ProcessError::OfficeProcessing(format!("XML parsing error: {}", e))
}
