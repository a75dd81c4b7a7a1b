//! Sitemap link extraction

use crate::extract::{ExtractError, Extractor};
use quick_xml::events::Event;
use quick_xml::Reader;

/// Extracts page URLs from `<loc>` elements of a sitemap document
///
/// Text and CDATA content are both read, entities are unescaped and
/// namespace prefixes on `loc` are ignored.
#[derive(Debug, Default)]
pub struct SitemapExtractor;

impl SitemapExtractor {
    pub fn new() -> Self {
        Self
    }
}

fn malformed(reader: &Reader<&[u8]>, error: impl std::fmt::Display) -> ExtractError {
    ExtractError::Malformed(format!(
        "{} at byte {}",
        error,
        reader.buffer_position()
    ))
}

impl Extractor for SitemapExtractor {
    type Output = Vec<String>;

    /// Returns `<loc>` texts in document order, trimmed, empty entries dropped
    fn extract(&self, content: &str) -> Result<Vec<String>, ExtractError> {
        if content.trim().is_empty() {
            return Err(ExtractError::Malformed("empty sitemap document".to_string()));
        }

        let mut reader = Reader::from_str(content);
        let mut links = Vec::new();
        let mut current: Option<String> = None;

        loop {
            match reader.read_event() {
                Ok(Event::Start(ref e)) if e.local_name().as_ref() == b"loc" => {
                    current = Some(String::new());
                }
                Ok(Event::Text(ref e)) => {
                    if let Some(text) = current.as_mut() {
                        let unescaped = e.unescape().map_err(|err| malformed(&reader, err))?;
                        text.push_str(&unescaped);
                    }
                }
                Ok(Event::CData(ref e)) => {
                    if let Some(text) = current.as_mut() {
                        text.push_str(&String::from_utf8_lossy(e));
                    }
                }
                Ok(Event::End(ref e)) if e.local_name().as_ref() == b"loc" => {
                    if let Some(text) = current.take() {
                        let link = text.trim();
                        if !link.is_empty() {
                            links.push(link.to_string());
                        }
                    }
                }
                Ok(Event::Eof) => break,
                Err(e) => return Err(malformed(&reader, e)),
                _ => {}
            }
        }

        Ok(links)
    }
}
