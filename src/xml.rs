//! Listing wire format
//!
//! Parses the service's `ListBucketResult` XML body into a [`ListPage`].
//! Only the elements the client consumes are read; everything else is
//! skipped. The request engine never parses XML itself.

use quick_xml::events::Event;
use quick_xml::Reader;

use crate::types::{ListPage, ObjectEntry};

/// Errors from reading a listing body.
#[derive(Debug, thiserror::Error)]
pub enum XmlError {
    /// An error from the underlying XML reader.
    #[error("XML processing error: {0}")]
    QuickXml(#[from] quick_xml::Error),

    /// A required XML element was missing.
    #[error("missing required XML element: {0}")]
    MissingElement(String),

    /// An error parsing a value from XML text content.
    #[error("failed to parse value: {0}")]
    ParseError(String),
}

/// Parse a `ListBucketResult` body.
///
/// The returned page's `continuation_key` is the service's `NextMarker` when
/// present, otherwise the key of the last entry; it is always `None` for a
/// non-truncated page.
pub fn parse_list_page(xml: &[u8]) -> Result<ListPage, XmlError> {
    let mut reader = Reader::from_reader(xml);
    reader.config_mut().trim_text(true);

    // Skip the declaration and position inside the root element.
    loop {
        match reader.read_event()? {
            Event::Start(_) => break,
            Event::Eof => {
                return Err(XmlError::MissingElement("ListBucketResult".to_string()));
            }
            _ => {}
        }
    }

    let mut entries = Vec::new();
    let mut common_prefixes = Vec::new();
    let mut truncated = false;
    let mut next_marker = None;

    loop {
        match reader.read_event()? {
            Event::Start(start) => match start.local_name().as_ref() {
                b"Contents" => entries.push(read_entry(&mut reader)?),
                b"CommonPrefixes" => {
                    if let Some(prefix) = read_common_prefix(&mut reader)? {
                        common_prefixes.push(prefix);
                    }
                }
                b"IsTruncated" => {
                    truncated = parse_bool(&read_text_content(&mut reader)?)?;
                }
                b"NextMarker" => {
                    next_marker = Some(read_text_content(&mut reader)?);
                }
                _ => skip_element(&mut reader)?,
            },
            Event::End(_) => break,
            Event::Eof => break,
            _ => {}
        }
    }

    let continuation_key = if truncated {
        next_marker.or_else(|| entries.last().map(|entry: &ObjectEntry| entry.key.clone()))
    } else {
        None
    };

    Ok(ListPage {
        entries,
        common_prefixes,
        truncated,
        continuation_key,
    })
}

/// Read one `<Contents>` element into an [`ObjectEntry`].
///
/// `Key` is required; `Size` and `LastModified` are tolerated missing or
/// unreadable, matching what lenient servers emit.
fn read_entry(reader: &mut Reader<&[u8]>) -> Result<ObjectEntry, XmlError> {
    let mut key = None;
    let mut size = 0u64;
    let mut last_modified = None;

    loop {
        match reader.read_event()? {
            Event::Start(start) => match start.local_name().as_ref() {
                b"Key" => key = Some(read_text_content(reader)?),
                b"Size" => {
                    size = read_text_content(reader)?.parse().unwrap_or(0);
                }
                b"LastModified" => {
                    last_modified = parse_timestamp(&read_text_content(reader)?);
                }
                _ => skip_element(reader)?,
            },
            Event::End(_) => break,
            Event::Eof => {
                return Err(XmlError::ParseError(
                    "unexpected EOF inside Contents".to_string(),
                ));
            }
            _ => {}
        }
    }

    let key = key.ok_or_else(|| XmlError::MissingElement("Key".to_string()))?;
    Ok(ObjectEntry::new(key, size, last_modified))
}

/// Read the `<Prefix>` child of a `<CommonPrefixes>` element.
fn read_common_prefix(reader: &mut Reader<&[u8]>) -> Result<Option<String>, XmlError> {
    let mut prefix = None;
    loop {
        match reader.read_event()? {
            Event::Start(start) => match start.local_name().as_ref() {
                b"Prefix" => prefix = Some(read_text_content(reader)?),
                _ => skip_element(reader)?,
            },
            Event::End(_) => return Ok(prefix),
            Event::Eof => {
                return Err(XmlError::ParseError(
                    "unexpected EOF inside CommonPrefixes".to_string(),
                ));
            }
            _ => {}
        }
    }
}

/// Read the text content of the current element and consume its end tag.
fn read_text_content(reader: &mut Reader<&[u8]>) -> Result<String, XmlError> {
    let mut text = String::new();
    loop {
        match reader.read_event()? {
            Event::Text(event) => {
                let decoded = event
                    .decode()
                    .map_err(|err| XmlError::ParseError(err.to_string()))?;
                let unescaped = quick_xml::escape::unescape(&decoded)
                    .map_err(|err| XmlError::ParseError(err.to_string()))?;
                text.push_str(&unescaped);
            }
            Event::End(_) => return Ok(text),
            Event::Eof => {
                return Err(XmlError::ParseError(
                    "unexpected EOF while reading text content".to_string(),
                ));
            }
            _ => {}
        }
    }
}

/// Skip over an element and all its children.
fn skip_element(reader: &mut Reader<&[u8]>) -> Result<(), XmlError> {
    let mut depth: u32 = 1;
    loop {
        match reader.read_event()? {
            Event::Start(_) => depth += 1,
            Event::End(_) => {
                depth -= 1;
                if depth == 0 {
                    return Ok(());
                }
            }
            Event::Eof => {
                return Err(XmlError::ParseError(
                    "unexpected EOF while skipping element".to_string(),
                ));
            }
            _ => {}
        }
    }
}

fn parse_bool(text: &str) -> Result<bool, XmlError> {
    match text {
        "true" => Ok(true),
        "false" => Ok(false),
        _ => Err(XmlError::ParseError(format!("invalid boolean: {text}"))),
    }
}

/// Timestamps come as RFC 3339 with or without fractional seconds; an
/// unreadable value is dropped rather than failing the page.
fn parse_timestamp(text: &str) -> Option<chrono::DateTime<chrono::Utc>> {
    chrono::DateTime::parse_from_rfc3339(text)
        .map(|dt| dt.with_timezone(&chrono::Utc))
        .or_else(|_| {
            chrono::NaiveDateTime::parse_from_str(text, "%Y-%m-%dT%H:%M:%S%.fZ")
                .map(|ndt| ndt.and_utc())
        })
        .ok()
}
