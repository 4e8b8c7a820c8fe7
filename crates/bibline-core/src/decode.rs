//! Stream decoders: bytes in, raw source records out.
//!
//! Every decoder is a lazy iterator over `Result<T, StreamError>` and never
//! holds more than one record in memory. Malformed-unit policy:
//!
//! | Decoder | Malformed unit | Policy |
//! |---|---|---|
//! | [`LineDecoder`] | invalid UTF-8 line | skip, count |
//! | [`JsonLinesDecoder`] | line that is not valid JSON for `T` | skip, count |
//! | [`XmlElementDecoder`] | XML syntax error | fatal |
//! | [`XmlElementDecoder`] | element that does not fit `T` | [`MalformedElement`] |
//!
//! A stream error ends iteration: the error is yielded once, then `None`.

use std::io::BufRead;
use std::marker::PhantomData;

use quick_xml::events::attributes::Attribute;
use quick_xml::events::{BytesEnd, BytesStart, Event};
use quick_xml::name::QName;
use quick_xml::{Reader, Writer};
use serde::de::DeserializeOwned;

use crate::error::StreamError;

/// A decoder that can report how many units it dropped.
pub trait RecordDecoder<T>: Iterator<Item = Result<T, StreamError>> {
    /// Units skipped as malformed so far
    fn malformed(&self) -> usize;
}

// =============================================================================
// Lines
// =============================================================================

/// Newline-delimited text records. Blank lines are not records.
pub struct LineDecoder<R> {
    reader: R,
    buf: Vec<u8>,
    line_no: u64,
    malformed: usize,
    done: bool,
}

impl<R: BufRead> LineDecoder<R> {
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            buf: Vec::with_capacity(4096),
            line_no: 0,
            malformed: 0,
            done: false,
        }
    }

    /// 1-based number of the line most recently read
    pub fn line_no(&self) -> u64 {
        self.line_no
    }
}

impl<R: BufRead> Iterator for LineDecoder<R> {
    type Item = Result<String, StreamError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        loop {
            self.buf.clear();
            match self.reader.read_until(b'\n', &mut self.buf) {
                Ok(0) => {
                    self.done = true;
                    return None;
                }
                Ok(_) => {
                    self.line_no += 1;
                    let line = trim_newline(&self.buf);
                    if line.iter().all(u8::is_ascii_whitespace) {
                        continue;
                    }
                    match std::str::from_utf8(line) {
                        Ok(s) => return Some(Ok(s.to_owned())),
                        Err(e) => {
                            self.malformed += 1;
                            log::debug!("line {}: skipped, {e}", self.line_no);
                        }
                    }
                }
                Err(e) if e.kind() == std::io::ErrorKind::Interrupted => {}
                Err(e) => {
                    self.done = true;
                    return Some(Err(e.into()));
                }
            }
        }
    }
}

impl<R: BufRead> RecordDecoder<String> for LineDecoder<R> {
    fn malformed(&self) -> usize {
        self.malformed
    }
}

fn trim_newline(line: &[u8]) -> &[u8] {
    let line = line.strip_suffix(b"\n").unwrap_or(line);
    line.strip_suffix(b"\r").unwrap_or(line)
}

// =============================================================================
// JSON lines
// =============================================================================

/// One JSON document per line, deserialized into `T`.
pub struct JsonLinesDecoder<R, T> {
    lines: LineDecoder<R>,
    malformed: usize,
    _marker: PhantomData<fn() -> T>,
}

impl<R: BufRead, T: DeserializeOwned> JsonLinesDecoder<R, T> {
    pub fn new(reader: R) -> Self {
        Self {
            lines: LineDecoder::new(reader),
            malformed: 0,
            _marker: PhantomData,
        }
    }
}

impl<R: BufRead, T: DeserializeOwned> Iterator for JsonLinesDecoder<R, T> {
    type Item = Result<T, StreamError>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let line = match self.lines.next()? {
                Ok(line) => line,
                Err(e) => return Some(Err(e)),
            };
            match serde_json::from_str::<T>(&line) {
                Ok(value) => return Some(Ok(value)),
                Err(e) => {
                    self.malformed += 1;
                    log::debug!("line {}: skipped, invalid JSON: {e}", self.lines.line_no());
                }
            }
        }
    }
}

impl<R: BufRead, T: DeserializeOwned> RecordDecoder<T> for JsonLinesDecoder<R, T> {
    fn malformed(&self) -> usize {
        self.malformed + self.lines.malformed()
    }
}

// =============================================================================
// XML elements
// =============================================================================

/// What to do with an element that is well-formed XML but not a valid `T`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MalformedElement {
    /// Abort the stream
    Fatal,
    /// Drop the element, count it and continue
    Skip,
}

/// Repeating XML elements, located by local name anywhere in the document.
///
/// Each matching element is captured into a standalone fragment with
/// namespace prefixes and `xmlns` declarations removed, then deserialized
/// into `T` with serde. Only one fragment is alive at a time.
pub struct XmlElementDecoder<R, T> {
    reader: Reader<R>,
    name: Vec<u8>,
    policy: MalformedElement,
    buf: Vec<u8>,
    malformed: usize,
    done: bool,
    _marker: PhantomData<fn() -> T>,
}

impl<R: BufRead, T: DeserializeOwned> XmlElementDecoder<R, T> {
    pub fn new(reader: R, local_name: &str, policy: MalformedElement) -> Self {
        let mut reader = Reader::from_reader(reader);
        reader.config_mut().trim_text(true);
        Self {
            reader,
            name: local_name.as_bytes().to_vec(),
            policy,
            buf: Vec::new(),
            malformed: 0,
            done: false,
            _marker: PhantomData,
        }
    }

    fn xml_error(&self, message: impl ToString) -> StreamError {
        StreamError::Xml {
            position: self.reader.error_position() as u64,
            message: message.to_string(),
        }
    }

    /// Copy the rest of the current element into a prefix-free fragment.
    fn capture(&mut self, start: BytesStart<'static>, empty: bool) -> Result<String, StreamError> {
        let mut writer = Writer::new(Vec::new());
        if empty {
            emit(&mut writer, Event::Empty(start))?;
        } else {
            emit(&mut writer, Event::Start(start))?;
            let mut depth = 1usize;
            let mut buf = Vec::new();
            while depth > 0 {
                let event = match self.reader.read_event_into(&mut buf) {
                    Ok(event) => event,
                    Err(e) => return Err(self.xml_error(e)),
                };
                match event {
                    Event::Start(e) => {
                        depth += 1;
                        emit(&mut writer, Event::Start(local_start(&e)?))?;
                    }
                    Event::End(e) => {
                        depth -= 1;
                        let name = String::from_utf8_lossy(e.local_name().as_ref()).into_owned();
                        emit(&mut writer, Event::End(BytesEnd::new(name)))?;
                    }
                    Event::Empty(e) => emit(&mut writer, Event::Empty(local_start(&e)?))?,
                    Event::Text(e) => emit(&mut writer, Event::Text(e))?,
                    Event::CData(e) => emit(&mut writer, Event::CData(e))?,
                    Event::Eof => {
                        return Err(self.xml_error(format!(
                            "unexpected end of document inside <{}>",
                            String::from_utf8_lossy(&self.name)
                        )));
                    }
                    // Comments, processing instructions, doctype
                    _ => {}
                }
                buf.clear();
            }
        }
        String::from_utf8(writer.into_inner()).map_err(|e| self.xml_error(e))
    }
}

impl<R: BufRead, T: DeserializeOwned> Iterator for XmlElementDecoder<R, T> {
    type Item = Result<T, StreamError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        loop {
            let found = match self.reader.read_event_into(&mut self.buf) {
                Ok(Event::Start(e)) if e.local_name().as_ref() == self.name => {
                    Some((local_start(&e), false))
                }
                Ok(Event::Empty(e)) if e.local_name().as_ref() == self.name => {
                    Some((local_start(&e), true))
                }
                Ok(Event::Eof) => {
                    self.done = true;
                    return None;
                }
                Ok(_) => None,
                Err(e) => {
                    self.done = true;
                    return Some(Err(self.xml_error(e)));
                }
            };
            self.buf.clear();

            let Some((start, empty)) = found else {
                continue;
            };
            let position = self.reader.buffer_position() as u64;
            let fragment = match start.and_then(|s| self.capture(s, empty)) {
                Ok(fragment) => fragment,
                Err(e) => {
                    self.done = true;
                    return Some(Err(e));
                }
            };

            match quick_xml::de::from_str::<T>(&fragment) {
                Ok(record) => return Some(Ok(record)),
                Err(e) if self.policy == MalformedElement::Skip => {
                    self.malformed += 1;
                    log::warn!(
                        "skipped malformed <{}> at byte {position}: {e}",
                        String::from_utf8_lossy(&self.name)
                    );
                }
                Err(e) => {
                    self.done = true;
                    return Some(Err(StreamError::Element {
                        name: String::from_utf8_lossy(&self.name).into_owned(),
                        position,
                        message: e.to_string(),
                    }));
                }
            }
        }
    }
}

impl<R: BufRead, T: DeserializeOwned> RecordDecoder<T> for XmlElementDecoder<R, T> {
    fn malformed(&self) -> usize {
        self.malformed
    }
}

/// Owned start tag with the namespace prefix stripped from the element and
/// its attributes; namespace declarations are dropped.
fn local_start(e: &BytesStart<'_>) -> Result<BytesStart<'static>, StreamError> {
    let name = String::from_utf8_lossy(e.local_name().as_ref()).into_owned();
    let mut start = BytesStart::new(name);
    for attr in e.attributes() {
        let attr = attr.map_err(|e| StreamError::Xml {
            position: 0,
            message: e.to_string(),
        })?;
        if attr.key.as_namespace_binding().is_some() {
            continue;
        }
        start.push_attribute(Attribute {
            key: QName(attr.key.local_name().into_inner()),
            value: attr.value,
        });
    }
    Ok(start)
}

fn emit(writer: &mut Writer<Vec<u8>>, event: Event<'_>) -> Result<(), StreamError> {
    writer.write_event(event).map_err(|e| StreamError::Xml {
        position: 0,
        message: e.to_string(),
    })
}
