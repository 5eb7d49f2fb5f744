//! Forward-only cursor over an XMLTV document.
//!
//! Wraps a streaming quick-xml reader. Events are turned into owned [`Node`]s
//! so the walker can hold back one node: a language run ends on the first
//! sibling with a different tag, and that sibling must still be visible to the
//! caller afterwards.
//!
//! Bytes are decoded with the encoding the document declares (or its BOM),
//! so `ISO-8859-1` guides come through intact.
//!
//! Every element handed out must be consumed through its end tag before the
//! next sibling is requested, either by reading its children until
//! [`DocumentWalker::next_child`] returns `None`, by [`DocumentWalker::read_text`],
//! or by [`DocumentWalker::skip`].

use quick_xml::encoding::Decoder;
use quick_xml::escape::{resolve_predefined_entity, unescape_with};
use quick_xml::events::{BytesStart, Event};
use quick_xml::reader::Reader;
use std::borrow::Cow;
use std::io::BufRead;

use crate::error::{Result, XmlTvError};

/// Start tag (or self-closing tag) with its decoded attributes.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Element {
    pub(crate) name: String,
    attributes: Vec<(String, String)>,
    /// `<tag/>`: nothing to read and no end tag to consume
    pub(crate) is_empty: bool,
}

impl Element {
    fn from_start(
        e: &BytesStart<'_>,
        is_empty: bool,
        decoder: Decoder,
    ) -> std::result::Result<Self, quick_xml::Error> {
        let name = decoder.decode(e.name().as_ref())?.into_owned();
        let mut attributes = Vec::new();
        for attr in e.attributes().flatten() {
            let key = decoder.decode(attr.key.as_ref())?.into_owned();
            let raw = decoder.decode(attr.value.as_ref())?;
            attributes.push((key, decode_entities(&raw).into_owned()));
        }

        Ok(Self { name, attributes, is_empty })
    }

    /// Attribute value, `None` when the attribute is absent.
    pub(crate) fn attr(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    /// Attribute value, treating an empty value like an absent one.
    pub(crate) fn non_empty_attr(&self, name: &str) -> Option<&str> {
        self.attr(name).filter(|v| !v.is_empty())
    }
}

#[derive(Debug)]
enum Node {
    Start(Element),
    End,
    Text(String),
    Eof,
}

pub(crate) struct DocumentWalker<R> {
    reader: Reader<R>,
    buf: Vec<u8>,
    peeked: Option<Node>,
}

impl<R: BufRead> DocumentWalker<R> {
    pub(crate) fn new(source: R) -> Self {
        let mut reader = Reader::from_reader(source);
        // Text is split around entity references; trimming each piece would
        // eat the spaces next to them, so content is trimmed once assembled.
        reader.config_mut().trim_text(false);

        Self {
            reader,
            buf: Vec::with_capacity(8192),
            peeked: None,
        }
    }

    fn read_node(&mut self) -> Result<Node> {
        if let Some(node) = self.peeked.take() {
            return Ok(node);
        }

        loop {
            let position = self.reader.buffer_position() as u64;
            self.buf.clear();
            let event = self
                .reader
                .read_event_into(&mut self.buf)
                .map_err(|source| XmlTvError::Xml { position, source })?;
            // the declaration has been seen by now, so this is the document's encoding
            let decoder = self.reader.decoder();

            let node = match Self::to_node(event, decoder) {
                Ok(Some(node)) => node,
                // declarations, comments, DOCTYPE, processing instructions
                Ok(None) => continue,
                Err(source) => return Err(XmlTvError::Xml { position, source }),
            };
            return Ok(node);
        }
    }

    fn to_node(event: Event<'_>, decoder: Decoder) -> std::result::Result<Option<Node>, quick_xml::Error> {
        let node = match event {
            Event::Start(e) => Node::Start(Element::from_start(&e, false, decoder)?),
            Event::Empty(e) => Node::Start(Element::from_start(&e, true, decoder)?),
            Event::End(_) => Node::End,
            Event::Text(e) => Node::Text(decode_entities(&decoder.decode(e.as_ref())?).into_owned()),
            Event::CData(e) => Node::Text(decoder.decode(e.as_ref())?.into_owned()),
            Event::GeneralRef(e) => Node::Text(resolve_reference(&decoder.decode(e.as_ref())?)),
            Event::Eof => Node::Eof,
            _ => return Ok(None),
        };
        Ok(Some(node))
    }

    /// Next element anywhere ahead of the cursor, at any depth.
    pub(crate) fn next_element(&mut self) -> Result<Option<Element>> {
        loop {
            match self.read_node()? {
                Node::Start(el) => return Ok(Some(el)),
                Node::Eof => return Ok(None),
                Node::End | Node::Text(_) => {}
            }
        }
    }

    /// Advance to the next element named `tag`, descending as needed.
    pub(crate) fn seek(&mut self, tag: &str) -> Result<Option<Element>> {
        while let Some(el) = self.next_element()? {
            if el.name == tag {
                return Ok(Some(el));
            }
        }
        Ok(None)
    }

    /// Next child of `parent`, or `None` once the parent's end tag has been consumed.
    ///
    /// Text directly inside `parent` is discarded.
    pub(crate) fn next_child(&mut self, parent: &Element) -> Result<Option<Element>> {
        if parent.is_empty {
            return Ok(None);
        }

        loop {
            match self.read_node()? {
                Node::Start(el) => return Ok(Some(el)),
                Node::End => return Ok(None),
                Node::Text(_) => {}
                Node::Eof => return Err(XmlTvError::UnexpectedEof(parent.name.clone())),
            }
        }
    }

    /// Next sibling if it is another `tag` element. Anything else is left
    /// unread for the following `next_child` call.
    pub(crate) fn next_sibling_named(&mut self, tag: &str) -> Result<Option<Element>> {
        loop {
            match self.read_node()? {
                Node::Text(_) => {}
                Node::Start(el) if el.name == tag => return Ok(Some(el)),
                other => {
                    self.peeked = Some(other);
                    return Ok(None);
                }
            }
        }
    }

    /// Consume the remainder of `element`, descendants included.
    pub(crate) fn skip(&mut self, element: &Element) -> Result<()> {
        if element.is_empty {
            return Ok(());
        }

        let mut depth = 1usize;
        while depth > 0 {
            match self.read_node()? {
                Node::Start(el) if !el.is_empty => depth += 1,
                Node::End => depth -= 1,
                Node::Eof => return Err(XmlTvError::UnexpectedEof(element.name.clone())),
                Node::Start(_) | Node::Text(_) => {}
            }
        }
        Ok(())
    }

    /// Trimmed text content of `element`, consumed through its end tag.
    /// Nested elements are skipped.
    pub(crate) fn read_text(&mut self, element: &Element) -> Result<String> {
        let mut text = String::new();
        if element.is_empty {
            return Ok(text);
        }

        loop {
            match self.read_node()? {
                Node::Text(t) => text.push_str(&t),
                Node::Start(child) => self.skip(&child)?,
                Node::End => break,
                Node::Eof => return Err(XmlTvError::UnexpectedEof(element.name.clone())),
            }
        }

        Ok(text.trim().to_string())
    }

    /// Text of the first element named `tag` at any depth below `parent`.
    /// Consumes `parent` through its end tag either way.
    pub(crate) fn descendant_text(&mut self, parent: &Element, tag: &str) -> Result<Option<String>> {
        let mut found = None;
        if parent.is_empty {
            return Ok(found);
        }

        let mut depth = 1usize;
        while depth > 0 {
            match self.read_node()? {
                Node::Start(el) if found.is_none() && el.name == tag => {
                    found = Some(self.read_text(&el)?);
                }
                Node::Start(el) if !el.is_empty => depth += 1,
                Node::End => depth -= 1,
                Node::Eof => return Err(XmlTvError::UnexpectedEof(parent.name.clone())),
                Node::Start(_) | Node::Text(_) => {}
            }
        }
        Ok(found)
    }
}

/// Named references beyond the five XML ones that guides use in practice.
fn resolve_named(name: &str) -> Option<&'static str> {
    match name {
        "nbsp" => Some(" "),
        _ => resolve_predefined_entity(name),
    }
}

/// Decode entity references embedded in raw text or attribute values.
/// Unknown or malformed references are kept as written.
pub(crate) fn decode_entities(s: &str) -> Cow<'_, str> {
    if !s.contains('&') {
        return Cow::Borrowed(s);
    }
    if let Ok(decoded) = unescape_with(s, resolve_named) {
        return decoded;
    }

    // one bad reference: resolve the rest piecewise
    let mut result = String::with_capacity(s.len());
    let mut rest = s;
    while let Some(start) = rest.find('&') {
        result.push_str(&rest[..start]);
        let tail = &rest[start..];
        match tail.find(';').filter(|&end| end > 1 && end <= 10) {
            Some(end) => {
                result.push_str(&resolve_reference(&tail[1..end]));
                rest = &tail[end + 1..];
            }
            None => {
                result.push('&');
                rest = &tail[1..];
            }
        }
    }
    result.push_str(rest);

    Cow::Owned(result)
}

/// Resolve the body of one `&...;` reference, e.g. `amp` or `#x26`.
fn resolve_reference(name: &str) -> String {
    if let Some(text) = resolve_named(name) {
        return text.to_string();
    }

    let resolved = name.strip_prefix('#').and_then(|num| {
        let code = match num.strip_prefix(['x', 'X']) {
            Some(hex) => u32::from_str_radix(hex, 16).ok()?,
            None => num.parse::<u32>().ok()?,
        };
        char::from_u32(code)
    });

    match resolved {
        Some(c) => c.to_string(),
        None => format!("&{};", name),
    }
}
