//! Minimal owned XML document model on top of `quick-xml`.
//!
//! CLDR sources are small enough to hold in memory, and the extractor needs
//! random access (repeated path lookups, multiple passes over sibling
//! groups), so the event stream is materialized into an [`Element`] tree up
//! front rather than consumed on the fly.
//!
//! Path lookups understand three step kinds: a plain child tag (`a/b/c`),
//! the `*` wildcard, and a leading `.//` that matches the first step against
//! any descendant.

use std::{
    fs::File,
    io::{BufRead, BufReader, Cursor},
    path::Path,
};

use quick_xml::{Reader, events::BytesStart, events::Event};

use crate::error::Error;

/// One XML element: tag, attributes in document order, leading text, the
/// text following its end tag inside the parent, and child elements.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Element {
    pub tag: String,
    pub attrs: Vec<(String, String)>,
    pub text: Option<String>,
    pub tail: Option<String>,
    pub children: Vec<Element>,
}

/// A parsed XML document. Lookups delegate to the root element, so `.//x`
/// finds descendants of the root at any depth.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    pub root: Element,
}

impl Document {
    /// Parse a document from a file path.
    pub fn read_from<P: AsRef<Path>>(path: P) -> Result<Self, Error> {
        let file = File::open(path).map_err(Error::Io)?;
        Self::from_reader(BufReader::new(file))
    }

    /// Parse a document from any reader.
    pub fn from_reader<R: BufRead>(reader: R) -> Result<Self, Error> {
        // Text is kept untrimmed so mixed content flattens with its
        // original spacing; `flat_text` trims at the edges instead.
        let mut xml_reader = Reader::from_reader(reader);

        let mut buf = Vec::new();
        let mut stack: Vec<Element> = Vec::new();
        let mut root: Option<Element> = None;

        loop {
            match xml_reader.read_event_into(&mut buf) {
                Ok(Event::Start(ref e)) => {
                    stack.push(element_from_start(e)?);
                }
                Ok(Event::Empty(ref e)) => {
                    let element = element_from_start(e)?;
                    attach(&mut stack, &mut root, element)?;
                }
                Ok(Event::End(_)) => {
                    let element = stack
                        .pop()
                        .ok_or_else(|| Error::invalid_xml("unmatched end tag"))?;
                    attach(&mut stack, &mut root, element)?;
                }
                Ok(Event::Text(e)) => {
                    let text = e.unescape().map_err(Error::XmlParse)?.into_owned();
                    append_text(&mut stack, &text);
                }
                Ok(Event::CData(e)) => {
                    let text = String::from_utf8_lossy(&e.into_inner()).into_owned();
                    append_text(&mut stack, &text);
                }
                Ok(Event::Eof) => break,
                Ok(_) => {}
                Err(e) => return Err(Error::XmlParse(e)),
            }
            buf.clear();
        }

        if !stack.is_empty() {
            return Err(Error::invalid_xml("unclosed element at end of document"));
        }
        root.map(|root| Document { root })
            .ok_or_else(|| Error::invalid_xml("document has no root element"))
    }

    /// Parse a document from a string.
    pub fn from_str(s: &str) -> Result<Self, Error> {
        Self::from_reader(Cursor::new(s))
    }

    pub fn find(&self, path: &str) -> Option<&Element> {
        self.root.find(path)
    }

    pub fn find_all(&self, path: &str) -> Vec<&Element> {
        self.root.find_all(path)
    }
}

impl Element {
    pub fn new(tag: impl Into<String>) -> Self {
        Element {
            tag: tag.into(),
            ..Element::default()
        }
    }

    /// Value of the named attribute, if present.
    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    pub fn has_attr(&self, name: &str) -> bool {
        self.attrs.iter().any(|(k, _)| k == name)
    }

    /// Like [`Element::attr`], but a missing attribute is a structural
    /// error in the corpus.
    pub fn require_attr(&self, name: &str) -> Result<&str, Error> {
        self.attr(name).ok_or_else(|| {
            Error::invalid_xml(format!("<{}> missing `{}` attribute", self.tag, name))
        })
    }

    /// Leading text content, if any.
    pub fn text(&self) -> Option<&str> {
        self.text.as_deref()
    }

    /// Child elements with the given tag, in document order.
    pub fn children_named<'a>(&'a self, tag: &'a str) -> impl Iterator<Item = &'a Element> {
        self.children.iter().filter(move |c| c.tag == tag)
    }

    /// First element matching `path`, or `None`.
    pub fn find(&self, path: &str) -> Option<&Element> {
        self.find_all(path).into_iter().next()
    }

    /// Text of the first element matching `path`, or `None`.
    pub fn find_text(&self, path: &str) -> Option<&str> {
        self.find(path).and_then(Element::text)
    }

    /// All elements matching `path`, in document order.
    pub fn find_all(&self, path: &str) -> Vec<&Element> {
        let mut out = Vec::new();
        if let Some(rest) = path.strip_prefix(".//") {
            let steps: Vec<&str> = rest.split('/').collect();
            for child in &self.children {
                child.collect_descendants(&steps, &mut out);
            }
        } else {
            let relative = path.strip_prefix("./").unwrap_or(path);
            let steps: Vec<&str> = relative.split('/').collect();
            self.collect_relative(&steps, &mut out);
        }
        out
    }

    /// This element and all of its descendants, preorder.
    pub fn subtree(&self) -> Vec<&Element> {
        let mut out = Vec::new();
        self.push_subtree(&mut out);
        out
    }

    /// Flattened text content: leading text, then each child's flattened
    /// text followed by its tail, the result trimmed at every level.
    pub fn flat_text(&self) -> String {
        let mut buf = String::new();
        if let Some(text) = &self.text {
            buf.push_str(text);
        }
        for child in &self.children {
            buf.push_str(&child.flat_text());
            if let Some(tail) = &child.tail {
                buf.push_str(tail);
            }
        }
        buf.trim().to_string()
    }

    fn collect_relative<'a>(&'a self, steps: &[&str], out: &mut Vec<&'a Element>) {
        let (first, rest) = match steps.split_first() {
            Some(split) => split,
            None => return,
        };
        for child in self.children.iter().filter(|c| step_matches(first, c)) {
            if rest.is_empty() {
                out.push(child);
            } else {
                child.collect_relative(rest, out);
            }
        }
    }

    fn collect_descendants<'a>(&'a self, steps: &[&str], out: &mut Vec<&'a Element>) {
        if step_matches(steps[0], self) {
            if steps.len() == 1 {
                out.push(self);
            } else {
                self.collect_relative(&steps[1..], out);
            }
        }
        for child in &self.children {
            child.collect_descendants(steps, out);
        }
    }

    fn push_subtree<'a>(&'a self, out: &mut Vec<&'a Element>) {
        out.push(self);
        for child in &self.children {
            child.push_subtree(out);
        }
    }
}

fn step_matches(step: &str, element: &Element) -> bool {
    step == "*" || step == element.tag
}

fn element_from_start(e: &BytesStart) -> Result<Element, Error> {
    let tag = String::from_utf8_lossy(e.name().as_ref()).into_owned();
    let mut attrs = Vec::new();
    for attr in e.attributes().with_checks(false) {
        let attr = attr.map_err(|e| Error::invalid_xml(e.to_string()))?;
        let key = String::from_utf8_lossy(attr.key.as_ref()).into_owned();
        let value = attr.unescape_value().map_err(Error::XmlParse)?.into_owned();
        attrs.push((key, value));
    }
    Ok(Element {
        tag,
        attrs,
        ..Element::default()
    })
}

fn attach(
    stack: &mut Vec<Element>,
    root: &mut Option<Element>,
    element: Element,
) -> Result<(), Error> {
    match stack.last_mut() {
        Some(parent) => {
            parent.children.push(element);
            Ok(())
        }
        None if root.is_none() => {
            *root = Some(element);
            Ok(())
        }
        None => Err(Error::invalid_xml("multiple root elements")),
    }
}

fn append_text(stack: &mut Vec<Element>, text: &str) {
    let Some(top) = stack.last_mut() else {
        return;
    };
    let slot = match top.children.last_mut() {
        Some(last) => &mut last.tail,
        None => &mut top.text,
    };
    match slot {
        Some(existing) => existing.push_str(text),
        None => *slot = Some(text.to_string()),
    }
}
