//! Transaction attribute set
//!
//! One transaction owns exactly one [`TransactionData`] set. It is
//! seeded with terminal-sourced elements, then filled from the card's
//! decoded data objects; every value is checked against the tag
//! dictionary on the way in and carries a `validated` flag out.

use std::collections::HashMap;

use bytes::Bytes;
use emv_tlv::{Content, Tag, TlvNode};
use tracing::warn;

use crate::dictionary;
use crate::error::{Error, Result};

/// A single decoded EMV data element
#[derive(Debug, Clone)]
pub struct EmvAttribute {
    tag: Tag,
    name: &'static str,
    value: Bytes,
    validated: bool,
}

impl EmvAttribute {
    /// The element's tag
    pub const fn tag(&self) -> Tag {
        self.tag
    }

    /// Semantic name from the dictionary, `"Unknown"` otherwise
    pub const fn name(&self) -> &'static str {
        self.name
    }

    /// Raw value bytes
    pub fn value(&self) -> &[u8] {
        &self.value
    }

    /// Whether the value passed dictionary format validation
    ///
    /// Unknown tags are preserved but never validated.
    pub const fn is_validated(&self) -> bool {
        self.validated
    }
}

/// The flat, validated attribute set of one transaction
#[derive(Debug, Clone, Default)]
pub struct TransactionData {
    entries: Vec<EmvAttribute>,
    index: HashMap<Tag, usize>,
}

impl TransactionData {
    /// Create an empty attribute set
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a data element, validating it against the dictionary
    ///
    /// The first value inserted for a tag wins: card files may repeat
    /// data objects, and a later conflicting duplicate is suspicious
    /// enough to log but never to silently adopt.
    pub fn insert(&mut self, tag: Tag, value: impl Into<Bytes>) {
        let value = value.into();
        if let Some(&existing) = self.index.get(&tag) {
            if self.entries[existing].value != value {
                warn!(%tag, "conflicting duplicate data object ignored");
            }
            return;
        }

        let info = dictionary::lookup(tag);
        let validated = info.is_some_and(|info| info.validate(&value));
        if info.is_some() && !validated {
            warn!(%tag, len = value.len(), "data object failed format validation");
        }

        self.index.insert(tag, self.entries.len());
        self.entries.push(EmvAttribute {
            tag,
            name: dictionary::name(tag),
            value,
            validated,
        });
    }

    /// Absorb every primitive data object from decoded TLV trees,
    /// looking through constructed templates
    pub fn absorb(&mut self, nodes: &[TlvNode]) {
        let mut stack: Vec<&TlvNode> = nodes.iter().rev().collect();
        while let Some(node) = stack.pop() {
            match node.content() {
                Content::Primitive(value) => self.insert(node.tag(), value.clone()),
                Content::Constructed(children) => stack.extend(children.iter().rev()),
            }
        }
    }

    /// Value bytes for `tag`, if present
    pub fn get(&self, tag: Tag) -> Option<&[u8]> {
        self.index.get(&tag).map(|&i| self.entries[i].value())
    }

    /// Full attribute for `tag`, if present
    pub fn attribute(&self, tag: Tag) -> Option<&EmvAttribute> {
        self.index.get(&tag).map(|&i| &self.entries[i])
    }

    /// Value bytes for `tag`, or [`Error::MissingDataObject`]
    pub fn require(&self, tag: Tag) -> Result<&[u8]> {
        self.get(tag).ok_or(Error::MissingDataObject { tag })
    }

    /// Whether `tag` has a value
    pub fn contains(&self, tag: Tag) -> bool {
        self.index.contains_key(&tag)
    }

    /// Iterate attributes in insertion order
    pub fn iter(&self) -> impl Iterator<Item = &EmvAttribute> {
        self.entries.iter()
    }

    /// Number of attributes in the set
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the set is empty
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
