//! Core types for the sync destination protocol.
//!
//! This module contains the data structures the host hands to a destination:
//! - [`DirectoryEntry`] - An entry identified by its distinguished name
//! - [`Attribute`] - A named attribute holding one or more string values
//! - [`ChangeKind`] - Whether the entry was created, modified or deleted
//! - [`Modification`] - Field-level change descriptors attached to a modify
//! - [`ChangeEvent`] - A single change notification from the host
//! - [`LogSeverity`] - Severity levels understood by the host's log

use serde::{Deserialize, Serialize};
use std::fmt;

/// A directory entry as surfaced by the host for a single change.
///
/// Attribute order is the order the source system produced them in. It has
/// no meaning for the directory itself but it is preserved all the way to the
/// published document so that output is deterministic.
///
/// ```rust
/// # use sync_destination_protocol::DirectoryEntry;
/// let entry = DirectoryEntry::new("uid=jdoe,ou=people,dc=example,dc=com")
///     .with_attribute("cn", ["John Doe"])
///     .with_attribute("mail", ["jdoe@example.com", "john.doe@example.com"]);
///
/// assert_eq!(entry.attributes.len(), 2);
/// assert!(entry.attribute("MAIL").is_some_and(|mail| mail.is_multi_valued()));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DirectoryEntry {
    /// The distinguished name of the entry, exactly as the host reported it.
    pub dn: String,

    /// Attributes in source order.
    #[serde(default)]
    pub attributes: Vec<Attribute>,
}

impl DirectoryEntry {
    /// Create an entry with no attributes.
    #[must_use]
    pub fn new(dn: impl Into<String>) -> Self {
        Self {
            dn: dn.into(),
            attributes: Vec::new(),
        }
    }

    /// Append an attribute, keeping insertion order.
    #[must_use]
    pub fn with_attribute<I, V>(mut self, name: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<String>,
    {
        self.attributes.push(Attribute::new(name, values));
        self
    }

    /// Find the first attribute whose base name matches `name`, ignoring case.
    #[must_use]
    pub fn attribute(&self, name: &str) -> Option<&Attribute> {
        self.attributes
            .iter()
            .find(|attribute| attribute.base_name().eq_ignore_ascii_case(name))
    }
}

/// A named directory attribute.
///
/// The host guarantees every attribute it surfaces carries at least one value.
/// Names are kept exactly as received, including any attribute options.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attribute {
    /// Attribute name, possibly with options (`userCertificate;binary`).
    pub name: String,

    /// Values in source order.
    pub values: Vec<String>,
}

impl Attribute {
    #[must_use]
    pub fn new<I, V>(name: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<String>,
    {
        Self {
            name: name.into(),
            values: values.into_iter().map(Into::into).collect(),
        }
    }

    /// The attribute name without options.
    ///
    /// ```rust
    /// # use sync_destination_protocol::Attribute;
    /// let attribute = Attribute::new("userCertificate;binary", ["..."]);
    /// assert_eq!(attribute.base_name(), "userCertificate");
    /// ```
    #[must_use]
    pub fn base_name(&self) -> &str {
        match self.name.split_once(';') {
            Some((base, _options)) => base,
            None => &self.name,
        }
    }

    #[must_use]
    pub fn is_multi_valued(&self) -> bool {
        self.values.len() > 1
    }
}

/// The kind of change the host observed on an entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeKind {
    Create,
    Modify,
    Delete,
}

impl ChangeKind {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Create => "create",
            Self::Modify => "modify",
            Self::Delete => "delete",
        }
    }
}

impl fmt::Display for ChangeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How a single attribute was changed by a modify operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModificationType {
    Add,
    Delete,
    Replace,
    Increment,
}

/// A field-level modification descriptor supplied with [`ChangeKind::Modify`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Modification {
    pub modification_type: ModificationType,
    pub attribute: String,
    #[serde(default)]
    pub values: Vec<String>,
}

/// One change notification delivered by the host.
///
/// `entry` is optional because the host may report a change for which it
/// could not produce an entry; destinations treat that as nothing to publish.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeEvent {
    pub kind: ChangeKind,

    #[serde(default)]
    pub entry: Option<DirectoryEntry>,

    /// Only populated for [`ChangeKind::Modify`].
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub modifications: Vec<Modification>,
}

impl ChangeEvent {
    #[must_use]
    pub fn create(entry: DirectoryEntry) -> Self {
        Self {
            kind: ChangeKind::Create,
            entry: Some(entry),
            modifications: Vec::new(),
        }
    }

    #[must_use]
    pub fn modify(entry: DirectoryEntry, modifications: Vec<Modification>) -> Self {
        Self {
            kind: ChangeKind::Modify,
            entry: Some(entry),
            modifications,
        }
    }

    #[must_use]
    pub fn delete(entry: DirectoryEntry) -> Self {
        Self {
            kind: ChangeKind::Delete,
            entry: Some(entry),
            modifications: Vec::new(),
        }
    }

    /// The distinguished name of the changed entry, or an empty string when
    /// the host supplied no entry.
    #[must_use]
    pub fn dn(&self) -> &str {
        self.entry.as_ref().map_or("", |entry| entry.dn.as_str())
    }
}

/// Severity levels of the host's message log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogSeverity {
    Debug,
    Info,
    MildWarning,
    SevereWarning,
    MildError,
    SevereError,
    FatalError,
}
