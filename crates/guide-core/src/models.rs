//! Data models for Guide
//!
//! Defines the catalog records: Link, Topic and Persona, plus the request
//! types used to create and update links.
//!
//! Links are never deleted. A link is retired by pointing its `successor`
//! at a newer record and clearing `valid`, which forms an append-only
//! version chain.

use serde::{Deserialize, Serialize};

/// Store-assigned link identifier
pub type LinkId = i64;

/// Store-assigned persona identifier
pub type PersonaId = i64;

/// A catalogued link with its tagging and lineage metadata
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Link {
    /// Unique identifier (assigned by the store)
    pub id: LinkId,
    /// The target address
    pub url: String,
    /// Display name, unique across the catalog
    pub name: String,
    /// Curator-assigned trust marker
    pub certification: bool,
    /// `false` once superseded or retired
    pub valid: bool,
    /// The link that replaces this one, if any
    pub successor: Option<LinkId>,
    /// Topic keys attached to this link
    #[serde(default)]
    pub topics: Vec<String>,
    /// Persona ids attached to this link
    #[serde(default)]
    pub personas: Vec<PersonaId>,
}

impl Link {
    /// Whether this link is the live end of its chain
    pub fn is_terminal(&self) -> bool {
        self.successor.is_none()
    }

    /// The mutable core fields of this link
    pub fn fields(&self) -> LinkFields {
        LinkFields {
            url: self.url.clone(),
            name: self.name.clone(),
            certification: self.certification,
            valid: self.valid,
            successor: self.successor,
        }
    }
}

/// The core columns of a link that can be rewritten in place
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct LinkFields {
    pub url: String,
    pub name: String,
    pub certification: bool,
    pub valid: bool,
    pub successor: Option<LinkId>,
}

/// An update to an existing link
///
/// Each aspect is optional and independent. Every aspect that is present
/// is applied in a single transaction; association lists replace the
/// current set entirely.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LinkUpdate {
    pub id: LinkId,
    pub fields: Option<LinkFields>,
    pub topics: Option<Vec<String>>,
    pub personas: Option<Vec<PersonaId>>,
}

impl LinkUpdate {
    /// Start an empty update for the given link
    pub fn new(id: LinkId) -> Self {
        Self {
            id,
            ..Default::default()
        }
    }

    /// Rewrite the core fields
    pub fn with_fields(mut self, fields: LinkFields) -> Self {
        self.fields = Some(fields);
        self
    }

    /// Replace the topic associations
    pub fn with_topics(mut self, topics: Vec<String>) -> Self {
        self.topics = Some(topics);
        self
    }

    /// Replace the persona associations
    pub fn with_personas(mut self, personas: Vec<PersonaId>) -> Self {
        self.personas = Some(personas);
        self
    }

    /// True when the update carries nothing to write
    pub fn is_empty(&self) -> bool {
        self.fields.is_none() && self.topics.is_none() && self.personas.is_none()
    }
}

/// A link to be inserted
///
/// When `predecessor` is set the new link becomes the next version of
/// that link: the predecessor is pointed at the new record and retired.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct NewLink {
    pub url: String,
    pub name: String,
    #[serde(default)]
    pub certification: bool,
    #[serde(default = "default_valid")]
    pub valid: bool,
    #[serde(default)]
    pub successor: Option<LinkId>,
    #[serde(default)]
    pub predecessor: Option<LinkId>,
    #[serde(default)]
    pub topics: Vec<String>,
    #[serde(default)]
    pub personas: Vec<PersonaId>,
}

fn default_valid() -> bool {
    true
}

impl NewLink {
    /// Create a valid, uncertified link with no associations
    pub fn new(url: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            name: name.into(),
            certification: false,
            valid: true,
            successor: None,
            predecessor: None,
            topics: Vec::new(),
            personas: Vec::new(),
        }
    }

    /// Make this link the next version of `predecessor`
    pub fn superseding(mut self, predecessor: LinkId) -> Self {
        self.predecessor = Some(predecessor);
        self
    }

    pub fn certified(mut self, certification: bool) -> Self {
        self.certification = certification;
        self
    }

    pub fn with_topics(mut self, topics: Vec<String>) -> Self {
        self.topics = topics;
        self
    }

    pub fn with_personas(mut self, personas: Vec<PersonaId>) -> Self {
        self.personas = personas;
        self
    }
}

/// A topic from the MADE reference table
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Topic {
    /// Grouping label (the "MADE" category)
    #[serde(rename = "MADE")]
    pub category: String,
    /// Topic key, as stored in the association table
    #[serde(rename = "Topic")]
    pub key: String,
    /// Optional display text
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
}

/// A persona from the reference table
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Persona {
    pub id: PersonaId,
    #[serde(rename = "persona")]
    pub label: String,
}
