//! Directed links between dataset records
//!
//! A [`Link`] ties two records together as a typed, directed edge: the guid
//! at the head points to the guid at the tail. Both identifiers are checked
//! against the canonical lowercase `8-4-4-4-12` hex shape at construction,
//! so a link that exists is a link between well-formed identifiers.

use lazy_static::lazy_static;
use regex::Regex;
use thiserror::Error;

lazy_static! {
    static ref GUID_PATTERN: Regex =
        Regex::new(r"^[0-9a-f]{8}-([0-9a-f]{4}-){3}[0-9a-f]{12}$")
            .expect("guid pattern is a valid regex");
}

/// Errors raised while validating link identifiers.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// An identifier did not match the canonical guid shape.
    #[error("The guid given for {node} is not a valid guid: {guid}")]
    InvalidGuid {
        /// Which end of the link carried the bad identifier.
        node: &'static str,
        /// The rejected identifier, verbatim.
        guid: String,
    },
}

/// A directed, typed edge between two dataset records.
///
/// Fields are validated at construction and read-only afterwards; a `Link`
/// value always holds two well-formed guids.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Link {
    head: String,
    tail: String,
    edge_type: String,
    description: String,
}

impl Link {
    /// Build a link after validating both identifiers.
    ///
    /// `head` is the origin record, `tail` the target. Returns a
    /// [`ValidationError`] naming the offending end if either guid does not
    /// match the canonical lowercase `8-4-4-4-12` hex shape.
    pub fn new(
        head: impl Into<String>,
        tail: impl Into<String>,
        edge_type: impl Into<String>,
    ) -> Result<Self, ValidationError> {
        let head = head.into();
        let tail = tail.into();
        validate_node(&head, "head")?;
        validate_node(&tail, "tail")?;

        Ok(Self {
            head,
            tail,
            edge_type: edge_type.into(),
            description: String::new(),
        })
    }

    /// Attach a free-form description.
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Guid of the record at the head of the edge.
    pub fn head(&self) -> &str {
        &self.head
    }

    /// Guid of the record at the tail of the edge.
    pub fn tail(&self) -> &str {
        &self.tail
    }

    /// Classification of the edge.
    pub fn edge_type(&self) -> &str {
        &self.edge_type
    }

    /// Free-form description; empty unless one was attached.
    pub fn description(&self) -> &str {
        &self.description
    }
}

fn validate_node(guid: &str, node: &'static str) -> Result<(), ValidationError> {
    if GUID_PATTERN.is_match(guid) {
        Ok(())
    } else {
        Err(ValidationError::InvalidGuid {
            node,
            guid: guid.to_string(),
        })
    }
}
