// crates/catalog-publish-core/src/core/record.rs
// ============================================================================
// Module: Record Snapshots and Views
// Description: Read-only record state and its canonical projected document.
// Purpose: Carry relational record state into the projector and evaluator.
// Dependencies: crate::core::{identifiers, time}, serde, serde_json
// ============================================================================

//! ## Overview
//! A [`RecordSnapshot`] is everything the relational store knows about one
//! record at read time: the record row, its tags, and the tags of its owning
//! collection, already joined with tag definitions and user display names.
//! The projector reduces a snapshot to a [`RecordView`], the catalog-agnostic
//! document that publication schemas are evaluated against.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde::Deserialize;
use serde::Serialize;
use serde_json::Value;

use crate::core::identifiers::CollectionId;
use crate::core::identifiers::Doi;
use crate::core::identifiers::RecordId;
use crate::core::identifiers::SchemaId;
use crate::core::identifiers::TagId;
use crate::core::identifiers::UserId;
use crate::core::time::Timestamp;

// ============================================================================
// SECTION: Tag Definitions
// ============================================================================

/// How many instances of a tag may coexist on one object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TagCardinality {
    /// A single instance per object.
    One,
    /// One instance per user per object.
    User,
    /// Any number of instances.
    Multi,
}

impl TagCardinality {
    /// Returns the stable storage label.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::One => "one",
            Self::User => "user",
            Self::Multi => "multi",
        }
    }

    /// Parses a storage label.
    #[must_use]
    pub fn from_label(label: &str) -> Option<Self> {
        match label {
            "one" => Some(Self::One),
            "user" => Some(Self::User),
            "multi" => Some(Self::Multi),
            _ => None,
        }
    }
}

/// Tag instance joined with its definition and owner.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TagInstance {
    /// Tag type identifier.
    pub tag_id: TagId,
    /// Owning user, when the tag was applied by a user.
    pub user_id: Option<UserId>,
    /// Owning user's display name.
    pub user_name: Option<String>,
    /// Tag payload.
    pub data: Value,
    /// Last-modified timestamp of this tag instance.
    pub timestamp: Timestamp,
    /// Cardinality of the tag type.
    pub cardinality: TagCardinality,
    /// Whether the tag type is publicly visible.
    pub public: bool,
}

// ============================================================================
// SECTION: Record Snapshot
// ============================================================================

/// Record row as owned by the record-management subsystem.
///
/// # Invariants
/// - At least one of `doi` and `sid` is present.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    /// Record identifier.
    pub id: RecordId,
    /// Digital Object Identifier.
    pub doi: Option<Doi>,
    /// Secondary identifier.
    pub sid: Option<String>,
    /// Owning collection.
    pub collection_id: CollectionId,
    /// Metadata schema.
    pub schema_id: SchemaId,
    /// Metadata document.
    pub metadata: Value,
    /// Last-modified timestamp.
    pub timestamp: Timestamp,
}

/// Record joined with record tags and collection tags.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordSnapshot {
    /// Record row.
    pub record: Record,
    /// Tags applied directly to the record.
    pub record_tags: Vec<TagInstance>,
    /// Tags applied to the owning collection.
    pub collection_tags: Vec<TagInstance>,
}

// ============================================================================
// SECTION: Record View
// ============================================================================

/// Tag as it appears in the projected record document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TagView {
    /// Tag type identifier.
    pub tag_id: TagId,
    /// Tag payload.
    pub data: Value,
    /// Owning user's display name.
    pub user_name: Option<String>,
    /// RFC 3339 timestamp of the tag instance.
    pub timestamp: String,
    /// Cardinality of the tag type.
    pub cardinality: TagCardinality,
    /// Whether the tag type is publicly visible.
    pub public: bool,
}

/// Canonical, catalog-agnostic projection of a record.
///
/// # Invariants
/// - Tag lists are sorted by `(tag_id, timestamp, user_name)`, then by the
///   canonical JSON of the tag data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordView {
    /// Record identifier.
    pub id: RecordId,
    /// Digital Object Identifier.
    pub doi: Option<Doi>,
    /// Secondary identifier.
    pub sid: Option<String>,
    /// Owning collection.
    pub collection_id: CollectionId,
    /// Metadata schema.
    pub schema_id: SchemaId,
    /// Metadata document.
    pub metadata: Value,
    /// RFC 3339 last-modified timestamp of the record row.
    pub timestamp: String,
    /// Tags applied to the record.
    pub tags: Vec<TagView>,
    /// Tags applied to the owning collection.
    pub collection_tags: Vec<TagView>,
}
