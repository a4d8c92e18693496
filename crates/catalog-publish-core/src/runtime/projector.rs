// crates/catalog-publish-core/src/runtime/projector.rs
// ============================================================================
// Module: Record Projector
// Description: Canonical, catalog-agnostic record document construction.
// Purpose: Reduce a relational record snapshot to the document schemas see.
// Dependencies: crate::core
// ============================================================================

//! ## Overview
//! Projection is a pure function of a [`RecordSnapshot`]. Tag instances are
//! reduced to their visible fields and sorted so identical relational state
//! always yields an identical [`RecordView`], independent of row order.

// ============================================================================
// SECTION: Imports
// ============================================================================

use crate::core::RecordSnapshot;
use crate::core::RecordView;
use crate::core::TagInstance;
use crate::core::TagView;
use crate::core::hashing::canonical_json_bytes;

// ============================================================================
// SECTION: Projection
// ============================================================================

/// Builds the canonical document for a record snapshot.
#[must_use]
pub fn project(snapshot: &RecordSnapshot) -> RecordView {
    let record = &snapshot.record;
    RecordView {
        id: record.id.clone(),
        doi: record.doi.clone(),
        sid: record.sid.clone(),
        collection_id: record.collection_id.clone(),
        schema_id: record.schema_id.clone(),
        metadata: record.metadata.clone(),
        timestamp: record.timestamp.to_rfc3339(),
        tags: project_tags(&snapshot.record_tags),
        collection_tags: project_tags(&snapshot.collection_tags),
    }
}

/// Reduces and orders tag instances.
///
/// Ties on `(tag_id, timestamp, user_name)` fall back to the canonical JSON of
/// the tag data, so the order never depends on store row order.
fn project_tags(tags: &[TagInstance]) -> Vec<TagView> {
    let mut ordered: Vec<(Vec<u8>, &TagInstance)> =
        tags.iter().map(|tag| (canonical_json_bytes(&tag.data).unwrap_or_default(), tag)).collect();
    ordered.sort_by(|(a_data, a), (b_data, b)| {
        a.tag_id
            .cmp(&b.tag_id)
            .then(a.timestamp.cmp(&b.timestamp))
            .then_with(|| a.user_name.cmp(&b.user_name))
            .then_with(|| a_data.cmp(b_data))
    });
    ordered
        .into_iter()
        .map(|(_, tag)| TagView {
            tag_id: tag.tag_id.clone(),
            data: tag.data.clone(),
            user_name: tag.user_name.clone(),
            timestamp: tag.timestamp.to_rfc3339(),
            cardinality: tag.cardinality,
            public: tag.public,
        })
        .collect()
}
