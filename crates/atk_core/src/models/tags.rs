//! Tri-state tag edits and tag snapshots.
//!
//! The editable field set is fixed. Each edit is an explicit tri-state:
//! leaving a field alone, setting it, and clearing it are three distinct
//! requests. In particular `Set("")` and `Clear` must never collapse into
//! the same representation - "user typed nothing" is not "delete this tag".

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// The fixed set of editable tag fields.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub enum TagField {
    Artist,
    AlbumArtist,
    Album,
    Title,
    Genre,
    Year,
    TrackNumber,
    DiscNumber,
    Composer,
    Comment,
}

impl TagField {
    /// All fields in display order.
    pub const ALL: [TagField; 10] = [
        TagField::Artist,
        TagField::AlbumArtist,
        TagField::Album,
        TagField::Title,
        TagField::Genre,
        TagField::Year,
        TagField::TrackNumber,
        TagField::DiscNumber,
        TagField::Composer,
        TagField::Comment,
    ];

    /// Case-exact field name used in the external interface.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Artist => "Artist",
            Self::AlbumArtist => "AlbumArtist",
            Self::Album => "Album",
            Self::Title => "Title",
            Self::Genre => "Genre",
            Self::Year => "Year",
            Self::TrackNumber => "TrackNumber",
            Self::DiscNumber => "DiscNumber",
            Self::Composer => "Composer",
            Self::Comment => "Comment",
        }
    }
}

/// One field's requested change.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum TagEdit {
    /// Leave the existing value untouched.
    #[default]
    Keep,
    /// Overwrite with this value. An empty string is a legal value and is
    /// not a clear request.
    Set(String),
    /// Remove the field entirely.
    Clear,
}

impl TagEdit {
    pub fn is_keep(&self) -> bool {
        matches!(self, TagEdit::Keep)
    }
}

/// A set of tag edits, one entry per touched field.
///
/// Fields without an entry are implicitly `Keep`; an explicit `Keep` entry
/// means the same thing.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TagSet {
    edits: BTreeMap<TagField, TagEdit>,
}

impl TagSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an edit for a field. `Keep` removes any previous entry.
    pub fn insert(&mut self, field: TagField, edit: TagEdit) {
        if edit.is_keep() {
            self.edits.remove(&field);
        } else {
            self.edits.insert(field, edit);
        }
    }

    /// Builder-style variant of [`insert`](Self::insert).
    pub fn with(mut self, field: TagField, edit: TagEdit) -> Self {
        self.insert(field, edit);
        self
    }

    /// The requested edit for a field (`Keep` when absent).
    pub fn get(&self, field: TagField) -> &TagEdit {
        self.edits.get(&field).unwrap_or(&TagEdit::Keep)
    }

    /// True when no field has a non-`Keep` edit.
    pub fn is_empty(&self) -> bool {
        self.edits.is_empty()
    }

    /// Number of fields with a non-`Keep` edit.
    pub fn len(&self) -> usize {
        self.edits.len()
    }

    /// Iterate over the non-`Keep` entries in field order.
    pub fn iter(&self) -> impl Iterator<Item = (TagField, &TagEdit)> {
        self.edits.iter().map(|(f, e)| (*f, e))
    }
}

/// Tag values as read from a file.
///
/// Every field is either present with a value or absent; the `Keep` state
/// never appears on a read.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TagSnapshot {
    values: BTreeMap<TagField, String>,
    /// Whether the file carries embedded cover art.
    pub has_cover: bool,
}

impl TagSnapshot {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, field: TagField, value: impl Into<String>) {
        self.values.insert(field, value.into());
    }

    pub fn get(&self, field: TagField) -> Option<&str> {
        self.values.get(&field).map(String::as_str)
    }

    /// Number of present fields.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Iterate over present fields in field order.
    pub fn iter(&self) -> impl Iterator<Item = (TagField, &str)> {
        self.values.iter().map(|(f, v)| (*f, v.as_str()))
    }

    /// Convert every present value into a `Set` edit.
    ///
    /// Used by metadata-copy conversion: tags read from the sibling file
    /// become explicit writes on the new one.
    pub fn to_tag_set(&self) -> TagSet {
        let mut set = TagSet::new();
        for (field, value) in self.iter() {
            set.insert(field, TagEdit::Set(value.to_string()));
        }
        set
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keep_is_not_stored() {
        let mut set = TagSet::new();
        set.insert(TagField::Artist, TagEdit::Set("Someone".into()));
        set.insert(TagField::Artist, TagEdit::Keep);
        assert!(set.is_empty());
        assert_eq!(set.get(TagField::Artist), &TagEdit::Keep);
    }

    #[test]
    fn empty_set_and_clear_are_distinct() {
        let set = TagSet::new()
            .with(TagField::Album, TagEdit::Set(String::new()))
            .with(TagField::Genre, TagEdit::Clear);

        assert_eq!(set.get(TagField::Album), &TagEdit::Set(String::new()));
        assert_eq!(set.get(TagField::Genre), &TagEdit::Clear);

        // The two states must survive serialization distinguishably.
        let json = serde_json::to_string(&set).unwrap();
        let back: TagSet = serde_json::from_str(&json).unwrap();
        assert_eq!(back.get(TagField::Album), &TagEdit::Set(String::new()));
        assert_eq!(back.get(TagField::Genre), &TagEdit::Clear);
    }

    #[test]
    fn snapshot_to_tag_set() {
        let mut snap = TagSnapshot::new();
        snap.set(TagField::Artist, "Performer");
        snap.set(TagField::Year, "1998");

        let set = snap.to_tag_set();
        assert_eq!(set.len(), 2);
        assert_eq!(set.get(TagField::Artist), &TagEdit::Set("Performer".into()));
        assert_eq!(set.get(TagField::Title), &TagEdit::Keep);
    }

    #[test]
    fn field_names_are_case_exact() {
        assert_eq!(TagField::AlbumArtist.as_str(), "AlbumArtist");
        assert_eq!(TagField::TrackNumber.as_str(), "TrackNumber");
    }
}
