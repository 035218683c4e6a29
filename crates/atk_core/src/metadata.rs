//! Tag reading and writing behind one interface.
//!
//! Backed by `lofty`, which abstracts the container differences between
//! ID3v2 (MP3) and Vorbis comments (FLAC). Writes are staged on a
//! temporary copy of the file and renamed over the original, so a failed
//! save never leaves a half-tagged file behind.

use std::io;
use std::path::Path;

use lofty::config::WriteOptions;
use lofty::file::{AudioFile, TaggedFileExt};
use lofty::read_from_path;
use lofty::tag::{ItemKey, Tag};
use thiserror::Error;

use crate::models::{TagEdit, TagField, TagSet, TagSnapshot};

/// Errors from tag operations. A failure affects only the file it names.
#[derive(Error, Debug)]
pub enum MetadataError {
    #[error("failed to read tags from {path}: {message}")]
    Read { path: String, message: String },

    #[error("failed to write tags to {path}: {message}")]
    Write { path: String, message: String },

    #[error("I/O error while tagging {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: io::Error,
    },
}

impl MetadataError {
    fn read(path: &Path, error: impl std::fmt::Display) -> Self {
        Self::Read {
            path: path.display().to_string(),
            message: error.to_string(),
        }
    }

    fn write(path: &Path, error: impl std::fmt::Display) -> Self {
        Self::Write {
            path: path.display().to_string(),
            message: error.to_string(),
        }
    }

    fn io(path: &Path, source: io::Error) -> Self {
        Self::Io {
            path: path.display().to_string(),
            source,
        }
    }
}

/// Result type for metadata operations.
pub type MetadataResult<T> = Result<T, MetadataError>;

fn item_key(field: TagField) -> ItemKey {
    match field {
        TagField::Artist => ItemKey::TrackArtist,
        TagField::AlbumArtist => ItemKey::AlbumArtist,
        TagField::Album => ItemKey::AlbumTitle,
        TagField::Title => ItemKey::TrackTitle,
        TagField::Genre => ItemKey::Genre,
        TagField::Year => ItemKey::Year,
        TagField::TrackNumber => ItemKey::TrackNumber,
        TagField::DiscNumber => ItemKey::DiscNumber,
        TagField::Composer => ItemKey::Composer,
        TagField::Comment => ItemKey::Comment,
    }
}

/// Read the known tag fields from a file.
///
/// Every field in the snapshot is either present with its value or absent;
/// cover-art presence is reported alongside.
pub fn read_tags(path: &Path) -> MetadataResult<TagSnapshot> {
    let tagged_file = read_from_path(path).map_err(|e| MetadataError::read(path, e))?;

    let mut snapshot = TagSnapshot::new();
    let tag = tagged_file.primary_tag().or_else(|| tagged_file.first_tag());

    if let Some(tag) = tag {
        for field in TagField::ALL {
            if let Some(value) = tag.get_string(item_key(field)) {
                snapshot.set(field, value);
            }
        }
    }

    snapshot.has_cover = tagged_file
        .tags()
        .iter()
        .any(|tag| !tag.pictures().is_empty());

    Ok(snapshot)
}

/// Apply a set of tri-state edits to a file.
///
/// `Keep` fields are untouched, `Set` overwrites, `Clear` removes the
/// field. All requested changes land together or not at all: edits are
/// applied to a temporary copy which replaces the original only after a
/// successful save.
pub fn write_tags(path: &Path, edits: &TagSet) -> MetadataResult<()> {
    if edits.is_empty() {
        tracing::debug!("No tag changes requested for {}", path.display());
        return Ok(());
    }

    let parent = path.parent().unwrap_or(Path::new("."));
    let suffix = path
        .extension()
        .map(|e| format!(".{}", e.to_string_lossy()))
        .unwrap_or_default();

    let staged = tempfile::Builder::new()
        .prefix(".atk-tags-")
        .suffix(&suffix)
        .tempfile_in(parent)
        .map_err(|e| MetadataError::io(path, e))?;

    std::fs::copy(path, staged.path()).map_err(|e| MetadataError::io(path, e))?;

    // Errors below name the real file, not the staging copy.
    apply_edits(staged.path(), path, edits)?;

    staged
        .persist(path)
        .map_err(|e| MetadataError::io(path, e.error))?;

    Ok(())
}

fn apply_edits(staged: &Path, path: &Path, edits: &TagSet) -> MetadataResult<()> {
    let mut tagged_file = read_from_path(staged).map_err(|e| MetadataError::read(path, e))?;

    let tag_type = tagged_file.primary_tag_type();
    if tagged_file.tag(tag_type).is_none() {
        tagged_file.insert_tag(Tag::new(tag_type));
    }

    let tag = tagged_file
        .tag_mut(tag_type)
        .ok_or_else(|| MetadataError::write(path, "no writable tag container"))?;

    for (field, edit) in edits.iter() {
        let key = item_key(field);
        match edit {
            TagEdit::Keep => {}
            TagEdit::Set(value) => {
                tag.insert_text(key, value.clone());
            }
            TagEdit::Clear => {
                tag.remove_key(key);
            }
        }
    }

    tagged_file
        .save_to_path(staged, WriteOptions::default())
        .map_err(|e| MetadataError::write(path, e))?;

    Ok(())
}

/// Whether a file carries embedded cover art.
pub fn has_embedded_cover(path: &Path) -> bool {
    read_tags(path).map(|s| s.has_cover).unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::path::PathBuf;
    use tempfile::tempdir;

    /// Minimal valid FLAC: "fLaC" marker plus a last-block STREAMINFO
    /// (4096-sample blocks, 44.1 kHz, stereo, 16-bit, zero samples).
    fn minimal_flac(dir: &Path) -> PathBuf {
        let mut bytes = Vec::new();
        bytes.extend_from_slice(b"fLaC");
        bytes.extend_from_slice(&[0x80, 0x00, 0x00, 0x22]);
        bytes.extend_from_slice(&[0x10, 0x00, 0x10, 0x00]);
        bytes.extend_from_slice(&[0x00, 0x00, 0x00, 0x00, 0x00, 0x00]);
        bytes.extend_from_slice(&[0x0A, 0xC4, 0x42, 0xF0, 0x00, 0x00, 0x00, 0x00]);
        bytes.extend_from_slice(&[0u8; 16]);

        let path = dir.join("track.flac");
        fs::write(&path, bytes).unwrap();
        path
    }

    fn seed_tags(path: &Path) {
        let edits = TagSet::new()
            .with(TagField::Artist, TagEdit::Set("Performer".into()))
            .with(TagField::Album, TagEdit::Set("The Album".into()))
            .with(TagField::Title, TagEdit::Set("Opening".into()))
            .with(TagField::Genre, TagEdit::Set("Soundtrack".into()))
            .with(TagField::Year, TagEdit::Set("1998".into()));
        write_tags(path, &edits).unwrap();
    }

    #[test]
    fn round_trips_written_fields() {
        let dir = tempdir().unwrap();
        let path = minimal_flac(dir.path());
        seed_tags(&path);

        let snapshot = read_tags(&path).unwrap();
        assert_eq!(snapshot.get(TagField::Artist), Some("Performer"));
        assert_eq!(snapshot.get(TagField::Year), Some("1998"));
        assert_eq!(snapshot.get(TagField::Composer), None);
        assert!(!snapshot.has_cover);
    }

    #[test]
    fn clear_removes_only_the_cleared_field() {
        let dir = tempdir().unwrap();
        let path = minimal_flac(dir.path());
        seed_tags(&path);
        assert_eq!(read_tags(&path).unwrap().len(), 5);

        let edits = TagSet::new().with(TagField::Genre, TagEdit::Clear);
        write_tags(&path, &edits).unwrap();

        let snapshot = read_tags(&path).unwrap();
        assert_eq!(snapshot.len(), 4);
        assert_eq!(snapshot.get(TagField::Genre), None);
        assert_eq!(snapshot.get(TagField::Artist), Some("Performer"));
        assert_eq!(snapshot.get(TagField::Album), Some("The Album"));
        assert_eq!(snapshot.get(TagField::Title), Some("Opening"));
        assert_eq!(snapshot.get(TagField::Year), Some("1998"));
    }

    #[test]
    fn keep_leaves_existing_values() {
        let dir = tempdir().unwrap();
        let path = minimal_flac(dir.path());
        seed_tags(&path);

        let edits = TagSet::new().with(TagField::Comment, TagEdit::Set("ripped".into()));
        write_tags(&path, &edits).unwrap();

        let snapshot = read_tags(&path).unwrap();
        assert_eq!(snapshot.get(TagField::Comment), Some("ripped"));
        assert_eq!(snapshot.get(TagField::Artist), Some("Performer"));
    }

    #[test]
    fn empty_edit_set_is_a_no_op() {
        let dir = tempdir().unwrap();
        let path = minimal_flac(dir.path());
        let before = fs::read(&path).unwrap();

        write_tags(&path, &TagSet::new()).unwrap();
        assert_eq!(fs::read(&path).unwrap(), before);
    }

    #[test]
    fn write_to_missing_file_fails() {
        let dir = tempdir().unwrap();
        let missing = dir.path().join("ghost.flac");
        let edits = TagSet::new().with(TagField::Artist, TagEdit::Set("x".into()));
        assert!(write_tags(&missing, &edits).is_err());
    }
}
