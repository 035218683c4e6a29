//! Job and batch configuration types.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use super::tags::TagSet;

/// Which processing pipeline a job belongs to.
///
/// A batch contains jobs of exactly one kind; the orchestrator rejects
/// mixed submissions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PipelineKind {
    /// Split one audio container into per-track files via a cue sheet.
    Split,
    /// Lossless WAV to FLAC conversion.
    Convert,
    /// Apply tag edits to existing files.
    TagEdit,
    /// Embed cover art into existing files.
    EmbedCover,
}

impl PipelineKind {
    /// Display string for UI and log output.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Split => "Split",
            Self::Convert => "Convert",
            Self::TagEdit => "TagEdit",
            Self::EmbedCover => "EmbedCover",
        }
    }

    /// File extensions (lowercase, no dot) this pipeline accepts as input.
    ///
    /// Used by file discovery when expanding folder inputs.
    pub fn allowed_extensions(&self) -> &'static [&'static str] {
        match self {
            Self::Split => &["cue"],
            Self::Convert => &["wav"],
            Self::TagEdit => &["mp3", "flac"],
            Self::EmbedCover => &["flac"],
        }
    }
}

/// A single file-level job. Immutable once enqueued.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobDescriptor {
    /// Input path. May be a directory at submission time; discovery
    /// expands it into per-file jobs before execution.
    pub source: PathBuf,
    /// Pipeline this job runs through.
    pub kind: PipelineKind,
}

impl JobDescriptor {
    pub fn new(source: impl Into<PathBuf>, kind: PipelineKind) -> Self {
        Self {
            source: source.into(),
            kind,
        }
    }

    /// Short display name (file name, or the full path if there is none).
    pub fn display_name(&self) -> String {
        self.source
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| self.source.to_string_lossy().to_string())
    }
}

/// Output format for the split pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum OutputFormat {
    #[default]
    Flac,
    Wav,
    Mp3,
    Ogg,
    Opus,
    /// Byte-identical copy of the source stream.
    Copy,
}

impl OutputFormat {
    /// Value passed to the external splitting tool.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Flac => "flac",
            Self::Wav => "wav",
            Self::Mp3 => "mp3",
            Self::Ogg => "ogg",
            Self::Opus => "opus",
            Self::Copy => "copy",
        }
    }

    /// Extension of the files the tool produces for this format.
    ///
    /// `Copy` has no fixed extension; the caller falls back to the
    /// source container's extension.
    pub fn extension(&self) -> Option<&'static str> {
        match self {
            Self::Flac => Some("flac"),
            Self::Wav => Some("wav"),
            Self::Mp3 => Some("mp3"),
            Self::Ogg => Some("ogg"),
            Self::Opus => Some("opus"),
            Self::Copy => None,
        }
    }
}

/// Whether existing output files may be replaced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum OverwritePolicy {
    /// Existing outputs cause the job to be skipped.
    #[default]
    Never,
    /// Existing outputs are replaced.
    Always,
}

impl OverwritePolicy {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Never => "never",
            Self::Always => "always",
        }
    }
}

/// Collection folder template for split output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum CollectionLayout {
    /// All tracks directly in the output directory.
    #[default]
    Flat,
    /// `Artist/` subfolder.
    Artist,
    /// `Album/` subfolder.
    Album,
    /// `Artist/Album/` subfolders.
    ArtistAlbum,
}

impl CollectionLayout {
    /// Value passed to the external splitting tool. Empty means flat.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Flat => "",
            Self::Artist => "artist",
            Self::Album => "album",
            Self::ArtistAlbum => "artist+album",
        }
    }
}

/// Metadata handling mode for the convert pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ConvertMode {
    /// Plain conversion, no tag handling.
    #[default]
    Simple,
    /// Copy tags from a sibling MP3 sharing the base name.
    CopyMp3Metadata,
}

/// Where cover images come from for the embed pipeline.
///
/// The local candidate list is fixed by contract: `cover.png`, `cover.jpg`,
/// `cover.jpeg`, `cover.webp`, first match per directory wins.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CoverSource {
    /// Remote image URL tried first. `None` goes straight to the local
    /// fallback search.
    pub url: Option<String>,
}

/// Local cover file names searched in order when no URL is configured or
/// the download fails.
pub const COVER_CANDIDATES: &[&str] = &["cover.png", "cover.jpg", "cover.jpeg", "cover.webp"];

/// Pipeline-wide options, shared read-only across all jobs in one batch.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BatchConfig {
    /// Output format for split tracks.
    #[serde(default)]
    pub output_format: OutputFormat,
    /// Override for the output directory. `None` means beside the input.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_dir: Option<PathBuf>,
    /// Overwrite policy for split output.
    #[serde(default)]
    pub overwrite: OverwritePolicy,
    /// Collection folder template for split output.
    #[serde(default)]
    pub collection: CollectionLayout,
    /// Tag edits applied by the tag-edit pipeline.
    #[serde(default)]
    pub tag_edits: TagSet,
    /// Cover source for the embed pipeline.
    #[serde(default)]
    pub cover: CoverSource,
    /// Metadata mode for the convert pipeline.
    #[serde(default)]
    pub convert_mode: ConvertMode,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pipeline_kind_extensions() {
        assert_eq!(PipelineKind::Split.allowed_extensions(), &["cue"]);
        assert_eq!(PipelineKind::TagEdit.allowed_extensions(), &["mp3", "flac"]);
    }

    #[test]
    fn output_format_copy_has_no_extension() {
        assert_eq!(OutputFormat::Flac.extension(), Some("flac"));
        assert_eq!(OutputFormat::Copy.extension(), None);
    }

    #[test]
    fn collection_layout_tool_values() {
        assert_eq!(CollectionLayout::Flat.as_str(), "");
        assert_eq!(CollectionLayout::ArtistAlbum.as_str(), "artist+album");
    }

    #[test]
    fn batch_config_round_trips() {
        let config = BatchConfig {
            output_format: OutputFormat::Ogg,
            overwrite: OverwritePolicy::Always,
            ..Default::default()
        };
        let json = serde_json::to_string(&config).unwrap();
        let back: BatchConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(back.output_format, OutputFormat::Ogg);
        assert_eq!(back.overwrite, OverwritePolicy::Always);
    }
}
