//! Minimal cue sheet reading.
//!
//! The split pipeline needs just enough of a cue sheet to validate its
//! inputs and verify the splitting tool's output: the referenced audio
//! file, the album-level PERFORMER/TITLE (for collection folders), and the
//! per-track numbers and titles (for expected output names). Full CUE
//! grammar stays the external tool's business.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;

/// Errors from reading a cue sheet.
#[derive(Error, Debug)]
pub enum CueError {
    #[error("failed to read cue sheet {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("cue sheet {0} references no audio file")]
    NoAudioFile(PathBuf),

    #[error("cue sheet {0} contains no tracks")]
    NoTracks(PathBuf),
}

/// Result type for cue operations.
pub type CueResult<T> = Result<T, CueError>;

/// One TRACK entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CueTrack {
    pub number: u32,
    pub title: Option<String>,
}

/// The parts of a cue sheet the engine cares about.
#[derive(Debug, Clone)]
pub struct CueSheet {
    pub path: PathBuf,
    /// Album-level PERFORMER (appears before the first TRACK).
    pub performer: Option<String>,
    /// Album-level TITLE.
    pub title: Option<String>,
    /// Audio file name as written in the first FILE line.
    pub audio_file: String,
    /// Tracks in sheet order.
    pub tracks: Vec<CueTrack>,
}

impl CueSheet {
    /// Read and scan a cue sheet.
    pub fn read(path: &Path) -> CueResult<Self> {
        let content = fs::read_to_string(path).map_err(|e| CueError::Io {
            path: path.to_path_buf(),
            source: e,
        })?;
        Self::scan(path, &content)
    }

    fn scan(path: &Path, content: &str) -> CueResult<Self> {
        let mut performer = None;
        let mut title = None;
        let mut audio_file = None;
        let mut tracks: Vec<CueTrack> = Vec::new();

        for line in content.lines() {
            let line = line.trim();
            let (keyword, rest) = match line.split_once(char::is_whitespace) {
                Some((k, r)) => (k.to_ascii_uppercase(), r.trim()),
                None => continue,
            };

            match keyword.as_str() {
                "FILE" => {
                    // Keep the first FILE reference; multi-file sheets are
                    // split by the tool against the same container anyway.
                    if audio_file.is_none() {
                        audio_file = Some(unquote(rest_without_type(rest)));
                    }
                }
                "TRACK" => {
                    let number = rest
                        .split_whitespace()
                        .next()
                        .and_then(|n| n.parse::<u32>().ok())
                        .unwrap_or((tracks.len() + 1) as u32);
                    tracks.push(CueTrack {
                        number,
                        title: None,
                    });
                }
                "TITLE" => {
                    let value = unquote(rest);
                    match tracks.last_mut() {
                        Some(track) => track.title = Some(value),
                        None => title = Some(value),
                    }
                }
                "PERFORMER" => {
                    // Album-level only; per-track performers are not used.
                    if tracks.is_empty() {
                        performer = Some(unquote(rest));
                    }
                }
                _ => {}
            }
        }

        let audio_file = audio_file.ok_or_else(|| CueError::NoAudioFile(path.to_path_buf()))?;
        if tracks.is_empty() {
            return Err(CueError::NoTracks(path.to_path_buf()));
        }

        Ok(Self {
            path: path.to_path_buf(),
            performer,
            title,
            audio_file,
            tracks,
        })
    }

    /// Resolve the referenced audio file on disk.
    ///
    /// Looks for the FILE reference beside the cue sheet first. When it is
    /// absent, falls back to `<cue stem>.<referenced extension>` - sheets
    /// frequently ship with a renamed container.
    pub fn resolve_audio(&self) -> Option<PathBuf> {
        let cue_dir = self.path.parent().unwrap_or(Path::new("."));

        let referenced = cue_dir.join(&self.audio_file);
        if referenced.is_file() {
            return Some(referenced);
        }

        let referenced_ext = Path::new(&self.audio_file).extension()?;
        let stem = self.path.file_stem()?;
        let alternate = cue_dir.join(Path::new(stem).with_extension(referenced_ext));
        alternate.is_file().then_some(alternate)
    }

    /// File names the splitting tool is expected to produce, one per track.
    pub fn expected_track_names(&self, extension: &str) -> Vec<String> {
        self.tracks
            .iter()
            .map(|track| {
                let title = track
                    .title
                    .clone()
                    .unwrap_or_else(|| format!("Track {:02}", track.number));
                format!(
                    "{:02} - {}.{}",
                    track.number,
                    sanitize_filename(&title),
                    extension
                )
            })
            .collect()
    }
}

/// Strip a trailing file-type word (WAVE, MP3, ...) from a FILE line rest.
fn rest_without_type(rest: &str) -> &str {
    if rest.starts_with('"') {
        match rest[1..].find('"') {
            Some(end) => &rest[..end + 2],
            None => rest,
        }
    } else {
        rest.split_whitespace().next().unwrap_or(rest)
    }
}

fn unquote(value: &str) -> String {
    value.trim().trim_matches('"').to_string()
}

/// Replace characters that are unsafe in file names.
fn sanitize_filename(name: &str) -> String {
    name.chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
            _ => c,
        })
        .collect()
}

/// Reduce a collection path component (artist/album) to safe characters.
///
/// Keeps alphanumerics, spaces, underscores and dashes, trimming trailing
/// whitespace, matching the folder names the splitting tool creates.
pub fn sanitize_component(name: &str) -> String {
    name.chars()
        .filter(|c| c.is_alphanumeric() || matches!(c, ' ' | '_' | '-'))
        .collect::<String>()
        .trim_end()
        .to_string()
}
