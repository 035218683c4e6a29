//! File discovery for batch inputs.
//!
//! Expands a mixed list of files and folders into the ordered, deduplicated
//! sequence of candidate files a batch will process. Folder traversal is
//! recursive and lexicographic so a given input always yields the same job
//! order; unreadable subpaths are logged and skipped, never fatal.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use walkdir::WalkDir;

/// Expand `inputs` into unique files matching `allowed_extensions`.
///
/// Extensions are matched ASCII-case-insensitively and given without a dot.
/// Files are kept in first-seen order; duplicates (including the same file
/// reached through different spellings of its path) are dropped by
/// canonical-path identity.
pub fn expand(inputs: &[PathBuf], allowed_extensions: &[&str]) -> Vec<PathBuf> {
    let mut seen: HashSet<PathBuf> = HashSet::new();
    let mut files = Vec::new();

    for input in inputs {
        if input.is_dir() {
            collect_dir(input, allowed_extensions, &mut seen, &mut files);
        } else if input.is_file() {
            if matches_extension(input, allowed_extensions) {
                push_unique(input, &mut seen, &mut files);
            } else {
                tracing::debug!("Ignoring {} (extension not accepted)", input.display());
            }
        } else {
            tracing::warn!("Input not found, skipping: {}", input.display());
        }
    }

    files
}

fn collect_dir(
    dir: &Path,
    allowed_extensions: &[&str],
    seen: &mut HashSet<PathBuf>,
    files: &mut Vec<PathBuf>,
) {
    let walker = WalkDir::new(dir)
        .follow_links(false)
        .sort_by_file_name()
        .into_iter();

    for entry in walker {
        let entry = match entry {
            Ok(e) => e,
            Err(e) => {
                tracing::warn!("Skipping unreadable path under {}: {}", dir.display(), e);
                continue;
            }
        };

        if !entry.file_type().is_file() {
            continue;
        }

        let path = entry.path();
        if matches_extension(path, allowed_extensions) {
            push_unique(path, seen, files);
        }
    }
}

fn push_unique(path: &Path, seen: &mut HashSet<PathBuf>, files: &mut Vec<PathBuf>) {
    // Canonicalize for dedup identity only; the caller-facing path keeps
    // its submitted spelling.
    let key = path.canonicalize().unwrap_or_else(|_| path.to_path_buf());
    if seen.insert(key) {
        files.push(path.to_path_buf());
    }
}

fn matches_extension(path: &Path, allowed_extensions: &[&str]) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|ext| {
            allowed_extensions
                .iter()
                .any(|allowed| ext.eq_ignore_ascii_case(allowed))
        })
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    fn touch(path: &Path) {
        fs::write(path, b"x").unwrap();
    }

    #[test]
    fn expands_directory_recursively_in_order() {
        let dir = tempdir().unwrap();
        let sub = dir.path().join("albums");
        fs::create_dir(&sub).unwrap();
        touch(&dir.path().join("b.mp3"));
        touch(&dir.path().join("a.mp3"));
        touch(&sub.join("c.mp3"));
        touch(&dir.path().join("notes.txt"));

        let found = expand(&[dir.path().to_path_buf()], &["mp3"]);

        let names: Vec<String> = found
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().to_string())
            .collect();
        // Lexicographic traversal: a.mp3, then the albums/ subtree, then b.mp3.
        assert_eq!(names, vec!["a.mp3", "c.mp3", "b.mp3"]);
    }

    #[test]
    fn dedups_repeated_inputs_preserving_first_seen_order() {
        let dir = tempdir().unwrap();
        let file_b = dir.path().join("b.mp3");
        touch(&file_b);

        // [dirA, fileB.mp3, dirA] with dirA containing x.mp3 and y.txt.
        let sub = dir.path().join("dirA");
        fs::create_dir(&sub).unwrap();
        touch(&sub.join("x.mp3"));
        touch(&sub.join("y.txt"));

        let inputs = vec![sub.clone(), file_b.clone(), sub.clone()];
        let found = expand(&inputs, &["mp3"]);

        assert_eq!(found, vec![sub.join("x.mp3"), file_b]);
    }

    #[test]
    fn extension_match_is_case_insensitive() {
        let dir = tempdir().unwrap();
        let upper = dir.path().join("LOUD.MP3");
        touch(&upper);

        let found = expand(&[upper.clone()], &["mp3"]);
        assert_eq!(found, vec![upper]);
    }

    #[test]
    fn missing_input_is_skipped() {
        let dir = tempdir().unwrap();
        let real = dir.path().join("a.mp3");
        touch(&real);
        let missing = dir.path().join("ghost.mp3");

        let found = expand(&[missing, real.clone()], &["mp3"]);
        assert_eq!(found, vec![real]);
    }

    #[test]
    fn file_with_wrong_extension_is_ignored() {
        let dir = tempdir().unwrap();
        let txt = dir.path().join("readme.txt");
        touch(&txt);

        assert!(expand(&[txt], &["mp3"]).is_empty());
    }
}
