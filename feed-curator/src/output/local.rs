use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tracing::{error, info};

use super::{DispatchOutcome, OutputMethod};
use crate::rss_utils::text::collapse_whitespace;
use crate::traits::Dispatcher;
use crate::types::ArticleCandidate;

pub const MAX_FILENAME_CHARS: usize = 200;

/// Byte budget for a sanitized title once the ".md" suffix is appended.
pub const MAX_FILENAME_BYTES: usize = 255 - ".md".len();

const RESERVED_NAMES: [&str; 22] = [
    "CON", "PRN", "AUX", "NUL", "COM1", "COM2", "COM3", "COM4", "COM5", "COM6", "COM7", "COM8",
    "COM9", "LPT1", "LPT2", "LPT3", "LPT4", "LPT5", "LPT6", "LPT7", "LPT8", "LPT9",
];

/// Make a title safe to use as a file name on common filesystems.
pub fn sanitize_filename(name: &str) -> String {
    let stripped: String = name
        .chars()
        .filter(|c| !matches!(c, '\\' | '/' | '*' | '?' | ':' | '"' | '<' | '>' | '|'))
        .collect();
    let mut sanitized = collapse_whitespace(&stripped);

    if sanitized.chars().count() > MAX_FILENAME_CHARS || sanitized.len() > MAX_FILENAME_BYTES {
        sanitized = shorten_keeping_extension(&sanitized);
    }

    let sanitized = sanitized.trim_end_matches(&['.', ' '][..]).to_string();

    if RESERVED_NAMES.contains(&sanitized.to_uppercase().as_str()) {
        return format!("_{}", sanitized);
    }
    if sanitized.is_empty() {
        return "untitled".to_string();
    }
    sanitized
}

fn shorten_keeping_extension(name: &str) -> String {
    // A trailing ".ext" counts as an extension only when it is a single short token.
    let ext = match name.rfind('.') {
        Some(idx)
            if idx > 0
                && !name[idx..].contains(' ')
                && name[idx..].chars().count() < MAX_FILENAME_CHARS
                && name.len() - idx < MAX_FILENAME_BYTES =>
        {
            &name[idx..]
        }
        _ => "",
    };
    let stem = &name[..name.len() - ext.len()];
    let keep_chars = MAX_FILENAME_CHARS - ext.chars().count();
    let keep_bytes = MAX_FILENAME_BYTES - ext.len();

    let mut shortened = String::with_capacity(keep_bytes + ext.len());
    for c in stem.chars().take(keep_chars) {
        if shortened.len() + c.len_utf8() > keep_bytes {
            break;
        }
        shortened.push(c);
    }
    shortened.push_str(ext);
    shortened
}

/// Writes Markdown to `<local_dir>/<source_tag>/<title>.md`.
pub struct LocalWriter {
    base_dir: PathBuf,
}

impl LocalWriter {
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self { base_dir: base_dir.into() }
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    pub fn target_path(&self, candidate: &ArticleCandidate) -> PathBuf {
        self.base_dir
            .join(sanitize_filename(&candidate.source_tag))
            .join(format!("{}.md", sanitize_filename(&candidate.title)))
    }

    async fn write(&self, path: &Path, markdown: &str) -> std::io::Result<()> {
        if let Some(dir) = path.parent() {
            tokio::fs::create_dir_all(dir).await?;
        }
        tokio::fs::write(path, markdown).await
    }
}

#[async_trait]
impl Dispatcher for LocalWriter {
    fn method(&self) -> OutputMethod {
        OutputMethod::Local
    }

    async fn dispatch(&self, candidate: &ArticleCandidate, markdown: &str) -> DispatchOutcome {
        let path = self.target_path(candidate);
        let destination = path.display().to_string();

        match self.write(&path, markdown).await {
            Ok(()) => {
                info!("Saved article '{}' locally to {}", candidate.title, destination);
                DispatchOutcome::ok(destination)
            }
            Err(e) => {
                error!("IO error saving article '{}' to {}: {}", candidate.title, destination, e);
                DispatchOutcome::failed(destination)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_forbidden_characters() {
        assert_eq!(sanitize_filename("A/B: Test?"), "AB Test");
        assert_eq!(sanitize_filename("  spaced \t out  "), "spaced out");
        assert_eq!(sanitize_filename("ends with dots..."), "ends with dots");
    }

    #[test]
    fn reserved_and_empty_names() {
        assert_eq!(sanitize_filename("CON"), "_CON");
        assert_eq!(sanitize_filename("lpt3"), "_lpt3");
        assert_eq!(sanitize_filename(""), "untitled");
        assert_eq!(sanitize_filename("???"), "untitled");
    }

    #[test]
    fn long_names_fit_and_keep_extension() {
        let long = format!("{}.md", "x".repeat(300));
        let out = sanitize_filename(&long);
        assert!(out.chars().count() <= MAX_FILENAME_CHARS);
        assert!(out.ends_with(".md"));

        let title = "word ".repeat(80);
        assert!(sanitize_filename(&title).chars().count() <= MAX_FILENAME_CHARS);
    }

    #[test]
    fn multibyte_titles_fit_the_byte_budget() {
        let title = "深入理解".repeat(30);
        assert_eq!(title.chars().count(), 120);

        let out = sanitize_filename(&title);
        assert!(out.len() <= MAX_FILENAME_BYTES);
        assert_eq!(out.chars().count(), MAX_FILENAME_BYTES / 3);
        assert!(title.starts_with(&out));

        let emoji = format!("{}.txt", "🦀".repeat(100));
        let out = sanitize_filename(&emoji);
        assert!(out.len() <= MAX_FILENAME_BYTES);
        assert!(out.ends_with(".txt"));
    }
}
