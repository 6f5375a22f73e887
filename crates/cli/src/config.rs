use anyhow::{Context as AnyhowContext, Result};
use context_doc_chunker::{ChunkOptions, WhitespaceMode};
use serde::Deserialize;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

/// Environment variable pointing at a TOML config file
pub const CONFIG_ENV: &str = "CONTEXT_CHUNKER_CONFIG";

/// On-disk configuration.
///
/// ```toml
/// [chunking]
/// chunk_size = 1200
/// chunk_overlap = 150
/// whitespace = "preserve_lines"
/// ```
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConfigFile {
    #[serde(default)]
    pub chunking: ChunkOptions,
}

impl ConfigFile {
    pub fn load(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config from {}", path.display()))?;
        toml::from_str(&raw).with_context(|| format!("Invalid config file {}", path.display()))
    }
}

/// Command-line overrides applied on top of the config file
#[derive(Debug, Default, Clone)]
pub struct OptionOverrides {
    pub chunk_size: Option<usize>,
    pub chunk_overlap: Option<usize>,
    pub no_code_blocks: bool,
    pub no_sections: bool,
    pub preserve_lines: bool,
}

impl OptionOverrides {
    fn apply(&self, mut options: ChunkOptions) -> ChunkOptions {
        if let Some(size) = self.chunk_size {
            options.chunk_size = size;
        }
        if let Some(overlap) = self.chunk_overlap {
            options.chunk_overlap = overlap;
        }
        if self.no_code_blocks {
            options.preserve_code_blocks = false;
        }
        if self.no_sections {
            options.preserve_sections = false;
        }
        if self.preserve_lines {
            options.whitespace = WhitespaceMode::PreserveLines;
        }
        options
    }
}

/// Explicit `--config` wins over the environment variable
pub fn config_path(flag: Option<&Path>) -> Option<PathBuf> {
    flag.map(Path::to_path_buf).or_else(|| {
        env::var_os(CONFIG_ENV)
            .filter(|value| !value.is_empty())
            .map(PathBuf::from)
    })
}

/// Resolve options: defaults, then the config file, then flags.
pub fn resolve_options(config: Option<&Path>, overrides: &OptionOverrides) -> Result<ChunkOptions> {
    let base = match config_path(config) {
        Some(path) => {
            log::debug!("Loading chunk options from {}", path.display());
            ConfigFile::load(&path)?.chunking
        }
        None => ChunkOptions::default(),
    };

    let options = overrides.apply(base);
    options.validate()?;
    Ok(options)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn flags_override_file_values() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("chunker.toml");
        fs::write(
            &path,
            "[chunking]\nchunk_size = 500\nchunk_overlap = 50\nwhitespace = \"preserve_lines\"\n",
        )
        .unwrap();

        let overrides = OptionOverrides {
            chunk_overlap: Some(10),
            no_sections: true,
            ..OptionOverrides::default()
        };
        let options = resolve_options(Some(&path), &overrides).unwrap();

        assert_eq!(options.chunk_size, 500);
        assert_eq!(options.chunk_overlap, 10);
        assert_eq!(options.whitespace, WhitespaceMode::PreserveLines);
        assert!(!options.preserve_sections);
        assert!(options.preserve_code_blocks);
    }

    #[test]
    fn empty_file_means_defaults() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("empty.toml");
        fs::write(&path, "").unwrap();

        let options = resolve_options(Some(&path), &OptionOverrides::default()).unwrap();
        assert_eq!(options, ChunkOptions::default());
    }

    #[test]
    fn unknown_sections_are_rejected() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("bad.toml");
        fs::write(&path, "[chunker]\nchunk_size = 5\n").unwrap();

        let err = resolve_options(Some(&path), &OptionOverrides::default()).unwrap_err();
        assert!(err.to_string().contains("Invalid config file"));
    }

    #[test]
    fn zero_chunk_size_fails_validation() {
        let overrides = OptionOverrides {
            chunk_size: Some(0),
            ..OptionOverrides::default()
        };
        let dir = tempdir().unwrap();
        let path = dir.path().join("empty.toml");
        fs::write(&path, "").unwrap();

        let err = resolve_options(Some(&path), &overrides).unwrap_err();
        assert!(err.to_string().contains("chunkSize"));
    }
}
