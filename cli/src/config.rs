use std::path::{Path, PathBuf};

use serde::Deserialize;

use verifier::Toolchain;

/// On-disk verifier configuration. CLI flags override these values.
#[derive(Debug, Default, Deserialize)]
pub struct FileConfig {
    #[serde(default)]
    pub toolchain: ToolchainConfig,

    /// Per-listing wall-clock limit in milliseconds.
    #[serde(default)]
    pub timeout_ms: Option<u64>,

    /// Worker threads; omitted means one per CPU core.
    #[serde(default)]
    pub workers: Option<usize>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ToolchainConfig {
    /// Compile command template, invoked once per unit over all staged files.
    #[serde(default)]
    pub compile: Option<Vec<String>>,

    /// Run command template, invoked once per listing.
    #[serde(default)]
    pub run: Option<Vec<String>>,

    /// Extension for staged listings that carry no label.
    #[serde(default)]
    pub extension: Option<String>,
}

/// Load configuration: an explicit `--config` path must parse; otherwise an
/// `exemplar.toml` beside the corpus is used when present, and the defaults
/// apply when neither exists.
pub fn load(explicit: Option<&Path>, corpus: &Path) -> Result<FileConfig, String> {
    let path = match explicit {
        Some(p) => Some(p.to_path_buf()),
        None => {
            let base = if corpus.is_dir() {
                corpus.to_path_buf()
            } else {
                corpus
                    .parent()
                    .filter(|p| !p.as_os_str().is_empty())
                    .map(Path::to_path_buf)
                    .unwrap_or_else(|| PathBuf::from("."))
            };
            let candidate = base.join("exemplar.toml");
            candidate.exists().then_some(candidate)
        }
    };

    match path {
        None => Ok(FileConfig::default()),
        Some(p) => {
            let text = std::fs::read_to_string(&p)
                .map_err(|e| format!("cannot read '{}': {}", p.display(), e))?;
            toml::from_str(&text).map_err(|e| format!("config error in '{}': {}", p.display(), e))
        }
    }
}

impl FileConfig {
    /// Build the toolchain: the Kotlin defaults, overridden field by field.
    pub fn toolchain(&self) -> Toolchain {
        let mut toolchain = Toolchain::kotlin();
        if let Some(run) = &self.toolchain.run {
            toolchain.run = run.clone();
        }
        if let Some(ext) = &self.toolchain.extension {
            toolchain.extension = ext.clone();
        }
        if self.toolchain.compile.is_some() {
            toolchain.compile = self.toolchain.compile.clone();
        }
        toolchain
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn defaults_apply_without_a_config_file() {
        let dir = tempfile::tempdir().unwrap();
        let config = load(None, dir.path()).unwrap();
        assert!(config.timeout_ms.is_none());
        let toolchain = config.toolchain();
        assert_eq!(toolchain.run[0], "kotlinc");
    }

    #[test]
    fn config_beside_the_corpus_is_picked_up() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            dir.path().join("exemplar.toml"),
            "timeout_ms = 5000\n\n[toolchain]\nrun = [\"sh\", \"{file}\"]\nextension = \"sh\"\n",
        )
        .unwrap();

        let config = load(None, dir.path()).unwrap();
        assert_eq!(config.timeout_ms, Some(5000));
        let toolchain = config.toolchain();
        assert_eq!(toolchain.run, vec!["sh", "{file}"]);
        assert_eq!(toolchain.extension, "sh");
        assert!(toolchain.compile.is_none());
    }

    #[test]
    fn malformed_config_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.toml");
        fs::write(&path, "timeout_ms = \"not a number\"").unwrap();
        let err = load(Some(&path), dir.path()).unwrap_err();
        assert!(err.contains("config error"));
    }
}
