use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use crate::error::EnvError;

/// External command templates used to compile and run staged listings.
///
/// Templates may use three placeholders: `{file}` expands to the listing's
/// staged source file, `{files}` to every staged file in the unit (as
/// separate arguments), and `{dir}` to the workspace directory. A run
/// template without any placeholder gets the staged file appended.
#[derive(Debug, Clone)]
pub struct Toolchain {
    /// Optional compile step, invoked once per unit over all staged files.
    pub compile: Option<Vec<String>>,
    /// Run step, invoked once per runnable listing in declaration order.
    pub run: Vec<String>,
    /// File extension staged listings are executed under. Labels with a
    /// different extension are restaged under a synthesized name.
    pub extension: String,
}

impl Toolchain {
    pub fn new(run: Vec<String>, extension: impl Into<String>) -> Self {
        Toolchain {
            compile: None,
            run,
            extension: extension.into(),
        }
    }

    /// Default toolchain: run each listing as a Kotlin script.
    pub fn kotlin() -> Self {
        Toolchain::new(
            vec![
                "kotlinc".to_string(),
                "-script".to_string(),
                "{file}".to_string(),
            ],
            "kts",
        )
    }

    pub fn with_compile(mut self, compile: Vec<String>) -> Self {
        self.compile = Some(compile);
        self
    }

    /// Verify the run command's binary can be invoked at all. A missing
    /// toolchain is the single fatal condition: no listing could be
    /// verified, so the run aborts up front with a clear diagnostic.
    pub fn probe(&self) -> Result<(), EnvError> {
        let bin = self.run.first().ok_or_else(|| EnvError::ToolchainMissing {
            command: String::new(),
            detail: "run command is empty".to_string(),
        })?;
        let mut child = Command::new(bin)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|e| EnvError::ToolchainMissing {
                command: bin.clone(),
                detail: e.to_string(),
            })?;
        let _ = child.kill();
        let _ = child.wait();
        Ok(())
    }

    /// Expand a command template against one unit's staged files.
    pub(crate) fn expand(
        template: &[String],
        file: Option<&Path>,
        files: &[PathBuf],
        dir: &Path,
    ) -> Vec<String> {
        let mut argv = Vec::new();
        let mut used_placeholder = false;

        for part in template {
            match part.as_str() {
                "{file}" => {
                    used_placeholder = true;
                    if let Some(f) = file {
                        argv.push(f.to_string_lossy().into_owned());
                    }
                }
                "{files}" => {
                    used_placeholder = true;
                    argv.extend(files.iter().map(|f| f.to_string_lossy().into_owned()));
                }
                "{dir}" => {
                    used_placeholder = true;
                    argv.push(dir.to_string_lossy().into_owned());
                }
                _ => argv.push(part.clone()),
            }
        }

        if !used_placeholder {
            if let Some(f) = file {
                argv.push(f.to_string_lossy().into_owned());
            } else {
                argv.extend(files.iter().map(|f| f.to_string_lossy().into_owned()));
            }
        }

        argv
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_toolchain_runs_kotlin_scripts() {
        let toolchain = Toolchain::kotlin();
        assert_eq!(toolchain.run, vec!["kotlinc", "-script", "{file}"]);
        assert_eq!(toolchain.extension, "kts");
        assert!(toolchain.compile.is_none());
    }

    #[test]
    fn expand_substitutes_placeholders() {
        let files = vec![PathBuf::from("/w/a.kt"), PathBuf::from("/w/b.kt")];
        let template = vec!["cc".to_string(), "{files}".to_string(), "-o".to_string(), "{dir}".to_string()];
        let argv = Toolchain::expand(&template, None, &files, Path::new("/w"));
        assert_eq!(argv, vec!["cc", "/w/a.kt", "/w/b.kt", "-o", "/w"]);
    }

    #[test]
    fn expand_appends_file_without_placeholder() {
        let files = vec![PathBuf::from("/w/a.sh")];
        let template = vec!["sh".to_string()];
        let argv = Toolchain::expand(&template, Some(Path::new("/w/a.sh")), &files, Path::new("/w"));
        assert_eq!(argv, vec!["sh", "/w/a.sh"]);
    }
}
