use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use tempfile::TempDir;

use exemplar::block::Block;

/// Ephemeral staging directory for one execution unit.
///
/// Deleted when dropped, which happens as soon as the unit completes; no
/// unit can observe another unit's workspace, and nothing persists between
/// runs.
pub struct Workspace {
    dir: TempDir,
}

impl Workspace {
    pub fn create() -> io::Result<Workspace> {
        let dir = tempfile::Builder::new().prefix("exemplar-").tempdir()?;
        Ok(Workspace { dir })
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Write a listing's code under its declared label path, or a
    /// synthesized `listing_<index>.<ext>` name.
    ///
    /// The label path is only used when its extension matches the
    /// toolchain's: a script toolchain (say `.kts`) cannot execute a file
    /// staged under a compiled-source label like `Dir/Hello.kt`, so such
    /// listings are restaged under the synthesized name instead.
    pub fn stage(&self, block: &Block, extension: &str) -> io::Result<PathBuf> {
        let rel = block
            .label
            .as_deref()
            .map(sanitize)
            .filter(|p| p.file_name().is_some())
            .filter(|p| p.extension().and_then(|e| e.to_str()) == Some(extension))
            .unwrap_or_else(|| PathBuf::from(format!("listing_{}.{}", block.index, extension)));

        let dest = self.dir.path().join(rel);
        if let Some(parent) = dest.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&dest, &block.code)?;
        Ok(dest)
    }
}

/// Keep a declared label inside the workspace: drop empty, `.` and `..`
/// components so a hostile label cannot escape the temp dir.
fn sanitize(label: &str) -> PathBuf {
    label
        .split(['/', '\\'])
        .filter(|c| !c.is_empty() && *c != "." && *c != "..")
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use exemplar::block::Block;

    fn block(label: Option<&str>, code: &str, index: usize) -> Block {
        Block {
            label: label.map(String::from),
            package: None,
            language: None,
            code: code.to_string(),
            expected: None,
            runnable: true,
            index,
            span: 0..0,
        }
    }

    #[test]
    fn stages_under_label_path() {
        let ws = Workspace::create().unwrap();
        let path = ws
            .stage(&block(Some("Summary/Hello.kt"), "fun main() {}", 0), "kt")
            .unwrap();
        assert!(path.starts_with(ws.path()));
        assert!(path.ends_with("Summary/Hello.kt"));
        assert_eq!(fs::read_to_string(&path).unwrap(), "fun main() {}");
    }

    #[test]
    fn label_with_a_foreign_extension_is_restaged() {
        // The default script toolchain stages `.kts` files; a `.kt` label
        // names the listing in diagnostics but cannot name the staged file.
        let ws = Workspace::create().unwrap();
        let path = ws
            .stage(&block(Some("Summary/Hello.kt"), "println(1)", 2), "kts")
            .unwrap();
        assert!(path.ends_with("listing_2.kts"));
    }

    #[test]
    fn synthesizes_name_without_label() {
        let ws = Workspace::create().unwrap();
        let path = ws.stage(&block(None, "x", 3), "kt").unwrap();
        assert!(path.ends_with("listing_3.kt"));
    }

    #[test]
    fn traversal_components_are_stripped() {
        let ws = Workspace::create().unwrap();
        let path = ws
            .stage(&block(Some("../../etc/passwd.kt"), "x", 0), "kt")
            .unwrap();
        assert!(path.starts_with(ws.path()));
        assert!(path.ends_with("etc/passwd.kt"));
    }

    #[test]
    fn workspace_is_deleted_on_drop() {
        let ws = Workspace::create().unwrap();
        let root = ws.path().to_path_buf();
        drop(ws);
        assert!(!root.exists());
    }
}
