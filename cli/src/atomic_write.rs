use std::io::Write as _;
use std::path::Path;

use anyhow::Context;
use tempfile::NamedTempFile;

/// Replaces `path` with `contents` by writing a sibling temp file and renaming
/// it into place. Readers never see a half-written config. The file always
/// ends with a newline.
pub fn write_atomic_text(path: &Path, contents: &str) -> anyhow::Result<()> {
    let parent = path
        .parent()
        .filter(|parent| !parent.as_os_str().is_empty())
        .with_context(|| format!("invalid path for atomic write: {}", path.display()))?;
    std::fs::create_dir_all(parent).with_context(|| format!("create {}", parent.display()))?;

    let mut tmp = NamedTempFile::new_in(parent).context("create temp file")?;
    let body = if contents.ends_with('\n') {
        contents.to_string()
    } else {
        format!("{contents}\n")
    };
    tmp.write_all(body.as_bytes()).context("write temp file")?;
    tmp.as_file().sync_all().context("sync temp file")?;

    tmp.persist(path)
        .map_err(|err| anyhow::Error::new(err.error))
        .with_context(|| format!("persist file to {}", path.display()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn creates_parent_dir_and_terminates_last_line() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("nested").join("config.toml");

        write_atomic_text(&path, "mode = \"rich\"").expect("write atomic");

        let contents = std::fs::read_to_string(&path).expect("read");
        assert_eq!(contents, "mode = \"rich\"\n");
    }

    #[test]
    fn replaces_existing_file() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "old\n").expect("seed");

        write_atomic_text(&path, "new\n").expect("write atomic");

        assert_eq!(std::fs::read_to_string(&path).expect("read"), "new\n");
        let leftovers = std::fs::read_dir(dir.path()).expect("list").count();
        assert_eq!(leftovers, 1);
    }
}
