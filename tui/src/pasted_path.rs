//! Recognizes a pasted file path so it can be attached instead of inserted
//! as text.

use std::path::PathBuf;

/// Interprets `pasted` as a single filesystem path.
///
/// Accepts `file://` URLs, drive-letter and UNC Windows paths (mapped to
/// `/mnt/<drive>` under WSL), and shell-escaped or quoted POSIX paths. Text
/// that splits into more than one shell word is not a path.
pub fn pasted_path(pasted: &str) -> Option<PathBuf> {
    let pasted = pasted.trim();
    if pasted.is_empty() || pasted.contains('\n') {
        return None;
    }

    if let Ok(url) = url::Url::parse(pasted)
        && url.scheme() == "file"
    {
        return url.to_file_path().ok();
    }

    if is_windows_path(pasted) {
        #[cfg(target_os = "linux")]
        {
            if is_probably_wsl()
                && let Some(converted) = windows_path_to_wsl(pasted)
            {
                return Some(converted);
            }
        }
        return Some(PathBuf::from(pasted));
    }

    let mut words = shlex::Shlex::new(pasted);
    let first = words.next()?;
    if words.next().is_some() || words.had_error {
        return None;
    }
    Some(PathBuf::from(first))
}

/// Like [`pasted_path`], but only when the path names an existing file.
pub fn pasted_file(pasted: &str) -> Option<PathBuf> {
    pasted_path(pasted).filter(|path| path.is_file())
}

fn is_windows_path(text: &str) -> bool {
    let mut chars = text.chars();
    let drive = matches!(
        (chars.next(), chars.next(), chars.next()),
        (Some(letter), Some(':'), Some('\\' | '/')) if letter.is_ascii_alphabetic()
    );
    drive || text.starts_with("\\\\")
}

#[cfg(target_os = "linux")]
fn is_probably_wsl() -> bool {
    if let Ok(version) = std::fs::read_to_string("/proc/version") {
        let version = version.to_lowercase();
        if version.contains("microsoft") || version.contains("wsl") {
            return true;
        }
    }
    std::env::var_os("WSL_DISTRO_NAME").is_some() || std::env::var_os("WSL_INTEROP").is_some()
}

#[cfg(target_os = "linux")]
fn windows_path_to_wsl(input: &str) -> Option<PathBuf> {
    if input.starts_with("\\\\") {
        return None;
    }
    let drive = input.chars().next()?.to_ascii_lowercase();
    let mut path = PathBuf::from(format!("/mnt/{drive}"));
    path.extend(
        input
            .get(2..)?
            .split(['\\', '/'])
            .filter(|component| !component.is_empty()),
    );
    Some(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[cfg(not(windows))]
    #[test]
    fn file_url_becomes_path() {
        assert_eq!(
            pasted_path("file:///tmp/report%20final.pdf"),
            Some(PathBuf::from("/tmp/report final.pdf"))
        );
    }

    #[test]
    fn escaped_and_quoted_paths_are_unwrapped() {
        assert_eq!(
            pasted_path("/home/user/My\\ File.pdf"),
            Some(PathBuf::from("/home/user/My File.pdf"))
        );
        assert_eq!(
            pasted_path("'/home/user/My File.pdf'"),
            Some(PathBuf::from("/home/user/My File.pdf"))
        );
    }

    #[test]
    fn prose_and_multiline_text_are_not_paths() {
        assert_eq!(pasted_path("see /a.pdf and /b.pdf"), None);
        assert_eq!(pasted_path("/a.pdf\n/b.pdf"), None);
        assert_eq!(pasted_path("   "), None);
    }

    #[test]
    fn windows_paths_are_recognized() {
        assert!(is_windows_path(r"C:\Users\me\doc.pdf"));
        assert!(is_windows_path("d:/scans/page.png"));
        assert!(is_windows_path(r"\\server\share\doc.pdf"));
        assert!(!is_windows_path("/tmp/doc.pdf"));
        assert!(pasted_path(r"C:\Users\me\doc.pdf").is_some());
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn windows_path_maps_to_wsl_mount() {
        assert_eq!(
            windows_path_to_wsl(r"C:\Users\me\My Docs\doc.pdf"),
            Some(PathBuf::from("/mnt/c/Users/me/My Docs/doc.pdf"))
        );
        assert_eq!(windows_path_to_wsl(r"\\server\share"), None);
    }

    #[test]
    fn pasted_file_requires_existing_file() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("notes.csv");
        std::fs::write(&path, "a,b\n").expect("write");
        let pasted = path.display().to_string();
        assert_eq!(pasted_file(&pasted), Some(path));
        assert_eq!(pasted_file(&dir.path().join("nope.csv").display().to_string()), None);
    }
}
