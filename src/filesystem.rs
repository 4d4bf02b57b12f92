//! Helpers for filesystem manipulations

use std::ffi::OsString;
use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};

/// What a resolved path points at
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Entry {
    Missing,
    Directory,
    File { executable: bool },
}

/// Maps a request path onto the webroot.
///
/// The path is appended to the webroot as-is, without normalization or
/// percent-decoding. A path ending in `'/'` gets the index document appended.
pub fn resolve(webroot: &Path, request_path: &str, index: &str) -> PathBuf {
    let mut resolved = OsString::from(webroot.as_os_str());
    resolved.push(request_path);
    if request_path.ends_with('/') {
        resolved.push(index);
    }

    PathBuf::from(resolved)
}

/// Stats `path`, following symlinks.
///
/// Any error (not only `NotFound`) makes the entry `Missing`.
pub fn inspect(path: &Path) -> Entry {
    match fs::metadata(path) {
        Ok(ref meta) if meta.is_dir() => Entry::Directory,
        Ok(meta) => Entry::File {
            executable: meta.permissions().mode() & 0o111 != 0,
        },
        Err(_) => Entry::Missing,
    }
}

#[cfg(test)]
mod test {
    use super::*;

    use std::fs::File;

    #[test]
    fn resolve_concatenates_onto_webroot() {
        assert_eq!(
            resolve(Path::new("/srv/htdocs"), "/a/b.html", "index.html"),
            PathBuf::from("/srv/htdocs/a/b.html")
        );
    }

    #[test]
    fn resolve_appends_index_to_trailing_slash() {
        assert_eq!(
            resolve(Path::new("/srv/htdocs"), "/", "index.html"),
            PathBuf::from("/srv/htdocs/index.html")
        );
        assert_eq!(
            resolve(Path::new("htdocs"), "/docs/", "home.htm"),
            PathBuf::from("htdocs/docs/home.htm")
        );
    }

    #[test]
    fn resolve_does_not_percent_decode() {
        assert_eq!(
            resolve(Path::new("/w"), "/a%20b", "index.html"),
            PathBuf::from("/w/a%20b")
        );
    }

    #[test]
    fn inspect_classifies_entries() {
        let dir = tempfile::tempdir().unwrap();
        let plain = dir.path().join("plain.html");
        let program = dir.path().join("program");
        File::create(&plain).unwrap();
        File::create(&program).unwrap();
        fs::set_permissions(&plain, fs::Permissions::from_mode(0o644)).unwrap();
        fs::set_permissions(&program, fs::Permissions::from_mode(0o750)).unwrap();

        assert_eq!(inspect(dir.path()), Entry::Directory);
        assert_eq!(inspect(&plain), Entry::File { executable: false });
        assert_eq!(inspect(&program), Entry::File { executable: true });
        assert_eq!(inspect(&dir.path().join("nope")), Entry::Missing);
    }

    #[test]
    fn any_execute_bit_counts() {
        let dir = tempfile::tempdir().unwrap();
        let other_only = dir.path().join("other");
        File::create(&other_only).unwrap();
        fs::set_permissions(&other_only, fs::Permissions::from_mode(0o641)).unwrap();

        assert_eq!(inspect(&other_only), Entry::File { executable: true });
    }
}
