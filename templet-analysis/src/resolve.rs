//! Template path resolution for `partial()` and `extend` targets.
//!
//! Resolution is best effort and synchronous. Filesystem access goes through
//! the [`FileReader`] seam so tests inject fakes and production uses
//! `std::fs`; a missing or unreadable file is never an error here, it just
//! means "not resolved".

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// Extensions recognized as templet sources, tried in order when a
/// reference omits one.
pub const TEMPLATE_EXTENSIONS: &[&str] = &["njs", "nhtml", "ntyp", "nts", "nmd"];

/// Filesystem access seam for cross-file checks.
pub trait FileReader {
    fn read(&self, path: &Path) -> io::Result<String>;

    fn exists(&self, path: &Path) -> bool;
}

/// Production reader over `std::fs`.
#[derive(Debug, Default, Clone, Copy)]
pub struct FsReader;

impl FileReader for FsReader {
    fn read(&self, path: &Path) -> io::Result<String> {
        fs::read_to_string(path)
    }

    fn exists(&self, path: &Path) -> bool {
        path.is_file()
    }
}

/// Resolve a template reference to an existing file.
///
/// Candidate bases are the referencing file's directory, every workspace
/// root, and each root's `templates/` subfolder; for every base the literal
/// key is tried first, then each recognized extension appended. The first
/// existing file wins.
pub fn resolve_template(
    key: &str,
    file: Option<&Path>,
    roots: &[PathBuf],
    reader: &dyn FileReader,
) -> Option<PathBuf> {
    let key_path = Path::new(key);
    if key_path.is_absolute() {
        return first_existing(key_path.to_path_buf(), reader);
    }

    let mut bases: Vec<PathBuf> = Vec::new();
    if let Some(dir) = file.and_then(Path::parent) {
        bases.push(dir.to_path_buf());
    }
    for root in roots {
        bases.push(root.clone());
        bases.push(root.join("templates"));
    }

    bases
        .into_iter()
        .find_map(|base| first_existing(base.join(key), reader))
}

fn first_existing(candidate: PathBuf, reader: &dyn FileReader) -> Option<PathBuf> {
    if reader.exists(&candidate) {
        return Some(candidate);
    }
    let name = candidate.file_name()?.to_string_lossy().into_owned();
    for ext in TEMPLATE_EXTENSIONS {
        let with_ext = candidate.with_file_name(format!("{name}.{ext}"));
        if reader.exists(&with_ext) {
            return Some(with_ext);
        }
    }
    None
}


#[cfg(test)]
mod tests {
    use super::testing::FakeReader;
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("menu.njs")]
    #[case("menu.nhtml")]
    #[case("menu.ntyp")]
    #[case("menu.nts")]
    #[case("menu.nmd")]
    fn every_recognized_extension_resolves(#[case] file: &str) {
        let path = format!("/ws/{file}");
        let reader = FakeReader::with(&[(path.as_str(), "")]);
        let found = resolve_template(
            "menu",
            Some(Path::new("/ws/index.njs")),
            &[],
            &reader,
        );
        assert_eq!(found, Some(PathBuf::from(format!("/ws/{file}"))));
    }

    #[test]
    fn resolves_relative_to_current_file_first() {
        let reader = FakeReader::with(&[
            ("/ws/pages/menu.njs", ""),
            ("/ws/templates/menu.njs", ""),
        ]);
        let found = resolve_template(
            "menu",
            Some(Path::new("/ws/pages/index.njs")),
            &[PathBuf::from("/ws")],
            &reader,
        );
        assert_eq!(found, Some(PathBuf::from("/ws/pages/menu.njs")));
    }

    #[test]
    fn falls_back_to_root_templates_folder() {
        let reader = FakeReader::with(&[("/ws/templates/menu.nhtml", "")]);
        let found = resolve_template(
            "menu",
            Some(Path::new("/ws/pages/index.njs")),
            &[PathBuf::from("/ws")],
            &reader,
        );
        assert_eq!(found, Some(PathBuf::from("/ws/templates/menu.nhtml")));
    }

    #[test]
    fn literal_path_with_extension_wins() {
        let reader = FakeReader::with(&[("/ws/parts/footer.njs", "")]);
        let found = resolve_template(
            "parts/footer.njs",
            None,
            &[PathBuf::from("/ws")],
            &reader,
        );
        assert_eq!(found, Some(PathBuf::from("/ws/parts/footer.njs")));
    }

    #[test]
    fn unresolvable_key_is_none() {
        let reader = FakeReader::default();
        assert_eq!(
            resolve_template("missing", None, &[PathBuf::from("/ws")], &reader),
            None
        );
    }

    #[test]
    fn absolute_keys_skip_bases() {
        let reader = FakeReader::with(&[("/abs/one.njs", "")]);
        assert_eq!(
            resolve_template("/abs/one", None, &[PathBuf::from("/elsewhere")], &reader),
            Some(PathBuf::from("/abs/one.njs"))
        );
    }
}
