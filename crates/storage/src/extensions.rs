//! File extension allow-list.

use std::path::Path;

/// Extensions served when nothing else is configured.
pub const DEFAULT_EXTENSIONS: [&str; 13] =
    ["gif", "png", "jpg", "jpeg", "tif", "tiff", "zip", "rar", "cbz", "cbr", "bmp", "pdf", "cgt"];

/// Decides which regular files make it into a listing.
///
/// A file passes when its extension *contains* one of the allowed entries,
/// compared case-sensitively. That means `comic.jpgx` passes (it contains
/// `jpg`) while `COMIC.JPG` does not. Files without an extension, dotfiles
/// like `.hidden` included, never pass.
///
/// ```
/// use comicglass_storage::Extensions;
///
/// let allowed = Extensions::default();
/// assert!(allowed.allows("issue-01.cbz"));
/// assert!(allowed.allows("cover.jpgx"));
/// assert!(!allowed.allows("notes.txt"));
/// ```
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Extensions(Vec<String>);
impl Extensions {
    pub fn new(extensions: impl IntoIterator<Item = impl Into<String>>) -> Self {
        // Configs tend to contain ".cbz" as often as "cbz".
        Self(
            extensions
                .into_iter()
                .map(Into::into)
                .map(|ext| ext.trim().trim_start_matches('.').to_string())
                .filter(|ext| !ext.is_empty())
                .collect(),
        )
    }

    pub fn allows(&self, name: impl AsRef<Path>) -> bool {
        let Some(extension) = name.as_ref().extension() else {
            return false;
        };
        let extension = extension.to_string_lossy();
        self.0.iter().any(|allowed| extension.contains(allowed.as_str()))
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }
}
impl Default for Extensions {
    fn default() -> Self {
        Self::new(DEFAULT_EXTENSIONS)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("x.jpg", true)]
    #[case("x.txt", false)]
    #[case("Issue 12.cbz", true)]
    #[case("archive.tar.zip", true)]
    #[case("archive.zip.txt", false)]
    // Substring containment rather than equality: kept on purpose.
    #[case("x.jpgx", true)]
    #[case("x.xtiffx", true)]
    // Case-sensitive.
    #[case("X.JPG", false)]
    #[case("no-extension", false)]
    #[case(".hidden", false)]
    #[case(".cbz", false)]
    fn test_default_allow_list(#[case] name: &str, #[case] expected: bool) {
        assert_eq!(Extensions::default().allows(name), expected);
    }

    #[test]
    fn test_custom_allow_list_strips_dots() {
        let allowed = Extensions::new([".epub", " mobi ", ""]);
        assert_eq!(allowed.iter().collect::<Vec<_>>(), vec!["epub", "mobi"]);
        assert!(allowed.allows("book.epub"));
        assert!(!allowed.allows("book.cbz"));
    }

    #[test]
    fn test_empty_allow_list_rejects_everything() {
        let allowed = Extensions::new(Vec::<String>::new());
        assert!(allowed.is_empty());
        assert!(!allowed.allows("book.cbz"));
    }
}
