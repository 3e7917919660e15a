use crate::error::ItemError;
use std::path::{Path, PathBuf};

/// Extensions treated as images. Matching is case-sensitive.
pub const IMAGE_EXTENSIONS: &[&str] = &[".jpg", ".jpeg", ".png"];

/// Marker that identifies a mobile variant key.
pub const MOBILE_MARKER: &str = "-mobile.";

const MOBILE_SUFFIX: &str = "-mobile";

/// Returns the key's extension including the dot, taken from the last `.`.
pub fn extension(key: &str) -> Option<&str> {
    key.rfind('.').map(|idx| &key[idx..])
}

pub fn has_image_extension(key: &str) -> bool {
    extension(key).is_some_and(|ext| IMAGE_EXTENSIONS.contains(&ext))
}

pub fn is_mobile_key(key: &str) -> bool {
    key.contains(MOBILE_MARKER)
}

/// `photos/cat.jpg` -> `photos/cat-mobile.jpg`
pub fn mobile_key(key: &str) -> Result<String, ItemError> {
    let idx = key
        .rfind('.')
        .ok_or_else(|| ItemError::MissingExtension(key.to_string()))?;
    let (stem, ext) = key.split_at(idx);
    Ok(format!("{}{}{}", stem, MOBILE_SUFFIX, ext))
}

/// Maps a mobile variant key back to the key of its original.
pub fn original_key(mobile_key: &str) -> Option<String> {
    is_mobile_key(mobile_key).then(|| mobile_key.replacen(MOBILE_MARKER, ".", 1))
}

/// Resolves an object key to a path under `root`, one directory per `/` segment.
pub fn local_path(root: &Path, key: &str) -> Result<PathBuf, ItemError> {
    let mut path = root.to_path_buf();
    let mut segments = 0;
    for segment in key.split('/') {
        match segment {
            "" => continue,
            "." | ".." => return Err(ItemError::UnsafeKey(key.to_string())),
            s if s.contains('\\') => return Err(ItemError::UnsafeKey(key.to_string())),
            s => {
                path.push(s);
                segments += 1;
            }
        }
    }
    if segments == 0 {
        return Err(ItemError::UnsafeKey(key.to_string()));
    }
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extension_is_case_sensitive() {
        assert!(has_image_extension("a.jpg"));
        assert!(has_image_extension("dir/b.jpeg"));
        assert!(has_image_extension("c.png"));
        assert!(!has_image_extension("d.JPG"));
        assert!(!has_image_extension("e.txt"));
        assert!(!has_image_extension("no-extension"));
        assert!(!has_image_extension("dir.jpg/file"));
    }

    #[test]
    fn test_mobile_key_inserts_before_last_extension() {
        assert_eq!(mobile_key("photo.jpeg").unwrap(), "photo-mobile.jpeg");
        assert_eq!(
            mobile_key("2021/05/archive.tar.png").unwrap(),
            "2021/05/archive.tar-mobile.png"
        );
        assert!(matches!(
            mobile_key("README"),
            Err(ItemError::MissingExtension(_))
        ));
    }

    #[test]
    fn test_original_key_reverses_mobile_key() {
        for key in ["a.jpg", "nested/dir/b.png", "c.d.jpeg"] {
            let mobile = mobile_key(key).unwrap();
            assert!(is_mobile_key(&mobile));
            assert_eq!(original_key(&mobile).as_deref(), Some(key));
        }
        assert_eq!(original_key("plain.jpg"), None);
    }

    #[test]
    fn test_local_path_mirrors_key() {
        let root = Path::new("raw");
        assert_eq!(
            local_path(root, "uploads/2024/cat.jpg").unwrap(),
            Path::new("raw/uploads/2024/cat.jpg")
        );
        assert_eq!(
            local_path(root, "/leading//slashes.png").unwrap(),
            Path::new("raw/leading/slashes.png")
        );
    }

    #[test]
    fn test_local_path_rejects_traversal() {
        let root = Path::new("raw");
        assert!(local_path(root, "../etc/passwd.png").is_err());
        assert!(local_path(root, "a/./b.png").is_err());
        assert!(local_path(root, "///").is_err());
    }
}
