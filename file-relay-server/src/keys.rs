use clap::ValueEnum;
use uuid::Uuid;

/// Namespace for keys derived from the uploaded filename.
pub const UPLOAD_PREFIX: &str = "uploads/";

const IMMUTABLE_CACHE: &str = "public, max-age=31536000, immutable";
const REVALIDATE_CACHE: &str = "no-cache";

/// How the uploader names stored objects. Fixed for the lifetime of a deployment.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, ValueEnum)]
pub enum KeyStrategy {
    /// A fresh UUID per upload, unrelated to the filename.
    #[default]
    Random,
    /// `uploads/<filename>`. Readable, but a second upload with the same name replaces the first.
    Filename,
}

impl KeyStrategy {
    pub fn derive(&self, original_filename: Option<&str>) -> String {
        match self {
            KeyStrategy::Random => random_token(),
            KeyStrategy::Filename => {
                let name = original_filename.and_then(base_name);
                match name {
                    Some(name) => format!("{UPLOAD_PREFIX}{name}"),
                    None => format!("{UPLOAD_PREFIX}{}", random_token()),
                }
            }
        }
    }
}

/// `Cache-Control` for a stored key. Filename keys can be overwritten; random ones never are.
pub fn cache_control(key: &str) -> &'static str {
    if key.starts_with(UPLOAD_PREFIX) {
        REVALIDATE_CACHE
    } else {
        IMMUTABLE_CACHE
    }
}

fn random_token() -> String {
    Uuid::new_v4().simple().to_string()
}

/// Last path segment of a client-supplied filename, or `None` if nothing usable is left.
fn base_name(filename: &str) -> Option<&str> {
    let name = filename.rsplit(|c: char| c == '/' || c == '\\').next().unwrap_or_default().trim();
    match name {
        "" | "." | ".." => None,
        name => Some(name),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_random_keys_are_unique_and_ignore_filename() {
        let a = KeyStrategy::Random.derive(Some("photo.jpg"));
        let b = KeyStrategy::Random.derive(Some("photo.jpg"));
        assert_ne!(a, b);
        assert_eq!(a.len(), 32);
        assert!(a.chars().all(|c| c.is_ascii_hexdigit()));
        assert!(!a.contains("photo"));
    }

    #[test]
    fn test_filename_keys() {
        let strategy = KeyStrategy::Filename;
        assert_eq!(strategy.derive(Some("photo.jpg")), "uploads/photo.jpg");
        assert_eq!(strategy.derive(Some("my holiday.png")), "uploads/my holiday.png");
        assert_eq!(strategy.derive(Some("../../etc/passwd")), "uploads/passwd");
        assert_eq!(strategy.derive(Some("C:\\Users\\me\\report.pdf")), "uploads/report.pdf");
    }

    #[test]
    fn test_filename_keys_fall_back_to_random() {
        for name in [None, Some(""), Some("   "), Some("dir/"), Some(".."), Some("a/.")] {
            let key = KeyStrategy::Filename.derive(name);
            let token = key.strip_prefix(UPLOAD_PREFIX).expect("prefixed");
            assert_eq!(token.len(), 32, "unexpected key {key} for {name:?}");
        }
    }

    #[test]
    fn test_cache_policy_follows_mutability() {
        assert!(cache_control(&KeyStrategy::Random.derive(Some("a.txt"))).contains("immutable"));
        assert_eq!(cache_control(&KeyStrategy::Filename.derive(Some("a.txt"))), "no-cache");
        assert_eq!(cache_control(&KeyStrategy::Filename.derive(None)), "no-cache");
        assert_eq!(KeyStrategy::default(), KeyStrategy::Random);
    }
}
