//! Content hashing for cache keys and change detection
//!
//! Same bytes = same key. File-set hashes are taken over the ordered
//! `filename|content` listing, so the list order is part of the identity.

use sha2::{Digest, Sha256};

/// SHA-256 of arbitrary bytes as lowercase hex
pub fn content_hash(bytes: impl AsRef<[u8]>) -> String {
    hex::encode(Sha256::digest(bytes.as_ref()))
}

/// Hash an ordered file listing.
///
/// Equivalent to hashing every `filename|content` pair joined with `\n`.
pub fn files_hash<'a, I>(files: I) -> String
where
    I: IntoIterator<Item = (&'a str, &'a str)>,
{
    let mut hasher = Sha256::new();

    for (i, (filename, content)) in files.into_iter().enumerate() {
        if i > 0 {
            hasher.update(b"\n");
        }
        hasher.update(filename.as_bytes());
        hasher.update(b"|");
        hasher.update(content.as_bytes());
    }

    hex::encode(hasher.finalize())
}

/// First 12 hex chars of a hash, for log lines
pub fn short(hash: &str) -> &str {
    hash.get(..12).unwrap_or(hash)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_deterministic() {
        assert_eq!(content_hash("abc"), content_hash("abc"));
        assert_ne!(content_hash("abc"), content_hash("abd"));
        assert_eq!(content_hash("abc").len(), 64);
    }

    #[test]
    fn files_hash_matches_joined_listing() {
        let files = [("src/main.js", "main"), ("index.html", "index-html")];
        let joined = "src/main.js|main\nindex.html|index-html";
        assert_eq!(files_hash(files), content_hash(joined));
    }

    #[test]
    fn files_hash_is_order_sensitive() {
        let a = files_hash([("a.js", "1"), ("b.js", "2")]);
        let b = files_hash([("b.js", "2"), ("a.js", "1")]);
        assert_ne!(a, b);
    }

    #[test]
    fn empty_listing_hashes_empty_string() {
        assert_eq!(files_hash(std::iter::empty()), content_hash(""));
    }

    #[test]
    fn short_hash() {
        let hash = content_hash("abc");
        assert_eq!(short(&hash).len(), 12);
        assert_eq!(short("abc"), "abc");
    }
}
