use sha1::{Digest, Sha1};
use url::Url;

/// `page_id`: SHA-1 hex of `host || escaped_path`. Deliberately ignores
/// scheme, query, and fragment — two URLs differing only in those are
/// the same graph node. Do not "fix" this; it's load-bearing for how
/// densely the graph converges.
pub fn page_id(url: &Url) -> String {
    hash(url.host_str().unwrap_or(""), url.path())
}

fn hash(host: &str, path: &str) -> String {
    let mut hasher = Sha1::new();
    hasher.update(host.as_bytes());
    hasher.update(path.as_bytes());
    format!("{:x}", hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_host_and_path_same_fingerprint_regardless_of_scheme() {
        let a = Url::parse("http://a.example/p").unwrap();
        let b = Url::parse("https://a.example/p").unwrap();
        assert_eq!(page_id(&a), page_id(&b));
    }

    #[test]
    fn query_and_fragment_do_not_affect_fingerprint() {
        let a = Url::parse("https://a.example/p").unwrap();
        let b = Url::parse("https://a.example/p?q=1#frag").unwrap();
        assert_eq!(page_id(&a), page_id(&b));
    }

    #[test]
    fn different_path_different_fingerprint() {
        let a = Url::parse("https://a.example/p").unwrap();
        let b = Url::parse("https://a.example/q").unwrap();
        assert_ne!(page_id(&a), page_id(&b));
    }

    #[test]
    fn different_host_different_fingerprint() {
        let a = Url::parse("https://a.example/p").unwrap();
        let b = Url::parse("https://b.example/p").unwrap();
        assert_ne!(page_id(&a), page_id(&b));
    }

    #[test]
    fn stable_across_repeated_calls() {
        let u = Url::parse("https://a.example/p/q").unwrap();
        assert_eq!(page_id(&u), page_id(&u));
    }
}
