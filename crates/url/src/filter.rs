use url::Url;

/// Schemes we'll ever fetch. Everything else is rejected at the door.
const ACCEPT_SCHEMES: &[&str] = &["http", "https"];

/// Hosts known to serve nothing worth crawling (tracker redirects,
/// image CDNs). Extend as new noise sources turn up.
const IGNORE_HOSTS: &[&str] = &["t.co", "pbs.twimg.com"];

/// Path extensions accepted as "probably HTML". No extension at all is
/// accepted too — most server-rendered pages don't carry one.
const ACCEPT_EXTENSIONS: &[&str] = &["html", "htm"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterReject {
    Scheme,
    IgnoredHost,
    Extension,
}

/// Parses `raw`, resolving against `base` if it isn't already absolute.
pub fn parse(raw: &str, base: Option<&Url>) -> Result<Url, url::ParseError> {
    let trimmed = raw.trim();
    match Url::parse(trimmed) {
        Ok(url) => Ok(url),
        Err(url::ParseError::RelativeUrlWithoutBase) => match base {
            Some(base) => base.join(trimmed),
            None => Err(url::ParseError::RelativeUrlWithoutBase),
        },
        Err(e) => Err(e),
    }
}

/// `true` if this URL should be scheduled for crawling. A rejection is
/// a value, not an exception.
pub fn accept(url: &Url) -> bool {
    check(url).is_ok()
}

pub fn check(url: &Url) -> Result<(), FilterReject> {
    if !ACCEPT_SCHEMES.contains(&url.scheme()) {
        return Err(FilterReject::Scheme);
    }
    if let Some(host) = url.host_str() {
        if IGNORE_HOSTS.contains(&host) {
            return Err(FilterReject::IgnoredHost);
        }
    }
    if let Some(ext) = path_extension(url.path()) {
        if !ACCEPT_EXTENSIONS.contains(&ext.to_lowercase().as_str()) {
            return Err(FilterReject::Extension);
        }
    }
    Ok(())
}

fn path_extension(path: &str) -> Option<&str> {
    let last_segment = path.rsplit('/').next().unwrap_or(path);
    let (_, ext) = last_segment.rsplit_once('.')?;
    if ext.is_empty() {
        None
    } else {
        Some(ext)
    }
}
