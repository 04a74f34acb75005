//! Href helpers: relative-to-absolute resolution and file names.
//!
//! An href is either a URL (`s3://`, `https://`, `file://`, ...) or a local
//! filesystem path. Base hrefs are always treated as files, never as
//! directories: `./b.json` against `/data/a.json` is `/data/b.json`.

use std::path::{Component, Path, PathBuf};

use url::Url;

use super::errors::StacTaskError;

/// Parse `href` as a URL, ignoring Windows drive letters (`C:\...`).
fn as_url(href: &str) -> Option<Url> {
    Url::parse(href).ok().filter(|url| url.scheme().len() > 1)
}

pub fn is_absolute_href(href: &str) -> bool {
    as_url(href).is_some() || Path::new(href).is_absolute()
}

/// Resolve `href` against `base`.
///
/// Absolute hrefs are returned unchanged. Local results are made absolute
/// with the current working directory when `base` itself is relative.
pub fn resolve_href(href: &str, base: &str) -> Result<String, StacTaskError> {
    if is_absolute_href(href) {
        return Ok(href.to_string());
    }

    if let Some(base_url) = as_url(base) {
        let joined = base_url
            .join(href)
            .map_err(|e| StacTaskError::asset(href, format!("cannot join onto {base}: {e}")))?;
        return Ok(joined.to_string());
    }

    let parent = Path::new(base).parent().unwrap_or_else(|| Path::new(""));
    let mut joined = parent.join(href);
    if !joined.is_absolute() {
        let cwd = std::env::current_dir().map_err(|e| StacTaskError::asset(href, e))?;
        joined = cwd.join(joined);
    }
    Ok(normalize(&joined).to_string_lossy().into_owned())
}

/// Lexically remove `.` and `..` components.
fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                out.pop();
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}

/// Last segment of an href (the file name), if any.
pub fn file_name(href: &str) -> Option<String> {
    if let Some(url) = as_url(href) {
        return url
            .path_segments()
            .and_then(|mut segments| segments.next_back())
            .filter(|name| !name.is_empty())
            .map(str::to_string);
    }
    Path::new(href)
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
}

/// Join a file name onto a directory-like href.
pub fn join_href(dir: &str, name: &str) -> String {
    if as_url(dir).is_some() {
        format!("{}/{}", dir.trim_end_matches('/'), name)
    } else {
        Path::new(dir).join(name).to_string_lossy().into_owned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("./b.json", "/data/a.json", "/data/b.json")]
    #[case("b.json", "/data/sub/a.json", "/data/sub/b.json")]
    #[case("../b.json", "/data/sub/a.json", "/data/b.json")]
    #[case("/abs/b.json", "/data/a.json", "/abs/b.json")]
    #[case("s3://bucket/b.json", "/data/a.json", "s3://bucket/b.json")]
    #[case("b.json", "s3://bucket/payloads/a.json", "s3://bucket/payloads/b.json")]
    #[case("../b.json", "https://example.com/x/y/a.json", "https://example.com/x/b.json")]
    fn resolves_relative_to_file(#[case] href: &str, #[case] base: &str, #[case] expected: &str) {
        assert_eq!(resolve_href(href, base).unwrap(), expected);
    }

    #[test]
    fn relative_base_becomes_absolute() {
        let resolved = resolve_href("b.json", "data/a.json").unwrap();
        assert!(Path::new(&resolved).is_absolute());
        assert!(resolved.ends_with("data/b.json"));
    }

    #[rstest]
    #[case("/tmp/x/item.json", Some("item.json"))]
    #[case("s3://bucket/key/asset.tif", Some("asset.tif"))]
    #[case("https://example.com/dir/", None)]
    fn file_names(#[case] href: &str, #[case] expected: Option<&str>) {
        assert_eq!(file_name(href).as_deref(), expected);
    }

    #[test]
    fn join_keeps_url_scheme() {
        assert_eq!(join_href("s3://bucket/out/", "a.tif"), "s3://bucket/out/a.tif");
        assert_eq!(join_href("/tmp/out", "a.tif"), "/tmp/out/a.tif");
    }
}
