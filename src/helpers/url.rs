//! URL helpers

/// Extract repository name from a git URL.
///
/// Query strings, fragments, trailing slashes and a trailing `.git` are
/// stripped before taking the last path segment.
///
/// ```
/// use cct::helpers::url::extract_repo_name;
/// assert_eq!(extract_repo_name("https://github.com/foo/bar.git"), "bar");
/// assert_eq!(extract_repo_name("git@github.com:foo/bar.git"), "bar");
/// ```
pub fn extract_repo_name(url: &str) -> String {
    let url = url.split('#').next().unwrap_or(url);
    let url = url.split('?').next().unwrap_or(url);
    let clean = url.trim_end_matches('/');
    let clean = clean.strip_suffix(".git").unwrap_or(clean);

    // git@host:user/repo
    if let Some(colon_pos) = clean.rfind(':')
        && !clean[..colon_pos].contains('/')
    {
        let after_colon = &clean[colon_pos + 1..];
        return after_colon.rsplit('/').next().unwrap_or("repo").to_string();
    }

    clean
        .rsplit('/')
        .next()
        .filter(|s| !s.is_empty())
        .unwrap_or("repo")
        .to_string()
}
