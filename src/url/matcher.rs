/// Checks a host against a domain allow-list
///
/// Entries are plain substrings: a host passes when it contains at least one of
/// them. An empty allow-list admits every host. Both sides are compared
/// case-insensitively.
///
/// # Examples
///
/// ```
/// use adlib_harvest::url::host_allowed;
///
/// let allow = vec!["example.com".to_string()];
/// assert!(host_allowed("example.com", &allow));
/// assert!(host_allowed("sub.example.com", &allow));
/// assert!(!host_allowed("other.org", &allow));
/// assert!(host_allowed("other.org", &[]));
/// ```
pub fn host_allowed(host: &str, allowed: &[String]) -> bool {
    if allowed.is_empty() {
        return true;
    }

    let host = host.to_lowercase();
    allowed
        .iter()
        .any(|entry| host.contains(&entry.trim().to_lowercase()))
}
