use url::Url;

/// Parses `raw` as an absolute `http` or `https` URL.
///
/// # Errors
///
/// Returns a description of the problem if `raw` does not parse or uses another scheme.
pub fn parse_http_url(raw: &str) -> Result<Url, String> {
    let parsed = Url::parse(raw).map_err(|e| format!("{e}"))?;
    match parsed.scheme() {
        "http" | "https" if parsed.has_host() => Ok(parsed),
        "http" | "https" => Err(format!("missing host in {raw}")),
        other => Err(format!("unsupported scheme {other}")),
    }
}
