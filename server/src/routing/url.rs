use url::{Host, Url};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid url {input:?}: {reason}")]
pub struct InvalidUrl {
    pub input: String,
    pub reason: String,
}

impl InvalidUrl {
    fn new(input: &str, reason: impl Into<String>) -> Self {
        Self {
            input: input.to_string(),
            reason: reason.into(),
        }
    }
}

/// Prefix `https://` unless the input already names an http(s) scheme.
pub fn normalize_input_url(raw: &str) -> String {
    let raw = raw.trim();
    let lower = raw.to_ascii_lowercase();
    if lower.starts_with("http://") || lower.starts_with("https://") {
        raw.to_string()
    } else {
        format!("https://{raw}")
    }
}

/// A normalized, syntactically valid absolute http(s) URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TargetUrl {
    normalized: String,
    parsed: Url,
}

impl TargetUrl {
    pub fn parse(raw: &str) -> Result<Self, InvalidUrl> {
        if raw.trim().is_empty() {
            return Err(InvalidUrl::new(raw, "empty"));
        }
        if raw.trim().contains(char::is_whitespace) {
            return Err(InvalidUrl::new(raw, "contains whitespace"));
        }

        let normalized = normalize_input_url(raw);
        let parsed = Url::parse(&normalized).map_err(|e| InvalidUrl::new(raw, e.to_string()))?;

        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(InvalidUrl::new(raw, "unsupported scheme"));
        }
        match parsed.host() {
            Some(Host::Domain(domain)) if is_valid_domain(domain) => {}
            Some(Host::Ipv4(_)) | Some(Host::Ipv6(_)) => {}
            Some(Host::Domain(_)) => return Err(InvalidUrl::new(raw, "malformed host")),
            None => return Err(InvalidUrl::new(raw, "missing host")),
        }

        Ok(Self { normalized, parsed })
    }

    pub fn as_str(&self) -> &str {
        &self.normalized
    }

    /// True when the URL names one specific page rather than a site root.
    pub fn is_single_page(&self) -> bool {
        let path = self.parsed.path();
        !path.is_empty() && path != "/" && !path.trim_end_matches('/').is_empty()
    }
}

impl std::fmt::Display for TargetUrl {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.normalized)
    }
}

fn is_valid_domain(domain: &str) -> bool {
    if domain == "localhost" {
        return true;
    }
    let labels: Vec<&str> = domain.trim_end_matches('.').split('.').collect();
    if labels.len() < 2 {
        return false;
    }
    let labels_ok = labels.iter().all(|label| {
        !label.is_empty()
            && label.len() <= 63
            && !label.starts_with('-')
            && !label.ends_with('-')
            && label.chars().all(|c| c.is_ascii_alphanumeric() || c == '-')
    });
    let tld = labels[labels.len() - 1];
    labels_ok && tld.len() >= 2 && (tld.starts_with("xn--") || tld.chars().all(|c| c.is_ascii_alphabetic()))
}
