//! Poll URL validation
//!
//! The poll relay fetches whatever URL the caller hands it, so the URL must be
//! http(s) and its host must be allowlisted. Entries match exactly or as a
//! parent domain (`inference.example.com` allows `eu.inference.example.com`).

use reqwest::Url;

pub fn validate_poll_url(poll_url: &str, allowlist: &[String]) -> Result<Url, String> {
    let parsed = Url::parse(poll_url).map_err(|e| format!("Invalid poll_url: {}", e))?;

    if parsed.scheme() != "http" && parsed.scheme() != "https" {
        return Err("poll_url must start with http:// or https://".to_string());
    }

    let host = parsed
        .host_str()
        .ok_or_else(|| "poll_url must have a host".to_string())?
        .to_lowercase();

    let is_allowed = allowlist.iter().any(|allowed| {
        let allowed = allowed.trim().to_lowercase();
        !allowed.is_empty() && (host == allowed || host.ends_with(&format!(".{}", allowed)))
    });

    if !is_allowed {
        return Err(format!(
            "poll_url host '{}' is not in the allowed list",
            host
        ));
    }

    Ok(parsed)
}
