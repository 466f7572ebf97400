use anyhow::{bail, Context, Result};
use regex::Regex;
use url::Url;

/// Normalizes a username given on the command line.
///
/// Accepts a bare handle, a handle with a leading `@`, or a profile URL on
/// twitter.com / x.com.
pub fn parse_username(input: &str) -> Result<String> {
    let input = input.trim();

    if input.is_empty() {
        bail!("Username cannot be empty");
    }

    let candidate = match Url::parse(input) {
        Ok(parsed_url) => {
            if !parsed_url.host_str().is_some_and(is_twitter_host) {
                bail!("Not a Twitter profile URL: {input}");
            }

            parsed_url
                .path_segments()
                .and_then(|mut s| s.find(|segment| !segment.is_empty()))
                .map(str::to_string)
                .with_context(|| format!("Could not extract username from: {input}"))?
        }
        Err(_) => input.to_string(),
    };

    let username = candidate.trim_start_matches('@');

    let re = Regex::new(r"^[A-Za-z0-9_]+$").context("Failed to compile username regex")?;
    if !re.is_match(username) {
        bail!("Invalid username: {input}");
    }

    Ok(username.to_string())
}

fn is_twitter_host(host: &str) -> bool {
    ["twitter.com", "x.com"]
        .iter()
        .any(|domain| host == *domain || host.ends_with(&format!(".{domain}")))
}
