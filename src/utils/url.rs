//! URL helpers for building backend endpoints.

use url::Url;

/// Strip trailing slashes so endpoints can be appended safely.
pub fn normalize_base_url(base_url: &str) -> String {
    base_url.trim_end_matches('/').to_string()
}

/// Join a base URL and an endpoint path without doubling slashes.
///
/// ```
/// use algocroc::utils::url::construct_api_url;
///
/// assert_eq!(
///     construct_api_url("https://openrouter.ai/api/v1/", "/chat/completions"),
///     "https://openrouter.ai/api/v1/chat/completions"
/// );
/// ```
pub fn construct_api_url(base_url: &str, endpoint: &str) -> String {
    let normalized_base = normalize_base_url(base_url);
    let endpoint = endpoint.trim_start_matches('/');
    format!("{normalized_base}/{endpoint}")
}

/// Build `{base}/prompt/{prompt}?seed=..&nologo=true` with the prompt
/// percent-encoded as a single path segment.
pub fn image_prompt_url(base_url: &str, prompt: &str, seed: u32) -> Result<String, url::ParseError> {
    let mut url = Url::parse(&normalize_base_url(base_url))?;
    url.path_segments_mut()
        .map_err(|_| url::ParseError::RelativeUrlWithCannotBeABaseBase)?
        .pop_if_empty()
        .push("prompt")
        .push(prompt);
    url.query_pairs_mut()
        .append_pair("seed", &seed.to_string())
        .append_pair("nologo", "true");
    Ok(url.into())
}
