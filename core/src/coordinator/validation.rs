use url::Url;

use crate::error::ValidationError;

const WATCH_HOSTS: &[&str] = &[
    "youtube.com",
    "www.youtube.com",
    "m.youtube.com",
    "music.youtube.com",
];

/// Trims `raw` and checks it against the popup's input rules. The length
/// limit applies to the trimmed text.
pub fn validate_question(
    raw: &str,
    placeholder: &str,
    max_chars: usize,
) -> Result<String, ValidationError> {
    let question = raw.trim();
    if question.is_empty() {
        return Err(ValidationError::Empty);
    }
    if question == placeholder.trim() {
        return Err(ValidationError::Placeholder);
    }
    let len = question.chars().count();
    if len > max_chars {
        return Err(ValidationError::TooLong {
            len,
            max: max_chars,
        });
    }
    Ok(question.to_string())
}

/// True for a YouTube video page: `/watch` with a non-empty `v` parameter.
pub fn is_watch_page_url(raw: &str) -> bool {
    let Ok(url) = Url::parse(raw) else {
        return false;
    };
    matches!(url.scheme(), "http" | "https")
        && url.host_str().is_some_and(|host| WATCH_HOSTS.contains(&host))
        && url.path() == "/watch"
        && url
            .query_pairs()
            .any(|(key, value)| key == "v" && !value.is_empty())
}
