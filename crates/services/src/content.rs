//! Input validation and the derived `content_html` of posts.

use domains::{DomainError, DomainResult, MAX_POST_CHARS};

pub const MIN_TITLE_CHARS: usize = 5;
pub const MAX_TITLE_CHARS: usize = 200;

pub(crate) fn validate_title(title: &str) -> DomainResult<String> {
    let title = title.trim();
    let len = title.chars().count();
    if len < MIN_TITLE_CHARS {
        return Err(DomainError::validation(format!(
            "the title must be at least {MIN_TITLE_CHARS} characters"
        )));
    }
    if len > MAX_TITLE_CHARS {
        return Err(DomainError::validation(format!(
            "the title must be at most {MAX_TITLE_CHARS} characters"
        )));
    }
    Ok(title.to_string())
}

pub(crate) fn validate_content(content: &str, max_chars: usize) -> DomainResult<()> {
    if content.trim().is_empty() {
        return Err(DomainError::validation("the content cannot be empty"));
    }
    if content.chars().count() > max_chars {
        return Err(DomainError::validation(format!(
            "the content is too long (max {max_chars} characters)"
        )));
    }
    Ok(())
}

pub(crate) fn validate_post_content(content: &str) -> DomainResult<()> {
    validate_content(content, MAX_POST_CHARS)
}

/// Trims `value`, mapping blank input to `None`, and enforces a length cap.
pub(crate) fn optional_text(
    value: Option<String>,
    field: &str,
    max_chars: usize,
) -> DomainResult<Option<String>> {
    let Some(value) = value else {
        return Ok(None);
    };
    let value = value.trim();
    if value.is_empty() {
        return Ok(None);
    }
    if value.chars().count() > max_chars {
        return Err(DomainError::validation(format!(
            "{field} must be at most {max_chars} characters"
        )));
    }
    Ok(Some(value.to_string()))
}

/// Escapes the body and wraps each blank-line separated block in `<p>`;
/// single newlines become `<br />`.
pub fn render_html(content: &str) -> String {
    let normalized = content.replace("\r\n", "\n");
    normalized
        .split("\n\n")
        .map(str::trim)
        .filter(|block| !block.is_empty())
        .map(|block| {
            let escaped = html_escape::encode_text(block);
            format!("<p>{}</p>", escaped.replace('\n', "<br />"))
        })
        .collect::<Vec<_>>()
        .join("")
}
