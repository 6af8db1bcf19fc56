use crate::error::{Error, Result};

/// Parsed information from a ClickUp URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClickUpUrlInfo {
    Task { task_id: String },
    List { list_id: String },
}

/// Parse a ClickUp URL into its component identifier.
///
/// Supported URL patterns:
/// - `https://app.clickup.com/t/<task_id>`
/// - `https://app.clickup.com/t/<team_id>/<custom_task_id>`
/// - `https://app.clickup.com/<team_id>/v/li/<list_id>`
///
/// If the input is not a ClickUp URL, returns an error.
pub fn parse_clickup_url(input: &str) -> Result<ClickUpUrlInfo> {
    let url = url::Url::parse(input).map_err(|e| Error::UrlParse(e.to_string()))?;

    let host = url.host_str().unwrap_or("");
    if !host.contains("clickup.com") {
        return Err(Error::UrlParse(format!("not a ClickUp URL: {input}")));
    }

    let segments: Vec<&str> = url
        .path_segments()
        .map(|s| s.filter(|seg| !seg.is_empty()).collect())
        .unwrap_or_default();

    match segments.as_slice() {
        ["t", task_id] | ["t", _, task_id] if is_identifier(task_id) => {
            Ok(ClickUpUrlInfo::Task {
                task_id: task_id.to_string(),
            })
        }
        [_, "v", "li", list_id] if is_identifier(list_id) => Ok(ClickUpUrlInfo::List {
            list_id: list_id.to_string(),
        }),
        _ => Err(Error::UrlParse(format!("unexpected URL format: {input}"))),
    }
}

/// Resolve a CLI argument that may be a task id or a ClickUp task URL.
pub fn resolve_task_id(input: &str) -> Result<String> {
    let input = input.trim();
    if input.contains("://") {
        return match parse_clickup_url(input)? {
            ClickUpUrlInfo::Task { task_id } => Ok(task_id),
            ClickUpUrlInfo::List { .. } => Err(Error::InvalidIdentifier(format!(
                "expected a task URL, got a list URL: {input}"
            ))),
        };
    }
    if is_identifier(input) {
        Ok(input.to_string())
    } else {
        Err(Error::InvalidIdentifier(input.to_string()))
    }
}

fn is_identifier(s: &str) -> bool {
    !s.is_empty()
        && s.chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_task_url() {
        let info = parse_clickup_url("https://app.clickup.com/t/86c0a2b3c").unwrap();
        assert_eq!(
            info,
            ClickUpUrlInfo::Task {
                task_id: "86c0a2b3c".to_string()
            }
        );
    }

    #[test]
    fn test_parse_custom_task_url() {
        let info = parse_clickup_url("https://app.clickup.com/t/9015000000/VID-123").unwrap();
        assert_eq!(
            info,
            ClickUpUrlInfo::Task {
                task_id: "VID-123".to_string()
            }
        );
    }

    #[test]
    fn test_parse_list_url() {
        let info = parse_clickup_url("https://app.clickup.com/9015000000/v/li/901500001234").unwrap();
        assert_eq!(
            info,
            ClickUpUrlInfo::List {
                list_id: "901500001234".to_string()
            }
        );
    }

    #[test]
    fn test_parse_rejects_foreign_urls() {
        assert!(parse_clickup_url("https://example.com/t/86c0a2b3c").is_err());
        assert!(parse_clickup_url("not a url").is_err());
        assert!(parse_clickup_url("https://app.clickup.com/somewhere/else").is_err());
    }

    #[test]
    fn test_resolve_task_id() {
        assert_eq!(resolve_task_id("86c0a2b3c").unwrap(), "86c0a2b3c");
        assert_eq!(
            resolve_task_id("https://app.clickup.com/t/86c0a2b3c").unwrap(),
            "86c0a2b3c"
        );
        assert!(resolve_task_id("has spaces").is_err());
        assert!(resolve_task_id("").is_err());
        assert!(resolve_task_id("https://app.clickup.com/9015000000/v/li/1").is_err());
    }
}
