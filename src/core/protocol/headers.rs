//! Parsing and formatting of the cache-validation and instance-manipulation
//! headers.
//!
//! | Header | Direction | Example |
//! |--------|-----------|---------|
//! | `If-None-Match` | request | `"a1", W/"b2"` |
//! | `A-IM` | request | `googlediffjson, gzip;q=0.5` |
//! | `ETag` | response | `"a1"` |
//! | `IM` | response | `googlediffjson` |
//! | `Delta-Base` | response | `"a1"` |

use crate::core::types::VersionId;

/// Parse an `If-None-Match` value into version ids, in header order.
///
/// Splits on commas outside quotes, accepts weak tags, and skips the `*`
/// wildcard and malformed empty entries.
///
/// # Examples
///
/// ```
/// use delta_cache::protocol::parse_if_none_match;
/// use delta_cache::VersionId;
///
/// let ids = parse_if_none_match("\"v1\", W/\"v2\", *");
/// assert_eq!(ids, vec![VersionId::new("v1"), VersionId::new("v2")]);
/// ```
pub fn parse_if_none_match(value: &str) -> Vec<VersionId> {
    let mut ids = Vec::new();
    let mut start = 0;
    let mut in_quotes = false;

    for (i, c) in value.char_indices() {
        match c {
            '"' => in_quotes = !in_quotes,
            ',' if !in_quotes => {
                ids.extend(VersionId::from_etag(&value[start..i]));
                start = i + 1;
            }
            _ => {}
        }
    }
    ids.extend(VersionId::from_etag(&value[start..]));
    ids
}

/// Format ids as an `If-None-Match` value.
///
/// ```
/// use delta_cache::protocol::format_if_none_match;
/// use delta_cache::VersionId;
///
/// let value = format_if_none_match(&[VersionId::new("a"), VersionId::new("b")]);
/// assert_eq!(value, "\"a\", \"b\"");
/// ```
pub fn format_if_none_match(ids: &[VersionId]) -> String {
    ids.iter()
        .map(VersionId::to_etag)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Parse an `IM` / `A-IM` list into lowercase token names, dropping
/// parameters.
pub fn parse_im_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .filter_map(|entry| {
            let name = entry.split(';').next().unwrap_or("").trim();
            if name.is_empty() {
                None
            } else {
                Some(name.to_ascii_lowercase())
            }
        })
        .collect()
}

/// Check whether an `A-IM` value accepts the instance manipulation `token`.
///
/// Token comparison is case-insensitive; an entry with `q=0` declines.
///
/// # Examples
///
/// ```
/// use delta_cache::protocol::accepts_instance_manipulation;
///
/// assert!(accepts_instance_manipulation("gzip, googlediffjson", "googlediffjson"));
/// assert!(accepts_instance_manipulation("GoogleDiffJson;q=0.8", "googlediffjson"));
/// assert!(!accepts_instance_manipulation("googlediffjson;q=0", "googlediffjson"));
/// assert!(!accepts_instance_manipulation("vcdiff", "googlediffjson"));
/// ```
pub fn accepts_instance_manipulation(value: &str, token: &str) -> bool {
    value.split(',').any(|entry| {
        let mut parts = entry.split(';');
        let name = parts.next().unwrap_or("").trim();
        if !name.eq_ignore_ascii_case(token) {
            return false;
        }
        let declined = parts.any(|param| {
            param
                .trim()
                .strip_prefix("q=")
                .and_then(|q| q.trim().parse::<f32>().ok())
                .is_some_and(|q| q <= 0.0)
        });
        !declined
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    // ========== If-None-Match ==========

    #[test]
    fn test_parse_if_none_match_single() {
        assert_eq!(parse_if_none_match("\"v1\""), vec![VersionId::new("v1")]);
    }

    #[test]
    fn test_parse_if_none_match_keeps_order() {
        let ids = parse_if_none_match("\"c\", \"a\", \"b\"");
        assert_eq!(
            ids,
            vec![VersionId::new("c"), VersionId::new("a"), VersionId::new("b")]
        );
    }

    #[test]
    fn test_parse_if_none_match_without_spaces() {
        let ids = parse_if_none_match("\"a\",\"b\"");
        assert_eq!(ids, vec![VersionId::new("a"), VersionId::new("b")]);
    }

    #[test]
    fn test_parse_if_none_match_comma_inside_quotes() {
        let ids = parse_if_none_match("\"a,b\", \"c\"");
        assert_eq!(ids, vec![VersionId::new("a,b"), VersionId::new("c")]);
    }

    #[test]
    fn test_parse_if_none_match_empty() {
        assert!(parse_if_none_match("").is_empty());
        assert!(parse_if_none_match(" , ,").is_empty());
    }

    #[test]
    fn test_parse_if_none_match_wildcard() {
        assert!(parse_if_none_match("*").is_empty());
    }

    #[test]
    fn test_format_round_trip() {
        let ids = vec![VersionId::new("x"), VersionId::new("y")];
        assert_eq!(parse_if_none_match(&format_if_none_match(&ids)), ids);
    }

    // ========== IM / A-IM ==========

    #[test]
    fn test_parse_im_list() {
        assert_eq!(
            parse_im_list("googlediffjson, Gzip;q=0.5"),
            vec!["googlediffjson".to_string(), "gzip".to_string()]
        );
        assert!(parse_im_list("").is_empty());
    }

    #[test]
    fn test_accepts_custom_token() {
        assert!(accepts_instance_manipulation("textdiff", "textdiff"));
        assert!(!accepts_instance_manipulation("textdiff", "googlediffjson"));
    }

    #[test]
    fn test_accepts_with_positive_q() {
        assert!(accepts_instance_manipulation(
            "googlediffjson; q=1.0",
            "googlediffjson"
        ));
    }

    #[test]
    fn test_declines_with_zero_q() {
        assert!(!accepts_instance_manipulation(
            "googlediffjson; q=0.0",
            "googlediffjson"
        ));
    }

    #[test]
    fn test_empty_a_im() {
        assert!(!accepts_instance_manipulation("", "googlediffjson"));
    }
}
