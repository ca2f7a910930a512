// crates/version-matrix-config/src/template.rs
// ============================================================================
// Module: Endpoint Templates
// Description: Parsing and substitution for `{param}` endpoint URL templates.
// Purpose: Turn configured endpoint templates into concrete request paths.
// Dependencies: percent-encoding, thiserror
// ============================================================================

//! ## Overview
//! Endpoint templates are plain strings with `{name}` placeholders, for
//! example `/api/v2/pets/{pet_id}/health-records`. Placeholder names are
//! restricted to ASCII alphanumerics and underscores. Substitution fails when a
//! placeholder has no supplied value; extra supplied values are ignored.
//!
//! Each value fills exactly one path segment. Values are percent-encoded so
//! `/`, `?`, `#` and `%` cannot change the path the template names, and the
//! empty, `.` and `..` values are rejected.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;

use percent_encoding::AsciiSet;
use percent_encoding::CONTROLS;
use percent_encoding::utf8_percent_encode;
use thiserror::Error;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Characters escaped in a substituted path segment.
const PATH_SEGMENT: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'#')
    .add(b'%')
    .add(b'/')
    .add(b'<')
    .add(b'>')
    .add(b'?')
    .add(b'\\')
    .add(b'`')
    .add(b'{')
    .add(b'}');

// ============================================================================
// SECTION: Types
// ============================================================================

/// Parameter values used to fill endpoint templates.
pub type UrlParams = BTreeMap<String, String>;

/// Endpoint template errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TemplateError {
    /// Template syntax is invalid.
    #[error("malformed endpoint template {template}: {detail}")]
    Malformed {
        /// Offending template.
        template: String,
        /// Description of the syntax problem.
        detail: String,
    },
    /// A placeholder had no supplied value.
    #[error("missing endpoint parameter {0}")]
    MissingParameter(String),
    /// A supplied value cannot stand as a single path segment.
    #[error("endpoint parameter {name} has invalid value {value:?}")]
    InvalidParameter {
        /// Placeholder name.
        name: String,
        /// Rejected value.
        value: String,
    },
}

/// One piece of a parsed template.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Segment<'a> {
    /// Literal text copied as-is.
    Literal(&'a str),
    /// Placeholder name to substitute.
    Param(&'a str),
}

// ============================================================================
// SECTION: Operations
// ============================================================================

/// Returns the placeholder names in template order (duplicates preserved).
///
/// # Errors
///
/// Returns [`TemplateError::Malformed`] when braces are unbalanced or a
/// placeholder name is empty or contains unsupported characters.
pub fn template_parameters(template: &str) -> Result<Vec<&str>, TemplateError> {
    Ok(parse(template)?
        .into_iter()
        .filter_map(|segment| match segment {
            Segment::Param(name) => Some(name),
            Segment::Literal(_) => None,
        })
        .collect())
}

/// Substitutes every placeholder in `template` from `params`.
///
/// # Errors
///
/// Returns [`TemplateError::MissingParameter`] for the first placeholder
/// without a value, [`TemplateError::InvalidParameter`] for an empty, `.` or
/// `..` value, or [`TemplateError::Malformed`] on invalid syntax.
pub fn render_template(template: &str, params: &UrlParams) -> Result<String, TemplateError> {
    let mut rendered = String::with_capacity(template.len());
    for segment in parse(template)? {
        match segment {
            Segment::Literal(text) => rendered.push_str(text),
            Segment::Param(name) => {
                let value = params
                    .get(name)
                    .ok_or_else(|| TemplateError::MissingParameter(name.to_string()))?;
                if matches!(value.as_str(), "" | "." | "..") {
                    return Err(TemplateError::InvalidParameter {
                        name: name.to_string(),
                        value: value.clone(),
                    });
                }
                rendered.extend(utf8_percent_encode(value, PATH_SEGMENT));
            }
        }
    }
    Ok(rendered)
}

// ============================================================================
// SECTION: Parsing
// ============================================================================

/// Splits a template into literal and placeholder segments.
fn parse(template: &str) -> Result<Vec<Segment<'_>>, TemplateError> {
    let malformed = |detail: &str| TemplateError::Malformed {
        template: template.to_string(),
        detail: detail.to_string(),
    };
    let mut segments = Vec::new();
    let mut rest = template;
    while !rest.is_empty() {
        let open = rest.find('{');
        let close = rest.find('}');
        match (open, close) {
            (None, None) => {
                segments.push(Segment::Literal(rest));
                break;
            }
            (None, Some(_)) => return Err(malformed("unmatched '}'")),
            (Some(open), Some(close)) if close < open => {
                return Err(malformed("unmatched '}'"));
            }
            (Some(_), None) => return Err(malformed("unclosed '{'")),
            (Some(open), Some(close)) => {
                if open > 0 {
                    segments.push(Segment::Literal(&rest[.. open]));
                }
                let name = &rest[open + 1 .. close];
                if name.is_empty() {
                    return Err(malformed("empty placeholder"));
                }
                if !is_parameter_name(name) {
                    return Err(malformed("placeholder names must be alphanumeric or '_'"));
                }
                segments.push(Segment::Param(name));
                rest = &rest[close + 1 ..];
            }
        }
    }
    Ok(segments)
}

/// Returns true when `name` is a valid placeholder name.
pub(crate) fn is_parameter_name(name: &str) -> bool {
    !name.is_empty() && name.chars().all(|ch| ch.is_ascii_alphanumeric() || ch == '_')
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::TemplateError;
    use super::UrlParams;
    use super::render_template;
    use super::template_parameters;

    #[test]
    fn renders_nested_resource_path() {
        let mut params = UrlParams::new();
        params.insert("pet_id".to_string(), "42".to_string());
        let rendered = render_template("/api/v2/pets/{pet_id}/health-records", &params);
        assert_eq!(rendered, Ok("/api/v2/pets/42/health-records".to_string()));
    }

    #[test]
    fn values_are_escaped_as_one_segment() {
        let mut params = UrlParams::new();
        params.insert("pet_id".to_string(), "1/../../admin?x=1#top".to_string());
        let rendered = render_template("/api/v1/pets/{pet_id}", &params);
        assert_eq!(rendered, Ok("/api/v1/pets/1%2F..%2F..%2Fadmin%3Fx=1%23top".to_string()));
    }

    #[test]
    fn dot_segments_and_empty_values_are_rejected() {
        for value in ["", ".", ".."] {
            let mut params = UrlParams::new();
            params.insert("pet_id".to_string(), value.to_string());
            let rendered = render_template("/api/v1/pets/{pet_id}", &params);
            assert!(
                matches!(rendered, Err(TemplateError::InvalidParameter { .. })),
                "{value:?}"
            );
        }
    }

    #[test]
    fn missing_parameter_is_reported() {
        let rendered = render_template("/api/v2/pets/{pet_id}", &UrlParams::new());
        assert_eq!(rendered, Err(TemplateError::MissingParameter("pet_id".to_string())));
    }

    #[test]
    fn lists_parameters_in_order() {
        let params = template_parameters("/owners/{owner_id}/pets/{pet_id}");
        assert_eq!(params, Ok(vec!["owner_id", "pet_id"]));
    }

    #[test]
    fn rejects_unbalanced_braces() {
        for template in ["/pets/{pet_id", "/pets/pet_id}", "/pets/{}", "/pets/{pet-id}", "/}{"] {
            let parsed = template_parameters(template);
            assert!(matches!(parsed, Err(TemplateError::Malformed { .. })), "{template}");
        }
    }
}
