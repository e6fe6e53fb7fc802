//! Compilation of route patterns into anchored regular expressions.
//!
//! Placeholders are written in braces: `{int:NAME}` only matches digits, any
//! other placeholder matches letters, digits and `:.!,?-_`. Text around the
//! placeholders matches literally.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::router::RouteError;

const INT_SEGMENT: &str = "([0-9]+)";
const TEXT_SEGMENT: &str = r"([a-zA-Z0-9:.!,?\-_]+)";

static PLACEHOLDER: Lazy<Regex> = Lazy::new(|| Regex::new(r"\{([a-zA-Z0-9:.!,?\-_]+)\}").expect("valid placeholder regex"));

/// A compiled route pattern and the names of its placeholders, in order.
#[derive(Debug, Clone)]
pub struct CompiledPattern {
    pub(crate) regex: Regex,
    pub(crate) param_names: Vec<String>,
}

pub fn compile(pattern: &str) -> Result<CompiledPattern, RouteError> {
    if !pattern.starts_with('/') {
        return Err(RouteError::invalid_pattern(pattern, "must start with '/'"));
    }

    let mut source = String::with_capacity(pattern.len() + 16);
    let mut param_names = Vec::new();
    let mut last = 0;

    source.push('^');
    for captures in PLACEHOLDER.captures_iter(pattern) {
        let (Some(whole), Some(inner)) = (captures.get(0), captures.get(1)) else {
            continue;
        };

        source.push_str(&regex::escape(&pattern[last..whole.start()]));
        let placeholder = inner.as_str();
        if placeholder.starts_with("int:") {
            source.push_str(INT_SEGMENT);
        } else {
            source.push_str(TEXT_SEGMENT);
        }
        param_names.push(param_name(placeholder).to_string());
        last = whole.end();
    }
    source.push_str(&regex::escape(&pattern[last..]));
    source.push('$');

    let regex = Regex::new(&source).map_err(|e| RouteError::invalid_pattern(pattern, e))?;
    Ok(CompiledPattern { regex, param_names })
}

/// `int:ID` is named `ID`, `slug` is named `slug`.
fn param_name(placeholder: &str) -> &str {
    placeholder.rsplit(':').next().unwrap_or(placeholder)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn int_placeholder() {
        let compiled = compile("/user/get/{int:ID}").unwrap();

        assert_eq!(compiled.regex.as_str(), "^/user/get/([0-9]+)$");
        assert_eq!(compiled.param_names, ["ID"]);
        assert!(compiled.regex.is_match("/user/get/42"));
        assert!(!compiled.regex.is_match("/user/get/abc"));
        assert!(!compiled.regex.is_match("/user/get/4.2"));
        assert!(!compiled.regex.is_match("/user/get/"));
        assert!(!compiled.regex.is_match("/user/get/42/x"));
    }

    #[test]
    fn text_placeholder() {
        let compiled = compile("/images/{name}").unwrap();

        assert_eq!(compiled.param_names, ["name"]);
        assert!(compiled.regex.is_match("/images/1_abc-def.jpg"));
        assert!(!compiled.regex.is_match("/images/a/b.jpg"));
        assert!(!compiled.regex.is_match("/images/a%20b"));
    }

    #[test]
    fn literals_are_escaped() {
        let compiled = compile("/api/v1.0/docs").unwrap();

        assert!(compiled.regex.is_match("/api/v1.0/docs"));
        assert!(!compiled.regex.is_match("/api/v1x0/docs"));
    }

    #[test]
    fn several_placeholders() {
        let compiled = compile("/posts/{int:post}/comments/{slug}").unwrap();
        let captures = compiled.regex.captures("/posts/7/comments/first!").unwrap();

        assert_eq!(compiled.param_names, ["post", "slug"]);
        assert_eq!(&captures[1], "7");
        assert_eq!(&captures[2], "first!");
    }

    #[test]
    fn unmatched_brace_is_literal() {
        let compiled = compile("/odd/{").unwrap();
        assert!(compiled.regex.is_match("/odd/{"));
        assert!(compiled.param_names.is_empty());
    }

    #[test]
    fn relative_pattern_is_rejected() {
        assert!(matches!(compile("user"), Err(RouteError::InvalidPattern { .. })));
    }
}
