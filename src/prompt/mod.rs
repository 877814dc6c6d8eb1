//! Template composition for per-row completion prompts
//!
//! The instruction template and the row's target-column value are joined
//! by fixed section markers; the template carries no placeholder syntax.

/// Combine an instruction template with one row's text.
///
/// The value is embedded as-is: empty cells, numeric cells, and cells with
/// embedded newlines all pass through without escaping or truncation.
pub fn compose(template: &str, value: &str) -> String {
    format!("##{template}\n\n ##待处理的文本: {value}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_compose_contains_template_and_value() {
        let prompt = compose("请总结", "合同条款一");
        assert!(prompt.contains("请总结"));
        assert!(prompt.contains("合同条款一"));
    }

    #[test]
    fn test_compose_section_markers() {
        let prompt = compose("summarize", "some text");
        assert_eq!(prompt, "##summarize\n\n ##待处理的文本: some text");
    }

    #[test]
    fn test_compose_empty_value() {
        let prompt = compose("请总结", "");
        assert_eq!(prompt, "##请总结\n\n ##待处理的文本: ");
    }

    #[test]
    fn test_compose_numeric_value() {
        let prompt = compose("classify", "42.5");
        assert!(prompt.ends_with("##待处理的文本: 42.5"));
    }

    #[test]
    fn test_compose_multiline_value() {
        let prompt = compose("translate", "line one\nline two");
        assert!(prompt.contains("line one\nline two"));
    }
}
