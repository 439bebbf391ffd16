/// Wraps `text` in a CDATA section, splitting every `]]>` so the section cannot be terminated early.
///
/// # Examples
/// ## Input
/// `a]]>b`
/// ## Output
/// `<![CDATA[a]]]]><![CDATA[>b]]>`
pub(crate) fn cdata(text: &str) -> String {
    format!("<![CDATA[{}]]>", text.replace("]]>", "]]]]><![CDATA[>"))
}

/// Quotes `text` as an XQuery string literal. Ampersands and double quotes are written as predefined entity
/// references, so the literal evaluates back to exactly `text`.
pub(crate) fn string_literal(text: &str) -> String {
    format!("\"{}\"", text.replace('&', "&amp;").replace('"', "&quot;"))
}
