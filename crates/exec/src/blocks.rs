use autobrowse_core::types::CodeBlock;
use once_cell::sync::Lazy;
use regex::Regex;

static CODE_FENCE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?s)```[ \t]*(\w*)[ \t]*\r?\n(.*?)```").expect("code fence regex is valid")
});

/// Pull fenced code blocks out of an assistant message, in order.
/// The fence tag becomes the declared language; a bare ``` fence yields None.
pub fn extract_code_blocks(message: &str) -> Vec<CodeBlock> {
    CODE_FENCE
        .captures_iter(message)
        .map(|cap| {
            let lang = cap.get(1).map(|m| m.as_str()).filter(|l| !l.is_empty());
            let code = cap.get(2).map(|m| m.as_str()).unwrap_or_default();
            CodeBlock::new(lang, code.trim_end_matches('\n'))
        })
        .collect()
}
