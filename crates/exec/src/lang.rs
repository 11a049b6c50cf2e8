/// Executor family a code block is routed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LangClass {
    /// Browser-side script, sent to the console over the websocket.
    Script,
    /// Shell command, run locally.
    Shell,
    /// Interpreted locally with the python interpreter.
    Python,
    Unknown,
}

pub fn classify(lang: &str) -> LangClass {
    let l = lang.trim();
    if ["javascript", "js", "node"].iter().any(|k| l.eq_ignore_ascii_case(k)) {
        LangClass::Script
    } else if ["bash", "shell", "sh"].iter().any(|k| l.eq_ignore_ascii_case(k)) {
        LangClass::Shell
    } else if l.eq_ignore_ascii_case("python") {
        LangClass::Python
    } else {
        LangClass::Unknown
    }
}

/// Guess the language of an untagged code block.
///
/// Interpreter invocations are shell commands, not sources. Browser scripts
/// are recognized by the page/DOM idioms the code generator produces; python
/// by its leading keywords. Anything else stays unknown and is reported as
/// such rather than executed.
pub fn infer_lang(code: &str) -> &'static str {
    let trimmed = code.trim_start();
    if trimmed.starts_with("python ")
        || trimmed.starts_with("python3 ")
        || trimmed.starts_with("pip ")
        || trimmed.starts_with("pip3 ")
        || trimmed.starts_with("#!")
    {
        return "sh";
    }

    let looks_like_script = code.contains("await page.")
        || code.contains("document.")
        || code.contains("console.log")
        || code.contains("=>")
        || trimmed.starts_with("const ")
        || trimmed.starts_with("let ")
        || trimmed.starts_with("var ");
    if looks_like_script {
        return "javascript";
    }

    let looks_like_python = code.lines().map(str::trim_start).any(|line| {
        line.starts_with("import ")
            || line.starts_with("from ")
            || line.starts_with("def ")
            || line.starts_with("print(")
    });
    if looks_like_python {
        return "python";
    }

    "unknown"
}
