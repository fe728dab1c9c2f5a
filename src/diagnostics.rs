use crate::error::DumError;
use crate::span::Span;

/// Renders one error against the source it came from.
pub fn report(source: &str, error: &DumError) -> String {
    let message = error.message();
    let hint = suggest_hint(&message);
    render(source, error.label(), error.span(), &message, hint.as_deref())
}

pub fn render(source: &str, kind: &str, span: Span, message: &str, hint: Option<&str>) -> String {
    let lines: Vec<&str> = source.lines().collect();
    let line_idx = span.line.saturating_sub(1);
    let source_line = lines.get(line_idx).copied().unwrap_or("");

    let gutter_width = span.line.to_string().len();
    let pointer_col = span.col.saturating_sub(1);
    let pointer_len = span.length.max(1);

    let mut out = String::new();

    // error[kind]: message
    out.push_str(&format!("error[{}]: {}\n", kind, message));

    // --> line:col
    out.push_str(&format!(
        "{:>width$}--> line {}:{}\n",
        " ",
        span.line,
        span.col,
        width = gutter_width
    ));

    out.push_str(&format!("{:>width$} |\n", " ", width = gutter_width));
    out.push_str(&format!(
        "{:>width$} | {}\n",
        span.line,
        source_line,
        width = gutter_width
    ));

    // keep tabs so the carets line up under the source
    let padding: String = source_line
        .chars()
        .take(pointer_col)
        .map(|c| if c == '\t' { '\t' } else { ' ' })
        .collect();
    out.push_str(&format!(
        "{:>width$} | {}{}\n",
        " ",
        padding,
        "^".repeat(pointer_len),
        width = gutter_width
    ));

    if let Some(hint) = hint {
        out.push_str(&format!("{:>width$} |\n", " ", width = gutter_width));
        out.push_str(&format!(
            "{:>width$} = hint: {}\n",
            " ",
            hint,
            width = gutter_width
        ));
    }

    out
}

pub fn suggest_hint(message: &str) -> Option<String> {
    let msg = message.to_lowercase();

    if msg.contains("declared constant") {
        return Some("declare with 'let' instead of 'const' to make it reassignable".into());
    }

    if msg.contains("by zero") {
        return Some("check the divisor first, or leave strict mode to get NaN".into());
    }

    if msg.contains("is not a function") {
        return Some("make sure the function is declared before this line".into());
    }

    if msg.contains("does not exist") {
        return Some("declare it with 'let' or 'const' first".into());
    }

    if msg.contains("already defined") {
        return Some("reassign with '=' instead of declaring again".into());
    }

    if msg.contains("does not have property") {
        return Some("use Object.has(\"key\", object) to check before reading".into());
    }

    if msg.contains("cannot return in a loop") {
        return Some("use break, then return after the loop".into());
    }

    if msg.contains("top level") {
        return Some("assign DUM.exports to produce a result".into());
    }

    None
}
