//! Options page markup.

use crate::settings::SaveNotice;

fn escape(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

/// Render the page with `url` in the input. A notice, if any, is shown in
/// the status line and cleared client-side after its delay.
pub fn render(url: &str, notice: Option<&SaveNotice>) -> String {
    let (status, script) = match notice {
        Some(n) => (
            escape(n.message),
            format!(
                "<script>setTimeout(function () {{ document.getElementById('status').textContent = ''; }}, {});</script>",
                n.clear_after_ms
            ),
        ),
        None => (String::new(), String::new()),
    };

    format!(
        r#"<!DOCTYPE html>
<html>
<head>
<meta charset="utf-8">
<title>Header relay options</title>
</head>
<body>
<form method="post" action="/options">
<label for="url">Destination URL</label>
<input type="text" id="url" name="url" value="{url}">
<button id="save" type="submit">Save</button>
</form>
<div id="status">{status}</div>
{script}
</body>
</html>
"#,
        url = escape(url),
    )
}

/// Current value of the `url` input in a rendered page.
pub fn input_value(page: &str) -> Option<String> {
    let start = page.find(r#"name="url" value=""#)? + r#"name="url" value=""#.len();
    let end = start + page[start..].find('"')?;
    Some(
        page[start..end]
            .replace("&quot;", "\"")
            .replace("&#39;", "'")
            .replace("&lt;", "<")
            .replace("&gt;", ">")
            .replace("&amp;", "&"),
    )
}
