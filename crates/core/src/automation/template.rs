//! `{{ path }}` interpolation against trigger data.

use serde_json::Value;

use super::evaluator::{resolve_path, to_display_string};

/// Replace every `{{ dot.path }}` placeholder with the resolved context value.
///
/// Missing paths render as an empty string. An unterminated `{{` is copied
/// through literally.
pub fn render_template(template: &str, context: &Value) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(start) = rest.find("{{") {
        out.push_str(&rest[..start]);
        let after_open = &rest[start + 2..];
        match after_open.find("}}") {
            Some(end) => {
                let path = after_open[..end].trim();
                if let Some(value) = resolve_path(context, path) {
                    out.push_str(&to_display_string(Some(value)));
                }
                rest = &after_open[end + 2..];
            }
            None => {
                out.push_str(&rest[start..]);
                rest = "";
            }
        }
    }
    out.push_str(rest);
    out
}
