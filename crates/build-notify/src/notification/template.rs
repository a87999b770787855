//! Placeholder substitution for message templates.
//!
//! Placeholders have the form `{{.key}}`. Keys match exactly and case-sensitively.
//! Unknown keys are left untouched, so rendering cannot fail.

use std::collections::BTreeMap;

use super::settings::MessageTemplate;

const OPEN: &str = "{{.";
const CLOSE: &str = "}}";

/// Parameter keys filled in by the dispatcher before rendering.
pub mod keys {
    pub const STATUS: &str = "cds.status";
    pub const BUILD_URL: &str = "cds.buildURL";
    pub const AUTHOR: &str = "cds.author";
}

/// A rendered title and body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedMessage {
    pub title: String,
    pub body: String,
}

/// Render both parts of a template.
pub fn render(template: &MessageTemplate, params: &BTreeMap<String, String>) -> RenderedMessage {
    RenderedMessage {
        title: render_str(&template.subject, params),
        body: render_str(&template.body, params),
    }
}

/// Substitute every known placeholder in `input`.
///
/// Substituted values are copied as-is and never scanned for placeholders.
pub fn render_str(input: &str, params: &BTreeMap<String, String>) -> String {
    let mut out = String::with_capacity(input.len());
    let mut rest = input;

    while let Some(start) = rest.find(OPEN) {
        let after_open = &rest[start + OPEN.len()..];
        let Some(end) = after_open.find(CLOSE) else {
            break;
        };

        out.push_str(&rest[..start]);
        match params.get(&after_open[..end]) {
            Some(value) => {
                out.push_str(value);
                rest = &after_open[end + CLOSE.len()..];
            }
            // Not a known placeholder: keep the opener and rescan after it.
            None => {
                out.push_str(OPEN);
                rest = after_open;
            }
        }
    }

    out.push_str(rest);
    out
}
