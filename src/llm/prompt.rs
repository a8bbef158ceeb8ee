use std::sync::OnceLock;

use regex::{NoExpand, Regex};

use crate::llm::types::{ContentPart, ImageUrl, MessageContent};

/// A template that trims to this means "send the selection verbatim".
pub const VERBATIM_TEMPLATE: &str = "{}";

/// Fixed instruction sent alongside a captured region.
pub const OCR_INSTRUCTION: &str = "\
Recognize all text in this image and return it exactly as written. \
If the image contains a question, answer it. \
Return only the resulting text, without commentary.";

fn placeholder_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\{[^}]*\}").expect("placeholder pattern is valid"))
}

/// Substitute `selection` into `template`.
///
/// Every `{...}` group (`{text}`, `{}`, `{anything}`) is replaced by the selection.
/// An empty template, or one that is exactly `{}`, yields the selection unchanged.
pub fn render_template(template: &str, selection: &str) -> String {
    let trimmed = template.trim();
    if trimmed.is_empty() || trimmed == VERBATIM_TEMPLATE {
        return selection.to_string();
    }
    placeholder_regex()
        .replace_all(template, NoExpand(selection))
        .into_owned()
}

pub fn text_prompt(template: &str, selection: &str) -> MessageContent {
    MessageContent::Text(render_template(template, selection))
}

/// Multimodal prompt: the OCR instruction followed by the captured image (a data URL).
pub fn image_prompt(image_data_url: &str) -> MessageContent {
    MessageContent::Parts(vec![
        ContentPart::Text {
            text: OCR_INSTRUCTION.to_string(),
        },
        ContentPart::ImageUrl {
            image_url: ImageUrl {
                url: image_data_url.to_string(),
            },
        },
    ])
}
