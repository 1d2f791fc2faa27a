use formats::Attributes;

pub const POPUP_LINE_BREAK: &str = "\n";

/// Popup text for a feature: one `key: value` line per attribute, in the
/// mapping's order. `None` when there is nothing to show.
pub fn describe(attributes: &Attributes) -> Option<String> {
    if attributes.is_empty() {
        return None;
    }
    let lines: Vec<String> = attributes
        .iter()
        .map(|(key, value)| format!("{key}: {value}"))
        .collect();
    Some(lines.join(POPUP_LINE_BREAK))
}
