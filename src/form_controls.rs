use crate::dom::Element;

/// Elements whose state lives in a `value` property rather than in markup.
///
/// Buttons carry a `value` too, but it never reflects user input.
pub(crate) fn is_form_control_element(element: &Element) -> bool {
    element.tag_name.eq_ignore_ascii_case("input")
        || element.tag_name.eq_ignore_ascii_case("select")
        || element.tag_name.eq_ignore_ascii_case("textarea")
}

pub(crate) fn is_input_element(element: &Element) -> bool {
    element.tag_name.eq_ignore_ascii_case("input")
}

pub(crate) fn is_select_element(element: &Element) -> bool {
    element.tag_name.eq_ignore_ascii_case("select")
}

/// Controls `type_text` may write to.
pub(crate) fn is_text_entry_element(element: &Element) -> bool {
    if element.tag_name.eq_ignore_ascii_case("textarea") {
        return true;
    }
    if !is_input_element(element) {
        return false;
    }
    !matches!(
        element
            .attrs
            .get("type")
            .map(|kind| kind.to_ascii_lowercase())
            .as_deref(),
        Some("checkbox" | "radio" | "button" | "submit" | "reset" | "image" | "file" | "hidden")
    )
}
