//! Reads a price or a quantity out of whatever element a selector points at.

use crate::host::{Document, ElementKind};
use crate::numeric::{parse_price, parse_quantity};

/// Price shown by the first element matching `selector`.
///
/// The element's full descendant text is parsed, so markup such as
/// `<span>€<b>12</b>,50</span>` reads as one price.
pub fn extract_price<D: Document + ?Sized>(doc: &D, selector: &str) -> Option<f64> {
    let element = doc.query_selector(selector)?;
    parse_price(&doc.text_content(&element))
}

/// Quantity held by the first element matching `selector`.
///
/// Form controls are read through their live value. Other elements prefer a
/// non-empty `data-value` attribute over their text, which is how custom
/// stepper widgets usually expose their state.
pub fn extract_quantity<D: Document + ?Sized>(doc: &D, selector: &str) -> Option<u64> {
    let element = doc.query_selector(selector)?;
    let source = match doc.element_kind(&element) {
        ElementKind::FormControl => doc.value(&element).unwrap_or_default(),
        ElementKind::Generic => doc
            .attribute(&element, "data-value")
            .filter(|value| !value.is_empty())
            .unwrap_or_else(|| doc.text_content(&element)),
    };
    parse_quantity(&source)
}
