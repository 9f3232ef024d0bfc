//! Element display-name rendering
//!
//! The store recomputes an element's display name after every mutation. The
//! template language is pluggable; [`FormatRenderer`] is the built-in one and
//! expands `{FIELD_CODE}` placeholders from the element's field payload,
//! showing domain text in place of coded values.

use serde_json::Value;

use super::domain::DomainView;
use super::element::{value_as_code, value_as_text, LayerElement};
use super::layer::Layer;

/// Computes an element's display name from its layer schema and field payload
pub trait DisplaynameRenderer: Send + Sync {
    fn render(&self, layer: &Layer, element: &LayerElement, domains: &DomainView<'_>) -> String;
}

/// Placeholder renderer driven by `Layer::element_displayname_format`.
///
/// Falls back to the element code when the format is blank or the payload is
/// not a JSON array. Unknown fields expand to nothing.
#[derive(Debug, Clone, Copy, Default)]
pub struct FormatRenderer;

impl DisplaynameRenderer for FormatRenderer {
    fn render(&self, layer: &Layer, element: &LayerElement, domains: &DomainView<'_>) -> String {
        let format = layer.element_displayname_format.trim();
        if format.is_empty() {
            return element.code.clone();
        }
        let Some(values) = element.field_values() else {
            return element.code.clone();
        };

        let mut out = String::with_capacity(format.len());
        let mut rest = format;
        while let Some(start) = rest.find('{') {
            out.push_str(&rest[..start]);
            let after = &rest[start + 1..];
            let Some(end) = after.find('}') else {
                // Unclosed brace, keep it literally
                out.push_str(&rest[start..]);
                rest = "";
                break;
            };
            out.push_str(&expand_field(layer, after[..end].trim(), &values, domains));
            rest = &after[end + 1..];
        }
        out.push_str(rest);
        out
    }
}

fn expand_field(layer: &Layer, field_code: &str, values: &[Value], domains: &DomainView<'_>) -> String {
    let Some(field) = layer.field(field_code) else {
        return String::new();
    };
    let Some(value) = values.get(field.index) else {
        return String::new();
    };

    value_as_code(value)
        .and_then(|code| domains.domain(&layer.code, &field.code)?.text_of(code))
        .map(str::to_string)
        .unwrap_or_else(|| value_as_text(value))
}
