//! Layer schema types
//!
//! A layer is a named category of network features sharing one geography type
//! and one field schema. Layers carry no version: the last write wins.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::domain::DomainView;

/// Geometry kind shared by every element of a layer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum GeographyType {
    #[default]
    Point,
    Polyline,
    Polygon,
}

/// One column of a layer's field schema
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LayerField {
    pub code: String,
    pub displayname: String,
    pub activation: bool,
    #[serde(rename = "type")]
    pub field_type: String,
    /// Position in the element field payload. Assigned on first sight, never changed.
    pub index: usize,
}

impl LayerField {
    pub fn new(code: impl Into<String>, displayname: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            displayname: displayname.into(),
            activation: true,
            ..Default::default()
        }
    }
}

/// Operation-status facts resolved through the domain tables
#[derive(Debug, Clone, Copy, Default, PartialEq)]
struct OperationStatus {
    field_index: Option<usize>,
    open_code: Option<i64>,
}

/// A layer definition. Also used as the upsert input, where a nil `id` asks
/// the store to allocate one and field indices are ignored.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Layer {
    pub id: Uuid,
    pub code: String,
    pub displayname: String,
    pub geography_type: GeographyType,
    pub activation: bool,
    pub is_electrical: bool,
    pub is_disconnector: bool,
    pub operation_status_field_code: String,
    pub operation_status_open_value: String,
    pub element_displayname_format: String,
    pub fields: Vec<LayerField>,
    #[serde(skip)]
    status: OperationStatus,
}

impl Layer {
    pub fn new(code: impl Into<String>, geography_type: GeographyType) -> Self {
        Self {
            code: code.into(),
            geography_type,
            activation: true,
            ..Default::default()
        }
    }

    /// Empty layer with a fixed identity, before any scalar or field is applied
    pub(crate) fn created(id: Uuid, code: impl Into<String>, geography_type: GeographyType) -> Self {
        Self {
            id,
            code: code.into(),
            geography_type,
            ..Default::default()
        }
    }

    /// Copy every mutable scalar attribute from `input`. Identity, code and
    /// geography type stay as they were at creation.
    pub(crate) fn assign_scalars(&mut self, input: &Layer) {
        self.activation = input.activation;
        self.displayname = input.displayname.clone();
        self.is_electrical = input.is_electrical;
        self.is_disconnector = input.is_disconnector;
        self.operation_status_field_code = input.operation_status_field_code.clone();
        self.operation_status_open_value = input.operation_status_open_value.clone();
        self.element_displayname_format = input.element_displayname_format.clone();
    }

    /// Update the field with the same code in place, or append it at the next index
    pub(crate) fn merge_field(&mut self, input: &LayerField) {
        match self.fields.iter_mut().find(|f| f.code == input.code) {
            Some(field) => {
                field.displayname = input.displayname.clone();
                field.activation = input.activation;
                field.field_type = input.field_type.clone();
            }
            None => {
                let index = self.fields.len();
                self.fields.push(LayerField {
                    index,
                    ..input.clone()
                });
            }
        }
    }

    pub fn field(&self, code: &str) -> Option<&LayerField> {
        self.fields.iter().find(|f| f.code == code)
    }

    /// Whether elements of this layer belong in the spatial hit index
    pub fn is_traceable(&self) -> bool {
        self.is_electrical
            && matches!(self.geography_type, GeographyType::Point | GeographyType::Polyline)
    }

    /// Re-resolve the cached operation-status facts against the current domains.
    ///
    /// The open value is looked up as domain display text first; a bare number
    /// is accepted as the code itself when no domain entry matches.
    pub(crate) fn refresh_domain_state(&mut self, domains: &DomainView<'_>) {
        self.status = OperationStatus::default();
        if self.operation_status_field_code.is_empty() {
            return;
        }
        let Some(field) = self.field(&self.operation_status_field_code) else {
            return;
        };
        let field_index = field.index;

        let open_value = self.operation_status_open_value.trim();
        let open_code = domains
            .domain(&self.code, &self.operation_status_field_code)
            .and_then(|d| d.code_of(open_value))
            .or_else(|| open_value.parse::<i64>().ok());

        self.status = OperationStatus {
            field_index: Some(field_index),
            open_code,
        };
    }

    /// Payload index of the operation-status field, once resolved
    pub fn status_field_index(&self) -> Option<usize> {
        self.status.field_index
    }

    /// Numeric code meaning "open" for the operation-status field, once resolved
    pub fn status_open_code(&self) -> Option<i64> {
        self.status.open_code
    }
}
