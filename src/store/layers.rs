//! Layer operations: UpsertLayer, UpsertLayerField, LoadLayers and layer queries
//!
//! Layers have no version. Every upsert succeeds and the last write wins;
//! field indices are the only thing an upsert can never move.

use tracing::{debug, info, warn};
use uuid::Uuid;

use super::errors::{EntityKind, StoreError, StoreResult};
use super::state::StoreState;
use super::{GeoStore, LoadSummary};
use crate::model::{DomainView, Layer, LayerField};

impl StoreState {
    pub(crate) fn apply_layer(&mut self, input: &Layer) -> StoreResult<()> {
        if !self.layers.contains_key(&input.code) {
            let mut id = if input.id.is_nil() { Uuid::new_v4() } else { input.id };
            if self.layers.values().any(|l| l.id == id) {
                warn!(layer = %input.code, %id, "Layer id already taken, allocating a new one");
                id = Uuid::new_v4();
            }
            let layer = Layer::created(id, input.code.as_str(), input.geography_type);
            self.layers.insert(input.code.clone(), layer);
            debug!(layer = %input.code, "Layer created");
        }

        let view = DomainView::new(&self.domains, &self.wildcard);
        let Some(layer) = self.layers.get_mut(&input.code) else {
            return Err(StoreError::not_found(EntityKind::Layer, input.code.as_str()));
        };
        let was_traceable = layer.is_traceable();
        layer.assign_scalars(input);
        for field in &input.fields {
            layer.merge_field(field);
        }
        layer.refresh_domain_state(&view);

        if layer.is_traceable() != was_traceable {
            self.reindex_layer(&input.code);
        }

        self.persist_layer(&input.code)
    }

    /// Bring the hit index in line with a layer whose traceability changed
    fn reindex_layer(&mut self, layer_code: &str) {
        let Some(layer) = self.layers.get(layer_code) else {
            return;
        };
        let traceable = layer.is_traceable();
        let geography = layer.geography_type;
        let keys = self
            .elements_by_layer
            .get(&layer.id)
            .cloned()
            .unwrap_or_default();

        for key in &keys {
            self.hit_index.remove(*key);
            if let Some(element) = self.elements.get(key.0) {
                if traceable && element.activation {
                    self.hit_index.add(*key, element, geography);
                }
            }
        }
        debug!(layer = %layer_code, traceable, elements = keys.len(), "Layer re-indexed");
    }

    pub(crate) fn apply_layer_field(&mut self, layer_code: &str, field: &LayerField) -> StoreResult<()> {
        let view = DomainView::new(&self.domains, &self.wildcard);
        let Some(layer) = self.layers.get_mut(layer_code) else {
            debug!(layer = %layer_code, field = %field.code, "Field update for unknown layer rejected");
            return Err(StoreError::not_found(EntityKind::Layer, layer_code));
        };
        layer.merge_field(field);
        // The status field may have just appeared
        layer.refresh_domain_state(&view);

        self.persist_layer(layer_code)
    }
}

impl GeoStore {
    /// Create or update a layer by code. Always applies; only persistence can fail.
    pub fn upsert_layer(&self, input: &Layer) -> StoreResult<()> {
        self.write("upsert_layer")?.apply_layer(input)
    }

    /// Update one field of an existing layer in place, or append it
    pub fn upsert_layer_field(&self, layer_code: &str, field: &LayerField) -> StoreResult<()> {
        self.write("upsert_layer_field")?.apply_layer_field(layer_code, field)
    }

    /// Replay layer states, applying the same rules as `upsert_layer`
    pub fn load_layers(&self, layers: &[Layer]) -> StoreResult<LoadSummary> {
        let mut state = self.write("load_layers")?;
        let mut summary = LoadSummary::default();
        for layer in layers {
            summary.record(&state.apply_layer(layer));
        }
        info!(
            applied = summary.applied,
            rejected = summary.rejected,
            unsaved = summary.unsaved,
            "Layers loaded"
        );
        Ok(summary)
    }

    pub fn layer(&self, code: &str) -> StoreResult<Option<Layer>> {
        Ok(self.read("layer")?.layers.get(code).cloned())
    }

    /// Layers for the given codes, in request order, skipping unknown codes
    pub fn layers_by_codes<I, S>(&self, codes: I) -> StoreResult<Vec<Layer>>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let state = self.read("layers_by_codes")?;
        Ok(codes
            .into_iter()
            .filter_map(|code| state.layers.get(code.as_ref()).cloned())
            .collect())
    }

    pub fn layers(&self) -> StoreResult<Vec<Layer>> {
        Ok(self.read("layers")?.layers.values().cloned().collect())
    }

    pub fn layer_codes(&self) -> StoreResult<Vec<String>> {
        Ok(self.read("layer_codes")?.layers.keys().cloned().collect())
    }

    pub fn disconnector_layer_codes(&self) -> StoreResult<Vec<String>> {
        let state = self.read("disconnector_layer_codes")?;
        Ok(state
            .layers
            .values()
            .filter(|l| l.is_disconnector)
            .map(|l| l.code.clone())
            .collect())
    }

    /// Active elements owned by a layer; `None` if the layer is unknown
    pub fn layer_element_count(&self, layer_code: &str) -> StoreResult<Option<usize>> {
        let state = self.read("layer_element_count")?;
        let Some(layer) = state.layers.get(layer_code) else {
            return Ok(None);
        };
        let count = state
            .elements_by_layer
            .get(&layer.id)
            .map(|keys| {
                keys.iter()
                    .filter(|key| state.element(**key).is_some_and(|e| e.activation))
                    .count()
            })
            .unwrap_or(0);
        Ok(Some(count))
    }
}
