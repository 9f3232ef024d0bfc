//! Element operations: UpsertElement, RemoveElement, LoadElements and element queries
//!
//! Elements accept an equal version (idempotent resend) but never an older
//! one, and can never move to another layer. Every update pulls the element
//! out of the hit index first and puts it back only if it is still traceable.

use rayon::prelude::*;
use std::collections::HashSet;
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::errors::{EntityKind, StateKind, StoreError, StoreResult};
use super::state::StoreState;
use super::{GeoStore, LoadSummary};
use crate::model::{value_as_code, ElementKey, ElementUpdate, LayerElement};

impl StoreState {
    pub(crate) fn apply_element(
        &mut self,
        layer_code: &str,
        input: &ElementUpdate,
        notify: bool,
    ) -> StoreResult<()> {
        self.clock.observe(input.version);

        let Some(layer) = self.layers.get(layer_code) else {
            return Err(StoreError::not_found(EntityKind::Layer, layer_code));
        };
        let layer_id = layer.id;
        let traceable = layer.is_traceable();
        let geography = layer.geography_type;

        let key = match self.element_by_code.get(&input.code).copied() {
            Some(key) => {
                let existing = &self.elements[key.0];
                if existing.layer_id != layer_id {
                    debug!(element = %input.code, owner = %existing.layer_code, requested = %layer_code, "Element owner mismatch");
                    return Err(StoreError::owner_mismatch(&input.code, &existing.layer_code, layer_code));
                }
                if existing.version > input.version {
                    debug!(element = %input.code, stored = existing.version, requested = input.version, "Stale element rejected");
                    return Err(StoreError::stale(input.code.as_str(), existing.version, input.version));
                }
                self.hit_index.remove(key);
                key
            }
            None => {
                let element = LayerElement::placeholder(input, layer);
                self.insert_element(element)
            }
        };

        self.elements[key.0].apply(input);
        self.advance_revision(input.version, notify);

        if traceable && self.elements[key.0].activation {
            self.hit_index.add(key, &self.elements[key.0], geography);
        }

        self.refresh_displayname(key);
        self.persist_element(key)
    }

    /// Register a first-sight element in every lookup table
    fn insert_element(&mut self, mut element: LayerElement) -> ElementKey {
        if self.element_by_id.contains_key(&element.id) {
            warn!(element = %element.code, id = %element.id, "Element id already taken, allocating a new one");
            element.id = Uuid::new_v4();
        }
        let key = ElementKey(self.elements.len());
        self.element_by_code.insert(element.code.clone(), key);
        self.element_by_id.insert(element.id, key);
        self.elements_by_layer.entry(element.layer_id).or_default().push(key);
        self.elements.push(element);
        key
    }

    fn refresh_displayname(&mut self, key: ElementKey) {
        let element = &self.elements[key.0];
        let name = match self.layers.get(&element.layer_code) {
            Some(layer) => self.renderer.render(layer, element, &self.domain_view()),
            None => element.code.clone(),
        };
        self.elements[key.0].displayname = name;
    }

    pub(crate) fn remove_element(
        &mut self,
        layer_code: &str,
        element_code: &str,
        request_version: i64,
    ) -> StoreResult<()> {
        self.clock.observe(request_version);

        let Some(layer) = self.layers.get(layer_code) else {
            return Err(StoreError::not_found(EntityKind::Layer, layer_code));
        };
        let Some(key) = self.element_by_code.get(element_code).copied() else {
            return Err(StoreError::not_found(EntityKind::Element, element_code));
        };
        let element = &self.elements[key.0];
        if element.layer_id != layer.id {
            return Err(StoreError::owner_mismatch(element_code, &element.layer_code, layer_code));
        }
        if element.version > request_version {
            return Err(StoreError::stale(element_code, element.version, request_version));
        }
        if !element.activation {
            return Err(StoreError::InvalidState(StateKind::AlreadyInactive {
                element: element_code.to_string(),
            }));
        }

        self.elements[key.0].activation = false;
        self.hit_index.remove(key);
        debug!(element = %element_code, layer = %layer_code, "Element deactivated");

        self.persist_element(key)
    }

    /// Whether a disconnector element's status field holds the layer's open code
    pub(crate) fn is_open(&self, element_code: &str) -> Option<bool> {
        let element = self.element_by_code(element_code)?;
        let layer = self.layers.get(&element.layer_code)?;
        if !layer.is_disconnector {
            return None;
        }
        let open_code = layer.status_open_code()?;
        let status = element.field_value(layer.status_field_index()?)?;
        Some(value_as_code(&status) == Some(open_code))
    }
}

impl GeoStore {
    /// Create or update an element of `layer_code`.
    ///
    /// Rejected when the element belongs to another layer or the stored
    /// version is newer than `input.version`. An equal version reapplies.
    pub fn upsert_element(&self, layer_code: &str, input: &ElementUpdate) -> StoreResult<()> {
        self.write("upsert_element")?.apply_element(layer_code, input, true)
    }

    /// Soft-delete an element and evict it from the hit index
    pub fn remove_element(&self, layer_code: &str, element_code: &str, request_version: i64) -> StoreResult<()> {
        self.write("remove_element")?
            .remove_element(layer_code, element_code, request_version)
    }

    /// Replay element states for one layer under the usual rules, without
    /// revision-change notifications. An unknown layer loads nothing.
    pub fn load_elements(&self, layer_code: &str, elements: &[ElementUpdate]) -> StoreResult<LoadSummary> {
        let mut state = self.write("load_elements")?;
        let mut summary = LoadSummary::default();
        if !state.layers.contains_key(layer_code) {
            warn!(layer = %layer_code, count = elements.len(), "Elements for unknown layer skipped");
            return Ok(summary);
        }
        for element in elements {
            summary.record(&state.apply_element(layer_code, element, false));
        }
        info!(
            layer = %layer_code,
            applied = summary.applied,
            rejected = summary.rejected,
            unsaved = summary.unsaved,
            indexed = state.hit_index.len(),
            "Elements loaded"
        );
        Ok(summary)
    }

    pub fn element(&self, code: &str) -> StoreResult<Option<LayerElement>> {
        Ok(self.read("element")?.element_by_code(code).cloned())
    }

    pub fn element_by_id(&self, id: Uuid) -> StoreResult<Option<LayerElement>> {
        let state = self.read("element_by_id")?;
        Ok(state
            .element_by_id
            .get(&id)
            .and_then(|key| state.element(*key))
            .cloned())
    }

    /// Elements for the given codes, de-duplicated in first-seen order, skipping unknown codes
    pub fn elements_by_codes<I, S>(&self, codes: I) -> StoreResult<Vec<LayerElement>>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let state = self.read("elements_by_codes")?;
        let mut seen = HashSet::new();
        let mut result = Vec::new();
        for code in codes {
            let code = code.as_ref();
            if !seen.insert(code.to_string()) {
                continue;
            }
            if let Some(element) = state.element_by_code(code) {
                result.push(element.clone());
            }
        }
        Ok(result)
    }

    /// Every element of a layer, active or not, in creation order
    pub fn elements_of_layer(&self, layer_code: &str) -> StoreResult<Vec<LayerElement>> {
        let state = self.read("elements_of_layer")?;
        let Some(layer) = state.layers.get(layer_code) else {
            return Ok(Vec::new());
        };
        let Some(keys) = state.elements_by_layer.get(&layer.id) else {
            return Ok(Vec::new());
        };
        Ok(keys
            .par_iter()
            .filter_map(|key| state.element(*key).cloned())
            .collect())
    }

    /// Lazy walk over the elements of several layers with `version >= min_version`.
    ///
    /// Each step takes the read lock only while it looks up the next match, so
    /// the caller may query or mutate the store between steps. Elements added to
    /// a visited layer after the walk passed it are not seen. Each call starts a
    /// fresh walk.
    pub fn elements_since<I, S>(&self, layer_codes: I, min_version: i64) -> StoreResult<ElementsSince<'_>>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let state = self.read("elements_since")?;
        let owners = layer_codes
            .into_iter()
            .filter_map(|code| state.layers.get(code.as_ref()).map(|l| l.id))
            .collect();
        Ok(ElementsSince {
            store: self,
            owners,
            owner_pos: 0,
            item_pos: 0,
            min_version,
        })
    }

    /// Number of stored elements, including inactive ones
    pub fn element_count(&self) -> StoreResult<usize> {
        Ok(self.read("element_count")?.elements.len())
    }

    /// Whether a disconnector is open. `None` for unknown elements, elements
    /// of non-disconnector layers, or layers without a resolved status field.
    pub fn is_open(&self, element_code: &str) -> StoreResult<Option<bool>> {
        Ok(self.read("is_open")?.is_open(element_code))
    }
}

/// Iterator returned by [`GeoStore::elements_since`]
pub struct ElementsSince<'a> {
    store: &'a GeoStore,
    owners: Vec<Uuid>,
    owner_pos: usize,
    item_pos: usize,
    min_version: i64,
}

impl Iterator for ElementsSince<'_> {
    type Item = LayerElement;

    fn next(&mut self) -> Option<LayerElement> {
        let state = match self.store.read("elements_since") {
            Ok(state) => state,
            Err(err) => {
                warn!(error = %err, "Element walk stopped");
                self.owner_pos = self.owners.len();
                return None;
            }
        };

        while let Some(owner) = self.owners.get(self.owner_pos) {
            let keys = state
                .elements_by_layer
                .get(owner)
                .map(Vec::as_slice)
                .unwrap_or(&[]);
            while let Some(key) = keys.get(self.item_pos) {
                self.item_pos += 1;
                let Some(element) = state.element(*key) else {
                    continue;
                };
                if element.version >= self.min_version {
                    return Some(element.clone());
                }
            }
            self.owner_pos += 1;
            self.item_pos = 0;
        }
        None
    }
}
