//! Routing boundary consumed by an external network tracer
//!
//! The store never walks the network. It serves trace sources, answers
//! proximity queries and keeps the per-element `routed` flag.
//!
//! `GeoStore::routing_hit_test` takes the read lock per call, so writers may
//! interleave between two hits of the same trace. A tracer that needs a stable
//! view for the whole walk opens a [`TraceSession`], which holds the write lock
//! until dropped.

use rayon::prelude::*;
use std::collections::HashSet;
use std::sync::RwLockWriteGuard;
use tracing::{debug, info};
use uuid::Uuid;

use super::errors::{EntityKind, StoreError, StoreResult};
use super::state::StoreState;
use super::GeoStore;
use crate::model::LayerElement;

impl StoreState {
    pub(crate) fn reset_routing(&mut self) {
        self.elements.par_iter_mut().for_each(|e| e.routed = false);
    }

    /// Every element owned by the source layer, active or not
    pub(crate) fn routing_sources(&self, source_layer_code: &str) -> Vec<LayerElement> {
        let Some(layer) = self.layers.get(source_layer_code) else {
            return Vec::new();
        };
        self.elements_by_layer
            .get(&layer.id)
            .map(|keys| keys.iter().filter_map(|k| self.element(*k).cloned()).collect())
            .unwrap_or_default()
    }

    pub(crate) fn hit_test(
        &self,
        latitude: f64,
        longitude: f64,
        result: &mut Vec<LayerElement>,
        exclude_routed: bool,
    ) -> usize {
        self.hit_index
            .hit_test(latitude, longitude, |key| self.element(key), result, exclude_routed)
    }

    /// Codes of active elements on electrical layers the tracer never reached
    pub(crate) fn not_routed_codes(&self) -> Vec<String> {
        let electrical: HashSet<Uuid> = self
            .layers
            .values()
            .filter(|l| l.is_electrical)
            .map(|l| l.id)
            .collect();
        self.elements
            .par_iter()
            .filter(|e| e.activation && !e.routed && electrical.contains(&e.layer_id))
            .map(|e| e.code.clone())
            .collect()
    }

    pub(crate) fn set_routed(&mut self, code: &str, routed: bool) -> StoreResult<()> {
        let Some(key) = self.element_by_code.get(code).copied() else {
            return Err(StoreError::not_found(EntityKind::Element, code));
        };
        self.elements[key.0].routed = routed;
        Ok(())
    }
}

impl GeoStore {
    /// Clear the `routed` flag on every element
    pub fn reset_routing(&self) -> StoreResult<()> {
        let mut state = self.write("reset_routing")?;
        state.reset_routing();
        debug!(elements = state.elements.len(), "Routing flags reset");
        Ok(())
    }

    /// Elements of the configured source layer, the entry points of a trace
    pub fn routing_sources(&self) -> StoreResult<Vec<LayerElement>> {
        Ok(self
            .read("routing_sources")?
            .routing_sources(&self.config().source_layer_code))
    }

    /// Append every indexed element within tolerance of the coordinate to
    /// `result`; returns how many were appended
    pub fn routing_hit_test(
        &self,
        latitude: f64,
        longitude: f64,
        result: &mut Vec<LayerElement>,
        exclude_routed: bool,
    ) -> StoreResult<usize> {
        Ok(self
            .read("routing_hit_test")?
            .hit_test(latitude, longitude, result, exclude_routed))
    }

    pub fn not_routed_codes(&self) -> StoreResult<Vec<String>> {
        Ok(self.read("not_routed_codes")?.not_routed_codes())
    }

    pub fn set_routed(&self, code: &str, routed: bool) -> StoreResult<()> {
        self.write("set_routed")?.set_routed(code, routed)
    }

    /// Take the write lock for a whole trace
    pub fn begin_trace(&self) -> StoreResult<TraceSession<'_>> {
        let state = self.write("begin_trace")?;
        Ok(TraceSession {
            state,
            source_layer_code: &self.config().source_layer_code,
            marked: 0,
        })
    }
}

/// Exclusive view of the store for one trace. Writers wait until it is dropped.
pub struct TraceSession<'a> {
    state: RwLockWriteGuard<'a, StoreState>,
    source_layer_code: &'a str,
    marked: usize,
}

impl TraceSession<'_> {
    pub fn sources(&self) -> Vec<LayerElement> {
        self.state.routing_sources(self.source_layer_code)
    }

    pub fn hit_test(
        &self,
        latitude: f64,
        longitude: f64,
        result: &mut Vec<LayerElement>,
        exclude_routed: bool,
    ) -> usize {
        self.state.hit_test(latitude, longitude, result, exclude_routed)
    }

    pub fn mark_routed(&mut self, code: &str) -> StoreResult<()> {
        self.state.set_routed(code, true)?;
        self.marked += 1;
        Ok(())
    }

    /// `None` for an unknown code
    pub fn is_routed(&self, code: &str) -> Option<bool> {
        self.state.element_by_code(code).map(|e| e.routed)
    }

    pub fn is_open(&self, element_code: &str) -> Option<bool> {
        self.state.is_open(element_code)
    }

    pub fn not_routed_codes(&self) -> Vec<String> {
        self.state.not_routed_codes()
    }

    pub fn reset_routing(&mut self) {
        self.state.reset_routing();
        self.marked = 0;
    }
}

impl Drop for TraceSession<'_> {
    fn drop(&mut self) {
        info!(marked = self.marked, "Trace session finished");
    }
}
