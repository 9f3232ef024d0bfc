//! Lock-protected store state
//!
//! Everything in here is only touched through the `GeoStore` lock. Elements
//! live in an arena (`Vec`) and are referenced everywhere else, including the
//! spatial index, by `ElementKey`.

use indexmap::IndexMap;
use serde::Serialize;
use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;
use tracing::{info, warn};
use uuid::Uuid;

use super::clock::VersionClock;
use super::config::StoreConfig;
use super::errors::{EntityKind, StoreError, StoreResult};
use super::persistence::Persistence;
use crate::model::{DisplaynameRenderer, Domain, DomainView, ElementKey, Layer, LayerElement};
use crate::spatial::SpatialHitIndex;

/// An entity whose last save callback failed
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct DirtyEntity {
    pub kind: EntityKind,
    pub key: String,
}

/// Key used for a domain value in errors and the dirty set
pub(crate) fn domain_value_key(domain_key: &str, code: i64) -> String {
    format!("{}#{}", domain_key, code)
}

pub(crate) struct StoreState {
    pub layers: IndexMap<String, Layer>,
    pub domains: IndexMap<String, Domain>,
    pub elements: Vec<LayerElement>,
    pub element_by_code: HashMap<String, ElementKey>,
    pub element_by_id: HashMap<Uuid, ElementKey>,
    pub elements_by_layer: HashMap<Uuid, Vec<ElementKey>>,
    pub hit_index: SpatialHitIndex,
    pub clock: VersionClock,
    pub persistence: Option<Arc<dyn Persistence>>,
    pub renderer: Arc<dyn DisplaynameRenderer>,
    pub dirty: BTreeSet<DirtyEntity>,
    pub wildcard: String,
}

impl StoreState {
    pub fn new(config: &StoreConfig, renderer: Arc<dyn DisplaynameRenderer>) -> Self {
        Self {
            layers: IndexMap::new(),
            domains: IndexMap::new(),
            elements: Vec::new(),
            element_by_code: HashMap::new(),
            element_by_id: HashMap::new(),
            elements_by_layer: HashMap::new(),
            hit_index: SpatialHitIndex::new(config.hit_tolerance),
            clock: VersionClock::new(),
            persistence: None,
            renderer,
            dirty: BTreeSet::new(),
            wildcard: config.wildcard_layer_code.clone(),
        }
    }

    /// Drop every entity, the index and the revision; detach persistence
    pub fn reset(&mut self) {
        self.layers.clear();
        self.domains.clear();
        self.elements.clear();
        self.element_by_code.clear();
        self.element_by_id.clear();
        self.elements_by_layer.clear();
        self.hit_index.clear();
        self.clock.reset();
        self.persistence = None;
        self.dirty.clear();
    }

    pub fn domain_view(&self) -> DomainView<'_> {
        DomainView::new(&self.domains, &self.wildcard)
    }

    pub fn element(&self, key: ElementKey) -> Option<&LayerElement> {
        self.elements.get(key.0)
    }

    pub fn element_by_code(&self, code: &str) -> Option<&LayerElement> {
        self.element_by_code.get(code).and_then(|key| self.element(*key))
    }

    /// Raise the global revision; logs unless running a bulk load
    pub fn advance_revision(&mut self, version: i64, notify: bool) {
        if self.clock.advance(version) && notify {
            info!(
                version,
                at = VersionClock::time_text(version).unwrap_or_default(),
                "Repository version changed"
            );
        }
    }

    pub fn persist_layer(&mut self, code: &str) -> StoreResult<()> {
        let outcome = match (&self.persistence, self.layers.get(code)) {
            (Some(sink), Some(layer)) => Some(sink.save_layer(layer)),
            _ => None,
        };
        self.settle(EntityKind::Layer, code.to_string(), outcome)
    }

    pub fn persist_domain_value(&mut self, domain_key: &str, code: i64) -> StoreResult<()> {
        let value = self.domains.get(domain_key).and_then(|d| d.get_value(code));
        let outcome = match (&self.persistence, value) {
            (Some(sink), Some(value)) => Some(sink.save_domain_value(value)),
            _ => None,
        };
        self.settle(EntityKind::DomainValue, domain_value_key(domain_key, code), outcome)
    }

    pub fn persist_element(&mut self, key: ElementKey) -> StoreResult<()> {
        let element = self.elements.get(key.0);
        let outcome = match (&self.persistence, element) {
            (Some(sink), Some(element)) => Some(sink.save_element(element)),
            _ => None,
        };
        let code = element.map(|e| e.code.clone()).unwrap_or_default();
        self.settle(EntityKind::Element, code, outcome)
    }

    /// Fold a save outcome into the dirty set. `None` means persistence is detached.
    fn settle(
        &mut self,
        kind: EntityKind,
        key: String,
        outcome: Option<anyhow::Result<()>>,
    ) -> StoreResult<()> {
        match outcome {
            None => Ok(()),
            Some(Ok(())) => {
                self.dirty.remove(&DirtyEntity { kind, key });
                Ok(())
            }
            Some(Err(err)) => {
                let message = format!("{:#}", err);
                warn!(%kind, key = %key, error = %message, "Persisting entity failed");
                self.dirty.insert(DirtyEntity {
                    kind,
                    key: key.clone(),
                });
                Err(StoreError::Persistence { kind, key, message })
            }
        }
    }
}
