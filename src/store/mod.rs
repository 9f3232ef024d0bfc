//! The network entity store
//!
//! One `GeoStore` owns layers, domains, elements, the spatial hit index and the
//! revision clock behind a single reader/writer lock. Mutations hold the write
//! lock for their whole body, including index maintenance and the save
//! callback; queries only take the read lock.
//!
//! # Module Structure
//! - `state` - Lock-protected collections and persistence bookkeeping
//! - `layers` - Layer upserts and layer queries
//! - `domains` - Domain value upserts and domain queries
//! - `elements` - Element upserts, soft removal and element queries
//! - `routing` - Surface consumed by the external network tracer
//! - `clock` - Global revision tracking
//! - `config` - Store configuration
//! - `persistence` - Save callbacks
//! - `errors` - Error taxonomy

mod clock;
mod config;
mod domains;
mod elements;
mod errors;
mod layers;
mod persistence;
mod routing;
mod state;

pub use clock::{VersionClock, VersionSnapshot};
pub use config::{StoreConfig, DEFAULT_HIT_TOLERANCE, DEFAULT_SOURCE_LAYER, DEFAULT_WILDCARD_LAYER};
pub use elements::ElementsSince;
pub use errors::{ConflictKind, EntityKind, StateKind, StoreError, StoreResult};
pub use persistence::{FnPersistence, Persistence};
pub use routing::TraceSession;
pub use state::DirtyEntity;

use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};
use tracing::info;

use crate::model::{DisplaynameRenderer, DomainView, FormatRenderer};
use state::StoreState;

/// Outcome of a bulk load.
///
/// `applied` counts entities now in memory, including those whose save
/// callback failed; those are also counted in `unsaved`. `rejected` counts
/// entities turned away by the update rules.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoadSummary {
    pub applied: usize,
    pub rejected: usize,
    pub unsaved: usize,
}

impl LoadSummary {
    pub(crate) fn record<T>(&mut self, outcome: &StoreResult<T>) {
        match outcome {
            Ok(_) => self.applied += 1,
            Err(StoreError::Persistence { .. }) => {
                self.applied += 1;
                self.unsaved += 1;
            }
            Err(_) => self.rejected += 1,
        }
    }
}

pub struct GeoStore {
    config: StoreConfig,
    state: RwLock<StoreState>,
}

impl GeoStore {
    pub fn new(config: StoreConfig) -> Self {
        Self::with_renderer(config, Arc::new(FormatRenderer))
    }

    /// Create a store with a custom element display-name renderer
    pub fn with_renderer(config: StoreConfig, renderer: Arc<dyn DisplaynameRenderer>) -> Self {
        info!(
            hit_tolerance = config.hit_tolerance,
            source_layer = %config.source_layer_code,
            "Geo store created"
        );
        let state = StoreState::new(&config, renderer);
        Self {
            config,
            state: RwLock::new(state),
        }
    }

    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    pub(crate) fn read(&self, operation: &'static str) -> StoreResult<RwLockReadGuard<'_, StoreState>> {
        self.state
            .read()
            .map_err(|_| StoreError::LockPoisoned(operation))
    }

    pub(crate) fn write(&self, operation: &'static str) -> StoreResult<RwLockWriteGuard<'_, StoreState>> {
        self.state
            .write()
            .map_err(|_| StoreError::LockPoisoned(operation))
    }

    /// Start a fresh initialization: clear every collection and the index,
    /// reset the revision to zero and detach persistence.
    pub fn begin_initial(&self) -> StoreResult<()> {
        self.write("begin_initial")?.reset();
        info!("Initial load started");
        Ok(())
    }

    /// Finish initialization and attach persistence. Later mutations are saved.
    pub fn end_initial(&self, persistence: impl Persistence + 'static) -> StoreResult<()> {
        self.attach_persistence(Arc::new(persistence))
    }

    pub fn attach_persistence(&self, persistence: Arc<dyn Persistence>) -> StoreResult<()> {
        let mut state = self.write("end_initial")?;
        state.persistence = Some(persistence);

        // Domains usually arrive after their layers during a load
        let StoreState {
            layers,
            domains,
            wildcard,
            ..
        } = &mut *state;
        let view = DomainView::new(domains, wildcard.as_str());
        for layer in layers.values_mut() {
            layer.refresh_domain_state(&view);
        }

        info!(
            layers = state.layers.len(),
            domains = state.domains.len(),
            elements = state.elements.len(),
            indexed = state.hit_index.len(),
            version = state.clock.current(),
            "Initial load finished"
        );
        Ok(())
    }

    pub fn version(&self) -> StoreResult<i64> {
        Ok(self.read("version")?.clock.current())
    }

    /// Current revision, last requested revision and milliseconds since that request, read together
    pub fn version_snapshot(&self) -> StoreResult<VersionSnapshot> {
        Ok(self.read("version_snapshot")?.clock.snapshot())
    }

    pub fn version_time_text(&self) -> StoreResult<String> {
        let version = self.version()?;
        Ok(VersionClock::time_text(version).unwrap_or_default())
    }

    /// Entities whose last save failed, in kind/key order
    pub fn dirty_entities(&self) -> StoreResult<Vec<DirtyEntity>> {
        Ok(self.read("dirty_entities")?.dirty.iter().cloned().collect())
    }
}

impl Default for GeoStore {
    fn default() -> Self {
        Self::new(StoreConfig::default())
    }
}
