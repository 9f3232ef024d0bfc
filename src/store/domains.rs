//! Domain operations: UpsertDomainValue, LoadDomainValues and domain queries
//!
//! Domain values need a strictly newer version to change once they exist.

use tracing::{debug, info};

use super::errors::{StoreError, StoreResult};
use super::state::{domain_value_key, StoreState};
use super::{GeoStore, LoadSummary};
use crate::model::{normalize_key, Domain, DomainValue, DomainView};

impl StoreState {
    pub(crate) fn apply_domain_value(&mut self, input: &DomainValue, notify: bool) -> StoreResult<()> {
        self.clock.observe(input.version);

        let key = input.domain_key();
        let domain = self
            .domains
            .entry(key.clone())
            .or_insert_with(|| Domain::new(key.clone()));

        let (value, created) = domain.value_or_insert(input);
        if !created && value.version >= input.version {
            debug!(
                domain = %key,
                code = input.code,
                stored = value.version,
                requested = input.version,
                "Stale domain value rejected"
            );
            return Err(StoreError::stale(
                domain_value_key(&key, input.code),
                value.version,
                input.version,
            ));
        }

        let mut changed = created;
        changed |= value.activation != input.activation;
        value.activation = input.activation;
        changed |= value.value != input.value;
        value.value = input.value.clone();

        let version_moved = value.version != input.version;
        if version_moved {
            changed = true;
            value.version = input.version;
        }

        if version_moved {
            self.advance_revision(input.version, notify);
        }
        self.refresh_status_layers(&input.layer_code, &input.field_code);

        if changed {
            self.persist_domain_value(&key, input.code)
        } else {
            Ok(())
        }
    }

    /// Re-resolve the open-status code of layers that read this (layer, field) domain
    fn refresh_status_layers(&mut self, layer_code: &str, field_code: &str) {
        let is_wildcard = layer_code.trim().eq_ignore_ascii_case(self.wildcard.trim());
        let view = DomainView::new(&self.domains, &self.wildcard);
        for layer in self.layers.values_mut() {
            let reads_field = layer
                .operation_status_field_code
                .trim()
                .eq_ignore_ascii_case(field_code.trim());
            let same_layer = layer.code.trim().eq_ignore_ascii_case(layer_code.trim());
            if reads_field && (is_wildcard || same_layer) {
                layer.refresh_domain_state(&view);
            }
        }
    }
}

impl GeoStore {
    /// Create or update one coded value. Existing values need a strictly greater version.
    pub fn upsert_domain_value(&self, input: &DomainValue) -> StoreResult<()> {
        self.write("upsert_domain_value")?.apply_domain_value(input, true)
    }

    /// Replay domain values under the same rules, without revision-change notifications
    pub fn load_domain_values(&self, values: &[DomainValue]) -> StoreResult<LoadSummary> {
        let mut state = self.write("load_domain_values")?;
        let mut summary = LoadSummary::default();
        for value in values {
            summary.record(&state.apply_domain_value(value, false));
        }
        info!(
            applied = summary.applied,
            rejected = summary.rejected,
            unsaved = summary.unsaved,
            version = state.clock.current(),
            "Domain values loaded"
        );
        Ok(summary)
    }

    pub fn domains(&self) -> StoreResult<Vec<Domain>> {
        Ok(self.read("domains")?.domains.values().cloned().collect())
    }

    /// Domain by key; the key is trimmed and uppercased before lookup
    pub fn domain(&self, key: &str) -> StoreResult<Option<Domain>> {
        Ok(self.read("domain")?.domains.get(&normalize_key(key)).cloned())
    }

    /// Domain of (layer, field), falling back to the wildcard layer's domain for that field
    pub fn domain_for(&self, layer_code: &str, field_code: &str) -> StoreResult<Option<Domain>> {
        let state = self.read("domain_for")?;
        Ok(state.domain_view().domain(layer_code, field_code).cloned())
    }
}
