//! Persistence seam
//!
//! The store hands every successfully mutated entity to a save callback while
//! still holding the write lock. Backends report failure through `anyhow`;
//! the store surfaces it to the caller and marks the entity dirty.

use crate::model::{DomainValue, Layer, LayerElement};

/// Durable sink for mutated entities
pub trait Persistence: Send + Sync {
    fn save_layer(&self, layer: &Layer) -> anyhow::Result<()>;
    fn save_domain_value(&self, value: &DomainValue) -> anyhow::Result<()>;
    fn save_element(&self, element: &LayerElement) -> anyhow::Result<()>;
}

type SaveFn<T> = Box<dyn Fn(&T) -> anyhow::Result<()> + Send + Sync>;

/// Persistence built from three standalone callbacks, one per entity kind
pub struct FnPersistence {
    layer: SaveFn<Layer>,
    domain_value: SaveFn<DomainValue>,
    element: SaveFn<LayerElement>,
}

impl FnPersistence {
    pub fn new<L, D, E>(save_layer: L, save_domain_value: D, save_element: E) -> Self
    where
        L: Fn(&Layer) -> anyhow::Result<()> + Send + Sync + 'static,
        D: Fn(&DomainValue) -> anyhow::Result<()> + Send + Sync + 'static,
        E: Fn(&LayerElement) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        Self {
            layer: Box::new(save_layer),
            domain_value: Box::new(save_domain_value),
            element: Box::new(save_element),
        }
    }
}

impl Persistence for FnPersistence {
    fn save_layer(&self, layer: &Layer) -> anyhow::Result<()> {
        (self.layer)(layer)
    }

    fn save_domain_value(&self, value: &DomainValue) -> anyhow::Result<()> {
        (self.domain_value)(value)
    }

    fn save_element(&self, element: &LayerElement) -> anyhow::Result<()> {
        (self.element)(element)
    }
}
