//! In-memory store for a layered electrical-network geospatial model
//!
//! Layers describe a class of network feature and its field schema, domains
//! map coded field values to text, and elements carry geometry plus versioned
//! field data. A [`GeoStore`] keeps all of them behind one reader/writer lock
//! together with a spatial hit index over traceable elements and the global
//! revision clock.
//!
//! # Modules
//! - `model` - Layers, domains, elements and display-name rendering
//! - `spatial` - Proximity index and distance tests
//! - `store` - The locked store, its version rules and the routing boundary
//!
//! # Example
//! ```
//! use geo_store::{ElementUpdate, GeoStore, GeographyType, Layer};
//!
//! let store = GeoStore::default();
//! let mut poles = Layer::new("POLE", GeographyType::Point);
//! poles.is_electrical = true;
//! store.upsert_layer(&poles).unwrap();
//! store.upsert_element("POLE", &ElementUpdate::new("P1", 1).at(10.0, 20.0)).unwrap();
//!
//! let mut hits = Vec::new();
//! assert_eq!(store.routing_hit_test(10.0, 20.0, &mut hits, false).unwrap(), 1);
//! assert_eq!(hits[0].code, "P1");
//! ```

pub mod model;
pub mod spatial;
pub mod store;

pub use model::{
    Coordinate,
    DisplaynameRenderer,
    Domain,
    DomainValue,
    ElementUpdate,
    FormatRenderer,
    GeographyType,
    Layer,
    LayerElement,
    LayerField,
};

pub use store::{
    DirtyEntity,
    FnPersistence,
    GeoStore,
    LoadSummary,
    Persistence,
    StoreConfig,
    StoreError,
    StoreResult,
    TraceSession,
    VersionSnapshot,
};
