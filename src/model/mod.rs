//! Data model for the layered network store
//!
//! # Submodules
//! - `layer` - Layer schema, fields and geography type
//! - `domain` - Coded-value domains with wildcard fallback
//! - `element` - Layer elements, coordinates and update inputs
//! - `displayname` - Pluggable element display-name rendering

mod displayname;
mod domain;
mod element;
mod layer;

pub use layer::{GeographyType, Layer, LayerField};

pub use domain::{domain_key, normalize_key, Domain, DomainValue, DomainView};

pub use element::{
    value_as_code,
    value_as_text,
    Coordinate,
    ElementKey,
    ElementUpdate,
    LayerElement,
};

pub use displayname::{DisplaynameRenderer, FormatRenderer};
