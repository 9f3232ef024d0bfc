//! Spatial hit testing for traceable network elements
//!
//! # Submodules
//! - `index` - R-tree backed proximity index keyed by element arena slot
//! - `distance` - Exact point and segment distance tests

mod distance;
mod index;

pub use distance::{point_distance, point_segment_distance};
pub use index::{IndexedPart, SpatialHitIndex};
