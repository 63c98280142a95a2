//! Data model shared by parsing, indexing, and prioritization.

pub mod coords;
pub mod features;
pub mod variant;

pub use coords::{
    ConfidenceInterval, Contig, CoordinateSystem, Coordinates, GenomicAssembly, GenomicRegion,
    Strand,
};
pub use features::{Enhancer, Gene, Located, TadBoundary, TermId, Transcript};
pub use variant::{Breakend, BreakendVariant, SimpleVariant, Variant, VariantType};
