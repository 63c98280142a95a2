//! Structural variants: simple intervals and breakend pairs.

use serde::{Deserialize, Serialize};

use crate::err::RecordError;

use super::coords::{GenomicRegion, Strand};

/// Type of a simple (non-breakend) structural variant.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumString,
)]
#[strum(serialize_all = "UPPERCASE")]
#[serde(rename_all = "UPPERCASE")]
pub enum VariantType {
    Del,
    Ins,
    Inv,
    Dup,
}

/// One side of a novel adjacency, a zero-length region plus the record id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Breakend {
    id: String,
    region: GenomicRegion,
}

impl Breakend {
    pub fn new(id: &str, region: GenomicRegion) -> Result<Self, RecordError> {
        if !region.is_empty() {
            return Err(RecordError::InvalidCoordinates {
                start: region.start(),
                end: region.end(),
            });
        }
        Ok(Self {
            id: id.to_owned(),
            region,
        })
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn region(&self) -> &GenomicRegion {
        &self.region
    }

    pub fn strand(&self) -> Strand {
        self.region.strand()
    }

    /// Zero-based position on the breakend's own strand.
    pub fn pos(&self) -> i32 {
        self.region.range_on_strand(self.region.strand()).start
    }
}

/// A deletion, insertion, inversion, or duplication on a single contig.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SimpleVariant {
    pub id: String,
    /// Affected reference span; zero-length for insertions.
    pub region: GenomicRegion,
    pub ref_allele: String,
    pub alt_allele: String,
    pub variant_type: VariantType,
    /// Number of inserted bases; only meaningful for insertions.
    pub inserted_length: i32,
}

/// Two joined breakends, e.g. a translocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BreakendVariant {
    pub event_id: String,
    pub left: Breakend,
    pub right: Breakend,
    /// REF allele on the strand of the left breakend.
    pub ref_allele: String,
    /// Sequence between `left` and `right` on the derived molecule.
    pub inserted_sequence: String,
}

/// A structural variant; immutable once constructed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Variant {
    Simple(SimpleVariant),
    Breakended(BreakendVariant),
}

impl Variant {
    pub fn id(&self) -> &str {
        match self {
            Variant::Simple(variant) => &variant.id,
            Variant::Breakended(variant) => &variant.event_id,
        }
    }

    /// Declared reference spans: one for simple variants, one per breakend otherwise.
    pub fn reference_spans(&self) -> Vec<GenomicRegion> {
        match self {
            Variant::Simple(variant) => vec![variant.region.with_strand(Strand::Positive)],
            Variant::Breakended(variant) => vec![
                variant.left.region().with_strand(Strand::Positive),
                variant.right.region().with_strand(Strand::Positive),
            ],
        }
    }
}

#[cfg(test)]
mod test {
    use std::sync::Arc;

    use pretty_assertions::assert_eq;

    use crate::model::coords::Contig;

    use super::*;

    #[test]
    fn breakend_must_be_empty() -> Result<(), anyhow::Error> {
        let contig = Arc::new(Contig::new(1, "1".to_owned(), 100));
        let region = GenomicRegion::zero_based(contig.clone(), Strand::Negative, 10, 10)?;
        let breakend = Breakend::new("bnd_1", region)?;
        assert_eq!(breakend.pos(), 10);
        assert_eq!(breakend.strand(), Strand::Negative);

        let region = GenomicRegion::zero_based(contig, Strand::Positive, 10, 11)?;
        assert!(Breakend::new("bnd_2", region).is_err());

        Ok(())
    }

    #[test]
    fn variant_type_from_str() -> Result<(), anyhow::Error> {
        assert_eq!("DEL".parse::<VariantType>()?, VariantType::Del);
        assert_eq!(VariantType::Dup.to_string(), "DUP");

        Ok(())
    }
}
