//! Annotation features: genes with transcripts, enhancers, and TAD boundaries.

use std::{fmt, ops::Range};

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::err::RecordError;

use super::coords::{range_contains, Coordinates, GenomicRegion, Strand};

/// Identifier of an ontology term, e.g. `HP:0001250` or `UBERON:0000955`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TermId(String);

impl TermId {
    pub fn new(value: &str) -> Self {
        Self(value.to_owned())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for TermId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl fmt::Display for TermId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A feature with an identifier and a location on the genome.
pub trait Located {
    fn id(&self) -> &str;
    fn location(&self) -> &GenomicRegion;
}

/// Transcript with exons and optional coding region.
///
/// Exon and CDS coordinates are on the strand of `location`.
#[derive(Debug, Clone, PartialEq)]
pub struct Transcript {
    pub accession: String,
    pub location: GenomicRegion,
    exons: Vec<Coordinates>,
    cds: Option<Coordinates>,
}

impl Transcript {
    pub fn new(
        accession: &str,
        location: GenomicRegion,
        exons: Vec<Coordinates>,
        cds: Option<Coordinates>,
    ) -> Result<Self, RecordError> {
        let tx_range = location.coordinates().range();
        if let Some(bad) = exons
            .iter()
            .chain(cds.iter())
            .find(|c| !range_contains(&tx_range, &c.range()))
        {
            return Err(RecordError::InvalidCoordinates {
                start: bad.start(),
                end: bad.end(),
            });
        }
        let mut exons = exons;
        exons.sort_by_key(|exon| exon.range().start);
        Ok(Self {
            accession: accession.to_owned(),
            location,
            exons,
            cds,
        })
    }

    pub fn strand(&self) -> Strand {
        self.location.strand()
    }

    pub fn is_coding(&self) -> bool {
        self.cds.is_some()
    }

    fn on_strand(&self, coordinates: &Coordinates, strand: Strand) -> Range<i32> {
        if strand == self.strand() {
            coordinates.range()
        } else {
            coordinates.invert(self.location.contig().length).range()
        }
    }

    /// Zero-based exon ranges on `strand`, sorted by start on that strand.
    pub fn exon_ranges(&self, strand: Strand) -> Vec<Range<i32>> {
        let mut result = self
            .exons
            .iter()
            .map(|exon| self.on_strand(exon, strand))
            .collect::<Vec<_>>();
        result.sort_by_key(|range| range.start);
        result
    }

    /// Zero-based coding range on `strand`, `None` for non-coding transcripts.
    pub fn cds_range(&self, strand: Strand) -> Option<Range<i32>> {
        self.cds.as_ref().map(|cds| self.on_strand(cds, strand))
    }

    /// The `length` bases 5' of the transcript start, on the transcript strand.
    pub fn promoter_range(&self, length: i32) -> Range<i32> {
        let tx_start = self.location.start_on_strand(self.strand());
        (tx_start - length).max(0)..tx_start
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Gene {
    pub accession: String,
    pub symbol: String,
    pub location: GenomicRegion,
    pub transcripts: Vec<Transcript>,
}

impl Located for Gene {
    fn id(&self) -> &str {
        &self.accession
    }

    fn location(&self) -> &GenomicRegion {
        &self.location
    }
}

/// Enhancer with tissue specificity scores keyed by anatomy term.
#[derive(Debug, Clone, PartialEq)]
pub struct Enhancer {
    pub id: String,
    pub location: GenomicRegion,
    pub tissues: IndexMap<TermId, f64>,
}

impl Located for Enhancer {
    fn id(&self) -> &str {
        &self.id
    }

    fn location(&self) -> &GenomicRegion {
        &self.location
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TadBoundary {
    pub id: String,
    pub location: GenomicRegion,
    /// Fraction of cell types in which the boundary is observed.
    pub stability: f64,
}

impl TadBoundary {
    /// Zero-based midpoint on the positive strand.
    pub fn midpoint(&self) -> i32 {
        let range = self.location.range_on_strand(Strand::Positive);
        range.start + (range.end - range.start) / 2
    }
}

impl Located for TadBoundary {
    fn id(&self) -> &str {
        &self.id
    }

    fn location(&self) -> &GenomicRegion {
        &self.location
    }
}

#[cfg(test)]
mod test {
    use std::sync::Arc;

    use pretty_assertions::assert_eq;

    use crate::model::coords::Contig;

    use super::*;

    fn transcript(strand: Strand) -> Result<Transcript, anyhow::Error> {
        let contig = Arc::new(Contig::new(1, "1".to_owned(), 1000));
        Ok(Transcript::new(
            "TX1",
            GenomicRegion::zero_based(contig, strand, 100, 400)?,
            vec![
                Coordinates::zero_based(380, 400)?,
                Coordinates::zero_based(100, 120)?,
                Coordinates::zero_based(240, 260)?,
            ],
            Some(Coordinates::zero_based(110, 390)?),
        )?)
    }

    #[test]
    fn exons_sorted_and_flipped() -> Result<(), anyhow::Error> {
        let tx = transcript(Strand::Positive)?;

        assert_eq!(
            tx.exon_ranges(Strand::Positive),
            vec![100..120, 240..260, 380..400]
        );
        assert_eq!(
            tx.exon_ranges(Strand::Negative),
            vec![600..620, 740..760, 880..900]
        );
        assert_eq!(tx.cds_range(Strand::Negative), Some(610..890));

        Ok(())
    }

    #[rstest::rstest]
    #[case(Strand::Positive, 50, 50..100)]
    #[case(Strand::Positive, 500, 0..100)]
    #[case(Strand::Negative, 50, 50..100)]
    fn promoter_range(
        #[case] strand: Strand,
        #[case] length: i32,
        #[case] expected: Range<i32>,
    ) -> Result<(), anyhow::Error> {
        assert_eq!(transcript(strand)?.promoter_range(length), expected);

        Ok(())
    }

    #[test]
    fn exon_outside_transcript() -> Result<(), anyhow::Error> {
        let contig = Arc::new(Contig::new(1, "1".to_owned(), 1000));
        let result = Transcript::new(
            "TX1",
            GenomicRegion::zero_based(contig, Strand::Positive, 100, 400)?,
            vec![Coordinates::zero_based(90, 120)?],
            None,
        );
        assert!(result.is_err());

        Ok(())
    }

    #[test]
    fn tad_boundary_midpoint() -> Result<(), anyhow::Error> {
        let contig = Arc::new(Contig::new(1, "1".to_owned(), 1000));
        let tad = TadBoundary {
            id: "tad".to_owned(),
            location: GenomicRegion::zero_based(contig, Strand::Negative, 100, 200)?,
            stability: 0.5,
        };
        assert_eq!(tad.midpoint(), 850);

        Ok(())
    }
}
