//! Contigs, strands, coordinate systems, and genomic regions.
//!
//! Positions are `i32`, like everywhere else in the crate. Internally most algorithms
//! work on zero-based, half-open `Range<i32>` values on an explicitly chosen strand; the
//! helpers here convert regions into that representation.

use std::{collections::HashMap, ops::Range, sync::Arc};

use serde::{Deserialize, Serialize};

use crate::{
    common::{build_chrom_map, GenomeRelease},
    err::RecordError,
};

/// A reference sequence, shared between all regions located on it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, derive_new::new)]
pub struct Contig {
    /// Numeric identifier, unique within the assembly.
    pub id: u32,
    /// Primary name, e.g., `"1"` or `"chr1"`.
    pub name: String,
    /// Length in base pairs.
    pub length: i32,
}

/// Strand of a region.
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumString,
)]
pub enum Strand {
    #[default]
    #[strum(serialize = "+")]
    #[serde(rename = "+")]
    Positive,
    #[strum(serialize = "-")]
    #[serde(rename = "-")]
    Negative,
}

impl Strand {
    pub fn opposite(self) -> Self {
        match self {
            Strand::Positive => Strand::Negative,
            Strand::Negative => Strand::Positive,
        }
    }

    pub fn is_positive(self) -> bool {
        self == Strand::Positive
    }
}

/// Coordinate system of a region.
///
/// Zero-based regions are half-open, one-based regions are fully closed, so the end
/// position is the same number in both systems and only the start moves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CoordinateSystem {
    ZeroBased,
    OneBased,
}

impl CoordinateSystem {
    /// Value to add to a start position when converting from `self` to `target`.
    pub fn start_delta(self, target: CoordinateSystem) -> i32 {
        match (self, target) {
            (CoordinateSystem::ZeroBased, CoordinateSystem::OneBased) => 1,
            (CoordinateSystem::OneBased, CoordinateSystem::ZeroBased) => -1,
            _ => 0,
        }
    }
}

/// Confidence interval around a position as `(lower, upper)` offsets, e.g. `CIPOS=-10,20`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ConfidenceInterval {
    pub lower: i32,
    pub upper: i32,
}

impl ConfidenceInterval {
    pub fn new(lower: i32, upper: i32) -> Self {
        Self { lower, upper }
    }

    pub fn precise() -> Self {
        Self::default()
    }

    /// The interval as seen from the opposite strand.
    pub fn invert(&self) -> Self {
        Self {
            lower: -self.upper,
            upper: -self.lower,
        }
    }
}

/// Start/end coordinates in a declared coordinate system.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Coordinates {
    coordinate_system: CoordinateSystem,
    start: i32,
    end: i32,
    start_ci: ConfidenceInterval,
    end_ci: ConfidenceInterval,
}

impl Coordinates {
    /// Construct precise coordinates, `end` must not be before `start`.
    pub fn new(
        coordinate_system: CoordinateSystem,
        start: i32,
        end: i32,
    ) -> Result<Self, RecordError> {
        if start + coordinate_system.start_delta(CoordinateSystem::ZeroBased) > end {
            return Err(RecordError::InvalidCoordinates { start, end });
        }
        Ok(Self {
            coordinate_system,
            start,
            end,
            start_ci: ConfidenceInterval::precise(),
            end_ci: ConfidenceInterval::precise(),
        })
    }

    pub fn zero_based(start: i32, end: i32) -> Result<Self, RecordError> {
        Self::new(CoordinateSystem::ZeroBased, start, end)
    }

    pub fn one_based(start: i32, end: i32) -> Result<Self, RecordError> {
        Self::new(CoordinateSystem::OneBased, start, end)
    }

    pub fn with_confidence(self, start_ci: ConfidenceInterval, end_ci: ConfidenceInterval) -> Self {
        Self {
            start_ci,
            end_ci,
            ..self
        }
    }

    pub fn coordinate_system(&self) -> CoordinateSystem {
        self.coordinate_system
    }

    pub fn start(&self) -> i32 {
        self.start
    }

    pub fn end(&self) -> i32 {
        self.end
    }

    pub fn start_ci(&self) -> ConfidenceInterval {
        self.start_ci
    }

    pub fn end_ci(&self) -> ConfidenceInterval {
        self.end_ci
    }

    pub fn length(&self) -> i32 {
        self.end - self.start_with(CoordinateSystem::ZeroBased)
    }

    pub fn start_with(&self, coordinate_system: CoordinateSystem) -> i32 {
        self.start + self.coordinate_system.start_delta(coordinate_system)
    }

    pub fn end_with(&self, _coordinate_system: CoordinateSystem) -> i32 {
        self.end
    }

    pub fn with_coordinate_system(&self, coordinate_system: CoordinateSystem) -> Self {
        Self {
            coordinate_system,
            start: self.start_with(coordinate_system),
            ..*self
        }
    }

    /// The same bases counted from the other end of a contig with `contig_length` bases.
    pub fn invert(&self, contig_length: i32) -> Self {
        let zero_start = contig_length - self.end;
        Self {
            coordinate_system: self.coordinate_system,
            start: zero_start + CoordinateSystem::ZeroBased.start_delta(self.coordinate_system),
            end: contig_length - self.start_with(CoordinateSystem::ZeroBased),
            start_ci: self.end_ci.invert(),
            end_ci: self.start_ci.invert(),
        }
    }

    /// Zero-based, half-open range.
    pub fn range(&self) -> Range<i32> {
        self.start_with(CoordinateSystem::ZeroBased)..self.end
    }
}

/// Zero-based overlap test that also handles empty ranges.
///
/// An empty range at `p` sits between bases `p - 1` and `p` and only overlaps
/// non-empty ranges that have bases on both sides of it.
pub fn ranges_overlap(lhs: &Range<i32>, rhs: &Range<i32>) -> bool {
    match (lhs.is_empty(), rhs.is_empty()) {
        (false, false) => lhs.start < rhs.end && rhs.start < lhs.end,
        (true, false) => rhs.start < lhs.start && lhs.start < rhs.end,
        (false, true) => lhs.start < rhs.start && rhs.start < lhs.end,
        (true, true) => lhs.start == rhs.start,
    }
}

/// Intersection of two overlapping ranges, `None` if they do not overlap.
pub fn intersect(lhs: &Range<i32>, rhs: &Range<i32>) -> Option<Range<i32>> {
    if !ranges_overlap(lhs, rhs) {
        None
    } else if lhs.is_empty() {
        Some(lhs.clone())
    } else if rhs.is_empty() {
        Some(rhs.clone())
    } else {
        Some(lhs.start.max(rhs.start)..lhs.end.min(rhs.end))
    }
}

/// Whether `outer` contains `inner`.
pub fn range_contains(outer: &Range<i32>, inner: &Range<i32>) -> bool {
    outer.start <= inner.start && inner.end <= outer.end
}

/// A stranded interval on a contig.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct GenomicRegion {
    contig: Arc<Contig>,
    strand: Strand,
    coordinates: Coordinates,
}

impl GenomicRegion {
    pub fn new(
        contig: Arc<Contig>,
        strand: Strand,
        coordinates: Coordinates,
    ) -> Result<Self, RecordError> {
        let range = coordinates.range();
        if range.start < 0 || range.end > contig.length {
            return Err(RecordError::InvalidCoordinates {
                start: coordinates.start(),
                end: coordinates.end(),
            });
        }
        Ok(Self {
            contig,
            strand,
            coordinates,
        })
    }

    pub fn zero_based(
        contig: Arc<Contig>,
        strand: Strand,
        start: i32,
        end: i32,
    ) -> Result<Self, RecordError> {
        Self::new(contig, strand, Coordinates::zero_based(start, end)?)
    }

    pub fn one_based(
        contig: Arc<Contig>,
        strand: Strand,
        start: i32,
        end: i32,
    ) -> Result<Self, RecordError> {
        Self::new(contig, strand, Coordinates::one_based(start, end)?)
    }

    /// Build a region from a zero-based range on `strand`, used by internal algorithms
    /// whose ranges are derived from already-validated regions.
    pub(crate) fn from_range(contig: Arc<Contig>, strand: Strand, range: Range<i32>) -> Self {
        let start = range.start.clamp(0, contig.length);
        let end = range.end.clamp(start, contig.length);
        Self {
            contig,
            strand,
            coordinates: Coordinates {
                coordinate_system: CoordinateSystem::ZeroBased,
                start,
                end,
                start_ci: ConfidenceInterval::precise(),
                end_ci: ConfidenceInterval::precise(),
            },
        }
    }

    pub fn contig(&self) -> &Arc<Contig> {
        &self.contig
    }

    pub fn contig_id(&self) -> u32 {
        self.contig.id
    }

    pub fn strand(&self) -> Strand {
        self.strand
    }

    pub fn coordinates(&self) -> &Coordinates {
        &self.coordinates
    }

    pub fn coordinate_system(&self) -> CoordinateSystem {
        self.coordinates.coordinate_system()
    }

    pub fn start(&self) -> i32 {
        self.coordinates.start()
    }

    pub fn end(&self) -> i32 {
        self.coordinates.end()
    }

    pub fn length(&self) -> i32 {
        self.coordinates.length()
    }

    pub fn is_empty(&self) -> bool {
        self.length() == 0
    }

    pub fn with_strand(&self, strand: Strand) -> Self {
        if strand == self.strand {
            self.clone()
        } else {
            Self {
                contig: self.contig.clone(),
                strand,
                coordinates: self.coordinates.invert(self.contig.length),
            }
        }
    }

    pub fn with_coordinate_system(&self, coordinate_system: CoordinateSystem) -> Self {
        Self {
            contig: self.contig.clone(),
            strand: self.strand,
            coordinates: self.coordinates.with_coordinate_system(coordinate_system),
        }
    }

    /// Zero-based, half-open range on the given strand.
    pub fn range_on_strand(&self, strand: Strand) -> Range<i32> {
        self.with_strand(strand).coordinates.range()
    }

    pub fn start_on_strand(&self, strand: Strand) -> i32 {
        self.range_on_strand(strand).start
    }

    pub fn end_on_strand(&self, strand: Strand) -> i32 {
        self.range_on_strand(strand).end
    }

    pub fn overlaps_with(&self, other: &GenomicRegion) -> bool {
        self.contig.id == other.contig.id
            && ranges_overlap(
                &self.range_on_strand(Strand::Positive),
                &other.range_on_strand(Strand::Positive),
            )
    }

    pub fn contains(&self, other: &GenomicRegion) -> bool {
        self.contig.id == other.contig.id
            && range_contains(
                &self.range_on_strand(Strand::Positive),
                &other.range_on_strand(Strand::Positive),
            )
    }
}

/// Catalogue of the contigs of a genome assembly, looked up by name or id.
#[derive(Debug, Clone)]
pub struct GenomicAssembly {
    pub name: String,
    contigs: Vec<Arc<Contig>>,
    by_name: HashMap<String, usize>,
}

impl GenomicAssembly {
    /// Primary contigs of a genome release; names are accepted with or without `chr`.
    pub fn from_release(release: GenomeRelease) -> Self {
        let contigs = release
            .contig_specs()
            .into_iter()
            .enumerate()
            .map(|(i, (name, length))| Arc::new(Contig::new(i as u32 + 1, name.to_owned(), length)))
            .collect::<Vec<_>>();
        let by_name = build_chrom_map().into_iter().collect();
        Self {
            name: release.name(),
            contigs,
            by_name,
        }
    }

    /// Custom assembly from `(name, length)` pairs, ids are assigned from 1.
    pub fn from_contigs<I, S>(name: &str, specs: I) -> Self
    where
        I: IntoIterator<Item = (S, i32)>,
        S: Into<String>,
    {
        let mut contigs = Vec::new();
        let mut by_name = HashMap::new();
        for (i, (contig_name, length)) in specs.into_iter().enumerate() {
            let contig_name: String = contig_name.into();
            let alias = match contig_name.strip_prefix("chr") {
                Some(stripped) => stripped.to_owned(),
                None => format!("chr{}", contig_name),
            };
            by_name.entry(alias).or_insert(i);
            by_name.insert(contig_name.clone(), i);
            contigs.push(Arc::new(Contig::new(i as u32 + 1, contig_name, length)));
        }
        Self {
            name: name.to_owned(),
            contigs,
            by_name,
        }
    }

    pub fn contig_by_name(&self, name: &str) -> Option<&Arc<Contig>> {
        self.by_name.get(name).and_then(|idx| self.contigs.get(*idx))
    }
}

#[cfg(test)]
mod test {
    use pretty_assertions::assert_eq;

    use super::*;

    fn contig() -> Arc<Contig> {
        Arc::new(Contig::new(1, "ctg1".to_owned(), 1000))
    }

    #[rstest::rstest]
    #[case(CoordinateSystem::ZeroBased, 100, 200, 800, 900)]
    #[case(CoordinateSystem::OneBased, 101, 200, 801, 900)]
    #[case(CoordinateSystem::ZeroBased, 0, 0, 1000, 1000)]
    #[case(CoordinateSystem::OneBased, 1000, 1000, 1, 1)]
    fn with_strand_inverts(
        #[case] coordinate_system: CoordinateSystem,
        #[case] start: i32,
        #[case] end: i32,
        #[case] expected_start: i32,
        #[case] expected_end: i32,
    ) -> Result<(), anyhow::Error> {
        let region = GenomicRegion::new(
            contig(),
            Strand::Positive,
            Coordinates::new(coordinate_system, start, end)?,
        )?;
        let flipped = region.with_strand(Strand::Negative);

        assert_eq!(flipped.strand(), Strand::Negative);
        assert_eq!(flipped.start(), expected_start);
        assert_eq!(flipped.end(), expected_end);
        assert_eq!(flipped.length(), region.length());

        Ok(())
    }

    #[rstest::rstest]
    #[case(CoordinateSystem::ZeroBased, Strand::Positive, 10, 20)]
    #[case(CoordinateSystem::ZeroBased, Strand::Negative, 10, 20)]
    #[case(CoordinateSystem::OneBased, Strand::Positive, 11, 20)]
    #[case(CoordinateSystem::OneBased, Strand::Negative, 1, 1000)]
    #[case(CoordinateSystem::ZeroBased, Strand::Negative, 500, 500)]
    #[case(CoordinateSystem::OneBased, Strand::Positive, 501, 500)]
    fn with_strand_round_trip(
        #[case] coordinate_system: CoordinateSystem,
        #[case] strand: Strand,
        #[case] start: i32,
        #[case] end: i32,
    ) -> Result<(), anyhow::Error> {
        let coordinates = Coordinates::new(coordinate_system, start, end)?.with_confidence(
            ConfidenceInterval::new(-10, 5),
            ConfidenceInterval::new(-2, 20),
        );
        let region = GenomicRegion::new(contig(), strand, coordinates)?;

        for other in [Strand::Positive, Strand::Negative] {
            assert_eq!(region.with_strand(other).with_strand(strand), region);
        }

        Ok(())
    }

    #[test]
    fn with_strand_inverts_confidence_intervals() -> Result<(), anyhow::Error> {
        let coordinates = Coordinates::zero_based(100, 200)?.with_confidence(
            ConfidenceInterval::new(-10, 5),
            ConfidenceInterval::new(-2, 20),
        );
        let region = GenomicRegion::new(contig(), Strand::Positive, coordinates)?;
        let flipped = region.with_strand(Strand::Negative);

        assert_eq!(
            flipped.coordinates().start_ci(),
            ConfidenceInterval::new(-20, 2)
        );
        assert_eq!(
            flipped.coordinates().end_ci(),
            ConfidenceInterval::new(-5, 10)
        );

        Ok(())
    }

    #[test]
    fn with_coordinate_system() -> Result<(), anyhow::Error> {
        let region = GenomicRegion::zero_based(contig(), Strand::Positive, 100, 200)?;
        let one_based = region.with_coordinate_system(CoordinateSystem::OneBased);

        assert_eq!((one_based.start(), one_based.end()), (101, 200));
        assert_eq!(one_based.length(), 100);
        assert_eq!(
            one_based.with_coordinate_system(CoordinateSystem::ZeroBased),
            region
        );

        Ok(())
    }

    #[rstest::rstest]
    #[case(CoordinateSystem::ZeroBased, 10, 9)]
    #[case(CoordinateSystem::OneBased, 10, 8)]
    fn invalid_coordinates(
        #[case] coordinate_system: CoordinateSystem,
        #[case] start: i32,
        #[case] end: i32,
    ) {
        assert_eq!(
            Coordinates::new(coordinate_system, start, end),
            Err(RecordError::InvalidCoordinates { start, end })
        );
    }

    #[test]
    fn region_outside_of_contig() {
        assert!(GenomicRegion::zero_based(contig(), Strand::Positive, 900, 1001).is_err());
        assert!(GenomicRegion::zero_based(contig(), Strand::Positive, -1, 10).is_err());
    }

    #[rstest::rstest]
    #[case(1..10, 1..10, true)]
    #[case(1..10, 9..20, true)]
    #[case(1..10, 10..20, false)]
    #[case(10..20, 1..10, false)]
    #[case(5..5, 1..10, true)]
    #[case(1..1, 1..10, false)]
    #[case(10..10, 1..10, false)]
    #[case(1..10, 5..5, true)]
    #[case(5..5, 5..5, true)]
    #[case(5..5, 6..6, false)]
    fn ranges_overlap_cases(#[case] lhs: Range<i32>, #[case] rhs: Range<i32>, #[case] expected: bool) {
        assert_eq!(ranges_overlap(&lhs, &rhs), expected);
        assert_eq!(intersect(&lhs, &rhs).is_some(), expected);
    }

    #[test]
    fn overlaps_and_contains_ignore_strand() -> Result<(), anyhow::Error> {
        let region = GenomicRegion::zero_based(contig(), Strand::Positive, 100, 200)?;
        let other = GenomicRegion::zero_based(contig(), Strand::Positive, 150, 180)?
            .with_strand(Strand::Negative);

        assert!(region.overlaps_with(&other));
        assert!(region.contains(&other));
        assert!(!other.contains(&region));

        Ok(())
    }

    #[test]
    fn assembly_lookup() {
        let assembly = GenomicAssembly::from_release(GenomeRelease::Grch37);

        let chr13 = assembly.contig_by_name("chr13").cloned();
        assert_eq!(chr13.as_ref().map(|c| c.length), Some(115169878));
        assert_eq!(assembly.contig_by_name("13"), chr13.as_ref());
        assert_eq!(assembly.contig_by_name("chr99"), None);

        let custom = GenomicAssembly::from_contigs("toy", [("chrA", 100), ("B", 200)]);
        assert_eq!(custom.contig_by_name("A").map(|c| c.id), Some(1));
        assert_eq!(custom.contig_by_name("chrB").map(|c| c.length), Some(200));
    }
}
