//! Per-contig interval index over annotation features.

use std::{collections::HashMap, ops::Range, sync::Arc};

use bio::data_structures::interval_tree::ArrayBackedIntervalTree;

use crate::model::{coords::ranges_overlap, GenomicRegion, Located, Strand};

/// Alias for the interval tree that we use.
type IntervalTree = ArrayBackedIntervalTree<i32, u32>;

/// Features of one contig, sorted by start on the positive strand.
struct ContigIndex<T> {
    records: Vec<Arc<T>>,
    ranges: Vec<Range<i32>>,
    tree: IntervalTree,
    max_len: i32,
}

impl<T> ContigIndex<T> {
    fn new(mut entries: Vec<(Range<i32>, Arc<T>)>) -> Self {
        entries.sort_by_key(|(range, _)| (range.start, range.end));

        let mut tree = IntervalTree::new();
        let mut records = Vec::with_capacity(entries.len());
        let mut ranges = Vec::with_capacity(entries.len());
        let mut max_len = 0;
        for (idx, (range, record)) in entries.into_iter().enumerate() {
            // Empty features are stored with one base so the tree returns them as
            // candidates; the exact test happens on `ranges`.
            tree.insert(range.start..range.end.max(range.start + 1), idx as u32);
            max_len = max_len.max(range.end - range.start);
            ranges.push(range);
            records.push(record);
        }
        tree.index();

        Self {
            records,
            ranges,
            tree,
            max_len,
        }
    }

    fn candidates(&self, query: &Range<i32>) -> Vec<usize> {
        let mut result = self
            .tree
            .find(query.start - 1..query.end + 1)
            .iter()
            .map(|entry| *entry.data() as usize)
            .collect::<Vec<_>>();
        result.sort_unstable();
        result
    }
}

/// Read-only overlap index, built once and shared between threads.
///
/// All queries use zero-based, half-open coordinates on the positive strand.
pub struct OverlapIndex<T> {
    contigs: HashMap<u32, ContigIndex<T>>,
    len: usize,
}

impl<T> std::fmt::Debug for OverlapIndex<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OverlapIndex")
            .field("contigs", &self.contigs.len())
            .field("len", &self.len)
            .finish()
    }
}

impl<T: Located> OverlapIndex<T> {
    pub fn new<I>(features: I) -> Self
    where
        I: IntoIterator<Item = T>,
    {
        let mut by_contig: HashMap<u32, Vec<(Range<i32>, Arc<T>)>> = HashMap::new();
        let mut len = 0;
        for feature in features {
            let location = feature.location();
            let contig_id = location.contig_id();
            let range = location.range_on_strand(Strand::Positive);
            by_contig
                .entry(contig_id)
                .or_default()
                .push((range, Arc::new(feature)));
            len += 1;
        }

        Self {
            contigs: by_contig
                .into_iter()
                .map(|(contig_id, entries)| (contig_id, ContigIndex::new(entries)))
                .collect(),
            len,
        }
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Features overlapping `region`, regardless of the strand of either.
    pub fn overlapping(&self, region: &GenomicRegion) -> Vec<Arc<T>> {
        self.overlapping_range(region.contig_id(), region.range_on_strand(Strand::Positive))
    }

    /// Features overlapping `range`; an unknown contig yields no features.
    pub fn overlapping_range(&self, contig_id: u32, range: Range<i32>) -> Vec<Arc<T>> {
        match self.contigs.get(&contig_id) {
            None => Vec::new(),
            Some(index) => index
                .candidates(&range)
                .into_iter()
                .filter(|idx| ranges_overlap(&index.ranges[*idx], &range))
                .map(|idx| index.records[idx].clone())
                .collect(),
        }
    }

    /// Features containing the base at zero-based `pos`.
    pub fn overlapping_point(&self, contig_id: u32, pos: i32) -> Vec<Arc<T>> {
        self.overlapping_range(contig_id, pos..pos + 1)
    }

    /// Closest feature ending at or before `pos` that satisfies `predicate`.
    pub fn nearest_upstream<P>(&self, contig_id: u32, pos: i32, predicate: P) -> Option<Arc<T>>
    where
        P: Fn(&T) -> bool,
    {
        let index = self.contigs.get(&contig_id)?;
        let upper = index.ranges.partition_point(|range| range.start <= pos);

        let mut best: Option<usize> = None;
        for idx in (0..upper).rev() {
            let range = &index.ranges[idx];
            if let Some(best_idx) = best {
                if range.start + index.max_len <= index.ranges[best_idx].end {
                    break;
                }
            }
            let better = best.map_or(true, |best_idx| range.end > index.ranges[best_idx].end);
            if range.end <= pos && better && predicate(&index.records[idx]) {
                best = Some(idx);
            }
        }

        best.map(|idx| index.records[idx].clone())
    }

    /// Closest feature starting at or after `pos` that satisfies `predicate`.
    pub fn nearest_downstream<P>(&self, contig_id: u32, pos: i32, predicate: P) -> Option<Arc<T>>
    where
        P: Fn(&T) -> bool,
    {
        let index = self.contigs.get(&contig_id)?;
        let lower = index.ranges.partition_point(|range| range.start < pos);

        (lower..index.records.len())
            .find(|idx| predicate(&index.records[*idx]))
            .map(|idx| index.records[idx].clone())
    }
}

#[cfg(test)]
mod test {
    use std::sync::Arc;

    use pretty_assertions::assert_eq;

    use crate::model::{Contig, TadBoundary};

    use super::*;

    fn index() -> Result<OverlapIndex<TadBoundary>, anyhow::Error> {
        let contig = Arc::new(Contig::new(1, "1".to_owned(), 1000));
        let tad = |id: &str, strand: Strand, start: i32, end: i32, stability: f64| {
            Ok::<_, anyhow::Error>(TadBoundary {
                id: id.to_owned(),
                location: GenomicRegion::zero_based(contig.clone(), strand, start, end)?,
                stability,
            })
        };
        Ok(OverlapIndex::new(vec![
            tad("a", Strand::Positive, 100, 200, 0.9)?,
            tad("b", Strand::Positive, 150, 160, 0.1)?,
            tad("c", Strand::Positive, 300, 300, 0.9)?,
            // 700..800 on the positive strand
            tad("d", Strand::Negative, 200, 300, 0.5)?,
            tad("e", Strand::Positive, 0, 400, 0.2)?,
        ]))
    }

    fn ids(features: Vec<Arc<TadBoundary>>) -> Vec<String> {
        features.iter().map(|f| f.id.clone()).collect()
    }

    #[rstest::rstest]
    #[case(0..1000, vec!["e", "a", "b", "c", "d"])]
    #[case(150..151, vec!["e", "a", "b"])]
    #[case(200..300, vec!["e"])]
    #[case(299..301, vec!["e", "c"])]
    #[case(300..300, vec!["e", "c"])]
    #[case(750..750, vec!["d"])]
    #[case(800..900, vec![])]
    fn overlapping_range(
        #[case] query: Range<i32>,
        #[case] expected: Vec<&str>,
    ) -> Result<(), anyhow::Error> {
        assert_eq!(ids(index()?.overlapping_range(1, query)), expected);

        Ok(())
    }

    #[test]
    fn overlapping_point_and_unknown_contig() -> Result<(), anyhow::Error> {
        let index = index()?;

        assert_eq!(index.len(), 5);
        assert_eq!(ids(index.overlapping_point(1, 199)), vec!["e", "a"]);
        assert_eq!(ids(index.overlapping_point(1, 200)), vec!["e"]);
        assert!(index.overlapping_point(2, 150).is_empty());

        Ok(())
    }

    #[test]
    fn overlapping_region_on_negative_strand() -> Result<(), anyhow::Error> {
        let index = index()?;
        let contig = Arc::new(Contig::new(1, "1".to_owned(), 1000));
        // 750..760 on the positive strand
        let region = GenomicRegion::zero_based(contig, Strand::Negative, 240, 250)?;

        assert_eq!(ids(index.overlapping(&region)), vec!["d"]);

        Ok(())
    }

    #[rstest::rstest]
    #[case(650, 0.0, Some("e"))]
    #[case(650, 0.5, Some("c"))]
    #[case(299, 0.5, Some("a"))]
    #[case(150, 0.0, None)]
    fn nearest_upstream(
        #[case] pos: i32,
        #[case] threshold: f64,
        #[case] expected: Option<&str>,
    ) -> Result<(), anyhow::Error> {
        let found = index()?.nearest_upstream(1, pos, |tad| tad.stability > threshold);
        assert_eq!(found.map(|tad| tad.id.clone()).as_deref(), expected);

        Ok(())
    }

    #[rstest::rstest]
    #[case(0, 0.0, Some("e"))]
    #[case(1, 0.0, Some("a"))]
    #[case(101, 0.5, Some("c"))]
    #[case(301, 0.6, None)]
    #[case(301, 0.4, Some("d"))]
    fn nearest_downstream(
        #[case] pos: i32,
        #[case] threshold: f64,
        #[case] expected: Option<&str>,
    ) -> Result<(), anyhow::Error> {
        let found = index()?.nearest_downstream(1, pos, |tad| tad.stability > threshold);
        assert_eq!(found.map(|tad| tad.id.clone()).as_deref(), expected);

        Ok(())
    }
}
