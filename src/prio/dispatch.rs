//! Evaluation windows and fetching of the features a route is scored on.

use std::{ops::Range, sync::Arc};

use indexmap::IndexMap;

use crate::{
    db::{overlap::OverlapIndex, AnnotationDb},
    model::{Contig, Enhancer, Gene, GenomicRegion, Located, Strand, TadBoundary, Variant},
};

use super::route::{build_route_in_window, Route, Window};

/// Decides the window around a variant in which features are evaluated.
pub trait Dispatcher: Send + Sync {
    fn window(&self, variant: &Variant) -> Window;

    /// Route of `variant` with flanks extended to its window.
    fn dispatch(&self, variant: &Variant) -> Route {
        build_route_in_window(variant, &self.window(variant))
    }
}

/// Apply `around` to each reference span of `variant`.
fn window_per_span<F>(variant: &Variant, around: F) -> Window
where
    F: Fn(&Contig, Range<i32>) -> Range<i32>,
{
    let span = |region: &GenomicRegion| {
        around(region.contig().as_ref(), region.range_on_strand(Strand::Positive))
    };
    match variant {
        Variant::Simple(variant) => Window::Simple(span(&variant.region)),
        Variant::Breakended(variant) => Window::Breakended {
            left: span(variant.left.region()),
            right: span(variant.right.region()),
        },
    }
}

fn overlapping_gene_ranges(db: &AnnotationDb, contig: &Contig, span: &Range<i32>) -> Vec<Range<i32>> {
    db.genes
        .overlapping_range(contig.id, span.clone())
        .iter()
        .map(|gene| gene.location.range_on_strand(Strand::Positive))
        .collect()
}

/// Smallest range covering `span` and all of `ranges`.
fn hull(span: Range<i32>, ranges: &[Range<i32>]) -> Range<i32> {
    ranges.iter().fold(span, |acc, range| {
        acc.start.min(range.start)..acc.end.max(range.end)
    })
}

/// Window spanning the variant and every gene it touches.
///
/// A variant between genes reaches out to the closest gene on either side.
#[derive(Debug, Clone)]
pub struct GeneDispatcher {
    db: Arc<AnnotationDb>,
}

impl GeneDispatcher {
    pub fn new(db: Arc<AnnotationDb>) -> Self {
        Self { db }
    }

    fn window_around(&self, contig: &Contig, span: Range<i32>) -> Range<i32> {
        let genes = overlapping_gene_ranges(&self.db, contig, &span);
        if !genes.is_empty() {
            return hull(span, &genes);
        }

        let start = self
            .db
            .genes
            .nearest_upstream(contig.id, span.start, |_| true)
            .map(|gene| gene.location.range_on_strand(Strand::Positive).start)
            .unwrap_or(span.start);
        let end = self
            .db
            .genes
            .nearest_downstream(contig.id, span.end, |_| true)
            .map(|gene| gene.location.range_on_strand(Strand::Positive).end)
            .unwrap_or(span.end);
        tracing::trace!("intergenic window {}..{} around {:?}", start, end, &span);

        start.min(span.start)..end.max(span.end)
    }
}

impl Dispatcher for GeneDispatcher {
    fn window(&self, variant: &Variant) -> Window {
        window_per_span(variant, |contig, span| self.window_around(contig, span))
    }
}

/// Window bounded by the closest stable TAD boundaries on both sides.
///
/// When the variant only touches genes that all overlap each other, the genes bound the
/// window instead, unless `force_evaluate_tad` is set.
#[derive(Debug, Clone)]
pub struct TadAwareDispatcher {
    db: Arc<AnnotationDb>,
    stability_threshold: f64,
    force_evaluate_tad: bool,
}

impl TadAwareDispatcher {
    pub fn new(db: Arc<AnnotationDb>, stability_threshold: f64, force_evaluate_tad: bool) -> Self {
        Self {
            db,
            stability_threshold,
            force_evaluate_tad,
        }
    }

    fn window_around(&self, contig: &Contig, span: Range<i32>) -> Range<i32> {
        let genes = overlapping_gene_ranges(&self.db, contig, &span);
        if !self.force_evaluate_tad && !genes.is_empty() && all_overlap(&genes) {
            return hull(span, &genes);
        }

        let stable = |tad: &TadBoundary| tad.stability >= self.stability_threshold;
        let start = self
            .db
            .tad_boundaries
            .nearest_upstream(contig.id, span.start, stable)
            .map(|tad| tad.midpoint())
            .unwrap_or(0);
        let end = self
            .db
            .tad_boundaries
            .nearest_downstream(contig.id, span.end, stable)
            .map(|tad| tad.midpoint())
            .unwrap_or(contig.length);
        tracing::trace!("TAD window {}..{} around {:?}", start, end, &span);

        start.min(span.start)..end.max(span.end)
    }
}

/// Whether all `ranges` share at least one base.
fn all_overlap(ranges: &[Range<i32>]) -> bool {
    let max_start = ranges.iter().map(|range| range.start).max();
    let min_end = ranges.iter().map(|range| range.end).min();
    matches!((max_start, min_end), (Some(start), Some(end)) if start < end)
}

impl Dispatcher for TadAwareDispatcher {
    fn window(&self, variant: &Variant) -> Window {
        window_per_span(variant, |contig, span| self.window_around(contig, span))
    }
}

/// A route together with the features it is evaluated on.
#[derive(Debug, Clone)]
pub struct RouteData {
    pub route: Route,
    pub genes: Vec<Arc<Gene>>,
    pub enhancers: Vec<Arc<Enhancer>>,
    pub tad_boundaries: Vec<Arc<TadBoundary>>,
}

/// Collects the features of a route's reference spans from the annotation indices.
#[derive(Debug, Clone)]
pub struct RouteDataService {
    db: Arc<AnnotationDb>,
}

/// Add features fully contained in `reference` that have not been seen yet.
fn collect_contained<T: Located>(
    index: &OverlapIndex<T>,
    reference: &GenomicRegion,
    into: &mut IndexMap<String, Arc<T>>,
) {
    for feature in index.overlapping(reference) {
        if reference.contains(feature.location()) {
            into.entry(feature.id().to_owned()).or_insert(feature);
        }
    }
}

impl RouteDataService {
    pub fn new(db: Arc<AnnotationDb>) -> Self {
        Self { db }
    }

    pub fn fetch(&self, route: Route) -> RouteData {
        let mut genes = IndexMap::new();
        let mut enhancers = IndexMap::new();
        let mut tad_boundaries: IndexMap<String, Arc<TadBoundary>> = IndexMap::new();
        for reference in route.references() {
            collect_contained(&self.db.genes, reference, &mut genes);
            collect_contained(&self.db.enhancers, reference, &mut enhancers);
            for tad in self.db.tad_boundaries.overlapping(reference) {
                tad_boundaries.entry(tad.id.clone()).or_insert(tad);
            }
        }

        // A boundary inside a retained gene does not insulate anything.
        let tad_boundaries = tad_boundaries
            .into_values()
            .filter(|tad| {
                !genes
                    .values()
                    .any(|gene: &Arc<Gene>| gene.location.overlaps_with(&tad.location))
            })
            .collect();

        RouteData {
            route,
            genes: genes.into_values().collect(),
            enhancers: enhancers.into_values().collect(),
            tad_boundaries,
        }
    }
}

#[cfg(test)]
mod test {
    use pretty_assertions::assert_eq;

    use crate::model::{Breakend, BreakendVariant, VariantType};
    use crate::prio::fixtures::{enhancer, gene, region, tad, variant};

    use super::*;

    fn db() -> Arc<AnnotationDb> {
        Arc::new(AnnotationDb::new(
            vec![
                gene("A", Strand::Positive, 100, 400, &[(100, 150), (350, 400)]),
                gene("B", Strand::Negative, 450, 550, &[(450, 550)]),
                gene("C", Strand::Positive, 600, 700, &[(600, 700)]),
            ],
            vec![
                enhancer("e1", 410, 440, &[]),
                enhancer("e2", 380, 420, &[]),
            ],
            vec![
                tad("t1", 50, 60, 0.9),
                tad("t2", 560, 580, 0.1),
                tad("t3", 800, 820, 0.9),
                tad("t4", 420, 430, 0.9),
                tad("t5", 640, 650, 0.05),
            ],
        ))
    }

    fn ids<T: Located>(features: &[Arc<T>]) -> Vec<&str> {
        features.iter().map(|f| f.id()).collect()
    }

    fn reference_ranges(route: &Route) -> Vec<Range<i32>> {
        route
            .references()
            .iter()
            .map(|r| r.range_on_strand(Strand::Positive))
            .collect()
    }

    #[test]
    fn gene_dispatcher_extends_to_touched_genes() {
        let db = db();
        let route = GeneDispatcher::new(db.clone()).dispatch(&variant(VariantType::Del, 200, 300, 0));
        assert_eq!(reference_ranges(&route), vec![100..400]);

        let data = RouteDataService::new(db).fetch(route);
        assert_eq!(ids(&data.genes), vec!["A"]);
        assert!(data.enhancers.is_empty());
        assert!(data.tad_boundaries.is_empty());
    }

    #[rstest::rstest]
    #[case::between_genes(405, 445, 100..550)]
    #[case::before_first_gene(10, 20, 10..400)]
    #[case::after_last_gene(800, 900, 600..900)]
    fn gene_dispatcher_reaches_nearest_genes(
        #[case] start: i32,
        #[case] end: i32,
        #[case] expected: Range<i32>,
    ) {
        let route = GeneDispatcher::new(db()).dispatch(&variant(VariantType::Del, start, end, 0));

        assert_eq!(reference_ranges(&route), vec![expected]);
    }

    #[test]
    fn gene_dispatcher_fetches_flanking_genes() {
        let db = db();
        let route = GeneDispatcher::new(db.clone()).dispatch(&variant(VariantType::Del, 405, 445, 0));
        let data = RouteDataService::new(db).fetch(route);

        assert_eq!(ids(&data.genes), vec!["A", "B"]);
        assert_eq!(ids(&data.enhancers), vec!["e2", "e1"]);
    }

    #[rstest::rstest]
    #[case::between_genes(405, 445, false, 55..810)]
    #[case::genes_apart(380, 470, false, 55..810)]
    #[case::single_gene(200, 300, false, 100..400)]
    #[case::single_gene_forced(200, 300, true, 55..425)]
    fn tad_aware_windows(
        #[case] start: i32,
        #[case] end: i32,
        #[case] force_evaluate_tad: bool,
        #[case] expected: Range<i32>,
    ) {
        let dispatcher = TadAwareDispatcher::new(db(), 0.25, force_evaluate_tad);
        let route = dispatcher.dispatch(&variant(VariantType::Del, start, end, 0));

        assert_eq!(reference_ranges(&route), vec![expected]);
    }

    #[test]
    fn tad_window_without_boundaries_reaches_contig_ends() {
        let db = Arc::new(AnnotationDb::new(vec![], vec![], vec![]));
        let route = TadAwareDispatcher::new(db, 0.25, false)
            .dispatch(&variant(VariantType::Inv, 200, 300, 0));

        assert_eq!(reference_ranges(&route), vec![0..1000]);
    }

    #[test]
    fn fetch_keeps_contained_features_only() {
        let db = db();
        let dispatcher = TadAwareDispatcher::new(db.clone(), 0.25, false);
        let data = RouteDataService::new(db.clone())
            .fetch(dispatcher.dispatch(&variant(VariantType::Del, 405, 445, 0)));

        assert_eq!(ids(&data.genes), vec!["A", "B", "C"]);
        assert_eq!(ids(&data.enhancers), vec!["e2", "e1"]);
        // t5 lies within gene C
        assert_eq!(ids(&data.tad_boundaries), vec!["t1", "t4", "t2", "t3"]);

        let forced = TadAwareDispatcher::new(db.clone(), 0.25, true);
        let data = RouteDataService::new(db)
            .fetch(forced.dispatch(&variant(VariantType::Del, 200, 300, 0)));
        assert_eq!(ids(&data.genes), vec!["A"]);
        assert_eq!(ids(&data.enhancers), vec!["e2"]);
    }

    #[test]
    fn fetch_does_not_duplicate_features() -> Result<(), anyhow::Error> {
        let db = db();
        let variant = Variant::Breakended(BreakendVariant {
            event_id: "tra1".to_owned(),
            left: Breakend::new("bnd_1", region(Strand::Positive, 300, 300))?,
            right: Breakend::new("bnd_2", region(Strand::Positive, 350, 350))?,
            ref_allele: "N".to_owned(),
            inserted_sequence: String::new(),
        });

        let route = GeneDispatcher::new(db.clone()).dispatch(&variant);
        let data = RouteDataService::new(db).fetch(route);

        assert_eq!(ids(&data.genes), vec!["A"]);

        Ok(())
    }
}
