//! Routes: the derived molecule of a variant as an ordered list of reference segments.

use std::{ops::Range, sync::Arc};

use serde::{Deserialize, Serialize};

use crate::model::{
    BreakendVariant, Contig, GenomicRegion, SimpleVariant, Strand, Variant, VariantType,
};

/// Rearrangement event that produced a segment.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, strum::Display,
)]
#[strum(serialize_all = "UPPERCASE")]
#[serde(rename_all = "UPPERCASE")]
pub enum Event {
    Gap,
    Deletion,
    Insertion,
    Inversion,
    Duplication,
    Breakend,
}

/// One span of a route.
#[derive(Debug, Clone, PartialEq)]
pub struct Segment {
    pub label: String,
    /// Reference span in the orientation it is read on the derived molecule.
    pub region: GenomicRegion,
    pub event: Event,
    /// Copy-number multiplier.
    pub copies: u32,
    /// Inserted bases, for insertions and breakend joins with inserted sequence.
    pub inserted_length: i32,
}

impl Segment {
    pub fn new(label: &str, region: GenomicRegion, event: Event, copies: u32) -> Self {
        Self {
            label: label.to_owned(),
            region,
            event,
            copies,
            inserted_length: 0,
        }
    }

    pub fn gap(label: &str, region: GenomicRegion) -> Self {
        Self::new(label, region, Event::Gap, 1)
    }

    /// Zero-length anchor followed by `inserted_length` novel bases.
    pub fn insertion(label: &str, anchor: GenomicRegion, inserted_length: i32) -> Self {
        Self {
            inserted_length,
            ..Self::new(label, anchor, Event::Insertion, 1)
        }
    }

    pub fn contig_id(&self) -> u32 {
        self.region.contig_id()
    }

    /// Zero-based span on the positive reference strand.
    pub fn reference_range(&self) -> Range<i32> {
        self.region.range_on_strand(Strand::Positive)
    }
}

/// Ordered walk along the derived molecule, 5' to 3'.
#[derive(Debug, Clone, PartialEq)]
pub struct Route {
    segments: Vec<Segment>,
    references: Vec<GenomicRegion>,
}

/// Merge positive-strand spans per contig, joining spans that touch or overlap.
fn merge_references(spans: Vec<GenomicRegion>) -> Vec<GenomicRegion> {
    let mut result: Vec<GenomicRegion> = Vec::new();
    for span in spans {
        let range = span.range_on_strand(Strand::Positive);
        let hit = result.iter_mut().find(|other| {
            let other_range = other.range_on_strand(Strand::Positive);
            other.contig_id() == span.contig_id()
                && range.start <= other_range.end
                && other_range.start <= range.end
        });
        match hit {
            Some(other) => {
                let other_range = other.range_on_strand(Strand::Positive);
                *other = GenomicRegion::from_range(
                    span.contig().clone(),
                    Strand::Positive,
                    range.start.min(other_range.start)..range.end.max(other_range.end),
                );
            }
            None => result.push(span.with_strand(Strand::Positive)),
        }
    }
    result
}

impl Route {
    /// Route whose reference spans are the union of its segments' spans.
    pub fn new(segments: Vec<Segment>) -> Self {
        let spans = segments
            .iter()
            .filter(|segment| segment.event != Event::Breakend)
            .map(|segment| segment.region.with_strand(Strand::Positive))
            .collect();
        Self {
            references: merge_references(spans),
            segments,
        }
    }

    /// Route with explicitly given reference spans, used for breakends where the
    /// segments only walk one side of each breakend.
    pub fn with_references(segments: Vec<Segment>, references: Vec<GenomicRegion>) -> Self {
        Self {
            segments,
            references: merge_references(references),
        }
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    /// Reference spans covered by the route, on the positive strand.
    pub fn references(&self) -> &[GenomicRegion] {
        &self.references
    }
}

/// Evaluation window around a variant, zero-based on the positive strand.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Window {
    Simple(Range<i32>),
    Breakended { left: Range<i32>, right: Range<i32> },
}

impl Window {
    /// The variant's own span, i.e., no flanking sequence.
    pub fn tight(variant: &Variant) -> Self {
        match variant {
            Variant::Simple(variant) => {
                Window::Simple(variant.region.range_on_strand(Strand::Positive))
            }
            Variant::Breakended(variant) => Window::Breakended {
                left: variant.left.region().range_on_strand(Strand::Positive),
                right: variant.right.region().range_on_strand(Strand::Positive),
            },
        }
    }
}

fn cover(window: &Range<i32>, span: &Range<i32>, contig: &Contig) -> Range<i32> {
    window.start.min(span.start).max(0)..window.end.max(span.end).min(contig.length)
}

/// Convert a positive-strand range to `strand`.
fn on_strand(contig: &Arc<Contig>, range: Range<i32>, strand: Strand) -> Range<i32> {
    GenomicRegion::from_range(contig.clone(), Strand::Positive, range).range_on_strand(strand)
}

fn build_simple(variant: &SimpleVariant, window: &Range<i32>) -> Route {
    let contig = variant.region.contig();
    let span = variant.region.range_on_strand(Strand::Positive);
    let window = cover(window, &span, contig);
    let region = |range: Range<i32>| GenomicRegion::from_range(contig.clone(), Strand::Positive, range);

    let event_segment = match variant.variant_type {
        VariantType::Del => Segment::new("deletion", region(span.clone()), Event::Deletion, 0),
        VariantType::Dup => Segment::new("duplication", region(span.clone()), Event::Duplication, 2),
        VariantType::Inv => Segment::new(
            "inversion",
            region(span.clone()).with_strand(Strand::Negative),
            Event::Inversion,
            1,
        ),
        VariantType::Ins => Segment::insertion(
            "insertion",
            region(span.start..span.start),
            variant.inserted_length,
        ),
    };

    Route::new(vec![
        Segment::gap("upstream", region(window.start..span.start)),
        event_segment,
        Segment::gap("downstream", region(span.end..window.end)),
    ])
}

fn build_breakended(variant: &BreakendVariant, left: &Range<i32>, right: &Range<i32>) -> Route {
    let (left_bnd, right_bnd) = (&variant.left, &variant.right);
    let left_contig = left_bnd.region().contig();
    let right_contig = right_bnd.region().contig();

    let left_window = cover(
        left,
        &left_bnd.region().range_on_strand(Strand::Positive),
        left_contig,
    );
    let right_window = cover(
        right,
        &right_bnd.region().range_on_strand(Strand::Positive),
        right_contig,
    );

    // Walk the left contig up to the join, then continue on the right contig.
    let upstream_start = on_strand(left_contig, left_window.clone(), left_bnd.strand()).start;
    let downstream_end = on_strand(right_contig, right_window.clone(), right_bnd.strand()).end;

    let mut join = Segment::new("join", left_bnd.region().clone(), Event::Breakend, 1);
    join.inserted_length = variant.inserted_sequence.len() as i32;
    // Features spanning the mate position are cut there as well.
    let mate = Segment::new("mate", right_bnd.region().clone(), Event::Breakend, 1);

    Route::with_references(
        vec![
            Segment::gap(
                "upstream",
                GenomicRegion::from_range(
                    left_contig.clone(),
                    left_bnd.strand(),
                    upstream_start..left_bnd.pos(),
                ),
            ),
            join,
            mate,
            Segment::gap(
                "downstream",
                GenomicRegion::from_range(
                    right_contig.clone(),
                    right_bnd.strand(),
                    right_bnd.pos()..downstream_end,
                ),
            ),
        ],
        vec![
            GenomicRegion::from_range(left_contig.clone(), Strand::Positive, left_window),
            GenomicRegion::from_range(right_contig.clone(), Strand::Positive, right_window),
        ],
    )
}

/// Route of `variant` without any flanking sequence.
pub fn build_route(variant: &Variant) -> Route {
    build_route_in_window(variant, &Window::tight(variant))
}

/// Route of `variant` with flanking GAP segments extending to `window`.
///
/// The window is widened to always cover the variant itself.
pub fn build_route_in_window(variant: &Variant, window: &Window) -> Route {
    match (variant, window) {
        (Variant::Simple(variant), Window::Simple(window)) => build_simple(variant, window),
        (Variant::Breakended(variant), Window::Breakended { left, right }) => {
            build_breakended(variant, left, right)
        }
        _ => {
            tracing::warn!(
                "window {:?} does not fit variant {}, using tight window",
                window,
                variant.id()
            );
            build_route(variant)
        }
    }
}
