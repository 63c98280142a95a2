//! Mapping of feature sub-structure onto the segments of a route.

use std::{ops::Range, sync::Arc};

use crate::model::{coords::intersect, Enhancer, Gene, Located, Strand};

use super::route::{Event, Route};

/// Sub-structure of a feature that is projected.
///
/// Transcript and exon indices follow `Gene::transcripts` and the positive-strand
/// order of `Transcript::exon_ranges`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Part {
    /// Whole transcript span.
    Transcript(usize),
    Exon { transcript: usize, exon: usize },
    /// Whole feature region, for features without sub-structure.
    Region,
}

/// Part of a feature that falls into one route segment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Piece {
    pub part: Part,
    /// Index into `Route::segments`.
    pub segment: usize,
    pub event: Event,
    /// Intersection on the positive strand; empty for insertion anchors and joins.
    pub range: Range<i32>,
}

/// Feature with the sub-structure that can be projected.
pub trait Projectable: Located {
    /// Parts and their zero-based ranges on the positive strand.
    fn parts(&self) -> Vec<(Part, Range<i32>)>;
}

impl Projectable for Gene {
    fn parts(&self) -> Vec<(Part, Range<i32>)> {
        let mut result = Vec::new();
        for (tx_idx, tx) in self.transcripts.iter().enumerate() {
            result.push((
                Part::Transcript(tx_idx),
                tx.location.range_on_strand(Strand::Positive),
            ));
            result.extend(
                tx.exon_ranges(Strand::Positive)
                    .into_iter()
                    .enumerate()
                    .map(|(exon_idx, range)| {
                        (
                            Part::Exon {
                                transcript: tx_idx,
                                exon: exon_idx,
                            },
                            range,
                        )
                    }),
            );
        }
        result
    }
}

impl Projectable for Enhancer {
    fn parts(&self) -> Vec<(Part, Range<i32>)> {
        vec![(Part::Region, self.location.range_on_strand(Strand::Positive))]
    }
}

/// A feature projected onto a route.
#[derive(Debug, Clone)]
pub struct Projection<'r, T> {
    pub feature: Arc<T>,
    pub route: &'r Route,
    /// Pieces in route order, then in part order.
    pub pieces: Vec<Piece>,
}

impl<'r, T> Projection<'r, T> {
    pub fn pieces_of(&self, part: Part) -> impl Iterator<Item = &Piece> + '_ {
        self.pieces.iter().filter(move |piece| piece.part == part)
    }
}

/// Project `feature` onto `route`, `None` if it does not touch any segment.
pub fn project<'r, T: Projectable>(feature: &Arc<T>, route: &'r Route) -> Option<Projection<'r, T>> {
    let contig_id = feature.location().contig_id();
    let parts = feature.parts();

    let mut pieces = Vec::new();
    for (segment_idx, segment) in route.segments().iter().enumerate() {
        if segment.contig_id() != contig_id {
            continue;
        }
        let segment_range = segment.reference_range();
        for (part, part_range) in &parts {
            match intersect(part_range, &segment_range) {
                // Zero-length flanks only mark the edge of the window.
                Some(range) if range.is_empty() && segment.event == Event::Gap => (),
                Some(range) => pieces.push(Piece {
                    part: *part,
                    segment: segment_idx,
                    event: segment.event,
                    range,
                }),
                None => (),
            }
        }
    }

    if pieces.is_empty() {
        tracing::trace!("{} does not overlap route", feature.id());
        None
    } else {
        Some(Projection {
            feature: feature.clone(),
            route,
            pieces,
        })
    }
}
