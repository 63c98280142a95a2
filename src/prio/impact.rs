//! Retained-function scores of projected features, 1.0 = intact, 0.0 = lost.

use std::ops::Range;

use crate::model::{
    coords::{intersect, ranges_overlap},
    Enhancer, Gene, Strand, Transcript,
};

use super::{
    projection::{Part, Projection},
    route::Event,
};

/// Impact of an in-frame insertion at a codon boundary.
const IN_FRAME_CODON_BOUNDARY: f64 = 0.8;
/// Impact of an insertion at a codon boundary that shifts the frame.
const FRAME_SHIFT_CODON_BOUNDARY: f64 = 0.5;
/// Impact of an insertion in the middle of a codon.
const MID_CODON: f64 = 0.1;
/// Impact of an insertion into an UTR or non-coding exon.
const NON_CODING: f64 = 0.7;

pub trait ImpactCalculator<T>: Send + Sync {
    fn calculate(&self, projection: &Projection<'_, T>) -> f64;
}

/// Gene impact from exon, CDS, and promoter pieces.
#[derive(Debug, Clone, derive_new::new)]
pub struct GeneSequenceImpactCalculator {
    /// Bases 5' of the transcript start counted as promoter.
    promoter_length: i32,
    /// Impact when only the promoter is hit.
    promoter_fitness_gain: f64,
}

/// Length of `range` clipped to the coding region.
fn coding_length(range: &Range<i32>, cds: &Range<i32>) -> i32 {
    intersect(range, cds)
        .map(|overlap| overlap.end - overlap.start)
        .unwrap_or(0)
}

/// Impact of inserting `inserted_length` bases at positive-strand `anchor`.
fn insertion_impact(tx: &Transcript, anchor: i32, inserted_length: i32) -> f64 {
    let strand = tx.strand();
    let anchor = match strand {
        Strand::Positive => anchor,
        Strand::Negative => tx.location.contig().length - anchor,
    };
    let cds = match tx.cds_range(strand) {
        Some(cds) => cds,
        None => return NON_CODING,
    };
    if anchor <= cds.start || anchor >= cds.end {
        return NON_CODING;
    }

    let mut coding_before = 0;
    for exon in tx.exon_ranges(strand) {
        if exon.end <= anchor {
            coding_before += coding_length(&exon, &cds);
        } else if exon.start < anchor {
            let frame = (coding_before + anchor - exon.start.max(cds.start)) % 3;
            return match (frame, inserted_length % 3) {
                (0, 0) => IN_FRAME_CODON_BOUNDARY,
                (0, _) => FRAME_SHIFT_CODON_BOUNDARY,
                _ => MID_CODON,
            };
        }
    }

    // intronic
    1.0
}

impl GeneSequenceImpactCalculator {
    fn transcript_impact(&self, projection: &Projection<'_, Gene>, tx_idx: usize) -> f64 {
        let tx = &projection.feature.transcripts[tx_idx];
        let tx_pieces = projection
            .pieces_of(Part::Transcript(tx_idx))
            .collect::<Vec<_>>();

        let mut score = if tx_pieces.iter().any(|piece| piece.event == Event::Breakend) {
            0.0
        } else if let [piece] = tx_pieces.as_slice() {
            if piece.range == tx.location.range_on_strand(Strand::Positive) {
                // the whole transcript is within one segment
                match piece.event {
                    Event::Deletion => 0.0,
                    _ => 1.0,
                }
            } else {
                self.exonic_impact(projection, tx_idx)
            }
        } else {
            self.exonic_impact(projection, tx_idx)
        };

        if score > 0.0 && self.promoter_hit(projection, tx) {
            score = score.min(self.promoter_fitness_gain);
        }
        score
    }

    fn exonic_impact(&self, projection: &Projection<'_, Gene>, tx_idx: usize) -> f64 {
        let tx = &projection.feature.transcripts[tx_idx];
        let segments = projection.route.segments();
        let cds = tx.cds_range(Strand::Positive);

        let mut score: f64 = 1.0;
        for (exon_idx, exon) in tx.exon_ranges(Strand::Positive).iter().enumerate() {
            let pieces = projection
                .pieces_of(Part::Exon {
                    transcript: tx_idx,
                    exon: exon_idx,
                })
                .collect::<Vec<_>>();
            let coding = cds
                .as_ref()
                .map_or(true, |cds| coding_length(exon, cds) > 0);

            if coding {
                if pieces
                    .iter()
                    .any(|piece| matches!(piece.event, Event::Deletion | Event::Inversion))
                {
                    return 0.0;
                }
                let split = pieces.iter().any(|piece| piece.segment != pieces[0].segment);
                if split && pieces.iter().any(|piece| piece.event == Event::Duplication) {
                    return 0.0;
                }
            }

            for piece in pieces.iter().filter(|piece| piece.event == Event::Insertion) {
                let inserted_length = segments[piece.segment].inserted_length;
                score = score.min(insertion_impact(tx, piece.range.start, inserted_length));
            }
        }

        score
    }

    /// Whether the promoter of `tx` overlaps any segment that is not a gap.
    fn promoter_hit(&self, projection: &Projection<'_, Gene>, tx: &Transcript) -> bool {
        let promoter = tx.promoter_range(self.promoter_length);
        if promoter.is_empty() {
            return false;
        }
        let promoter = match tx.strand() {
            Strand::Positive => promoter,
            Strand::Negative => {
                let length = tx.location.contig().length;
                length - promoter.end..length - promoter.start
            }
        };

        projection.route.segments().iter().any(|segment| {
            segment.event != Event::Gap
                && segment.contig_id() == tx.location.contig_id()
                && ranges_overlap(&promoter, &segment.reference_range())
        })
    }
}

impl ImpactCalculator<Gene> for GeneSequenceImpactCalculator {
    fn calculate(&self, projection: &Projection<'_, Gene>) -> f64 {
        (0..projection.feature.transcripts.len())
            .map(|tx_idx| self.transcript_impact(projection, tx_idx))
            .fold(1.0, f64::min)
    }
}

/// Enhancers are lost when hit by any rearrangement.
#[derive(Debug, Clone, Default)]
pub struct EnhancerSequenceImpactCalculator;

impl ImpactCalculator<Enhancer> for EnhancerSequenceImpactCalculator {
    fn calculate(&self, projection: &Projection<'_, Enhancer>) -> f64 {
        let disrupted = projection.pieces.iter().any(|piece| {
            matches!(
                piece.event,
                Event::Deletion | Event::Inversion | Event::Duplication | Event::Breakend
            )
        });
        if disrupted {
            0.0
        } else {
            1.0
        }
    }
}
