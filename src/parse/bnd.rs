//! Assembly of breakend records (`N[chr:pos[` notation) into breakend pairs.

use std::sync::Arc;

use bio::alphabets::dna;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::{
    err::RecordError,
    model::{
        Breakend, BreakendVariant, ConfidenceInterval, Contig, Coordinates, GenomicAssembly,
        GenomicRegion, Strand,
    },
};

/// A single breakend record as provided by the variant source.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BreakendRecord {
    pub id: String,
    pub contig: String,
    /// 1-based position of the REF base.
    pub pos: i32,
    pub reference: String,
    pub alternatives: Vec<String>,
    pub mate_id: Option<String>,
    pub event_id: Option<String>,
    /// Raw value of the `CIPOS` attribute, e.g. `"-10,20"`.
    pub cipos: Option<String>,
    /// Raw value of the `CIEND` attribute.
    pub ciend: Option<String>,
}

/// Turns breakend records into normalized two-ended adjacencies.
#[derive(Debug, Clone)]
pub struct BreakendAssembler {
    assembly: Arc<GenomicAssembly>,
    re_alt: Regex,
}

/// Parse a `CIPOS`/`CIEND` style pair of offsets; absent means precise.
pub(crate) fn parse_confidence_interval(
    key: &str,
    value: Option<&String>,
) -> Result<ConfidenceInterval, RecordError> {
    let malformed = || RecordError::MalformedAttribute {
        key: key.to_owned(),
        value: value.cloned().unwrap_or_default(),
    };
    match value {
        None => Ok(ConfidenceInterval::precise()),
        Some(value) => {
            let offsets = value
                .split(',')
                .map(|s| s.trim().parse::<i32>())
                .collect::<Result<Vec<_>, _>>()
                .map_err(|_| malformed())?;
            match offsets.as_slice() {
                [lower, upper] => Ok(ConfidenceInterval::new(*lower, *upper)),
                _ => Err(malformed()),
            }
        }
    }
}

fn reverse_complement(seq: &str) -> Result<String, RecordError> {
    String::from_utf8(dna::revcomp(seq.as_bytes()))
        .map_err(|_| RecordError::MalformedAltAllele(seq.to_owned()))
}

/// Build a zero-length region at the zero-based `anchor` of the positive strand, then
/// move it to `strand`.
fn breakend_region(
    contig: &Arc<Contig>,
    anchor: i32,
    strand: Strand,
    ci: ConfidenceInterval,
) -> Result<GenomicRegion, RecordError> {
    let coordinates = Coordinates::zero_based(anchor, anchor)?.with_confidence(ci, ci);
    Ok(GenomicRegion::new(contig.clone(), Strand::Positive, coordinates)?.with_strand(strand))
}

impl BreakendAssembler {
    pub fn new(assembly: Arc<GenomicAssembly>) -> Self {
        let re_alt = Regex::new(
            r"^(?P<head>[ACGTUWSMKRYBDHVNacgtuwsmkrybdhvn]*)(?P<left>[\[\]])(?P<contig>[\w.<>]+):(?P<pos>\d+)(?P<right>[\[\]])(?P<tail>[ACGTUWSMKRYBDHVNacgtuwsmkrybdhvn]*)$",
        )
        .expect("invalid regex in source code");
        Self { assembly, re_alt }
    }

    pub fn assembly(&self) -> &Arc<GenomicAssembly> {
        &self.assembly
    }

    fn contig(&self, name: &str) -> Result<&Arc<Contig>, RecordError> {
        self.assembly
            .contig_by_name(name)
            .ok_or_else(|| RecordError::UnknownContig(name.to_owned()))
    }

    /// Assemble one breakend record into the left (local) and right (mate) breakend.
    pub fn assemble(&self, record: &BreakendRecord) -> Result<BreakendVariant, RecordError> {
        let contig = self.contig(&record.contig)?;

        let unsupported = |reason: &str| RecordError::UnsupportedRecord {
            id: record.id.clone(),
            reason: reason.to_owned(),
        };
        let alt = match record.alternatives.as_slice() {
            [alt] => alt,
            _ => return Err(unsupported("expected exactly one ALT allele")),
        };
        let mate_id = record
            .mate_id
            .as_ref()
            .ok_or_else(|| unsupported("missing MATEID"))?;

        let ci_pos = parse_confidence_interval("CIPOS", record.cipos.as_ref())?;
        let ci_end = parse_confidence_interval("CIEND", record.ciend.as_ref())?;

        let captures = self
            .re_alt
            .captures(alt)
            .ok_or_else(|| RecordError::MalformedAltAllele(alt.clone()))?;
        let capture = |name: &str| captures.name(name).map(|m| m.as_str()).unwrap_or_default();
        let (head, tail) = (capture("head"), capture("tail"));
        let mate_contig = self.contig(capture("contig"))?;
        let mate_pos = capture("pos")
            .parse::<i32>()
            .map_err(|_| RecordError::MalformedAltAllele(alt.clone()))?;

        if record.reference.len() != 1 {
            return Err(unsupported("REF allele must be a single base"));
        }
        let ambiguous = || RecordError::StrandAmbiguous {
            reference: record.reference.clone(),
            alt: alt.clone(),
        };
        let ref_base = record.reference.to_ascii_uppercase();
        let strand = match (head.is_empty(), tail.is_empty()) {
            (false, true) if head[..1].eq_ignore_ascii_case(&ref_base) => Strand::Positive,
            (true, false) if tail[tail.len() - 1..].eq_ignore_ascii_case(&ref_base) => {
                Strand::Negative
            }
            _ => return Err(ambiguous()),
        };

        let mate_strand = match (capture("left"), capture("right")) {
            ("[", "[") => Strand::Positive,
            ("]", "]") => Strand::Negative,
            _ => return Err(RecordError::BracketMismatch(alt.clone())),
        };

        // The join sits after the REF base for the positive local strand and before it for
        // the negative one; for the mate it is the other way round.
        let anchor = match strand {
            Strand::Positive => record.pos,
            Strand::Negative => record.pos - 1,
        };
        let mate_anchor = match mate_strand {
            Strand::Positive => mate_pos - 1,
            Strand::Negative => mate_pos,
        };

        let left = Breakend::new(&record.id, breakend_region(contig, anchor, strand, ci_pos)?)?;
        let right = Breakend::new(
            mate_id,
            breakend_region(mate_contig, mate_anchor, mate_strand, ci_end)?,
        )?;

        let (ref_allele, inserted_sequence) = match strand {
            Strand::Positive => (record.reference.clone(), head[1..].to_owned()),
            Strand::Negative => (
                reverse_complement(&record.reference)?,
                reverse_complement(&tail[..tail.len() - 1])?,
            ),
        };

        Ok(BreakendVariant {
            event_id: record.event_id.clone().unwrap_or_else(|| record.id.clone()),
            left,
            right,
            ref_allele,
            inserted_sequence,
        })
    }
}
