//! Shared builders for the prioritization tests, all on one 1000bp contig.

use std::sync::Arc;

use crate::model::{
    Contig, Coordinates, Enhancer, Gene, GenomicRegion, SimpleVariant, Strand, TadBoundary,
    Transcript, Variant, VariantType,
};

pub fn contig() -> Arc<Contig> {
    Arc::new(Contig::new(1, "1".to_owned(), 1000))
}

/// Zero-based region on `strand`.
pub fn region(strand: Strand, start: i32, end: i32) -> GenomicRegion {
    GenomicRegion::from_range(contig(), strand, start..end)
}

fn gene_with_cds(
    accession: &str,
    strand: Strand,
    start: i32,
    end: i32,
    exons: &[(i32, i32)],
    cds: Option<(i32, i32)>,
) -> Gene {
    let location = region(strand, start, end);
    let exons = exons
        .iter()
        .map(|(start, end)| Coordinates::zero_based(*start, *end).expect("invalid exon"))
        .collect();
    let cds = cds.map(|(start, end)| Coordinates::zero_based(start, end).expect("invalid CDS"));
    let transcript = Transcript::new(&format!("{}.1", accession), location.clone(), exons, cds)
        .expect("invalid transcript");
    Gene {
        accession: accession.to_owned(),
        symbol: accession.to_uppercase(),
        location,
        transcripts: vec![transcript],
    }
}

/// Coding gene with one transcript whose CDS is `[start + 10, end - 10)`.
pub fn gene(accession: &str, strand: Strand, start: i32, end: i32, exons: &[(i32, i32)]) -> Gene {
    gene_with_cds(accession, strand, start, end, exons, Some((start + 10, end - 10)))
}

pub fn noncoding_gene(
    accession: &str,
    strand: Strand,
    start: i32,
    end: i32,
    exons: &[(i32, i32)],
) -> Gene {
    gene_with_cds(accession, strand, start, end, exons, None)
}

pub fn enhancer(id: &str, start: i32, end: i32, tissues: &[&str]) -> Enhancer {
    Enhancer {
        id: id.to_owned(),
        location: region(Strand::Positive, start, end),
        tissues: tissues.iter().map(|term| ((*term).into(), 1.0)).collect(),
    }
}

pub fn tad(id: &str, start: i32, end: i32, stability: f64) -> TadBoundary {
    TadBoundary {
        id: id.to_owned(),
        location: region(Strand::Positive, start, end),
        stability,
    }
}

/// Simple variant on the positive strand; insertions are anchored at `start`.
pub fn variant(variant_type: VariantType, start: i32, end: i32, inserted_length: i32) -> Variant {
    let end = if variant_type == VariantType::Ins { start } else { end };
    Variant::Simple(SimpleVariant {
        id: format!("{}_{}_{}", variant_type, start, end),
        region: region(Strand::Positive, start, end),
        ref_allele: "N".to_owned(),
        alt_allele: format!("<{}>", variant_type),
        variant_type,
        inserted_length,
    })
}
