//! Annotation database: genes, enhancers, and TAD boundaries with overlap indices.

pub mod overlap;

use std::{path::Path, sync::Arc, time::Instant};

use tracing::{debug, info, warn};

use crate::{
    common::io::open_read_maybe_gz,
    model::{Coordinates, Enhancer, Gene, GenomicAssembly, GenomicRegion, TadBoundary, Transcript},
};

use self::overlap::OverlapIndex;

/// Bundle of the annotation indices, built once and shared read-only.
#[derive(Debug)]
pub struct AnnotationDb {
    pub genes: OverlapIndex<Gene>,
    pub enhancers: OverlapIndex<Enhancer>,
    pub tad_boundaries: OverlapIndex<TadBoundary>,
}

impl AnnotationDb {
    pub fn new(genes: Vec<Gene>, enhancers: Vec<Enhancer>, tad_boundaries: Vec<TadBoundary>) -> Self {
        Self {
            genes: OverlapIndex::new(genes),
            enhancers: OverlapIndex::new(enhancers),
            tad_boundaries: OverlapIndex::new(tad_boundaries),
        }
    }
}

/// Module with code for loading data from input.
mod input {
    use indexmap::IndexMap;
    use serde::Deserialize;

    use crate::model::Strand;

    /// Transcript in a gene JSON line, zero-based half-open on the gene strand.
    #[derive(Deserialize, Debug)]
    pub struct Transcript {
        pub accession: String,
        pub start: i32,
        pub end: i32,
        pub exons: Vec<(i32, i32)>,
        pub cds: Option<(i32, i32)>,
    }

    /// One gene per JSON line.
    #[derive(Deserialize, Debug)]
    pub struct Gene {
        pub accession: String,
        pub symbol: String,
        pub contig: String,
        pub strand: Strand,
        pub start: i32,
        pub end: i32,
        pub transcripts: Vec<Transcript>,
    }

    /// One enhancer per JSON line, on the positive strand.
    #[derive(Deserialize, Debug)]
    pub struct Enhancer {
        pub id: String,
        pub contig: String,
        pub start: i32,
        pub end: i32,
        #[serde(default)]
        pub tissues: IndexMap<String, f64>,
    }

    /// TAD boundary BED record with stability.
    #[derive(Deserialize, Debug)]
    pub struct TadBoundary {
        pub contig: String,
        /// 0-based begin position from BED.
        pub start: i32,
        /// 0-based end position from BED.
        pub end: i32,
        pub id: String,
        pub stability: f64,
    }
}

fn convert_gene(record: input::Gene, assembly: &GenomicAssembly) -> Result<Gene, anyhow::Error> {
    let contig = assembly
        .contig_by_name(&record.contig)
        .ok_or_else(|| anyhow::anyhow!("unknown contig {:?}", &record.contig))?;
    let transcripts = record
        .transcripts
        .into_iter()
        .map(|tx| -> Result<Transcript, anyhow::Error> {
            let exons = tx
                .exons
                .iter()
                .map(|(start, end)| Coordinates::zero_based(*start, *end))
                .collect::<Result<Vec<_>, _>>()?;
            let cds = tx
                .cds
                .map(|(start, end)| Coordinates::zero_based(start, end))
                .transpose()?;
            let location =
                GenomicRegion::zero_based(contig.clone(), record.strand, tx.start, tx.end)?;
            Ok(Transcript::new(&tx.accession, location, exons, cds)?)
        })
        .collect::<Result<Vec<_>, _>>()?;

    Ok(Gene {
        accession: record.accession,
        symbol: record.symbol,
        location: GenomicRegion::zero_based(contig.clone(), record.strand, record.start, record.end)?,
        transcripts,
    })
}

fn convert_enhancer(
    record: input::Enhancer,
    assembly: &GenomicAssembly,
) -> Result<Enhancer, anyhow::Error> {
    let contig = assembly
        .contig_by_name(&record.contig)
        .ok_or_else(|| anyhow::anyhow!("unknown contig {:?}", &record.contig))?;
    Ok(Enhancer {
        id: record.id,
        location: GenomicRegion::zero_based(
            contig.clone(),
            crate::model::Strand::Positive,
            record.start,
            record.end,
        )?,
        tissues: record
            .tissues
            .into_iter()
            .map(|(term, score)| (term.as_str().into(), score))
            .collect(),
    })
}

fn convert_tad_boundary(
    record: input::TadBoundary,
    assembly: &GenomicAssembly,
) -> Result<TadBoundary, anyhow::Error> {
    let contig = assembly
        .contig_by_name(&record.contig)
        .ok_or_else(|| anyhow::anyhow!("unknown contig {:?}", &record.contig))?;
    Ok(TadBoundary {
        id: record.id,
        location: GenomicRegion::zero_based(
            contig.clone(),
            crate::model::Strand::Positive,
            record.start,
            record.end,
        )?,
        stability: record.stability,
    })
}

/// Read JSON lines from `path`, converting each and skipping failures with a warning.
fn load_json_lines<R, T, F>(path: &Path, convert: F) -> Result<Vec<T>, anyhow::Error>
where
    R: serde::de::DeserializeOwned,
    F: Fn(R) -> Result<T, anyhow::Error>,
{
    use std::io::BufRead;

    let mut result = Vec::new();
    for (lineno, line) in open_read_maybe_gz(path)?.lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let record: R = serde_json::from_str(&line)
            .map_err(|e| anyhow::anyhow!("{:?}:{}: invalid record: {}", path, lineno + 1, e))?;
        match convert(record) {
            Ok(value) => result.push(value),
            Err(e) => warn!("{:?}:{}: skipping record: {}", path, lineno + 1, e),
        }
    }
    Ok(result)
}

#[tracing::instrument(skip(assembly))]
pub fn load_genes(path: &Path, assembly: &GenomicAssembly) -> Result<Vec<Gene>, anyhow::Error> {
    debug!("loading genes from {:?}...", path);
    let result = load_json_lines(path, |record| convert_gene(record, assembly))?;
    debug!("... done loading {} genes", result.len());
    Ok(result)
}

#[tracing::instrument(skip(assembly))]
pub fn load_enhancers(
    path: &Path,
    assembly: &GenomicAssembly,
) -> Result<Vec<Enhancer>, anyhow::Error> {
    debug!("loading enhancers from {:?}...", path);
    let result = load_json_lines(path, |record| convert_enhancer(record, assembly))?;
    debug!("... done loading {} enhancers", result.len());
    Ok(result)
}

#[tracing::instrument(skip(assembly))]
pub fn load_tad_boundaries(
    path: &Path,
    assembly: &GenomicAssembly,
) -> Result<Vec<TadBoundary>, anyhow::Error> {
    debug!("loading TAD boundaries from {:?}...", path);
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false) // BED has no header
        .delimiter(b'\t')
        .comment(Some(b'#'))
        .from_reader(open_read_maybe_gz(path)?);
    let mut result = Vec::new();
    for record in reader.deserialize() {
        let record: input::TadBoundary = record?;
        match convert_tad_boundary(record, assembly) {
            Ok(tad) => result.push(tad),
            Err(e) => warn!("skipping TAD boundary: {}", e),
        }
    }
    debug!("... done loading {} TAD boundaries", result.len());
    Ok(result)
}

/// Paths to the annotation files.
#[derive(Debug, Clone)]
pub struct AnnotationPaths<'a> {
    pub genes: &'a Path,
    pub enhancers: Option<&'a Path>,
    pub tad_boundaries: Option<&'a Path>,
}

/// Load all annotation files and build the overlap indices.
#[tracing::instrument(skip(assembly))]
pub fn load_annotation_db(
    paths: &AnnotationPaths,
    assembly: &GenomicAssembly,
) -> Result<Arc<AnnotationDb>, anyhow::Error> {
    info!("Loading annotation databases");
    let before_loading = Instant::now();
    let genes = load_genes(paths.genes, assembly)?;
    let enhancers = match paths.enhancers {
        Some(path) => load_enhancers(path, assembly)?,
        None => Vec::new(),
    };
    let tad_boundaries = match paths.tad_boundaries {
        Some(path) => load_tad_boundaries(path, assembly)?,
        None => Vec::new(),
    };
    if genes.is_empty() {
        warn!("no genes loaded from {:?}", paths.genes);
    }

    let result = AnnotationDb::new(genes, enhancers, tad_boundaries);
    info!(
        "... done loading {} genes, {} enhancers, {} TAD boundaries in {:?}",
        result.genes.len(),
        result.enhancers.len(),
        result.tad_boundaries.len(),
        before_loading.elapsed()
    );

    Ok(Arc::new(result))
}
