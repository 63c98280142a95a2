//! Phenotype services consumed by the relevance calculators: term ancestry, term-set
//! similarity, and gene to disease links.

pub mod algos;

#[cfg(test)]
pub(crate) mod fixtures;

use std::{
    collections::{HashMap, HashSet},
    path::Path,
    sync::Arc,
};

use indexmap::IndexMap;
use multimap::MultiMap;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{common::io::open_read_maybe_gz, model::TermId};

pub use algos::HpoPhenomizerSimilarity;

/// Ancestor lookup in an ontology.
pub trait TermAncestry: Send + Sync {
    /// All ancestors of `term`, including the term itself.
    fn ancestors(&self, term: &TermId) -> HashSet<TermId>;
}

/// Similarity between two term sets, in `[0, 1]`.
pub trait PhenotypeSimilarity: Send + Sync {
    fn similarity(&self, query: &[TermId], target: &[TermId]) -> f64;
}

/// In-memory ontology DAG as child to parent edges, e.g. phenotype to anatomy links.
#[derive(Debug, Clone, Default)]
pub struct Ontology {
    parents: HashMap<TermId, Vec<TermId>>,
}

impl Ontology {
    pub fn from_edges<I, T>(edges: I) -> Self
    where
        I: IntoIterator<Item = (T, T)>,
        T: Into<TermId>,
    {
        let mut parents: HashMap<TermId, Vec<TermId>> = HashMap::new();
        for (child, parent) in edges {
            parents.entry(child.into()).or_default().push(parent.into());
        }
        Self { parents }
    }

    /// Number of terms with at least one parent.
    pub fn len(&self) -> usize {
        self.parents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.parents.is_empty()
    }
}

impl TermAncestry for Ontology {
    fn ancestors(&self, term: &TermId) -> HashSet<TermId> {
        let mut result = HashSet::new();
        let mut stack = vec![term.clone()];
        while let Some(current) = stack.pop() {
            if let Some(parents) = self.parents.get(&current) {
                stack.extend(parents.iter().filter(|p| !result.contains(*p)).cloned());
            }
            result.insert(current);
        }
        result
    }
}

/// Module with code for loading data from input.
mod input {
    use serde::Deserialize;

    /// Ontology edge in the term TSV.
    #[derive(Deserialize, Debug)]
    pub struct Edge {
        pub term: String,
        pub parent: String,
    }

    /// Gene to disease link in the disease TSV.
    #[derive(Deserialize, Debug)]
    pub struct GeneDisease {
        pub gene: String,
        pub disease_id: String,
        pub disease_name: String,
        /// Comma-separated phenotype terms.
        pub terms: String,
    }
}

/// Load ontology edges from a headerless `term<TAB>parent` TSV.
#[tracing::instrument]
pub fn load_ontology(path: &Path) -> Result<Ontology, anyhow::Error> {
    debug!("loading ontology edges from {:?}...", path);
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .delimiter(b'\t')
        .comment(Some(b'#'))
        .from_reader(open_read_maybe_gz(path)?);
    let edges = reader
        .deserialize()
        .map(|record| record.map(|edge: input::Edge| (edge.term, edge.parent)))
        .collect::<Result<Vec<_>, _>>()?;
    let result = Ontology::from_edges(edges.iter().map(|(t, p)| (t.as_str(), p.as_str())));
    debug!("... done loading {} terms", result.len());
    Ok(result)
}

/// Load the HPO from a directory with `hp.obo`, `phenotype.hpoa`, and the gene annotations.
#[tracing::instrument]
pub fn load_hpo(path: &str) -> Result<hpo::Ontology, anyhow::Error> {
    debug!("loading HPO from {:?}...", path);
    let result = hpo::Ontology::from_standard(path)?;
    debug!("... done loading HPO");
    Ok(result)
}

/// A disease and its phenotype terms.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Disease {
    pub id: String,
    pub name: String,
    pub terms: Vec<TermId>,
}

/// Diseases associated with each gene, keyed by gene accession.
#[derive(Debug, Clone, Default)]
pub struct GeneDiseaseDb {
    by_gene: MultiMap<String, Arc<Disease>>,
}

impl GeneDiseaseDb {
    pub fn new<I>(links: I) -> Self
    where
        I: IntoIterator<Item = (String, Arc<Disease>)>,
    {
        Self {
            by_gene: links.into_iter().collect(),
        }
    }

    pub fn diseases(&self, gene_accession: &str) -> &[Arc<Disease>] {
        self.by_gene
            .get_vec(gene_accession)
            .map(|diseases| diseases.as_slice())
            .unwrap_or_default()
    }

    /// Number of genes with at least one disease.
    pub fn len(&self) -> usize {
        self.by_gene.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_gene.is_empty()
    }
}

/// Load gene to disease links from a TSV with header
/// `gene`, `disease_id`, `disease_name`, `terms`.
#[tracing::instrument]
pub fn load_gene_diseases(path: &Path) -> Result<GeneDiseaseDb, anyhow::Error> {
    debug!("loading gene to disease links from {:?}...", path);
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .delimiter(b'\t')
        .from_reader(open_read_maybe_gz(path)?);

    let mut diseases: IndexMap<String, Arc<Disease>> = IndexMap::new();
    let mut links = Vec::new();
    for record in reader.deserialize() {
        let record: input::GeneDisease = record?;
        let disease = diseases
            .entry(record.disease_id.clone())
            .or_insert_with(|| {
                Arc::new(Disease {
                    id: record.disease_id.clone(),
                    name: record.disease_name.clone(),
                    terms: record
                        .terms
                        .split(',')
                        .map(str::trim)
                        .filter(|term| !term.is_empty())
                        .map(TermId::from)
                        .collect(),
                })
            })
            .clone();
        links.push((record.gene, disease));
    }

    let result = GeneDiseaseDb::new(links);
    debug!(
        "... done loading {} diseases for {} genes",
        diseases.len(),
        result.len()
    );
    Ok(result)
}
