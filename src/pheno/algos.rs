//! Phenotype-related algorithms.

use std::sync::Arc;

use hpo::{
    similarity::Builtins,
    term::InformationContentKind,
    HpoTerm, HpoTermId, Ontology,
};

use crate::model::TermId;

use super::PhenotypeSimilarity;

/// Similarity computation using the Phenomizer method.
pub mod phenomizer {
    /// Compute symmetric similarity score from the pairwise term scores `pair`.
    pub fn score<T, F>(qs: &[T], ds: &[T], pair: F) -> f64
    where
        F: Fn(&T, &T) -> f64,
    {
        (score_dir(qs, ds, &pair) + score_dir(ds, qs, &|d: &T, q: &T| pair(q, d))) / 2.0
    }

    /// "Directed" score part of phenomizer score.
    fn score_dir<T, F>(qs: &[T], ds: &[T], pair: &F) -> f64
    where
        F: Fn(&T, &T) -> f64,
    {
        // Handle case of empty `qs`.
        if qs.is_empty() {
            return 0.0;
        }

        // For each `q in qs` compute max similarity to any `d in ds`.
        let sum: f64 = qs
            .iter()
            .map(|q| ds.iter().map(|d| pair(q, d)).fold(0.0, f64::max))
            .sum();

        sum / qs.len() as f64
    }
}

/// Numeric part of an `HP:` term id, `None` for other ontologies.
pub fn hpo_term_number(term: &TermId) -> Option<u32> {
    term.as_str().strip_prefix("HP:")?.parse().ok()
}

/// Phenomizer similarity of HPO term sets on the full HPO.
///
/// Terms that are not in the HPO count towards the set size but never match.
pub struct HpoPhenomizerSimilarity {
    ontology: Arc<Ontology>,
    similarity: Builtins,
}

impl std::fmt::Debug for HpoPhenomizerSimilarity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HpoPhenomizerSimilarity").finish_non_exhaustive()
    }
}

impl HpoPhenomizerSimilarity {
    pub fn new(ontology: Arc<Ontology>, similarity: Builtins) -> Self {
        Self {
            ontology,
            similarity,
        }
    }

    /// Lin similarity with gene-based information content, bounded by 1.
    pub fn with_lin(ontology: Arc<Ontology>) -> Self {
        Self::new(ontology, Builtins::Lin(InformationContentKind::Gene))
    }

    fn resolve(&self, terms: &[TermId]) -> Vec<Option<HpoTerm<'_>>> {
        terms
            .iter()
            .map(|term| {
                hpo_term_number(term).and_then(|number| self.ontology.hpo(HpoTermId::from(number)))
            })
            .collect()
    }
}

impl PhenotypeSimilarity for HpoPhenomizerSimilarity {
    fn similarity(&self, query: &[TermId], target: &[TermId]) -> f64 {
        let qs = self.resolve(query);
        let ds = self.resolve(target);
        phenomizer::score(&qs, &ds, |q, d| match (q, d) {
            (Some(q), Some(d)) => f64::from(q.similarity_score(d, &self.similarity)),
            _ => 0.0,
        })
    }
}
