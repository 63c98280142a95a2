//! Phenotype relevance weights of genes and enhancer-gene pairs, in `[0, 1]`.

use std::{collections::HashSet, sync::Arc};

use crate::{
    model::{Enhancer, Gene, TermId},
    pheno::{GeneDiseaseDb, PhenotypeSimilarity, TermAncestry},
};

pub trait GeneRelevanceCalculator: Send + Sync {
    fn calculate(&self, gene: &Gene) -> f64;
}

pub trait EnhancerGeneRelevanceCalculator: Send + Sync {
    fn calculate(&self, gene: &Gene, enhancer: &Enhancer) -> f64;
}

/// Every feature is fully relevant.
#[derive(Debug, Clone, Copy, Default)]
pub struct UniformRelevance;

impl GeneRelevanceCalculator for UniformRelevance {
    fn calculate(&self, _gene: &Gene) -> f64 {
        1.0
    }
}

impl EnhancerGeneRelevanceCalculator for UniformRelevance {
    fn calculate(&self, _gene: &Gene, _enhancer: &Enhancer) -> f64 {
        1.0
    }
}

/// Maximum similarity of the patient terms to any disease of the gene.
pub struct PhenotypeGeneRelevance {
    diseases: Arc<GeneDiseaseDb>,
    similarity: Arc<dyn PhenotypeSimilarity>,
    patient_terms: Vec<TermId>,
}

impl PhenotypeGeneRelevance {
    pub fn new(
        diseases: Arc<GeneDiseaseDb>,
        similarity: Arc<dyn PhenotypeSimilarity>,
        patient_terms: Vec<TermId>,
    ) -> Self {
        Self {
            diseases,
            similarity,
            patient_terms,
        }
    }
}

impl GeneRelevanceCalculator for PhenotypeGeneRelevance {
    fn calculate(&self, gene: &Gene) -> f64 {
        self.diseases
            .diseases(&gene.accession)
            .iter()
            .map(|disease| {
                self.similarity
                    .similarity(&self.patient_terms, &disease.terms)
                    .clamp(0.0, 1.0)
            })
            .fold(0.0, f64::max)
    }
}

/// Enhancers are relevant when one of their tissues shares an ancestor with the
/// patient terms.
pub struct PhenotypeEnhancerRelevance {
    ancestry: Arc<dyn TermAncestry>,
    /// Union of the ancestors of the patient terms.
    relevant_terms: HashSet<TermId>,
}

impl PhenotypeEnhancerRelevance {
    pub fn new(ancestry: Arc<dyn TermAncestry>, patient_terms: &[TermId]) -> Self {
        let relevant_terms = patient_terms
            .iter()
            .flat_map(|term| ancestry.ancestors(term))
            .collect();
        Self {
            ancestry,
            relevant_terms,
        }
    }
}

impl EnhancerGeneRelevanceCalculator for PhenotypeEnhancerRelevance {
    fn calculate(&self, _gene: &Gene, enhancer: &Enhancer) -> f64 {
        let relevant = enhancer.tissues.keys().any(|tissue| {
            self.ancestry
                .ancestors(tissue)
                .iter()
                .any(|term| self.relevant_terms.contains(term))
        });
        if relevant {
            1.0
        } else {
            0.0
        }
    }
}
