//! Phenotype similarity for tests that runs on a toy ontology.

use std::{collections::HashSet, sync::Arc};

use crate::model::TermId;

use super::{algos::phenomizer, PhenotypeSimilarity, TermAncestry};

/// Phenomizer score with the Jaccard index of ancestor sets as term score.
pub struct AncestorJaccard(pub Arc<dyn TermAncestry>);

fn jaccard(lhs: &HashSet<TermId>, rhs: &HashSet<TermId>) -> f64 {
    let union = lhs.union(rhs).count();
    if union == 0 {
        0.0
    } else {
        lhs.intersection(rhs).count() as f64 / union as f64
    }
}

impl PhenotypeSimilarity for AncestorJaccard {
    fn similarity(&self, query: &[TermId], target: &[TermId]) -> f64 {
        let ancestors = |terms: &[TermId]| {
            terms
                .iter()
                .map(|term| self.0.ancestors(term))
                .collect::<Vec<_>>()
        };
        phenomizer::score(&ancestors(query), &ancestors(target), jaccard)
    }
}
