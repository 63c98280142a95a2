//! Aggregation of impact and relevance into one priority per variant.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::model::{Enhancer, Gene};

use super::{
    dispatch::RouteData,
    impact::ImpactCalculator,
    projection::project,
    relevance::{EnhancerGeneRelevanceCalculator, GeneRelevanceCalculator},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FeatureKind {
    Gene,
    Enhancer,
}

/// Share of one feature in the priority.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Contribution {
    pub kind: FeatureKind,
    pub feature_id: String,
    /// Gene that an enhancer contribution is counted for.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gene_id: Option<String>,
    pub impact: f64,
    pub relevance: f64,
    pub score: f64,
}

/// Priority of a variant, `NaN` if the variant was not evaluated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SvPriority {
    pub variant_id: String,
    pub priority: f64,
    /// Features with a non-zero share, in evaluation order.
    pub contributions: Vec<Contribution>,
}

impl SvPriority {
    pub fn unknown(variant_id: &str) -> Self {
        Self {
            variant_id: variant_id.to_owned(),
            priority: f64::NAN,
            contributions: Vec::new(),
        }
    }

    pub fn is_known(&self) -> bool {
        !self.priority.is_nan()
    }
}

/// Sums gene and enhancer contributions of a route.
pub struct RouteDataEvaluator {
    gene_factor: f64,
    enhancer_factor: f64,
    gene_impact: Arc<dyn ImpactCalculator<Gene>>,
    enhancer_impact: Arc<dyn ImpactCalculator<Enhancer>>,
}

impl RouteDataEvaluator {
    pub fn new(
        gene_factor: f64,
        enhancer_factor: f64,
        gene_impact: Arc<dyn ImpactCalculator<Gene>>,
        enhancer_impact: Arc<dyn ImpactCalculator<Enhancer>>,
    ) -> Self {
        Self {
            gene_factor,
            enhancer_factor,
            gene_impact,
            enhancer_impact,
        }
    }

    pub fn evaluate(
        &self,
        variant_id: &str,
        data: &RouteData,
        gene_relevance: &dyn GeneRelevanceCalculator,
        enhancer_relevance: &dyn EnhancerGeneRelevanceCalculator,
    ) -> SvPriority {
        let route = &data.route;
        let enhancer_impacts = data
            .enhancers
            .iter()
            .map(|enhancer| {
                let impact = project(enhancer, route)
                    .map(|projection| self.enhancer_impact.calculate(&projection))
                    .unwrap_or(1.0);
                (enhancer, impact)
            })
            .collect::<Vec<_>>();

        let mut priority = 0.0;
        let mut contributions = Vec::new();
        for gene in &data.genes {
            let impact = project(gene, route)
                .map(|projection| self.gene_impact.calculate(&projection))
                .unwrap_or(1.0);
            let relevance = gene_relevance.calculate(gene);
            let score = self.gene_factor * relevance * (1.0 - impact);
            priority += score;
            if score > 0.0 {
                contributions.push(Contribution {
                    kind: FeatureKind::Gene,
                    feature_id: gene.accession.clone(),
                    gene_id: None,
                    impact,
                    relevance,
                    score,
                });
            }

            for (enhancer, impact) in &enhancer_impacts {
                if *impact >= 1.0 || enhancer.location.contig_id() != gene.location.contig_id() {
                    continue;
                }
                let relevance = enhancer_relevance.calculate(gene, enhancer);
                let score = self.enhancer_factor * relevance * (1.0 - impact);
                priority += score;
                if score > 0.0 {
                    contributions.push(Contribution {
                        kind: FeatureKind::Enhancer,
                        feature_id: enhancer.id.clone(),
                        gene_id: Some(gene.accession.clone()),
                        impact: *impact,
                        relevance,
                        score,
                    });
                }
            }
        }

        tracing::trace!(
            "{}: priority {} from {} contributions",
            variant_id,
            priority,
            contributions.len()
        );
        SvPriority {
            variant_id: variant_id.to_owned(),
            priority,
            contributions,
        }
    }
}
