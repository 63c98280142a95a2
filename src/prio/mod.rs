//! Route-based prioritization of structural variants and the `prioritize` sub command.

pub mod dispatch;
pub mod evaluator;
pub mod impact;
pub mod projection;
pub mod relevance;
pub mod route;

#[cfg(test)]
mod fixtures;

use std::{path::Path, sync::Arc, time::Instant};

use clap::Parser;
use itertools::Itertools;
use rayon::prelude::*;
use thousands::Separable;

use crate::{
    common::{io::open_write_maybe_gz, GenomeRelease},
    conf::{DispatchMode, PrioritizationConfig},
    db::{load_annotation_db, AnnotationDb, AnnotationPaths},
    model::{GenomicAssembly, TermId, Variant},
    parse::records::{read_variants, VariantConverter},
    pheno::{
        load_gene_diseases, load_hpo, load_ontology, GeneDiseaseDb, HpoPhenomizerSimilarity,
        Ontology, PhenotypeSimilarity, TermAncestry,
    },
};

use self::{
    dispatch::{Dispatcher, GeneDispatcher, RouteDataService, TadAwareDispatcher},
    evaluator::{RouteDataEvaluator, SvPriority},
    impact::{EnhancerSequenceImpactCalculator, GeneSequenceImpactCalculator},
    relevance::{
        EnhancerGeneRelevanceCalculator, GeneRelevanceCalculator, PhenotypeEnhancerRelevance,
        PhenotypeGeneRelevance, UniformRelevance,
    },
    route::Route,
};

/// What is known about the patient.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum PatientContext {
    /// Every feature is weighted the same.
    #[default]
    Empty,
    /// Phenotype terms observed in the patient.
    Phenotypes(Vec<TermId>),
}

/// Services needed for phenotype-aware relevance.
#[derive(Clone)]
pub struct PhenotypeServices {
    pub ancestry: Arc<dyn TermAncestry>,
    pub similarity: Arc<dyn PhenotypeSimilarity>,
    pub diseases: Arc<GeneDiseaseDb>,
}

/// Builds routes and priorities for variants against one annotation database.
pub struct SvPrioritizer {
    max_genes: usize,
    dispatcher: Box<dyn Dispatcher>,
    route_data: RouteDataService,
    evaluator: RouteDataEvaluator,
    phenotypes: Option<PhenotypeServices>,
}

impl SvPrioritizer {
    pub fn new(
        config: &PrioritizationConfig,
        db: Arc<AnnotationDb>,
        phenotypes: Option<PhenotypeServices>,
    ) -> Self {
        let dispatcher: Box<dyn Dispatcher> = match config.dispatcher {
            DispatchMode::Gene => Box::new(GeneDispatcher::new(db.clone())),
            DispatchMode::Tad => Box::new(TadAwareDispatcher::new(
                db.clone(),
                config.tad_stability_threshold,
                config.force_evaluate_tad,
            )),
        };
        let gene_impact = GeneSequenceImpactCalculator::new(
            i32::try_from(config.promoter_length).unwrap_or(i32::MAX),
            config.promoter_fitness_gain,
        );
        Self {
            max_genes: config.max_genes,
            dispatcher,
            route_data: RouteDataService::new(db),
            evaluator: RouteDataEvaluator::new(
                config.gene_factor,
                config.enhancer_factor,
                Arc::new(gene_impact),
                Arc::new(EnhancerSequenceImpactCalculator),
            ),
            phenotypes,
        }
    }

    /// Route of `variant` limited to its own reference span.
    pub fn build_route(&self, variant: &Variant) -> Route {
        route::build_route(variant)
    }

    pub fn prioritize(&self, variant: &Variant, context: &PatientContext) -> SvPriority {
        let (gene_relevance, enhancer_relevance) = self.relevance(context);
        self.prioritize_with(variant, gene_relevance.as_ref(), enhancer_relevance.as_ref())
    }

    /// Prioritize all `variants` in parallel, results are in input order.
    pub fn prioritize_all(&self, variants: &[Variant], context: &PatientContext) -> Vec<SvPriority> {
        let (gene_relevance, enhancer_relevance) = self.relevance(context);
        variants
            .par_iter()
            .map(|variant| {
                self.prioritize_with(variant, gene_relevance.as_ref(), enhancer_relevance.as_ref())
            })
            .collect()
    }

    fn prioritize_with(
        &self,
        variant: &Variant,
        gene_relevance: &dyn GeneRelevanceCalculator,
        enhancer_relevance: &dyn EnhancerGeneRelevanceCalculator,
    ) -> SvPriority {
        let data = self.route_data.fetch(self.dispatcher.dispatch(variant));
        if data.genes.len() > self.max_genes {
            tracing::warn!(
                "not evaluating {}: route contains {} genes, more than {}",
                variant.id(),
                data.genes.len(),
                self.max_genes
            );
            return SvPriority::unknown(variant.id());
        }
        self.evaluator
            .evaluate(variant.id(), &data, gene_relevance, enhancer_relevance)
    }

    fn relevance(
        &self,
        context: &PatientContext,
    ) -> (
        Box<dyn GeneRelevanceCalculator>,
        Box<dyn EnhancerGeneRelevanceCalculator>,
    ) {
        match (context, &self.phenotypes) {
            (PatientContext::Phenotypes(terms), Some(services)) if !terms.is_empty() => (
                Box::new(PhenotypeGeneRelevance::new(
                    services.diseases.clone(),
                    services.similarity.clone(),
                    terms.clone(),
                )),
                Box::new(PhenotypeEnhancerRelevance::new(
                    services.ancestry.clone(),
                    terms,
                )),
            ),
            (PatientContext::Phenotypes(terms), None) if !terms.is_empty() => {
                tracing::warn!("no phenotype services configured, ignoring patient terms");
                (Box::new(UniformRelevance), Box::new(UniformRelevance))
            }
            _ => (Box::new(UniformRelevance), Box::new(UniformRelevance)),
        }
    }
}

/// Command line arguments for `prioritize` sub command.
#[derive(Parser, Debug)]
#[command(author, version, about = "Prioritize structural variants", long_about = None)]
pub struct Args {
    /// Genome release to assume.
    #[arg(long, value_enum, default_value_t = GenomeRelease::Grch37)]
    pub genome_release: GenomeRelease,
    /// Path to input TSV file with variants.
    #[arg(long, required = true)]
    pub path_variants: String,
    /// Path to genes JSON lines file.
    #[arg(long, required = true)]
    pub path_genes: String,
    /// Path to enhancers JSON lines file.
    #[arg(long)]
    pub path_enhancers: Option<String>,
    /// Path to TAD boundaries BED file with stability column.
    #[arg(long)]
    pub path_tad_boundaries: Option<String>,
    /// Path to HPO directory with `hp.obo` and the annotation files.
    #[arg(long, requires = "path_gene_diseases")]
    pub path_hpo_dir: Option<String>,
    /// Path to gene to disease TSV file.
    #[arg(long, requires = "path_hpo_dir")]
    pub path_gene_diseases: Option<String>,
    /// Path to phenotype to anatomy edges TSV file, for enhancer tissues.
    #[arg(long)]
    pub path_ontology: Option<String>,
    /// Path to configuration JSON file.
    #[arg(long)]
    pub path_config: Option<String>,
    /// Phenotype terms of the patient.
    #[arg(long, value_delimiter = ',')]
    pub hpo_terms: Vec<String>,
    /// Path to the output TSV file.
    #[arg(long, required = true)]
    pub path_output: String,
    /// Number of worker threads, all cores by default.
    #[arg(long)]
    pub threads: Option<usize>,

    /// Override the gene factor of the configuration.
    #[arg(long)]
    pub gene_factor: Option<f64>,
    /// Override the enhancer factor of the configuration.
    #[arg(long)]
    pub enhancer_factor: Option<f64>,
    /// Override the promoter length of the configuration.
    #[arg(long)]
    pub promoter_length: Option<u32>,
    /// Override the dispatcher of the configuration.
    #[arg(long, value_enum)]
    pub dispatcher: Option<DispatchMode>,
    /// Always extend to the TAD boundaries.
    #[arg(long, default_value_t = false)]
    pub force_evaluate_tad: bool,
}

impl Args {
    /// Configuration file (or defaults) with the command line overrides applied.
    fn config(&self) -> Result<PrioritizationConfig, anyhow::Error> {
        let mut result = match &self.path_config {
            Some(path) => PrioritizationConfig::load(Path::new(path))?,
            None => PrioritizationConfig::default(),
        };
        if let Some(gene_factor) = self.gene_factor {
            result.gene_factor = gene_factor;
        }
        if let Some(enhancer_factor) = self.enhancer_factor {
            result.enhancer_factor = enhancer_factor;
        }
        if let Some(promoter_length) = self.promoter_length {
            result.promoter_length = promoter_length;
        }
        if let Some(dispatcher) = self.dispatcher {
            result.dispatcher = dispatcher;
        }
        result.force_evaluate_tad |= self.force_evaluate_tad;
        result.validate()?;
        Ok(result)
    }

    fn patient_context(&self) -> PatientContext {
        let terms = self
            .hpo_terms
            .iter()
            .map(|term| term.trim())
            .filter(|term| !term.is_empty())
            .map(TermId::from)
            .collect::<Vec<_>>();
        if terms.is_empty() {
            PatientContext::Empty
        } else {
            PatientContext::Phenotypes(terms)
        }
    }
}

/// Module with the output records.
mod output {
    use serde::Serialize;

    /// One row of the output TSV.
    #[derive(Serialize, Debug)]
    pub struct Record {
        pub id: String,
        pub priority: f64,
        pub n_contributions: usize,
        /// Contributions as JSON.
        pub contributions: String,
    }
}

fn load_phenotype_services(args: &Args) -> Result<Option<PhenotypeServices>, anyhow::Error> {
    let (path_hpo_dir, path_gene_diseases) = match (&args.path_hpo_dir, &args.path_gene_diseases) {
        (Some(path_hpo_dir), Some(path_gene_diseases)) => (path_hpo_dir, path_gene_diseases),
        _ => return Ok(None),
    };
    let ancestry: Arc<dyn TermAncestry> = match &args.path_ontology {
        Some(path_ontology) => Arc::new(load_ontology(Path::new(path_ontology))?),
        None => Arc::new(Ontology::default()),
    };
    Ok(Some(PhenotypeServices {
        ancestry,
        similarity: Arc::new(HpoPhenomizerSimilarity::with_lin(Arc::new(load_hpo(
            path_hpo_dir,
        )?))),
        diseases: Arc::new(load_gene_diseases(Path::new(path_gene_diseases))?),
    }))
}

/// Write `priorities` by decreasing priority, unknown priorities last.
fn write_priorities<P, T>(path: P, priorities: T) -> Result<(), anyhow::Error>
where
    P: AsRef<Path>,
    T: IntoIterator<Item = SvPriority>,
{
    let mut writer = csv::WriterBuilder::new()
        .has_headers(true)
        .delimiter(b'\t')
        .quote_style(csv::QuoteStyle::Never)
        .from_writer(open_write_maybe_gz(path)?);

    let sorted = priorities.into_iter().sorted_by(|a, b| {
        b.is_known()
            .cmp(&a.is_known())
            .then_with(|| b.priority.total_cmp(&a.priority))
    });
    for priority in sorted {
        writer.serialize(&output::Record {
            n_contributions: priority.contributions.len(),
            contributions: serde_json::to_string(&priority.contributions)?,
            id: priority.variant_id,
            priority: priority.priority,
        })?;
    }
    writer.flush()?;
    Ok(())
}

/// Summary counts of a prioritization run.
#[derive(Debug, Default)]
struct RunStats {
    count_total: usize,
    count_unknown: usize,
    count_positive: usize,
}

impl RunStats {
    fn from_priorities(priorities: &[SvPriority]) -> Self {
        Self {
            count_total: priorities.len(),
            count_unknown: priorities.iter().filter(|p| !p.is_known()).count(),
            count_positive: priorities.iter().filter(|p| p.priority > 0.0).count(),
        }
    }
}

/// Main entry point for `prioritize` sub command.
pub fn run(args_common: &crate::common::Args, args: &Args) -> Result<(), anyhow::Error> {
    let before_anything = Instant::now();
    tracing::info!("args_common = {:#?}", &args_common);
    tracing::info!("args = {:#?}", &args);

    if let Some(threads) = args.threads {
        rayon::ThreadPoolBuilder::new()
            .num_threads(threads)
            .build_global()
            .map_err(|e| anyhow::anyhow!("building global Rayon thread pool failed: {}", e))?;
    }

    let config = args.config()?;
    tracing::info!("config = {}", &serde_json::to_string(&config)?);

    let assembly = Arc::new(GenomicAssembly::from_release(args.genome_release));
    let db = load_annotation_db(
        &AnnotationPaths {
            genes: Path::new(&args.path_genes),
            enhancers: args.path_enhancers.as_deref().map(Path::new),
            tad_boundaries: args.path_tad_boundaries.as_deref().map(Path::new),
        },
        &assembly,
    )?;

    tracing::info!("Loading phenotype data...");
    let before_loading = Instant::now();
    let phenotypes = load_phenotype_services(args)?;
    tracing::info!(
        "... done loading phenotype data in {:?}",
        before_loading.elapsed()
    );

    tracing::info!("Reading variants...");
    let before_reading = Instant::now();
    let variants = read_variants(
        Path::new(&args.path_variants),
        &VariantConverter::new(assembly),
    )?;
    tracing::info!(
        "... done reading {} variants in {:?}",
        variants.len().separate_with_commas(),
        before_reading.elapsed()
    );

    tracing::info!("Prioritizing variants...");
    let before_prioritizing = Instant::now();
    let prioritizer = SvPrioritizer::new(&config, db, phenotypes);
    let priorities = prioritizer.prioritize_all(&variants, &args.patient_context());
    let stats = RunStats::from_priorities(&priorities);
    tracing::info!(
        "... done prioritizing in {:?}",
        before_prioritizing.elapsed()
    );
    tracing::info!(
        "summary: {} of {} variants with positive priority, {} not evaluated",
        stats.count_positive.separate_with_commas(),
        stats.count_total.separate_with_commas(),
        stats.count_unknown.separate_with_commas()
    );

    write_priorities(&args.path_output, priorities)?;

    tracing::info!(
        "All of `prioritize` completed in {:?}",
        before_anything.elapsed()
    );
    Ok(())
}
