//! Route-based impact and phenotype-relevance prioritization of structural variants.

pub mod common;
pub mod conf;
pub mod db;
pub mod err;
pub mod model;
pub mod parse;
pub mod pheno;
pub mod prio;
