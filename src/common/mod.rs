//! Common functionality.

pub mod io;

use clap::Parser;
use clap_verbosity_flag::{InfoLevel, Verbosity};
use indexmap::IndexMap;

/// Commonly used command line arguments.
#[derive(Parser, Debug)]
pub struct Args {
    /// Verbosity of the program
    #[clap(flatten)]
    pub verbose: Verbosity<InfoLevel>,
}

impl Default for Args {
    fn default() -> Self {
        Self {
            verbose: Verbosity::new(0, 0),
        }
    }
}

/// Definition of canonical chromosome names.
pub const CHROMS: &[&str] = &[
    "1", "2", "3", "4", "5", "6", "7", "8", "9", "10", "11", "12", "13", "14", "15", "16", "17",
    "18", "19", "20", "21", "22", "X", "Y", "MT",
];

/// Contig lengths of the GRCh37 primary assembly, in the order of `CHROMS`.
const CONTIG_LENGTHS_37: &[i32; 25] = &[
    249250621, 243199373, 198022430, 191154276, 180915260, 171115067, 159138663, 146364022,
    141213431, 135534747, 135006516, 133851895, 115169878, 107349540, 102531392, 90354753,
    81195210, 78077248, 59128983, 63025520, 48129895, 51304566, 155270560, 59373566, 16569,
];

/// Contig lengths of the GRCh38 primary assembly, in the order of `CHROMS`.
const CONTIG_LENGTHS_38: &[i32; 25] = &[
    248956422, 242193529, 198295559, 190214555, 181538259, 170805979, 159345973, 145138636,
    138394717, 133797422, 135086622, 133275309, 114364328, 107043718, 101991189, 90338345,
    83257441, 80373285, 58617616, 64444167, 46709983, 50818468, 156040895, 57227415, 16569,
];

/// Build mapping of chromosome name aliases to the index in `CHROMS`.
pub fn build_chrom_map() -> IndexMap<String, usize> {
    let mut result = IndexMap::new();
    for (i, &chrom_name) in CHROMS.iter().enumerate() {
        result.insert(chrom_name.to_owned(), i);
        result.insert(format!("chr{chrom_name}"), i);
    }
    result.insert("x".to_owned(), 22);
    result.insert("y".to_owned(), 23);
    result.insert("chrx".to_owned(), 22);
    result.insert("chry".to_owned(), 23);
    result.insert("mt".to_owned(), 24);
    result.insert("m".to_owned(), 24);
    result.insert("M".to_owned(), 24);
    result.insert("chrmt".to_owned(), 24);
    result.insert("chrm".to_owned(), 24);
    result.insert("chrM".to_owned(), 24);
    result
}

/// Select the genome release to use.
#[derive(
    clap::ValueEnum,
    Clone,
    Copy,
    Debug,
    strum::Display,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    serde::Serialize,
    serde::Deserialize,
)]
pub enum GenomeRelease {
    // GRCh37 / hg19
    #[strum(serialize = "grch37")]
    Grch37,
    /// GRCh38 / hg38
    #[strum(serialize = "grch38")]
    Grch38,
}

impl GenomeRelease {
    pub fn name(&self) -> String {
        match self {
            GenomeRelease::Grch37 => String::from("GRCh37"),
            GenomeRelease::Grch38 => String::from("GRCh38"),
        }
    }

    /// Primary contigs as `(name, length)` pairs.
    pub fn contig_specs(&self) -> Vec<(&'static str, i32)> {
        let lengths = match self {
            GenomeRelease::Grch37 => CONTIG_LENGTHS_37,
            GenomeRelease::Grch38 => CONTIG_LENGTHS_38,
        };
        CHROMS.iter().copied().zip(lengths.iter().copied()).collect()
    }
}

impl std::str::FromStr for GenomeRelease {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.to_ascii_lowercase();
        if s.starts_with("grch37") {
            Ok(GenomeRelease::Grch37)
        } else if s.starts_with("grch38") {
            Ok(GenomeRelease::Grch38)
        } else {
            Err(anyhow::anyhow!("Unknown genome release: {}", s))
        }
    }
}

/// The version of `sv-prioritizer` package.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Return the version of the `sv-prioritizer` crate and `x.y.z` in tests.
pub fn worker_version() -> &'static str {
    if cfg!(test) {
        "x.y.z"
    } else {
        VERSION
    }
}

#[cfg(test)]
mod test {
    use pretty_assertions::assert_eq;

    use super::*;

    #[rstest::rstest]
    #[case("chr1", 0)]
    #[case("1", 0)]
    #[case("chrX", 22)]
    #[case("x", 22)]
    #[case("chrM", 24)]
    #[case("MT", 24)]
    fn build_chrom_map_aliases(#[case] name: &str, #[case] idx: usize) {
        assert_eq!(build_chrom_map().get(name), Some(&idx));
    }

    #[rstest::rstest]
    #[case(GenomeRelease::Grch37, "13", 115169878)]
    #[case(GenomeRelease::Grch38, "17", 83257441)]
    fn contig_specs(#[case] release: GenomeRelease, #[case] name: &str, #[case] len: i32) {
        let specs = release.contig_specs();
        assert_eq!(specs.len(), 25);
        assert_eq!(specs.iter().find(|(n, _)| *n == name), Some(&(name, len)));
    }

    #[test]
    fn genome_release_from_str() -> Result<(), anyhow::Error> {
        assert_eq!("GRCh37".parse::<GenomeRelease>()?, GenomeRelease::Grch37);
        assert_eq!("grch38.p13".parse::<GenomeRelease>()?, GenomeRelease::Grch38);
        assert!("hg19".parse::<GenomeRelease>().is_err());
        assert_eq!(worker_version(), "x.y.z");

        Ok(())
    }
}
