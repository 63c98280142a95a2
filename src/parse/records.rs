//! Tab-separated variant records and their conversion into `Variant` values.

use std::{path::Path, sync::Arc};

use serde::{Deserialize, Serialize};

use crate::{
    common::io::open_read_maybe_gz,
    err::RecordError,
    model::{Coordinates, GenomicAssembly, GenomicRegion, SimpleVariant, Strand, Variant, VariantType},
};

use super::bnd::{parse_confidence_interval, BreakendAssembler, BreakendRecord};

/// One row of the variant input TSV.
///
/// Positions follow the VCF convention: `pos` is the 1-based position of the padding
/// base and `end` the 1-based last affected base.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VariantRecord {
    pub id: String,
    pub contig: String,
    pub pos: i32,
    pub end: Option<i32>,
    #[serde(rename = "ref")]
    pub reference: String,
    /// ALT allele(s), comma-separated.
    pub alt: String,
    /// One of `DEL`, `INS`, `INV`, `DUP`, `BND`.
    pub sv_type: String,
    pub sv_len: Option<i32>,
    pub mate_id: Option<String>,
    pub event_id: Option<String>,
    pub cipos: Option<String>,
    pub ciend: Option<String>,
}

/// Converts input records into variants, delegating breakends to `BreakendAssembler`.
#[derive(Debug, Clone)]
pub struct VariantConverter {
    assembler: BreakendAssembler,
}

impl VariantConverter {
    pub fn new(assembly: Arc<GenomicAssembly>) -> Self {
        Self {
            assembler: BreakendAssembler::new(assembly),
        }
    }

    pub fn convert(&self, record: &VariantRecord) -> Result<Variant, RecordError> {
        if record.sv_type.eq_ignore_ascii_case("BND") {
            let bnd_record = BreakendRecord {
                id: record.id.clone(),
                contig: record.contig.clone(),
                pos: record.pos,
                reference: record.reference.clone(),
                alternatives: record.alt.split(',').map(|s| s.to_owned()).collect(),
                mate_id: record.mate_id.clone(),
                event_id: record.event_id.clone(),
                cipos: record.cipos.clone(),
                ciend: record.ciend.clone(),
            };
            return Ok(Variant::Breakended(self.assembler.assemble(&bnd_record)?));
        }

        let variant_type = record
            .sv_type
            .to_ascii_uppercase()
            .parse::<VariantType>()
            .map_err(|_| RecordError::UnsupportedRecord {
                id: record.id.clone(),
                reason: format!("unsupported SV type {:?}", &record.sv_type),
            })?;
        let contig = self
            .assembler
            .assembly()
            .contig_by_name(&record.contig)
            .ok_or_else(|| RecordError::UnknownContig(record.contig.clone()))?;

        let (end, inserted_length) = match variant_type {
            VariantType::Ins => {
                let inserted_length = match record.sv_len {
                    Some(sv_len) => sv_len.abs(),
                    None if !record.alt.starts_with('<') => {
                        record.alt.len() as i32 - record.reference.len() as i32
                    }
                    None => {
                        return Err(RecordError::MalformedAttribute {
                            key: "SVLEN".to_owned(),
                            value: String::new(),
                        })
                    }
                };
                (record.pos, inserted_length.max(0))
            }
            _ => (
                record.end.ok_or_else(|| RecordError::MalformedAttribute {
                    key: "END".to_owned(),
                    value: String::new(),
                })?,
                0,
            ),
        };

        let coordinates = Coordinates::zero_based(record.pos, end)?
            .with_confidence(
                parse_confidence_interval("CIPOS", record.cipos.as_ref())?,
                parse_confidence_interval("CIEND", record.ciend.as_ref())?,
            );

        Ok(Variant::Simple(SimpleVariant {
            id: record.id.clone(),
            region: GenomicRegion::new(contig.clone(), Strand::Positive, coordinates)?,
            ref_allele: record.reference.clone(),
            alt_allele: record.alt.clone(),
            variant_type,
            inserted_length,
        }))
    }
}

/// Read all variants from a TSV file, skipping and logging records that fail to convert.
#[tracing::instrument(skip(converter))]
pub fn read_variants(
    path: &Path,
    converter: &VariantConverter,
) -> Result<Vec<Variant>, anyhow::Error> {
    tracing::debug!("reading variants from {:?}...", path);
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .delimiter(b'\t')
        .from_reader(open_read_maybe_gz(path)?);

    let mut result = Vec::new();
    let mut skipped = 0;
    for record in reader.deserialize() {
        let record: VariantRecord = record?;
        match converter.convert(&record) {
            Ok(variant) => result.push(variant),
            Err(e) => {
                tracing::warn!("skipping record {:?}: {}", &record.id, &e);
                skipped += 1;
            }
        }
    }
    tracing::debug!(
        "... done reading {} variants, skipped {}",
        result.len(),
        skipped
    );

    Ok(result)
}

#[cfg(test)]
mod test {
    use std::io::Write;

    use pretty_assertions::assert_eq;

    use crate::common::GenomeRelease;

    use super::*;

    fn converter() -> VariantConverter {
        VariantConverter::new(Arc::new(GenomicAssembly::from_release(
            GenomeRelease::Grch37,
        )))
    }

    fn record(id: &str, sv_type: &str, pos: i32, end: Option<i32>, alt: &str) -> VariantRecord {
        VariantRecord {
            id: id.to_owned(),
            contig: "chr1".to_owned(),
            pos,
            end,
            reference: "N".to_owned(),
            alt: alt.to_owned(),
            sv_type: sv_type.to_owned(),
            ..Default::default()
        }
    }

    #[rstest::rstest]
    #[case(record("del", "DEL", 100, Some(200), "<DEL>"), VariantType::Del, 100..200, 0)]
    #[case(record("inv", "inv", 100, Some(200), "<INV>"), VariantType::Inv, 100..200, 0)]
    #[case(record("dup", "DUP", 100, Some(300), "<DUP>"), VariantType::Dup, 100..300, 0)]
    #[case(record("ins", "INS", 100, None, "NACGT"), VariantType::Ins, 100..100, 4)]
    fn convert_simple(
        #[case] record: VariantRecord,
        #[case] variant_type: VariantType,
        #[case] range: std::ops::Range<i32>,
        #[case] inserted_length: i32,
    ) -> Result<(), anyhow::Error> {
        match converter().convert(&record)? {
            Variant::Simple(variant) => {
                assert_eq!(variant.variant_type, variant_type);
                assert_eq!(variant.region.coordinates().range(), range);
                assert_eq!(variant.region.contig().name, "1");
                assert_eq!(variant.inserted_length, inserted_length);
            }
            Variant::Breakended(_) => panic!("expected simple variant"),
        }

        Ok(())
    }

    #[test]
    fn convert_symbolic_insertion_uses_sv_len() -> Result<(), anyhow::Error> {
        let mut record = record("ins", "INS", 100, None, "<INS>");
        assert!(converter().convert(&record).is_err());

        record.sv_len = Some(300);
        match converter().convert(&record)? {
            Variant::Simple(variant) => assert_eq!(variant.inserted_length, 300),
            Variant::Breakended(_) => panic!("expected simple variant"),
        }

        Ok(())
    }

    #[test]
    fn convert_breakend() -> Result<(), anyhow::Error> {
        let mut record = record("bnd_U", "BND", 123456, None, "C[2:321682[");
        record.contig = "13".to_owned();
        record.reference = "C".to_owned();
        record.mate_id = Some("bnd_V".to_owned());

        let variant = converter().convert(&record)?;
        assert_eq!(variant.id(), "bnd_U");
        assert!(matches!(variant, Variant::Breakended(_)));

        Ok(())
    }

    #[rstest::rstest]
    #[case(record("cnv", "CNV", 100, Some(200), "<CNV>"))]
    #[case(record("del", "DEL", 100, None, "<DEL>"))]
    #[case(record("del", "DEL", 200, Some(100), "<DEL>"))]
    fn convert_fails(#[case] record: VariantRecord) {
        assert!(converter().convert(&record).is_err());
    }

    #[tracing_test::traced_test]
    #[test]
    fn read_variants_skips_bad_records() -> Result<(), anyhow::Error> {
        let tmp_dir = temp_testdir::TempDir::default();
        let path = tmp_dir.join("variants.tsv");
        {
            let mut f = std::fs::File::create(&path)?;
            writeln!(f, "id\tcontig\tpos\tend\tref\talt\tsv_type\tsv_len\tmate_id\tevent_id\tcipos\tciend")?;
            writeln!(f, "del1\t1\t100\t200\tN\t<DEL>\tDEL\t-100\t\t\t\t")?;
            writeln!(f, "bad1\tchrUn\t100\t200\tN\t<DEL>\tDEL\t-100\t\t\t\t")?;
            writeln!(f, "bnd_U\t13\t123456\t\tC\tC[2:321682[\tBND\t\tbnd_V\ttra1\t-10,10\t")?;
        }

        let variants = read_variants(&path, &converter())?;

        assert_eq!(
            variants.iter().map(|v| v.id()).collect::<Vec<_>>(),
            vec!["del1", "tra1"]
        );
        assert!(logs_contain("skipping record \"bad1\""));

        Ok(())
    }
}
