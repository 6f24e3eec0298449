//! Parser for VCF data lines.
//!
//! Only the first five columns are read:
//! `CHROM  POS  ID  REF  ALT`
//!
//! Positions are 1-based in the file and stored 0-based. Symbolic and
//! breakend alternates (`<DEL>`, `A]chr2:100]`) and the missing allele `.`
//! cannot be matched against read bases and are dropped; a record left
//! without alternates is ignored.

use std::io::{BufRead, BufReader};
use std::path::Path;

use flate2::read::MultiGzDecoder;
use tracing::debug;

use crate::core::{Region, Variant};
use crate::pileup::HhgaError;
use crate::utils::validation::is_sequence_allele;

/// Load the variants whose position lies inside `region`, in file order.
///
/// Plain, gzip and bgzip files are accepted.
///
/// # Errors
///
/// Returns `HhgaError::SourceOpen` if the file cannot be opened, or the
/// errors of [`read_variants`].
pub fn load_variants(path: &Path, region: &Region) -> Result<Vec<Variant>, HhgaError> {
    let label = path.display().to_string();
    let file = std::fs::File::open(path).map_err(|e| HhgaError::SourceOpen {
        path: label.clone(),
        reason: e.to_string(),
    })?;

    let gzipped = path
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("gz") || e.eq_ignore_ascii_case("bgz"));

    if gzipped {
        read_variants(BufReader::new(MultiGzDecoder::new(file)), region, &label)
    } else {
        read_variants(BufReader::new(file), region, &label)
    }
}

/// Read VCF text, keeping records on the region's contig whose position lies
/// inside the region.
///
/// # Errors
///
/// Returns `HhgaError::ReadFailed` on I/O errors, or
/// `HhgaError::InvalidVariant` for a data line with fewer than five columns,
/// a bad position, or a non-nucleotide reference allele.
pub fn read_variants<R: BufRead>(
    reader: R,
    region: &Region,
    label: &str,
) -> Result<Vec<Variant>, HhgaError> {
    let mut variants = Vec::new();

    for (index, line) in reader.lines().enumerate() {
        let line_number = index + 1;
        let line = line.map_err(|e| HhgaError::ReadFailed {
            path: label.to_string(),
            reason: e.to_string(),
        })?;

        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        if let Some(variant) = parse_record(&line, region).map_err(|reason| {
            HhgaError::InvalidVariant {
                path: label.to_string(),
                line: line_number,
                reason,
            }
        })? {
            variants.push(variant);
        }
    }

    debug!(path = label, region = %region, variants = variants.len(), "Loaded variants");
    Ok(variants)
}

/// Parse one data line; Ok(None) for records outside the region.
fn parse_record(line: &str, region: &Region) -> Result<Option<Variant>, String> {
    let fields: Vec<&str> = line.splitn(6, '\t').collect();
    if fields[0] != region.contig {
        return Ok(None);
    }
    if fields.len() < 5 {
        return Err(format!("expected at least 5 columns, found {}", fields.len()));
    }

    let (pos, reference, alternates) = (fields[1], fields[3], fields[4]);

    let pos: u64 = pos
        .parse()
        .map_err(|_| format!("invalid position '{pos}'"))?;
    let Some(position) = pos.checked_sub(1) else {
        return Err("position must be at least 1".to_string());
    };
    if !region.contains(position) {
        return Ok(None);
    }

    if !is_sequence_allele(reference) {
        return Err(format!("invalid reference allele '{reference}'"));
    }

    let alternates: Vec<String> = alternates
        .split(',')
        .filter(|alt| is_sequence_allele(alt))
        .map(str::to_ascii_uppercase)
        .collect();

    if alternates.is_empty() {
        debug!(position, "No sequence alternates, ignoring record");
        return Ok(None);
    }

    Ok(Some(Variant::new(
        position,
        reference.to_ascii_uppercase(),
        alternates,
    )))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;
    use tempfile::TempDir;

    const VCF: &str = "##fileformat=VCFv4.2
##contig=<ID=chr1,length=1000>
#CHROM\tPOS\tID\tREF\tALT\tQUAL\tFILTER\tINFO
chr1\t100\t.\tA\tG\t50\tPASS\t.
chr1\t105\trs1\ta\tg,t\t50\tPASS\tDP=10
chr1\t107\t.\tC\t<DEL>\t50\tPASS\tSVTYPE=DEL
chr1\t111\t.\tC\tT\t50\tPASS\t.
chr2\t105\t.\tA\tT\t50\tPASS\t.
";

    fn region() -> Region {
        Region::new("chr1", 100, 110).unwrap()
    }

    #[test]
    fn test_read_variants() {
        let variants = read_variants(Cursor::new(VCF), &region(), "test.vcf").unwrap();

        // POS 100 is 0-based 99, outside the region; so is POS 111
        assert_eq!(variants.len(), 1);
        assert_eq!(variants[0].position, 104);
        assert_eq!(variants[0].reference, "A");
        assert_eq!(variants[0].alternates, vec!["G", "T"]);
    }

    #[test]
    fn test_region_edges() {
        let vcf = "chr1\t101\t.\tA\tG\nchr1\t110\t.\tC\tT\nchr1\t111\t.\tC\tT\n";
        let variants = read_variants(Cursor::new(vcf), &region(), "test.vcf").unwrap();

        let positions: Vec<u64> = variants.iter().map(|v| v.position).collect();
        assert_eq!(positions, vec![100, 109]);
    }

    #[test]
    fn test_invalid_records() {
        let short = read_variants(Cursor::new("chr1\t105\t.\tA\n"), &region(), "x.vcf");
        assert!(matches!(
            short,
            Err(HhgaError::InvalidVariant { line: 1, .. })
        ));

        let bad_pos = read_variants(
            Cursor::new("##header\nchr1\tabc\t.\tA\tG\n"),
            &region(),
            "x.vcf",
        );
        assert!(matches!(
            bad_pos,
            Err(HhgaError::InvalidVariant { line: 2, .. })
        ));

        let zero = read_variants(Cursor::new("chr1\t0\t.\tA\tG\n"), &region(), "x.vcf");
        assert!(zero.is_err());

        let bad_ref = read_variants(Cursor::new("chr1\t105\t.\t<X>\tG\n"), &region(), "x.vcf");
        assert!(bad_ref.is_err());
    }

    #[test]
    fn test_other_contigs_not_validated() {
        let vcf = "chr2\tnot_a_number\n";
        let variants = read_variants(Cursor::new(vcf), &region(), "x.vcf").unwrap();
        assert!(variants.is_empty());
    }

    #[test]
    fn test_load_gzipped() {
        use flate2::write::GzEncoder;
        use flate2::Compression;
        use std::io::Write;

        let dir = TempDir::new().unwrap();
        let path = dir.path().join("calls.vcf.gz");
        let file = std::fs::File::create(&path).unwrap();
        let mut encoder = GzEncoder::new(file, Compression::default());
        encoder.write_all(VCF.as_bytes()).unwrap();
        encoder.finish().unwrap();

        let variants = load_variants(&path, &region()).unwrap();
        assert_eq!(variants.len(), 1);
    }

    #[test]
    fn test_missing_file() {
        let dir = TempDir::new().unwrap();
        let result = load_variants(&dir.path().join("missing.vcf"), &region());
        assert!(matches!(result, Err(HhgaError::SourceOpen { .. })));
    }
}
