use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::{Path, PathBuf};

use noodles::csi::BinningIndex;
use noodles::sam::alignment::record::cigar::op::Kind;
use noodles::sam::alignment::RecordBuf;
use noodles::sam::header::record::value::map::header::tag;
use noodles::{bam, bgzf, csi, sam};
use tracing::{debug, info};

use crate::core::{Operation, Region};
use crate::parsing::interval;
use crate::pileup::{AlignmentSource, HhgaError, ReadError, ReadFlags, SourceItem, SourceRecord};

/// Alignment file formats that can be streamed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlignmentFormat {
    Sam,
    Bam,
}

impl AlignmentFormat {
    /// Detect the format from the file extension.
    ///
    /// # Errors
    ///
    /// Returns `HhgaError::UnsupportedFormat` for anything but `.sam` and `.bam`.
    pub fn from_path(path: &Path) -> Result<Self, HhgaError> {
        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_lowercase);

        match extension.as_deref() {
            Some("sam") => Ok(Self::Sam),
            Some("bam") => Ok(Self::Bam),
            Some(ext) => Err(HhgaError::UnsupportedFormat(format!(
                "{}: .{ext} alignments are not supported, expected .sam or .bam",
                path.display()
            ))),
            None => Err(HhgaError::UnsupportedFormat(format!(
                "{}: no file extension, expected .sam or .bam",
                path.display()
            ))),
        }
    }
}

trait RecordBufReader: Send {
    fn read_record_buf(&mut self, header: &sam::Header, record: &mut RecordBuf)
        -> io::Result<usize>;

    /// Move to a BGZF virtual position.
    fn seek(&mut self, _position: bgzf::VirtualPosition) -> io::Result<()> {
        Err(io::Error::new(
            io::ErrorKind::Unsupported,
            "uncompressed SAM cannot seek",
        ))
    }
}

impl<R: BufRead + Send> RecordBufReader for sam::io::Reader<R> {
    fn read_record_buf(
        &mut self,
        header: &sam::Header,
        record: &mut RecordBuf,
    ) -> io::Result<usize> {
        sam::io::Reader::read_record_buf(self, header, record)
    }
}

impl RecordBufReader for bam::io::Reader<bgzf::Reader<File>> {
    fn read_record_buf(
        &mut self,
        header: &sam::Header,
        record: &mut RecordBuf,
    ) -> io::Result<usize> {
        bam::io::Reader::read_record_buf(self, header, record)
    }

    fn seek(&mut self, position: bgzf::VirtualPosition) -> io::Result<()> {
        self.get_mut().seek(position).map(|_| ())
    }
}

type AlignmentIndex = Box<dyn BinningIndex + Send>;

/// Load `<path>.bai` or `<path>.csi` next to a BAM file, if present.
fn read_index(path: &Path) -> io::Result<Option<AlignmentIndex>> {
    let with_suffix = |suffix: &str| {
        let mut name = path.as_os_str().to_owned();
        name.push(suffix);
        PathBuf::from(name)
    };

    let bai = with_suffix(".bai");
    if bai.is_file() {
        return Ok(Some(Box::new(bam::bai::fs::read(bai)?)));
    }
    let csi = with_suffix(".csi");
    if csi.is_file() {
        return Ok(Some(Box::new(csi::fs::read(csi)?)));
    }
    Ok(None)
}

/// A SAM or BAM file read record by record.
///
/// An indexed BAM is read from the first chunk that can overlap the region;
/// anything else is read from the beginning.
pub struct SamSource {
    label: String,
    header: sam::Header,
    reader: Box<dyn RecordBufReader>,
    index: Option<AlignmentIndex>,
    record: RecordBuf,
    record_index: usize,
    done: bool,
}

impl SamSource {
    /// Open an alignment file and read its header.
    ///
    /// # Errors
    ///
    /// Returns `HhgaError::UnsupportedFormat` for unknown extensions, or
    /// `HhgaError::SourceOpen` if the file cannot be opened, has no
    /// readable header, or has an unreadable index.
    pub fn open(path: &Path) -> Result<Self, HhgaError> {
        let format = AlignmentFormat::from_path(path)?;
        let label = path.display().to_string();
        let open_error = |e: io::Error| HhgaError::SourceOpen {
            path: label.clone(),
            reason: e.to_string(),
        };

        let file = File::open(path).map_err(open_error)?;

        let (header, reader, index): (sam::Header, Box<dyn RecordBufReader>, _) = match format {
            AlignmentFormat::Sam => {
                let mut reader = sam::io::Reader::new(BufReader::new(file));
                let header = reader.read_header().map_err(open_error)?;
                (header, Box::new(reader), None)
            }
            AlignmentFormat::Bam => {
                let mut reader = bam::io::Reader::new(file);
                let header = reader.read_header().map_err(open_error)?;
                let index = read_index(path).map_err(open_error)?;
                (header, Box::new(reader), index)
            }
        };

        debug!(
            source = %label,
            contigs = header.reference_sequences().len(),
            indexed = index.is_some(),
            "Opened alignment source"
        );

        Ok(Self {
            label,
            header,
            reader,
            index,
            record: RecordBuf::default(),
            record_index: 0,
            done: false,
        })
    }

    fn read_failed(&self, e: &io::Error) -> HhgaError {
        HhgaError::ReadFailed {
            path: self.label.clone(),
            reason: e.to_string(),
        }
    }
}

/// Open every alignment file, in order.
///
/// # Errors
///
/// Returns the first error from [`SamSource::open`].
pub fn open_sources(paths: &[PathBuf]) -> Result<Vec<SamSource>, HhgaError> {
    paths.iter().map(|path| SamSource::open(path)).collect()
}

fn operation(kind: Kind, len: usize) -> Operation {
    match kind {
        Kind::Match | Kind::SequenceMatch | Kind::SequenceMismatch => Operation::Match(len),
        Kind::Insertion => Operation::Insertion(len),
        Kind::Deletion => Operation::Deletion(len),
        Kind::Skip => Operation::Skip(len),
        Kind::SoftClip => Operation::SoftClip(len),
        Kind::HardClip => Operation::HardClip(len),
        Kind::Pad => Operation::Pad(len),
    }
}

fn to_source_record(record_index: usize, record: &RecordBuf) -> SourceRecord {
    let flags = record.flags();

    SourceRecord {
        record_index,
        name: record.name().map(|n| n.to_string()),
        contig_id: record.reference_sequence_id(),
        flags: ReadFlags {
            unmapped: flags.is_unmapped(),
            reverse: flags.is_reverse_complemented(),
            secondary: flags.is_secondary(),
            supplementary: flags.is_supplementary(),
            duplicate: flags.is_duplicate(),
        },
        start: record
            .alignment_start()
            .map(|position| (usize::from(position) - 1) as u64),
        operations: record
            .cigar()
            .as_ref()
            .iter()
            .map(|op| operation(op.kind(), op.len()))
            .collect(),
        bases: record.sequence().as_ref().to_vec(),
        qualities: record.quality_scores().as_ref().to_vec(),
        mapping_quality: record.mapping_quality().map(|mapq| mapq.get()),
    }
}

impl Iterator for SamSource {
    type Item = SourceItem;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }

        let record_index = self.record_index;
        match self.reader.read_record_buf(&self.header, &mut self.record) {
            Ok(0) => {
                self.done = true;
                None
            }
            Ok(_) => {
                self.record_index += 1;
                Some(Ok(Ok(to_source_record(record_index, &self.record))))
            }
            Err(e) if e.kind() == io::ErrorKind::InvalidData => {
                self.record_index += 1;
                Some(Ok(Err(ReadError::MalformedAlignment(format!(
                    "record {record_index}: {e}"
                )))))
            }
            Err(e) => {
                self.done = true;
                Some(Err(self.read_failed(&e)))
            }
        }
    }
}

impl AlignmentSource for SamSource {
    fn label(&self) -> &str {
        &self.label
    }

    fn contig_id(&self, contig: &str) -> Option<usize> {
        self.header
            .reference_sequences()
            .keys()
            .position(|name| name.to_string() == contig)
    }

    fn is_coordinate_sorted(&self) -> bool {
        self.index.is_some()
            || self
                .header
                .header()
                .and_then(|hd| hd.other_fields().get(&tag::SORT_ORDER))
                .is_some_and(|order| *order == "coordinate")
    }

    fn seek(&mut self, contig_id: usize, region: &Region) -> Result<(), HhgaError> {
        let Some(index) = &self.index else {
            return Ok(());
        };

        let chunks = interval(region)
            .and_then(|interval| index.query(contig_id, interval))
            .map_err(|e| self.read_failed(&e))?;

        let Some(start) = chunks.iter().map(|chunk| chunk.start()).min() else {
            info!(source = %self.label, region = %region, "Index has no records for the region");
            self.done = true;
            return Ok(());
        };

        debug!(source = %self.label, chunks = chunks.len(), "Seeking to indexed region");
        self.reader.seek(start).map_err(|e| self.read_failed(&e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pileup::{MergedReads, ReadFilter};
    use noodles::sam::alignment::io::Write as _;
    use std::io::Write;
    use tempfile::TempDir;

    const SAM: &str = "@HD\tVN:1.6\tSO:coordinate
@SQ\tSN:chr1\tLN:1000
@SQ\tSN:chr2\tLN:1000
r1\t0\tchr1\t101\t60\t10M\t*\t0\t0\tACGTACGTAC\tIIIIIIIIII
r2\t16\tchr1\t103\t30\t2S4M\t*\t0\t0\tTTGTAC\t*
r3\t4\t*\t0\t0\t*\t*\t0\t0\tACGT\t*
r4\t0\tchr2\t101\t60\t4M\t*\t0\t0\tACGT\t*
";

    fn write_sam(dir: &TempDir, name: &str, content: &str) -> PathBuf {
        let path = dir.path().join(name);
        let mut file = std::fs::File::create(&path).unwrap();
        file.write_all(content.as_bytes()).unwrap();
        path
    }

    #[test]
    fn test_sam_records() {
        let dir = TempDir::new().unwrap();
        let path = write_sam(&dir, "reads.sam", SAM);

        let mut source = SamSource::open(&path).unwrap();
        assert_eq!(source.contig_id("chr1"), Some(0));
        assert_eq!(source.contig_id("chr2"), Some(1));
        assert_eq!(source.contig_id("chrX"), None);

        let records: Vec<SourceRecord> = source.by_ref().map(|r| r.unwrap().unwrap()).collect();
        assert_eq!(records.len(), 4);

        let r1 = &records[0];
        assert_eq!(r1.record_index, 0);
        assert_eq!(r1.name.as_deref(), Some("r1"));
        assert_eq!(r1.contig_id, Some(0));
        assert_eq!(r1.start, Some(100));
        assert_eq!(r1.operations, vec![Operation::Match(10)]);
        assert_eq!(r1.bases, b"ACGTACGTAC".to_vec());
        assert_eq!(r1.qualities, vec![40; 10]);
        assert_eq!(r1.mapping_quality, Some(60));
        assert!(!r1.flags.reverse);

        let r2 = &records[1];
        assert!(r2.flags.reverse);
        assert_eq!(
            r2.operations,
            vec![Operation::SoftClip(2), Operation::Match(4)]
        );
        assert!(r2.qualities.is_empty());

        let r3 = &records[2];
        assert!(r3.flags.unmapped);
        assert_eq!(r3.start, None);
        assert_eq!(r3.contig_id, None);
    }

    #[test]
    fn test_malformed_line_is_recoverable() {
        let dir = TempDir::new().unwrap();
        let content = "@SQ\tSN:chr1\tLN:1000
bad\tnotaflag\tchr1\t101\t60\t4M\t*\t0\t0\tACGT\t*
good\t0\tchr1\t101\t60\t4M\t*\t0\t0\tACGT\t*
";
        let path = write_sam(&dir, "reads.sam", content);

        let source = SamSource::open(&path).unwrap();
        let items: Vec<SourceItem> = source.collect();
        assert_eq!(items.len(), 2);
        assert!(matches!(
            items[0],
            Ok(Err(ReadError::MalformedAlignment(_)))
        ));
        assert!(matches!(&items[1], Ok(Ok(r)) if r.record_index == 1));
    }

    #[test]
    fn test_merge_sam_files() {
        let dir = TempDir::new().unwrap();
        let a = write_sam(&dir, "a.sam", SAM);
        let b = write_sam(
            &dir,
            "b.sam",
            "@SQ\tSN:chr1\tLN:1000\nb1\t0\tchr1\t102\t60\t4M\t*\t0\t0\tCGTA\t*\n",
        );

        let sources = open_sources(&[a, b]).unwrap();
        let region = Region::new("chr1", 100, 110).unwrap();
        let merged = MergedReads::new(sources, region, ReadFilter::default()).unwrap();

        let names: Vec<String> = merged.map(|r| r.unwrap().name).collect();
        assert_eq!(names, vec!["r1", "b1", "r2"]);
    }

    fn write_bam(dir: &TempDir, name: &str) -> PathBuf {
        let sam_path = write_sam(dir, "for_bam.sam", SAM);
        let bam_path = dir.path().join(name);

        let file = File::open(&sam_path).unwrap();
        let mut reader = sam::io::Reader::new(BufReader::new(file));
        let header = reader.read_header().unwrap();
        let mut writer = bam::io::Writer::new(File::create(&bam_path).unwrap());
        writer.write_header(&header).unwrap();
        for result in reader.record_bufs(&header) {
            writer
                .write_alignment_record(&header, &result.unwrap())
                .unwrap();
        }
        writer.try_finish().unwrap();
        drop(writer);
        bam_path
    }

    #[test]
    fn test_sort_order_from_header() {
        let dir = TempDir::new().unwrap();
        let sorted = SamSource::open(&write_sam(&dir, "sorted.sam", SAM)).unwrap();
        assert!(sorted.is_coordinate_sorted());

        let plain = "@SQ\tSN:chr1\tLN:1000\nr1\t0\tchr1\t101\t60\t4M\t*\t0\t0\tACGT\t*\n";
        let unsorted = SamSource::open(&write_sam(&dir, "plain.sam", plain)).unwrap();
        assert!(!unsorted.is_coordinate_sorted());
    }

    #[test]
    fn test_indexed_bam_seeks_to_region() {
        let dir = TempDir::new().unwrap();
        let bam_path = write_bam(&dir, "reads.bam");

        let index = bam::fs::index(&bam_path).unwrap();
        let mut bai_path = bam_path.clone().into_os_string();
        bai_path.push(".bai");
        bam::bai::fs::write(&bai_path, &index).unwrap();

        let mut source = SamSource::open(&bam_path).unwrap();
        assert!(source.is_coordinate_sorted());

        let region = Region::new("chr2", 100, 110).unwrap();
        source.seek(1, &region).unwrap();
        let first = source.next().unwrap().unwrap().unwrap();
        assert_eq!(first.name.as_deref(), Some("r4"));
        assert_eq!(first.contig_id, Some(1));

        let sources = vec![SamSource::open(&bam_path).unwrap()];
        let merged = MergedReads::new(sources, region, ReadFilter::default()).unwrap();
        let names: Vec<String> = merged.map(|r| r.unwrap().name).collect();
        assert_eq!(names, vec!["r4"]);
    }

    #[test]
    fn test_bam_source() {
        let dir = TempDir::new().unwrap();
        let bam_path = write_bam(&dir, "reads.bam");

        let source = SamSource::open(&bam_path).unwrap();
        let records: Vec<SourceRecord> = source.map(|r| r.unwrap().unwrap()).collect();
        assert_eq!(records.len(), 4);
        assert_eq!(records[0].start, Some(100));
        assert_eq!(
            records[1].operations,
            vec![Operation::SoftClip(2), Operation::Match(4)]
        );
    }

    #[test]
    fn test_unsupported_and_missing() {
        let dir = TempDir::new().unwrap();

        let cram = write_sam(&dir, "reads.cram", "");
        assert!(matches!(
            SamSource::open(&cram),
            Err(HhgaError::UnsupportedFormat(_))
        ));

        let missing = dir.path().join("missing.bam");
        assert!(matches!(
            SamSource::open(&missing),
            Err(HhgaError::SourceOpen { .. })
        ));
    }
}
