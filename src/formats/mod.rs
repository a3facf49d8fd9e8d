//! Alignment readers and writers.
//!
//! | Format | Extensions | Read | Write |
//! |--------|------------|------|-------|
//! | FASTA  | `.fa .fasta .fas .fna .faa .aln` | yes (noodles) | yes, 60 columns per line |
//! | PHYLIP | `.phy .phylip` | sequential or interleaved | sequential |
//!
//! Any input may additionally be gzip or bgzip compressed (`.gz`, `.bgz`).
//! Readers return a validated [`Alignment`]; the trimming core never sees raw text.

pub mod fasta;
pub mod phylip;

use std::ffi::OsStr;
use std::fs::File;
use std::io::{self, BufRead, BufReader, Read, Write};
use std::path::Path;

use flate2::read::GzDecoder;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::core::alignment::{Alignment, Sequence};
use crate::core::error::TrimError;

pub use fasta::FastaFormat;
pub use phylip::PhylipFormat;

#[derive(Error, Debug)]
pub enum FormatError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid {format} content: {message}")]
    InvalidFormat {
        format: AlignmentFormat,
        message: String,
    },

    #[error("noodles error: {0}")]
    Noodles(String),

    #[error("Unsupported file format: {0}")]
    UnsupportedFormat(String),

    #[error("Too many sequences: {0} exceeds maximum allowed")]
    TooManySequences(usize),

    #[error(transparent)]
    Alignment(#[from] TrimError),
}

impl From<FormatError> for TrimError {
    fn from(err: FormatError) -> Self {
        match err {
            FormatError::Alignment(inner) => inner,
            other => TrimError::Parse(other.to_string()),
        }
    }
}

/// Supported alignment file formats
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlignmentFormat {
    Fasta,
    Phylip,
}

impl AlignmentFormat {
    /// Detect the format from a file name, ignoring a trailing `.gz`/`.bgz`.
    #[must_use]
    pub fn from_path(path: &Path) -> Option<Self> {
        let stripped = if is_gzipped(path) {
            Path::new(path.file_stem()?)
        } else {
            path
        };

        match stripped
            .extension()
            .and_then(OsStr::to_str)
            .map(str::to_lowercase)
            .as_deref()
        {
            Some("fa" | "fasta" | "fas" | "fna" | "faa" | "aln") => Some(Self::Fasta),
            Some("phy" | "phylip") => Some(Self::Phylip),
            _ => None,
        }
    }

    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Self::Fasta => "fasta",
            Self::Phylip => "phylip",
        }
    }

    /// Reader/writer for this format
    #[must_use]
    pub fn handler(self) -> &'static dyn FormatHandler {
        match self {
            Self::Fasta => &FastaFormat,
            Self::Phylip => &PhylipFormat,
        }
    }
}

impl std::fmt::Display for AlignmentFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Parse and serialize one alignment format.
pub trait FormatHandler: Sync {
    /// Read a complete alignment.
    ///
    /// # Errors
    ///
    /// Returns a `FormatError` for malformed input or a ragged/empty alignment.
    fn parse(&self, reader: &mut dyn BufRead) -> Result<Alignment, FormatError>;

    /// Write `alignment`.
    ///
    /// # Errors
    ///
    /// Propagates write failures.
    fn serialize(&self, alignment: &Alignment, writer: &mut dyn Write) -> io::Result<()>;
}

/// Check if the path is a gzipped file
#[allow(clippy::case_sensitive_file_extension_comparisons)] // Already lowercased
#[must_use]
pub fn is_gzipped(path: &Path) -> bool {
    let path_str = path.to_string_lossy().to_lowercase();
    path_str.ends_with(".gz") || path_str.ends_with(".bgz")
}

fn open(path: &Path) -> Result<Box<dyn BufRead>, FormatError> {
    let file = File::open(path)?;
    let inner: Box<dyn Read> = if is_gzipped(path) {
        Box::new(GzDecoder::new(file))
    } else {
        Box::new(file)
    };
    Ok(Box::new(BufReader::new(inner)))
}

fn resolve(path: &Path, format: Option<AlignmentFormat>) -> Result<AlignmentFormat, FormatError> {
    format
        .or_else(|| AlignmentFormat::from_path(path))
        .ok_or_else(|| FormatError::UnsupportedFormat(path.display().to_string()))
}

/// Read an alignment, detecting the format from the extension unless given.
///
/// # Errors
///
/// Returns `FormatError::UnsupportedFormat` for an unknown extension, or any
/// error raised while reading or validating the file.
pub fn read_alignment(path: &Path, format: Option<AlignmentFormat>) -> Result<Alignment, FormatError> {
    let format = resolve(path, format)?;
    debug!("Reading {} alignment from {}", format, path.display());

    let mut reader = open(path)?;
    let alignment = format.handler().parse(&mut reader)?;
    debug!(
        "Read {} sequences x {} columns ({})",
        alignment.num_sequences(),
        alignment.num_columns(),
        alignment.residue_type()
    );
    Ok(alignment)
}

/// Read unaligned FASTA records, such as coding sequences for backtranslation.
///
/// # Errors
///
/// Returns `FormatError::Io` or `FormatError::Noodles` on read failures and
/// `FormatError::InvalidFormat` when the file has no records.
pub fn read_sequences(path: &Path) -> Result<Vec<Sequence>, FormatError> {
    let mut reader = open(path)?;
    let sequences = fasta::read_records(&mut reader)?;
    debug!("Read {} sequences from {}", sequences.len(), path.display());
    Ok(sequences)
}

/// Serialize an alignment into memory so callers decide when files appear.
///
/// # Errors
///
/// Propagates serializer failures.
pub fn render_alignment(alignment: &Alignment, format: AlignmentFormat) -> io::Result<Vec<u8>> {
    debug!("Rendering {} alignment of {} sequences", format, alignment.num_sequences());
    let mut buffer = Vec::new();
    format.handler().serialize(alignment, &mut buffer)?;
    Ok(buffer)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_format_from_path() {
        assert_eq!(AlignmentFormat::from_path(Path::new("a.fa")), Some(AlignmentFormat::Fasta));
        assert_eq!(AlignmentFormat::from_path(Path::new("a.FASTA")), Some(AlignmentFormat::Fasta));
        assert_eq!(AlignmentFormat::from_path(Path::new("a.aln.gz")), Some(AlignmentFormat::Fasta));
        assert_eq!(AlignmentFormat::from_path(Path::new("a.phy")), Some(AlignmentFormat::Phylip));
        assert_eq!(
            AlignmentFormat::from_path(Path::new("dir/a.phylip.bgz")),
            Some(AlignmentFormat::Phylip)
        );
        assert_eq!(AlignmentFormat::from_path(Path::new("a.bam")), None);
        assert_eq!(AlignmentFormat::from_path(Path::new("a.gz")), None);
    }

    #[test]
    fn test_read_gzipped_alignment() {
        use flate2::write::GzEncoder;
        use flate2::Compression;

        let mut temp = NamedTempFile::with_suffix(".fa.gz").unwrap();
        {
            let mut encoder = GzEncoder::new(temp.as_file_mut(), Compression::default());
            encoder.write_all(b">a\nMK-V\n>b\nMKLV\n").unwrap();
            encoder.finish().unwrap();
        }

        let alignment = read_alignment(temp.path(), None).unwrap();
        assert_eq!(alignment.num_sequences(), 2);
        assert_eq!(alignment.num_columns(), 4);
    }

    #[test]
    fn test_write_then_read_phylip_file() {
        let alignment = Alignment::new(vec![
            Sequence::new("alpha", "MK-V"),
            Sequence::new("beta", "MKLV"),
        ])
        .unwrap();

        let temp = NamedTempFile::with_suffix(".phy").unwrap();
        let rendered = render_alignment(&alignment, AlignmentFormat::Phylip).unwrap();
        std::fs::write(temp.path(), rendered).unwrap();

        assert_eq!(read_alignment(temp.path(), None).unwrap(), alignment);
    }

    #[test]
    fn test_unknown_extension() {
        let temp = NamedTempFile::with_suffix(".txt").unwrap();
        assert!(matches!(
            read_alignment(temp.path(), None),
            Err(FormatError::UnsupportedFormat(_))
        ));
        // An explicit format overrides detection
        assert!(read_alignment(temp.path(), Some(AlignmentFormat::Fasta)).is_err());
    }

    #[test]
    fn test_format_error_into_trim_error() {
        let err: TrimError = FormatError::Noodles("bad record".to_string()).into();
        assert!(matches!(err, TrimError::Parse(_)));

        let err: TrimError =
            FormatError::Alignment(TrimError::InvalidAlignment("ragged".to_string())).into();
        assert_eq!(err, TrimError::InvalidAlignment("ragged".to_string()));
    }
}
