//! Centralized validation and helper functions.

use std::path::Path;

/// Maximum number of sequences allowed in a single alignment file
pub const MAX_SEQUENCES: usize = 100_000;

/// Validation error types for command-line values and paths
#[derive(Debug, PartialEq, thiserror::Error)]
pub enum ValidationError {
    #[error("'{0}' is not a number")]
    NotANumber(String),
    #[error("{value} is outside [{min}, {max}]")]
    OutOfRange { value: f64, min: f64, max: f64 },
    #[error("Output path {0} would overwrite an input file")]
    OverwritesInput(String),
    #[error("'{0}' is not a list of indices such as 0,3,5-9")]
    InvalidIndexList(String),
}

/// Check if adding another sequence would exceed the maximum allowed.
///
/// Call this with the current count BEFORE adding a new sequence.
/// Returns an error message if adding would exceed the limit, None if safe to add.
#[must_use]
pub fn check_sequence_limit(count: usize) -> Option<String> {
    if count >= MAX_SEQUENCES {
        Some(format!(
            "Too many sequences: adding another would exceed maximum of {MAX_SEQUENCES}"
        ))
    } else {
        None
    }
}

fn parse_in_range(s: &str, min: f64, max: f64) -> Result<f64, ValidationError> {
    let value: f64 = s
        .trim()
        .parse()
        .map_err(|_| ValidationError::NotANumber(s.to_string()))?;
    if (min..=max).contains(&value) {
        Ok(value)
    } else {
        Err(ValidationError::OutOfRange { value, min, max })
    }
}

/// Parse a value in `[0, 1]`.
///
/// # Examples
///
/// ```
/// use msa_trim::utils::validation::parse_fraction;
///
/// assert_eq!(parse_fraction("0.5"), Ok(0.5));
/// assert!(parse_fraction("1.5").is_err());
/// assert!(parse_fraction("half").is_err());
/// ```
///
/// # Errors
///
/// Returns a message suitable for clap when the value is not a number or out of range.
pub fn parse_fraction(s: &str) -> Result<f64, String> {
    parse_in_range(s, 0.0, 1.0).map_err(|e| e.to_string())
}

/// Parse a value in `[0, 100]`.
///
/// # Errors
///
/// Returns a message suitable for clap when the value is not a number or out of range.
pub fn parse_percentage(s: &str) -> Result<f64, String> {
    parse_in_range(s, 0.0, 100.0).map_err(|e| e.to_string())
}

/// Parse a comma-separated list of 0-based indices and inclusive ranges.
///
/// The result is sorted and free of duplicates.
///
/// ```
/// use msa_trim::utils::validation::parse_index_list;
///
/// assert_eq!(parse_index_list("7,0,3-5").unwrap(), vec![0, 3, 4, 5, 7]);
/// assert!(parse_index_list("5-3").is_err());
/// ```
///
/// # Errors
///
/// Returns `ValidationError::InvalidIndexList` for an empty item, a
/// non-numeric bound or a descending range.
pub fn parse_index_list(s: &str) -> Result<Vec<usize>, ValidationError> {
    let invalid = || ValidationError::InvalidIndexList(s.to_string());
    let mut indices = Vec::new();

    for item in s.split(',').map(str::trim) {
        match item.split_once('-') {
            Some((start, end)) => {
                let start: usize = start.trim().parse().map_err(|_| invalid())?;
                let end: usize = end.trim().parse().map_err(|_| invalid())?;
                if start > end {
                    return Err(invalid());
                }
                indices.extend(start..=end);
            }
            None => indices.push(item.parse().map_err(|_| invalid())?),
        }
    }

    indices.sort_unstable();
    indices.dedup();
    Ok(indices)
}

/// Refuse an output path that names one of the inputs.
///
/// # Errors
///
/// Returns `ValidationError::OverwritesInput` when `output` matches an input.
pub fn validate_output_path(output: &Path, inputs: &[&Path]) -> Result<(), ValidationError> {
    let resolved = std::fs::canonicalize(output).ok();
    for input in inputs {
        let same = match (&resolved, std::fs::canonicalize(input).ok()) {
            (Some(out), Some(inp)) => *out == inp,
            _ => output == *input,
        };
        if same {
            return Err(ValidationError::OverwritesInput(output.display().to_string()));
        }
    }
    Ok(())
}
