//! Boundary-file codecs for the flat binary formats exchanged with feature
//! extractors and plotting tools.
//!
//! Feature, embedding, and PCA model files are headerless sequences of
//! little-endian f32 values in row-major order; the row width is supplied by
//! the caller. Label lists are text files of `<path>\t<integer label>` lines
//! whose order defines the canonical row order.

use crate::{dataset, EvalError, Matrix, Result};
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::Path;

/// Reads a headerless binary feature file into an N x `n_features` matrix.
///
/// The byte length must be a multiple of 4 and the value count a multiple of
/// the declared width.
pub fn read_matrix<P: AsRef<Path>>(path: P, n_features: usize) -> Result<Matrix> {
    let bytes = fs::read(path)?;
    let values = f32s_from_bytes(&bytes)?;
    dataset::matrix_from_flat(values, n_features)
}

/// Writes a matrix as little-endian f32 values, row-major, no header.
pub fn write_matrix<P: AsRef<Path>>(path: P, matrix: &Matrix) -> Result<()> {
    let mut writer = BufWriter::new(File::create(path)?);
    write_f32s(&mut writer, matrix.iter().copied())?;
    writer.flush()?;
    Ok(())
}

/// Reads an N x 2 embedding/points file.
pub fn read_points<P: AsRef<Path>>(path: P) -> Result<Matrix> {
    read_matrix(path, 2)
}

/// Parses a label list: one `<path>\t<integer label>` line per item. Line
/// order defines the row order of the aligned feature matrix.
pub fn read_label_list<P: AsRef<Path>>(path: P) -> Result<Vec<(String, i32)>> {
    let text = fs::read_to_string(path)?;
    let mut entries = Vec::new();

    for (index, line) in text.lines().enumerate() {
        let (item, label) = line.split_once('\t').ok_or_else(|| {
            EvalError::MalformedFile(format!(
                "line {}: expected <path>\\t<label>, got '{}'",
                index + 1,
                line
            ))
        })?;
        let label = label.trim().parse::<i32>().map_err(|_| {
            EvalError::MalformedFile(format!(
                "line {}: label '{}' is not an integer",
                index + 1,
                label
            ))
        })?;
        entries.push((item.to_string(), label));
    }

    Ok(entries)
}

/// Labels only, in line order.
pub fn read_labels<P: AsRef<Path>>(path: P) -> Result<Vec<i32>> {
    Ok(read_label_list(path)?.into_iter().map(|(_, label)| label).collect())
}

pub(crate) fn f32s_from_bytes(bytes: &[u8]) -> Result<Vec<f32>> {
    if bytes.len() % 4 != 0 {
        return Err(EvalError::MalformedFile(format!(
            "file length {} is not a multiple of 4 bytes",
            bytes.len()
        )));
    }
    Ok(bytes
        .chunks_exact(4)
        .map(|chunk| f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
        .collect())
}

pub(crate) fn write_f32s<W: Write>(
    writer: &mut W,
    values: impl IntoIterator<Item = f32>,
) -> Result<()> {
    for value in values {
        writer.write_all(&value.to_le_bytes())?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;
    use std::io::Write as _;

    #[test]
    fn test_matrix_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("features.dat");

        let original = array![[1.0_f32, 2.5, -3.0], [0.0, 4.25, 1e-3]];
        write_matrix(&path, &original).unwrap();
        let loaded = read_matrix(&path, 3).unwrap();

        assert_eq!(loaded, original);
    }

    #[test]
    fn test_points_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("points.dat");

        let points = array![[0.5_f32, -0.5], [1.5, 2.5], [-4.0, 8.0]];
        write_matrix(&path, &points).unwrap();
        let loaded = read_points(&path).unwrap();

        assert_eq!(loaded, points);
    }

    #[test]
    fn test_read_matrix_rejects_ragged_count() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ragged.dat");

        // Five values cannot form rows of width three.
        let mut file = std::fs::File::create(&path).unwrap();
        for v in [1.0_f32, 2.0, 3.0, 4.0, 5.0] {
            file.write_all(&v.to_le_bytes()).unwrap();
        }

        assert!(matches!(
            read_matrix(&path, 3),
            Err(EvalError::Shape(_))
        ));
    }

    #[test]
    fn test_read_matrix_rejects_partial_float() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("torn.dat");
        std::fs::write(&path, [0_u8, 1, 2, 3, 4, 5]).unwrap();

        assert!(matches!(
            read_matrix(&path, 2),
            Err(EvalError::MalformedFile(_))
        ));
    }

    #[test]
    fn test_label_list_parsing() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("filelists.txt");
        std::fs::write(&path, "images/cat/001.png\t0\nimages/cat/002.png\t0\nimages/dog/001.png\t1\n").unwrap();

        let entries = read_label_list(&path).unwrap();
        assert_eq!(entries.len(), 3);
        assert_eq!(entries[0], ("images/cat/001.png".to_string(), 0));
        assert_eq!(entries[2], ("images/dog/001.png".to_string(), 1));

        let labels = read_labels(&path).unwrap();
        assert_eq!(labels, vec![0, 0, 1]);
    }

    #[test]
    fn test_label_list_rejects_missing_tab() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.txt");
        std::fs::write(&path, "images/cat/001.png 0\n").unwrap();

        assert!(matches!(
            read_label_list(&path),
            Err(EvalError::MalformedFile(_))
        ));
    }

    #[test]
    fn test_label_list_rejects_non_integer_label() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.txt");
        std::fs::write(&path, "images/cat/001.png\tcat\n").unwrap();

        assert!(matches!(
            read_label_list(&path),
            Err(EvalError::MalformedFile(_))
        ));
    }

    #[test]
    fn test_missing_file_surfaces_io_error() {
        assert!(matches!(
            read_matrix("/nonexistent/features.dat", 4),
            Err(EvalError::Io(_))
        ));
    }
}
