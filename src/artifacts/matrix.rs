//! Similarity matrix artifact
//!
//! # File Structure
//!
//! ```text
//! Offset   Size          Type        Description
//! ─────────────────────────────────────────────────
//! 0x00     8             [u8; 8]     Magic: "RMSIM001"
//! 0x08     4             u32 LE      R: number of rows (movies)
//! 0x0C     4             u32 LE      C: number of columns
//! 0x10     R*C*4         [f32]       Row-major values (Little Endian)
//! ```
//!
//! A square matrix holds precomputed pairwise similarity scores. Any other
//! shape holds one feature vector per movie, compared with cosine similarity.

use std::borrow::Cow;

use thiserror::Error;

/// Magic bytes identifying a similarity matrix file
pub const MAGIC: [u8; 8] = *b"RMSIM001";

/// Header size in bytes: 8 (magic) + 4 (rows) + 4 (cols)
pub const HEADER_SIZE: usize = 16;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum MatrixFormatError {
    #[error("Invalid magic bytes: expected RMSIM001")]
    InvalidMagic,

    #[error("File too small for header ({0} bytes)")]
    TruncatedHeader(usize),

    #[error("Matrix has no rows or columns")]
    Empty,

    #[error("Payload size mismatch: expected {expected} bytes, got {actual}")]
    PayloadSize { expected: usize, actual: usize },

    #[error("Data length {len} does not match shape {rows}x{cols}")]
    Shape { rows: usize, cols: usize, len: usize },
}

/// Dense row-major `f32` matrix, row `i` aligned with movie `i`
#[derive(Debug, Clone, PartialEq)]
pub struct SimilarityMatrix {
    rows: usize,
    cols: usize,
    data: Vec<f32>,
}

impl SimilarityMatrix {
    pub fn new(rows: usize, cols: usize, data: Vec<f32>) -> Result<Self, MatrixFormatError> {
        if rows == 0 || cols == 0 {
            return Err(MatrixFormatError::Empty);
        }
        if data.len() != rows * cols {
            return Err(MatrixFormatError::Shape {
                rows,
                cols,
                len: data.len(),
            });
        }
        Ok(Self { rows, cols, data })
    }

    /// Builds a matrix from equally sized rows
    pub fn from_rows(rows: Vec<Vec<f32>>) -> Result<Self, MatrixFormatError> {
        let n = rows.len();
        let cols = rows.first().map(Vec::len).unwrap_or(0);
        let data: Vec<f32> = rows.into_iter().flatten().collect();
        Self::new(n, cols, data)
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    /// True when rows hold pairwise scores rather than feature vectors
    pub fn is_pairwise(&self) -> bool {
        self.rows == self.cols
    }

    pub fn row(&self, index: usize) -> Option<&[f32]> {
        if index >= self.rows {
            return None;
        }
        let start = index * self.cols;
        Some(&self.data[start..start + self.cols])
    }

    /// Similarity of row `index` against every row, one score per movie
    pub fn scores_for(&self, index: usize) -> Option<Cow<'_, [f32]>> {
        let query = self.row(index)?;
        if self.is_pairwise() {
            return Some(Cow::Borrowed(query));
        }

        let query_norm = norm(query);
        let scores = self
            .data
            .chunks_exact(self.cols)
            .map(|candidate| cosine(query, query_norm, candidate))
            .collect();
        Some(Cow::Owned(scores))
    }

    /// Parses a matrix file
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, MatrixFormatError> {
        if bytes.len() < HEADER_SIZE {
            return Err(MatrixFormatError::TruncatedHeader(bytes.len()));
        }
        if bytes[0..8] != MAGIC {
            return Err(MatrixFormatError::InvalidMagic);
        }

        let rows = read_u32(&bytes[8..12]) as usize;
        let cols = read_u32(&bytes[12..16]) as usize;
        if rows == 0 || cols == 0 {
            return Err(MatrixFormatError::Empty);
        }

        let payload = &bytes[HEADER_SIZE..];
        let expected = rows * cols * 4;
        if payload.len() != expected {
            return Err(MatrixFormatError::PayloadSize {
                expected,
                actual: payload.len(),
            });
        }

        let data = payload
            .chunks_exact(4)
            .map(|chunk| f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
            .collect();

        Self::new(rows, cols, data)
    }

    /// Serializes the matrix in the artifact file format
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(HEADER_SIZE + self.data.len() * 4);
        buf.extend_from_slice(&MAGIC);
        buf.extend_from_slice(&(self.rows as u32).to_le_bytes());
        buf.extend_from_slice(&(self.cols as u32).to_le_bytes());
        for value in &self.data {
            buf.extend_from_slice(&value.to_le_bytes());
        }
        buf
    }
}

fn read_u32(bytes: &[u8]) -> u32 {
    u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]])
}

fn norm(v: &[f32]) -> f32 {
    v.iter().map(|x| x * x).sum::<f32>().sqrt()
}

fn cosine(query: &[f32], query_norm: f32, candidate: &[f32]) -> f32 {
    let candidate_norm = norm(candidate);
    if query_norm == 0.0 || candidate_norm == 0.0 {
        return 0.0;
    }
    let dot: f32 = query.iter().zip(candidate).map(|(a, b)| a * b).sum();
    dot / (query_norm * candidate_norm)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bytes_roundtrip() {
        let matrix =
            SimilarityMatrix::from_rows(vec![vec![1.0, 0.25], vec![0.25, 1.0]]).unwrap();
        let parsed = SimilarityMatrix::from_bytes(&matrix.to_bytes()).unwrap();
        assert_eq!(parsed, matrix);
        assert!(parsed.is_pairwise());
    }

    #[test]
    fn test_rejects_bad_magic() {
        let mut bytes = SimilarityMatrix::from_rows(vec![vec![1.0]]).unwrap().to_bytes();
        bytes[0] = b'X';
        assert_eq!(
            SimilarityMatrix::from_bytes(&bytes),
            Err(MatrixFormatError::InvalidMagic)
        );
    }

    #[test]
    fn test_rejects_truncated_payload() {
        let bytes = SimilarityMatrix::from_rows(vec![vec![1.0, 0.5], vec![0.5, 1.0]])
            .unwrap()
            .to_bytes();
        let truncated = &bytes[..bytes.len() - 2];
        assert_eq!(
            SimilarityMatrix::from_bytes(truncated),
            Err(MatrixFormatError::PayloadSize {
                expected: 16,
                actual: 14
            })
        );
    }

    #[test]
    fn test_rejects_short_header() {
        assert_eq!(
            SimilarityMatrix::from_bytes(b"RMSIM"),
            Err(MatrixFormatError::TruncatedHeader(5))
        );
    }

    #[test]
    fn test_rejects_ragged_rows() {
        let result = SimilarityMatrix::from_rows(vec![vec![1.0, 2.0], vec![3.0]]);
        assert!(matches!(result, Err(MatrixFormatError::Shape { .. })));
    }

    #[test]
    fn test_pairwise_scores_borrow_row() {
        let matrix = SimilarityMatrix::from_rows(vec![
            vec![1.0, 0.3, 0.7],
            vec![0.3, 1.0, 0.1],
            vec![0.7, 0.1, 1.0],
        ])
        .unwrap();
        let scores = matrix.scores_for(2).unwrap();
        assert!(matches!(scores, Cow::Borrowed(_)));
        assert_eq!(&*scores, &[0.7, 0.1, 1.0]);
        assert!(matrix.scores_for(3).is_none());
    }

    #[test]
    fn test_feature_rows_use_cosine() {
        let matrix = SimilarityMatrix::from_rows(vec![
            vec![1.0, 0.0],
            vec![0.0, 1.0],
            vec![2.0, 0.0],
            vec![0.0, 0.0],
        ])
        .unwrap();
        assert!(!matrix.is_pairwise());

        let scores = matrix.scores_for(0).unwrap();
        assert_eq!(&*scores, &[1.0, 0.0, 1.0, 0.0]);
    }
}
