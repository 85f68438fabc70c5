use serde::{Deserialize, Serialize};
use std::ops::Range;

/// A dense feature vector
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct Vector {
    data: Vec<f64>,
}

impl Vector {
    #[inline]
    #[must_use]
    pub fn new(data: Vec<f64>) -> Self {
        Self { data }
    }

    #[inline]
    #[must_use]
    pub fn zeros(dim: usize) -> Self {
        Self {
            data: vec![0.0; dim],
        }
    }

    #[inline]
    #[must_use]
    pub fn from_slice(data: &[f64]) -> Self {
        Self {
            data: data.to_vec(),
        }
    }

    #[inline]
    #[must_use]
    pub fn dim(&self) -> usize {
        self.data.len()
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    #[inline]
    #[must_use]
    pub fn as_slice(&self) -> &[f64] {
        &self.data
    }

    #[inline]
    pub fn extend_from_slice(&mut self, values: &[f64]) {
        self.data.extend_from_slice(values);
    }

    #[inline]
    pub fn dot(&self, other: &Vector) -> f64 {
        dot(&self.data, &other.data)
    }

    #[inline]
    pub fn norm(&self) -> f64 {
        norm(&self.data)
    }

    /// True when every component is zero
    #[inline]
    pub fn is_zero(&self) -> bool {
        self.data.iter().all(|x| *x == 0.0)
    }

    /// Cosine similarity with another vector.
    ///
    /// Mismatched dimensions and all-zero vectors score 0.
    #[inline]
    pub fn cosine_similarity(&self, other: &Vector) -> f64 {
        if self.dim() != other.dim() {
            return 0.0;
        }
        cosine(&self.data, &other.data)
    }

    /// Cosine similarity restricted to some slot ranges of both vectors.
    ///
    /// The ranges are treated as one concatenated sub-vector. Reversed or
    /// out-of-bounds ranges score 0.
    pub fn cosine_similarity_over(&self, other: &Vector, ranges: &[Range<usize>]) -> f64 {
        let dim = self.dim();
        if dim != other.dim() || ranges.iter().any(|r| r.start > r.end || r.end > dim) {
            return 0.0;
        }

        let (mut dot_product, mut norm_a, mut norm_b) = (0.0, 0.0, 0.0);
        for range in ranges {
            let a = &self.data[range.clone()];
            let b = &other.data[range.clone()];
            dot_product += dot(a, b);
            norm_a += dot(a, a);
            norm_b += dot(b, b);
        }

        if norm_a == 0.0 || norm_b == 0.0 {
            return 0.0;
        }
        dot_product / (norm_a.sqrt() * norm_b.sqrt())
    }
}

impl From<Vec<f64>> for Vector {
    fn from(data: Vec<f64>) -> Self {
        Vector::new(data)
    }
}

fn dot(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b.iter()).map(|(x, y)| x * y).sum()
}

fn norm(a: &[f64]) -> f64 {
    dot(a, a).sqrt()
}

fn cosine(a: &[f64], b: &[f64]) -> f64 {
    let norm_a = norm(a);
    let norm_b = norm(b);

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }

    dot(a, b) / (norm_a * norm_b)
}
