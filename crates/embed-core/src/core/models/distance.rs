use nalgebra::{DMatrix, Point3};

/// A complete symmetric matrix of concrete distances with a zero diagonal.
#[derive(Debug, Clone, PartialEq)]
pub struct DistanceMatrix {
    matrix: DMatrix<f64>,
}

impl DistanceMatrix {
    pub fn zeros(size: usize) -> Self {
        Self {
            matrix: DMatrix::zeros(size, size),
        }
    }

    /// Euclidean distances between every pair of `points`.
    pub fn from_points(points: &[Point3<f64>]) -> Self {
        let n = points.len();
        let mut distances = Self::zeros(n);
        for i in 0..n {
            for j in (i + 1)..n {
                distances.set(i, j, nalgebra::distance(&points[i], &points[j]));
            }
        }
        distances
    }

    #[inline]
    pub fn size(&self) -> usize {
        self.matrix.nrows()
    }

    #[inline]
    pub fn get(&self, i: usize, j: usize) -> f64 {
        self.matrix[(i, j)]
    }

    /// Sets `(i, j)` and `(j, i)` together.
    #[inline]
    pub(crate) fn set(&mut self, i: usize, j: usize, value: f64) {
        self.matrix[(i, j)] = value;
        self.matrix[(j, i)] = value;
    }

    /// Element-wise square, the input expected by the embedder.
    pub fn squared(&self) -> DMatrix<f64> {
        self.matrix.map(|d| d * d)
    }

    pub fn as_matrix(&self) -> &DMatrix<f64> {
        &self.matrix
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_points_is_symmetric_with_zero_diagonal() {
        let points = [
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(3.0, 4.0, 0.0),
            Point3::new(0.0, 0.0, 2.0),
        ];
        let distances = DistanceMatrix::from_points(&points);
        assert_eq!(distances.size(), 3);
        assert!((distances.get(0, 1) - 5.0).abs() < 1e-12);
        assert_eq!(distances.get(0, 1), distances.get(1, 0));
        assert_eq!(distances.get(2, 2), 0.0);
    }

    #[test]
    fn squared_squares_every_entry() {
        let mut distances = DistanceMatrix::zeros(2);
        distances.set(0, 1, 3.0);
        let squared = distances.squared();
        assert_eq!(squared[(0, 1)], 9.0);
        assert_eq!(squared[(1, 0)], 9.0);
        assert_eq!(squared[(0, 0)], 0.0);
    }
}
