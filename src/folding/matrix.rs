/// Dense square matrix indexed by a pair of positions (i, j); only i <= j is used by the folding code
#[derive(Clone, Debug)]
pub struct PairMatrix<T> {
    /// Number of positions along each side
    size: usize,
    /// Row-major values
    values: Vec<T>
}

impl<T: Copy> PairMatrix<T> {
    /// Creates a new matrix with every cell set to `fill`
    pub fn new(size: usize, fill: T) -> Self {
        Self {
            size,
            values: vec![fill; size * size]
        }
    }

    pub fn get(&self, i: usize, j: usize) -> T {
        self.values[i * self.size + j]
    }

    pub fn set(&mut self, i: usize, j: usize, value: T) {
        self.values[i * self.size + j] = value;
    }

    pub fn size(&self) -> usize {
        self.size
    }
}

impl PairMatrix<f64> {
    /// Adds `value` to the cell at (i, j)
    pub fn add(&mut self, i: usize, j: usize, value: f64) {
        self.values[i * self.size + j] += value;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pair_matrix() {
        let mut matrix = PairMatrix::new(4, 0_i32);
        assert_eq!(matrix.size(), 4);
        matrix.set(1, 3, 5);
        assert_eq!(matrix.get(1, 3), 5);
        assert_eq!(matrix.get(3, 1), 0);

        let mut probs = PairMatrix::new(2, 0.0);
        probs.add(0, 1, 0.25);
        probs.add(0, 1, 0.5);
        assert_eq!(probs.get(0, 1), 0.75);
    }
}
