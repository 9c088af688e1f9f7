/// A dense row-major matrix with named rows and columns.
#[derive(Debug, Clone, PartialEq)]
pub struct Matrix {
    row_names: Vec<String>,
    column_names: Vec<String>,
    values: Vec<f64>,
}

impl Matrix {
    /// Create a matrix filled with `value`.
    pub fn filled(row_names: Vec<String>, column_names: Vec<String>, value: f64) -> Self {
        let len = row_names.len() * column_names.len();
        Self {
            row_names,
            column_names,
            values: vec![value; len],
        }
    }

    /// Create a matrix from row-major values.
    pub fn from_values(row_names: Vec<String>, column_names: Vec<String>, values: Vec<f64>) -> Self {
        assert_eq!(
            values.len(),
            row_names.len() * column_names.len(),
            "Matrix values must cover every cell"
        );
        Self {
            row_names,
            column_names,
            values,
        }
    }

    pub fn row_names(&self) -> &[String] {
        &self.row_names
    }

    pub fn column_names(&self) -> &[String] {
        &self.column_names
    }

    pub fn rows(&self) -> usize {
        self.row_names.len()
    }

    pub fn columns(&self) -> usize {
        self.column_names.len()
    }

    pub fn get(&self, row: usize, column: usize) -> f64 {
        self.values[self.index(row, column)]
    }

    pub fn set(&mut self, row: usize, column: usize, value: f64) {
        let index = self.index(row, column);
        self.values[index] = value;
    }

    /// Look a cell up by its row and column names.
    pub fn get_by_name(&self, row: &str, column: &str) -> Option<f64> {
        let row = self.row_names.iter().position(|name| name == row)?;
        let column = self.column_names.iter().position(|name| name == column)?;
        Some(self.get(row, column))
    }

    pub fn row(&self, row: usize) -> &[f64] {
        let start = self.index(row, 0);
        &self.values[start..start + self.columns()]
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    fn index(&self, row: usize, column: usize) -> usize {
        assert!(row < self.rows() && column < self.columns(), "Cell out of bounds");
        row * self.columns() + column
    }
}
