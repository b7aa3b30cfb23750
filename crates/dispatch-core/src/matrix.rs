//! Composition matrix: the size x color breakdown of a quantity

use serde::{Deserialize, Serialize};

use crate::{CoreError, Result};

/// One non-zero cell of a composition, as exported and persisted
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CompositionEntry {
    pub color: String,
    pub size: String,
    pub quantity: u32,
}

impl CompositionEntry {
    pub fn new(color: impl Into<String>, size: impl Into<String>, quantity: u32) -> Self {
        Self {
            color: color.into(),
            size: size.into(),
            quantity,
        }
    }
}

/// Dense grid over a line item's `colors x sizes`
///
/// Rows are colors, columns are sizes. Cells hold non-negative unit counts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompositionMatrix {
    colors: Vec<String>,
    sizes: Vec<String>,
    cells: Vec<u32>,
}

impl CompositionMatrix {
    /// Create an all-zero matrix
    pub fn new(colors: &[String], sizes: &[String]) -> Self {
        Self {
            colors: colors.to_vec(),
            sizes: sizes.to_vec(),
            cells: vec![0; colors.len() * sizes.len()],
        }
    }

    /// Build a matrix from a sparse list.
    ///
    /// Later entries for the same cell overwrite earlier ones, so hydrating
    /// twice from the same list yields the same matrix.
    pub fn from_sparse_list(
        colors: &[String],
        sizes: &[String],
        entries: &[CompositionEntry],
    ) -> Result<Self> {
        let mut matrix = Self::new(colors, sizes);
        for entry in entries {
            let slot = matrix.slot(&entry.color, &entry.size)?;
            matrix.cells[slot] = entry.quantity;
        }
        Ok(matrix)
    }

    pub fn colors(&self) -> &[String] {
        &self.colors
    }

    pub fn sizes(&self) -> &[String] {
        &self.sizes
    }

    /// Set a cell. Negative quantities are stored as zero.
    pub fn set_cell(&mut self, color: &str, size: &str, quantity: i64) -> Result<()> {
        let slot = self.slot(color, size)?;
        self.cells[slot] = clamp_quantity(quantity);
        Ok(())
    }

    /// Set a cell from raw user input. Empty or unparseable input counts as zero.
    pub fn set_cell_input(&mut self, color: &str, size: &str, input: &str) -> Result<()> {
        let slot = self.slot(color, size)?;
        self.cells[slot] = coerce_quantity(input);
        Ok(())
    }

    /// Cell value, zero for unknown coordinates
    pub fn cell(&self, color: &str, size: &str) -> u32 {
        self.slot(color, size).map(|s| self.cells[s]).unwrap_or(0)
    }

    pub fn row_total(&self, color: &str) -> u64 {
        let Some(row) = self.colors.iter().position(|c| c == color) else {
            return 0;
        };
        let width = self.sizes.len();
        self.cells[row * width..(row + 1) * width]
            .iter()
            .map(|&q| u64::from(q))
            .sum()
    }

    pub fn column_total(&self, size: &str) -> u64 {
        let Some(col) = self.sizes.iter().position(|s| s == size) else {
            return 0;
        };
        let width = self.sizes.len();
        self.cells
            .iter()
            .skip(col)
            .step_by(width)
            .map(|&q| u64::from(q))
            .sum()
    }

    pub fn grand_total(&self) -> u64 {
        self.cells.iter().map(|&q| u64::from(q)).sum()
    }

    /// Export the non-zero cells in row-major order
    pub fn to_sparse_list(&self) -> Vec<CompositionEntry> {
        let width = self.sizes.len();
        self.cells
            .iter()
            .enumerate()
            .filter(|&(_, &q)| q > 0)
            .map(|(i, &q)| CompositionEntry::new(&self.colors[i / width], &self.sizes[i % width], q))
            .collect()
    }

    fn slot(&self, color: &str, size: &str) -> Result<usize> {
        let row = self
            .colors
            .iter()
            .position(|c| c == color)
            .ok_or_else(|| CoreError::UnknownColor(color.to_string()))?;
        let col = self
            .sizes
            .iter()
            .position(|s| s == size)
            .ok_or_else(|| CoreError::UnknownSize(size.to_string()))?;
        Ok(row * self.sizes.len() + col)
    }
}

fn clamp_quantity(quantity: i64) -> u32 {
    u32::try_from(quantity.max(0)).unwrap_or(u32::MAX)
}

/// Coerce free-form input into a non-negative integer quantity
pub fn coerce_quantity(input: &str) -> u32 {
    let trimmed = input.trim();
    if let Ok(value) = trimmed.parse::<i64>() {
        return clamp_quantity(value);
    }
    match trimmed.parse::<f64>() {
        Ok(value) if value.is_finite() && value > 0.0 => {
            if value >= f64::from(u32::MAX) {
                u32::MAX
            } else {
                value.trunc() as u32
            }
        }
        _ => 0,
    }
}

/// Sum of a sparse list's quantities
pub fn sparse_total(entries: &[CompositionEntry]) -> u64 {
    entries.iter().map(|e| u64::from(e.quantity)).sum()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn grid() -> (Vec<String>, Vec<String>) {
        (
            vec!["red".to_string(), "blue".to_string()],
            vec!["S".to_string(), "M".to_string(), "L".to_string()],
        )
    }

    #[test]
    fn test_totals() {
        let (colors, sizes) = grid();
        let mut matrix = CompositionMatrix::new(&colors, &sizes);
        matrix.set_cell("red", "S", 2).unwrap();
        matrix.set_cell("red", "L", 3).unwrap();
        matrix.set_cell("blue", "L", 4).unwrap();

        assert_eq!(matrix.row_total("red"), 5);
        assert_eq!(matrix.row_total("blue"), 4);
        assert_eq!(matrix.column_total("L"), 7);
        assert_eq!(matrix.column_total("M"), 0);
        assert_eq!(matrix.grand_total(), 9);
    }

    #[test]
    fn test_sparse_export_skips_zero_cells() {
        let (colors, sizes) = grid();
        let mut matrix = CompositionMatrix::new(&colors, &sizes);
        matrix.set_cell("blue", "M", 1).unwrap();
        matrix.set_cell("red", "S", 0).unwrap();

        assert_eq!(
            matrix.to_sparse_list(),
            vec![CompositionEntry::new("blue", "M", 1)]
        );
    }

    #[test]
    fn test_input_coercion() {
        assert_eq!(coerce_quantity(""), 0);
        assert_eq!(coerce_quantity("abc"), 0);
        assert_eq!(coerce_quantity("-4"), 0);
        assert_eq!(coerce_quantity(" 7 "), 7);
        assert_eq!(coerce_quantity("3.9"), 3);

        let (colors, sizes) = grid();
        let mut matrix = CompositionMatrix::new(&colors, &sizes);
        matrix.set_cell_input("red", "M", "12").unwrap();
        matrix.set_cell_input("red", "M", "").unwrap();
        assert_eq!(matrix.cell("red", "M"), 0);
    }

    #[test]
    fn test_unknown_coordinates() {
        let (colors, sizes) = grid();
        let mut matrix = CompositionMatrix::new(&colors, &sizes);
        assert_eq!(
            matrix.set_cell("green", "S", 1),
            Err(CoreError::UnknownColor("green".to_string()))
        );
        assert_eq!(
            matrix.set_cell("red", "XL", 1),
            Err(CoreError::UnknownSize("XL".to_string()))
        );
    }

    #[test]
    fn test_hydration_is_idempotent() {
        let (colors, sizes) = grid();
        let entries = vec![
            CompositionEntry::new("red", "M", 2),
            CompositionEntry::new("blue", "S", 5),
        ];
        let first = CompositionMatrix::from_sparse_list(&colors, &sizes, &entries).unwrap();
        let second =
            CompositionMatrix::from_sparse_list(&colors, &sizes, &first.to_sparse_list()).unwrap();
        assert_eq!(first, second);
        assert_eq!(first.grand_total(), 7);
    }
}
