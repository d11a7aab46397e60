// Uniform values - one vec4 per semantic parameter
//
// The renderer writes values here before a draw; commit gathers the ones the
// bound program declares into a single buffer in declaration order.

use crate::params::{RenderParm, MATRIX_BLOCK_LEN};
use glam::{Mat4, Vec4};

#[derive(Debug, Clone)]
pub struct UniformValueTable {
    values: Vec<Vec4>,
}

impl Default for UniformValueTable {
    fn default() -> Self {
        Self::new()
    }
}

impl UniformValueTable {
    pub fn new() -> Self {
        Self {
            values: vec![Vec4::ZERO; RenderParm::COUNT],
        }
    }

    #[inline]
    pub fn get(&self, parm: RenderParm) -> Vec4 {
        self.values[parm.index()]
    }

    #[inline]
    pub fn set(&mut self, parm: RenderParm, value: Vec4) {
        self.values[parm.index()] = value;
    }

    /// Write consecutive parameters starting at `first`. Values past the end
    /// of the table are dropped.
    pub fn set_range(&mut self, first: RenderParm, values: &[Vec4]) {
        let start = first.index();
        let end = (start + values.len()).min(self.values.len());
        if end - start < values.len() {
            log::debug!("{} values past the end of the table ignored", values.len() - (end - start));
        }
        self.values[start..end].copy_from_slice(&values[..end - start]);
    }

    /// Write the rows of `matrix` into four consecutive parameters
    pub fn set_matrix(&mut self, first_row: RenderParm, matrix: &Mat4) {
        let rows = [matrix.row(0), matrix.row(1), matrix.row(2), matrix.row(3)];
        self.set_range(first_row, &rows);
    }

    pub fn values(&self) -> &[Vec4] {
        &self.values
    }
}

/// Append the values for `declared` to `out`. The matrix block start expands
/// to its full run of vectors.
pub fn gather_uniforms(declared: &[RenderParm], table: &UniformValueTable, out: &mut Vec<Vec4>) {
    let values = table.values();
    for &parm in declared {
        let start = parm.index();
        if parm.is_matrix_block() {
            out.extend_from_slice(&values[start..start + MATRIX_BLOCK_LEN]);
        } else {
            out.push(values[start]);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::params::MATRIX_BLOCK_START;

    #[test]
    fn test_set_and_get() {
        let mut table = UniformValueTable::new();
        assert_eq!(table.get(RenderParm::Color), Vec4::ZERO);
        table.set(RenderParm::Color, Vec4::new(1.0, 0.5, 0.25, 1.0));
        assert_eq!(table.get(RenderParm::Color), Vec4::new(1.0, 0.5, 0.25, 1.0));
        table.set(RenderParm::Color, Vec4::ONE);
        assert_eq!(table.get(RenderParm::Color), Vec4::ONE);
    }

    #[test]
    fn test_set_matrix_rows() {
        let mut table = UniformValueTable::new();
        let matrix = Mat4::from_translation(glam::Vec3::new(1.0, 2.0, 3.0));
        table.set_matrix(RenderParm::MvpMatrixX, &matrix);
        assert_eq!(table.get(RenderParm::MvpMatrixX), Vec4::new(1.0, 0.0, 0.0, 1.0));
        assert_eq!(table.get(RenderParm::MvpMatrixY), Vec4::new(0.0, 1.0, 0.0, 2.0));
        assert_eq!(table.get(RenderParm::MvpMatrixW), Vec4::new(0.0, 0.0, 0.0, 1.0));
    }

    #[test]
    fn test_set_range_clamps_to_table() {
        let mut table = UniformValueTable::new();
        let last = RenderParm::ALL[RenderParm::COUNT - 1];
        table.set_range(last, &[Vec4::ONE, Vec4::ONE]);
        assert_eq!(table.get(last), Vec4::ONE);
    }

    #[test]
    fn test_gather_in_declaration_order() {
        let mut table = UniformValueTable::new();
        table.set(RenderParm::Color, Vec4::splat(1.0));
        table.set(RenderParm::ViewOrigin, Vec4::splat(2.0));

        let mut out = Vec::new();
        gather_uniforms(&[RenderParm::ViewOrigin, RenderParm::Color], &table, &mut out);
        assert_eq!(out, vec![Vec4::splat(2.0), Vec4::splat(1.0)]);
    }

    #[test]
    fn test_gather_expands_matrix_block() {
        let mut table = UniformValueTable::new();
        let block: Vec<Vec4> = (0..MATRIX_BLOCK_LEN).map(|i| Vec4::splat(i as f32)).collect();
        table.set_range(MATRIX_BLOCK_START, &block);
        table.set(RenderParm::Color, Vec4::splat(-1.0));

        let mut out = Vec::new();
        gather_uniforms(&[RenderParm::Color, MATRIX_BLOCK_START], &table, &mut out);
        assert_eq!(out.len(), 1 + MATRIX_BLOCK_LEN);
        assert_eq!(out[0], Vec4::splat(-1.0));
        assert_eq!(&out[1..], block.as_slice());
    }
}
