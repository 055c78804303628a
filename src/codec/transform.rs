//! Local-to-world mapping of written fields.
//!
//! In row-vector form the stored matrix is `centering * group * owner`:
//! `centering` moves the unit grid from `[-0.5, 0.5]` to `[0, 1]`, `group`
//! scales by the fluid dimensions and translates by the dynamic offset,
//! and `owner` is the owning node's world transform. glam multiplies
//! column vectors, so the same product reads right to left here.

use crate::util::{DMat4, DVec3};

/// Compose the local-to-world mapping for one channel write.
pub fn compose(owner_world: DMat4, dimensions: DVec3, offset: DVec3) -> DMat4 {
    let centering = DMat4::from_translation(DVec3::splat(-0.5));
    let group = DMat4::from_translation(offset) * DMat4::from_scale(dimensions);
    owner_world * group * centering
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::util::{from_row_major, to_row_major};

    fn mul_rows(a: [[f64; 4]; 4], b: [[f64; 4]; 4]) -> [[f64; 4]; 4] {
        let mut out = [[0.0; 4]; 4];
        for (i, row) in out.iter_mut().enumerate() {
            for (j, v) in row.iter_mut().enumerate() {
                *v = (0..4).map(|k| a[i][k] * b[k][j]).sum();
            }
        }
        out
    }

    #[test]
    fn test_matches_row_vector_product() {
        let dims = [2.0, 3.0, 4.0];
        let off = [0.5, -1.0, 2.0];
        let centering = [
            [1.0, 0.0, 0.0, 0.0],
            [0.0, 1.0, 0.0, 0.0],
            [0.0, 0.0, 1.0, 0.0],
            [-0.5, -0.5, -0.5, 1.0],
        ];
        let group = [
            [dims[0], 0.0, 0.0, 0.0],
            [0.0, dims[1], 0.0, 0.0],
            [0.0, 0.0, dims[2], 0.0],
            [off[0], off[1], off[2], 1.0],
        ];
        let owner = to_row_major(
            &(DMat4::from_translation(DVec3::new(10.0, 0.0, -3.0))
                * DMat4::from_rotation_y(0.7)
                * DMat4::from_scale(DVec3::splat(1.5))),
        );

        let expected = from_row_major(mul_rows(mul_rows(centering, group), owner));
        let got = compose(from_row_major(owner), DVec3::from(dims), DVec3::from(off));
        assert!(got.abs_diff_eq(expected, 1e-12));
    }

    #[test]
    fn test_unit_grid_mapping() {
        let m = compose(DMat4::IDENTITY, DVec3::new(2.0, 2.0, 2.0), DVec3::new(1.0, 0.0, 0.0));
        let center = m.transform_point3(DVec3::splat(0.5));
        assert!(center.abs_diff_eq(DVec3::new(1.0, 0.0, 0.0), 1e-12));
        let corner = m.transform_point3(DVec3::ONE);
        assert!(corner.abs_diff_eq(DVec3::new(2.0, 1.0, 1.0), 1e-12));
    }

    #[test]
    fn test_identity_group() {
        let owner = DMat4::from_translation(DVec3::new(3.0, 4.0, 5.0));
        let m = compose(owner, DVec3::ONE, DVec3::ZERO);
        let origin = m.transform_point3(DVec3::splat(0.5));
        assert!(origin.abs_diff_eq(DVec3::new(3.0, 4.0, 5.0), 1e-12));
    }
}
