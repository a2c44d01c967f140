use euclid::default::{Point2D, Point3D, Transform3D};

/// Row-vector 4x4 matrix: `a.then(&b)` applies `a` first.
pub type Mat4 = Transform3D<f32>;

pub fn normalize_rgba_color(color: &[u8; 4]) -> [f32; 4] {
    [
        color[0] as f32 / 255.0,
        color[1] as f32 / 255.0,
        color[2] as f32 / 255.0,
        color[3] as f32 / 255.0,
    ]
}

/// Column-major columns for WGSL `mat4x4<f32>`.
///
/// euclid stores rows of a row-vector matrix, which are exactly the columns of the
/// equivalent column-vector matrix.
#[inline(always)]
pub fn mat4_to_columns(matrix: &Mat4) -> [[f32; 4]; 4] {
    matrix.to_arrays()
}

/// Transforms a point with `w = 1` and no perspective divide.
#[inline(always)]
pub fn transform_affine_point(matrix: &Mat4, x: f32, y: f32, z: f32) -> Point3D<f32> {
    let m = matrix;
    Point3D::new(
        x * m.m11 + y * m.m21 + z * m.m31 + m.m41,
        x * m.m12 + y * m.m22 + z * m.m32 + m.m42,
        x * m.m13 + y * m.m23 + z * m.m33 + m.m43,
    )
}

pub fn transpose(m: &Mat4) -> Mat4 {
    Mat4::new(
        m.m11, m.m21, m.m31, m.m41, //
        m.m12, m.m22, m.m32, m.m42, //
        m.m13, m.m23, m.m33, m.m43, //
        m.m14, m.m24, m.m34, m.m44,
    )
}

/// Projects a 2D point through `matrix` with the homogeneous divide. `None` when the point
/// lands behind the projection plane.
pub fn project_point(matrix: &Mat4, point: Point2D<f32>) -> Option<Point2D<f32>> {
    matrix.transform_point2d(point)
}

#[inline(always)]
pub(crate) fn align_to(value: u64, alignment: u64) -> u64 {
    value.div_ceil(alignment) * alignment
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn affine_point_ignores_perspective_row() {
        let translate = Mat4::translation(1.0, 2.0, 3.0);
        let point = transform_affine_point(&translate, 1.0, 1.0, 1.0);
        assert_eq!(point, Point3D::new(2.0, 3.0, 4.0));
    }

    #[test]
    fn columns_carry_translation_in_the_last_column() {
        let columns = mat4_to_columns(&Mat4::translation(5.0, 6.0, 7.0));
        assert_eq!(columns[3], [5.0, 6.0, 7.0, 1.0]);
    }

    #[test]
    fn align_rounds_up() {
        assert_eq!(align_to(13, 4), 16);
        assert_eq!(align_to(16, 4), 16);
    }
}
