use glam::{Mat2, Mat3, Mat4, Vec2, Vec3, Vec4};

/// Type tag of a uniform slot.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum UniformKind {
    Int,
    Float,
    Vec2,
    Vec3,
    Vec4,
    Mat2,
    Mat3,
    Mat4,
}

impl UniformKind {
    /// Alignment in the uniform address space.
    pub const fn align(self) -> usize {
        match self {
            UniformKind::Int | UniformKind::Float => 4,
            UniformKind::Vec2 | UniformKind::Mat2 => 8,
            UniformKind::Vec3 | UniformKind::Vec4 | UniformKind::Mat3 | UniformKind::Mat4 => 16,
        }
    }

    /// Packed size in bytes (`vec3` leaves its trailing 4 bytes to the next member).
    pub const fn size(self) -> usize {
        match self {
            UniformKind::Int | UniformKind::Float => 4,
            UniformKind::Vec2 => 8,
            UniformKind::Vec3 => 12,
            UniformKind::Vec4 | UniformKind::Mat2 => 16,
            UniformKind::Mat3 => 48,
            UniformKind::Mat4 => 64,
        }
    }
}

/// A uniform value tagged with its type.
///
/// Each variant maps to one upload shape: scalar, vector, or column-major matrix.
#[derive(Debug, Copy, Clone, PartialEq)]
pub enum UniformValue {
    Int(i32),
    Float(f32),
    Vec2(Vec2),
    Vec3(Vec3),
    Vec4(Vec4),
    Mat2(Mat2),
    Mat3(Mat3),
    Mat4(Mat4),
}

impl UniformValue {
    pub fn kind(&self) -> UniformKind {
        match self {
            UniformValue::Int(_) => UniformKind::Int,
            UniformValue::Float(_) => UniformKind::Float,
            UniformValue::Vec2(_) => UniformKind::Vec2,
            UniformValue::Vec3(_) => UniformKind::Vec3,
            UniformValue::Vec4(_) => UniformKind::Vec4,
            UniformValue::Mat2(_) => UniformKind::Mat2,
            UniformValue::Mat3(_) => UniformKind::Mat3,
            UniformValue::Mat4(_) => UniformKind::Mat4,
        }
    }

    /// Writes the value into `dst`, which must be at least `kind().size()` bytes.
    pub fn write_to(&self, dst: &mut [u8]) {
        match self {
            UniformValue::Int(v) => dst[..4].copy_from_slice(bytemuck::bytes_of(v)),
            UniformValue::Float(v) => dst[..4].copy_from_slice(bytemuck::bytes_of(v)),
            UniformValue::Vec2(v) => write_floats(dst, &v.to_array()),
            UniformValue::Vec3(v) => write_floats(dst, &v.to_array()),
            UniformValue::Vec4(v) => write_floats(dst, &v.to_array()),
            // mat2x2: two vec2 columns, 8-byte stride.
            UniformValue::Mat2(m) => write_floats(dst, &m.to_cols_array()),
            // mat3x3: three vec3 columns, each padded to 16 bytes.
            UniformValue::Mat3(m) => {
                for (i, col) in [m.x_axis, m.y_axis, m.z_axis].iter().enumerate() {
                    write_floats(&mut dst[i * 16..], &col.to_array());
                }
            }
            UniformValue::Mat4(m) => write_floats(dst, &m.to_cols_array()),
        }
    }
}

fn write_floats(dst: &mut [u8], src: &[f32]) {
    let bytes: &[u8] = bytemuck::cast_slice(src);
    dst[..bytes.len()].copy_from_slice(bytes);
}

impl From<i32> for UniformValue {
    fn from(v: i32) -> Self {
        UniformValue::Int(v)
    }
}

impl From<f32> for UniformValue {
    fn from(v: f32) -> Self {
        UniformValue::Float(v)
    }
}

impl From<Vec2> for UniformValue {
    fn from(v: Vec2) -> Self {
        UniformValue::Vec2(v)
    }
}

impl From<Vec3> for UniformValue {
    fn from(v: Vec3) -> Self {
        UniformValue::Vec3(v)
    }
}

impl From<Vec4> for UniformValue {
    fn from(v: Vec4) -> Self {
        UniformValue::Vec4(v)
    }
}

impl From<Mat2> for UniformValue {
    fn from(v: Mat2) -> Self {
        UniformValue::Mat2(v)
    }
}

impl From<Mat3> for UniformValue {
    fn from(v: Mat3) -> Self {
        UniformValue::Mat3(v)
    }
}

impl From<Mat4> for UniformValue {
    fn from(v: Mat4) -> Self {
        UniformValue::Mat4(v)
    }
}

/// Location of one named uniform inside a program's uniform block.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct UniformSlot {
    pub offset: usize,
    pub kind: UniformKind,
}

/// Name -> slot table for a uniform block, laid out with WGSL uniform rules.
///
/// Members are placed in declaration order; the block size is rounded up to 16.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UniformLayout {
    entries: Vec<(String, UniformSlot)>,
    size: usize,
}

impl UniformLayout {
    pub fn new(decls: &[(&str, UniformKind)]) -> Self {
        let mut entries: Vec<(String, UniformSlot)> = Vec::with_capacity(decls.len());
        let mut cursor = 0usize;

        for &(name, kind) in decls {
            if entries.iter().any(|(n, _)| n == name) {
                log::warn!("uniform '{name}' declared twice; keeping the first declaration");
                continue;
            }
            let offset = align_up(cursor, kind.align());
            entries.push((name.to_string(), UniformSlot { offset, kind }));
            cursor = offset + kind.size();
        }

        Self {
            entries,
            size: align_up(cursor, 16),
        }
    }

    /// Looks up the slot bound to `name`.
    pub fn slot(&self, name: &str) -> Option<UniformSlot> {
        self.entries
            .iter()
            .find_map(|(n, slot)| (n == name).then_some(*slot))
    }

    /// Block size in bytes.
    #[inline]
    pub fn size(&self) -> usize {
        self.size
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[inline]
fn align_up(v: usize, align: usize) -> usize {
    v.div_ceil(align) * align
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::read_f32s;

    // ── layout ────────────────────────────────────────────────────────────

    #[test]
    fn vec3_leaves_room_for_trailing_scalar() {
        let layout = UniformLayout::new(&[
            ("model", UniformKind::Mat4),
            ("tint", UniformKind::Vec3),
            ("alpha", UniformKind::Float),
            ("time", UniformKind::Float),
        ]);
        assert_eq!(layout.slot("tint").unwrap().offset, 64);
        assert_eq!(layout.slot("alpha").unwrap().offset, 76);
        assert_eq!(layout.slot("time").unwrap().offset, 80);
        assert_eq!(layout.size(), 96);
    }

    #[test]
    fn scalar_then_vec4_is_padded() {
        let layout = UniformLayout::new(&[("a", UniformKind::Float), ("b", UniformKind::Vec4)]);
        assert_eq!(layout.slot("b").unwrap().offset, 16);
        assert_eq!(layout.size(), 32);
    }

    #[test]
    fn mat2_and_vec2_use_8_byte_alignment() {
        let layout = UniformLayout::new(&[
            ("s", UniformKind::Int),
            ("m", UniformKind::Mat2),
            ("v", UniformKind::Vec2),
        ]);
        assert_eq!(layout.slot("m").unwrap().offset, 8);
        assert_eq!(layout.slot("v").unwrap().offset, 24);
        assert_eq!(layout.size(), 32);
    }

    #[test]
    fn unknown_name_has_no_slot() {
        let layout = UniformLayout::new(&[("a", UniformKind::Float)]);
        assert!(layout.slot("b").is_none());
    }

    #[test]
    fn duplicate_declaration_keeps_first() {
        let layout = UniformLayout::new(&[("a", UniformKind::Float), ("a", UniformKind::Mat4)]);
        assert_eq!(layout.slot("a").unwrap().kind, UniformKind::Float);
        assert_eq!(layout.size(), 16);
    }

    // ── packing ───────────────────────────────────────────────────────────

    #[test]
    fn mat3_columns_are_padded_to_16_bytes() {
        let m = Mat3::from_cols_array(&[1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0, 9.0]);
        let mut dst = [0u8; 48];
        UniformValue::Mat3(m).write_to(&mut dst);
        let floats = read_f32s(&dst);
        assert_eq!(&floats[0..3], &[1.0, 2.0, 3.0]);
        assert_eq!(floats[3], 0.0);
        assert_eq!(&floats[4..7], &[4.0, 5.0, 6.0]);
        assert_eq!(&floats[8..11], &[7.0, 8.0, 9.0]);
    }

    #[test]
    fn mat4_is_column_major() {
        let m = Mat4::from_translation(Vec3::new(1.0, 2.0, 3.0));
        let mut dst = [0u8; 64];
        UniformValue::Mat4(m).write_to(&mut dst);
        let floats = read_f32s(&dst);
        assert_eq!(&floats[12..15], &[1.0, 2.0, 3.0]);
    }

    #[test]
    fn int_keeps_integer_bits() {
        let mut dst = [0u8; 4];
        UniformValue::Int(-7).write_to(&mut dst);
        assert_eq!(i32::from_ne_bytes(dst), -7);
    }
}
