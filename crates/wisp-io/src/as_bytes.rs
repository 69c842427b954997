use glam::Vec3;

/// Fixed-size little-endian encoding of a plain value.
pub trait AsBytes<const N: usize> {
    fn from_bytes(b: [u8; N]) -> Self;

    fn to_bytes(self) -> [u8; N];
}

impl AsBytes<4> for f32 {
    fn from_bytes(b: [u8; 4]) -> Self {
        f32::from_le_bytes(b)
    }

    fn to_bytes(self) -> [u8; 4] {
        self.to_le_bytes()
    }
}

impl AsBytes<4> for u32 {
    fn from_bytes(b: [u8; 4]) -> Self {
        u32::from_le_bytes(b)
    }

    fn to_bytes(self) -> [u8; 4] {
        self.to_le_bytes()
    }
}

impl AsBytes<8> for u64 {
    fn from_bytes(b: [u8; 8]) -> Self {
        u64::from_le_bytes(b)
    }

    fn to_bytes(self) -> [u8; 8] {
        self.to_le_bytes()
    }
}

impl AsBytes<12> for Vec3 {
    fn from_bytes(b: [u8; 12]) -> Self {
        Vec3::new(
            f32::from_bytes([b[0], b[1], b[2], b[3]]),
            f32::from_bytes([b[4], b[5], b[6], b[7]]),
            f32::from_bytes([b[8], b[9], b[10], b[11]]),
        )
    }

    fn to_bytes(self) -> [u8; 12] {
        let mut out = [0; 12];
        out[0..4].copy_from_slice(&self.x.to_bytes());
        out[4..8].copy_from_slice(&self.y.to_bytes());
        out[8..12].copy_from_slice(&self.z.to_bytes());
        out
    }
}
