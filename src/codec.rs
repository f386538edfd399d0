//! Integer codecs used by program blobs and host calls (Gray Paper Appendix C).
//! Naturals use the JAM variable-length prefix encoding; fixed-width values are little-endian.

/// Decode a natural. Returns the value and the number of bytes consumed; `None` on truncation.
#[must_use]
pub fn decode_natural(data: &[u8]) -> Option<(u64, usize)> {
    let first = *data.first()?;
    // Number of leading one bits in the prefix is the suffix length.
    let len = first.leading_ones() as usize;
    if len == 8 {
        let bytes = data.get(1..9)?;
        return Some((read_le(bytes), 9));
    }
    let suffix = data.get(1..1 + len)?;
    let high_mask = 0xffu8.checked_shr(len as u32 + 1).unwrap_or(0);
    let high = u64::from(first & high_mask);
    Some(((high << (8 * len)) | read_le(suffix), 1 + len))
}

/// Encode a natural with the shortest prefix form.
#[must_use]
pub fn encode_natural(value: u64) -> Vec<u8> {
    for len in 0..8usize {
        if value < 1u64 << (7 * (len + 1)) {
            let prefix_base = 0xffu16 << (8 - len) & 0xff;
            let high = value >> (8 * len);
            let mut out = Vec::with_capacity(1 + len);
            out.push((prefix_base as u64 | high) as u8);
            out.extend_from_slice(&value.to_le_bytes()[..len]);
            return out;
        }
    }
    let mut out = Vec::with_capacity(9);
    out.push(0xff);
    out.extend_from_slice(&value.to_le_bytes());
    out
}

/// Little-endian value of up to 8 bytes.
#[must_use]
pub fn read_le(bytes: &[u8]) -> u64 {
    bytes
        .iter()
        .take(8)
        .enumerate()
        .fold(0u64, |acc, (i, &b)| acc | (u64::from(b) << (8 * i)))
}

/// Encode `value` into `length` little-endian bytes, wrapping modulo 2^(8*length).
#[must_use]
pub fn encode_fixed(value: u64, length: usize) -> Vec<u8> {
    let mut out = vec![0u8; length];
    let bytes = value.to_le_bytes();
    let n = length.min(8);
    out[..n].copy_from_slice(&bytes[..n]);
    out
}

/// Forward-only cursor over an encoded buffer.
pub struct Reader<'a> {
    data: &'a [u8],
    offset: usize,
}

impl<'a> Reader<'a> {
    #[must_use]
    pub const fn new(data: &'a [u8]) -> Self {
        Self { data, offset: 0 }
    }

    pub fn natural(&mut self) -> Option<u64> {
        let (value, used) = decode_natural(self.data.get(self.offset..)?)?;
        self.offset += used;
        Some(value)
    }

    pub fn fixed(&mut self, length: usize) -> Option<u64> {
        self.bytes(length).map(read_le)
    }

    pub fn bytes(&mut self, length: usize) -> Option<&'a [u8]> {
        let end = self.offset.checked_add(length)?;
        let slice = self.data.get(self.offset..end)?;
        self.offset = end;
        Some(slice)
    }

    #[must_use]
    pub fn remaining(&self) -> usize {
        self.data.len().saturating_sub(self.offset)
    }
}
