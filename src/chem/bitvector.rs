//! fixed-size bit vectors and their binary form. the binary layout is the one
//! RDKit uses to pickle an `ExplicitBitVect`, so blobs written here can be
//! read back with `ExplicitBitVect(bytes)` on the Python side

use thiserror::Error;

/// current pickle version, written negated as the first word
const VERSION: i32 = 0x20;
/// older pickles store raw indices instead of packed run lengths: u16 for
/// vectors shorter than 65535 bits and u32 past that
const VERSION_RAW: i32 = 0x10;

/// the longest vector whose zero runs all fit the 4 byte packed encoding
pub const MAX_SIZE: usize =
    (1 << 29) + (1 << 21) + (1 << 14) + (1 << 7) - 1;

#[derive(Clone, Debug, Error, PartialEq)]
pub enum PickleError {
    #[error("bit vector pickle ended early")]
    Truncated,

    #[error("bad bit vector pickle header {0}")]
    Version(i32),

    #[error("invalid bit vector size {0}")]
    Size(i32),

    #[error("bit {index} is out of range for a vector of size {size}")]
    OutOfRange { index: usize, size: usize },
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct BitVector {
    size: usize,
    words: Vec<u64>,
}

impl BitVector {
    /// panics if `size` is larger than [MAX_SIZE]
    pub fn new(size: usize) -> Self {
        assert!(size <= MAX_SIZE, "bit vector size {size} is too large");
        Self {
            size,
            words: vec![0; size.div_ceil(64)],
        }
    }

    pub fn len(&self) -> usize {
        self.size
    }

    pub fn is_empty(&self) -> bool {
        self.size == 0
    }

    /// panics if `idx` is out of range
    pub fn set(&mut self, idx: usize) {
        assert!(idx < self.size, "bit {idx} out of range {}", self.size);
        self.words[idx / 64] |= 1 << (idx % 64);
    }

    pub fn get(&self, idx: usize) -> bool {
        idx < self.size && self.words[idx / 64] & (1 << (idx % 64)) != 0
    }

    pub fn count_ones(&self) -> usize {
        self.words.iter().map(|w| w.count_ones() as usize).sum()
    }

    /// indices of the set bits in increasing order
    pub fn on_bits(&self) -> impl Iterator<Item = usize> + '_ {
        self.words.iter().enumerate().flat_map(|(i, &w)| {
            (0..64)
                .filter(move |b| w & (1 << b) != 0)
                .map(move |b| i * 64 + b)
        })
    }

    /// the number of bits set in both `self` and `other`
    pub fn count_common(&self, other: &Self) -> usize {
        self.words
            .iter()
            .zip(&other.words)
            .map(|(a, b)| (a & b).count_ones() as usize)
            .sum()
    }

    pub fn to_binary(&self) -> Vec<u8> {
        let nbits = self.count_ones();
        let mut out = Vec::with_capacity(12 + nbits + 4);
        out.extend((-VERSION).to_le_bytes());
        out.extend((self.size as i32).to_le_bytes());
        out.extend((nbits as i32).to_le_bytes());
        // each on bit is stored as the run of zeros before it, followed by
        // the zeros after the last one
        let mut next = 0;
        for bit in self.on_bits() {
            append_packed(&mut out, (bit - next) as u32);
            next = bit + 1;
        }
        append_packed(&mut out, (self.size - next) as u32);
        out
    }

    pub fn from_binary(data: &[u8]) -> Result<Self, PickleError> {
        let mut r = Reader { data, pos: 0 };
        let header = r.i32()?;
        let raw = match header {
            h if h == -VERSION => false,
            h if h == -VERSION_RAW => true,
            h => return Err(PickleError::Version(h)),
        };
        let size = r.i32()?;
        if size < 0 || size as usize > MAX_SIZE {
            return Err(PickleError::Size(size));
        }
        let nbits = r.i32()?;
        if nbits < 0 {
            return Err(PickleError::Size(nbits));
        }
        let size = size as usize;
        let mut ret = Self::new(size);
        let mut cur = 0;
        for _ in 0..nbits {
            let index = if raw && size < 65535 {
                r.u16()? as usize
            } else if raw {
                r.u32()? as usize
            } else {
                cur + r.packed()? as usize
            };
            if index >= size {
                return Err(PickleError::OutOfRange { index, size });
            }
            ret.set(index);
            cur = index + 1;
        }
        Ok(ret)
    }
}

/// RDKit's variable length integer: the low bits of the first byte say how
/// many bytes follow, and each length covers the range past the shorter ones
fn append_packed(out: &mut Vec<u8>, num: u32) {
    let mut res = num;
    let (val, nbytes) = if res < 1 << 7 {
        (res << 1, 1)
    } else {
        res -= 1 << 7;
        if res < 1 << 14 {
            ((res << 2) | 1, 2)
        } else {
            res -= 1 << 14;
            if res < 1 << 21 {
                ((res << 3) | 3, 3)
            } else {
                res -= 1 << 21;
                // RDKit refuses anything past 29 bits. fingerprint sizes are
                // far below that
                assert!(res < 1 << 29, "{num} is too big to pack");
                ((res << 3) | 7, 4)
            }
        }
    };
    out.extend(&val.to_le_bytes()[..nbytes]);
}

struct Reader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl Reader<'_> {
    fn take(&mut self, n: usize) -> Result<&[u8], PickleError> {
        let end = self.pos + n;
        let bytes = self.data.get(self.pos..end).ok_or(PickleError::Truncated)?;
        self.pos = end;
        Ok(bytes)
    }

    fn i32(&mut self) -> Result<i32, PickleError> {
        Ok(self.u32()? as i32)
    }

    fn u32(&mut self) -> Result<u32, PickleError> {
        let mut buf = [0; 4];
        buf.copy_from_slice(self.take(4)?);
        Ok(u32::from_le_bytes(buf))
    }

    fn u16(&mut self) -> Result<u16, PickleError> {
        let mut buf = [0; 2];
        buf.copy_from_slice(self.take(2)?);
        Ok(u16::from_le_bytes(buf))
    }

    fn packed(&mut self) -> Result<u32, PickleError> {
        let first = self.take(1)?[0] as u32;
        let (extra, shift, offset) = if first & 1 == 0 {
            (0, 1, 0)
        } else if first & 3 == 1 {
            (1, 2, 1 << 7)
        } else if first & 7 == 3 {
            (2, 3, (1 << 7) + (1 << 14))
        } else {
            (3, 3, (1 << 7) + (1 << 14) + (1 << 21))
        };
        let mut val = first;
        for (i, &b) in self.take(extra)?.iter().enumerate() {
            val |= (b as u32) << (8 * (i + 1));
        }
        Ok((val >> shift) + offset)
    }
}
