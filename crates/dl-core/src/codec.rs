//! Length-prefixed binary encoding for argument vectors.
//!
//! Layout: a big-endian `u32` element count, then one big-endian `u32` byte
//! length per element, then the raw bytes of every element back to back.
//! Elements are arbitrary bytes; nothing here assumes UTF-8.

use thiserror::Error;

const WORD: usize = 4;

/// Error returned by [`decode`].
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CodecError {
    /// The buffer ended before everything its header promised was read.
    /// `decoded` holds the elements that were complete before the shortfall.
    #[error("truncated argument data: expected {expected} element(s), decoded {}", decoded.len())]
    Truncated {
        expected: usize,
        decoded: Vec<Vec<u8>>,
    },
}

impl CodecError {
    /// Elements recovered before decoding failed (for diagnostics only).
    pub fn partial(&self) -> &[Vec<u8>] {
        match self {
            CodecError::Truncated { decoded, .. } => decoded,
        }
    }
}

/// Encode `args` into the length-prefixed layout.
///
/// Panics if the list or one element is longer than `u32::MAX` bytes,
/// which the format cannot represent.
pub fn encode<A: AsRef<[u8]>>(args: &[A]) -> Vec<u8> {
    let payload: usize = args.iter().map(|a| a.as_ref().len()).sum();
    let mut out = Vec::with_capacity(WORD * (1 + args.len()) + payload);

    out.extend_from_slice(&to_word(args.len()).to_be_bytes());
    for arg in args {
        out.extend_from_slice(&to_word(arg.as_ref().len()).to_be_bytes());
    }
    for arg in args {
        out.extend_from_slice(arg.as_ref());
    }
    out
}

/// Decode a buffer produced by [`encode`].
///
/// A zero-length buffer is the empty list: lock files are created empty
/// before their first real write.
pub fn decode(buf: &[u8]) -> Result<Vec<Vec<u8>>, CodecError> {
    if buf.is_empty() {
        return Ok(Vec::new());
    }

    let mut rest = buf;
    let Some(count) = take_word(&mut rest) else {
        return Err(CodecError::Truncated {
            expected: 0,
            decoded: Vec::new(),
        });
    };
    let count = count as usize;

    // Check the length table fits before allocating for it.
    if rest.len() / WORD < count {
        return Err(CodecError::Truncated {
            expected: count,
            decoded: Vec::new(),
        });
    }
    let mut sizes = Vec::with_capacity(count);
    for _ in 0..count {
        // Length was checked above.
        let size = take_word(&mut rest).unwrap_or_default();
        sizes.push(size as usize);
    }

    let mut decoded = Vec::with_capacity(count);
    for size in sizes {
        if rest.len() < size {
            return Err(CodecError::Truncated {
                expected: count,
                decoded,
            });
        }
        let (elem, tail) = rest.split_at(size);
        decoded.push(elem.to_vec());
        rest = tail;
    }

    Ok(decoded)
}

fn take_word(rest: &mut &[u8]) -> Option<u32> {
    if rest.len() < WORD {
        return None;
    }
    let (head, tail) = rest.split_at(WORD);
    *rest = tail;
    Some(u32::from_be_bytes([head[0], head[1], head[2], head[3]]))
}

fn to_word(n: usize) -> u32 {
    u32::try_from(n).expect("argument vector exceeds u32 length field")
}
