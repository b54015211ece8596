use std::hash::{BuildHasher, Hasher};
use xxhash_rust::xxh3::Xxh3;

/// Separator written between the parts of a composite key.
pub const KEY_SEPARATOR: u8 = 0x1f;

/// Encoding of a null key part. Value parts always start with `VALUE_TAG`.
const NULL_PART: char = '\u{0}';
const VALUE_TAG: char = '\u{2}';

#[derive(Default, Clone)]
pub struct Xxh3Hasher(Xxh3);

impl Hasher for Xxh3Hasher {
    #[inline]
    fn finish(&self) -> u64 {
        self.0.finish()
    }
    #[inline]
    fn write(&mut self, bytes: &[u8]) {
        self.0.write(bytes);
    }
}

/// `BuildHasher` plugging xxh3 into std and dashmap collections.
#[derive(Clone, Default)]
pub struct Xxh3Builder;

impl BuildHasher for Xxh3Builder {
    type Hasher = Xxh3Hasher;

    #[inline]
    fn build_hasher(&self) -> Self::Hasher {
        Xxh3Hasher(Xxh3::new())
    }
}

/// Streaming xxh3 digest over a sequence of rendered cells.
///
/// Parts are separated so that `["ab", "c"]` and `["a", "bc"]` differ.
#[derive(Default, Clone)]
pub struct RowDigest {
    inner: Xxh3,
    parts: usize,
}

impl RowDigest {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn update(&mut self, part: &str) {
        if self.parts > 0 {
            self.inner.update(&[KEY_SEPARATOR]);
        }
        self.inner.update(part.as_bytes());
        self.parts += 1;
    }

    pub fn parts(&self) -> usize {
        self.parts
    }

    /// Lower-case, zero padded hex digest.
    pub fn hex_digest(&self) -> String {
        format!("{:016x}", self.inner.digest())
    }
}

/// Joins rendered key parts into one map key. `None` stands for null and
/// never equals a value part, including the text `"null"`.
pub fn composite_key<'a>(parts: impl IntoIterator<Item = Option<&'a str>>) -> String {
    let mut key = String::new();
    for (i, part) in parts.into_iter().enumerate() {
        if i > 0 {
            key.push(KEY_SEPARATOR as char);
        }
        match part {
            Some(text) => {
                key.push(VALUE_TAG);
                key.push_str(text);
            }
            None => key.push(NULL_PART),
        }
    }
    key
}

/// Readable form of a [`composite_key`], parts joined by `", "`.
pub fn display_key(key: &str) -> String {
    key.split(KEY_SEPARATOR as char)
        .map(|part| match part.strip_prefix(VALUE_TAG) {
            Some(text) => text,
            None => "null",
        })
        .collect::<Vec<_>>()
        .join(", ")
}
