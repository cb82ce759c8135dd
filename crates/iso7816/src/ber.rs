//! BER-TLV (tag-length-value) codec as defined in ISO/IEC 7816-4
//!
//! [`Tlv::parse`] extracts one element from a [`TlvReader`] cursor,
//! advancing it just past the value. Constructed elements are not expanded
//! eagerly: [`Tlv::children`] re-scans the value bytes each time it is
//! called, so only the elements a protocol step actually needs are ever
//! decoded.
//!
//! Decoding keeps the exact bytes used to encode the length, and
//! [`Tlv::to_bytes`] re-emits them verbatim, so decoding then encoding is
//! byte-identical to the original input even for non-minimal length forms.

use std::fmt;

use bytes::{BufMut, Bytes, BytesMut};

use crate::TlvError;

/// Maximum number of long-form length bytes this codec accepts.
/// Four bytes already describe values far beyond any card response.
const MAX_LENGTH_OCTETS: usize = 4;

/// Tag class, from bits 8-7 of the leading tag byte
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Class {
    /// Universal class (00)
    Universal,
    /// Application class (01)
    Application,
    /// Context-specific class (10)
    ContextSpecific,
    /// Private class (11)
    Private,
}

/// A BER-TLV tag of one or more bytes
///
/// A leading byte whose low five bits are all set announces a multi-byte
/// tag; subsequent bytes belong to the tag while their high bit is set.
/// Equality, ordering and hashing are over the exact byte sequence.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Tag(Bytes);

impl Tag {
    /// Construct a tag from its encoded bytes, validating the multi-byte
    /// continuation rule
    pub fn from_slice(bytes: &[u8]) -> Result<Self, TlvError> {
        let mut reader = TlvReader::new(bytes);
        let tag = Self::parse(&mut reader)?;
        debug_assert!(reader.is_empty(), "trailing bytes after tag");
        Ok(tag)
    }

    /// Read one tag from the cursor
    ///
    /// Also used standalone for data-object-list (DOL) entries, which are
    /// tag/length pairs with no value bytes.
    pub fn parse(reader: &mut TlvReader<'_>) -> Result<Self, TlvError> {
        let first = reader.read_u8().ok_or(TlvError::TruncatedTag)?;
        let mut bytes = BytesMut::with_capacity(2);
        bytes.put_u8(first);

        // Low five bits all set: the tag number continues in the
        // following bytes while their high bit is set.
        if first & 0x1F == 0x1F {
            loop {
                let next = reader.read_u8().ok_or(TlvError::TruncatedTag)?;
                bytes.put_u8(next);
                if next & 0x80 == 0 {
                    break;
                }
            }
        }

        Ok(Self(bytes.freeze()))
    }

    /// The encoded tag bytes
    pub fn bytes(&self) -> &[u8] {
        &self.0
    }

    /// The tag class, from the leading byte
    pub fn class(&self) -> Class {
        match self.0[0] >> 6 {
            0b00 => Class::Universal,
            0b01 => Class::Application,
            0b10 => Class::ContextSpecific,
            _ => Class::Private,
        }
    }

    /// Whether the tag marks a constructed element (bit 6 of the leading
    /// byte); constructed elements carry nested TLV data as their value
    pub fn is_constructed(&self) -> bool {
        self.0[0] & 0x20 != 0
    }
}

impl From<u8> for Tag {
    fn from(byte: u8) -> Self {
        Self(Bytes::copy_from_slice(&[byte]))
    }
}

impl From<u16> for Tag {
    fn from(word: u16) -> Self {
        if word <= 0xFF {
            Self::from(word as u8)
        } else {
            Self(Bytes::copy_from_slice(&word.to_be_bytes()))
        }
    }
}

impl fmt::Display for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for byte in self.0.iter() {
            write!(f, "{byte:02X}")?;
        }
        Ok(())
    }
}

/// Byte cursor over a TLV stream
///
/// Tracks a position into a borrowed byte slice; every successful
/// [`Tlv::parse`] leaves the cursor just past the parsed value, so
/// repeated calls walk sibling elements until [`TlvReader::is_empty`].
#[derive(Debug, Clone)]
pub struct TlvReader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> TlvReader<'a> {
    /// Create a cursor at the start of the given bytes
    pub const fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    /// Bytes left to read
    pub const fn remaining(&self) -> usize {
        self.data.len() - self.pos
    }

    /// Whether the cursor is exhausted
    pub const fn is_empty(&self) -> bool {
        self.remaining() == 0
    }

    /// Read one length field (short or long form), returning its value
    ///
    /// Used standalone for data-object-list (DOL) entries.
    pub fn read_length(&mut self) -> Result<usize, TlvError> {
        parse_length(self).map(|(length, _)| length)
    }

    fn read_u8(&mut self) -> Option<u8> {
        let byte = *self.data.get(self.pos)?;
        self.pos += 1;
        Some(byte)
    }

    fn read_slice(&mut self, len: usize) -> Option<&'a [u8]> {
        if self.remaining() < len {
            return None;
        }
        let slice = &self.data[self.pos..self.pos + len];
        self.pos += len;
        Some(slice)
    }
}

/// One decoded BER-TLV element
///
/// Holds the tag, the declared length, the exact bytes that encoded the
/// length, and the value. The invariant `value.len() == length` always
/// holds, and [`Tlv::to_bytes`] reproduces the original encoding verbatim.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tlv {
    tag: Tag,
    length: usize,
    raw_length: Bytes,
    value: Bytes,
}

impl Tlv {
    /// Build an element from a tag and value, encoding the length in
    /// minimal form
    pub fn new(tag: impl Into<Tag>, value: impl Into<Bytes>) -> Self {
        let value = value.into();
        Self {
            tag: tag.into(),
            length: value.len(),
            raw_length: encode_length(value.len()),
            value,
        }
    }

    /// Read the next element from the cursor
    ///
    /// On success the cursor points just past the element's value. Fails
    /// with the corresponding [`TlvError`] when the stream ends before a
    /// complete tag, length or value; an empty stream fails with
    /// [`TlvError::TruncatedTag`]. Callers for which "no more elements" is
    /// a valid terminal state check [`TlvReader::is_empty`] first.
    pub fn parse(reader: &mut TlvReader<'_>) -> Result<Self, TlvError> {
        let tag = Tag::parse(reader)?;
        let (length, raw_length) = parse_length(reader)?;
        let value = reader
            .read_slice(length)
            .ok_or(TlvError::TruncatedValue {
                declared: length,
                available: reader.remaining(),
            })?;

        Ok(Self {
            tag,
            length,
            raw_length,
            value: Bytes::copy_from_slice(value),
        })
    }

    /// Parse the first element of the given bytes
    ///
    /// Convenience for single-template payloads (an FCI, a response
    /// message template); bytes past the first element are ignored.
    pub fn from_bytes(data: &[u8]) -> Result<Self, TlvError> {
        Self::parse(&mut TlvReader::new(data))
    }

    /// The element's tag
    pub const fn tag(&self) -> &Tag {
        &self.tag
    }

    /// The declared value length in bytes
    pub const fn length(&self) -> usize {
        self.length
    }

    /// The exact bytes that encoded the length field
    pub const fn raw_length_bytes(&self) -> &Bytes {
        &self.raw_length
    }

    /// The value bytes (`length` of them, always)
    pub const fn value(&self) -> &Bytes {
        &self.value
    }

    /// Total encoded size: tag + length field + value
    pub fn encoded_len(&self) -> usize {
        self.tag.bytes().len() + self.raw_length.len() + self.length
    }

    /// Re-encode the element: tag bytes, the stored raw length bytes (not
    /// a recomputed minimal form), then the value
    ///
    /// For any element produced by [`Tlv::parse`] this is byte-identical
    /// to the bytes originally decoded.
    pub fn to_bytes(&self) -> Bytes {
        let mut buf = BytesMut::with_capacity(self.encoded_len());
        buf.put_slice(self.tag.bytes());
        buf.put_slice(&self.raw_length);
        buf.put_slice(&self.value);
        buf.freeze()
    }

    /// Iterate the child elements of a constructed element
    ///
    /// The value bytes are re-scanned on every call; no child tree is
    /// cached. Calling this on a primitive element walks arbitrary value
    /// bytes; primitives have no children, and the caller is expected to
    /// check [`Tag::is_constructed`] first.
    pub fn children(&self) -> ChildIter<'_> {
        ChildIter {
            reader: TlvReader::new(&self.value),
            failed: false,
        }
    }

    /// Find the first direct child with the given tag
    pub fn find_child(&self, tag: &Tag) -> Result<Option<Self>, TlvError> {
        for child in self.children() {
            let child = child?;
            if child.tag() == tag {
                return Ok(Some(child));
            }
        }
        Ok(None)
    }

    /// Find the first element with the given tag, descending through
    /// constructed children depth-first
    pub fn find_descendant(&self, tag: &Tag) -> Result<Option<Self>, TlvError> {
        for child in self.children() {
            let child = child?;
            if child.tag() == tag {
                return Ok(Some(child));
            }
            if child.tag().is_constructed() {
                if let Some(found) = child.find_descendant(tag)? {
                    return Ok(Some(found));
                }
            }
        }
        Ok(None)
    }
}

impl fmt::Display for Tlv {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {:02X?} ({} bytes)", self.tag, self.value.as_ref(), self.length)
    }
}

/// Iterator over the children of a constructed element
///
/// Yields `Result` items; a malformed child ends the iteration after the
/// error is yielded once.
#[derive(Debug)]
pub struct ChildIter<'a> {
    reader: TlvReader<'a>,
    failed: bool,
}

impl Iterator for ChildIter<'_> {
    type Item = Result<Tlv, TlvError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed || self.reader.is_empty() {
            return None;
        }
        let result = Tlv::parse(&mut self.reader);
        if result.is_err() {
            self.failed = true;
        }
        Some(result)
    }
}

/// Decode a length field, returning the value and the exact bytes read
fn parse_length(reader: &mut TlvReader<'_>) -> Result<(usize, Bytes), TlvError> {
    let first = reader.read_u8().ok_or(TlvError::TruncatedLength)?;

    // Short form: single byte, values 0..=127
    if first & 0x80 == 0 {
        return Ok((first as usize, Bytes::copy_from_slice(&[first])));
    }

    let count = (first & 0x7F) as usize;
    if count == 0 {
        return Err(TlvError::IndefiniteLength);
    }
    if count > MAX_LENGTH_OCTETS {
        return Err(TlvError::UnsupportedLength(count));
    }

    let octets = reader
        .read_slice(count)
        .ok_or(TlvError::TruncatedLength)?;

    let mut length = 0usize;
    for octet in octets {
        length = (length << 8) | *octet as usize;
    }

    let mut raw = BytesMut::with_capacity(1 + count);
    raw.put_u8(first);
    raw.put_slice(octets);
    Ok((length, raw.freeze()))
}

/// Encode a length in minimal form (used for programmatically built
/// elements; parsed elements keep their original length bytes)
fn encode_length(length: usize) -> Bytes {
    if length < 0x80 {
        return Bytes::copy_from_slice(&[length as u8]);
    }
    let octets: Vec<u8> = length
        .to_be_bytes()
        .into_iter()
        .skip_while(|b| *b == 0)
        .collect();
    let mut buf = BytesMut::with_capacity(1 + octets.len());
    buf.put_u8(0x80 | octets.len() as u8);
    buf.put_slice(&octets);
    buf.freeze()
}
