//! Data Object List (DOL) handling
//!
//! A DOL (the PDOL of an FCI, the CDOLs of a record) lists the data
//! objects a card wants the terminal to supply: a sequence of tag/length
//! pairs with no values present. The terminal answers with a block of
//! exactly the declared lengths, concatenated in order.

use bytes::{BufMut, Bytes, BytesMut};
use chipflow_iso7816::TlvError;
use chipflow_iso7816::ber::{Tag, Tlv, TlvReader};

use crate::constants::tags;

/// One requested data object: its tag and the length the card expects
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DolEntry {
    tag: Tag,
    length: usize,
}

impl DolEntry {
    /// The requested tag
    pub const fn tag(&self) -> &Tag {
        &self.tag
    }

    /// The expected value length in bytes
    pub const fn length(&self) -> usize {
        self.length
    }
}

/// A parsed Data Object List
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataObjectList {
    entries: Vec<DolEntry>,
}

impl DataObjectList {
    /// Parse the tag/length pairs of a DOL
    pub fn parse(data: &[u8]) -> Result<Self, TlvError> {
        let mut reader = TlvReader::new(data);
        let mut entries = Vec::new();

        while !reader.is_empty() {
            let tag = Tag::parse(&mut reader)?;
            let length = reader.read_length()?;
            entries.push(DolEntry { tag, length });
        }

        Ok(Self { entries })
    }

    /// The requested entries, in card order
    pub fn entries(&self) -> &[DolEntry] {
        &self.entries
    }

    /// Total length of the terminal data block the card expects
    pub fn total_length(&self) -> usize {
        self.entries.iter().map(DolEntry::length).sum()
    }

    /// Build a zero-filled terminal data block of the declared lengths
    ///
    /// This engine supplies no terminal configuration, so every requested
    /// object is answered with zeroes of the right width.
    pub fn zero_filled(&self) -> Bytes {
        let mut buf = BytesMut::with_capacity(self.total_length());
        buf.put_bytes(0x00, self.total_length());
        buf.freeze()
    }
}

/// Build the GET PROCESSING OPTIONS data field: the PDOL's zero-filled
/// block wrapped in the command template (tag 83); an absent PDOL yields
/// the empty template `83 00`
pub fn gpo_data(pdol: Option<&DataObjectList>) -> Bytes {
    let fill = pdol.map(DataObjectList::zero_filled).unwrap_or_default();
    Tlv::new(tags::COMMAND_TEMPLATE, fill).to_bytes()
}
