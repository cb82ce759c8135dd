//! Application File Locator

use crate::Error;

/// One AFL group: a short file identifier and the record range to read
/// from it
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AflEntry {
    sfi: u8,
    first_record: u8,
    last_record: u8,
    offline_auth_records: u8,
}

impl AflEntry {
    /// Short file identifier of the file to read
    pub const fn sfi(&self) -> u8 {
        self.sfi
    }

    /// First record number, 1-based
    pub const fn first_record(&self) -> u8 {
        self.first_record
    }

    /// Last record number, inclusive
    pub const fn last_record(&self) -> u8 {
        self.last_record
    }

    /// Number of leading records that participate in offline data
    /// authentication
    pub const fn offline_auth_records(&self) -> u8 {
        self.offline_auth_records
    }
}

/// Application File Locator: the list of file/record ranges holding the
/// application's data, returned by GET PROCESSING OPTIONS
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ApplicationFileLocator {
    entries: Vec<AflEntry>,
}

impl ApplicationFileLocator {
    /// Decode the locator's 4-byte groups:
    /// SFI in the upper 5 bits of byte 1, first record in byte 2, last
    /// record in byte 3, offline-authentication count in byte 4
    pub fn parse(data: &[u8]) -> Result<Self, Error> {
        if data.len() % 4 != 0 {
            return Err(Error::MalformedData(
                "application file locator must be a multiple of 4 bytes",
            ));
        }

        let mut entries = Vec::with_capacity(data.len() / 4);
        for group in data.chunks_exact(4) {
            let entry = AflEntry {
                sfi: group[0] >> 3,
                first_record: group[1],
                last_record: group[2],
                offline_auth_records: group[3],
            };
            if entry.first_record == 0 || entry.first_record > entry.last_record {
                return Err(Error::MalformedData(
                    "application file locator declares an invalid record range",
                ));
            }
            entries.push(entry);
        }

        Ok(Self { entries })
    }

    /// The decoded groups, in card order
    pub fn entries(&self) -> &[AflEntry] {
        &self.entries
    }

    /// Whether the locator declares no records at all
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hex_literal::hex;

    #[test]
    fn test_afl_parse() {
        let afl = ApplicationFileLocator::parse(&hex!("08 01 01 00 10 01 02 01")).unwrap();

        assert_eq!(afl.entries().len(), 2);
        assert_eq!(afl.entries()[0].sfi(), 1);
        assert_eq!(afl.entries()[0].first_record(), 1);
        assert_eq!(afl.entries()[0].last_record(), 1);
        assert_eq!(afl.entries()[1].sfi(), 2);
        assert_eq!(afl.entries()[1].last_record(), 2);
        assert_eq!(afl.entries()[1].offline_auth_records(), 1);
    }

    #[test]
    fn test_afl_empty() {
        let afl = ApplicationFileLocator::parse(&[]).unwrap();
        assert!(afl.is_empty());
    }

    #[test]
    fn test_afl_rejects_ragged_groups() {
        assert_eq!(
            ApplicationFileLocator::parse(&hex!("08 01 01")),
            Err(Error::MalformedData(
                "application file locator must be a multiple of 4 bytes"
            ))
        );
    }

    #[test]
    fn test_afl_rejects_invalid_range() {
        // First record 0
        assert!(ApplicationFileLocator::parse(&hex!("08 00 01 00")).is_err());
        // First past last
        assert!(ApplicationFileLocator::parse(&hex!("08 03 01 00")).is_err());
    }
}
