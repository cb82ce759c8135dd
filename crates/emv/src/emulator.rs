//! Scripted virtual card
//!
//! [`CardEmulator`] substitutes a scripted card for a physical connection
//! while satisfying the same [`CardTransport`] contract: it answers the
//! EMV command set from its configured script, maintains
//! selected-application state between commands, and refuses the
//! housekeeping operations an emulator cannot honor (protocol-level
//! reset, low-level control) with a not-supported error rather than
//! silently succeeding.

use std::collections::BTreeMap;

use bytes::{BufMut, Bytes, BytesMut};
use chipflow_apdu_core::response::status::common;
use chipflow_apdu_core::{CardTransport, Command, StatusWord, TransportError};
use chipflow_iso7816::Atr;
use chipflow_iso7816::ber::Tlv;

use crate::commands::plaintext_pin_block;
use crate::constants::{cla, ins};

/// Script for one application on the emulated card
#[derive(Debug, Clone)]
pub struct EmulatedApplication {
    name: Bytes,
    fci: Bytes,
    processing_options: Option<Bytes>,
    records: BTreeMap<(u8, u8), Bytes>,
    cryptogram: Option<Bytes>,
}

impl EmulatedApplication {
    /// Script an application selectable by the given DF name (for
    /// payment applications, the AID)
    pub fn new(name: impl Into<Bytes>) -> Self {
        Self {
            name: name.into(),
            fci: Bytes::new(),
            processing_options: None,
            records: BTreeMap::new(),
            cryptogram: None,
        }
    }

    /// FCI data returned when the application is selected
    pub fn with_fci(mut self, fci: impl Into<Bytes>) -> Self {
        self.fci = fci.into();
        self
    }

    /// Reply data for GET PROCESSING OPTIONS
    pub fn with_processing_options(mut self, data: impl Into<Bytes>) -> Self {
        self.processing_options = Some(data.into());
        self
    }

    /// Record data for the given SFI and record number
    pub fn with_record(mut self, sfi: u8, record: u8, data: impl Into<Bytes>) -> Self {
        self.records.insert((sfi, record), data.into());
        self
    }

    /// Reply data for GENERATE AC
    pub fn with_cryptogram(mut self, data: impl Into<Bytes>) -> Self {
        self.cryptogram = Some(data.into());
        self
    }
}

/// A scripted card behind the standard transport contract
#[derive(Debug)]
pub struct CardEmulator {
    atr: Atr,
    applications: Vec<EmulatedApplication>,
    data_objects: BTreeMap<u16, Bytes>,
    pin: Option<String>,
    pin_tries: u8,
    selected: Option<usize>,
    exchanges: usize,
}

/// Initial PIN try counter value
const PIN_TRY_LIMIT: u8 = 3;

impl CardEmulator {
    /// Create an emulated card with the given ATR and no script
    pub const fn new(atr: Atr) -> Self {
        Self {
            atr,
            applications: Vec::new(),
            data_objects: BTreeMap::new(),
            pin: None,
            pin_tries: PIN_TRY_LIMIT,
            selected: None,
            exchanges: 0,
        }
    }

    /// Add a selectable application
    pub fn with_application(mut self, application: EmulatedApplication) -> Self {
        self.applications.push(application);
        self
    }

    /// Make a primitive data object available to GET DATA
    pub fn with_data_object(mut self, tag: u16, value: impl Into<Bytes>) -> Self {
        self.data_objects.insert(tag, value.into());
        self
    }

    /// Set the reference PIN accepted by VERIFY
    pub fn with_pin(mut self, pin: &str) -> Self {
        self.pin = Some(pin.to_owned());
        self
    }

    /// The emulated card's Answer To Reset
    pub const fn atr(&self) -> &Atr {
        &self.atr
    }

    /// Number of commands dispatched so far
    pub const fn exchange_count(&self) -> usize {
        self.exchanges
    }

    fn select(&mut self, name: Option<&Bytes>) -> Bytes {
        let Some(name) = name.filter(|name| !name.is_empty()) else {
            return respond(&[], StatusWord::new(0x6A, 0x86));
        };

        match self
            .applications
            .iter()
            .position(|app| app.name.starts_with(name))
        {
            Some(index) => {
                self.selected = Some(index);
                respond(&self.applications[index].fci, common::SUCCESS)
            }
            None => respond(&[], common::FILE_NOT_FOUND),
        }
    }

    fn processing_options(&self) -> Bytes {
        match self.selected_application().and_then(|app| app.processing_options.as_ref()) {
            Some(data) => respond(data, common::SUCCESS),
            None => respond(&[], common::CONDITIONS_NOT_SATISFIED),
        }
    }

    fn read_record(&self, record: u8, p2: u8) -> Bytes {
        if p2 & 0x07 != 0x04 {
            return respond(&[], StatusWord::new(0x6A, 0x86));
        }
        let sfi = p2 >> 3;

        let Some(app) = self.selected_application() else {
            return respond(&[], common::CONDITIONS_NOT_SATISFIED);
        };
        match app.records.get(&(sfi, record)) {
            Some(data) => respond(data, common::SUCCESS),
            None => respond(&[], common::RECORD_NOT_FOUND),
        }
    }

    fn get_data(&self, tag: u16) -> Bytes {
        match self.data_objects.get(&tag) {
            Some(value) => respond(&Tlv::new(tag, value.clone()).to_bytes(), common::SUCCESS),
            None => respond(&[], common::REFERENCED_DATA_NOT_FOUND),
        }
    }

    fn verify(&mut self, block: Option<&Bytes>) -> Bytes {
        let Some(pin) = &self.pin else {
            return respond(&[], common::CONDITIONS_NOT_SATISFIED);
        };
        if self.pin_tries == 0 {
            return respond(&[], common::AUTHENTICATION_BLOCKED);
        }

        let Ok(expected) = plaintext_pin_block(pin) else {
            return respond(&[], common::CONDITIONS_NOT_SATISFIED);
        };
        if block.map(Bytes::as_ref) == Some(expected.as_slice()) {
            self.pin_tries = PIN_TRY_LIMIT;
            respond(&[], common::SUCCESS)
        } else {
            self.pin_tries -= 1;
            respond(&[], StatusWord::new(0x63, 0xC0 | self.pin_tries))
        }
    }

    fn generate_ac(&self) -> Bytes {
        match self.selected_application().and_then(|app| app.cryptogram.as_ref()) {
            Some(data) => respond(data, common::SUCCESS),
            None => respond(&[], common::CONDITIONS_NOT_SATISFIED),
        }
    }

    fn selected_application(&self) -> Option<&EmulatedApplication> {
        self.selected.map(|index| &self.applications[index])
    }
}

impl CardTransport for CardEmulator {
    fn do_transmit(&mut self, raw: &[u8]) -> Result<Bytes, TransportError> {
        self.exchanges += 1;

        let Ok(command) = Command::from_bytes(raw) else {
            return Ok(respond(&[], common::WRONG_LENGTH));
        };

        let reply = match (command.cla, command.ins) {
            (cla::ISO7816, ins::SELECT) => self.select(command.data.as_ref()),
            (cla::PROPRIETARY, ins::GET_PROCESSING_OPTIONS) => self.processing_options(),
            (cla::ISO7816, ins::READ_RECORD) => self.read_record(command.p1, command.p2),
            (cla::PROPRIETARY, ins::GET_DATA) => {
                self.get_data(((command.p1 as u16) << 8) | command.p2 as u16)
            }
            (cla::ISO7816, ins::VERIFY) => self.verify(command.data.as_ref()),
            (cla::PROPRIETARY, ins::GENERATE_AC) => self.generate_ac(),
            _ => respond(&[], common::INSTRUCTION_NOT_SUPPORTED),
        };
        Ok(reply)
    }

    fn reset(&mut self) -> Result<(), TransportError> {
        Err(TransportError::NotSupported("card reset"))
    }

    fn control(&mut self, _code: u32, _data: &[u8]) -> Result<Bytes, TransportError> {
        Err(TransportError::NotSupported("control commands"))
    }
}

fn respond(data: &[u8], status: StatusWord) -> Bytes {
    let mut buf = BytesMut::with_capacity(data.len() + 2);
    buf.put_slice(data);
    buf.put_u8(status.sw1);
    buf.put_u8(status.sw2);
    buf.freeze()
}

#[cfg(test)]
mod tests {
    use super::*;
    use hex_literal::hex;

    use crate::commands;
    use crate::constants::tags;

    fn emulator() -> CardEmulator {
        CardEmulator::new(
            Atr::new(hex!("3B 68 00 00 00 73 C8 40 12 00 90 00").to_vec()).unwrap(),
        )
        .with_application(
            EmulatedApplication::new(hex!("A123456789 1010").to_vec())
                .with_fci(hex!("6F 09 84 07 A1 23 45 67 89 10 10").to_vec())
                .with_processing_options(hex!("80 06 19 78 08 01 01 00").to_vec())
                .with_record(1, 1, hex!("70 03 5A 01 42").to_vec()),
        )
        .with_data_object(tags::PIN_TRY_COUNTER, vec![0x03])
        .with_pin("1234")
    }

    #[test]
    fn test_select_and_state_between_commands() {
        let mut card = emulator();

        // Unknown name
        let reply = card
            .transmit(&commands::select_pse().to_bytes())
            .unwrap();
        assert!(reply.status().is_file_not_found());

        // Known AID; selection persists for the follow-up commands
        let select = commands::select_by_df_name(&hex!("A1234567891010"));
        let reply = card.transmit(&select.to_bytes()).unwrap();
        assert!(reply.is_success());
        assert_eq!(&reply.data()[..2], hex!("6F09"));

        let gpo = commands::get_processing_options(Bytes::from_static(&hex!("8300")));
        assert!(card.transmit(&gpo.to_bytes()).unwrap().is_success());

        let reply = card
            .transmit(&commands::read_record(1, 1).to_bytes())
            .unwrap();
        assert_eq!(reply.data().as_ref(), hex!("70035A0142"));

        let reply = card
            .transmit(&commands::read_record(2, 1).to_bytes())
            .unwrap();
        assert!(reply.status().is_record_not_found());
    }

    #[test]
    fn test_gpo_requires_selection() {
        let mut card = emulator();
        let gpo = commands::get_processing_options(Bytes::from_static(&hex!("8300")));
        let reply = card.transmit(&gpo.to_bytes()).unwrap();
        assert!(reply.status().is_security_condition_violated());
    }

    #[test]
    fn test_short_command_rejected_before_dispatch() {
        let mut card = emulator();
        let err = card.transmit(&hex!("00A4")).unwrap_err();
        assert_eq!(err, TransportError::InvalidCommand(2));
        assert_eq!(card.exchange_count(), 0);
    }

    #[test]
    fn test_unknown_instruction() {
        let mut card = emulator();
        let reply = card.transmit(&hex!("00000000 00")).unwrap();
        assert!(reply.status().is_instruction_not_supported());
    }

    #[test]
    fn test_get_data() {
        let mut card = emulator();

        let reply = card
            .transmit(&commands::get_data(tags::PIN_TRY_COUNTER).to_bytes())
            .unwrap();
        assert!(reply.is_success());
        assert_eq!(reply.data().as_ref(), hex!("9F170103"));

        let reply = card
            .transmit(&commands::get_data(tags::ATC).to_bytes())
            .unwrap();
        assert!(reply.status().is_referenced_data_not_found());
    }

    #[test]
    fn test_pin_verification_counts_down() {
        let mut card = emulator();

        let wrong = commands::verify_pin("9999").unwrap().to_bytes();
        let reply = card.transmit(&wrong).unwrap();
        assert_eq!(reply.status().pin_tries_remaining(), Some(2));

        let right = commands::verify_pin("1234").unwrap().to_bytes();
        let reply = card.transmit(&right).unwrap();
        assert!(reply.is_success());

        // Counter reset on success
        let reply = card.transmit(&wrong).unwrap();
        assert_eq!(reply.status().pin_tries_remaining(), Some(2));

        let reply = card.transmit(&wrong).unwrap();
        assert_eq!(reply.status().pin_tries_remaining(), Some(1));
        let reply = card.transmit(&wrong).unwrap();
        assert_eq!(reply.status().pin_tries_remaining(), Some(0));

        let reply = card.transmit(&right).unwrap();
        assert!(reply.status().is_authentication_blocked());
    }

    #[test]
    fn test_housekeeping_refused() {
        let mut card = emulator();
        assert_eq!(
            card.reset().unwrap_err(),
            TransportError::NotSupported("card reset")
        );
        assert_eq!(
            card.control(0x42_0000, &[]).unwrap_err(),
            TransportError::NotSupported("control commands")
        );
    }
}
