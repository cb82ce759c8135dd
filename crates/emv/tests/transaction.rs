//! End-to-end session tests against the scripted card emulator

use bytes::Bytes;
use hex_literal::hex;

use chipflow_emv::emulator::{CardEmulator, EmulatedApplication};
use chipflow_emv::{
    Aid, Atr, CardTransport, EmvApplication, EmvSession, Error, PinVerification, SmartCard,
    TransactionPath, TransportError, constants,
};

const VISA_AID: [u8; 7] = hex!("A0000000031010");

/// PPSE FCI advertising one Visa application
const PPSE_FCI: [u8; 46] = hex!(
    "6F 2C 84 0E 32 50 41 59 2E 53 59 53 2E 44 44 46 30 31"
    "A5 1A BF 0C 17 61 15"
    "4F 07 A0 00 00 00 03 10 10"
    "50 07 56 49 53 41 43 52 45"
    "87 01 01"
);

/// Visa application FCI with label, priority and PDOL
const VISA_FCI: [u8; 41] = hex!(
    "6F 27 84 07 A0 00 00 00 03 10 10"
    "A5 1C 50 0B 56 49 53 41 20 43 52 45 44 49 54"
    "87 01 01"
    "9F 38 09 9F 66 04 9F 02 06 9F 37 04"
);

/// Format 2 processing options: AIP 39 00 (CDA supported), one file with
/// records 1..=2 in SFI 1
const VISA_GPO: [u8; 12] = hex!("77 0A 82 02 39 00 94 04 08 01 02 00");

const RECORD_1: [u8; 12] = hex!("70 0A 5A 08 41 11 11 11 11 11 11 11");

/// Record carrying CDOL1
const RECORD_2: [u8; 25] = hex!(
    "70 17 8C 15"
    "9F 02 06 9F 03 06 9F 1A 02 95 05 5F 2A 02 9A 03 9C 01 9F 37 04"
);

const CRYPTOGRAM: [u8; 22] = hex!(
    "77 14 9F 27 01 80 9F 36 02 00 01"
    "9F 26 08 AA BB CC DD EE FF 00 11"
);

fn test_atr() -> Atr {
    Atr::new(hex!("3B 68 00 00 00 73 C8 40 12 00 90 00").to_vec()).unwrap()
}

/// A contactless-only card: no PSE, a PPSE directory and one application
fn contactless_card() -> CardEmulator {
    CardEmulator::new(test_atr())
        .with_application(
            EmulatedApplication::new(constants::PPSE_NAME.to_vec()).with_fci(PPSE_FCI.to_vec()),
        )
        .with_application(
            EmulatedApplication::new(VISA_AID.to_vec())
                .with_fci(VISA_FCI.to_vec())
                .with_processing_options(VISA_GPO.to_vec())
                .with_record(1, 1, RECORD_1.to_vec())
                .with_record(1, 2, RECORD_2.to_vec())
                .with_cryptogram(CRYPTOGRAM.to_vec()),
        )
        .with_data_object(constants::tags::PIN_TRY_COUNTER, vec![0x03])
        .with_pin("1234")
}

fn start(card: CardEmulator) -> EmvSession<CardEmulator> {
    EmvSession::start_session(Some(SmartCard::new(test_atr())), Some(card)).unwrap()
}

#[test]
fn start_session_requires_both_arguments() {
    let missing_card = EmvSession::<CardEmulator>::start_session(None, Some(contactless_card()));
    assert!(matches!(missing_card, Err(Error::InvalidArgument(_))));

    let missing_connection =
        EmvSession::<CardEmulator>::start_session(Some(SmartCard::new(test_atr())), None);
    assert!(matches!(missing_connection, Err(Error::InvalidArgument(_))));
}

#[test]
fn full_transaction_walk() {
    let mut session = start(contactless_card());

    // Discovery through the PPSE fallback
    session.init_context().unwrap();
    assert!(session.is_context_initialized());
    let candidates = session.card().applications();
    assert_eq!(candidates.len(), 1);
    assert_eq!(candidates[0].aid().bytes(), VISA_AID);
    assert_eq!(candidates[0].label(), Some("VISACRE"));

    // Selection enriches the application from the FCI
    let candidate = candidates[0].clone();
    session.select_application(candidate).unwrap();
    let selected = session.card().selected_application().unwrap();
    assert_eq!(selected.label(), Some("VISA CREDIT"));
    assert_eq!(selected.priority(), Some(1));
    assert_eq!(selected.pdol().unwrap().total_length(), 14);

    // GET PROCESSING OPTIONS
    session.initiate_application_processing().unwrap();
    let selected = session.card().selected_application().unwrap();
    assert!(selected.is_initialized_on_icc());
    assert!(selected.interchange_profile().unwrap().cda_supported());
    assert_eq!(selected.file_locator().unwrap().entries().len(), 1);

    // Repeat initiation is a no-op with no transmission
    let exchanges = session.transport().exchange_count();
    session.initiate_application_processing().unwrap();
    assert_eq!(session.transport().exchange_count(), exchanges);

    // Record reading captures the CDOL
    session.read_application_data().unwrap();
    let selected = session.card().selected_application().unwrap();
    assert!(selected.is_all_records_read());
    assert_eq!(selected.records().len(), 2);
    assert_eq!(selected.records()[0].as_ref(), RECORD_1);
    assert_eq!(selected.cdol1().unwrap().total_length(), 29);

    // CDA path armed from the interchange profile
    session.prepare_transaction_processing().unwrap();
    assert_eq!(session.transaction_path(), Some(TransactionPath::Cda));

    // Completion stores the cryptogram template opaquely
    session.perform_transaction().unwrap();
    assert!(session.is_transaction_complete());
    let selected = session.card().selected_application().unwrap();
    assert_eq!(selected.cryptogram().unwrap().as_ref(), CRYPTOGRAM);
}

#[test]
fn init_context_is_one_shot() {
    let mut session = start(contactless_card());
    session.init_context().unwrap();

    let exchanges = session.transport().exchange_count();
    let err = session.init_context().unwrap_err();
    assert_eq!(err, Error::protocol("context already initialized"));
    // The failure itself transmits nothing
    assert_eq!(session.transport().exchange_count(), exchanges);
}

#[test]
fn pse_fallback_transmits_exactly_once() {
    let mut session = start(contactless_card());
    session.init_context().unwrap();
    // One PSE attempt answered 6A82, one PPSE fallback
    assert_eq!(session.transport().exchange_count(), 2);
}

#[test]
fn select_failure_leaves_selection_unchanged() {
    let mut session = start(contactless_card());
    session.init_context().unwrap();

    let visa = session.card().applications()[0].clone();
    session.select_application(visa.clone()).unwrap();

    let unknown = EmvApplication::new(Aid::from_hex("A0 00 00 00 04 10 10").unwrap());
    let err = session.select_application(unknown).unwrap_err();
    assert!(matches!(
        err,
        Error::ProtocolState {
            message: "failed to select application",
            status: Some(status),
        } if status.is_file_not_found()
    ));

    // The previous selection survives
    let selected = session.card().selected_application().unwrap();
    assert_eq!(selected.aid(), visa.aid());
}

#[test]
fn steps_out_of_order_are_protocol_errors() {
    let mut session = start(contactless_card());

    assert_eq!(
        session.initiate_application_processing().unwrap_err(),
        Error::protocol("no application selected")
    );

    session.init_context().unwrap();
    let visa = session.card().applications()[0].clone();
    session.select_application(visa).unwrap();

    assert_eq!(
        session.read_application_data().unwrap_err(),
        Error::protocol("application processing not initiated")
    );

    session.initiate_application_processing().unwrap();
    assert_eq!(
        session.prepare_transaction_processing().unwrap_err(),
        Error::protocol("application processing not complete")
    );

    assert_eq!(
        session.perform_transaction().unwrap_err(),
        Error::protocol("transaction processing not prepared")
    );
}

#[test]
fn cardholder_verification_is_not_fatal() {
    let mut session = start(contactless_card());
    session.init_context().unwrap();

    assert_eq!(session.read_pin_try_counter().unwrap(), 3);

    assert_eq!(
        session.verify_pin("9999").unwrap(),
        PinVerification::TriesRemaining(2)
    );
    assert_eq!(session.verify_pin("1234").unwrap(), PinVerification::Verified);

    // A bad PIN argument never reaches the card
    let exchanges = session.transport().exchange_count();
    assert!(matches!(
        session.verify_pin("12"),
        Err(Error::InvalidArgument(_))
    ));
    assert_eq!(session.transport().exchange_count(), exchanges);
}

/// Transport scripted with raw replies, for status-word cases the
/// emulator does not produce
#[derive(Debug, Default)]
struct ScriptedTransport {
    replies: Vec<Bytes>,
    sent: Vec<Bytes>,
}

impl ScriptedTransport {
    fn new(replies: &[&[u8]]) -> Self {
        Self {
            replies: replies.iter().map(|r| Bytes::copy_from_slice(r)).collect(),
            sent: Vec::new(),
        }
    }
}

impl CardTransport for ScriptedTransport {
    fn do_transmit(&mut self, command: &[u8]) -> Result<Bytes, TransportError> {
        self.sent.push(Bytes::copy_from_slice(command));
        if self.replies.is_empty() {
            return Err(TransportError::Transmission);
        }
        Ok(self.replies.remove(0))
    }

    fn reset(&mut self) -> Result<(), TransportError> {
        Err(TransportError::NotSupported("reset"))
    }

    fn control(&mut self, _code: u32, _data: &[u8]) -> Result<Bytes, TransportError> {
        Err(TransportError::NotSupported("control"))
    }
}

#[test]
fn pse_error_other_than_not_found_is_surfaced() {
    let transport = ScriptedTransport::new(&[&hex!("6982")]);
    let mut session =
        EmvSession::start_session(Some(SmartCard::new(test_atr())), Some(transport)).unwrap();

    let err = session.init_context().unwrap_err();
    assert!(matches!(
        err,
        Error::ProtocolState {
            message: "failed to select payment system environment",
            status: Some(status),
        } if status.is_security_condition_violated()
    ));

    // Last good state: the context is still uninitialized
    assert!(!session.is_context_initialized());
    assert_eq!(session.transport().sent.len(), 1);
}

#[test]
fn ppse_fallback_failure_is_absorbed() {
    // PSE not found, PPSE answers conditions-not-satisfied
    let transport = ScriptedTransport::new(&[&hex!("6A82"), &hex!("6985")]);
    let mut session =
        EmvSession::start_session(Some(SmartCard::new(test_atr())), Some(transport)).unwrap();

    session.init_context().unwrap();
    assert!(session.is_context_initialized());
    assert_eq!(session.transport().sent.len(), 2);
    assert!(session.card().applications().is_empty());
}
