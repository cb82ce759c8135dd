//! EMV transaction session state machine
//!
//! An [`EmvSession`] owns one [`SmartCard`] and one transport for its
//! whole lifetime and sequences the SELECT / GET PROCESSING OPTIONS /
//! READ RECORD exchanges of a transaction. Each lifecycle method
//! transmits, decodes the TLV reply, classifies the status word, and
//! either advances the implicit step state or fails with a typed error
//! leaving the session in its last good state.

use bytes::Bytes;
use chipflow_apdu_core::CardTransport;
use chipflow_iso7816::Aid;
use chipflow_iso7816::ber::{Tag, Tlv};
use tracing::{debug, warn};

use crate::card::{EmvApplication, SmartCard};
use crate::commands;
use crate::constants::tags;
use crate::dol::{self, DataObjectList};
use crate::types::{ApplicationFileLocator, ApplicationInterchangeProfile};
use crate::{Error, Result};

/// Transaction-completion path selected from the interchange profile
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransactionPath {
    /// Combined dynamic data authentication alongside the cryptogram
    Cda,
    /// Cryptogram only
    Plain,
}

/// Outcome of a PIN verification, surfaced to the caller rather than
/// treated as fatal to the session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PinVerification {
    /// The card accepted the PIN
    Verified,
    /// The card rejected the PIN; this many tries remain
    TriesRemaining(u8),
    /// PIN verification is blocked
    Blocked,
}

/// An EMV transaction session
///
/// Fully synchronous: every operation blocks on one or two round trips
/// through the transport. The session exclusively owns the transport:
/// the card has no concept of interleaved conversations.
#[derive(Debug)]
pub struct EmvSession<T: CardTransport> {
    card: SmartCard,
    transport: T,
    context_initialized: bool,
    transaction_path: Option<TransactionPath>,
    transaction_complete: bool,
}

impl<T: CardTransport> EmvSession<T> {
    /// Start a session over the given card and transport
    ///
    /// Both inputs must be present; fails with the invalid-argument kind
    /// otherwise.
    pub fn start_session(card: Option<SmartCard>, transport: Option<T>) -> Result<Self> {
        let (Some(card), Some(transport)) = (card, transport) else {
            return Err(Error::InvalidArgument(
                "card and connection arguments cannot be absent",
            ));
        };

        Ok(Self {
            card,
            transport,
            context_initialized: false,
            transaction_path: None,
            transaction_complete: false,
        })
    }

    /// The card aggregate driven by this session
    pub const fn card(&self) -> &SmartCard {
        &self.card
    }

    /// The transport owned by this session
    pub const fn transport(&self) -> &T {
        &self.transport
    }

    /// Whether [`init_context`](Self::init_context) has completed
    pub const fn is_context_initialized(&self) -> bool {
        self.context_initialized
    }

    /// Whether [`perform_transaction`](Self::perform_transaction) has
    /// completed
    pub const fn is_transaction_complete(&self) -> bool {
        self.transaction_complete
    }

    /// Initialize the session context by selecting the payment system
    /// environment
    ///
    /// Allowed exactly once. SELECTs the PSE; on success the returned FCI
    /// seeds candidate discovery. When the card reports file-not-found
    /// (6A 82), one fallback SELECT of the contactless PPSE is attempted
    /// and its outcome absorbed, since application selection may still proceed
    /// by direct AID. Any other error status aborts without marking the
    /// context initialized.
    ///
    /// A second call fails with a protocol-state error and performs no
    /// transmission.
    pub fn init_context(&mut self) -> Result<()> {
        if self.context_initialized {
            return Err(Error::protocol("context already initialized"));
        }

        debug!("selecting payment system environment");
        let response = self.transport.transmit(&commands::select_pse().to_bytes())?;
        let status = response.status();

        if status.is_success() {
            self.discover_candidates(response.data());
        } else if status.is_file_not_found() {
            debug!("PSE not present, falling back to proximity environment");
            match self.transport.transmit(&commands::select_ppse().to_bytes()) {
                Ok(fallback) if fallback.is_success() => {
                    self.discover_candidates(fallback.data());
                }
                Ok(fallback) => {
                    debug!(status = %fallback.status(), "proximity environment unavailable");
                }
                Err(error) => {
                    warn!(%error, "proximity environment selection failed");
                }
            }
        } else {
            return Err(Error::protocol_with_status(
                "failed to select payment system environment",
                status,
            ));
        }

        self.context_initialized = true;
        Ok(())
    }

    /// Select an application by its AID
    ///
    /// On success the card's selection is overwritten with `app`, enriched
    /// with whatever the FCI carried (label, priority, PDOL). On a
    /// non-success status word the selection is left unchanged and a
    /// protocol-state error carrying the status is raised.
    pub fn select_application(&mut self, mut app: EmvApplication) -> Result<()> {
        let command = commands::select_by_df_name(app.aid().bytes());
        let response = self.transport.transmit(&command.to_bytes())?;
        let status = response.status();

        if !status.is_success() {
            return Err(Error::protocol_with_status(
                "failed to select application",
                status,
            ));
        }

        if !response.data().is_empty() {
            Self::apply_select_fci(&mut app, response.data())?;
        }

        debug!(aid = %app.aid(), "application selected");
        self.card.set_selected_application(app);
        Ok(())
    }

    /// Initiate application processing with GET PROCESSING OPTIONS
    ///
    /// Requires a selected application. The command data is built from
    /// the PDOL captured during selection; the reply's interchange
    /// profile and file locator are decoded onto the application, which
    /// is then marked initialized. Once initialized, repeat calls are a
    /// no-op with no transmission.
    pub fn initiate_application_processing(&mut self) -> Result<()> {
        let gpo_data = {
            let Some(app) = self.card.selected_application() else {
                return Err(Error::protocol("no application selected"));
            };
            if app.is_initialized_on_icc() {
                debug!(aid = %app.aid(), "application already initialized on ICC");
                return Ok(());
            }
            dol::gpo_data(app.pdol())
        };

        let command = commands::get_processing_options(gpo_data);
        let response = self.transport.transmit(&command.to_bytes())?;
        let status = response.status();

        if !status.is_success() {
            return Err(Error::protocol_with_status(
                "failed to initiate application processing",
                status,
            ));
        }

        let (profile, locator) = parse_processing_options(response.data())?;
        debug!(
            cda = profile.cda_supported(),
            files = locator.entries().len(),
            "application processing initiated"
        );

        // Checked non-absent above; no transmission changes the selection.
        if let Some(app) = self.card.selected_application_mut() {
            app.interchange_profile = Some(profile);
            app.file_locator = Some(locator);
            app.initialized_on_icc = true;
        }
        Ok(())
    }

    /// Read every record declared by the application file locator
    ///
    /// Requires initiated processing. Records are stored on the selected
    /// application; CDOLs found in record templates are captured for the
    /// transaction-completion step. Afterwards the application is marked
    /// fully read; a file locator declaring no records satisfies that
    /// trivially.
    pub fn read_application_data(&mut self) -> Result<()> {
        let entries = {
            let Some(app) = self.card.selected_application() else {
                return Err(Error::protocol("no application selected"));
            };
            if !app.is_initialized_on_icc() {
                return Err(Error::protocol("application processing not initiated"));
            }
            app.file_locator()
                .map(|locator| locator.entries().to_vec())
                .unwrap_or_default()
        };

        let mut records = Vec::new();
        let mut cdol1 = None;
        let mut cdol2 = None;

        for entry in &entries {
            for record in entry.first_record()..=entry.last_record() {
                let command = commands::read_record(record, entry.sfi());
                let response = self.transport.transmit(&command.to_bytes())?;
                let status = response.status();

                if !status.is_success() {
                    return Err(Error::protocol_with_status(
                        "failed to read application record",
                        status,
                    ));
                }

                let template = Tlv::from_bytes(response.data())?;
                if let Some(found) = template.find_descendant(&Tag::from(tags::CDOL1))? {
                    cdol1 = Some(DataObjectList::parse(found.value())?);
                }
                if let Some(found) = template.find_descendant(&Tag::from(tags::CDOL2))? {
                    cdol2 = Some(DataObjectList::parse(found.value())?);
                }
                records.push(response.data().clone());
            }
        }

        debug!(records = records.len(), "application records read");
        if let Some(app) = self.card.selected_application_mut() {
            app.records = records;
            if cdol1.is_some() {
                app.cdol1 = cdol1;
            }
            if cdol2.is_some() {
                app.cdol2 = cdol2;
            }
            app.all_records_read = true;
        }
        Ok(())
    }

    /// Choose the transaction-completion path from the interchange
    /// profile's CDA flag
    ///
    /// Requires the selected application to be initialized on the ICC
    /// with all its records read.
    pub fn prepare_transaction_processing(&mut self) -> Result<()> {
        let Some(app) = self.card.selected_application() else {
            return Err(Error::protocol("no application selected"));
        };
        if !app.is_initialized_on_icc() || !app.is_all_records_read() {
            return Err(Error::protocol("application processing not complete"));
        }
        let Some(profile) = app.interchange_profile() else {
            return Err(Error::protocol("application processing not complete"));
        };

        let path = if profile.cda_supported() {
            TransactionPath::Cda
        } else {
            TransactionPath::Plain
        };
        debug!(?path, "transaction path armed");
        self.transaction_path = Some(path);
        Ok(())
    }

    /// The completion path armed by
    /// [`prepare_transaction_processing`](Self::prepare_transaction_processing)
    pub const fn transaction_path(&self) -> Option<TransactionPath> {
        self.transaction_path
    }

    /// Execute the transaction-completion exchange
    ///
    /// GENERATE AC requesting an authorization cryptogram over the
    /// zero-filled CDOL1 data, with the CDA signature bit set when the
    /// armed path is CDA. The returned cryptogram template is stored
    /// opaquely on the application; its cryptographic content is outside
    /// this engine's scope.
    pub fn perform_transaction(&mut self) -> Result<()> {
        let Some(path) = self.transaction_path else {
            return Err(Error::protocol("transaction processing not prepared"));
        };
        if self.transaction_complete {
            return Err(Error::protocol("transaction already completed"));
        }

        let cdol_data = self
            .card
            .selected_application()
            .and_then(EmvApplication::cdol1)
            .map(DataObjectList::zero_filled)
            .unwrap_or_else(Bytes::new);

        let command = commands::generate_ac(
            commands::CryptogramType::Arqc,
            path == TransactionPath::Cda,
            cdol_data,
        );
        let response = self.transport.transmit(&command.to_bytes())?;
        let status = response.status();

        if !status.is_success() {
            return Err(Error::protocol_with_status(
                "failed to generate application cryptogram",
                status,
            ));
        }

        if let Some(app) = self.card.selected_application_mut() {
            app.cryptogram = Some(response.data().clone());
        }
        debug!("transaction complete");
        self.transaction_complete = true;
        Ok(())
    }

    /// Verify the cardholder PIN
    ///
    /// A verification outcome (accepted, tries remaining, blocked) is
    /// surfaced to the caller and is not fatal to the session.
    pub fn verify_pin(&mut self, pin: &str) -> Result<PinVerification> {
        let command = commands::verify_pin(pin)?;
        let response = self.transport.transmit(&command.to_bytes())?;
        let status = response.status();

        if status.is_success() {
            return Ok(PinVerification::Verified);
        }
        if let Some(tries) = status.pin_tries_remaining() {
            return Ok(match tries {
                0 => PinVerification::Blocked,
                n => PinVerification::TriesRemaining(n),
            });
        }
        if status.is_authentication_blocked() {
            return Ok(PinVerification::Blocked);
        }
        Err(Error::protocol_with_status("PIN verification failed", status))
    }

    /// Read the PIN try counter data object (9F17)
    pub fn read_pin_try_counter(&mut self) -> Result<u8> {
        let command = commands::get_data(tags::PIN_TRY_COUNTER);
        let response = self.transport.transmit(&command.to_bytes())?;
        let status = response.status();

        if !status.is_success() {
            return Err(Error::protocol_with_status(
                "PIN try counter not available",
                status,
            ));
        }

        let tlv = Tlv::from_bytes(response.data())?;
        match tlv.value().as_ref() {
            [tries] => Ok(*tries),
            _ => Err(Error::MalformedData("PIN try counter must be 1 byte")),
        }
    }

    /// Parse a PSE/PPSE FCI and register the candidate applications it
    /// advertises
    ///
    /// Directories vary widely in practice, so discovery is lenient:
    /// malformed or unexpected templates are logged and skipped, because
    /// selection may also proceed by direct AID.
    fn discover_candidates(&mut self, fci: &Bytes) {
        if fci.is_empty() {
            return;
        }

        let template = match Tlv::from_bytes(fci) {
            Ok(tlv) => tlv,
            Err(error) => {
                warn!(%error, "ignoring malformed environment FCI");
                return;
            }
        };
        if template.tag() != &Tag::from(tags::FCI_TEMPLATE) {
            debug!(tag = %template.tag(), "environment FCI is not an FCI template");
            return;
        }

        match collect_directory_entries(&template) {
            Ok(candidates) => {
                for candidate in candidates {
                    debug!(aid = %candidate.aid(), "discovered candidate application");
                    self.card.add_application(candidate);
                }
            }
            Err(error) => warn!(%error, "ignoring malformed directory entries"),
        }
    }

    /// Decode a SELECT FCI onto the application being selected
    fn apply_select_fci(app: &mut EmvApplication, fci: &Bytes) -> Result<()> {
        let template = Tlv::from_bytes(fci)?;
        if template.tag() != &Tag::from(tags::FCI_TEMPLATE) {
            debug!(tag = %template.tag(), "SELECT response is not an FCI template");
            return Ok(());
        }

        let Some(proprietary) = template.find_child(&Tag::from(tags::FCI_PROPRIETARY))? else {
            return Ok(());
        };

        if let Some(label) = proprietary.find_child(&Tag::from(tags::APPLICATION_LABEL))? {
            app.label = Some(String::from_utf8_lossy(label.value()).into_owned());
        }
        if let Some(priority) = proprietary.find_child(&Tag::from(tags::APPLICATION_PRIORITY))? {
            if let [indicator] = priority.value().as_ref() {
                app.priority = Some(*indicator);
            }
        }
        if let Some(pdol) = proprietary.find_child(&Tag::from(tags::PDOL))? {
            app.pdol = Some(DataObjectList::parse(pdol.value())?);
        }
        Ok(())
    }
}

/// Walk a PSE/PPSE FCI template's directory entries (tag 61, directly in
/// the proprietary template or nested in the issuer discretionary data)
/// into candidate applications
fn collect_directory_entries(template: &Tlv) -> Result<Vec<EmvApplication>> {
    let mut candidates = Vec::new();

    let Some(proprietary) = template.find_child(&Tag::from(tags::FCI_PROPRIETARY))? else {
        return Ok(candidates);
    };

    let mut entry_holders = vec![proprietary.clone()];
    if let Some(discretionary) =
        proprietary.find_child(&Tag::from(tags::FCI_ISSUER_DISCRETIONARY))?
    {
        entry_holders.push(discretionary);
    }

    for holder in entry_holders {
        for child in holder.children() {
            let child = child?;
            if child.tag() != &Tag::from(tags::APPLICATION_TEMPLATE) {
                continue;
            }

            let Some(adf_name) = child.find_child(&Tag::from(tags::ADF_NAME))? else {
                continue;
            };
            let Ok(aid) = Aid::new(adf_name.value().clone()) else {
                warn!("skipping directory entry with out-of-range AID length");
                continue;
            };

            let mut candidate = EmvApplication::new(aid);
            if let Some(label) = child.find_child(&Tag::from(tags::APPLICATION_LABEL))? {
                candidate.label = Some(String::from_utf8_lossy(label.value()).into_owned());
            }
            if let Some(priority) = child.find_child(&Tag::from(tags::APPLICATION_PRIORITY))? {
                if let [indicator] = priority.value().as_ref() {
                    candidate.priority = Some(*indicator);
                }
            }
            candidates.push(candidate);
        }
    }

    Ok(candidates)
}

/// Split a GET PROCESSING OPTIONS reply into the interchange profile and
/// file locator; accepts both response message template formats
fn parse_processing_options(
    data: &Bytes,
) -> Result<(ApplicationInterchangeProfile, ApplicationFileLocator)> {
    let template = Tlv::from_bytes(data)?;

    if template.tag() == &Tag::from(tags::RESPONSE_FORMAT_2) {
        let Some(profile) = template.find_child(&Tag::from(tags::AIP))? else {
            return Err(Error::MalformedData(
                "processing options reply lacks an interchange profile",
            ));
        };
        let profile = ApplicationInterchangeProfile::try_from(profile.value().as_ref())?;

        let locator = match template.find_child(&Tag::from(tags::AFL))? {
            Some(locator) => ApplicationFileLocator::parse(locator.value())?,
            None => ApplicationFileLocator::default(),
        };
        return Ok((profile, locator));
    }

    if template.tag() == &Tag::from(tags::RESPONSE_FORMAT_1) {
        // Format 1: the profile's two bytes followed by the locator
        let value = template.value();
        if value.len() < 2 {
            return Err(Error::MalformedData(
                "format 1 processing options shorter than an interchange profile",
            ));
        }
        let profile = ApplicationInterchangeProfile::try_from(&value[..2])?;
        let locator = ApplicationFileLocator::parse(&value[2..])?;
        return Ok((profile, locator));
    }

    Err(Error::MalformedData(
        "unrecognized processing options template",
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use hex_literal::hex;

    #[test]
    fn test_parse_processing_options_format_2() {
        let data = Bytes::from_static(&hex!("77 0E 82 02 19 78 94 08 08 01 01 00 10 01 01 00"));
        let (profile, locator) = parse_processing_options(&data).unwrap();

        assert_eq!(profile.bytes(), [0x19, 0x78]);
        assert!(profile.cda_supported());
        assert_eq!(locator.entries().len(), 2);
        assert_eq!(locator.entries()[0].sfi(), 1);
        assert_eq!(locator.entries()[1].sfi(), 2);
    }

    #[test]
    fn test_parse_processing_options_format_1() {
        let data = Bytes::from_static(&hex!("80 06 40 00 08 01 01 00"));
        let (profile, locator) = parse_processing_options(&data).unwrap();

        assert!(profile.sda_supported());
        assert!(!profile.cda_supported());
        assert_eq!(locator.entries().len(), 1);
        assert_eq!(locator.entries()[0].sfi(), 1);
    }

    #[test]
    fn test_parse_processing_options_rejects_garbage() {
        let data = Bytes::from_static(&hex!("6F 02 82 00"));
        assert!(parse_processing_options(&data).is_err());

        let data = Bytes::from_static(&hex!("77 02 94 00"));
        assert!(matches!(
            parse_processing_options(&data),
            Err(Error::MalformedData(_))
        ));
    }

    #[test]
    fn test_collect_directory_entries() {
        // PPSE FCI: 6F / A5 / BF0C / 61 { 4F aid, 50 label, 87 priority }
        let fci = hex!(
            "6F 2C 84 0E 32 50 41 59 2E 53 59 53 2E 44 44 46 30 31"
            "A5 1A BF 0C 17 61 15"
            "4F 07 A0 00 00 00 03 10 10"
            "50 07 56 49 53 41 43 52 45"
            "87 01 01"
        );
        let template = Tlv::from_bytes(&fci).unwrap();
        let candidates = collect_directory_entries(&template).unwrap();

        assert_eq!(candidates.len(), 1);
        assert_eq!(
            candidates[0].aid(),
            &Aid::from_hex("A0 00 00 00 03 10 10").unwrap()
        );
        assert_eq!(candidates[0].label(), Some("VISACRE"));
        assert_eq!(candidates[0].priority(), Some(1));
    }
}
