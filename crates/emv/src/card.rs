//! Card-side aggregates: the smart card and its EMV applications
//!
//! A [`SmartCard`] owns its ATR, the candidate applications found during
//! discovery, and at most one selected application. During an active
//! session only the session mutates these aggregates; any external read
//! of the selection is a snapshot.

use bytes::Bytes;
use chipflow_iso7816::{Aid, Atr};

use crate::dol::DataObjectList;
use crate::types::{ApplicationFileLocator, ApplicationInterchangeProfile};

/// One EMV application on a card
///
/// Created during candidate discovery (PSE/PPSE directory entries or
/// direct AID selection) and mutated by the session as the processing
/// steps complete; never destroyed mid-session.
#[derive(Debug, Clone)]
pub struct EmvApplication {
    pub(crate) aid: Aid,
    pub(crate) label: Option<String>,
    pub(crate) priority: Option<u8>,
    pub(crate) pdol: Option<DataObjectList>,
    pub(crate) interchange_profile: Option<ApplicationInterchangeProfile>,
    pub(crate) file_locator: Option<ApplicationFileLocator>,
    pub(crate) records: Vec<Bytes>,
    pub(crate) cdol1: Option<DataObjectList>,
    pub(crate) cdol2: Option<DataObjectList>,
    pub(crate) cryptogram: Option<Bytes>,
    pub(crate) initialized_on_icc: bool,
    pub(crate) all_records_read: bool,
}

impl EmvApplication {
    /// Create a candidate application for the given AID
    pub fn new(aid: Aid) -> Self {
        Self {
            aid,
            label: None,
            priority: None,
            pdol: None,
            interchange_profile: None,
            file_locator: None,
            records: Vec::new(),
            cdol1: None,
            cdol2: None,
            cryptogram: None,
            initialized_on_icc: false,
            all_records_read: false,
        }
    }

    /// The application identifier
    pub const fn aid(&self) -> &Aid {
        &self.aid
    }

    /// The application label from the FCI, when present
    pub fn label(&self) -> Option<&str> {
        self.label.as_deref()
    }

    /// The application priority indicator from the directory entry or FCI
    pub const fn priority(&self) -> Option<u8> {
        self.priority
    }

    /// The processing options data object list captured during selection
    pub const fn pdol(&self) -> Option<&DataObjectList> {
        self.pdol.as_ref()
    }

    /// The interchange profile decoded from GET PROCESSING OPTIONS
    pub const fn interchange_profile(&self) -> Option<&ApplicationInterchangeProfile> {
        self.interchange_profile.as_ref()
    }

    /// The file locator decoded from GET PROCESSING OPTIONS
    pub const fn file_locator(&self) -> Option<&ApplicationFileLocator> {
        self.file_locator.as_ref()
    }

    /// The raw record data read per the file locator
    pub fn records(&self) -> &[Bytes] {
        &self.records
    }

    /// Card risk management DOL 1, captured from the records
    pub const fn cdol1(&self) -> Option<&DataObjectList> {
        self.cdol1.as_ref()
    }

    /// Card risk management DOL 2, captured from the records
    pub const fn cdol2(&self) -> Option<&DataObjectList> {
        self.cdol2.as_ref()
    }

    /// The opaque cryptogram template returned by GENERATE AC
    pub const fn cryptogram(&self) -> Option<&Bytes> {
        self.cryptogram.as_ref()
    }

    /// Whether GET PROCESSING OPTIONS has completed for this application
    pub const fn is_initialized_on_icc(&self) -> bool {
        self.initialized_on_icc
    }

    /// Whether every record declared by the file locator has been read
    pub const fn is_all_records_read(&self) -> bool {
        self.all_records_read
    }
}

/// A smart card: its ATR, the discovered candidate applications and at
/// most one selected application
#[derive(Debug, Clone)]
pub struct SmartCard {
    atr: Atr,
    applications: Vec<EmvApplication>,
    selected: Option<EmvApplication>,
}

impl SmartCard {
    /// Create a card from its Answer To Reset
    pub const fn new(atr: Atr) -> Self {
        Self {
            atr,
            applications: Vec::new(),
            selected: None,
        }
    }

    /// The card's Answer To Reset
    pub const fn atr(&self) -> &Atr {
        &self.atr
    }

    /// The candidate applications discovered so far
    pub fn applications(&self) -> &[EmvApplication] {
        &self.applications
    }

    /// Register a candidate application; an AID already present is left
    /// untouched
    pub fn add_application(&mut self, application: EmvApplication) {
        if self
            .applications
            .iter()
            .any(|existing| existing.aid() == application.aid())
        {
            return;
        }
        self.applications.push(application);
    }

    /// The currently selected application, if any
    pub const fn selected_application(&self) -> Option<&EmvApplication> {
        self.selected.as_ref()
    }

    pub(crate) fn selected_application_mut(&mut self) -> Option<&mut EmvApplication> {
        self.selected.as_mut()
    }

    /// Overwrite the selection; a card holds at most one selected
    /// application at a time
    pub(crate) fn set_selected_application(&mut self, application: EmvApplication) {
        self.selected = Some(application);
    }
}
