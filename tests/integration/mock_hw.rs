//! Mock adapters for integration tests.
//!
//! Every adapter writes into one shared journal, so tests can assert on
//! the relative order of hardware, profile, transport and sink activity
//! without touching real ADC/GPIO registers or a BLE stack.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;

use multimeter::app::events::AppEvent;
use multimeter::app::messages::{AttResponse, ConnHandle, TxStatus};
use multimeter::app::ports::{
    AdcPort, EventSink, FrontEndPort, ProfilePort, TimerPort, TransportPort, MEASUREMENT_LEN,
    SYSTEM_ID_LEN,
};
use multimeter::error::{AcquisitionError, HardwareError, TransportError};
use multimeter::fsm::mode::{FrontEndLines, Mode};

// ── Journal ───────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    Open,
    Close,
    Cancel,
    Convert,
    Arm(u32),
    Disarm,
    Lines(FrontEndLines),
    SetMode(Mode),
    Publish([u8; MEASUREMENT_LEN]),
    SystemId([u8; SYSTEM_ID_LEN]),
    Transmit(u8),
    RequestNotice(ConnHandle),
    CancelNotice(ConnHandle),
    Event(AppEvent),
}

pub type Journal = Rc<RefCell<Vec<Call>>>;

pub fn journal() -> Journal {
    Rc::new(RefCell::new(Vec::new()))
}

/// Index of the first entry matching `pred`, for ordering assertions.
#[allow(dead_code)]
pub fn position(journal: &Journal, pred: impl Fn(&Call) -> bool) -> Option<usize> {
    journal.borrow().iter().position(pred)
}

#[allow(dead_code)]
pub fn count(journal: &Journal, pred: impl Fn(&Call) -> bool) -> usize {
    journal.borrow().iter().filter(|c| pred(c)).count()
}

// ── MockHardware ──────────────────────────────────────────────

pub struct MockHardware {
    journal: Journal,
    /// Value every calibrated sample reads back as.
    pub microvolts: u32,
    pub fail_open: bool,
    pub fail_convert: bool,
    pub open: bool,
    pub armed: bool,
}

#[allow(dead_code)]
impl MockHardware {
    pub fn new(journal: &Journal) -> Self {
        Self {
            journal: Rc::clone(journal),
            microvolts: 0,
            fail_open: false,
            fail_convert: false,
            open: false,
            armed: false,
        }
    }

    fn log(&self, call: Call) {
        self.journal.borrow_mut().push(call);
    }
}

impl AdcPort for MockHardware {
    fn open(&mut self) -> Result<(), HardwareError> {
        self.log(Call::Open);
        if self.fail_open {
            return Err(HardwareError::AdcOpenFailed);
        }
        self.open = true;
        Ok(())
    }

    fn close(&mut self) {
        self.log(Call::Close);
        self.open = false;
    }

    fn cancel(&mut self) {
        self.log(Call::Cancel);
    }

    fn convert(&mut self, raw: &mut [u16]) -> Result<(), AcquisitionError> {
        self.log(Call::Convert);
        if self.fail_convert {
            return Err(AcquisitionError::ConversionFailed);
        }
        raw.fill((self.microvolts / 1000) as u16);
        Ok(())
    }

    fn to_microvolts(
        &mut self,
        _raw: &[u16],
        microvolts: &mut [u32],
    ) -> Result<(), AcquisitionError> {
        microvolts.fill(self.microvolts);
        Ok(())
    }
}

impl FrontEndPort for MockHardware {
    fn set_front_end(&mut self, lines: FrontEndLines) {
        self.log(Call::Lines(lines));
    }
}

impl TimerPort for MockHardware {
    fn arm(&mut self, period_ms: u32) {
        self.log(Call::Arm(period_ms));
        self.armed = true;
    }

    fn disarm(&mut self) {
        self.log(Call::Disarm);
        self.armed = false;
    }
}

// ── MockProfile ───────────────────────────────────────────────

#[derive(Debug, Default)]
pub struct ProfileValues {
    pub mode: u8,
    pub measurement: [u8; MEASUREMENT_LEN],
    pub system_id: [u8; SYSTEM_ID_LEN],
}

/// Characteristic store.  Clones share the same values, so a test can
/// keep a handle after moving one into the event loop.
#[derive(Clone)]
pub struct MockProfile {
    journal: Journal,
    values: Rc<RefCell<ProfileValues>>,
}

#[allow(dead_code)]
impl MockProfile {
    pub fn new(journal: &Journal) -> Self {
        Self {
            journal: Rc::clone(journal),
            values: Rc::new(RefCell::new(ProfileValues::default())),
        }
    }

    /// Simulate the peer writing the mode characteristic.
    pub fn peer_writes_mode(&self, raw: u8) {
        self.values.borrow_mut().mode = raw;
    }

    pub fn mode(&self) -> u8 {
        self.values.borrow().mode
    }

    pub fn measurement(&self) -> u32 {
        u32::from_be_bytes(self.values.borrow().measurement)
    }

    pub fn system_id(&self) -> [u8; SYSTEM_ID_LEN] {
        self.values.borrow().system_id
    }
}

impl ProfilePort for MockProfile {
    fn mode_raw(&self) -> u8 {
        self.values.borrow().mode
    }

    fn set_mode(&mut self, mode: Mode) {
        self.journal.borrow_mut().push(Call::SetMode(mode));
        self.values.borrow_mut().mode = mode.as_raw();
    }

    fn publish_measurement(&mut self, value: [u8; MEASUREMENT_LEN]) {
        self.journal.borrow_mut().push(Call::Publish(value));
        self.values.borrow_mut().measurement = value;
    }

    fn set_system_id(&mut self, id: [u8; SYSTEM_ID_LEN]) {
        self.journal.borrow_mut().push(Call::SystemId(id));
        self.values.borrow_mut().system_id = id;
    }
}

// ── MockTransport ─────────────────────────────────────────────

/// Answers transmits from a script; once it runs dry every transmit is
/// accepted.
pub struct MockTransport {
    journal: Journal,
    pub script: VecDeque<TxStatus>,
    pub refuse_notice: bool,
}

#[allow(dead_code)]
impl MockTransport {
    pub fn new(journal: &Journal) -> Self {
        Self {
            journal: Rc::clone(journal),
            script: VecDeque::new(),
            refuse_notice: false,
        }
    }

    pub fn scripted(journal: &Journal, script: impl IntoIterator<Item = TxStatus>) -> Self {
        let mut transport = Self::new(journal);
        transport.script.extend(script);
        transport
    }
}

impl TransportPort for MockTransport {
    fn transmit(&mut self, response: &AttResponse) -> TxStatus {
        self.journal.borrow_mut().push(Call::Transmit(response.opcode));
        self.script.pop_front().unwrap_or(TxStatus::Accepted)
    }

    fn request_window_notice(&mut self, conn: ConnHandle) -> Result<(), TransportError> {
        self.journal.borrow_mut().push(Call::RequestNotice(conn));
        if self.refuse_notice {
            return Err(TransportError::NoticeRejected);
        }
        Ok(())
    }

    fn cancel_window_notice(&mut self, conn: ConnHandle) {
        self.journal.borrow_mut().push(Call::CancelNotice(conn));
    }
}

// ── RecordingSink ─────────────────────────────────────────────

pub struct RecordingSink {
    journal: Journal,
    pub events: Vec<AppEvent>,
}

#[allow(dead_code)]
impl RecordingSink {
    pub fn new(journal: &Journal) -> Self {
        Self {
            journal: Rc::clone(journal),
            events: Vec::new(),
        }
    }

    pub fn contains(&self, event: &AppEvent) -> bool {
        self.events.contains(event)
    }

    pub fn measurements(&self) -> Vec<u32> {
        self.events
            .iter()
            .filter_map(|e| match e {
                AppEvent::Measurement { value, .. } => Some(*value),
                _ => None,
            })
            .collect()
    }
}

impl EventSink for RecordingSink {
    fn emit(&mut self, event: &AppEvent) {
        self.journal.borrow_mut().push(Call::Event(*event));
        self.events.push(*event);
    }
}

// ── Fixtures ──────────────────────────────────────────────────

#[allow(dead_code)]
pub fn response(conn: ConnHandle, opcode: u8) -> AttResponse {
    let mut payload = heapless::Vec::new();
    payload
        .extend_from_slice(&[0x01, 0x02, 0x03, 0x04])
        .unwrap();
    AttResponse {
        conn,
        opcode,
        payload,
    }
}
