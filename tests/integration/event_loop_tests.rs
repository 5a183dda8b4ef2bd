//! End-to-end dispatch tests: mailbox → event loop → core → mock adapters.
//!
//! Each test posts what a stack or timer callback would post, wakes the
//! loop once with `run_once`, and checks the journal.

use multimeter::app::event_loop::EventLoop;
use multimeter::app::events::AppEvent;
use multimeter::app::messages::{
    AppMessage, BdAddr, GapRoleState, GattEvent, ParamId, StackMessage, TxStatus,
};
use multimeter::config::MeterConfig;
use multimeter::error::{Error, HardwareError};
use multimeter::events::{EventFlag, Mailbox};
use multimeter::fsm::mode::{FrontEndLines, Mode};
use multimeter::retry::ReleaseOutcome;

use crate::mock_hw::{
    count, journal, position, response, Call, Journal, MockHardware, MockProfile, MockTransport,
    RecordingSink,
};

type Loop<'m> = EventLoop<'m, MockHardware, MockProfile, MockTransport, RecordingSink>;

const PEER: BdAddr = BdAddr([0x10, 0x20, 0x30, 0x40, 0x50, 0x60]);

struct Rig<'m> {
    mailbox: &'m Mailbox,
    el: Loop<'m>,
    profile: MockProfile,
    journal: Journal,
}

impl<'m> Rig<'m> {
    fn new(mailbox: &'m Mailbox) -> Self {
        Self::with_transport(mailbox, MockTransport::new)
    }

    fn with_transport(
        mailbox: &'m Mailbox,
        transport: impl FnOnce(&Journal) -> MockTransport,
    ) -> Self {
        let journal = journal();
        let profile = MockProfile::new(&journal);
        let mut el = EventLoop::new(
            mailbox,
            &MeterConfig::default(),
            MockHardware::new(&journal),
            profile.clone(),
            transport(&journal),
            RecordingSink::new(&journal),
        );
        el.start();
        Self {
            mailbox,
            el,
            profile,
            journal,
        }
    }

    fn write_mode(&mut self, raw: u8) {
        self.profile.peer_writes_mode(raw);
        self.mailbox
            .post_app(AppMessage::CharacteristicChanged(ParamId::Mode))
            .unwrap();
    }

    fn role(&mut self, state: GapRoleState) {
        self.mailbox.post_app(AppMessage::StateChange(state)).unwrap();
    }

    fn wake(&mut self) {
        assert!(self.el.run_once().unwrap(), "expected a pending permit");
    }

    fn events(&self) -> &[AppEvent] {
        &self.el.sink().events
    }
}

// ── Boot ──────────────────────────────────────────────────────

#[test]
fn start_publishes_power_on_state() {
    let mailbox = Mailbox::new();
    let rig = Rig::new(&mailbox);

    assert_eq!(
        *rig.journal.borrow(),
        vec![
            Call::SetMode(Mode::Off),
            Call::Publish([0; 4]),
            Call::Lines(FrontEndLines::LOW),
            Call::Event(AppEvent::Started),
        ]
    );
    assert_eq!(rig.el.core().mode(), Mode::Off);
}

#[test]
fn no_permit_means_no_dispatch() {
    let mailbox = Mailbox::new();
    let mut rig = Rig::new(&mailbox);
    assert!(!rig.el.run_once().unwrap());
}

// ── Ordering within one wakeup ────────────────────────────────

#[test]
fn mode_change_applies_before_sample_in_same_wakeup() {
    let mailbox = Mailbox::new();
    let mut rig = Rig::new(&mailbox);
    rig.el.hardware_mut().microvolts = 1_500_000;

    rig.write_mode(Mode::Volts3.as_raw());
    mailbox.raise(EventFlag::PeriodicSample);
    rig.wake();

    let open = position(&rig.journal, |c| *c == Call::Open).unwrap();
    let convert = position(&rig.journal, |c| *c == Call::Convert).unwrap();
    assert!(open < convert);
    assert!(rig.events().contains(&AppEvent::AcquisitionStarted(Mode::Volts3)));
    assert!(rig.events().contains(&AppEvent::Measurement {
        value: 1_500_000,
        mode: Mode::Volts3
    }));
    assert_eq!(rig.profile.measurement(), 1_500_000);
}

#[test]
fn ten_volt_range_sample_is_scaled_through_the_divider() {
    let mailbox = Mailbox::new();
    let mut rig = Rig::new(&mailbox);
    rig.el.hardware_mut().microvolts = 300_000;

    rig.write_mode(Mode::Volts10.as_raw());
    mailbox.raise(EventFlag::PeriodicSample);
    rig.wake();

    let value = rig
        .events()
        .iter()
        .find_map(|e| match e {
            AppEvent::Measurement {
                value,
                mode: Mode::Volts10,
            } => Some(*value),
            _ => None,
        })
        .unwrap();
    assert!(value.abs_diff(1_000_000) <= 1, "got {value}");
    assert_eq!(rig.profile.measurement(), value);
}

#[test]
fn current_range_sample_at_the_shunt_offset_reads_zero() {
    let mailbox = Mailbox::new();
    let mut rig = Rig::new(&mailbox);
    rig.el.hardware_mut().microvolts = 8_220;

    rig.write_mode(Mode::MilliAmps500.as_raw());
    mailbox.raise(EventFlag::PeriodicSample);
    rig.wake();

    assert!(rig.events().contains(&AppEvent::Measurement {
        value: 0,
        mode: Mode::MilliAmps500
    }));
    assert_eq!(rig.profile.measurement(), 0);
}

#[test]
fn tick_while_idle_is_dropped_without_rearming() {
    let mailbox = Mailbox::new();
    let mut rig = Rig::new(&mailbox);
    rig.journal.borrow_mut().clear();

    mailbox.raise(EventFlag::PeriodicSample);
    rig.wake();

    assert_eq!(count(&rig.journal, |c| matches!(c, Call::Arm(_))), 0);
    assert_eq!(count(&rig.journal, |c| *c == Call::Convert), 0);
    assert!(rig.el.sink().measurements().is_empty());
}

#[test]
fn running_tick_rearms_then_samples() {
    let mailbox = Mailbox::new();
    let mut rig = Rig::new(&mailbox);
    rig.write_mode(Mode::Volts3.as_raw());
    rig.wake();
    rig.journal.borrow_mut().clear();

    mailbox.raise(EventFlag::PeriodicSample);
    rig.wake();

    let journal = rig.journal.borrow();
    assert_eq!(journal[0], Call::Arm(1000));
    assert_eq!(journal[1], Call::Convert);
}

#[test]
fn one_stack_message_per_wakeup() {
    let mailbox = Mailbox::new();
    let mut rig = Rig::new(&mailbox);
    mailbox
        .post_stack(StackMessage::Gatt(GattEvent::MtuUpdated { mtu: 23 }))
        .unwrap();
    mailbox
        .post_stack(StackMessage::Gatt(GattEvent::MtuUpdated { mtu: 247 }))
        .unwrap();

    rig.wake();
    assert!(rig.events().contains(&AppEvent::MtuUpdated { mtu: 23 }));
    assert!(!rig.events().contains(&AppEvent::MtuUpdated { mtu: 247 }));

    rig.wake();
    assert!(rig.events().contains(&AppEvent::MtuUpdated { mtu: 247 }));
}

#[test]
fn app_queue_drains_completely_in_one_wakeup() {
    let mailbox = Mailbox::new();
    let mut rig = Rig::new(&mailbox);
    rig.role(GapRoleState::Advertising);
    rig.role(GapRoleState::Connected { peer: PEER });
    rig.write_mode(Mode::Volts10.as_raw());

    rig.wake();

    assert!(rig.events().contains(&AppEvent::Advertising));
    assert!(rig.events().contains(&AppEvent::Connected { peer: PEER }));
    assert!(rig.events().contains(&AppEvent::AcquisitionStarted(Mode::Volts10)));
    assert_eq!(rig.el.core().peer(), Some(PEER));
}

// ── Fatal errors ──────────────────────────────────────────────

#[test]
fn front_end_open_failure_stops_the_loop() {
    let mailbox = Mailbox::new();
    let mut rig = Rig::new(&mailbox);
    rig.el.hardware_mut().fail_open = true;

    rig.write_mode(Mode::Volts10.as_raw());
    let result = rig.el.run_once();

    assert_eq!(result, Err(Error::Hardware(HardwareError::AdcOpenFailed)));
    assert!(result.unwrap_err().is_fatal());
    assert!(!rig.el.core().pipeline().is_running());
    assert_eq!(count(&rig.journal, |c| matches!(c, Call::Arm(_))), 0);
}

#[test]
fn conversion_failure_keeps_previous_value() {
    let mailbox = Mailbox::new();
    let mut rig = Rig::new(&mailbox);
    rig.el.hardware_mut().microvolts = 2_000_000;
    rig.write_mode(Mode::Volts3.as_raw());
    mailbox.raise(EventFlag::PeriodicSample);
    rig.wake();
    assert_eq!(rig.profile.measurement(), 2_000_000);

    rig.el.hardware_mut().fail_convert = true;
    mailbox.raise(EventFlag::PeriodicSample);
    rig.wake();

    assert_eq!(rig.profile.measurement(), 2_000_000);
    assert!(rig.events().iter().any(|e| matches!(e, AppEvent::CycleFailed(_))));
    assert!(rig.el.hardware().armed, "a failed cycle must not stop sampling");
}

// ── Mode sequences ────────────────────────────────────────────

#[test]
fn switching_between_active_modes_opens_once() {
    let mailbox = Mailbox::new();
    let mut rig = Rig::new(&mailbox);

    rig.write_mode(Mode::Volts3.as_raw());
    rig.wake();
    rig.write_mode(Mode::Volts10.as_raw());
    rig.wake();

    assert_eq!(count(&rig.journal, |c| *c == Call::Open), 1);
    assert_eq!(
        count(&rig.journal, |c| matches!(c, Call::Event(AppEvent::AcquisitionStarted(_)))),
        1
    );
    assert_eq!(
        rig.journal.borrow().last(),
        Some(&Call::Lines(FrontEndLines {
            line_a: false,
            line_b: true
        }))
    );
    assert_eq!(rig.el.core().mode(), Mode::Volts10);
}

#[test]
fn off_between_active_modes_restarts_and_zeroes() {
    let mailbox = Mailbox::new();
    let mut rig = Rig::new(&mailbox);
    rig.el.hardware_mut().microvolts = 1_000_000;

    rig.write_mode(Mode::Volts3.as_raw());
    mailbox.raise(EventFlag::PeriodicSample);
    rig.wake();
    assert_eq!(rig.profile.measurement(), 1_000_000);

    rig.write_mode(Mode::Off.as_raw());
    rig.wake();
    assert_eq!(rig.profile.measurement(), 0);
    assert!(rig.events().contains(&AppEvent::AcquisitionStopped));

    rig.write_mode(Mode::Volts3.as_raw());
    rig.wake();

    assert_eq!(count(&rig.journal, |c| *c == Call::Open), 2);
    assert_eq!(count(&rig.journal, |c| *c == Call::Close), 1);
    assert!(rig.el.core().pipeline().is_running());
}

#[test]
fn unknown_mode_byte_behaves_like_off() {
    let mailbox = Mailbox::new();
    let mut rig = Rig::new(&mailbox);
    rig.write_mode(Mode::MilliAmps500.as_raw());
    rig.wake();

    rig.write_mode(0x7F);
    rig.wake();

    assert!(rig.events().contains(&AppEvent::ModeSelected { raw: 0x7F }));
    assert!(rig.events().contains(&AppEvent::AcquisitionStopped));
    assert!(!rig.el.core().pipeline().is_running());
    assert_eq!(rig.el.core().mode(), Mode::Off);
}

// ── Link loss ─────────────────────────────────────────────────

#[test]
fn link_lost_stops_then_zeroes_then_releases_pending_response() {
    let mailbox = Mailbox::new();
    let mut rig = Rig::new(&mailbox);
    rig.role(GapRoleState::Connected { peer: PEER });
    rig.write_mode(Mode::Volts3.as_raw());
    rig.wake();
    mailbox
        .post_stack(StackMessage::Gatt(GattEvent::ResponsePending(response(0, 0x0B))))
        .unwrap();
    rig.wake();
    assert!(rig.el.core().retry().is_pending());
    rig.journal.borrow_mut().clear();

    rig.role(GapRoleState::Waiting);
    rig.wake();

    let at = |want: Call| position(&rig.journal, |c| *c == want).unwrap();
    let disarm = at(Call::Disarm);
    let close = at(Call::Close);
    let zero = at(Call::Publish([0; 4]));
    let low = at(Call::Lines(FrontEndLines::LOW));
    let off = at(Call::SetMode(Mode::Off));
    let released = at(Call::Event(AppEvent::ResponseReleased {
        outcome: ReleaseOutcome::LinkLost,
        retries: 0,
    }));
    let disconnected = at(Call::Event(AppEvent::Disconnected));

    assert!(disarm < close);
    assert!(close < zero);
    assert!(zero < low);
    assert!(low < off);
    assert!(off < released);
    assert!(released < disconnected);
    assert!(!rig.el.core().retry().is_pending());
    assert_eq!(rig.el.core().peer(), None);
    assert_eq!(rig.profile.mode(), Mode::Off.as_raw());
}

#[test]
fn supervision_timeout_counts_as_link_lost() {
    let mailbox = Mailbox::new();
    let mut rig = Rig::new(&mailbox);
    rig.write_mode(Mode::Volts10.as_raw());
    rig.wake();

    rig.role(GapRoleState::WaitingAfterTimeout);
    rig.wake();

    assert!(rig.events().contains(&AppEvent::TimedOut));
    assert!(!rig.el.core().pipeline().is_running());
    assert_eq!(rig.el.core().mode(), Mode::Off);
}

#[test]
fn only_waiting_states_tear_down_acquisition() {
    for state in [GapRoleState::Advertising, GapRoleState::AdvertisingNonConnectable] {
        let mailbox = Mailbox::new();
        let mut rig = Rig::new(&mailbox);
        rig.role(GapRoleState::Connected { peer: PEER });
        rig.write_mode(Mode::Volts3.as_raw());
        rig.wake();

        rig.role(state);
        rig.wake();

        assert!(rig.el.core().pipeline().is_running(), "{state:?}");
        assert_eq!(rig.el.core().peer(), Some(PEER), "{state:?}");
    }

    for state in [GapRoleState::Waiting, GapRoleState::WaitingAfterTimeout] {
        let mailbox = Mailbox::new();
        let mut rig = Rig::new(&mailbox);
        rig.role(GapRoleState::Connected { peer: PEER });
        rig.write_mode(Mode::Volts3.as_raw());
        rig.wake();

        rig.role(state);
        rig.wake();

        assert!(!rig.el.core().pipeline().is_running(), "{state:?}");
        assert_eq!(rig.el.core().peer(), None, "{state:?}");
        assert!(rig.events().contains(&AppEvent::AcquisitionStopped), "{state:?}");
    }
}

#[test]
fn link_lost_while_idle_still_rewrites_mode() {
    let mailbox = Mailbox::new();
    let mut rig = Rig::new(&mailbox);
    rig.profile.peer_writes_mode(0x42);
    rig.journal.borrow_mut().clear();

    rig.role(GapRoleState::Waiting);
    rig.wake();

    assert_eq!(count(&rig.journal, |c| *c == Call::Close), 0);
    assert_eq!(rig.profile.mode(), Mode::Off.as_raw());
    assert!(!rig.events().contains(&AppEvent::AcquisitionStopped));
}

// ── Response retry through the loop ───────────────────────────

#[test]
fn held_response_is_retried_on_window_end() {
    let mailbox = Mailbox::new();
    let mut rig = Rig::with_transport(&mailbox, |j| {
        MockTransport::scripted(j, [TxStatus::Backpressured, TxStatus::Accepted])
    });
    mailbox
        .post_stack(StackMessage::Gatt(GattEvent::ResponsePending(response(0, 0x0B))))
        .unwrap();
    rig.wake();
    assert_eq!(count(&rig.journal, |c| *c == Call::RequestNotice(0)), 1);

    mailbox.raise(EventFlag::ConnectionEventEnd);
    rig.wake();
    assert!(rig.events().contains(&AppEvent::ResponseRetry { retries: 1 }));

    mailbox.post_stack(StackMessage::ConnectionEventEnd).unwrap();
    rig.wake();
    assert!(rig.events().contains(&AppEvent::ResponseReleased {
        outcome: ReleaseOutcome::Sent,
        retries: 2
    }));
    assert_eq!(count(&rig.journal, |c| *c == Call::CancelNotice(0)), 1);
    assert!(!rig.el.core().retry().is_pending());
}

#[test]
fn refused_notice_drops_the_response() {
    let mailbox = Mailbox::new();
    let mut rig = Rig::with_transport(&mailbox, |j| {
        let mut t = MockTransport::new(j);
        t.refuse_notice = true;
        t
    });
    mailbox
        .post_stack(StackMessage::Gatt(GattEvent::ResponsePending(response(0, 0x0B))))
        .unwrap();
    rig.wake();

    assert!(rig.events().contains(&AppEvent::NoticeRejected));
    assert!(!rig.el.core().retry().is_pending());
}

// ── GAP role ──────────────────────────────────────────────────

#[test]
fn started_role_sets_system_id() {
    let mailbox = Mailbox::new();
    let mut rig = Rig::new(&mailbox);
    rig.role(GapRoleState::Started {
        address: BdAddr([0xA1, 0xA2, 0xA3, 0xA4, 0xA5, 0xA6]),
    });
    rig.wake();

    assert_eq!(
        rig.profile.system_id(),
        [0xA1, 0xA2, 0xA3, 0x00, 0x00, 0xA4, 0xA5, 0xA6]
    );
}

#[test]
fn flow_control_violation_is_reported() {
    let mailbox = Mailbox::new();
    let mut rig = Rig::new(&mailbox);
    mailbox
        .post_stack(StackMessage::Gatt(GattEvent::FlowControlViolated { opcode: 0x0A }))
        .unwrap();
    rig.wake();
    assert!(rig.events().contains(&AppEvent::FlowControlViolated { opcode: 0x0A }));
}
