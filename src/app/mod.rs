//! Application core: pure domain logic, zero I/O.
//!
//! This module contains the business rules for the multimeter peripheral:
//! mode control, periodic acquisition, response retry and the dispatch
//! loop that ties them together.  All interaction with hardware and the
//! BLE stack happens through **port traits** defined in [`ports`],
//! keeping this layer fully testable without real peripherals.

pub mod event_loop;
pub mod events;
pub mod messages;
pub mod ports;
pub mod service;
