//! Adapters: concrete implementations of the hexagonal port traits.
//!
//! | Adapter       | Implements                          | Connects to                 |
//! |---------------|-------------------------------------|-----------------------------|
//! | `hardware`    | AdcPort, FrontEndPort, TimerPort    | ESP32 ADC1, GPIO, esp_timer |
//! | `profile`     | ProfilePort                         | GATT characteristic store   |
//! | `transport`   | TransportPort                       | Controller link / HCI bufs  |
//! | `log_sink`    | EventSink                           | Serial log output           |
//! | `advertising` | (payload builders)                  | GAP advertising data        |

pub mod advertising;
pub mod hardware;
pub mod log_sink;
pub mod profile;
pub mod transport;
