//! One-shot sample timer.
//!
//! Expiry raises [`EventFlag::PeriodicSample`] on the mailbox.  The
//! pipeline re-arms it every cycle, so sampling runs at a fixed period
//! only while acquisition is running.
//!
//! On ESP-IDF the timer is an `esp_timer` dispatched from the timer task
//! (not an ISR), so the callback can touch the mailbox atomics directly.
//! On simulation targets a worker thread waits on a condvar deadline.

use crate::error::HardwareError;
use crate::events::{EventFlag, Mailbox};

#[cfg(target_os = "espidf")]
use esp_idf_svc::sys::*;

// ── ESP-IDF ───────────────────────────────────────────────────

#[cfg(target_os = "espidf")]
pub struct SampleTimer {
    handle: esp_timer_handle_t,
}

#[cfg(target_os = "espidf")]
unsafe extern "C" fn sample_due_cb(arg: *mut core::ffi::c_void) {
    // SAFETY: `arg` is the `&'static Mailbox` handed to `esp_timer_create`.
    let mailbox = unsafe { &*(arg as *const Mailbox) };
    mailbox.raise(EventFlag::PeriodicSample);
}

#[cfg(target_os = "espidf")]
impl SampleTimer {
    pub fn new(mailbox: &'static Mailbox) -> Result<Self, HardwareError> {
        let args = esp_timer_create_args_t {
            callback: Some(sample_due_cb),
            arg: mailbox as *const Mailbox as *mut core::ffi::c_void,
            dispatch_method: esp_timer_dispatch_t_ESP_TIMER_TASK,
            name: c"sample".as_ptr(),
            skip_unhandled_events: true,
        };
        let mut handle: esp_timer_handle_t = core::ptr::null_mut();
        // SAFETY: `args` outlives the call; the mailbox is 'static.
        let ret = unsafe { esp_timer_create(&args, &mut handle) };
        if ret != ESP_OK as i32 {
            log::error!("hw_timer: sample timer create failed (rc={})", ret);
            return Err(HardwareError::TimerUnavailable);
        }
        Ok(Self { handle })
    }

    pub fn arm(&mut self, period_ms: u32) {
        // SAFETY: `handle` was created in `new` and is deleted only on drop.
        unsafe {
            // Stopping an idle timer reports INVALID_STATE; that is fine.
            esp_timer_stop(self.handle);
            let ret = esp_timer_start_once(self.handle, u64::from(period_ms) * 1000);
            if ret != ESP_OK as i32 {
                log::error!("hw_timer: start failed (rc={})", ret);
            }
        }
    }

    pub fn disarm(&mut self) {
        unsafe {
            esp_timer_stop(self.handle);
        }
    }
}

#[cfg(target_os = "espidf")]
impl Drop for SampleTimer {
    fn drop(&mut self) {
        unsafe {
            esp_timer_stop(self.handle);
            esp_timer_delete(self.handle);
        }
    }
}

// ── Host simulation ───────────────────────────────────────────

#[cfg(not(target_os = "espidf"))]
use std::sync::{Arc, Condvar, Mutex, PoisonError};
#[cfg(not(target_os = "espidf"))]
use std::time::{Duration, Instant};

#[cfg(not(target_os = "espidf"))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Deadline {
    Disarmed,
    At(Instant),
    Shutdown,
}

#[cfg(not(target_os = "espidf"))]
struct TimerShared {
    deadline: Mutex<Deadline>,
    changed: Condvar,
}

#[cfg(not(target_os = "espidf"))]
impl TimerShared {
    fn set(&self, deadline: Deadline) {
        *self.deadline.lock().unwrap_or_else(PoisonError::into_inner) = deadline;
        self.changed.notify_one();
    }
}

#[cfg(not(target_os = "espidf"))]
pub struct SampleTimer {
    shared: Arc<TimerShared>,
    worker: Option<std::thread::JoinHandle<()>>,
}

#[cfg(not(target_os = "espidf"))]
impl SampleTimer {
    pub fn new(mailbox: &'static Mailbox) -> Result<Self, HardwareError> {
        let shared = Arc::new(TimerShared {
            deadline: Mutex::new(Deadline::Disarmed),
            changed: Condvar::new(),
        });
        let worker_shared = Arc::clone(&shared);
        let worker = std::thread::Builder::new()
            .name("sample-timer".into())
            .spawn(move || timer_worker(&worker_shared, mailbox))
            .map_err(|_| HardwareError::TimerUnavailable)?;
        log::info!("hw_timer(sim): sample timer ready");
        Ok(Self {
            shared,
            worker: Some(worker),
        })
    }

    pub fn arm(&mut self, period_ms: u32) {
        let due = Instant::now() + Duration::from_millis(u64::from(period_ms));
        self.shared.set(Deadline::At(due));
    }

    pub fn disarm(&mut self) {
        self.shared.set(Deadline::Disarmed);
    }
}

#[cfg(not(target_os = "espidf"))]
fn timer_worker(shared: &TimerShared, mailbox: &Mailbox) {
    let mut guard = shared.deadline.lock().unwrap_or_else(PoisonError::into_inner);
    loop {
        match *guard {
            Deadline::Shutdown => return,
            Deadline::Disarmed => {
                guard = shared
                    .changed
                    .wait(guard)
                    .unwrap_or_else(PoisonError::into_inner);
            }
            Deadline::At(due) => {
                let now = Instant::now();
                if now >= due {
                    *guard = Deadline::Disarmed;
                    mailbox.raise(EventFlag::PeriodicSample);
                } else {
                    guard = shared
                        .changed
                        .wait_timeout(guard, due - now)
                        .unwrap_or_else(PoisonError::into_inner)
                        .0;
                }
            }
        }
    }
}

#[cfg(not(target_os = "espidf"))]
impl Drop for SampleTimer {
    fn drop(&mut self) {
        self.shared.set(Deadline::Shutdown);
        if let Some(worker) = self.worker.take() {
            let _ = worker.join();
        }
    }
}
