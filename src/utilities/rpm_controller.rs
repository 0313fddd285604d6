//! Requests-per-minute budget shared by every backend call in a run.
//!
//! The controller keeps the issue times of calls made in the last minute.
//! A call that would exceed `max_rpm` waits until the oldest one leaves the
//! window. Waiters queue on a fair mutex, so they are served in arrival
//! order and nobody is dropped or overtaken. Dropping a waiting `acquire`
//! future releases its place without consuming budget.

use std::collections::VecDeque;
use std::time::Duration;

use tokio::sync::Mutex;
use tokio::time::Instant;

/// Length of the rate window.
pub const RPM_WINDOW: Duration = Duration::from_secs(60);

/// Sliding-window rate limiter.
#[derive(Debug)]
pub struct RPMController {
    max_rpm: Option<u32>,
    issued: Mutex<VecDeque<Instant>>,
}

impl Default for RPMController {
    fn default() -> Self {
        Self::new(None)
    }
}

impl RPMController {
    /// Create a limiter. `None` or zero means unlimited.
    pub fn new(max_rpm: Option<u32>) -> Self {
        Self {
            max_rpm: max_rpm.filter(|&n| n > 0),
            issued: Mutex::new(VecDeque::new()),
        }
    }

    pub fn max_rpm(&self) -> Option<u32> {
        self.max_rpm
    }

    /// Take one unit of budget, waiting for the window to move if needed.
    pub async fn acquire(&self) {
        let Some(max) = self.max_rpm else {
            return;
        };
        let max = max as usize;

        let mut issued = self.issued.lock().await;
        loop {
            let now = Instant::now();
            Self::prune(&mut issued, now);
            if issued.len() < max {
                issued.push_back(now);
                return;
            }
            let Some(&oldest) = issued.front() else {
                continue;
            };
            log::info!("Max RPM reached, waiting for next minute to start.");
            tokio::time::sleep_until(oldest + RPM_WINDOW).await;
        }
    }

    /// Calls issued within the current window.
    pub async fn current_rpm(&self) -> usize {
        let mut issued = self.issued.lock().await;
        Self::prune(&mut issued, Instant::now());
        issued.len()
    }

    fn prune(issued: &mut VecDeque<Instant>, now: Instant) {
        while let Some(&front) = issued.front() {
            if now.duration_since(front) >= RPM_WINDOW {
                issued.pop_front();
            } else {
                break;
            }
        }
    }
}
