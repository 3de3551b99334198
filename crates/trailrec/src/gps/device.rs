//! Waiting for the GPS receiver to appear.
//!
//! The receiver is often plugged in (or enumerated) after boot, so the
//! logger polls for it before opening the report stream.

use std::time::Duration;

use tracing::{info, warn};

use crate::shutdown::ShutdownToken;

/// Default interval between presence checks.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(30);

/// Something that can tell whether the GPS hardware is attached.
pub trait DeviceProbe: Send + Sync {
    /// Human-readable description of the device being looked for.
    fn describe(&self) -> String;

    /// Check if the device is currently attached.
    fn is_present(&self) -> bool;
}

#[cfg(target_os = "linux")]
impl DeviceProbe for trailrec_linux::UsbDeviceProbe {
    fn describe(&self) -> String {
        self.to_string()
    }

    fn is_present(&self) -> bool {
        trailrec_linux::UsbDeviceProbe::is_present(self)
    }
}

/// How waiting for the device ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceWait {
    /// The device was found.
    Present,
    /// Shutdown was requested while waiting.
    Cancelled,
    /// The attempt bound ran out.
    GaveUp {
        /// Number of checks performed.
        attempts: u32,
    },
}

/// Poll `probe` every `interval` until the device shows up.
///
/// With `max_attempts` set to `None` this waits indefinitely; cancellation of
/// `token` interrupts the wait between checks.
pub async fn wait_for_device(
    probe: &dyn DeviceProbe,
    interval: Duration,
    max_attempts: Option<u32>,
    token: &ShutdownToken,
) -> DeviceWait {
    let mut attempts: u32 = 0;

    loop {
        if token.is_cancelled() {
            return DeviceWait::Cancelled;
        }

        attempts += 1;
        if probe.is_present() {
            info!(device = %probe.describe(), attempts, "GPS device found");
            return DeviceWait::Present;
        }

        if max_attempts.is_some_and(|max| attempts >= max) {
            warn!(device = %probe.describe(), attempts, "Giving up waiting for GPS device");
            return DeviceWait::GaveUp { attempts };
        }

        warn!(
            device = %probe.describe(),
            retry_in_secs = interval.as_secs(),
            "GPS device not found"
        );

        tokio::select! {
            () = token.cancelled() => return DeviceWait::Cancelled,
            () = tokio::time::sleep(interval) => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicU32, Ordering};

    use super::*;

    /// Reports presence from the `appear_on`th check onward.
    #[derive(Debug)]
    struct CountingProbe {
        checks: AtomicU32,
        appear_on: Option<u32>,
    }

    impl CountingProbe {
        fn new(appear_on: Option<u32>) -> Self {
            Self {
                checks: AtomicU32::new(0),
                appear_on,
            }
        }

        fn checks(&self) -> u32 {
            self.checks.load(Ordering::SeqCst)
        }
    }

    impl DeviceProbe for CountingProbe {
        fn describe(&self) -> String {
            "test receiver".to_string()
        }

        fn is_present(&self) -> bool {
            let n = self.checks.fetch_add(1, Ordering::SeqCst) + 1;
            self.appear_on.is_some_and(|on| n >= on)
        }
    }

    const FAST: Duration = Duration::from_millis(1);

    #[tokio::test]
    async fn test_present_immediately() {
        let probe = CountingProbe::new(Some(1));
        let outcome = wait_for_device(&probe, FAST, None, &ShutdownToken::new()).await;

        assert_eq!(outcome, DeviceWait::Present);
        assert_eq!(probe.checks(), 1);
    }

    #[tokio::test]
    async fn test_retries_until_present() {
        let probe = CountingProbe::new(Some(4));
        let outcome = wait_for_device(&probe, FAST, None, &ShutdownToken::new()).await;

        assert_eq!(outcome, DeviceWait::Present);
        assert_eq!(probe.checks(), 4);
    }

    #[tokio::test]
    async fn test_gives_up_after_bound() {
        crate::logging::init_test_logging();
        let probe = CountingProbe::new(None);
        let outcome = wait_for_device(&probe, FAST, Some(3), &ShutdownToken::new()).await;

        assert_eq!(outcome, DeviceWait::GaveUp { attempts: 3 });
        assert_eq!(probe.checks(), 3);
    }

    #[tokio::test]
    async fn test_cancel_before_first_check() {
        let token = ShutdownToken::new();
        token.cancel();

        let probe = CountingProbe::new(Some(1));
        let outcome = wait_for_device(&probe, FAST, None, &token).await;

        assert_eq!(outcome, DeviceWait::Cancelled);
        assert_eq!(probe.checks(), 0);
    }

    #[tokio::test]
    async fn test_cancel_interrupts_long_sleep() {
        let token = ShutdownToken::new();
        let canceller = token.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            canceller.cancel();
        });

        let probe = CountingProbe::new(None);
        let outcome = wait_for_device(&probe, Duration::from_secs(3600), None, &token).await;

        assert_eq!(outcome, DeviceWait::Cancelled);
        assert_eq!(probe.checks(), 1);
    }
}
