//! Linux-specific helpers for trailrec.
//!
//! Detects attached USB devices through sysfs so the GPS logger can wait for
//! its receiver before connecting to gpsd.

#![cfg(target_os = "linux")]
#![warn(missing_debug_implementations)]
#![deny(unsafe_code)]

use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use tracing::{trace, warn};

/// Where the kernel lists USB devices.
pub const SYSFS_USB_DEVICES: &str = "/sys/bus/usb/devices";

/// A USB device as seen in sysfs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UsbDevice {
    /// Directory name under the sysfs root (e.g. `1-1.3`).
    pub sysfs_name: String,
    /// Vendor id, lowercase hex.
    pub vendor_id: String,
    /// Product id, lowercase hex.
    pub product_id: String,
}

/// List the USB devices below `root`.
///
/// Entries without vendor/product ids (interfaces, hubs' ports) are skipped.
///
/// # Errors
///
/// Returns an error if `root` cannot be read.
pub fn list_devices(root: &Path) -> io::Result<Vec<UsbDevice>> {
    let mut devices = Vec::new();

    for entry in fs::read_dir(root)? {
        let entry = entry?;
        let dir = entry.path();
        let (Some(vendor_id), Some(product_id)) =
            (read_id(&dir, "idVendor"), read_id(&dir, "idProduct"))
        else {
            continue;
        };

        devices.push(UsbDevice {
            sysfs_name: entry.file_name().to_string_lossy().into_owned(),
            vendor_id,
            product_id,
        });
    }

    Ok(devices)
}

fn read_id(dir: &Path, file: &str) -> Option<String> {
    fs::read_to_string(dir.join(file))
        .ok()
        .map(|s| s.trim().to_ascii_lowercase())
        .filter(|s| !s.is_empty())
}

/// Looks for a USB device by vendor and (optionally) product id.
#[derive(Debug, Clone)]
pub struct UsbDeviceProbe {
    root: PathBuf,
    vendor_id: String,
    product_id: Option<String>,
}

impl UsbDeviceProbe {
    /// Probe the system sysfs tree.
    #[must_use]
    pub fn new(vendor_id: &str, product_id: Option<&str>) -> Self {
        Self::with_root(SYSFS_USB_DEVICES, vendor_id, product_id)
    }

    /// Probe an alternative sysfs-like tree.
    #[must_use]
    pub fn with_root(root: impl Into<PathBuf>, vendor_id: &str, product_id: Option<&str>) -> Self {
        Self {
            root: root.into(),
            vendor_id: vendor_id.to_ascii_lowercase(),
            product_id: product_id.map(str::to_ascii_lowercase),
        }
    }

    /// Check if a matching device is attached.
    ///
    /// An unreadable sysfs tree counts as "not attached".
    #[must_use]
    pub fn is_present(&self) -> bool {
        match list_devices(&self.root) {
            Ok(devices) => devices.iter().any(|d| self.matches(d)),
            Err(e) => {
                warn!(root = %self.root.display(), error = %e, "Cannot list USB devices");
                false
            }
        }
    }

    fn matches(&self, device: &UsbDevice) -> bool {
        let hit = device.vendor_id == self.vendor_id
            && self
                .product_id
                .as_ref()
                .map_or(true, |p| *p == device.product_id);
        if hit {
            trace!(device = %device.sysfs_name, "Matched USB device");
        }
        hit
    }
}

impl fmt::Display for UsbDeviceProbe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "USB {}:{}",
            self.vendor_id,
            self.product_id.as_deref().unwrap_or("*")
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn add_device(root: &Path, name: &str, vendor: &str, product: &str) {
        let dir = root.join(name);
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join("idVendor"), format!("{vendor}\n")).unwrap();
        fs::write(dir.join("idProduct"), format!("{product}\n")).unwrap();
    }

    #[test]
    fn test_list_devices_skips_interfaces() {
        let root = tempfile::tempdir().unwrap();
        add_device(root.path(), "1-1", "1546", "01A7");
        fs::create_dir_all(root.path().join("1-1:1.0")).unwrap();

        let devices = list_devices(root.path()).unwrap();
        assert_eq!(
            devices,
            vec![UsbDevice {
                sysfs_name: "1-1".to_string(),
                vendor_id: "1546".to_string(),
                product_id: "01a7".to_string(),
            }]
        );
    }

    #[test]
    fn test_probe_matches_vendor_only() {
        let root = tempfile::tempdir().unwrap();
        add_device(root.path(), "1-1", "1546", "01a7");

        assert!(UsbDeviceProbe::with_root(root.path(), "1546", None).is_present());
        assert!(!UsbDeviceProbe::with_root(root.path(), "067b", None).is_present());
    }

    #[test]
    fn test_probe_matches_product_case_insensitive() {
        let root = tempfile::tempdir().unwrap();
        add_device(root.path(), "1-1", "1546", "01a7");

        assert!(UsbDeviceProbe::with_root(root.path(), "1546", Some("01A7")).is_present());
        assert!(!UsbDeviceProbe::with_root(root.path(), "1546", Some("01a8")).is_present());
    }

    #[test]
    fn test_probe_missing_root() {
        let root = tempfile::tempdir().unwrap();
        let probe = UsbDeviceProbe::with_root(root.path().join("absent"), "1546", None);
        assert!(!probe.is_present());
    }

    #[test]
    fn test_probe_display() {
        assert_eq!(UsbDeviceProbe::new("1546", None).to_string(), "USB 1546:*");
        assert_eq!(
            UsbDeviceProbe::new("067B", Some("2303")).to_string(),
            "USB 067b:2303"
        );
    }
}
