//! Supported chips and how their CSI values are encoded.

use std::{fmt::Display, str::FromStr};

/// Error returned when a device name is not in the classification table.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unsupported device {0:?}")]
pub struct UnsupportedDevice(pub String);

/// A Nexmon-patched chip whose CSI dumps can be decoded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "arbitrary", derive(arbitrary::Arbitrary))]
pub enum Device {
    /// Broadcom BCM43455c0, used in the Raspberry Pi 3B+ and 4.
    Bcm43455c0,
    /// Broadcom BCM4339, used in the Nexus 5.
    Bcm4339,
    /// Broadcom BCM4358, used in the Nexus 6P.
    Bcm4358,
    /// Broadcom BCM4366c0, used in the Asus RT-AC86U router.
    Bcm4366c0,
}

/// How a chip encodes each subcarrier in its 32-bit CSI word.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Family {
    /// Two little-endian `i16`s, real first.
    Direct,
    /// Shared-exponent floating point. From the least significant bit:
    /// `exponent_bits` of exponent, then imaginary and real parts, each
    /// `mantissa_bits - 1` bits of magnitude topped by a sign bit.
    BlockFloat {
        mantissa_bits: u32,
        exponent_bits: u32,
    },
}

/// Name → device lookup. Names are matched ignoring ASCII case.
#[rustfmt::skip]
const DEVICES: &[(&str, Device)] = &[
    ("raspberrypi", Device::Bcm43455c0),
    ("rpi", Device::Bcm43455c0),
    ("rpi4", Device::Bcm43455c0),
    ("rpi3", Device::Bcm43455c0),
    ("bcm43455c0", Device::Bcm43455c0),
    ("bcm43455", Device::Bcm43455c0),
    ("Raspberry Pi B3+/B4", Device::Bcm43455c0),
    ("nexus5", Device::Bcm4339),
    ("bcm4339", Device::Bcm4339),
    ("Nexus 5", Device::Bcm4339),
    ("nexus6p", Device::Bcm4358),
    ("bcm4358", Device::Bcm4358),
    ("Nexus 6P", Device::Bcm4358),
    ("rtac86u", Device::Bcm4366c0),
    ("bcm4366c0", Device::Bcm4366c0),
    ("Asus RT-AC86U", Device::Bcm4366c0),
];

impl Device {
    /// All supported devices.
    pub const ALL: [Device; 4] = [
        Device::Bcm43455c0,
        Device::Bcm4339,
        Device::Bcm4358,
        Device::Bcm4366c0,
    ];

    /// Looks up a device by one of its names.
    ///
    /// ```
    /// # use nexcsi::device::Device;
    /// assert_eq!(Device::lookup("rpi4"), Some(Device::Bcm43455c0));
    /// assert_eq!(Device::lookup("Asus RT-AC86U"), Some(Device::Bcm4366c0));
    /// assert_eq!(Device::lookup("bcm4375"), None);
    /// ```
    pub fn lookup(name: &str) -> Option<Self> {
        DEVICES
            .iter()
            .find(|(alias, _)| alias.eq_ignore_ascii_case(name.trim()))
            .map(|&(_, device)| device)
    }

    /// Every name this device answers to.
    pub fn aliases(self) -> impl Iterator<Item = &'static str> {
        DEVICES
            .iter()
            .filter(move |(_, device)| *device == self)
            .map(|&(alias, _)| alias)
    }

    /// The chip name, e.g. `bcm4366c0`.
    pub const fn name(self) -> &'static str {
        match self {
            Device::Bcm43455c0 => "bcm43455c0",
            Device::Bcm4339 => "bcm4339",
            Device::Bcm4358 => "bcm4358",
            Device::Bcm4366c0 => "bcm4366c0",
        }
    }

    pub const fn family(self) -> Family {
        match self {
            Device::Bcm43455c0 | Device::Bcm4339 => Family::Direct,
            Device::Bcm4358 => Family::BlockFloat {
                mantissa_bits: 9,
                exponent_bits: 5,
            },
            Device::Bcm4366c0 => Family::BlockFloat {
                mantissa_bits: 12,
                exponent_bits: 6,
            },
        }
    }
}

impl Display for Device {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Device {
    type Err = UnsupportedDevice;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::lookup(s).ok_or_else(|| UnsupportedDevice(s.to_owned()))
    }
}

impl TryFrom<&str> for Device {
    type Error = UnsupportedDevice;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        value.parse()
    }
}
