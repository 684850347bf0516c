//! IEEE 802.11 definitions.
//!
//! References:
//! - [802.11ac: A Survival Guide](https://www.oreilly.com/library/view/80211ac-a-survival/9781449357702/ch02.html)
//! - [List of WLAN channels (Wikipedia)](https://en.wikipedia.org/wiki/List_of_WLAN_channels#5_GHz_(802.11a/h/n/ac/ax))

use std::fmt::Display;

/// Band.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "arbitrary", derive(arbitrary::Arbitrary))]
pub enum Band {
    /// 2.4 GHz.
    Band2G,
    /// 5 GHz.
    Band5G,
}

/// Error returned when a bandwidth or subcarrier count is not one of
/// 20/40/80/160 MHz (64/128/256/512 subcarriers).
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("unsupported bandwidth: {0} MHz")]
pub struct UnsupportedBandwidth(pub u32);

/// Bandwidth.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "arbitrary", derive(arbitrary::Arbitrary))]
pub enum Bandwidth {
    /// 20 MHz.
    Bw20,
    /// 40 MHz.
    Bw40,
    /// 80 MHz.
    Bw80,
    /// 160 MHz.
    Bw160,
}

impl Bandwidth {
    /// All supported bandwidths, narrowest first.
    pub const ALL: [Bandwidth; 4] = [
        Bandwidth::Bw20,
        Bandwidth::Bw40,
        Bandwidth::Bw80,
        Bandwidth::Bw160,
    ];

    /// Returns the bandwidth in MHz.
    pub const fn mhz(&self) -> u8 {
        match self {
            Bandwidth::Bw20 => 20,
            Bandwidth::Bw40 => 40,
            Bandwidth::Bw80 => 80,
            Bandwidth::Bw160 => 160,
        }
    }

    /// Looks up a bandwidth by its value in MHz.
    ///
    /// ```
    /// # use nexcsi::ieee80211::Bandwidth;
    /// assert_eq!(Bandwidth::from_mhz(80), Ok(Bandwidth::Bw80));
    /// assert!(Bandwidth::from_mhz(60).is_err());
    /// ```
    pub const fn from_mhz(mhz: u32) -> Result<Self, UnsupportedBandwidth> {
        match mhz {
            20 => Ok(Bandwidth::Bw20),
            40 => Ok(Bandwidth::Bw40),
            80 => Ok(Bandwidth::Bw80),
            160 => Ok(Bandwidth::Bw160),
            _ => Err(UnsupportedBandwidth(mhz)),
        }
    }

    /// Returns the number of subcarriers rounded up to the nearest power of 2.
    /// This is `3.2 * <bandwidth in MHz>` and is also the number of CSI
    /// values Nexmon reports per frame.
    ///
    /// Note that this is not the same as the number of _usable_ subcarriers.
    ///
    /// | PHY standard             | Subcarrier range                                   | Pilot subcarriers                           | Subcarriers (total/data)          |
    /// |--------------------------|----------------------------------------------------|---------------------------------------------|-----------------------------------|
    /// | 802.11n/802.11ac, 20 MHz | –28 to –1, +1 to +28                               | ±7, ±21                                     | 56 total, 52 usable (7% pilots)   |
    /// | 802.11n/802.11ac, 40 MHz | –58 to –2, +2 to +58                               | ±11, ±25, ±53                               | 114 total, 108 usable (5% pilots) |
    /// | 802.11ac, 80 MHz         | –122 to –2, +2 to +122                             | ±11, ±39, ±75, ±103                         | 242 total, 234 usable (3% pilots) |
    /// | 802.11ac, 160 MHz        | –250 to –130, –126 to –6, +6 to +126, +130 to +250 | ±25, ±53, ±89, ±117, ±139, ±167, ±203, ±231 | 484 total, 468 usable (3% pilots) |
    pub const fn nsub_pow2(&self) -> usize {
        match self {
            Bandwidth::Bw20 => 64,   // 56 total
            Bandwidth::Bw40 => 128,  // 108 total
            Bandwidth::Bw80 => 256,  // 242 total
            Bandwidth::Bw160 => 512, // 484 total
        }
    }

    /// Inverse of [`Bandwidth::nsub_pow2`].
    ///
    /// The error carries the bandwidth the count would correspond to
    /// (`nsub / 3.2`, truncated).
    pub const fn from_nsub(nsub: usize) -> Result<Self, UnsupportedBandwidth> {
        match nsub {
            64 => Ok(Bandwidth::Bw20),
            128 => Ok(Bandwidth::Bw40),
            256 => Ok(Bandwidth::Bw80),
            512 => Ok(Bandwidth::Bw160),
            _ => Err(UnsupportedBandwidth((nsub * 10 / 32) as u32)),
        }
    }

    /// Null (unused) subcarrier indices. See [`nulls`].
    pub const fn nulls(&self) -> &'static [usize] {
        nulls(*self)
    }

    /// Pilot subcarrier indices. See [`pilots`].
    pub const fn pilots(&self) -> &'static [usize] {
        pilots(*self)
    }
}

impl Display for Bandwidth {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} MHz", self.mhz())
    }
}

impl TryFrom<u32> for Bandwidth {
    type Error = UnsupportedBandwidth;

    fn try_from(value: u32) -> Result<Self, Self::Error> {
        Self::from_mhz(value)
    }
}

/// OFDM subcarriers can be either pilot, data or zero/null.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SubcarrierType {
    /// Pilot subcarrier.
    Pilot,
    /// Data subcarrier.
    Data,
    /// Zero/null (unused) subcarrier.
    Zero,
}

/// Subcarrier type for 802.11n/802.11ac, 20 MHz.
///
/// ```
/// # use nexcsi::ieee80211::{subcarrier_type_20mhz, SubcarrierType};
/// let usable = (-128..127).filter(|&i| subcarrier_type_20mhz(i) == SubcarrierType::Data).count();
///
/// assert_eq!(usable, 52);
/// ```
pub const fn subcarrier_type_20mhz(i: i8) -> SubcarrierType {
    match i {
        -21 | -7 | 7 | 21 => SubcarrierType::Pilot,
        -28..=-1 | 1..=28 => SubcarrierType::Data,
        _ => SubcarrierType::Zero,
    }
}

/// Subcarrier type for 802.11n/802.11ac, 40 MHz.
///
/// ```
/// # use nexcsi::ieee80211::{subcarrier_type_40mhz, SubcarrierType};
/// let usable = (-128..127).filter(|&i| subcarrier_type_40mhz(i) == SubcarrierType::Data).count();
///
/// assert_eq!(usable, 108);
/// ```
pub const fn subcarrier_type_40mhz(i: i8) -> SubcarrierType {
    match i {
        -53 | -25 | -11 | 11 | 25 | 53 => SubcarrierType::Pilot,
        -58..=-2 | 2..=58 => SubcarrierType::Data,
        _ => SubcarrierType::Zero,
    }
}

/// Subcarrier type for 802.11ac, 80 MHz.
///
/// ```
/// # use nexcsi::ieee80211::{subcarrier_type_80mhz, SubcarrierType};
/// let usable = (-128..127).filter(|&i| subcarrier_type_80mhz(i) == SubcarrierType::Data).count();
///
/// assert_eq!(usable, 234);
/// ```
pub const fn subcarrier_type_80mhz(i: i8) -> SubcarrierType {
    match i {
        -103 | -75 | -39 | -11 | 11 | 39 | 75 | 103 => SubcarrierType::Pilot,
        -122..=-2 | 2..=122 => SubcarrierType::Data,
        _ => SubcarrierType::Zero,
    }
}

/// Subcarrier type for 802.11ac, 160 MHz.
///
/// ```
/// # use nexcsi::ieee80211::{subcarrier_type_160mhz, SubcarrierType};
/// let usable = (-256..255).filter(|&i| subcarrier_type_160mhz(i) == SubcarrierType::Data).count();
///
/// assert_eq!(usable, 468);
/// ```
pub const fn subcarrier_type_160mhz(i: i16) -> SubcarrierType {
    match i {
        -231 | -203 | -167 | -139 | -117 | -89 | -53 | -25 | 25 | 53 | 89 | 117 | 139 | 167
        | 203 | 231 => SubcarrierType::Pilot,
        -250..=-130 | -126..=-6 | 6..=126 | 130..=250 => SubcarrierType::Data,
        _ => SubcarrierType::Zero,
    }
}

/// Subcarrier type of column `idx` in an fftshifted row of `bw`.
///
/// Column `idx` holds physical subcarrier `idx - nsub / 2`. Returns `None`
/// if `idx` is out of range.
pub fn subcarrier_type(bw: Bandwidth, idx: usize) -> Option<SubcarrierType> {
    let nsub = bw.nsub_pow2();
    if idx >= nsub {
        return None;
    }
    let k = idx as i16 - (nsub / 2) as i16;

    Some(match bw {
        Bandwidth::Bw20 => subcarrier_type_20mhz(k as i8),
        Bandwidth::Bw40 => subcarrier_type_40mhz(k as i8),
        Bandwidth::Bw80 => subcarrier_type_80mhz(k as i8),
        Bandwidth::Bw160 => subcarrier_type_160mhz(k),
    })
}

// Indices are in fftshifted coordinates: column `i` is subcarrier `i - nsub/2`.

const NULLS_20MHZ: [usize; 8] = [0, 1, 2, 3, 32, 61, 62, 63];
const NULLS_40MHZ: [usize; 14] = [0, 1, 2, 3, 4, 5, 63, 64, 65, 123, 124, 125, 126, 127];
const NULLS_80MHZ: [usize; 14] = [0, 1, 2, 3, 4, 5, 127, 128, 129, 251, 252, 253, 254, 255];
#[rustfmt::skip]
const NULLS_160MHZ: [usize; 28] = [
    0, 1, 2, 3, 4, 5,
    127, 128, 129,
    251, 252, 253, 254, 255, 256, 257, 258, 259, 260, 261,
    383, 384, 385,
    507, 508, 509, 510, 511,
];

const PILOTS_20MHZ: [usize; 4] = [11, 25, 39, 53];
const PILOTS_40MHZ: [usize; 6] = [11, 39, 53, 75, 89, 117];
const PILOTS_80MHZ: [usize; 8] = [25, 53, 89, 117, 139, 167, 203, 231];
#[rustfmt::skip]
const PILOTS_160MHZ: [usize; 16] = [
    25, 53, 89, 117, 139, 167, 203, 231,
    281, 309, 345, 373, 395, 423, 459, 487,
];

/// Column indices of the null subcarriers, in fftshifted order.
///
/// ```
/// # use nexcsi::ieee80211::{nulls, Bandwidth};
/// // DC sits in the middle after the shift
/// assert!(nulls(Bandwidth::Bw20).contains(&32));
/// ```
pub const fn nulls(bw: Bandwidth) -> &'static [usize] {
    match bw {
        Bandwidth::Bw20 => &NULLS_20MHZ,
        Bandwidth::Bw40 => &NULLS_40MHZ,
        Bandwidth::Bw80 => &NULLS_80MHZ,
        Bandwidth::Bw160 => &NULLS_160MHZ,
    }
}

/// Column indices of the pilot subcarriers, in fftshifted order.
pub const fn pilots(bw: Bandwidth) -> &'static [usize] {
    match bw {
        Bandwidth::Bw20 => &PILOTS_20MHZ,
        Bandwidth::Bw40 => &PILOTS_40MHZ,
        Bandwidth::Bw80 => &PILOTS_80MHZ,
        Bandwidth::Bw160 => &PILOTS_160MHZ,
    }
}
