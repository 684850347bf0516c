//! Broadcom chanspec words, as reported in the `chanspec` field of every
//! Nexmon CSI record.

use crate::ieee80211::{Band, Bandwidth};

// wlioctl_defs.h
const BW_MASK: u16 = 0x3800;
const BW_20: u16 = 0x1000;
const BW_40: u16 = 0x1800;
const BW_80: u16 = 0x2000;
const BW_160: u16 = 0x2800;
const BAND_MASK: u16 = 0xc000;
const BAND_2G: u16 = 0x0000;
const BAND_5G: u16 = 0xc000;

/// A chanspec holds the channel number, band, bandwidth and control sideband.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChanSpec {
    center: u8,
    sideband: u8,
    band: Band,
    bandwidth: Bandwidth,
}

impl ChanSpec {
    const CENTER_SHIFT: u8 = 0;
    const SIDEBAND_SHIFT: u8 = 8;

    /// Returns the center channel.
    pub const fn center(&self) -> u8 {
        self.center
    }

    /// Returns the control sideband.
    pub const fn sideband(&self) -> u8 {
        self.sideband
    }

    /// Returns the control channel.
    ///
    /// Parsed chanspecs are not range checked, so this wraps instead of
    /// panicking on nonsensical center/sideband combinations.
    pub const fn control_channel(&self) -> u8 {
        self.center
            .wrapping_sub((self.bandwidth.mhz() - 20) / 10)
            .wrapping_add(self.sideband.wrapping_mul(4))
    }

    /// Returns the band.
    pub const fn band(&self) -> Band {
        self.band
    }

    /// Returns the bandwidth.
    pub const fn bandwidth(&self) -> Bandwidth {
        self.bandwidth
    }
}

/// Error returned when parsing a [`ChanSpec`].
#[derive(Debug, Clone, Copy, thiserror::Error, PartialEq, Eq)]
pub enum ParseChanSpecError {
    /// Bandwidth is not one of the [`Bandwidth`] variants, or is not
    /// supported by the [`Band`].
    #[error("invalid bandwidth")]
    InvalidBandwidth,
    /// Band is not one of the [`Band`] variants.
    #[error("invalid band")]
    InvalidBand,
}

impl TryFrom<u16> for ChanSpec {
    type Error = ParseChanSpecError;

    fn try_from(value: u16) -> Result<Self, Self::Error> {
        let bandwidth = match value & BW_MASK {
            BW_20 => Bandwidth::Bw20,
            BW_40 => Bandwidth::Bw40,
            BW_80 => Bandwidth::Bw80,
            BW_160 => Bandwidth::Bw160,
            _ => return Err(ParseChanSpecError::InvalidBandwidth),
        };

        let band = match value & BAND_MASK {
            BAND_2G => {
                if !matches!(bandwidth, Bandwidth::Bw20 | Bandwidth::Bw40) {
                    // 2.4 GHz only supports 20 and 40 MHz bandwidth
                    return Err(ParseChanSpecError::InvalidBandwidth);
                }
                Band::Band2G
            }
            BAND_5G => Band::Band5G,
            _ => return Err(ParseChanSpecError::InvalidBand),
        };

        Ok(Self {
            center: ((value >> Self::CENTER_SHIFT) & 0xff) as u8,
            sideband: ((value >> Self::SIDEBAND_SHIFT) & 0x7) as u8,
            band,
            bandwidth,
        })
    }
}
