//! Layout of the records extracted from Nexmon CSI frames.
//!
//! Nexmon CSI is encoded in UDP packets, which in turn are defined
//! as follows:
//!
//! ```c
//! struct csi_udp_frame {
//!     struct ethernet_ip_udp_header hdrs;
//!     uint16 kk1; // magic bytes 0x1111
//!     int8 rssi;
//!     uint8 fc; //frame control
//!     uint8 SrcMac[6];
//!     uint16 seqCnt;
//!     uint16 csiconf;
//!     uint16 chanspec;
//!     uint16 chip;
//!     uint32 csi_values[];
//! } __attribute__((packed));
//! ```
//!
//! [GitHub source](https://github.com/seemoo-lab/nexmon_csi/blob/fdb25ef0e4e1402e968bb644d4914ad1a3d0a84d/src/csi_extractor.c#L135-L146)
//!
//! Only part of every pcap record is retained. Each record in a
//! [`RecordBuffer`](crate::pcap::RecordBuffer) is laid out as:
//!
//! | offset | size       | field                            |
//! |--------|------------|----------------------------------|
//! | 0      | 4          | timestamp seconds (LE)           |
//! | 4      | 4          | timestamp microseconds (LE)      |
//! | 8      | 4          | IPv4 source address (BE)         |
//! | 12     | 4          | IPv4 destination address (BE)    |
//! | 16     | 2          | UDP source port (BE)             |
//! | 18     | 2          | UDP destination port (BE)        |
//! | 20     | 18         | Nexmon metadata (LE)             |
//! | 38     | `4 * nsub` | CSI words (LE)                   |

use std::net::Ipv4Addr;

use macaddr::MacAddr6;

use crate::{
    chanspec::{ChanSpec, ParseChanSpecError},
    ieee80211::Bandwidth,
};

/// Magic bytes at the start of the Nexmon metadata.
pub const MAGIC: u16 = 0x1111;

/// Bytes of pcap timestamps, addresses and ports kept per record.
pub const ADDR_LEN: usize = 20;

/// Size of the Nexmon metadata, from the magic bytes to the chip version.
pub const METADATA_LEN: usize = 18;

/// Offset of the CSI words within a record.
pub const CSI_OFFSET: usize = ADDR_LEN + METADATA_LEN;

/// Size of one record, in bytes, for `nsub` subcarriers.
///
/// ```
/// # use nexcsi::frame::record_len;
/// assert_eq!(record_len(64), 38 + 256);
/// ```
pub const fn record_len(nsub: usize) -> usize {
    CSI_OFFSET + nsub * 4
}

/// One decoded capture record, borrowed from a
/// [`Capture`](crate::pcap::Capture).
#[derive(Clone, Copy)]
pub struct SampleRecord<'a> {
    b: &'a [u8],
}

impl<'a> SampleRecord<'a> {
    /// Wraps a record-sized slice.
    ///
    /// Returns `None` unless `b` is exactly one record for a supported
    /// bandwidth.
    pub fn new(b: &'a [u8]) -> Option<Self> {
        let nsub = b.len().checked_sub(CSI_OFFSET)? / 4;
        (Bandwidth::from_nsub(nsub).is_ok() && b.len() == record_len(nsub)).then_some(Self { b })
    }

    /// `b` must be one stride of a [`RecordBuffer`](crate::pcap::RecordBuffer).
    pub(crate) fn from_stride(b: &'a [u8]) -> Self {
        debug_assert!(b.len() >= CSI_OFFSET && (b.len() - CSI_OFFSET) % 4 == 0);
        Self { b }
    }

    fn u16_le(&self, at: usize) -> u16 {
        u16::from_le_bytes([self.b[at], self.b[at + 1]])
    }

    fn u16_be(&self, at: usize) -> u16 {
        u16::from_be_bytes([self.b[at], self.b[at + 1]])
    }

    fn u32_le(&self, at: usize) -> u32 {
        u32::from_le_bytes([self.b[at], self.b[at + 1], self.b[at + 2], self.b[at + 3]])
    }

    fn u32_be(&self, at: usize) -> u32 {
        u32::from_be_bytes([self.b[at], self.b[at + 1], self.b[at + 2], self.b[at + 3]])
    }

    /// The raw bytes of this record.
    pub fn as_bytes(&self) -> &'a [u8] {
        self.b
    }

    pub fn timestamp_sec(&self) -> u32 {
        self.u32_le(0)
    }

    pub fn timestamp_usec(&self) -> u32 {
        self.u32_le(4)
    }

    /// Source IPv4 address, as a host-order integer.
    pub fn source_addr(&self) -> u32 {
        self.u32_be(8)
    }

    /// Destination IPv4 address, as a host-order integer.
    pub fn dest_addr(&self) -> u32 {
        self.u32_be(12)
    }

    pub fn source_ip(&self) -> Ipv4Addr {
        Ipv4Addr::from(self.source_addr())
    }

    pub fn dest_ip(&self) -> Ipv4Addr {
        Ipv4Addr::from(self.dest_addr())
    }

    pub fn source_port(&self) -> u16 {
        self.u16_be(16)
    }

    pub fn dest_port(&self) -> u16 {
        self.u16_be(18)
    }

    /// Should be [`MAGIC`].
    pub fn magic(&self) -> u16 {
        self.u16_le(20)
    }

    /// Whether the metadata starts with the Nexmon magic bytes.
    pub fn is_nexmon(&self) -> bool {
        self.magic() == MAGIC
    }

    /// Received signal strength indicator (dBm).
    pub fn rssi(&self) -> i8 {
        self.b[22] as i8
    }

    pub fn frame_control(&self) -> u8 {
        self.b[23]
    }

    /// Transmitter MAC address.
    pub fn mac_address(&self) -> MacAddr6 {
        let m = &self.b[24..30];
        MacAddr6::new(m[0], m[1], m[2], m[3], m[4], m[5])
    }

    /// "The two byte sequence number of the Wi-Fi frame that triggered
    /// the collection of the CSI contained in this packet."
    pub fn sequence(&self) -> u16 {
        self.u16_le(30)
    }

    /// Core and spatial stream number, as reported.
    pub fn core_spatial_stream(&self) -> u16 {
        self.u16_le(32)
    }

    fn csi_config(&self) -> u16 {
        let config = self.core_spatial_stream();
        // Some versions of nexutil seem to encode the config in big endian.
        // If the config is larger than the maximum possible value, assume it's
        // big endian.
        if config > 0b111111 {
            config.swap_bytes()
        } else {
            config
        }
    }

    /// Core number.
    pub fn core(&self) -> u8 {
        (self.csi_config() & 0b111) as u8
    }

    /// Spatial stream number.
    pub fn spatial_stream(&self) -> u8 {
        ((self.csi_config() >> 3) & 0b111) as u8
    }

    /// Raw chanspec word, see [`SampleRecord::chan_spec`].
    pub fn chanspec(&self) -> u16 {
        self.u16_le(34)
    }

    pub fn chan_spec(&self) -> Result<ChanSpec, ParseChanSpecError> {
        ChanSpec::try_from(self.chanspec())
    }

    pub fn chip_version(&self) -> u16 {
        self.u16_le(36)
    }

    /// Number of subcarriers.
    pub fn nsub(&self) -> usize {
        (self.b.len() - CSI_OFFSET) / 4
    }

    /// The undecoded CSI words, one per subcarrier.
    pub fn csi_raw(&self) -> impl ExactSizeIterator<Item = u32> + 'a {
        self.b[CSI_OFFSET..]
            .chunks_exact(4)
            .map(|w| u32::from_le_bytes([w[0], w[1], w[2], w[3]]))
    }
}

impl std::fmt::Debug for SampleRecord<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SampleRecord")
            .field("timestamp_sec", &self.timestamp_sec())
            .field("timestamp_usec", &self.timestamp_usec())
            .field("source", &(self.source_ip(), self.source_port()))
            .field("dest", &(self.dest_ip(), self.dest_port()))
            .field("magic", &self.magic())
            .field("rssi", &self.rssi())
            .field("frame_control", &self.frame_control())
            .field("mac_address", &self.mac_address())
            .field("sequence", &self.sequence())
            .field("core", &self.core())
            .field("spatial_stream", &self.spatial_stream())
            .field("chanspec", &self.chanspec())
            .field("chip_version", &self.chip_version())
            .field("nsub", &self.nsub())
            .finish()
    }
}
