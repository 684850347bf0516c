//! Decoder for channel state information captured by
//! [Nexmon](https://github.com/seemoo-lab/nexmon_csi)-patched Broadcom chips.
//!
//! Nexmon sends the CSI of every received frame as a UDP packet, which is
//! usually recorded with `tcpdump` into a pcap file. [`read_capture`]
//! extracts the packets of such a file, and [`decode_csi`] turns their raw
//! CSI words into complex values:
//!
//! ```no_run
//! use nexcsi::{read_capture_file, DecodeOptions, Device, ReadOptions};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let capture = read_capture_file("output.pcap", &ReadOptions::default())?;
//! let device: Device = "rtac86u".parse()?;
//! let decoded = capture.decode(device, &DecodeOptions::default())?;
//!
//! for (record, csi) in capture.iter().zip(decoded.csi.rows()) {
//!     println!("{} {}: {}", record.sequence(), record.rssi(), csi[0]);
//! }
//! # Ok(())
//! # }
//! ```

pub mod chanspec;
pub mod decode;
pub mod device;
pub mod frame;
pub mod ieee80211;
pub mod pcap;
pub mod proc;
pub mod unpack;

#[cfg(test)]
mod synth;

pub use decode::{decode_csi, decode_csi_named, DecodeOptions, DecodedCsi, Provenance};
pub use device::{Device, Family, UnsupportedDevice};
pub use frame::SampleRecord;
pub use ieee80211::{Bandwidth, UnsupportedBandwidth};
pub use pcap::{read_capture, read_capture_file, Capture, ReadOptions};
