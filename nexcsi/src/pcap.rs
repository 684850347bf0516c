//! Extraction of Nexmon CSI records from pcap captures.
//!
//! Every pcap record is expected to hold one Nexmon UDP frame:
//!
//! ```text
//! +--------------------+----------+------+-----+-----------------+-----------------+
//! | pcap record header | ethernet | ipv4 | udp | nexmon metadata | csi words       |
//! | 16                 | 14       | 20   | 8   | 18              | 4 * nsub (+pad) |
//! +--------------------+----------+------+-----+-----------------+-----------------+
//! ```
//!
//! Records are walked by their included length only. Nothing is parsed out
//! of the link layer headers except addresses and ports, so captures taken
//! with other framings will decode to garbage.

use std::path::Path;

use ndarray::Array2;
use tracing::{debug, instrument, warn};

use crate::{
    decode::{self, decode_csi, DecodeOptions, DecodedCsi},
    device::Device,
    frame::{self, record_len, SampleRecord, ADDR_LEN, METADATA_LEN},
    ieee80211::{Bandwidth, UnsupportedBandwidth},
};

/// Size of the pcap global header.
pub const GLOBAL_HEADER_LEN: usize = 24;

/// Size of a pcap record header.
pub const RECORD_HEADER_LEN: usize = 16;

/// Offset of the included length within a pcap record header.
const INCL_LEN_OFFSET: usize = 8;

/// Ethernet, IPv4 and UDP headers preceding the Nexmon metadata.
pub const L2_L4_HEADER_LEN: usize = 42;

/// IPv4 addresses and UDP ports, relative to the record header.
const ADDRS: std::ops::Range<usize> = 42..54;

/// Nexmon metadata, relative to the record header.
const NEXMON_OFFSET: usize = RECORD_HEADER_LEN + L2_L4_HEADER_LEN;

/// Bytes in a frame before the CSI words.
const BYTES_BEFORE_CSI: u64 = (L2_L4_HEADER_LEN + METADATA_LEN) as u64;

/// Bytes of CSI in a 20 MHz frame (`20 * 3.2 * 4`).
const CSI_LEN_20MHZ: u64 = 256;

/// Error returned when a capture cannot be walked.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("capture is {len} bytes long, expected at least {needed}")]
    Truncated { len: usize, needed: usize },
    #[error("truncated pcap record header at offset {offset}")]
    TruncatedRecordHeader { offset: usize },
    #[error("frame at offset {offset} is {frame_len} bytes long, expected at least {min_len}")]
    FrameTooShort {
        offset: usize,
        frame_len: usize,
        min_len: usize,
    },
    #[error("frame at offset {offset} claims {frame_len} bytes, only {remaining} remain")]
    FrameOverrun {
        offset: usize,
        frame_len: usize,
        remaining: usize,
    },
    #[error(transparent)]
    UnsupportedBandwidth(#[from] UnsupportedBandwidth),
    #[error("failed to read capture")]
    Io(#[from] std::io::Error),
}

/// Infers the bandwidth from the included length of a frame.
///
/// The length is padded by `128 - 60` before dividing into 20 MHz steps, so
/// frames up to 128 bytes shorter or 127 bytes longer than expected (some
/// firmware zero pads its frames) still land on the right bandwidth.
///
/// ```
/// # use nexcsi::{pcap::infer_bandwidth, Bandwidth};
/// assert_eq!(infer_bandwidth(42 + 18 + 256 * 4), Ok(Bandwidth::Bw80));
/// ```
pub fn infer_bandwidth(incl_len: u32) -> Result<Bandwidth, UnsupportedBandwidth> {
    let len = incl_len as u64 + CSI_LEN_20MHZ / 2 - BYTES_BEFORE_CSI;
    let mhz = 20 * (len / CSI_LEN_20MHZ);
    Bandwidth::from_mhz(mhz as u32)
}

/// Upper bound on the number of frames in a capture of `file_len` bytes.
///
/// Each frame takes at least 16 + 42 + 18 + `4 * nsub` bytes. Padded frames
/// are longer, which only makes the estimate more generous.
pub fn estimate_max_samples(file_len: usize, nsub: usize) -> usize {
    let min_frame = RECORD_HEADER_LEN + L2_L4_HEADER_LEN + METADATA_LEN + nsub * 4;
    file_len.saturating_sub(GLOBAL_HEADER_LEN) / min_frame
}

/// Iterator over the records of a [`RecordBuffer`] or [`Capture`].
pub type Records<'a> =
    std::iter::Map<std::slice::ChunksExact<'a, u8>, fn(&'a [u8]) -> SampleRecord<'a>>;

/// Pre-sized storage for extracted records.
///
/// Records are laid out back to back, see [`frame`] for the layout. The
/// buffer never grows; only the first [`RecordBuffer::len`] records are
/// valid.
#[derive(Debug, Clone)]
pub struct RecordBuffer {
    data: Vec<u8>,
    nsub: usize,
    capacity: usize,
    len: usize,
}

impl RecordBuffer {
    /// Allocates room for `capacity` records of `nsub` subcarriers.
    pub fn new(capacity: usize, nsub: usize) -> Self {
        Self {
            data: vec![0; capacity * record_len(nsub)],
            nsub,
            capacity,
            len: 0,
        }
    }

    /// Bytes per record.
    pub fn stride(&self) -> usize {
        record_len(self.nsub)
    }

    pub fn nsub(&self) -> usize {
        self.nsub
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Number of valid records.
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn is_full(&self) -> bool {
        self.len == self.capacity
    }

    /// The valid records.
    pub fn as_bytes(&self) -> &[u8] {
        &self.data[..self.len * self.stride()]
    }

    /// Claims the next free slot.
    fn push_slot(&mut self) -> Option<&mut [u8]> {
        if self.is_full() {
            return None;
        }
        let stride = self.stride();
        let start = self.len * stride;
        self.len += 1;
        Some(&mut self.data[start..start + stride])
    }

    /// Drops the unused tail of the allocation.
    fn shrink(&mut self) {
        self.data.truncate(self.len * self.stride());
        self.data.shrink_to_fit();
        self.capacity = self.len;
    }

    pub fn get(&self, i: usize) -> Option<SampleRecord<'_>> {
        let stride = self.stride();
        (i < self.len).then(|| SampleRecord::from_stride(&self.data[i * stride..(i + 1) * stride]))
    }

    pub fn iter(&self) -> Records<'_> {
        records(self.as_bytes(), self.stride())
    }
}

fn records<'a>(b: &'a [u8], stride: usize) -> Records<'a> {
    let from_stride: fn(&'a [u8]) -> SampleRecord<'a> = SampleRecord::from_stride;
    b.chunks_exact(stride).map(from_stride)
}

/// Walks the records of a pcap capture and copies them into `buf`.
///
/// Returns the number of records in `buf`. Walking stops early if `buf`
/// fills up. On error `buf` may hold some of the preceding records, but
/// never a partial one.
pub fn walk_frames(b: &[u8], buf: &mut RecordBuffer) -> Result<usize, Error> {
    let min_len = L2_L4_HEADER_LEN + METADATA_LEN + buf.nsub() * 4;
    let payload_len = buf.stride() - ADDR_LEN;
    let mut not_nexmon = 0;
    let mut ptr = GLOBAL_HEADER_LEN;

    while ptr < b.len() {
        let header = b
            .get(ptr..ptr + RECORD_HEADER_LEN)
            .ok_or(Error::TruncatedRecordHeader { offset: ptr })?;
        let frame_len = u32::from_le_bytes([
            header[INCL_LEN_OFFSET],
            header[INCL_LEN_OFFSET + 1],
            header[INCL_LEN_OFFSET + 2],
            header[INCL_LEN_OFFSET + 3],
        ]) as usize;

        if frame_len < min_len {
            return Err(Error::FrameTooShort {
                offset: ptr,
                frame_len,
                min_len,
            });
        }

        let remaining = b.len() - ptr - RECORD_HEADER_LEN;
        if frame_len > remaining {
            return Err(Error::FrameOverrun {
                offset: ptr,
                frame_len,
                remaining,
            });
        }

        let rec = &b[ptr..ptr + RECORD_HEADER_LEN + frame_len];
        let Some(slot) = buf.push_slot() else {
            warn!(
                records = buf.len(),
                unread = b.len() - ptr,
                "record buffer full, ignoring the rest of the capture"
            );
            break;
        };

        // timestamps
        slot[0..8].copy_from_slice(&rec[0..8]);
        // saddr, daddr, sport, dport
        slot[8..ADDR_LEN].copy_from_slice(&rec[ADDRS]);
        // metadata and csi
        slot[ADDR_LEN..].copy_from_slice(&rec[NEXMON_OFFSET..NEXMON_OFFSET + payload_len]);

        if slot[ADDR_LEN..ADDR_LEN + 2] != frame::MAGIC.to_le_bytes() {
            not_nexmon += 1;
        }

        ptr += NEXMON_OFFSET + (frame_len - L2_L4_HEADER_LEN);
    }

    if not_nexmon > 0 {
        warn!(not_nexmon, "records without Nexmon magic bytes");
    }

    Ok(buf.len())
}

/// Options for [`read_capture`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReadOptions {
    /// Bandwidth of the capture. Inferred from the first frame if `None`.
    pub bandwidth: Option<Bandwidth>,
    /// Maximum number of records to read. Estimated from the capture size
    /// if `None`.
    pub max_samples: Option<usize>,
}

/// Records extracted from a capture.
#[derive(Debug, Clone)]
pub struct Capture {
    bandwidth: Bandwidth,
    records: RecordBuffer,
}

impl Capture {
    pub fn bandwidth(&self) -> Bandwidth {
        self.bandwidth
    }

    /// Number of subcarriers per record.
    pub fn nsub(&self) -> usize {
        self.records.nsub()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn get(&self, i: usize) -> Option<SampleRecord<'_>> {
        self.records.get(i)
    }

    pub fn iter(&self) -> Records<'_> {
        self.records.iter()
    }

    pub fn records(&self) -> &RecordBuffer {
        &self.records
    }

    /// The undecoded CSI words, one row per record.
    pub fn csi_raw(&self) -> Array2<u32> {
        let b = self.records.as_bytes();
        let stride = self.records.stride();

        Array2::from_shape_fn((self.len(), self.nsub()), |(i, j)| {
            let at = i * stride + frame::CSI_OFFSET + j * 4;
            u32::from_le_bytes([b[at], b[at + 1], b[at + 2], b[at + 3]])
        })
    }

    /// Decodes the CSI of every record.
    pub fn decode(&self, device: Device, opts: &DecodeOptions) -> Result<DecodedCsi, decode::Error> {
        decode_csi(&self.csi_raw(), device, opts)
    }
}

impl<'a> IntoIterator for &'a Capture {
    type Item = SampleRecord<'a>;
    type IntoIter = Records<'a>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Reads the Nexmon CSI records of a pcap capture held in memory.
///
/// ```
/// # use nexcsi::pcap::{read_capture, Error, ReadOptions};
/// let err = read_capture(&[0; 10], &ReadOptions::default()).unwrap_err();
/// assert!(matches!(err, Error::Truncated { len: 10, .. }));
/// ```
#[instrument(skip_all, fields(len = b.len()))]
pub fn read_capture(b: &[u8], opts: &ReadOptions) -> Result<Capture, Error> {
    if b.len() < GLOBAL_HEADER_LEN {
        return Err(Error::Truncated {
            len: b.len(),
            needed: GLOBAL_HEADER_LEN,
        });
    }

    let bandwidth = match opts.bandwidth {
        Some(bw) => bw,
        None => {
            let at = GLOBAL_HEADER_LEN + INCL_LEN_OFFSET;
            let incl_len = b.get(at..at + 4).ok_or(Error::Truncated {
                len: b.len(),
                needed: at + 4,
            })?;
            let bw = infer_bandwidth(u32::from_le_bytes([
                incl_len[0],
                incl_len[1],
                incl_len[2],
                incl_len[3],
            ]))?;
            debug!(%bw, "inferred bandwidth");
            bw
        }
    };

    let nsub = bandwidth.nsub_pow2();
    let estimate = estimate_max_samples(b.len(), nsub);
    // more than the estimate can never be filled
    let capacity = opts.max_samples.map_or(estimate, |max| max.min(estimate));
    debug!(estimate, capacity, "allocating record buffer");

    let mut records = RecordBuffer::new(capacity, nsub);
    let n = walk_frames(b, &mut records)?;
    records.shrink();
    debug!(records = n, "walked capture");

    Ok(Capture { bandwidth, records })
}

/// Reads the Nexmon CSI records of a pcap file.
pub fn read_capture_file(path: impl AsRef<Path>, opts: &ReadOptions) -> Result<Capture, Error> {
    let b = std::fs::read(path)?;
    read_capture(&b, opts)
}

#[cfg(test)]
mod tests {
    use std::net::Ipv4Addr;

    use super::*;
    use crate::synth::{FrameSpec, Synth};

    fn frames(n: usize, nsub: usize) -> Vec<FrameSpec> {
        (0..n)
            .map(|i| FrameSpec {
                ts_sec: 1_600_000_000 + i as u32,
                ts_usec: 1000 * i as u32,
                saddr: [192, 168, 1, i as u8],
                sport: 5000 + i as u16,
                rssi: -(i as i8) - 30,
                frame_control: i as u8,
                mac: [0xaa, 0xbb, 0xcc, 0xdd, 0xee, i as u8],
                sequence: 100 + i as u16,
                core_spatial_stream: (i % 4) as u16,
                chanspec: 0xe02a,
                chip_version: 0x4366,
                csi: (0..nsub as u32).map(|k| k << 8 | i as u32).collect(),
                ..FrameSpec::new(nsub)
            })
            .collect()
    }

    fn capture(frames: &[FrameSpec]) -> Vec<u8> {
        frames.iter().fold(Synth::new(), |s, f| s.frame(f)).build()
    }

    #[test]
    fn bandwidth_from_frame_len() {
        const BASE: u32 = 42 + 18 + 256;
        for k in 0..8 {
            assert_eq!(
                infer_bandwidth(BASE + 256 * k),
                Bandwidth::from_mhz(20 * (k + 1)),
                "k = {k}"
            );
        }
    }

    #[test]
    fn bandwidth_tolerates_padding() {
        // 316 bytes is an unpadded 20 MHz frame
        for len in 316 - 128..=316 + 127 {
            assert_eq!(infer_bandwidth(len), Ok(Bandwidth::Bw20), "len = {len}");
        }
        assert_eq!(infer_bandwidth(187), Err(UnsupportedBandwidth(0)));
        assert_eq!(infer_bandwidth(444), Ok(Bandwidth::Bw40));
    }

    #[test]
    fn estimate_is_upper_bound() {
        for bw in Bandwidth::ALL {
            let nsub = bw.nsub_pow2();
            let mut frames = frames(7, nsub);
            frames[3].padding = 12;
            let b = capture(&frames);
            assert_eq!(estimate_max_samples(b.len(), nsub), 7);
        }
        assert_eq!(estimate_max_samples(0, 64), 0);
        assert_eq!(estimate_max_samples(24, 64), 0);
    }

    #[test]
    fn walks_every_frame() {
        let frames = frames(5, 64);
        let b = capture(&frames);
        let capture = read_capture(&b, &ReadOptions::default()).unwrap();

        assert_eq!(capture.bandwidth(), Bandwidth::Bw20);
        assert_eq!(capture.len(), 5);

        for (i, (r, f)) in capture.iter().zip(&frames).enumerate() {
            assert_eq!(r.timestamp_sec(), f.ts_sec);
            assert_eq!(r.timestamp_usec(), f.ts_usec);
            assert_eq!(r.source_ip(), Ipv4Addr::from(f.saddr));
            assert_eq!(r.dest_ip(), Ipv4Addr::from(f.daddr));
            assert_eq!(r.source_port(), f.sport);
            assert_eq!(r.dest_port(), f.dport);
            assert_eq!(r.magic(), frame::MAGIC);
            assert_eq!(r.rssi(), f.rssi);
            assert_eq!(r.frame_control(), f.frame_control);
            assert_eq!(r.mac_address().into_array(), f.mac);
            assert_eq!(r.sequence(), f.sequence);
            assert_eq!(r.core_spatial_stream(), f.core_spatial_stream);
            assert_eq!(r.chanspec(), f.chanspec);
            assert_eq!(r.chip_version(), f.chip_version);
            assert_eq!(r.csi_raw().collect::<Vec<_>>(), f.csi, "record {i}");
        }

        let raw = capture.csi_raw();
        assert_eq!(raw.dim(), (5, 64));
        assert_eq!(raw[[3, 2]], 2 << 8 | 3);
    }

    #[test]
    fn walks_padded_frames() {
        let mut frames = frames(4, 256);
        frames[0].padding = 100;
        frames[2].padding = 3;
        let b = capture(&frames);
        let capture = read_capture(&b, &ReadOptions::default()).unwrap();

        assert_eq!(capture.bandwidth(), Bandwidth::Bw80);
        assert_eq!(capture.len(), 4);
        let seqs: Vec<_> = capture.iter().map(|r| r.sequence()).collect();
        assert_eq!(seqs, [100, 101, 102, 103]);
        assert_eq!(capture.get(3).unwrap().csi_raw().last(), Some(255 << 8 | 3));
        assert!(capture.get(4).is_none());
    }

    #[test]
    fn explicit_bandwidth() {
        // 40 MHz frames can be read as 20 MHz, keeping the first 64 words
        let frames = frames(2, 128);
        let b = capture(&frames);
        let opts = ReadOptions {
            bandwidth: Some(Bandwidth::Bw20),
            ..Default::default()
        };
        let capture = read_capture(&b, &opts).unwrap();
        assert_eq!(capture.len(), 2);
        assert_eq!(capture.nsub(), 64);
        assert_eq!(capture.get(1).unwrap().csi_raw().collect::<Vec<_>>(), frames[1].csi[..64]);
    }

    #[test]
    fn max_samples_caps_records() {
        let b = capture(&frames(5, 64));
        let opts = ReadOptions {
            max_samples: Some(2),
            ..Default::default()
        };
        let capture = read_capture(&b, &opts).unwrap();
        assert_eq!(capture.len(), 2);
        assert_eq!(capture.get(1).unwrap().sequence(), 101);

        let opts = ReadOptions {
            max_samples: Some(1000),
            ..Default::default()
        };
        assert_eq!(read_capture(&b, &opts).unwrap().len(), 5);
    }

    #[test]
    fn header_only() {
        let b = Synth::new().build();
        let err = read_capture(&b, &ReadOptions::default()).unwrap_err();
        assert!(matches!(err, Error::Truncated { len: 24, needed: 36 }));

        let opts = ReadOptions {
            bandwidth: Some(Bandwidth::Bw40),
            ..Default::default()
        };
        let capture = read_capture(&b, &opts).unwrap();
        assert!(capture.is_empty());
        assert_eq!(capture.csi_raw().dim(), (0, 128));
    }

    #[test]
    fn too_short_for_any_bandwidth() {
        let b = Synth::new().record(0, 0, &[0; 10]).build();
        let err = read_capture(&b, &ReadOptions::default()).unwrap_err();
        assert!(matches!(err, Error::UnsupportedBandwidth(UnsupportedBandwidth(0))));

        let opts = ReadOptions {
            bandwidth: Some(Bandwidth::Bw20),
            ..Default::default()
        };
        let err = read_capture(&b, &opts).unwrap_err();
        assert!(matches!(
            err,
            Error::FrameTooShort {
                offset: 24,
                frame_len: 10,
                min_len: 316,
            }
        ));
    }

    #[test]
    fn frame_shorter_than_bandwidth() {
        let b = capture(&frames(2, 64));
        let opts = ReadOptions {
            bandwidth: Some(Bandwidth::Bw40),
            ..Default::default()
        };
        let err = read_capture(&b, &opts).unwrap_err();
        assert!(matches!(err, Error::FrameTooShort { offset: 24, .. }));
    }

    #[test]
    fn truncated_last_frame() {
        let mut b = capture(&frames(3, 64));
        b.truncate(b.len() - 10);
        let err = read_capture(&b, &ReadOptions::default()).unwrap_err();
        let last = 24 + 2 * (16 + 316);
        assert!(matches!(
            err,
            Error::FrameOverrun { offset, frame_len: 316, remaining: 306 } if offset == last
        ));
    }

    #[test]
    fn trailing_garbage() {
        let frames = frames(2, 64);
        let b = frames
            .iter()
            .fold(Synth::new(), |s, f| s.frame(f))
            .raw(&[1, 2, 3, 4, 5])
            .build();
        let err = read_capture(&b, &ReadOptions::default()).unwrap_err();
        assert!(matches!(err, Error::TruncatedRecordHeader { offset } if offset == 24 + 2 * 332));
    }

    #[test]
    fn foreign_records_are_kept() {
        let mut frames = frames(2, 64);
        frames[1].magic = 0x4242;
        let b = capture(&frames);
        let capture = read_capture(&b, &ReadOptions::default()).unwrap();
        assert_eq!(capture.len(), 2);
        assert!(capture.get(0).unwrap().is_nexmon());
        assert!(!capture.get(1).unwrap().is_nexmon());
    }

    #[test]
    fn full_buffer_stops_walk() {
        let b = capture(&frames(3, 64));
        let mut buf = RecordBuffer::new(1, 64);
        assert_eq!(walk_frames(&b, &mut buf).unwrap(), 1);
        assert!(buf.is_full());
        assert_eq!(buf.as_bytes().len(), buf.stride());
    }

    #[test]
    fn capture_is_send_and_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<Capture>();
    }

    #[test]
    fn iterate_by_reference() {
        let frames: Vec<FrameSpec> = (0..3)
            .map(|i| FrameSpec {
                sequence: i,
                ..FrameSpec::new(64)
            })
            .collect();
        let b = frames.iter().fold(Synth::new(), |s, f| s.frame(f)).build();
        let capture = read_capture(&b, &ReadOptions::default()).unwrap();

        let mut records = (&capture).into_iter();
        assert_eq!(records.len(), 3);
        records.next();
        assert_eq!(records.len(), 2);

        let mut seen = Vec::new();
        for record in &capture {
            seen.push(record.sequence());
        }
        assert_eq!(seen, [0, 1, 2]);
    }
}
