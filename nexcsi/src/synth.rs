//! Synthetic Nexmon pcap captures for tests.

use crate::frame::MAGIC;

/// Fields of one synthetic Nexmon frame.
#[derive(Debug, Clone)]
pub struct FrameSpec {
    pub ts_sec: u32,
    pub ts_usec: u32,
    pub saddr: [u8; 4],
    pub daddr: [u8; 4],
    pub sport: u16,
    pub dport: u16,
    pub magic: u16,
    pub rssi: i8,
    pub frame_control: u8,
    pub mac: [u8; 6],
    pub sequence: u16,
    pub core_spatial_stream: u16,
    pub chanspec: u16,
    pub chip_version: u16,
    pub csi: Vec<u32>,
    /// Zero bytes appended after the CSI words.
    pub padding: usize,
}

impl FrameSpec {
    /// A frame with `nsub` zeroed CSI words, sent the way nexmon_csi does.
    pub fn new(nsub: usize) -> Self {
        Self {
            ts_sec: 0,
            ts_usec: 0,
            saddr: [10, 10, 10, 10],
            daddr: [255, 255, 255, 255],
            sport: 5500,
            dport: 5500,
            magic: MAGIC,
            rssi: -40,
            frame_control: 0,
            mac: [0; 6],
            sequence: 0,
            core_spatial_stream: 0,
            chanspec: 0,
            chip_version: 0,
            csi: vec![0; nsub],
            padding: 0,
        }
    }

    /// Ethernet, IPv4 and UDP headers followed by the Nexmon payload.
    pub fn to_bytes(&self) -> Vec<u8> {
        let payload_len = 18 + self.csi.len() * 4 + self.padding;
        let mut b = Vec::with_capacity(42 + payload_len);

        // ethernet
        b.extend_from_slice(&[0xff; 6]);
        b.extend_from_slice(b"NEXMON");
        b.extend_from_slice(&0x0800u16.to_be_bytes());

        // ipv4
        b.push(0x45);
        b.push(0);
        b.extend_from_slice(&((20 + 8 + payload_len) as u16).to_be_bytes());
        b.extend_from_slice(&[0, 0, 0, 0]);
        b.push(1); // ttl
        b.push(17); // udp
        b.extend_from_slice(&[0, 0]);
        b.extend_from_slice(&self.saddr);
        b.extend_from_slice(&self.daddr);

        // udp
        b.extend_from_slice(&self.sport.to_be_bytes());
        b.extend_from_slice(&self.dport.to_be_bytes());
        b.extend_from_slice(&((8 + payload_len) as u16).to_be_bytes());
        b.extend_from_slice(&[0, 0]);

        // nexmon
        b.extend_from_slice(&self.magic.to_le_bytes());
        b.push(self.rssi as u8);
        b.push(self.frame_control);
        b.extend_from_slice(&self.mac);
        b.extend_from_slice(&self.sequence.to_le_bytes());
        b.extend_from_slice(&self.core_spatial_stream.to_le_bytes());
        b.extend_from_slice(&self.chanspec.to_le_bytes());
        b.extend_from_slice(&self.chip_version.to_le_bytes());
        for w in &self.csi {
            b.extend_from_slice(&w.to_le_bytes());
        }
        b.resize(b.len() + self.padding, 0);

        b
    }
}

/// Builds a little-endian, microsecond-resolution pcap file.
#[derive(Debug, Default)]
pub struct Synth {
    records: Vec<u8>,
}

impl Synth {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn frame(self, frame: &FrameSpec) -> Self {
        let data = frame.to_bytes();
        self.record(frame.ts_sec, frame.ts_usec, &data)
    }

    /// Appends a record with arbitrary data.
    pub fn record(mut self, ts_sec: u32, ts_usec: u32, data: &[u8]) -> Self {
        let len = data.len() as u32;
        self.records.extend_from_slice(&ts_sec.to_le_bytes());
        self.records.extend_from_slice(&ts_usec.to_le_bytes());
        self.records.extend_from_slice(&len.to_le_bytes());
        self.records.extend_from_slice(&len.to_le_bytes());
        self.records.extend_from_slice(data);
        self
    }

    /// Appends raw bytes, e.g. a truncated record.
    pub fn raw(mut self, b: &[u8]) -> Self {
        self.records.extend_from_slice(b);
        self
    }

    pub fn build(self) -> Vec<u8> {
        let mut b = Vec::with_capacity(24 + self.records.len());
        b.extend_from_slice(&0xa1b2c3d4u32.to_le_bytes());
        b.extend_from_slice(&2u16.to_le_bytes());
        b.extend_from_slice(&4u16.to_le_bytes());
        b.extend_from_slice(&0i32.to_le_bytes());
        b.extend_from_slice(&0u32.to_le_bytes());
        b.extend_from_slice(&65535u32.to_le_bytes());
        b.extend_from_slice(&1u32.to_le_bytes()); // ethernet
        b.extend_from_slice(&self.records);
        b
    }
}
