//! Decoding of raw CSI words into complex matrices.

use ndarray::{Array2, ArrayBase, Data, Ix2};
use num_complex::Complex32;
use tracing::{debug, warn};

use crate::{
    device::{Device, UnsupportedDevice},
    ieee80211::Bandwidth,
    proc::{fftshift, zero_subcarriers},
    unpack::unpack,
};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    UnsupportedDevice(#[from] UnsupportedDevice),
    /// The number of columns is not the subcarrier count of any bandwidth.
    #[error("couldn't determine bandwidth from {nsub} subcarriers, is the capture corrupt?")]
    AmbiguousEncoding { nsub: usize },
}

/// Options for [`decode_csi`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DecodeOptions {
    /// Apply [`fftshift`] to every row. Defaults to `true`.
    pub reorder: bool,
    /// Zero the null subcarriers. Implies `reorder`.
    pub zero_nulls: bool,
    /// Zero the pilot subcarriers. Implies `reorder`.
    pub zero_pilots: bool,
}

impl Default for DecodeOptions {
    fn default() -> Self {
        Self {
            reorder: true,
            zero_nulls: false,
            zero_pilots: false,
        }
    }
}

/// What was done to produce a [`DecodedCsi`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Provenance {
    pub device: Device,
    pub bandwidth: Bandwidth,
    /// Whether the rows are fftshifted. May be `true` even if not requested,
    /// see [`DecodeOptions::zero_nulls`].
    pub reordered: bool,
    pub zero_nulls: bool,
    pub zero_pilots: bool,
}

impl Provenance {
    /// Null subcarrier columns, valid when [`Provenance::reordered`].
    pub fn nulls(&self) -> &'static [usize] {
        self.bandwidth.nulls()
    }

    /// Pilot subcarrier columns, valid when [`Provenance::reordered`].
    pub fn pilots(&self) -> &'static [usize] {
        self.bandwidth.pilots()
    }
}

/// Complex CSI, one row per record and one column per subcarrier.
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedCsi {
    pub csi: Array2<Complex32>,
    pub provenance: Provenance,
}

/// Decodes raw CSI words, one row per record, into complex values.
///
/// ```
/// # use ndarray::Array2;
/// # use nexcsi::{decode_csi, DecodeOptions, Device};
/// let mut raw = Array2::<u32>::zeros((1, 64));
/// raw[[0, 0]] = u32::from_le_bytes([100, 0, 0xce, 0xff]); // (100, -50)
///
/// let opts = DecodeOptions { reorder: false, ..Default::default() };
/// let decoded = decode_csi(&raw, Device::Bcm43455c0, &opts).unwrap();
/// assert_eq!(decoded.csi[[0, 0]], num_complex::Complex32::new(100., -50.));
/// ```
pub fn decode_csi<S: Data<Elem = u32>>(
    raw: &ArrayBase<S, Ix2>,
    device: Device,
    opts: &DecodeOptions,
) -> Result<DecodedCsi, Error> {
    let nsub = raw.ncols();
    let bandwidth = Bandwidth::from_nsub(nsub).map_err(|_| Error::AmbiguousEncoding { nsub })?;

    let family = device.family();
    let mut csi = raw.mapv(|w| unpack(w, family));

    let mut reorder = opts.reorder;
    if (opts.zero_nulls || opts.zero_pilots) && !reorder {
        warn!("fftshift is forced when zeroing nulls or pilots");
        reorder = true;
    }

    if reorder {
        fftshift(&mut csi);
    }
    if opts.zero_nulls {
        zero_subcarriers(&mut csi, bandwidth.nulls());
    }
    if opts.zero_pilots {
        zero_subcarriers(&mut csi, bandwidth.pilots());
    }

    debug!(%device, %bandwidth, records = csi.nrows(), "decoded csi");

    Ok(DecodedCsi {
        csi,
        provenance: Provenance {
            device,
            bandwidth,
            reordered: reorder,
            zero_nulls: opts.zero_nulls,
            zero_pilots: opts.zero_pilots,
        },
    })
}

/// Like [`decode_csi`], looking the device up by name.
pub fn decode_csi_named<S: Data<Elem = u32>>(
    raw: &ArrayBase<S, Ix2>,
    device: &str,
    opts: &DecodeOptions,
) -> Result<DecodedCsi, Error> {
    decode_csi(raw, device.parse()?, opts)
}
