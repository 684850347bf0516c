#![no_main]

use libfuzzer_sys::fuzz_target;
use nexcsi::{read_capture, Bandwidth, ReadOptions};

fuzz_target!(|data: (Option<Bandwidth>, Vec<u8>)| {
    let (bandwidth, b) = data;
    let opts = ReadOptions {
        bandwidth,
        max_samples: None,
    };
    if let Ok(capture) = read_capture(&b, &opts) {
        for record in &capture {
            let _ = record.chan_spec();
            assert_eq!(record.csi_raw().len(), capture.nsub());
        }
    }
});
