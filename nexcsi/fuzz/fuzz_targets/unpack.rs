#![no_main]

use libfuzzer_sys::fuzz_target;
use nexcsi::{unpack::unpack, Device};

fuzz_target!(|data: (Device, u32)| {
    let (device, word) = data;
    let z = unpack(word, device.family());
    assert!(z.re.is_finite() && z.im.is_finite());
});
