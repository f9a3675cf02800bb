#![no_main]

use libfuzzer_sys::fuzz_target;
use ndncert_core::cert::Certificate;
use ndncert_core::tlv::Element;
use ndncert_core::Name;

fuzz_target!(|data: &[u8]| {
    // TLV parsing must never panic on any input.
    let _ = Element::parse_all(data);
    let _ = Name::decode(data);
    let _ = Certificate::decode(data);
});
