#![no_main]

use hubstore_core::core_store::TsHash;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if let Ok(ts_hash) = TsHash::from_bytes(data) {
        assert_eq!(ts_hash.as_bytes().as_slice(), data);
        assert_eq!(TsHash::new(ts_hash.timestamp(), &ts_hash.hash()), ts_hash);
    }
});
