#![no_main]

use hubstore_core::core_store::Message;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    // Stored bytes are untrusted after a crash or a bad sync
    if let Ok(message) = Message::decode(data) {
        let _ = message.ts_hash();
        let _ = message.data.encode();
        if let Ok(bytes) = message.encode() {
            assert!(Message::decode(&bytes).is_ok());
        }
    }
});
