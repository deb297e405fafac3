//! Stored presence documents from arbitrary JSON never panic validation,
//! and every accepted record has an in-range coordinate.

#![no_main]

use libfuzzer_sys::fuzz_target;

use ohhey_core::{PresenceRecord, StoredPresence, UserId};

fuzz_target!(|data: &[u8]| {
    let Ok(doc) = serde_json::from_slice::<StoredPresence>(data) else {
        return;
    };

    if let Ok(record) = PresenceRecord::from_stored(UserId::new("fuzz"), &doc) {
        assert!(record.position.coord().check().is_ok());
        assert!(record.position.accuracy.is_finite());
        assert!(record.position.accuracy >= 0.0);
    }
});
