#![no_main]

use libfuzzer_sys::fuzz_target;
use queuehouse_core::Metadata;

fuzz_target!(|data: &[u8]| {
    // Fuzz the metadata document codec with arbitrary bytes.
    // Tests handling of:
    // - Malformed JSON
    // - Wrong top-level shapes (arrays, scalars)
    // - Huge or negative pointer values
    // - Half-present optional field pairs
    if let Ok(meta) = Metadata::decode(data) {
        // Anything that decodes must re-encode, and the re-encoded form
        // must decode to the same document.
        let blob = meta.encode().expect("decoded document must re-encode");
        let again = Metadata::decode(&blob).expect("re-encoded document must decode");
        assert_eq!(meta, again);
    }
});
