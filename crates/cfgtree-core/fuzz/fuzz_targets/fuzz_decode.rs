#![no_main]
use cfgtree_core::table::{Table, decode};
use cfgtree_core::test_utils::Item;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    // Feed arbitrary text to the codec.
    // Must not panic -- returning Err is fine.
    let Ok(text) = std::str::from_utf8(data) else {
        return;
    };
    let _ = decode::<i32, Item>(text);
    let _ = decode::<String, serde_json::Value>(text);
    let _ = decode::<u8, Table<char, bool>>(text);
});
