#![no_main]

use libfuzzer_sys::fuzz_target;
use ronlog_core::crdt::{merge, scan_tombstones};
use ronlog_core::op::Cursor;

fuzz_target!(|data: &[u8]| {
    let Ok(text) = std::str::from_utf8(data) else {
        return;
    };

    // Split the input into frames on NUL; merge must never panic.
    let inputs: Vec<&str> = text.split('\0').collect();
    let Ok(out) = merge(inputs.iter().map(|s| Cursor::new(s))) else {
        return;
    };

    let again = merge([out.cursor()]).expect("merged output re-merges");
    assert_eq!(again, out);
    let _ = scan_tombstones(&out);
});
