#![no_main]

use libfuzzer_sys::fuzz_target;
use ronlog_core::op::{Builder, Cursor, Frame};

fuzz_target!(|data: &[u8]| {
    let Ok(text) = std::str::from_utf8(data) else {
        return;
    };

    let mut cursor = Cursor::new(text);
    let mut builder = Builder::new();
    if builder.append_all(&mut cursor).is_err() {
        return;
    }

    // Whatever decodes must re-encode to text that decodes to the same ops.
    let frame = builder.into_frame();
    let ops = frame.ops().expect("re-encoded frame decodes");
    let again = Frame::from_ops(&ops);
    assert_eq!(again.ops().expect("decodes"), ops);
});
