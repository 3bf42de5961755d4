#![no_main]

use libfuzzer_sys::fuzz_target;
use markup::{TreeBuilderConfig, domify, tokenize};
use vdom::ArenaHost;

fuzz_target!(|data: &[u8]| {
    let Ok(input) = std::str::from_utf8(data) else {
        return;
    };
    let _ = tokenize(input);
    let _ = domify::<ArenaHost>(input, &TreeBuilderConfig::default());
});
