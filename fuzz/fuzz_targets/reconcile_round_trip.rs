#![no_main]

use libfuzzer_sys::fuzz_target;
use markup::{TreeBuilderConfig, domify};
use vdom::snapshot::{LiveNode, assert_live_eq};
use vdom::{ArenaHost, VNode, apply_patch, diff, materialize};

fn parse(input: &str) -> Option<VNode<ArenaHost>> {
    domify(input, &TreeBuilderConfig::default()).ok().flatten()
}

// Input is two markup documents separated by a NUL byte. Patching the first
// towards the second must produce the same live tree as building the second.
fuzz_target!(|data: &[u8]| {
    let Ok(input) = std::str::from_utf8(data) else {
        return;
    };
    let Some((left, right)) = input.split_once('\0') else {
        return;
    };
    let (Some(current), Some(next)) = (parse(left), parse(right)) else {
        return;
    };

    let mut host = ArenaHost::new();
    let root = materialize(&mut host, &current).expect("materialize failed");
    let patched = apply_patch(&mut host, &root, &diff(&current, &next))
        .expect("apply failed")
        .expect("patched tree has no root");

    let mut fresh_host = ArenaHost::new();
    let fresh = materialize(&mut fresh_host, &next).expect("materialize failed");
    assert_live_eq(
        &LiveNode::capture(&fresh_host, &fresh),
        &LiveNode::capture(&host, &patched),
    );
});
