use proptest::prelude::*;
use ronlog_core::crdt::{MergeError, merge, scan_tombstones};
use ronlog_core::hash::{Digest, HashChain};
use ronlog_core::op::{Cursor, Frame, Op, Term, Uuid};
use std::collections::HashMap;

use generators::*;

fn merge_texts<S: AsRef<str>>(frames: &[S]) -> Result<Frame, MergeError> {
    merge(frames.iter().map(|f| Cursor::new(f.as_ref())))
}

/// Sort by id, with raw ops in the reduced form merge emits.
fn sorted_by_id(mut ops: Vec<Op>) -> Vec<Op> {
    for op in &mut ops {
        if op.term == Term::Raw {
            op.term = Term::Reduced;
        }
    }
    ops.sort_by_key(|op| op.id);
    ops
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(512))]

    #[test]
    fn merge_ignores_input_order((_, frames) in arb_partitioned_tree(), turn in 0usize..4) {
        let out = merge_texts(&frames).expect("closed input merges");

        let mut reversed = frames.clone();
        reversed.reverse();
        prop_assert_eq!(&merge_texts(&reversed).expect("merge"), &out);

        let mut rotated = frames.clone();
        rotated.rotate_left(turn % frames.len());
        prop_assert_eq!(&merge_texts(&rotated).expect("merge"), &out);
    }

    #[test]
    fn merge_is_idempotent((_, frames) in arb_partitioned_tree()) {
        let out = merge_texts(&frames).expect("merge");
        prop_assert_eq!(&merge_texts(&[out.as_str()]).expect("merge"), &out);
        prop_assert_eq!(&merge_texts(&[out.as_str(), out.as_str()]).expect("merge"), &out);

        let mut with_output = frames.clone();
        with_output.push(out.as_str().to_string());
        prop_assert_eq!(&merge_texts(&with_output).expect("merge"), &out);
    }

    #[test]
    fn merging_a_merged_prefix_converges(ops in arb_tree(), cut in any::<prop::sample::Index>()) {
        let all = Frame::from_ops(&ops);
        let whole = merge([all.cursor()]).expect("merge");

        let k = cut.index(ops.len() + 1);
        let head = merge([Frame::from_ops(&ops[..k]).cursor()]).expect("prefix is closed");
        let tail = Frame::from_ops(&ops[k..]);
        prop_assert_eq!(merge([head.cursor(), tail.cursor()]).expect("merge"), whole);
    }

    #[test]
    fn merge_keeps_every_op_once((ops, frames) in arb_partitioned_tree()) {
        let out = merge_texts(&frames).expect("merge");
        let merged = out.ops().expect("merged frame decodes");
        prop_assert_eq!(sorted_by_id(merged.clone()), sorted_by_id(ops));

        // parents come before children
        let mut seen: HashMap<Uuid, usize> = HashMap::new();
        for (i, op) in merged.iter().enumerate() {
            if !op.is_root() {
                prop_assert!(seen.contains_key(&op.ref_id), "{} before its parent", op.id);
            }
            seen.insert(op.id, i);
        }
    }

    #[test]
    fn scan_marks_root_and_markers((ops, frames) in arb_partitioned_tree()) {
        let out = merge_texts(&frames).expect("merge");
        let bits = scan_tombstones(&out).expect("merged frame scans");
        prop_assert_eq!(bits.len(), ops.len());
        prop_assert!(bits[0]);
        for (op, tomb) in out.ops().expect("ops").iter().zip(&bits) {
            if op.term == Term::Marker {
                prop_assert!(*tomb);
            }
        }
    }

    #[test]
    fn digests_depend_only_on_ancestry(ops in arb_tree()) {
        let chain = HashChain::for_object(&root_id(), &ronlog_core::crdt::RGA, Default::default());
        let source = Frame::from_ops(&ops);
        let merged = merge([source.cursor()]).expect("merge");

        let by_id = |frame: &Frame| -> HashMap<Uuid, Digest> {
            let ids = frame.ops().expect("ops").into_iter().map(|op| op.id);
            ids.zip(chain.hash_frame(frame).expect("hash")).collect()
        };
        prop_assert_eq!(by_id(&source), by_id(&merged));
    }

    #[test]
    fn digest_text_round_trips(bytes in any::<[u8; 32]>()) {
        let digest = Digest::from_bytes(bytes);
        prop_assert_eq!(Digest::from_text(&digest.to_hex()).expect("hex"), digest);
        prop_assert_eq!(Digest::from_text(&digest.to_base64()).expect("base64"), digest);
    }
}
