use harness_core::matcher::{match_interval_presence, match_multiset, match_presence};
use harness_core::{decode::decode_array, decode::decode_arrays, decode::decode_stream, FieldMask, Normalizer};
use proptest::prelude::*;
use serde_json::{json, Value};

fn record_strategy() -> impl Strategy<Value = Value> {
    (prop_oneof![Just("sh"), Just("date"), Just("sleep"), Just("nc")], 0u16..3).prop_map(|(comm, port)| {
        json!({ "comm": comm, "port": port })
    })
}

fn records(max: usize) -> impl Strategy<Value = Vec<Value>> {
    prop::collection::vec(record_strategy(), 0..=max)
}

proptest! {
    #[test]
    fn multiset_match_is_symmetric(a in records(5), e in records(5)) {
        prop_assert_eq!(match_multiset(&a, &e).is_ok(), match_multiset(&e, &a).is_ok());
    }

    #[test]
    fn multiset_match_is_reflexive_and_order_free(a in records(6)) {
        prop_assert!(match_multiset(&a, &a).is_ok());
        let mut reversed = a.clone();
        reversed.reverse();
        prop_assert!(match_multiset(&reversed, &a).is_ok());
    }

    #[test]
    fn extra_actual_records_never_break_presence(a in records(5), extra in records(5)) {
        let expected = a.clone();
        prop_assert!(match_presence(&a, &expected).is_ok());
        let mut noisy = extra.clone();
        noisy.extend(a.iter().cloned());
        noisy.extend(extra);
        prop_assert!(match_presence(&noisy, &expected).is_ok());
    }

    #[test]
    fn removing_the_sole_match_breaks_presence(a in records(5), target in record_strategy()) {
        let mut actual: Vec<Value> = a.into_iter().filter(|r| *r != target).collect();
        actual.push(target.clone());
        let expected = vec![target.clone()];
        prop_assert!(match_presence(&actual, &expected).is_ok());
        actual.retain(|r| *r != target);
        prop_assert!(match_presence(&actual, &expected).is_err());
    }

    #[test]
    fn empty_intervals_are_neutral(intervals in prop::collection::vec(records(3), 0..4),
                                   expected in records(3),
                                   at in 0usize..5) {
        let before = match_interval_presence(&intervals, &expected).is_ok();
        let mut padded = intervals.clone();
        let at = at.min(padded.len());
        padded.insert(at, Vec::new());
        prop_assert_eq!(before, match_interval_presence(&padded, &expected).is_ok());
    }

    #[test]
    fn one_interval_is_enough(noise in prop::collection::vec(records(3), 0..4),
                              target in record_strategy(),
                              at in 0usize..5) {
        let mut intervals: Vec<Vec<Value>> = noise;
        let at = at.min(intervals.len());
        intervals.insert(at, vec![target.clone()]);
        prop_assert!(match_interval_presence(&intervals, &[target]).is_ok());
    }

    #[test]
    fn field_mask_is_idempotent(pid in any::<u32>(), node in "[a-z]{0,8}", comm in "[a-z]{1,6}") {
        let mask = FieldMask::new(["/pid", "/k8s/node", "/missing"]);
        let mut once = json!({ "pid": pid, "comm": comm, "k8s": { "node": node } });
        mask.normalize(&mut once);
        let mut twice = once.clone();
        mask.normalize(&mut twice);
        prop_assert_eq!(once, twice);
    }
}

#[test]
fn invalid_json_is_a_decode_failure_in_every_mode() {
    let text = "{\"comm\": \"sh\"";
    assert!(decode_stream::<Value>(text).is_err());
    assert!(decode_array::<Value>(text).is_err());
    assert!(decode_arrays::<Value>(text).is_err());
}
