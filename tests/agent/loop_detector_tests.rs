// Loop detector tests - verdict thresholds and their priority

use parley_core::agent::{LoopAction, LoopDetector};
use serde_json::json;

#[test]
fn fresh_detector_continues() {
    let detector = LoopDetector::new(5);
    let verdict = detector.check();
    assert_eq!(verdict.action, LoopAction::Continue);
    assert!(!verdict.reason.is_empty());
    assert_eq!(detector.total_calls(), 0);
}

#[test]
fn varied_calls_with_varied_results_make_progress() {
    let mut detector = LoopDetector::new(10);
    for page in 0..6 {
        detector.record_call("read_page", &json!({"page": page}), &format!("page {page} body"));
        assert_eq!(detector.check().action, LoopAction::Continue);
    }
    assert_eq!(detector.total_calls(), 6);
}

#[test]
fn argument_key_order_does_not_change_the_signature() {
    let mut detector = LoopDetector::new(10);
    for i in 0..3 {
        let args = if i % 2 == 0 {
            json!({"q": "rust", "limit": 5})
        } else {
            json!({"limit": 5, "q": "rust"})
        };
        detector.record_call("search", &args, &format!("hit {i}"));
    }
    assert_eq!(detector.check().action, LoopAction::Warn);
}

#[test]
fn repeated_call_outranks_no_progress() {
    let mut detector = LoopDetector::new(10);
    for _ in 0..3 {
        detector.record_call("status", &json!({}), "idle");
    }
    // both signatures are at three; the repeat warning is reported first
    let verdict = detector.check();
    assert_eq!(verdict.action, LoopAction::Warn);
    assert!(verdict.reason.contains("identical arguments"));
}

#[test]
fn global_limit_breaks_even_with_progress() {
    let mut detector = LoopDetector::new(3);
    for i in 0..6 {
        detector.record_call("step", &json!({"i": i}), &format!("result {i}"));
    }
    let verdict = detector.check();
    assert_eq!(verdict.action, LoopAction::Break);
    assert!(verdict.reason.contains("limit of 6"));
}

#[test]
fn reset_allows_reuse() {
    let mut detector = LoopDetector::new(2);
    for _ in 0..4 {
        detector.record_call("x", &json!({}), "same");
    }
    assert_eq!(detector.check().action, LoopAction::Break);

    detector.reset();
    detector.record_call("x", &json!({}), "same");
    assert_eq!(detector.check().action, LoopAction::Continue);
}
