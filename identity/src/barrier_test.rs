use super::*;

#[test]
fn completes_after_all_sources() {
    let mut barrier = ResolutionBarrier::new();
    assert!(!barrier.report(Source::LocalFlags));
    assert!(!barrier.report(Source::CrossTab));
    assert!(!barrier.report(Source::Secondary));
    assert!(!barrier.is_complete());
    assert!(barrier.report(Source::Primary));
    assert!(barrier.is_complete());
}

#[test]
fn completion_fires_once() {
    let mut barrier = ResolutionBarrier::new();
    for source in Source::ALL {
        barrier.report(source);
    }
    assert!(barrier.is_complete());
    assert!(!barrier.report(Source::Primary));
    assert!(!barrier.short_circuit());
}

#[test]
fn repeated_report_does_not_complete() {
    let mut barrier = ResolutionBarrier::new();
    for _ in 0..5 {
        assert!(!barrier.report(Source::Primary));
    }
    assert_eq!(barrier.pending(), vec![Source::LocalFlags, Source::Secondary, Source::CrossTab]);
}

#[test]
fn short_circuit_completes_immediately() {
    let mut barrier = ResolutionBarrier::new();
    barrier.report(Source::LocalFlags);
    assert!(barrier.short_circuit());
    assert!(barrier.pending().is_empty());
}
