mod common;

use std::sync::Arc;

use common::{dyn_limiter, StaticLimiter};
use rate_guard_discard::{chain, chain_with_names, ChainBuilder, Limiter, LimiterChain, NamedLimiter};

fn same(a: &Arc<dyn Limiter>, b: &Arc<dyn Limiter>) -> bool {
    Arc::ptr_eq(a, b)
}

#[test]
fn empty_input_should_yield_empty_chain() {
    let limiters = chain(Vec::<Option<Arc<dyn Limiter>>>::new());
    assert!(limiters.is_empty());
    assert_eq!(limiters.len(), 0);
}

#[test]
fn absent_entries_should_be_filtered_in_order() {
    let a = dyn_limiter(&StaticLimiter::granting());
    let b = dyn_limiter(&StaticLimiter::granting());

    let limiters = chain([Some(a.clone()), None, Some(b.clone()), None]);

    let kept: Vec<_> = limiters.iter().collect();
    assert_eq!(kept.len(), 2);
    assert!(same(kept[0], &a));
    assert!(same(kept[1], &b));
}

#[test]
fn all_absent_should_yield_empty_chain() {
    let limiters = chain([None, None, None]);
    assert!(limiters.is_empty());
}

#[test]
fn unnamed_entries_have_no_name() {
    let limiters = chain([Some(dyn_limiter(&StaticLimiter::granting()))]);
    assert_eq!(limiters.entries()[0].name(), None);
}

#[test]
fn chain_collects_from_iterator() {
    let limiters: LimiterChain = (0..3)
        .map(|_| dyn_limiter(&StaticLimiter::granting()))
        .collect();
    assert_eq!(limiters.len(), 3);
}

#[test]
fn chain_with_names_should_drop_absent_and_keep_labels() {
    let first = dyn_limiter(&StaticLimiter::granting());
    let second = dyn_limiter(&StaticLimiter::granting());
    let third = dyn_limiter(&StaticLimiter::granting());

    let limiters = chain_with_names(vec![
        NamedLimiter::new("first", Some(first.clone())),
        NamedLimiter::new("second", Some(second)),
        NamedLimiter::new("nil", None),
        NamedLimiter::new("third", Some(third.clone())),
    ]);

    assert_eq!(limiters.len(), 3);
    let names: Vec<_> = limiters.entries().iter().map(|e| e.name()).collect();
    assert_eq!(names, vec![Some("first"), Some("second"), Some("third")]);
    assert!(same(limiters.entries()[0].limiter(), &first));
    assert!(same(limiters.entries()[2].limiter(), &third));
}

#[test]
fn builder_should_keep_present_limiters_and_names() {
    let l1 = dyn_limiter(&StaticLimiter::granting());
    let l2 = dyn_limiter(&StaticLimiter::granting());

    let (limiters, names) = ChainBuilder::new()
        .add("x", Some(l1.clone()))
        .add("y", None)
        .add("z", Some(l2.clone()))
        .build_with_names();

    assert_eq!(limiters.len(), 2);
    assert!(same(limiters.entries()[0].limiter(), &l1));
    assert!(same(limiters.entries()[1].limiter(), &l2));
    assert_eq!(names, vec!["x".to_string(), "z".to_string()]);
}

#[test]
fn builder_build_should_match_build_with_names() {
    let global = dyn_limiter(&StaticLimiter::granting());
    let service = dyn_limiter(&StaticLimiter::granting());
    let user = dyn_limiter(&StaticLimiter::granting());

    let limiters = ChainBuilder::new()
        .add("global", Some(global))
        .add("service", Some(service))
        .add("user", Some(user))
        .build();

    assert_eq!(limiters.len(), 3);
    assert_eq!(limiters.entries()[1].name(), Some("service"));
}

#[test]
fn empty_builder_should_yield_empty_chain() {
    let (limiters, names) = ChainBuilder::new().build_with_names();
    assert!(limiters.is_empty());
    assert!(names.is_empty());
}
