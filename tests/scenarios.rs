// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! End-to-end scenarios exercised against the public API, each run against
//! both engine configurations so a glitch-freedom or minimality assertion
//! failing under the parallel engine but not the sequential one is caught
//! here rather than only in a unit test that only ever builds the
//! sequential domain.

use std::sync::{Arc, Mutex};

use dagflow::config::DomainConfig;
use dagflow::domain::{Domain, TransactionOutcome};
use dagflow::TransactionMode;

fn configs() -> Vec<DomainConfig> {
    vec![DomainConfig::sequential(), DomainConfig::parallel()]
}

#[test]
fn area_scenario_recomputes_on_width_change() {
    for config in configs() {
        let domain = Domain::new(config);
        let width = domain.var(1i64);
        let height = domain.var(2i64);
        let area = width.as_signal() * height.as_signal();
        assert_eq!(area.get(), 2);

        domain.transaction(TransactionMode::Sync, move |txn| {
            width.set(txn, 10);
        });
        assert_eq!(area.get(), 20);
    }
}

#[test]
fn diamond_scenario_ticks_the_shared_descendant_once() {
    for config in configs() {
        let domain = Domain::new(config);
        let a = domain.var(0i64);
        let b = domain.signal(&[a.id()], {
            let a = a.as_signal();
            move || a.get() + 1
        });
        let c = domain.signal(&[a.id()], {
            let a = a.as_signal();
            move || a.get() + 2
        });
        let d = &b + &c;
        assert_eq!(d.get(), 3);

        let outcome = domain.transaction(TransactionMode::Sync, move |txn| {
            a.set(txn, 10);
        });
        assert_eq!(d.get(), 23);

        match outcome {
            TransactionOutcome::Report(Ok(report)) => assert_eq!(report.nodes_ticked, 4),
            _ => panic!("expected a synchronous report"),
        }
    }
}

#[test]
fn merge_scenario_observer_sees_both_sources_in_one_commit() {
    for config in configs() {
        let domain = Domain::new(config);
        let left = domain.event_source::<i32>();
        let right = domain.event_source::<i32>();
        let merged = dagflow::merge(&[left.as_stream(), right.as_stream()]);

        let seen = Arc::new(Mutex::new(Vec::new()));
        let seen_in_callback = seen.clone();
        let _observer = domain.observe_events(&merged, move |events| {
            seen_in_callback.lock().unwrap().extend_from_slice(events);
        });

        domain.transaction(TransactionMode::Sync, move |txn| {
            left.emit(txn, 1);
            right.emit(txn, 2);
        });

        let mut observed = seen.lock().unwrap().clone();
        observed.sort();
        assert_eq!(observed, vec![1, 2]);
    }
}

#[test]
fn dynamic_switch_scenario_detaches_the_inactive_branch() {
    for config in configs() {
        let domain = Domain::new(config);
        let sel = domain.var(true);
        let a = domain.var(1i64);
        let b = domain.var(100i64);

        let out = domain.switch(&sel.as_signal(), &a.as_signal(), &b.as_signal(), |s| *s);
        assert_eq!(out.get(), 1);

        domain.transaction(TransactionMode::Sync, move |txn| {
            b.set(txn, 200);
        });
        assert_eq!(out.get(), 1, "b is not attached while sel selects a");

        domain.transaction(TransactionMode::Sync, move |txn| {
            sel.set(txn, false);
        });
        assert_eq!(out.get(), 200, "switching sel attaches b's already-updated value");

        domain.transaction(TransactionMode::Sync, move |txn| {
            a.set(txn, 999);
        });
        assert_eq!(out.get(), 200, "a is now detached and must not reach out");
    }
}

#[test]
fn setting_a_variable_to_its_current_value_ticks_nothing() {
    for config in configs() {
        let domain = Domain::new(config);
        let count = domain.var(5i64);
        let doubled = domain.signal(&[count.id()], {
            let count = count.as_signal();
            move || count.get() * 2
        });
        assert_eq!(doubled.get(), 10);

        let outcome = domain.transaction(TransactionMode::Sync, move |txn| {
            count.set(txn, 5);
        });
        match outcome {
            TransactionOutcome::Report(Ok(report)) => assert_eq!(report.nodes_ticked, 0),
            _ => panic!("expected a synchronous report"),
        }
        assert_eq!(doubled.get(), 10);
    }
}

#[test]
fn emitting_into_an_event_source_with_no_successors_is_a_no_op() {
    for config in configs() {
        let domain = Domain::new(config);
        let clicks = domain.event_source::<i32>();
        let outcome = domain.transaction(TransactionMode::Sync, move |txn| {
            clicks.emit(txn, 42);
        });
        match outcome {
            TransactionOutcome::Report(Ok(report)) => assert!(report.is_ok()),
            _ => panic!("expected a synchronous report"),
        }
    }
}

#[tokio::test]
async fn async_transaction_reports_commit_without_blocking_the_caller() {
    let domain = Domain::new(DomainConfig::sequential());
    let counter = domain.var(0i64);
    let signal = counter.as_signal();

    let outcome = domain.transaction(TransactionMode::Async, move |txn| {
        counter.set(txn, 7);
    });
    let handle = match outcome {
        TransactionOutcome::Handle(handle) => handle,
        _ => panic!("expected an async handle"),
    };
    let report = handle.wait().await.expect("uncancelled handle resolves");
    assert!(report.is_ok());
    assert_eq!(signal.get(), 7);
}

#[test]
fn callback_failure_leaves_the_signal_at_its_prior_value() {
    for config in configs() {
        let domain = Domain::new(config);
        let divisor = domain.var(1i64);
        let quotient = domain.signal(&[divisor.id()], {
            let divisor = divisor.as_signal();
            move || 100 / divisor.get()
        });
        assert_eq!(quotient.get(), 100);

        let outcome = domain.transaction(TransactionMode::Sync, move |txn| {
            divisor.set(txn, 0);
        });
        match outcome {
            TransactionOutcome::Report(Ok(report)) => assert_eq!(report.failures.len(), 1),
            _ => panic!("expected a synchronous report"),
        }
        assert_eq!(quotient.get(), 100, "a failed recompute keeps the prior value");
    }
}
