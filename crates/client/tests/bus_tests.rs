use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use farmstead_client::TaskChangeBus;

#[test]
fn emit_reaches_every_subscriber() {
    let bus = TaskChangeBus::new();
    let first = Arc::new(AtomicUsize::new(0));
    let second = Arc::new(AtomicUsize::new(0));

    let _a = bus.subscribe({
        let first = first.clone();
        move || {
            first.fetch_add(1, Ordering::SeqCst);
        }
    });
    let _b = bus.subscribe({
        let second = second.clone();
        move || {
            second.fetch_add(1, Ordering::SeqCst);
        }
    });

    bus.emit();
    bus.emit();

    assert_eq!(first.load(Ordering::SeqCst), 2);
    assert_eq!(second.load(Ordering::SeqCst), 2);
}

#[test]
fn clones_share_one_listener_registry() {
    let bus = TaskChangeBus::new();
    let hits = Arc::new(AtomicUsize::new(0));

    let _sub = bus.subscribe({
        let hits = hits.clone();
        move || {
            hits.fetch_add(1, Ordering::SeqCst);
        }
    });

    let clone = bus.clone();
    clone.emit();

    assert_eq!(hits.load(Ordering::SeqCst), 1);
    assert_eq!(clone.listener_count(), 1);
}

#[test]
fn dropping_the_subscription_unsubscribes() {
    let bus = TaskChangeBus::new();
    let hits = Arc::new(AtomicUsize::new(0));

    let sub = bus.subscribe({
        let hits = hits.clone();
        move || {
            hits.fetch_add(1, Ordering::SeqCst);
        }
    });
    bus.emit();
    drop(sub);
    bus.emit();

    assert_eq!(hits.load(Ordering::SeqCst), 1);
    assert_eq!(bus.listener_count(), 0);
}

#[test]
fn panicking_listener_does_not_stop_fan_out() {
    let bus = TaskChangeBus::new();
    let survivors = Arc::new(AtomicUsize::new(0));

    let _bad = bus.subscribe(|| panic!("listener blew up"));
    let _good_a = bus.subscribe({
        let survivors = survivors.clone();
        move || {
            survivors.fetch_add(1, Ordering::SeqCst);
        }
    });
    let _good_b = bus.subscribe({
        let survivors = survivors.clone();
        move || {
            survivors.fetch_add(1, Ordering::SeqCst);
        }
    });

    bus.emit();

    assert_eq!(survivors.load(Ordering::SeqCst), 2);
}

#[test]
fn listener_can_touch_the_bus_during_fan_out() {
    // The registry lock is released before callbacks run, so a listener may
    // touch the bus without deadlocking.
    let bus = TaskChangeBus::new();
    let inner = bus.clone();
    let _sub = bus.subscribe(move || {
        let _ = inner.listener_count();
    });

    bus.emit();
}
