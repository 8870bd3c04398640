//! Example: Strict async compliance on spies
//!
//! This example walks through the lifecycle of a strict spy: enabling
//! tracking, reading the history, resetting it, restoring the spy and
//! finally restoring every spy at once through the process-wide registry.

use testkit_compliance::prelude::*;

fn main() {
    println!("🧰 testkit-compliance - Strict Spies\n");

    example_enable_and_read();
    example_reset();
    example_restore();
    example_global_restore();

    println!("\n✅ All strict spy examples completed!");
}

/// A fake returning either a deferred or an inline-settling thenable.
fn deferred_or_inline(queue: &MicrotaskQueue) -> StrictSpy<MockFn<bool, Option<Box<dyn Thenable>>>> {
    let spy = StrictSpy::install_in(MockFn::new(), &Registry::new());
    let queue = queue.clone();
    spy.enable_strict_async_compliance()
        .mock_implementation(move |deferred| {
            let value: Box<dyn Thenable> = if deferred {
                Box::new(Promise::resolved(&queue, "later"))
            } else {
                Box::new(Immediate::fulfilled())
            };
            Some(value)
        });
    spy
}

/// Enabling tracking and reading the history
fn example_enable_and_read() {
    println!("📌 Example 1: Enable and Read");
    println!("   Each returned thenable is classified once it settles\n");

    let queue = MicrotaskQueue::new();
    let spy = deferred_or_inline(&queue);

    let _ = spy.call(true);
    let _ = spy.call(false);
    println!("   History before draining the queue: {:?}", spy.async_compliance());

    queue.run_until_idle();
    println!("   History after draining the queue:  {:?}", spy.async_compliance());
    println!("   (the inline thenable settled first, so it is recorded first)\n");
}

/// Resetting keeps tracking enabled
fn example_reset() {
    println!("📌 Example 2: Reset");
    println!("   Clears the history, tracking stays on\n");

    let queue = MicrotaskQueue::new();
    let spy = deferred_or_inline(&queue);

    let _ = spy.call(false);
    println!("   Before reset: {:?}", spy.async_compliance());

    spy.reset_async_compliance();
    let _ = spy.call(true);
    queue.run_until_idle();
    println!("   After reset and one deferred call: {:?}", spy.async_compliance());
    println!("   Tracking enabled: {}\n", spy.tracker().is_enabled());
}

/// Restoring disables tracking until it is enabled again
fn example_restore() {
    println!("📌 Example 3: Restore");
    println!("   Disables tracking, re-enabling starts from an empty history\n");

    let queue = MicrotaskQueue::new();
    let spy = deferred_or_inline(&queue);

    let _ = spy.call(false);
    spy.restore_async_compliance();
    let _ = spy.call(false);
    println!("   While restored: {:?}", spy.async_compliance());

    spy.enable_strict_async_compliance();
    let _ = spy.call(true);
    queue.run_until_idle();
    println!("   After re-enabling: {:?}\n", spy.async_compliance());
}

/// Restoring every spy in the process-wide registry
fn example_global_restore() {
    println!("📌 Example 4: Global Restore");
    println!("   One call restores every globally registered spy\n");

    let first = StrictSpy::install(FluentSpy::<(), Option<Immediate>>::new());
    let second = StrictSpy::install(MockFn::<(), Option<Immediate>>::new());
    first
        .enable_strict_async_compliance()
        .and()
        .return_value(Some(Immediate::rejected()));
    second
        .enable_strict_async_compliance()
        .mock_return_value(Some(Immediate::fulfilled()));

    let _ = first.call(());
    let _ = second.call(());
    println!("   Registered spies: {}", Registry::global().len());
    println!("   Histories: {:?} {:?}", first.async_compliance(), second.async_compliance());

    global_restore_async_compliance();
    println!("   After global restore:");
    println!("      Registered spies: {}", Registry::global().len());
    println!(
        "      Tracking enabled: {} {}",
        first.tracker().is_enabled(),
        second.tracker().is_enabled()
    );
    println!();
}
