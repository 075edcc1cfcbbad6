use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::thread;
use std::time::Duration;

use gzshard_core::{CompressedBlock, ShardError, SlotBuffer};

fn block(id: usize) -> CompressedBlock {
    CompressedBlock::new(id, vec![id as u8; 4], 4)
}

#[test]
fn drains_in_insertion_order_not_index_order() -> Result<(), Box<dyn std::error::Error>> {
    let slots = SlotBuffer::new(4);
    for id in [2, 0, 1] {
        slots.push(block(id))?;
    }
    slots.mark_exhausted();

    let mut drained = Vec::new();
    while let Some(next) = slots.pop()? {
        drained.push(next.id);
    }
    assert_eq!(drained, vec![2, 0, 1]);
    Ok(())
}

#[test]
fn pointers_wrap_around_the_ring() -> Result<(), Box<dyn std::error::Error>> {
    let slots = SlotBuffer::new(3);
    for id in 0..10 {
        slots.push(block(id))?;
        let popped = slots.pop()?.ok_or("ring unexpectedly empty")?;
        assert_eq!(popped.id, id);
        assert_eq!(slots.occupancy(), 0);
    }
    Ok(())
}

#[test]
fn push_waits_for_free_slot() -> Result<(), Box<dyn std::error::Error>> {
    let slots = Arc::new(SlotBuffer::new(2));
    slots.push(block(0))?;
    slots.push(block(1))?;

    let inserted = Arc::new(AtomicBool::new(false));
    let producer = {
        let slots = Arc::clone(&slots);
        let inserted = Arc::clone(&inserted);
        thread::spawn(move || {
            let result = slots.push(block(2));
            inserted.store(true, Ordering::Release);
            result
        })
    };

    thread::sleep(Duration::from_millis(50));
    assert!(!inserted.load(Ordering::Acquire), "push must wait while full");
    assert_eq!(slots.occupancy(), 2);

    assert_eq!(slots.pop()?.map(|b| b.id), Some(0));
    producer.join().map_err(|_| "producer panicked")??;
    assert!(inserted.load(Ordering::Acquire));
    assert_eq!(slots.occupancy(), 2);
    Ok(())
}

#[test]
fn pop_returns_none_once_exhausted_and_empty() -> Result<(), Box<dyn std::error::Error>> {
    let slots = Arc::new(SlotBuffer::new(2));
    let consumer = {
        let slots = Arc::clone(&slots);
        thread::spawn(move || slots.pop())
    };

    thread::sleep(Duration::from_millis(20));
    slots.mark_exhausted();
    let popped = consumer.join().map_err(|_| "consumer panicked")??;
    assert!(popped.is_none());
    assert!(slots.is_exhausted());

    assert!(matches!(slots.push(block(0)), Err(ShardError::Aborted(_))));
    Ok(())
}

#[test]
fn abort_wakes_every_waiter() -> Result<(), Box<dyn std::error::Error>> {
    let full = Arc::new(SlotBuffer::new(2));
    full.push(block(0))?;
    full.push(block(1))?;
    let empty = Arc::new(SlotBuffer::new(2));

    let pusher = {
        let full = Arc::clone(&full);
        thread::spawn(move || full.push(block(2)))
    };
    let throttled = {
        let full = Arc::clone(&full);
        thread::spawn(move || full.wait_until_below(1))
    };
    let popper = {
        let empty = Arc::clone(&empty);
        thread::spawn(move || empty.pop())
    };

    thread::sleep(Duration::from_millis(30));
    full.abort();
    empty.abort();

    assert!(matches!(
        pusher.join().map_err(|_| "pusher panicked")?,
        Err(ShardError::Aborted(_))
    ));
    assert!(matches!(
        throttled.join().map_err(|_| "throttle panicked")?,
        Err(ShardError::Aborted(_))
    ));
    assert!(matches!(
        popper.join().map_err(|_| "popper panicked")?,
        Err(ShardError::Aborted(_))
    ));
    assert!(full.is_aborted());
    assert_eq!(full.occupancy(), 0);
    Ok(())
}

#[test]
fn wait_until_below_returns_after_drain() -> Result<(), Box<dyn std::error::Error>> {
    let slots = Arc::new(SlotBuffer::new(4));
    for id in 0..3 {
        slots.push(block(id))?;
    }

    let waiter = {
        let slots = Arc::clone(&slots);
        thread::spawn(move || slots.wait_until_below(2))
    };
    thread::sleep(Duration::from_millis(20));
    slots.pop()?;
    slots.pop()?;
    waiter.join().map_err(|_| "waiter panicked")??;
    assert!(slots.occupancy() < 2);
    Ok(())
}

#[test]
fn occupancy_never_exceeds_capacity() -> Result<(), Box<dyn std::error::Error>> {
    let capacity = 3;
    let slots = Arc::new(SlotBuffer::new(capacity));
    let sampled_max = Arc::new(AtomicUsize::new(0));
    let done = Arc::new(AtomicBool::new(false));

    let producers: Vec<_> = (0..4)
        .map(|producer| {
            let slots = Arc::clone(&slots);
            thread::spawn(move || -> gzshard_core::Result<()> {
                for offset in 0..25 {
                    slots.push(block(producer * 100 + offset))?;
                }
                Ok(())
            })
        })
        .collect();

    // Each read of `occupancy` is a single locked load.
    let sampler = {
        let slots = Arc::clone(&slots);
        let sampled_max = Arc::clone(&sampled_max);
        let done = Arc::clone(&done);
        thread::spawn(move || {
            while !done.load(Ordering::Acquire) {
                sampled_max.fetch_max(slots.occupancy(), Ordering::AcqRel);
                thread::yield_now();
            }
        })
    };

    let consumer = {
        let slots = Arc::clone(&slots);
        thread::spawn(move || -> gzshard_core::Result<usize> {
            let mut drained = 0;
            while let Some(_block) = slots.pop()? {
                drained += 1;
            }
            Ok(drained)
        })
    };

    for producer in producers {
        producer.join().map_err(|_| "producer panicked")??;
    }
    slots.mark_exhausted();
    let drained = consumer.join().map_err(|_| "consumer panicked")??;
    done.store(true, Ordering::Release);
    sampler.join().map_err(|_| "sampler panicked")?;

    assert_eq!(drained, 100);
    assert!(sampled_max.load(Ordering::Acquire) <= capacity);
    let high_water = slots.high_water_mark();
    assert!((1..=capacity).contains(&high_water), "high water {high_water}");
    Ok(())
}

#[test]
fn high_water_mark_tracks_peak_not_current() -> Result<(), Box<dyn std::error::Error>> {
    let slots = SlotBuffer::new(4);
    assert_eq!(slots.high_water_mark(), 0);
    for id in 0..3 {
        slots.push(block(id))?;
    }
    slots.pop()?;
    slots.pop()?;
    assert_eq!(slots.occupancy(), 1);
    assert_eq!(slots.high_water_mark(), 3);
    Ok(())
}
