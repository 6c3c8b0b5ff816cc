mod support;

use support::make_event;
use varsel_reporter::sampling::{EventSampler, RandomSampler};

#[test]
fn test_half_rate_sampler_sends_roughly_half() {
    let sampler = RandomSampler::with_seed(0.5, 42);
    let event = make_event("sampled workload");

    let sent = (0..10_000)
        .filter(|_| sampler.should_send(&event))
        .count();

    // 45% to 55% of 10k draws at a 0.5 rate.
    assert!(
        (4_500..=5_500).contains(&sent),
        "sent {sent} of 10000 events at rate 0.5"
    );
}

#[test]
fn test_zero_rate_sends_nothing() {
    let sampler = RandomSampler::with_seed(0.0, 7);
    let event = make_event("never sent");

    assert!((0..1_000).all(|_| !sampler.should_send(&event)));
}

#[test]
fn test_full_rate_sends_everything() {
    let sampler = RandomSampler::with_seed(1.0, 7);
    let event = make_event("always sent");

    assert!((0..1_000).all(|_| sampler.should_send(&event)));
}

#[test]
fn test_sampler_works_as_a_trait_object() {
    let sampler: Box<dyn EventSampler> = Box::new(RandomSampler::with_seed(1.0, 1));
    assert!(sampler.should_send(&make_event("boxed")));
}
