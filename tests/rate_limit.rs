//! Rate limiter timing behavior under a paused clock: the two spec scenarios
//! (window-quota-bound and spacing-bound) plus the window invariant.

use std::sync::Arc;
use tailgate::RateLimiter;
use tokio::time::{Duration, Instant};

#[tokio::test(start_paused = true)]
async fn third_acquisition_waits_for_the_window_not_just_spacing() {
    // Two permits per one-second window, 500ms spacing. The third permit
    // waits for the first to age out of the window at t=1.0.
    let limiter = RateLimiter::new(2.0, 1);
    let start = Instant::now();

    limiter.acquire().await;
    let first = start.elapsed();
    limiter.acquire().await;
    let second = start.elapsed();
    limiter.acquire().await;
    let third = start.elapsed();

    assert_eq!(first, Duration::ZERO);
    assert_eq!(second, Duration::from_millis(500));
    assert_eq!(third, Duration::from_secs(1));
}

#[tokio::test(start_paused = true)]
async fn spacing_dominates_when_the_window_is_roomy() {
    // 10 req/s over 60s allows 600 in the window; ten back-to-back calls are
    // paced purely by the 100ms minimum interval.
    let limiter = RateLimiter::new(10.0, 60);
    let start = Instant::now();

    for _ in 0..10 {
        limiter.acquire().await;
    }

    let elapsed = start.elapsed();
    assert_eq!(elapsed, Duration::from_millis(900));

    let stats = limiter.stats().await;
    assert_eq!(stats.requests_in_window, 10);
    assert_eq!(stats.max_requests, 600);
    assert_eq!(stats.min_interval, Duration::from_millis(100));
}

#[tokio::test(start_paused = true)]
async fn no_trailing_window_holds_more_than_the_quota() {
    let rate = 3.0;
    let window_secs = 2;
    let max_in_window = (rate * window_secs as f64).floor() as usize;
    let limiter = RateLimiter::new(rate, window_secs);
    let window = Duration::from_secs(window_secs);

    let mut grants = Vec::new();
    for _ in 0..20 {
        limiter.acquire().await;
        grants.push(Instant::now());
    }

    // Slide a half-open window ending at each grant; it may contain at most
    // the quota.
    for (i, &end) in grants.iter().enumerate() {
        let in_window = grants[..=i]
            .iter()
            .filter(|&&t| end.duration_since(t) < window)
            .count();
        assert!(
            in_window <= max_in_window,
            "window ending at grant {i} holds {in_window} permits"
        );
    }
}

#[tokio::test(start_paused = true)]
async fn consecutive_grants_respect_minimum_spacing() {
    let limiter = RateLimiter::new(5.0, 60);
    let mut previous: Option<Instant> = None;

    for _ in 0..8 {
        limiter.acquire().await;
        let now = Instant::now();
        if let Some(prev) = previous {
            assert!(now.duration_since(prev) >= Duration::from_millis(200));
        }
        previous = Some(now);
    }
}

#[tokio::test(start_paused = true)]
async fn stats_snapshot_does_not_mutate() {
    let limiter = Arc::new(RateLimiter::new(2.0, 60));
    limiter.acquire().await;

    let before = limiter.stats().await;
    let after = limiter.stats().await;
    assert_eq!(before, after);

    limiter.acquire().await;
    assert_eq!(limiter.stats().await.requests_in_window, 2);
}
