// Kept in its own test binary: the panic hook is process-global and would
// hide panic output from tests running in parallel.
#[cfg(test)]
mod tests {
    use concurrent_runner::{errors::Failure, run_flatten, run_settled};
    use std::num::NonZeroUsize;

    fn n(workers: usize) -> NonZeroUsize {
        NonZeroUsize::new(workers).unwrap()
    }

    #[tokio::test]
    async fn test_panics_fail_only_that_worker() {
        println!("\n=== TEST: panics ===");
        let previous_hook = std::panic::take_hook();
        std::panic::set_hook(Box::new(|_| {}));

        // Panic while building the unit
        let records = run_settled(
            n(3),
            |i: u32| {
                if i == 5 {
                    panic!("factory boom");
                }
                async move { Ok::<_, ()>(i) }
            },
            0..50u32,
        )
        .await;
        let failures: Vec<_> = records.iter().filter_map(|r| r.reason()).collect();
        assert_eq!(failures, vec![&Failure::Panicked("factory boom".to_string())]);
        let total: usize = records.iter().filter_map(|r| r.value()).map(Vec::len).sum();
        assert!(total <= 49);

        // Panic inside the unit
        let err = run_flatten(
            n(2),
            |i: u32| async move {
                if i == 3 {
                    panic!("unit boom {}", i);
                }
                Ok::<_, &'static str>(i)
            },
            0..10u32,
        )
        .await
        .unwrap_err();
        assert!(err.is_panic());
        assert_eq!(err.to_string(), "panicked: unit boom 3");

        // Panic inside the source
        let source = (0..10u32).map(|i| {
            if i == 4 {
                panic!("source boom");
            }
            i
        });
        let records = run_settled(n(3), |i: u32| async move { Ok::<_, ()>(i) }, source).await;
        assert_eq!(records.iter().filter(|r| r.is_rejected()).count(), 1);
        // The worker that hit the panic loses what it had gathered.
        let total: usize = records.iter().filter_map(|r| r.value()).map(Vec::len).sum();
        assert!(total <= 4);

        std::panic::set_hook(previous_hook);
    }
}
