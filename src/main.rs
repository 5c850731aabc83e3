use concurrent_runner::ConcurrentRunner;
use std::{error::Error, num::NonZeroUsize, time::Instant};
use tokio::runtime::Builder;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};


fn main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(fmt::layer())
        .init();

    let rt = Builder::new_multi_thread()
        .enable_all()
        .build()?;

    rt.block_on(async {
        let workers = NonZeroUsize::new(3).ok_or("zero workers")?;
        let runner = ConcurrentRunner::new(workers);
        let source = || (0..100u64).map(|i| i.to_string());
        let parse = |arg: String| async move { arg.parse::<u64>() };

        let now = Instant::now();
        let per_worker = runner.collect_all(parse, source()).await?;
        let lengths: Vec<_> = per_worker.iter().map(Vec::len).collect();
        let sum: u64 = per_worker.iter().flatten().sum();
        println!("collect_all: lengths {:?}, sum {}", lengths, sum);

        let flat = runner.flatten(parse, source()).await?;
        println!("flatten: len {}, sum {}", flat.len(), flat.iter().sum::<u64>());

        let records = runner
            .settled(
                |arg: String| async move {
                    if arg == "0" {
                        return Err("reject!");
                    }
                    arg.parse::<u64>().map_err(|_| "not a number")
                },
                source(),
            )
            .await;
        let rejected = records.iter().filter(|r| r.is_rejected()).count();
        let sum: u64 = records.iter().filter_map(|r| r.value()).flatten().sum();
        println!("settled: {} rejected, {} fulfilled, sum {}", rejected, records.len() - rejected, sum);

        let metrics = runner.metrics();
        println!(
            "runs {}, pulled {}, success rate {:.1}%",
            metrics.runs_started,
            metrics.items_pulled,
            metrics.success_rate() * 100.0
        );
        println!("elapsed: {:?}", now.elapsed());
        Ok::<_, Box<dyn Error>>(())
    })
}
