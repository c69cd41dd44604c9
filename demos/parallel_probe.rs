//! Parallel probe example demonstrating fan-out/fan-in batch execution

use std::error::Error;
use std::time::{Duration, Instant};

use serde_json::{json, Value};
use taskfan::link::Link;
use taskfan::task::{run_batch, task_fn, BatchRunner, TaskFailure, TaskFn};
use uuid::Uuid;

/// A probe callable: pretends to measure an instrument, slowly.
fn probe(name: &'static str, millis: u64) -> TaskFn<Value> {
    task_fn(move |args, _kwargs| {
        std::thread::sleep(Duration::from_millis(millis));
        let scale = args.first().and_then(Value::as_i64).unwrap_or(1);
        Ok(json!({ "probe": name, "reading": 20 * scale }))
    })
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    println!("🚀 Taskfan - Parallel Probe Example\n");

    // Step 1: Fan three probes out, collect readings in submission order
    println!("Running three probes concurrently...");
    let start = Instant::now();

    let callables = vec![probe("voltage", 80), probe("current", 50), probe("field", 20)];
    let args = vec![vec![json!(1)], vec![json!(2)], vec![json!(3)]];

    let readings = run_batch(callables, Some(args), None).await?;
    println!(
        "✅ Collected {} readings in {:?} (sequential would be ~150ms)\n",
        readings.len(),
        start.elapsed()
    );
    for reading in &readings {
        println!("  {reading}");
    }

    // Step 2: Same probes through an admission gate of two
    println!("\nRunning six probes, at most two at a time...");
    let gated: Vec<TaskFn<Value>> = (0..6).map(|i| probe("gated", 20 + i * 5)).collect();
    let runner = BatchRunner::new().with_max_concurrency(2);
    let values = runner.run(gated, None, None).await?;
    println!("✅ Gated batch returned {} values, still in order\n", values.len());

    // Step 3: A failing probe aborts collection with its own failure
    println!("Running a batch with a broken probe...");
    let mixed: Vec<TaskFn<Value>> = vec![
        probe("healthy", 10),
        task_fn(|_args, _kwargs| {
            Err::<Value, _>(TaskFailure::new("ProbeError", "no response on channel 2"))
        }),
        probe("unreached", 10),
    ];
    match run_batch(mixed, None, None).await {
        Ok(_) => println!("unexpected success"),
        Err(error) => println!("✅ Batch aborted as expected: {error}\n"),
    }

    // Step 4: Link the captured result records
    let measurement = Uuid::new_v4().to_string();
    let analysis = Uuid::new_v4().to_string();
    let link = Link::new(measurement.as_str(), analysis.as_str(), "analysis")?
        .with_description("batch readings feeding the fit");

    println!("Linked result records:");
    println!("  {} -[{}]-> {}", link.head(), link.edge_type(), link.tail());

    Ok(())
}
