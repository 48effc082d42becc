//! Basic Experiment: one tracked training run
//!
//! Simulates a ten-epoch training loop inside a session. Progress, metrics
//! and resource usage are flushed every epoch so `kepler` (the viewer) shows
//! the run live; the epoch table and final summary are saved as artifacts.
//!
//! Run with: cargo run --example basic_experiment

use std::thread;
use std::time::Duration;

use kepler::artifact::{rows_to_batch, TableFormat};
use kepler::session::SessionOptions;
use kepler::Tracker;
use rand::Rng;
use serde_json::{json, Map, Value};

const EPOCHS: u64 = 10;

fn main() -> kepler::Result<()> {
    let tracker = Tracker::from_env();
    let mut rng = rand::thread_rng();

    let options = SessionOptions::new("Basic Example")
        .config("learning_rate", 0.01)
        .config("batch_size", 32)
        .config("epochs", EPOCHS)
        .config("optimizer", "adam")
        .tags(["example", "demo"]);

    let id = tracker.run(options, |exp| {
        println!("Running experiment: {} (ID: {})", exp.name(), exp.id());
        exp.log_info("Starting training process");

        let mut rows: Vec<Map<String, Value>> = Vec::new();
        for epoch in 1..=EPOCHS {
            exp.update_progress(epoch, EPOCHS, &format!("Processing epoch {epoch}/{EPOCHS}"))?;
            thread::sleep(Duration::from_millis(500));

            #[allow(clippy::cast_precision_loss)]
            let step = (epoch - 1) as f64;
            let accuracy = 0.7 + 0.02 * step + rng.gen_range(0.0..0.01);
            let loss = 0.5 - 0.03 * step + rng.gen_range(0.0..0.01);
            println!("Epoch {epoch}/{EPOCHS}: accuracy={accuracy:.4}, loss={loss:.4}");

            exp.set_metric(format!("accuracy_epoch_{epoch}"), accuracy);
            exp.set_metric(format!("loss_epoch_{epoch}"), loss);
            exp.log_resource("memory", format!("{}MB", rng.gen_range(200..300)));
            exp.log_resource("gpu_utilization", format!("{}%", rng.gen_range(70..95)));
            exp.flush()?;

            let row = json!({"epoch": epoch, "accuracy": accuracy, "loss": loss});
            if let Value::Object(row) = row {
                rows.push(row);
            }
        }
        exp.log_info("Training completed successfully");

        let table = rows_to_batch(&rows)?;
        let path = exp.save_table("training_metrics", &table, TableFormat::Csv)?;
        exp.log_info(format!("Saved training metrics to {}", path.display()));

        let accuracy = |row: &Map<String, Value>| {
            row.get("accuracy").and_then(Value::as_f64).unwrap_or_default()
        };
        let (best_epoch, best) = rows
            .iter()
            .enumerate()
            .max_by(|(_, a), (_, b)| accuracy(a).total_cmp(&accuracy(b)))
            .map(|(i, row)| (i + 1, accuracy(row)))
            .unwrap_or_default();
        let last = rows.last().cloned().unwrap_or_default();
        let field = |name: &str| last.get(name).cloned().unwrap_or(Value::Null);

        let mut summary = Map::new();
        summary.insert("final_accuracy".into(), field("accuracy"));
        summary.insert("final_loss".into(), field("loss"));
        summary.insert("best_accuracy".into(), json!(best));
        summary.insert("best_epoch".into(), json!(best_epoch));
        let path = exp.save_dict("final_metrics", &summary)?;
        exp.log_info(format!("Saved final metrics to {}", path.display()));

        for (key, value) in summary {
            exp.set_metric(key, value);
        }
        println!("Best accuracy: {best:.4} at epoch {best_epoch}");
        Ok::<_, kepler::Error>(exp.id().to_string())
    })?;

    println!("\nExperiment completed: {id}");
    println!("Run `kepler` to view it in the terminal UI");
    println!("Or `kepler list` to see all experiments");
    println!("Or `kepler info {id}` to see its details");
    Ok(())
}
