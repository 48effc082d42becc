//! Multiple Experiments: a small grid search
//!
//! Runs one session per (learning rate, batch size, optimizer) combination,
//! all tagged `grid_search`, then ranks the finished runs by their final
//! accuracy using the collection query API.
//!
//! Run with: cargo run --example multiple_experiments

use std::thread;
use std::time::Duration;

use kepler::artifact::{rows_to_batch, TableFormat};
use kepler::experiment::{ExperimentFilter, ExperimentStatus};
use kepler::session::SessionOptions;
use kepler::Tracker;
use rand::Rng;
use serde_json::{json, Map, Value};

const EPOCHS: u32 = 5;

fn main() -> kepler::Result<()> {
    let tracker = Tracker::from_env();
    let mut rng = rand::thread_rng();

    for lr in [0.001, 0.01, 0.1] {
        for batch_size in [16, 32, 64] {
            for optimizer in ["adam", "sgd"] {
                let name = format!("Train-LR{lr}-BS{batch_size}-{}", optimizer.to_uppercase());
                let options = SessionOptions::new(name)
                    .config("learning_rate", lr)
                    .config("batch_size", batch_size)
                    .config("optimizer", optimizer)
                    .config("epochs", EPOCHS)
                    .tag("grid_search");

                tracker.run(options, |exp| {
                    println!("Running experiment: {} (ID: {})", exp.name(), exp.id());
                    let lr_factor = if lr < 0.005 { 0.1 } else if lr < 0.05 { 0.2 } else { 0.3 };
                    let bs_factor = match batch_size {
                        16 => 0.05,
                        32 => 0.1,
                        _ => 0.15,
                    };
                    let opt_factor = if optimizer == "adam" { 0.1 } else { 0.05 };

                    let mut rows = Vec::new();
                    let mut best = (0, f64::MIN);
                    for epoch in 0..EPOCHS {
                        thread::sleep(Duration::from_millis(200));
                        let e = f64::from(epoch);
                        let accuracy = (0.7
                            + lr_factor * (1.0 - 0.5_f64.powf(e))
                            + bs_factor * (e / f64::from(EPOCHS))
                            + opt_factor * (1.0 - 0.7_f64.powf(e))
                            + rng.gen_range(-0.02..0.02))
                        .min(0.99);
                        let loss = (0.5 - 0.4 * (accuracy - 0.7)).max(0.01);
                        println!("Epoch {}/{EPOCHS}: accuracy={accuracy:.4}, loss={loss:.4}", epoch + 1);

                        exp.set_metric(format!("accuracy_epoch_{}", epoch + 1), accuracy);
                        exp.set_metric(format!("loss_epoch_{}", epoch + 1), loss);
                        exp.update_progress(u64::from(epoch + 1), u64::from(EPOCHS), "")?;
                        exp.flush()?;
                        if accuracy > best.1 {
                            best = (epoch + 1, accuracy);
                        }
                        if let Value::Object(row) = json!({"epoch": epoch + 1, "accuracy": accuracy, "loss": loss}) {
                            rows.push(row);
                        }
                    }

                    exp.save_table("training_metrics", &rows_to_batch(&rows)?, TableFormat::Parquet)?;
                    let last: Map<String, Value> = rows.last().cloned().unwrap_or_default();
                    let field = |name: &str| last.get(name).cloned().unwrap_or(Value::Null);
                    let mut summary = Map::new();
                    summary.insert("final_accuracy".into(), field("accuracy"));
                    summary.insert("final_loss".into(), field("loss"));
                    summary.insert("best_accuracy".into(), json!(best.1));
                    summary.insert("best_epoch".into(), json!(best.0));
                    exp.save_dict("final_metrics", &summary)?;
                    for (key, value) in summary {
                        exp.set_metric(key, value);
                    }
                    println!("Best accuracy: {:.4} at epoch {}", best.1, best.0);
                    println!("{}", "-".repeat(50));
                    Ok::<_, kepler::Error>(())
                })?;
            }
        }
    }

    let grid = tracker.list_experiments()?.filter(
        &ExperimentFilter::new()
            .tag("grid_search")
            .status(ExperimentStatus::Completed),
    );
    let final_accuracy = |id: &str| {
        grid.get(id)
            .and_then(|e| e.metrics().get("final_accuracy").and_then(Value::as_f64))
            .unwrap_or_default()
    };
    let mut ranked: Vec<&str> = grid.iter().map(|e| e.id()).collect();
    ranked.sort_by(|a, b| final_accuracy(*b).total_cmp(&final_accuracy(*a)));

    println!("\nTop runs by final accuracy:");
    for id in ranked.iter().take(5) {
        println!("  {id:<40} {:.4}", final_accuracy(*id));
    }
    println!("\nRun `kepler` to browse all experiments in the terminal UI");
    Ok(())
}
