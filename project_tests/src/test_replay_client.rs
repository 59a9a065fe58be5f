use std::collections::HashMap;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use clap::Parser;
use futures_util::StreamExt;
use tokio_tungstenite::{connect_async, tungstenite::protocol::Message};

use lib_common::replay::ServerMessage;

const URL: &str = "ws://localhost:8765/ws";

#[derive(Parser, Debug)]
#[clap(author, version, about = "Console client for the race replay server", long_about = None)]
struct Args {
    /// Server WebSocket URL
    #[clap(short, long, default_value = URL)]
    url: String,

    /// Report interval in seconds
    #[clap(short, long, default_value_t = 10)]
    report_interval_seconds: u64,

    /// Only print the periodic summary, not every record
    #[clap(short, long)]
    quiet: bool,
}

#[derive(Default)]
struct Stats {
    total: usize,
    /// Records per driver since the last report.
    window: HashMap<String, usize>,
}

impl Stats {
    fn report(&mut self, elapsed: Duration) {
        let secs = elapsed.as_secs_f64().max(f64::EPSILON);
        let mut rates: Vec<(String, usize)> = self.window.drain().collect();
        rates.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));

        let report = rates
            .iter()
            .map(|(driver, n)| format!("{}: {:.1} rec/s", driver, *n as f64 / secs))
            .collect::<Vec<_>>()
            .join(", ");

        println!("\n----- Summary -----");
        println!("Records so far: {}", self.total);
        println!("Drivers: {}", if report.is_empty() { "No data" } else { &report });
        println!("-------------------\n");
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    println!("Connecting to {}...", args.url);
    let (ws_stream, _) = connect_async(args.url.as_str())
        .await
        .with_context(|| format!("failed to connect to {}", args.url))?;
    let (_write, mut read) = ws_stream.split();
    println!("Connected. Press Ctrl+C to stop.");

    let mut stats = Stats::default();
    let period = Duration::from_secs(args.report_interval_seconds.max(1));
    let mut ticker = tokio::time::interval(period);
    ticker.tick().await;
    let mut window_start = Instant::now();

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                stats.report(window_start.elapsed());
                window_start = Instant::now();
            }
            frame = read.next() => {
                let Some(frame) = frame else { break };
                let msg = match frame {
                    Ok(msg) => msg,
                    Err(e) => {
                        eprintln!("Connection error: {}", e);
                        break;
                    }
                };
                match msg {
                    Message::Text(text) => match serde_json::from_str::<ServerMessage>(text.as_str()) {
                        Ok(ServerMessage::Telemetry(record)) => {
                            stats.total += 1;
                            *stats.window.entry(record.driver.clone()).or_insert(0) += 1;
                            if !args.quiet {
                                println!(
                                    "{:>4} lap {:>3} P{:<3} {:>9.4} km {:>6.1} km/h",
                                    record.driver,
                                    record.lap_number.map_or("-".to_string(), |l| l.to_string()),
                                    record.position.map_or("-".to_string(), |p| p.to_string()),
                                    record.cumulative_distance_km,
                                    record.speed_kmh,
                                );
                            }
                        }
                        Ok(ServerMessage::Prediction { data }) => {
                            println!("Predicted race pace:");
                            for (i, lap) in data.predictions.iter().enumerate() {
                                println!("  {:>2}. {:<20} {:.3}s", i + 1, lap.driver_name, lap.predicted_seconds);
                            }
                            match data.mean_absolute_error_seconds {
                                Some(mae) => println!("  model MAE: {:.3}s", mae),
                                None => println!("  model MAE: n/a"),
                            }
                        }
                        Ok(ServerMessage::Info { message }) => println!("Info: {}", message),
                        Ok(ServerMessage::Error { message }) => eprintln!("Server error: {}", message),
                        Err(_) => println!("Non-JSON message: {}", text.as_str()),
                    },
                    Message::Close(_) => break,
                    _ => {}
                }
            }
        }
    }

    stats.report(window_start.elapsed());
    println!("Connection closed after {} telemetry records.", stats.total);
    Ok(())
}
