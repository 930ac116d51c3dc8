mod app;
mod msg;

use std::io::{self, BufRead};
use std::thread;

use anyhow::Result;
use tokio::sync::mpsc;
use tracing_subscriber::EnvFilter;

use app::App;
use frstack_functions::config::AppConfig;
use msg::Msg;

#[tokio::main]
async fn main() -> Result<()> {
    let config = AppConfig::load()?;

    // Initialize logging to file (never stdout)
    let log_dir = directories::ProjectDirs::from("", "", "frstack-functions")
        .map(|d| d.data_dir().to_path_buf())
        .unwrap_or_else(|| std::env::temp_dir().join("frstack-functions"));
    std::fs::create_dir_all(&log_dir)?;

    let file_appender = tracing_appender::rolling::daily(&log_dir, "frstack-host.log");
    let (non_blocking, _guard) = tracing_appender::non_blocking(file_appender);
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.general.log_filter));
    tracing_subscriber::fmt()
        .with_writer(non_blocking)
        .with_env_filter(filter)
        .init();

    tracing::info!(log_dir = %log_dir.display(), "frstack host starting");

    if let Err(e) = run(config).await {
        eprintln!("frstack-host error: {e:?}");
    }

    Ok(())
}

async fn run(config: AppConfig) -> Result<()> {
    let (tx, mut rx) = mpsc::unbounded_channel::<Msg>();
    let poll_interval = config.poll_interval();
    let mut app = App::new(config, tx.clone())?;
    flush(&mut app);

    // Input thread — reads console lines and forwards as Msg
    let tx_input = tx.clone();
    thread::spawn(move || {
        for line in io::stdin().lock().lines() {
            let Ok(line) = line else {
                break;
            };
            if tx_input.send(Msg::Line(line)).is_err() {
                return;
            }
        }
        let _ = tx_input.send(Msg::Quit);
    });

    // Poll task — host timer driving `poll`
    let tx_tick = tx.clone();
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(poll_interval);
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
        loop {
            interval.tick().await;
            if tx_tick.send(Msg::Tick).is_err() {
                break;
            }
        }
    });
    drop(tx);

    // ── Main event loop ──
    while let Some(first) = rx.recv().await {
        app.update(first)?;

        while let Ok(msg) = rx.try_recv() {
            app.update(msg)?;
        }

        flush(&mut app);

        if app.should_quit {
            break;
        }
    }

    app.shutdown();
    flush(&mut app);
    tracing::info!("frstack host stopped");
    Ok(())
}

fn flush(app: &mut App) {
    for line in app.drain_output() {
        println!("{line}");
    }
}
