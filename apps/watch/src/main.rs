use std::{path::PathBuf, sync::Arc};

use anyhow::{Context, Result};
use clap::Parser;
use client_core::{PollingClient, StatusSource, SyncController};
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

mod config;
mod render;

use config::{load_settings, Settings};

const SPARKLINE_COLUMNS: usize = 48;

/// Follows a remote bogosort run and renders its progress in the terminal.
#[derive(Parser, Debug)]
#[command(name = "sortwatch")]
struct Args {
    #[arg(long, default_value = "watch.toml")]
    config: PathBuf,
    #[arg(long)]
    run_id: Option<String>,
    #[arg(long)]
    active_url: Option<String>,
    #[arg(long)]
    full_url: Option<String>,
    #[arg(long)]
    sequence_length: Option<usize>,
    #[arg(long)]
    fps: Option<u32>,
}

impl Args {
    fn apply(self, settings: &mut Settings) {
        if let Some(v) = self.run_id {
            settings.run_id = Some(v);
        }
        if let Some(v) = self.active_url {
            settings.active_status_url = v;
        }
        if let Some(v) = self.full_url {
            settings.full_status_url = v;
        }
        if let Some(v) = self.sequence_length {
            settings.sequence_length = v;
        }
        if let Some(v) = self.fps {
            settings.fps = v;
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let args = Args::parse();
    let mut settings = load_settings(&args.config);
    args.apply(&mut settings);
    let mut config = settings.to_sync_config()?;

    let client = PollingClient::from_config(&config).context("failed to build http client")?;
    match client.fetch_full().await {
        Ok(stats) => {
            info!(
                run_id = %config.run_id,
                sequence_length = stats.sequence_length,
                "loaded run statistics"
            );
            config = config.with_statistics(&stats);
        }
        Err(err) => warn!(
            run_id = %config.run_id,
            sequence_length = config.sequence_length,
            "could not load run statistics, using configured length: {err}"
        ),
    }
    let controller = SyncController::start_with_engine(&config, Arc::new(client));
    let animation = controller.animation().clone();
    animation.resize(settings.canvas_width, settings.canvas_height);

    let mut views = controller.subscribe();
    let mut frames = tokio::time::interval(settings.frame_period());
    frames.set_missed_tick_behavior(MissedTickBehavior::Skip);
    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);
    let mut drawn: u64 = 0;

    loop {
        tokio::select! {
            _ = frames.tick() => {
                if animation.wants_frame() && animation.on_frame() {
                    drawn += 1;
                    if drawn % u64::from(settings.fps.max(1)) == 0 {
                        animation.draw_with(|frame| {
                            debug!(frame_no = drawn, "{}", render::sparkline(&frame, SPARKLINE_COLUMNS));
                        });
                    }
                }
            }
            changed = views.changed() => {
                if changed.is_err() {
                    break;
                }
                let view = views.borrow_and_update().clone();
                println!("{}", render::status_line(&view));
                if view.is_terminal() {
                    animation.on_frame();
                    if let Some(line) =
                        animation.draw_with(|frame| render::sparkline(&frame, SPARKLINE_COLUMNS))
                    {
                        println!("{line}");
                    }
                    break;
                }
            }
            _ = &mut ctrl_c => {
                info!("interrupted, shutting down");
                break;
            }
        }
    }

    controller.teardown();
    Ok(())
}
