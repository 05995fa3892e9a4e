use std::{io::Write as _, path::PathBuf, sync::Arc, time::Duration};

use anyhow::{bail, Context, Result};
use clap::Parser;
use client_core::{
    load_story_state, FrameViewRecorder, NoopViewRecorder, PlaybackEvent, StoryApiClient,
    StoryLoadState, StoryLoader, StoryPlaybackController,
};
use shared::domain::StoryId;
use tokio::{
    io::{AsyncBufReadExt, BufReader},
    sync::broadcast::error::RecvError,
};
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

mod commands;
mod config;
mod file_loader;
mod render;

use commands::{parse_command, ViewerCommand};
use config::load_settings;
use file_loader::FileStoryLoader;
use render::{describe_frame, render_progress_bar};

const REDRAW_INTERVAL: Duration = Duration::from_millis(250);

#[derive(Parser, Debug)]
#[command(about = "Terminal story viewer")]
struct Args {
    /// API base url; overrides the settings file and environment.
    #[arg(long)]
    server_url: Option<String>,
    #[arg(long)]
    story_id: Option<Uuid>,
    /// Play a story from a JSON file instead of the API.
    #[arg(long)]
    story_file: Option<PathBuf>,
    #[arg(long, default_value = "story_viewer.toml")]
    config: PathBuf,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let mut settings = load_settings(&args.config);
    if let Some(server_url) = args.server_url {
        settings.server_url = server_url;
    }

    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&settings.log_filter))
        .unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let (loader, recorder, story_id): (Arc<dyn StoryLoader>, Arc<dyn FrameViewRecorder>, StoryId) =
        match args.story_file {
            Some(path) => {
                let loader = FileStoryLoader::new(path);
                let story_id = match args.story_id {
                    Some(id) => StoryId(id),
                    None => loader.read().await?.id,
                };
                let recorder: Arc<dyn FrameViewRecorder> = Arc::new(NoopViewRecorder);
                (Arc::new(loader) as Arc<dyn StoryLoader>, recorder, story_id)
            }
            None => {
                let Some(id) = args.story_id else {
                    bail!("--story-id is required unless --story-file is given");
                };
                let client = Arc::new(StoryApiClient::new(
                    &settings.server_url,
                    Duration::from_secs(settings.request_timeout_seconds),
                )?);
                info!("viewer: using api server={}", client.server_url());
                let loader: Arc<dyn StoryLoader> = client.clone();
                let recorder: Arc<dyn FrameViewRecorder> = client;
                (loader, recorder, StoryId(id))
            }
        };

    println!("loading story {story_id}...");
    let story = match load_story_state(loader.as_ref(), story_id).await {
        StoryLoadState::Ready(story) => story,
        StoryLoadState::Expired => bail!("story {story_id} has expired"),
        StoryLoadState::Failed(reason) => bail!("could not load story {story_id}: {reason}"),
        StoryLoadState::Loading => bail!("story {story_id} is still loading"),
    };

    let frame_count = story.frame_count();
    let (controller, events) = StoryPlaybackController::start(story, recorder)
        .await
        .with_context(|| format!("could not play story {story_id}"))?;
    println!("commands: hold | release <dx> [dy] | next | prev | status | quit");

    run_viewer(&controller, events, frame_count).await?;
    controller.close().await;
    Ok(())
}

async fn run_viewer(
    controller: &StoryPlaybackController,
    mut events: tokio::sync::broadcast::Receiver<PlaybackEvent>,
    frame_count: usize,
) -> Result<()> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdin_open = true;
    let mut redraw = tokio::time::interval(REDRAW_INTERVAL);

    loop {
        tokio::select! {
            event = events.recv() => match event {
                Ok(PlaybackEvent::FrameChanged { index, .. }) => {
                    if let Some(frame) = controller.current_frame().await {
                        println!();
                        println!("{}", describe_frame(index, frame_count, &frame));
                    }
                }
                Ok(PlaybackEvent::Restarted { index }) => {
                    println!();
                    println!("frame {}/{frame_count} restarted", index + 1);
                }
                Ok(PlaybackEvent::Paused { progress, .. }) => {
                    println!();
                    println!("paused at {:.0}%", progress * 100.0);
                }
                Ok(PlaybackEvent::Resumed { .. }) => debug!("viewer: resumed"),
                Ok(PlaybackEvent::Exhausted { .. }) => {
                    println!();
                    println!("story finished");
                    return Ok(());
                }
                Err(RecvError::Lagged(skipped)) => {
                    warn!("viewer: dropped {skipped} playback events");
                }
                Err(RecvError::Closed) => return Ok(()),
            },
            line = lines.next_line(), if stdin_open => {
                let Some(line) = line.context("failed to read stdin")? else {
                    stdin_open = false;
                    continue;
                };
                if line.trim().is_empty() {
                    continue;
                }
                match parse_command(&line) {
                    Ok(ViewerCommand::Quit) => return Ok(()),
                    Ok(ViewerCommand::Status) => {
                        let snapshot = controller.snapshot().await;
                        println!(
                            "frame={:?} progress={:.2} paused={} exhausted={}",
                            snapshot.current_index.map(|index| index + 1),
                            snapshot.progress,
                            snapshot.paused,
                            snapshot.exhausted
                        );
                    }
                    Ok(command) => apply_command(controller, command).await?,
                    Err(err) => eprintln!("{err}"),
                }
            },
            _ = redraw.tick() => {
                let segments = controller.segments().await;
                print!("\r{}", render_progress_bar(&segments));
                std::io::stdout().flush().context("failed to flush stdout")?;
            },
        }
    }
}

async fn apply_command(controller: &StoryPlaybackController, command: ViewerCommand) -> Result<()> {
    match command {
        ViewerCommand::Hold => controller.hold_start().await?,
        ViewerCommand::Release { dx, dy } => controller.release_with_delta(dx, dy).await?,
        ViewerCommand::Next => controller.advance_forward().await?,
        ViewerCommand::Prev => controller.advance_backward().await?,
        ViewerCommand::Status | ViewerCommand::Quit => {}
    }
    Ok(())
}
