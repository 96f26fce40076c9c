use anyhow::{bail, Context, Result};
use clap::Parser;
use slopemap::render::JsonLinesSurface;
use slopemap::{
    logging, AnimationConfig, AnimationDriver, AnimatorCommand, ApiClient, MapSession,
    RouteBrowser, RouteId, ShapeHit,
};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc::Sender;

#[derive(Parser, Debug)]
#[command(name = "replay")]
#[command(
    about = "Headless route viewer: render commands as JSON lines on stdout",
    long_about = "Loads a route from the service and animates it in real time. \
                  Reads commands from stdin: play, pause, toggle, list, load <id>, \
                  click <lng> <lat> [speed], quit."
)]
struct Args {
    /// Route service base URL
    #[arg(long, default_value = "http://localhost:8080")]
    server: String,

    /// Route to open first (defaults to the first listed id)
    #[arg(long)]
    route: Option<String>,

    /// Interpolated frames per segment
    #[arg(long, value_parser = clap::value_parser!(u32).range(1..=1000))]
    sub_steps: Option<u32>,

    /// Milliseconds per frame
    #[arg(long, value_parser = clap::value_parser!(u64).range(1..=60_000))]
    interval_ms: Option<u64>,
}

#[derive(Debug, PartialEq)]
enum Input {
    Command(AnimatorCommand),
    List,
    Load(RouteId),
    Quit,
}

fn parse_input(line: &str) -> Result<Option<Input>> {
    let mut words = line.split_whitespace();
    let Some(verb) = words.next() else {
        return Ok(None);
    };

    let input = match verb {
        "play" => Input::Command(AnimatorCommand::Play),
        "pause" => Input::Command(AnimatorCommand::Pause),
        "toggle" => Input::Command(AnimatorCommand::Toggle),
        "list" => Input::List,
        "load" => match words.next() {
            Some(id) => Input::Load(RouteId::from(id)),
            None => bail!("usage: load <id>"),
        },
        "click" => {
            let numbers = words
                .map(str::parse::<f64>)
                .collect::<Result<Vec<_>, _>>()
                .context("usage: click <lng> <lat> [speed]")?;
            match numbers.as_slice() {
                [lng, lat] => Input::Command(AnimatorCommand::Click(vec![ShapeHit::point(
                    *lng, *lat, None,
                )])),
                [lng, lat, speed] => Input::Command(AnimatorCommand::Click(vec![
                    ShapeHit::point(*lng, *lat, Some(*speed)),
                ])),
                _ => bail!("usage: click <lng> <lat> [speed]"),
            }
        }
        "quit" | "exit" => Input::Quit,
        other => bail!("unknown command {:?}", other),
    };
    Ok(Some(input))
}

async fn send(tx: &Sender<AnimatorCommand>, command: AnimatorCommand) -> Result<()> {
    tx.send(command)
        .await
        .map_err(|_| anyhow::anyhow!("animation driver stopped"))
}

#[tokio::main]
async fn main() -> Result<()> {
    logging::init();
    let args = Args::parse();

    let mut config = AnimationConfig::default();
    if let Some(sub_steps) = args.sub_steps {
        config.sub_steps = sub_steps;
    }
    if let Some(interval) = args.interval_ms {
        config.frame_interval_ms = interval;
    }

    let client = ApiClient::new(&args.server)?;
    let initial = match args.route {
        Some(id) => RouteId::new(id),
        None => match client.list_route_ids().await?.into_iter().next() {
            Some(id) => id,
            None => bail!("No routes stored at {}", client.base_url()),
        },
    };
    let points = client
        .fetch_route(&initial)
        .await
        .with_context(|| format!("Failed to load route {}", initial))?;
    log::info!("Opened route {} with {} point(s)", initial, points.len());

    let surface = JsonLinesSurface::new(std::io::stdout());
    let session = MapSession::open(points, config, surface)?;
    let (driver, tx) = AnimationDriver::new(session);
    let driver = tokio::spawn(driver.run());
    let browser = RouteBrowser::new(client, tx.clone());

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        match parse_input(&line) {
            Ok(None) => {}
            Ok(Some(Input::Command(command))) => send(&tx, command).await?,
            Ok(Some(Input::List)) => {
                browser.browse().await;
            }
            Ok(Some(Input::Load(id))) => {
                browser.select(&id).await;
            }
            Ok(Some(Input::Quit)) => break,
            Err(e) => log::warn!("{}", e),
        }
    }

    // Driver may already be gone if it stopped on its own
    let _ = tx.send(AnimatorCommand::Shutdown).await;
    drop(tx);
    drop(browser);
    driver.await.context("Animation driver panicked")?;
    Ok(())
}
