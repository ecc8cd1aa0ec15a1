use anyhow::{anyhow, Context};
use clap::{Parser, Subcommand};
use dispatch_board::{
    sdk::board::{Board, RouteOutcome},
    sdk::config::DispatchConfig,
    sdk::gesture::DragEvent,
    sdk::ledger::Owner,
    sdk::presentation::{describe_summary, SurfaceSnapshot},
    sdk::relay::Relay,
    sdk::roster::Roster,
    sdk::routing::RoutingClient,
    sdk::store::HttpTaskStore,
    sdk::util::log::init_logging,
    sdk::waypoints::HomeBase,
};
use serde_json::json;
use std::{fs, path::PathBuf, sync::Arc, time::Duration};

/// Assign delivery/pickup tasks to drivers and build their routes
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Cli {
    /// Home base as "lat,lng" (overrides HOME_BASE)
    #[arg(long, global = true)]
    home_base: Option<String>,

    /// Driver roster CSV with an id,name,color[,status] header (overrides ROSTER_CSV)
    #[arg(long, global = true)]
    roster: Option<PathBuf>,

    /// How long to wait for pending write-backs before exiting
    #[arg(long, global = true, default_value_t = 500)]
    settle_ms: u64,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Show tasks, owners and every driver's stop order
    List,
    /// Move a task to a driver at the given position
    Assign {
        #[arg(long)]
        task: String,
        #[arg(long)]
        driver: String,
        #[arg(long, default_value_t = usize::MAX)]
        index: usize,
    },
    /// Return a task to the unassigned pool
    Unassign {
        #[arg(long)]
        task: String,
    },
    /// Move a stop within a list ("unassigned" or a driver id)
    Reorder {
        #[arg(long)]
        list: String,
        #[arg(long)]
        from: usize,
        #[arg(long)]
        to: usize,
    },
    /// Unassign everything a driver holds
    Clear {
        #[arg(long)]
        driver: String,
    },
    /// Build a driver's route and write it as GeoJSON
    Route {
        #[arg(long)]
        driver: String,
        #[arg(long, default_value = "route.geojson")]
        out: PathBuf,
    },
    /// Home base to a single task
    Leg {
        #[arg(long)]
        task: String,
    },
    /// Apply a JSON array of drag events
    Replay {
        #[arg(long)]
        events: PathBuf,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_logging();
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    let config = DispatchConfig::from_env()?;

    // --- Dependency Initialization ---
    let home_base = match &cli.home_base {
        Some(raw) => Some(
            HomeBase::parse(raw).ok_or_else(|| anyhow!("Invalid --home-base \"{}\"", raw))?,
        ),
        None => config.home_base,
    };
    let home_base = HomeBase::resolve(home_base);

    let roster = match cli.roster.as_ref().or(config.roster_csv.as_ref()) {
        Some(path) => Roster::from_csv(path)
            .with_context(|| format!("Failed to load roster from {}", path.display()))?,
        None => Roster::builtin(),
    };

    let store = Arc::new(HttpTaskStore::new(
        config.tasks_endpoint.clone(),
        config.http_timeout,
    )?);
    let relay = Arc::new(Relay::spawn(store.clone()));
    let client = RoutingClient::from_config(&config)?;

    let mut board = Board::load(store.as_ref(), roster, home_base, relay.clone()).await;
    if let Some(banner) = board.banner() {
        log::error!("{}", banner);
    }

    // --- Execute Command ---
    let output = match cli.command {
        Command::List => snapshot(&board),
        Command::Assign {
            task,
            driver,
            index,
        } => {
            let change = board.assign(&task, &driver, index);
            json!({ "change": change, "board": snapshot(&board) })
        }
        Command::Unassign { task } => {
            let change = board.unassign(&task);
            json!({ "change": change, "board": snapshot(&board) })
        }
        Command::Reorder { list, from, to } => {
            let changed = board.reorder_within(&Owner::from_list_id(&list), from, to);
            json!({ "reordered": changed, "board": snapshot(&board) })
        }
        Command::Clear { driver } => {
            let changes = board.clear_driver(&driver);
            log::info!("Cleared {} tasks from {}", changes.len(), driver);
            json!({ "changes": changes, "board": snapshot(&board) })
        }
        Command::Route { driver, out } => match board.build_route(&client, &driver).await {
            RouteOutcome::Drawn { summary, .. } => {
                let route = board
                    .route()
                    .ok_or_else(|| anyhow!("Route was drawn but is missing"))?;
                fs::write(&out, serde_json::to_string_pretty(&route.result.geometry)?)?;
                log::info!("✅ Route for {} written to {}", driver, out.display());
                json!({
                    "driver": driver,
                    "stops": board.waypoints(&driver).stops(),
                    "summary": summary,
                    "label": describe_summary(summary.as_ref()),
                })
            }
            RouteOutcome::NothingToRoute => {
                json!({ "driver": driver, "message": "No stops to route" })
            }
            RouteOutcome::UnknownDriver(id) => return Err(anyhow!("Unknown driver: {}", id)),
            RouteOutcome::Failed(e) => json!({ "driver": driver, "error": e.to_string() }),
        },
        Command::Leg { task } => match board.lookup_leg(&client, &task).await {
            Some(Ok(result)) => json!({
                "task": task,
                "summary": result.summary,
                "label": describe_summary(result.summary.as_ref()),
            }),
            Some(Err(e)) => json!({ "task": task, "error": e.to_string() }),
            None => return Err(anyhow!("Unknown or unplaceable task: {}", task)),
        },
        Command::Replay { events } => {
            let raw = fs::read_to_string(&events)
                .with_context(|| format!("Failed to read {}", events.display()))?;
            let events: Vec<DragEvent> = serde_json::from_str(&raw)?;
            let outcomes: Vec<_> = events.iter().map(|e| board.handle_drag(e)).collect();
            json!({ "outcomes": outcomes, "board": snapshot(&board) })
        }
    };

    println!("{}", serde_json::to_string_pretty(&output)?);

    log::info!("Issued {} write-backs", relay.issued());
    relay.settle(Duration::from_millis(cli.settle_ms)).await;
    Ok(())
}

fn snapshot(board: &Board) -> serde_json::Value {
    let mut surface = SurfaceSnapshot::default();
    board.render(&mut surface);

    let lists: serde_json::Map<String, serde_json::Value> = std::iter::once(Owner::Unassigned)
        .chain(board.roster().drivers().iter().map(|d| Owner::driver(&d.id)))
        .map(|owner| {
            let ids = board.ledger().sequence(&owner).to_vec();
            (owner.list_id().to_string(), json!(ids))
        })
        .collect();

    json!({
        "drivers": board.roster().drivers(),
        "lists": lists,
        "map": surface,
    })
}
