//! stampcard binary
//!
//! Logs study sessions and stamps boards against a local JSON data file.

use clap::{Parser, Subcommand};
use stampcard::{
    AuthProvider, Caller, Error, HttpMediaUploader, MediaUploader, MemoryStore, NewRecord,
    SessionAuth, StampCard, StampCardConfig,
};
use stampcard_core::{ArtifactRef, Board, MetricKind, SlotState, UnlockCondition};
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "stampcard")]
#[command(about = "Study stamp cards: log progress, unlock slots, stamp friends")]
struct Cli {
    /// Acting user id
    #[arg(short, long, env = "STAMPCARD_USER")]
    user: Option<String>,

    /// Display name; updates your profile name when it differs
    #[arg(long, env = "STAMPCARD_NAME")]
    name: Option<String>,

    /// Data file (overrides STAMPCARD_DATA_FILE)
    #[arg(long)]
    data_file: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Log a study session
    Log {
        material: String,
        /// hours, pages or questions
        metric: MetricKind,
        amount: f64,
        #[arg(short, long, default_value = "")]
        comment: String,
    },
    /// Delete one of your records
    Delete { record_id: String },
    /// Show totals
    Progress { uid: Option<String> },
    /// Rebuild your totals from your records
    Recompute,
    /// Show unlock conditions
    Conditions { uid: Option<String> },
    /// Replace your unlock conditions, e.g. `hours=1 pages=10`
    SetConditions {
        #[arg(required = true)]
        conditions: Vec<String>,
    },
    /// Show a board
    Board {
        uid: Option<String>,
        /// Only this page
        #[arg(short, long)]
        page: Option<u64>,
    },
    /// Stamp a slot on someone's board
    Stamp {
        owner: String,
        slot: u64,
        /// Stamp image; defaults to your selected stamp
        #[arg(short, long)]
        artifact: Option<String>,
    },
    /// Show notifications
    Notifications { uid: Option<String> },
    /// Show recent records from everyone
    Timeline {
        #[arg(short, long, default_value_t = 20)]
        limit: usize,
    },
    /// List users with unstamped slots
    Targets,
    /// Show study materials
    Materials { uid: Option<String> },
    /// Add a study material
    AddMaterial { name: String },
    /// Remove a study material
    RemoveMaterial { name: String },
    /// Choose your stamp and board background
    SelectStamp {
        stamp: Option<String>,
        #[arg(short, long)]
        background: Option<String>,
    },
    /// Upload a stamp image
    Upload {
        file: PathBuf,
        /// Also select it as your stamp
        #[arg(long)]
        select: bool,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "stampcard=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    let mut config = StampCardConfig::from_env()?;
    if let Some(data_file) = cli.data_file.clone() {
        config.data_file = data_file;
    }

    let auth = SessionAuth::new();
    if let Some(uid) = &cli.user {
        let mut caller = Caller::new(uid.as_str());
        if let Some(name) = &cli.name {
            caller = caller.with_display_name(name.as_str());
        }
        auth.sign_in(caller);
    }

    let store = Arc::new(MemoryStore::open(&config.data_file).await?);
    let card = StampCard::new(Arc::clone(&store), config.clone());

    if let Some(caller) = auth.current_user() {
        card.sign_in(&caller).await.map_err(report)?;
    }

    run(&card, &auth, cli.command).await.map_err(report)?;
    store.save(&config.data_file).await?;
    Ok(())
}

async fn run(card: &StampCard<MemoryStore>, auth: &SessionAuth, command: Command) -> stampcard::Result<()> {
    // Reads default to the signed-in user.
    let target = |uid: Option<String>| -> stampcard::Result<String> {
        match uid {
            Some(uid) => Ok(uid),
            None => auth.require_user().map(|c| c.user_id),
        }
    };

    match command {
        Command::Log {
            material,
            metric,
            amount,
            comment,
        } => {
            let caller = auth.require_user()?;
            let record = card
                .log_record(&caller, NewRecord::new(material, metric, amount).with_comment(comment))
                .await?;
            println!("Logged {} {} of {} ({})", record.amount, record.metric, record.material, record.id);
            println!("{} slots unlocked", card.unlocked_count(&caller.user_id).await?);
        }
        Command::Delete { record_id } => {
            let caller = auth.require_user()?;
            let reversed = card.delete_record(&caller, &record_id).await?;
            println!("Deleted {} ({} totals adjusted)", record_id, reversed.len());
        }
        Command::Progress { uid } => {
            let uid = target(uid)?;
            let summary = card.progress(&uid).await?;
            for metric in MetricKind::ALL {
                println!("{:<10} {}", metric, summary.get(metric));
            }
            println!("{:<10} {}", "unlocked", card.unlocked_count(&uid).await?);
        }
        Command::Recompute => {
            let caller = auth.require_user()?;
            let summary = card.recompute_progress(&caller).await?;
            println!("{}", serde_json::to_string_pretty(&summary)?);
        }
        Command::Conditions { uid } => {
            let uid = target(uid)?;
            let summary = card.progress(&uid).await?;
            for condition in card.conditions(&uid).await? {
                let remaining = condition
                    .remaining(&summary)
                    .map(|r| format!("{} to next slot", r))
                    .unwrap_or_else(|| "never unlocks".to_string());
                println!("every {} {}: {}", condition.threshold, condition.metric, remaining);
            }
        }
        Command::SetConditions { conditions } => {
            let caller = auth.require_user()?;
            let parsed = conditions
                .iter()
                .map(|raw| parse_condition(raw))
                .collect::<stampcard::Result<Vec<_>>>()?;
            card.set_conditions(&caller, parsed).await?;
            println!("{} slots unlocked", card.unlocked_count(&caller.user_id).await?);
        }
        Command::Board { uid, page } => {
            let uid = target(uid)?;
            let board = card.board(&uid).await?;
            print_board(&board, page);
        }
        Command::Stamp {
            owner,
            slot,
            artifact,
        } => {
            let caller = auth.require_user()?;
            let outcome = match artifact {
                Some(artifact) => {
                    card.place_stamp(&caller, &owner, slot, ArtifactRef::new(artifact)).await?
                }
                None => card.place_selected_stamp(&caller, &owner, slot).await?,
            };
            println!(
                "Stamped slot {} of {}{}{}",
                slot,
                owner,
                if outcome.overwrote { " (replaced)" } else { "" },
                if outcome.notified { "" } else { " (notification not sent)" }
            );
        }
        Command::Notifications { uid } => {
            for event in card.notifications(&target(uid)?).await? {
                println!("{}  {} stamped your card", event.timestamp.to_rfc3339(), event.sender_name);
            }
        }
        Command::Timeline { limit } => {
            for record in card.timeline(limit).await? {
                println!(
                    "{}  {}: {} {} of {}{}",
                    record.created_at.to_rfc3339(),
                    record.author_display,
                    record.amount,
                    record.metric,
                    record.material,
                    if record.comment.is_empty() {
                        String::new()
                    } else {
                        format!(" \"{}\"", record.comment)
                    }
                );
            }
        }
        Command::Targets => {
            for t in card.stamp_targets().await? {
                println!("{:<20} {:<20} {} open", t.user_id, t.name, t.unstamped);
            }
        }
        Command::Materials { uid } => {
            for material in card.materials(&target(uid)?).await?.list {
                println!("{}", material);
            }
        }
        Command::AddMaterial { name } => {
            let caller = auth.require_user()?;
            let list = card.add_material(&caller, &name).await?;
            println!("{} materials", list.list.len());
        }
        Command::RemoveMaterial { name } => {
            let caller = auth.require_user()?;
            let list = card.remove_material(&caller, &name).await?;
            println!("{} materials", list.list.len());
        }
        Command::SelectStamp { stamp, background } => {
            let caller = auth.require_user()?;
            let mut settings = card.stamp_settings(&caller.user_id).await?;
            if let Some(stamp) = stamp {
                settings.selected_stamp = Some(ArtifactRef::new(stamp));
            }
            if let Some(background) = background {
                settings.selected_background = Some(ArtifactRef::new(background));
            }
            card.save_stamp_settings(&caller, &settings).await?;
            println!("{}", serde_json::to_string_pretty(&settings)?);
        }
        Command::Upload { file, select } => {
            let caller = auth.require_user()?;
            let endpoint = card
                .config()
                .media_endpoint
                .clone()
                .ok_or_else(|| Error::Config("STAMPCARD_MEDIA_ENDPOINT is not set".into()))?;
            let uploader = HttpMediaUploader::new(endpoint, card.config().upload_preset.clone());

            let bytes = tokio::fs::read(&file).await?;
            let file_name = file
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| "stamp".to_string());
            let artifact = uploader.upload(&file_name, bytes).await?;
            println!("{}", artifact);

            if select {
                let mut settings = card.stamp_settings(&caller.user_id).await?;
                settings.selected_stamp = Some(artifact);
                card.save_stamp_settings(&caller, &settings).await?;
            }
        }
    }
    Ok(())
}

/// Hint at retrying before handing the error back to `main`.
fn report(e: Error) -> Box<dyn std::error::Error> {
    if e.is_transient() {
        eprintln!("{}; this may be temporary, try again", e);
    }
    Box::new(e)
}

/// Parse `metric=threshold`.
fn parse_condition(raw: &str) -> stampcard::Result<UnlockCondition> {
    let (metric, threshold) = raw
        .split_once('=')
        .ok_or_else(|| Error::InvalidInput(format!("expected metric=threshold, got {:?}", raw)))?;
    let metric: MetricKind = metric.parse()?;
    let threshold: f64 = threshold
        .trim()
        .parse()
        .map_err(|_| Error::InvalidInput(format!("invalid threshold {:?}", threshold)))?;
    Ok(UnlockCondition::new(metric, threshold))
}

fn print_board(board: &Board, only_page: Option<u64>) {
    println!(
        "{} unlocked, {} stamped, {} page(s)",
        board.unlocked(),
        board.stamped_count(),
        board.page_count()
    );
    for page in 0..board.page_count() {
        if only_page.is_some_and(|p| p != page) {
            continue;
        }
        let Some(slots) = board.page(page) else {
            continue;
        };
        let row: Vec<&str> = slots
            .iter()
            .map(|slot| match slot.state {
                SlotState::Stamped => "[*]",
                SlotState::UnlockedEmpty => "[ ]",
                SlotState::Locked => "[#]",
            })
            .collect();
        println!("page {:>3}  {}", page + 1, row.join(""));
    }
}
