use anyhow::Context;
use clap::{ArgGroup, Args, Parser, Subcommand, ValueEnum};
use std::fs;
use std::rc::Rc;
use threadline::block::BlockList;
use threadline::config::{self, AppConfig};
use threadline::domain::{CommentPath, ReplyTarget, Target, TargetKind};
use threadline::editor;
use threadline::fixtures::{self, DemoCommentSource};
use threadline::history::{PageKind, ViewHistory, Visit};
use threadline::render::{self, RenderOptions};
use threadline::report::{ReportDesk, ReportKind};
use threadline::session::Session;
use threadline::source::HttpCommentSource;
use threadline::thread::{CommentThread, ThreadEvent};
use tokio::sync::mpsc::{self, UnboundedReceiver};

/// Nested comment threads for posts and notes.
#[derive(Debug, Parser)]
#[command(version, about)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Run a scripted session against the in-memory backend.
    Demo {
        /// Top-level comments to seed.
        #[arg(long, default_value_t = 6)]
        seed: usize,
    },
    /// Fetch and print the first page of comments for a target.
    Show {
        #[arg(long, value_enum)]
        kind: KindArg,
        #[arg(long)]
        id: String,
    },
    /// List or search recently viewed threads.
    History(HistoryCommand),
    /// Inspect or edit threadline configuration.
    Config(ConfigCommand),
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum KindArg {
    Post,
    Note,
}

impl From<KindArg> for TargetKind {
    fn from(kind: KindArg) -> Self {
        match kind {
            KindArg::Post => Self::Post,
            KindArg::Note => Self::Note,
        }
    }
}

#[derive(Debug, Args)]
struct HistoryCommand {
    /// Only show entries whose title or description contains this text.
    #[arg(long, conflicts_with = "clear")]
    search: Option<String>,

    /// Number of entries to print.
    #[arg(long, default_value_t = 20)]
    limit: usize,

    /// Forget every entry.
    #[arg(long)]
    clear: bool,
}

#[derive(Debug, Args)]
#[command(group(
    ArgGroup::new("config_action")
        .required(true)
        .multiple(false)
        .args(["edit", "path"])
))]
struct ConfigCommand {
    /// Open the config file in $VISUAL/$EDITOR/nvim/vim/vi.
    #[arg(long)]
    edit: bool,

    /// Print the config file path.
    #[arg(long)]
    path: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();
    let cli = Cli::parse();

    match cli.command {
        Command::Config(command) => handle_config_command(command),
        Command::Demo { seed } => run_demo(seed).await,
        Command::Show { kind, id } => {
            let config = config::load_or_create()?;
            show(&config, Target::new(kind.into(), id)).await
        }
        Command::History(command) => {
            let config = config::load_or_create()?;
            handle_history_command(&config, command)
        }
    }
}

fn handle_config_command(command: ConfigCommand) -> anyhow::Result<()> {
    let path = config::ensure_config_file()?;

    if command.path {
        println!("{}", path.display());
        return Ok(());
    }

    if command.edit {
        editor::edit_file_with_system_editor(path.as_path())?;
        return Ok(());
    }

    Ok(())
}

async fn show(config: &AppConfig, target: Target) -> anyhow::Result<()> {
    let source = HttpCommentSource::new(
        config.api.base_url.clone(),
        config.api.token.clone(),
        config.api.timeout,
    )
    .context("failed to build HTTP client")?;
    let thread = CommentThread::with_options(
        target.clone(),
        source,
        Rc::new(Session::default()),
        config.api.thread,
    );

    thread
        .refresh()
        .await
        .with_context(|| format!("failed to load comments for {target}"))?;
    println!(
        "{}",
        thread.with_state(|state| render::render_thread(state, &RenderOptions::default()))
    );

    let mut history = load_history(config)?;
    let kind = match target.kind {
        TargetKind::Post => PageKind::Post,
        TargetKind::Note => PageKind::Note,
    };
    history.record(
        Visit::new(kind, target.to_string(), format!("/{}/{}", target.kind, target.id))
            .with_description(format!("{} comments", thread.with_state(|s| s.total_count))),
    );
    save_history(&history)
}

fn handle_history_command(config: &AppConfig, command: HistoryCommand) -> anyhow::Result<()> {
    let mut history = load_history(config)?;

    if command.clear {
        history.clear();
        return save_history(&history);
    }

    let entries: Vec<_> = match &command.search {
        Some(keyword) => history.search(keyword),
        None => history.entries().iter().collect(),
    };
    if entries.is_empty() {
        println!("(no history)");
    }
    for entry in entries.into_iter().take(command.limit) {
        println!(
            "{}  {:<24} {}",
            entry.visited_at.format("%Y-%m-%d %H:%M"),
            entry.title,
            entry.description.as_deref().unwrap_or("")
        );
    }
    Ok(())
}

fn load_history(config: &AppConfig) -> anyhow::Result<ViewHistory> {
    let path = config::history_path()?;
    if !path.exists() {
        return Ok(ViewHistory::with_capacity(config.history_max_entries));
    }

    let raw = fs::read_to_string(&path)
        .with_context(|| format!("failed to read history at {}", path.display()))?;
    let mut history = ViewHistory::from_json(&raw)
        .with_context(|| format!("failed to parse history at {}", path.display()))?;
    history.set_max_entries(config.history_max_entries);
    Ok(history)
}

fn save_history(history: &ViewHistory) -> anyhow::Result<()> {
    let path = config::history_path()?;
    if let Some(dir) = path.parent() {
        fs::create_dir_all(dir)
            .with_context(|| format!("failed to create {}", dir.display()))?;
    }
    let raw = history.to_json().context("failed to serialize history")?;
    fs::write(&path, raw).with_context(|| format!("failed to write {}", path.display()))
}

async fn run_demo(seed: usize) -> anyhow::Result<()> {
    let target = fixtures::demo_target();
    let source = DemoCommentSource::new().seeded(&target, seed);
    let session = Rc::new(Session::default());
    let (tx, mut rx) = mpsc::unbounded_channel();
    let thread = CommentThread::new(target, source, Rc::clone(&session)).with_events(tx);

    thread.refresh().await?;
    drain_notices(&mut rx);

    // Nobody is signed in yet; the rejection arrives as a notice.
    let _ = thread.submit("hello", ReplyTarget::Thread).await;
    session.sign_in(fixtures::demo_user(0));

    let top = thread.submit("hello", ReplyTarget::Thread).await?;
    let reply = thread.submit("hi", ReplyTarget::Comment(top.id().clone())).await?;
    thread.reply_to("hey, thanks", &reply).await?;
    thread.toggle_like(&top).await?;
    drain_notices(&mut rx);

    let expandable = thread.with_state(|state| {
        state
            .comments
            .iter()
            .find(|comment| comment.has_more_replies)
            .map(|comment| comment.id.clone())
    });
    if let Some(id) = expandable {
        thread.load_more_replies(&id).await?;
    }

    thread.source().fail_next("server is busy, please try again later");
    let _ = thread.delete(&reply).await;
    thread.delete(&CommentPath::top("comment_1")).await?;
    drain_notices(&mut rx);

    let mut reports = ReportDesk::new();
    let last = thread.with_state(|state| {
        state
            .comments
            .last()
            .map(|comment| CommentPath::top(comment.id.clone()))
    });
    if let Some(path) = last {
        thread.with_state(|state| reports.report_comment(state, &path))?;
        let report =
            reports.submit(ReportKind::Spam, Some("links to a shop".to_owned()), None)?;
        println!(
            "* reported {} as {}",
            report.subject,
            report.kind.label().to_lowercase()
        );
    }

    let mut blocked = BlockList::new();
    blocked.block(&fixtures::demo_user(2))?;
    let options = RenderOptions {
        blocked: Some(&blocked),
        ..RenderOptions::default()
    };
    println!();
    println!(
        "{}",
        thread.with_state(|state| render::render_thread(state, &options))
    );
    Ok(())
}

fn drain_notices(rx: &mut UnboundedReceiver<ThreadEvent>) {
    while let Ok(event) = rx.try_recv() {
        let marker = if event.is_failure() { '!' } else { '*' };
        println!("{marker} {}", event.notice());
    }
}
