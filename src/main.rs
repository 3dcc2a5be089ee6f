use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use snake_qlearn::agent::QAgent;
use snake_qlearn::config::SnakeConfig;
use snake_qlearn::persist::{load_table, save_scores};
use snake_qlearn::report::{AsciiPlot, ScoreSink, rolling_mean};
use snake_qlearn::trainer::{Evaluation, Trainer, evaluate};
use snake_qlearn::window::{self, PlaySession, Session};
use std::path::PathBuf;
use tracing::info;

#[derive(Parser)]
#[command(name = "snake-qlearn")]
#[command(version, about = "Snake with a tabular Q-learning agent")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Train a Q-table and save it
    Train(TrainArgs),
    /// Play a saved Q-table without learning
    Eval(EvalArgs),
    /// Play snake with the keyboard
    Play(PlayArgs),
}

#[derive(Args)]
struct CommonArgs {
    /// JSON config file; unset fields keep their defaults
    #[arg(long)]
    config: Option<PathBuf>,

    /// Grid width in cells
    #[arg(long)]
    width: Option<i32>,

    /// Grid height in cells
    #[arg(long)]
    height: Option<i32>,

    /// RNG seed for a reproducible run
    #[arg(long)]
    seed: Option<u64>,
}

impl CommonArgs {
    fn load(&self) -> Result<SnakeConfig> {
        let mut config = match &self.config {
            Some(path) => SnakeConfig::load(path)?,
            None => SnakeConfig::default(),
        };
        if let Some(w) = self.width {
            config.grid.width = w;
        }
        if let Some(h) = self.height {
            config.grid.height = h;
        }
        if self.seed.is_some() {
            config.training.seed = self.seed;
        }
        config.validate()?;
        Ok(config)
    }
}

#[derive(Args)]
struct TrainArgs {
    #[command(flatten)]
    common: CommonArgs,

    #[arg(long)]
    episodes: Option<usize>,

    /// Where the trained table is written
    #[arg(long, default_value = "q_table.bin")]
    out: PathBuf,

    /// Start from the table already at --out
    #[arg(long)]
    resume: bool,

    /// Save the table every N episodes as well as at the end
    #[arg(long)]
    checkpoint_every: Option<usize>,

    /// Also write per-episode scores as JSON
    #[arg(long)]
    scores: Option<PathBuf>,

    /// Skip the score curve at the end
    #[arg(long)]
    no_plot: bool,
}

#[derive(Args)]
struct EvalArgs {
    #[command(flatten)]
    common: CommonArgs,

    #[arg(long, default_value = "q_table.bin")]
    table: PathBuf,

    #[arg(long, default_value_t = 10)]
    episodes: usize,

    /// Exploration during evaluation; defaults to the training start epsilon, 0 is pure greedy
    #[arg(long)]
    epsilon: Option<f32>,

    /// Watch the games in a window
    #[arg(long)]
    render: bool,

    /// Cell size in pixels when rendering
    #[arg(long, default_value_t = 20)]
    cell: u32,

    /// Milliseconds per step when rendering
    #[arg(long, default_value_t = 60)]
    tick_ms: u64,
}

#[derive(Args)]
struct PlayArgs {
    #[command(flatten)]
    common: CommonArgs,

    #[arg(long, default_value_t = 20)]
    cell: u32,
}

fn main() -> Result<()> {
    init_tracing();
    match Cli::parse().command {
        Command::Train(args) => train(args),
        Command::Eval(args) => eval(args),
        Command::Play(args) => play(args),
    }
}

fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}

fn train(args: TrainArgs) -> Result<()> {
    let mut config = args.common.load()?;
    if let Some(n) = args.episodes {
        config.training.episodes = n;
    }
    if args.checkpoint_every.is_some() {
        config.training.checkpoint_every = args.checkpoint_every;
    }

    let agent = if args.resume {
        let table = load_table(&args.out)
            .with_context(|| format!("cannot resume from {}", args.out.display()))?;
        info!(states = table.len(), "resuming from saved table");
        QAgent::with_table(table)
    } else {
        QAgent::new()
    };

    let mut trainer = Trainer::with_agent(&config, agent)?;
    let report = trainer.train(Some(args.out.as_path()))?;
    println!("{report}");

    if let Some(path) = &args.scores {
        save_scores(trainer.scores(), path)
            .with_context(|| format!("cannot write scores to {}", path.display()))?;
    }
    if !args.no_plot {
        AsciiPlot::new(std::io::stdout().lock(), 72, 12).plot(trainer.scores())?;
    }
    Ok(())
}

fn eval(args: EvalArgs) -> Result<()> {
    let config = args.common.load()?;
    let table = load_table(&args.table)
        .with_context(|| format!("cannot load q-table from {}", args.table.display()))?;
    let epsilon = args.epsilon.unwrap_or(config.hyper.epsilon_start);
    info!(states = table.len(), episodes = args.episodes, epsilon, "evaluating");

    if args.render {
        let eval = Evaluation::new(table, &config, args.episodes, epsilon)?;
        let session = Session::Watch { eval, tick_ms: args.tick_ms, paused: false };
        return window::run(session, config.grid, args.cell);
    }

    let scores = evaluate(table, &config, args.episodes, epsilon)?;
    for score in &scores {
        println!("SCORE: {score}");
    }
    println!("MEAN SCORE: {:.2}", rolling_mean(&scores, scores.len()));
    Ok(())
}

fn play(args: PlayArgs) -> Result<()> {
    let config = args.common.load()?;
    let session = Session::Play(PlaySession::new(config.grid, config.rewards)?);
    window::run(session, config.grid, args.cell)
}
