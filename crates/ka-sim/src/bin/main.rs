//! Knight Ascent simulator
//!
//! Usage:
//!   ascent-sim run --game ascent-50 --rounds 1000000 --mode mystic
//!   ascent-sim run --preset exhaustive --mode dragon --stake 2
//!   ascent-sim interactive           - Question flow on stdin
//!   ascent-sim tables                - Crash and bonus-cost tables
//!   ascent-sim export-config         - Dump a preset as JSON or YAML

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use clap::{Args, Parser, Subcommand, ValueEnum};
use ka_engine::{BonusKind, CashoutStrategy, GameConfig, GameContext, PlayMode};
use ka_sim::{
    BatchRunner, GameTables, SimConfig, SimulationReport, SpeedSelection, TableCache,
    ask_sim_config, load_game_config, open_csv_sinks,
};
use log::info;

#[derive(Parser)]
#[command(name = "ascent-sim", about = "Knight Ascent crash-game simulator", version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Simulate a batch of rounds
    Run {
        #[command(flatten)]
        game: GameArgs,
        #[command(flatten)]
        run: RunArgs,
    },
    /// Ask for the run parameters on stdin
    Interactive {
        #[command(flatten)]
        game: GameArgs,
        #[command(flatten)]
        output: OutputArgs,
        /// Random seed for reproducibility
        #[arg(long)]
        seed: Option<u64>,
    },
    /// Print the crash probability and bonus cost tables
    Tables {
        #[command(flatten)]
        game: GameArgs,
        /// Print JSON instead of text
        #[arg(long)]
        json: bool,
    },
    /// Write a game configuration to a file or stdout
    ExportConfig {
        #[command(flatten)]
        game: GameArgs,
        #[arg(short, long, value_enum, default_value = "yaml")]
        format: ConfigFormat,
        /// Output file (stdout when omitted)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

#[derive(Args)]
struct GameArgs {
    /// Preset name (ascent-100, ascent-50)
    #[arg(short, long, default_value = "ascent-100")]
    game: String,
    /// JSON or YAML game configuration (overrides --game)
    #[arg(short, long)]
    config: Option<PathBuf>,
    /// Multiplier table cache (Step,Multiplier CSV)
    #[arg(long)]
    table_cache: Option<PathBuf>,
    /// Stake per round (overrides the game's base stake)
    #[arg(long)]
    stake: Option<f64>,
}

#[derive(Args)]
struct RunArgs {
    /// Starting point for the run options below
    #[arg(long, value_enum, default_value = "standard")]
    preset: PresetArg,
    /// Number of rounds (preset value when omitted)
    #[arg(short, long)]
    rounds: Option<u64>,
    #[arg(short, long, value_enum, default_value = "base")]
    mode: ModeArg,
    /// Speed mode name (random per round when omitted)
    #[arg(long)]
    speed: Option<String>,
    /// "R" for random, or a fixed step
    #[arg(long, default_value = "R")]
    cashout: String,
    /// Random seed for reproducibility
    #[arg(long)]
    seed: Option<u64>,
    /// Run chunks on a single thread
    #[arg(long)]
    sequential: bool,
    /// Rounds per chunk
    #[arg(long)]
    chunk_size: Option<usize>,
    /// Log a progress line every N rounds (0 = off)
    #[arg(long)]
    progress: Option<u64>,
    #[command(flatten)]
    output: OutputArgs,
}

#[derive(Args)]
struct OutputArgs {
    /// Directory for the round and bonus CSV logs
    #[arg(short, long, default_value = ".")]
    out_dir: PathBuf,
    /// Skip the CSV logs
    #[arg(long)]
    no_csv: bool,
    /// Also write the report as JSON
    #[arg(long)]
    json_report: Option<PathBuf>,
}

#[derive(Clone, Copy, ValueEnum)]
enum ModeArg {
    /// No bonuses
    Base,
    /// Base game with free bonuses
    Free,
    /// Mystic bonus buy
    Mystic,
    /// Dragon bonus buy
    Dragon,
}

impl From<ModeArg> for PlayMode {
    fn from(mode: ModeArg) -> Self {
        match mode {
            ModeArg::Base => PlayMode::Base,
            ModeArg::Free => PlayMode::BaseWithFreeBonuses,
            ModeArg::Mystic => PlayMode::BonusBuy(BonusKind::Mystic),
            ModeArg::Dragon => PlayMode::BonusBuy(BonusKind::Dragon),
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum PresetArg {
    /// 100k rounds, parallel
    Standard,
    /// 10k seeded rounds on one thread
    Quick,
    /// 10M rounds, no per-round log
    Exhaustive,
}

impl From<PresetArg> for SimConfig {
    fn from(preset: PresetArg) -> Self {
        match preset {
            PresetArg::Standard => SimConfig::default(),
            PresetArg::Quick => SimConfig::quick(),
            PresetArg::Exhaustive => SimConfig::exhaustive(),
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum ConfigFormat {
    Json,
    Yaml,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    match cli.command {
        Commands::Run { game, run } => cmd_run(&game, &run),
        Commands::Interactive { game, output, seed } => cmd_interactive(&game, &output, seed),
        Commands::Tables { game, json } => cmd_tables(&game, json),
        Commands::ExportConfig {
            game,
            format,
            output,
        } => cmd_export(&game, format, output.as_deref()),
    }
}

fn load_config(args: &GameArgs) -> Result<GameConfig> {
    let config = match &args.config {
        Some(path) => load_game_config(path)
            .with_context(|| format!("Failed to load game config {}", path.display())),
        None => match GameConfig::preset(&args.game) {
            Some(config) => Ok(config),
            None => bail!("Unknown game preset '{}' (expected ascent-100 or ascent-50)", args.game),
        },
    }?;

    Ok(match args.stake {
        Some(stake) => config.with_base_stake(stake),
        None => config,
    })
}

fn build_context(args: &GameArgs) -> Result<GameContext> {
    let config = load_config(args)?;
    let ctx = match &args.table_cache {
        Some(path) => {
            let table = TableCache::new(path)
                .load_or_generate(&config)
                .context("Failed to prepare multiplier table")?;
            GameContext::with_table(config, table)?
        }
        None => GameContext::new(config)?,
    };
    Ok(ctx)
}

fn parse_cashout(value: &str) -> Result<CashoutStrategy> {
    if value.eq_ignore_ascii_case("r") {
        return Ok(CashoutStrategy::Random);
    }
    let step = value
        .parse::<u32>()
        .with_context(|| format!("Invalid cashout '{value}': expected R or a step number"))?;
    Ok(CashoutStrategy::Fixed(step))
}

fn cmd_run(game: &GameArgs, args: &RunArgs) -> Result<()> {
    let ctx = build_context(game)?;

    let mut config = SimConfig::from(args.preset)
        .with_mode(args.mode.into())
        .with_cashout(parse_cashout(&args.cashout)?);
    if let Some(rounds) = args.rounds {
        config = config.with_rounds(rounds);
    }
    if let Some(size) = args.chunk_size {
        config = config.with_chunk_size(size);
    }
    if let Some(interval) = args.progress {
        config.progress_interval = interval;
    }
    if args.sequential {
        config = config.with_parallel(false);
    }
    if let Some(seed) = args.seed {
        config = config.with_seed(seed);
    }
    if let Some(name) = &args.speed {
        config = config.with_speed(SpeedSelection::Fixed(name.clone()));
    }

    simulate(&ctx, config, &args.output)
}

fn cmd_interactive(game: &GameArgs, output: &OutputArgs, seed: Option<u64>) -> Result<()> {
    let ctx = build_context(game)?;

    let mut base = SimConfig::default();
    base.seed = seed;
    let config = ask_sim_config(&mut io::stdin().lock(), &mut io::stdout(), ctx.total_steps(), base)?;

    simulate(&ctx, config, output)
}

fn simulate(ctx: &GameContext, mut config: SimConfig, output: &OutputArgs) -> Result<()> {
    if output.no_csv {
        config.write_rounds_csv = false;
        config.write_bonus_csv = false;
    } else {
        config = config.with_output_dir(output.out_dir.display().to_string());
    }

    let runner = BatchRunner::new(ctx, config.clone())?;
    let mut sinks = if output.no_csv {
        Vec::new()
    } else {
        open_csv_sinks(&config, ctx, &output.out_dir).context("Failed to open CSV logs")?
    };

    let outcome = runner.run(&mut sinks)?;
    let report = SimulationReport::new(ctx, &config, &outcome);
    println!("{}", report.to_text());

    if let Some(path) = &output.json_report {
        fs::write(path, report.to_json())
            .with_context(|| format!("Failed to write {}", path.display()))?;
        info!("JSON report written to {}", path.display());
    }
    Ok(())
}

fn cmd_tables(game: &GameArgs, json: bool) -> Result<()> {
    let ctx = build_context(game)?;
    let tables = GameTables::new(&ctx);
    if json {
        println!("{}", serde_json::to_string_pretty(&tables)?);
    } else {
        println!("{}", tables.to_text());
    }
    Ok(())
}

fn cmd_export(game: &GameArgs, format: ConfigFormat, output: Option<&Path>) -> Result<()> {
    let config = load_config(game)?;
    let text = match format {
        ConfigFormat::Json => config.to_json()?,
        ConfigFormat::Yaml => config.to_yaml()?,
    };

    match output {
        Some(path) => {
            fs::write(path, text).with_context(|| format!("Failed to write {}", path.display()))?;
            info!("Configuration written to {}", path.display());
        }
        None => println!("{text}"),
    }
    Ok(())
}
