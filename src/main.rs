use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use colored::*;
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use tabled::{settings::Style, Table, Tabled};

use posturers::asymmetry::{AsymmetryAnalyzer, RomStatus, Severity};
use posturers::exercise::ExerciseKind;
use posturers::logging::{init_logging, LogConfig, LogFormat};
use posturers::metrics::JointAngles;
use posturers::monitor::PostureSnapshot;
use posturers::scoring::Grade;
use posturers::session::dispatch_effects;
use posturers::smoothing::Smoother;
use posturers::{
    AnalysisConfig, ExerciseCatalog, ExerciseResult, ExerciseSession, LandmarkFrame,
    MonitorUpdate, PostureMonitor, PredicateClassifier, ResultSink, SessionFactory, VoiceSink,
};

/// posturers - Posture Analysis CLI
///
/// Replays recorded body-landmark frames through the posture scoring,
/// balance and exercise-session engines.
#[derive(Parser)]
#[command(name = "posturers")]
#[command(version)]
#[command(about = "Posture analysis over recorded landmark frames", long_about = None)]
struct Cli {
    /// Sets a custom config file
    #[arg(short, long, value_name = "FILE", global = true)]
    config: Option<PathBuf>,

    /// Increase verbosity of output
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Log output format (pretty, json, compact)
    #[arg(long, default_value = "compact", global = true)]
    log_format: LogFormat,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Score posture over a recording (calibrates on the first frames)
    Analyze {
        /// JSON array of landmark frames
        #[arg(short, long)]
        input: PathBuf,

        /// Print the final snapshot as JSON
        #[arg(long)]
        json: bool,
    },

    /// Left/right balance and range of motion over a recording
    Balance {
        /// JSON array of landmark frames
        #[arg(short, long)]
        input: PathBuf,

        /// Print the report as JSON
        #[arg(long)]
        json: bool,
    },

    /// Run an exercise session against a recording
    Simulate {
        /// Exercise id from the catalog
        #[arg(short, long)]
        exercise: String,

        /// JSON array of landmark frames
        #[arg(short, long)]
        input: PathBuf,

        /// Frames per session second
        #[arg(long, default_value = "30")]
        fps: u32,

        /// Exercise catalog (TOML); built-in catalog if omitted
        #[arg(long)]
        catalog: Option<PathBuf>,

        /// Print only the result as JSON
        #[arg(long)]
        json: bool,
    },

    /// List available exercises
    Exercises {
        /// Exercise catalog (TOML); built-in catalog if omitted
        #[arg(long)]
        catalog: Option<PathBuf>,
    },

    /// Show or write the analysis configuration
    Config {
        /// Write the effective configuration to this file
        #[arg(long, value_name = "FILE")]
        init: Option<PathBuf>,

        /// Print the default config location
        #[arg(long)]
        path: bool,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let log_config = LogConfig {
        format: cli.log_format,
        ..LogConfig::from_verbosity(cli.verbose)
    };
    init_logging(&log_config)?;

    let config = load_config(cli.config.as_deref())?;

    match cli.command {
        Commands::Analyze { input, json } => analyze(&config, &input, json),
        Commands::Balance { input, json } => balance(&config, &input, json),
        Commands::Simulate {
            exercise,
            input,
            fps,
            catalog,
            json,
        } => simulate(&config, &exercise, &input, fps, catalog.as_deref(), json),
        Commands::Exercises { catalog } => list_exercises(catalog.as_deref()),
        Commands::Config { init, path } => show_config(&config, init.as_deref(), path),
    }
}

fn load_config(path: Option<&Path>) -> Result<AnalysisConfig> {
    match path {
        Some(path) => AnalysisConfig::load_from_file(path)
            .with_context(|| format!("Failed to load config from {}", path.display())),
        None => Ok(AnalysisConfig::load_or_default()),
    }
}

fn load_frames(path: &Path) -> Result<Vec<LandmarkFrame>> {
    let file = File::open(path).with_context(|| format!("Failed to open {}", path.display()))?;
    let frames: Vec<LandmarkFrame> = serde_json::from_reader(BufReader::new(file))
        .with_context(|| format!("Failed to parse landmark frames from {}", path.display()))?;
    if frames.is_empty() {
        bail!("{} contains no frames", path.display());
    }
    tracing::info!(frames = frames.len(), file = %path.display(), "Loaded recording");
    Ok(frames)
}

fn load_catalog(path: Option<&Path>) -> Result<ExerciseCatalog> {
    match path {
        Some(path) => ExerciseCatalog::load_from_file(path)
            .with_context(|| format!("Failed to load exercise catalog from {}", path.display())),
        None => Ok(ExerciseCatalog::builtin()),
    }
}

fn grade_label(grade: Grade) -> ColoredString {
    match grade {
        Grade::Good => grade.to_string().green(),
        Grade::Warning => grade.to_string().yellow(),
        Grade::Danger => grade.to_string().red(),
    }
}

#[derive(Tabled)]
struct ItemRow {
    #[tabled(rename = "Metric")]
    metric: String,
    #[tabled(rename = "Value")]
    value: String,
    #[tabled(rename = "Score")]
    score: String,
    #[tabled(rename = "Grade")]
    grade: String,
    #[tabled(rename = "Diagnosis")]
    diagnosis: String,
}

fn analyze(config: &AnalysisConfig, input: &Path, json: bool) -> Result<()> {
    let frames = load_frames(input)?;
    let mut monitor = PostureMonitor::new(config.clone())?;

    let mut last: Option<PostureSnapshot> = None;
    for frame in &frames {
        if let MonitorUpdate::Snapshot(snapshot) = monitor.process_frame(frame) {
            last = Some(*snapshot);
        }
    }

    let Some(snapshot) = last else {
        bail!(
            "Recording has {} frames; calibration needs {}",
            frames.len(),
            config.calibration.warmup_frames
        );
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&snapshot)?);
        return Ok(());
    }

    println!("{}", "Posture Analysis".bold());
    let rows: Vec<ItemRow> = snapshot
        .items
        .iter()
        .map(|item| ItemRow {
            metric: item.id.label().to_string(),
            value: format!("{:.1} {}", item.raw_value, item.id.unit()),
            score: format!("{:.1}", item.score),
            grade: item.grade.to_string(),
            diagnosis: item.diagnosis.clone(),
        })
        .collect();
    println!("{}", Table::new(rows).with(Style::rounded()));

    match &snapshot.composite {
        Some(composite) => {
            println!(
                "\n{} {:.1} ({})",
                "Overall:".bold(),
                composite.score,
                grade_label(composite.grade)
            );
            for penalty in &composite.penalties {
                println!("  {} {:?} -{:.0}", "penalty".dimmed(), penalty.kind, penalty.points);
            }
        }
        None => println!("{}", "No scorable metrics were visible".yellow()),
    }

    println!("\n{}", "Recommendations".bold());
    for item in snapshot.items.iter().filter(|i| i.grade != Grade::Good) {
        println!("  • {}: {}", item.id.label(), item.recommendation);
    }

    if !snapshot.low_confidence.is_empty() {
        let names: Vec<&str> = snapshot.low_confidence.iter().map(|m| m.label()).collect();
        println!(
            "\n{} {}",
            "Low-confidence baselines:".yellow(),
            names.join(", ")
        );
    }
    Ok(())
}

#[derive(Tabled)]
struct AsymmetryRow {
    #[tabled(rename = "Joint")]
    joint: String,
    #[tabled(rename = "Left")]
    left: String,
    #[tabled(rename = "Right")]
    right: String,
    #[tabled(rename = "Diff %")]
    percent: String,
    #[tabled(rename = "Severity")]
    severity: String,
}

fn balance(config: &AnalysisConfig, input: &Path, json: bool) -> Result<()> {
    let frames = load_frames(input)?;
    let mut smoother = Smoother::from_config(&config.smoothing)?;

    let mut angles = JointAngles::default();
    for frame in &frames {
        for (kind, value) in JointAngles::from_frame_checked(frame, &config.metrics) {
            if let Some(smoothed) = smoother.smooth(kind.key(), value) {
                angles.set(kind, smoothed);
            }
        }
    }

    let report = AsymmetryAnalyzer::with_norms(config.rom.clone()).analyze(&angles);

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    println!("{}", "Left/Right Balance".bold());
    let rows: Vec<AsymmetryRow> = report
        .asymmetries
        .iter()
        .map(|r| AsymmetryRow {
            joint: r.joint.to_string(),
            left: format!("{:.1}°", r.left_value),
            right: format!("{:.1}°", r.right_value),
            percent: format!("{:.1}", r.percent_diff),
            severity: format!("{:?}", r.severity),
        })
        .collect();
    println!("{}", Table::new(rows).with(Style::rounded()));
    println!("{} {:.0}", "Balance score:".bold(), report.balance_score);

    if let Some(worst) = report.worst_asymmetry().filter(|r| r.severity > Severity::Minimal) {
        println!("  {}", worst.severity.recommendation());
    }

    println!("\n{}", "Range of Motion".bold());
    for rom in &report.rom {
        if rom.status == RomStatus::Normal {
            println!("  {}", rom.message);
        } else {
            println!("  {}", rom.message.yellow());
        }
    }
    println!("{} {:.1}%", "ROM score:".bold(), report.rom_score);
    Ok(())
}

/// Prints spoken prompts to the terminal
struct ConsoleVoice {
    quiet: bool,
}

impl VoiceSink for ConsoleVoice {
    fn speak(&mut self, text: &str) {
        if !self.quiet {
            println!("  {} {}", "🔊".dimmed(), text.cyan());
        }
    }

    fn cancel(&mut self) {
        if !self.quiet {
            println!("  {}", "(speech cancelled)".dimmed());
        }
    }
}

#[derive(Default)]
struct CollectedResult(Option<ExerciseResult>);

impl ResultSink for CollectedResult {
    fn store(&mut self, result: &ExerciseResult) {
        self.0 = Some(result.clone());
    }
}

fn simulate(
    config: &AnalysisConfig,
    exercise_id: &str,
    input: &Path,
    fps: u32,
    catalog: Option<&Path>,
    json: bool,
) -> Result<()> {
    if fps == 0 {
        bail!("--fps must be at least 1");
    }
    let catalog = load_catalog(catalog)?;
    let frames = load_frames(input)?;
    let classifier = PredicateClassifier::with_config(config.metrics.clone());

    let mut session: Box<dyn ExerciseSession> =
        SessionFactory::create(&catalog, exercise_id, &config.session)?;
    let mut voice = ConsoleVoice { quiet: json };
    let mut results = CollectedResult::default();

    if !json {
        println!("{} {}", "Exercise:".bold(), exercise_id);
    }
    dispatch_effects(&session.start(), &mut voice, &mut results);

    for (i, frame) in frames.iter().enumerate() {
        let effects = session.observe_frame(frame, &classifier);
        dispatch_effects(&effects, &mut voice, &mut results);

        if (i + 1) % fps as usize == 0 {
            let effects = session.tick();
            dispatch_effects(&effects, &mut voice, &mut results);
        }
        if session.is_finished() {
            break;
        }
    }

    match results.0 {
        Some(result) if json => println!("{}", serde_json::to_string_pretty(&result)?),
        Some(result) => {
            println!("\n{}", "Session complete".green().bold());
            println!("  Sets:     {}", result.completed_sets);
            println!("  Reps:     {:?} (total {})", result.completed_reps, result.total_reps);
            println!("  Accuracy: {:.1}%", result.accuracy);
            println!("  Duration: {}s", result.duration_seconds);
        }
        None => {
            let message = format!(
                "Recording ended in phase {} of set {}",
                session.phase(),
                session.current_set()
            );
            if json {
                eprintln!("{}", message);
            } else {
                println!("\n{}", message.yellow());
            }
        }
    }
    Ok(())
}

#[derive(Tabled)]
struct ExerciseRow {
    #[tabled(rename = "Id")]
    id: String,
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Kind")]
    kind: String,
    #[tabled(rename = "Sets")]
    sets: u32,
    #[tabled(rename = "Rest (s)")]
    rest: u32,
    #[tabled(rename = "Detail")]
    detail: String,
}

fn list_exercises(catalog: Option<&Path>) -> Result<()> {
    let catalog = load_catalog(catalog)?;
    let rows: Vec<ExerciseRow> = catalog
        .iter()
        .map(|e| {
            let (kind, detail) = match &e.kind {
                ExerciseKind::Hold { hold_seconds, pose } => (
                    "hold",
                    match pose {
                        Some(pose) => format!("{}s as {}", hold_seconds, pose.name),
                        None => format!("{}s", hold_seconds),
                    },
                ),
                ExerciseKind::Sequence {
                    target_cycles,
                    poses,
                } => {
                    let names: Vec<&str> = poses.iter().map(|s| s.pose.name.as_str()).collect();
                    (
                        "sequence",
                        format!("{} x [{}]", target_cycles, names.join(" → ")),
                    )
                }
            };
            ExerciseRow {
                id: e.id.clone(),
                name: e.name.clone(),
                kind: kind.to_string(),
                sets: e.sets,
                rest: e.rest_seconds,
                detail,
            }
        })
        .collect();
    println!("{}", Table::new(rows).with(Style::rounded()));
    Ok(())
}

fn show_config(config: &AnalysisConfig, init: Option<&Path>, path: bool) -> Result<()> {
    if path {
        println!("{}", AnalysisConfig::default_config_path().display());
        return Ok(());
    }
    if let Some(target) = init {
        config
            .save_to_file(target)
            .with_context(|| format!("Failed to write config to {}", target.display()))?;
        println!("{} {}", "✓ Wrote configuration to".green(), target.display());
        return Ok(());
    }
    println!("{}", toml::to_string_pretty(config)?);
    Ok(())
}
