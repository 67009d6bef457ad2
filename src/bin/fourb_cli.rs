use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use fourb_engine::api::{score_sensor_session, score_session};
use fourb_engine::calibration::PlayerCalibration;
use fourb_engine::config::{EngineConfig, PlayerLevel};
use fourb_engine::fixtures::{ExpectationDiff, FixtureCatalog, FixtureRunner};
use fourb_engine::scoring::FourBScore;
use fourb_engine::testing::synthetic::{sensor_csv, SyntheticProfile, SyntheticSession};
use tracing::Level;

#[derive(Parser, Debug)]
#[command(
    name = "fourb_cli",
    about = "Score swing sessions and run the golden fixture harness"
)]
struct Cli {
    /// Override directory containing fixture assets (defaults to ./fixtures)
    #[arg(long, global = true)]
    fixtures_dir: Option<PathBuf>,
    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Score a motion-capture session
    Score {
        #[arg(long)]
        kinematics: Option<PathBuf>,
        #[arg(long)]
        energy: Option<PathBuf>,
        #[arg(long, default_value = "high_school")]
        level: PlayerLevel,
        #[arg(long)]
        calibration: Option<PathBuf>,
        #[arg(long)]
        config: Option<PathBuf>,
        #[arg(long)]
        output: Option<PathBuf>,
    },
    /// Score a bat-sensor session
    Sensor {
        #[arg(long)]
        swings: PathBuf,
        #[arg(long, default_value = "high_school")]
        level: PlayerLevel,
        #[arg(long)]
        calibration: Option<PathBuf>,
        #[arg(long)]
        config: Option<PathBuf>,
        #[arg(long)]
        output: Option<PathBuf>,
    },
    /// Score a fixture and compare against its expectations
    Verify {
        #[arg(long)]
        fixture: String,
        #[arg(long)]
        expect: Option<PathBuf>,
        #[arg(long)]
        output: Option<PathBuf>,
    },
    /// List available fixtures on disk
    DumpFixtures,
    /// Write a seeded synthetic session as CSV exports
    Synth {
        #[arg(long, default_value_t = 5)]
        swings: usize,
        #[arg(long, default_value_t = 42)]
        seed: u64,
        #[arg(long)]
        out_dir: PathBuf,
        #[arg(long, default_value = "clean")]
        profile: SyntheticProfile,
        /// File stem (defaults to the profile name)
        #[arg(long)]
        name: Option<String>,
        /// Raise an explicit contact flag in the kinematics export
        #[arg(long)]
        contact_marker: bool,
        /// Also write a bat-sensor summary export
        #[arg(long)]
        sensor: bool,
    },
    /// Print the effective engine configuration as JSON
    PrintConfig {
        #[arg(long)]
        config: Option<PathBuf>,
    },
}

fn main() -> ExitCode {
    match run() {
        Ok(code) => code,
        Err(err) => {
            eprintln!("Error: {err:?}");
            ExitCode::from(1)
        }
    }
}

fn run() -> Result<ExitCode> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let catalog = cli
        .fixtures_dir
        .map(FixtureCatalog::new)
        .unwrap_or_else(|| FixtureCatalog::new("fixtures"));

    match cli.command {
        Commands::Score {
            kinematics,
            energy,
            level,
            calibration,
            config,
            output,
        } => run_score(kinematics, energy, level, calibration, config, output),
        Commands::Sensor {
            swings,
            level,
            calibration,
            config,
            output,
        } => run_sensor(&swings, level, calibration, config, output),
        Commands::Verify {
            fixture,
            expect,
            output,
        } => run_verify(&catalog, &fixture, expect, output),
        Commands::DumpFixtures => run_dump(&catalog),
        Commands::Synth {
            swings,
            seed,
            out_dir,
            profile,
            name,
            contact_marker,
            sensor,
        } => run_synth(swings, seed, &out_dir, profile, name, contact_marker, sensor),
        Commands::PrintConfig { config } => {
            let config = load_config(config)?;
            println!("{}", serde_json::to_string_pretty(&config)?);
            Ok(ExitCode::from(0))
        }
    }
}

fn init_tracing(verbose: u8) {
    let level = match verbose {
        0 => Level::WARN,
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    };
    let _ = tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

fn load_config(path: Option<PathBuf>) -> Result<EngineConfig> {
    match path {
        Some(path) => EngineConfig::try_load(&path)
            .with_context(|| format!("loading config {}", path.display())),
        None => Ok(EngineConfig::load()),
    }
}

fn load_calibration(path: Option<PathBuf>) -> Result<Option<PlayerCalibration>> {
    path.map(|path| {
        PlayerCalibration::load(&path)
            .with_context(|| format!("loading calibration {}", path.display()))
    })
    .transpose()
}

fn read_export(path: Option<PathBuf>) -> Result<Option<String>> {
    path.map(|path| {
        fs::read_to_string(&path).with_context(|| format!("reading {}", path.display()))
    })
    .transpose()
}

fn run_score(
    kinematics: Option<PathBuf>,
    energy: Option<PathBuf>,
    level: PlayerLevel,
    calibration: Option<PathBuf>,
    config: Option<PathBuf>,
    output: Option<PathBuf>,
) -> Result<ExitCode> {
    if kinematics.is_none() && energy.is_none() {
        bail!("score needs --kinematics and/or --energy");
    }
    let config = load_config(config)?;
    let calibration = load_calibration(calibration)?;
    let kinematics = read_export(kinematics)?;
    let energy = read_export(energy)?;

    let score = score_session(
        kinematics.as_deref(),
        energy.as_deref(),
        level,
        calibration.as_ref(),
        &config,
    );
    emit_score(&score, output)?;
    Ok(ExitCode::from(0))
}

fn run_sensor(
    swings: &Path,
    level: PlayerLevel,
    calibration: Option<PathBuf>,
    config: Option<PathBuf>,
    output: Option<PathBuf>,
) -> Result<ExitCode> {
    let config = load_config(config)?;
    let calibration = load_calibration(calibration)?;
    let csv = fs::read_to_string(swings)
        .with_context(|| format!("reading {}", swings.display()))?;

    let score = score_sensor_session(&csv, level, calibration.as_ref(), &config);
    emit_score(&score, output)?;
    Ok(ExitCode::from(0))
}

fn run_verify(
    catalog: &FixtureCatalog,
    fixture: &str,
    override_expect: Option<PathBuf>,
    output: Option<PathBuf>,
) -> Result<ExitCode> {
    let data = catalog.load(fixture, override_expect)?;
    let score = FixtureRunner::default().run(&data);
    emit_score(&score, output)?;

    if let Some(expectations) = data.expectations {
        match expectations.verify(&score) {
            Ok(()) => Ok(ExitCode::from(0)),
            Err(diff) => {
                emit_diff(&diff)?;
                Ok(ExitCode::from(2))
            }
        }
    } else {
        Ok(ExitCode::from(0))
    }
}

fn run_dump(catalog: &FixtureCatalog) -> Result<ExitCode> {
    let fixtures = catalog.discover()?;
    if fixtures.is_empty() {
        println!("No fixtures found under {}", catalog.root().display());
        return Ok(ExitCode::from(0));
    }

    for metadata in fixtures {
        if let Some(expect) = metadata.expect_path {
            println!("{} -> {}", metadata.name, expect.display());
        } else {
            println!("{}", metadata.name);
        }
    }
    Ok(ExitCode::from(0))
}

#[allow(clippy::too_many_arguments)]
fn run_synth(
    swings: usize,
    seed: u64,
    out_dir: &Path,
    profile: SyntheticProfile,
    name: Option<String>,
    contact_marker: bool,
    sensor: bool,
) -> Result<ExitCode> {
    if swings == 0 {
        bail!("--swings must be at least 1");
    }
    fs::create_dir_all(out_dir).with_context(|| format!("creating {}", out_dir.display()))?;
    let stem = name.unwrap_or_else(|| profile.as_str().to_string());
    let session = SyntheticSession::new(profile, swings, seed).with_contact_marker(contact_marker);

    let mut written = vec![
        write_file(out_dir, &format!("{stem}.kinematics.csv"), &session.kinematics_csv()?)?,
        write_file(out_dir, &format!("{stem}.energy.csv"), &session.energy_csv()?)?,
    ];
    if sensor {
        written.push(write_file(
            out_dir,
            &format!("{stem}.sensor.csv"),
            &sensor_csv(swings, seed)?,
        )?);
    }

    for path in written {
        println!("{}", path.display());
    }
    Ok(ExitCode::from(0))
}

fn write_file(dir: &Path, file_name: &str, contents: &str) -> Result<PathBuf> {
    let path = dir.join(file_name);
    fs::write(&path, contents).with_context(|| format!("writing {}", path.display()))?;
    Ok(path)
}

fn emit_score(score: &FourBScore, output_path: Option<PathBuf>) -> Result<()> {
    let json = score.to_json_pretty()?;

    if let Some(path) = output_path {
        fs::write(&path, json).with_context(|| format!("writing {}", path.display()))?;
    } else {
        println!("{json}");
    }

    Ok(())
}

fn emit_diff(diff: &ExpectationDiff) -> Result<()> {
    let json = serde_json::to_string_pretty(&diff.to_json())?;
    eprintln!("{json}");
    Ok(())
}
