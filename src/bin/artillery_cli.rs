use artillery_ballistics::cli_api::{
    self, FormFactorReport, MatchRangeReport, MaxRangeReport, RangeTableReport, SingleShotReport,
};
use artillery_ballistics::config::{
    ConditionsSection, FormFactorEntry, ProfileConfig, ProjectileSection, SimulationSection,
};
use artillery_ballistics::constants::DEFAULT_TOLERANCE_M;
use artillery_ballistics::{AtmosphereModel, ProjectileProfile, RangeTableStep};
use clap::{ArgAction, Args, Parser, Subcommand, ValueEnum};
use serde::Serialize;
use std::error::Error;
use std::path::PathBuf;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Registry};

#[derive(Parser)]
#[command(name = "artillery-cli")]
#[command(version)]
#[command(about = "Artillery exterior ballistics: trajectories, maximum range, range tables and form factors", long_about = None)]
struct Cli {
    #[command(flatten)]
    profile: ProfileArgs,

    /// Range tolerance (m)
    #[arg(long, global = true, default_value_t = DEFAULT_TOLERANCE_M)]
    tolerance: f64,

    /// Write the resolved projectile to a config file
    #[arg(long, global = true, value_name = "FILE")]
    write_config: Option<PathBuf>,

    /// Output format
    #[arg(short = 'o', long, value_enum, global = true, default_value_t = OutputFormat::Table)]
    output: OutputFormat,

    /// Log more on stderr (repeat for more detail)
    #[arg(long, action = ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

/// Projectile and launch conditions. Anything given here overrides the config file.
#[derive(Args)]
struct ProfileArgs {
    /// Projectile config file (TOML)
    #[arg(long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Projectile name
    #[arg(long, global = true)]
    name: Option<String>,

    /// Mass (kg)
    #[arg(short = 'm', long, global = true)]
    mass: Option<f64>,

    /// Caliber (mm)
    #[arg(short = 'c', long, global = true)]
    caliber: Option<f64>,

    /// Density function (US, UK or ICAO)
    #[arg(long, global = true)]
    density_function: Option<AtmosphereModel>,

    /// Drag function file of mach,kd lines
    #[arg(long, global = true, value_name = "FILE")]
    drag_function_file: Option<PathBuf>,

    /// Muzzle velocity (m/s)
    #[arg(short = 'v', long, global = true)]
    mv: Option<f64>,

    /// Initial altitude (m)
    #[arg(short = 'a', long, global = true)]
    altitude: Option<f64>,

    /// Air density factor
    #[arg(long, global = true)]
    air_density_factor: Option<f64>,

    /// Integration time step (s)
    #[arg(short = 'I', long, global = true)]
    timestep: Option<f64>,

    /// Form factor used at every departure angle
    #[arg(short = 'f', long, global = true)]
    form_factor: Option<f64>,

    /// Form factor at a departure angle, as ANGLE,FF (degrees). May be repeated.
    #[arg(short = 'F', global = true, value_name = "ANGLE,FF", value_parser = parse_pair)]
    form_factors: Vec<(f64, f64)>,
}

impl ProfileArgs {
    fn overrides(&self) -> ProfileConfig {
        let mut form_factors: Vec<FormFactorEntry> =
            self.form_factors.iter().map(|&(angle, value)| FormFactorEntry { angle, value }).collect();
        if form_factors.is_empty() {
            if let Some(value) = self.form_factor {
                form_factors.push(FormFactorEntry { angle: 45.0, value });
            }
        }

        ProfileConfig {
            projectile: ProjectileSection {
                name: self.name.clone(),
                mass: self.mass,
                caliber: self.caliber,
                drag_function_file: self.drag_function_file.clone(),
                density_function: self.density_function,
            },
            initial_conditions: ConditionsSection {
                altitude: self.altitude,
                mv: self.mv,
                air_density_factor: self.air_density_factor,
            },
            simulation: SimulationSection { timestep: self.timestep },
            form_factors,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Fire a single shot
    Single {
        /// Departure angle (degrees)
        #[arg(short = 'l', long)]
        departure_angle: f64,

        /// Print every step of the trajectory
        #[arg(short = 't', long)]
        show_trajectory: bool,
    },

    /// Find the maximum range and the angle that achieves it
    MaxRange,

    /// Find the departure angle for one or more target ranges
    MatchRange {
        /// Target range (m)
        #[arg(long, required = true, num_args = 1..)]
        target_range: Vec<f64>,
    },

    /// Fit form factors to observed shots
    FindFf {
        /// Observed shot as ANGLE,RANGE (degrees, m). May be repeated.
        #[arg(long = "shot", value_name = "ANGLE,RANGE", value_parser = parse_pair)]
        shots: Vec<(f64, f64)>,

        /// Departure angle of a single observed shot (degrees)
        #[arg(short = 'l', long, requires = "target_range")]
        departure_angle: Option<f64>,

        /// Range of a single observed shot (m)
        #[arg(long, requires = "departure_angle")]
        target_range: Option<f64>,

        /// Save the projectile with the fitted form factors
        #[arg(long, value_name = "FILE")]
        save_to_config: Option<PathBuf>,
    },

    /// Range table stepped by range
    RangeTable {
        /// Range step (m)
        #[arg(long, default_value = "100.0")]
        increment: f64,

        /// First range (m)
        #[arg(long, default_value = "100.0")]
        start: f64,

        /// Last range (m)
        #[arg(long, default_value = "100000.0")]
        end: f64,
    },

    /// Range table stepped by departure angle
    RangeTableAngle {
        /// Departure angle step (degrees)
        #[arg(long, default_value = "1.0")]
        increment: f64,

        /// First departure angle (degrees)
        #[arg(long, default_value = "1.0")]
        start: f64,

        /// Last departure angle (degrees)
        #[arg(long, default_value = "50.0")]
        end: f64,
    },

    /// Write a config file for the projectile
    MakeConfig {
        /// Config file name
        #[arg(long)]
        filename: PathBuf,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    Table,
    Json,
}

fn parse_pair(s: &str) -> Result<(f64, f64), String> {
    let (a, b) = s
        .split_once(',')
        .ok_or_else(|| format!("expected two comma separated numbers, got {s:?}"))?;
    let a: f64 = a.trim().parse().map_err(|e| format!("{a:?}: {e}"))?;
    let b: f64 = b.trim().parse().map_err(|e| format!("{b:?}: {e}"))?;
    Ok((a, b))
}

fn init_logging(verbosity: u8) {
    let level = match verbosity {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    Registry::default()
        .with(env_filter)
        .with(
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(true)
                .with_thread_ids(false)
                .with_file(false)
                .with_line_number(false)
                .compact(),
        )
        .init();
}

fn main() -> Result<(), Box<dyn Error>> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let mut profile = cli_api::load_profile(cli.profile.config.as_deref(), cli.profile.overrides())?;
    let output = cli.output;

    match cli.command {
        Commands::Single { departure_angle, show_trajectory } => {
            let report = cli_api::single_shot(&profile, departure_angle, show_trajectory)?;
            match output {
                OutputFormat::Json => print_json(&report)?,
                OutputFormat::Table => display_single(&profile, &report),
            }
        }

        Commands::MaxRange => {
            let report = cli_api::max_range(&profile)?;
            match output {
                OutputFormat::Json => print_json(&report)?,
                OutputFormat::Table => display_max_range(&profile, &report),
            }
        }

        Commands::MatchRange { target_range } => {
            let report = cli_api::match_ranges(&profile, &target_range, cli.tolerance)?;
            match output {
                OutputFormat::Json => print_json(&report)?,
                OutputFormat::Table => display_match_range(&profile, &report),
            }
        }

        Commands::FindFf { mut shots, departure_angle, target_range, save_to_config } => {
            if let (Some(angle), Some(range)) = (departure_angle, target_range) {
                shots.push((angle, range));
            }
            if shots.is_empty() {
                return Err("find-ff needs at least one --shot ANGLE,RANGE or -l ANGLE --target-range RANGE".into());
            }

            let report = cli_api::find_form_factors(&profile, &shots, cli.tolerance)?;
            if let Some(path) = &save_to_config {
                cli_api::save_form_factors(&profile, &report, path)?;
            }
            if !report.fits.is_empty() {
                profile.form_factors = report.form_factor_table();
            }
            match output {
                OutputFormat::Json => print_json(&report)?,
                OutputFormat::Table => display_form_factors(&profile, &report),
            }
        }

        Commands::RangeTable { increment, start, end } => {
            let report = cli_api::range_table(&profile, start, end, increment, cli.tolerance)?;
            match output {
                OutputFormat::Json => print_json(&report)?,
                OutputFormat::Table => display_range_table(&profile, &report),
            }
        }

        Commands::RangeTableAngle { increment, start, end } => {
            let report = cli_api::range_table_angle(&profile, start, end, increment)?;
            match output {
                OutputFormat::Json => print_json(&report)?,
                OutputFormat::Table => display_range_table(&profile, &report),
            }
        }

        Commands::MakeConfig { filename } => {
            cli_api::write_config(&profile, &filename)?;
            if output == OutputFormat::Table {
                println!("Wrote {}", filename.display());
            }
        }
    }

    if let Some(path) = &cli.write_config {
        cli_api::write_config(&profile, path)?;
    }

    Ok(())
}

fn print_json<T: Serialize>(value: &T) -> Result<(), Box<dyn Error>> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn print_header(profile: &ProjectileProfile, max_range: Option<&MaxRangeReport>) {
    print!("{}", cli_api::describe(profile, max_range));
    println!("Initial Conditions:");
    println!(" Velocity: {:.3}m/s", profile.muzzle_velocity);
    println!(" Air Density Factor: {:.6}", profile.air_density_factor);
    println!();
}

fn display_single(profile: &ProjectileProfile, report: &SingleShotReport) {
    print_header(profile, None);
    let shot = &report.shot;
    println!("╔════════════════════════════════════════╗");
    println!("║            SINGLE SHOT                 ║");
    println!("╠════════════════════════════════════════╣");
    println!("║ Departure Angle:   {:>10.4} deg      ║", shot.departure_angle);
    println!("║ Range:             {:>10.1} m        ║", shot.range);
    println!("║ Time of Flight:    {:>10.2} s        ║", shot.time);
    println!("║ Striking Velocity: {:>10.2} m/s      ║", shot.velocity);
    println!("║ Angle of Fall:     {:>10.4} deg      ║", shot.impact_angle);
    println!("╚════════════════════════════════════════╝");

    if let Some(trajectory) = &report.trajectory {
        println!("\nTrajectory:");
        println!("┌──────────┬────────────┬────────────┬──────────┬──────────┐");
        println!("│ Time (s) │ Range (m)  │ Height (m) │ Vel(m/s) │ Angle(°) │");
        println!("├──────────┼────────────┼────────────┼──────────┼──────────┤");
        for p in trajectory {
            println!(
                "│ {:>8.2} │ {:>10.1} │ {:>10.1} │ {:>8.2} │ {:>8.3} │",
                p.time, p.range, p.altitude, p.velocity, p.angle
            );
        }
        println!("└──────────┴────────────┴────────────┴──────────┴──────────┘");
    }
}

fn display_max_range(profile: &ProjectileProfile, report: &MaxRangeReport) {
    print_header(profile, None);
    println!("╔════════════════════════════════════════╗");
    println!("║            MAXIMUM RANGE               ║");
    println!("╠════════════════════════════════════════╣");
    println!("║ Range:             {:>10.1} m        ║", report.range);
    println!("║ Departure Angle:   {:>10.4} deg      ║", report.angle);
    println!("║ Shots Fired:       {:>10}          ║", report.iterations);
    println!("╚════════════════════════════════════════╝");
}

fn display_match_range(profile: &ProjectileProfile, report: &MatchRangeReport) {
    print_header(profile, Some(&report.max_range));
    println!("Range tolerance: {:.1}m", report.tolerance);
    println!("┌──────────┬────────────┬──────────┬──────────┬──────────┬───────┐");
    println!("│ Range(m) │ Depart.(°) │ Fall (°) │ Time (s) │ Vel(m/s) │ Iters │");
    println!("├──────────┼────────────┼──────────┼──────────┼──────────┼───────┤");
    for s in &report.shots {
        println!(
            "│ {:>8.0} │ {:>10.4} │ {:>8.4} │ {:>8.2} │ {:>8.2} │ {:>5} │",
            s.range,
            s.departure_angle,
            s.impact_angle,
            s.time,
            s.velocity,
            s.iterations.unwrap_or_default()
        );
    }
    println!("└──────────┴────────────┴──────────┴──────────┴──────────┴───────┘");
    print_notes(&report.notes);
}

fn display_form_factors(profile: &ProjectileProfile, report: &FormFactorReport) {
    print_header(profile, None);
    println!("Range tolerance: {:.1}m", report.tolerance);
    println!("┌────────────┬────────────┬────────────┬─────────────┬───────┐");
    println!("│ Depart.(°) │ Target (m) │ Range (m)  │ Form Factor │ Iters │");
    println!("├────────────┼────────────┼────────────┼─────────────┼───────┤");
    for f in &report.fits {
        println!(
            "│ {:>10.4} │ {:>10.1} │ {:>10.1} │ {:>11.6} │ {:>5} │",
            f.departure_angle, f.target_range, f.range, f.form_factor, f.iterations
        );
    }
    println!("└────────────┴────────────┴────────────┴─────────────┴───────┘");
    print_notes(&report.notes);
}

fn display_range_table(profile: &ProjectileProfile, report: &RangeTableReport) {
    println!("Range Table");
    print_header(profile, Some(&report.max_range));
    match report.step {
        RangeTableStep::Range => {
            println!("Range increments: {:.1}m", report.increment)
        }
        RangeTableStep::Angle => {
            println!("Departure angle increments: {:.4}deg", report.increment)
        }
    }
    println!("┌──────────┬────────────┬──────────┬──────────┬──────────┐");
    println!("│ Range(m) │ Depart.(°) │ Fall (°) │ Time (s) │ Vel(m/s) │");
    println!("├──────────┼────────────┼──────────┼──────────┼──────────┤");
    for r in &report.rows {
        println!(
            "│ {:>8.0} │ {:>10.4} │ {:>8.4} │ {:>8.2} │ {:>8.2} │",
            r.range, r.departure_angle, r.impact_angle, r.time, r.velocity
        );
    }
    println!("└──────────┴────────────┴──────────┴──────────┴──────────┘");
    print_notes(&report.notes);
}

fn print_notes(notes: &[String]) {
    for note in notes {
        println!("{note}");
    }
}
