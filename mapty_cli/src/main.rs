use clap::{Args, Parser, Subcommand};
use mapty_core::render::summary_line;
use mapty_core::*;
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Parser)]
#[command(name = "mapty")]
#[command(about = "Map-based running and cycling log", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Override data directory
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    /// Use a specific config file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Skip place name and flag lookups
    #[arg(long, global = true)]
    offline: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Record a new workout at a map position
    Add {
        #[arg(long, allow_hyphen_values = true)]
        lat: f64,

        #[arg(long, allow_hyphen_values = true)]
        lng: f64,

        #[command(flatten)]
        values: WorkoutArgs,
    },

    /// List recorded workouts (default)
    List,

    /// Select a workout: count the click and show its details
    Show { id: String },

    /// Replace a workout's values, optionally switching its type
    Edit {
        id: String,

        #[command(flatten)]
        values: WorkoutArgs,
    },

    /// Delete a workout and its marker
    Delete { id: String },

    /// Delete all workouts
    Reset,

    /// Write all workouts to a CSV file
    Export { path: PathBuf },
}

impl Commands {
    /// Commands that never write to storage
    fn is_read_only(&self) -> bool {
        matches!(self, Commands::List | Commands::Export { .. })
    }
}

/// Form values shared by `add` and `edit`
#[derive(Args)]
struct WorkoutArgs {
    /// Workout type (running, cycling)
    #[arg(long = "type", default_value = "running")]
    kind: String,

    /// Distance in km
    #[arg(long, allow_hyphen_values = true)]
    distance: f64,

    /// Duration in minutes
    #[arg(long, allow_hyphen_values = true)]
    duration: f64,

    /// Steps per minute (running)
    #[arg(long, allow_hyphen_values = true)]
    cadence: Option<f64>,

    /// Elevation gain in meters (cycling)
    #[arg(long, allow_hyphen_values = true)]
    elevation: Option<f64>,
}

impl WorkoutArgs {
    fn to_input(&self) -> Result<WorkoutInput> {
        let variant: Variant = self.kind.parse()?;
        let input = match variant {
            Variant::Running => {
                let cadence = self.cadence.ok_or_else(|| {
                    Error::InvalidArgument("--cadence is required for running".into())
                })?;
                WorkoutInput::running(self.distance, self.duration, cadence)
            }
            Variant::Cycling => {
                let elevation = self.elevation.ok_or_else(|| {
                    Error::InvalidArgument("--elevation is required for cycling".into())
                })?;
                WorkoutInput::cycling(self.distance, self.duration, elevation)
            }
        };
        validate_input(&input)?;
        Ok(input)
    }
}

type App = Tracker<FileStore, HeadlessMap>;

fn main() -> ExitCode {
    // Initialize logging
    mapty_core::logging::init();

    let cli = Cli::parse();

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e @ Error::Validation(_)) => {
            eprintln!("Inputs have to be positive numbers! {}", e);
            ExitCode::FAILURE
        }
        Err(e) if e.is_user_facing() => {
            eprintln!("{}", e);
            ExitCode::FAILURE
        }
        Err(e) => {
            tracing::error!("Command failed: {}", e);
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<()> {
    let config = match &cli.config {
        Some(path) => Config::load_from(path)?,
        None => Config::load()?,
    };
    let data_dir = cli
        .data_dir
        .clone()
        .unwrap_or_else(|| config.data.data_dir.clone());
    let use_geocoder = config.geocoding.enabled && !cli.offline;
    let command = cli.command.unwrap_or(Commands::List);

    let store = FileStore::new(&data_dir);
    let mode = if command.is_read_only() {
        LockMode::Shared
    } else {
        LockMode::Exclusive
    };
    // Held from load until the last save of this command
    let _lock = store.lock(&config.storage.key, mode)?;

    let persistence = PersistenceAdapter::with_key(store, config.storage.key.clone());
    let (mut app, report) = Tracker::open(persistence, HeadlessMap::new())?;
    for warning in report.warnings() {
        eprintln!("warning: {}", warning);
    }

    match command {
        Commands::Add { lat, lng, values } => {
            let geocoder = use_geocoder.then(|| HttpGeocoder::from_config(&config.geocoding));
            cmd_add(&mut app, Coords::new(lat, lng), &values, geocoder.as_ref())?
        }
        Commands::List => cmd_list(&app),
        Commands::Show { id } => cmd_show(&mut app, &WorkoutId::from(id))?,
        Commands::Edit { id, values } => cmd_edit(&mut app, &WorkoutId::from(id), &values)?,
        Commands::Delete { id } => {
            let id = WorkoutId::from(id);
            app.handle(&UiEvent {
                id: id.clone(),
                action: UiAction::Delete,
            })?;
            println!("✓ Workout deleted: {}", id);
        }
        Commands::Reset => {
            app.reset()?;
            println!("✓ All workouts cleared");
        }
        Commands::Export { path } => {
            let count = mapty_core::export::export_csv(app.workouts(), &path)?;
            println!("✓ Exported {} workouts to {}", count, path.display());
        }
    }

    match mode {
        LockMode::Exclusive => {
            app.close()?;
        }
        LockMode::Shared => {
            app.release();
        }
    }
    Ok(())
}

fn cmd_add(
    app: &mut App,
    coords: Coords,
    values: &WorkoutArgs,
    geocoder: Option<&HttpGeocoder>,
) -> Result<()> {
    if !(coords.lat.is_finite() && coords.lng.is_finite())
        || coords.lat.abs() > 90.0
        || coords.lng.abs() > 180.0
    {
        return Err(Error::InvalidArgument(format!("invalid coordinates {}", coords)));
    }

    let input = values.to_input()?;
    let id = app.create(coords, &input)?;

    // Place lookup happens after the workout is safely stored
    if let Some(geocoder) = geocoder {
        app.enrich(&id, geocoder)?;
    }

    let workout = app.store().find_by_id(&id)?;
    println!("✓ Workout recorded: {}", id);
    println!("  {}", summary_line(workout));
    Ok(())
}

fn cmd_list(app: &App) {
    if app.store().is_empty() {
        println!("No workouts recorded yet.");
        return;
    }

    for workout in app.workouts() {
        println!("{}  {}", workout.id(), summary_line(workout));
    }
}

fn cmd_show(app: &mut App, id: &WorkoutId) -> Result<()> {
    let workout = app.select(id)?;
    println!("{}", summary_line(workout));
    println!("  Coords: {}", workout.coords());
    if let Some(flag) = workout.flag() {
        println!("  Flag: {}", flag);
    }
    println!("  Clicks: {}", workout.clicks());
    Ok(())
}

fn cmd_edit(app: &mut App, id: &WorkoutId, values: &WorkoutArgs) -> Result<()> {
    let original = app.begin_edit(id)?.variant();

    let input = match values.to_input() {
        Ok(input) => input,
        Err(e) => {
            app.cancel_edit();
            return Err(e);
        }
    };

    app.submit_edit(&input)?;

    let workout = app.store().find_by_id(id)?;
    println!("✓ Workout updated: {}", id);
    if original != workout.variant() {
        println!("  Changed from {} to {}", original, workout.variant());
    }
    println!("  {}", summary_line(workout));
    Ok(())
}
