use std::path::{Path, PathBuf};

use clap::{Args, Parser, Subcommand};

use tmap::config::{AppConfig, ConfigError, LogLevel};
use tmap::convert::{SourceLayer, write_project};
use tmap::export::export_static;
use tmap::format::{FormatError, ProjectState, common_path, rebase, relative_prefix};
use tmap::store::ProjectStore;

#[derive(Debug, thiserror::Error)]
enum CliError {
    #[error(transparent)]
    Format(#[from] FormatError),
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("{0} has no parent folder")]
    NoParent(PathBuf),
}

#[derive(Parser, Debug)]
#[command(name = "tmap", version, about = "Inspect, upgrade and export .tmap projects")]
struct Cli {
    /// Configuration file; defaults to the user config directory
    #[arg(long, env = "TMAP_CONFIG")]
    config: Option<PathBuf>,

    /// Overrides the configured log level
    #[arg(long, value_enum)]
    log_level: Option<LogLevel>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Load a project and print what it contains
    Inspect { project: PathBuf },
    /// Load a project and save it again in the current format
    Upgrade(UpgradeArgs),
    /// Prefix every data path of a project
    Rebase(RebaseArgs),
    /// Export a project as a self-contained static folder
    Export(ExportArgs),
    /// Generate a project folder from a JSON list of layers
    Convert {
        layers: PathBuf,
        /// Output folder, ending in .tmap
        output: PathBuf,
    },
    /// List projects and slides below the store root
    Tree(TreeArgs),
    /// Show or write the configuration
    Config {
        #[command(subcommand)]
        command: ConfigCommand,
    },
}

#[derive(Args, Debug)]
struct UpgradeArgs {
    project: PathBuf,
    /// Write here instead of overwriting the input
    #[arg(short, long)]
    output: Option<PathBuf>,
    /// Title to save under; defaults to the project's own
    #[arg(long)]
    name: Option<String>,
}

#[derive(Args, Debug)]
struct RebaseArgs {
    project: PathBuf,
    /// Literal prefix to add
    #[arg(long, conflicts_with = "data_dir", required_unless_present = "data_dir")]
    prefix: Option<String>,
    /// Folder the paths are currently relative to; the prefix becomes the
    /// way from the output's folder to it
    #[arg(long)]
    data_dir: Option<PathBuf>,
    #[arg(short, long)]
    output: Option<PathBuf>,
}

#[derive(Args, Debug)]
struct ExportArgs {
    project: PathBuf,
    out_dir: PathBuf,
    /// Zip archive with the web viewer to unpack next to the project
    #[arg(long)]
    bundle: Option<PathBuf>,
}

#[derive(Args, Debug)]
struct TreeArgs {
    /// Store root; defaults to the configured one
    #[arg(long)]
    root: Option<PathBuf>,
    /// Only list files with this extension
    #[arg(long)]
    filter: Option<String>,
    #[arg(long)]
    depth: Option<usize>,
}

#[derive(Subcommand, Debug)]
enum ConfigCommand {
    /// Print the effective configuration
    Show,
    /// Write the default configuration
    Init,
}

fn main() {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => AppConfig::load_from_file(path).unwrap_or_else(|e| {
            eprintln!("Failed to load {}: {e}; using defaults", path.display());
            AppConfig::default()
        }),
        None => AppConfig::load_from_default_path().unwrap_or_default(),
    };

    let level = cli.log_level.unwrap_or(config.log_level);
    env_logger::Builder::new()
        .filter_level(level.to_level_filter())
        .parse_default_env()
        .init();

    if let Err(e) = run(cli, config) {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}

fn run(cli: Cli, config: AppConfig) -> Result<(), CliError> {
    match cli.command {
        Command::Inspect { project } => inspect(&config, &project),
        Command::Upgrade(args) => upgrade(&config, args),
        Command::Rebase(args) => rebase_project(args),
        Command::Export(args) => {
            let state = ProjectState::load_from_file(&args.project)?;
            let source_dir = parent_of(&args.project)?;
            let report = export_static(&state, &source_dir, &args.out_dir, args.bundle.as_deref())?;
            println!("Exported to {}", report.project.display());
            for image in &report.images {
                println!("convert {} -> {}", image.source, image.target);
            }
            for missing in &report.missing {
                eprintln!("missing: {missing}");
            }
            Ok(())
        }
        Command::Convert { layers, output } => {
            let json = std::fs::read_to_string(&layers)?;
            let layers: Vec<SourceLayer> = serde_json::from_str(&json)?;
            let report = write_project(&output, &layers)?;
            println!("Wrote {}", report.project.display());
            for name in &report.skipped {
                println!("pixel data not written for layer {name}");
            }
            Ok(())
        }
        Command::Tree(args) => {
            let store = ProjectStore::new(args.root.unwrap_or_else(|| config.store_root.clone()));
            let depth = args.depth.unwrap_or(config.folder_depth);
            let tree = store.file_tree(depth, args.filter.as_deref());
            println!("{}", serde_json::to_string_pretty(&tree)?);
            Ok(())
        }
        Command::Config { command } => match command {
            ConfigCommand::Show => {
                println!("{}", config.to_json()?);
                Ok(())
            }
            ConfigCommand::Init => {
                let path = match cli.config {
                    Some(path) => {
                        AppConfig::new().save_to_file(&path)?;
                        path
                    }
                    None => AppConfig::new().save_to_default_path()?,
                };
                println!("Wrote {}", path.display());
                Ok(())
            }
        },
    }
}

/// Folder holding `path`, `.` for a bare file name.
fn parent_of(path: &Path) -> Result<PathBuf, CliError> {
    match path.parent() {
        Some(parent) if parent.as_os_str().is_empty() => Ok(PathBuf::from(".")),
        Some(parent) => Ok(parent.to_path_buf()),
        None => Err(CliError::NoParent(path.to_path_buf())),
    }
}

fn inspect(config: &AppConfig, path: &Path) -> Result<(), CliError> {
    let state = ProjectState::load_from_file(path)?;
    let legacy = state.has_legacy_markers();
    let shared = state.layers.as_deref().map(common_path).unwrap_or_default();

    let mut session = config.new_session();
    let report = session.load(state);
    session.viewer_mut().finish_layout();
    let viewer = session.viewer();

    println!("title:          {}", viewer.chrome.title);
    println!("layers:         {}", report.layers);
    for (layer, control) in viewer.layers().iter().zip(viewer.controls()) {
        let shown = if control.visible { "shown" } else { "hidden" };
        println!("  {:<20} {} ({shown})", layer.name, layer.tile_source);
    }
    println!("common path:    {shared:?}");
    println!("marker buttons: {}", report.marker_buttons);
    println!("region buttons: {}", report.region_buttons);
    println!("regions:        {}", report.regions);
    println!(
        "settings:       {} invoked, {} assigned, {} skipped",
        report.settings.invoked, report.settings.assigned, report.settings.skipped
    );
    if legacy {
        println!("legacy marker files: {} (run `tmap upgrade`)", report.legacy_upgraded);
    }
    for request in &report.region_requests {
        println!("region file:    {request}");
    }
    Ok(())
}

fn upgrade(config: &AppConfig, args: UpgradeArgs) -> Result<(), CliError> {
    let state = ProjectState::load_from_file(&args.project)?;
    let name = args
        .name
        .or_else(|| state.filename.clone())
        .unwrap_or_else(|| config.default_project.clone());

    let mut session = config.new_session();
    let report = session.load(state);
    session.viewer_mut().finish_layout();
    let saved = session.save_project(&name);

    let output = args.output.unwrap_or(args.project);
    saved.save_to_file(&output)?;
    println!(
        "Saved {} ({} legacy marker files upgraded)",
        output.display(),
        report.legacy_upgraded
    );
    Ok(())
}

fn rebase_project(args: RebaseArgs) -> Result<(), CliError> {
    let mut state = ProjectState::load_from_file(&args.project)?;
    let output = args.output.unwrap_or_else(|| args.project.clone());

    let prefix = match (args.prefix, args.data_dir) {
        (Some(prefix), _) => prefix,
        (None, Some(data_dir)) => {
            let from = std::path::absolute(parent_of(&output)?)?;
            let to = std::path::absolute(&data_dir)?;
            relative_prefix(&from, &to)
        }
        (None, None) => String::new(),
    };

    if prefix.is_empty() || prefix == "." {
        log::info!("Nothing to rebase for {:?}", args.project);
    } else {
        rebase(&mut state, &prefix);
    }
    state.save_to_file(&output)?;
    println!("Saved {} with prefix {prefix:?}", output.display());
    Ok(())
}
