use clap::{Parser, Subcommand};
use ofd::config::{self, OfdConfig};
use ofd::export::{self, ExportMeta, Formats, SourceDirs};
use ofd::report::ValidationResult;
use ofd::scripts::{self, ScriptContext};
use ofd::validate::schema::SchemaCache;
use ofd::validate::{Orchestrator, ValidateError};
use ofd::{crawl, ids, output};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "ofd")]
#[command(about = "Crawler, validator and exporter for the Open Filament Database")]
#[command(long_about = "\
Crawler, validator and exporter for the Open Filament Database

The filesystem is the database. Every entity is a directory holding one
JSON manifest:

  data/
  └── Prusament/                   # brand.json
      └── PLA/                     # material.json
          └── Prusament PLA/       # filament.json
              └── Galaxy Black/    # variant.json + sizes.json
  stores/
  └── prusa_store/                 # store.json + logo

Every entity gets a deterministic UUIDv5 derived from its identifying
fields, so IDs stay stable across builds.

Run 'ofd gen-config' to generate a documented ofd.toml.")]
#[command(version)]
struct Cli {
    /// Config file (default: ./ofd.toml when present)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Brand/material/filament/variant tree
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    /// Store tree
    #[arg(long, global = true)]
    stores_dir: Option<PathBuf>,

    /// JSON Schema directory
    #[arg(long, global = true)]
    schemas_dir: Option<PathBuf>,

    /// Log level when RUST_LOG is unset (error, warn, info, debug, trace)
    #[arg(long, global = true)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Command,
}

/// Validation scope. No flag means every stage.
#[derive(clap::Args, Clone, Default)]
struct Scope {
    /// Check required manifests exist
    #[arg(long)]
    missing_files: bool,
    /// Check manifests against their schemas
    #[arg(long)]
    json_files: bool,
    /// Check brand and store logos
    #[arg(long)]
    logos: bool,
    /// Check folder names match manifest ids
    #[arg(long)]
    folder_names: bool,
    /// Check purchase links reference known stores
    #[arg(long)]
    store_ids: bool,
    /// Check GTIN/EAN codes
    #[arg(long)]
    gtin: bool,
}

impl Scope {
    fn is_empty(&self) -> bool {
        !(self.missing_files
            || self.json_files
            || self.logos
            || self.folder_names
            || self.store_ids
            || self.gtin)
    }
}

#[derive(Subcommand)]
enum Command {
    /// Validate the data and stores trees
    Validate {
        #[command(flatten)]
        scope: Scope,
        /// Print the result as JSON
        #[arg(long)]
        json: bool,
        /// Emit a JSON progress line at each stage boundary
        #[arg(long)]
        progress: bool,
        /// Worker threads (default: config, then CPU cores)
        #[arg(long)]
        workers: Option<usize>,
    },
    /// Crawl the trees, run every exporter and write the manifest
    Build {
        /// Output directory (default: config output_dir)
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// Dataset version (default: today's UTC date, YYYY.MM.DD)
        #[arg(long = "version")]
        dataset_version: Option<String>,
        #[arg(long)]
        skip_json: bool,
        #[arg(long)]
        skip_sqlite: bool,
        #[arg(long)]
        skip_csv: bool,
        #[arg(long)]
        skip_api: bool,
    },
    /// Run a maintenance script
    Script {
        /// List registered scripts
        #[arg(long)]
        list: bool,
        /// Print the outcome as JSON
        #[arg(long)]
        json: bool,
        name: Option<String>,
        /// Arguments passed to the script
        #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
        args: Vec<String>,
    },
    /// Print the UUID derived for an entity
    DeriveId {
        #[command(subcommand)]
        entity: Entity,
    },
    /// Print a stock ofd.toml with all options documented
    GenConfig,
}

#[derive(Subcommand)]
enum Entity {
    Brand { name: String },
    Material { brand_id: String, material: String },
    Filament { brand_id: String, material_id: String, name: String },
    Variant { filament_id: String, color_name: String },
    Store { store_id: String },
    Package { brand_id: String, gtin: String },
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let settings = resolve_config(&cli)?;
    init_tracing(&settings.log_level);

    match cli.command {
        Command::Validate {
            scope,
            json,
            progress,
            workers,
        } => {
            let workers =
                workers.unwrap_or_else(|| config::effective_workers(&settings.validation));
            let schemas = SchemaCache::load(&settings.schemas_dir)?;
            let mut orchestrator =
                Orchestrator::new(&settings.data_dir, &settings.stores_dir, &schemas, workers)?;
            if progress {
                orchestrator = orchestrator.with_progress(output::print_progress);
            }
            let result = run_validation(&orchestrator, &scope)?;
            if json {
                println!("{}", serde_json::to_string_pretty(&result.to_json())?);
            } else {
                output::print_report(&result);
            }
            if !result.is_valid() {
                std::process::exit(1);
            }
        }
        Command::Build {
            output: out_dir,
            dataset_version,
            skip_json,
            skip_sqlite,
            skip_csv,
            skip_api,
        } => {
            let out_dir = out_dir.unwrap_or_else(|| settings.output_dir.clone());
            let (db, build_result) = crawl::crawl(&settings.data_dir, &settings.stores_dir)?;
            output::print_crawl_counts(&db);
            output::print_report(&build_result);
            if !build_result.is_valid() {
                std::process::exit(1);
            }

            let mut meta = ExportMeta::now();
            if let Some(version) = dataset_version {
                meta = meta.with_version(version);
            }
            let sources = SourceDirs {
                data_dir: settings.data_dir.clone(),
                stores_dir: settings.stores_dir.clone(),
                schemas_dir: settings.schemas_dir.clone(),
            };
            let formats = Formats {
                json: !skip_json,
                sqlite: !skip_sqlite,
                csv: !skip_csv,
                api: !skip_api,
            };
            let manifest = export::export_all(&db, &out_dir, &meta, &sources, formats)?;
            println!();
            output::print_export_inventory(&manifest, &out_dir);
        }
        Command::Script {
            list,
            json,
            name,
            args,
        } => {
            let Some(name) = name.filter(|_| !list) else {
                output::print_script_list(scripts::SCRIPTS);
                return Ok(());
            };
            let ctx = ScriptContext {
                data_dir: settings.data_dir.clone(),
                stores_dir: settings.stores_dir.clone(),
                schemas_dir: settings.schemas_dir.clone(),
                workers: config::effective_workers(&settings.validation),
            };
            let outcome = scripts::run_script(&name, &ctx, &args)?;
            if json {
                println!("{}", serde_json::to_string_pretty(&outcome)?);
            } else {
                output::print_script_outcome(&name, &outcome);
            }
            if !outcome.success {
                std::process::exit(1);
            }
        }
        Command::DeriveId { entity } => {
            let id = match entity {
                Entity::Brand { name } => ids::brand_id(&name),
                Entity::Material { brand_id, material } => {
                    ids::material_id(ids::parse(&brand_id)?, &material)
                }
                Entity::Filament {
                    brand_id,
                    material_id,
                    name,
                } => ids::filament_id(ids::parse(&brand_id)?, ids::parse(&material_id)?, &name),
                Entity::Variant {
                    filament_id,
                    color_name,
                } => ids::variant_id(ids::parse(&filament_id)?, &color_name),
                Entity::Store { store_id } => ids::store_id(&store_id),
                Entity::Package { brand_id, gtin } => {
                    ids::package_id(ids::parse(&brand_id)?, &gtin)
                }
            };
            println!("{}", id);
        }
        Command::GenConfig => {
            print!("{}", config::stock_config_toml());
        }
    }

    Ok(())
}

/// Config file values with command-line overrides applied on top.
fn resolve_config(cli: &Cli) -> Result<OfdConfig, config::ConfigError> {
    let mut settings = config::load_config(cli.config.as_deref())?;
    if let Some(dir) = &cli.data_dir {
        settings.data_dir = dir.clone();
    }
    if let Some(dir) = &cli.stores_dir {
        settings.stores_dir = dir.clone();
    }
    if let Some(dir) = &cli.schemas_dir {
        settings.schemas_dir = dir.clone();
    }
    if let Some(level) = &cli.log_level {
        settings.log_level = level.clone();
    }
    settings.validate()?;
    Ok(settings)
}

/// Log to stderr so stdout stays clean for `--json`.
fn init_tracing(level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn run_validation(
    orchestrator: &Orchestrator<'_>,
    scope: &Scope,
) -> Result<ValidationResult, ValidateError> {
    if scope.is_empty() {
        return orchestrator.validate_all();
    }
    let mut result = ValidationResult::new();
    if scope.missing_files {
        result.merge(orchestrator.validate_missing_files()?);
    }
    if scope.json_files {
        result.merge(orchestrator.validate_json_files()?);
    }
    if scope.logos {
        result.merge(orchestrator.validate_logo_files()?);
    }
    if scope.folder_names {
        result.merge(orchestrator.validate_folder_names()?);
    }
    if scope.store_ids {
        result.merge(orchestrator.validate_store_ids()?);
    }
    if scope.gtin {
        result.merge(orchestrator.validate_gtin()?);
    }
    Ok(result)
}
