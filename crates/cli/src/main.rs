use addon_meta_core::catalog::ModuleFilter;
use addon_meta_core::config;
use anyhow::Result;
use clap::{Parser, Subcommand};
use cli::commands::{self, ModelPart};
use serde_json::Value;
use std::path::PathBuf;
use tracing::debug;
use tracing_subscriber::EnvFilter;

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let cfg = config::load_or_default(cli.config.as_deref());
    debug!("addon roots: {:?}", cfg.paths.addon_paths);

    match cli.command {
        Commands::Index {
            odoo_path,
            output,
            json,
        } => {
            let cfg = commands::with_overrides(cfg, odoo_path.as_deref(), output.as_deref());
            let out = commands::index(&cfg)?;
            if json {
                print_json(&out)
            } else {
                let summary = &out["summary"];
                println!(
                    "index: {} models from {} modules, {} indexed, {} skipped files, {} parse failures",
                    summary["models"],
                    summary["report"]["modules_loaded"],
                    summary["indexed"],
                    summary["report"]["skipped_files"],
                    summary["report"]["parse_failures"],
                );
                Ok(())
            }
        }
        Commands::Search { query, fields } => print_json(&commands::search(&cfg, &query, &fields)?),
        Commands::Modules {
            include_translations,
            include_tests,
        } => print_json(&commands::modules(
            &cfg,
            ModuleFilter {
                include_translations,
                include_tests,
            },
        )?),
        Commands::Models { module } => print_json(&commands::models(&cfg, module.as_deref())?),
        Commands::Model { name, part } => print_json(&commands::model(&cfg, &name, part)?),
    }
}

fn print_json(value: &Value) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

#[derive(Parser)]
#[command(name = "addon-meta")]
#[command(about = "Extract and search addon model metadata", long_about = None)]
struct Cli {
    /// Path to config file
    #[arg(short, long)]
    config: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Load every module and rebuild the search index
    Index {
        /// Odoo checkout; its addons/ and odoo/addons/ become the roots
        odoo_path: Option<PathBuf>,
        /// Index directory
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// Output JSON summary
        #[arg(long)]
        json: bool,
    },
    /// Full-text search over indexed models
    Search {
        query: String,
        /// Restrict to index fields (comma-separated)
        #[arg(long, value_delimiter = ',', num_args = 1.., default_values_t = Vec::<String>::new())]
        fields: Vec<String>,
    },
    /// List discovered modules
    Modules {
        #[arg(long, default_value_t = false)]
        include_translations: bool,
        #[arg(long, default_value_t = false)]
        include_tests: bool,
    },
    /// List model keys
    Models {
        #[arg(long)]
        module: Option<String>,
    },
    /// Show one model
    Model {
        name: String,
        #[arg(long, value_enum)]
        part: Option<ModelPart>,
    },
}
