//! glb-bake - bake animated scene descriptions into .glb files

use anyhow::Result;
use clap::{Parser, Subcommand};
use glb_bake::{ExportSettings, PropertyTable};
use std::path::{Path, PathBuf};

use glb_bake_cli::{export_file, SceneDescription};

#[derive(Parser)]
#[command(name = "glb-bake")]
#[command(about = "Bake scene descriptions with animation clips into .glb files")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Export a scene description
    Export {
        /// Input scene description (.json)
        input: PathBuf,

        /// Output .glb file (default: input with .glb extension)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Export settings (.toml)
        #[arg(short, long)]
        settings: Option<PathBuf>,

        /// Property mapping table (.toml), replaces the built-in table
        #[arg(short, long)]
        mappings: Option<PathBuf>,

        /// Baking rate in samples per second (overrides settings)
        #[arg(short, long)]
        frame_rate: Option<f32>,

        /// Route every channel through KHR_animation_pointer
        #[arg(long)]
        animation_pointer: bool,

        /// Fail if any animated property was skipped
        #[arg(long)]
        strict: bool,
    },

    /// Validate a scene description and settings without exporting
    Check {
        /// Input scene description (.json)
        input: PathBuf,

        /// Export settings (.toml)
        #[arg(short, long)]
        settings: Option<PathBuf>,

        /// Property mapping table (.toml)
        #[arg(short, long)]
        mappings: Option<PathBuf>,
    },

    /// List the property mapping table
    Mappings {
        /// Property mapping table (.toml), default: built-in
        #[arg(short, long)]
        mappings: Option<PathBuf>,
    },
}

fn load_settings(path: Option<&Path>) -> Result<ExportSettings> {
    Ok(match path {
        Some(path) => ExportSettings::load(path)?,
        None => ExportSettings::default(),
    })
}

fn load_table(path: Option<&Path>) -> Result<PropertyTable> {
    Ok(match path {
        Some(path) => PropertyTable::load(path)?,
        None => PropertyTable::builtin()?,
    })
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Export {
            input,
            output,
            settings,
            mappings,
            frame_rate,
            animation_pointer,
            strict,
        } => {
            let mut settings = load_settings(settings.as_deref())?;
            if let Some(frame_rate) = frame_rate {
                settings.frame_rate = frame_rate;
            }
            settings.use_animation_pointer |= animation_pointer;
            let table = load_table(mappings.as_deref())?;

            let output = output.unwrap_or_else(|| input.with_extension("glb"));
            tracing::info!("Exporting {:?} -> {:?}", input, output);
            let report = export_file(&input, &output, settings, table)?;

            // each skip was already logged where it happened
            if !report.is_clean() {
                tracing::warn!("{} propert(ies) were skipped", report.warnings.len());
                if strict {
                    anyhow::bail!("--strict: {} propert(ies) were skipped", report.warnings.len());
                }
            }
            tracing::info!("Done!");
        }

        Commands::Check {
            input,
            settings,
            mappings,
        } => {
            tracing::info!("Checking {:?}", input);
            load_settings(settings.as_deref())?;
            let table = load_table(mappings.as_deref())?;
            let description = SceneDescription::load(&input)?;
            tracing::info!(
                "{} node(s), {} mesh(es), {} clip(s), {} animation(s), {} mapping rule(s)",
                description.nodes.len(),
                description.meshes.len(),
                description.clips.len(),
                description.animations.len(),
                table.len()
            );
            tracing::info!("Scene description is valid!");
        }

        Commands::Mappings { mappings } => {
            let table = load_table(mappings.as_deref())?;
            for rule in table.rules() {
                let mut target = rule.path.clone();
                if let Some(second) = &rule.second_path {
                    target = format!("{}, {}", target, second);
                }
                if let Some(extension) = &rule.extension {
                    target = format!("{} ({})", target, extension);
                }
                println!("{:?} {} -> {}", rule.kind, rule.names.join(" | "), target);
            }
        }
    }

    Ok(())
}
