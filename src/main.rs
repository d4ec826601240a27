#![forbid(unsafe_code)]

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{error, info};
use tracing_subscriber::FmtSubscriber;

use visionsim_presets::config::AppConfig;
use visionsim_presets::display::{blur_radius, clamp_text_size, clamp_text_weight};
use visionsim_presets::model::Preset;
use visionsim_presets::{IconUpdate, PresetLibrary, ProfileUpdate, StoreError, TextUpdate};

#[derive(Parser)]
#[command(name = "visionsim")]
#[command(about = "Manage vision simulation presets", long_about = None)]
struct Cli {
    /// Config file to use instead of the default location
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create the owner profile
    Setup {
        #[arg(long)]
        name: String,
        #[arg(long)]
        countryside: bool,
        /// PNG to use as profile icon
        #[arg(long)]
        icon: Option<PathBuf>,
    },

    /// Edit the owner profile
    Profile {
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        countryside: Option<bool>,
        #[arg(long, conflicts_with = "remove_icon")]
        icon: Option<PathBuf>,
        #[arg(long)]
        remove_icon: bool,
    },

    /// List the owner's presets, or everyone else's with --others
    List {
        #[arg(long)]
        others: bool,
    },

    /// Create a preset with default settings
    New,

    Rename {
        preset: String,
        new_name: String,
    },

    /// Change settings of one of the owner's presets
    Edit {
        preset: String,
        #[arg(long)]
        text: Option<String>,
        #[arg(long)]
        size: Option<f64>,
        #[arg(long)]
        weight: Option<f64>,
        /// Color pair code, e.g. "Black,Yellow"
        #[arg(long, conflicts_with = "clear_color")]
        color: Option<String>,
        #[arg(long)]
        clear_color: bool,
        /// Blurriness on the 0-100 scale
        #[arg(long)]
        blur: Option<f64>,
        #[arg(long, conflicts_with = "clear_image")]
        image: Option<PathBuf>,
        #[arg(long)]
        clear_image: bool,
    },

    Delete {
        preset: String,
    },

    /// Write a preset to <out>/<name>.json
    Export {
        preset: String,
        #[arg(long)]
        out: Option<PathBuf>,
    },

    Import {
        file: PathBuf,
    },

    /// List color pairs
    Colors,

    /// List effect values
    Effects,

    SetEffect {
        name: String,
        value: f64,
    },
}

fn main() {
    if let Err(e) = run() {
        error!("{e:#}");
        eprintln!("Error: {e:#}");
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => AppConfig::load_from(path)?,
        None => AppConfig::load()?,
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(config.tracing_level())
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let library = match PresetLibrary::open(&config) {
        Ok(library) => library,
        Err(e @ StoreError::Init { .. }) => {
            error!(error = %e, "Cannot open preset store");
            std::process::exit(1);
        }
        Err(e) => return Err(e.into()),
    };

    match cli.command {
        Commands::Setup {
            name,
            countryside,
            icon,
        } => {
            let icon = icon.as_deref().map(read_bytes).transpose()?;
            library.setup_owner(&name, countryside, icon)?;
            println!("Welcome, {name}");
        }
        Commands::Profile {
            name,
            countryside,
            icon,
            remove_icon,
        } => {
            let icon = match (icon, remove_icon) {
                (Some(path), _) => IconUpdate::Replace(read_bytes(&path)?),
                (None, true) => IconUpdate::Remove,
                (None, false) => IconUpdate::Keep,
            };
            let user = library.update_owner_profile(ProfileUpdate {
                name,
                is_from_countryside: countryside,
                icon,
            })?;
            println!(
                "{} (countryside: {}, icon: {})",
                user.name,
                user.is_from_countryside,
                if user.icon.is_some() { "yes" } else { "no" }
            );
        }
        Commands::List { others } => {
            let presets = if others {
                library.other_presets()
            } else {
                library.require_owner()?;
                library.owner_presets()
            };
            for preset in presets {
                print_preset(&library, &preset, others)?;
            }
        }
        Commands::New => {
            let preset = library.create_preset()?;
            println!("{}", library.preset_details(preset)?.preset.name);
        }
        Commands::Rename { preset, new_name } => {
            let preset = library.find_owner_preset(&preset)?;
            library.rename_preset(preset.id, &new_name)?;
        }
        Commands::Edit {
            preset,
            text,
            size,
            weight,
            color,
            clear_color,
            blur,
            image,
            clear_image,
        } => {
            let preset = library.find_owner_preset(&preset)?.id;
            if text.is_some() || size.is_some() || weight.is_some() {
                library.update_text(preset, TextUpdate { text, size, weight })?;
            }
            if let Some(code) = color {
                library.set_color(preset, Some(&code))?;
            } else if clear_color {
                library.set_color(preset, None)?;
            }
            if let Some(blur) = blur {
                library.set_blurriness(preset, blur)?;
            }
            if let Some(path) = image {
                library.set_image(preset, Some(read_bytes(&path)?))?;
            } else if clear_image {
                library.set_image(preset, None)?;
            }
        }
        Commands::Delete { preset } => {
            let preset = library.find_any_preset(&preset)?;
            library.delete_preset(preset.id)?;
        }
        Commands::Export { preset, out } => {
            let preset = library.find_any_preset(&preset)?;
            let dir = out.unwrap_or_else(|| config.export_dir());
            let path = library.export_to(preset.id, &dir)?;
            println!("{}", path.display());
        }
        Commands::Import { file } => {
            let pending = library.begin_import(file);
            let built = library.finish_import(pending)?;
            info!(preset = %built.name, "Import finished");
            println!("{}", built.name);
        }
        Commands::Colors => {
            for color in library.colors() {
                println!("{}\t{}\t{}", color.code, color.background_code, color.text_code);
            }
        }
        Commands::Effects => {
            for effect in library.effects() {
                println!("{}\t{}", effect.name, effect.value);
            }
        }
        Commands::SetEffect { name, value } => {
            library.set_effect(&name, value)?;
        }
    }

    Ok(())
}

fn read_bytes(path: &Path) -> Result<Vec<u8>> {
    fs::read(path).with_context(|| format!("Failed to read {:?}", path))
}

fn print_preset(library: &PresetLibrary, preset: &Preset, with_user: bool) -> Result<()> {
    let details = library.preset_details(preset.id)?;
    let text = &details.text_setting;
    let color = details
        .background_color
        .as_ref()
        .map(|c| c.code.as_str())
        .unwrap_or("-");
    let owner = if with_user {
        format!("  [{}]", details.user.name)
    } else {
        String::new()
    };
    println!(
        "{}{owner}\tsize {:.0}\tweight {:.2}\tcolor {color}\tblur radius {:.1}{}",
        preset.name,
        clamp_text_size(text.size),
        clamp_text_weight(text.weight),
        blur_radius(details.visual_simulation.blurriness),
        if details.image.is_some() { "\timage" } else { "" },
    );
    Ok(())
}
