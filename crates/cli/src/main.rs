use anyhow::Result;
use clap::{Parser, Subcommand};
use mfg_image::commands::{create_command, flash_map_command, inputs_command, verify_command};
use mfg_image::{init_logging, DEFAULT_OUT_DIR};

/// Manufacturing image assembler CLI.
///
/// This CLI is a thin wrapper around `mfg-core` (exposed in code as `mfg_core`).
/// All substantive logic lives in the library so it can be tested thoroughly
/// and reused from other frontends.
#[derive(Parser, Debug)]
#[command(
    name = "mfg-image",
    version,
    about = "Assemble flash-ready manufacturing images",
    long_about = None
)]
struct Cli {
    /// Increase log verbosity (-v info, -vv debug, -vvv trace).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Build a manufacturing image from a config file.
    ///
    /// This will:
    /// - Stage every bootloader/image output under `<out-dir>/<name>/`.
    /// - Place all parts into section 0 and stamp the meta record hash.
    /// - Write `sections/<name>-s0.bin` and `manifest.json`.
    Create {
        /// Path to the mfg config (YAML or JSON).
        #[arg(long)]
        config: String,

        /// Output base directory.
        #[arg(long, default_value = DEFAULT_OUT_DIR)]
        out_dir: String,

        /// Emit JSON instead of human-readable text.
        #[arg(long, default_value_t = false)]
        json: bool,
    },

    /// List every file a build would read, without building.
    Inputs {
        /// Path to the mfg config (YAML or JSON).
        #[arg(long)]
        config: String,

        /// Emit JSON instead of human-readable text.
        #[arg(long, default_value_t = false)]
        json: bool,
    },

    /// Verify a created image against its manifest and meta record.
    ///
    /// Exits non-zero on a hash mismatch.
    Verify {
        /// Path to the mfg config (YAML or JSON).
        #[arg(long)]
        config: String,

        /// Output base directory the image was created in.
        #[arg(long, default_value = DEFAULT_OUT_DIR)]
        out_dir: String,

        /// Emit JSON instead of human-readable text.
        #[arg(long, default_value_t = false)]
        json: bool,
    },

    /// Show the flash map a config resolves to.
    FlashMap {
        /// Path to the mfg config (YAML or JSON).
        #[arg(long)]
        config: String,

        /// Emit JSON instead of human-readable text.
        #[arg(long, default_value_t = false)]
        json: bool,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.command {
        Command::Create { config, out_dir, json } => create_command(&config, &out_dir, json)?,
        Command::Inputs { config, json } => inputs_command(&config, json)?,
        Command::Verify { config, out_dir, json } => verify_command(&config, &out_dir, json)?,
        Command::FlashMap { config, json } => flash_map_command(&config, json)?,
    }

    Ok(())
}
