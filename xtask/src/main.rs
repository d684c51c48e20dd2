//! Build script.
//!
//! Use `cargo xtask` to execute.

use clap::{Parser, Subcommand};
use devx_cmd::cmd;
use std::{
    env, fs,
    path::{Path, PathBuf},
};

/// Build and test g0flash.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Build the bring-up firmware image.
    Build {
        /// Board to build.
        #[arg(default_value = "generic")]
        board: String,
    },
    /// Run the driver tests on the host.
    Test,
}

fn project_root() -> PathBuf {
    Path::new(&env!("CARGO_MANIFEST_DIR")).ancestors().nth(1).unwrap().to_path_buf()
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    let cargo = env::var("CARGO").unwrap_or_else(|_| "cargo".to_string());

    match args.command {
        Command::Build { board } => build(&cargo, &board),
        Command::Test => {
            cmd!(&cargo, "test", "--package", "g0flash").current_dir(project_root()).run()?;
            Ok(())
        }
    }
}

fn build(cargo: &str, board: &str) -> anyhow::Result<()> {
    let board_id = if board == "generic" { String::new() } else { format!("_{board}") };
    let firmware = format!("g0flash_firmware{board_id}");

    fs::create_dir_all(project_root().join("image"))?;

    cmd!(cargo, "build", "--release")
        .current_dir(project_root().join("g0flash-firmware"))
        .env("G0FLASH_BOARD", board)
        .run()?;
    cmd!(cargo, "objcopy", "--release", "--", "-O", "binary", format!("../image/{firmware}.bin"))
        .current_dir(project_root().join("g0flash-firmware"))
        .env("G0FLASH_BOARD", board)
        .run()?;

    println!();
    println!("Built firmware image/{firmware}.bin for board {board}");

    Ok(())
}
