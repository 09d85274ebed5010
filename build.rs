//! Build script for the Bandruption auth bridge.
//!
//! Copies the configuration template into the user's local data directory so
//! the `.env` the binary reads has an example sitting next to it.

use std::{env, fs, path::PathBuf};

/// Copies `.env.example` from the crate root into the local data directory.
///
/// # File Operations
///
/// ## Destination Location
/// - Linux: `~/.local/share/bandruption/.env.example`
/// - macOS: `~/Library/Application Support/bandruption/.env.example`
/// - Windows: `%LOCALAPPDATA%/bandruption/.env.example`
///
/// # Error Handling Strategy
///
/// A missing template only produces a cargo warning. Failing to create the
/// directory or write the copy fails the build.
fn main() -> Result<(), Box<dyn std::error::Error>> {
    println!("cargo:rerun-if-changed=.env.example");

    let manifest_dir = PathBuf::from(env::var("CARGO_MANIFEST_DIR")?);
    let env_example_path = manifest_dir.join(".env.example");

    let mut out_dir = dirs::data_local_dir().unwrap_or_else(|| PathBuf::from("."));
    out_dir.push("bandruption");
    fs::create_dir_all(&out_dir)?;

    if env_example_path.is_file() {
        let contents = fs::read_to_string(&env_example_path)?;
        fs::write(out_dir.join(".env.example"), contents)?;
    } else {
        println!(
            "cargo:warning=.env.example not found at {}",
            env_example_path.display()
        );
    }

    Ok(())
}
