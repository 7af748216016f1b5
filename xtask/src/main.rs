//! Development tasks for keyclack
//!
//! Usage:
//!   cargo xtask install     Install release binary to /usr/local/bin (requires sudo)
//!   cargo xtask uninstall   Remove binary from /usr/local/bin (requires sudo)
//!   cargo xtask dist        Build release binary and man pages for distribution

use std::env;
use std::path::{Path, PathBuf};
use std::process::{Command, ExitCode};

const INSTALL_PATH: &str = "/usr/local/bin/keyclack";

fn main() -> ExitCode {
    let args: Vec<String> = env::args().skip(1).collect();

    let Some(command) = args.first() else {
        print_help();
        return ExitCode::SUCCESS;
    };

    let result = match command.as_str() {
        "install" => install(),
        "uninstall" => uninstall(),
        "dist" => dist(),
        "help" | "--help" | "-h" => {
            print_help();
            Ok(())
        }
        cmd => {
            eprintln!("Unknown command: {}", cmd);
            print_help();
            Err(anyhow::anyhow!("Unknown command"))
        }
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}

fn print_help() {
    eprintln!(
        r#"
keyclack development tasks

Usage: cargo xtask <COMMAND>

Commands:
  install    Build release binary and install to /usr/local/bin (requires sudo)
  uninstall  Remove keyclack from /usr/local/bin (requires sudo)
  dist       Build optimized release binary and man pages for distribution
"#
    );
}

/// Get the project root directory
fn project_root() -> anyhow::Result<PathBuf> {
    let dir = match env::var("CARGO_MANIFEST_DIR") {
        Ok(dir) => PathBuf::from(dir),
        Err(_) => env::current_dir()?,
    };

    // xtask is in a subdirectory, go up one level
    Ok(dir.parent().unwrap_or(&dir).to_path_buf())
}

/// Run `cargo build --release` in the project root
fn build_release(root: &Path) -> anyhow::Result<PathBuf> {
    let status = Command::new("cargo")
        .args(["build", "--release"])
        .env("KEYCLACK_GEN_MANPAGES", "1")
        .current_dir(root)
        .status()?;

    if !status.success() {
        anyhow::bail!("Build failed");
    }

    let binary = root.join("target/release/keyclack");
    if !binary.exists() {
        anyhow::bail!("Binary not found at {:?}", binary);
    }
    Ok(binary)
}

/// Build release binary and install to /usr/local/bin
fn install() -> anyhow::Result<()> {
    let root = project_root()?;

    println!("==> Building release binary...");
    let binary = build_release(&root)?;

    println!("==> Installing to {}...", INSTALL_PATH);

    let status = Command::new("sudo")
        .arg("install")
        .arg("-Dm755")
        .arg(&binary)
        .arg(INSTALL_PATH)
        .status()?;

    if !status.success() {
        anyhow::bail!("Install failed (sudo required)");
    }

    println!("==> Installed successfully!");
    println!();
    println!("Installed: {}", INSTALL_PATH);

    // Show version
    let _ = Command::new(INSTALL_PATH).arg("--version").status();

    Ok(())
}

/// Remove keyclack from /usr/local/bin
fn uninstall() -> anyhow::Result<()> {
    println!("==> Removing {}...", INSTALL_PATH);

    let status = Command::new("sudo")
        .args(["rm", "-f", INSTALL_PATH])
        .status()?;

    if !status.success() {
        anyhow::bail!("Uninstall failed (sudo required)");
    }

    println!("==> Uninstalled successfully!");
    Ok(())
}

/// Build optimized release binary for distribution
fn dist() -> anyhow::Result<()> {
    let root = project_root()?;

    println!("==> Building distribution binary...");
    let binary = build_release(&root)?;
    println!("==> Built: {:?}", binary);

    // Show binary info
    let _ = Command::new("ls").arg("-lh").arg(&binary).status();
    let _ = Command::new(&binary).arg("--version").status();

    Ok(())
}
