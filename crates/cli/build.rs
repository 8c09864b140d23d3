use std::process::Command;

const UNKNOWN: &str = "unknown";

fn main() {
    for watched in ["../../.git/HEAD", "../../.git/refs/heads"] {
        println!("cargo:rerun-if-changed={watched}");
    }

    // Shown by `sellout --version` next to the package version.
    println!("cargo:rustc-env=SELLOUT_COMMIT={}", short_commit().as_deref().unwrap_or(UNKNOWN));
    println!(
        "cargo:rustc-env=SELLOUT_TARGET={}",
        std::env::var("TARGET").as_deref().unwrap_or(UNKNOWN)
    );
}

/// Abbreviated HEAD hash; `None` outside a git checkout.
fn short_commit() -> Option<String> {
    let output = Command::new("git").args(["rev-parse", "--short=7", "HEAD"]).output().ok()?;
    if !output.status.success() {
        return None;
    }
    let hash = String::from_utf8(output.stdout).ok()?;
    Some(hash.trim().to_owned())
}
