//! Build script: bakes the release version into `ENVKIT_VERSION`.
use std::process::Command;

fn main() {
    // Prefer ENVKIT_VERSION env var if set (set by the release workflow),
    // otherwise fall back to git describe for local development builds.
    if let Ok(version) = std::env::var("ENVKIT_VERSION") {
        println!("cargo:rustc-env=ENVKIT_VERSION={version}");
    } else if let Ok(output) = Command::new("git")
        .args(["describe", "--tags", "--always", "--dirty"])
        .output()
        && output.status.success()
    {
        let version = String::from_utf8_lossy(&output.stdout).trim().to_string();
        println!("cargo:rustc-env=ENVKIT_VERSION={version}");
    }

    // Re-run if git HEAD changes or env var changes
    println!("cargo:rerun-if-changed=../.git/HEAD");
    println!("cargo:rerun-if-changed=../.git/refs/");
    println!("cargo:rerun-if-env-changed=ENVKIT_VERSION");
}
