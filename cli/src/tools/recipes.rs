//! Built-in tool recipes.
use super::{Archive, Tool};
use crate::platform::{Arch, Os};
use crate::release::keywords::{Axis, KeywordTable};

const AMD64: Axis = Axis::Arch(Arch::Amd64);
const ARM64: Axis = Axis::Arch(Arch::Arm64);
const LINUX: Axis = Axis::Os(Os::Linux);
const DARWIN: Axis = Axis::Os(Os::Darwin);

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| (*s).to_string()).collect()
}

/// Keyword table shared by Rust projects publishing `<triple>` assets.
fn rust_triples(common: &str, linux: &[&str]) -> KeywordTable {
    KeywordTable::new()
        .with(Axis::Common, [common])
        .with(AMD64, ["x86_64"])
        .with(ARM64, ["aarch64"])
        .with(LINUX, linux.iter().copied())
        .with(DARWIN, ["apple", "darwin"])
}

/// All built-in recipes, sorted by name.
#[must_use]
pub fn builtin() -> Vec<Tool> {
    let both = vec![Os::Linux, Os::Darwin];
    vec![
        Tool {
            name: "cargo-binstall".to_string(),
            aliases: strings(&["binstall"]),
            repo: "cargo-bins/cargo-binstall".to_string(),
            keywords: rust_triples("tgz", &["unknown", "linux", "gnu"]),
            exclude: strings(&["pre", "full"]),
            archive: Archive::TarGz,
            binaries: strings(&["cargo-binstall"]),
            platforms: vec![Os::Linux],
        },
        Tool {
            name: "delta".to_string(),
            aliases: strings(&["git-delta"]),
            repo: "dandavison/delta".to_string(),
            keywords: rust_triples("tar.gz", &["linux", "gnu"]),
            exclude: vec![],
            archive: Archive::TarGz,
            binaries: strings(&["delta"]),
            platforms: both.clone(),
        },
        Tool {
            name: "fish".to_string(),
            aliases: vec![],
            repo: "fish-shell/fish-shell".to_string(),
            keywords: KeywordTable::new()
                .with(Axis::Common, ["fish", "tar.xz"])
                .with(AMD64, ["x86_64"])
                .with(ARM64, ["aarch64"])
                .with(LINUX, ["linux"]),
            exclude: strings(&["app", "zip", "pkg", "asc"]),
            archive: Archive::TarXz,
            binaries: strings(&["fish"]),
            platforms: vec![Os::Linux],
        },
        Tool {
            name: "nushell".to_string(),
            aliases: strings(&["nu"]),
            repo: "nushell/nushell".to_string(),
            keywords: rust_triples("tar.gz", &["unknown", "linux", "gnu"]),
            exclude: vec![],
            archive: Archive::TarGz,
            binaries: strings(&["nu"]),
            platforms: both.clone(),
        },
        Tool {
            name: "sccache".to_string(),
            aliases: vec![],
            repo: "mozilla/sccache".to_string(),
            keywords: rust_triples("tar.gz", &["unknown", "linux", "musl"]),
            exclude: strings(&["pre", "dist", "sha256"]),
            archive: Archive::TarGz,
            binaries: strings(&["sccache"]),
            platforms: both.clone(),
        },
        Tool {
            name: "zellij".to_string(),
            aliases: vec![],
            repo: "zellij-org/zellij".to_string(),
            keywords: rust_triples("tar.gz", &["linux"]),
            exclude: strings(&["sha256sum", "no-web"]),
            archive: Archive::TarGz,
            binaries: strings(&["zellij"]),
            platforms: both,
        },
    ]
}
