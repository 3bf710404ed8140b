//! Install and uninstall steps for a single tool.
use std::collections::VecDeque;
use std::path::{Path, PathBuf};

use super::{Archive, Context, Tool, ToolResult};
use crate::error::{EnvkitError, ToolError};
use crate::exec::{privilege_prefix, shell_quote};
use crate::release::DownloadedAsset;

/// Download the tool's asset and install its binaries into the bin dir.
///
/// The asset lands in a fresh temporary directory, is unpacked there with
/// `tar`, and each binary is copied with `install -m 755`, prefixed with
/// `sudo` when the bin dir is not writable. The temporary directory is
/// removed afterwards, whether or not installation succeeded.
///
/// # Errors
///
/// Returns an error if the download, extraction or any copy fails, or if a
/// binary is missing from the asset.
pub fn install(tool: &Tool, ctx: &Context<'_>) -> Result<ToolResult, EnvkitError> {
    if ctx.dry_run {
        ctx.log.dry_run(&format!(
            "would download {} ({}) from {}",
            tool.name,
            ctx.constraint.unwrap_or("latest"),
            tool.repo
        ));
        for binary in &tool.binaries {
            ctx.log.dry_run(&format!(
                "would install {binary} into {}",
                ctx.bin_dir.display()
            ));
        }
        return Ok(ToolResult::DryRun);
    }

    let downloaded = ctx.releases.download(&tool.request(ctx.constraint), ctx.host)?;
    let work_dir = downloaded
        .path
        .parent()
        .map_or_else(|| PathBuf::from("."), Path::to_path_buf);
    let result = install_from(tool, ctx, &downloaded, &work_dir);
    if let Err(e) = std::fs::remove_dir_all(&work_dir) {
        ctx.log.debug(&format!(
            "could not remove {}: {e}",
            work_dir.display()
        ));
    }
    result
}

fn install_from(
    tool: &Tool,
    ctx: &Context<'_>,
    downloaded: &DownloadedAsset,
    work_dir: &Path,
) -> Result<ToolResult, EnvkitError> {
    let asset = shell_quote(&downloaded.path.to_string_lossy());
    let work = shell_quote(&work_dir.to_string_lossy());
    match tool.archive {
        Archive::TarGz => ctx.executor.run_shell(&format!("tar -xzf {asset} -C {work}"), &[])?,
        Archive::TarXz => ctx.executor.run_shell(&format!("tar -xJf {asset} -C {work}"), &[])?,
        Archive::Binary => {}
    }

    let prefix = privilege_prefix(ctx.bin_dir, ctx.executor);
    let bin_dir = shell_quote(&ctx.bin_dir.to_string_lossy());
    ctx.executor
        .run_shell(&format!("{prefix}mkdir -p {bin_dir}"), &[])?;

    for binary in &tool.binaries {
        let source = if tool.archive == Archive::Binary {
            downloaded.path.clone()
        } else {
            find_file(tool, work_dir, binary, &downloaded.path)?
        };
        let target = shell_quote(&ctx.bin_dir.join(binary).to_string_lossy());
        ctx.executor.run_shell(
            &format!(
                "{prefix}install -m 755 {} {target}",
                shell_quote(&source.to_string_lossy())
            ),
            &[],
        )?;
        ctx.log.info(&format!(
            "installed {binary} {} into {}",
            downloaded.tag,
            ctx.bin_dir.display()
        ));
    }
    Ok(ToolResult::Ok)
}

/// Breadth-first search of `root` for a regular file called `name`, ignoring
/// the downloaded archive itself.
fn find_file(tool: &Tool, root: &Path, name: &str, archive: &Path) -> Result<PathBuf, ToolError> {
    let io_error = |location: &Path, source| ToolError::Io {
        tool: tool.name.clone(),
        location: location.to_path_buf(),
        source,
    };
    let mut queue = VecDeque::from([root.to_path_buf()]);
    while let Some(dir) = queue.pop_front() {
        let entries = std::fs::read_dir(&dir).map_err(|e| io_error(&dir, e))?;
        for entry in entries {
            let path = entry.map_err(|e| io_error(&dir, e))?.path();
            if path.is_dir() {
                queue.push_back(path);
            } else if path.file_name().is_some_and(|f| f == name) && path != archive {
                return Ok(path);
            }
        }
    }
    Err(ToolError::MissingBinary {
        tool: tool.name.clone(),
        binary: name.to_string(),
        location: root.to_path_buf(),
    })
}

/// Remove the tool's binaries from the bin dir.
///
/// # Errors
///
/// Returns an error if a removal command fails.
pub fn uninstall(tool: &Tool, ctx: &Context<'_>) -> Result<ToolResult, EnvkitError> {
    let installed: Vec<PathBuf> = tool
        .binaries
        .iter()
        .map(|binary| ctx.bin_dir.join(binary))
        .filter(|path| path.exists())
        .collect();
    if installed.is_empty() {
        return Ok(ToolResult::Skipped(format!(
            "not installed in {}",
            ctx.bin_dir.display()
        )));
    }

    if ctx.dry_run {
        for path in &installed {
            ctx.log.dry_run(&format!("would remove {}", path.display()));
        }
        return Ok(ToolResult::DryRun);
    }

    let prefix = privilege_prefix(ctx.bin_dir, ctx.executor);
    for path in &installed {
        ctx.executor.run_shell(
            &format!("{prefix}rm -f {}", shell_quote(&path.to_string_lossy())),
            &[],
        )?;
        ctx.log.info(&format!("removed {}", path.display()));
    }
    Ok(ToolResult::Ok)
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::exec::SystemExecutor;
    use crate::exec::test_helpers::MockExecutor;
    use crate::logging::test_helpers::CapturingLog;
    use crate::platform::{Arch, HostProfile, Os};
    use crate::release::ReleaseClient;
    use crate::release::fetch::{Fetcher, RetryPolicy};
    use crate::release::keywords::{Axis, KeywordTable};
    use crate::release::test_helpers::{RecordingClock, Scripted, ScriptedClient};

    const RELEASE: &str = r#"{"tag_name":"v1.0.0","assets":[
        {"name":"demo-x86_64-linux","browser_download_url":"https://dl.example.com/demo"}
    ]}"#;

    fn tool(archive: Archive) -> Tool {
        Tool {
            name: "demo".to_string(),
            aliases: vec![],
            repo: "acme/demo".to_string(),
            keywords: KeywordTable::new().with(Axis::Common, ["demo"]),
            exclude: vec![],
            archive,
            binaries: vec!["demo".to_string()],
            platforms: vec![Os::Linux],
        }
    }

    fn releases(script: Vec<Scripted>, log: &Arc<CapturingLog>) -> ReleaseClient {
        let fetcher = Fetcher::new(
            Box::new(ScriptedClient::new(script)),
            Box::new(RecordingClock::at(0)),
            RetryPolicy {
                retries: 0,
                ..RetryPolicy::default()
            },
            log.clone(),
        );
        ReleaseClient::new(fetcher, "https://api.example.com", log.clone())
    }

    fn host() -> HostProfile {
        HostProfile::new(Os::Linux, Arch::Amd64, Some("debian"))
    }

    #[test]
    fn dry_run_plans_without_downloading() {
        let log = Arc::new(CapturingLog::default());
        let client = releases(vec![], &log);
        let executor = MockExecutor::new();
        let host = host();
        let ctx = Context {
            host: &host,
            releases: &client,
            executor: &executor,
            log: log.as_ref(),
            bin_dir: Path::new("/opt/bin"),
            constraint: Some(">=1"),
            dry_run: true,
        };
        assert_eq!(install(&tool(Archive::TarGz), &ctx).unwrap(), ToolResult::DryRun);
        assert!(executor.commands().is_empty());
        let planned = log.at("dry_run");
        assert_eq!(planned[0], "would download demo (>=1) from acme/demo");
        assert_eq!(planned[1], "would install demo into /opt/bin");
    }

    #[test]
    fn binary_asset_is_installed_directly() {
        let log = Arc::new(CapturingLog::default());
        let client = releases(vec![Scripted::ok(RELEASE), Scripted::ok("#!/bin/sh\n")], &log);
        let executor = MockExecutor::new();
        let bin = tempfile::tempdir().unwrap();
        let host = host();
        let ctx = Context {
            host: &host,
            releases: &client,
            executor: &executor,
            log: log.as_ref(),
            bin_dir: bin.path(),
            constraint: None,
            dry_run: false,
        };
        assert_eq!(install(&tool(Archive::Binary), &ctx).unwrap(), ToolResult::Ok);

        let commands = executor.commands();
        assert_eq!(commands.len(), 2);
        assert!(commands[0].starts_with("mkdir -p "), "{commands:?}");
        assert!(commands[1].starts_with("install -m 755 "), "{commands:?}");
        assert!(commands[1].contains("demo-x86_64-linux"), "{commands:?}");
        assert!(log.contains("installed demo v1.0.0"));
    }

    #[test]
    fn missing_binary_fails_and_cleans_up() {
        let log = Arc::new(CapturingLog::default());
        let client = releases(vec![Scripted::ok(RELEASE), Scripted::ok("not a tarball")], &log);
        let executor = MockExecutor::new();
        let bin = tempfile::tempdir().unwrap();
        let host = host();
        let ctx = Context {
            host: &host,
            releases: &client,
            executor: &executor,
            log: log.as_ref(),
            bin_dir: bin.path(),
            constraint: None,
            dry_run: false,
        };
        let err = install(&tool(Archive::TarGz), &ctx).unwrap_err();
        assert!(
            matches!(err, EnvkitError::Tool(ToolError::MissingBinary { .. })),
            "{err}"
        );
        let extract = &executor.commands()[0];
        assert!(extract.starts_with("tar -xzf "), "{extract}");
        let work_dir = extract.rsplit(" -C ").next().unwrap();
        assert!(!Path::new(work_dir).exists());
    }

    #[cfg(unix)]
    #[test]
    fn tarball_is_extracted_and_installed() {
        let staging = tempfile::tempdir().unwrap();
        let nested = staging.path().join("demo-1.0.0");
        std::fs::create_dir(&nested).unwrap();
        std::fs::write(nested.join("demo"), "#!/bin/sh\necho demo\n").unwrap();
        let tarball = staging.path().join("demo.tar.gz");
        let status = std::process::Command::new("tar")
            .arg("-czf")
            .arg(&tarball)
            .arg("-C")
            .arg(staging.path())
            .arg("demo-1.0.0")
            .status()
            .unwrap();
        assert!(status.success());

        let log = Arc::new(CapturingLog::default());
        let client = releases(
            vec![
                Scripted::ok(RELEASE),
                Scripted::bytes(std::fs::read(&tarball).unwrap()),
            ],
            &log,
        );
        let bin = tempfile::tempdir().unwrap();
        let host = host();
        let ctx = Context {
            host: &host,
            releases: &client,
            executor: &SystemExecutor,
            log: log.as_ref(),
            bin_dir: &bin.path().join("bin"),
            constraint: None,
            dry_run: false,
        };
        assert_eq!(install(&tool(Archive::TarGz), &ctx).unwrap(), ToolResult::Ok);
        let installed = bin.path().join("bin/demo");
        assert_eq!(
            std::fs::read_to_string(&installed).unwrap(),
            "#!/bin/sh\necho demo\n"
        );
    }

    #[test]
    fn uninstall_removes_present_binaries() {
        let log = Arc::new(CapturingLog::default());
        let client = releases(vec![], &log);
        let executor = MockExecutor::new();
        let bin = tempfile::tempdir().unwrap();
        std::fs::write(bin.path().join("demo"), "").unwrap();
        let host = host();
        let ctx = Context {
            host: &host,
            releases: &client,
            executor: &executor,
            log: log.as_ref(),
            bin_dir: bin.path(),
            constraint: None,
            dry_run: false,
        };
        assert_eq!(uninstall(&tool(Archive::TarGz), &ctx).unwrap(), ToolResult::Ok);
        let commands = executor.commands();
        assert_eq!(commands.len(), 1);
        assert!(commands[0].starts_with("rm -f "), "{commands:?}");
        assert!(commands[0].ends_with("/demo"), "{commands:?}");
    }

    #[test]
    fn uninstall_skips_when_absent() {
        let log = Arc::new(CapturingLog::default());
        let client = releases(vec![], &log);
        let executor = MockExecutor::new();
        let bin = tempfile::tempdir().unwrap();
        let host = host();
        let ctx = Context {
            host: &host,
            releases: &client,
            executor: &executor,
            log: log.as_ref(),
            bin_dir: bin.path(),
            constraint: None,
            dry_run: true,
        };
        assert!(matches!(
            uninstall(&tool(Archive::TarGz), &ctx).unwrap(),
            ToolResult::Skipped(_)
        ));
        assert!(executor.commands().is_empty());
    }
}
