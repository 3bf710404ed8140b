//! Command: show the detected host profile.
use crate::platform::HostProfile;

/// Multi-line description of `host`.
#[must_use]
pub fn describe(host: &HostProfile) -> String {
    let mut lines = vec![
        format!("os:     {}", host.os),
        format!("arch:   {}", host.arch),
    ];
    if let Some(family) = host.distro_family() {
        lines.push(format!(
            "distro: {} ({family})",
            host.distro_id.as_deref().unwrap_or("unknown")
        ));
    }
    lines.join("\n")
}

/// Print the detected host profile to stdout.
pub fn run() {
    println!("{}", describe(&HostProfile::detect()));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::platform::{Arch, Os};

    #[test]
    fn describe_linux_host() {
        let host = HostProfile::new(Os::Linux, Arch::Arm64, Some("pop"));
        insta::assert_snapshot!(describe(&host), @r"
        os:     linux
        arch:   arm64
        distro: pop (DebianUbuntuSeries)
        ");
    }

    #[test]
    fn describe_darwin_host_has_no_distro() {
        let host = HostProfile::new(Os::Darwin, Arch::Amd64, None);
        assert_eq!(describe(&host), "os:     darwin\narch:   amd64");
    }
}
