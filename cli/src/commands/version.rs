//! Command: print version information.

/// Version string: `ENVKIT_VERSION` at build time, else the package version.
#[must_use]
pub fn version() -> &'static str {
    option_env!("ENVKIT_VERSION").unwrap_or(env!("CARGO_PKG_VERSION"))
}

/// Print the envkit version to stdout.
pub fn run() {
    println!("envkit {}", version());
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn version_is_not_empty() {
        assert!(!version().is_empty());
    }
}
