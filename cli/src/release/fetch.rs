//! Rate-limit-aware fetch primitive with exponential backoff.
//!
//! Every request the release engine makes goes through [`Fetcher`]. One
//! fetch is a bounded loop:
//!
//! - a 2xx response is consumed and returned;
//! - an error response whose `x-ratelimit-remaining` is `0` sleeps until the
//!   reported reset time plus a margin and repeats the identical request
//!   without spending the retry budget (bounded separately by
//!   [`RetryPolicy::max_rate_limit_waits`]);
//! - any other failure (transport error, non-2xx status, body read error)
//!   spends one retry and sleeps for the current backoff delay, which
//!   doubles after every retry.
use std::fs::File;
use std::io::{self, Read, Seek as _, SeekFrom, Write as _};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use serde::de::DeserializeOwned;

use super::clock::Clock;
use super::error::{Failure, ReleaseError};
use super::http::{HttpClient, HttpResponse, RateLimit};
use crate::logging::{Log, RetryKind, RetryNotice};

/// Retry and rate-limit parameters of a [`Fetcher`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Transient failures tolerated before giving up.
    pub retries: u32,
    /// Backoff before the first retry; doubled for every further retry.
    pub initial_delay: Duration,
    /// Extra wait past the reported rate-limit reset time.
    pub rate_limit_margin: Duration,
    /// Rate-limit waits tolerated before giving up.
    pub max_rate_limit_waits: u32,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            retries: 3,
            initial_delay: Duration::from_secs(120),
            rate_limit_margin: Duration::from_secs(10),
            max_rate_limit_waits: 10,
        }
    }
}

/// How consuming a successful response body failed.
#[derive(Debug)]
enum BodyError {
    /// Reading the body failed; worth another attempt.
    Read(io::Error),
    /// Anything else; aborts the fetch.
    Fatal(ReleaseError),
}

/// Issues GET requests through an [`HttpClient`] under a [`RetryPolicy`].
#[derive(Debug)]
pub struct Fetcher {
    client: Box<dyn HttpClient>,
    clock: Box<dyn Clock>,
    policy: RetryPolicy,
    log: Arc<dyn Log>,
}

impl Fetcher {
    /// Create a fetcher.
    #[must_use]
    pub fn new(
        client: Box<dyn HttpClient>,
        clock: Box<dyn Clock>,
        policy: RetryPolicy,
        log: Arc<dyn Log>,
    ) -> Self {
        Self {
            client,
            clock,
            policy,
            log,
        }
    }

    /// The policy this fetcher runs under.
    #[must_use]
    pub const fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Fetch `url` and return the whole body.
    ///
    /// # Errors
    ///
    /// Returns [`ReleaseError::InvalidUrl`], [`ReleaseError::Http`] or
    /// [`ReleaseError::RateLimitWaitsExceeded`].
    pub fn get_bytes(&self, url: &str) -> Result<Vec<u8>, ReleaseError> {
        check_url(url)?;
        self.retrying(url, |mut response| {
            let mut bytes = Vec::new();
            response
                .body
                .read_to_end(&mut bytes)
                .map_err(BodyError::Read)?;
            Ok(bytes)
        })
    }

    /// Fetch `url` and deserialize the body as JSON.
    ///
    /// A malformed payload is fatal and not retried.
    ///
    /// # Errors
    ///
    /// Returns the errors of [`get_bytes`](Self::get_bytes) and
    /// [`ReleaseError::Decode`].
    pub fn get_json<T: DeserializeOwned>(&self, url: &str) -> Result<T, ReleaseError> {
        let bytes = self.get_bytes(url)?;
        serde_json::from_slice(&bytes).map_err(|source| ReleaseError::Decode {
            url: url.to_string(),
            source,
        })
    }

    /// Download `url` into the file `name` and return its canonical path.
    ///
    /// With `use_temp_dir` the file is created inside a fresh temporary
    /// directory (which is left in place for the caller); otherwise `name` is
    /// used as a path relative to the working directory.
    ///
    /// The body is streamed into a staging file beside the destination,
    /// created before the first request and truncated at the start of every
    /// attempt. Only a complete body replaces the destination; on failure the
    /// destination keeps its previous content and a temporary directory is
    /// removed again.
    ///
    /// # Errors
    ///
    /// Returns the errors of [`get_bytes`](Self::get_bytes) and
    /// [`ReleaseError::DestinationWrite`] if the file cannot be created or
    /// written; write failures are not retried.
    pub fn download(
        &self,
        url: &str,
        name: &str,
        use_temp_dir: bool,
    ) -> Result<PathBuf, ReleaseError> {
        check_url(url)?;
        let temp_dir = if use_temp_dir {
            let dir = tempfile::Builder::new()
                .prefix("envkit-")
                .tempdir()
                .map_err(|source| write_error(&std::env::temp_dir(), source))?;
            Some(dir)
        } else {
            None
        };
        let destination = temp_dir
            .as_ref()
            .map_or_else(|| PathBuf::from(name), |dir| dir.path().join(name));
        let parent = destination
            .parent()
            .filter(|dir| !dir.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));

        let mut staging = tempfile::Builder::new()
            .prefix(".envkit-partial-")
            .tempfile_in(parent)
            .map_err(|source| write_error(&destination, source))?;
        let bytes = self.retrying(url, |mut response| {
            let file = staging.as_file_mut();
            file.set_len(0)
                .and_then(|()| file.seek(SeekFrom::Start(0)))
                .map_err(|source| BodyError::Fatal(write_error(&destination, source)))?;
            copy_body(response.body.as_mut(), file, &destination)
        })?;
        staging
            .as_file()
            .sync_all()
            .map_err(|source| write_error(&destination, source))?;
        staging
            .persist(&destination)
            .map_err(|e| write_error(&destination, e.error))?;
        if let Some(dir) = temp_dir {
            let _ = dir.keep();
        }

        let path = dunce::canonicalize(&destination).map_err(|source| write_error(&destination, source))?;
        self.log
            .info(&format!("downloaded {bytes} bytes to {}", path.display()));
        Ok(path)
    }

    /// Run the request loop, handing every 2xx response to `consume`.
    fn retrying<T>(
        &self,
        url: &str,
        mut consume: impl FnMut(HttpResponse) -> Result<T, BodyError>,
    ) -> Result<T, ReleaseError> {
        let mut failures: u32 = 0;
        let mut rate_limit_waits: u32 = 0;
        let mut delay = self.policy.initial_delay;

        loop {
            self.log.debug(&format!("GET {url}"));
            let failure = match self.client.get(url) {
                Ok(response) if response.is_success() => match consume(response) {
                    Ok(value) => return Ok(value),
                    Err(BodyError::Fatal(err)) => return Err(err),
                    Err(BodyError::Read(err)) => Failure::Body(err.to_string()),
                },
                Ok(response) if response.rate_limit.is_exhausted() => {
                    if rate_limit_waits >= self.policy.max_rate_limit_waits {
                        return Err(ReleaseError::RateLimitWaitsExceeded {
                            url: url.to_string(),
                            waits: rate_limit_waits,
                        });
                    }
                    rate_limit_waits += 1;
                    let wait = self.rate_limit_wait(&response.rate_limit);
                    self.log.retry(&RetryNotice {
                        url,
                        attempt: rate_limit_waits,
                        limit: self.policy.max_rate_limit_waits,
                        wait_secs: wait.as_secs(),
                        kind: RetryKind::RateLimit,
                        detail: &response.rate_limit.to_string(),
                    });
                    self.clock.sleep(wait);
                    continue;
                }
                Ok(response) => Failure::Status {
                    code: response.status,
                    rate_limit: response.rate_limit,
                },
                Err(err) => Failure::Transport(err.to_string()),
            };

            failures += 1;
            if failures > self.policy.retries {
                return Err(ReleaseError::Http {
                    url: url.to_string(),
                    attempts: failures,
                    last: failure,
                });
            }
            self.log.retry(&RetryNotice {
                url,
                attempt: failures,
                limit: self.policy.retries,
                wait_secs: delay.as_secs(),
                kind: RetryKind::Failure,
                detail: &failure.to_string(),
            });
            self.clock.sleep(delay);
            delay = delay.saturating_mul(2);
        }
    }

    /// Time until the rate-limit window resets, plus the margin.
    fn rate_limit_wait(&self, rate_limit: &RateLimit) -> Duration {
        let until_reset = rate_limit.reset.map_or(0, |reset| {
            reset.saturating_sub(self.clock.now_unix())
        });
        Duration::from_secs(until_reset).saturating_add(self.policy.rate_limit_margin)
    }
}

fn check_url(url: &str) -> Result<(), ReleaseError> {
    url::Url::parse(url)
        .map(drop)
        .map_err(|e| ReleaseError::InvalidUrl {
            url: url.to_string(),
            reason: e.to_string(),
        })
}

fn write_error(path: &Path, source: io::Error) -> ReleaseError {
    ReleaseError::DestinationWrite {
        path: path.to_path_buf(),
        source,
    }
}

/// Stream `body` into `file`, separating read failures (retryable) from
/// write failures (fatal).
fn copy_body(body: &mut dyn Read, file: &mut File, path: &Path) -> Result<u64, BodyError> {
    let mut buf = vec![0_u8; 64 * 1024];
    let mut total: u64 = 0;
    loop {
        let n = match body.read(&mut buf) {
            Ok(0) => return Ok(total),
            Ok(n) => n,
            Err(err) if err.kind() == io::ErrorKind::Interrupted => continue,
            Err(err) => return Err(BodyError::Read(err)),
        };
        let chunk = buf.get(..n).unwrap_or_default();
        file.write_all(chunk)
            .map_err(|source| BodyError::Fatal(write_error(path, source)))?;
        total += n as u64;
    }
}

#[cfg(test)]
#[allow(
    clippy::expect_used,
    clippy::unwrap_used,
    clippy::indexing_slicing,
    clippy::panic
)]
mod tests {
    use mockall::{Sequence, mock, predicate::eq};

    use super::*;
    use crate::logging::test_helpers::CapturingLog;
    use crate::release::test_helpers::{RecordingClock, Scripted, ScriptedClient};

    mock! {
        Clock {}
        impl Clock for Clock {
            fn now_unix(&self) -> u64;
            fn sleep(&self, duration: Duration);
        }
    }

    const URL: &str = "https://api.example.com/repos/foo/bar/releases/latest";

    fn policy(retries: u32, initial: u64) -> RetryPolicy {
        RetryPolicy {
            retries,
            initial_delay: Duration::from_secs(initial),
            rate_limit_margin: Duration::from_secs(10),
            max_rate_limit_waits: 3,
        }
    }

    fn fetcher(
        client: &ScriptedClient,
        clock: Box<dyn Clock>,
        policy: RetryPolicy,
    ) -> (Fetcher, Arc<CapturingLog>) {
        let log = Arc::new(CapturingLog::default());
        let fetcher = Fetcher::new(Box::new(client.clone()), clock, policy, log.clone());
        (fetcher, log)
    }

    // -----------------------------------------------------------------------
    // Success paths
    // -----------------------------------------------------------------------

    #[test]
    fn success_on_first_attempt_does_not_sleep() {
        let client = ScriptedClient::new(vec![Scripted::ok("hello")]);
        let clock = RecordingClock::at(0);
        let (f, _) = fetcher(&client, Box::new(clock.clone()), policy(3, 1));
        assert_eq!(f.get_bytes(URL).unwrap(), b"hello");
        assert!(clock.sleeps().is_empty());
        assert_eq!(client.requests(), [URL]);
    }

    #[test]
    fn get_json_decodes_payload() {
        let client = ScriptedClient::new(vec![Scripted::ok(r#"{"tag_name":"v1.0.0","assets":[]}"#)]);
        let (f, _) = fetcher(&client, Box::new(RecordingClock::at(0)), policy(0, 1));
        let release: crate::release::ReleaseInfo = f.get_json(URL).unwrap();
        assert_eq!(release.tag_name, "v1.0.0");
    }

    #[test]
    fn malformed_json_is_fatal_without_retry() {
        let client = ScriptedClient::new(vec![Scripted::ok("<html>"), Scripted::ok("{}")]);
        let clock = RecordingClock::at(0);
        let (f, _) = fetcher(&client, Box::new(clock.clone()), policy(3, 1));
        let err = f.get_json::<crate::release::ReleaseInfo>(URL).unwrap_err();
        assert!(matches!(err, ReleaseError::Decode { .. }), "{err}");
        assert_eq!(client.requests().len(), 1);
        assert!(clock.sleeps().is_empty());
    }

    // -----------------------------------------------------------------------
    // Backoff
    // -----------------------------------------------------------------------

    #[test]
    fn backoff_doubles_then_gives_up_without_extra_wait() {
        let client = ScriptedClient::new(vec![
            Scripted::status(500),
            Scripted::transport("connection reset"),
            Scripted::status(502),
            Scripted::status(503),
            Scripted::ok("never reached"),
        ]);
        let mut clock = MockClock::new();
        let mut seq = Sequence::new();
        for secs in [1, 2, 4] {
            clock
                .expect_sleep()
                .with(eq(Duration::from_secs(secs)))
                .times(1)
                .in_sequence(&mut seq)
                .return_const(());
        }
        let (f, log) = fetcher(&client, Box::new(clock), policy(3, 1));

        let err = f.get_bytes(URL).unwrap_err();
        match err {
            ReleaseError::Http { attempts, last, .. } => {
                assert_eq!(attempts, 4);
                assert_eq!(
                    last,
                    Failure::Status {
                        code: 503,
                        rate_limit: RateLimit::default()
                    }
                );
            }
            other => panic!("unexpected error: {other}"),
        }
        assert_eq!(client.requests().len(), 4);
        assert_eq!(log.at("warn").len(), 3);
    }

    #[test]
    fn transient_failure_then_success() {
        let client = ScriptedClient::new(vec![Scripted::transport("dns"), Scripted::ok("ok")]);
        let clock = RecordingClock::at(0);
        let (f, _) = fetcher(&client, Box::new(clock.clone()), policy(3, 5));
        assert_eq!(f.get_bytes(URL).unwrap(), b"ok");
        assert_eq!(clock.sleeps(), [Duration::from_secs(5)]);
    }

    #[test]
    fn zero_retries_fails_immediately() {
        let client = ScriptedClient::new(vec![Scripted::status(404)]);
        let clock = RecordingClock::at(0);
        let (f, _) = fetcher(&client, Box::new(clock.clone()), policy(0, 1));
        let err = f.get_bytes(URL).unwrap_err();
        assert!(err.to_string().contains("HTTP status 404"), "{err}");
        assert!(clock.sleeps().is_empty());
    }

    #[test]
    fn body_read_error_is_retried() {
        let client = ScriptedClient::new(vec![Scripted::broken_body(), Scripted::ok("fine")]);
        let clock = RecordingClock::at(0);
        let (f, _) = fetcher(&client, Box::new(clock.clone()), policy(1, 2));
        assert_eq!(f.get_bytes(URL).unwrap(), b"fine");
        assert_eq!(clock.sleeps(), [Duration::from_secs(2)]);
    }

    // -----------------------------------------------------------------------
    // Rate limiting
    // -----------------------------------------------------------------------

    #[test]
    fn rate_limit_waits_until_reset_without_spending_retries() {
        let client = ScriptedClient::new(vec![
            Scripted::rate_limited(1_000),
            Scripted::rate_limited(1_000),
            Scripted::ok("done"),
        ]);
        let clock = RecordingClock::at(900);
        // No transient retries allowed: rate-limit waits must not count.
        let (f, log) = fetcher(&client, Box::new(clock.clone()), policy(0, 1));
        assert_eq!(f.get_bytes(URL).unwrap(), b"done");
        assert_eq!(
            clock.sleeps(),
            [Duration::from_secs(110), Duration::from_secs(10)]
        );
        assert!(clock.now() >= 1_000);
        assert!(log.contains("rate limit exhausted"));
    }

    #[test]
    fn rate_limit_waits_are_bounded() {
        let client = ScriptedClient::new(vec![Scripted::rate_limited(0); 5]);
        let (f, _) = fetcher(&client, Box::new(RecordingClock::at(0)), policy(3, 1));
        let err = f.get_bytes(URL).unwrap_err();
        assert!(
            matches!(err, ReleaseError::RateLimitWaitsExceeded { waits: 3, .. }),
            "{err}"
        );
        assert_eq!(client.requests().len(), 4);
    }

    #[test]
    fn error_status_with_remaining_quota_is_transient() {
        let mut limited = Scripted::status(403);
        limited.rate_limit.remaining = Some(5);
        let client = ScriptedClient::new(vec![limited, Scripted::ok("x")]);
        let clock = RecordingClock::at(0);
        let (f, _) = fetcher(&client, Box::new(clock.clone()), policy(1, 7));
        f.get_bytes(URL).unwrap();
        assert_eq!(clock.sleeps(), [Duration::from_secs(7)]);
    }

    // -----------------------------------------------------------------------
    // Downloads
    // -----------------------------------------------------------------------

    #[test]
    fn download_truncates_between_attempts() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("asset.bin");
        let client = ScriptedClient::new(vec![Scripted::broken_body(), Scripted::ok("payload")]);
        let (f, log) = fetcher(&client, Box::new(RecordingClock::at(0)), policy(1, 1));

        let path = f
            .download(URL, target.to_str().unwrap(), false)
            .unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "payload");
        assert_eq!(path, dunce::canonicalize(&target).unwrap());
        assert!(log.contains("downloaded 7 bytes"));
    }

    #[test]
    fn download_overwrites_longer_existing_file() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("asset.bin");
        std::fs::write(&target, "much longer previous content").unwrap();
        let client = ScriptedClient::new(vec![Scripted::ok("first"), Scripted::ok("2nd")]);
        let (f, _) = fetcher(&client, Box::new(RecordingClock::at(0)), policy(0, 1));

        let name = target.to_str().unwrap();
        f.download(URL, name, false).unwrap();
        assert_eq!(std::fs::read_to_string(&target).unwrap(), "first");
        f.download(URL, name, false).unwrap();
        assert_eq!(std::fs::read_to_string(&target).unwrap(), "2nd");
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 1);
    }

    #[test]
    fn failed_download_keeps_previous_content() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("asset.bin");
        std::fs::write(&target, "OLD CONTENT").unwrap();
        let client = ScriptedClient::new(vec![Scripted::broken_body()]);
        let (f, _) = fetcher(&client, Box::new(RecordingClock::at(0)), policy(0, 1));

        let err = f
            .download(URL, target.to_str().unwrap(), false)
            .unwrap_err();
        assert!(matches!(err, ReleaseError::Http { attempts: 1, .. }), "{err}");
        assert_eq!(std::fs::read_to_string(&target).unwrap(), "OLD CONTENT");
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 1);
    }

    #[test]
    fn failed_download_leaves_no_file_behind() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("asset.bin");
        let client = ScriptedClient::new(vec![Scripted::status(404)]);
        let (f, _) = fetcher(&client, Box::new(RecordingClock::at(0)), policy(0, 1));

        assert!(f.download(URL, target.to_str().unwrap(), false).is_err());
        assert!(!target.exists());
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[test]
    fn download_into_temp_dir() {
        let client = ScriptedClient::new(vec![Scripted::ok("abc")]);
        let (f, _) = fetcher(&client, Box::new(RecordingClock::at(0)), policy(0, 1));
        let path = f.download(URL, "tool.tar.gz", true).unwrap();
        assert_eq!(path.file_name().unwrap(), "tool.tar.gz");
        let parent = path.parent().unwrap();
        assert!(parent.file_name().unwrap().to_string_lossy().starts_with("envkit-"));
        std::fs::remove_dir_all(parent).unwrap();
    }

    #[test]
    fn uncreatable_destination_is_fatal_before_any_request() {
        let client = ScriptedClient::new(vec![Scripted::ok("abc")]);
        let (f, _) = fetcher(&client, Box::new(RecordingClock::at(0)), policy(3, 1));
        let err = f
            .download(URL, "/nonexistent-envkit-dir/out.bin", false)
            .unwrap_err();
        assert!(matches!(err, ReleaseError::DestinationWrite { .. }), "{err}");
        assert!(client.requests().is_empty());
    }

    #[test]
    fn invalid_url_is_not_requested() {
        let client = ScriptedClient::new(vec![]);
        let (f, _) = fetcher(&client, Box::new(RecordingClock::at(0)), policy(3, 1));
        let err = f.get_bytes("").unwrap_err();
        assert!(matches!(err, ReleaseError::InvalidUrl { .. }), "{err}");
        assert!(client.requests().is_empty());
    }

    #[test]
    fn mock_clock_drives_rate_limit_wait() {
        let client = ScriptedClient::new(vec![Scripted::rate_limited(50), Scripted::ok("x")]);
        let mut clock = MockClock::new();
        clock.expect_now_unix().return_const(45_u64);
        clock
            .expect_sleep()
            .with(eq(Duration::from_secs(15)))
            .times(1)
            .return_const(());
        let (f, _) = fetcher(&client, Box::new(clock), policy(0, 1));
        f.get_bytes(URL).unwrap();
    }

    #[test]
    fn policy_defaults() {
        let p = RetryPolicy::default();
        assert_eq!(p.retries, 3);
        assert_eq!(p.initial_delay, Duration::from_secs(120));
        assert_eq!(p.rate_limit_margin, Duration::from_secs(10));
        assert_eq!(p.max_rate_limit_waits, 10);
    }
}
