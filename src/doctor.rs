//! Startup diagnostics for `forged doctor`.
//!
//! Probes the things the daemon needs before it tries to come up: a free
//! API port, a reachable Ollama server, a Python interpreter, and usable
//! workspace/data directories. Builds no AppContext and opens no database.

use std::fmt;
use std::path::Path;
use std::time::Duration;

use crate::config::DaemonConfig;

/// One check: `Ok` carries the passing detail, `Err` what went wrong.
type CheckOutcome = Result<String, String>;

/// Aggregated diagnostics, rendered through `Display`.
#[derive(Default)]
pub struct DiagnosticReport {
    checks: Vec<(&'static str, CheckOutcome)>,
}

impl DiagnosticReport {
    fn record(&mut self, label: &'static str, outcome: CheckOutcome) {
        self.checks.push((label, outcome));
    }

    pub fn failures(&self) -> usize {
        self.checks.iter().filter(|(_, o)| o.is_err()).count()
    }

    pub fn all_passed(&self) -> bool {
        self.failures() == 0
    }
}

impl fmt::Display for DiagnosticReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "forged doctor")?;
        for (label, outcome) in &self.checks {
            match outcome {
                Ok(detail) => writeln!(f, "  ok    {label:<12} {detail}")?,
                Err(detail) => writeln!(f, "  FAIL  {label:<12} {detail}")?,
            }
        }
        match self.failures() {
            0 => writeln!(f, "all {} checks passed", self.checks.len()),
            n => writeln!(f, "{n} of {} checks failed", self.checks.len()),
        }
    }
}

/// Run every diagnostic against the given configuration.
pub async fn run(config: &DaemonConfig) -> DiagnosticReport {
    let mut report = DiagnosticReport::default();
    report.record("api port", port_free(config));
    report.record("ollama", ollama_reachable(config).await);
    report.record("python", python_available(&config.agent.python_bin));
    report.record("workspace", dir_usable(&config.workspace_root));
    report.record("data dir", dir_writable(&config.data_dir));
    report
}

fn port_free(config: &DaemonConfig) -> CheckOutcome {
    let bind = format!("{}:{}", config.bind_address, config.port);
    match std::net::TcpListener::bind(&bind) {
        Ok(_) => Ok(format!("{bind} is free")),
        Err(_) => Err(format!("{bind} is already in use")),
    }
}

async fn ollama_reachable(config: &DaemonConfig) -> CheckOutcome {
    let url = format!("{}/api/tags", config.ollama.base_url);
    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(3))
        .build()
        .map_err(|e| e.to_string())?;

    match client.get(&url).send().await {
        Ok(resp) if resp.status().is_success() => Ok(config.ollama.base_url.clone()),
        Ok(resp) => Err(format!("{url} answered {}", resp.status())),
        Err(e) => Err(e.to_string()),
    }
}

fn python_available(python_bin: &str) -> CheckOutcome {
    let output = std::process::Command::new(python_bin)
        .arg("--version")
        .output();

    match output {
        Ok(out) if out.status.success() => {
            let version = String::from_utf8_lossy(&out.stdout);
            Ok(version.trim().to_string())
        }
        _ => Err(format!("'{python_bin}' did not run; is it installed?")),
    }
}

fn dir_usable(dir: &Path) -> CheckOutcome {
    if dir.is_dir() || std::fs::create_dir_all(dir).is_ok() {
        Ok(dir.display().to_string())
    } else {
        Err(format!("cannot create {}", dir.display()))
    }
}

fn dir_writable(dir: &Path) -> CheckOutcome {
    let probe = dir.join(".doctor-probe");
    let writable =
        std::fs::create_dir_all(dir).is_ok() && std::fs::write(&probe, b"ok").is_ok();
    let _ = std::fs::remove_file(&probe);
    if writable {
        Ok(dir.display().to_string())
    } else {
        Err(format!("cannot write to {}", dir.display()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn report_counts_and_renders_failures() {
        let mut report = DiagnosticReport::default();
        report.record("alpha", Ok("fine".to_string()));
        report.record("beta", Err("broken".to_string()));

        assert_eq!(report.failures(), 1);
        assert!(!report.all_passed());

        let text = report.to_string();
        assert!(text.contains("ok    alpha"));
        assert!(text.contains("FAIL  beta"));
        assert!(text.contains("1 of 2 checks failed"));
    }

    #[test]
    fn all_passing_report_says_so() {
        let mut report = DiagnosticReport::default();
        report.record("alpha", Ok("fine".to_string()));
        assert!(report.all_passed());
        assert!(report.to_string().contains("all 1 checks passed"));
    }

    #[test]
    fn directory_checks_work_on_a_tempdir() {
        let dir = tempfile::TempDir::new().unwrap();
        assert!(dir_usable(dir.path()).is_ok());
        assert!(dir_writable(dir.path()).is_ok());

        let nested = dir.path().join("made").join("by-doctor");
        assert!(dir_usable(&nested).is_ok());
        assert!(nested.is_dir());
    }

    #[test]
    fn occupied_port_fails_the_port_check() {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();

        let dir = tempfile::TempDir::new().unwrap();
        let config = DaemonConfig::new(
            Some(port),
            Some(dir.path().to_path_buf()),
            None,
            None,
            None,
        );
        assert!(port_free(&config).is_err());
        drop(listener);
    }
}
