//! Common utilities and helper functions

use std::time::{Duration, Instant};

/// Timing utilities
pub struct Timer {
    start: Instant,
}

impl Timer {
    /// Start a new timer
    pub fn start() -> Self {
        Self {
            start: Instant::now(),
        }
    }

    /// Get elapsed time
    pub fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }

    /// Stop timer and return elapsed time
    pub fn stop(self) -> Duration {
        self.elapsed()
    }
}

/// Render a command line for logs with credential values masked
pub fn redact_args(program: &str, args: &[String]) -> String {
    let mut parts = vec![program.to_string()];
    let mut mask_next = false;
    for arg in args {
        if mask_next {
            let user = arg.split_once(':').map(|(u, _)| u).unwrap_or(arg);
            parts.push(format!("{}:***", user));
            mask_next = false;
            continue;
        }
        if let Some((flag, value)) = arg.split_once('=') {
            if is_creds_flag(flag) {
                let user = value.split_once(':').map(|(u, _)| u).unwrap_or(value);
                parts.push(format!("{}={}:***", flag, user));
                continue;
            }
        }
        mask_next = is_creds_flag(arg);
        parts.push(arg.clone());
    }
    parts.join(" ")
}

fn is_creds_flag(flag: &str) -> bool {
    matches!(flag, "--creds" | "--src-creds" | "--dest-creds")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strings(args: &[&str]) -> Vec<String> {
        args.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_redact_args() {
        let args = strings(&[
            "copy",
            "--src-creds",
            "user:secret",
            "--dest-creds=admin:hunter2",
            "docker://a",
            "docker://b",
        ]);
        let rendered = redact_args("skopeo", &args);
        assert_eq!(
            rendered,
            "skopeo copy --src-creds user:*** --dest-creds=admin:*** docker://a docker://b"
        );
        assert!(!rendered.contains("secret"));
        assert!(!rendered.contains("hunter2"));
    }

    #[test]
    fn test_timer() {
        let timer = Timer::start();
        std::thread::sleep(Duration::from_millis(10));
        assert!(timer.elapsed() >= Duration::from_millis(10));
    }
}
