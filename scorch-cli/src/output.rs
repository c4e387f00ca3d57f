//! Where command results go
//!
//! Handlers never write to stdout themselves. Everything a command reports
//! passes through [`Output`], which lets tests capture it.

use crate::error::CliResult;

pub trait Output: Send + Sync {
    fn print(&self, msg: &str) -> CliResult<()>;

    /// Failure that does not abort the command, e.g. one keeper run
    fn error(&self, msg: &str) -> CliResult<()>;

    /// `status`, `balance` and `releasable` reports
    fn print_json(&self, report: &serde_json::Value) -> CliResult<()> {
        self.print(&serde_json::to_string_pretty(report)?)
    }

    /// Confirmation of a persisted state change
    fn success(&self, msg: &str) -> CliResult<()> {
        self.print(&format!("✅ {}", msg))
    }
}

/// stdout for results, stderr for failures
pub struct ConsoleOutput;

impl Output for ConsoleOutput {
    fn print(&self, msg: &str) -> CliResult<()> {
        println!("{}", msg);
        Ok(())
    }

    fn error(&self, msg: &str) -> CliResult<()> {
        eprintln!("❌ {}", msg);
        Ok(())
    }
}

#[cfg(test)]
pub mod testing {
    use super::*;
    use std::sync::Mutex;

    /// Records printed lines and errors separately
    #[derive(Default)]
    pub struct MockOutput {
        printed: Mutex<Vec<String>>,
        errors: Mutex<Vec<String>>,
    }

    impl MockOutput {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn printed(&self) -> Vec<String> {
            self.printed.lock().unwrap().clone()
        }

        pub fn errors(&self) -> Vec<String> {
            self.errors.lock().unwrap().clone()
        }

        pub fn assert_printed(&self, needle: &str) {
            let printed = self.printed();
            assert!(
                printed.iter().any(|line| line.contains(needle)),
                "no line contains {:?}: {:?}",
                needle,
                printed
            );
        }
    }

    impl Output for MockOutput {
        fn print(&self, msg: &str) -> CliResult<()> {
            self.printed.lock().unwrap().push(msg.to_string());
            Ok(())
        }

        fn error(&self, msg: &str) -> CliResult<()> {
            self.errors.lock().unwrap().push(msg.to_string());
            Ok(())
        }
    }

    #[test]
    fn test_reports_are_pretty_json() {
        let output = MockOutput::new();
        output
            .print_json(&serde_json::json!({ "releasable": "1" }))
            .unwrap();
        output.success("Claimed").unwrap();
        output.error("run failed").unwrap();

        assert_eq!(output.printed()[0], "{\n  \"releasable\": \"1\"\n}");
        output.assert_printed("✅ Claimed");
        assert_eq!(output.errors(), vec!["run failed".to_string()]);
    }
}
