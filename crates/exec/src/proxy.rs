use autobrowse_console::BrowserConsole;
use autobrowse_core::types::CodeBlock;
use autobrowse_core::Result;
use std::path::PathBuf;
use tracing::{info, warn};

use crate::lang::{classify, infer_lang, LangClass};
use crate::runner::CommandRunner;

/// Aggregate outcome of executing a sequence of code blocks.
#[derive(Debug, Clone)]
pub struct ExecReport {
    /// Exit status of the last block that ran: 0 when every block succeeded,
    /// otherwise the failing block's status.
    pub exit_code: i32,
    /// Concatenated logs of every block executed, including the failing one.
    pub logs: String,
}

impl ExecReport {
    pub fn succeeded(&self) -> bool {
        self.exit_code == 0
    }

    /// The execution-result line the code-generation agent sees.
    pub fn summary(&self) -> String {
        let status = if self.succeeded() {
            "execution succeeded"
        } else {
            "execution failed"
        };
        format!("exitcode: {} ({})\nCode output: {}", self.exit_code, status, self.logs)
    }
}

/// Routes code blocks to the right executor: browser scripts over the console
/// websocket, shell and python locally. Blocks run strictly in input order;
/// the first unsuccessful block stops the batch.
pub struct CodeExecutionProxy {
    console: Box<dyn BrowserConsole>,
    runner: Box<dyn CommandRunner>,
    work_dir: PathBuf,
    /// Runtime-image metadata reported by a local executor; sticky for the
    /// lifetime of this proxy.
    runtime_image: Option<String>,
}

/// `# filename: foo.py` on the first line pins where a python block lands.
fn filename_directive(code: &str) -> Option<&str> {
    let first_line = code.lines().next()?;
    first_line
        .strip_prefix("# filename:")
        .map(str::trim)
        .filter(|name| !name.is_empty())
}

impl CodeExecutionProxy {
    pub fn new(
        console: Box<dyn BrowserConsole>,
        runner: Box<dyn CommandRunner>,
        work_dir: PathBuf,
    ) -> Self {
        Self {
            console,
            runner,
            work_dir,
            runtime_image: None,
        }
    }

    pub fn runtime_image(&self) -> Option<&str> {
        self.runtime_image.as_deref()
    }

    /// Execute blocks sequentially, short-circuiting at the first failure.
    /// Local executor breakage (spawn failure, timeout) is folded into the
    /// report as a failing block; only console connection loss is fatal.
    pub async fn execute_blocks(&mut self, blocks: &[CodeBlock]) -> Result<ExecReport> {
        let mut exit_code = 0;
        let mut logs_all = String::new();

        for (i, block) in blocks.iter().enumerate() {
            let lang = match &block.language {
                Some(l) => l.clone(),
                None => infer_lang(&block.code).to_string(),
            };
            info!(block = i, lang = %lang, "Executing code block");

            let (code, logs) = match classify(&lang) {
                LangClass::Script => {
                    let result = self.console.execute_code(&block.code).await?;
                    (if result.success { 0 } else { 1 }, result.payload)
                }
                LangClass::Shell => self.run_local(&block.code, "sh", None).await,
                LangClass::Python => {
                    let filename = filename_directive(&block.code);
                    self.run_local(&block.code, "python", filename).await
                }
                LangClass::Unknown => {
                    warn!(block = i, lang = %lang, "Unknown language, not executing");
                    (1, format!("unknown language {}", lang))
                }
            };

            logs_all.push('\n');
            logs_all.push_str(&logs);
            exit_code = code;

            if exit_code != 0 {
                warn!(block = i, exit_code, "Code block failed, skipping the rest");
                break;
            }
        }

        Ok(ExecReport {
            exit_code,
            logs: logs_all,
        })
    }

    async fn run_local(&mut self, code: &str, language: &str, filename: Option<&str>) -> (i32, String) {
        match self.runner.run(code, language, &self.work_dir, filename).await {
            Ok(out) => {
                if let Some(image) = out.image {
                    info!(image = %image, "Executor reported runtime image");
                    self.runtime_image = Some(image);
                }
                (out.exit_code, format!("{}{}", out.stdout, out.stderr))
            }
            Err(e) => (1, e.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runner::RunOutput;
    use async_trait::async_trait;
    use autobrowse_console::ConsoleResult;
    use autobrowse_core::Error;
    use std::path::Path;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    /// Console whose nth executeCode call fails; counts invocations.
    struct ScriptedConsole {
        calls: Arc<AtomicUsize>,
        fail_on: Option<usize>,
    }

    #[async_trait]
    impl BrowserConsole for ScriptedConsole {
        async fn execute_code(&mut self, code: &str) -> Result<ConsoleResult> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail_on == Some(n) {
                Ok(ConsoleResult {
                    success: false,
                    payload: format!("{{\"success\":false,\"error\":\"failed: {}\"}}", code),
                })
            } else {
                Ok(ConsoleResult {
                    success: true,
                    payload: format!("{{\"success\":true,\"result\":\"ran: {}\"}}", code),
                })
            }
        }

        async fn fetch_markup(&mut self) -> Result<String> {
            Err(Error::Retrieval("not a page console".to_string()))
        }
    }

    struct NoopRunner;

    #[async_trait]
    impl CommandRunner for NoopRunner {
        async fn run(
            &self,
            code: &str,
            _language: &str,
            _work_dir: &Path,
            _filename: Option<&str>,
        ) -> Result<RunOutput> {
            Ok(RunOutput {
                exit_code: 0,
                stdout: format!("local: {}", code),
                ..Default::default()
            })
        }
    }

    fn proxy(fail_on: Option<usize>) -> (CodeExecutionProxy, Arc<AtomicUsize>) {
        let calls = Arc::new(AtomicUsize::new(0));
        let console = ScriptedConsole {
            calls: calls.clone(),
            fail_on,
        };
        (
            CodeExecutionProxy::new(
                Box::new(console),
                Box::new(NoopRunner),
                std::env::temp_dir().join("autobrowse-proxy-test"),
            ),
            calls,
        )
    }

    fn js(code: &str) -> CodeBlock {
        CodeBlock::new(Some("javascript"), code)
    }

    #[tokio::test]
    async fn test_all_blocks_succeed() {
        let (mut proxy, calls) = proxy(None);
        let report = proxy
            .execute_blocks(&[js("a()"), js("b()")])
            .await
            .unwrap();
        assert!(report.succeeded());
        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert!(report.logs.contains("ran: a()"));
        assert!(report.logs.contains("ran: b()"));
    }

    #[tokio::test]
    async fn test_first_failure_short_circuits() {
        // A ok, B fails, C must never run
        let (mut proxy, calls) = proxy(Some(1));
        let report = proxy
            .execute_blocks(&[js("a()"), js("b()"), js("c()")])
            .await
            .unwrap();
        assert!(!report.succeeded());
        assert_eq!(report.exit_code, 1);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert!(report.logs.contains("ran: a()"));
        assert!(report.logs.contains("failed: b()"));
        assert!(!report.logs.contains("c()"));
    }

    #[tokio::test]
    async fn test_unknown_language_is_synthetic_failure() {
        let (mut proxy, calls) = proxy(None);
        let report = proxy
            .execute_blocks(&[
                CodeBlock::new(Some("ruby"), "puts 1"),
                js("never()"),
            ])
            .await
            .unwrap();
        assert_eq!(report.exit_code, 1);
        assert!(report.logs.contains("unknown language ruby"));
        // no executor invoked for the unknown block, and the batch stopped
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_shell_blocks_route_locally() {
        let (mut proxy, calls) = proxy(None);
        let report = proxy
            .execute_blocks(&[CodeBlock::new(Some("sh"), "ls -la")])
            .await
            .unwrap();
        assert!(report.succeeded());
        assert!(report.logs.contains("local: ls -la"));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_inferred_language_routes_to_console() {
        let (mut proxy, calls) = proxy(None);
        let report = proxy
            .execute_blocks(&[CodeBlock::new(None, "await page.click('#go');")])
            .await
            .unwrap();
        assert!(report.succeeded());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_filename_directive() {
        assert_eq!(
            filename_directive("# filename: job.py\nprint('x')"),
            Some("job.py")
        );
        assert_eq!(filename_directive("print('x')"), None);
        assert_eq!(filename_directive("# filename:\nprint('x')"), None);
    }

    #[test]
    fn test_summary_formats() {
        let ok = ExecReport {
            exit_code: 0,
            logs: "\nfine".to_string(),
        };
        assert!(ok.summary().starts_with("exitcode: 0 (execution succeeded)"));
        let bad = ExecReport {
            exit_code: 2,
            logs: "\nboom".to_string(),
        };
        assert!(bad.summary().starts_with("exitcode: 2 (execution failed)"));
    }
}
