use crate::error::{MonitorError, Result};
use std::path::{Path, PathBuf};
use tokio::fs::{File, OpenOptions};
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;
use vpnmon_core::ProbeOutcome;

/// Everything concurrent probes write to, behind one lock
struct SinkState {
    outcomes: Vec<ProbeOutcome>,
    available: usize,
    log: Option<File>,
}

/// Concurrently writable collector of probe outcomes
///
/// Every operation takes the same mutex for the duration of its write only,
/// so a caller never holds it while the probing utility runs. tokio's mutex
/// is fair: waiting writers are served in FIFO order.
pub struct ResultSink {
    state: Mutex<SinkState>,
    log_path: Option<PathBuf>,
}

impl ResultSink {
    /// Create a sink that appends raw probe output to `log_path`.
    /// The file is created if missing and never truncated.
    pub async fn open(log_path: impl AsRef<Path>) -> Result<Self> {
        let path = log_path.as_ref().to_path_buf();
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .await
            .map_err(|e| MonitorError::log_write_failed(path.display().to_string(), e.to_string()))?;

        Ok(Self {
            state: Mutex::new(SinkState {
                outcomes: Vec::new(),
                available: 0,
                log: Some(file),
            }),
            log_path: Some(path),
        })
    }

    /// Create a sink with no raw log; `log_raw` becomes a no-op
    pub fn in_memory() -> Self {
        Self {
            state: Mutex::new(SinkState {
                outcomes: Vec::new(),
                available: 0,
                log: None,
            }),
            log_path: None,
        }
    }

    pub fn log_path(&self) -> Option<&Path> {
        self.log_path.as_deref()
    }

    /// Record one finished probe
    pub async fn append(&self, outcome: ProbeOutcome) {
        self.state.lock().await.outcomes.push(outcome);
    }

    /// Append `text` to the raw log as one contiguous block
    pub async fn log_raw(&self, text: &str) -> Result<()> {
        let mut state = self.state.lock().await;
        let Some(file) = state.log.as_mut() else {
            return Ok(());
        };

        let written = match file.write_all(text.as_bytes()).await {
            Ok(()) => file.flush().await,
            Err(e) => Err(e),
        };
        written.map_err(|e| {
            MonitorError::log_write_failed(
                self.log_path
                    .as_deref()
                    .map(|p| p.display().to_string())
                    .unwrap_or_default(),
                e.to_string(),
            )
        })
    }

    pub async fn increment_available(&self) {
        self.state.lock().await.available += 1;
    }

    pub async fn available(&self) -> usize {
        self.state.lock().await.available
    }

    pub async fn len(&self) -> usize {
        self.state.lock().await.outcomes.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// Drain the accumulated outcomes, in completion order
    pub async fn take_outcomes(&self) -> Vec<ProbeOutcome> {
        std::mem::take(&mut self.state.lock().await.outcomes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use vpnmon_core::{Node, Verdict};

    #[tokio::test]
    async fn test_append_and_take() {
        let sink = ResultSink::in_memory();
        let node = Node::new(1, "relay1");

        sink.append(ProbeOutcome::new(&node, Verdict::Available, None))
            .await;
        sink.increment_available().await;

        assert_eq!(sink.len().await, 1);
        assert_eq!(sink.available().await, 1);

        let outcomes = sink.take_outcomes().await;
        assert_eq!(outcomes.len(), 1);
        assert!(sink.is_empty().await);
        // Counter survives draining
        assert_eq!(sink.available().await, 1);
    }

    #[tokio::test]
    async fn test_in_memory_log_is_noop() {
        let sink = ResultSink::in_memory();
        assert!(sink.log_raw("ignored").await.is_ok());
        assert!(sink.log_path().is_none());
    }

    #[tokio::test]
    async fn test_open_appends_without_truncating() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("vpnmon.log");
        std::fs::write(&path, "previous run\n").unwrap();

        let sink = ResultSink::open(&path).await.unwrap();
        sink.log_raw("this run\n").await.unwrap();

        let contents = std::fs::read_to_string(&path).unwrap();
        assert_eq!(contents, "previous run\nthis run\n");
    }

    #[tokio::test]
    async fn test_open_fails_for_missing_directory() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing").join("vpnmon.log");

        let result = ResultSink::open(&path).await;
        assert!(matches!(result, Err(MonitorError::LogWriteFailed { .. })));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_writers_do_not_interleave() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("vpnmon.log");
        let sink = Arc::new(ResultSink::open(&path).await.unwrap());

        let writers = 32u64;
        let lines_per_block = 40;
        let mut handles = Vec::new();

        for id in 0..writers {
            let sink = sink.clone();
            handles.push(tokio::spawn(async move {
                let block: String = (0..lines_per_block)
                    .map(|line| format!("writer {id} line {line}\n"))
                    .collect();
                sink.log_raw(&block).await.unwrap();
                sink.append(ProbeOutcome::new(
                    &Node::new(id, format!("relay{id}")),
                    Verdict::Unavailable,
                    None,
                ))
                .await;
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        assert_eq!(sink.len().await, writers as usize);

        let contents = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = contents.lines().collect();
        assert_eq!(lines.len(), writers as usize * lines_per_block);

        // Each block must appear as one contiguous run of its own lines
        for block in lines.chunks(lines_per_block) {
            let owner = block[0].split(' ').nth(1).unwrap();
            for (i, line) in block.iter().enumerate() {
                assert_eq!(*line, format!("writer {owner} line {i}"));
            }
        }
    }
}
