//! Scripted collaborators for pipeline and API tests.

use super::VideoAnalyzer;
use crate::acquisition::{AcquisitionStrategy, MediaFetcher, MediaMetadata};
use crate::analysis::{AnalysisService, FileState, RemoteFile};
use crate::config::{Config, RetryConfig};
use crate::error::{Error, Result};
use crate::storage::StorageAdapter;
use crate::types::{Event, Task, TaskId};
use async_trait::async_trait;
use std::collections::HashMap;
use std::path::Path;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::Semaphore;

/// Well-formed model answer
pub(crate) const GOOD_ANSWER: &str = "```json\n{\"topic\": \"Speedrun\", \"summary\": \"A very fast run.\", \"interest_bucket\": \"Gaming\"}\n```";

/// What a scripted strategy does
#[derive(Clone)]
pub(crate) enum Fetch {
    /// Download writes this file into the workspace
    Writes(&'static str),
    /// Probe fails with this text
    Fails(&'static str),
    /// Probe never returns
    Hangs,
}

/// Fetcher whose behaviour is scripted per strategy name
pub(crate) struct ScriptedFetcher {
    scripts: HashMap<String, Fetch>,
    calls: Mutex<Vec<String>>,
}

impl ScriptedFetcher {
    pub(crate) fn new(scripts: &[(&str, Fetch)]) -> Arc<Self> {
        Arc::new(Self {
            scripts: scripts
                .iter()
                .map(|(name, script)| (name.to_string(), script.clone()))
                .collect(),
            calls: Mutex::new(Vec::new()),
        })
    }

    /// Fetcher whose first strategy always succeeds
    pub(crate) fn succeeding() -> Arc<Self> {
        Self::new(&[
            ("A", Fetch::Writes("clip.mp4")),
            ("B", Fetch::Writes("clip.mp4")),
        ])
    }

    pub(crate) fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl MediaFetcher for ScriptedFetcher {
    async fn probe(&self, _locator: &str, strategy: &AcquisitionStrategy) -> Result<MediaMetadata> {
        self.calls
            .lock()
            .unwrap()
            .push(format!("probe:{}", strategy.name));
        match self.scripts.get(&strategy.name) {
            Some(Fetch::Fails(msg)) => Err(Error::Acquisition(msg.to_string())),
            Some(Fetch::Hangs) => {
                tokio::time::sleep(Duration::from_secs(3600)).await;
                Err(Error::Acquisition("woke up".into()))
            }
            Some(Fetch::Writes(_)) => Ok(MediaMetadata {
                title: Some("Clip".into()),
                availability: Some("public".into()),
            }),
            None => Err(Error::Acquisition("unscripted strategy".into())),
        }
    }

    async fn download(
        &self,
        _locator: &str,
        strategy: &AcquisitionStrategy,
        workspace: &Path,
    ) -> Result<()> {
        self.calls
            .lock()
            .unwrap()
            .push(format!("download:{}", strategy.name));
        if let Some(Fetch::Writes(name)) = self.scripts.get(&strategy.name) {
            tokio::fs::write(workspace.join(name), b"fake media bytes").await?;
        }
        Ok(())
    }

    async fn probe_title(&self, _locator: &str) -> Result<Option<String>> {
        Ok(Some("Clip".into()))
    }

    fn name(&self) -> &'static str {
        "scripted"
    }
}

/// Analysis service with a fixed answer
///
/// With a gate, `upload` waits for a permit, which lets a test observe the
/// pipeline while analysis is in flight.
pub(crate) struct ScriptedService {
    answer: String,
    upload_error: Option<String>,
    gate: Option<Arc<Semaphore>>,
    pub(crate) uploads: AtomicU32,
    pub(crate) deletes: AtomicU32,
}

impl ScriptedService {
    pub(crate) fn answering(answer: &str) -> Arc<Self> {
        Arc::new(Self {
            answer: answer.to_string(),
            upload_error: None,
            gate: None,
            uploads: AtomicU32::new(0),
            deletes: AtomicU32::new(0),
        })
    }

    pub(crate) fn failing_upload(reason: &str) -> Arc<Self> {
        Arc::new(Self {
            answer: GOOD_ANSWER.to_string(),
            upload_error: Some(reason.to_string()),
            gate: None,
            uploads: AtomicU32::new(0),
            deletes: AtomicU32::new(0),
        })
    }

    /// Service whose uploads block until `gate` gets a permit
    pub(crate) fn gated(gate: Arc<Semaphore>) -> Arc<Self> {
        Arc::new(Self {
            answer: GOOD_ANSWER.to_string(),
            upload_error: None,
            gate: Some(gate),
            uploads: AtomicU32::new(0),
            deletes: AtomicU32::new(0),
        })
    }
}

#[async_trait]
impl AnalysisService for ScriptedService {
    async fn upload(&self, _path: &Path, mime_type: &str) -> Result<RemoteFile> {
        if let Some(gate) = &self.gate {
            gate.acquire().await.unwrap().forget();
        }
        self.uploads.fetch_add(1, Ordering::SeqCst);
        if let Some(reason) = &self.upload_error {
            return Err(Error::Other(reason.clone()));
        }
        Ok(RemoteFile {
            name: "files/scripted".into(),
            uri: "https://files/scripted".into(),
            mime_type: mime_type.into(),
            state: FileState::Active,
        })
    }

    async fn get_file(&self, name: &str) -> Result<RemoteFile> {
        Ok(RemoteFile {
            name: name.into(),
            uri: "https://files/scripted".into(),
            mime_type: "video/mp4".into(),
            state: FileState::Active,
        })
    }

    async fn generate(&self, _prompt: &str, _file: &RemoteFile, _timeout: Duration) -> Result<String> {
        Ok(self.answer.clone())
    }

    async fn delete_file(&self, _name: &str) -> Result<()> {
        self.deletes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn name(&self) -> &'static str {
        "scripted"
    }
}

pub(crate) fn strategy(name: &str) -> AcquisitionStrategy {
    AcquisitionStrategy {
        name: name.to_string(),
        client_identity: name.to_lowercase(),
        request_headers: Default::default(),
        retry: RetryConfig::fixed(0, Duration::from_millis(1)),
        quality_selector: "worst".into(),
        age_bypass: false,
        player_skip: Vec::new(),
        skip_transports: Vec::new(),
    }
}

/// Config rooted in `dir` with strategies named after `names`
pub(crate) fn test_config(dir: &Path, names: &[&str]) -> Config {
    let mut config = Config::default();
    config.work_dir = dir.join("work");
    config.api.api_key = Some("test-key".into());
    config.analysis.api_key = "gemini-key".into();
    config.analysis.poll_interval = Duration::from_millis(5);
    config.acquisition.attempt_timeout = Duration::from_millis(200);
    config.acquisition.strategies = names.iter().map(|n| strategy(n)).collect();
    config
}

pub(crate) async fn build(
    config: Config,
    fetcher: Arc<dyn MediaFetcher>,
    service: Arc<dyn AnalysisService>,
    storage: StorageAdapter,
) -> VideoAnalyzer {
    VideoAnalyzer::from_parts(config, fetcher, service, storage)
        .await
        .unwrap()
}

/// Analyzer with a succeeding fetcher, a good answer and no staging
pub(crate) async fn default_analyzer(dir: &Path) -> VideoAnalyzer {
    build(
        test_config(dir, &["A", "B"]),
        ScriptedFetcher::succeeding(),
        ScriptedService::answering(GOOD_ANSWER),
        StorageAdapter::disabled(),
    )
    .await
}

/// Poll until task `id` is terminal
pub(crate) async fn wait_terminal(analyzer: &VideoAnalyzer, id: TaskId) -> Task {
    tokio::time::timeout(Duration::from_secs(10), async {
        loop {
            let task = analyzer.task(id).await.unwrap();
            if task.state.is_terminal() {
                return task;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .expect("task did not reach a terminal state")
}

/// Next event matching `pred`
pub(crate) async fn wait_event<F>(rx: &mut tokio::sync::broadcast::Receiver<Event>, pred: F) -> Event
where
    F: Fn(&Event) -> bool,
{
    tokio::time::timeout(Duration::from_secs(10), async {
        loop {
            let event = rx.recv().await.unwrap();
            if pred(&event) {
                return event;
            }
        }
    })
    .await
    .expect("event not received")
}
