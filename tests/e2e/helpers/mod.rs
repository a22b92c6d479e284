use anyhow::Result;
use async_trait::async_trait;
use narrator_backend::controllers::narration::NarrationController;
use narrator_backend::domain::narration::{Mp3ConcatArchiver, NarrationService, Provider};
use narrator_backend::domain::tts::VoiceParameters;
use narrator_backend::infrastructure::http::create_router;
use narrator_backend::infrastructure::repositories::TtsRepository;
use serde_json::Value;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use test_context::AsyncTestContext;
use tokio::net::TcpListener;
use tokio::sync::watch;

pub mod api_client;
pub mod assertions;

use api_client::TestClient;

pub const MAX_TEXT_LENGTH: usize = 100_000;

/// Marker that makes the fake provider reject a chunk
pub const FAIL_MARKER: &str = "FAILME";

/// Scripted Polly stand-in: echoes the chunk text as its "audio", fails on
/// chunks containing `FAIL_MARKER`, and waits on a gate before answering.
pub struct FakeTts {
    gate: watch::Sender<bool>,
    pub calls: AtomicUsize,
}

impl FakeTts {
    fn new() -> Self {
        let (gate, _) = watch::channel(true);
        Self {
            gate,
            calls: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl TtsRepository for FakeTts {
    fn provider(&self) -> Provider {
        Provider::Polly
    }

    async fn generate(&self, text: &str, _voice: &VoiceParameters) -> Result<Vec<u8>, String> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        let mut gate = self.gate.subscribe();
        if gate.wait_for(|open| *open).await.is_err() {
            return Err("gate dropped".to_string());
        }

        if text.contains(FAIL_MARKER) {
            return Err("synthetic provider failure".to_string());
        }
        Ok(format!("<{}>", text).into_bytes())
    }
}

pub struct TestContext {
    pub client: TestClient,
    pub tts: Arc<FakeTts>,
}

impl AsyncTestContext for TestContext {
    fn setup() -> impl std::future::Future<Output = Self> + Send {
        async {
            let tts = Arc::new(FakeTts::new());

            // Only Polly is configured; OpenAI stays unavailable
            let narration_service = Arc::new(NarrationService::new(
                vec![tts.clone() as Arc<dyn TtsRepository>],
                Arc::new(Mp3ConcatArchiver),
                MAX_TEXT_LENGTH,
                Duration::from_secs(600),
            ));
            let app = create_router(Arc::new(NarrationController::new(narration_service)));

            let listener = TcpListener::bind("127.0.0.1:0")
                .await
                .expect("Failed to bind listener");
            let addr = listener.local_addr().expect("Failed to get local addr");
            let base_url = format!("http://{}", addr);

            tokio::spawn(async move {
                axum::serve(listener, app).await.unwrap();
            });

            Self {
                client: TestClient::new(&base_url),
                tts,
            }
        }
    }

    fn teardown(self) -> impl std::future::Future<Output = ()> + Send {
        async move {
            // Let any held generation finish so spawned drivers wind down
            self.open_gate();
        }
    }
}

impl TestContext {
    /// Hold every generation until `open_gate` is called
    pub fn close_gate(&self) {
        self.tts.gate.send_replace(false);
    }

    pub fn open_gate(&self) {
        self.tts.gate.send_replace(true);
    }

    pub fn generation_calls(&self) -> usize {
        self.tts.calls.load(Ordering::SeqCst)
    }

    /// Create a run and return its snapshot
    pub async fn create_run(&self, body: &Value) -> Result<Value> {
        let response = self.client.post("/api/runs", body).await?;
        response.assert_status(hyper::StatusCode::CREATED);
        Ok(response.body.clone().expect("Missing run snapshot"))
    }

    /// Poll a run until its state matches. Long enough to cover one Polly
    /// inter-batch delay.
    pub async fn wait_for_state(&self, run_id: &str, state: &str) -> Result<Value> {
        for _ in 0..1000 {
            let snapshot = self.get_run(run_id).await?;
            if snapshot["state"] == state {
                return Ok(snapshot);
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        anyhow::bail!("run {} never reached state {}", run_id, state)
    }

    /// Poll until the scheduler has started `count` generations
    pub async fn wait_for_calls(&self, count: usize) -> Result<()> {
        for _ in 0..500 {
            if self.generation_calls() >= count {
                return Ok(());
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        anyhow::bail!("only {} of {} generations started", self.generation_calls(), count)
    }

    pub async fn get_run(&self, run_id: &str) -> Result<Value> {
        let response = self.client.get(&format!("/api/runs/{}", run_id)).await?;
        response.assert_status(hyper::StatusCode::OK);
        Ok(response.body.clone().expect("Missing run snapshot"))
    }
}

/// One 2990-character sentence starting with `lead`; two never fit in a
/// single Polly chunk, so each paragraph becomes its own chunk
pub fn paragraph(lead: &str) -> String {
    format!("{}{}.", lead, "a".repeat(2989 - lead.len()))
}

/// Text that chunks into exactly `count` Polly chunks
pub fn text_with_chunks(count: usize) -> String {
    (0..count)
        .map(|i| paragraph(&format!("P{:02}", i)))
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn run_id(snapshot: &Value) -> String {
    snapshot["id"].as_str().expect("Missing run id").to_string()
}
