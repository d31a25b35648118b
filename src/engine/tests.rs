use super::*;

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use tempfile::TempDir;

use crate::api::CountRequest;
use crate::channel::Transport;
use crate::error::ChannelError;
use crate::input::{CountInput, CountPayload, FileUpload};

/// Scripted counting service.
#[derive(Default)]
struct FakeApi {
    delays: HashMap<String, Duration>,
    failures: HashMap<String, ClientError>,
    tokens: HashMap<String, u64>,
    catalog: Option<ModelCatalog>,
    calls: Mutex<Vec<String>>,
}

impl FakeApi {
    fn delay(mut self, model: &str, ms: u64) -> Self {
        self.delays
            .insert(model.to_string(), Duration::from_millis(ms));
        self
    }

    fn fail(mut self, model: &str, error: ClientError) -> Self {
        self.failures.insert(model.to_string(), error);
        self
    }

    fn tokens(mut self, model: &str, count: u64) -> Self {
        self.tokens.insert(model.to_string(), count);
        self
    }

    fn with_catalog(mut self, catalog: ModelCatalog) -> Self {
        self.catalog = Some(catalog);
        self
    }

    fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl CountApi for FakeApi {
    async fn fetch_models(&self) -> Result<ModelCatalog, ClientError> {
        self.catalog
            .clone()
            .ok_or_else(|| ClientError::Transport("connection refused".into()))
    }

    async fn count(&self, request: CountRequest<'_>) -> Result<CountResult, ClientError> {
        self.calls.lock().unwrap().push(request.model.to_string());
        let mut delay = self.delays.get(request.model).copied().unwrap_or_default();
        let token_count = match request.payload {
            CountPayload::Text(text) => {
                if text.starts_with("slow") {
                    delay += Duration::from_secs(5);
                }
                text.split_whitespace().count() as u64
            }
            CountPayload::File(file) => file.bytes.len() as u64,
        };
        tokio::time::sleep(delay).await;
        if let Some(error) = self.failures.get(request.model) {
            return Err(error.clone());
        }
        let token_count = self
            .tokens
            .get(request.model)
            .copied()
            .unwrap_or(token_count);
        Ok(CountResult {
            model: request.model.to_string(),
            token_count,
            cost_usd: None,
            context_window: None,
            context_usage_percent: None,
        })
    }

    async fn add_model(
        &self,
        name: &str,
        _category: CatalogCategory,
    ) -> Result<ModelCatalog, ClientError> {
        self.calls.lock().unwrap().push(format!("add:{name}"));
        Ok(ModelCatalog {
            official: vec!["gpt-4".into()],
            custom: vec![name.to_string()],
            version: 2,
        })
    }

    async fn pricing(&self, model: &str) -> Result<PricingInfo, ClientError> {
        let message = format!("unknown model {model}");
        Err(ClientError::api(404, Some(message), None))
    }
}

struct RefusingConnector;

#[async_trait]
impl Connector for RefusingConnector {
    async fn connect(&self, _url: &str) -> Result<Box<dyn Transport>, ChannelError> {
        Err(ChannelError::Connect("connection refused".into()))
    }
}

async fn engine_at(dir: &TempDir, api: Arc<FakeApi>) -> Engine {
    let store = PersistedStore::open(dir.path().join("state.json"));
    let settings = ChannelSettings {
        url: "ws://localhost:7860/api/ws".into(),
        reconnect_delay: Duration::from_millis(3000),
        max_reconnect_attempts: 5,
    };
    Engine::start(api, Arc::new(RefusingConnector), store, settings)
        .await
        .unwrap()
}

fn too_large() -> ClientError {
    ClientError::api(413, Some("file too large".into()), None)
}

#[tokio::test(start_paused = true)]
async fn test_empty_selection_makes_no_calls() {
    let dir = TempDir::new().unwrap();
    let api = Arc::new(FakeApi::default());
    let engine = engine_at(&dir, api.clone()).await;

    let err = engine
        .count_tokens(&CountInput::text("hello"))
        .await
        .unwrap_err();

    assert_eq!(err, ClientError::from(ValidationError::NoModelSelected));
    assert!(api.calls().is_empty());
    let view = engine.count_view();
    assert_eq!(view.error, Some(err));
    assert!(!view.loading);
}

#[tokio::test(start_paused = true)]
async fn test_blank_text_rejected_before_sending() {
    let dir = TempDir::new().unwrap();
    let api = Arc::new(FakeApi::default());
    let engine = engine_at(&dir, api.clone()).await;
    engine.set_selected_models(["gpt-4"]);

    let err = engine
        .count_tokens(&CountInput::text("   \n"))
        .await
        .unwrap_err();
    assert_eq!(err, ClientError::from(ValidationError::EmptyText));

    let err = engine
        .count_tokens(&CountInput::file(None))
        .await
        .unwrap_err();
    assert_eq!(err, ClientError::from(ValidationError::NoFile));
    assert!(api.calls().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_hello_world_counts_every_model() {
    let dir = TempDir::new().unwrap();
    let api = Arc::new(FakeApi::default().tokens("gpt-4", 2).tokens("gpt-3.5", 3));
    let engine = engine_at(&dir, api.clone()).await;
    engine.set_selected_models(["gpt-4", "gpt-3.5"]);

    let results = engine
        .count_tokens(&CountInput::text("hello world"))
        .await
        .unwrap();

    let counts: Vec<_> = results
        .iter()
        .map(|r| (r.model.as_str(), r.token_count))
        .collect();
    assert_eq!(counts, [("gpt-4", 2), ("gpt-3.5", 3)]);
    assert_eq!(engine.count_view().results, results);
    assert_eq!(engine.count_view().error, None);

    let history = engine.history();
    assert_eq!(history.len(), 2);
    assert_eq!(history[0].model, "gpt-3.5");
    assert_eq!(history[0].token_count, 3);
    assert_eq!(history[1].model, "gpt-4");
    assert_eq!(history[1].token_count, 2);
    assert_eq!(history[0].input, "hello world");
}

#[tokio::test(start_paused = true)]
async fn test_results_follow_selection_order() {
    let dir = TempDir::new().unwrap();
    let api = Arc::new(
        FakeApi::default()
            .delay("a", 300)
            .delay("b", 200)
            .delay("c", 100),
    );
    let engine = engine_at(&dir, api.clone()).await;
    engine.set_selected_models(["a", "b", "c"]);

    let results = engine
        .count_tokens(&CountInput::text("one two three"))
        .await
        .unwrap();

    let models: Vec<_> = results.iter().map(|r| r.model.as_str()).collect();
    assert_eq!(models, ["a", "b", "c"]);
}

#[tokio::test(start_paused = true)]
async fn test_one_failure_discards_all_results() {
    let dir = TempDir::new().unwrap();
    let crash = ClientError::api(500, Some("tokenizer crashed".into()), None);
    let api = Arc::new(FakeApi::default().fail("b", crash));
    let engine = engine_at(&dir, api.clone()).await;

    engine.set_selected_models(["a"]);
    let first = CountInput::text("first");
    engine.count_tokens(&first).await.unwrap();
    assert_eq!(engine.history().len(), 1);

    engine.set_selected_models(["a", "b", "c"]);
    let err = engine
        .count_tokens(&CountInput::text("second"))
        .await
        .unwrap_err();

    assert_eq!(err.to_string(), "tokenizer crashed");
    // every request still went out
    assert_eq!(api.calls().len(), 4);
    let view = engine.count_view();
    assert!(view.results.is_empty());
    assert_eq!(view.error, Some(err));
    assert!(!view.loading);
    assert_eq!(engine.history().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_first_failure_in_selection_order_wins() {
    let dir = TempDir::new().unwrap();
    let api = Arc::new(
        FakeApi::default()
            .delay("a", 500)
            .fail("a", ClientError::Transport("timed out".into()))
            .fail("b", too_large()),
    );
    let engine = engine_at(&dir, api).await;
    engine.set_selected_models(["a", "b"]);

    let err = engine
        .count_tokens(&CountInput::text("x"))
        .await
        .unwrap_err();
    assert_eq!(err, ClientError::Transport("timed out".into()));
}

#[tokio::test(start_paused = true)]
async fn test_oversized_file_leaves_history_untouched() {
    let dir = TempDir::new().unwrap();
    let api = Arc::new(FakeApi::default().fail("gpt-4", too_large()));
    let engine = engine_at(&dir, api).await;
    engine.set_selected_models(["gpt-4"]);

    let file = FileUpload::new("a.pdf", vec![0; 16]);
    let err = engine
        .count_tokens(&CountInput::file(Some(file)))
        .await
        .unwrap_err();

    assert_eq!(err.to_string(), "file too large");
    assert!(engine.count_view().results.is_empty());
    assert!(engine.history().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_loading_flag_while_in_flight() {
    let dir = TempDir::new().unwrap();
    let api = Arc::new(FakeApi::default().delay("gpt-4", 1000));
    let engine = engine_at(&dir, api).await;
    engine.set_selected_models(["gpt-4"]);

    let background = engine.clone();
    let input = CountInput::text("hi");
    let handle = tokio::spawn(async move { background.count_tokens(&input).await });
    tokio::time::sleep(Duration::from_millis(10)).await;
    assert!(engine.count_view().loading);

    handle.await.unwrap().unwrap();
    assert!(!engine.count_view().loading);
}

#[tokio::test(start_paused = true)]
async fn test_newer_count_supersedes_older() {
    let dir = TempDir::new().unwrap();
    let api = Arc::new(FakeApi::default());
    let engine = engine_at(&dir, api).await;
    engine.set_selected_models(["gpt-4"]);

    let slow_input = CountInput::text("slow one two three");
    let fast_input = CountInput::text("fast");
    let later = async {
        tokio::time::sleep(Duration::from_millis(10)).await;
        engine.count_tokens(&fast_input).await
    };
    let (slow, fast) = tokio::join!(engine.count_tokens(&slow_input), later);

    assert_eq!(slow.unwrap_err(), ClientError::Superseded);
    assert_eq!(fast.unwrap()[0].token_count, 1);
    let view = engine.count_view();
    assert_eq!(view.results[0].token_count, 1);
    assert!(!view.loading);
    let history = engine.history();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].input, "fast");
}

#[tokio::test(start_paused = true)]
async fn test_rejected_count_does_not_stick_to_older_results() {
    let dir = TempDir::new().unwrap();
    let api = Arc::new(FakeApi::default().delay("gpt-4", 1000));
    let engine = engine_at(&dir, api.clone()).await;
    engine.set_selected_models(["gpt-4"]);

    let hello = CountInput::text("hello world");
    let blank = CountInput::text("   ");
    let later = async {
        tokio::time::sleep(Duration::from_millis(10)).await;
        engine.count_tokens(&blank).await
    };
    let (first, rejected) = tokio::join!(engine.count_tokens(&hello), later);

    assert_eq!(
        rejected.unwrap_err(),
        ClientError::from(ValidationError::EmptyText)
    );
    assert_eq!(first.unwrap().len(), 1);
    let view = engine.count_view();
    assert_eq!(view.results.len(), 1);
    assert!(!view.loading);
    assert_eq!(view.error, None);
    assert_eq!(api.calls(), ["gpt-4"]);
}

#[tokio::test(start_paused = true)]
async fn test_state_rehydrates_on_start() {
    let dir = TempDir::new().unwrap();
    let api = Arc::new(FakeApi::default());
    {
        let engine = engine_at(&dir, api.clone()).await;
        engine.set_category(Category::HuggingFace);
        engine.set_language(Language::En);
        engine.set_selected_models(["microsoft/phi-4"]);
        engine
            .count_tokens(&CountInput::text("persist me"))
            .await
            .unwrap();
        engine.flush().await;
    }

    let engine = engine_at(&dir, api).await;
    assert_eq!(engine.category(), Category::HuggingFace);
    assert_eq!(engine.language(), Language::En);
    assert!(engine.selection().is_empty());
    let history = engine.history();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].model, "microsoft/phi-4");
    assert!(engine.count_view().results.is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_clear_history_is_persisted() {
    let dir = TempDir::new().unwrap();
    let api = Arc::new(FakeApi::default());
    {
        let engine = engine_at(&dir, api.clone()).await;
        engine.set_selected_models(["gpt-4"]);
        engine.count_tokens(&CountInput::text("x")).await.unwrap();
        engine.clear_history();
        engine.flush().await;
    }
    let engine = engine_at(&dir, api).await;
    assert!(engine.history().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_channel_snapshot_updates_catalog() {
    let dir = TempDir::new().unwrap();
    let engine = engine_at(&dir, Arc::new(FakeApi::default())).await;
    let mut events = engine.subscribe();

    engine.shared.on_snapshot(ModelCatalog {
        official: vec!["gpt-4".into(), "gpt-4o".into()],
        custom: vec!["microsoft/phi-4".into()],
        version: 3,
    });

    assert_eq!(
        events.recv().await.unwrap(),
        EngineEvent::CatalogChanged { version: 3 }
    );
    assert_eq!(engine.current_models(), ["gpt-4", "gpt-4o"]);
    assert_eq!(
        engine.get_current_models(Category::HuggingFace),
        ["microsoft/phi-4"]
    );
}

#[tokio::test(start_paused = true)]
async fn test_connection_changes_are_mirrored() {
    let dir = TempDir::new().unwrap();
    let engine = engine_at(&dir, Arc::new(FakeApi::default())).await;
    let mut events = engine.subscribe();

    engine.connect();
    tokio::time::sleep(Duration::from_millis(1)).await;

    let expected = ConnectionState {
        connected: false,
        reconnect_attempts: 1,
    };
    assert_eq!(engine.connection(), expected);
    assert!(!engine.is_connected());
    assert_eq!(
        events.recv().await.unwrap(),
        EngineEvent::ConnectionChanged(expected)
    );
    engine.disconnect();
}

#[tokio::test(start_paused = true)]
async fn test_category_switch_clears_selection() {
    let dir = TempDir::new().unwrap();
    let engine = engine_at(&dir, Arc::new(FakeApi::default())).await;
    engine.apply_snapshot(ModelCatalog {
        official: vec!["gpt-4".into(), "gpt-4o".into(), "claude-3".into()],
        custom: vec!["Qwen/Qwen2-7B".into()],
        version: 1,
    });

    assert_eq!(engine.select_all_filtered("GPT"), 2);
    assert_eq!(engine.selection().models(), ["gpt-4", "gpt-4o"]);

    engine.set_category(Category::HuggingFace);
    assert!(engine.selection().is_empty());
    assert_eq!(engine.select_all_filtered(""), 1);
    assert_eq!(engine.selection().models(), ["Qwen/Qwen2-7B"]);
}

#[tokio::test(start_paused = true)]
async fn test_refresh_catalog() {
    let dir = TempDir::new().unwrap();
    let engine = engine_at(&dir, Arc::new(FakeApi::default())).await;
    assert!(matches!(
        engine.refresh_catalog().await,
        Err(ClientError::Transport(_))
    ));
    assert_eq!(engine.count_view().error, None);

    let catalog = ModelCatalog {
        official: vec!["gpt-4".into()],
        custom: vec![],
        version: 1,
    };
    let api = Arc::new(FakeApi::default().with_catalog(catalog.clone()));
    let engine = engine_at(&dir, api).await;
    assert_eq!(engine.refresh_catalog().await.unwrap(), catalog);
}

#[tokio::test(start_paused = true)]
async fn test_register_model_requires_two_chars() {
    let dir = TempDir::new().unwrap();
    let api = Arc::new(FakeApi::default());
    let engine = engine_at(&dir, api.clone()).await;

    let err = engine
        .register_model("  a ", CatalogCategory::Custom)
        .await
        .unwrap_err();
    assert_eq!(err, ClientError::from(ValidationError::InvalidModelName));
    assert!(api.calls().is_empty());

    let catalog = engine
        .register_model(" microsoft/phi-4 ", CatalogCategory::Custom)
        .await
        .unwrap();
    assert_eq!(catalog.custom, ["microsoft/phi-4"]);
    assert_eq!(api.calls(), ["add:microsoft/phi-4"]);
}
