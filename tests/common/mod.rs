#![allow(dead_code)]

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use image::{Rgba, RgbaImage};
use serde_json::json;

use educopy_lib::agent_engine::engine::AgentOptions;
use educopy_lib::config::{keys, ConfigStore, MemoryConfigStore};
use educopy_lib::errors::{EduCopyError, EduCopyResult};
use educopy_lib::executor::host::{FieldKind, NoticeKind, PageHost, PageUi, TextField};
use educopy_lib::llm::provider::InferenceService;
use educopy_lib::llm::types::{CallConfig, MessageContent};
use educopy_lib::perception::traits::Rasterizer;
use educopy_lib::perception::types::{RasterImage, ViewportRect};
use educopy_lib::protocol::channel::Notifier;
use educopy_lib::protocol::delivery::DeliveryConfig;
use educopy_lib::protocol::local::{PageEnvironment, PageTarget};
use educopy_lib::Runtime;

#[derive(Default)]
pub struct FakeHost {
    pub clipboard: Mutex<Vec<String>>,
    pub focused: Mutex<Option<TextField>>,
}

impl FakeHost {
    pub fn focus(&self, field: TextField) {
        *self.focused.lock().unwrap() = Some(field);
    }

    pub fn field_value(&self) -> Option<String> {
        self.focused.lock().unwrap().as_ref().map(|f| f.value.clone())
    }

    pub fn clipboard(&self) -> Vec<String> {
        self.clipboard.lock().unwrap().clone()
    }
}

#[async_trait]
impl PageHost for FakeHost {
    async fn write_clipboard(&self, text: &str) -> EduCopyResult<()> {
        self.clipboard.lock().unwrap().push(text.to_string());
        Ok(())
    }

    fn focused_field(&self) -> Option<TextField> {
        self.focused.lock().unwrap().clone()
    }

    fn commit_field(&self, field: TextField) -> EduCopyResult<()> {
        *self.focused.lock().unwrap() = Some(field);
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum UiEvent {
    Notice(NoticeKind, String),
    Countdown(u32),
    CountdownHidden,
    OverlayShown,
    Selection(ViewportRect),
    OverlayHidden,
    Preview(String),
}

#[derive(Default)]
pub struct FakeUi {
    pub events: Mutex<Vec<UiEvent>>,
}

impl FakeUi {
    pub fn events(&self) -> Vec<UiEvent> {
        self.events.lock().unwrap().clone()
    }

    pub fn notices(&self, kind: NoticeKind) -> Vec<String> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                UiEvent::Notice(k, msg) if k == kind => Some(msg),
                _ => None,
            })
            .collect()
    }

    pub fn has(&self, event: &UiEvent) -> bool {
        self.events().contains(event)
    }

    fn push(&self, event: UiEvent) {
        self.events.lock().unwrap().push(event);
    }
}

impl PageUi for FakeUi {
    fn show_notice(&self, kind: NoticeKind, message: &str) {
        self.push(UiEvent::Notice(kind, message.to_string()));
    }
    fn show_countdown(&self, remaining_secs: u32) {
        self.push(UiEvent::Countdown(remaining_secs));
    }
    fn hide_countdown(&self) {
        self.push(UiEvent::CountdownHidden);
    }
    fn show_capture_overlay(&self) {
        self.push(UiEvent::OverlayShown);
    }
    fn update_capture_selection(&self, rect: ViewportRect) {
        self.push(UiEvent::Selection(rect));
    }
    fn hide_capture_overlay(&self) {
        self.push(UiEvent::OverlayHidden);
    }
    fn show_preview(&self, image_data_url: &str) {
        self.push(UiEvent::Preview(image_data_url.to_string()));
    }
}

/// Renders a fixed-size page, or fails when `fail` is set.
pub struct FakeRasterizer {
    pub width: u32,
    pub height: u32,
    pub fail: bool,
    pub calls: AtomicU32,
}

impl FakeRasterizer {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            fail: false,
            calls: AtomicU32::new(0),
        }
    }

    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::new(1, 1)
        }
    }

    pub fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Rasterizer for FakeRasterizer {
    async fn capture(&self) -> EduCopyResult<RasterImage> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err(EduCopyError::CaptureFailure("canvas tainted".into()));
        }
        let pixels = RgbaImage::from_fn(self.width, self.height, |x, y| {
            Rgba([(x % 256) as u8, (y % 256) as u8, 90, 255])
        });
        Ok(RasterImage::page(pixels))
    }
}

#[derive(Debug, Clone)]
pub struct InferenceCall {
    pub model: String,
    pub endpoint: String,
    pub prompt: MessageContent,
}

/// Returns a fixed reply (or error) and records every call.
pub struct ScriptedInference {
    reply: Mutex<Result<String, String>>,
    pub calls: Mutex<Vec<InferenceCall>>,
}

impl ScriptedInference {
    pub fn replying(text: &str) -> Self {
        Self {
            reply: Mutex::new(Ok(text.to_string())),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn failing(message: &str) -> Self {
        Self {
            reply: Mutex::new(Err(message.to_string())),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> Vec<InferenceCall> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl InferenceService for ScriptedInference {
    async fn request(&self, call: &CallConfig, prompt: MessageContent) -> EduCopyResult<String> {
        self.calls.lock().unwrap().push(InferenceCall {
            model: call.model.clone(),
            endpoint: call.endpoint.clone(),
            prompt,
        });
        self.reply
            .lock()
            .unwrap()
            .clone()
            .map_err(EduCopyError::InferenceFailure)
    }
}

#[derive(Default)]
pub struct RecordingNotifier {
    pub shown: Mutex<Vec<(String, String)>>,
}

impl RecordingNotifier {
    pub fn shown(&self) -> Vec<(String, String)> {
        self.shown.lock().unwrap().clone()
    }
}

impl Notifier for RecordingNotifier {
    fn notify(&self, title: &str, message: &str) {
        self.shown.lock().unwrap().push((title.to_string(), message.to_string()));
    }
}

pub const ENDPOINT: &str = "https://llm.example.com/v1/chat/completions";

pub fn configured_store() -> MemoryConfigStore {
    MemoryConfigStore::with_values([
        (keys::API_KEY, json!("sk-test")),
        (keys::API_ENDPOINT, json!(ENDPOINT)),
        (keys::MODEL, json!("gpt-4o-mini")),
        (keys::OCR_MODEL, json!("gpt-4o")),
        (keys::PROMPT_TEMPLATE, json!("Translate to English: {text}")),
    ])
}

/// Controller runtime plus one page with fake host capabilities.
pub struct Harness {
    pub config: Arc<MemoryConfigStore>,
    pub inference: Arc<ScriptedInference>,
    pub notifier: Arc<RecordingNotifier>,
    pub host: Arc<FakeHost>,
    pub ui: Arc<FakeUi>,
    pub rasterizer: Arc<FakeRasterizer>,
    pub runtime: Runtime,
    pub page: Arc<PageTarget>,
}

impl Harness {
    pub fn new(config: MemoryConfigStore, inference: ScriptedInference, rasterizer: FakeRasterizer) -> Self {
        let config = Arc::new(config);
        let inference = Arc::new(inference);
        let notifier = Arc::new(RecordingNotifier::default());
        let host = Arc::new(FakeHost::default());
        let ui = Arc::new(FakeUi::default());
        let rasterizer = Arc::new(rasterizer);

        let runtime = educopy_lib::start(
            config.clone(),
            inference.clone(),
            notifier.clone(),
            DeliveryConfig::default(),
        );
        let env = PageEnvironment {
            host: host.clone(),
            ui: ui.clone(),
            rasterizer: rasterizer.clone(),
            config: config.clone() as Arc<dyn ConfigStore>,
        };
        let page = PageTarget::new("tab-1", env, AgentOptions::default(), runtime.controller_tx.clone());

        Self {
            config,
            inference,
            notifier,
            host,
            ui,
            rasterizer,
            runtime,
            page,
        }
    }

    pub fn replying(text: &str) -> Self {
        Self::new(configured_store(), ScriptedInference::replying(text), FakeRasterizer::new(800, 600))
    }
}

/// Poll `check` until it holds, advancing (possibly paused) time in 50ms steps.
pub async fn eventually<F: Fn() -> bool>(what: &str, check: F) {
    for _ in 0..400 {
        if check() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
    panic!("timed out waiting for {what}");
}

pub fn input_field(value: &str, caret: usize) -> TextField {
    TextField::new(FieldKind::Input, value, caret)
}
