//! HTTP 翻译后端集成测试
//!
//! 用 axum 在本地端口启动一个模拟翻译服务，验证请求格式、批量接口、错误响应体和重试。

#[allow(dead_code)]
mod common {
    include!("common/mod.rs");
}

use std::cell::RefCell;
use std::rc::Rc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use axum::{Json, Router};
use futures::future::LocalBoxFuture;
use serde_json::{json, Value};

use common::{Fixtures, TestEnvironment};
use dom_autotranslate::translation::{
    AutoTranslateConfig, HttpTranslator, Scheduler, SweepOutcome, TranslationError,
    TranslationService, Translator,
};

/// 模拟服务的请求计数
#[derive(Default)]
struct ServerState {
    single: AtomicUsize,
    batch: AtomicUsize,
    flaky: AtomicUsize,
}

fn lookup(text: &str, target: &str) -> String {
    match (text, target) {
        ("Hello", "fr") => "Bonjour".to_string(),
        ("Welcome", "fr") => "Bienvenue".to_string(),
        ("Good morning", "fr") => "Bon matin".to_string(),
        _ => format!("[{}] {}", target, text),
    }
}

async fn translate(State(state): State<Arc<ServerState>>, Json(body): Json<Value>) -> Response {
    state.single.fetch_add(1, Ordering::SeqCst);

    let text = body["text"].as_str().unwrap_or_default();
    let target = body["targetLanguage"].as_str().unwrap_or_default();

    if text == "boom" {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({"error": "Bad Request", "message": "unsupported text"})),
        )
            .into_response();
    }

    Json(json!({
        "translatedText": lookup(text, target),
        "sourceLanguage": body["sourceLanguage"],
        "targetLanguage": target,
        "originalText": text,
    }))
    .into_response()
}

async fn translate_batch(
    State(state): State<Arc<ServerState>>,
    Json(body): Json<Value>,
) -> Response {
    state.batch.fetch_add(1, Ordering::SeqCst);

    let target = body["targetLanguage"].as_str().unwrap_or_default();
    let translations: Vec<Value> = body["texts"]
        .as_array()
        .map(|texts| texts.iter().filter_map(Value::as_str).collect::<Vec<_>>())
        .unwrap_or_default()
        .into_iter()
        .map(|text| {
            json!({
                "originalText": text,
                "translatedText": lookup(text, target),
                "targetLanguage": target,
            })
        })
        .collect();

    Json(json!({ "translations": translations })).into_response()
}

/// 倒序返回结果，并夹带一条不属于请求的条目
async fn translate_batch_reversed(
    State(state): State<Arc<ServerState>>,
    Json(body): Json<Value>,
) -> Response {
    state.batch.fetch_add(1, Ordering::SeqCst);

    let target = body["targetLanguage"].as_str().unwrap_or_default();
    let mut translations: Vec<Value> = body["texts"]
        .as_array()
        .map(|texts| texts.iter().filter_map(Value::as_str).collect::<Vec<_>>())
        .unwrap_or_default()
        .into_iter()
        .map(|text| json!({ "originalText": text, "translatedText": lookup(text, target) }))
        .collect();
    translations.reverse();
    translations.push(json!({ "originalText": "Unrelated", "translatedText": "Sans rapport" }));

    Json(json!({ "translations": translations })).into_response()
}

/// 前两次返回 503，之后正常
async fn flaky(State(state): State<Arc<ServerState>>, Json(body): Json<Value>) -> Response {
    let attempt = state.flaky.fetch_add(1, Ordering::SeqCst);
    if attempt < 2 {
        return (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(json!({"error": "Service Unavailable"})),
        )
            .into_response();
    }

    let text = body["text"].as_str().unwrap_or_default();
    Json(json!({ "translatedText": lookup(text, "fr") })).into_response()
}

async fn unavailable(State(state): State<Arc<ServerState>>) -> Response {
    state.flaky.fetch_add(1, Ordering::SeqCst);
    (StatusCode::SERVICE_UNAVAILABLE, "maintenance").into_response()
}

/// 启动模拟服务，返回基础地址与计数
async fn start_server() -> (String, Arc<ServerState>) {
    let state = Arc::new(ServerState::default());
    let app = Router::new()
        .route("/api/translate", post(translate))
        .route("/api/translate/batch", post(translate_batch))
        .route("/reversed/api/translate", post(translate))
        .route("/reversed/api/translate/batch", post(translate_batch_reversed))
        .route("/flaky/api/translate", post(flaky))
        .route("/down/api/translate", post(unavailable))
        .with_state(state.clone());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("绑定本地端口");
    let addr = listener.local_addr().expect("本地地址");
    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("模拟服务运行");
    });

    (format!("http://{}", addr), state)
}

/// 只记录退避时长、不真正等待的调度器
#[derive(Default)]
struct RecordingScheduler {
    delays: Rc<RefCell<Vec<Duration>>>,
}

impl Scheduler for RecordingScheduler {
    fn delay(&self, duration: Duration) -> LocalBoxFuture<'static, ()> {
        self.delays.borrow_mut().push(duration);
        Box::pin(futures::future::ready(()))
    }
}

fn config_for(api_url: String) -> AutoTranslateConfig {
    AutoTranslateConfig {
        api_url,
        retry_base_delay_ms: 5,
        ..AutoTranslateConfig::default()
    }
}

#[tokio::test]
async fn test_single_translation() {
    let (base, state) = start_server().await;
    let translator =
        HttpTranslator::new(&config_for(format!("{}/api/translate", base))).expect("创建客户端");

    let result = translator.translate("Hello", "en", "fr").await;

    assert_eq!(result.expect("翻译成功"), "Bonjour");
    assert_eq!(state.single.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_batch_translation_keeps_order() {
    let (base, state) = start_server().await;
    let translator =
        HttpTranslator::new(&config_for(format!("{}/api/translate", base))).expect("创建客户端");
    let texts = vec![
        "Welcome".to_string(),
        "Hello".to_string(),
        "Thanks".to_string(),
    ];

    let result = translator.translate_batch(&texts, "en", "fr").await;

    assert_eq!(
        result.expect("批量翻译成功"),
        vec!["Bienvenue", "Bonjour", "[fr] Thanks"]
    );
    assert_eq!(state.batch.load(Ordering::SeqCst), 1);
    assert_eq!(state.single.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_reordered_batch_results_are_matched_by_original() {
    let (base, state) = start_server().await;
    let translator = HttpTranslator::new(&config_for(format!("{}/reversed/api/translate", base)))
        .expect("创建客户端");
    let texts = vec![
        "Welcome".to_string(),
        "Hello".to_string(),
        "Thanks".to_string(),
    ];

    let result = translator.translate_batch(&texts, "en", "fr").await;

    assert_eq!(
        result.expect("批量翻译成功"),
        vec!["Bienvenue", "Bonjour", "[fr] Thanks"]
    );
    assert_eq!(state.batch.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_sweep_with_reordered_batch_writes_matching_translations() {
    let (base, state) = start_server().await;
    let config = config_for(format!("{}/reversed/api/translate", base));
    let env = TestEnvironment::with_service(Fixtures::ARTICLE, |_| {
        TranslationService::from_config(&config).expect("创建服务")
    });

    let outcome = env.orchestrator.sweep("fr").await;

    assert!(matches!(outcome, SweepOutcome::Applied(_)));
    assert_eq!(state.single.load(Ordering::SeqCst), 0, "预取结果全部对上原文");
    assert_eq!(env.texts_of("h1"), vec!["Bienvenue"]);
    assert_eq!(
        env.texts_of("p"),
        vec!["Bonjour", "  Bon matin  ", "Bonjour", "12px"]
    );
    assert!(!env.service.cache().contains("Unrelated", "fr"));
}

#[tokio::test]
async fn test_error_body_is_reported_without_retry() {
    let (base, state) = start_server().await;
    let translator =
        HttpTranslator::new(&config_for(format!("{}/api/translate", base))).expect("创建客户端");

    let error = translator
        .translate("boom", "en", "fr")
        .await
        .expect_err("应返回错误");

    match error {
        TranslationError::HttpStatus { status, message } => {
            assert_eq!(status, 400);
            assert!(message.contains("Bad Request: unsupported text"), "{}", message);
        }
        other => panic!("期望 HttpStatus，实际为 {:?}", other),
    }
    assert_eq!(state.single.load(Ordering::SeqCst), 1, "4xx 不应重试");
}

#[tokio::test]
async fn test_server_errors_are_retried() {
    let (base, state) = start_server().await;
    let translator = HttpTranslator::new(&config_for(format!("{}/flaky/api/translate", base)))
        .expect("创建客户端");

    let result = translator.translate("Hello", "en", "fr").await;

    assert_eq!(result.expect("重试后成功"), "Bonjour");
    assert_eq!(state.flaky.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn test_retry_backoff_waits_on_scheduler() {
    let (base, state) = start_server().await;
    let scheduler = RecordingScheduler::default();
    let delays = scheduler.delays.clone();
    let translator = HttpTranslator::new(&config_for(format!("{}/flaky/api/translate", base)))
        .expect("创建客户端")
        .with_scheduler(scheduler);

    let result = translator.translate("Hello", "en", "fr").await;

    assert_eq!(result.expect("重试后成功"), "Bonjour");
    assert_eq!(state.flaky.load(Ordering::SeqCst), 3);
    // 指数退避：5ms, 10ms
    assert_eq!(
        *delays.borrow(),
        vec![Duration::from_millis(5), Duration::from_millis(10)]
    );
}

#[tokio::test]
async fn test_retries_are_bounded() {
    let (base, state) = start_server().await;
    let translator = HttpTranslator::new(&config_for(format!("{}/down/api/translate", base)))
        .expect("创建客户端");

    let error = translator
        .translate("Hello", "en", "fr")
        .await
        .expect_err("应返回错误");

    assert!(matches!(error, TranslationError::HttpStatus { status: 503, .. }));
    // 首次请求 + 默认 2 次重试
    assert_eq!(state.flaky.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn test_unreachable_backend_falls_back_to_original() {
    // 端口 9 (discard) 上没有 HTTP 服务
    let config = AutoTranslateConfig {
        max_retry_attempts: 0,
        ..config_for("http://127.0.0.1:9/api/translate".to_string())
    };
    let env = TestEnvironment::with_service(Fixtures::SCENARIO, |_| {
        TranslationService::from_config(&config).expect("创建服务")
    });

    let outcome = env.orchestrator.sweep("fr").await;

    match outcome {
        SweepOutcome::Applied(report) => assert_eq!(report.failed, 1),
        other => panic!("期望 Applied，实际为 {:?}", other),
    }
    assert_eq!(env.texts_of("p")[0], "Hello", "后端不可达时保留原文");
}

#[tokio::test]
async fn test_sweep_over_http_prefetches_in_one_batch() {
    let (base, state) = start_server().await;
    let config = config_for(format!("{}/api/translate", base));
    let env = TestEnvironment::with_service(Fixtures::ARTICLE, |_| {
        TranslationService::from_config(&config).expect("创建服务")
    });

    let outcome = env.orchestrator.sweep("fr").await;

    assert!(matches!(outcome, SweepOutcome::Applied(_)));
    assert_eq!(state.batch.load(Ordering::SeqCst), 1);
    assert_eq!(state.single.load(Ordering::SeqCst), 0, "预取之后全部命中缓存");
    assert_eq!(env.texts_of("h1"), vec!["Bienvenue"]);
    assert_eq!(
        env.texts_of("p"),
        vec!["Bonjour", "  Bon matin  ", "Bonjour", "12px"]
    );
}
