//! 扫描流水线集成测试
//!
//! 在活文档上跑完整的扫描：过滤、去重、并行翻译、一次性写回与还原。

#[allow(dead_code)]
mod common {
    include!("common/mod.rs");
}

use std::cell::RefCell;
use std::rc::Rc;
use std::time::Duration;

use common::{Fixtures, MockTranslator, TestEnvironment};
use dom_autotranslate::parsers::html::DocumentAdapter;
use dom_autotranslate::translation::{SweepOutcome, SweepReport, TranslationService};

fn report(outcome: SweepOutcome) -> SweepReport {
    match outcome {
        SweepOutcome::Applied(report) => report,
        other => panic!("期望 Applied，实际为 {:?}", other),
    }
}

#[tokio::test]
async fn test_hello_bonjour_scenario() {
    let env = TestEnvironment::new(Fixtures::SCENARIO, MockTranslator::french_and_german());

    let outcome = env.orchestrator.sweep("fr").await;
    let report = report(outcome);
    assert_eq!(report.scanned, 1, "禁止翻译的段落不应被扫描");
    assert_eq!(report.applied, 1);
    assert_eq!(env.texts_of("p"), vec!["Bonjour", "Debug: 42px"]);

    let outcome = env.orchestrator.sweep("en").await;
    assert_eq!(outcome, SweepOutcome::Restored { restored: 1 });
    assert_eq!(env.texts_of("p"), vec!["Hello", "Debug: 42px"]);
}

#[tokio::test]
async fn test_restore_is_idempotent_across_cycles() {
    let env = TestEnvironment::new(Fixtures::ARTICLE, MockTranslator::french_and_german());
    let pristine = env.document.to_html().unwrap();

    for target in ["fr", "de", "fr"] {
        env.orchestrator.sweep(target).await;
        assert_ne!(env.document.to_html().unwrap(), pristine, "{} 扫描后文档应变化", target);

        env.orchestrator.sweep("en").await;
        assert_eq!(
            env.document.to_html().unwrap(),
            pristine,
            "从 {} 切回基础语言后应与原始文档完全一致",
            target
        );
    }

    // 已经是原文时再还原不写任何节点
    let writes = env.counting.writes();
    assert_eq!(
        env.orchestrator.sweep("en").await,
        SweepOutcome::Restored { restored: 0 }
    );
    assert_eq!(env.counting.writes(), writes);
}

#[tokio::test]
async fn test_switching_between_targets_translates_from_original() {
    let translator = MockTranslator::french_and_german();
    let calls = translator.calls();
    let env = TestEnvironment::new(Fixtures::SCENARIO, translator);

    env.orchestrator.sweep("fr").await;
    env.orchestrator.sweep("de").await;

    assert_eq!(env.texts_of("p")[0], "Hallo");
    // 翻译请求总是使用原文，而不是上一次的译文
    assert!(!calls.borrow().iter().any(|text| text == "Bonjour"));
    let text_node = env.first("p").children.borrow()[0].clone();
    assert_eq!(env.registry.original(&text_node), Some("Hello".to_string()));
}

#[tokio::test(start_paused = true)]
async fn test_concurrent_sweep_is_dropped() {
    let translator = MockTranslator::french_and_german().with_latency(Duration::from_millis(100));
    let env = TestEnvironment::new(Fixtures::SCENARIO, translator);

    let (first, second) = tokio::join!(env.orchestrator.sweep("fr"), env.orchestrator.sweep("de"));

    assert!(matches!(first, SweepOutcome::Applied(_)));
    assert_eq!(second, SweepOutcome::Dropped, "进行中的扫描应丢弃新的请求");
    assert_eq!(env.counting.writes(), 1, "只应写回一次");
    assert_eq!(env.texts_of("p")[0], "Bonjour");
    assert_eq!(env.orchestrator.stats().dropped, 1);
    assert!(env.orchestrator.is_idle());
}

#[tokio::test]
async fn test_no_translate_excludes_deep_descendants() {
    let html = "<html><body>\
        <div data-no-translate><section><ul><li><span>Hello</span></li></ul></section></div>\
        <div translate=\"no\"><p>Welcome</p></div>\
        <p>Hello</p></body></html>";
    let env = TestEnvironment::new(html, MockTranslator::french_and_german());

    let report = report(env.orchestrator.sweep("fr").await);

    assert_eq!(report.scanned, 1);
    assert_eq!(env.texts_of("span"), vec!["Hello"]);
    assert_eq!(env.texts_of("p"), vec!["Welcome", "Bonjour"]);
}

#[tokio::test]
async fn test_failed_node_keeps_text_while_siblings_update() {
    let failures = Rc::new(RefCell::new(Vec::new()));
    let translator = MockTranslator::french_and_german().failing_on("Welcome");
    let env = TestEnvironment::with_service(Fixtures::ARTICLE, |cache| {
        let failures = failures.clone();
        TranslationService::new(Box::new(translator), cache, "en")
            .with_failure_observer(move |failure| failures.borrow_mut().push(failure.text.clone()))
    });

    let report = report(env.orchestrator.sweep("fr").await);

    assert_eq!(report.failed, 1);
    assert_eq!(env.texts_of("h1"), vec!["Welcome"], "失败的节点保留原文");
    assert_eq!(
        env.texts_of("p"),
        vec!["Bonjour", "  Bon matin  ", "Bonjour", "12px"]
    );
    assert_eq!(*failures.borrow(), vec!["Welcome".to_string()]);
    assert_eq!(env.service.stats().failures, 1);
}

#[tokio::test]
async fn test_same_language_performs_no_work() {
    let translator = MockTranslator::french_and_german();
    let calls = translator.calls();
    let env = TestEnvironment::with_service(Fixtures::ARTICLE, |cache| {
        TranslationService::new(Box::new(translator), cache, "en")
            .with_source_aliases(&["en-US", "en-GB"])
    });

    for lang in ["en", "EN", "en-US", "en_GB"] {
        assert_eq!(
            env.orchestrator.sweep(lang).await,
            SweepOutcome::Restored { restored: 0 },
            "{} 应视为基础语言",
            lang
        );
    }

    assert_eq!(env.counting.writes(), 0);
    assert!(calls.borrow().is_empty(), "不应调用翻译后端");
}

#[tokio::test]
async fn test_regional_variant_of_base_is_translated() {
    let html = "<html><body><p>网络连接</p></body></html>";
    let translator = MockTranslator::new().with("网络连接", "zh-TW", "網路連線");
    let calls = translator.calls();
    let env = TestEnvironment::with_service(html, |cache| {
        TranslationService::new(Box::new(translator), cache, "zh")
    });

    let report = report(env.orchestrator.sweep("zh-TW").await);
    assert_eq!(report.applied, 1);
    assert_eq!(env.texts_of("p"), vec!["網路連線"]);
    assert_eq!(*calls.borrow(), vec!["网络连接".to_string()]);

    assert_eq!(
        env.orchestrator.sweep("zh").await,
        SweepOutcome::Restored { restored: 1 }
    );
    assert_eq!(env.texts_of("p"), vec!["网络连接"]);
}

#[tokio::test]
async fn test_duplicate_texts_are_requested_once() {
    let translator = MockTranslator::french_and_german();
    let calls = translator.calls();
    let env = TestEnvironment::new(Fixtures::ARTICLE, translator);

    let report = report(env.orchestrator.sweep("fr").await);

    // h1 + 3 个段落；语言切换器、<pre> 与 "12px" 被过滤
    assert_eq!(report.scanned, 4);
    assert_eq!(report.requested, 3);
    assert_eq!(report.applied, 4);
    assert_eq!(
        calls.borrow().iter().filter(|text| *text == "Hello").count(),
        1,
        "重复文本只请求一次"
    );
    assert_eq!(env.texts_of("a"), vec!["English", "Français"]);
    assert_eq!(env.texts_of("code"), vec!["let x = 1;"]);
}

#[tokio::test]
async fn test_surrounding_whitespace_is_preserved() {
    let translator = MockTranslator::french_and_german();
    let calls = translator.calls();
    let env = TestEnvironment::new(Fixtures::ARTICLE, translator);

    env.orchestrator.sweep("fr").await;

    assert!(calls.borrow().contains(&"Good morning".to_string()), "请求文本应去掉首尾空白");
    assert_eq!(env.texts_of("p")[1], "  Bon matin  ");

    env.orchestrator.sweep("en").await;
    assert_eq!(env.texts_of("p")[1], "  Good morning  ");
}

#[tokio::test]
async fn test_second_visit_is_served_from_cache() {
    let translator = MockTranslator::french_and_german();
    let calls = translator.calls();
    let env = TestEnvironment::new(Fixtures::ARTICLE, translator);

    env.orchestrator.sweep("fr").await;
    env.orchestrator.sweep("en").await;
    env.orchestrator.sweep("fr").await;

    assert_eq!(calls.borrow().len(), 3, "第二次切到 fr 应全部命中缓存");
    assert_eq!(env.service.stats().cache_hits, 3);
    assert_eq!(env.texts_of("h1"), vec!["Bienvenue"]);
}

#[tokio::test]
async fn test_batch_prefetch_warms_cache() {
    let translator = MockTranslator::french_and_german().with_batch_support();
    let calls = translator.calls();
    let batch_calls = translator.batch_calls();
    let env = TestEnvironment::new(Fixtures::ARTICLE, translator);

    env.orchestrator.sweep("fr").await;

    assert_eq!(batch_calls.get(), 1);
    assert!(calls.borrow().is_empty(), "预取之后不需要逐条请求");
    assert_eq!(env.service.stats().prefetched, 3);
    assert_eq!(env.texts_of("h1"), vec!["Bienvenue"]);
}

#[tokio::test(start_paused = true)]
async fn test_node_removed_mid_sweep_is_skipped() {
    let translator = MockTranslator::french_and_german().with_latency(Duration::from_millis(100));
    let env = TestEnvironment::new(Fixtures::ARTICLE, translator);
    let heading = env.first("h1");

    let (outcome, _) = tokio::join!(env.orchestrator.sweep("fr"), async {
        tokio::time::sleep(Duration::from_millis(10)).await;
        env.document.remove(&heading);
    });

    let report = report(outcome);
    assert_eq!(report.stale, 1);
    assert_eq!(report.applied, 3);
    assert!(env.texts_of("h1").is_empty());
}

#[tokio::test]
async fn test_host_rewrite_becomes_new_original() {
    let env = TestEnvironment::new(Fixtures::SCENARIO, MockTranslator::french_and_german());
    env.orchestrator.sweep("fr").await;

    // 宿主应用在译文状态下重写了文本
    let text_node = env.first("p").children.borrow()[0].clone();
    env.document.set_text(&text_node, "Welcome");

    env.orchestrator.sweep("fr").await;
    assert_eq!(env.texts_of("p")[0], "Bienvenue");

    env.orchestrator.sweep("en").await;
    assert_eq!(env.texts_of("p")[0], "Welcome", "还原到宿主重写后的文本");
}

#[tokio::test]
async fn test_nothing_to_translate() {
    let html = "<html><body><p>   </p><p>#fff</p><p>https://example.com</p></body></html>";
    let translator = MockTranslator::french_and_german();
    let calls = translator.calls();
    let env = TestEnvironment::new(html, translator);

    assert_eq!(
        env.orchestrator.sweep("fr").await,
        SweepOutcome::NothingToTranslate
    );
    assert!(calls.borrow().is_empty());
    assert!(env.orchestrator.is_idle());
}
