//! End-to-end workflow tests over mocked model and search backends.

mod common;

use std::sync::Arc;

use tokio::sync::mpsc;

use researchd::config::Settings;
use researchd::providers::{Provider, SearchEngine};
use researchd::templates::TemplateName;
use researchd::workflow::{
    Phase, ProgressEvent, ResearchConfig, Workflow, WorkflowState,
};

use common::{derived_url, full_settings, single_search_settings, MockCapabilities};

fn config(provider: Provider) -> ResearchConfig {
    ResearchConfig {
        provider,
        model: None,
        template: TemplateName::BulletSummary,
        search_budget: 6,
    }
}

fn workflow(
    settings: Settings,
    caps: Arc<MockCapabilities>,
    provider: Provider,
    query: &str,
) -> Workflow {
    let state = WorkflowState::new(query.to_string(), config(provider), Vec::new());
    Workflow::new(Arc::new(settings), caps, state)
}

#[tokio::test]
async fn test_single_search_run_produces_cited_report() {
    let caps = MockCapabilities::scripted([
        "1. rust async runtimes\n2. tokio vs async-std",
        "- Tokio dominates [1]\n- async-std is quieter [2]",
    ]);
    let wf = workflow(
        single_search_settings(),
        caps,
        Provider::OpenAi,
        "compare rust async runtimes",
    );

    let state = wf.run().await.unwrap();

    assert_eq!(state.phase, Phase::Synthesized);
    assert_eq!(state.plan, "1. rust async runtimes\n2. tokio vs async-std");

    let report = state.report.unwrap();
    assert!(report.content.contains("Tokio dominates"));
    assert!(!report.dual_search);
    assert_eq!(report.winning_provider, None);

    // One hit per planned query, all from tavily, ids dense from 1.
    assert_eq!(state.sources.len(), 2);
    assert_eq!(state.sources[0].id, 1);
    assert_eq!(state.sources[1].id, 2);
    assert!(state.sources.iter().all(|s| s.provider == "tavily"));
    assert_eq!(
        state.sources[0].url,
        derived_url(SearchEngine::Tavily, "rust async runtimes")
    );
    assert_eq!(report.citations.len(), 2);
}

#[tokio::test]
async fn test_dual_search_judge_picks_serpapi() {
    let caps = MockCapabilities::scripted([
        "1. ev charging standards",
        "REPORT ALPHA",
        "REPORT BETA",
        "The better report is \"SERPAPI\".",
    ]);
    let wf = workflow(full_settings(), caps, Provider::OpenAi, "ev charging");

    let state = wf.run().await.unwrap();

    // One query against two engines, distinct derived urls, interleaved.
    assert_eq!(state.sources.len(), 2);
    let providers: Vec<&str> = state.sources.iter().map(|s| s.provider.as_str()).collect();
    assert_eq!(providers, vec!["tavily", "serpapi"]);

    let report = state.report.unwrap();
    assert!(report.dual_search);
    assert_eq!(report.winning_provider.as_deref(), Some("serpapi"));
    assert_eq!(Some(report.content.as_str()), state.serp_report.as_deref());
    assert!(report.citations.iter().all(|s| s.provider == "serpapi"));
    assert_eq!(report.citations.len(), 1);
}

#[tokio::test]
async fn test_dual_search_ambiguous_judge_defaults_to_tavily() {
    let caps = MockCapabilities::scripted([
        "1. solid state batteries",
        "REPORT ALPHA",
        "REPORT BETA",
        "Both reports are quite good.",
    ]);
    let wf = workflow(full_settings(), caps, Provider::OpenAi, "batteries");

    let state = wf.run().await.unwrap();
    let report = state.report.unwrap();
    assert_eq!(report.winning_provider.as_deref(), Some("tavily"));
    assert_eq!(Some(report.content.as_str()), state.tavily_report.as_deref());
    assert!(report.citations.iter().all(|s| s.provider == "tavily"));
}

#[tokio::test(start_paused = true)]
async fn test_gemini_timeouts_degrade_instead_of_failing() {
    // A model that never answers: the plan falls back to a canned 3-line
    // plan, both synthesis sides time out into the canned report message,
    // and the stalled judge defaults to tavily.
    let caps = Arc::new(MockCapabilities {
        model: Arc::new(common::StallingModel),
        tavily: Arc::new(common::DerivedSearch::new(SearchEngine::Tavily)),
        serp: Arc::new(common::DerivedSearch::new(SearchEngine::SerpApi)),
    });
    let settings = Settings {
        gemini_timeout_secs: 1,
        gemini_request_timeout_secs: 5,
        ..full_settings()
    };
    let wf = workflow(settings, caps, Provider::Gemini, "quantum networking");

    let state = wf.run().await.unwrap();

    assert_eq!(state.phase, Phase::Synthesized);
    assert_eq!(
        state.plan,
        "1. quantum networking\n2. quantum networking overview\n3. quantum networking details"
    );
    let report = state.report.unwrap();
    assert!(report.content.contains("timed out"));
    assert_eq!(report.winning_provider.as_deref(), Some("tavily"));
}

#[tokio::test(start_paused = true)]
async fn test_single_mode_timeout_yields_canned_report_with_citations() {
    // Gemini with only Tavily configured: single-mode synthesis. A stalled
    // model degrades to the canned report while the gathered sources still
    // come back as citations.
    let caps = Arc::new(MockCapabilities {
        model: Arc::new(common::StallingModel),
        tavily: Arc::new(common::DerivedSearch::new(SearchEngine::Tavily)),
        serp: Arc::new(common::DerivedSearch::new(SearchEngine::SerpApi)),
    });
    let settings = Settings {
        gemini_api_key: Some("gm-test".to_string()),
        gemini_timeout_secs: 1,
        ..single_search_settings()
    };
    let wf = workflow(settings, caps, Provider::Gemini, "fusion startups");

    let state = wf.run().await.unwrap();

    assert_eq!(state.phase, Phase::Synthesized);
    let report = state.report.unwrap();
    assert_eq!(
        report.content,
        "Report generation timed out. Please try with fewer search queries or use OpenAI."
    );
    assert!(!report.dual_search);
    assert_eq!(report.winning_provider, None);

    // The fallback plan yields three queries, one tavily hit each.
    assert_eq!(report.citations.len(), 3);
    assert!(report.citations.iter().all(|s| s.provider == "tavily"));
}

#[tokio::test]
async fn test_gemini_search_budget_is_clamped() {
    let plan = "1. a\n2. b\n3. c\n4. d\n5. e\n6. f";
    let caps = MockCapabilities::scripted([plan, "SIDE ONE", "SIDE TWO", "TAVILY"]);
    let wf = workflow(full_settings(), caps, Provider::Gemini, "wide topic");

    let state = wf.run().await.unwrap();

    // Budget of 6 clamps to the gemini cap of 4; dual search doubles it.
    assert_eq!(state.search_results.len(), 8);
    assert_eq!(
        state
            .sources
            .iter()
            .filter(|s| s.provider == "tavily")
            .count(),
        4
    );
}

#[tokio::test]
async fn test_progress_events_are_ordered_and_terminal_last() {
    let caps = MockCapabilities::scripted(["1. only query", "- finding [1]"]);
    let wf = workflow(
        single_search_settings(),
        caps,
        Provider::OpenAi,
        "small question",
    );

    let (tx, mut rx) = mpsc::unbounded_channel();
    wf.with_progress(tx).run().await.unwrap();

    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }

    let names: Vec<&str> = events.iter().map(|e| e.name()).collect();
    assert_eq!(
        names,
        vec![
            "status", "progress", "plan", "progress", "status", "progress", "sources", "log",
            "progress", "status", "progress", "progress", "progress", "done",
        ]
    );

    let percents: Vec<u8> = events
        .iter()
        .filter_map(|e| match e {
            ProgressEvent::Progress { percent } => Some(*percent),
            _ => None,
        })
        .collect();
    assert_eq!(percents, vec![10, 33, 40, 66, 75, 90, 100]);

    assert!(events.last().unwrap().is_terminal());
}

#[tokio::test]
async fn test_missing_search_credential_fails_with_error_event() {
    let caps = MockCapabilities::scripted(["unused"]);
    let settings = Settings {
        openai_api_key: Some("sk-test".to_string()),
        ..Settings::default()
    };
    let wf = workflow(settings, caps, Provider::OpenAi, "anything");

    let (tx, mut rx) = mpsc::unbounded_channel();
    let result = wf.with_progress(tx).run().await;
    assert!(result.is_err());

    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].name(), "error");
}

#[tokio::test]
async fn test_gemini_falls_back_to_openai_without_credential() {
    let caps = MockCapabilities::scripted(["1. q", "- a [1]"]);
    let wf = workflow(
        single_search_settings(),
        caps,
        Provider::Gemini,
        "fallback check",
    );

    let state = wf.run().await.unwrap();
    assert_eq!(state.config.provider, Provider::OpenAi);
}
