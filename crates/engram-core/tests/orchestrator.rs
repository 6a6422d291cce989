//! Orchestrator integration tests over the stub memory service.

use engram_core::{MemoryConfig, MemoryOrchestrator};
use engram_protocol::{
    MemoryCategory, MemoryEventKind, MemoryMetadataDraft, MemorySearchParams,
};
use engram_test_utils::StubMemoryService;
use parking_lot::Mutex;
use pretty_assertions::assert_eq;
use serde_json::json;
use std::sync::Arc;

fn orchestrator() -> (Arc<StubMemoryService>, MemoryOrchestrator) {
    let service = Arc::new(StubMemoryService::new());
    let orchestrator =
        MemoryOrchestrator::with_service(MemoryConfig::default(), service.clone(), "agent-0");
    (service, orchestrator)
}

fn draft_with_category(category: MemoryCategory) -> MemoryMetadataDraft {
    MemoryMetadataDraft {
        category: Some(category),
        ..MemoryMetadataDraft::default()
    }
}

#[tokio::test]
async fn write_through_makes_entries_immediately_searchable() {
    let (_, orchestrator) = orchestrator();
    let draft = MemoryMetadataDraft {
        category: Some(MemoryCategory::ResearchData),
        tags: vec!["chemistry".to_string()],
        ..MemoryMetadataDraft::default()
    };
    let result = orchestrator.add_memory("benzene ring notes", draft).await;
    assert!(result.success);

    let params = MemorySearchParams {
        category: Some(MemoryCategory::ResearchData),
        tags: vec!["chemistry".to_string()],
        ..MemorySearchParams::new("")
    };
    let found = orchestrator.search_memories(params).await;
    assert_eq!(found.total, 1);
    assert_eq!(found.entries[0].content, "benzene ring notes");
}

#[tokio::test]
async fn add_completes_metadata_with_agent_and_session() {
    let (_, orchestrator) = orchestrator();
    let result = orchestrator
        .add_memory("hello", MemoryMetadataDraft::default())
        .await;
    let entry = result.entry.expect("entry");
    assert_eq!(entry.metadata.agent_id, "agent-0");
    assert_eq!(
        entry.metadata.session_id.as_deref(),
        Some(orchestrator.session_id())
    );
    assert!(!entry.id.is_empty());
}

#[tokio::test]
async fn add_mirrors_the_entry_into_the_cache() {
    let (_, orchestrator) = orchestrator();
    let result = orchestrator
        .add_memory("cached content", MemoryMetadataDraft::default())
        .await;
    let entry = result.entry.expect("entry");
    assert_eq!(orchestrator.cache_len(), 1);
    assert_eq!(
        orchestrator.cached(&entry.id).map(|cached| cached.content),
        Some("cached content".to_string())
    );
}

#[tokio::test]
async fn disabled_subsystem_makes_no_remote_calls() {
    let service = Arc::new(StubMemoryService::new());
    let config = MemoryConfig::builder().enabled(false).build();
    let orchestrator = MemoryOrchestrator::with_service(config, service.clone(), "agent-0");

    assert!(!orchestrator.is_enabled());
    let add = orchestrator
        .add_memory("ignored", MemoryMetadataDraft::default())
        .await;
    assert!(!add.success);
    let search = orchestrator
        .search_memories(MemorySearchParams::new("anything"))
        .await;
    assert!(search.entries.is_empty());
    assert!(!search.has_more);
    assert!(orchestrator.get_recent_memories(None).await.is_empty());
    assert!(orchestrator.get_task_context("t-1").await.is_none());
    let stats = orchestrator.get_memory_stats().await;
    assert_eq!(stats.total_entries, 0);
    let clear = orchestrator.clear_tab_memories(1).await;
    assert!(!clear.success);
    orchestrator.initialize().await.expect("noop initialize");

    assert_eq!(service.calls().total(), 0);
}

#[tokio::test]
async fn missing_credential_degrades_to_disabled() {
    let config = MemoryConfig::builder().enabled(true).build();
    let orchestrator = MemoryOrchestrator::from_config(config, "agent-0");

    assert!(!orchestrator.is_enabled());
    assert!(orchestrator.disabled_reason().is_some());
    let err = orchestrator.initialize().await.expect_err("config error");
    assert!(err.to_string().contains("configuration error"));
    let add = orchestrator
        .add_memory("ignored", MemoryMetadataDraft::default())
        .await;
    assert!(!add.success);
}

#[tokio::test]
async fn stats_seed_every_category_at_zero() {
    let (_, orchestrator) = orchestrator();
    let stats = orchestrator.get_memory_stats().await;
    assert_eq!(stats.total_entries, 0);
    assert_eq!(stats.tab_count, 0);
    assert_eq!(stats.entries_by_category.len(), MemoryCategory::ALL.len());
    for category in MemoryCategory::ALL {
        assert_eq!(stats.entries_by_category.get(&category), Some(&0));
    }
}

#[tokio::test]
async fn stats_count_categories_and_distinct_tabs() {
    let (_, orchestrator) = orchestrator();
    for tab_id in [1, 1, 2] {
        let draft = MemoryMetadataDraft {
            category: Some(MemoryCategory::TaskResult),
            tab_id: Some(tab_id),
            ..MemoryMetadataDraft::default()
        };
        orchestrator.add_memory("step", draft).await;
    }
    orchestrator
        .add_memory(
            "plan",
            draft_with_category(MemoryCategory::SuccessfulPlan),
        )
        .await;

    let stats = orchestrator.get_memory_stats().await;
    assert_eq!(stats.total_entries, 4);
    assert_eq!(
        stats.entries_by_category.get(&MemoryCategory::TaskResult),
        Some(&3)
    );
    assert_eq!(
        stats.entries_by_category.get(&MemoryCategory::SuccessfulPlan),
        Some(&1)
    );
    assert_eq!(stats.tab_count, 2);
    assert!(stats.last_updated.is_some());
}

#[tokio::test]
async fn failing_store_degrades_reads_and_reports_writes() {
    let (service, orchestrator) = orchestrator();
    service.set_fail(true);

    let search = orchestrator
        .search_memories(MemorySearchParams::new("anything"))
        .await;
    assert_eq!(search.entries.len(), 0);
    assert_eq!(search.total, 0);
    assert!(!search.has_more);

    assert!(orchestrator.get_recent_memories(None).await.is_empty());
    assert!(orchestrator.get_task_context("t-1").await.is_none());
    let stats = orchestrator.get_memory_stats().await;
    assert_eq!(stats.total_entries, 0);

    let add = orchestrator
        .add_memory("content", MemoryMetadataDraft::default())
        .await;
    assert!(!add.success);
    assert!(add.message.expect("message").contains("failed to add memory"));
}

#[tokio::test]
async fn has_more_tracks_the_limit_boundary() {
    let (_, orchestrator) = orchestrator();
    for index in 0..3 {
        orchestrator
            .add_memory(&format!("entry {index}"), MemoryMetadataDraft::default())
            .await;
    }

    let at_limit = orchestrator
        .search_memories(MemorySearchParams {
            limit: Some(3),
            ..MemorySearchParams::new("")
        })
        .await;
    assert!(at_limit.has_more);

    let below_limit = orchestrator
        .search_memories(MemorySearchParams {
            limit: Some(10),
            ..MemorySearchParams::new("")
        })
        .await;
    assert!(!below_limit.has_more);
}

#[tokio::test]
async fn preferences_merge_across_entries() {
    let (_, orchestrator) = orchestrator();
    orchestrator
        .add_memory(
            r#"{"theme":"dark"}"#,
            draft_with_category(MemoryCategory::UserPreference),
        )
        .await;
    orchestrator
        .store_user_preference("lang", &json!("en"), MemoryMetadataDraft::default())
        .await;

    let context = orchestrator.get_agent_context().await;
    assert_eq!(context.preferences.get("theme"), Some(&json!("dark")));
    assert_eq!(context.preferences.get("lang"), Some(&json!("en")));
    assert_eq!(context.agent_id, "agent-0");
    assert_eq!(context.session_id, orchestrator.session_id());
}

#[tokio::test]
async fn agent_context_learns_from_workflow_patterns() {
    let (_, orchestrator) = orchestrator();
    orchestrator
        .store_workflow_pattern("open settings first", true, MemoryMetadataDraft::default())
        .await;
    orchestrator
        .store_workflow_pattern("guess the url", false, MemoryMetadataDraft::default())
        .await;

    let context = orchestrator.get_agent_context().await;
    assert_eq!(context.learnings.len(), 2);
    let learned: Vec<(bool, f64)> = context
        .learnings
        .iter()
        .map(|learning| (learning.success, learning.confidence))
        .collect();
    assert!(learned.contains(&(true, 0.8)));
    assert!(learned.contains(&(false, 0.3)));
}

#[tokio::test]
async fn add_then_recall_by_category() {
    let (_, orchestrator) = orchestrator();
    let draft = MemoryMetadataDraft {
        category: Some(MemoryCategory::SearchResult),
        importance: Some(0.8),
        ..MemoryMetadataDraft::default()
    };
    let result = orchestrator.add_memory("Top songs: A, B, C", draft).await;
    assert!(result.success);

    let recalled = orchestrator
        .get_memories_by_category(MemoryCategory::SearchResult, None)
        .await;
    assert_eq!(recalled.len(), 1);
    assert_eq!(recalled[0].content, "Top songs: A, B, C");
    assert_eq!(recalled[0].metadata.importance, Some(0.8));
}

#[tokio::test]
async fn task_context_is_absent_without_matches() {
    let (_, orchestrator) = orchestrator();
    assert!(orchestrator.get_task_context("nonexistent-task").await.is_none());
}

#[tokio::test]
async fn task_context_folds_entries_by_category() {
    let (_, orchestrator) = orchestrator();
    let task = |category| MemoryMetadataDraft {
        category: Some(category),
        task_id: Some("t-1".to_string()),
        ..MemoryMetadataDraft::default()
    };
    let step = orchestrator
        .add_memory("step one done", task(MemoryCategory::TaskResult))
        .await;
    orchestrator
        .add_memory(r#"{"theme":"dark"}"#, task(MemoryCategory::UserPreference))
        .await;
    orchestrator
        .add_memory("not json {", task(MemoryCategory::UserPreference))
        .await;
    orchestrator
        .add_memory("timeout fixed by retry", task(MemoryCategory::ErrorSolution))
        .await;

    let context = orchestrator
        .get_task_context("t-1")
        .await
        .expect("context present");
    assert_eq!(context.task_id, "t-1");
    let step_id = step.entry.expect("entry").id;
    assert_eq!(
        context.intermediate_results.get(&step_id),
        Some(&"step one done".to_string())
    );
    assert_eq!(context.user_preferences.get("theme"), Some(&json!("dark")));
    assert_eq!(context.error_history.len(), 1);
    assert_eq!(context.error_history[0].error, "timeout fixed by retry");
    assert_eq!(context.error_history[0].solution, context.error_history[0].error);
}

#[tokio::test]
async fn clear_tab_deletes_only_that_tab() {
    let (service, orchestrator) = orchestrator();
    let tab = |tab_id| MemoryMetadataDraft {
        tab_id: Some(tab_id),
        ..MemoryMetadataDraft::default()
    };
    for index in 0..3 {
        orchestrator
            .add_memory(&format!("tab42 entry {index}"), tab(42))
            .await;
    }
    orchestrator.add_memory("tab7 entry", tab(7)).await;

    let result = orchestrator.clear_tab_memories(42).await;
    assert!(result.success);
    assert_eq!(
        result.message.as_deref(),
        Some("deleted 3 memories for tab 42")
    );
    assert_eq!(service.record_count(), 1);

    let survivors = orchestrator
        .search_memories(MemorySearchParams {
            tab_id: Some(7),
            ..MemorySearchParams::new("")
        })
        .await;
    assert_eq!(survivors.total, 1);
    assert_eq!(survivors.entries[0].content, "tab7 entry");

    let cleared = orchestrator
        .search_memories(MemorySearchParams {
            tab_id: Some(42),
            ..MemorySearchParams::new("")
        })
        .await;
    assert_eq!(cleared.total, 0);
}

#[tokio::test]
async fn recent_memories_are_sorted_newest_first() {
    let (_, orchestrator) = orchestrator();
    for index in 0..5 {
        orchestrator
            .add_memory(&format!("entry {index}"), MemoryMetadataDraft::default())
            .await;
    }
    let recent = orchestrator.get_recent_memories(Some(3)).await;
    assert_eq!(recent.len(), 3);
    assert!(
        recent
            .windows(2)
            .all(|pair| pair[0].created_at >= pair[1].created_at)
    );
}

#[tokio::test]
async fn lifecycle_events_are_published_in_order() {
    let (_, orchestrator) = orchestrator();
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = seen.clone();
    orchestrator.on_memory_event(move |event| sink.lock().push(event.kind));

    orchestrator
        .add_memory("observed", MemoryMetadataDraft::default())
        .await;
    orchestrator
        .search_memories(MemorySearchParams::new("observed"))
        .await;

    assert_eq!(
        *seen.lock(),
        vec![MemoryEventKind::Added, MemoryEventKind::Searched]
    );
}

#[tokio::test]
async fn added_events_carry_the_entry_id() {
    let (_, orchestrator) = orchestrator();
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = seen.clone();
    orchestrator
        .events()
        .on(MemoryEventKind::Added, move |event| {
            sink.lock().push(event.clone());
        });

    let result = orchestrator
        .add_memory("observed", draft_with_category(MemoryCategory::ContextData))
        .await;
    let entry = result.entry.expect("entry");

    let events = seen.lock();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].entry_id.as_deref(), Some(entry.id.as_str()));
    assert_eq!(events[0].category, Some(MemoryCategory::ContextData));
    assert_eq!(events[0].agent_id, "agent-0");
}

#[tokio::test]
async fn update_replaces_content_and_refreshes_the_cache() {
    let (_, orchestrator) = orchestrator();
    let added = orchestrator
        .add_memory("draft wording", MemoryMetadataDraft::default())
        .await;
    let entry = added.entry.expect("entry");

    let updated = orchestrator.update_memory(&entry.id, "final wording").await;
    assert!(updated.success);

    let cached = orchestrator.cached(&entry.id).expect("cached");
    assert_eq!(cached.content, "final wording");
    assert!(cached.updated_at >= cached.created_at);

    let found = orchestrator
        .search_memories(MemorySearchParams::new("final wording"))
        .await;
    assert_eq!(found.total, 1);
}

#[tokio::test]
async fn store_tool_result_synthesizes_content_and_importance() {
    let (_, orchestrator) = orchestrator();
    let result = orchestrator
        .store_tool_result(
            "fetch_page",
            &json!({"status": 200}),
            true,
            MemoryMetadataDraft::default(),
        )
        .await;
    let entry = result.entry.expect("entry");
    assert_eq!(
        entry.content,
        r#"Tool: fetch_page, Success: true, Result: {"status":200}"#
    );
    assert_eq!(entry.metadata.category, Some(MemoryCategory::ToolResult));
    assert_eq!(entry.metadata.tool_name.as_deref(), Some("fetch_page"));
    assert_eq!(entry.metadata.importance, Some(0.6));

    let failed = orchestrator
        .store_tool_result(
            "fetch_page",
            &json!("timeout"),
            false,
            MemoryMetadataDraft::default(),
        )
        .await;
    assert_eq!(
        failed.entry.expect("entry").metadata.importance,
        Some(0.4)
    );
}
