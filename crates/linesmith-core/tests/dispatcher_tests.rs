//! Tool dispatch tests
//!
//! Quota enforcement, chart persistence, and error results for both the
//! code tool and provider tools.

mod common;

use std::sync::Arc;

use common::{EchoProvider, FakeExecutor, code_call, search_call};
use linesmith_core::charts::ChartStore;
use linesmith_core::conversation::ToolCallRecord;
use linesmith_core::tools::{ToolDispatcher, ToolResult};
use serde_json::{Value, json};
use tempfile::TempDir;

fn dispatcher(executor: Arc<FakeExecutor>, provider: Arc<EchoProvider>, dir: &TempDir, quota: usize) -> ToolDispatcher {
    ToolDispatcher::new(provider, executor, ChartStore::new(dir.path(), "nfl-analysis"), quota)
}

fn content(result: &ToolResult) -> Value {
    serde_json::from_str(&result.to_content()).unwrap()
}

mod code_tool_tests {
    use super::*;

    #[tokio::test]
    async fn test_second_call_hits_quota_without_sandbox() {
        let dir = TempDir::new().unwrap();
        let executor = Arc::new(FakeExecutor::with_charts(1));
        let mut dispatcher = dispatcher(executor.clone(), Arc::new(EchoProvider::default()), &dir, 1);

        let first = dispatcher.dispatch(&code_call("c1", "plt.savefig('a.png')")).await;
        let second = dispatcher.dispatch(&code_call("c2", "plt.savefig('b.png')")).await;

        assert_eq!(content(&first)["success"], true);
        assert_eq!(
            content(&second),
            json!({
                "success": false,
                "error": "Python code execution limit reached. You can only call run_python_code once."
            })
        );
        assert_eq!(executor.runs(), 1);
        assert_eq!(dispatcher.quota().used(), 1);
    }

    #[tokio::test]
    async fn test_quota_never_exceeded() {
        let dir = TempDir::new().unwrap();
        let executor = Arc::new(FakeExecutor::with_charts(0));
        let mut dispatcher = dispatcher(executor.clone(), Arc::new(EchoProvider::default()), &dir, 3);

        for i in 0..10 {
            dispatcher.dispatch(&code_call(&format!("c{}", i), "print(1)")).await;
        }

        assert_eq!(executor.runs(), 3);
        assert!(dispatcher.quota().is_exhausted());
    }

    #[tokio::test]
    async fn test_missing_code_does_not_consume_quota() {
        let dir = TempDir::new().unwrap();
        let executor = Arc::new(FakeExecutor::with_charts(1));
        let mut dispatcher = dispatcher(executor.clone(), Arc::new(EchoProvider::default()), &dir, 1);

        let result = dispatcher
            .dispatch(&ToolCallRecord::new("c1", "run_python_code", r#"{"script": "x"}"#))
            .await;

        assert_eq!(
            content(&result),
            json!({ "success": false, "error": "No Python code found in arguments" })
        );
        assert_eq!(executor.runs(), 0);
        assert_eq!(dispatcher.quota().used(), 0);
    }

    #[tokio::test]
    async fn test_malformed_payload_still_executes() {
        let dir = TempDir::new().unwrap();
        let executor = Arc::new(FakeExecutor::with_charts(0));
        let mut dispatcher = dispatcher(executor.clone(), Arc::new(EchoProvider::default()), &dir, 1);

        dispatcher
            .dispatch(&ToolCallRecord::new("c1", "run_python_code", "{\"code\": \"print(\n1)\""))
            .await;

        assert_eq!(executor.codes.lock().unwrap().as_slice(), ["print(\n1)"]);
    }

    #[tokio::test]
    async fn test_charts_are_saved_and_reported() {
        let dir = TempDir::new().unwrap();
        let executor = Arc::new(FakeExecutor::with_charts(2));
        let mut dispatcher = dispatcher(executor, Arc::new(EchoProvider::default()), &dir, 1);

        let result = dispatcher.dispatch(&code_call("c1", "plt.savefig('x.png')")).await;
        let value = content(&result);

        assert_eq!(value["success"], true);
        assert_eq!(value["stdout"], "ok\n");
        assert_eq!(value["chart_count"], 2);
        assert_eq!(value["charts_saved"], json!(["nfl-analysis-0.png", "nfl-analysis-1.png"]));
        assert_eq!(
            value["message"],
            "Code executed successfully! Generated 2 chart(s): nfl-analysis-0.png, nfl-analysis-1.png"
        );
        assert!(dir.path().join("nfl-analysis-0.png").exists());
        assert!(dir.path().join("nfl-analysis-1.png").exists());
        assert_eq!(dispatcher.charts_saved(), ["nfl-analysis-0.png", "nfl-analysis-1.png"]);
    }

    #[tokio::test]
    async fn test_second_execution_continues_numbering() {
        let dir = TempDir::new().unwrap();
        let executor = Arc::new(FakeExecutor::with_charts(1));
        let mut dispatcher = dispatcher(executor, Arc::new(EchoProvider::default()), &dir, 2);

        dispatcher.dispatch(&code_call("c1", "a")).await;
        let second = dispatcher.dispatch(&code_call("c2", "b")).await;

        assert_eq!(content(&second)["charts_saved"], json!(["nfl-analysis-1.png"]));
        assert_eq!(dispatcher.charts_saved(), ["nfl-analysis-0.png", "nfl-analysis-1.png"]);
    }

    #[tokio::test]
    async fn test_no_charts_hint() {
        let dir = TempDir::new().unwrap();
        let mut dispatcher = dispatcher(
            Arc::new(FakeExecutor::with_charts(0)),
            Arc::new(EchoProvider::default()),
            &dir,
            1,
        );

        let value = content(&dispatcher.dispatch(&code_call("c1", "print(1)")).await);

        assert_eq!(value["success"], true);
        assert_eq!(
            value["message"],
            "Code executed but no charts were generated. Did you use plt.savefig()?"
        );
        assert!(value.get("charts_saved").is_none());
        assert!(dispatcher.charts_saved().is_empty());
    }

    #[tokio::test]
    async fn test_execution_error_is_verbatim() {
        let dir = TempDir::new().unwrap();
        let mut dispatcher = dispatcher(
            Arc::new(FakeExecutor::failing_code("NameError: name 'plt' is not defined", "Traceback ...")),
            Arc::new(EchoProvider::default()),
            &dir,
            1,
        );

        let value = content(&dispatcher.dispatch(&code_call("c1", "plt.plot()")).await);

        assert_eq!(
            value,
            json!({
                "success": false,
                "error": "NameError: name 'plt' is not defined",
                "traceback": "Traceback ..."
            })
        );
    }

    #[tokio::test]
    async fn test_backend_failure_becomes_error_result() {
        let dir = TempDir::new().unwrap();
        let executor = Arc::new(FakeExecutor::broken_backend());
        let mut dispatcher = dispatcher(executor.clone(), Arc::new(EchoProvider::default()), &dir, 1);

        let value = content(&dispatcher.dispatch(&code_call("c1", "print(1)")).await);

        assert_eq!(value["success"], false);
        assert!(value["error"].as_str().unwrap().contains("sandbox unreachable"));
        assert_eq!(executor.runs(), 1);
    }

    #[tokio::test]
    async fn test_unwritable_chart_dir_becomes_error_result() {
        let dir = TempDir::new().unwrap();
        let blocker = dir.path().join("not-a-dir");
        std::fs::write(&blocker, b"file").unwrap();

        let mut dispatcher = ToolDispatcher::new(
            Arc::new(EchoProvider::default()),
            Arc::new(FakeExecutor::with_charts(1)),
            ChartStore::new(&blocker, "nfl-analysis"),
            1,
        );

        let value = content(&dispatcher.dispatch(&code_call("c1", "x")).await);

        assert_eq!(value["success"], false);
        assert!(value["error"].as_str().unwrap().starts_with("Failed to save charts"));
        assert!(dispatcher.charts_saved().is_empty());
    }
}

mod provider_tool_tests {
    use super::*;

    #[tokio::test]
    async fn test_provider_result_forwarded_unmodified() {
        let dir = TempDir::new().unwrap();
        let provider = Arc::new(EchoProvider::default());
        let mut dispatcher = dispatcher(Arc::new(FakeExecutor::with_charts(0)), provider.clone(), &dir, 1);

        let result = dispatcher.dispatch(&search_call("s1", "vikings odds")).await;

        assert_eq!(
            result,
            ToolResult::Provider(json!({
                "content": [{ "type": "text", "text": "results for \"vikings odds\"" }]
            }))
        );
        let calls = provider.calls.lock().unwrap();
        assert_eq!(calls[0].0, "brave_web_search");
        assert_eq!(calls[0].1, json!({ "query": "vikings odds" }));
    }

    #[tokio::test]
    async fn test_unparseable_arguments_not_forwarded() {
        let dir = TempDir::new().unwrap();
        let provider = Arc::new(EchoProvider::default());
        let mut dispatcher = dispatcher(Arc::new(FakeExecutor::with_charts(0)), provider.clone(), &dir, 1);

        let result = dispatcher
            .dispatch(&ToolCallRecord::new("s1", "brave_web_search", "{query: vikings"))
            .await;
        let value = content(&result);

        assert_eq!(value["success"], false);
        assert!(value["error"].as_str().unwrap().starts_with("Failed to parse MCP tool arguments"));
        assert_eq!(provider.call_count(), 0);
    }

    #[tokio::test]
    async fn test_provider_failure_becomes_error_result() {
        let dir = TempDir::new().unwrap();
        let mut dispatcher = dispatcher(
            Arc::new(FakeExecutor::with_charts(0)),
            Arc::new(EchoProvider::failing()),
            &dir,
            1,
        );

        let value = content(&dispatcher.dispatch(&search_call("s1", "odds")).await);

        assert_eq!(value["success"], false);
        assert!(value["error"].as_str().unwrap().contains("search backend unavailable"));
    }

    #[tokio::test]
    async fn test_provider_calls_do_not_touch_quota() {
        let dir = TempDir::new().unwrap();
        let mut dispatcher = dispatcher(
            Arc::new(FakeExecutor::with_charts(0)),
            Arc::new(EchoProvider::default()),
            &dir,
            1,
        );

        for i in 0..5 {
            dispatcher.dispatch(&search_call(&format!("s{}", i), "odds")).await;
        }

        assert_eq!(dispatcher.quota().used(), 0);
    }
}
