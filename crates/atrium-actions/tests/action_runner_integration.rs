use std::sync::Arc;

use httpmock::prelude::*;
use serde_json::json;
use tokio::sync::mpsc;

use atrium_actions::{
    ActionDomain, ActionError, ActionRunOutcome, ActionRunner, ActionTargetRef, AuditOutcome,
    RunOptions, RunnerConfig, EMAIL_MASK,
};
use atrium_gateway::{GatewayClient, GatewayConfig, NoAuth, RunStatus};

fn runner_for(server: &MockServer, max_poll_attempts: usize) -> ActionRunner {
    let mut config = GatewayConfig::direct(server.base_url());
    config.max_retries = 0;
    let gateway = GatewayClient::new(config, Arc::new(NoAuth)).expect("gateway client");
    ActionRunner::new(
        Arc::new(gateway),
        RunnerConfig {
            poll_interval_ms: 1,
            max_poll_attempts,
        },
    )
}

fn inbox_options(tenant: &str) -> RunOptions {
    RunOptions {
        module_context: json!({ "threadId": "th_1", "subject": "Quote" }),
        ..RunOptions::new(tenant, ActionTargetRef::new(ActionDomain::Inbox))
    }
}

#[tokio::test]
async fn functional_needs_input_never_enters_the_polling_loop() {
    let server = MockServer::start();
    let submit = server.mock(|when, then| {
        when.method(POST).path("/v1/actions/run");
        then.status(200).json_body(json!({
            "runId": "run_1",
            "status": "needs_input",
            "missingFields": ["thread_id"],
            "reasonCode": "missing_required_input"
        }));
    });
    let poll = server.mock(|when, then| {
        when.method(GET).path("/v1/actions/runs/run_1");
        then.status(200)
            .json_body(json!({ "runId": "run_1", "status": "running" }));
    });

    let runner = runner_for(&server, 5);
    let outcome = runner
        .run("summarize_thread", inbox_options("t1"))
        .await
        .expect("needs-input is not an error");

    submit.assert();
    poll.assert_hits(0);
    match outcome {
        ActionRunOutcome::NeedsInput {
            missing_fields,
            reason_code,
            ..
        } => {
            assert_eq!(missing_fields, vec!["thread_id".to_string()]);
            assert_eq!(reason_code.as_deref(), Some("missing_required_input"));
        }
        other => panic!("unexpected outcome {other:?}"),
    }
    // Interrupts are resumable, not completions; nothing is audited.
    assert!(runner.audit().is_empty());
}

#[tokio::test]
async fn functional_exhausted_poll_budget_is_a_timeout_not_a_failure() {
    let server = MockServer::start();
    let submit = server.mock(|when, then| {
        when.method(POST).path("/v1/actions/run");
        then.status(200)
            .json_body(json!({ "runId": "run_2", "status": "running" }));
    });
    let poll = server.mock(|when, then| {
        when.method(GET).path("/v1/actions/runs/run_2");
        then.status(200)
            .json_body(json!({ "runId": "run_2", "status": "running" }));
    });

    let runner = runner_for(&server, 3);
    let error = runner
        .run("summarize_thread", inbox_options("t1"))
        .await
        .expect_err("a stuck run should time out");

    submit.assert();
    poll.assert_hits(3);
    match error {
        ActionError::RunTimeout { run_id, attempts } => {
            assert_eq!(run_id, "run_2");
            assert_eq!(attempts, 3);
        }
        other => panic!("expected timeout, got {other:?}"),
    }

    let entries = runner.audit().entries();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].outcome, AuditOutcome::TimedOut);
}

#[tokio::test]
async fn completed_submit_validates_output_and_emits_effects() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(POST)
            .path("/v1/actions/run")
            .json_body_includes(
                json!({
                    "tenantId": "t1",
                    "actionId": "summarize_thread",
                    "context": { "module": "inbox" }
                })
                .to_string(),
            );
        then.status(200).json_body(json!({
            "runId": "run_3",
            "status": "completed",
            "result": { "text": "Customer accepted the quote." }
        }));
    });

    let (sender, mut receiver) = mpsc::unbounded_channel();
    let runner = runner_for(&server, 5).with_notifications(sender);
    let outcome = runner
        .run("summarize_thread", inbox_options("t1"))
        .await
        .expect("run should complete");

    match outcome {
        ActionRunOutcome::Completed { handle, output } => {
            assert_eq!(handle.run_id, "run_3");
            assert_eq!(handle.status, RunStatus::Completed);
            assert_eq!(
                serde_json::to_value(&output).expect("serialize"),
                json!({ "kind": "summary", "text": "Customer accepted the quote." })
            );
        }
        other => panic!("unexpected outcome {other:?}"),
    }

    let entries = runner.audit().entries();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].outcome, AuditOutcome::Completed);
    assert_eq!(entries[0].target_id.as_deref(), Some("th_1"));

    let notification = receiver.try_recv().expect("completion notification");
    assert_eq!(notification.action_id, "summarize_thread");
    assert_eq!(notification.outcome, AuditOutcome::Completed);
}

#[tokio::test]
async fn running_run_completes_through_the_poll_loop() {
    let server = MockServer::start();
    let submit = server.mock(|when, then| {
        when.method(POST).path("/v1/actions/run");
        then.status(200)
            .json_body(json!({ "runId": "run_4", "status": "running" }));
    });
    let poll = server.mock(|when, then| {
        when.method(GET)
            .path("/v1/actions/runs/run_4")
            .query_param("tenantId", "t1");
        then.status(200).json_body(json!({
            "runId": "run_4",
            "status": "completed",
            "result": { "kind": "tasks", "items": [" send quote ", "", "chase invoice"] }
        }));
    });

    let runner = runner_for(&server, 5);
    let outcome = runner
        .run("extract_tasks", inbox_options("t1"))
        .await
        .expect("run should complete after polling");

    submit.assert();
    poll.assert_hits(1);
    match outcome {
        ActionRunOutcome::Completed { output, .. } => {
            assert_eq!(
                serde_json::to_value(&output).expect("serialize"),
                json!({ "kind": "tasks", "items": ["send quote", "chase invoice"] })
            );
        }
        other => panic!("unexpected outcome {other:?}"),
    }
}

#[tokio::test]
async fn regression_invalid_output_is_a_hard_failure_not_a_pass_through() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(POST).path("/v1/actions/run");
        then.status(200).json_body(json!({
            "runId": "run_5",
            "status": "completed",
            "result": { "text": "   " }
        }));
    });

    let runner = runner_for(&server, 5);
    let error = runner
        .run("summarize_thread", inbox_options("t1"))
        .await
        .expect_err("blank output must not reach callers");

    assert!(matches!(error, ActionError::OutputShape(_)));
    let entries = runner.audit().entries();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].outcome, AuditOutcome::Failed);
}

#[tokio::test]
async fn explicit_backend_failure_carries_its_message() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(POST).path("/v1/actions/run");
        then.status(200).json_body(json!({
            "runId": "run_6",
            "status": "failed",
            "error": "model quota exceeded"
        }));
    });

    let (sender, mut receiver) = mpsc::unbounded_channel();
    let runner = runner_for(&server, 5).with_notifications(sender);
    let error = runner
        .run("summarize_thread", inbox_options("t1"))
        .await
        .expect_err("failed run should error");

    match error {
        ActionError::RunFailed { run_id, message } => {
            assert_eq!(run_id, "run_6");
            assert_eq!(message, "model quota exceeded");
        }
        other => panic!("expected run failure, got {other:?}"),
    }

    let notification = receiver.try_recv().expect("failure notification");
    assert_eq!(notification.outcome, AuditOutcome::Failed);
    assert_eq!(notification.message, "model quota exceeded");
}

#[tokio::test]
async fn unknown_actions_fail_fast_without_any_network_call() {
    let server = MockServer::start();
    let any = server.mock(|when, then| {
        when.method(POST).path("/v1/actions/run");
        then.status(500);
    });

    let runner = runner_for(&server, 5);
    let error = runner
        .run("translate_thread", inbox_options("t1"))
        .await
        .expect_err("unknown id should fail");

    any.assert_hits(0);
    assert!(matches!(error, ActionError::UnsupportedAction { .. }));
}

#[tokio::test]
async fn unsupported_domains_fail_fast_without_any_network_call() {
    let server = MockServer::start();
    let any = server.mock(|when, then| {
        when.method(POST).path("/v1/actions/run");
        then.status(500);
    });

    let runner = runner_for(&server, 5);
    // draft_reply is inbox-only.
    let options = RunOptions {
        module_context: json!({ "customerId": "c_1" }),
        ..RunOptions::new("t1", ActionTargetRef::new(ActionDomain::Customers))
    };
    let error = runner
        .run("draft_reply", options)
        .await
        .expect_err("unsupported domain should fail");

    any.assert_hits(0);
    match error {
        ActionError::UnsupportedAction { action_id, detail } => {
            assert_eq!(action_id, "draft_reply");
            assert!(detail.contains("customers"));
        }
        other => panic!("unexpected error {other:?}"),
    }
}

#[tokio::test]
async fn missing_target_identifier_is_surfaced_by_the_runner() {
    let server = MockServer::start();
    let any = server.mock(|when, then| {
        when.method(POST).path("/v1/actions/run");
        then.status(500);
    });

    let runner = runner_for(&server, 5);
    let error = runner
        .run(
            "summarize_thread",
            RunOptions::new("t1", ActionTargetRef::new(ActionDomain::Inbox)),
        )
        .await
        .expect_err("no identifier should fail");

    any.assert_hits(0);
    match error {
        ActionError::MissingTarget { domain } => assert_eq!(domain, "inbox"),
        other => panic!("unexpected error {other:?}"),
    }
}

#[tokio::test]
async fn functional_submitted_context_is_redacted() {
    let server = MockServer::start();
    let submit = server.mock(|when, then| {
        when.method(POST).path("/v1/actions/run").json_body_includes(
            json!({
                "context": {
                    "moduleContext": {
                        "snippet": format!("Ping {EMAIL_MASK} about renewal")
                    }
                }
            })
            .to_string(),
        );
        then.status(200).json_body(json!({
            "runId": "run_7",
            "status": "completed",
            "result": { "text": "Done." }
        }));
    });

    let runner = runner_for(&server, 5);
    let options = RunOptions {
        module_context: json!({
            "threadId": "th_1",
            "snippet": "Ping ada@example.com about renewal"
        }),
        ..RunOptions::new("t1", ActionTargetRef::new(ActionDomain::Inbox))
    };
    runner
        .run("summarize_thread", options)
        .await
        .expect("run should complete");

    submit.assert();
}
