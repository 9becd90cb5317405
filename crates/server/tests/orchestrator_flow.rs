//! End-to-end orchestrator runs over a scripted provider — no network, no
//! real LLM. The fake workspace on the other end of the frame channel
//! answers (or ignores) workspace tool calls.

mod common;

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use common::{definition, ScriptedProvider};
use troupe_agents::{Agent, AgentPool};
use troupe_domain::message::{Message, Role, ToolCall, ToolResult};
use troupe_domain::stream::StreamEvent;
use troupe_protocol::ServerFrame;
use troupe_server::channel::PendingMap;
use troupe_server::orchestrator::{collaborate, Orchestrator, RunContext, RunState};
use troupe_skills::SkillIndex;
use troupe_tools::{builtin, ActiveTool, CapabilityRegistry};

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Harness
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

struct Harness {
    orchestrator: Orchestrator,
    provider: Arc<ScriptedProvider>,
    pending: Arc<PendingMap>,
    outbound: mpsc::Sender<ServerFrame>,
    frames: Arc<Mutex<Vec<ServerFrame>>>,
    cancel: CancellationToken,
}

impl Harness {
    /// `answer_workspace`: when true, the fake workspace replies ok to
    /// every workspace-side tool call.
    fn new(agents: &[&str], answer_workspace: bool) -> Self {
        Self::with_timeout(agents, answer_workspace, Duration::from_secs(5))
    }

    fn with_timeout(agents: &[&str], answer_workspace: bool, timeout: Duration) -> Self {
        let provider = Arc::new(ScriptedProvider::default());

        let pool = Arc::new(AgentPool::new());
        pool.insert(Agent::new(
            definition("coordinator", "Plans work and coordinates the team"),
            provider.clone(),
        ));
        for name in agents {
            pool.insert(Agent::new(
                definition(name, &format!("The {name} specialist")),
                provider.clone(),
            ));
        }

        let skills = Arc::new(SkillIndex::empty());
        let active_tool = Arc::new(ActiveTool::new(
            skills.clone(),
            Arc::new(CapabilityRegistry::new()),
        ));
        let tools = Arc::new(builtin::build_tool_registry(active_tool).unwrap());

        let orchestrator = Orchestrator::new(pool, tools, skills, "coordinator".into())
            .with_workspace_timeout(timeout);

        let pending = Arc::new(PendingMap::new());
        let (outbound, mut rx) = mpsc::channel::<ServerFrame>(64);
        let frames = Arc::new(Mutex::new(Vec::new()));

        // Fake workspace: collect frames, optionally answer tool calls.
        {
            let frames = frames.clone();
            let pending = pending.clone();
            tokio::spawn(async move {
                while let Some(frame) = rx.recv().await {
                    if answer_workspace {
                        if let ServerFrame::ToolCall {
                            call,
                            server_side: false,
                        } = &frame
                        {
                            pending.complete(ToolResult::ok(
                                &call.id,
                                serde_json::json!({"ok": true}),
                            ));
                        }
                    }
                    frames.lock().push(frame);
                }
            });
        }

        Self {
            orchestrator,
            provider,
            pending,
            outbound,
            frames,
            cancel: CancellationToken::new(),
        }
    }

    fn ctx(&self, task: &str) -> RunContext {
        RunContext {
            session_id: "s-test".into(),
            task: task.into(),
            outbound: self.outbound.clone(),
            pending: self.pending.clone(),
            cancel: self.cancel.clone(),
        }
    }
}

fn assemble_team_call(agents: &[&str]) -> ToolCall {
    ToolCall {
        id: "team-1".into(),
        tool_name: "assemble_team".into(),
        arguments: serde_json::json!({ "agents": agents }),
    }
}

/// Invariant 1: every tool_result references an earlier tool_call.
fn assert_results_pair_with_earlier_calls(messages: &[Message]) {
    let mut seen_calls: Vec<&str> = Vec::new();
    for msg in messages {
        for tr in &msg.tool_results {
            assert!(
                seen_calls.contains(&tr.call_id.as_str()),
                "tool_result {} has no earlier tool_call",
                tr.call_id
            );
        }
        for tc in &msg.tool_calls {
            seen_calls.push(&tc.id);
        }
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Scenario A: hello-world run
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[tokio::test]
async fn hello_world_run_produces_artifact_and_clean_transcript() {
    let harness = Harness::new(&["developer"], true);

    // Team assembly picks the developer.
    harness
        .provider
        .push_completion("", vec![assemble_team_call(&["developer"])]);
    // Moderator: developer speaks first.
    harness.provider.push_completion("developer", vec![]);
    // Developer writes the file.
    harness.provider.push_stream(vec![
        StreamEvent::Content {
            text: "Writing the file now.".into(),
        },
        StreamEvent::ToolCall {
            call: ToolCall {
                id: "call-wf".into(),
                tool_name: "write_file".into(),
                arguments: serde_json::json!({"path": "hello.txt", "content": "hi"}),
            },
        },
        StreamEvent::Done { usage: None },
    ]);
    // Moderator: developer again, who declares completion.
    harness.provider.push_completion("developer", vec![]);
    harness.provider.push_stream(vec![
        StreamEvent::Content {
            text: "Task complete.".into(),
        },
        StreamEvent::Done { usage: None },
    ]);
    // Synthesizer.
    harness
        .provider
        .push_completion("The developer created hello.txt containing a greeting.", vec![]);

    let ctx = harness.ctx("Write a hello-world file");
    let result = harness.orchestrator.run(&ctx).await.unwrap();

    assert_eq!(result.artifacts, vec!["hello.txt"]);
    assert!(result.summary.contains("hello.txt"));
    assert_eq!(result.team, vec!["coordinator", "developer"]);

    // Transcript: user, assistant(tool_call), tool, assistant completion.
    let roles: Vec<Role> = result.messages.iter().map(|m| m.role).collect();
    assert_eq!(roles, vec![Role::User, Role::Assistant, Role::Tool, Role::Assistant]);
    assert_eq!(result.messages[1].tool_calls.len(), 1);
    assert_eq!(result.messages[2].tool_results.len(), 1);
    assert_eq!(result.messages[2].tool_results[0].call_id, "call-wf");
    assert!(result.messages[3].is_completion_signal());

    assert_results_pair_with_earlier_calls(&result.messages);
    assert!(harness.pending.is_empty());

    // The workspace saw the tool_call frame with server_side = false.
    // (Give the collector task a beat to drain the channel.)
    tokio::time::sleep(Duration::from_millis(100)).await;
    let frames = harness.frames.lock();
    assert!(frames.iter().any(|f| matches!(
        f,
        ServerFrame::ToolCall { call, server_side: false } if call.id == "call-wf"
    )));
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Scenario C: assemble_team validation
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[tokio::test]
async fn assemble_team_rejects_unknown_agent_with_suggestion() {
    let harness = Harness::new(&["developer", "writer"], false);

    let mut state = RunState {
        transcript: vec![Message::user("task")],
        team: vec!["coordinator".into()],
        pending_collaborations: Default::default(),
    };
    let before = state.team.clone();

    let call = assemble_team_call(&["developer", "documentation"]);
    let result = collaborate::handle_assemble_team(&harness.orchestrator, &mut state, &call);

    assert!(!result.is_error());
    let value = result.result.unwrap();
    assert_eq!(value["success"], false);
    let message = value["message"].as_str().unwrap();
    assert!(message.contains("documentation"));
    assert!(message.contains("writer"));
    assert!(message.contains("Did you mean"));
    // No team change.
    assert_eq!(state.team, before);
}

#[tokio::test]
async fn assemble_team_replaces_team_on_valid_names() {
    let harness = Harness::new(&["developer", "writer"], false);

    let mut state = RunState {
        transcript: vec![Message::user("task")],
        team: vec!["coordinator".into()],
        pending_collaborations: Default::default(),
    };

    let call = assemble_team_call(&["writer"]);
    let result = collaborate::handle_assemble_team(&harness.orchestrator, &mut state, &call);

    assert_eq!(result.result.unwrap()["success"], true);
    assert_eq!(state.team, vec!["coordinator".to_string(), "writer".to_string()]);
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Scenario E: empty-argument tool call is suppressed
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[tokio::test]
async fn empty_argument_tool_call_is_stripped_everywhere() {
    let harness = Harness::new(&["developer"], true);

    harness
        .provider
        .push_completion("", vec![assemble_team_call(&["developer"])]);
    harness.provider.push_completion("developer", vec![]);
    // The provider assembled an empty argument buffer into Null arguments.
    harness.provider.push_stream(vec![
        StreamEvent::Content {
            text: "Trying a tool.".into(),
        },
        StreamEvent::ToolCall {
            call: ToolCall {
                id: "call-empty".into(),
                tool_name: "read_file".into(),
                arguments: serde_json::Value::Null,
            },
        },
        StreamEvent::Done { usage: None },
    ]);
    harness.provider.push_completion("complete", vec![]);
    harness.provider.push_completion("Nothing to do.", vec![]);

    let ctx = harness.ctx("Poke at a file");
    let result = harness.orchestrator.run(&ctx).await.unwrap();

    // The call is gone from the assistant message and no tool message or
    // ghost result exists.
    let assistant = result
        .messages
        .iter()
        .find(|m| m.role == Role::Assistant)
        .unwrap();
    assert!(assistant.tool_calls.is_empty());
    assert!(!result.messages.iter().any(|m| m.role == Role::Tool));

    // The dropped call was never dispatched anywhere.
    tokio::time::sleep(Duration::from_millis(100)).await;
    let frames = harness.frames.lock();
    assert!(!frames
        .iter()
        .any(|f| matches!(f, ServerFrame::ToolCall { .. })));
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Scenario F: workspace tool timeout
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[tokio::test]
async fn workspace_timeout_yields_error_result_and_drops_late_reply() {
    // No fake-workspace answers: the call must time out.
    let harness = Harness::with_timeout(&["developer"], false, Duration::from_millis(100));

    harness
        .provider
        .push_completion("", vec![assemble_team_call(&["developer"])]);
    harness.provider.push_completion("developer", vec![]);
    harness.provider.push_stream(vec![
        StreamEvent::ToolCall {
            call: ToolCall {
                id: "call-slow".into(),
                tool_name: "read_file".into(),
                arguments: serde_json::json!({"path": "big.bin"}),
            },
        },
        StreamEvent::Done { usage: None },
    ]);
    harness.provider.push_completion("complete", vec![]);
    harness.provider.push_completion("Gave up on the slow tool.", vec![]);

    let ctx = harness.ctx("Read a slow file");
    let result = harness.orchestrator.run(&ctx).await.unwrap();

    let tool_msg = result
        .messages
        .iter()
        .find(|m| m.role == Role::Tool)
        .unwrap();
    assert_eq!(tool_msg.tool_results.len(), 1);
    assert_eq!(
        tool_msg.tool_results[0].error.as_deref(),
        Some("tool execution timeout")
    );

    // The pending entry is gone; a late reply is dropped.
    assert!(harness.pending.is_empty());
    assert!(!harness
        .pending
        .complete(ToolResult::ok("call-slow", serde_json::json!(1))));
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Collaboration flow
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[tokio::test]
async fn help_request_prioritizes_addressed_agent_next_turn() {
    let harness = Harness::new(&["developer", "writer"], true);

    harness
        .provider
        .push_completion("", vec![assemble_team_call(&["developer", "writer"])]);
    // Moderator: developer first.
    harness.provider.push_completion("developer", vec![]);
    // Developer asks the writer for help.
    harness.provider.push_stream(vec![
        StreamEvent::Content {
            text: "I need docs for this.".into(),
        },
        StreamEvent::ToolCall {
            call: ToolCall {
                id: "call-help".into(),
                tool_name: "collaborate".into(),
                arguments: serde_json::json!({
                    "action": "help",
                    "message": "Can you draft the README?",
                    "to_agent": "writer",
                }),
            },
        },
        StreamEvent::Done { usage: None },
    ]);
    // No moderator completion scripted here: rule 3 must pick the writer
    // without consulting the coordinator.
    harness.provider.push_stream(vec![
        StreamEvent::Content {
            text: "Drafted the README. Task complete.".into(),
        },
        StreamEvent::Done { usage: None },
    ]);
    harness.provider.push_completion("Docs were written.", vec![]);

    let ctx = harness.ctx("Document the project");
    let result = harness.orchestrator.run(&ctx).await.unwrap();

    // Writer spoke right after the help request.
    let speakers: Vec<&str> = result
        .messages
        .iter()
        .filter(|m| m.role == Role::Assistant)
        .map(|m| m.agent.as_str())
        .collect();
    assert_eq!(speakers, vec!["developer", "writer"]);

    // The out-of-band collaboration line went to the client as a system
    // message but is not in the LLM transcript.
    tokio::time::sleep(Duration::from_millis(100)).await;
    let frames = harness.frames.lock();
    let system_lines: Vec<String> = frames
        .iter()
        .filter_map(|f| match f {
            ServerFrame::AgentMessage { message } if message.role == Role::System => {
                Some(message.content.clone())
            }
            _ => None,
        })
        .collect();
    assert_eq!(system_lines, vec!["[developer → writer]: Can you draft the README?"]);
    assert!(!result
        .messages
        .iter()
        .any(|m| m.role == Role::System));
}

#[tokio::test]
async fn completion_signal_beats_pending_collaboration() {
    let harness = Harness::new(&["developer", "writer"], true);

    harness
        .provider
        .push_completion("", vec![assemble_team_call(&["developer", "writer"])]);
    harness.provider.push_completion("developer", vec![]);
    // One message that both asks for help and declares completion: the
    // moderator's completion rule outranks the pending-collaboration rule,
    // so the writer never speaks.
    harness.provider.push_stream(vec![
        StreamEvent::Content {
            text: "Handing off notes. Task complete.".into(),
        },
        StreamEvent::ToolCall {
            call: ToolCall {
                id: "call-help-2".into(),
                tool_name: "collaborate".into(),
                arguments: serde_json::json!({
                    "action": "help",
                    "message": "For next time, check the notes.",
                    "to_agent": "writer",
                }),
            },
        },
        StreamEvent::Done { usage: None },
    ]);
    harness.provider.push_completion("Wrapped up by the developer.", vec![]);

    let ctx = harness.ctx("Finish the notes");
    let result = harness.orchestrator.run(&ctx).await.unwrap();

    let speakers: Vec<&str> = result
        .messages
        .iter()
        .filter(|m| m.role == Role::Assistant)
        .map(|m| m.agent.as_str())
        .collect();
    assert_eq!(speakers, vec!["developer"]);
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Failure paths
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[tokio::test]
async fn unlisted_tool_is_never_dispatched() {
    let harness = Harness::new(&["developer"], true);

    harness
        .provider
        .push_completion("", vec![assemble_team_call(&["developer"])]);
    harness.provider.push_completion("developer", vec![]);
    // run_command is not in the test agents' allowed list.
    harness.provider.push_stream(vec![
        StreamEvent::ToolCall {
            call: ToolCall {
                id: "call-denied".into(),
                tool_name: "run_command".into(),
                arguments: serde_json::json!({"command": "rm -rf /"}),
            },
        },
        StreamEvent::Done { usage: None },
    ]);
    harness.provider.push_completion("complete", vec![]);
    harness.provider.push_completion("Blocked a stray call.", vec![]);

    let ctx = harness.ctx("Anything");
    let result = harness.orchestrator.run(&ctx).await.unwrap();

    let tool_msg = result
        .messages
        .iter()
        .find(|m| m.role == Role::Tool)
        .unwrap();
    assert!(tool_msg.tool_results[0]
        .error
        .as_deref()
        .unwrap()
        .contains("not permitted"));

    // The call never left the orchestrator.
    tokio::time::sleep(Duration::from_millis(100)).await;
    let frames = harness.frames.lock();
    assert!(!frames
        .iter()
        .any(|f| matches!(f, ServerFrame::ToolCall { .. })));
}

#[tokio::test]
async fn provider_stream_error_aborts_the_run() {
    let harness = Harness::new(&["developer"], true);

    harness
        .provider
        .push_completion("", vec![assemble_team_call(&["developer"])]);
    harness.provider.push_completion("developer", vec![]);
    harness.provider.push_stream(vec![
        StreamEvent::Content {
            text: "partial".into(),
        },
        StreamEvent::Error {
            message: "backend overloaded".into(),
        },
    ]);

    let ctx = harness.ctx("Anything");
    let err = harness.orchestrator.run(&ctx).await.unwrap_err();
    assert!(err.to_string().contains("backend overloaded"));
}

#[tokio::test]
async fn no_assemble_team_call_means_coordinator_works_alone() {
    let harness = Harness::new(&["developer"], true);

    // Team assembly emits no tool call at all.
    harness.provider.push_completion("I'll handle this myself.", vec![]);
    // Moderator asks; the coordinator replies with a non-member → falls
    // back to the coordinator itself.
    harness.provider.push_completion("ghost-agent", vec![]);
    harness.provider.push_stream(vec![
        StreamEvent::Content {
            text: "Done. Task complete.".into(),
        },
        StreamEvent::Done { usage: None },
    ]);
    harness.provider.push_completion("Handled solo.", vec![]);

    let ctx = harness.ctx("Small chore");
    let result = harness.orchestrator.run(&ctx).await.unwrap();

    assert_eq!(result.team, vec!["coordinator"]);
    let speakers: Vec<&str> = result
        .messages
        .iter()
        .filter(|m| m.role == Role::Assistant)
        .map(|m| m.agent.as_str())
        .collect();
    assert_eq!(speakers, vec!["coordinator"]);
}
