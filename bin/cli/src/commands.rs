//! Command implementations.
//!
//! Editing commands open an [`EditorSession`], apply one change and close
//! the session, which saves through the same autosave path the canvas uses.

use crate::config::CliConfig;
use crate::error::CliError;
use classflow_client::{
    AuthClient, ClientError, EventsClient, ExecutionSummary, FlowClient, RunnerClient,
    SessionContext,
};
use classflow_core::FlowId;
use classflow_editor::{EditorSession, Notice, NoticeLevel, TemplateOutcome};
use classflow_graph::template;
use classflow_graph::{
    ExecutionEvent, GraphAction, GraphAnalysis, GraphState, NodeId, ProposedEdge, reduce,
};
use futures::StreamExt;
use rootcause::Report;
use std::fmt::Write as _;
use std::path::Path;
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::{debug, instrument};

pub type CommandResult = classflow_core::Result<(), CliError>;

fn service(e: Report<ClientError>) -> CliError {
    CliError::Service {
        details: e.to_string(),
    }
}

fn session(config: &CliConfig) -> classflow_core::Result<SessionContext, CliError> {
    let path = config.session_path()?;
    Ok(SessionContext::open(path).map_err(service)?)
}

/// Checks a graph document on disk.
pub fn check(path: &Path) -> CommandResult {
    let file_error = |details: String| CliError::GraphFile {
        path: path.display().to_string(),
        details,
    };
    let json = std::fs::read_to_string(path).map_err(|e| file_error(e.to_string()))?;
    let (graph, repairs) =
        GraphState::parse_with_repairs(&json).map_err(|e| file_error(e.to_string()))?;

    let analysis = graph.analyze().with_repairs(repairs);
    print!("{}", render_analysis(&graph, &analysis));
    if analysis.is_runnable() {
        Ok(())
    } else {
        Err(CliError::NotRunnable.into())
    }
}

/// Lists the built-in templates.
pub fn templates() {
    for template in template::catalog() {
        println!(
            "{:<20} {} ({} nodes)\n{:<20} {}",
            template.id,
            template.name,
            template.nodes.len(),
            "",
            template.description
        );
    }
}

#[instrument(skip(config))]
pub async fn apply_template(
    config: &CliConfig,
    flow_id: &FlowId,
    template_id: &str,
    confirmed: bool,
) -> CommandResult {
    let template = template::find(template_id).ok_or_else(|| CliError::UnknownTemplate {
        id: template_id.to_string(),
    })?;

    let (mut editor, notices) = open_editor(config, flow_id).await?;
    let outcome = match editor.apply_template(&template, confirmed) {
        Ok(outcome) => outcome,
        Err(rejection) => {
            editor.close().await;
            return Err(CliError::Rejected {
                message: rejection.user_message().to_string(),
            }
            .into());
        }
    };
    if outcome == TemplateOutcome::NeedsConfirmation {
        editor.close().await;
        return Err(CliError::NeedsConfirmation.into());
    }

    let nodes = editor.graph().node_count();
    finish(editor, notices).await?;
    println!("Applied '{}' to {flow_id} ({nodes} nodes).", template.name);
    Ok(())
}

#[instrument(skip(config))]
pub async fn connect(
    config: &CliConfig,
    flow_id: &FlowId,
    proposed: ProposedEdge,
) -> CommandResult {
    let (mut editor, notices) = open_editor(config, flow_id).await?;
    let source = proposed.source.clone();
    let target = proposed.target.clone();

    if let Err(rejection) = editor.dispatch(GraphAction::AddEdge(proposed)) {
        editor.close().await;
        return Err(CliError::Rejected {
            message: rejection.user_message().to_string(),
        }
        .into());
    }

    let graph = editor.graph().clone();
    finish(editor, notices).await?;
    println!(
        "Connected {} -> {}.",
        label(&graph, &source),
        label(&graph, &target)
    );
    println!("{}", render_activity(&graph));
    Ok(())
}

/// Starts an execution, optionally following its events until it ends.
#[instrument(skip(config))]
pub async fn run(config: &CliConfig, flow_id: &FlowId, watch: bool) -> CommandResult {
    let session = session(config)?;
    let runner = RunnerClient::new(&config.services, session.clone()).map_err(service)?;

    let started = runner.execute(flow_id).await.map_err(service)?;
    let status = started
        .status
        .map_or_else(|| "pending".to_string(), |s| s.to_string());
    println!("Started execution {} ({status}).", started.execution_id);
    if !watch {
        return Ok(());
    }

    let flows = FlowClient::new(&config.services, session).map_err(service)?;
    let mut graph = flows.get_flow(flow_id).await.map_err(service)?.graph();
    let mut events = EventsClient::new(&config.services)
        .watch(started.execution_id.clone())
        .await
        .map_err(service)?;

    let mut failure = None;
    while let Some(event) = events.next().await {
        let event = event.map_err(service)?;
        println!("{}", describe_event(&graph, &event));
        if let ExecutionEvent::ExecutionFailed { error, .. } = &event {
            failure = Some(error.clone());
        }
        match reduce(&graph, GraphAction::ApplyExecutionEvent(event)) {
            Ok(next) => graph = next,
            Err(e) => debug!(error = %e, "event not applied"),
        }
    }

    match failure {
        Some(error) => Err(CliError::ExecutionFailed {
            execution_id: started.execution_id.to_string(),
            error,
        }
        .into()),
        None => Ok(()),
    }
}

#[instrument(skip(config))]
pub async fn history(config: &CliConfig, flow_id: &FlowId) -> CommandResult {
    let runner = RunnerClient::new(&config.services, session(config)?).map_err(service)?;
    let executions = runner.executions(flow_id).await.map_err(service)?;
    print!("{}", render_history(&executions));
    Ok(())
}

#[instrument(skip(config, password))]
pub async fn login(config: &CliConfig, email: &str, password: &str) -> CommandResult {
    let auth = AuthClient::new(&config.services, session(config)?).map_err(service)?;
    let profile = auth.login(email, password).await.map_err(service)?;
    println!("Signed in as {}.", profile.name.as_deref().unwrap_or(&profile.email));
    Ok(())
}

pub fn logout(config: &CliConfig) -> CommandResult {
    let auth = AuthClient::new(&config.services, session(config)?).map_err(service)?;
    auth.logout().map_err(service)?;
    println!("Signed out.");
    Ok(())
}

async fn open_editor(
    config: &CliConfig,
    flow_id: &FlowId,
) -> classflow_core::Result<(EditorSession, broadcast::Receiver<Notice>), CliError> {
    let store = Arc::new(FlowClient::new(&config.services, session(config)?).map_err(service)?);
    let editor = EditorSession::open(store, flow_id, &config.autosave)
        .await
        .map_err(|e| CliError::Service {
            details: e.to_string(),
        })?;
    let notices = editor.subscribe_notices();
    Ok((editor, notices))
}

/// Closes the editor, saving pending changes, and reports what went wrong.
async fn finish(editor: EditorSession, mut notices: broadcast::Receiver<Notice>) -> CommandResult {
    editor.close().await;

    let mut failure = None;
    while let Ok(notice) = notices.try_recv() {
        match notice.level {
            NoticeLevel::Error => failure = Some(notice.message),
            NoticeLevel::Warning => eprintln!("warning: {}", notice.message),
            NoticeLevel::Info | NoticeLevel::Success => {
                debug!(message = %notice.message, "notice");
            }
        }
    }

    match failure {
        Some(message) => Err(CliError::SaveFailed { message }.into()),
        None => Ok(()),
    }
}

fn label(graph: &GraphState, id: &NodeId) -> String {
    graph
        .node(id)
        .map_or_else(|| id.to_string(), |n| n.data.label.clone())
}

fn render_activity(graph: &GraphState) -> String {
    let activity = graph.activity();
    match activity.first_node_id {
        Some(first) => format!("Active: yes, starts at {}", label(graph, &first)),
        None => "Active: no, connect the Start node to a step".to_string(),
    }
}

fn render_ids(graph: &GraphState, ids: &[NodeId]) -> String {
    if ids.is_empty() {
        return "none".to_string();
    }
    ids.iter()
        .map(|id| label(graph, id))
        .collect::<Vec<_>>()
        .join(", ")
}

pub(crate) fn render_analysis(graph: &GraphState, analysis: &GraphAnalysis) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "Nodes: {}  Edges: {}",
        graph.node_count(),
        graph.edge_count()
    );
    let _ = writeln!(out, "{}", render_activity(graph));
    let _ = writeln!(out, "Disconnected: {}", render_ids(graph, &analysis.disconnected));
    let _ = writeln!(out, "Unconfigured: {}", render_ids(graph, &analysis.unconfigured));
    let _ = writeln!(out, "Cycle: {}", if analysis.has_cycle { "yes" } else { "no" });
    for dangling in &analysis.dangling_references {
        let _ = writeln!(
            out,
            "Dangling reference: {}.{} points at missing node {}",
            label(graph, &dangling.node_id),
            dangling.parameter,
            dangling.missing
        );
    }
    for repair in &analysis.repairs {
        let _ = writeln!(out, "Dropped: {repair}");
    }
    let verdict = if analysis.is_runnable() {
        "Ready to run."
    } else {
        "Not ready to run."
    };
    let _ = writeln!(out, "{verdict}");
    out
}

pub(crate) fn describe_event(graph: &GraphState, event: &ExecutionEvent) -> String {
    match event {
        ExecutionEvent::ExecutionStarted { execution_id } => {
            format!("execution {execution_id} started")
        }
        ExecutionEvent::NodeStarted { node_id, .. } => {
            format!("  started    {}", label(graph, node_id))
        }
        ExecutionEvent::NodeCompleted { node_id, .. } => {
            format!("  completed  {}", label(graph, node_id))
        }
        ExecutionEvent::NodeFailed { node_id, error, .. } => {
            format!("  failed     {}: {error}", label(graph, node_id))
        }
        ExecutionEvent::Log {
            node_id, message, ..
        } => {
            let source = node_id
                .as_ref()
                .map_or_else(|| "-".to_string(), |id| label(graph, id));
            format!("  log        {source}: {message}")
        }
        ExecutionEvent::ExecutionCompleted { .. } => "execution completed".to_string(),
        ExecutionEvent::ExecutionFailed { error, .. } => format!("execution failed: {error}"),
    }
}

pub(crate) fn render_history(executions: &[ExecutionSummary]) -> String {
    if executions.is_empty() {
        return "No executions yet.\n".to_string();
    }
    let mut out = String::new();
    for execution in executions {
        let started = execution
            .started_at
            .map_or_else(|| "-".to_string(), |t| t.format("%Y-%m-%d %H:%M").to_string());
        let _ = write!(out, "{}  {:<9}  {started}", execution.id, execution.status.to_string());
        if let Some(error) = &execution.error {
            let _ = write!(out, "  {error}");
        }
        out.push('\n');
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use classflow_graph::{Node, NodeCategory};
    use std::io::Write as _;

    fn graph_with(ids: &[&str]) -> GraphState {
        ids.iter().fold(GraphState::new(), |graph, id| {
            let node = Node::with_id(NodeId::from(*id), NodeCategory::Action, id.to_uppercase())
                .configured();
            reduce(&graph, GraphAction::AddNode(node)).expect("add")
        })
    }

    fn connected(graph: &GraphState, source: &str, target: &str) -> GraphState {
        reduce(graph, GraphAction::AddEdge(ProposedEdge::new(source, target))).expect("connect")
    }

    #[test]
    fn analysis_reports_disconnected_nodes() {
        let graph = connected(&graph_with(&["a", "b"]), "start-node", "a");
        let report = render_analysis(&graph, &graph.analyze());
        assert!(report.contains("Nodes: 3  Edges: 1"));
        assert!(report.contains("Active: yes, starts at A"));
        assert!(report.contains("Disconnected: B"));
    }

    #[test]
    fn inactive_flow_is_not_ready() {
        let graph = graph_with(&["a"]);
        let report = render_analysis(&graph, &graph.analyze());
        assert!(report.contains("Active: no"));
        assert!(report.ends_with("Not ready to run.\n"));
    }

    #[test]
    fn check_accepts_a_runnable_file() {
        let graph = connected(&graph_with(&["a"]), "start-node", "a");
        let mut file = tempfile::NamedTempFile::new().expect("temp file");
        file.write_all(graph.to_json().expect("json").as_bytes())
            .expect("write");
        check(file.path()).expect("runnable");
    }

    #[test]
    fn check_reports_edges_dropped_while_loading() {
        let json = serde_json::json!({
            "nodes": [
                {"id": "start-node", "type": "start", "data": {"label": "Start", "category": "start"}},
                {"id": "a", "type": "workflowNode", "data": {"label": "A", "category": "action", "configured": true}},
                {"id": "b", "type": "workflowNode", "data": {"label": "B", "category": "action", "configured": true}}
            ],
            "edges": [
                {"id": "e1", "source": "start-node", "target": "a"},
                {"id": "e2", "source": "a", "target": "start-node"},
                {"id": "e3", "source": "b", "target": "a"},
                {"id": "e4", "source": "a", "target": "a"}
            ]
        });
        let (graph, repairs) =
            GraphState::parse_with_repairs(&json.to_string()).expect("parse");
        let analysis = graph.analyze().with_repairs(repairs);
        let report = render_analysis(&graph, &analysis);
        assert!(report.contains("Dropped: edge e2: start node cannot receive input"));
        assert!(report.contains("Dropped: edge e3: node a already has an input connection"));
        assert!(report.contains("Dropped: edge e4:"));
        assert!(report.ends_with("Not ready to run.\n"));

        let mut file = tempfile::NamedTempFile::new().expect("temp file");
        file.write_all(json.to_string().as_bytes()).expect("write");
        let err = check(file.path()).expect_err("should fail");
        assert!(err.to_string().contains("not ready to run"));
    }

    #[test]
    fn check_rejects_unparseable_files() {
        let mut file = tempfile::NamedTempFile::new().expect("temp file");
        file.write_all(b"{ not a graph").expect("write");
        let err = check(file.path()).expect_err("should fail");
        assert!(err.to_string().contains(&file.path().display().to_string()));
    }

    #[test]
    fn events_are_described_with_node_labels() {
        let graph = graph_with(&["a"]);
        let event: ExecutionEvent = serde_json::from_str(
            r#"{"event":"node:failed","data":{"executionId":"exec_1","nodeId":"a","error":"smtp down"}}"#,
        )
        .expect("event");
        assert_eq!(describe_event(&graph, &event), "  failed     A: smtp down");

        let log: ExecutionEvent = serde_json::from_str(
            r#"{"event":"log","data":{"executionId":"exec_1","message":"hello"}}"#,
        )
        .expect("event");
        assert_eq!(describe_event(&graph, &log), "  log        -: hello");
    }

    #[test]
    fn history_lists_executions() {
        assert_eq!(render_history(&[]), "No executions yet.\n");

        let executions: Vec<ExecutionSummary> = serde_json::from_str(
            r#"[{"id":"exec_2","status":"failed","startedAt":"2026-03-02T09:30:00Z","error":"timeout"},
                {"id":"exec_1","status":"completed"}]"#,
        )
        .expect("executions");
        let rendered = render_history(&executions);
        let lines: Vec<&str> = rendered.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].starts_with("exec_2  failed"));
        assert!(lines[0].contains("2026-03-02 09:30"));
        assert!(lines[0].ends_with("timeout"));
        assert!(lines[1].ends_with("-"));
    }
}
