//! The open flow.
//!
//! An [`EditorSession`] owns the flow record and graph being edited. Every
//! change goes through [`EditorSession::dispatch`], which runs the reducer,
//! reports refusals as notices and hands persistent changes to autosave.

use crate::autosave::{Autosave, SaveState};
use crate::config::AutosaveConfig;
use crate::error::EditorError;
use crate::notice::{self, NOTICE_CAPACITY, Notice};
use classflow_client::{FlowRecord, FlowStore};
use classflow_core::FlowId;
use classflow_graph::template::{self, Template};
use classflow_graph::{
    ActionRejected, ConnectionRejection, ExecutionEvent, FlowActivity, GraphAction, GraphState,
    NodeId, ProposedEdge, reduce,
};
use rootcause::Report;
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::{debug, info, instrument, warn};

/// What happened to a template request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TemplateOutcome {
    /// The graph was replaced.
    Applied,
    /// The canvas has work on it; ask before replacing it.
    NeedsConfirmation,
}

pub struct EditorSession {
    flow: FlowRecord,
    graph: GraphState,
    store: Arc<dyn FlowStore>,
    autosave: Autosave,
    notices: broadcast::Sender<Notice>,
}

impl EditorSession {
    /// Loads a flow and starts its autosave scheduler.
    ///
    /// A stored graph that cannot be parsed opens as a start-only graph.
    ///
    /// # Errors
    ///
    /// Returns an error if the flow cannot be fetched.
    #[instrument(skip(store, config))]
    pub async fn open(
        store: Arc<dyn FlowStore>,
        flow_id: &FlowId,
        config: &AutosaveConfig,
    ) -> Result<Self, Report<EditorError>> {
        let flow = store
            .load_flow(flow_id)
            .await
            .map_err(|e| EditorError::LoadFailed {
                flow_id: flow_id.clone(),
                reason: e.to_string(),
            })?;
        let graph = flow.graph();

        let (notices, _) = broadcast::channel(NOTICE_CAPACITY);
        let autosave = Autosave::spawn(store.clone(), config.debounce(), notices.clone());

        info!(
            %flow_id,
            nodes = graph.node_count(),
            edges = graph.edge_count(),
            is_active = graph.activity().is_active,
            "opened flow"
        );

        Ok(Self {
            flow,
            graph,
            store,
            autosave,
            notices,
        })
    }

    #[must_use]
    pub fn graph(&self) -> &GraphState {
        &self.graph
    }

    /// The flow record as last loaded, with `is_active` kept current.
    #[must_use]
    pub fn flow(&self) -> &FlowRecord {
        &self.flow
    }

    #[must_use]
    pub fn activity(&self) -> FlowActivity {
        self.graph.activity()
    }

    /// Applies a canvas action.
    ///
    /// # Errors
    ///
    /// Returns why the action was refused. A warning notice carrying the
    /// same reason has already been published and the graph is unchanged.
    pub fn dispatch(&mut self, action: GraphAction) -> Result<(), ActionRejected> {
        let persistent = action.is_persistent();
        match reduce(&self.graph, action) {
            Ok(next) => {
                let changed = next != self.graph;
                self.graph = next;
                if persistent && changed {
                    self.flow.is_active = self.graph.activity().is_active;
                    self.schedule_save();
                }
                Ok(())
            }
            Err(rejection) => {
                debug!(%rejection, "action refused");
                notice::publish(&self.notices, Notice::warning(rejection.user_message()));
                Err(rejection)
            }
        }
    }

    fn schedule_save(&self) {
        match self.autosave.submit(self.flow.clone(), self.graph.clone()) {
            Ok(version) => debug!(version, "queued autosave"),
            Err(e) => {
                warn!(flow_id = %self.flow.id, error = %e, "could not queue autosave");
                notice::publish(&self.notices, Notice::error("Changes are no longer being saved."));
            }
        }
    }

    /// Asks whether `proposed` would be accepted, without changing anything.
    ///
    /// # Errors
    ///
    /// Returns the rule the edge breaks.
    pub fn check_connection(&self, proposed: &ProposedEdge) -> Result<(), ConnectionRejection> {
        self.graph.check_connection(proposed)
    }

    /// Preview check while dragging onto `target`. `source` is unknown
    /// when the drag started from an input handle.
    ///
    /// # Errors
    ///
    /// Returns the rule the edge would break.
    pub fn check_live(
        &self,
        source: Option<&NodeId>,
        target: &NodeId,
    ) -> Result<(), ConnectionRejection> {
        self.graph.check_live(source, target)
    }

    /// Replaces the graph with `template`.
    ///
    /// When the canvas already has user nodes and `confirmed` is false,
    /// nothing changes and [`TemplateOutcome::NeedsConfirmation`] is
    /// returned.
    ///
    /// # Errors
    ///
    /// Returns an error if the reducer refuses the template.
    pub fn apply_template(
        &mut self,
        template: &Template,
        confirmed: bool,
    ) -> Result<TemplateOutcome, ActionRejected> {
        if self.graph.has_user_content() && !confirmed {
            return Ok(TemplateOutcome::NeedsConfirmation);
        }
        self.dispatch(GraphAction::ApplyTemplate {
            template: template.clone(),
            suffix: template::timestamp_suffix(),
        })?;
        info!(template = %template.id, nodes = self.graph.node_count(), "applied template");
        notice::publish(
            &self.notices,
            Notice::success(format!("Applied the {} template.", template.name)),
        );
        Ok(TemplateOutcome::Applied)
    }

    /// Shows a runner event on the canvas. Never saved.
    pub fn apply_execution_event(&mut self, event: ExecutionEvent) {
        if let Err(e) = self.dispatch(GraphAction::ApplyExecutionEvent(event)) {
            debug!(error = %e, "execution event not applied");
        }
    }

    /// Replaces the open graph with the stored one.
    ///
    /// The stored graph bypasses [`Self::dispatch`], so loading it never
    /// schedules a save.
    ///
    /// # Errors
    ///
    /// Returns an error if the flow cannot be fetched. The open graph is
    /// kept.
    #[instrument(skip(self), fields(flow_id = %self.flow.id))]
    pub async fn reload(&mut self) -> Result<(), Report<EditorError>> {
        match self.store.load_flow(&self.flow.id).await {
            Ok(flow) => {
                self.graph = flow.graph();
                self.flow = flow;
                debug!(nodes = self.graph.node_count(), "reloaded flow");
                Ok(())
            }
            Err(e) => {
                warn!(error = %e, "reload failed");
                notice::publish(&self.notices, Notice::error("Couldn't reload this flow."));
                Err(EditorError::LoadFailed {
                    flow_id: self.flow.id.clone(),
                    reason: e.to_string(),
                }
                .into())
            }
        }
    }

    /// Listens for notices published from now on.
    #[must_use]
    pub fn subscribe_notices(&self) -> broadcast::Receiver<Notice> {
        self.notices.subscribe()
    }

    #[must_use]
    pub fn is_saving(&self) -> bool {
        self.autosave.is_saving()
    }

    #[must_use]
    pub fn save_state(&self) -> SaveState {
        self.autosave.state()
    }

    /// Saves pending changes now.
    ///
    /// # Errors
    ///
    /// Returns an error if autosave has stopped.
    pub async fn flush(&self) -> Result<(), Report<EditorError>> {
        self.autosave.flush().await?;
        Ok(())
    }

    /// Saves pending changes and stops autosave.
    pub async fn close(self) {
        self.autosave.shutdown().await;
        debug!(flow_id = %self.flow.id, "closed flow");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::autosave::testing::{MemoryStore, flow};
    use crate::notice::NoticeLevel;
    use classflow_graph::{Node, NodeCategory, NodeStatus, Position};
    use std::time::Duration;
    use tokio::time::sleep;

    const SETTLE: Duration = Duration::from_secs(3);

    fn flow_id() -> FlowId {
        "flow_1".parse().expect("flow id")
    }

    async fn open_with(record: FlowRecord) -> (EditorSession, Arc<MemoryStore>) {
        let store = Arc::new(MemoryStore::with_flow(record));
        let session = EditorSession::open(store.clone(), &flow_id(), &AutosaveConfig::default())
            .await
            .expect("open");
        (session, store)
    }

    fn action(id: &str) -> Node {
        Node::with_id(NodeId::from(id), NodeCategory::Action, id)
    }

    #[tokio::test(start_paused = true)]
    async fn malformed_graph_opens_as_start_only() {
        let mut record = flow("broken");
        record.react_flow_data = Some("{not json".to_string());
        let (session, _store) = open_with(record).await;

        assert_eq!(session.graph().node_count(), 1);
        assert!(session.graph().start_node().is_some());
        assert!(!session.activity().is_active);
    }

    #[tokio::test(start_paused = true)]
    async fn missing_flow_fails_to_open() {
        let store = Arc::new(MemoryStore::default());
        let result =
            EditorSession::open(store, &flow_id(), &AutosaveConfig::default()).await;
        let err = result.err().expect("should fail");
        assert!(err.to_string().contains("failed to load flow flow_1"));
    }

    #[tokio::test(start_paused = true)]
    async fn connecting_saves_once_after_the_quiet_period() {
        let (mut session, store) = open_with(flow("grades")).await;

        session.dispatch(GraphAction::AddNode(action("a"))).expect("add");
        session
            .dispatch(GraphAction::AddEdge(ProposedEdge::new("start-node", "a")))
            .expect("connect");
        assert!(session.flow().is_active);
        assert!(store.saved().is_empty());

        sleep(SETTLE).await;
        let saved = store.saved();
        assert_eq!(saved.len(), 1);
        assert!(saved[0].is_active);
        let stored = saved[0].graph();
        assert_eq!(stored.edge_count(), 1);
        assert_eq!(stored.activity().first_node_id, Some(NodeId::from("a")));
    }

    #[tokio::test(start_paused = true)]
    async fn refused_action_warns_and_does_not_save() {
        let (mut session, store) = open_with(flow("grades")).await;
        let mut notices = session.subscribe_notices();

        let err = session
            .dispatch(GraphAction::AddEdge(ProposedEdge::new("start-node", "start-node")))
            .expect_err("self connection");
        assert!(matches!(err, ActionRejected::Connection(_)));

        let notice = notices.try_recv().expect("notice");
        assert_eq!(notice.level, NoticeLevel::Warning);
        assert_eq!(notice.message, err.user_message());

        sleep(SETTLE).await;
        assert!(store.saved().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn deleting_start_changes_nothing() {
        let (mut session, store) = open_with(flow("grades")).await;

        session
            .dispatch(GraphAction::DeleteNode(NodeId::start()))
            .expect("ignored");
        assert!(session.graph().start_node().is_some());

        sleep(SETTLE).await;
        assert!(store.saved().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn previews_refuse_start_as_target() {
        let (mut session, _store) = open_with(flow("grades")).await;
        session.dispatch(GraphAction::AddNode(action("a"))).expect("add");

        assert_eq!(
            session.check_live(Some(&NodeId::from("a")), &NodeId::start()),
            Err(ConnectionRejection::StartNodeInput)
        );
        assert!(session.check_live(None, &NodeId::from("a")).is_ok());
        assert!(session
            .check_connection(&ProposedEdge::new("start-node", "a"))
            .is_ok());
    }

    #[tokio::test(start_paused = true)]
    async fn moving_a_node_is_saved() {
        let (mut session, store) = open_with(flow("grades")).await;

        session
            .dispatch(GraphAction::MoveNode {
                id: NodeId::start(),
                position: Position { x: 10.0, y: 20.0 },
            })
            .expect("move");
        sleep(SETTLE).await;
        assert_eq!(store.saved().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn execution_events_update_status_without_saving() {
        let (mut session, store) = open_with(flow("grades")).await;
        session.dispatch(GraphAction::AddNode(action("a"))).expect("add");
        session.flush().await.expect("flush");
        assert_eq!(store.saved().len(), 1);

        let event: ExecutionEvent = serde_json::from_str(
            r#"{"event":"node:started","data":{"executionId":"exec_1","nodeId":"a"}}"#,
        )
        .expect("event");
        session.apply_execution_event(event);

        let node = session.graph().node(&NodeId::from("a")).expect("node");
        assert_eq!(node.data.status, NodeStatus::Running);
        sleep(SETTLE).await;
        assert_eq!(store.saved().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn template_over_existing_work_needs_confirmation() {
        let (mut session, store) = open_with(flow("grades")).await;
        let welcome = template::find("student-welcome").expect("template");

        assert_eq!(
            session.apply_template(&welcome, false).expect("apply"),
            TemplateOutcome::Applied
        );
        assert!(session.activity().is_active);
        let nodes = session.graph().node_count();

        let alert = template::find("grade-alert").expect("template");
        assert_eq!(
            session.apply_template(&alert, false).expect("apply"),
            TemplateOutcome::NeedsConfirmation
        );
        assert_eq!(session.graph().node_count(), nodes);

        assert_eq!(
            session.apply_template(&alert, true).expect("apply"),
            TemplateOutcome::Applied
        );
        assert_eq!(session.graph().node_count(), alert.nodes.len());

        sleep(SETTLE).await;
        assert_eq!(store.saved().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn reload_replaces_the_graph_without_saving() {
        let (mut session, store) = open_with(flow("grades")).await;

        let mut updated = flow("grades");
        let graph = classflow_graph::reduce(&GraphState::new(), GraphAction::AddNode(action("b")))
            .expect("add");
        updated.set_graph(&graph).expect("serialize");
        store.insert(updated);

        session.reload().await.expect("reload");
        assert!(session.graph().node(&NodeId::from("b")).is_some());

        sleep(SETTLE).await;
        assert!(store.saved().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn edits_after_reload_build_on_the_stored_graph() {
        let (mut session, store) = open_with(flow("grades")).await;

        let mut updated = flow("grades");
        let graph = classflow_graph::reduce(&GraphState::new(), GraphAction::AddNode(action("b")))
            .expect("add");
        updated.set_graph(&graph).expect("serialize");
        store.insert(updated);
        session.reload().await.expect("reload");

        session
            .dispatch(GraphAction::AddEdge(ProposedEdge::new("start-node", "b")))
            .expect("connect");
        sleep(SETTLE).await;

        let saved = store.saved();
        assert_eq!(saved.len(), 1);
        let stored = saved[0].graph();
        assert_eq!(stored.node_count(), 2);
        assert_eq!(stored.activity().first_node_id, Some(NodeId::from("b")));
    }

    #[tokio::test(start_paused = true)]
    async fn close_saves_pending_changes() {
        let (mut session, store) = open_with(flow("grades")).await;
        session.dispatch(GraphAction::AddNode(action("a"))).expect("add");
        session.close().await;
        assert_eq!(store.saved().len(), 1);
    }
}
