//! The canvas client engine.
//!
//! [`CanvasEngine`] owns the local collection, the interaction session and
//! the presence list, and drives them against a [`CanvasServer`]. Every
//! change to local state goes through one read-modify-write function; no
//! `RefCell` borrow is held across an `.await`, so operations of the same
//! engine can run concurrently on one thread.

use crate::collection::ShapeCollection;
use crate::commands::to_edits;
use crate::config::EngineConfig;
use crate::diagnostics::Diagnostics;
use crate::error::{CommandError, EditError, SyncError, SyncResult};
use crate::identity::UserId;
use crate::interaction::{Effect, InteractionSession, InteractionState, ToolKind};
use crate::pipeline::{Edit, EditPolicy, apply_batch};
use crate::reconcile::{MergeContext, adopt, merge};
use crate::server::CanvasServer;
use crate::shapes::{Geometry, ShapeId};
use crate::timers::{Instant, IntervalTimer};
use crate::viewport::Viewport;
use crate::wire::{AiCommand, AiRequest, CanvasState, OnlineUser};
use kurbo::Point;
use std::cell::{Cell, RefCell};
use std::collections::HashMap;

/// What happened to a batch of edits or agent commands.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BatchReport {
    /// Shapes changed locally, in the order they were first touched.
    pub changed: Vec<ShapeId>,
    /// Commands or edits that were skipped.
    pub skipped: Vec<CommandError>,
    /// Why the push failed, if it did. The local update stands regardless.
    pub push: Option<SyncError>,
}

impl BatchReport {
    fn torn_down() -> Self {
        Self {
            push: Some(SyncError::TornDown),
            ..Self::default()
        }
    }
}

/// The agent's answer and what applying its commands did.
#[derive(Debug, Clone, PartialEq)]
pub struct AgentReply {
    pub message: String,
    pub reasoning: Option<String>,
    pub report: BatchReport,
}

/// Which timers ran during a [`CanvasEngine::tick`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TickReport {
    pub polled: bool,
    pub heartbeat: bool,
}

#[derive(Debug)]
struct EngineState {
    shapes: ShapeCollection,
    session: InteractionSession,
    /// Pending pushes per shape.
    claims: HashMap<ShapeId, usize>,
    online: Vec<OnlineUser>,
}

#[derive(Debug)]
struct Timers {
    poll: IntervalTimer,
    heartbeat: IntervalTimer,
}

/// Stateful canvas client for one user.
pub struct CanvasEngine<S: CanvasServer> {
    server: S,
    identity: UserId,
    config: EngineConfig,
    diagnostics: Diagnostics,
    state: RefCell<EngineState>,
    timers: RefCell<Timers>,
    torn_down: Cell<bool>,
}

impl<S: CanvasServer> CanvasEngine<S> {
    pub fn new(server: S, config: EngineConfig) -> Self {
        let identity = config.resolve_identity();
        let session = InteractionSession::new(identity.clone(), &config);
        let timers = Timers {
            poll: IntervalTimer::new(config.poll_interval()),
            heartbeat: IntervalTimer::new(config.heartbeat_interval()),
        };
        Self {
            server,
            diagnostics: Diagnostics::new(config.diagnostics.clone()),
            identity,
            config,
            state: RefCell::new(EngineState {
                shapes: ShapeCollection::new(),
                session,
                claims: HashMap::new(),
                online: Vec::new(),
            }),
            timers: RefCell::new(timers),
            torn_down: Cell::new(false),
        }
    }

    pub fn server(&self) -> &S {
        &self.server
    }

    pub fn identity(&self) -> &str {
        &self.identity
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Snapshot of the local collection.
    pub fn shapes(&self) -> ShapeCollection {
        self.state.borrow().shapes.clone()
    }

    pub fn interaction_state(&self) -> InteractionState {
        self.state.borrow().session.state()
    }

    pub fn armed_tool(&self) -> Option<ToolKind> {
        self.state.borrow().session.armed_tool()
    }

    pub fn move_mode(&self) -> bool {
        self.state.borrow().session.move_mode()
    }

    pub fn viewport(&self) -> Viewport {
        self.state.borrow().session.viewport.clone()
    }

    /// Users reported online by the last successful heartbeat.
    pub fn online_users(&self) -> Vec<OnlineUser> {
        self.state.borrow().online.clone()
    }

    /// Shapes with a push in flight.
    pub fn pending_writes(&self) -> Vec<ShapeId> {
        self.state.borrow().claims.keys().copied().collect()
    }

    pub fn is_torn_down(&self) -> bool {
        self.torn_down.get()
    }

    /// Start the poll and heartbeat timers.
    pub fn start(&self, now: Instant) {
        let mut timers = self.timers.borrow_mut();
        timers.poll.start(now);
        timers.heartbeat.start(now);
    }

    /// Run whichever timers are due at `now`.
    pub async fn tick(&self, now: Instant) -> TickReport {
        let report = {
            let mut timers = self.timers.borrow_mut();
            TickReport {
                polled: timers.poll.fire_if_due(now),
                heartbeat: timers.heartbeat.fire_if_due(now),
            }
        };
        // Failures are already reported; the next due tick retries.
        if report.polled && self.on_poll_tick().await.is_err() {
            self.diagnostics.debug("poll missed, retrying on next interval");
        }
        if report.heartbeat && self.heartbeat().await.is_err() {
            self.diagnostics
                .debug("heartbeat missed, retrying on next interval");
        }
        report
    }

    /// Cancel both timers. Completions still in flight are ignored.
    pub fn teardown(&self) {
        let mut timers = self.timers.borrow_mut();
        timers.poll.cancel();
        timers.heartbeat.cancel();
        self.torn_down.set(true);
        self.diagnostics.info("engine torn down");
    }

    /// Initial load: adopt the server collection wholesale.
    pub async fn load(&self) -> SyncResult<()> {
        self.ensure_live()?;
        let fetched = self.server.fetch().await;
        let server = self.completed("load", fetched)?;
        self.update(|state| state.shapes = adopt(&server));
        self.diagnostics
            .info(format!("loaded {} shapes", server.len()));
        Ok(())
    }

    /// Discard all server data, then adopt what the server holds afterwards.
    /// Local-only shapes are dropped.
    pub async fn reset(&self) -> SyncResult<()> {
        self.ensure_live()?;
        let result = self.server.reset().await;
        self.completed("reset", result)?;
        let fetched = self.server.fetch().await;
        let server = self.completed("reset", fetched)?;
        self.update(|state| state.shapes = adopt(&server));
        self.diagnostics.info("canvas reset");
        Ok(())
    }

    /// Fetch and merge into local state.
    pub async fn on_poll_tick(&self) -> SyncResult<()> {
        self.ensure_live()?;
        let fetched = self.server.fetch().await;
        let server = self.completed("poll", fetched)?;
        self.update(|state| {
            let ctx = merge_context(&self.identity, state);
            let merged = merge(&state.shapes, &server, &ctx);
            self.report_kind_conflicts(&merged.kind_conflicts);
            state.shapes = merged.shapes;
        });
        Ok(())
    }

    /// Report the local user as online and store who else is.
    pub async fn heartbeat(&self) -> SyncResult<Vec<OnlineUser>> {
        self.ensure_live()?;
        let result = self.server.heartbeat(&self.identity).await;
        let online = self.completed("heartbeat", result)?;
        self.update(|state| state.online = online.clone());
        Ok(online)
    }

    /// Apply edits from the local user and push what changed.
    pub async fn apply_local_edits(&self, edits: Vec<Edit>) -> BatchReport {
        if self.ensure_live().is_err() {
            return BatchReport::torn_down();
        }
        let policy = EditPolicy::local(&self.identity, self.config.min_extent);
        self.apply_and_push(edits, &policy, Vec::new()).await
    }

    /// Apply an agent command batch. Unsupported or invalid commands are
    /// skipped; the valid subset applies as one update and is pushed.
    pub async fn apply_command_batch(&self, commands: &[AiCommand]) -> BatchReport {
        if self.ensure_live().is_err() {
            return BatchReport::torn_down();
        }
        let (edits, skipped) =
            to_edits(commands, &self.config.placement, self.config.min_extent);
        for err in &skipped {
            self.diagnostics.warn(format!("skipped agent command: {err}"));
        }
        let policy = EditPolicy::agent(&self.identity, self.config.min_extent);
        self.apply_and_push(edits, &policy, skipped).await
    }

    /// Send `message` to the agent with the current canvas state and apply
    /// the commands it answers with.
    pub async fn ask_agent(&self, message: impl Into<String>) -> SyncResult<AgentReply> {
        self.ensure_live()?;
        let request = {
            let state = self.state.borrow();
            AiRequest {
                user: self.identity.clone(),
                message: message.into(),
                canvas_state: CanvasState {
                    shapes: state.shapes.clone(),
                    viewport: state.session.viewport.state(),
                },
            }
        };
        let result = self.server.chat(&request).await;
        let response = self.completed("agent request", result)?;
        if let Some(reasoning) = &response.reasoning {
            self.diagnostics.debug(format!("agent reasoning: {reasoning}"));
        }
        let report = self.apply_command_batch(&response.commands).await;
        Ok(AgentReply {
            message: response.message,
            reasoning: response.reasoning,
            report,
        })
    }

    pub async fn pointer_down(&self, screen: Point) {
        let effects = self.update(|state| state.session.pointer_down(screen, &state.shapes));
        self.perform(effects).await;
    }

    pub async fn pointer_move(&self, screen: Point) {
        let effects = self.update(|state| state.session.pointer_move(screen));
        self.perform(effects).await;
    }

    pub async fn pointer_up(&self, screen: Point) {
        let effects = self.update(|state| state.session.pointer_up(screen));
        self.perform(effects).await;
    }

    pub async fn double_click(&self, screen: Point) {
        let effects = self.update(|state| state.session.double_click(screen, &state.shapes));
        self.perform(effects).await;
    }

    /// Arm `tool`, or disarm it if already armed.
    pub async fn toggle_tool(&self, tool: ToolKind) {
        let effects = self.update(|state| state.session.toggle_tool(tool));
        self.perform(effects).await;
    }

    pub fn toggle_move_mode(&self) {
        self.update(|state| state.session.toggle_move_mode());
    }

    pub fn escape(&self) {
        self.update(|state| state.session.escape());
    }

    /// Replace the body of the text being edited. Local until committed.
    pub fn type_text(&self, body: impl Into<String>) {
        let effect = self.update(|state| state.session.type_text(body));
        if let Some(Effect::Preview(edit)) = effect {
            self.preview(edit);
        }
    }

    /// Push the text being edited and leave edit mode once acknowledged.
    pub async fn finish_text_edit(&self) -> SyncResult<()> {
        let effect = self.update(|state| state.session.finish_text_edit());
        match effect {
            Some(Effect::CommitText(id)) => self.commit_text(id).await,
            _ => Ok(()),
        }
    }

    pub fn wheel(&self, screen: Point, delta_y: f64) {
        self.update(|state| state.session.viewport.wheel(screen, delta_y));
    }

    pub fn zoom_in(&self) {
        self.update(|state| state.session.viewport.zoom_in());
    }

    pub fn zoom_out(&self) {
        self.update(|state| state.session.viewport.zoom_out());
    }

    pub fn reset_view(&self) {
        self.update(|state| state.session.viewport.reset());
    }

    /// The one place local state is modified.
    fn update<R>(&self, f: impl FnOnce(&mut EngineState) -> R) -> R {
        let mut state = self.state.borrow_mut();
        f(&mut state)
    }

    async fn perform(&self, effects: Vec<Effect>) {
        for effect in effects {
            match effect {
                Effect::Preview(edit) => self.preview(edit),
                Effect::Commit(edits) => {
                    self.apply_local_edits(edits).await;
                }
                Effect::CommitGesture { id, geometry } => {
                    if let Err(err) = self.commit_gesture(id, geometry).await {
                        self.diagnostics
                            .debug(format!("shape {id} not pushed: {err}"));
                    }
                }
                Effect::CommitText(id) => {
                    if let Err(err) = self.commit_text(id).await {
                        self.diagnostics
                            .debug(format!("text of {id} not pushed: {err}"));
                    }
                }
                Effect::Blocked { id, owner } => {
                    self.diagnostics
                        .debug(format!("shape {id} is selected by {owner}"));
                }
            }
        }
    }

    /// Apply an edit locally without pushing.
    fn preview(&self, edit: Edit) {
        let policy = EditPolicy::local(&self.identity, self.config.min_extent);
        let rejected = self.update(|state| {
            let outcome = apply_batch(&state.shapes, [edit], &policy);
            state.shapes = outcome.shapes;
            outcome.rejected
        });
        for err in rejected {
            self.diagnostics.debug(format!("preview dropped: {err}"));
        }
    }

    /// Settle a drag or resize at `geometry` and push the shape. Previews
    /// usually left it there already, so the push does not depend on a
    /// local change.
    async fn commit_gesture(&self, id: ShapeId, geometry: Geometry) -> SyncResult<()> {
        self.ensure_live()?;
        let policy = EditPolicy::local(&self.identity, self.config.min_extent);
        let rejected = self.update(|state| {
            let edit = Edit::SetGeometry { id, geometry };
            let outcome = apply_batch(&state.shapes, [edit], &policy);
            state.shapes = outcome.shapes;
            outcome.rejected
        });
        if let Some(err) = rejected.first() {
            self.diagnostics.debug(format!("gesture dropped: {err}"));
            return Ok(());
        }
        self.push_changes(vec![id]).await
    }

    async fn commit_text(&self, id: ShapeId) -> SyncResult<()> {
        self.push_changes(vec![id]).await?;
        self.update(|state| state.session.clear_text_edit(id));
        Ok(())
    }

    async fn apply_and_push(
        &self,
        edits: Vec<Edit>,
        policy: &EditPolicy<'_>,
        mut skipped: Vec<CommandError>,
    ) -> BatchReport {
        let outcome = self.update(|state| {
            let outcome = apply_batch(&state.shapes, edits, policy);
            state.shapes = outcome.shapes.clone();
            outcome
        });

        for err in &outcome.rejected {
            match err {
                EditError::SelectionConflict { .. } => {
                    self.diagnostics.debug(format!("edit skipped: {err}"))
                }
                _ => self.diagnostics.warn(format!("edit rejected: {err}")),
            }
        }
        skipped.extend(outcome.rejected.into_iter().map(CommandError::Rejected));

        let push = if outcome.changed.is_empty() {
            None
        } else {
            self.push_changes(outcome.changed.clone()).await.err()
        };

        BatchReport {
            changed: outcome.changed,
            skipped,
            push,
        }
    }

    /// Push the local versions of `ids`, merged into a fresh server copy.
    ///
    /// The ids stay claimed while the push is in flight so that polls do
    /// not revert them.
    async fn push_changes(&self, ids: Vec<ShapeId>) -> SyncResult<()> {
        self.ensure_live()?;
        self.update(|state| {
            for id in &ids {
                *state.claims.entry(*id).or_insert(0) += 1;
            }
        });
        let result = self.push_claimed(&ids).await;
        self.update(|state| {
            for id in &ids {
                if let Some(count) = state.claims.get_mut(id) {
                    *count -= 1;
                    if *count == 0 {
                        state.claims.remove(id);
                    }
                }
            }
        });
        result
    }

    async fn push_claimed(&self, ids: &[ShapeId]) -> SyncResult<()> {
        let fetched = self.server.fetch().await;
        let fresh = self.completed("push", fetched)?;

        let outgoing = {
            let state = self.state.borrow();
            let subset = state.shapes.subset(&ids.iter().copied().collect());
            let ctx = merge_context(&self.identity, &state);
            merge(&subset, &fresh, &ctx)
        };
        self.report_kind_conflicts(&outgoing.kind_conflicts);

        let pushed = self.server.push(&self.identity, &outgoing.shapes).await;
        let stored = self.completed("push", pushed)?;
        self.update(|state| {
            let ctx = merge_context(&self.identity, state);
            state.shapes = merge(&state.shapes, &stored, &ctx).shapes;
        });
        self.diagnostics
            .debug(format!("pushed {} changed shapes", ids.len()));
        Ok(())
    }

    fn ensure_live(&self) -> SyncResult<()> {
        if self.torn_down.get() {
            Err(SyncError::TornDown)
        } else {
            Ok(())
        }
    }

    /// Check a completed network call: failures are logged, completions
    /// after teardown are dropped.
    fn completed<T>(&self, what: &str, result: SyncResult<T>) -> SyncResult<T> {
        if self.torn_down.get() {
            self.diagnostics
                .debug(format!("{what} completed after teardown, ignored"));
            return Err(SyncError::TornDown);
        }
        result.inspect_err(|err| match err {
            SyncError::TransientNetwork(_) => self.diagnostics.warn(format!("{what} failed: {err}")),
            SyncError::MalformedServerData(_) => {
                self.diagnostics.error(format!("{what} dropped: {err}"))
            }
            SyncError::TornDown => self.diagnostics.debug(format!("{what}: {err}")),
        })
    }

    fn report_kind_conflicts(&self, conflicts: &[ShapeId]) {
        for id in conflicts {
            self.diagnostics
                .warn(format!("shape {id} changed kind on the server, keeping server version"));
        }
    }
}

fn merge_context(identity: &str, state: &EngineState) -> MergeContext {
    MergeContext::new(identity)
        .with_editing_text(state.session.editing_text())
        .with_claims(state.claims.keys().copied())
}
