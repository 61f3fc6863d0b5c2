//! Snapshot ownership and mutation orchestration.

use std::collections::{HashSet, VecDeque};

use chrono::Utc;
use tracing::{debug, warn};

use crate::error::Result;
use crate::filter::{FetchPlan, FilterSelection, ListQuery};
use crate::model::{Task, TaskDraft};
use crate::remote::RemoteClient;
use crate::view::{self, TaskView};

/// Tags an in-flight list call with the selection that issued it, so a
/// response arriving after the selection changed can be recognized as stale.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadTicket {
    selection: FilterSelection,
}

impl LoadTicket {
    pub fn query(&self) -> ListQuery {
        self.selection.query()
    }
}

/// Outcome of applying a finished list call.
#[derive(Debug, PartialEq)]
pub enum LoadOutcome {
    Applied(TaskView),
    /// The selection changed while the call was in flight; the response was
    /// dropped and the snapshot kept.
    Stale,
}

/// Result of a successful create: the task the server minted plus the
/// reloaded view.
#[derive(Debug, Clone)]
pub struct CreateOutcome {
    pub created: Task,
    pub view: TaskView,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum WriteOp {
    Toggle(String),
    Remove(String),
}

impl WriteOp {
    fn id(&self) -> &str {
        match self {
            WriteOp::Toggle(id) | WriteOp::Remove(id) => id,
        }
    }
}

/// Owns the snapshot and sequences every state change.
///
/// Presentation reads derived [`TaskView`]s and feeds intents; it never
/// touches tasks directly. The snapshot is replaced wholesale on every
/// successful fetch and mutated in place only by the optimistic toggle
/// path, which the next authoritative fetch reconciles.
pub struct TaskEngine {
    client: RemoteClient,
    selection: FilterSelection,
    snapshot: Vec<Task>,
    pending_delete: Option<String>,
    busy: HashSet<String>,
    deferred: VecDeque<WriteOp>,
}

impl TaskEngine {
    pub fn new(client: RemoteClient) -> Self {
        Self {
            client,
            selection: FilterSelection::default(),
            snapshot: Vec::new(),
            pending_delete: None,
            busy: HashSet::new(),
            deferred: VecDeque::new(),
        }
    }

    pub fn selection(&self) -> FilterSelection {
        self.selection
    }

    pub fn snapshot(&self) -> &[Task] {
        &self.snapshot
    }

    pub fn pending_delete(&self) -> Option<&str> {
        self.pending_delete.as_deref()
    }

    /// Derive the view for the current selection without touching the network.
    pub fn view(&self) -> TaskView {
        view::derive(&self.snapshot, &self.selection, Utc::now())
    }

    /// Change-filter intent. Requeries only when the policy demands it; the
    /// default newest-first split is served from the snapshot instantly.
    pub async fn change_filter(&mut self, selection: FilterSelection) -> Result<TaskView> {
        self.selection = selection;
        match selection.plan() {
            FetchPlan::DeriveLocal => Ok(self.view()),
            FetchPlan::Requery(_) => self.reload().await,
        }
    }

    /// Requery the service and replace the snapshot. The filter controls are
    /// re-read here, not captured at mutation time; a failed fetch keeps the
    /// prior snapshot renderable.
    pub async fn reload(&mut self) -> Result<TaskView> {
        let ticket = self.begin_load();
        let tasks = self.client.list(&ticket.query()).await?;
        match self.complete_load(ticket, tasks) {
            LoadOutcome::Applied(view) => Ok(view),
            LoadOutcome::Stale => Ok(self.view()),
        }
    }

    /// Start a list call for the current selection.
    pub fn begin_load(&self) -> LoadTicket {
        LoadTicket {
            selection: self.selection,
        }
    }

    /// Apply a finished list call, last-response-wins: a slow response for
    /// an old selection must not clobber the snapshot a faster, newer
    /// response already installed.
    pub fn complete_load(&mut self, ticket: LoadTicket, tasks: Vec<Task>) -> LoadOutcome {
        if ticket.selection != self.selection {
            warn!(
                issued = ?ticket.selection,
                current = ?self.selection,
                "discarding stale list response"
            );
            return LoadOutcome::Stale;
        }
        self.snapshot = tasks;
        LoadOutcome::Applied(self.view())
    }

    /// Create intent. On success the reloaded view reflects the server's
    /// ordering and the caller may discard its draft; on failure the
    /// snapshot is untouched and the caller keeps the draft for retry.
    /// No optimistic insert: id and creation order are server-assigned.
    pub async fn submit(&mut self, draft: TaskDraft) -> Result<CreateOutcome> {
        let created = self.client.create(&draft).await?;
        debug!(id = %created.id, "task created");
        let view = self.reload().await?;
        Ok(CreateOutcome { created, view })
    }

    /// Fetch a single task from the service; missing ids surface as
    /// [`crate::Error::NotFound`]. Read-only, snapshot untouched.
    pub async fn fetch(&self, id: &str) -> Result<Task> {
        self.client.get(id).await
    }

    /// Toggle-complete intent.
    pub async fn toggle(&mut self, id: &str) -> Result<TaskView> {
        self.run_write(WriteOp::Toggle(id.to_string())).await
    }

    /// Record `id` as the delete target awaiting confirmation. A second
    /// request replaces the first; there is no queue.
    pub fn request_delete(&mut self, id: &str) {
        self.pending_delete = Some(id.to_string());
    }

    /// Drop the pending delete target with no network effect.
    pub fn cancel_delete(&mut self) {
        self.pending_delete = None;
    }

    /// Delete the pending target. The target is cleared whether or not the
    /// remove succeeds; a retry is a fresh request.
    pub async fn confirm_delete(&mut self) -> Result<TaskView> {
        let Some(id) = self.pending_delete.take() else {
            return Ok(self.view());
        };
        self.run_write(WriteOp::Remove(id)).await
    }

    async fn run_write(&mut self, op: WriteOp) -> Result<TaskView> {
        let mut queue = VecDeque::from([op]);
        let mut first_error = None;
        let mut wrote = false;

        while let Some(op) = queue.pop_front() {
            if !self.start_write(&op) {
                // same id already in flight; runs once that write settles
                continue;
            }
            match self.perform(&op).await {
                Ok(()) => wrote = true,
                Err(err) => {
                    if first_error.is_none() {
                        first_error = Some(err);
                    }
                }
            }
            queue.extend(self.settle_write(op.id()));
        }

        match first_error {
            Some(err) => Err(err),
            None if wrote => self.reload().await,
            None => Ok(self.view()),
        }
    }

    /// Begin a write on `op`'s id, or defer it while another write on the
    /// same id is in flight. Writes on distinct ids proceed independently.
    fn start_write(&mut self, op: &WriteOp) -> bool {
        if self.busy.contains(op.id()) {
            debug!(id = %op.id(), "write deferred behind in-flight write");
            self.deferred.push_back(op.clone());
            return false;
        }
        self.busy.insert(op.id().to_string());
        true
    }

    /// Mark `id` settled and release any deferred writes that are now free.
    fn settle_write(&mut self, id: &str) -> Vec<WriteOp> {
        self.busy.remove(id);
        let mut ready = Vec::new();
        let mut still_deferred = VecDeque::new();
        while let Some(op) = self.deferred.pop_front() {
            if self.busy.contains(op.id()) {
                still_deferred.push_back(op);
            } else {
                ready.push(op);
            }
        }
        self.deferred = still_deferred;
        ready
    }

    async fn perform(&mut self, op: &WriteOp) -> Result<()> {
        match op {
            WriteOp::Toggle(id) => self.perform_toggle(id).await,
            WriteOp::Remove(id) => {
                self.client.remove(id).await?;
                debug!(%id, "task deleted");
                Ok(())
            }
        }
    }

    /// Flip completion with an optimistic display update; a failed replace
    /// restores the exact pre-toggle record so the displayed flag never
    /// disagrees with the server.
    async fn perform_toggle(&mut self, id: &str) -> Result<()> {
        let now = Utc::now();
        if let Some(index) = self.snapshot.iter().position(|task| task.id == id) {
            let original = self.snapshot[index].clone();
            self.snapshot[index].set_complete(!original.complete, now);
            let updated = self.snapshot[index].clone();
            if let Err(err) = self.client.replace(&updated).await {
                self.snapshot[index] = original;
                return Err(err);
            }
            return Ok(());
        }

        // not in the snapshot (filtered out); read-then-write via the service
        let mut task = self.client.get(id).await?;
        task.set_complete(!task.complete, now);
        self.client.replace(&task).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ClientConfig;
    use crate::filter::{PeriodFilter, StatusFilter, TaskOrder};
    use crate::model::Priority;
    use chrono::{Duration, Utc};
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use wiremock::matchers::{body_partial_json, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn task(id: &str, complete: bool) -> Task {
        Task {
            id: id.to_string(),
            title: format!("Task {id}"),
            message: None,
            priority: Priority::Medium,
            deadline: None,
            created_at: Utc::now() - Duration::hours(1),
            updated_at: None,
            complete,
            completed_at: complete.then(Utc::now),
        }
    }

    fn task_json(id: &str, complete: bool) -> serde_json::Value {
        json!({
            "id": id,
            "todo": format!("Task {id}"),
            "priority": "medium",
            "createdAt": "2024-03-01T09:00:00Z",
            "complete": complete,
        })
    }

    async fn engine_for(server: &MockServer) -> TaskEngine {
        let config = ClientConfig::from_base_url(&server.uri()).expect("mock url");
        TaskEngine::new(RemoteClient::new(&config).expect("client"))
    }

    fn seed(engine: &mut TaskEngine, tasks: Vec<Task>) {
        let ticket = engine.begin_load();
        match engine.complete_load(ticket, tasks) {
            LoadOutcome::Applied(_) => {}
            LoadOutcome::Stale => unreachable!("selection unchanged while seeding"),
        }
    }

    fn selection(status: StatusFilter, period: PeriodFilter, order: TaskOrder) -> FilterSelection {
        FilterSelection {
            status,
            period,
            order,
        }
    }

    #[tokio::test]
    async fn default_status_split_never_triggers_a_network_call() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/todos"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
            .expect(0)
            .mount(&server)
            .await;

        let mut engine = engine_for(&server).await;
        seed(&mut engine, vec![task("1", false), task("2", true)]);

        let view = engine
            .change_filter(selection(
                StatusFilter::Active,
                PeriodFilter::All,
                TaskOrder::CreatedDesc,
            ))
            .await
            .expect("local derive");
        assert_eq!(view.stats.active_count, 1);
        assert_eq!(view.stats.completed_count, 0);
    }

    #[tokio::test]
    async fn week_period_always_requeries() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/todos"))
            .and(query_param("period", "week"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([task_json("1", false)])))
            .expect(1)
            .mount(&server)
            .await;

        let mut engine = engine_for(&server).await;
        let view = engine
            .change_filter(selection(
                StatusFilter::All,
                PeriodFilter::Week,
                TaskOrder::CreatedDesc,
            ))
            .await
            .expect("requery");
        assert_eq!(view.stats.total, 1);
    }

    #[tokio::test]
    async fn stale_list_response_is_discarded() {
        let server = MockServer::start().await;
        let mut engine = engine_for(&server).await;
        seed(&mut engine, vec![task("1", false)]);

        // a load starts under the default selection...
        let ticket = engine.begin_load();

        // ...the user moves to a selection served locally meanwhile
        engine
            .change_filter(selection(
                StatusFilter::Active,
                PeriodFilter::All,
                TaskOrder::CreatedDesc,
            ))
            .await
            .expect("local derive");

        let outcome = engine.complete_load(ticket, vec![task("9", false)]);
        assert_eq!(outcome, LoadOutcome::Stale);
        assert_eq!(engine.snapshot().len(), 1);
        assert_eq!(engine.snapshot()[0].id, "1");
    }

    #[tokio::test]
    async fn failed_list_keeps_the_prior_snapshot() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/todos"))
            .respond_with(ResponseTemplate::new(500).set_body_string("db down"))
            .mount(&server)
            .await;

        let mut engine = engine_for(&server).await;
        seed(&mut engine, vec![task("1", false)]);

        let err = engine.reload().await.expect_err("list fails");
        assert!(!err.is_validation());
        // stale but still renderable
        assert_eq!(engine.view().stats.total, 1);
    }

    #[tokio::test]
    async fn empty_title_submit_makes_zero_network_calls() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/todo"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/todos"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
            .expect(0)
            .mount(&server)
            .await;

        let mut engine = engine_for(&server).await;
        seed(&mut engine, vec![task("1", false)]);

        let err = engine
            .submit(TaskDraft::new(""))
            .await
            .expect_err("validation");
        assert!(err.is_validation());
        assert_eq!(engine.snapshot().len(), 1);
    }

    #[tokio::test]
    async fn successful_submit_reloads_with_current_filters() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/todo"))
            .respond_with(ResponseTemplate::new(200).set_body_json(task_json("new", false)))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/todos"))
            .and(query_param("orderBy", "createdAt"))
            .and(query_param("orderDir", "desc"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!([task_json("new", false), task_json("1", false)])),
            )
            .expect(1)
            .mount(&server)
            .await;

        let mut engine = engine_for(&server).await;
        let outcome = engine
            .submit(TaskDraft::new("Ship release"))
            .await
            .expect("create");
        assert_eq!(outcome.created.id, "new");
        assert_eq!(outcome.view.stats.total, 2);
    }

    #[tokio::test]
    async fn toggle_failure_reverts_the_displayed_flag() {
        let server = MockServer::start().await;
        Mock::given(method("PUT"))
            .and(path("/todo/1"))
            .respond_with(ResponseTemplate::new(500).set_body_string("write refused"))
            .expect(1)
            .mount(&server)
            .await;

        let mut engine = engine_for(&server).await;
        seed(&mut engine, vec![task("1", false)]);

        let err = engine.toggle("1").await.expect_err("replace fails");
        assert!(!err.is_validation());
        assert!(!engine.snapshot()[0].complete);
        assert_eq!(engine.snapshot()[0].completed_at, None);
    }

    #[tokio::test]
    async fn toggle_sends_the_full_object_and_reloads() {
        let server = MockServer::start().await;
        Mock::given(method("PUT"))
            .and(path("/todo/1"))
            .and(body_partial_json(json!({"complete": true})))
            .respond_with(ResponseTemplate::new(204))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/todos"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([task_json("1", true)])))
            .expect(1)
            .mount(&server)
            .await;

        let mut engine = engine_for(&server).await;
        seed(&mut engine, vec![task("1", false)]);

        let view = engine.toggle("1").await.expect("toggle");
        assert_eq!(view.stats.completed_count, 1);
    }

    #[tokio::test]
    async fn delete_handshake_is_last_request_wins() {
        let server = MockServer::start().await;
        Mock::given(method("DELETE"))
            .and(path("/todo/5"))
            .respond_with(ResponseTemplate::new(204))
            .expect(0)
            .mount(&server)
            .await;
        Mock::given(method("DELETE"))
            .and(path("/todo/7"))
            .respond_with(ResponseTemplate::new(204))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/todos"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
            .mount(&server)
            .await;

        let mut engine = engine_for(&server).await;
        engine.request_delete("5");
        engine.request_delete("7");
        assert_eq!(engine.pending_delete(), Some("7"));

        engine.confirm_delete().await.expect("delete");
        assert_eq!(engine.pending_delete(), None);
    }

    #[tokio::test]
    async fn cancel_delete_clears_the_target_without_network() {
        let server = MockServer::start().await;
        Mock::given(method("DELETE"))
            .and(path("/todo/5"))
            .respond_with(ResponseTemplate::new(204))
            .expect(0)
            .mount(&server)
            .await;

        let mut engine = engine_for(&server).await;
        seed(&mut engine, vec![task("5", false)]);

        engine.request_delete("5");
        engine.cancel_delete();
        assert_eq!(engine.pending_delete(), None);

        // confirm with nothing pending is a no-op
        let view = engine.confirm_delete().await.expect("noop");
        assert_eq!(view.stats.total, 1);
    }

    #[tokio::test]
    async fn same_id_writes_serialize_through_deferral() {
        let server = MockServer::start().await;
        let mut engine = engine_for(&server).await;

        let first = WriteOp::Toggle("1".to_string());
        let second = WriteOp::Remove("1".to_string());
        let other = WriteOp::Toggle("2".to_string());

        assert!(engine.start_write(&first));
        // same id defers until the first settles
        assert!(!engine.start_write(&second));
        // a different id proceeds independently
        assert!(engine.start_write(&other));

        let released = engine.settle_write("1");
        assert_eq!(released, vec![second]);
        assert!(engine.settle_write("2").is_empty());
    }
}
