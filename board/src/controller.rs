// Copyright (c) 2025 sbksba
//
// This software is licensed under the terms of the MIT License.
// See the LICENSE file in the project root for the full license text.
use chrono::NaiveDate;
use common::{BreakdownRequest, NewTask, SubTaskSuggestion, Task, TaskFields, TaskId, TaskStatus};
use tracing::{debug, error, info};

use crate::error::{BoardError, SuggestionError};
use crate::repository::TaskRepository;
use crate::store::SlotBackend;
use crate::suggestions::SuggestionClient;

/// Which dialog the view should show.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Dialog {
    #[default]
    Closed,
    NewTask,
    EditTask(TaskId),
    Suggestions,
}

/// The task being broken down. Accepted sub-tasks inherit its due date.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BreakdownTarget {
    pub title: String,
    pub description: Option<String>,
    pub due_date: Option<NaiveDate>,
}

impl From<&Task> for BreakdownTarget {
    fn from(task: &Task) -> Self {
        Self {
            title: task.title.clone(),
            description: task.description.clone(),
            due_date: task.due_date,
        }
    }
}

/// Identifies one in-flight request. Results for stale tickets are dropped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BreakdownTicket(u64);

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum BreakdownState {
    #[default]
    Idle,
    Loading {
        ticket: BreakdownTicket,
        target: BreakdownTarget,
    },
    Ready {
        target: BreakdownTarget,
        suggestions: Vec<SubTaskSuggestion>,
    },
    Failed {
        target: BreakdownTarget,
        message: String,
    },
}

/// A user action against the board.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Create(NewTask),
    Update {
        id: TaskId,
        fields: TaskFields,
        status: Option<TaskStatus>,
    },
    Remove(TaskId),
    SetStatus {
        id: TaskId,
        status: TaskStatus,
    },
    AcceptSuggestions,
    DismissSuggestions,
    OpenDialog(Dialog),
    CloseDialog,
}

/// What a dispatched command did.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    Created(Task),
    Updated(Task),
    Removed(bool),
    Moved(Option<Task>),
    Accepted(Vec<Task>),
    Dismissed,
    DialogChanged(Dialog),
}

/// Owns the board state: the repository plus everything transient the view
/// renders (dialogs, inline form errors, the AI breakdown flow).
#[derive(Debug)]
pub struct BoardController<B> {
    repo: TaskRepository<B>,
    breakdown: BreakdownState,
    next_ticket: u64,
    dialog: Dialog,
    form_error: Option<String>,
}

impl<B: SlotBackend> BoardController<B> {
    pub fn new(repo: TaskRepository<B>) -> Self {
        Self {
            repo,
            breakdown: BreakdownState::Idle,
            next_ticket: 0,
            dialog: Dialog::Closed,
            form_error: None,
        }
    }

    pub fn repository(&self) -> &TaskRepository<B> {
        &self.repo
    }

    pub fn tasks(&self) -> &[Task] {
        self.repo.list()
    }

    pub fn dialog(&self) -> Dialog {
        self.dialog
    }

    /// Inline feedback for the last rejected form submission.
    pub fn form_error(&self) -> Option<&str> {
        self.form_error.as_deref()
    }

    pub fn breakdown_state(&self) -> &BreakdownState {
        &self.breakdown
    }

    pub fn is_loading(&self) -> bool {
        matches!(self.breakdown, BreakdownState::Loading { .. })
    }

    pub fn error(&self) -> Option<&str> {
        match &self.breakdown {
            BreakdownState::Failed { message, .. } => Some(message),
            _ => None,
        }
    }

    pub fn suggestions(&self) -> &[SubTaskSuggestion] {
        match &self.breakdown {
            BreakdownState::Ready { suggestions, .. } => suggestions,
            _ => &[],
        }
    }

    pub fn dispatch(&mut self, command: Command) -> Result<Outcome, BoardError> {
        match command {
            Command::Create(new_task) => {
                let task = self.repo.create(new_task).inspect_err(|e| self.reject(e))?;
                self.close_form();
                Ok(Outcome::Created(task))
            }
            Command::Update { id, fields, status } => {
                let task = self
                    .repo
                    .update(id, fields, status)
                    .inspect_err(|e| self.reject(e))?;
                self.close_form();
                Ok(Outcome::Updated(task))
            }
            Command::Remove(id) => {
                if self.dialog == Dialog::EditTask(id) {
                    self.dialog = Dialog::Closed;
                }
                Ok(Outcome::Removed(self.repo.remove(id)))
            }
            Command::SetStatus { id, status } => Ok(Outcome::Moved(self.repo.set_status(id, status))),
            Command::AcceptSuggestions => Ok(Outcome::Accepted(self.accept_suggestions())),
            Command::DismissSuggestions => {
                self.dismiss_suggestions();
                Ok(Outcome::Dismissed)
            }
            Command::OpenDialog(dialog) => {
                self.dialog = dialog;
                self.form_error = None;
                Ok(Outcome::DialogChanged(dialog))
            }
            Command::CloseDialog => {
                self.dialog = Dialog::Closed;
                self.form_error = None;
                Ok(Outcome::DialogChanged(Dialog::Closed))
            }
        }
    }

    /// Moves the flow to `Loading` and hands out a ticket for the request.
    ///
    /// An empty title is rejected without any transition. While a request is
    /// already in flight new triggers are ignored and `None` is returned.
    pub fn trigger_breakdown(
        &mut self,
        target: BreakdownTarget,
    ) -> Result<Option<BreakdownTicket>, BoardError> {
        if target.title.trim().is_empty() {
            let err = BoardError::empty_title();
            self.form_error = Some(err.to_string());
            return Err(err);
        }
        if self.is_loading() {
            debug!("Breakdown already in flight, ignoring trigger for '{}'.", target.title);
            return Ok(None);
        }

        self.next_ticket += 1;
        let ticket = BreakdownTicket(self.next_ticket);
        debug!("Starting breakdown of '{}'", target.title);
        self.breakdown = BreakdownState::Loading { ticket, target };
        self.dialog = Dialog::Suggestions;
        self.form_error = None;
        Ok(Some(ticket))
    }

    /// Applies the result of the request identified by `ticket`.
    /// Returns `false` when the result arrived after a dismiss and was dropped.
    pub fn resolve_breakdown(
        &mut self,
        ticket: BreakdownTicket,
        result: Result<Vec<SubTaskSuggestion>, SuggestionError>,
    ) -> bool {
        let target = match &self.breakdown {
            BreakdownState::Loading { ticket: current, target } if *current == ticket => {
                target.clone()
            }
            _ => {
                debug!("Dropping stale breakdown result {:?}.", ticket);
                return false;
            }
        };

        self.breakdown = match result {
            Ok(suggestions) => {
                info!("Received {} suggestions for '{}'.", suggestions.len(), target.title);
                BreakdownState::Ready {
                    target,
                    suggestions,
                }
            }
            Err(e) => {
                error!("Breakdown of '{}' failed: {}", target.title, e);
                BreakdownState::Failed {
                    target,
                    message: e.user_message(),
                }
            }
        };
        true
    }

    /// Triggers, awaits and resolves a breakdown in one go.
    pub async fn run_breakdown<C: SuggestionClient>(
        &mut self,
        client: &C,
        target: BreakdownTarget,
    ) -> Result<(), BoardError> {
        let request = BreakdownRequest::new(target.title.clone(), target.description.clone());
        let Some(ticket) = self.trigger_breakdown(target)? else {
            return Ok(());
        };
        let result = client.suggest(&request).await;
        self.resolve_breakdown(ticket, result);
        Ok(())
    }

    fn accept_suggestions(&mut self) -> Vec<Task> {
        if !matches!(self.breakdown, BreakdownState::Ready { .. }) {
            debug!("No suggestions ready to accept.");
            return Vec::new();
        }
        let BreakdownState::Ready {
            target,
            suggestions,
        } = std::mem::take(&mut self.breakdown)
        else {
            return Vec::new();
        };
        self.close_suggestions();
        self.repo.bulk_create(&suggestions, target.due_date)
    }

    fn dismiss_suggestions(&mut self) {
        self.breakdown = BreakdownState::Idle;
        self.close_suggestions();
    }

    fn close_suggestions(&mut self) {
        if self.dialog == Dialog::Suggestions {
            self.dialog = Dialog::Closed;
        }
    }

    fn close_form(&mut self) {
        self.form_error = None;
        if matches!(self.dialog, Dialog::NewTask | Dialog::EditTask(_)) {
            self.dialog = Dialog::Closed;
        }
    }

    fn reject(&mut self, err: &BoardError) {
        self.form_error = Some(err.to_string());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{MemoryBackend, PersistentStore};
    use common::Priority;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct FakeClient {
        reply: Result<Vec<SubTaskSuggestion>, SuggestionError>,
        calls: AtomicUsize,
    }

    impl FakeClient {
        fn replying(reply: Result<Vec<SubTaskSuggestion>, SuggestionError>) -> Self {
            Self {
                reply,
                calls: AtomicUsize::new(0),
            }
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    impl SuggestionClient for FakeClient {
        async fn suggest(
            &self,
            _request: &BreakdownRequest,
        ) -> Result<Vec<SubTaskSuggestion>, SuggestionError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.reply.clone()
        }
    }

    fn controller() -> BoardController<MemoryBackend> {
        BoardController::new(TaskRepository::open(PersistentStore::new(MemoryBackend::new())))
    }

    fn suggestion(title: &str, description: Option<&str>) -> SubTaskSuggestion {
        SubTaskSuggestion {
            title: title.to_string(),
            description: description.map(str::to_string),
        }
    }

    fn target(title: &str, due_date: Option<NaiveDate>) -> BreakdownTarget {
        BreakdownTarget {
            title: title.to_string(),
            description: None,
            due_date,
        }
    }

    #[test]
    fn test_trigger_enters_loading() {
        let mut board = controller();

        let ticket = board.trigger_breakdown(target("Plan", None)).unwrap();

        assert!(ticket.is_some());
        assert!(board.is_loading());
        assert_eq!(board.error(), None);
        assert!(board.suggestions().is_empty());
        assert_eq!(board.dialog(), Dialog::Suggestions);
    }

    #[tokio::test]
    async fn test_empty_title_never_leaves_idle_or_calls_client() {
        let mut board = controller();
        let client = FakeClient::replying(Ok(vec![suggestion("A", None)]));

        let result = board.run_breakdown(&client, target("   ", None)).await;

        assert!(matches!(result, Err(BoardError::Validation(_))));
        assert_eq!(board.breakdown_state(), &BreakdownState::Idle);
        assert_eq!(client.calls(), 0);
        assert!(board.form_error().is_some());
    }

    #[tokio::test]
    async fn test_success_moves_to_ready() {
        let mut board = controller();
        let client = FakeClient::replying(Ok(vec![suggestion("A", None), suggestion("B", None)]));

        board.run_breakdown(&client, target("Plan", None)).await.unwrap();

        assert!(!board.is_loading());
        assert_eq!(board.suggestions().len(), 2);
        assert_eq!(client.calls(), 1);
    }

    #[tokio::test]
    async fn test_failure_moves_to_failed_with_detail() {
        let mut board = controller();
        let client = FakeClient::replying(Err(SuggestionError::Upstream {
            status: 500,
            detail: Some("model unavailable".to_string()),
        }));

        board.run_breakdown(&client, target("Plan", None)).await.unwrap();

        assert!(!board.is_loading());
        assert_eq!(board.error(), Some("model unavailable"));
        assert!(board.suggestions().is_empty());
    }

    #[test]
    fn test_accept_creates_tasks_with_inherited_due_date() {
        let mut board = controller();
        let due = NaiveDate::from_ymd_opt(2025, 9, 1);
        let ticket = board.trigger_breakdown(target("Parent", due)).unwrap().unwrap();
        board.resolve_breakdown(
            ticket,
            Ok(vec![suggestion("A", None), suggestion("B", Some("d"))]),
        );

        let outcome = board.dispatch(Command::AcceptSuggestions).unwrap();

        let Outcome::Accepted(created) = outcome else {
            panic!("expected accepted tasks, got {outcome:?}");
        };
        assert_eq!(created.len(), 2);
        assert_eq!(board.tasks().len(), 2);
        for task in board.tasks() {
            assert_eq!(task.status, TaskStatus::ToDo);
            assert_eq!(task.priority, Some(Priority::Medium));
            assert_eq!(task.due_date, due);
        }
        assert_eq!(board.breakdown_state(), &BreakdownState::Idle);
        assert_eq!(board.dialog(), Dialog::Closed);
    }

    #[test]
    fn test_accept_outside_ready_adds_nothing() {
        let mut board = controller();

        let outcome = board.dispatch(Command::AcceptSuggestions).unwrap();

        assert_eq!(outcome, Outcome::Accepted(Vec::new()));
        assert!(board.tasks().is_empty());
    }

    #[test]
    fn test_dismiss_discards_error() {
        let mut board = controller();
        let ticket = board.trigger_breakdown(target("Plan", None)).unwrap().unwrap();
        board.resolve_breakdown(ticket, Err(SuggestionError::Transport("timeout".to_string())));
        assert!(board.error().is_some());

        board.dispatch(Command::DismissSuggestions).unwrap();

        assert_eq!(board.breakdown_state(), &BreakdownState::Idle);
        assert_eq!(board.error(), None);
    }

    #[test]
    fn test_trigger_while_loading_is_ignored() {
        let mut board = controller();
        let first = board.trigger_breakdown(target("First", None)).unwrap();

        let second = board.trigger_breakdown(target("Second", None)).unwrap();

        assert!(first.is_some());
        assert_eq!(second, None);
        let BreakdownState::Loading { target, .. } = board.breakdown_state() else {
            panic!("expected loading");
        };
        assert_eq!(target.title, "First");
    }

    #[test]
    fn test_retrigger_from_ready_overwrites_suggestions() {
        let mut board = controller();
        let ticket = board.trigger_breakdown(target("Plan", None)).unwrap().unwrap();
        board.resolve_breakdown(ticket, Ok(vec![suggestion("Old", None)]));

        let again = board.trigger_breakdown(target("Plan", None)).unwrap();

        assert!(again.is_some());
        assert!(board.is_loading());
        assert!(board.suggestions().is_empty());
    }

    #[test]
    fn test_result_after_dismiss_is_dropped() {
        let mut board = controller();
        let ticket = board.trigger_breakdown(target("Plan", None)).unwrap().unwrap();
        board.dispatch(Command::DismissSuggestions).unwrap();

        let applied = board.resolve_breakdown(ticket, Ok(vec![suggestion("Late", None)]));

        assert!(!applied);
        assert_eq!(board.breakdown_state(), &BreakdownState::Idle);
    }

    #[test]
    fn test_stale_ticket_does_not_overwrite_newer_request() {
        let mut board = controller();
        let old = board.trigger_breakdown(target("Plan", None)).unwrap().unwrap();
        board.dispatch(Command::DismissSuggestions).unwrap();
        let new = board.trigger_breakdown(target("Plan", None)).unwrap().unwrap();

        assert!(!board.resolve_breakdown(old, Ok(vec![suggestion("Old", None)])));
        assert!(board.resolve_breakdown(new, Ok(vec![suggestion("New", None)])));
        assert_eq!(board.suggestions()[0].title, "New");
    }

    #[test]
    fn test_invalid_create_sets_form_error_and_keeps_dialog() {
        let mut board = controller();
        board.dispatch(Command::OpenDialog(Dialog::NewTask)).unwrap();

        let result = board.dispatch(Command::Create(NewTask::titled("")));

        assert!(matches!(result, Err(BoardError::Validation(_))));
        assert_eq!(board.form_error(), Some("Title cannot be empty."));
        assert_eq!(board.dialog(), Dialog::NewTask);
        assert!(board.tasks().is_empty());
    }

    #[test]
    fn test_create_then_edit_closes_dialog() {
        let mut board = controller();
        let Outcome::Created(task) = board.dispatch(Command::Create(NewTask::titled("Draft"))).unwrap()
        else {
            panic!("expected created task");
        };
        board.dispatch(Command::OpenDialog(Dialog::EditTask(task.id))).unwrap();

        let outcome = board
            .dispatch(Command::Update {
                id: task.id,
                fields: TaskFields {
                    title: "Final".to_string(),
                    ..TaskFields::default()
                },
                status: None,
            })
            .unwrap();

        assert!(matches!(outcome, Outcome::Updated(ref t) if t.title == "Final"));
        assert_eq!(board.dialog(), Dialog::Closed);
    }

    #[test]
    fn test_set_status_and_remove_through_dispatch() {
        let mut board = controller();
        let Outcome::Created(task) = board.dispatch(Command::Create(NewTask::titled("Drag me"))).unwrap()
        else {
            panic!("expected created task");
        };

        board
            .dispatch(Command::SetStatus {
                id: task.id,
                status: TaskStatus::Done,
            })
            .unwrap();
        assert_eq!(board.tasks()[0].status, TaskStatus::Done);

        assert_eq!(board.dispatch(Command::Remove(task.id)).unwrap(), Outcome::Removed(true));
        assert_eq!(board.dispatch(Command::Remove(task.id)).unwrap(), Outcome::Removed(false));
    }
}
