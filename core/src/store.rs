//! Reactive todo state for UI code.
//!
//! # Design
//! `TodoStore` owns a `TodoState` inside a `tokio::sync::watch` channel. UI
//! code calls `subscribe()` to get notified on every change and reads
//! snapshots; only store methods write. Each async operation performs one
//! `TodoApi` call and reconciles the result into the state.
//!
//! Operations catch their own errors: the message lands in
//! `TodoState::error` and nothing is returned to the caller. `loading` is
//! driven by a drop guard, so it is reset on every exit path, including a
//! caller dropping the future mid-flight.
//!
//! Overlapping operations are neither queued nor cancelled. Whichever
//! resolves last wins on the fields it writes. `loading` counts outstanding
//! operations and only drops to `false` when the last one settles.

use std::sync::atomic::{AtomicUsize, Ordering};

use tokio::sync::watch;
use tracing::warn;

use crate::api::TodoApi;
use crate::error::ApiError;
use crate::transport::{ReqwestTransport, Transport};
use crate::types::{CreateTodo, ListParams, Meta, Todo, TodoId, UpdateTodo};

pub const DEFAULT_PAGE_SIZE: u32 = 5;
pub const DEFAULT_SORT: &str = "created_at desc";

/// Everything the UI renders, plus the current query parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TodoState {
    /// Server order as last fetched, adjusted locally by create/update/delete.
    pub todos: Vec<Todo>,
    pub meta: Option<Meta>,
    pub loading: bool,
    pub error: Option<String>,
    /// 1-based.
    pub page: u32,
    pub page_size: u32,
    pub completed_filter: Option<bool>,
    pub sort: String,
}

impl Default for TodoState {
    fn default() -> Self {
        Self {
            todos: Vec::new(),
            meta: None,
            loading: false,
            error: None,
            page: 1,
            page_size: DEFAULT_PAGE_SIZE,
            completed_filter: None,
            sort: DEFAULT_SORT.to_string(),
        }
    }
}

impl TodoState {
    /// Query for the list endpoint. `completed` is sent only when filtering.
    pub fn list_params(&self) -> ListParams {
        ListParams {
            page: Some(self.page),
            page_size: Some(self.page_size),
            completed: self.completed_filter,
            sort: Some(self.sort.clone()),
        }
    }
}

pub struct TodoStore<T> {
    api: TodoApi<T>,
    state: watch::Sender<TodoState>,
    in_flight: AtomicUsize,
}

impl TodoStore<ReqwestTransport> {
    /// Store backed by the server named by `TODO_API_BASE_URL`.
    pub fn from_env() -> Result<Self, ApiError> {
        Ok(Self::new(TodoApi::from_env()?))
    }
}

impl<T: Transport> TodoStore<T> {
    pub fn new(api: TodoApi<T>) -> Self {
        let (state, _) = watch::channel(TodoState::default());
        Self {
            api,
            state,
            in_flight: AtomicUsize::new(0),
        }
    }

    /// Receiver notified after every state change.
    pub fn subscribe(&self) -> watch::Receiver<TodoState> {
        self.state.subscribe()
    }

    /// Owned copy of the current state. Holding it never blocks store writes.
    pub fn snapshot(&self) -> TodoState {
        self.state.borrow().clone()
    }

    /// Replace `todos` and `meta` with the page selected by the current
    /// query parameters.
    pub async fn fetch_todos(&self) {
        let _loading = self.begin(true);
        let params = self.state.borrow().list_params();

        match self.api.list_todos(&params).await {
            Ok(page) => self.state.send_modify(|state| {
                state.todos = page.items;
                state.meta = Some(page.meta);
            }),
            Err(err) => self.fail("fetch_todos", err),
        }
    }

    /// Fetch one todo without touching the local list.
    pub async fn get_todo(&self, id: TodoId) -> Option<Todo> {
        let _loading = self.begin(true);

        match self.api.get_todo(id).await {
            Ok(todo) => Some(todo),
            Err(err) => {
                self.fail("get_todo", err);
                None
            }
        }
    }

    /// Create a todo and put it at the front of the list. The list is not
    /// re-fetched, so it may hold more than `page_size` entries.
    pub async fn add_todo(&self, title: impl Into<String>, description: Option<String>) {
        let _loading = self.begin(false);
        let input = CreateTodo {
            title: title.into(),
            description,
            completed: None,
        };

        match self.api.create_todo(&input).await {
            Ok(todo) => self.state.send_modify(|state| state.todos.insert(0, todo)),
            Err(err) => self.fail("add_todo", err),
        }
    }

    /// Update a todo and swap the server's copy into the list in place.
    ///
    /// The local entry is located by the id the server returned. A response
    /// without an id leaves the list as it was.
    pub async fn patch_todo(&self, id: TodoId, input: UpdateTodo) {
        let _loading = self.begin(true);

        match self.api.update_todo(id, &input).await {
            Ok(todo) => self.state.send_modify(|state| {
                let slot = state
                    .todos
                    .iter_mut()
                    .find(|t| t.id.is_some() && t.id == todo.id);
                if let Some(slot) = slot {
                    *slot = todo;
                }
            }),
            Err(err) => self.fail("patch_todo", err),
        }
    }

    /// Delete a todo and drop every local entry carrying its id.
    pub async fn remove_todo(&self, id: TodoId) {
        let _loading = self.begin(false);

        match self.api.delete_todo(id).await {
            Ok(_) => self.state.send_modify(|state| state.todos.retain(|t| t.id != Some(id))),
            Err(err) => self.fail("remove_todo", err),
        }
    }

    // Setters only record the value; call `fetch_todos` to apply it.

    pub fn set_page(&self, page: u32) {
        self.state.send_modify(|state| state.page = page);
    }

    pub fn set_page_size(&self, page_size: u32) {
        self.state.send_modify(|state| state.page_size = page_size);
    }

    pub fn set_filter_completed(&self, completed: Option<bool>) {
        self.state.send_modify(|state| state.completed_filter = completed);
    }

    pub fn set_sort(&self, sort: impl Into<String>) {
        let sort = sort.into();
        self.state.send_modify(|state| state.sort = sort);
    }

    fn begin(&self, clear_error: bool) -> LoadingGuard<'_> {
        self.state.send_modify(|state| {
            self.in_flight.fetch_add(1, Ordering::SeqCst);
            state.loading = true;
            if clear_error {
                state.error = None;
            }
        });
        LoadingGuard {
            state: &self.state,
            in_flight: &self.in_flight,
        }
    }

    fn fail(&self, operation: &'static str, err: ApiError) {
        warn!(operation, error = %err, "todo operation failed");
        let message = err.to_string();
        self.state.send_modify(|state| state.error = Some(message));
    }
}

/// Marks one operation as outstanding until dropped.
struct LoadingGuard<'a> {
    state: &'a watch::Sender<TodoState>,
    in_flight: &'a AtomicUsize,
}

impl Drop for LoadingGuard<'_> {
    fn drop(&mut self) {
        self.state.send_modify(|state| {
            let remaining = self.in_flight.fetch_sub(1, Ordering::SeqCst) - 1;
            state.loading = remaining > 0;
        });
    }
}
