use std::{cmp::Ordering, collections::BTreeMap, sync::Arc};

use axum::{
    extract::{rejection::JsonRejection, Path, Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::json;
use tokio::{net::TcpListener, sync::RwLock};

/// Every todo belongs to this user; there is no authentication.
pub const DEFAULT_USER_ID: u64 = 1;
pub const DEFAULT_PAGE_SIZE: u32 = 5;
pub const MAX_PAGE_SIZE: u32 = 100;
pub const DEFAULT_SORT: &str = "created_at desc";
pub const MAX_TITLE_CHARS: usize = 255;
pub const MAX_DESCRIPTION_CHARS: usize = 2000;

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct Todo {
    pub id: u64,
    pub title: String,
    pub description: Option<String>,
    pub completed: bool,
    pub user_id: u64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct Meta {
    pub page: u32,
    pub page_size: u32,
    pub total: u64,
    pub total_pages: u32,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct TodoPage {
    pub items: Vec<Todo>,
    pub meta: Meta,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct Envelope<T> {
    pub data: T,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
}

#[derive(Deserialize)]
pub struct CreateTodo {
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub completed: Option<bool>,
}

#[derive(Default, Deserialize)]
pub struct UpdateTodo {
    #[serde(default)]
    pub title: Option<String>,
    /// `Some(None)` when the body carried an explicit `null`.
    #[serde(default, deserialize_with = "nullable")]
    pub description: Option<Option<String>>,
    #[serde(default)]
    pub completed: Option<bool>,
}

impl UpdateTodo {
    fn is_empty(&self) -> bool {
        self.title.is_none() && self.description.is_none() && self.completed.is_none()
    }
}

/// Raw query string values; parsed by hand so bad input gets a JSON error.
#[derive(Default, Deserialize)]
pub struct ListQuery {
    pub page: Option<String>,
    pub page_size: Option<String>,
    pub completed: Option<String>,
    pub sort: Option<String>,
}

fn nullable<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SortField {
    Id,
    Title,
    Completed,
    CreatedAt,
    UpdatedAt,
}

/// A `"<field> [asc|desc]"` ordering. Ties fall back to id in the same
/// direction so pages are stable.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SortOrder {
    pub field: SortField,
    pub descending: bool,
}

impl SortOrder {
    pub fn parse(raw: &str) -> Option<Self> {
        let mut parts = raw.split_whitespace();
        let field = match parts.next()? {
            "id" => SortField::Id,
            "title" => SortField::Title,
            "completed" => SortField::Completed,
            "created_at" => SortField::CreatedAt,
            "updated_at" => SortField::UpdatedAt,
            _ => return None,
        };
        let descending = match parts.next().map(str::to_ascii_lowercase).as_deref() {
            None | Some("asc") => false,
            Some("desc") => true,
            Some(_) => return None,
        };
        if parts.next().is_some() {
            return None;
        }
        Some(Self { field, descending })
    }

    pub fn compare(&self, a: &Todo, b: &Todo) -> Ordering {
        let ordering = match self.field {
            SortField::Id => Ordering::Equal,
            SortField::Title => a.title.cmp(&b.title),
            SortField::Completed => a.completed.cmp(&b.completed),
            SortField::CreatedAt => a.created_at.cmp(&b.created_at),
            SortField::UpdatedAt => a.updated_at.cmp(&b.updated_at),
        }
        .then(a.id.cmp(&b.id));
        if self.descending {
            ordering.reverse()
        } else {
            ordering
        }
    }
}

/// `ceil(total / page_size)`, zero for an empty collection.
pub fn total_pages(total: u64, page_size: u32) -> u32 {
    if total == 0 || page_size == 0 {
        return 0;
    }
    total.div_ceil(u64::from(page_size)) as u32
}

/// In-memory todo table with a monotonically increasing id sequence.
#[derive(Debug, Default)]
pub struct TodoTable {
    rows: BTreeMap<u64, Todo>,
    last_id: u64,
}

impl TodoTable {
    pub fn insert(&mut self, title: String, description: Option<String>, completed: bool) -> Todo {
        self.last_id += 1;
        let now = Utc::now();
        let todo = Todo {
            id: self.last_id,
            title,
            description,
            completed,
            user_id: DEFAULT_USER_ID,
            created_at: now,
            updated_at: now,
        };
        self.rows.insert(todo.id, todo.clone());
        todo
    }

    pub fn get(&self, id: u64) -> Option<&Todo> {
        self.rows.get(&id)
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// One page of the rows matching `completed`, ordered by `sort`.
    pub fn page(&self, completed: Option<bool>, sort: SortOrder, page: u32, page_size: u32) -> TodoPage {
        let mut matching: Vec<&Todo> = self
            .rows
            .values()
            .filter(|todo| completed.is_none_or(|c| todo.completed == c))
            .collect();
        matching.sort_by(|a, b| sort.compare(a, b));

        let total = matching.len() as u64;
        let offset = (page.saturating_sub(1) as usize).saturating_mul(page_size as usize);
        let items = matching
            .into_iter()
            .skip(offset)
            .take(page_size as usize)
            .cloned()
            .collect();

        TodoPage {
            items,
            meta: Meta {
                page,
                page_size,
                total,
                total_pages: total_pages(total, page_size),
            },
        }
    }

    pub fn update(&mut self, id: u64, input: UpdateTodo) -> Option<Todo> {
        let todo = self.rows.get_mut(&id)?;
        if let Some(title) = input.title {
            todo.title = title;
        }
        if let Some(description) = input.description {
            todo.description = description;
        }
        if let Some(completed) = input.completed {
            todo.completed = completed;
        }
        todo.updated_at = Utc::now();
        Some(todo.clone())
    }

    pub fn remove(&mut self, id: u64) -> Option<Todo> {
        self.rows.remove(&id)
    }
}

pub type Db = Arc<RwLock<TodoTable>>;

/// A failed request, rendered as `{"error": "..."}`.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    fn bad_request(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message: message.into(),
        }
    }

    fn not_found() -> Self {
        Self {
            status: StatusCode::NOT_FOUND,
            message: "todo not found or not authorized".to_string(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(ErrorBody { error: self.message })).into_response()
    }
}

pub fn app() -> Router {
    app_with_db(Db::default())
}

pub fn app_with_db(db: Db) -> Router {
    Router::new()
        .route("/api/todos", get(list_todos).post(create_todo))
        .route(
            "/api/todos/{id}",
            get(get_todo)
                .patch(update_todo)
                .put(update_todo)
                .delete(delete_todo),
        )
        .with_state(db)
}

pub async fn run(listener: TcpListener) -> Result<(), std::io::Error> {
    axum::serve(listener, app()).await
}

fn parse_number(raw: Option<&str>, default: u32) -> Option<u32> {
    match raw {
        None => Some(default),
        Some(value) => value.parse().ok(),
    }
}

async fn list_todos(
    State(db): State<Db>,
    Query(query): Query<ListQuery>,
) -> Result<Json<Envelope<TodoPage>>, ApiError> {
    let page = parse_number(query.page.as_deref(), 1)
        .filter(|page| *page >= 1)
        .ok_or_else(|| ApiError::bad_request("invalid page parameter"))?;
    let page_size = parse_number(query.page_size.as_deref(), DEFAULT_PAGE_SIZE)
        .filter(|size| (1..=MAX_PAGE_SIZE).contains(size))
        .ok_or_else(|| ApiError::bad_request("invalid page_size parameter (1-100)"))?;
    let completed = match query.completed.as_deref() {
        None | Some("") => None,
        Some("true") => Some(true),
        Some("false") => Some(false),
        Some(_) => {
            return Err(ApiError::bad_request(
                "invalid completed filter; must be true or false",
            ))
        }
    };
    let sort = SortOrder::parse(query.sort.as_deref().unwrap_or(DEFAULT_SORT))
        .ok_or_else(|| ApiError::bad_request("invalid sort parameter"))?;

    let todos = db.read().await;
    Ok(Json(Envelope {
        data: todos.page(completed, sort, page, page_size),
    }))
}

async fn create_todo(
    State(db): State<Db>,
    payload: Result<Json<CreateTodo>, JsonRejection>,
) -> Result<Response, ApiError> {
    let Json(input) = payload.map_err(|rejection| ApiError::bad_request(rejection.body_text()))?;

    let title_chars = input.title.chars().count();
    if title_chars == 0 || title_chars > MAX_TITLE_CHARS {
        return Err(ApiError::bad_request("title must be 1-255 characters"));
    }
    if input
        .description
        .as_ref()
        .is_some_and(|d| d.chars().count() > MAX_DESCRIPTION_CHARS)
    {
        return Err(ApiError::bad_request("description must be at most 2000 characters"));
    }

    let todo = db
        .write()
        .await
        .insert(input.title, input.description, input.completed.unwrap_or(false));
    tracing::debug!(id = todo.id, "created todo");

    Ok((
        StatusCode::CREATED,
        [(header::LOCATION, format!("/todos/{}", todo.id))],
        Json(Envelope { data: todo }),
    )
        .into_response())
}

async fn get_todo(
    State(db): State<Db>,
    Path(id): Path<u64>,
) -> Result<Json<Envelope<Todo>>, ApiError> {
    let todos = db.read().await;
    todos
        .get(id)
        .cloned()
        .map(|todo| Json(Envelope { data: todo }))
        .ok_or_else(ApiError::not_found)
}

async fn update_todo(
    State(db): State<Db>,
    Path(id): Path<u64>,
    payload: Result<Json<UpdateTodo>, JsonRejection>,
) -> Result<Json<Envelope<Todo>>, ApiError> {
    let mut todos = db.write().await;
    if todos.get(id).is_none() {
        return Err(ApiError::not_found());
    }

    let Json(input) = payload.map_err(|rejection| ApiError::bad_request(rejection.body_text()))?;
    if input.is_empty() {
        return Err(ApiError::bad_request("no fields to update"));
    }

    let todo = todos.update(id, input).ok_or_else(ApiError::not_found)?;
    tracing::debug!(id, "updated todo");
    Ok(Json(Envelope { data: todo }))
}

async fn delete_todo(
    State(db): State<Db>,
    Path(id): Path<u64>,
) -> Result<Json<Envelope<serde_json::Value>>, ApiError> {
    db.write().await.remove(id).ok_or_else(ApiError::not_found)?;
    tracing::debug!(id, "deleted todo");
    Ok(Json(Envelope {
        data: json!({
            "message": "Todo successfully deleted",
            "id": id.to_string(),
        }),
    }))
}
