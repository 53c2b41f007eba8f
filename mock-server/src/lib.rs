use std::{
    collections::{BTreeMap, HashMap},
    sync::Arc,
};

use axum::{
    extract::{Multipart, Path, Query, State},
    http::{HeaderMap, StatusCode},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use tokio::{net::TcpListener, sync::RwLock};
use tracing::debug;
use uuid::Uuid;

pub const SUCCESS: i64 = 0;
pub const FAILED: i64 = -255;
pub const DEFAULT_PAGE_SIZE: usize = 20;

const ACCESS_TOKEN: &str = "AccessToken";
const ROLE: &str = "Role";

/// Every endpoint answers 200 with this body; `code` carries the outcome.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    pub code: i64,
    #[serde(default)]
    pub data: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub msg: Option<String>,
}

impl Envelope {
    fn ok(data: Value) -> Json<Self> {
        Json(Self {
            code: SUCCESS,
            data,
            msg: None,
        })
    }

    fn failed(msg: &str) -> Json<Self> {
        Json(Self {
            code: FAILED,
            data: Value::Null,
            msg: Some(msg.to_string()),
        })
    }
}

#[derive(Clone, Debug)]
struct Account {
    id: i64,
    username: String,
    password: String,
    email: Option<String>,
}

pub type Record = Map<String, Value>;

#[derive(Debug, Default)]
pub struct Store {
    accounts: HashMap<i64, Account>,
    tokens: HashMap<String, i64>,
    tables: HashMap<String, BTreeMap<i64, Record>>,
    next_id: i64,
}

impl Store {
    fn allocate_id(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }

    fn issue_token(&mut self, user_id: i64) -> String {
        let token = Uuid::new_v4().simple().to_string();
        self.tokens.insert(token.clone(), user_id);
        token
    }

    fn current_user(&self, headers: &HeaderMap, query: &HashMap<String, String>) -> Option<(String, i64)> {
        let token = headers
            .get(ACCESS_TOKEN)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
            .or_else(|| query.get(ACCESS_TOKEN).cloned())?;
        let user_id = *self.tokens.get(&token)?;
        Some((token, user_id))
    }
}

pub type Db = Arc<RwLock<Store>>;

pub fn app() -> Router {
    let db: Db = Arc::new(RwLock::new(Store::default()));
    Router::new()
        .route("/api/misc/info", get(misc_info))
        .route("/api/misc/tick", get(misc_tick))
        .route("/api/user/signup", post(signup))
        .route("/api/user/signin", post(signin))
        .route("/api/user/change_password", post(change_password))
        .route("/api/user/signout", post(signout))
        .route("/api/{resource}/get", get(get_record))
        .route("/api/{resource}/list/{page}", get(list_records))
        .route("/api/{resource}/list/{page}/{size}", get(list_records_sized))
        .route("/api/{resource}/new", post(new_record))
        .route("/api/{resource}/update", post(update_record))
        .route("/api/{resource}/delete", post(delete_record))
        .with_state(db)
}

pub async fn run(listener: TcpListener) -> Result<(), std::io::Error> {
    axum::serve(listener, app()).await
}

async fn form_fields(mut multipart: Multipart) -> Result<Record, StatusCode> {
    let mut fields = Record::new();
    while let Some(field) = multipart.next_field().await.map_err(|_| StatusCode::BAD_REQUEST)? {
        let name = field.name().unwrap_or_default().to_string();
        let value = field.text().await.map_err(|_| StatusCode::BAD_REQUEST)?;
        fields.insert(name, Value::String(value));
    }
    Ok(fields)
}

fn text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn field<'a>(fields: &'a Record, name: &str) -> Option<&'a str> {
    fields.get(name).and_then(Value::as_str).filter(|s| !s.is_empty())
}

/// A `Role` header asks for privileges, which only a signed-in user has.
fn role_denied(store: &Store, headers: &HeaderMap, query: &HashMap<String, String>) -> bool {
    headers.contains_key(ROLE) && store.current_user(headers, query).is_none()
}

/// Query parameters that select records, i.e. everything but control keys.
fn matches(record: &Record, query: &HashMap<String, String>) -> bool {
    query
        .iter()
        .filter(|(k, _)| k.as_str() != "loadfk" && k.as_str() != ACCESS_TOKEN)
        .all(|(k, v)| record.get(k).map(text).as_deref() == Some(v.as_str()))
}

// --- misc ---

async fn misc_info() -> Json<Envelope> {
    debug!("misc info");
    Envelope::ok(json!({
        "retcode": {"SUCCESS": SUCCESS, "FAILED": FAILED},
        "retinfo": {"0": "操作已成功完成"},
    }))
}

async fn misc_tick(
    State(db): State<Db>,
    headers: HeaderMap,
    Query(query): Query<HashMap<String, String>>,
) -> Json<Envelope> {
    let store = db.read().await;
    let user = store.current_user(&headers, &query).map(|(_, id)| id);
    debug!(auid = ?query.get("auid"), ?user, "tick");
    Envelope::ok(json!({"auid": query.get("auid"), "user": user}))
}

// --- user ---

async fn signup(State(db): State<Db>, multipart: Multipart) -> Result<Json<Envelope>, StatusCode> {
    let fields = form_fields(multipart).await?;
    let (Some(username), Some(password)) = (field(&fields, "username"), field(&fields, "password")) else {
        return Ok(Envelope::failed("username and password are required"));
    };

    let mut store = db.write().await;
    if store.accounts.values().any(|a| a.username == username) {
        return Ok(Envelope::failed("username already exists"));
    }

    let id = store.allocate_id();
    let account = Account {
        id,
        username: username.to_string(),
        password: password.to_string(),
        email: field(&fields, "email").map(str::to_string),
    };
    let mut public = Record::new();
    public.insert("id".to_string(), json!(id));
    public.insert("username".to_string(), json!(account.username));
    public.insert("email".to_string(), json!(account.email));
    public.insert("nickname".to_string(), json!(field(&fields, "nickname")));
    store.tables.entry("user".to_string()).or_default().insert(id, public);
    store.accounts.insert(id, account);

    let token = store.issue_token(id);
    debug!(id, username, "signed up");
    Ok(Envelope::ok(json!({"id": id, "username": username, "access_token": token})))
}

async fn signin(State(db): State<Db>, multipart: Multipart) -> Result<Json<Envelope>, StatusCode> {
    let fields = form_fields(multipart).await?;
    let password = field(&fields, "password").unwrap_or_default();

    let mut store = db.write().await;
    let account = if let Some(email) = field(&fields, "email") {
        store.accounts.values().find(|a| a.email.as_deref() == Some(email))
    } else if let Some(username) = field(&fields, "username") {
        store.accounts.values().find(|a| a.username == username)
    } else {
        return Ok(Envelope::failed("username or email is required"));
    };

    let user_id = account.filter(|a| a.password == password).map(|a| a.id);
    match user_id {
        Some(id) => {
            let token = store.issue_token(id);
            debug!(id, "signed in");
            Ok(Envelope::ok(json!({"id": id, "access_token": token})))
        }
        None => Ok(Envelope::failed("wrong username or password")),
    }
}

async fn change_password(
    State(db): State<Db>,
    headers: HeaderMap,
    Query(query): Query<HashMap<String, String>>,
    multipart: Multipart,
) -> Result<Json<Envelope>, StatusCode> {
    let fields = form_fields(multipart).await?;
    let mut store = db.write().await;
    let Some((_, user_id)) = store.current_user(&headers, &query) else {
        return Ok(Envelope::failed("not signed in"));
    };
    let (Some(old), Some(new)) = (field(&fields, "old_password"), field(&fields, "password")) else {
        return Ok(Envelope::failed("old_password and password are required"));
    };

    match store.accounts.get_mut(&user_id) {
        Some(account) if account.password == old => {
            account.password = new.to_string();
            debug!(user_id, "password changed");
            Ok(Envelope::ok(Value::Null))
        }
        _ => Ok(Envelope::failed("old password is incorrect")),
    }
}

async fn signout(
    State(db): State<Db>,
    headers: HeaderMap,
    Query(query): Query<HashMap<String, String>>,
) -> Json<Envelope> {
    let mut store = db.write().await;
    match store.current_user(&headers, &query) {
        Some((token, user_id)) => {
            store.tokens.remove(&token);
            debug!(user_id, "signed out");
            Envelope::ok(Value::Null)
        }
        None => Envelope::failed("not signed in"),
    }
}

// --- generic resources ---

async fn get_record(
    State(db): State<Db>,
    Path(resource): Path<String>,
    headers: HeaderMap,
    Query(query): Query<HashMap<String, String>>,
) -> Json<Envelope> {
    debug!(%resource, ?query, "get");
    let store = db.read().await;
    if role_denied(&store, &headers, &query) {
        return Envelope::failed("permission denied");
    }
    store
        .tables
        .get(&resource)
        .and_then(|table| table.values().find(|r| matches(r, &query)))
        .map(|r| Envelope::ok(Value::Object(r.clone())))
        .unwrap_or_else(|| Envelope::failed("not found"))
}

async fn list_records(
    State(db): State<Db>,
    Path((resource, page)): Path<(String, usize)>,
    headers: HeaderMap,
    Query(query): Query<HashMap<String, String>>,
) -> Json<Envelope> {
    list_page(&db, &resource, page, DEFAULT_PAGE_SIZE, &headers, &query).await
}

async fn list_records_sized(
    State(db): State<Db>,
    Path((resource, page, size)): Path<(String, usize, usize)>,
    headers: HeaderMap,
    Query(query): Query<HashMap<String, String>>,
) -> Json<Envelope> {
    list_page(&db, &resource, page, size, &headers, &query).await
}

async fn list_page(
    db: &Db,
    resource: &str,
    page: usize,
    size: usize,
    headers: &HeaderMap,
    query: &HashMap<String, String>,
) -> Json<Envelope> {
    debug!(%resource, page, size, "list");
    let store = db.read().await;
    if role_denied(&store, headers, query) {
        return Envelope::failed("permission denied");
    }
    let page = page.max(1);
    let size = size.max(1);
    let items: Vec<&Record> = store
        .tables
        .get(resource)
        .map(|table| table.values().filter(|r| matches(r, query)).collect())
        .unwrap_or_default();

    let items_count = items.len();
    let page_count = items_count.div_ceil(size).max(1);
    let page_items: Vec<Value> = items
        .into_iter()
        .skip((page - 1).saturating_mul(size))
        .take(size)
        .map(|r| Value::Object(r.clone()))
        .collect();

    Envelope::ok(json!({
        "cur_page": page,
        "page_size": size,
        "page_count": page_count,
        "items_count": items_count,
        "items": page_items,
    }))
}

async fn new_record(
    State(db): State<Db>,
    Path(resource): Path<String>,
    headers: HeaderMap,
    Query(query): Query<HashMap<String, String>>,
    multipart: Multipart,
) -> Result<Json<Envelope>, StatusCode> {
    let mut fields = form_fields(multipart).await?;
    let mut store = db.write().await;
    if role_denied(&store, &headers, &query) {
        return Ok(Envelope::failed("permission denied"));
    }
    let id = store.allocate_id();
    fields.insert("id".to_string(), json!(id));
    debug!(%resource, id, "new");
    store.tables.entry(resource).or_default().insert(id, fields.clone());
    Ok(Envelope::ok(Value::Object(fields)))
}

async fn update_record(
    State(db): State<Db>,
    Path(resource): Path<String>,
    headers: HeaderMap,
    Query(query): Query<HashMap<String, String>>,
    multipart: Multipart,
) -> Result<Json<Envelope>, StatusCode> {
    let fields = form_fields(multipart).await?;
    let mut store = db.write().await;
    if role_denied(&store, &headers, &query) {
        return Ok(Envelope::failed("permission denied"));
    }
    let Some(id) = query.get("id").and_then(|id| id.parse::<i64>().ok()) else {
        return Ok(Envelope::failed("id is required"));
    };
    let Some(record) = store.tables.get_mut(&resource).and_then(|t| t.get_mut(&id)) else {
        return Ok(Envelope::failed("not found"));
    };
    debug!(%resource, id, "update");
    for (k, v) in fields {
        if k != "id" {
            record.insert(k, v);
        }
    }
    Ok(Envelope::ok(Value::Object(record.clone())))
}

async fn delete_record(
    State(db): State<Db>,
    Path(resource): Path<String>,
    headers: HeaderMap,
    Query(query): Query<HashMap<String, String>>,
) -> Json<Envelope> {
    let mut store = db.write().await;
    if role_denied(&store, &headers, &query) {
        return Envelope::failed("permission denied");
    }
    let Some(id) = query.get("id").and_then(|id| id.parse::<i64>().ok()) else {
        return Envelope::failed("id is required");
    };
    debug!(%resource, id, "delete");
    match store.tables.get_mut(&resource).and_then(|t| t.remove(&id)) {
        Some(_) => Envelope::ok(json!({"count": 1})),
        None => Envelope::failed("not found"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(value: Value) -> Record {
        value.as_object().cloned().unwrap()
    }

    fn query(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
    }

    #[test]
    fn envelope_omits_absent_msg() {
        let json = serde_json::to_value(Envelope::ok(json!(1)).0).unwrap();
        assert_eq!(json, json!({"code": 0, "data": 1}));
    }

    #[test]
    fn failed_envelope_carries_message() {
        let env = Envelope::failed("nope").0;
        assert_eq!(env.code, FAILED);
        assert_eq!(env.msg.as_deref(), Some("nope"));
    }

    #[test]
    fn matches_compares_text_and_ignores_control_keys() {
        let r = record(json!({"id": 3, "title": "a"}));
        assert!(matches(&r, &query(&[("id", "3")])));
        assert!(matches(&r, &query(&[("id", "3"), ("loadfk", "{}"), ("AccessToken", "x")])));
        assert!(!matches(&r, &query(&[("title", "b")])));
        assert!(!matches(&r, &query(&[("missing", "1")])));
    }

    #[test]
    fn tokens_resolve_from_header_or_query() {
        let mut store = Store::default();
        let token = store.issue_token(7);

        let mut headers = HeaderMap::new();
        headers.insert("accesstoken", token.parse().unwrap());
        assert_eq!(store.current_user(&headers, &HashMap::new()).map(|u| u.1), Some(7));

        let q = query(&[(ACCESS_TOKEN, token.as_str())]);
        assert_eq!(store.current_user(&HeaderMap::new(), &q).map(|u| u.1), Some(7));

        assert!(store.current_user(&HeaderMap::new(), &HashMap::new()).is_none());
    }

    #[test]
    fn role_requires_signed_in_user() {
        let mut store = Store::default();
        let mut headers = HeaderMap::new();
        headers.insert("role", "user".parse().unwrap());
        assert!(role_denied(&store, &headers, &HashMap::new()));

        let token = store.issue_token(1);
        headers.insert("accesstoken", token.parse().unwrap());
        assert!(!role_denied(&store, &headers, &HashMap::new()));
    }
}
