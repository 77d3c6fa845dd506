use std::collections::{BTreeMap, HashMap};
use std::fmt::Display;
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use axum::{
    extract::{Multipart, Query, Request, State},
    http::{header, StatusCode},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{get, post},
    Form, Json, Router,
};
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tokio::{net::TcpListener, sync::RwLock};
use uuid::Uuid;

pub const NODE_NAME: &str = "mock-scrapyd";

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobState {
    Pending,
    Running,
    Finished,
}

#[derive(Clone, Debug, Serialize)]
pub struct Job {
    pub id: String,
    pub project: String,
    pub spider: String,
    #[serde(skip)]
    pub state: JobState,
    pub settings: Vec<String>,
    pub args: BTreeMap<String, String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_time: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_time: Option<String>,
}

#[derive(Clone, Debug)]
struct Version {
    name: String,
    spiders: Vec<String>,
}

#[derive(Default)]
struct Registry {
    projects: BTreeMap<String, Vec<Version>>,
    jobs: Vec<Job>,
}

impl Registry {
    fn spiders(&self, project: &str, version: Option<&str>) -> Option<&[String]> {
        let versions = self.projects.get(project)?;
        let found = match version {
            Some(name) => versions.iter().find(|v| v.name == name),
            None => versions.last(),
        };
        found.map(|v| v.spiders.as_slice())
    }

    fn job_mut(&mut self, project: &str, id: &str) -> Option<&mut Job> {
        self.jobs
            .iter_mut()
            .find(|job| job.project == project && job.id == id)
    }
}

/// Shared server state: the in-memory registry and optional Basic credentials.
#[derive(Clone, Default)]
pub struct MockState {
    registry: Arc<RwLock<Registry>>,
    authorization: Option<Arc<str>>,
}

impl MockState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Require HTTP Basic `username:password` on every request.
    pub fn with_credentials(mut self, username: &str, password: &str) -> Self {
        let token = STANDARD.encode(format!("{username}:{password}"));
        self.authorization = Some(format!("Basic {token}").into());
        self
    }
}

pub fn app() -> Router {
    router(MockState::new())
}

pub fn router(state: MockState) -> Router {
    Router::new()
        .route("/addversion.json", post(add_version))
        .route("/cancel.json", post(cancel))
        .route("/delproject.json", post(delete_project))
        .route("/delversion.json", post(delete_version))
        .route("/listjobs.json", get(list_jobs))
        .route("/listprojects.json", get(list_projects))
        .route("/listspiders.json", get(list_spiders))
        .route("/listversions.json", get(list_versions))
        .route("/schedule.json", post(schedule))
        .route("/mock/advance.json", post(advance))
        .route("/broken/500.json", get(broken_status).post(broken_status))
        .route("/broken/text.json", get(broken_text).post(broken_text))
        .route("/broken/slow.json", get(slow).post(slow))
        .layer(middleware::from_fn_with_state(state.clone(), require_auth))
        .with_state(state)
}

pub async fn run(listener: TcpListener) -> Result<(), std::io::Error> {
    run_with(listener, MockState::new()).await
}

pub async fn run_with(listener: TcpListener, state: MockState) -> Result<(), std::io::Error> {
    axum::serve(listener, router(state)).await
}

async fn require_auth(State(state): State<MockState>, request: Request, next: Next) -> Response {
    if let Some(expected) = &state.authorization {
        let given = request
            .headers()
            .get(header::AUTHORIZATION)
            .and_then(|value| value.to_str().ok());
        if given != Some(&**expected) {
            return (StatusCode::UNAUTHORIZED, "Unauthorized").into_response();
        }
    }
    next.run(request).await
}

// --- envelope helpers ---

fn ok(mut fields: Value) -> Json<Value> {
    fields["status"] = json!("ok");
    Json(fields)
}

fn error(message: impl Display) -> Json<Value> {
    Json(json!({ "status": "error", "message": message.to_string() }))
}

fn bad_request(err: impl Display) -> (StatusCode, String) {
    (StatusCode::BAD_REQUEST, err.to_string())
}

fn field<'a>(fields: &'a [(String, String)], key: &str) -> Option<&'a str> {
    fields
        .iter()
        .find(|(k, _)| k == key)
        .map(|(_, v)| v.as_str())
}

fn now() -> String {
    let elapsed = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default();
    format!("{:.6}", elapsed.as_secs_f64())
}

// --- endpoints ---

async fn add_version(
    State(state): State<MockState>,
    mut multipart: Multipart,
) -> Result<Json<Value>, (StatusCode, String)> {
    let mut project = None;
    let mut version = None;
    let mut egg = None;
    while let Some(part) = multipart.next_field().await.map_err(bad_request)? {
        let name = part.name().unwrap_or_default().to_string();
        match name.as_str() {
            "project" => project = Some(part.text().await.map_err(bad_request)?),
            "version" => version = Some(part.text().await.map_err(bad_request)?),
            "egg" => egg = Some(part.bytes().await.map_err(bad_request)?),
            _ => {}
        }
    }
    let (Some(project), Some(version), Some(egg)) = (project, version, egg) else {
        return Ok(error("project, version and egg are required"));
    };

    // Each non-empty line of the egg names one spider.
    let spiders: Vec<String> = String::from_utf8_lossy(&egg)
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect();
    let count = spiders.len();

    let mut registry = state.registry.write().await;
    let versions = registry.projects.entry(project.clone()).or_default();
    versions.retain(|v| v.name != version);
    versions.push(Version {
        name: version.clone(),
        spiders,
    });
    Ok(ok(json!({ "project": project, "version": version, "spiders": count })))
}

async fn schedule(
    State(state): State<MockState>,
    Form(fields): Form<Vec<(String, String)>>,
) -> Json<Value> {
    let (Some(project), Some(spider)) = (field(&fields, "project"), field(&fields, "spider")) else {
        return error("project and spider are required");
    };
    let mut registry = state.registry.write().await;
    let Some(spiders) = registry.spiders(project, field(&fields, "_version")) else {
        return error(format!("project '{project}' not found"));
    };
    if !spiders.iter().any(|s| s == spider) {
        return error(format!("spider '{spider}' not found"));
    }

    let id = field(&fields, "jobid")
        .map(str::to_string)
        .unwrap_or_else(|| Uuid::new_v4().simple().to_string());
    let settings = fields
        .iter()
        .filter(|(k, _)| k == "setting")
        .map(|(_, v)| v.clone())
        .collect();
    let args = fields
        .iter()
        .filter(|(k, _)| !matches!(k.as_str(), "project" | "spider" | "setting" | "jobid" | "_version"))
        .cloned()
        .collect();
    registry.jobs.push(Job {
        id: id.clone(),
        project: project.to_string(),
        spider: spider.to_string(),
        state: JobState::Pending,
        settings,
        args,
        start_time: None,
        end_time: None,
    });
    ok(json!({ "jobid": id }))
}

async fn cancel(
    State(state): State<MockState>,
    Form(fields): Form<Vec<(String, String)>>,
) -> Json<Value> {
    let (Some(project), Some(id)) = (field(&fields, "project"), field(&fields, "job")) else {
        return error("project and job are required");
    };
    let mut registry = state.registry.write().await;
    let prevstate = match registry.job_mut(project, id).map(|job| job.state) {
        Some(JobState::Pending) => {
            registry.jobs.retain(|job| !(job.project == project && job.id == id));
            Some(JobState::Pending)
        }
        Some(JobState::Running) => {
            if let Some(job) = registry.job_mut(project, id) {
                job.state = JobState::Finished;
                job.end_time = Some(now());
            }
            Some(JobState::Running)
        }
        _ => None,
    };
    ok(json!({ "prevstate": prevstate }))
}

async fn delete_project(
    State(state): State<MockState>,
    Form(fields): Form<Vec<(String, String)>>,
) -> Json<Value> {
    let Some(project) = field(&fields, "project") else {
        return error("project is required");
    };
    let mut registry = state.registry.write().await;
    if registry.projects.remove(project).is_none() {
        return error(format!("project '{project}' not found"));
    }
    registry
        .jobs
        .retain(|job| !(job.project == project && job.state == JobState::Pending));
    ok(json!({}))
}

async fn delete_version(
    State(state): State<MockState>,
    Form(fields): Form<Vec<(String, String)>>,
) -> Json<Value> {
    let (Some(project), Some(version)) = (field(&fields, "project"), field(&fields, "version")) else {
        return error("project and version are required");
    };
    let mut registry = state.registry.write().await;
    let Some(versions) = registry.projects.get_mut(project) else {
        return error(format!("project '{project}' not found"));
    };
    let before = versions.len();
    versions.retain(|v| v.name != version);
    if versions.len() == before {
        return error(format!("version '{version}' of project '{project}' not found"));
    }
    if versions.is_empty() {
        registry.projects.remove(project);
    }
    ok(json!({}))
}

async fn list_jobs(
    State(state): State<MockState>,
    Query(params): Query<HashMap<String, String>>,
) -> Json<Value> {
    let project = params.get("project");
    let registry = state.registry.read().await;
    let in_state = |wanted: JobState| -> Vec<&Job> {
        registry
            .jobs
            .iter()
            .filter(|job| job.state == wanted && project.map_or(true, |p| *p == job.project))
            .collect()
    };
    ok(json!({
        "node_name": NODE_NAME,
        "pending": in_state(JobState::Pending),
        "running": in_state(JobState::Running),
        "finished": in_state(JobState::Finished),
    }))
}

async fn list_projects(State(state): State<MockState>) -> Json<Value> {
    let registry = state.registry.read().await;
    let projects: Vec<&String> = registry.projects.keys().collect();
    ok(json!({ "node_name": NODE_NAME, "projects": projects }))
}

async fn list_spiders(
    State(state): State<MockState>,
    Query(params): Query<HashMap<String, String>>,
) -> Json<Value> {
    let Some(project) = params.get("project") else {
        return error("project is required");
    };
    let registry = state.registry.read().await;
    match registry.spiders(project, params.get("_version").map(String::as_str)) {
        Some(spiders) => ok(json!({ "node_name": NODE_NAME, "spiders": spiders })),
        None => error(format!("project '{project}' not found")),
    }
}

async fn list_versions(
    State(state): State<MockState>,
    Query(params): Query<HashMap<String, String>>,
) -> Json<Value> {
    let Some(project) = params.get("project") else {
        return error("project is required");
    };
    let registry = state.registry.read().await;
    let versions: Vec<&str> = registry
        .projects
        .get(project)
        .map(|versions| versions.iter().map(|v| v.name.as_str()).collect())
        .unwrap_or_default();
    ok(json!({ "node_name": NODE_NAME, "versions": versions }))
}

// --- test hooks ---

/// Move a job one step along pending -> running -> finished.
async fn advance(
    State(state): State<MockState>,
    Form(fields): Form<Vec<(String, String)>>,
) -> Json<Value> {
    let (Some(project), Some(id)) = (field(&fields, "project"), field(&fields, "job")) else {
        return error("project and job are required");
    };
    let mut registry = state.registry.write().await;
    let Some(job) = registry.job_mut(project, id) else {
        return error(format!("job '{id}' not found"));
    };
    match job.state {
        JobState::Pending => {
            job.state = JobState::Running;
            job.start_time = Some(now());
        }
        JobState::Running => {
            job.state = JobState::Finished;
            job.end_time = Some(now());
        }
        JobState::Finished => return error(format!("job '{id}' already finished")),
    }
    ok(json!({ "state": job.state }))
}

async fn broken_status() -> (StatusCode, &'static str) {
    (StatusCode::INTERNAL_SERVER_ERROR, "boom")
}

async fn broken_text() -> &'static str {
    "this-aint-json"
}

async fn slow() -> Json<Value> {
    tokio::time::sleep(Duration::from_millis(1500)).await;
    ok(json!({ "projects": [] }))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn job(state: JobState) -> Job {
        Job {
            id: "abc".to_string(),
            project: "p".to_string(),
            spider: "s".to_string(),
            state,
            settings: vec!["A=1".to_string()],
            args: BTreeMap::from([("arg".to_string(), "x".to_string())]),
            start_time: None,
            end_time: None,
        }
    }

    #[test]
    fn job_serializes_without_internal_state() {
        let json = serde_json::to_value(job(JobState::Running)).unwrap();
        assert_eq!(json["id"], "abc");
        assert_eq!(json["spider"], "s");
        assert_eq!(json["settings"][0], "A=1");
        assert_eq!(json["args"]["arg"], "x");
        assert!(json.get("state").is_none());
        assert!(json.get("start_time").is_none());
    }

    #[test]
    fn ok_envelope_adds_status() {
        let Json(body) = ok(json!({ "jobid": "j" }));
        assert_eq!(body["status"], "ok");
        assert_eq!(body["jobid"], "j");
    }

    #[test]
    fn error_envelope_carries_message() {
        let Json(body) = error("nope");
        assert_eq!(body, json!({ "status": "error", "message": "nope" }));
    }

    #[test]
    fn registry_resolves_latest_or_named_version() {
        let mut registry = Registry::default();
        registry.projects.insert(
            "p".to_string(),
            vec![
                Version {
                    name: "1".to_string(),
                    spiders: vec!["old".to_string()],
                },
                Version {
                    name: "2".to_string(),
                    spiders: vec!["new".to_string()],
                },
            ],
        );
        assert_eq!(registry.spiders("p", None).unwrap(), ["new".to_string()]);
        assert_eq!(registry.spiders("p", Some("1")).unwrap(), ["old".to_string()]);
        assert!(registry.spiders("p", Some("3")).is_none());
        assert!(registry.spiders("q", None).is_none());
    }

    #[test]
    fn credentials_become_basic_header() {
        let state = MockState::new().with_credentials("username", "password");
        assert_eq!(
            state.authorization.as_deref(),
            Some("Basic dXNlcm5hbWU6cGFzc3dvcmQ=")
        );
    }
}
