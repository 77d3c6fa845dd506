//! The Scrapyd API façade.
//!
//! # Design
//! `ScrapydApi` holds the target, the endpoint table, a [`Client`] and an
//! optional timeout, all fixed at construction. Each operation resolves its
//! endpoint, shapes a fresh payload, makes one round trip and pulls the
//! documented field out of the envelope. Errors from the client are returned
//! unchanged.

use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::debug;
use url::Url;

use crate::client::{Client, Envelope};
use crate::config::{ApiBuilder, ApiConfig};
use crate::endpoints::{Endpoint, Endpoints};
use crate::error::{ApiError, Result};
use crate::http::{FilePart, Form, HttpRequest, Multipart, RequestBody, Timeout};
use crate::types::{Egg, JobList, JobState, ScheduleOptions, UploadedSpiders};

/// Typed access to a Scrapyd service.
#[derive(Debug, Clone)]
pub struct ScrapydApi {
    target: Url,
    endpoints: Endpoints,
    client: Client,
    timeout: Option<Timeout>,
}

impl ScrapydApi {
    /// Client for `target` with default endpoints, no credentials and no timeout.
    pub fn new(target: impl Into<String>) -> Result<Self> {
        ApiBuilder::new(target).build()
    }

    pub fn builder(target: impl Into<String>) -> ApiBuilder {
        ApiBuilder::new(target)
    }

    pub fn from_config(config: ApiConfig) -> Result<Self> {
        ApiBuilder::from(config).build()
    }

    pub(crate) fn from_parts(
        target: Url,
        endpoints: Endpoints,
        client: Client,
        timeout: Option<Timeout>,
    ) -> Self {
        Self {
            target,
            endpoints,
            client,
            timeout,
        }
    }

    pub fn target(&self) -> &Url {
        &self.target
    }

    pub fn client(&self) -> &Client {
        &self.client
    }

    pub fn timeout(&self) -> Option<Timeout> {
        self.timeout
    }

    /// Absolute URL for `operation`, resolved against the target.
    pub fn build_url(&self, operation: &str) -> Result<String> {
        self.build_url_with(operation, &[])
    }

    /// Like [`ScrapydApi::build_url`], first replacing each `{name}`
    /// placeholder of the endpoint path with its value from `vars`.
    pub fn build_url_with(&self, operation: &str, vars: &[(&str, &str)]) -> Result<String> {
        let template = self
            .endpoints
            .get(operation)
            .ok_or_else(|| ApiError::UnknownEndpoint(operation.to_string()))?;
        let path = vars.iter().fold(template.to_string(), |path, (name, value)| {
            path.replace(&format!("{{{name}}}"), value)
        });
        let url = self.target.join(&path).map_err(|source| ApiError::InvalidTarget {
            target: self.target.to_string(),
            source,
        })?;
        Ok(url.into())
    }

    /// Upload a new version of `project`. Returns the spiders the service
    /// found in the egg.
    pub fn add_version(&self, project: &str, version: &str, egg: Egg) -> Result<UploadedSpiders> {
        debug!(project, version, bytes = egg.bytes.len(), "uploading version");
        let mut fields = Form::new();
        fields.set("project", project).set("version", version);
        let body = RequestBody::Multipart(Multipart {
            fields,
            files: vec![FilePart {
                name: "egg".to_string(),
                file_name: egg.file_name,
                content: egg.bytes,
            }],
        });
        let envelope = self.post(Endpoint::AddVersion, body)?;
        field(envelope, "spiders")
    }

    /// Cancel `job`. Returns the state the job was in, or `None` when the
    /// service did not know it.
    pub fn cancel(&self, project: &str, job: &str, signal: Option<&str>) -> Result<Option<JobState>> {
        debug!(project, job, ?signal, "cancelling job");
        let mut form = Form::new();
        form.set("project", project).set("job", job);
        if let Some(signal) = signal {
            form.set("signal", signal);
        }
        let envelope = self.post(Endpoint::Cancel, RequestBody::Form(form))?;
        field(envelope, "prevstate")
    }

    /// Delete `project` and all of its versions.
    pub fn delete_project(&self, project: &str) -> Result<()> {
        debug!(project, "deleting project");
        let mut form = Form::new();
        form.set("project", project);
        self.post(Endpoint::DeleteProject, RequestBody::Form(form))?;
        Ok(())
    }

    pub fn delete_version(&self, project: &str, version: &str) -> Result<()> {
        debug!(project, version, "deleting version");
        let mut form = Form::new();
        form.set("project", project).set("version", version);
        self.post(Endpoint::DeleteVersion, RequestBody::Form(form))?;
        Ok(())
    }

    /// Every known job of `project`, grouped by state.
    pub fn list_jobs(&self, project: &str) -> Result<JobList> {
        let envelope = self.get(Endpoint::ListJobs, Some(project))?;
        decode(Value::Object(envelope))
    }

    pub fn list_projects(&self) -> Result<Vec<String>> {
        let envelope = self.get(Endpoint::ListProjects, None)?;
        field(envelope, "projects")
    }

    pub fn list_spiders(&self, project: &str) -> Result<Vec<String>> {
        let envelope = self.get(Endpoint::ListSpiders, Some(project))?;
        field(envelope, "spiders")
    }

    pub fn list_versions(&self, project: &str) -> Result<Vec<String>> {
        let envelope = self.get(Endpoint::ListVersions, Some(project))?;
        field(envelope, "versions")
    }

    /// Queue a run of `spider`. Returns the new job id.
    ///
    /// Extra fields from `options` are sent as given; one named like a base
    /// field (`project`, `spider`) replaces it.
    pub fn schedule(&self, project: &str, spider: &str, options: &ScheduleOptions) -> Result<String> {
        debug!(project, spider, settings = options.settings.len(), "scheduling spider");
        let mut form = Form::new();
        form.set("project", project).set("spider", spider);
        for (name, value) in &options.fields {
            form.set(name.as_str(), value.as_str());
        }
        let mut settings = options
            .settings
            .iter()
            .map(|(name, value)| format!("{name}={value}"));
        if let Some(first) = settings.next() {
            form.set("setting", first);
            for setting in settings {
                form.append("setting", setting);
            }
        }
        let envelope = self.post(Endpoint::Schedule, RequestBody::Form(form))?;
        field(envelope, "jobid")
    }

    /// State of `job_id` within `project`, or `None` if no list holds it.
    ///
    /// States are scanned pending, running, finished; the first match wins.
    pub fn job_status(&self, project: &str, job_id: &str) -> Result<Option<JobState>> {
        Ok(self.list_jobs(project)?.state_of(job_id))
    }

    fn get(&self, endpoint: Endpoint, project: Option<&str>) -> Result<Envelope> {
        let mut request = HttpRequest::get(self.build_url(endpoint.key())?).timeout(self.timeout);
        if let Some(project) = project {
            request = request.query("project", project);
        }
        self.client.request(&request)
    }

    fn post(&self, endpoint: Endpoint, body: RequestBody) -> Result<Envelope> {
        let request = HttpRequest::post(self.build_url(endpoint.key())?, body).timeout(self.timeout);
        self.client.request(&request)
    }
}

fn field<T: DeserializeOwned>(mut envelope: Envelope, name: &str) -> Result<T> {
    let value = envelope
        .remove(name)
        .ok_or_else(|| ApiError::UnexpectedResponse(format!("missing field `{name}`")))?;
    decode(value)
}

fn decode<T: DeserializeOwned>(value: Value) -> Result<T> {
    serde_json::from_value(value).map_err(|e| ApiError::UnexpectedResponse(e.to_string()))
}
