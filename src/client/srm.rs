//! SRM API client implementation

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use log::debug;
use reqwest::{Client as HttpClient, RequestBuilder, Response, StatusCode, Url};
use serde::Deserialize;
use serde::de::DeserializeOwned;

use super::api::{AnalysisApi, ProjectApi, SystemApi};
use super::models::{Branch, CreateProjectRequest, JobHandle, JobStatus, Project};
use crate::error::{ApiError, Error, PermissionError, Result};
use crate::packaging::UploadPayload;

/// Header carrying the API key on authenticated requests
const API_KEY_HEADER: &str = "API-Key";

/// Fields the system-info endpoint is allowed to return
const SYSTEM_INFO_FIELDS: [&str; 2] = ["version", "date"];

/// Permissions an API key needs to submit an analysis, without project suffix
const REQUIRED_PERMISSIONS: [&str; 1] = ["analysis:create"];

/// SRM API client
pub struct SrmClient {
    http: HttpClient,
    base_url: String,
    api_key: String,
}

impl SrmClient {
    /// Create a new client.
    ///
    /// `ca_cert_pem` adds a PEM-encoded certificate to the trusted roots, for
    /// servers behind a private CA.
    pub fn new(base_url: &str, api_key: &str, ca_cert_pem: Option<&[u8]>) -> Result<Self> {
        let mut builder = HttpClient::builder()
            .connect_timeout(Duration::from_secs(30))
            .user_agent(concat!("srm-analyze/", env!("CARGO_PKG_VERSION")));

        if let Some(pem) = ca_cert_pem {
            let cert = reqwest::Certificate::from_pem(pem)
                .map_err(|e| ApiError::Network(format!("Invalid CA certificate: {}", e)))?;
            builder = builder.add_root_certificate(cert);
        }

        let http = builder
            .build()
            .map_err(|e| ApiError::Network(e.to_string()))?;

        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Submission endpoint for a project.
    ///
    /// The base branch rides along as a matrix parameter on the project
    /// segment. The segment is percent-encoded as a whole so branch names
    /// containing `/`, `?` or `#` stay inside it.
    fn analysis_url(&self, project_id: u64, base_branch: Option<&str>) -> Result<Url> {
        let project_segment = match base_branch {
            Some(base) => format!("{};branch={}", project_id, base),
            None => project_id.to_string(),
        };

        let mut url = Url::parse(&self.url("/api/projects"))
            .map_err(|e| ApiError::Network(format!("Invalid server URL: {}", e)))?;
        url.path_segments_mut()
            .map_err(|_| ApiError::Network(format!("Invalid server URL: {}", self.base_url)))?
            .push(&project_segment)
            .push("analysis");
        Ok(url)
    }

    /// Attach the API key to a request
    fn authed(&self, builder: RequestBuilder) -> RequestBuilder {
        builder.header(API_KEY_HEADER, &self.api_key)
    }

    /// Send an authenticated request and decode a JSON success body
    async fn send_json<T: DeserializeOwned>(&self, builder: RequestBuilder) -> Result<T> {
        let response = self.authed(builder).send().await.map_err(ApiError::from)?;
        read_json(response).await
    }
}

/// Decode a JSON body, turning non-2xx responses into [`ApiError::Remote`]
async fn read_json<T: DeserializeOwned>(response: Response) -> Result<T> {
    let status = response.status();
    debug!("<- {} {}", status.as_u16(), response.url().path());

    let body = response
        .text()
        .await
        .map_err(|e| ApiError::InvalidResponse(format!("Failed to read response: {}", e)))?;

    if !status.is_success() {
        return Err(ApiError::from_response(status, &body).into());
    }

    serde_json::from_str(&body).map_err(|e| {
        ApiError::InvalidResponse(format!(
            "Failed to parse response: {}. Body was: {}",
            e, body
        ))
        .into()
    })
}

/// Validate a system-info body and extract the version
fn parse_system_info(body: &serde_json::Value) -> Result<String> {
    let map = match body {
        serde_json::Value::Object(map) => map,
        other => {
            let kind = match other {
                serde_json::Value::Array(_) => "array",
                serde_json::Value::String(_) => "string",
                serde_json::Value::Number(_) => "number",
                serde_json::Value::Bool(_) => "boolean",
                _ => "null",
            };
            return Err(Error::Connectivity(format!(
                "Expected JSON object response, got {}.",
                kind
            )));
        }
    };

    let unexpected: Vec<&str> = map
        .keys()
        .map(String::as_str)
        .filter(|k| !SYSTEM_INFO_FIELDS.contains(k))
        .collect();
    if !unexpected.is_empty() {
        return Err(Error::Connectivity(format!(
            "Received unexpected fields {}.",
            unexpected.join(", ")
        )));
    }

    map.get("version")
        .and_then(|v| v.as_str())
        .map(str::to_string)
        .ok_or_else(|| Error::Connectivity("Response has no 'version' field.".to_string()))
}

/// Required permissions the server did not grant, without the project suffix
fn missing_permissions(needed: &[String], granted: &HashMap<String, bool>) -> Vec<String> {
    needed
        .iter()
        .filter(|p| !granted.get(*p).copied().unwrap_or(false))
        .map(|p| match p.rsplit_once(':') {
            Some((name, _project)) => name.to_string(),
            None => p.clone(),
        })
        .collect()
}

#[async_trait]
impl SystemApi for SrmClient {
    async fn test_connection(&self) -> Result<String> {
        let url = self.url("/x/system-info");
        debug!("-> GET {}", url);

        let response = self.http.get(&url).send().await.map_err(ApiError::from)?;
        let status = response.status();
        if !status.is_success() {
            return Err(Error::Connectivity(format!(
                "Expected OK response, got {}.",
                status.as_u16()
            )));
        }

        let body: serde_json::Value = response
            .json()
            .await
            .map_err(|_| Error::Connectivity("Expected JSON response.".to_string()))?;

        parse_system_info(&body)
    }

    async fn validate_permissions(&self, project_id: u64) -> Result<()> {
        let needed: Vec<String> = REQUIRED_PERMISSIONS
            .iter()
            .map(|p| format!("{}:{}", p, project_id))
            .collect();

        let url = self.url("/x/check-permissions");
        debug!("-> POST {} {:?}", url, needed);

        let response = self
            .authed(self.http.post(&url))
            .json(&needed)
            .send()
            .await
            .map_err(ApiError::from)?;

        if response.status() == StatusCode::FORBIDDEN {
            return Err(PermissionError::Forbidden.into());
        }

        let granted: HashMap<String, bool> = read_json(response).await?;
        let missing = missing_permissions(&needed, &granted);
        if !missing.is_empty() {
            return Err(PermissionError::Missing(missing).into());
        }

        Ok(())
    }
}

#[async_trait]
impl ProjectApi for SrmClient {
    async fn list_projects(&self) -> Result<Vec<Project>> {
        let url = self.url("/x/projects");
        debug!("-> GET {}", url);
        self.send_json(self.http.get(&url)).await
    }

    async fn create_project(&self, request: CreateProjectRequest) -> Result<Project> {
        let url = self.url("/api/projects");
        debug!("-> POST {} name={}", url, request.name);
        self.send_json(self.http.post(&url).json(&request)).await
    }

    async fn get_branches(&self, project_id: u64) -> Result<Vec<Branch>> {
        let url = self.url(&format!("/x/projects/{}/branches", project_id));
        debug!("-> GET {}", url);
        self.send_json(self.http.get(&url)).await
    }
}

#[async_trait]
impl AnalysisApi for SrmClient {
    async fn submit_analysis(
        &self,
        project_id: u64,
        base_branch: Option<&str>,
        target_branch: Option<&str>,
        payload: &UploadPayload,
    ) -> Result<JobHandle> {
        let url = self.analysis_url(project_id, base_branch)?;
        debug!(
            "-> POST {} branchName={:?} parts={:?}",
            url,
            target_branch,
            payload.part_names()
        );

        let mut builder = self.http.post(url);
        if let Some(target) = target_branch {
            builder = builder.query(&[("branchName", target)]);
        }

        let form = payload.to_form().await?;
        self.send_json(builder.multipart(form)).await
    }

    async fn get_job_status(&self, job_id: &str) -> Result<JobStatus> {
        #[derive(Deserialize)]
        struct JobResponse {
            status: JobStatus,
        }

        let url = self.url(&format!("/api/jobs/{}", job_id));
        debug!("-> GET {}", url);
        let response: JobResponse = self.send_json(self.http.get(&url)).await?;
        Ok(response.status)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::packaging::ResolvedFile;
    use mockito::Matcher;
    use serde_json::json;

    fn client(server: &mockito::ServerGuard) -> SrmClient {
        SrmClient::new(&server.url(), "secret-key", None).unwrap()
    }

    #[test]
    fn test_client_creation() {
        let client = SrmClient::new("https://srm.example.com/", "key", None);
        assert!(client.is_ok());
        assert_eq!(client.unwrap().base_url, "https://srm.example.com");
    }

    #[test]
    fn test_parse_system_info_accepts_expected_shape() {
        let version = parse_system_info(&json!({"version": "2023.8.3", "date": "2023-08-01"}));
        assert_eq!(version.unwrap(), "2023.8.3");
    }

    #[test]
    fn test_parse_system_info_rejects_extra_fields() {
        let err = parse_system_info(&json!({"version": "1", "date": "x", "name": "jenkins"}))
            .unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("unexpected fields name"));
        assert!(msg.contains("Is this an SRM instance?"));
    }

    #[test]
    fn test_parse_system_info_rejects_non_object() {
        let err = parse_system_info(&json!(["version"])).unwrap_err();
        assert!(err.to_string().contains("got array"));
    }

    #[test]
    fn test_missing_permissions_strips_project_suffix() {
        let needed = vec!["analysis:create:12".to_string()];
        let mut granted = HashMap::new();
        granted.insert("analysis:create:12".to_string(), false);
        assert_eq!(missing_permissions(&needed, &granted), vec!["analysis:create"]);

        granted.insert("analysis:create:12".to_string(), true);
        assert!(missing_permissions(&needed, &granted).is_empty());

        assert_eq!(
            missing_permissions(&needed, &HashMap::new()),
            vec!["analysis:create"]
        );
    }

    #[tokio::test]
    async fn test_connection_returns_version() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/x/system-info")
            .match_header("API-Key", Matcher::Missing)
            .with_status(200)
            .with_body(r#"{"version": "2024.3.1", "date": "2024-03-01"}"#)
            .create_async()
            .await;

        let version = client(&server).test_connection().await.unwrap();
        assert_eq!(version, "2024.3.1");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_connection_non_ok_is_connectivity_error() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/x/system-info")
            .with_status(404)
            .create_async()
            .await;

        let err = client(&server).test_connection().await.unwrap_err();
        assert!(matches!(err, Error::Connectivity(_)));
        assert!(err.to_string().contains("got 404"));
    }

    #[tokio::test]
    async fn test_validate_permissions_sends_scoped_permissions() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/x/check-permissions")
            .match_header("API-Key", "secret-key")
            .match_body(Matcher::Json(json!(["analysis:create:7"])))
            .with_status(200)
            .with_body(r#"{"analysis:create:7": true}"#)
            .create_async()
            .await;

        client(&server).validate_permissions(7).await.unwrap();
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_validate_permissions_forbidden() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/x/check-permissions")
            .with_status(403)
            .create_async()
            .await;

        let err = client(&server).validate_permissions(7).await.unwrap_err();
        assert!(matches!(err, Error::Permission(PermissionError::Forbidden)));
    }

    #[tokio::test]
    async fn test_validate_permissions_missing() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/x/check-permissions")
            .with_status(200)
            .with_body(r#"{"analysis:create:7": false}"#)
            .create_async()
            .await;

        let err = client(&server).validate_permissions(7).await.unwrap_err();
        assert!(err.to_string().contains("analysis:create"));
    }

    #[tokio::test]
    async fn test_list_projects() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/x/projects")
            .match_header("API-Key", "secret-key")
            .with_status(200)
            .with_body(r#"[{"id": 1, "name": "alpha"}, {"id": 2, "name": "beta", "parentId": null}]"#)
            .create_async()
            .await;

        let projects = client(&server).list_projects().await.unwrap();
        assert_eq!(projects.len(), 2);
        assert_eq!(projects[1].id, 2);
        assert_eq!(projects[1].name, "beta");
    }

    #[tokio::test]
    async fn test_create_project_sends_default_branch() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/api/projects")
            .match_body(Matcher::Json(json!({"name": "demo", "defaultBranchName": "main"})))
            .with_status(200)
            .with_body(r#"{"id": 9, "name": "demo"}"#)
            .create_async()
            .await;

        let project = client(&server)
            .create_project(CreateProjectRequest {
                name: "demo".to_string(),
                default_branch_name: Some("main".to_string()),
            })
            .await
            .unwrap();
        assert_eq!(project.id, 9);
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_remote_error_carries_error_field() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/x/projects/3/branches")
            .with_status(400)
            .with_body(r#"{"error": "Project 3 does not exist"}"#)
            .create_async()
            .await;

        let err = client(&server).get_branches(3).await.unwrap_err();
        assert_eq!(
            err.to_string(),
            "Bad Request (HTTP 400): Project 3 does not exist"
        );
    }

    #[tokio::test]
    async fn test_submit_analysis_with_branches() {
        let temp = tempfile::tempdir().unwrap();
        let scan = temp.path().join("report.xml");
        std::fs::write(&scan, "<report/>").unwrap();

        let mut payload = UploadPayload::new();
        payload.attach_scan_files(&[ResolvedFile {
            absolute: scan,
            relative: "report.xml".to_string(),
        }]);

        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/api/projects/5;branch=main/analysis")
            .match_query(Matcher::UrlEncoded(
                "branchName".to_string(),
                "feature/x".to_string(),
            ))
            .match_header("API-Key", "secret-key")
            .match_header(
                "content-type",
                Matcher::Regex("^multipart/form-data".to_string()),
            )
            .with_status(202)
            .with_body(r#"{"analysisId": 11, "jobId": "job-11"}"#)
            .create_async()
            .await;

        let handle = client(&server)
            .submit_analysis(5, Some("main"), Some("feature/x"), &payload)
            .await
            .unwrap();
        assert_eq!(handle.analysis_id, "11");
        assert_eq!(handle.job_id, "job-11");
        mock.assert_async().await;
    }

    #[test]
    fn test_analysis_url_encodes_base_branch() {
        let client = SrmClient::new("https://srm.example.com/srm/", "key", None).unwrap();

        let url = client.analysis_url(5, Some("release/1.0")).unwrap();
        assert_eq!(url.path(), "/srm/api/projects/5;branch=release%2F1.0/analysis");

        let url = client.analysis_url(5, Some("rc#2?")).unwrap();
        assert_eq!(url.path(), "/srm/api/projects/5;branch=rc%232%3F/analysis");
        assert_eq!(url.fragment(), None);
        assert_eq!(url.query(), None);

        let url = client.analysis_url(5, None).unwrap();
        assert_eq!(url.path(), "/srm/api/projects/5/analysis");
    }

    #[tokio::test]
    async fn test_submit_analysis_with_slashed_base_branch() {
        let temp = tempfile::tempdir().unwrap();
        let scan = temp.path().join("report.xml");
        std::fs::write(&scan, "<report/>").unwrap();

        let mut payload = UploadPayload::new();
        payload.attach_scan_files(&[ResolvedFile {
            absolute: scan,
            relative: "report.xml".to_string(),
        }]);

        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/api/projects/5;branch=release%2F1.0/analysis")
            .match_query(Matcher::UrlEncoded(
                "branchName".to_string(),
                "feature/x".to_string(),
            ))
            .with_status(202)
            .with_body(r#"{"analysisId": 12, "jobId": "job-12"}"#)
            .create_async()
            .await;

        let handle = client(&server)
            .submit_analysis(5, Some("release/1.0"), Some("feature/x"), &payload)
            .await
            .unwrap();
        assert_eq!(handle.job_id, "job-12");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_submit_analysis_legacy_path() {
        let temp = tempfile::tempdir().unwrap();
        let scan = temp.path().join("report.xml");
        std::fs::write(&scan, "<report/>").unwrap();

        let mut payload = UploadPayload::new();
        payload.attach_scan_files(&[ResolvedFile {
            absolute: scan,
            relative: "report.xml".to_string(),
        }]);

        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/api/projects/5/analysis")
            .match_body(Matcher::Regex(
                r#"(?s)name="1-report.xml"; filename="report.xml".*<report/>"#.to_string(),
            ))
            .with_status(200)
            .with_body(r#"{"analysisId": 1, "jobId": "j"}"#)
            .create_async()
            .await;

        client(&server)
            .submit_analysis(5, None, None, &payload)
            .await
            .unwrap();
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_get_job_status() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/api/jobs/job-11")
            .with_status(200)
            .with_body(r#"{"jobId": "job-11", "status": "running", "progress": 0.4}"#)
            .create_async()
            .await;

        let status = client(&server).get_job_status("job-11").await.unwrap();
        assert_eq!(status, JobStatus::Running);
    }
}
