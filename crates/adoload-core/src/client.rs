//! Remote collaborator boundary. The loader only depends on the
//! [`WorkItemClient`] trait; [`AdoClient`] is the Azure DevOps 7.1 REST
//! implementation over a blocking reqwest client. Transport concerns stop
//! here — no retry, no backoff, one call at a time.

use crate::error::{LoaderError, Result};
use crate::patch::PatchOperation;
use serde::Deserialize;
use tracing::{debug, info};

const API_VERSION: &str = "7.1";
const JSON_PATCH_CONTENT_TYPE: &str = "application/json-patch+json";

// ---------------------------------------------------------------------------
// WorkItemClient
// ---------------------------------------------------------------------------

pub trait WorkItemClient {
    /// Probe access to the target project; returns its display name.
    fn get_project(&self) -> Result<String>;

    /// Create a work item of the given type; returns the new item's id.
    fn create_item(&self, work_item_type: &str, patch: &[PatchOperation]) -> Result<i64>;

    /// Apply a patch document to an existing work item.
    fn update_item(&self, id: i64, patch: &[PatchOperation]) -> Result<()>;
}

// ---------------------------------------------------------------------------
// AdoClient
// ---------------------------------------------------------------------------

pub struct AdoClient {
    http: reqwest::blocking::Client,
    organization_url: String,
    project: String,
    token: String,
}

#[derive(Debug, Deserialize)]
struct WorkItemResponse {
    id: i64,
}

#[derive(Debug, Deserialize)]
struct ProjectResponse {
    name: String,
}

impl AdoClient {
    pub fn new(
        organization_url: impl Into<String>,
        project: impl Into<String>,
        token: impl Into<String>,
    ) -> Self {
        let organization_url: String = organization_url.into();
        Self {
            http: reqwest::blocking::Client::new(),
            organization_url: organization_url.trim_end_matches('/').to_string(),
            project: project.into(),
            token: token.into(),
        }
    }

    pub fn organization_url(&self) -> &str {
        &self.organization_url
    }

    pub fn project(&self) -> &str {
        &self.project
    }

    fn work_items_url(&self, suffix: &str) -> String {
        format!(
            "{}/{}/_apis/wit/workitems/{}?api-version={}",
            self.organization_url, self.project, suffix, API_VERSION
        )
    }

    fn check(response: reqwest::blocking::Response) -> Result<reqwest::blocking::Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().unwrap_or_default();
        Err(LoaderError::Api {
            status: status.as_u16(),
            body,
        })
    }
}

impl WorkItemClient for AdoClient {
    fn get_project(&self) -> Result<String> {
        let url = format!(
            "{}/_apis/projects/{}?api-version={}",
            self.organization_url, self.project, API_VERSION
        );
        debug!(%url, "probing project access");
        let response = self
            .http
            .get(&url)
            .basic_auth("", Some(&self.token))
            .send()?;

        let status = response.status();
        if status.as_u16() == 401 || status.as_u16() == 403 {
            return Err(LoaderError::Unauthorized {
                organization_url: self.organization_url.clone(),
                project: self.project.clone(),
            });
        }
        let response = Self::check(response)?;
        let project: ProjectResponse = response.json()?;
        info!(project = %project.name, "access confirmed");
        Ok(project.name)
    }

    fn create_item(&self, work_item_type: &str, patch: &[PatchOperation]) -> Result<i64> {
        // The type lands in the URL path as e.g. `$User Story`.
        let url = self.work_items_url(&format!("${}", work_item_type.replace(' ', "%20")));
        debug!(%url, operations = patch.len(), "creating work item");
        let response = self
            .http
            .post(&url)
            .basic_auth("", Some(&self.token))
            .header(reqwest::header::CONTENT_TYPE, JSON_PATCH_CONTENT_TYPE)
            .json(patch)
            .send()?;
        let response = Self::check(response)?;
        let item: WorkItemResponse = response.json()?;
        Ok(item.id)
    }

    fn update_item(&self, id: i64, patch: &[PatchOperation]) -> Result<()> {
        let url = self.work_items_url(&id.to_string());
        debug!(%url, operations = patch.len(), "updating work item");
        let response = self
            .http
            .patch(&url)
            .basic_auth("", Some(&self.token))
            .header(reqwest::header::CONTENT_TYPE, JSON_PATCH_CONTENT_TYPE)
            .json(patch)
            .send()?;
        Self::check(response)?;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn client(server: &mockito::Server) -> AdoClient {
        AdoClient::new(server.url(), "Proj", "pat-token")
    }

    #[test]
    fn create_item_posts_json_patch_and_returns_id() {
        let mut server = mockito::Server::new();
        let mock = server
            .mock("POST", "/Proj/_apis/wit/workitems/$Feature")
            .match_query(mockito::Matcher::UrlEncoded(
                "api-version".into(),
                API_VERSION.into(),
            ))
            .match_header("content-type", JSON_PATCH_CONTENT_TYPE)
            .match_body(mockito::Matcher::PartialJson(serde_json::json!([
                {"op": "add", "path": "/fields/System.Title", "value": "Login"}
            ])))
            .with_status(200)
            .with_body(r#"{"id": 101, "rev": 1}"#)
            .create();

        let patch = vec![PatchOperation::add(
            "/fields/System.Title",
            serde_json::json!("Login"),
        )];
        let id = client(&server).create_item("Feature", &patch).unwrap();
        assert_eq!(id, 101);
        mock.assert();
    }

    #[test]
    fn create_item_failure_surfaces_status_and_body() {
        let mut server = mockito::Server::new();
        server
            .mock("POST", "/Proj/_apis/wit/workitems/$Task")
            .match_query(mockito::Matcher::Any)
            .with_status(400)
            .with_body("field does not exist")
            .create();

        let err = client(&server).create_item("Task", &[]).unwrap_err();
        match err {
            LoaderError::Api { status, body } => {
                assert_eq!(status, 400);
                assert!(body.contains("field does not exist"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn update_item_patches_by_id() {
        let mut server = mockito::Server::new();
        let mock = server
            .mock("PATCH", "/Proj/_apis/wit/workitems/7")
            .match_query(mockito::Matcher::Any)
            .with_status(200)
            .with_body(r#"{"id": 7, "rev": 2}"#)
            .create();

        let patch = crate::patch::parent_link_patch(&server.url(), "Proj", 3);
        client(&server).update_item(7, &patch).unwrap();
        mock.assert();
    }

    #[test]
    fn get_project_returns_name() {
        let mut server = mockito::Server::new();
        server
            .mock("GET", "/_apis/projects/Proj")
            .match_query(mockito::Matcher::Any)
            .with_status(200)
            .with_body(r#"{"id": "abc", "name": "Proj"}"#)
            .create();

        assert_eq!(client(&server).get_project().unwrap(), "Proj");
    }

    #[test]
    fn get_project_unauthorized_is_fatal() {
        let mut server = mockito::Server::new();
        server
            .mock("GET", "/_apis/projects/Proj")
            .match_query(mockito::Matcher::Any)
            .with_status(401)
            .create();

        let err = client(&server).get_project().unwrap_err();
        assert!(matches!(err, LoaderError::Unauthorized { .. }));
    }
}
