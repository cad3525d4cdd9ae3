//! GitLab REST API v4 membership client.
//!
//! # Example
//!
//! ```ignore
//! use rolesync_core::{ConnectionSource, GitLabClient, MembershipService};
//!
//! let settings = ConnectionSource::ConfigFile { path: "rolesync.toml".into() }.resolve()?;
//! let client = GitLabClient::new(&settings)?;
//! let groups = client.list_groups().await?;
//! ```

use async_trait::async_trait;
use reqwest::{Certificate, RequestBuilder, Response};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::service::{Group, Member, MembershipService, User};
use crate::{AccessLevel, ConnectionSettings, Error, PrivateToken, Result};

/// Items requested per page when listing collections.
pub const PER_PAGE: u32 = 100;

/// Response header carrying the next page number (empty on the last page).
const NEXT_PAGE_HEADER: &str = "x-next-page";

/// Request header carrying a personal access token.
const TOKEN_HEADER: &str = "PRIVATE-TOKEN";

// ────────────────────────────────────────────────────────────────────────────
// GitLab API Request Types
// ────────────────────────────────────────────────────────────────────────────

/// Body of `PUT /groups/:id/members/:user_id`.
#[derive(Debug, Serialize)]
struct UpdateMemberRequest {
    access_level: AccessLevel,
}

/// Body of `POST /groups/:id/members`.
#[derive(Debug, Serialize)]
struct AddMemberRequest {
    user_id: u64,
    access_level: AccessLevel,
}

// ────────────────────────────────────────────────────────────────────────────
// GitLabClient
// ────────────────────────────────────────────────────────────────────────────

/// Membership service backed by a GitLab instance.
pub struct GitLabClient {
    api_url: String,
    token: PrivateToken,
    client: reqwest::Client,
}

impl GitLabClient {
    /// Build a client, trusting any extra root certificates from the settings.
    pub fn new(settings: &ConnectionSettings) -> Result<Self> {
        let mut builder = reqwest::Client::builder().user_agent(concat!(
            "rolesync/",
            env!("CARGO_PKG_VERSION")
        ));

        if let Some(pem) = settings.ca_bundle_pem() {
            let certificates =
                Certificate::from_pem_bundle(pem).map_err(|e| Error::Tls(e.to_string()))?;
            if certificates.is_empty() {
                return Err(Error::Tls("CA bundle contains no certificates".to_string()));
            }
            debug!(count = certificates.len(), "adding custom root certificates");
            for certificate in certificates {
                builder = builder.add_root_certificate(certificate);
            }
        }

        let client = builder.build().map_err(|e| Error::Tls(e.to_string()))?;

        Ok(Self {
            api_url: format!("{}/api/v4", settings.url()),
            token: settings.token().clone(),
            client,
        })
    }

    /// Get the API base URL (`<instance>/api/v4`).
    pub fn api_url(&self) -> &str {
        &self.api_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.api_url, path)
    }

    fn authorized(&self, request: RequestBuilder) -> RequestBuilder {
        request.header(TOKEN_HEADER, self.token.expose_secret())
    }

    async fn send(&self, request: RequestBuilder) -> Result<Response> {
        let response = self
            .authorized(request)
            .send()
            .await
            .map_err(|e| Error::Request(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Api { status, body });
        }

        Ok(response)
    }

    /// Fetch every page of a collection endpoint.
    ///
    /// Follows `X-Next-Page` until GitLab reports no further page.
    async fn get_all<T>(&self, path: &str, query: &[(&str, &str)]) -> Result<Vec<T>>
    where
        T: DeserializeOwned,
    {
        let url = self.url(path);
        let per_page = PER_PAGE.to_string();
        let mut items = Vec::new();
        let mut page = 1u32;

        loop {
            let page_param = page.to_string();
            debug!(%url, page, "fetching page");
            let request = self
                .client
                .get(&url)
                .query(query)
                .query(&[("per_page", per_page.as_str()), ("page", page_param.as_str())]);

            let response = self.send(request).await?;
            let next_page = next_page(&response)?;
            let batch: Vec<T> = response
                .json()
                .await
                .map_err(|e| Error::InvalidResponse(e.to_string()))?;
            items.extend(batch);

            match next_page {
                Some(next) if next > page => page = next,
                Some(next) => {
                    return Err(Error::InvalidResponse(format!(
                        "pagination did not advance: page {page} -> {next}"
                    )));
                }
                None => break,
            }
        }

        Ok(items)
    }
}

/// Read the next page number, `None` on the last page.
fn next_page(response: &Response) -> Result<Option<u32>> {
    let Some(value) = response.headers().get(NEXT_PAGE_HEADER) else {
        return Ok(None);
    };
    let value = value
        .to_str()
        .map_err(|e| Error::InvalidResponse(format!("bad {NEXT_PAGE_HEADER} header: {e}")))?
        .trim();
    if value.is_empty() {
        return Ok(None);
    }
    value
        .parse()
        .map(Some)
        .map_err(|e| Error::InvalidResponse(format!("bad {NEXT_PAGE_HEADER} header {value:?}: {e}")))
}

#[async_trait]
impl MembershipService for GitLabClient {
    async fn list_groups(&self) -> Result<Vec<Group>> {
        self.get_all("/groups", &[]).await
    }

    async fn list_members(&self, group_id: u64) -> Result<Vec<Member>> {
        self.get_all(&format!("/groups/{group_id}/members"), &[]).await
    }

    async fn update_member(&self, group_id: u64, user_id: u64, level: AccessLevel) -> Result<()> {
        let url = self.url(&format!("/groups/{group_id}/members/{user_id}"));
        debug!(%url, level = level.0, "updating member");
        self.send(
            self.client
                .put(&url)
                .json(&UpdateMemberRequest { access_level: level }),
        )
        .await?;
        Ok(())
    }

    async fn find_users(&self, username: &str) -> Result<Vec<User>> {
        self.get_all("/users", &[("username", username)]).await
    }

    async fn add_member(&self, group_id: u64, user_id: u64, level: AccessLevel) -> Result<()> {
        let url = self.url(&format!("/groups/{group_id}/members"));
        debug!(%url, user_id, level = level.0, "adding member");
        self.send(self.client.post(&url).json(&AddMemberRequest {
            user_id,
            access_level: level,
        }))
        .await?;
        Ok(())
    }
}
