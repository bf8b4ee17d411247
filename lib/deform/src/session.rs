//! Client hierarchy.
//!
//! - [`Client`] - anonymous: log in, register, confirm
//! - [`SessionClient`] - a logged-in user: profile and projects
//! - [`ProjectClient`] - one project: collections and documents
//!
//! All three share one transport and one set of resource tables.

use std::sync::Arc;

use crate::resources::{BoundResource, Tables};
use crate::{ApiClient, Args, Auth, Endpoint, HttpClient, HyperClient, Result};

/// Anonymous client.
///
/// # Example
///
/// ```no_run
/// use deform::{Client, Endpoint};
///
/// # async fn run() -> deform::Result<()> {
/// let client = Client::new(Endpoint::new("deform.io"))?;
/// let session = client.login("me@example.com", "secret").await?;
/// let project = session.use_project("venues")?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct Client<C = HyperClient> {
    endpoint: Endpoint,
    api: ApiClient<C>,
    tables: Arc<Tables>,
}

impl Client<HyperClient> {
    /// Client over a default [`HyperClient`].
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidUrl`](crate::Error::InvalidUrl) for an unusable
    /// endpoint.
    pub fn new(endpoint: Endpoint) -> Result<Self> {
        Self::with_http(endpoint, HyperClient::new())
    }
}

impl<C: HttpClient + Clone + 'static> Client<C> {
    /// Client over `http`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidUrl`](crate::Error::InvalidUrl) for an unusable
    /// endpoint.
    pub fn with_http(endpoint: Endpoint, http: C) -> Result<Self> {
        let api = ApiClient::with_url(http, endpoint.base_url(None)?);
        Ok(Self {
            endpoint,
            api,
            tables: Arc::new(Tables::build()?),
        })
    }

    /// Where requests go.
    #[must_use]
    pub const fn endpoint(&self) -> &Endpoint {
        &self.endpoint
    }

    /// The current user: `login`, `logout`, `create`, `confirm`, `get`.
    #[must_use]
    pub fn user(&self) -> BoundResource<ApiClient<C>> {
        BoundResource::new(Arc::clone(&self.tables.user), self.api.clone())
    }

    /// Log in and continue as that user.
    ///
    /// # Errors
    ///
    /// Returns the classified failure, e.g. [`ErrorKind::Auth`](crate::ErrorKind::Auth)
    /// for wrong credentials.
    pub async fn login(
        &self,
        email: impl Into<String>,
        password: impl Into<String>,
    ) -> Result<SessionClient<C>> {
        let session_id: String = self
            .user()
            .call(
                "login",
                Args::new()
                    .arg("email", email.into())
                    .arg("password", password.into()),
            )
            .await?
            .deserialize()?;
        Ok(self.session(session_id))
    }

    /// Continue with an existing session.
    #[must_use]
    pub fn session(&self, session_id: impl Into<String>) -> SessionClient<C> {
        SessionClient {
            endpoint: self.endpoint.clone(),
            api: self.api.clone().with_auth(Auth::Session(session_id.into())),
            tables: Arc::clone(&self.tables),
        }
    }

    /// Work on `project` with a project token.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidUrl`](crate::Error::InvalidUrl) when the
    /// project does not form a valid host name.
    pub fn project_with_token(
        &self,
        project: &str,
        token: impl Into<String>,
    ) -> Result<ProjectClient<C>> {
        let api = self
            .api
            .rebase(self.endpoint.base_url(Some(project))?)
            .with_auth(Auth::Token(token.into()));
        Ok(ProjectClient {
            api,
            tables: Arc::clone(&self.tables),
        })
    }
}

/// A logged-in user.
#[derive(Debug, Clone)]
pub struct SessionClient<C = HyperClient> {
    endpoint: Endpoint,
    api: ApiClient<C>,
    tables: Arc<Tables>,
}

impl<C: HttpClient + Clone + 'static> SessionClient<C> {
    /// The `Authorization` header sent.
    #[must_use]
    pub fn auth_header(&self) -> Option<String> {
        self.api.auth().map(Auth::header_value)
    }

    /// The current user.
    #[must_use]
    pub fn user(&self) -> BoundResource<ApiClient<C>> {
        self.bind(&self.tables.user)
    }

    /// Projects: `get`, `find`, `count`.
    #[must_use]
    pub fn projects(&self) -> BoundResource<ApiClient<C>> {
        self.bind(&self.tables.projects)
    }

    /// One project: `get`, `create`, `save`, `update`, `remove`.
    #[must_use]
    pub fn project(&self) -> BoundResource<ApiClient<C>> {
        self.bind(&self.tables.project)
    }

    /// Work on `project` with this session.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidUrl`](crate::Error::InvalidUrl) when the
    /// project does not form a valid host name.
    pub fn use_project(&self, project: &str) -> Result<ProjectClient<C>> {
        Ok(ProjectClient {
            api: self.api.rebase(self.endpoint.base_url(Some(project))?),
            tables: Arc::clone(&self.tables),
        })
    }

    fn bind(&self, resource: &Arc<crate::Resource>) -> BoundResource<ApiClient<C>> {
        BoundResource::new(Arc::clone(resource), self.api.clone())
    }
}

/// One project, with session or token credentials.
#[derive(Debug, Clone)]
pub struct ProjectClient<C = HyperClient> {
    api: ApiClient<C>,
    tables: Arc<Tables>,
}

impl<C: HttpClient + Clone + 'static> ProjectClient<C> {
    /// The `Authorization` header sent.
    #[must_use]
    pub fn auth_header(&self) -> Option<String> {
        self.api.auth().map(Auth::header_value)
    }

    /// Project-scoped base URL.
    #[must_use]
    pub fn base_url(&self) -> &url::Url {
        crate::DeformClient::base_url(&self.api)
    }

    /// Project information: `get`.
    #[must_use]
    pub fn info(&self) -> BoundResource<ApiClient<C>> {
        self.bind(&self.tables.info)
    }

    /// Collections: `get`, `find`, `count`, `update`, `upsert`, `remove`.
    #[must_use]
    pub fn collections(&self) -> BoundResource<ApiClient<C>> {
        self.bind(&self.tables.collections)
    }

    /// One collection: `get`, `create`, `save`, `update`, `remove`.
    #[must_use]
    pub fn collection(&self) -> BoundResource<ApiClient<C>> {
        self.bind(&self.tables.collection)
    }

    /// Documents of a collection; every operation takes `collection`.
    #[must_use]
    pub fn documents(&self) -> BoundResource<ApiClient<C>> {
        self.bind(&self.tables.documents)
    }

    /// One document, including `get_file` for stored files.
    #[must_use]
    pub fn document(&self) -> BoundResource<ApiClient<C>> {
        self.bind(&self.tables.document)
    }

    fn bind(&self, resource: &Arc<crate::Resource>) -> BoundResource<ApiClient<C>> {
        BoundResource::new(Arc::clone(resource), self.api.clone())
    }
}
