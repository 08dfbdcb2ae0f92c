use std::{convert::Infallible, fmt::Display, future::Future, io, net::SocketAddr, sync::Arc};

use bytes::Bytes;
use http_body_util::{BodyExt, Empty, Full};
use hyper::{
    body::Body,
    header::{self, HeaderValue},
    server::conn::http1,
    Method, Request, Response, StatusCode,
};
use hyper_util::{rt::TokioIo, service::TowerToHyperService};
use serde_json::Value;
use thiserror::Error;
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::cors::{AllowOrigin, CorsLayer};

use crate::{
    application::api::{
        person::person_router::{self, PersonHandler},
        route::{RouteMatch, RouteTable},
    },
    domain::person::PersonManager,
};

type BoxBody = http_body_util::combinators::BoxBody<Bytes, hyper::Error>;

/// Failure of a single request. Answered with the matching status and no body.
#[derive(Debug, Error, PartialEq)]
pub enum ApiError {
    #[error("bad request: {0}")]
    BadRequest(String),
    #[error("resource not found")]
    NotFound,
    #[error("method not allowed")]
    MethodNotAllowed(Vec<Method>),
    #[error("internal error: {0}")]
    Internal(String),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::NotFound => StatusCode::NOT_FOUND,
            ApiError::MethodNotAllowed(_) => StatusCode::METHOD_NOT_ALLOWED,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<ApiError> for Response<BoxBody> {
    fn from(value: ApiError) -> Self {
        match &value {
            ApiError::Internal(_) => tracing::error!(error = %value, "request failed"),
            _ => tracing::warn!(error = %value, "request rejected"),
        }
        let mut response = Response::new(empty());
        *response.status_mut() = value.status();
        if let ApiError::MethodNotAllowed(allowed) = &value {
            let allow = allowed
                .iter()
                .map(Method::as_str)
                .collect::<Vec<_>>()
                .join(", ");
            if let Ok(allow) = HeaderValue::from_str(&allow) {
                response.headers_mut().insert(header::ALLOW, allow);
            }
        }
        response
    }
}

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("cannot bind {address}: {source}")]
    Bind {
        address: SocketAddr,
        #[source]
        source: io::Error,
    },
    #[error("cannot accept connection: {0}")]
    Accept(#[source] io::Error),
}

/// Successful outcome of a handler, before it is turned into an HTTP response.
#[derive(Debug, PartialEq)]
pub struct ApiResponse {
    status: StatusCode,
    location: Option<String>,
    body: Option<Value>,
}

impl ApiResponse {
    pub fn ok(body: Value) -> Self {
        Self {
            status: StatusCode::OK,
            location: None,
            body: Some(body),
        }
    }

    pub fn created(location: String) -> Self {
        Self {
            status: StatusCode::CREATED,
            location: Some(location),
            body: None,
        }
    }

    pub fn no_content() -> Self {
        Self {
            status: StatusCode::NO_CONTENT,
            location: None,
            body: None,
        }
    }
}

impl TryFrom<ApiResponse> for Response<BoxBody> {
    type Error = ApiError;

    fn try_from(value: ApiResponse) -> Result<Self, Self::Error> {
        let mut response = match value.body {
            Some(body) => {
                let json = serde_json::to_vec(&body)
                    .map_err(|e| ApiError::Internal(format!("cannot encode body: {}", e)))?;
                let mut response = Response::new(full(json));
                response.headers_mut().insert(
                    header::CONTENT_TYPE,
                    HeaderValue::from_static("application/json"),
                );
                response
            }
            None => Response::new(empty()),
        };
        *response.status_mut() = value.status;
        if let Some(location) = value.location {
            let location = HeaderValue::try_from(location)
                .map_err(|e| ApiError::Internal(format!("invalid location header: {}", e)))?;
            response.headers_mut().insert(header::LOCATION, location);
        }
        Ok(response)
    }
}

pub struct MainRouter {
    address: SocketAddr,
    person_manager: PersonManager,
    routes: Arc<RouteTable<PersonHandler>>,
}

impl MainRouter {
    pub fn new(address: SocketAddr, person_manager: PersonManager) -> Self {
        return Self {
            address,
            person_manager,
            routes: Arc::new(person_router::routes()),
        };
    }

    /// Serves connections until `shutdown` resolves. Connections already
    /// accepted keep running on their own tasks.
    pub async fn run<F>(&self, shutdown: F) -> Result<(), ServerError>
    where
        F: Future<Output = ()>,
    {
        let listener = TcpListener::bind(self.address)
            .await
            .map_err(|source| ServerError::Bind {
                address: self.address,
                source,
            })?;
        tracing::info!(address = %self.address, "listening");
        tokio::pin!(shutdown);
        // We start a loop to continuously accept incoming connections
        loop {
            let (stream, remote) = tokio::select! {
                accepted = listener.accept() => accepted.map_err(ServerError::Accept)?,
                _ = &mut shutdown => {
                    tracing::info!("no longer accepting connections");
                    return Ok(());
                }
            };

            // Use an adapter to access something implementing `tokio::io` traits as if they implement
            // `hyper::rt` IO traits.
            let io = TokioIo::new(stream);

            let person_manager = self.person_manager.clone();
            let routes = self.routes.clone();
            tokio::task::spawn(async move {
                let cors = CorsLayer::new()
                    .allow_origin(AllowOrigin::any())
                    .allow_methods(vec![
                        Method::GET,
                        Method::POST,
                        Method::PUT,
                        Method::DELETE,
                        Method::OPTIONS,
                    ])
                    .allow_headers(vec![header::CONTENT_TYPE])
                    .expose_headers(vec![header::LOCATION]);
                let service = ServiceBuilder::new().layer(cors).service_fn(move |r| {
                    let person_manager = person_manager.clone();
                    let routes = routes.clone();
                    async move {
                        Ok::<Response<BoxBody>, Infallible>(
                            handle_request(r, &routes, &person_manager).await,
                        )
                    }
                });
                if let Err(err) = http1::Builder::new()
                    .serve_connection(io, TowerToHyperService::new(service))
                    .await
                {
                    tracing::warn!(%remote, error = ?err, "error serving connection");
                }
            });
        }
    }
}

/// Routes one request and turns any failure into its error response.
pub async fn handle_request<B>(
    request: Request<B>,
    routes: &RouteTable<PersonHandler>,
    person_manager: &PersonManager,
) -> Response<BoxBody>
where
    B: Body,
    B::Error: Display,
{
    match route_requests(request, routes, person_manager).await {
        Ok(r) => r,
        Err(e) => e.into(),
    }
}

async fn route_requests<B>(
    request: Request<B>,
    routes: &RouteTable<PersonHandler>,
    person_manager: &PersonManager,
) -> Result<Response<BoxBody>, ApiError>
where
    B: Body,
    B::Error: Display,
{
    let method = request.method().clone();
    let path = request.uri().path().to_string();
    tracing::info!(%method, %path, "request");
    let (handler, params) = match routes.find(&method, &path) {
        RouteMatch::Found { handler, params } => (*handler, params),
        RouteMatch::MethodNotAllowed(allowed) => return Err(ApiError::MethodNotAllowed(allowed)),
        RouteMatch::NotFound => return Err(ApiError::NotFound),
    };
    let whole_body = request
        .into_body()
        .collect()
        .await
        .map_err(|e| ApiError::Internal(format!("cannot read request body: {}", e)))?
        .to_bytes();
    person_router::router(handler, &params, &whole_body, person_manager)
        .await?
        .try_into()
}

fn full<T: Into<Bytes>>(chunk: T) -> BoxBody {
    Full::new(chunk.into())
        .map_err(|never| match never {})
        .boxed()
}

fn empty() -> BoxBody {
    Empty::<Bytes>::new()
        .map_err(|never| match never {})
        .boxed()
}
