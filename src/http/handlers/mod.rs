//! Route handlers and the route list.
//!
//! Handlers are container-built components; each route binds one of their
//! methods (`self: Arc<Self>`) through [`handler`].

pub mod health;
pub mod user;

use axum::http::Method;
use axum::response::{IntoResponse, Response};
use futures_util::future::BoxFuture;
use futures_util::FutureExt;
use std::future::Future;
use std::sync::Arc;

use crate::http::request::RequestContext;
use crate::routing::{Route, RouteError};

pub use health::HealthHandler;
pub use user::UserHandler;

pub const API_PREFIX: &str = "/api/v1";

/// Type-erased route handler.
pub type Handler = Arc<dyn Fn(RequestContext) -> BoxFuture<'static, Response> + Send + Sync>;

/// Bind a component method as a route handler.
pub fn handler<C, F, Fut, R>(component: &Arc<C>, method: F) -> Handler
where
    C: Send + Sync + 'static,
    F: Fn(Arc<C>, RequestContext) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = R> + Send + 'static,
    R: IntoResponse,
{
    let component = Arc::clone(component);
    Arc::new(move |request: RequestContext| -> BoxFuture<'static, Response> {
        let call = method(Arc::clone(&component), request);
        async move { call.await.into_response() }.boxed()
    })
}

/// Every route the service exposes.
pub fn routes(
    users: &Arc<UserHandler>,
    health: &Arc<HealthHandler>,
) -> Result<Vec<Route<Handler>>, RouteError> {
    let collection = format!("{API_PREFIX}/users");
    let member = format!("{API_PREFIX}/users/:id");

    Ok(vec![
        Route::new(Method::POST, &collection, handler(users, UserHandler::create))?,
        Route::new(Method::GET, &collection, handler(users, UserHandler::list))?,
        Route::new(Method::GET, &member, handler(users, UserHandler::get))?,
        Route::new(Method::PUT, &member, handler(users, UserHandler::update))?,
        Route::new(Method::DELETE, &member, handler(users, UserHandler::delete))?,
        Route::new(Method::GET, "/health", handler(health, HealthHandler::check))?,
    ])
}
