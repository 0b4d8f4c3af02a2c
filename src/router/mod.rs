//! Request router
//!
//! Maps a method and path onto one of the gateway's endpoints.

use hyper::Method;
use thiserror::Error;

/// Router errors
#[derive(Error, Debug, PartialEq)]
pub enum RouterError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Method not allowed: {method} {path}")]
    MethodNotAllowed {
        method: String,
        path: String,
        allow: &'static str,
    },
}

/// Gateway endpoints
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    /// GET /ping
    Ping,
    /// GET /health
    Health,
    /// GET /metrics
    Metrics,
    /// POST /single - open and discard one file
    Single,
    /// POST /multi - open and discard many files
    Multi,
    /// POST /single-s3 - upload, verify and remove one file
    SingleS3,
    /// POST /multi-s3 - upload many files concurrently
    MultiS3,
}

impl Route {
    /// Resolve a request line to a route
    pub fn resolve(method: &Method, path: &str) -> Result<Route, RouterError> {
        let (route, expected) = match path {
            "/ping" => (Route::Ping, Method::GET),
            "/health" => (Route::Health, Method::GET),
            "/metrics" => (Route::Metrics, Method::GET),
            "/single" => (Route::Single, Method::POST),
            "/multi" => (Route::Multi, Method::POST),
            "/single-s3" => (Route::SingleS3, Method::POST),
            "/multi-s3" => (Route::MultiS3, Method::POST),
            _ => return Err(RouterError::NotFound(path.to_string())),
        };

        if *method == expected {
            Ok(route)
        } else {
            Err(RouterError::MethodNotAllowed {
                method: method.to_string(),
                path: path.to_string(),
                allow: if expected == Method::GET { "GET" } else { "POST" },
            })
        }
    }

    /// Label used in logs
    pub fn name(&self) -> &'static str {
        match self {
            Route::Ping => "ping",
            Route::Health => "health",
            Route::Metrics => "metrics",
            Route::Single => "single",
            Route::Multi => "multi",
            Route::SingleS3 => "single_s3",
            Route::MultiS3 => "multi_s3",
        }
    }
}
