//! Serve-until-signal coordination.

use std::future::Future;
use std::time::Duration;
use thiserror::Error;

use crate::http::{HttpServer, ServerError, ServerExit, ShutdownError};

#[derive(Debug, Error)]
pub enum LifecycleError {
    #[error(transparent)]
    Server(#[from] ServerError),

    #[error(transparent)]
    Shutdown(#[from] ShutdownError),
}

/// Run `server` until `signal` resolves, then shut it down within `grace`.
///
/// A listener failure before the signal ends serving immediately.
pub async fn serve_until<F>(
    server: &HttpServer,
    signal: F,
    grace: Duration,
) -> Result<ServerExit, LifecycleError>
where
    F: Future<Output = ()>,
{
    let running = server.start();
    tokio::pin!(running);

    tokio::select! {
        result = &mut running => return Ok(result?),
        _ = signal => {}
    }

    let (exit, drained) = tokio::join!(running, server.shutdown(grace));
    drained?;
    Ok(exit?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ServerConfig;

    fn server(port: u16) -> HttpServer {
        let config = ServerConfig {
            host: "127.0.0.1".into(),
            port,
            ..ServerConfig::default()
        };
        HttpServer::configure(&config, Vec::new()).unwrap()
    }

    #[tokio::test]
    async fn signal_triggers_graceful_exit() {
        let exit = serve_until(
            &server(0),
            tokio::time::sleep(Duration::from_millis(20)),
            Duration::from_secs(1),
        )
        .await
        .unwrap();
        assert_eq!(exit, ServerExit::Shutdown);
    }

    #[tokio::test]
    async fn bind_failure_ends_without_signal() {
        let taken = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = taken.local_addr().unwrap().port();

        let err = serve_until(
            &server(port),
            std::future::pending(),
            Duration::from_secs(1),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, LifecycleError::Server(ServerError::Bind { .. })));
    }
}
