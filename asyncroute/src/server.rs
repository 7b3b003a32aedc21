//! HTTP/1 transport for an [`App`].

use std::convert::Infallible;
use std::future::Future;
use std::net::SocketAddr;

use http::StatusCode;
use http_body_util::{BodyExt, Full};
use hyper::body::Incoming;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper_util::rt::TokioIo;
use tokio::net::{TcpListener, TcpStream};
use tracing::{debug, info, warn};

use crate::app::App;
use crate::reply::BoxBody;

/// Binds `addr` and serves `app` until ctrl-c.
pub(crate) async fn serve(app: App, addr: SocketAddr) -> std::io::Result<()> {
    let listener = TcpListener::bind(addr).await?;
    info!(%addr, "asyncroute listening");

    serve_until(app, listener, async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            warn!(error = %err, "failed to listen for ctrl-c");
            std::future::pending::<()>().await;
        }
    })
    .await;

    info!("asyncroute shut down");
    Ok(())
}

/// Accepts connections on `listener` until `shutdown` resolves.
pub(crate) async fn serve_until(
    app: App,
    listener: TcpListener,
    shutdown: impl Future<Output = ()>,
) {
    tokio::pin!(shutdown);
    loop {
        tokio::select! {
            accepted = listener.accept() => match accepted {
                Ok((stream, peer)) => {
                    debug!(%peer, "connection accepted");
                    tokio::spawn(serve_connection(app.clone(), stream));
                }
                Err(err) => warn!(error = %err, "failed to accept connection"),
            },
            _ = &mut shutdown => break,
        }
    }
}

async fn serve_connection(app: App, stream: TcpStream) {
    let io = TokioIo::new(stream);
    let service = service_fn(move |req: hyper::Request<Incoming>| {
        let app = app.clone();
        async move { Ok::<_, Infallible>(handle(app, req).await) }
    });

    if let Err(err) = http1::Builder::new().serve_connection(io, service).await {
        debug!(error = %err, "connection closed with error");
    }
}

async fn handle(app: App, req: hyper::Request<Incoming>) -> http::Response<BoxBody> {
    let (parts, body) = req.into_parts();
    match body.collect().await {
        Ok(collected) => {
            app.handle(http::Request::from_parts(parts, collected.to_bytes()))
                .await
        }
        Err(err) => {
            warn!(error = %err, "failed to read request body");
            let mut response = http::Response::new(Full::default());
            *response.status_mut() = StatusCode::BAD_REQUEST;
            response
        }
    }
}
