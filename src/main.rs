//! routekit demo server.
//!
//! Serves a small `widgets` API over an in-memory store so the whole
//! dispatch layer can be exercised with curl:
//!
//! ```text
//! GET     /widgets            paginated list (page, per_page)
//! POST    /widgets            create, requires a bearer token
//! GET     /widgets/{id}       one widget
//! GET     /widgets/{id}.proto one widget as protobuf
//! DELETE  /widgets/{id}       delete, requires a bearer token
//! POST    /hooks/ping         CSRF-exempt webhook
//! OPTIONS <any of the above>  route metadata
//! ```
//!
//! Default settings redirect plain HTTP to HTTPS; run locally with
//! `--config routekit.toml`.

use std::path::PathBuf;
use std::sync::Arc;

use axum::{body::to_bytes, extract::Request, http::StatusCode, response::IntoResponse};
use clap::Parser;
use serde::{Deserialize, Serialize};
use tokio::net::TcpListener;

use routekit::config::{load_config, ServerConfig};
use routekit::error::{ErrorCode, ErrorEnvelope};
use routekit::http::{handler, json_list_result, json_result, proto_result, HttpServer, Paginated};
use routekit::lifecycle::{wait_for_signal, Shutdown};
use routekit::observability::{logging::init_logging, metrics::init_metrics};
use routekit::pagination::{paginate, MemoryQuery, PaginationRequest};
use routekit::routing::{
    Detail, Header, PathParams, Route, RouteMethod, RouteTable, RouterCompiler, Verb,
};
use routekit::security::user_identity;
use routekit::store::MemoryStore;

const MAX_BODY: usize = 64 * 1024;

#[derive(Debug, Parser)]
#[command(name = "routekit", version, about = "Demo API server")]
struct Cli {
    /// Path to a TOML config file. Defaults are used when omitted.
    #[arg(short, long)]
    config: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct Widget {
    id: u64,
    name: String,
    #[serde(default)]
    owner: String,
}

#[derive(Clone, PartialEq, prost::Message)]
struct WidgetMessage {
    #[prost(uint64, tag = "1")]
    id: u64,
    #[prost(string, tag = "2")]
    name: String,
    #[prost(string, tag = "3")]
    owner: String,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let config = match &cli.config {
        Some(path) => load_config(path)?,
        None => ServerConfig::default(),
    };

    init_logging(&config.observability)?;
    tracing::info!(version = env!("CARGO_PKG_VERSION"), "routekit starting");

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => init_metrics(addr)?,
            Err(e) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                error = %e,
                "Failed to parse metrics address"
            ),
        }
    }

    let store = MemoryStore::new(vec![
        Widget { id: 1, name: "sprocket".into(), owner: "system".into() },
        Widget { id: 2, name: "gear".into(), owner: "system".into() },
    ]);
    let table = RouteTable::new(routes(store.clone()))?;

    let bind_address = config.listener.bind_address.clone();
    let compiled = RouterCompiler::new(table, config).with_store(store).compile()?;
    tracing::info!(routes = compiled.table().len(), "Routes compiled");

    let listener = TcpListener::bind(&bind_address).await?;
    tracing::info!(address = %listener.local_addr()?, "Listening for connections");

    let shutdown = Shutdown::new();
    let server = HttpServer::new(compiled.into_router());
    let serving = tokio::spawn(server.run(listener, shutdown.subscribe()));

    wait_for_signal().await;
    shutdown.trigger();
    serving.await??;

    tracing::info!("Shutdown complete");
    Ok(())
}

fn routes(store: Arc<MemoryStore<Widget>>) -> Vec<Route> {
    let list = {
        let store = store.clone();
        json_list_result(move |req: Request| {
            let store = store.clone();
            async move {
                let page = PaginationRequest::from_request(&req)?;
                let query = MemoryQuery::new(store.snapshot());
                let (items, result) = match paginate(&query, &page).await {
                    Ok(found) => found,
                    Err(never) => match never {},
                };
                Ok::<_, ErrorEnvelope>(Paginated::new(items, result))
            }
        })
    };

    let create = {
        let store = store.clone();
        json_result(move |req: Request| {
            let store = store.clone();
            async move {
                let owner = user_identity(&req)?.subject.clone();
                let bytes = to_bytes(req.into_body(), MAX_BODY)
                    .await
                    .map_err(|e| ErrorEnvelope::with_cause(ErrorCode::PayloadEmpty, e))?;
                if bytes.is_empty() {
                    return Err(ErrorCode::PayloadEmpty.into());
                }
                let mut widget: Widget = serde_json::from_slice(&bytes)
                    .map_err(|e| ErrorEnvelope::with_cause(ErrorCode::UnmarshalJson, e))?;
                if store.find(|w| w.id == widget.id).is_some() {
                    return Err(ErrorCode::ResourceExists.into());
                }
                widget.owner = owner;
                store.insert(widget.clone());
                Ok::<_, ErrorEnvelope>(widget)
            }
        })
    };

    let get = {
        let store = store.clone();
        json_result(move |req: Request| {
            let found = widget_id(&req).and_then(|id| lookup(&store, id));
            async move { found }
        })
    };

    let get_proto = {
        let store = store.clone();
        proto_result(move |req: Request| {
            let found = widget_id(&req).and_then(|id| lookup(&store, id)).map(|w| WidgetMessage {
                id: w.id,
                name: w.name,
                owner: w.owner,
            });
            async move { found }
        })
    };

    let delete = handler(move |req: Request| {
        let removed = widget_id(&req).and_then(|id| match store.remove(|w| w.id == id) {
            0 => Err(ErrorEnvelope::new(ErrorCode::IdNotFound).with_args(&[&id.to_string()])),
            _ => Ok(StatusCode::NO_CONTENT.into_response()),
        });
        async move { removed }
    });

    let ping = handler(|_req| async { Ok((StatusCode::ACCEPTED, "pong").into_response()) });

    vec![
        Route::new("widgets", "/widgets")
            .description("Widget collection")
            .header(Header::auth_optional())
            .method(RouteMethod::new(Verb::Get, "List widgets").format("", list))
            .secure_method(RouteMethod::new(Verb::Post, "Create a widget").format("", create)),
        Route::new("widget", "/widgets/{id}")
            .description("A single widget")
            .header(Header::auth_optional())
            .header(Header::new(
                "id",
                Detail {
                    kind: "integer".into(),
                    description: "Widget id".into(),
                    required: true,
                },
            ))
            .method(
                RouteMethod::new(Verb::Get, "Fetch a widget")
                    .format("", get)
                    .format(".proto", get_proto),
            )
            .secure_method(RouteMethod::new(Verb::Delete, "Delete a widget").format("", delete)),
        Route::new("ping-hook", "/hooks/ping")
            .description("Webhook receiver")
            .method(RouteMethod::new(Verb::Post, "Ping").format("", ping))
            .csrf_exempt(),
    ]
}

fn widget_id(req: &Request) -> Result<u64, ErrorEnvelope> {
    let raw = req
        .extensions()
        .get::<PathParams>()
        .and_then(|p| p.get("id"))
        .ok_or_else(|| ErrorEnvelope::new(ErrorCode::IdNotInRequest))?;
    raw.parse()
        .map_err(|e| ErrorEnvelope::with_cause(ErrorCode::IdWrongFormat, e).with_args(&[raw]))
}

fn lookup(store: &MemoryStore<Widget>, id: u64) -> Result<Widget, ErrorEnvelope> {
    store
        .find(|w| w.id == id)
        .ok_or_else(|| ErrorEnvelope::new(ErrorCode::IdNotFound).with_args(&[&id.to_string()]))
}
