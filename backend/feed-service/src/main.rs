use actix_web::{dev::Service, web, App, HttpServer};
use std::io;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{info, warn};
use tracing_actix_web::TracingLogger;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use wide_column::{DynamoConfig, DynamoStore, MemoryStore, WideColumnStore};

use feed_service::clients::{HttpIdentityClient, IdentityLookup};
use feed_service::config::{Config, StoreBackend};
use feed_service::db::{FeedRepo, PostRepo, PostRepository, TrendingRepo};
use feed_service::handlers::{
    self, AuthHandlerState, FeedHandlerState, PostHandlerState, TrendingHandlerState,
};
use feed_service::jobs::{create_fanout_queue, spawn_fanout_worker, TrendingRefreshJob};
use feed_service::middleware::GatewayAuthMiddleware;
use feed_service::security::TokenBlacklist;
use feed_service::services::{FanoutEngine, FeedAssemblyService, PostService, TrendingRecommender};

#[actix_web::main]
async fn main() -> io::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,actix_web=info".into()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .json()
                .with_current_span(true)
                .with_span_list(true)
                .with_thread_ids(true)
                .with_line_number(true)
                .with_file(true)
                .with_target(true),
        )
        .init();

    let config = match Config::from_env() {
        Ok(cfg) => cfg,
        Err(e) => {
            tracing::error!("Configuration loading failed: {:#}", e);
            eprintln!("ERROR: Failed to load configuration: {}", e);
            std::process::exit(1);
        }
    };

    info!("Starting feed-service v{}", env!("CARGO_PKG_VERSION"));
    info!("Environment: {}", config.app.env);

    let store: Arc<dyn WideColumnStore> = match config.store.backend {
        StoreBackend::Memory => {
            warn!("Using in-memory store; all data is lost on restart");
            Arc::new(MemoryStore::new())
        }
        StoreBackend::Dynamodb => {
            let dynamo_config = DynamoConfig {
                region: config.store.region.clone(),
                endpoint_url: config.store.endpoint_url.clone(),
                ..DynamoConfig::default()
            };
            let store = DynamoStore::connect(&dynamo_config).await;
            info!(
                region = ?config.store.region,
                endpoint = ?config.store.endpoint_url,
                "DynamoDB client initialized"
            );
            Arc::new(store)
        }
    };

    let post_repo: Arc<dyn PostRepository> =
        Arc::new(PostRepo::new(store.clone(), &config.store.posts_table));
    let feed_repo = Arc::new(FeedRepo::new(store.clone(), &config.store.feed_table));
    let trending_repo = Arc::new(TrendingRepo::new(
        store.clone(),
        &config.store.recommendations_table,
        &config.trending.algorithm_version,
    ));

    let identity: Arc<dyn IdentityLookup> = match HttpIdentityClient::new(
        &config.identity.base_url,
        Duration::from_millis(config.identity.timeout_ms),
    ) {
        Ok(client) => Arc::new(client),
        Err(e) => {
            tracing::error!("Failed to create identity client: {}", e);
            eprintln!("ERROR: Failed to create identity client: {}", e);
            std::process::exit(1);
        }
    };
    info!(base_url = %config.identity.base_url, "Identity client initialized");

    // Fan-out worker: drains the queue until every sender is dropped
    let fanout_engine = FanoutEngine::new(
        identity.clone(),
        feed_repo.clone(),
        config.feed.fanout_chunk_size,
        config.feed.entry_ttl_days,
    );
    let (fanout_queue, fanout_receiver) = create_fanout_queue(config.feed.fanout_queue_capacity);
    let fanout_worker = spawn_fanout_worker(fanout_engine, fanout_receiver);
    info!(
        capacity = config.feed.fanout_queue_capacity,
        "✅ Fan-out worker started"
    );

    let recommender = Arc::new(TrendingRecommender::new(
        post_repo.clone(),
        trending_repo.clone(),
        config.trending.clone(),
    ));
    let trending_job = if config.trending.enabled {
        let handle = TrendingRefreshJob::new(recommender.clone(), config.trending.interval()).spawn();
        info!("✅ Trending refresh background job started");
        Some(handle)
    } else {
        info!("Trending refresh disabled by configuration");
        None
    };

    let blacklist = TokenBlacklist::new(Duration::from_secs(config.auth.blacklist_ttl_secs));

    let feed_state = web::Data::new(FeedHandlerState {
        feed: Arc::new(FeedAssemblyService::new(
            feed_repo,
            post_repo.clone(),
            trending_repo,
            identity.clone(),
            config.feed.clone().into(),
        )),
        request_timeout: config.app.request_timeout(),
    });
    let post_state = web::Data::new(PostHandlerState {
        posts: Arc::new(PostService::new(post_repo, identity, fanout_queue)),
    });
    let trending_state = web::Data::new(TrendingHandlerState { recommender });
    let auth_state = web::Data::new(AuthHandlerState {
        blacklist: blacklist.clone(),
    });

    let bind_address = format!("{}:{}", config.app.host, config.app.port);
    info!("Starting HTTP server at {}", bind_address);

    let server = HttpServer::new(move || {
        App::new()
            .app_data(feed_state.clone())
            .app_data(post_state.clone())
            .app_data(trending_state.clone())
            .app_data(auth_state.clone())
            .route("/health", web::get().to(|| async { "OK" }))
            .route("/metrics", web::get().to(feed_service::metrics::serve_metrics))
            .service(
                web::scope("/api/v1")
                    .wrap(GatewayAuthMiddleware::new(blacklist.clone()))
                    .configure(handlers::configure),
            )
            .wrap_fn(|req, srv| {
                let method = req.method().to_string();
                let path = req
                    .match_pattern()
                    .unwrap_or_else(|| req.path().to_string());
                let start = Instant::now();

                let fut = srv.call(req);
                async move {
                    match fut.await {
                        Ok(res) => {
                            feed_service::metrics::observe_http_request(
                                &method,
                                &path,
                                res.status().as_u16(),
                                start.elapsed(),
                            );
                            Ok(res)
                        }
                        Err(err) => {
                            let status = err.as_response_error().status_code().as_u16();
                            feed_service::metrics::observe_http_request(
                                &method,
                                &path,
                                status,
                                start.elapsed(),
                            );
                            Err(err)
                        }
                    }
                }
            })
            .wrap(TracingLogger::default())
    })
    .shutdown_timeout(config.app.shutdown_grace_secs)
    .bind(&bind_address)?
    .run();

    let result = server.await;
    info!("HTTP server stopped, draining background work");

    if let Some(handle) = trending_job {
        handle.abort();
    }

    // The server owned the last queue handles, so the worker now finishes
    // what is queued and exits.
    let grace = Duration::from_secs(config.app.shutdown_grace_secs);
    match tokio::time::timeout(grace, fanout_worker).await {
        Ok(_) => info!("Fan-out worker drained"),
        Err(_) => warn!(
            grace_secs = grace.as_secs(),
            "Fan-out worker did not drain in time, pending jobs dropped"
        ),
    }

    result
}
