use std::{net::SocketAddr, sync::Arc, time::Instant};

use tokio_util::sync::CancellationToken;
use tracing::{error, info};
use tunedeck::{
    common::{
        banner::{self, BannerInfo},
        host::ServerInfo,
        logger,
        types::{AnyResult, UserId},
    },
    configs::Config,
    dispatch::Dispatcher,
    gateway::{ChannelShard, GatewayBridge, MemberCache},
    locator::UserLocator,
    node::LavalinkClient,
    relay::EventRelay,
    server::AppState,
    session::SessionRegistry,
    transport,
};

#[tokio::main]
async fn main() -> AnyResult<()> {
    let config = Config::load()?;
    logger::init(config.logging.as_ref());

    let server_info = ServerInfo::collect();
    banner::print_banner(&BannerInfo::default(), &server_info, config.server.port);

    let shutdown = CancellationToken::new();
    let (shard, gateway_commands) = ChannelShard::new();
    let (node_tx, node_rx) = flume::unbounded();

    let node = Arc::new(LavalinkClient::new(
        &config.node,
        &config.bot,
        Arc::new(shard),
        node_tx,
    )?);
    let cache = Arc::new(MemberCache::new());
    let dispatcher = Dispatcher::new(
        UserLocator::new(cache.clone()),
        Arc::new(SessionRegistry::new()),
        node.clone(),
        config.player.stop_grace(),
    );
    let bot_user = (config.bot.user_id != 0).then_some(UserId(config.bot.user_id));
    let bridge = Arc::new(GatewayBridge::new(cache, node.clone(), bot_user));

    tokio::spawn(node.clone().run(shutdown.clone()));
    tokio::spawn(EventRelay::new(dispatcher.clone()).run(node_rx));

    if config.gateway.password.is_none() {
        info!("No [gateway] password configured, /gateway ingress is disabled");
    }

    let state = Arc::new(AppState {
        config: config.clone(),
        dispatcher,
        bridge,
        gateway_commands,
        server_info,
        started: Instant::now(),
    });
    let app = transport::router(state);

    let listener =
        tokio::net::TcpListener::bind((config.server.host.as_str(), config.server.port)).await?;
    info!("Tunedeck listening on {}", listener.local_addr()?);

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal(shutdown.clone()))
    .await?;

    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal(shutdown: CancellationToken) {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
    shutdown.cancel();
}
