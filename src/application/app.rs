use crate::auth::{AttemptStore, AuthGuard, MemoryStore, StoreKeys, TotpVerifier};
use crate::config::Settings;
use crate::infrastructure::log_messages::application as messages;
use crate::infrastructure::RedisStore;
use crate::proxy::ProxyService;
use crate::Result;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{info, instrument, warn};

/// Main application struct that coordinates all components
pub struct Application {
    settings: Settings,
    listener: TcpListener,
    router: axum::Router,
}

impl Application {
    /// Wire the components from `settings` and bind the listener
    #[instrument(skip(settings))]
    pub async fn build(settings: Settings) -> Result<Self> {
        let routes = settings.route_table()?;
        for route in routes.routes() {
            info!(route = %route.name, upstream = %route.upstream, "{}", messages::ROUTE_REGISTERED);
        }

        let guard = if settings.authenticated {
            info!(threshold = settings.number_of_failed, "{}", messages::AUTH_ENABLED);
            Some(Self::build_guard(&settings).await?)
        } else {
            warn!("{}", messages::AUTH_DISABLED);
            None
        };

        let service = ProxyService::new(routes, guard, settings.proxy_config());
        let router = service.into_router();

        let listener = TcpListener::bind(settings.bind_address()).await?;

        Ok(Self {
            settings,
            listener,
            router,
        })
    }

    async fn build_guard(settings: &Settings) -> Result<AuthGuard> {
        let verifier = TotpVerifier::new(
            settings.pass_key()?,
            settings.totp_skew,
            &settings.username,
        )?;

        let store: Arc<dyn AttemptStore> = match &settings.redis {
            Some(redis) => Arc::new(RedisStore::connect(redis).await?),
            None => {
                warn!("{}", messages::MEMORY_STORE);
                Arc::new(MemoryStore::new())
            }
        };

        Ok(AuthGuard::new(
            store,
            Arc::new(verifier),
            settings.guard_policy(),
            StoreKeys::new(settings.store_namespace.clone()),
        ))
    }

    /// Address the listener is bound to
    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.listener.local_addr()?)
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Serve until Ctrl-C
    pub async fn run(self) -> Result<()> {
        self.run_until(shutdown_signal()).await
    }

    /// Serve until `shutdown` completes, then drain open connections
    pub async fn run_until<F>(self, shutdown: F) -> Result<()>
    where
        F: std::future::Future<Output = ()> + Send + 'static,
    {
        info!(address = %self.listener.local_addr()?, "{}", messages::LISTENING);

        axum::serve(
            self.listener,
            self.router
                .into_make_service_with_connect_info::<SocketAddr>(),
        )
        .with_graceful_shutdown(shutdown)
        .await?;

        info!("{}", messages::STOPPED);
        Ok(())
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "{}", messages::SIGNAL_FAILED);
        std::future::pending::<()>().await;
    }
    info!("{}", messages::SHUTTING_DOWN);
}
