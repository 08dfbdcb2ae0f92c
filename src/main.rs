use anyhow::Context;
use application::{api::router::MainRouter, config::Config};
use domain::person::{PersonManager, PersonRepository};
use dotenv::dotenv;
use infrastructure::person::{
    memory::memory_repository::InMemoryPersonRepository,
    postgres::postgres_repository::PostgresPersonRepository,
};
use tokio::runtime::Runtime;
use tracing_subscriber::EnvFilter;

mod application;
mod domain;
mod infrastructure;

fn main() -> anyhow::Result<()> {
    dotenv().ok();
    // Check of env variables before starting the app.
    let config = Config::from_env().context("invalid configuration")?;
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&config.log_level)),
        )
        .init();

    let rt = Runtime::new().context("cannot start the tokio runtime")?;
    rt.block_on(async {
        let person_repository: Box<dyn PersonRepository> = match &config.database_url {
            Some(url) => Box::new(
                PostgresPersonRepository::new(url, config.database_timeout)
                    .await
                    .context("Cannot connect to the DB")?,
            ),
            None => {
                tracing::warn!("DATABASE_URL is not set, persons are kept in memory");
                Box::new(InMemoryPersonRepository::new())
            }
        };
        let person_manager =
            PersonManager::new(person_repository, tracing::info_span!("person_resource"));
        let main_router = MainRouter::new(config.bind_address, person_manager);
        main_router
            .run(shutdown_signal())
            .await
            .context("An error occured")?;
        tracing::info!("server stopped");
        Ok::<_, anyhow::Error>(())
    })
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "cannot listen for ctrl-c");
        std::future::pending::<()>().await;
    }
    tracing::info!("received shutdown signal");
}
