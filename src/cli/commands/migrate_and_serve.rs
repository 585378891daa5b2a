use anyhow::Result;
use tracing::{debug, info, trace};

use super::initdb::connect_and_migrate;
use super::serve::run_server;
use crate::config::Settings;

pub async fn migrate_and_serve(settings: &Settings) -> Result<()> {
    trace!("Entering migrate_and_serve function");
    info!("Applying database migrations and starting server");
    debug!("Database URL: {}", settings.database_url);
    debug!("Bind address: {}", settings.bind_address);

    let db = connect_and_migrate(&settings.database_url).await?;
    db.close().await?;

    run_server(settings).await
}
