// Schedule Grid
// Headless editor: reads grid commands from stdin and prints the schedule

mod shell;

use std::rc::Rc;

use anyhow::{anyhow, Context, Result};
use tokio::task::LocalSet;

use schedule_grid::models::settings::Settings;
use schedule_grid::services::sync::{HttpScheduleRemote, SqliteScheduleStore};

fn main() -> Result<()> {
    env_logger::init();

    log::info!("Starting Schedule Grid");

    let settings = Settings::load()?;
    let requested = std::env::args().nth(1);
    let schedule = settings
        .schedule(requested.as_deref())
        .ok_or_else(|| anyhow!("No schedule configured; pass a schedule id"))?;

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("Failed to start async runtime")?;
    let local = LocalSet::new();

    if settings.remote.endpoint.is_some() {
        let remote = HttpScheduleRemote::new(&settings.remote)?;
        log::info!("Using remote schedule endpoint");
        local.block_on(&runtime, shell::run(Rc::new(remote), &settings, schedule))
    } else {
        let store = SqliteScheduleStore::open(&settings.resolve_database_path())?;
        local.block_on(&runtime, shell::run(Rc::new(store), &settings, schedule))
    }
}
