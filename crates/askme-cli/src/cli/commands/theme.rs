//! Theme command handler.

use anyhow::{Context, Result};
use askme_core::model::ThemePreference;
use askme_core::ports::HistoryStore;
use askme_core::storage::JsonBlobStore;

pub fn run(theme: Option<&str>) -> Result<()> {
    let mut store = JsonBlobStore::open_default();

    let Some(raw) = theme else {
        println!("{}", store.load_theme().context("load theme")?);
        return Ok(());
    };

    let theme: ThemePreference = raw.parse().map_err(anyhow::Error::msg)?;
    store.save_theme(theme).context("save theme")?;
    println!("Theme set to {theme}");
    Ok(())
}
