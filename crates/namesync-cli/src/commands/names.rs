//! Name command handlers

use anyhow::{bail, Context, Result};

use namesync_core::models::{sort_records, validate_name};
use namesync_core::{SortMode, Transport};

use crate::output::Output;

/// Print the server greeting
pub async fn greet(transport: &dyn Transport, output: &Output) -> Result<()> {
    let greeting = transport
        .fetch_greeting()
        .await
        .context("Failed to get a message from the server")?;
    output.greeting(&greeting.text);
    Ok(())
}

/// Add a name
pub async fn add(transport: &dyn Transport, name: &str, output: &Output) -> Result<()> {
    let name = validate_name(name)?;

    let reply = transport
        .submit_name(name)
        .await
        .context("Failed to send the name")?;
    output.success(&reply.message);
    Ok(())
}

/// List all names
pub async fn list(transport: &dyn Transport, sort: SortMode, output: &Output) -> Result<()> {
    let snapshot = transport
        .list_all()
        .await
        .context("Failed to load names")?;
    output.print_names(&sort_records(&snapshot, sort));
    Ok(())
}

/// Rename every entry called `old`
pub async fn rename(
    transport: &dyn Transport,
    old: &str,
    new: &str,
    output: &Output,
) -> Result<()> {
    let new = validate_name(new)?;

    match transport.update_name(old, new).await {
        Ok(reply) => {
            output.success(&reply.message);
            Ok(())
        }
        Err(e) if e.is_not_found() => bail!("No name '{}' found", old),
        Err(e) => Err(anyhow::Error::new(e).context("Failed to update the name")),
    }
}

/// Delete all names
pub async fn clear(transport: &dyn Transport, output: &Output) -> Result<()> {
    let reply = transport
        .delete_all()
        .await
        .context("Failed to clear the list")?;
    output.success(&reply.message);
    Ok(())
}
