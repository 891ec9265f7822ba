//! Plays the party's side so a scenario can run unattended.
//!
//! Party members take the same approach-and-strike turn the `charge`
//! script gives AI creatures, then end their turn. Every reactive attack
//! offered to the party is taken.

use skirmish_core::EntityId;
use skirmish_runtime::{AiScript, ChargeScript, RuntimeHandle, ScriptContext};
use tracing::{debug, warn};

pub fn play_turn(handle: RuntimeHandle, creature: EntityId) {
    tokio::spawn(async move {
        if let Err(err) = take_turn(&handle, creature).await {
            warn!(%creature, error = %err, "party turn failed");
        }
    });
}

async fn take_turn(handle: &RuntimeHandle, creature: EntityId) -> anyhow::Result<()> {
    let snapshot = handle.snapshot().await?;
    let ctx = ScriptContext {
        creature,
        round: snapshot.round,
        snapshot,
        handle: handle.clone(),
    };
    ChargeScript.run(ctx).await?;

    handle.wait_for_unlock().await?;
    match handle.end_turn(creature).await {
        Ok(()) => Ok(()),
        // The turn may already have moved on, e.g. the creature went down.
        Err(err) if err.as_rejection().is_some() => {
            debug!(%creature, error = %err, "end turn rejected");
            Ok(())
        }
        Err(err) => Err(err.into()),
    }
}

pub fn take_reactive(handle: RuntimeHandle, session: u64) {
    tokio::spawn(async move {
        if let Err(err) = handle.accept_reactive(session).await {
            debug!(session, error = %err, "reactive attack not taken");
        }
    });
}
