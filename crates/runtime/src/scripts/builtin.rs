//! Stock turn functions.

use async_trait::async_trait;
use tracing::debug;

use skirmish_core::{AttackStyle, Creature, Position};

use super::{AiScript, ScriptContext, ScriptFault};

/// Passes the turn.
#[derive(Clone, Copy, Debug, Default)]
pub struct IdleScript;

#[async_trait]
impl AiScript for IdleScript {
    async fn run(&self, _ctx: ScriptContext) -> Result<(), ScriptFault> {
        Ok(())
    }
}

/// Walks toward the nearest visible hostile and attacks it in melee.
#[derive(Clone, Copy, Debug, Default)]
pub struct ChargeScript;

#[async_trait]
impl AiScript for ChargeScript {
    async fn run(&self, ctx: ScriptContext) -> Result<(), ScriptFault> {
        let me = ctx
            .snapshot
            .creature(ctx.creature)
            .cloned()
            .ok_or_else(|| ScriptFault::Aborted(format!("{} is not in the area", ctx.creature)))?;

        let Some(target) = nearest_hostile(&me, ctx.snapshot.creatures()) else {
            debug!(target: "runtime::scripts", creature = %me.id, "no hostile in sight");
            return Ok(());
        };
        let target_id = target.id;

        if !me.threatens(target.position) {
            let path = approach(me.position, target.position, me.reach, me.timer.action_points);
            if !path.is_empty() {
                ctx.handle.request_move(me.id, path).await?;
                ctx.handle.wait_settled().await?;
            }
        }

        let area = ctx.handle.snapshot().await?;
        let (Some(me), Some(target)) = (area.creature(ctx.creature), area.creature(target_id))
        else {
            return Ok(());
        };
        if me.is_incapacitated() || !target.is_alive() || !me.threatens(target.position) {
            return Ok(());
        }

        ctx.handle
            .request_attack(me.id, target_id, AttackStyle::Melee)
            .await?;
        ctx.handle.wait_settled().await?;
        Ok(())
    }
}

fn nearest_hostile<'a>(
    me: &Creature,
    creatures: impl Iterator<Item = &'a Creature>,
) -> Option<&'a Creature> {
    creatures
        .filter(|other| other.is_alive() && !other.is_hidden() && me.is_hostile_to(other))
        .filter(|other| me.position.distance(other.position) <= me.sight)
        .min_by_key(|other| (me.position.distance(other.position), other.id))
}

/// Cells from `from` toward `to`, stopping once within `reach` or after
/// `budget` steps. Never includes `to` itself.
fn approach(from: Position, to: Position, reach: u32, budget: u32) -> Vec<Position> {
    let mut path = Vec::new();
    let mut at = from;
    while at.distance(to) > reach.max(1) && (path.len() as u32) < budget {
        at = at.step_toward(to);
        if at == to {
            break;
        }
        path.push(at);
    }
    path
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn approach_stops_inside_reach() {
        let path = approach(Position::new(0, 0), Position::new(4, 0), 1, 6);
        assert_eq!(path, vec![Position::new(1, 0), Position::new(2, 0), Position::new(3, 0)]);

        let short = approach(Position::new(0, 0), Position::new(4, 0), 1, 2);
        assert_eq!(short.len(), 2);

        assert!(approach(Position::new(0, 0), Position::new(1, 1), 1, 6).is_empty());
    }
}
