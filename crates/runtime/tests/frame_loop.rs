//! End-to-end runs of the frame worker on a paused tokio clock.

use std::time::Duration;

use async_trait::async_trait;
use skirmish_core::{
    AnimationCue, Area, AttackStyle, CombatPhase, Controller, Creature, EntityId, Faction, Notice,
    Position, TurnOutcome,
};
use skirmish_runtime::{
    AiScript, CombatEvent, Event, InterfaceEvent, Runtime, RuntimeHandle, ScriptContext,
    ScriptFault, ScriptLibrary, Topic,
};
use tokio::sync::broadcast;

const ARIA: EntityId = EntityId(1);
const GRUB: EntityId = EntityId(7);

fn skirmish(goblin_script: &str) -> Area {
    Area::new()
        .with_creature(Creature::new(
            ARIA,
            "Aria",
            Faction::Player,
            Controller::Player,
            Position::new(0, 0),
        ))
        .with_creature(
            Creature::new(GRUB, "Grub", Faction::GoblinClan, Controller::Ai, Position::new(3, 0))
                .with_script(goblin_script),
        )
}

async fn next_turn(rx: &mut broadcast::Receiver<Event>) -> TurnOutcome {
    loop {
        match rx.recv().await.unwrap() {
            Event::Combat(CombatEvent::Turn(outcome)) => return outcome,
            _ => continue,
        }
    }
}

/// Ends Aria's turns until `done` holds at the start of one of them.
async fn pass_until(
    handle: &RuntimeHandle,
    rx: &mut broadcast::Receiver<Event>,
    mut done: impl FnMut(&Area) -> bool,
) -> usize {
    let mut turns = 0;
    loop {
        if let TurnOutcome::AwaitingPlayer(creature) = next_turn(rx).await {
            assert_eq!(creature, ARIA);
            turns += 1;
            if done(&handle.snapshot().await.unwrap()) {
                return turns;
            }
            handle.wait_for_unlock().await.unwrap();
            handle.end_turn(ARIA).await.unwrap();
        }
    }
}

#[tokio::test(start_paused = true)]
async fn charging_goblin_closes_in_and_strikes() {
    let runtime = Runtime::builder().area(skirmish("charge")).build().await.unwrap();
    let handle = runtime.handle();
    let mut combat = handle.subscribe(Topic::Combat);

    tokio::time::timeout(
        Duration::from_secs(30),
        pass_until(&handle, &mut combat, |area| {
            area.creature(ARIA).is_some_and(|aria| aria.hit_points < 10)
        }),
    )
    .await
    .unwrap();

    let area = handle.snapshot().await.unwrap();
    assert_eq!(area.creature(GRUB).unwrap().position, Position::new(1, 0));
    assert_eq!(area.creature(ARIA).unwrap().hit_points, 6);

    runtime.shutdown().await.unwrap();
}

struct Explodes;

#[async_trait]
impl AiScript for Explodes {
    async fn run(&self, _ctx: ScriptContext) -> Result<(), ScriptFault> {
        panic!("turn function blew up");
    }
}

#[tokio::test(start_paused = true)]
async fn panicking_script_still_hands_the_turn_on() {
    let runtime = Runtime::builder()
        .area(skirmish("explode"))
        .scripts(ScriptLibrary::with_builtins().with_script("explode", Explodes))
        .build()
        .await
        .unwrap();
    let handle = runtime.handle();
    let mut combat = handle.subscribe(Topic::Combat);

    let mut seen = 0;
    let turns = tokio::time::timeout(
        Duration::from_secs(30),
        pass_until(&handle, &mut combat, move |_| {
            seen += 1;
            seen == 3
        }),
    )
    .await
    .unwrap();
    assert_eq!(turns, 3);

    let status = handle.status().await.unwrap();
    assert_eq!(status.phase, CombatPhase::Active);
    assert_eq!(status.current_actor, Some(ARIA));
    runtime.shutdown().await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn out_of_turn_requests_are_rejected() {
    let runtime = Runtime::builder().area(skirmish("idle")).build().await.unwrap();
    let handle = runtime.handle();
    let mut combat = handle.subscribe(Topic::Combat);

    tokio::time::timeout(Duration::from_secs(30), pass_until(&handle, &mut combat, |_| true))
        .await
        .unwrap();

    let err = handle
        .request_attack(GRUB, ARIA, AttackStyle::Melee)
        .await
        .unwrap_err();
    assert!(err.as_rejection().is_some());

    let err = handle.accept_reactive(42).await.unwrap_err();
    assert!(err.as_rejection().is_some());
    runtime.shutdown().await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn interface_topic_reports_steps_and_lock_transitions() {
    let area = Area::new().with_creature(Creature::new(
        ARIA,
        "Aria",
        Faction::Player,
        Controller::Player,
        Position::new(0, 0),
    ));
    let runtime = Runtime::builder().area(area).build().await.unwrap();
    let handle = runtime.handle();
    let mut interface = handle.subscribe(Topic::Interface);

    handle
        .request_move(ARIA, vec![Position::new(1, 0), Position::new(2, 0)])
        .await
        .unwrap();
    let status = tokio::time::timeout(Duration::from_secs(5), handle.wait_settled())
        .await
        .unwrap()
        .unwrap();
    assert!(status.settled);
    handle.wait_for_unlock().await.unwrap();

    let mut events = Vec::new();
    while let Ok(event) = interface.try_recv() {
        events.push(event);
    }
    let steps = events
        .iter()
        .filter(|e| {
            matches!(e, Event::Interface(InterfaceEvent::Animation(AnimationCue::Step { .. })))
        })
        .count();
    assert_eq!(steps, 2);

    let locked = events
        .iter()
        .position(|e| matches!(e, Event::Interface(InterfaceEvent::Locked { .. })))
        .unwrap();
    let unlocked = events
        .iter()
        .position(|e| matches!(e, Event::Interface(InterfaceEvent::Unlocked { .. })))
        .unwrap();
    assert!(locked < unlocked);

    let area = runtime.shutdown().await.unwrap();
    assert_eq!(area.creature(ARIA).unwrap().position, Position::new(2, 0));
}

#[tokio::test(start_paused = true)]
async fn combat_notices_reach_subscribers() {
    let runtime = Runtime::builder().area(skirmish("idle")).build().await.unwrap();
    let handle = runtime.handle();
    let mut combat = handle.subscribe(Topic::Combat);

    let mut notices = Vec::new();
    tokio::time::timeout(Duration::from_secs(30), async {
        loop {
            match combat.recv().await.unwrap() {
                Event::Combat(CombatEvent::Notice(notice)) => notices.push(notice),
                Event::Combat(CombatEvent::Turn(TurnOutcome::AwaitingPlayer(_))) => break,
                _ => {}
            }
        }
    })
    .await
    .unwrap();

    assert!(notices.contains(&Notice::HostileSpotted {
        observer: ARIA,
        hostile: GRUB
    }));
    assert!(
        notices
            .iter()
            .any(|n| matches!(n, Notice::CombatStarted { combatants: 2, .. }))
    );
    runtime.shutdown().await.unwrap();
}
