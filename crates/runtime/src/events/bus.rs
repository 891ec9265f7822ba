//! Topic-based event bus implementation.

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

use skirmish_core::{AnimationCue, Millis, Notice, NotificationSink, TurnOutcome};

/// Topics for event routing
#[derive(Debug, Clone, Copy, Hash, Eq, PartialEq, Serialize, Deserialize)]
pub enum Topic {
    /// Notices and turn outcomes
    Combat,
    /// Interface lock transitions and animation cues
    Interface,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum CombatEvent {
    Notice(Notice),
    Turn(TurnOutcome),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum InterfaceEvent {
    Locked { now: Millis },
    Unlocked { now: Millis },
    Animation(AnimationCue),
}

/// Event wrapper that carries the topic and typed event
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Event {
    Combat(CombatEvent),
    Interface(InterfaceEvent),
}

impl Event {
    pub fn topic(&self) -> Topic {
        match self {
            Event::Combat(_) => Topic::Combat,
            Event::Interface(_) => Topic::Interface,
        }
    }
}

/// Topic-based event bus
///
/// Cloning shares the underlying channels.
#[derive(Clone)]
pub struct EventBus {
    combat: broadcast::Sender<Event>,
    interface: broadcast::Sender<Event>,
}

impl EventBus {
    /// Creates a new event bus with default capacity for each topic
    pub fn new() -> Self {
        Self::with_capacity(100)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            combat: broadcast::channel(capacity).0,
            interface: broadcast::channel(capacity).0,
        }
    }

    fn sender(&self, topic: Topic) -> &broadcast::Sender<Event> {
        match topic {
            Topic::Combat => &self.combat,
            Topic::Interface => &self.interface,
        }
    }

    /// Publish an event to its corresponding topic
    pub fn publish(&self, event: Event) {
        let topic = event.topic();
        if self.sender(topic).send(event).is_err() {
            // No subscribers for this topic - this is normal, not an error
            tracing::trace!("No subscribers for topic {:?}", topic);
        }
    }

    /// Subscribe to a specific topic
    pub fn subscribe(&self, topic: Topic) -> broadcast::Receiver<Event> {
        self.sender(topic).subscribe()
    }

    pub fn subscribe_all(&self) -> Vec<(Topic, broadcast::Receiver<Event>)> {
        [Topic::Combat, Topic::Interface]
            .into_iter()
            .map(|topic| (topic, self.subscribe(topic)))
            .collect()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for EventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventBus")
            .field("combat_subscribers", &self.combat.receiver_count())
            .field("interface_subscribers", &self.interface.receiver_count())
            .finish()
    }
}

/// Forwards engine notices onto the combat topic.
#[derive(Clone, Debug)]
pub struct BusSink {
    bus: EventBus,
}

impl BusSink {
    pub fn new(bus: EventBus) -> Self {
        Self { bus }
    }
}

impl NotificationSink for BusSink {
    fn notify(&mut self, notice: Notice) {
        tracing::debug!(target: "runtime::events", notice = notice.as_ref(), "{}", notice);
        self.bus.publish(Event::Combat(CombatEvent::Notice(notice)));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use skirmish_core::EntityId;

    #[test]
    fn subscribers_only_see_their_topic() {
        let bus = EventBus::with_capacity(8);
        let mut combat = bus.subscribe(Topic::Combat);
        let mut interface = bus.subscribe(Topic::Interface);

        let mut sink = BusSink::new(bus.clone());
        sink.notify(Notice::RoundStarted { round: 2 });
        bus.publish(Event::Interface(InterfaceEvent::Unlocked { now: Millis(40) }));

        assert_eq!(
            combat.try_recv().unwrap(),
            Event::Combat(CombatEvent::Notice(Notice::RoundStarted { round: 2 }))
        );
        assert!(combat.try_recv().is_err());
        assert_eq!(
            interface.try_recv().unwrap(),
            Event::Interface(InterfaceEvent::Unlocked { now: Millis(40) })
        );
    }

    #[test]
    fn publishing_without_subscribers_is_silent() {
        let bus = EventBus::new();
        bus.publish(Event::Combat(CombatEvent::Turn(TurnOutcome::AwaitingPlayer(
            EntityId(1),
        ))));
    }
}
