//! Target lifecycle tracking
//!
//! The radar reports a full snapshot of what it currently sees on every
//! cycle. [`TargetTracker`] diffs consecutive snapshots by target id and turns
//! them into enter and left events, the latter carrying how long the target
//! was present.
//!
//! By default a target is declared gone the first time it is missing from a
//! snapshot. [`TrackerConfig::departure_misses`] allows that many consecutive
//! misses first, which hides single dropped frames.

use std::collections::BTreeMap;
use std::fmt::Debug;
use std::sync::Arc;
use std::time::{Duration, Instant};

use ld_protocol::{AngularTarget, DetailedTarget, PresenceTarget};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::clock::{Clock, SystemClock};

/// Something with a stable identity across snapshots
pub trait Identified: Clone {
    type Id: Copy + Ord + Debug;

    fn id(&self) -> Self::Id;
}

impl Identified for AngularTarget {
    type Id = u8;

    fn id(&self) -> u8 {
        self.id
    }
}

impl Identified for PresenceTarget {
    type Id = u32;

    fn id(&self) -> u32 {
        self.id
    }
}

impl Identified for DetailedTarget {
    type Id = u32;

    fn id(&self) -> u32 {
        self.id
    }
}

/// Receives lifecycle events from [`TargetTracker::update`]
pub trait TargetEventHandler<Id> {
    fn on_target_enter(&mut self, _id: Id) {}
    fn on_target_left(&mut self, _id: Id, _dwell: Duration) {}
}

/// A lifecycle transition
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TargetEvent<Id> {
    Entered(Id),
    Left { id: Id, dwell: Duration },
}

/// Collects events in emission order
impl<Id> TargetEventHandler<Id> for Vec<TargetEvent<Id>> {
    fn on_target_enter(&mut self, id: Id) {
        self.push(TargetEvent::Entered(id));
    }

    fn on_target_left(&mut self, id: Id, dwell: Duration) {
        self.push(TargetEvent::Left { id, dwell });
    }
}

/// Tracker configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackerConfig {
    /// Consecutive snapshots a target may be missing before it is reported
    /// as left
    pub departure_misses: u32,
}

/// Per-id state
#[derive(Debug, Clone)]
pub struct TrackedTarget<T> {
    pub first_seen: Instant,
    pub last_seen: Instant,
    /// Attributes from the most recent snapshot containing this id
    pub latest: T,
    missed: u32,
}

impl<T> TrackedTarget<T> {
    /// Time between first and last sighting
    pub fn observed_for(&self) -> Duration {
        self.last_seen - self.first_seen
    }

    /// Consecutive snapshots this target has been missing from
    pub fn missed(&self) -> u32 {
        self.missed
    }
}

/// Turns snapshots into enter/left events
pub struct TargetTracker<T: Identified> {
    targets: BTreeMap<T::Id, TrackedTarget<T>>,
    clock: Arc<dyn Clock>,
    config: TrackerConfig,
}

impl<T: Identified> TargetTracker<T> {
    pub fn new() -> Self {
        Self::with_clock(Arc::new(SystemClock), TrackerConfig::default())
    }

    pub fn with_clock(clock: Arc<dyn Clock>, config: TrackerConfig) -> Self {
        Self {
            targets: BTreeMap::new(),
            clock,
            config,
        }
    }

    /// Apply one snapshot
    ///
    /// Enter events are emitted in snapshot order, left events in id order
    /// after all enters.
    pub fn update<H>(&mut self, snapshot: &[T], handler: &mut H)
    where
        H: TargetEventHandler<T::Id> + ?Sized,
    {
        let now = self.clock.now();
        let mut unseen: Vec<T::Id> = self.targets.keys().copied().collect();

        for target in snapshot {
            let id = target.id();
            match self.targets.get_mut(&id) {
                Some(tracked) => {
                    tracked.last_seen = now;
                    tracked.latest = target.clone();
                    tracked.missed = 0;
                }
                None => {
                    self.targets.insert(
                        id,
                        TrackedTarget {
                            first_seen: now,
                            last_seen: now,
                            latest: target.clone(),
                            missed: 0,
                        },
                    );
                    info!("Target {:?} entered", id);
                    handler.on_target_enter(id);
                }
            }
            unseen.retain(|other| *other != id);
        }

        for id in unseen {
            let Some(tracked) = self.targets.get_mut(&id) else {
                continue;
            };
            tracked.missed += 1;
            if tracked.missed <= self.config.departure_misses {
                continue;
            }

            if let Some(tracked) = self.targets.remove(&id) {
                let dwell = now - tracked.first_seen;
                info!("Target {:?} left after {}ms", id, dwell.as_millis());
                handler.on_target_left(id, dwell);
            }
        }
    }

    pub fn get(&self, id: T::Id) -> Option<&TrackedTarget<T>> {
        self.targets.get(&id)
    }

    /// Tracked targets in id order
    pub fn iter(&self) -> impl Iterator<Item = (&T::Id, &TrackedTarget<T>)> {
        self.targets.iter()
    }

    pub fn len(&self) -> usize {
        self.targets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.targets.is_empty()
    }

    pub fn config(&self) -> &TrackerConfig {
        &self.config
    }

    /// Drop every target without emitting events
    pub fn clear(&mut self) {
        self.targets.clear();
    }
}

impl<T: Identified> Default for TargetTracker<T> {
    fn default() -> Self {
        Self::new()
    }
}
