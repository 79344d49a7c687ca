//! State diff between a stored item and a fresh observation.
//!
//! Everything here is pure: the scheduler persists the returned update and
//! dispatches the returned intent.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::{NotificationKind, ScrapeObservation, Status, TrackedItem};
use crate::plugins::traits::NotificationContext;

/// Global switches that decide whether a pending notification goes out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationGate {
    pub enabled: bool,
    pub populate: bool,
}

impl NotificationGate {
    pub fn new(enabled: bool, populate: bool) -> Self {
        Self { enabled, populate }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Transition {
    BecameAvailable { price: Option<f64> },
    PriceChanged { old: Option<f64>, new: f64 },
    BecameUnavailable,
    /// Still available but the page price could not be read; nothing is
    /// recorded so a stored price is never replaced by an unknown one.
    PriceUnreadable { stored: f64 },
    Unchanged,
}

impl Transition {
    pub fn kind(&self) -> Option<NotificationKind> {
        match self {
            Transition::BecameAvailable { .. } => Some(NotificationKind::Available),
            Transition::PriceChanged { .. } => Some(NotificationKind::Price),
            Transition::BecameUnavailable => Some(NotificationKind::Unavailable),
            Transition::PriceUnreadable { .. } | Transition::Unchanged => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Suppression {
    PopulateMode,
    NotificationsDisabled,
    AboveThreshold { threshold: f64 },
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StateUpdate {
    pub status: Status,
    pub price: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NotificationIntent {
    pub kind: NotificationKind,
    pub context: NotificationContext,
    pub recipients: Vec<String>,
    pub suppressed: Option<Suppression>,
}

impl NotificationIntent {
    pub fn should_dispatch(&self) -> bool {
        self.suppressed.is_none()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Decision {
    pub transition: Transition,
    pub update: Option<StateUpdate>,
    pub intent: Option<NotificationIntent>,
}

impl Decision {
    /// The item as it should look after this decision is persisted.
    pub fn apply(&self, previous: &TrackedItem, now: DateTime<Utc>) -> TrackedItem {
        let mut item = previous.clone();
        if let Some(update) = self.update {
            item.status = update.status;
            item.price = update.price;
            item.updated_at = now;
        }
        item
    }
}

/// Why a notification would be held back, if at all.
///
/// Gate switches are checked first; the threshold only applies to a known
/// price, and an unknown price always passes it.
pub fn suppression(
    gate: NotificationGate,
    threshold: Option<f64>,
    price: Option<f64>,
) -> Option<Suppression> {
    if gate.populate {
        return Some(Suppression::PopulateMode);
    }
    if !gate.enabled {
        return Some(Suppression::NotificationsDisabled);
    }
    match (threshold, price) {
        (Some(threshold), Some(price)) if price > threshold => {
            Some(Suppression::AboveThreshold { threshold })
        }
        _ => None,
    }
}

pub fn should_notify(gate: NotificationGate, threshold: Option<f64>, price: Option<f64>) -> bool {
    suppression(gate, threshold, price).is_none()
}

fn transition(previous: &TrackedItem, observation: &ScrapeObservation) -> Transition {
    match (previous.status, observation.available) {
        (Status::Unavailable, true) => Transition::BecameAvailable {
            price: observation.price,
        },
        (Status::Available, false) => Transition::BecameUnavailable,
        (Status::Unavailable, false) => Transition::Unchanged,
        (Status::Available, true) => match (previous.price, observation.price) {
            (Some(stored), None) => Transition::PriceUnreadable { stored },
            (None, None) => Transition::Unchanged,
            (old, Some(new)) if old != Some(new) => Transition::PriceChanged { old, new },
            _ => Transition::Unchanged,
        },
    }
}

pub fn evaluate(
    previous: &TrackedItem,
    observation: &ScrapeObservation,
    gate: NotificationGate,
) -> Decision {
    let transition = transition(previous, observation);

    let update = match transition {
        Transition::BecameAvailable { price } => Some(StateUpdate {
            status: Status::Available,
            price,
        }),
        Transition::PriceChanged { new, .. } => Some(StateUpdate {
            status: Status::Available,
            price: Some(new),
        }),
        Transition::BecameUnavailable => Some(StateUpdate {
            status: Status::Unavailable,
            price: None,
        }),
        Transition::PriceUnreadable { .. } | Transition::Unchanged => None,
    };

    let intent = transition.kind().map(|kind| {
        // Going out of stock ignores the threshold: the price no longer
        // means anything to compare against.
        let suppressed = match kind {
            NotificationKind::Unavailable => suppression(gate, None, None),
            NotificationKind::Available | NotificationKind::Price => {
                suppression(gate, previous.threshold, observation.price)
            }
        };

        NotificationIntent {
            kind,
            context: NotificationContext {
                name: previous.name.clone(),
                url: previous.url.clone(),
                price: observation.price,
            },
            recipients: previous.recipients.clone(),
            suppressed,
        }
    });

    Decision {
        transition,
        update,
        intent,
    }
}
