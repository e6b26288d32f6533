use crate::domain::chart::{ChartMode, DrawingObject, Viewport};
use crate::domain::market_data::Timestamp;
use serde::Serialize;
use std::fmt::Debug;

/// Base trait for all domain events
pub trait DomainEvent: Debug + Clone {
    fn event_type(&self) -> &'static str;
}

/// Notifications the engine fans out to its host.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", content = "payload", rename_all = "camelCase")]
pub enum ChartEvent {
    CrosshairMoved { price: f64, time: Option<Timestamp>, visible: bool },
    ViewportChanged(Viewport),
    DrawingsUpdated(Vec<DrawingObject>),
    ModeChanged(ChartMode),
    DomFullscreenChanged(bool),
}

impl DomainEvent for ChartEvent {
    fn event_type(&self) -> &'static str {
        match self {
            ChartEvent::CrosshairMoved { .. } => "CrosshairMoved",
            ChartEvent::ViewportChanged(_) => "ViewportChanged",
            ChartEvent::DrawingsUpdated(_) => "DrawingsUpdated",
            ChartEvent::ModeChanged(_) => "ModeChanged",
            ChartEvent::DomFullscreenChanged(_) => "DomFullscreenChanged",
        }
    }
}

/// Event dispatcher for publishing events
pub trait EventDispatcher {
    fn publish(&self, event: &ChartEvent);
}

/// Simple in-memory event dispatcher
#[derive(Default)]
pub struct InMemoryEventDispatcher {
    handlers: Vec<Box<dyn Fn(&ChartEvent)>>,
}

impl InMemoryEventDispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe<F>(&mut self, handler: F)
    where
        F: Fn(&ChartEvent) + 'static,
    {
        self.handlers.push(Box::new(handler));
    }
}

impl EventDispatcher for InMemoryEventDispatcher {
    fn publish(&self, event: &ChartEvent) {
        for handler in &self.handlers {
            handler(event);
        }
    }
}
