/*
 * Copyright (c) 2025 Clément GRENNERAT
 *
 * This program is free software: you can redistribute it and/or modify it under the terms of the
 * GNU General Public License as published by the Free Software Foundation, version 3.
 * This program is distributed in the hope that it will be useful, but WITHOUT ANY WARRANTY; without
 * even the implied warranty of MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.
 * See the GNU General Public License for more details.
 * You should have received a copy of the GNU General Public License along with this program.
 * If not, see https://www.gnu.org/licenses/.
 *
 */

use serde::Serialize;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// Typed progress event with a monotonic sequence number, for progress UIs.
#[derive(Debug, Clone, Serialize)]
pub struct Event {
    pub seq: u64,
    #[serde(flatten)]
    pub kind: EventKind,
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EventKind {
    PhaseStarted { phase: &'static str },
    ColumnGenerated { round: u32, added: usize },
    MipImproved { objective: f64, drivers: usize },
    BudgetOverrun { phase: &'static str },
    Cancelled,
}

/// Live observer of the event stream.
pub trait EventSink {
    fn on_event(&mut self, event: &Event);
}

/// Records every event of a run in order. Clients resuming from a sequence
/// number receive all later events through [`EventLog::events_since`].
pub struct EventLog {
    events: Vec<Event>,
    sink: Option<Box<dyn EventSink>>,
}

impl EventLog {
    pub fn new(sink: Option<Box<dyn EventSink>>) -> EventLog {
        EventLog { events: Vec::new(), sink }
    }

    pub fn emit(&mut self, kind: EventKind) {
        let event = Event { seq: self.events.len() as u64 + 1, kind };
        if let Some(sink) = &mut self.sink {
            sink.on_event(&event);
        }
        self.events.push(event);
    }

    pub fn events(&self) -> &[Event] {
        &self.events
    }

    /// All events with `seq > last_seq`, in order.
    pub fn events_since(&self, last_seq: u64) -> &[Event] {
        let from = (last_seq as usize).min(self.events.len());
        &self.events[from..]
    }
}

/// Cooperative cancellation flag, polled at the suspension points between
/// D-search iterations, column-generation rounds and MIP calls.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    flag: Arc<AtomicBool>,
}

impl CancellationToken {
    pub fn new() -> CancellationToken {
        CancellationToken::default()
    }
    pub fn cancel(&self) {
        self.flag.store(true, Ordering::Relaxed);
    }
    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::Relaxed)
    }
}
