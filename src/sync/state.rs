//! Rate and in-flight request bookkeeping

use futures::future::{AbortHandle, AbortRegistration};

use crate::core::Rate;

/// Held by the task running a fetch. Its generation identifies it to the state.
#[derive(Debug)]
pub struct FetchTicket {
    pub generation: u64,
    pub registration: AbortRegistration,
}

#[derive(Debug)]
struct InFlightRequest {
    generation: u64,
    abort: AbortHandle,
}

/// Current rate plus the one request allowed to replace it.
#[derive(Debug, Default)]
pub struct RateState {
    rate: Rate,
    generation: u64,
    in_flight: Option<InFlightRequest>,
}

impl RateState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn rate(&self) -> Rate {
        self.rate
    }

    pub fn is_fetching(&self) -> bool {
        self.in_flight.is_some()
    }

    pub fn is_current(&self, generation: u64) -> bool {
        self.in_flight
            .as_ref()
            .is_some_and(|req| req.generation == generation)
    }

    /// Aborts any outstanding request and issues the ticket for its successor.
    pub fn begin_fetch(&mut self) -> FetchTicket {
        if let Some(previous) = self.in_flight.take() {
            previous.abort.abort();
        }
        self.generation += 1;
        let (abort, registration) = AbortHandle::new_pair();
        self.in_flight = Some(InFlightRequest {
            generation: self.generation,
            abort,
        });
        FetchTicket {
            generation: self.generation,
            registration,
        }
    }

    /// Stores `rate` if `generation` is still the live request.
    pub fn apply(&mut self, generation: u64, rate: Rate) -> bool {
        if !self.is_current(generation) {
            return false;
        }
        self.rate = rate;
        true
    }

    /// Ends the live request. Returns true when this moved the state to idle.
    pub fn settle(&mut self, generation: u64) -> bool {
        if self.is_current(generation) {
            self.in_flight = None;
            true
        } else {
            false
        }
    }
}
