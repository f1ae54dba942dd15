//! Per-view request generations.
//!
//! Every load bumps its view's counter and carries the new value. A response
//! is applied only while its generation is still the current one, so a slow
//! response can never overwrite the result of a newer request.

use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum View {
    Dashboard,
    Products,
    History,
    Order,
}

impl View {
    pub fn all() -> &'static [View] {
        &[View::Dashboard, View::Products, View::History, View::Order]
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Ticket {
    pub view: View,
    pub generation: u64,
}

#[derive(Debug, Clone, Default)]
pub struct Generations {
    dashboard: u64,
    products: u64,
    history: u64,
    order: u64,
}

impl Generations {
    pub fn new() -> Self {
        Self::default()
    }

    fn slot(&mut self, view: View) -> &mut u64 {
        match view {
            View::Dashboard => &mut self.dashboard,
            View::Products => &mut self.products,
            View::History => &mut self.history,
            View::Order => &mut self.order,
        }
    }

    pub fn current(&self, view: View) -> u64 {
        match view {
            View::Dashboard => self.dashboard,
            View::Products => self.products,
            View::History => self.history,
            View::Order => self.order,
        }
    }

    pub fn issue(&mut self, view: View) -> Ticket {
        let slot = self.slot(view);
        *slot += 1;
        Ticket {
            view,
            generation: *slot,
        }
    }

    /// Invalidates everything in flight.
    pub fn invalidate_all(&mut self) {
        for view in View::all() {
            *self.slot(*view) += 1;
        }
    }

    pub fn is_current(&self, view: View, generation: u64) -> bool {
        self.current(view) == generation
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_newer_ticket_supersedes_older() {
        let mut gens = Generations::new();
        let first = gens.issue(View::Products);
        let second = gens.issue(View::Products);

        assert!(!gens.is_current(View::Products, first.generation));
        assert!(gens.is_current(View::Products, second.generation));
    }

    #[test]
    fn test_views_are_independent() {
        let mut gens = Generations::new();
        let products = gens.issue(View::Products);
        gens.issue(View::History);

        assert!(gens.is_current(View::Products, products.generation));
    }

    #[test]
    fn test_invalidate_all() {
        let mut gens = Generations::new();
        let tickets: Vec<Ticket> = View::all().iter().map(|v| gens.issue(*v)).collect();
        gens.invalidate_all();

        for t in tickets {
            assert!(!gens.is_current(t.view, t.generation));
        }
    }
}
