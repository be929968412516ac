/// Progression seam. The levelling curve lives elsewhere; the core only
/// reports who earned how much.

use crate::domain::entity::{Actor, ActorId};

pub trait Progression: Send {
    fn award(&mut self, recipient: &Actor, amount: u32);
}

/// Default progression: keeps a running total and logs each award.
#[derive(Debug, Default)]
pub struct ProgressLog {
    total: u64,
    entries: Vec<(ActorId, u32)>,
}

impl ProgressLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn total(&self) -> u64 {
        self.total
    }

    pub fn entries(&self) -> &[(ActorId, u32)] {
        &self.entries
    }
}

impl Progression for ProgressLog {
    fn award(&mut self, recipient: &Actor, amount: u32) {
        self.total += u64::from(amount);
        self.entries.push((recipient.id, amount));
        log::debug!("progression: {:?} +{amount} (total {})", recipient.id, self.total);
    }
}

impl Drop for ProgressLog {
    fn drop(&mut self) {
        log::info!("progression: {} awards, {} total", self.entries().len(), self.total());
    }
}
