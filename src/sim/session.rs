/// Campaign context carried across stages.
///
/// Holds who is flying and what they have earned so far. Stage setup reads
/// the pilot from here instead of from any global; the world owns one session
/// for the lifetime of a campaign.

use super::level::StageId;

#[derive(Clone, Debug, PartialEq)]
pub struct Pilot {
    pub name: String,
    pub max_lives: f32,
}

#[derive(Clone, Debug)]
pub struct Session {
    pub pilot: Pilot,
    pub score: u32,
    cleared: Vec<StageId>,
}

impl Session {
    pub fn new(pilot: Pilot) -> Self {
        Session { pilot, score: 0, cleared: Vec::new() }
    }

    pub fn record_clear(&mut self, stage: StageId) {
        if !self.cleared.contains(&stage) {
            self.cleared.push(stage);
        }
    }

    pub fn stages_cleared(&self) -> usize {
        self.cleared.len()
    }

    /// Furthest stage cleared so far.
    pub fn best_stage(&self) -> Option<StageId> {
        self.cleared.iter().copied().max()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pilot() -> Pilot {
        Pilot { name: "Tester".into(), max_lives: 3.0 }
    }

    #[test]
    fn clears_are_counted_once() {
        let mut s = Session::new(pilot());
        s.record_clear(StageId::new(1, 1));
        s.record_clear(StageId::new(1, 1));
        s.record_clear(StageId::new(1, 2));
        assert_eq!(s.stages_cleared(), 2);
    }

    #[test]
    fn best_stage_orders_by_chapter_then_stage() {
        let mut s = Session::new(pilot());
        assert_eq!(s.best_stage(), None);
        s.record_clear(StageId::new(2, 1));
        s.record_clear(StageId::new(1, 3));
        assert_eq!(s.best_stage(), Some(StageId::new(2, 1)));
    }
}
