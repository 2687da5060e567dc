use crate::model::{Dependency, TaskId};

/// Two-tap dependency creation: tap a source, then a target.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LinkMode {
    #[default]
    Idle,
    Sourcing(TaskId),
}

impl LinkMode {
    /// Enter link mode on `source`, replacing any previous source.
    pub fn start(&mut self, source: TaskId) {
        *self = LinkMode::Sourcing(source);
    }

    /// Pick a target. Returns the dependency to create, if any. Picking the
    /// source itself is ignored and link mode stays active.
    pub fn pick(&mut self, target: TaskId) -> Option<Dependency> {
        match *self {
            LinkMode::Sourcing(source) if source != target => {
                *self = LinkMode::Idle;
                Some(Dependency::new(source, target))
            }
            _ => None,
        }
    }

    pub fn cancel(&mut self) {
        *self = LinkMode::Idle;
    }

    pub fn source(&self) -> Option<TaskId> {
        match self {
            LinkMode::Idle => None,
            LinkMode::Sourcing(id) => Some(*id),
        }
    }

    pub fn is_active(&self) -> bool {
        matches!(self, LinkMode::Sourcing(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn self_pick_is_ignored_then_other_pick_links() {
        let (x, y) = (TaskId::new(), TaskId::new());
        let mut mode = LinkMode::default();
        mode.start(x);
        assert_eq!(mode.pick(x), None);
        assert_eq!(mode, LinkMode::Sourcing(x));
        assert_eq!(mode.pick(y), Some(Dependency::new(x, y)));
        assert_eq!(mode, LinkMode::Idle);
    }

    #[test]
    fn start_replaces_source() {
        let (x, y, z) = (TaskId::new(), TaskId::new(), TaskId::new());
        let mut mode = LinkMode::default();
        mode.start(x);
        mode.start(y);
        assert_eq!(mode.source(), Some(y));
        assert_eq!(mode.pick(z), Some(Dependency::new(y, z)));
    }

    #[test]
    fn cancel_and_idle_pick() {
        let (x, y) = (TaskId::new(), TaskId::new());
        let mut mode = LinkMode::default();
        assert_eq!(mode.pick(y), None);
        mode.start(x);
        mode.cancel();
        assert!(!mode.is_active());
        assert_eq!(mode.pick(y), None);
    }
}
