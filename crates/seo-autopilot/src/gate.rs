use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Audit,
    Keywords,
    Blog,
    CodeFix,
}

impl Action {
    fn index(self) -> usize {
        match self {
            Action::Audit => 0,
            Action::Keywords => 1,
            Action::Blog => 2,
            Action::CodeFix => 3,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Action::Audit => "audit",
            Action::Keywords => "keyword research",
            Action::Blog => "blog generation",
            Action::CodeFix => "code fix",
        }
    }
}

/// One in-flight request per action. Unrelated actions never block each other.
#[derive(Clone, Default)]
pub struct ActionGate {
    flags: Arc<[AtomicBool; 4]>,
}

impl ActionGate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn try_begin(&self, action: Action) -> Result<BusyGuard, String> {
        self.flags[action.index()]
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .map_err(|_| format!("{} already in progress, wait for it to finish", action.name()))?;
        Ok(BusyGuard {
            flags: Arc::clone(&self.flags),
            action,
        })
    }

    #[cfg(test)]
    pub fn is_busy(&self, action: Action) -> bool {
        self.flags[action.index()].load(Ordering::Acquire)
    }
}

/// Clears the action's busy flag when dropped, whatever the outcome.
pub struct BusyGuard {
    flags: Arc<[AtomicBool; 4]>,
    action: Action,
}

impl Drop for BusyGuard {
    fn drop(&mut self) {
        self.flags[self.action.index()].store(false, Ordering::Release);
    }
}
