//! Role suggestions recomputed once an edit burst settles.
//!
//! Renaming a variable or toggling its demographic flag can happen on every
//! keystroke. [`DebouncedRoleSuggester`] keeps only the latest edit, runs the
//! [`RoleSuggestionEngine`] once the quiet period has passed and publishes
//! the result on a watch channel. A result whose edit has been superseded is
//! dropped instead of published.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use saw_model::{RoleTarget, Variable, VariableGroup};
use tokio::sync::watch;
use tracing::{debug, trace};

use crate::debounce::{DEFAULT_DEBOUNCE, Debouncer, SequenceToken, StalenessGuard};
use crate::role::{RoleContext, RoleSuggestion, RoleSuggestionEngine};

/// What an edit changed, as it reads after the edit.
#[derive(Debug, Clone, PartialEq)]
pub enum RoleSubject {
    Variable(Variable),
    Group(VariableGroup),
}

impl RoleSubject {
    pub fn target(&self) -> RoleTarget {
        match self {
            Self::Variable(variable) => RoleTarget::Variable(variable.id.clone()),
            Self::Group(group) => RoleTarget::Group(group.id().clone()),
        }
    }
}

/// One edit waiting for a role suggestion.
#[derive(Debug, Clone, PartialEq)]
pub struct RoleEdit {
    pub subject: RoleSubject,
    pub context: RoleContext,
}

impl RoleEdit {
    pub fn variable(variable: Variable, position: usize, total_variables: usize) -> Self {
        let context = RoleContext::for_variable(&variable, position, total_variables);
        Self {
            subject: RoleSubject::Variable(variable),
            context,
        }
    }

    pub fn group(group: VariableGroup, variables: &[Variable]) -> Self {
        let context = RoleContext::for_group(&group, variables);
        Self {
            subject: RoleSubject::Group(group),
            context,
        }
    }
}

/// A suggestion computed for the edit identified by `token`.
#[derive(Debug, Clone, PartialEq)]
pub struct SuggestionUpdate {
    pub token: SequenceToken,
    pub target: RoleTarget,
    pub suggestion: RoleSuggestion,
}

#[derive(Debug)]
struct Publisher {
    guard: StalenessGuard,
    sender: watch::Sender<Option<SuggestionUpdate>>,
}

impl Publisher {
    /// Publish `update` unless a newer edit has arrived since it started.
    fn publish(&self, update: SuggestionUpdate) -> bool {
        if !self.guard.is_current(update.token) {
            trace!(token = update.token.value(), "stale role suggestion dropped");
            return false;
        }
        self.sender.send_replace(Some(update));
        true
    }
}

/// Debounced front end to [`RoleSuggestionEngine`].
///
/// `edit` must be called from within a tokio runtime.
#[derive(Debug)]
pub struct DebouncedRoleSuggester {
    debouncer: Debouncer<RoleEdit>,
    updates: watch::Receiver<Option<SuggestionUpdate>>,
    computations: Arc<AtomicUsize>,
}

impl DebouncedRoleSuggester {
    pub fn new(engine: RoleSuggestionEngine, delay: Duration) -> Self {
        let (sender, updates) = watch::channel(None);
        let computations = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&computations);
        let debouncer = Debouncer::guarded(delay, move |guard| {
            let publisher = Publisher { guard, sender };
            move |edit: RoleEdit, token: SequenceToken| {
                counter.fetch_add(1, Ordering::Relaxed);
                let update = compute(&engine, edit, token);
                if publisher.publish(update) {
                    debug!(token = token.value(), "role suggestion published");
                }
            }
        });
        Self {
            debouncer,
            updates,
            computations,
        }
    }

    pub fn with_default_delay(engine: RoleSuggestionEngine) -> Self {
        Self::new(engine, DEFAULT_DEBOUNCE)
    }

    /// Record an edit, replacing any edit still waiting for the quiet period.
    pub fn edit(&self, edit: RoleEdit) -> SequenceToken {
        self.debouncer.trigger(edit)
    }

    /// Drop the waiting edit, if any.
    pub fn cancel(&self) {
        self.debouncer.cancel();
    }

    pub fn is_pending(&self) -> bool {
        self.debouncer.is_pending()
    }

    /// The most recently published suggestion.
    pub fn latest(&self) -> Option<SuggestionUpdate> {
        self.updates.borrow().clone()
    }

    /// Receiver notified on every published suggestion.
    pub fn subscribe(&self) -> watch::Receiver<Option<SuggestionUpdate>> {
        self.updates.clone()
    }

    /// Number of engine runs so far.
    pub fn computations(&self) -> usize {
        self.computations.load(Ordering::Relaxed)
    }
}

fn compute(
    engine: &RoleSuggestionEngine,
    edit: RoleEdit,
    token: SequenceToken,
) -> SuggestionUpdate {
    let target = edit.subject.target();
    let suggestion = match &edit.subject {
        RoleSubject::Variable(variable) => {
            engine.suggest_for_variable(variable, &edit.context)
        }
        RoleSubject::Group(group) => engine.suggest_for_group(group, &edit.context),
    };
    SuggestionUpdate {
        token,
        target,
        suggestion,
    }
}

#[cfg(test)]
mod tests {
    use saw_model::{DataType, GroupId, ResearchRole, VariableId};

    use super::*;

    fn var(name: &str, data_type: DataType) -> Variable {
        Variable::new(VariableId::new(name).unwrap(), name, data_type)
    }

    #[tokio::test(start_paused = true)]
    async fn test_stale_result_is_dropped() {
        let debouncer = Debouncer::<u32>::new(Duration::from_millis(10), |_, _| {});
        let (sender, updates) = watch::channel(None);
        let publisher = Publisher {
            guard: debouncer.guard(),
            sender,
        };

        let first = debouncer.trigger(1);
        let v = var("job_satisfaction", DataType::Numeric);
        let edit = RoleEdit::variable(v, 0, 3);
        let early = compute(&RoleSuggestionEngine::new(), edit.clone(), first);

        let second = debouncer.trigger(2);
        assert!(!publisher.publish(early));
        assert!(updates.borrow().is_none());

        let fresh = compute(&RoleSuggestionEngine::new(), edit, second);
        assert!(publisher.publish(fresh.clone()));
        assert_eq!(*updates.borrow(), Some(fresh));
    }

    #[tokio::test(start_paused = true)]
    async fn test_group_edit() {
        let vars = vec![
            var("engagement_1", DataType::Numeric),
            var("engagement_2", DataType::Numeric),
            var("age", DataType::Numeric),
        ];
        let group = VariableGroup::new(
            GroupId::new("group_engagement").unwrap(),
            vec![vars[0].id.clone(), vars[1].id.clone()],
            "engagement",
            0.9,
        )
        .unwrap();

        let suggester = DebouncedRoleSuggester::new(
            RoleSuggestionEngine::new(),
            Duration::from_millis(50),
        );
        suggester.edit(RoleEdit::group(group, &vars));
        assert!(suggester.is_pending());
        tokio::time::sleep(Duration::from_millis(60)).await;

        let update = suggester.latest().unwrap();
        assert_eq!(
            update.target,
            RoleTarget::Group(GroupId::new("group_engagement").unwrap())
        );
        assert_eq!(update.suggestion.role, ResearchRole::Mediator);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_drops_edit() {
        let suggester = DebouncedRoleSuggester::with_default_delay(RoleSuggestionEngine::new());
        suggester.edit(RoleEdit::variable(var("tenure", DataType::Numeric), 0, 2));
        suggester.cancel();
        tokio::time::sleep(Duration::from_secs(1)).await;
        assert_eq!(suggester.computations(), 0);
        assert!(suggester.latest().is_none());
    }
}
