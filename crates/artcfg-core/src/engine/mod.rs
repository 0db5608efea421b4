//! Core reconcile engine
//!
//! The Reconciler is responsible for:
//! - Reading the remote state of every declared resource via its handler
//! - Classifying each resource as Create / Update / Delete / Noop
//! - Executing the resulting plan through the handlers
//! - Persisting state after successful writes
//!
//! ## Flow
//!
//! ```text
//! ┌──────────────┐
//! │  Declared    │── specs ──┐
//! │  resources   │           │
//! └──────────────┘           ▼
//!                   ┌──────────────┐
//!                   │  Reconciler  │
//!                   └──────────────┘
//!                            │
//!        ┌───────────────────┼───────────────────┐
//!        │                   │                   │
//!        ▼                   ▼                   ▼
//! ┌─────────────┐   ┌─────────────────┐   ┌─────────────┐
//! │ StateStore  │   │ ResourceHandler │   │   Events    │
//! │ (prune/     │   │ (CRUD calls)    │   │  (notify)   │
//! │  drift)     │   └─────────────────┘   └─────────────┘
//! └─────────────┘
//! ```
//!
//! ## Semantics
//!
//! 1. `plan` reads every declared resource and compares the desired payload
//!    against the observed attributes (subset comparison; write-only fields
//!    skipped). Resources recorded in state but no longer declared are
//!    planned for deletion.
//! 2. `apply` executes the plan. A failure on one resource is reported and
//!    the remaining resources still proceed.
//! 3. A 404 on read drops the resource from state; if it is still declared,
//!    it is re-created.
//! 4. The engine never retries. The only retry in the system is the shared
//!    client's single retry on a 409 during the system configuration PATCH.

use std::collections::{HashMap, HashSet};

use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use crate::config::ReconcileConfig;
use crate::diff::is_subset;
use crate::error::{Error, Result};
use crate::spec::ResourceSpec;
use crate::traits::{ResourceHandler, StateRecord, StateStore};

/// The action planned for a single resource
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    /// The resource is declared but absent remotely
    Create,
    /// The remote object differs from the declaration
    Update,
    /// The resource is recorded in state but no longer declared
    Delete,
    /// The remote object already matches the declaration
    Noop,
}

impl std::fmt::Display for Action {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Action::Create => write!(f, "create"),
            Action::Update => write!(f, "update"),
            Action::Delete => write!(f, "delete"),
            Action::Noop => write!(f, "noop"),
        }
    }
}

/// One entry of a reconcile plan
#[derive(Debug, Clone)]
pub struct PlannedAction {
    /// Resource type name
    pub resource_type: String,

    /// Resource key within its type
    pub key: String,

    /// The planned action
    pub action: Action,

    /// The declared spec (absent for prune deletions)
    pub spec: Option<ResourceSpec>,
}

impl PlannedAction {
    /// The resource address (`type:key`)
    pub fn address(&self) -> String {
        format!("{}:{}", self.resource_type, self.key)
    }
}

/// A computed reconcile plan
#[derive(Debug, Clone, Default)]
pub struct Plan {
    /// Planned actions, in declaration order (prune deletions last)
    pub actions: Vec<PlannedAction>,
}

impl Plan {
    /// Count planned actions of the given kind
    pub fn count(&self, action: Action) -> usize {
        self.actions.iter().filter(|a| a.action == action).count()
    }

    /// Whether the plan contains any write
    pub fn has_changes(&self) -> bool {
        self.actions.iter().any(|a| a.action != Action::Noop)
    }
}

/// Summary of an apply or destroy run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ApplySummary {
    /// Resources created
    pub created: usize,
    /// Resources updated
    pub updated: usize,
    /// Resources deleted
    pub deleted: usize,
    /// Resources already in sync
    pub unchanged: usize,
    /// Resources whose action failed
    pub failed: usize,
}

/// Events emitted by the Reconciler
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReconcileEvent {
    /// Reconciliation started
    Started {
        /// Number of declared resources
        resource_count: usize,
    },

    /// A plan was computed
    PlanComputed {
        /// Resources to create
        creates: usize,
        /// Resources to update
        updates: usize,
        /// Resources to delete
        deletes: usize,
        /// Resources already in sync
        unchanged: usize,
    },

    /// A previously applied resource no longer matches its declaration
    DriftDetected {
        /// Resource address (`type:key`)
        address: String,
    },

    /// A planned action succeeded
    ActionSucceeded {
        /// Resource address (`type:key`)
        address: String,
        /// The executed action
        action: Action,
    },

    /// A planned action failed
    ActionFailed {
        /// Resource address (`type:key`)
        address: String,
        /// Error message
        error: String,
    },

    /// Reconciliation finished
    Stopped {
        /// Human-readable reason
        reason: String,
    },
}

/// Core reconcile engine
///
/// ## Lifecycle
///
/// 1. Create with [`Reconciler::new()`]
/// 2. Call [`Reconciler::plan()`], [`Reconciler::apply()`], or
///    [`Reconciler::destroy()`]
///
/// Operations run sequentially on the calling task; the only concurrency is
/// the event channel consumed by the caller.
pub struct Reconciler {
    /// Resource handlers, by resource type name
    handlers: HashMap<String, Box<dyn ResourceHandler>>,

    /// State store tracking what was last applied
    state_store: Box<dyn StateStore>,

    /// Declared resources
    resources: Vec<ResourceSpec>,

    /// Dry-run mode: reads only, no writes
    dry_run: bool,

    /// Event sender for external monitoring
    event_tx: mpsc::Sender<ReconcileEvent>,
}

impl Reconciler {
    /// Create a new reconciler
    ///
    /// # Parameters
    ///
    /// - `handlers`: Resource handlers, keyed by resource type name
    /// - `state_store`: State store implementation
    /// - `config`: Reconciler configuration (validated here)
    ///
    /// # Returns
    ///
    /// A tuple of (reconciler, event_receiver) where event_receiver yields
    /// reconcile events.
    pub fn new(
        handlers: HashMap<String, Box<dyn ResourceHandler>>,
        state_store: Box<dyn StateStore>,
        config: ReconcileConfig,
    ) -> Result<(Self, mpsc::Receiver<ReconcileEvent>)> {
        config.validate()?;

        let (tx, rx) = mpsc::channel(config.engine.event_channel_capacity);

        let reconciler = Self {
            handlers,
            state_store,
            resources: config.resources,
            dry_run: config.engine.dry_run,
            event_tx: tx,
        };

        Ok((reconciler, rx))
    }

    /// Compute a reconcile plan
    ///
    /// Performs one read per declared resource and no writes, so it is safe
    /// to call in any mode.
    pub async fn plan(&self) -> Result<Plan> {
        self.emit_event(ReconcileEvent::Started {
            resource_count: self.resources.len(),
        });

        let mut actions = Vec::with_capacity(self.resources.len());
        let mut declared = HashSet::new();

        for spec in &self.resources {
            let handler = self.handler_for(spec.type_name())?;
            let address = format!("{}:{}", spec.type_name(), spec.key());
            declared.insert(address.clone());

            let desired = handler.desired_payload(spec)?;
            let observed = handler.read(spec.key()).await?;
            let recorded = self.state_store.get_record(&address).await?;

            let action = match observed {
                None => {
                    if recorded.is_some() {
                        // Applied before, gone now: deleted out-of-band
                        self.emit_event(ReconcileEvent::DriftDetected {
                            address: address.clone(),
                        });
                    }
                    Action::Create
                }
                Some(state) => {
                    if is_subset(&desired, &state.attributes, handler.write_only_fields()) {
                        Action::Noop
                    } else {
                        if recorded.is_some() {
                            self.emit_event(ReconcileEvent::DriftDetected {
                                address: address.clone(),
                            });
                        }
                        Action::Update
                    }
                }
            };

            debug!("Planned {} for {}", action, address);
            actions.push(PlannedAction {
                resource_type: spec.type_name().to_string(),
                key: spec.key().to_string(),
                action,
                spec: Some(spec.clone()),
            });
        }

        // Prune: state records with no matching declaration
        for address in self.state_store.list_records().await? {
            if declared.contains(&address) {
                continue;
            }
            let Some(record) = self.state_store.get_record(&address).await? else {
                continue;
            };
            debug!("Planned delete for undeclared {}", address);
            actions.push(PlannedAction {
                resource_type: record.resource_type,
                key: record.key,
                action: Action::Delete,
                spec: None,
            });
        }

        let plan = Plan { actions };
        self.emit_event(ReconcileEvent::PlanComputed {
            creates: plan.count(Action::Create),
            updates: plan.count(Action::Update),
            deletes: plan.count(Action::Delete),
            unchanged: plan.count(Action::Noop),
        });

        Ok(plan)
    }

    /// Compute and execute a reconcile plan
    ///
    /// Failures on individual resources are reported via events and counted
    /// in the summary; the remaining resources still proceed. In dry-run
    /// mode no write is issued.
    pub async fn apply(&self) -> Result<ApplySummary> {
        let plan = self.plan().await?;
        let mut summary = ApplySummary::default();

        for planned in &plan.actions {
            let address = planned.address();

            if planned.action == Action::Noop {
                summary.unchanged += 1;
                // Adopt: refresh the state record so prune stays accurate
                if !self.dry_run {
                    self.record_applied(planned).await?;
                }
                continue;
            }

            if self.dry_run {
                info!("[DRY-RUN] Would {} {}", planned.action, address);
                continue;
            }

            match self.execute(planned).await {
                Ok(()) => {
                    info!("{} {} succeeded", planned.action, address);
                    match planned.action {
                        Action::Create => summary.created += 1,
                        Action::Update => summary.updated += 1,
                        Action::Delete => summary.deleted += 1,
                        Action::Noop => {}
                    }
                    self.emit_event(ReconcileEvent::ActionSucceeded {
                        address,
                        action: planned.action,
                    });
                }
                Err(e) => {
                    error!("{} {} failed: {}", planned.action, address, e);
                    summary.failed += 1;
                    self.emit_event(ReconcileEvent::ActionFailed {
                        address,
                        error: e.to_string(),
                    });
                }
            }
        }

        self.state_store.flush().await?;
        self.emit_event(ReconcileEvent::Stopped {
            reason: "Apply finished".to_string(),
        });

        Ok(summary)
    }

    /// Delete every declared resource from the remote instance
    ///
    /// State records for the deleted resources are removed as well.
    pub async fn destroy(&self) -> Result<ApplySummary> {
        self.emit_event(ReconcileEvent::Started {
            resource_count: self.resources.len(),
        });

        let mut summary = ApplySummary::default();

        for spec in &self.resources {
            let handler = self.handler_for(spec.type_name())?;
            let address = format!("{}:{}", spec.type_name(), spec.key());

            if self.dry_run {
                info!("[DRY-RUN] Would delete {}", address);
                continue;
            }

            match handler.delete(spec.key()).await {
                Ok(()) => {
                    self.state_store.delete_record(&address).await?;
                    summary.deleted += 1;
                    self.emit_event(ReconcileEvent::ActionSucceeded {
                        address,
                        action: Action::Delete,
                    });
                }
                Err(e) => {
                    error!("Delete {} failed: {}", address, e);
                    summary.failed += 1;
                    self.emit_event(ReconcileEvent::ActionFailed {
                        address,
                        error: e.to_string(),
                    });
                }
            }
        }

        self.state_store.flush().await?;
        self.emit_event(ReconcileEvent::Stopped {
            reason: "Destroy finished".to_string(),
        });

        Ok(summary)
    }

    /// Execute one planned action
    async fn execute(&self, planned: &PlannedAction) -> Result<()> {
        let handler = self.handler_for(&planned.resource_type)?;
        let address = planned.address();

        match planned.action {
            Action::Create => {
                let spec = planned
                    .spec
                    .as_ref()
                    .ok_or_else(|| Error::Other(format!("No spec for create of {}", address)))?;
                handler.create(spec).await?;
                self.record_applied(planned).await?;
            }
            Action::Update => {
                let spec = planned
                    .spec
                    .as_ref()
                    .ok_or_else(|| Error::Other(format!("No spec for update of {}", address)))?;
                handler.update(&planned.key, spec).await?;
                self.record_applied(planned).await?;
            }
            Action::Delete => {
                handler.delete(&planned.key).await?;
                self.state_store.delete_record(&address).await?;
            }
            Action::Noop => {}
        }

        Ok(())
    }

    /// Persist the applied payload for a planned action
    async fn record_applied(&self, planned: &PlannedAction) -> Result<()> {
        let Some(spec) = planned.spec.as_ref() else {
            return Ok(());
        };
        let handler = self.handler_for(&planned.resource_type)?;
        let payload = handler.desired_payload(spec)?;
        let record = StateRecord::new(&planned.resource_type, &planned.key, payload);
        self.state_store.set_record(&planned.address(), &record).await
    }

    /// Look up the handler for a resource type
    fn handler_for(&self, resource_type: &str) -> Result<&dyn ResourceHandler> {
        self.handlers
            .get(resource_type)
            .map(|h| h.as_ref())
            .ok_or_else(|| {
                Error::config(format!(
                    "No handler registered for resource type: {}",
                    resource_type
                ))
            })
    }

    /// Emit a reconcile event
    fn emit_event(&self, event: ReconcileEvent) {
        // Send event, logging a warning if the channel is full (backpressure)
        if self.event_tx.try_send(event).is_err() {
            warn!(
                "Event channel full, dropping event. \
                Consider increasing event_channel_capacity."
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plan_counting() {
        let plan = Plan {
            actions: vec![
                PlannedAction {
                    resource_type: "backup".to_string(),
                    key: "nightly".to_string(),
                    action: Action::Create,
                    spec: None,
                },
                PlannedAction {
                    resource_type: "proxy".to_string(),
                    key: "corp".to_string(),
                    action: Action::Noop,
                    spec: None,
                },
            ],
        };

        assert_eq!(plan.count(Action::Create), 1);
        assert_eq!(plan.count(Action::Noop), 1);
        assert!(plan.has_changes());
    }

    #[test]
    fn test_action_display() {
        assert_eq!(Action::Create.to_string(), "create");
        assert_eq!(Action::Delete.to_string(), "delete");
    }

    #[test]
    fn test_event_clone_eq() {
        let event = ReconcileEvent::DriftDetected {
            address: "backup:nightly".to_string(),
        };
        assert_eq!(event.clone(), event);
    }
}
