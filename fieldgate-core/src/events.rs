use crate::document::SchemaId;

/// Decisions reported while evaluating
///
/// Permits are the default outcome and are not reported; only denials and
/// failures are. Events are emitted as each decision is made, so an
/// exposure call that ultimately fails may still have reported fields it
/// hid before the failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GuardEvent {
    /// The access gate refused a record
    AccessDenied {
        /// Schema of the refused record
        schema: SchemaId,
    },

    /// An exposure rule hid a field
    FieldHidden {
        /// Schema of the record owning the field
        schema: SchemaId,
        /// Declared path of the hidden field
        path: String,
    },

    /// A modification check found forbidden changes
    ModificationForbidden {
        /// Schema of the checked record
        schema: SchemaId,
        /// Modified paths that were not permitted
        paths: Vec<String>,
    },

    /// A command rule refused a command
    CommandDenied {
        /// Schema of the record the command targeted
        schema: SchemaId,
        /// Command name
        command: String,
    },

    /// A rule predicate returned an error
    PredicateFailed {
        /// Schema of the record being evaluated
        schema: SchemaId,
        /// Error message
        error: String,
    },
}

/// Hook for observing guard decisions
///
/// # Example
/// ```
/// use fieldgate_core::events::{GuardEvent, GuardHook};
///
/// struct AuditLog;
///
/// impl GuardHook for AuditLog {
///     fn on_event(&self, event: &GuardEvent) {
///         if let GuardEvent::AccessDenied { schema } = event {
///             println!("access to {} refused", schema);
///         }
///     }
/// }
/// ```
pub trait GuardHook: Send + Sync {
    /// Called when an event occurs
    fn on_event(&self, event: &GuardEvent);
}

/// Blanket implementation for closures
impl<F> GuardHook for F
where
    F: Fn(&GuardEvent) + Send + Sync,
{
    fn on_event(&self, event: &GuardEvent) {
        self(event)
    }
}
