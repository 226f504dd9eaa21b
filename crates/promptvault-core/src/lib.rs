//! Template resolution and version/execution bookkeeping for promptvault.
//!
//! The pure pieces (placeholder parsing, fragment defaults, substitution,
//! change detection, and execution grouping) live in their own modules and
//! need no I/O. [`PromptService`] wires them to a [`CatalogStore`] and a
//! [`TextGenerator`].
//!
//! [`CatalogStore`]: promptvault_store::CatalogStore
//! [`TextGenerator`]: promptvault_protocol::TextGenerator

pub mod error;
pub mod event_bus;
pub mod history;
pub mod placeholder;
pub mod provider;
pub mod render;
pub mod resolver;
pub mod service;
pub mod versioning;

pub use error::CoreError;
pub use event_bus::EventBus;
pub use history::{ExecutionGroup, HistoryEntry, flatten_history, group_executions};
pub use placeholder::{extract_placeholders, split_dotted};
pub use provider::{OpenAiGenerator, build_generator};
pub use render::{render, unresolved};
pub use resolver::{VariableSlot, prepare_variables, resolve_default, resolve_default_with};
pub use service::{
    ExecuteRequest, ExecutionOutcome, FragmentUpdate, NewFragment, NewTemplate, PromptService,
    open_store, shape_request,
};
pub use versioning::{VersionDecision, should_create_version};
