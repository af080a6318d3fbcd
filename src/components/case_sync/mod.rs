pub mod models;
pub mod orchestrator;
pub mod store;

pub use models::{CaseField, CaseMutation, CaseMutationKind, CasePatch, SurgicalCase, SyncOrigin};
pub use orchestrator::SyncOrchestrator;
pub use store::CaseStore;
