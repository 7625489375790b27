pub mod config;
pub mod domain;
pub mod errors;

pub use domain::conversation::{ConversationTurn, HistoryEntry, TurnId, TurnRole};
pub use domain::intent::{IntentRequest, IntentResponse};
pub use domain::records::{
    DomainRecord, ExpenseId, ExpenseRecord, JobApplication, JobApplicationId, NewExpense,
    NewJobApplication, NewSocialDraft, NewTask, SocialDraft, SocialDraftId, TaskId, TaskRecord,
};
pub use errors::{ApplicationError, DomainError, InterfaceError};
