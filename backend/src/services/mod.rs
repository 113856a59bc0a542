pub mod audit;
pub mod users;
pub mod zingbot;

pub use audit::{AuditLogger, ExecutionRecord, ExecutionStatus};
pub use users::{PgUserDirectory, UserDirectory};
pub use zingbot::ZingbotClient;
