pub mod job;
pub mod mailer;
pub mod runner;

pub use job::{Job, RetryPolicy};
pub use mailer::{LogMailer, Mailer};
pub use runner::{JobContext, JobQueue, start};
