use std::time::Duration;

use playmaker_types::models::NotificationKind;

/// Work submitted to the background runner by the request-handling side.
///
/// Jobs execute at-least-once on worker tasks; nothing is guaranteed about
/// ordering between two independently enqueued jobs.
#[derive(Debug, Clone)]
pub enum Job {
    /// Per-receiver notification fan-out (new post, new trial, friend
    /// requests, follows).
    NotificationFanOut {
        kind: NotificationKind,
        text: String,
        link: Option<String>,
        sender_id: i64,
        receiver_ids: Vec<i64>,
    },

    /// Mail a player whose trial status was updated by the academy.
    TrialStatusMail {
        email: String,
        trial_name: String,
        message: String,
    },

    /// Mail every registered player when an academy cancels a trial.
    TrialCancellationMail {
        recipients: Vec<String>,
        trial_name: String,
        academy_name: String,
        reason: String,
    },
}

/// Bounded retry for transient failures: `max_retries` further attempts with
/// a fixed backoff between them, then the job is logged and dropped.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub backoff: Duration,
}

/// Cancellation mail is the one job worth retrying: players must learn the
/// trial is off even if the mail relay blips.
pub const CANCELLATION_MAIL_RETRY: RetryPolicy = RetryPolicy {
    max_retries: 3,
    backoff: Duration::from_secs(60),
};

impl Job {
    /// Fan-out for a freshly created post.
    pub fn new_post(sender_id: i64, username: &str, post_id: i64, receiver_ids: Vec<i64>) -> Self {
        Self::NotificationFanOut {
            kind: NotificationKind::NewPost,
            text: format!("{} added a new post", username),
            link: Some(format!("/view_post_details/{}", post_id)),
            sender_id,
            receiver_ids,
        }
    }

    /// Fan-out for a freshly created trial, to the academy's followers.
    pub fn new_trial(sender_id: i64, username: &str, trial_id: i64, receiver_ids: Vec<i64>) -> Self {
        Self::NotificationFanOut {
            kind: NotificationKind::NewTrial,
            text: format!("{} added a new Trial", username),
            link: Some(format!("/trial_details/{}", trial_id)),
            sender_id,
            receiver_ids,
        }
    }

    /// Which retry policy applies to this job, if any. Everything without a
    /// policy is best-effort: log the failure and move on.
    pub fn retry_policy(&self) -> Option<RetryPolicy> {
        match self {
            Job::TrialCancellationMail { .. } => Some(CANCELLATION_MAIL_RETRY),
            Job::NotificationFanOut { .. } | Job::TrialStatusMail { .. } => None,
        }
    }

    /// Short label for logs.
    pub fn name(&self) -> &'static str {
        match self {
            Job::NotificationFanOut { .. } => "notification_fan_out",
            Job::TrialStatusMail { .. } => "trial_status_mail",
            Job::TrialCancellationMail { .. } => "trial_cancellation_mail",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_cancellation_mail_retries() {
        let fan_out = Job::new_post(1, "academy", 7, vec![2, 3]);
        assert!(fan_out.retry_policy().is_none());

        let status = Job::TrialStatusMail {
            email: "p@example.com".into(),
            trial_name: "U17 Trials".into(),
            message: "approved".into(),
        };
        assert!(status.retry_policy().is_none());

        let cancel = Job::TrialCancellationMail {
            recipients: vec!["p@example.com".into()],
            trial_name: "U17 Trials".into(),
            academy_name: "Academy One".into(),
            reason: "weather".into(),
        };
        let policy = cancel.retry_policy().unwrap();
        assert_eq!(policy.max_retries, 3);
        assert_eq!(policy.backoff, Duration::from_secs(60));
    }

    #[test]
    fn helper_constructors_encode_links() {
        let Job::NotificationFanOut { kind, text, link, .. } =
            Job::new_trial(1, "academy_one", 42, vec![5])
        else {
            panic!("expected fan-out job");
        };
        assert_eq!(kind, NotificationKind::NewTrial);
        assert_eq!(text, "academy_one added a new Trial");
        assert_eq!(link.as_deref(), Some("/trial_details/42"));
    }
}
