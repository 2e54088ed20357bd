use chrono::{DateTime, SecondsFormat, Utc};

use crate::domain::subscriber_email::SubscriberEmail;

#[derive(Debug, Clone)]
pub struct SubscriberRecord {
    pub email: SubscriberEmail,
    pub created_at: DateTime<Utc>,
}

impl SubscriberRecord {
    pub fn new(email: SubscriberEmail) -> SubscriberRecord {
        SubscriberRecord {
            email,
            created_at: Utc::now(),
        }
    }

    /// One ledger line: the email quoted CSV-style, then the timestamp.
    pub fn to_line(&self) -> String {
        format!(
            "\"{}\",{}\n",
            self.email.as_ref().replace('"', "\"\""),
            self.created_at.to_rfc3339_opts(SecondsFormat::Millis, true)
        )
    }
}
