#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubscriberEmail(String);

impl SubscriberEmail {
    /// Trims the candidate and accepts it only in a `local@domain.tld` shape.
    pub fn parse(email: String) -> Result<SubscriberEmail, String> {
        let email = email.trim().to_string();

        if !is_local_at_domain_tld(&email) {
            return Err(format!("{} email is not valid", email));
        }

        Ok(Self(email))
    }

    /// Key used to detect duplicates: emails compare case-insensitively.
    pub fn normalized(&self) -> String {
        self.0.to_lowercase()
    }
}

// No whitespace, exactly one `@` with text before it, and a domain holding a
// dot that has text on both sides.
fn is_local_at_domain_tld(email: &str) -> bool {
    if email.chars().any(char::is_whitespace) {
        return false;
    }

    match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && !domain.contains('@')
                && domain
                    .char_indices()
                    .any(|(i, c)| c == '.' && i > 0 && i + 1 < domain.len())
        }
        None => false,
    }
}

impl AsRef<str> for SubscriberEmail {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
