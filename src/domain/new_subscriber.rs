use serde::Deserialize;

use crate::domain::subscriber_email::SubscriberEmail;

pub struct NewSubscriber {
    pub email: SubscriberEmail,
}

#[derive(Deserialize)]
pub struct SubscribeBody {
    pub email: String,
}

impl TryFrom<SubscribeBody> for NewSubscriber {
    type Error = String;

    fn try_from(body: SubscribeBody) -> Result<Self, Self::Error> {
        let email = SubscriberEmail::parse(body.email)?;

        Ok(NewSubscriber { email })
    }
}
