pub mod chat_message;
pub mod new_subscriber;
pub mod subscriber_email;
pub mod subscriber_record;
