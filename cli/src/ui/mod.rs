pub mod channels;
pub mod spinner;
pub(crate) mod user_messages;
