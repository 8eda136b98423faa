mod auth;
mod config;
mod session;
mod ui;

pub use auth::{token, CredentialPair, CredentialStore, TokenClient};
pub use config::{
    env_file::{EnvFile, ACCESS_TOKEN_KEY, DEVICE_ID_KEY, REFRESH_TOKEN_KEY},
    load::credentials::{load_credentials, prompt_credentials, Credentials},
    ServiceConfig, SessionType, DEFAULT_SURF_HOST,
};
pub use session::{
    event::SessionEvent,
    exchange::{Exchange, Flow, SessionState},
    request::{generate_request_id, generate_session_id, SessionRequest},
    SessionClient,
};
pub use ui::{channels::OutputChannels, spinner::ThinkingIndicator};
