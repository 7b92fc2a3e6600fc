//! Lightroom API access: credentials, transport, and the authenticated client.

pub mod client;
pub mod credentials;
pub mod endpoints;
pub mod error;
pub mod responses;
pub mod session;

pub use self::client::LightroomClient;
pub use self::credentials::CredentialStore;
pub use self::endpoints::Endpoints;
pub use self::error::LightroomError;
pub use self::responses::AlbumResource;
pub use self::session::http_client;
