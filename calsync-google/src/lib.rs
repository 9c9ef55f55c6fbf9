//! Google Calendar adapter for calsync.
//!
//! - `session`: turns configured OAuth credentials into an access token
//! - `google`: the events REST client and the `Authenticator` that builds it

pub mod google;
pub mod session;

pub use google::{Endpoints, GoogleCalendar, GoogleConnector};
pub use session::{GoogleCredentials, Session};
