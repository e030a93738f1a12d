//! Business logic services.

pub mod auth_events;
pub mod google_oauth;
pub mod identity;
pub mod profile_store;
pub mod reconcile;
pub mod role_observer;
pub mod twilio_verify;

pub use auth_events::AuthEventBroadcaster;
pub use identity::{IdentityGateway, OAuthProvider, PhoneVerifier};
pub use profile_store::{MemoryProfileStore, ProfileStore};
pub use reconcile::{ProfileService, ensure_profile};
pub use role_observer::{ObserverScope, RoleObserver};
