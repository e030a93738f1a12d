//! Domain models for rolegate.

pub mod auth;
pub mod auth_event;
pub mod identity;
pub mod profile;
pub mod role;

// Re-export commonly used types
pub use auth::{
    CallbackQuery, GoogleSignInQuery, PhoneCodeSentResponse, PhoneConfirmationClaims,
    SendPhoneCodeRequest, SessionClaims, SignInResponse, VerifyPhoneCodeRequest,
};
pub use auth_event::{AuthEvent, AuthEventKind, RoleSnapshot};
pub use identity::{Identity, IdentityProviderKind, phone_uid};
pub use profile::{
    ListProfilesQuery, ListProfilesResponse, MeResponse, NewProfile, UpdateRoleRequest,
    UserProfile,
};
pub use role::Role;
