//! Turnstile core library: framework-agnostic authentication and throttling.
//!
//! `turnstile-core` verifies credentials, issues and validates signed
//! bearer tokens, and counts requests per client. It knows nothing about
//! HTTP; `turnstile-web` wires it into an axum server.
//!
//! # Modules
//!
//! - [`token`]: HS256 token issuing ([`TokenIssuer`]) and validation ([`TokenValidator`]).
//! - [`store`]: credential lookup ([`CredentialStore`]) backed by a JSON file or memory.
//! - [`login`]: the username/password flow ([`Authenticator`]).
//! - [`ratelimit`]: fixed-window per-client counters ([`RateLimiter`]).
//! - [`pipeline`]: throttle, authenticate and authorize, in that order ([`Pipeline`]).
//! - [`clock`]: injectable time source.
//! - [`error`]: one error enum per operation.

pub mod clock;
pub mod error;
pub mod identity;
pub mod login;
pub mod pipeline;
pub mod ratelimit;
pub mod store;
pub mod token;

pub use clock::{Clock, ManualClock, SystemClock};
pub use error::{ConfigError, LoginError, RuleError, StoreError, ValidationError};
pub use identity::{Claims, Identity, LoginRequest};
pub use login::{Authenticator, LoginOutcome};
pub use pipeline::{AuthFailure, InboundRequest, Passage, Pipeline, Rejection};
pub use ratelimit::{Admission, EndpointPattern, RateLimitRule, RateLimiter, RuleSpec, Throttle};
pub use store::{CredentialStore, JsonFileStore, MemoryStore};
pub use token::{IssuedToken, TokenIssuer, TokenSettings, TokenValidator, TOKEN_TTL};
