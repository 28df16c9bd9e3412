pub mod credential;
pub mod resolver;
pub mod token;

pub use credential::{CredentialError, PasswordRecord, hash_password, verify_password};
pub use resolver::{Authorized, Authorizer, AuthzError};
pub use token::{TOKEN_BYTES, TokenError, format_auth_header, generate_token, parse_auth_header};
