//! Authentication: identities, identity resolvers, auth schemes and signers.
//!
//! Each attempt walks the auth scheme options produced by the configured
//! [`AuthSchemeResolver`] and uses the first one the client supports and can
//! resolve an identity for.

mod identity;
mod resolver;
mod scheme;
mod signer;

pub use identity::{
    ApiKeyIdentity, CustomIdentity, Identity, IdentityType, LoginIdentity, Secret, TokenIdentity,
};
pub use resolver::{
    EnvironmentIdentityResolver, IdentityError, IdentityResolver, IdentityResolverChain,
    SharedIdentityResolver, StaticIdentityResolver,
};
pub use scheme::{
    AuthScheme, AuthSchemeOption, AuthSchemeParams, AuthSchemeResolver, CustomAuthScheme,
    HTTP_API_KEY_AUTH_ID, HTTP_BASIC_AUTH_ID, HTTP_BEARER_AUTH_ID, HTTP_DIGEST_AUTH_ID,
    HttpApiKeyAuth, NO_AUTH_ID, ResolveAuthSchemes,
};
pub use signer::{
    API_KEY_LOCATION, API_KEY_NAME, API_KEY_SCHEME, ApiKeyLocation, HttpApiKeySigner,
    HttpBasicSigner, HttpBearerSigner, HttpDigestSigner, NullSigner, Signer,
};
