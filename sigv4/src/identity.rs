use std::any::Any;
use std::fmt::{self, Debug, Formatter};

use smithy_rt_core::Timestamp;
use smithy_rt_core::identity::Identity;

/// A set of AWS credentials representing an identity or role capacity.
#[derive(Clone)]
pub struct AwsCredentialsIdentity {
    pub access_key_id: String,
    pub secret_access_key: String,
    pub session_token: Option<String>,
    pub expiration: Option<Timestamp>,
}

impl AwsCredentialsIdentity {
    pub fn new(
        access_key_id: impl Into<String>,
        secret_access_key: impl Into<String>,
    ) -> Self {
        AwsCredentialsIdentity {
            access_key_id: access_key_id.into(),
            secret_access_key: secret_access_key.into(),
            session_token: None,
            expiration: None,
        }
    }

    #[must_use]
    pub fn with_session_token(mut self, session_token: impl Into<String>) -> Self {
        self.session_token = Some(session_token.into());
        self
    }

    #[must_use]
    pub fn with_expiration(mut self, expiration: Timestamp) -> Self {
        self.expiration = Some(expiration);
        self
    }
}

impl Debug for AwsCredentialsIdentity {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        // The secret key and session token never appear in debug output.
        f.debug_struct("AwsCredentialsIdentity")
            .field("access_key_id", &self.access_key_id)
            .field("expiration", &self.expiration)
            .finish_non_exhaustive()
    }
}

impl Identity for AwsCredentialsIdentity {
    fn expiration(&self) -> Option<Timestamp> {
        self.expiration
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}
