//! The AWS Signature Version 4 request signer.

use chrono::Utc;
use hmac::{Hmac, Mac};
use sha2::{Digest, Sha256};
use thiserror::Error;

use smithy_rt_core::Timestamp;
use smithy_rt_core::transport::{Field, Request};

use crate::canonical::{
    EMPTY_SHA256_HASH, UNSIGNED_PAYLOAD, canonical_fields, canonical_path, canonical_query,
    normalized_signing_fields,
};
use crate::identity::AwsCredentialsIdentity;

pub(crate) const SIGV4_TIMESTAMP_FORMAT: &str = "%Y%m%dT%H%M%SZ";
const CONTENT_SHA256_FIELD: &str = "X-Amz-Content-SHA256";

#[derive(Error, Debug)]
pub enum SigningError {
    #[error("identity expired at {0}; refresh the credentials or update the expiration")]
    ExpiredIdentity(Timestamp),
    #[error("missing required signing property: {0}")]
    MissingProperty(&'static str),
    #[error("failed to read the request body for payload signing: {0}")]
    BodyRead(String),
}

/// Signing configuration for a request or event stream.
#[derive(Debug, Clone, Default)]
pub struct SigV4SigningProperties {
    pub region: String,
    pub service: String,
    /// Signing date in `YYYYMMDDTHHMMSSZ` form; filled with the current
    /// UTC time when absent.
    pub date: Option<String>,
    /// Hash the payload into the signature. Defaults to true; `false` is
    /// only honored over TLS.
    pub payload_signing_enabled: Option<bool>,
    /// Additionally expose the payload digest as `X-Amz-Content-SHA256`.
    pub content_checksum_enabled: Option<bool>,
    /// Percent-encode the canonical path. Defaults to true.
    pub uri_encode_path: Option<bool>,
}

impl SigV4SigningProperties {
    pub fn new(region: impl Into<String>, service: impl Into<String>) -> Self {
        SigV4SigningProperties {
            region: region.into(),
            service: service.into(),
            date: None,
            payload_signing_enabled: None,
            content_checksum_enabled: None,
            uri_encode_path: None,
        }
    }

    /// Copy these properties, filling a missing date with the current UTC
    /// time.
    ///
    /// The normalized copy is used for both the canonical request and the
    /// string to sign.
    #[must_use]
    pub(crate) fn normalize(&self) -> SigV4SigningProperties {
        let mut properties = self.clone();
        if properties.date.is_none() {
            properties.date = Some(format_sigv4_date(&Utc::now()));
        }
        properties
    }

    pub(crate) fn expect_date(&self) -> Result<&str, SigningError> {
        self.date.as_deref().ok_or(SigningError::MissingProperty("date"))
    }
}

/// Render a timestamp in the SigV4 `YYYYMMDDTHHMMSSZ` form.
#[must_use]
pub(crate) fn format_sigv4_date(value: &Timestamp) -> String {
    value.format(SIGV4_TIMESTAMP_FORMAT).to_string()
}

/// A signed request together with the hex signature that was applied.
///
/// The signature seeds the prior-signature chain when the request opens a
/// signed event stream.
#[derive(Debug)]
pub struct SignedRequest {
    pub request: Request,
    pub signature: String,
}

/// Request signer applying the AWS Signature Version 4 algorithm.
#[derive(Debug, Clone, Copy, Default)]
pub struct SigV4Signer;

impl SigV4Signer {
    /// Generate and apply a SigV4 signature to the supplied request.
    ///
    /// The returned request differs from the input only by the addition of
    /// `Authorization`, and optionally `X-Amz-Date`,
    /// `X-Amz-Security-Token`, and `X-Amz-Content-SHA256`.
    pub async fn sign(
        &self,
        request: Request,
        identity: &AwsCredentialsIdentity,
        signing_properties: &SigV4SigningProperties,
    ) -> Result<SignedRequest, SigningError> {
        validate_identity(identity)?;
        let properties = signing_properties.normalize();

        let mut request = request;
        apply_required_fields(&mut request, &properties, identity)?;

        let canonical_request = self.canonical_request(&properties, &mut request).await?;
        let string_to_sign = self.string_to_sign(&canonical_request, &properties)?;
        let signature = signature_hex(
            &string_to_sign,
            &identity.secret_access_key,
            &properties,
        )?;

        let (_, signed_headers) = canonical_fields(&normalized_signing_fields(&request));
        let credential = format!("{}/{}", identity.access_key_id, scope(&properties)?);
        // The member order is fixed; some servers validate by substring.
        let authorization = format!(
            "AWS4-HMAC-SHA256 Credential={credential}, \
             SignedHeaders={signed_headers}, Signature={signature}"
        );
        request
            .fields
            .set_field(Field::with_values("Authorization", [authorization]));

        Ok(SignedRequest { request, signature })
    }

    /// Build the canonical request:
    ///
    /// ```text
    /// <HTTPMethod>\n
    /// <CanonicalURI>\n
    /// <CanonicalQueryString>\n
    /// <CanonicalHeaders>\n
    /// <SignedHeaders>\n
    /// <HashedPayload>
    /// ```
    pub async fn canonical_request(
        &self,
        signing_properties: &SigV4SigningProperties,
        request: &mut Request,
    ) -> Result<String, SigningError> {
        // The payload comes first so field modifications (the content
        // checksum) are in place before the canonical fields are chosen.
        let canonical_payload = format_canonical_payload(request, signing_properties).await?;
        let canonical_path = canonical_path(
            request.destination.path(),
            signing_properties.uri_encode_path.unwrap_or(true),
        );
        let canonical_query = canonical_query(request.destination.query());
        let (canonical_headers, signed_headers) =
            canonical_fields(&normalized_signing_fields(request));
        Ok(format!(
            "{}\n{canonical_path}\n{canonical_query}\n{canonical_headers}\n{signed_headers}\n{canonical_payload}",
            request.method.to_uppercase(),
        ))
    }

    /// Build the string to sign:
    ///
    /// ```text
    /// AWS4-HMAC-SHA256\n
    /// <RequestDateTime>\n
    /// <CredentialScope>\n
    /// <HashedCanonicalRequest>
    /// ```
    pub fn string_to_sign(
        &self,
        canonical_request: &str,
        signing_properties: &SigV4SigningProperties,
    ) -> Result<String, SigningError> {
        let date = signing_properties.expect_date()?;
        Ok(format!(
            "AWS4-HMAC-SHA256\n{date}\n{}\n{}",
            scope(signing_properties)?,
            sha256_hex(canonical_request.as_bytes()),
        ))
    }
}

fn validate_identity(identity: &AwsCredentialsIdentity) -> Result<(), SigningError> {
    if let Some(expiration) = identity.expiration
        && expiration <= Utc::now()
    {
        return Err(SigningError::ExpiredIdentity(expiration));
    }
    Ok(())
}

fn apply_required_fields(
    request: &mut Request,
    signing_properties: &SigV4SigningProperties,
    identity: &AwsCredentialsIdentity,
) -> Result<(), SigningError> {
    // X-Amz-Date is required when neither X-Amz-Date nor Date are present.
    if !request.fields.contains("Date") && !request.fields.contains("X-Amz-Date") {
        request.fields.set_field(Field::with_values(
            "X-Amz-Date",
            [signing_properties.expect_date()?],
        ));
    }
    // X-Amz-Security-Token is required when the identity carries a token.
    if !request.fields.contains("X-Amz-Security-Token")
        && let Some(session_token) = &identity.session_token
    {
        request
            .fields
            .set_field(Field::with_values("X-Amz-Security-Token", [session_token]));
    }
    Ok(())
}

/// Credential scope: `<YYYYMMDD>/<region>/<service>/aws4_request`.
pub(crate) fn scope(signing_properties: &SigV4SigningProperties) -> Result<String, SigningError> {
    let date = signing_properties.expect_date()?;
    Ok(format!(
        "{}/{}/{}/aws4_request",
        &date[..8],
        signing_properties.region,
        signing_properties.service,
    ))
}

async fn format_canonical_payload(
    request: &mut Request,
    signing_properties: &SigV4SigningProperties,
) -> Result<String, SigningError> {
    // A digest pre-set by the caller short-circuits payload hashing.
    if let Some(field) = request.fields.get(CONTENT_SHA256_FIELD)
        && field.values().len() == 1
    {
        return Ok(field.values()[0].clone());
    }

    let payload_hash = compute_payload_hash(request, signing_properties).await?;
    if signing_properties.content_checksum_enabled.unwrap_or(false) {
        request.fields.set_field(Field::with_values(
            CONTENT_SHA256_FIELD,
            [payload_hash.clone()],
        ));
    }
    Ok(payload_hash)
}

async fn compute_payload_hash(
    request: &mut Request,
    signing_properties: &SigV4SigningProperties,
) -> Result<String, SigningError> {
    // Insecure connections are always signed.
    if request.destination.scheme() == "https"
        && !signing_properties.payload_signing_enabled.unwrap_or(true)
    {
        return Ok(UNSIGNED_PAYLOAD.to_string());
    }
    if request.body.is_none() {
        return Ok(EMPTY_SHA256_HASH.to_string());
    }
    // Collecting drains a streaming body into a buffer and replaces it, so
    // the transport still observes the full payload afterwards. In-memory
    // bodies are read in place.
    let bytes = request
        .body
        .collect()
        .await
        .map_err(|e| SigningError::BodyRead(e.to_string()))?;
    Ok(sha256_hex(&bytes))
}

fn sha256_hex(data: &[u8]) -> String {
    hex::encode(Sha256::digest(data))
}

pub(crate) fn hmac_sha256(key: &[u8], data: &[u8]) -> Vec<u8> {
    let mut mac = Hmac::<Sha256>::new_from_slice(key).expect("HMAC accepts keys of any length");
    mac.update(data);
    mac.finalize().into_bytes().to_vec()
}

/// Derive the signing key:
///
/// ```text
/// kDate    = HMAC("AWS4" + secret, YYYYMMDD)
/// kRegion  = HMAC(kDate, region)
/// kService = HMAC(kRegion, service)
/// kSigning = HMAC(kService, "aws4_request")
/// ```
pub(crate) fn derive_signing_key(
    secret_access_key: &str,
    date: &str,
    region: &str,
    service: &str,
) -> Vec<u8> {
    let initial = format!("AWS4{secret_access_key}");
    let k_date = hmac_sha256(initial.as_bytes(), date.as_bytes());
    let k_region = hmac_sha256(&k_date, region.as_bytes());
    let k_service = hmac_sha256(&k_region, service.as_bytes());
    hmac_sha256(&k_service, b"aws4_request")
}

fn signature_hex(
    string_to_sign: &str,
    secret_access_key: &str,
    signing_properties: &SigV4SigningProperties,
) -> Result<String, SigningError> {
    let date = signing_properties.expect_date()?;
    let key = derive_signing_key(
        secret_access_key,
        &date[..8],
        &signing_properties.region,
        &signing_properties.service,
    );
    Ok(hex::encode(hmac_sha256(&key, string_to_sign.as_bytes())))
}
