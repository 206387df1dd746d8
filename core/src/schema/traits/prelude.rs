//! Well-known trait implementations from the Smithy prelude.

use std::fmt::Display;

use crate::lazy_shape_id;
use crate::schema::documents::DocumentValue;
use crate::schema::{ShapeId, SmithyTrait, StaticTraitId};
use crate::FxIndexMap;
use crate::types::TimestampFormat;

macro_rules! static_id {
    ($trait_struct:ident, $id_var:ident, $id_name:literal) => {
        lazy_shape_id!($id_var, $id_name);
        impl StaticTraitId for $trait_struct {
            fn trait_id() -> &'static ShapeId {
                &$id_var
            }
        }
    };
}

macro_rules! annotation_trait {
    ($trait_struct:ident, $id_var:ident, $id_name:literal) => {
        #[derive(Debug, Default, Clone, Copy)]
        pub struct $trait_struct;
        static_id!($trait_struct, $id_var, $id_name);
        impl SmithyTrait for $trait_struct {
            fn id(&self) -> &ShapeId {
                &$id_var
            }

            fn value(&self) -> &DocumentValue {
                &DocumentValue::Null
            }
        }
    };
}

// ==== Annotation traits ====
annotation_trait!(SensitiveTrait, SENSITIVE_TRAIT_ID, "smithy.api#sensitive");
annotation_trait!(StreamingTrait, STREAMING_TRAIT_ID, "smithy.api#streaming");
annotation_trait!(SparseTrait, SPARSE_TRAIT_ID, "smithy.api#sparse");
annotation_trait!(RequiredTrait, REQUIRED_TRAIT_ID, "smithy.api#required");
annotation_trait!(
    EventHeaderTrait,
    EVENT_HEADER_TRAIT_ID,
    "smithy.api#eventHeader"
);
annotation_trait!(
    EventPayloadTrait,
    EVENT_PAYLOAD_TRAIT_ID,
    "smithy.api#eventPayload"
);
annotation_trait!(
    IdempotencyTokenTrait,
    IDEMPOTENCY_TOKEN_TRAIT_ID,
    "smithy.api#idempotencyToken"
);
annotation_trait!(HttpLabelTrait, HTTP_LABEL_TRAIT_ID, "smithy.api#httpLabel");
annotation_trait!(
    HttpPayloadTrait,
    HTTP_PAYLOAD_TRAIT_ID,
    "smithy.api#httpPayload"
);
annotation_trait!(
    HttpQueryParamsTrait,
    HTTP_QUERY_PARAMS_TRAIT_ID,
    "smithy.api#httpQueryParams"
);
annotation_trait!(
    HttpResponseCodeTrait,
    HTTP_RESPONSE_CODE_TRAIT_ID,
    "smithy.api#httpResponseCode"
);
annotation_trait!(
    HostLabelTrait,
    HOST_LABEL_TRAIT_ID,
    "smithy.api#hostLabel"
);

// ==== Traits with values ====

/// Gives a member a default value used for error correction.
#[derive(Debug, Clone)]
pub struct DefaultTrait(pub DocumentValue);
static_id!(DefaultTrait, DEFAULT_TRAIT_ID, "smithy.api#default");
impl SmithyTrait for DefaultTrait {
    fn id(&self) -> &ShapeId {
        DefaultTrait::trait_id()
    }

    fn value(&self) -> &DocumentValue {
        &self.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorFaultValue {
    Client,
    Server,
}
impl Display for ErrorFaultValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let str = match self {
            ErrorFaultValue::Client => "client",
            ErrorFaultValue::Server => "server",
        };
        write!(f, "{str}")
    }
}

/// Marks a structure as an error shape and attributes the fault.
#[derive(Debug, Clone)]
pub struct ErrorTrait {
    pub error: ErrorFaultValue,
    value: DocumentValue,
}
impl ErrorTrait {
    pub fn new(error: ErrorFaultValue) -> Self {
        ErrorTrait {
            value: DocumentValue::String(error.to_string()),
            error,
        }
    }
}
static_id!(ErrorTrait, ERROR_TRAIT_ID, "smithy.api#error");
impl SmithyTrait for ErrorTrait {
    fn id(&self) -> &ShapeId {
        ErrorTrait::trait_id()
    }

    fn value(&self) -> &DocumentValue {
        &self.value
    }
}

/// Overrides the media type of a blob or string shape.
#[derive(Debug, Clone)]
pub struct MediaTypeTrait {
    pub media_type: String,
    value: DocumentValue,
}
impl MediaTypeTrait {
    pub fn new(media_type: &str) -> Self {
        MediaTypeTrait {
            media_type: media_type.to_string(),
            value: DocumentValue::String(media_type.to_string()),
        }
    }
}
static_id!(MediaTypeTrait, MEDIA_TYPE_TRAIT_ID, "smithy.api#mediaType");
impl SmithyTrait for MediaTypeTrait {
    fn id(&self) -> &ShapeId {
        MediaTypeTrait::trait_id()
    }

    fn value(&self) -> &DocumentValue {
        &self.value
    }
}

/// Overrides the name used for a member by JSON protocols.
#[derive(Debug, Clone)]
pub struct JsonNameTrait {
    pub name: String,
    value: DocumentValue,
}
impl JsonNameTrait {
    pub fn new(name: &str) -> Self {
        JsonNameTrait {
            name: name.to_string(),
            value: DocumentValue::String(name.to_string()),
        }
    }
    pub fn name(&self) -> &str {
        &self.name
    }
}
static_id!(JsonNameTrait, JSON_NAME_TRAIT_ID, "smithy.api#jsonName");
impl SmithyTrait for JsonNameTrait {
    fn id(&self) -> &ShapeId {
        JsonNameTrait::trait_id()
    }

    fn value(&self) -> &DocumentValue {
        &self.value
    }
}

/// The HTTP status code used when an error shape is returned.
#[derive(Debug, Clone)]
pub struct HttpErrorTrait {
    code: u16,
    value: DocumentValue,
}
impl HttpErrorTrait {
    pub fn new(code: u16) -> Self {
        assert!(
            (200..600).contains(&code),
            "httpError code out of range: {code}"
        );
        HttpErrorTrait {
            code,
            value: DocumentValue::integer(i32::from(code)),
        }
    }

    pub fn code(&self) -> u16 {
        self.code
    }
}
static_id!(HttpErrorTrait, HTTP_ERROR_TRAIT_ID, "smithy.api#httpError");
impl SmithyTrait for HttpErrorTrait {
    fn id(&self) -> &ShapeId {
        HttpErrorTrait::trait_id()
    }
    fn value(&self) -> &DocumentValue {
        &self.value
    }
}

/// Binds a member to a named HTTP header.
#[derive(Debug, Clone)]
pub struct HttpHeaderTrait {
    pub key: String,
    value: DocumentValue,
}
static_id!(HttpHeaderTrait, HTTP_HEADER_TRAIT_ID, "smithy.api#httpHeader");
impl HttpHeaderTrait {
    pub fn new(key: &str) -> Self {
        HttpHeaderTrait {
            key: key.to_string(),
            value: DocumentValue::String(key.to_string()),
        }
    }
}
impl SmithyTrait for HttpHeaderTrait {
    fn id(&self) -> &ShapeId {
        HttpHeaderTrait::trait_id()
    }
    fn value(&self) -> &DocumentValue {
        &self.value
    }
}

/// Binds a map member to HTTP headers sharing a name prefix.
#[derive(Debug, Clone)]
pub struct HttpPrefixHeadersTrait {
    pub prefix: String,
    value: DocumentValue,
}
static_id!(
    HttpPrefixHeadersTrait,
    HTTP_PREFIX_HEADERS_TRAIT_ID,
    "smithy.api#httpPrefixHeaders"
);
impl HttpPrefixHeadersTrait {
    pub fn new(prefix: &str) -> Self {
        HttpPrefixHeadersTrait {
            prefix: prefix.to_string(),
            value: DocumentValue::String(prefix.to_string()),
        }
    }
}
impl SmithyTrait for HttpPrefixHeadersTrait {
    fn id(&self) -> &ShapeId {
        HttpPrefixHeadersTrait::trait_id()
    }

    fn value(&self) -> &DocumentValue {
        &self.value
    }
}

/// Binds a member to an HTTP query parameter.
#[derive(Debug, Clone)]
pub struct HttpQueryTrait {
    pub key: String,
    value: DocumentValue,
}
static_id!(HttpQueryTrait, HTTP_QUERY_TRAIT_ID, "smithy.api#httpQuery");
impl HttpQueryTrait {
    pub fn new(key: &str) -> Self {
        HttpQueryTrait {
            key: key.to_string(),
            value: DocumentValue::String(key.to_string()),
        }
    }
}
impl SmithyTrait for HttpQueryTrait {
    fn id(&self) -> &ShapeId {
        HttpQueryTrait::trait_id()
    }
    fn value(&self) -> &DocumentValue {
        &self.value
    }
}

/// Prefixes the resolved endpoint host for an operation.
#[derive(Debug, Clone)]
pub struct EndpointTrait {
    pub host_prefix: String,
    value: DocumentValue,
}
static_id!(EndpointTrait, ENDPOINT_TRAIT_ID, "smithy.api#endpoint");
impl EndpointTrait {
    pub fn new(host_prefix: &str) -> Self {
        EndpointTrait {
            host_prefix: host_prefix.to_string(),
            value: DocumentValue::String(host_prefix.to_string()),
        }
    }
}
impl SmithyTrait for EndpointTrait {
    fn id(&self) -> &ShapeId {
        EndpointTrait::trait_id()
    }

    fn value(&self) -> &DocumentValue {
        &self.value
    }
}

/// Configures the HTTP bindings of an operation.
///
/// The URI pattern is split into the path pattern and the literal query
/// string defaults (`/foo/{bar}?baz=bam`).
#[derive(Debug, Clone)]
pub struct HttpTrait {
    pub method: String,
    pub path: String,
    pub query: Option<String>,
    pub code: u16,
    value: DocumentValue,
}
static_id!(HttpTrait, HTTP_TRAIT_ID, "smithy.api#http");
impl HttpTrait {
    pub fn new(method: &str, uri: &str, code: u16) -> Self {
        let (path, query) = match uri.split_once('?') {
            Some((path, query)) => (path.to_string(), Some(query.to_string())),
            None => (uri.to_string(), None),
        };
        let mut map: FxIndexMap<String, DocumentValue> = FxIndexMap::default();
        map.insert("method".into(), DocumentValue::String(method.to_string()));
        map.insert("uri".into(), DocumentValue::String(uri.to_string()));
        map.insert("code".into(), DocumentValue::integer(i32::from(code)));
        HttpTrait {
            method: method.to_string(),
            path,
            query,
            code,
            value: DocumentValue::Map(map),
        }
    }
}
impl SmithyTrait for HttpTrait {
    fn id(&self) -> &ShapeId {
        HttpTrait::trait_id()
    }

    fn value(&self) -> &DocumentValue {
        &self.value
    }
}

/// Customizes the serialized format of a timestamp shape or member.
#[derive(Debug, Clone)]
pub struct TimestampFormatTrait {
    pub format: TimestampFormat,
    value: DocumentValue,
}
static_id!(
    TimestampFormatTrait,
    TIMESTAMP_FORMAT_TRAIT_ID,
    "smithy.api#timestampFormat"
);
impl TimestampFormatTrait {
    pub fn new(format: TimestampFormat) -> Self {
        TimestampFormatTrait {
            value: DocumentValue::String(format.to_string()),
            format,
        }
    }
}
impl SmithyTrait for TimestampFormatTrait {
    fn id(&self) -> &ShapeId {
        TimestampFormatTrait::trait_id()
    }

    fn value(&self) -> &DocumentValue {
        &self.value
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn http_trait_splits_query_defaults() {
        let http = HttpTrait::new("GET", "/forecast/{city}?type=daily", 200);
        assert_eq!(http.method, "GET");
        assert_eq!(http.path, "/forecast/{city}");
        assert_eq!(http.query.as_deref(), Some("type=daily"));
        assert_eq!(http.code, 200);
    }

    #[test]
    #[should_panic(expected = "httpError code out of range")]
    fn http_error_code_range() {
        let _ = HttpErrorTrait::new(100);
    }
}
