//! Binds serializable shapes to HTTP requests.
//!
//! [`HttpRequestSerializer`] scans an operation input's members once; an
//! intercepting binding serializer routes each member to the serializer
//! for its binding location (headers, prefix headers, query params, path
//! labels, host labels, or the payload).

use std::collections::HashMap;

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;

use smithy_rt_core::codecs::Codec;
use smithy_rt_core::schema::{
    EndpointTrait, HttpHeaderTrait, HttpLabelTrait, HttpPayloadTrait, HttpPrefixHeadersTrait,
    HttpQueryParamsTrait, HttpQueryTrait, HttpTrait, HostLabelTrait, MediaTypeTrait, SchemaRef,
    ShapeType, StreamingTrait, TimestampFormatTrait,
};
use smithy_rt_core::serde::{
    InterceptingSerializer, MapScopeWriter, MapSerializer, ScopeWriter, SerializerInterceptor,
    ShapeSerializer, ValueWriter,
};
use smithy_rt_core::transport::{Body, Field, Fields, Request, Uri};
use smithy_rt_core::types::TimestampFormat;
use smithy_rt_core::utils::{serialize_float, url_encode_component, url_encode_path};
use smithy_rt_core::{BigDecimal, BigInt, Bytes, SerdeError, Timestamp};

use crate::pattern::PathPattern;
use crate::utils::join_query_params;

/// Media type used when the input carries a streaming union member.
pub const EVENT_STREAM_CONTENT_TYPE: &str = "application/vnd.amazon.eventstream";

/// Binds a serializable shape to an HTTP request.
///
/// The resulting request is not immediately sendable: the host of the
/// destination URI holds only the host prefix and MUST be completed with
/// the resolved endpoint before sending.
pub struct HttpRequestSerializer<'a> {
    payload_codec: &'a dyn Codec,
    http_trait: &'a HttpTrait,
    endpoint_trait: Option<&'a EndpointTrait>,
    /// The bound request. Only set after serialization.
    pub result: Option<Request>,
}

impl<'a> HttpRequestSerializer<'a> {
    pub fn new(
        payload_codec: &'a dyn Codec,
        http_trait: &'a HttpTrait,
        endpoint_trait: Option<&'a EndpointTrait>,
    ) -> Self {
        HttpRequestSerializer {
            payload_codec,
            http_trait,
            endpoint_trait,
            result: None,
        }
    }
}

impl ShapeSerializer for HttpRequestSerializer<'_> {
    fn write_struct(
        &mut self,
        schema: &SchemaRef,
        members: ScopeWriter<'_>,
    ) -> Result<(), SerdeError> {
        let pattern = PathPattern::new(&self.http_trait.path);
        let host_prefix_pattern = self
            .endpoint_trait
            .map(|t| t.host_prefix.as_str())
            .unwrap_or_default();

        let mut bindings = BindingCollections::default();
        let mut content_type = self.payload_codec.media_type().to_string();
        let body: Body;

        if let Some(payload_member) = payload_member(schema) {
            if is_raw_payload(&payload_member) {
                content_type = raw_content_type(&payload_member);
                let mut payload_serializer = RawPayloadSerializer::default();
                run_bindings(&mut payload_serializer, &pattern, &mut bindings, members)?;
                replay_host_labels(&mut payload_serializer, &mut bindings)?;
                body = payload_serializer.payload.take().unwrap_or_default();
            } else {
                if let Some(media_type) = payload_member.get_trait_as::<MediaTypeTrait>() {
                    content_type = media_type.media_type.clone();
                }
                let mut sink = Vec::new();
                {
                    let mut payload_serializer = self.payload_codec.create_serializer(&mut sink);
                    run_bindings(
                        payload_serializer.as_mut(),
                        &pattern,
                        &mut bindings,
                        members,
                    )?;
                    replay_host_labels(payload_serializer.as_mut(), &mut bindings)?;
                    payload_serializer.flush()?;
                }
                body = Body::from(sink);
            }
        } else {
            if streaming_union_member(schema).is_some() {
                content_type = EVENT_STREAM_CONTENT_TYPE.to_string();
            }
            let mut sink = Vec::new();
            {
                let mut payload_serializer = self.payload_codec.create_serializer(&mut sink);
                payload_serializer.write_struct(schema, &mut |body_serializer| {
                    run_bindings(&mut *body_serializer, &pattern, &mut bindings, &mut *members)?;
                    replay_host_labels(body_serializer, &mut bindings)
                })?;
                payload_serializer.flush()?;
            }
            body = Body::from(sink);
        }

        bindings
            .headers
            .push(("content-type".to_string(), content_type));

        let path = pattern.format(&bindings.path_params)?;
        let query = join_query_params(
            &bindings.query_params,
            self.http_trait.query.as_deref().unwrap_or_default(),
        );
        let host_prefix = format_host_prefix(host_prefix_pattern, &bindings.host_params)?;

        let mut destination = Uri::builder().host(host_prefix).path(path);
        if !query.is_empty() {
            destination = destination.query(query);
        }
        let destination = destination
            .build()
            .map_err(|e| SerdeError::Serialization(e.to_string()))?;

        self.result = Some(Request {
            destination,
            method: self.http_trait.method.clone(),
            fields: tuples_to_fields(bindings.headers),
            body,
        });
        Ok(())
    }
}

/// The collections the binding-location serializers write into.
#[derive(Default)]
struct BindingCollections {
    headers: Vec<(String, String)>,
    query_params: Vec<(String, Option<String>)>,
    path_params: HashMap<String, String>,
    host_params: HashMap<String, String>,
    host_labels: Vec<(SchemaRef, String)>,
}

fn run_bindings(
    payload_serializer: &mut dyn ShapeSerializer,
    pattern: &PathPattern,
    bindings: &mut BindingCollections,
    members: ScopeWriter<'_>,
) -> Result<(), SerdeError> {
    let mut binding_serializer = InterceptingSerializer::new(RequestBindingSerializer {
        payload: payload_serializer,
        headers: HeaderSerializer {
            headers: &mut bindings.headers,
            key: None,
        },
        query: QuerySerializer {
            params: &mut bindings.query_params,
            key: None,
        },
        path: PathSerializer {
            pattern,
            params: &mut bindings.path_params,
        },
        host: HostLabelSerializer {
            params: &mut bindings.host_params,
            captured: &mut bindings.host_labels,
        },
    });
    members(&mut binding_serializer)
}

/// Host-label members are also written into the payload so the server may
/// read their values.
fn replay_host_labels(
    payload_serializer: &mut dyn ShapeSerializer,
    bindings: &mut BindingCollections,
) -> Result<(), SerdeError> {
    for (schema, value) in bindings.host_labels.drain(..) {
        payload_serializer.write_string(&schema, &value)?;
    }
    Ok(())
}

fn payload_member(schema: &SchemaRef) -> Option<SchemaRef> {
    schema
        .members()
        .values()
        .find(|member| member.contains_type::<HttpPayloadTrait>())
        .cloned()
}

fn streaming_union_member(schema: &SchemaRef) -> Option<&SchemaRef> {
    schema.members().values().find(|member| {
        member.contains_type::<StreamingTrait>() && member.shape_type() == &ShapeType::Union
    })
}

fn is_raw_payload(member: &SchemaRef) -> bool {
    matches!(member.shape_type(), ShapeType::Blob | ShapeType::String)
}

fn raw_content_type(member: &SchemaRef) -> String {
    if let Some(media_type) = member.get_trait_as::<MediaTypeTrait>() {
        return media_type.media_type.clone();
    }
    match member.shape_type() {
        ShapeType::Blob => "application/octet-stream".to_string(),
        _ => "text/plain".to_string(),
    }
}

/// Group `(name, value)` tuples into [`Fields`], appending values of
/// repeated names to one field.
#[must_use]
pub fn tuples_to_fields<I: IntoIterator<Item = (String, String)>>(tuples: I) -> Fields {
    let mut fields = Fields::new();
    for (name, value) in tuples {
        match fields.get_mut(&name) {
            Some(field) => field.add(value),
            None => fields.set_field(Field::with_values(name, [value])),
        }
    }
    fields
}

fn format_host_prefix(
    pattern: &str,
    params: &HashMap<String, String>,
) -> Result<String, SerdeError> {
    let mut result = pattern.to_string();
    for (key, value) in params {
        result = result.replace(&format!("{{{key}}}"), value);
    }
    if result.contains('{') {
        return Err(SerdeError::Serialization(format!(
            "host prefix `{pattern}` has unbound labels"
        )));
    }
    Ok(result)
}

/// Delegates HTTP request bindings to binding-location-specific serializers.
struct RequestBindingSerializer<'a> {
    payload: &'a mut dyn ShapeSerializer,
    headers: HeaderSerializer<'a>,
    query: QuerySerializer<'a>,
    path: PathSerializer<'a>,
    host: HostLabelSerializer<'a>,
}

impl SerializerInterceptor for RequestBindingSerializer<'_> {
    fn before(&mut self, schema: &SchemaRef) -> Result<&mut dyn ShapeSerializer, SerdeError> {
        if schema.contains_type::<HttpHeaderTrait>()
            || schema.contains_type::<HttpPrefixHeadersTrait>()
        {
            Ok(&mut self.headers)
        } else if schema.contains_type::<HttpQueryTrait>()
            || schema.contains_type::<HttpQueryParamsTrait>()
        {
            Ok(&mut self.query)
        } else if schema.contains_type::<HttpLabelTrait>() {
            Ok(&mut self.path)
        } else if schema.contains_type::<HostLabelTrait>() {
            Ok(&mut self.host)
        } else {
            Ok(&mut *self.payload)
        }
    }

    fn after(&mut self, _schema: &SchemaRef) -> Result<(), SerdeError> {
        Ok(())
    }
}

fn expect_header_key(schema: &SchemaRef, key: &Option<String>) -> Result<String, SerdeError> {
    if let Some(key) = key {
        return Ok(key.clone());
    }
    schema
        .get_trait_as::<HttpHeaderTrait>()
        .map(|t| t.key.clone())
        .ok_or_else(|| SerdeError::expectation(format!("member `{}` has no httpHeader", schema.id())))
}

fn timestamp_format(schema: &SchemaRef, default: TimestampFormat) -> TimestampFormat {
    schema
        .get_trait_as::<TimestampFormatTrait>()
        .map_or(default, |t| t.format)
}

fn format_integer(value: i64) -> String {
    itoa::Buffer::new().format(value).to_string()
}

/// Binds members to HTTP headers. List members produce one field with
/// multiple values; prefix-header maps produce one field per entry.
struct HeaderSerializer<'a> {
    headers: &'a mut Vec<(String, String)>,
    key: Option<String>,
}

impl ShapeSerializer for HeaderSerializer<'_> {
    fn write_list(
        &mut self,
        schema: &SchemaRef,
        _size: usize,
        elements: ScopeWriter<'_>,
    ) -> Result<(), SerdeError> {
        let key = expect_header_key(schema, &self.key)?;
        let mut delegate = HeaderSerializer {
            headers: &mut *self.headers,
            key: Some(key),
        };
        elements(&mut delegate)
    }

    fn write_map(
        &mut self,
        schema: &SchemaRef,
        _size: usize,
        entries: MapScopeWriter<'_>,
    ) -> Result<(), SerdeError> {
        let prefix = schema
            .get_trait_as::<HttpPrefixHeadersTrait>()
            .map(|t| t.prefix.clone())
            .ok_or_else(|| {
                SerdeError::expectation(format!("member `{}` has no httpPrefixHeaders", schema.id()))
            })?;
        let mut delegate = HeaderMapSerializer {
            prefix,
            headers: &mut *self.headers,
        };
        entries(&mut delegate)
    }

    fn write_boolean(&mut self, schema: &SchemaRef, value: bool) -> Result<(), SerdeError> {
        let key = expect_header_key(schema, &self.key)?;
        self.headers.push((key, value.to_string()));
        Ok(())
    }

    fn write_long(&mut self, schema: &SchemaRef, value: i64) -> Result<(), SerdeError> {
        let key = expect_header_key(schema, &self.key)?;
        self.headers.push((key, format_integer(value)));
        Ok(())
    }

    fn write_big_integer(&mut self, schema: &SchemaRef, value: &BigInt) -> Result<(), SerdeError> {
        let key = expect_header_key(schema, &self.key)?;
        self.headers.push((key, value.to_string()));
        Ok(())
    }

    fn write_double(&mut self, schema: &SchemaRef, value: f64) -> Result<(), SerdeError> {
        let key = expect_header_key(schema, &self.key)?;
        self.headers.push((key, serialize_float(value)));
        Ok(())
    }

    fn write_big_decimal(
        &mut self,
        schema: &SchemaRef,
        value: &BigDecimal,
    ) -> Result<(), SerdeError> {
        let key = expect_header_key(schema, &self.key)?;
        self.headers.push((key, value.normalized().to_string()));
        Ok(())
    }

    fn write_string(&mut self, schema: &SchemaRef, value: &str) -> Result<(), SerdeError> {
        let key = expect_header_key(schema, &self.key)?;
        self.headers.push((key, value.to_string()));
        Ok(())
    }

    fn write_blob(&mut self, schema: &SchemaRef, value: &Bytes) -> Result<(), SerdeError> {
        let key = expect_header_key(schema, &self.key)?;
        self.headers.push((key, BASE64.encode(value)));
        Ok(())
    }

    fn write_timestamp(&mut self, schema: &SchemaRef, value: &Timestamp) -> Result<(), SerdeError> {
        let key = expect_header_key(schema, &self.key)?;
        let format = timestamp_format(schema, TimestampFormat::HttpDate);
        self.headers.push((key, format.serialize(value)));
        Ok(())
    }
}

/// Binds a map member to multiple HTTP headers named `prefix + entry_key`.
struct HeaderMapSerializer<'a> {
    prefix: String,
    headers: &'a mut Vec<(String, String)>,
}

impl MapSerializer for HeaderMapSerializer<'_> {
    fn entry(&mut self, key: &str, value: ValueWriter<'_>) -> Result<(), SerdeError> {
        let mut delegate = CapturingSerializer::default();
        value(&mut delegate)?;
        let value = delegate
            .result
            .ok_or_else(|| SerdeError::expectation("prefix header values must be strings"))?;
        self.headers.push((format!("{}{key}", self.prefix), value));
        Ok(())
    }
}

/// Directly passes a string value through a serializer.
#[derive(Default)]
struct CapturingSerializer {
    result: Option<String>,
}

impl ShapeSerializer for CapturingSerializer {
    fn write_string(&mut self, _schema: &SchemaRef, value: &str) -> Result<(), SerdeError> {
        self.result = Some(value.to_string());
        Ok(())
    }
}

fn expect_query_key(schema: &SchemaRef, key: &Option<String>) -> Result<String, SerdeError> {
    if let Some(key) = key {
        return Ok(key.clone());
    }
    schema
        .get_trait_as::<HttpQueryTrait>()
        .map(|t| t.key.clone())
        .ok_or_else(|| SerdeError::expectation(format!("member `{}` has no httpQuery", schema.id())))
}

/// Binds members to URI query parameters. List members emit repeated
/// `key=value` pairs; `httpQueryParams` maps emit one pair per entry.
struct QuerySerializer<'a> {
    params: &'a mut Vec<(String, Option<String>)>,
    key: Option<String>,
}

impl ShapeSerializer for QuerySerializer<'_> {
    fn write_list(
        &mut self,
        schema: &SchemaRef,
        _size: usize,
        elements: ScopeWriter<'_>,
    ) -> Result<(), SerdeError> {
        let key = expect_query_key(schema, &self.key)?;
        let mut delegate = QuerySerializer {
            params: &mut *self.params,
            key: Some(key),
        };
        elements(&mut delegate)
    }

    fn write_map(
        &mut self,
        _schema: &SchemaRef,
        _size: usize,
        entries: MapScopeWriter<'_>,
    ) -> Result<(), SerdeError> {
        let mut delegate = QueryMapSerializer {
            params: &mut *self.params,
        };
        entries(&mut delegate)
    }

    fn write_boolean(&mut self, schema: &SchemaRef, value: bool) -> Result<(), SerdeError> {
        let key = expect_query_key(schema, &self.key)?;
        self.params.push((key, Some(value.to_string())));
        Ok(())
    }

    fn write_long(&mut self, schema: &SchemaRef, value: i64) -> Result<(), SerdeError> {
        let key = expect_query_key(schema, &self.key)?;
        self.params.push((key, Some(format_integer(value))));
        Ok(())
    }

    fn write_big_integer(&mut self, schema: &SchemaRef, value: &BigInt) -> Result<(), SerdeError> {
        let key = expect_query_key(schema, &self.key)?;
        self.params.push((key, Some(value.to_string())));
        Ok(())
    }

    fn write_double(&mut self, schema: &SchemaRef, value: f64) -> Result<(), SerdeError> {
        let key = expect_query_key(schema, &self.key)?;
        self.params.push((key, Some(serialize_float(value))));
        Ok(())
    }

    fn write_big_decimal(
        &mut self,
        schema: &SchemaRef,
        value: &BigDecimal,
    ) -> Result<(), SerdeError> {
        let key = expect_query_key(schema, &self.key)?;
        self.params.push((key, Some(value.normalized().to_string())));
        Ok(())
    }

    fn write_string(&mut self, schema: &SchemaRef, value: &str) -> Result<(), SerdeError> {
        let key = expect_query_key(schema, &self.key)?;
        self.params.push((key, Some(url_encode_component(value))));
        Ok(())
    }

    fn write_timestamp(&mut self, schema: &SchemaRef, value: &Timestamp) -> Result<(), SerdeError> {
        let key = expect_query_key(schema, &self.key)?;
        let format = timestamp_format(schema, TimestampFormat::DateTime);
        self.params
            .push((key, Some(url_encode_component(&format.serialize(value)))));
        Ok(())
    }
}

/// Binds a map member to query parameters, one per entry.
struct QueryMapSerializer<'a> {
    params: &'a mut Vec<(String, Option<String>)>,
}

impl MapSerializer for QueryMapSerializer<'_> {
    fn entry(&mut self, key: &str, value: ValueWriter<'_>) -> Result<(), SerdeError> {
        let mut delegate = CapturingSerializer::default();
        value(&mut delegate)?;
        let value = delegate
            .result
            .ok_or_else(|| SerdeError::expectation("query param values must be strings"))?;
        self.params
            .push((key.to_string(), Some(url_encode_component(&value))));
        Ok(())
    }
}

/// Binds members to the URI path pattern.
///
/// Non-greedy labels URL-encode slashes; greedy labels do not.
struct PathSerializer<'a> {
    pattern: &'a PathPattern,
    params: &'a mut HashMap<String, String>,
}

impl PathSerializer<'_> {
    fn insert(&mut self, schema: &SchemaRef, value: String) -> Result<(), SerdeError> {
        self.params
            .insert(schema.expect_member_name()?.to_string(), value);
        Ok(())
    }
}

impl ShapeSerializer for PathSerializer<'_> {
    fn write_boolean(&mut self, schema: &SchemaRef, value: bool) -> Result<(), SerdeError> {
        self.insert(schema, value.to_string())
    }

    fn write_long(&mut self, schema: &SchemaRef, value: i64) -> Result<(), SerdeError> {
        self.insert(schema, format_integer(value))
    }

    fn write_big_integer(&mut self, schema: &SchemaRef, value: &BigInt) -> Result<(), SerdeError> {
        self.insert(schema, value.to_string())
    }

    fn write_double(&mut self, schema: &SchemaRef, value: f64) -> Result<(), SerdeError> {
        self.insert(schema, serialize_float(value))
    }

    fn write_big_decimal(
        &mut self,
        schema: &SchemaRef,
        value: &BigDecimal,
    ) -> Result<(), SerdeError> {
        self.insert(schema, value.normalized().to_string())
    }

    fn write_string(&mut self, schema: &SchemaRef, value: &str) -> Result<(), SerdeError> {
        let name = schema.expect_member_name()?;
        let encoded = if self.pattern.is_greedy(name) {
            url_encode_path(value)
        } else {
            url_encode_component(value)
        };
        self.params.insert(name.to_string(), encoded);
        Ok(())
    }

    fn write_timestamp(&mut self, schema: &SchemaRef, value: &Timestamp) -> Result<(), SerdeError> {
        let format = timestamp_format(schema, TimestampFormat::DateTime);
        self.insert(schema, url_encode_component(&format.serialize(value)))
    }
}

/// Binds members to the endpoint host prefix.
///
/// The values are captured so they can additionally be written into the
/// payload.
struct HostLabelSerializer<'a> {
    params: &'a mut HashMap<String, String>,
    captured: &'a mut Vec<(SchemaRef, String)>,
}

impl ShapeSerializer for HostLabelSerializer<'_> {
    fn write_string(&mut self, schema: &SchemaRef, value: &str) -> Result<(), SerdeError> {
        self.params.insert(
            schema.expect_member_name()?.to_string(),
            url_encode_component(value),
        );
        self.captured.push((schema.clone(), value.to_string()));
        Ok(())
    }
}

/// Binds blob, string, and streaming members directly to the message body.
#[derive(Default)]
pub(crate) struct RawPayloadSerializer {
    /// The serialized payload. Only set after serialization.
    pub payload: Option<Body>,
}

impl ShapeSerializer for RawPayloadSerializer {
    fn write_string(&mut self, _schema: &SchemaRef, value: &str) -> Result<(), SerdeError> {
        self.payload = Some(Body::from(value.as_bytes().to_vec()));
        Ok(())
    }

    fn write_blob(&mut self, _schema: &SchemaRef, value: &Bytes) -> Result<(), SerdeError> {
        self.payload = Some(Body::Bytes(value.clone()));
        Ok(())
    }

    fn write_data_stream(&mut self, _schema: &SchemaRef, value: Body) -> Result<(), SerdeError> {
        self.payload = Some(value);
        Ok(())
    }
}
