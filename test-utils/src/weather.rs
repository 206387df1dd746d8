use std::fmt::{self, Display, Formatter};
use std::sync::LazyLock;
use std::time::Duration;

use smithy_rt_core::schema::prelude::{DOUBLE, INTEGER, STRING};
use smithy_rt_core::schema::{
    ApiOperation, ErrorFaultValue, ErrorRegistry, ErrorTrait, HttpErrorTrait, HttpHeaderTrait,
    HttpLabelTrait, HttpPrefixHeadersTrait, HttpQueryTrait, HttpResponseCodeTrait, HttpTrait,
    RequiredTrait, Schema, SchemaRef, ShapeId,
};
use smithy_rt_core::serde::{
    DeserializeShape, SerializeShape, SerializeStruct, ShapeDeserializer, ShapeSerializer,
};
use smithy_rt_core::{ErrorFault, FxIndexMap, SerdeError, ServiceError, lazy_schema, traits};

lazy_schema!(
    TAG_LIST_SCHEMA,
    Schema::list_builder("example.weather#TagList", traits![])
        .put_member("member", &STRING, traits![])
        .build()
);

lazy_schema!(
    METADATA_MAP_SCHEMA,
    Schema::map_builder("example.weather#MetadataMap", traits![])
        .put_member("key", &STRING, traits![])
        .put_member("value", &STRING, traits![])
        .build()
);

lazy_schema!(
    GET_FORECAST_INPUT_SCHEMA,
    Schema::structure_builder("example.weather#GetForecastInput", traits![])
        .put_member("city", &STRING, traits![RequiredTrait, HttpLabelTrait])
        .put_member("unit", &STRING, traits![HttpQueryTrait::new("unit")])
        .put_member(
            "request_id",
            &STRING,
            traits![HttpHeaderTrait::new("x-request-id")]
        )
        .put_member(
            "tags",
            &TAG_LIST_SCHEMA,
            traits![HttpHeaderTrait::new("x-tags")]
        )
        .put_member(
            "metadata",
            &METADATA_MAP_SCHEMA,
            traits![HttpPrefixHeadersTrait::new("x-meta-")]
        )
        .put_member("notes", &STRING, traits![])
        .build()
);

lazy_schema!(
    GET_FORECAST_OUTPUT_SCHEMA,
    Schema::structure_builder("example.weather#GetForecastOutput", traits![])
        .put_member(
            "status",
            &INTEGER,
            traits![HttpResponseCodeTrait]
        )
        .put_member(
            "server",
            &STRING,
            traits![HttpHeaderTrait::new("x-server")]
        )
        .put_member("city", &STRING, traits![])
        .put_member("chance_of_rain", &DOUBLE, traits![])
        .build()
);

lazy_schema!(
    INVALID_CITY_ERROR_SCHEMA,
    Schema::structure_builder(
        "example.weather#InvalidCityError",
        traits![
            ErrorTrait::new(ErrorFaultValue::Client),
            HttpErrorTrait::new(404)
        ]
    )
    .put_member("message", &STRING, traits![])
    .build()
);

lazy_schema!(
    THROTTLING_ERROR_SCHEMA,
    Schema::structure_builder(
        "example.weather#ThrottlingError",
        traits![
            ErrorTrait::new(ErrorFaultValue::Server),
            HttpErrorTrait::new(429)
        ]
    )
    .put_member("message", &STRING, traits![])
    .build()
);

pub static GET_FORECAST_SCHEMA: LazyLock<SchemaRef> = LazyLock::new(|| {
    Schema::create_operation(
        "example.weather#GetForecast",
        traits![HttpTrait::new("GET", "/forecast/{city}?type=daily", 200)],
    )
});

/// The `GetForecast` operation with its error registry.
pub fn get_forecast_operation() -> ApiOperation {
    ApiOperation::new(
        GET_FORECAST_SCHEMA.clone(),
        GET_FORECAST_INPUT_SCHEMA.clone(),
        GET_FORECAST_OUTPUT_SCHEMA.clone(),
    )
    .with_error_registry(
        ErrorRegistry::new()
            .with_error(
                "example.weather#InvalidCityError",
                InvalidCityError::deserialize_boxed,
            )
            .with_error(
                "example.weather#ThrottlingError",
                ThrottlingError::deserialize_boxed,
            ),
    )
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct GetForecastInput {
    pub city: String,
    pub unit: Option<String>,
    pub request_id: Option<String>,
    pub tags: Vec<String>,
    pub metadata: FxIndexMap<String, String>,
    pub notes: Option<String>,
}

impl SerializeShape for GetForecastInput {
    fn schema(&self) -> &SchemaRef {
        &GET_FORECAST_INPUT_SCHEMA
    }

    fn serialize(&self, serializer: &mut dyn ShapeSerializer) -> Result<(), SerdeError> {
        self.serialize_struct(serializer)
    }
}

impl SerializeStruct for GetForecastInput {
    fn serialize_members(&self, serializer: &mut dyn ShapeSerializer) -> Result<(), SerdeError> {
        let schema = self.schema();
        serializer.write_string(schema.expect_member("city"), &self.city)?;
        if let Some(unit) = &self.unit {
            serializer.write_string(schema.expect_member("unit"), unit)?;
        }
        if let Some(request_id) = &self.request_id {
            serializer.write_string(schema.expect_member("request_id"), request_id)?;
        }
        if !self.tags.is_empty() {
            let member = schema.expect_member("tags");
            let element = member.expect_member_target()?.expect_member("member").clone();
            serializer.write_list(member, self.tags.len(), &mut |elements| {
                for tag in &self.tags {
                    elements.write_string(&element, tag)?;
                }
                Ok(())
            })?;
        }
        if !self.metadata.is_empty() {
            let member = schema.expect_member("metadata");
            let value_member = member.expect_member_target()?.expect_member("value").clone();
            serializer.write_map(member, self.metadata.len(), &mut |entries| {
                for (key, value) in &self.metadata {
                    entries.entry(key, &mut |value_serializer| {
                        value_serializer.write_string(&value_member, value)
                    })?;
                }
                Ok(())
            })?;
        }
        if let Some(notes) = &self.notes {
            serializer.write_string(schema.expect_member("notes"), notes)?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct GetForecastOutput {
    pub status: i32,
    pub server: Option<String>,
    pub city: String,
    pub chance_of_rain: f64,
}

impl DeserializeShape for GetForecastOutput {
    fn deserialize(deserializer: &mut dyn ShapeDeserializer) -> Result<Self, SerdeError> {
        let mut output = GetForecastOutput::default();
        deserializer.read_struct(&GET_FORECAST_OUTPUT_SCHEMA, &mut |member, de| {
            match member.expect_member_index()? {
                0 => output.status = de.read_integer(member)?,
                1 => output.server = Some(de.read_string(member)?),
                2 => output.city = de.read_string(member)?,
                3 => output.chance_of_rain = de.read_double(member)?,
                _ => {}
            }
            Ok(())
        })?;
        Ok(output)
    }
}

/// Modeled error returned for unknown cities.
#[derive(Debug, Clone, Default)]
pub struct InvalidCityError {
    pub message: String,
}

impl InvalidCityError {
    /// Registry hook producing a boxed service error.
    pub fn deserialize_boxed(
        deserializer: &mut dyn ShapeDeserializer,
    ) -> Result<Box<dyn ServiceError>, SerdeError> {
        Ok(Box::new(InvalidCityError::deserialize(deserializer)?))
    }
}

impl DeserializeShape for InvalidCityError {
    fn deserialize(deserializer: &mut dyn ShapeDeserializer) -> Result<Self, SerdeError> {
        let mut error = InvalidCityError::default();
        deserializer.read_struct(&INVALID_CITY_ERROR_SCHEMA, &mut |member, de| {
            if member.expect_member_index()? == 0 {
                error.message = de.read_string(member)?;
            }
            Ok(())
        })?;
        Ok(error)
    }
}

impl Display for InvalidCityError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "InvalidCityError: {}", self.message)
    }
}

impl std::error::Error for InvalidCityError {}

impl ServiceError for InvalidCityError {
    fn shape_id(&self) -> &ShapeId {
        INVALID_CITY_ERROR_SCHEMA.id()
    }

    fn fault(&self) -> ErrorFault {
        ErrorFault::Client
    }
}

/// Modeled retryable error with a retry-after hint.
#[derive(Debug, Clone, Default)]
pub struct ThrottlingError {
    pub message: String,
    pub retry_after: Option<Duration>,
}

impl ThrottlingError {
    pub fn deserialize_boxed(
        deserializer: &mut dyn ShapeDeserializer,
    ) -> Result<Box<dyn ServiceError>, SerdeError> {
        Ok(Box::new(ThrottlingError::deserialize(deserializer)?))
    }
}

impl DeserializeShape for ThrottlingError {
    fn deserialize(deserializer: &mut dyn ShapeDeserializer) -> Result<Self, SerdeError> {
        let mut error = ThrottlingError::default();
        deserializer.read_struct(&THROTTLING_ERROR_SCHEMA, &mut |member, de| {
            if member.expect_member_index()? == 0 {
                error.message = de.read_string(member)?;
            }
            Ok(())
        })?;
        Ok(error)
    }
}

impl Display for ThrottlingError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "ThrottlingError: {}", self.message)
    }
}

impl std::error::Error for ThrottlingError {}

impl ServiceError for ThrottlingError {
    fn shape_id(&self) -> &ShapeId {
        THROTTLING_ERROR_SCHEMA.id()
    }

    fn fault(&self) -> ErrorFault {
        ErrorFault::Server
    }

    fn is_retry_safe(&self) -> bool {
        true
    }

    fn retry_after(&self) -> Option<Duration> {
        self.retry_after
    }
}

/// A pre-built input for tests that don't care about the contents.
pub fn any_forecast_input() -> GetForecastInput {
    GetForecastInput {
        city: "anvik".to_string(),
        unit: Some("celsius".to_string()),
        ..Default::default()
    }
}
