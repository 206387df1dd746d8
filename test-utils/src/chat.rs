use std::sync::LazyLock;

use smithy_rt_core::schema::prelude::STRING;
use smithy_rt_core::schema::{
    ApiOperation, HttpLabelTrait, HttpTrait, RequiredTrait, Schema, SchemaRef, StreamingTrait,
};
use smithy_rt_core::serde::{
    DeserializeShape, SerializeShape, SerializeStruct, ShapeDeserializer, ShapeSerializer,
};
use smithy_rt_core::{SerdeError, lazy_schema, traits};

lazy_schema!(
    CHAT_MESSAGE_SCHEMA,
    Schema::structure_builder("example.chat#ChatMessage", traits![])
        .put_member("message", &STRING, traits![RequiredTrait])
        .build()
);

lazy_schema!(
    CHAT_EVENTS_SCHEMA,
    Schema::union_builder("example.chat#ChatEvents", traits![])
        .put_member("message", &CHAT_MESSAGE_SCHEMA, traits![])
        .build()
);

lazy_schema!(
    PUBLISH_MESSAGES_INPUT_SCHEMA,
    Schema::structure_builder("example.chat#PublishMessagesInput", traits![])
        .put_member("room", &STRING, traits![RequiredTrait, HttpLabelTrait])
        .put_member("events", &CHAT_EVENTS_SCHEMA, traits![StreamingTrait])
        .build()
);

lazy_schema!(
    PUBLISH_MESSAGES_OUTPUT_SCHEMA,
    Schema::structure_builder("example.chat#PublishMessagesOutput", traits![])
        .put_member("session", &STRING, traits![])
        .build()
);

pub static PUBLISH_MESSAGES_SCHEMA: LazyLock<SchemaRef> = LazyLock::new(|| {
    Schema::create_operation(
        "example.chat#PublishMessages",
        traits![HttpTrait::new("POST", "/rooms/{room}/publish", 200)],
    )
});

/// An input-streaming operation used by event stream tests.
pub fn publish_messages_operation() -> ApiOperation {
    ApiOperation::new(
        PUBLISH_MESSAGES_SCHEMA.clone(),
        PUBLISH_MESSAGES_INPUT_SCHEMA.clone(),
        PUBLISH_MESSAGES_OUTPUT_SCHEMA.clone(),
    )
}

/// An event carried on the chat stream.
#[derive(Debug, Clone, PartialEq)]
pub struct ChatMessage {
    pub message: String,
}

impl SerializeShape for ChatMessage {
    fn schema(&self) -> &SchemaRef {
        &CHAT_MESSAGE_SCHEMA
    }

    fn serialize(&self, serializer: &mut dyn ShapeSerializer) -> Result<(), SerdeError> {
        self.serialize_struct(serializer)
    }
}

impl SerializeStruct for ChatMessage {
    fn serialize_members(&self, serializer: &mut dyn ShapeSerializer) -> Result<(), SerdeError> {
        serializer.write_string(self.schema().expect_member("message"), &self.message)
    }
}

impl DeserializeShape for ChatMessage {
    fn deserialize(deserializer: &mut dyn ShapeDeserializer) -> Result<Self, SerdeError> {
        let mut message = None;
        deserializer.read_struct(&CHAT_MESSAGE_SCHEMA, &mut |member, de| {
            if member.expect_member_index()? == 0 {
                message = Some(de.read_string(member)?);
            }
            Ok(())
        })?;
        Ok(ChatMessage {
            message: message.ok_or_else(|| SerdeError::expectation("missing `message`"))?,
        })
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct PublishMessagesInput {
    pub room: String,
}

impl SerializeShape for PublishMessagesInput {
    fn schema(&self) -> &SchemaRef {
        &PUBLISH_MESSAGES_INPUT_SCHEMA
    }

    fn serialize(&self, serializer: &mut dyn ShapeSerializer) -> Result<(), SerdeError> {
        self.serialize_struct(serializer)
    }
}

impl SerializeStruct for PublishMessagesInput {
    fn serialize_members(&self, serializer: &mut dyn ShapeSerializer) -> Result<(), SerdeError> {
        serializer.write_string(self.schema().expect_member("room"), &self.room)
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct PublishMessagesOutput {
    pub session: Option<String>,
}

impl DeserializeShape for PublishMessagesOutput {
    fn deserialize(deserializer: &mut dyn ShapeDeserializer) -> Result<Self, SerdeError> {
        let mut output = PublishMessagesOutput::default();
        deserializer.read_struct(&PUBLISH_MESSAGES_OUTPUT_SCHEMA, &mut |member, de| {
            if member.expect_member_index()? == 0 {
                output.session = Some(de.read_string(member)?);
            }
            Ok(())
        })?;
        Ok(output)
    }
}
