//! Output/input object pairs for the protobuf wrapper types.
//!
//! A field typed `google.protobuf.StringValue` resolves to the nullable
//! `Object_wrapperspb_StringValue` object whose single `value` field carries
//! the unwrapped primitive. Generated resolvers hand the primitive to the
//! engine as the source value; the `value` resolver downcasts it back.

use async_graphql::dynamic::{Field, FieldFuture, FieldValue, InputObject, InputValue, Object, TypeRef};
use async_graphql::Value;

use crate::error::EdgeError;
use crate::scalars::encode_bytes;

macro_rules! wrapper_pair {
    ($object_fn:ident, $input_fn:ident, $name:literal, $rust:ty, $type_ref:expr, $to_value:expr) => {
        #[doc = concat!("The `Object_wrapperspb_", $name, "` output object.")]
        pub fn $object_fn() -> Object {
            let convert: fn(&$rust) -> Value = $to_value;
            Object::new(concat!("Object_wrapperspb_", $name))
                .description(concat!(
                    $name,
                    " returns `null` or an object with a `value` field"
                ))
                .field(Field::new(
                    "value",
                    TypeRef::named($type_ref),
                    move |ctx| {
                        FieldFuture::new(async move {
                            let value = ctx
                                .parent_value
                                .try_downcast_ref::<$rust>()
                                .map_err(|_| EdgeError::BadValue)?;
                            Ok(Some(FieldValue::value(convert(value))))
                        })
                    },
                ))
        }

        #[doc = concat!("The `Input_wrapperspb_", $name, "Input` input object.")]
        pub fn $input_fn() -> InputObject {
            InputObject::new(concat!("Input_wrapperspb_", $name, "Input"))
                .description(concat!(
                    $name,
                    "Input accepts `null` or an object with a `value` field"
                ))
                .field(InputValue::new("value", TypeRef::named($type_ref)))
        }
    };
}

wrapper_pair!(object_bool_value, input_bool_value, "BoolValue", bool, TypeRef::BOOLEAN, |v| {
    Value::from(*v)
});
wrapper_pair!(object_string_value, input_string_value, "StringValue", String, TypeRef::STRING, |v| {
    Value::from(v.clone())
});
wrapper_pair!(object_bytes_value, input_bytes_value, "BytesValue", Vec<u8>, TypeRef::STRING, |v| {
    Value::from(encode_bytes(v))
});
wrapper_pair!(object_int32_value, input_int32_value, "Int32Value", i32, TypeRef::INT, |v| {
    Value::from(*v)
});
wrapper_pair!(object_uint32_value, input_uint32_value, "UInt32Value", u32, TypeRef::INT, |v| {
    Value::from(*v)
});
wrapper_pair!(object_int64_value, input_int64_value, "Int64Value", i64, TypeRef::INT, |v| {
    Value::from(*v)
});
wrapper_pair!(object_uint64_value, input_uint64_value, "UInt64Value", u64, TypeRef::INT, |v| {
    Value::from(*v)
});
wrapper_pair!(object_float_value, input_float_value, "FloatValue", f32, TypeRef::FLOAT, |v| {
    Value::from(*v)
});
wrapper_pair!(object_double_value, input_double_value, "DoubleValue", f64, TypeRef::FLOAT, |v| {
    Value::from(*v)
});
wrapper_pair!(object_sint32_value, input_sint32_value, "SInt32Value", i32, TypeRef::INT, |v| {
    Value::from(*v)
});
wrapper_pair!(object_sint64_value, input_sint64_value, "SInt64Value", i64, TypeRef::INT, |v| {
    Value::from(*v)
});
wrapper_pair!(object_fixed32_value, input_fixed32_value, "Fixed32Value", u32, TypeRef::INT, |v| {
    Value::from(*v)
});
wrapper_pair!(object_fixed64_value, input_fixed64_value, "Fixed64Value", u64, TypeRef::INT, |v| {
    Value::from(*v)
});
wrapper_pair!(object_sfixed32_value, input_sfixed32_value, "SFixed32Value", i32, TypeRef::INT, |v| {
    Value::from(*v)
});
wrapper_pair!(object_sfixed64_value, input_sfixed64_value, "SFixed64Value", i64, TypeRef::INT, |v| {
    Value::from(*v)
});

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wrapper_names() {
        assert_eq!(object_string_value().type_name(), "Object_wrapperspb_StringValue");
        assert_eq!(
            input_string_value().type_name(),
            "Input_wrapperspb_StringValueInput"
        );
        assert_eq!(object_uint64_value().type_name(), "Object_wrapperspb_UInt64Value");
    }
}
