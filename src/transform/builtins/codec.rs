//! Encoding, hashing and identifier built-ins.

use super::{Arguments, Builtin, CallContext, Effect, FunctionError, Implementation, Parameter};
use crate::value::Value;
use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use bytes::Bytes;
use sha2::{Digest, Sha224, Sha256, Sha384, Sha512};
use uuid::Uuid;

pub(super) static BUILTINS: &[&Builtin] = &[&ENCODE_BASE64, &DECODE_BASE64, &SHA2, &UUID_V4];

pub static ENCODE_BASE64: Builtin = Builtin {
    name: "encode_base64",
    parameters: &[Parameter::required("value")],
    variadic: false,
    fallible: true,
    effect: Effect::Pure,
    implementation: Implementation::Pure(encode_base64),
};

/// Decodes to a string when the payload is UTF-8, otherwise to bytes.
pub static DECODE_BASE64: Builtin = Builtin {
    name: "decode_base64",
    parameters: &[Parameter::required("value")],
    variadic: false,
    fallible: true,
    effect: Effect::Pure,
    implementation: Implementation::Pure(decode_base64),
};

pub static SHA2: Builtin = Builtin {
    name: "sha2",
    parameters: &[Parameter::required("value"), Parameter::optional("variant")],
    variadic: false,
    fallible: true,
    effect: Effect::Pure,
    implementation: Implementation::Pure(sha2),
};

pub static UUID_V4: Builtin = Builtin {
    name: "uuid_v4",
    parameters: &[],
    variadic: false,
    fallible: false,
    effect: Effect::Pure,
    implementation: Implementation::Pure(uuid_v4),
};

fn bytes_arg(args: &Arguments, index: usize) -> Result<&[u8], FunctionError> {
    match args.required(index)? {
        Value::String(s) => Ok(s.as_bytes()),
        Value::Bytes(b) => Ok(b.as_ref()),
        other => Err(FunctionError::type_mismatch("string or bytes", other)),
    }
}

fn encode_base64(_ctx: &CallContext<'_>, args: &Arguments) -> Result<Value, FunctionError> {
    Ok(Value::String(STANDARD.encode(bytes_arg(args, 0)?)))
}

fn decode_base64(_ctx: &CallContext<'_>, args: &Arguments) -> Result<Value, FunctionError> {
    let decoded = STANDARD
        .decode(bytes_arg(args, 0)?)
        .map_err(|e| FunctionError::ConversionFailure(format!("unable to decode base64: {}", e)))?;
    Ok(match String::from_utf8(decoded) {
        Ok(text) => Value::String(text),
        Err(err) => Value::Bytes(Bytes::from(err.into_bytes())),
    })
}

fn sha2(_ctx: &CallContext<'_>, args: &Arguments) -> Result<Value, FunctionError> {
    let input = bytes_arg(args, 0)?;
    let digest = match args.optional_string(1)?.unwrap_or("SHA-256") {
        "SHA-224" => hex::encode(Sha224::digest(input)),
        "SHA-256" => hex::encode(Sha256::digest(input)),
        "SHA-384" => hex::encode(Sha384::digest(input)),
        "SHA-512" => hex::encode(Sha512::digest(input)),
        other => {
            return Err(FunctionError::InvalidArgument(format!(
                "unknown sha2 variant {:?}",
                other
            )))
        }
    };
    Ok(Value::String(digest))
}

fn uuid_v4(_ctx: &CallContext<'_>, _args: &Arguments) -> Result<Value, FunctionError> {
    Ok(Value::String(Uuid::new_v4().to_string()))
}
