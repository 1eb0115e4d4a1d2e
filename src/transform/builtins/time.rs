//! Time built-ins. Wall-clock rendering and parsing of zone-less input use
//! the runtime's configured timezone.

use super::{Arguments, Builtin, CallContext, Effect, FunctionError, Implementation, Parameter};
use crate::runtime::config::TimeZone;
use crate::value::Value;
use chrono::format::{Item, StrftimeItems};
use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, Utc};

pub(super) static BUILTINS: &[&Builtin] = &[
    &NOW,
    &FORMAT_TIMESTAMP,
    &PARSE_TIMESTAMP,
    &TO_UNIX_TIMESTAMP,
];

pub static NOW: Builtin = Builtin {
    name: "now",
    parameters: &[],
    variadic: false,
    fallible: false,
    effect: Effect::Pure,
    implementation: Implementation::Pure(now),
};

pub static FORMAT_TIMESTAMP: Builtin = Builtin {
    name: "format_timestamp",
    parameters: &[
        Parameter::required("value"),
        Parameter::required("format"),
        Parameter::optional("timezone"),
    ],
    variadic: false,
    fallible: true,
    effect: Effect::Pure,
    implementation: Implementation::Pure(format_timestamp),
};

pub static PARSE_TIMESTAMP: Builtin = Builtin {
    name: "parse_timestamp",
    parameters: &[Parameter::required("value"), Parameter::required("format")],
    variadic: false,
    fallible: true,
    effect: Effect::Pure,
    implementation: Implementation::Pure(parse_timestamp),
};

pub static TO_UNIX_TIMESTAMP: Builtin = Builtin {
    name: "to_unix_timestamp",
    parameters: &[Parameter::required("value"), Parameter::optional("unit")],
    variadic: false,
    fallible: true,
    effect: Effect::Pure,
    implementation: Implementation::Pure(to_unix_timestamp),
};

fn now(ctx: &CallContext<'_>, _args: &Arguments) -> Result<Value, FunctionError> {
    Ok(Value::Timestamp(ctx.timezone.now()))
}

fn timestamp_arg(args: &Arguments, index: usize) -> Result<DateTime<FixedOffset>, FunctionError> {
    match args.required(index)? {
        Value::Timestamp(ts) => Ok(*ts),
        other => Err(FunctionError::type_mismatch("timestamp", other)),
    }
}

/// Parses a strftime format, rejecting unknown specifiers up front so that
/// rendering cannot fail halfway.
fn strftime_items(format: &str) -> Result<Vec<Item<'_>>, FunctionError> {
    let items: Vec<Item<'_>> = StrftimeItems::new(format).collect();
    if items.iter().any(|item| matches!(item, Item::Error)) {
        return Err(FunctionError::InvalidArgument(format!(
            "invalid timestamp format {:?}",
            format
        )));
    }
    Ok(items)
}

fn format_timestamp(ctx: &CallContext<'_>, args: &Arguments) -> Result<Value, FunctionError> {
    let ts = timestamp_arg(args, 0)?;
    let format = args.string(1)?;
    let items = strftime_items(format)?;
    let zone = match args.optional_string(2)? {
        Some(name) => TimeZone::parse(name)
            .map_err(|e| FunctionError::InvalidArgument(e.to_string()))?,
        None => *ctx.timezone,
    };
    let local = zone.from_utc(&ts.with_timezone(&Utc));
    Ok(Value::String(
        local.format_with_items(items.into_iter()).to_string(),
    ))
}

fn parse_timestamp(ctx: &CallContext<'_>, args: &Arguments) -> Result<Value, FunctionError> {
    let value = args.string(0)?;
    let format = args.string(1)?;
    strftime_items(format)?;

    let failure = |reason: String| {
        FunctionError::ConversionFailure(format!(
            "unable to parse {:?} with format {:?}: {}",
            value, format, reason
        ))
    };

    if let Ok(ts) = DateTime::parse_from_str(value, format) {
        return Ok(Value::Timestamp(ts));
    }
    let naive = match NaiveDateTime::parse_from_str(value, format) {
        Ok(naive) => naive,
        Err(err) => match NaiveDate::parse_from_str(value, format) {
            Ok(date) => date.and_hms_opt(0, 0, 0).ok_or_else(|| failure(err.to_string()))?,
            Err(_) => return Err(failure(err.to_string())),
        },
    };
    ctx.timezone
        .from_local(&naive)
        .map(Value::Timestamp)
        .ok_or_else(|| failure("time does not exist in the configured timezone".to_string()))
}

fn to_unix_timestamp(_ctx: &CallContext<'_>, args: &Arguments) -> Result<Value, FunctionError> {
    let ts = timestamp_arg(args, 0)?;
    let value = match args.optional_string(1)?.unwrap_or("seconds") {
        "seconds" => ts.timestamp(),
        "milliseconds" => ts.timestamp_millis(),
        "nanoseconds" => ts.timestamp_nanos_opt().ok_or_else(|| {
            FunctionError::InvalidArgument("timestamp out of nanosecond range".to_string())
        })?,
        other => {
            return Err(FunctionError::InvalidArgument(format!(
                "unknown unit {:?}, expected seconds, milliseconds or nanoseconds",
                other
            )))
        }
    };
    Ok(Value::Integer(value))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transform::builtins::{call_pure as call, Argument};

    fn ts(text: &str) -> Value {
        Value::Timestamp(DateTime::parse_from_rfc3339(text).unwrap())
    }

    fn call_in(zone: &str, builtin: &Builtin, args: Vec<Value>) -> Result<Value, FunctionError> {
        let root = Value::empty_object();
        let timezone = TimeZone::parse(zone).unwrap();
        let ctx = CallContext {
            root: &root,
            timezone: &timezone,
        };
        let args = Arguments::new(args.into_iter().map(Argument::value).collect());
        match builtin.implementation {
            Implementation::Pure(f) => f(&ctx, &args),
            Implementation::MutateRoot(_) => unreachable!(),
        }
    }

    #[test]
    fn test_now_uses_configured_offset() {
        let Ok(Value::Timestamp(now)) = call_in("Asia/Shanghai", &NOW, vec![]) else {
            panic!("expected timestamp");
        };
        assert_eq!(now.offset().local_minus_utc(), 8 * 3600);
    }

    #[test]
    fn test_format_timestamp() {
        let value = ts("2021-03-04T05:06:07Z");
        assert_eq!(
            call(&FORMAT_TIMESTAMP, vec![value.clone(), Value::from("%Y-%m-%d %H:%M")]),
            Ok(Value::from("2021-03-04 05:06"))
        );
        assert_eq!(
            call_in(
                "Asia/Shanghai",
                &FORMAT_TIMESTAMP,
                vec![value.clone(), Value::from("%H:%M %z")]
            ),
            Ok(Value::from("13:06 +0800"))
        );
        assert_eq!(
            call(
                &FORMAT_TIMESTAMP,
                vec![value.clone(), Value::from("%H"), Value::from("America/New_York")]
            ),
            Ok(Value::from("00"))
        );
        assert!(matches!(
            call(&FORMAT_TIMESTAMP, vec![value, Value::from("%Q")]),
            Err(FunctionError::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_parse_timestamp() {
        let parsed = call(
            &PARSE_TIMESTAMP,
            vec![Value::from("2021-03-04 05:06:07 +0200"), Value::from("%Y-%m-%d %H:%M:%S %z")],
        )
        .unwrap();
        assert_eq!(parsed, ts("2021-03-04T05:06:07+02:00"));

        let naive = call_in(
            "Asia/Shanghai",
            &PARSE_TIMESTAMP,
            vec![Value::from("2021-03-04 05:06:07"), Value::from("%Y-%m-%d %H:%M:%S")],
        )
        .unwrap();
        assert_eq!(naive, ts("2021-03-04T05:06:07+08:00"));

        let date_only = call(
            &PARSE_TIMESTAMP,
            vec![Value::from("2021-03-04"), Value::from("%Y-%m-%d")],
        )
        .unwrap();
        assert_eq!(date_only, ts("2021-03-04T00:00:00Z"));

        assert!(matches!(
            call(&PARSE_TIMESTAMP, vec![Value::from("nope"), Value::from("%Y")]),
            Err(FunctionError::ConversionFailure(_))
        ));
    }

    #[test]
    fn test_to_unix_timestamp() {
        let value = ts("1970-01-01T00:00:01.5Z");
        assert_eq!(call(&TO_UNIX_TIMESTAMP, vec![value.clone()]), Ok(Value::Integer(1)));
        assert_eq!(
            call(&TO_UNIX_TIMESTAMP, vec![value.clone(), Value::from("milliseconds")]),
            Ok(Value::Integer(1500))
        );
        assert!(call(&TO_UNIX_TIMESTAMP, vec![value, Value::from("days")]).is_err());
    }
}
