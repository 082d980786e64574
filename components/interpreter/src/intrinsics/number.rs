//! `Number` and `Boolean` constructors and prototypes

use crate::completion::Throw;
use crate::context::ExecutionContext;
use crate::conversion::{number_to_string, string_to_number, to_boolean};
use crate::object::{Object, ObjectKind, ObjectRef};
use crate::realm::Realm;
use crate::value::Value;

use super::{argument, define_constructor, define_method};

pub(crate) fn install(realm: &Realm) {
    install_number(realm);
    install_boolean(realm);

    define_method(realm, &realm.global, "isNaN", 1, |cx, _this, args| {
        Ok(Value::Boolean(cx.to_number(&argument(args, 0))?.is_nan()))
    });
    define_method(realm, &realm.global, "parseFloat", 1, |cx, _this, args| {
        let text = cx.to_string(&argument(args, 0))?;
        Ok(Value::Number(parse_float_prefix(text.trim_start())))
    });
}

fn install_number(realm: &Realm) {
    let prototype = &realm.number_prototype;
    let constructor = define_constructor(
        realm,
        "Number",
        1,
        prototype,
        |cx, _this, args| number_argument(cx, args).map(Value::Number),
        |cx, args, new_target| {
            let n = number_argument(cx, args)?;
            let fallback = cx.realm().number_prototype.clone();
            let prototype = cx.prototype_from_constructor(new_target, fallback)?;
            Ok(Value::Object(ObjectRef::new(Object::new(
                ObjectKind::Primitive(Value::Number(n)),
                Some(prototype),
            ))))
        },
    );

    for (name, value) in [
        ("MAX_SAFE_INTEGER", 9007199254740991.0),
        ("MIN_SAFE_INTEGER", -9007199254740991.0),
        ("EPSILON", f64::EPSILON),
        ("MAX_VALUE", f64::MAX),
        ("MIN_VALUE", 5e-324),
        ("POSITIVE_INFINITY", f64::INFINITY),
        ("NEGATIVE_INFINITY", f64::NEG_INFINITY),
        ("NaN", f64::NAN),
    ] {
        constructor.insert(name, Value::Number(value), crate::object::Attributes::FROZEN);
    }

    define_method(realm, &constructor, "isInteger", 1, |_cx, _this, args| {
        Ok(Value::Boolean(matches!(
            argument(args, 0),
            Value::Number(n) if n.is_finite() && n.trunc() == n
        )))
    });
    define_method(realm, &constructor, "isNaN", 1, |_cx, _this, args| {
        Ok(Value::Boolean(matches!(argument(args, 0), Value::Number(n) if n.is_nan())))
    });

    define_method(realm, prototype, "toString", 1, |cx, this, args| {
        let n = this_number_value(cx, this, "Number.prototype.toString")?;
        let radix = match argument(args, 0) {
            Value::Undefined => 10.0,
            radix => cx.to_number(&radix)?.trunc(),
        };
        if !(2.0..=36.0).contains(&radix) {
            return Err(cx.range_error("toString() radix must be between 2 and 36"));
        }
        if radix == 10.0 {
            return Ok(Value::from(number_to_string(n)));
        }
        Ok(Value::from(number_to_radix_string(n, radix as u32)))
    });

    define_method(realm, prototype, "valueOf", 0, |cx, this, _args| {
        this_number_value(cx, this, "Number.prototype.valueOf").map(Value::Number)
    });

    define_method(realm, prototype, "toFixed", 1, |cx, this, args| {
        let n = this_number_value(cx, this, "Number.prototype.toFixed")?;
        let digits = cx.to_number(&argument(args, 0))?;
        let digits = if digits.is_nan() { 0.0 } else { digits.trunc() };
        if !(0.0..=100.0).contains(&digits) {
            return Err(cx.range_error("toFixed() digits argument must be between 0 and 100"));
        }
        if !n.is_finite() || n.abs() >= 1e21 {
            return Ok(Value::from(number_to_string(n)));
        }
        Ok(Value::from(format!("{:.*}", digits as usize, n)))
    });
}

fn install_boolean(realm: &Realm) {
    let prototype = &realm.boolean_prototype;
    define_constructor(
        realm,
        "Boolean",
        1,
        prototype,
        |_cx, _this, args| Ok(Value::Boolean(to_boolean(&argument(args, 0)))),
        |cx, args, new_target| {
            let b = to_boolean(&argument(args, 0));
            let fallback = cx.realm().boolean_prototype.clone();
            let prototype = cx.prototype_from_constructor(new_target, fallback)?;
            Ok(Value::Object(ObjectRef::new(Object::new(
                ObjectKind::Primitive(Value::Boolean(b)),
                Some(prototype),
            ))))
        },
    );

    define_method(realm, prototype, "toString", 0, |cx, this, _args| {
        let b = this_boolean_value(cx, this)?;
        Ok(Value::from(if b { "true" } else { "false" }))
    });
    define_method(realm, prototype, "valueOf", 0, |cx, this, _args| {
        this_boolean_value(cx, this).map(Value::Boolean)
    });
}

fn number_argument(cx: &mut ExecutionContext, args: &[Value]) -> Result<f64, Throw> {
    match args.first() {
        None => Ok(0.0),
        Some(value) => cx.to_number(value),
    }
}

fn this_number_value(cx: &mut ExecutionContext, this: &Value, method: &str) -> Result<f64, Throw> {
    let n = match this {
        Value::Number(n) => Some(*n),
        Value::Object(object) => match object.borrow().kind {
            ObjectKind::Primitive(Value::Number(n)) => Some(n),
            _ => None,
        },
        _ => None,
    };
    n.ok_or_else(|| cx.type_error(format!("{} requires that 'this' be a Number", method)))
}

fn this_boolean_value(cx: &mut ExecutionContext, this: &Value) -> Result<bool, Throw> {
    let b = match this {
        Value::Boolean(b) => Some(*b),
        Value::Object(object) => match object.borrow().kind {
            ObjectKind::Primitive(Value::Boolean(b)) => Some(b),
            _ => None,
        },
        _ => None,
    };
    b.ok_or_else(|| cx.type_error("Boolean.prototype.valueOf requires that 'this' be a Boolean"))
}

/// Non-decimal rendering of `n`; the fraction is cut after 52 digits
fn number_to_radix_string(n: f64, radix: u32) -> String {
    if n.is_nan() {
        return "NaN".to_string();
    }
    if n.is_infinite() {
        return if n > 0.0 { "Infinity" } else { "-Infinity" }.to_string();
    }
    let negative = n < 0.0;
    let n = n.abs();
    let mut integer = n.trunc();
    let mut fraction = n - integer;

    let mut digits = Vec::new();
    loop {
        let digit = (integer % radix as f64) as u32;
        digits.push(std::char::from_digit(digit, radix).unwrap_or('0'));
        integer = (integer / radix as f64).trunc();
        if integer < 1.0 {
            break;
        }
    }
    let mut out = String::new();
    if negative {
        out.push('-');
    }
    out.extend(digits.iter().rev());

    if fraction > 0.0 {
        out.push('.');
        for _ in 0..52 {
            fraction *= radix as f64;
            let digit = fraction.trunc() as u32;
            out.push(std::char::from_digit(digit, radix).unwrap_or('0'));
            fraction -= digit as f64;
            if fraction <= 0.0 {
                break;
            }
        }
    }
    out
}

/// Longest prefix of `text` that reads as a decimal literal
fn parse_float_prefix(text: &str) -> f64 {
    for prefix in ["Infinity", "+Infinity"] {
        if text.starts_with(prefix) {
            return f64::INFINITY;
        }
    }
    if text.starts_with("-Infinity") {
        return f64::NEG_INFINITY;
    }
    let bytes = text.as_bytes();
    let mut end = 0;
    if matches!(bytes.first(), Some(b'+' | b'-')) {
        end = 1;
    }
    let digits_start = end;
    while end < bytes.len() && bytes[end].is_ascii_digit() {
        end += 1;
    }
    if end < bytes.len() && bytes[end] == b'.' {
        end += 1;
        while end < bytes.len() && bytes[end].is_ascii_digit() {
            end += 1;
        }
    }
    if end == digits_start || &text[digits_start..end] == "." {
        return f64::NAN;
    }
    let mantissa_end = end;
    if end < bytes.len() && matches!(bytes[end], b'e' | b'E') {
        let mut exponent = end + 1;
        if matches!(bytes.get(exponent), Some(b'+' | b'-')) {
            exponent += 1;
        }
        let exponent_digits = exponent;
        while exponent < bytes.len() && bytes[exponent].is_ascii_digit() {
            exponent += 1;
        }
        if exponent > exponent_digits {
            end = exponent;
        }
    }
    let candidate = if end > mantissa_end { &text[..end] } else { &text[..mantissa_end] };
    string_to_number(candidate)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_radix_rendering() {
        assert_eq!(number_to_radix_string(255.0, 16), "ff");
        assert_eq!(number_to_radix_string(-5.0, 2), "-101");
        assert_eq!(number_to_radix_string(0.5, 2), "0.1");
        assert_eq!(number_to_radix_string(0.0, 36), "0");
    }

    #[test]
    fn test_parse_float_prefix() {
        assert_eq!(parse_float_prefix("3.25abc"), 3.25);
        assert_eq!(parse_float_prefix("-1e3x"), -1000.0);
        assert_eq!(parse_float_prefix("1e"), 1.0);
        assert!(parse_float_prefix("abc").is_nan());
        assert_eq!(parse_float_prefix("Infinity!"), f64::INFINITY);
    }
}
