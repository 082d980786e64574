//! Type conversions and the equality and comparison algorithms
//!
//! Pure conversions on primitives are free functions. Conversions that may
//! run script code (an object's `valueOf` or `toString`) are methods on
//! [`ExecutionContext`].

use std::cmp::Ordering;
use std::rc::Rc;

use crate::completion::Throw;
use crate::context::ExecutionContext;
use crate::object::{Object, ObjectKind, ObjectRef};
use crate::value::{PropertyKey, Value};

/// Preferred primitive type for ToPrimitive
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Hint {
    /// No preference (`+`, `==`); behaves like Number
    Default,
    /// Prefer numbers
    Number,
    /// Prefer strings
    String,
}

/// ToBoolean
pub fn to_boolean(value: &Value) -> bool {
    match value {
        Value::Undefined | Value::Null => false,
        Value::Boolean(b) => *b,
        Value::Number(n) => *n != 0.0 && !n.is_nan(),
        Value::String(s) => !s.is_empty(),
        Value::Symbol(_) | Value::Object(_) => true,
    }
}

/// StringToNumber: whitespace-trimmed decimal, `0x`/`0o`/`0b` integers,
/// `Infinity`; anything else is NaN and the empty string is zero
pub fn string_to_number(s: &str) -> f64 {
    let trimmed = s.trim_matches(is_js_whitespace);
    if trimmed.is_empty() {
        return 0.0;
    }
    let radix = match trimmed.get(..2) {
        Some("0x") | Some("0X") => Some(16),
        Some("0o") | Some("0O") => Some(8),
        Some("0b") | Some("0B") => Some(2),
        _ => None,
    };
    if let Some(radix) = radix {
        let digits = &trimmed[2..];
        if digits.is_empty() {
            return f64::NAN;
        }
        return digits.chars().try_fold(0.0f64, |acc, c| {
            c.to_digit(radix).map(|d| acc * radix as f64 + d as f64)
        })
        .unwrap_or(f64::NAN);
    }
    let unsigned = trimmed.trim_start_matches(['+', '-']);
    if unsigned == "Infinity" && trimmed.len() - unsigned.len() <= 1 {
        return if trimmed.starts_with('-') {
            f64::NEG_INFINITY
        } else {
            f64::INFINITY
        };
    }
    let valid = trimmed
        .chars()
        .all(|c| c.is_ascii_digit() || matches!(c, '.' | 'e' | 'E' | '+' | '-'));
    if !valid {
        return f64::NAN;
    }
    trimmed.parse::<f64>().unwrap_or(f64::NAN)
}

fn is_js_whitespace(c: char) -> bool {
    c.is_whitespace() || c == '\u{feff}'
}

/// Number::toString(10): shortest round-trip digits laid out per the
/// ECMAScript rules (plain notation for exponents in `-7..21`, otherwise
/// `d.ddde±n`)
pub fn number_to_string(n: f64) -> String {
    if n.is_nan() {
        return "NaN".to_string();
    }
    if n == 0.0 {
        return "0".to_string();
    }
    if n.is_infinite() {
        return if n > 0.0 { "Infinity" } else { "-Infinity" }.to_string();
    }
    if n < 0.0 {
        return format!("-{}", number_to_string(-n));
    }
    if n.fract() == 0.0 && n < 1e15 {
        return format!("{}", n as u64);
    }

    let mut buffer = ryu::Buffer::new();
    let formatted = buffer.format_finite(n);
    let (mantissa, exponent) = match formatted.split_once('e') {
        Some((m, e)) => (m, e.parse::<i32>().unwrap_or(0)),
        None => (formatted, 0),
    };
    let point = mantissa.find('.').unwrap_or(mantissa.len()) as i32;
    let mut digits: String = mantissa.chars().filter(|c| *c != '.').collect();
    // n is the position of the decimal point relative to the digit string
    let mut n = point + exponent;
    while digits.starts_with('0') && digits.len() > 1 {
        digits.remove(0);
        n -= 1;
    }
    while digits.ends_with('0') && digits.len() > 1 {
        digits.pop();
    }
    let k = digits.len() as i32;

    if k <= n && n <= 21 {
        format!("{}{}", digits, "0".repeat((n - k) as usize))
    } else if 0 < n && n <= 21 {
        format!("{}.{}", &digits[..n as usize], &digits[n as usize..])
    } else if -6 < n && n <= 0 {
        format!("0.{}{}", "0".repeat((-n) as usize), digits)
    } else {
        let sign = if n - 1 < 0 { '-' } else { '+' };
        let exponent = (n - 1).abs();
        if k == 1 {
            format!("{}e{}{}", digits, sign, exponent)
        } else {
            format!("{}.{}e{}{}", &digits[..1], &digits[1..], sign, exponent)
        }
    }
}

/// ToInt32
pub fn to_int32(n: f64) -> i32 {
    to_uint32(n) as i32
}

/// ToUint32
pub fn to_uint32(n: f64) -> u32 {
    if !n.is_finite() || n == 0.0 {
        return 0;
    }
    let modulo = n.trunc().rem_euclid(4294967296.0);
    modulo as u32
}

/// ToNumber for primitives; objects must go through
/// [`ExecutionContext::to_number`]
pub fn primitive_to_number(value: &Value) -> f64 {
    match value {
        Value::Undefined => f64::NAN,
        Value::Null => 0.0,
        Value::Boolean(b) => *b as u8 as f64,
        Value::Number(n) => *n,
        Value::String(s) => string_to_number(s),
        Value::Symbol(_) | Value::Object(_) => f64::NAN,
    }
}

/// Compare strings by UTF-16 code units
fn compare_strings(a: &str, b: &str) -> Ordering {
    a.encode_utf16().cmp(b.encode_utf16())
}

impl ExecutionContext {
    /// ToPrimitive: objects are converted through `valueOf`/`toString`
    pub fn to_primitive(&mut self, value: &Value, hint: Hint) -> Result<Value, Throw> {
        let Value::Object(object) = value else {
            return Ok(value.clone());
        };
        let order = match hint {
            Hint::String => ["toString", "valueOf"],
            Hint::Default | Hint::Number => ["valueOf", "toString"],
        };
        for name in order {
            let method = self.get(object, &PropertyKey::from(name))?;
            if method.is_callable() {
                let result = self.call(&method, value.clone(), &[])?;
                if !matches!(result, Value::Object(_)) {
                    return Ok(result);
                }
            }
        }
        Err(self.type_error("Cannot convert object to primitive value"))
    }

    /// ToNumber
    pub fn to_number(&mut self, value: &Value) -> Result<f64, Throw> {
        match value {
            Value::Symbol(_) => Err(self.type_error("Cannot convert a Symbol value to a number")),
            Value::Object(_) => {
                let primitive = self.to_primitive(value, Hint::Number)?;
                self.to_number(&primitive)
            }
            primitive => Ok(primitive_to_number(primitive)),
        }
    }

    /// ToString
    pub fn to_string(&mut self, value: &Value) -> Result<Rc<str>, Throw> {
        match value {
            Value::String(s) => Ok(s.clone()),
            Value::Symbol(_) => Err(self.type_error("Cannot convert a Symbol value to a string")),
            Value::Object(_) => {
                let primitive = self.to_primitive(value, Hint::String)?;
                self.to_string(&primitive)
            }
            primitive => Ok(primitive.to_string().into()),
        }
    }

    /// ToPropertyKey
    pub fn to_property_key(&mut self, value: &Value) -> Result<PropertyKey, Throw> {
        match value {
            Value::String(s) => Ok(PropertyKey::String(s.clone())),
            Value::Symbol(symbol) => Ok(PropertyKey::Symbol(symbol.clone())),
            Value::Number(n) if n.fract() == 0.0 && *n >= 0.0 && *n < u32::MAX as f64 => {
                Ok(PropertyKey::from(*n as u32))
            }
            Value::Object(_) => {
                let primitive = self.to_primitive(value, Hint::String)?;
                self.to_property_key(&primitive)
            }
            primitive => Ok(PropertyKey::from(primitive.to_string())),
        }
    }

    /// ToObject: wraps primitives, rejects `undefined` and `null`
    pub fn to_object(&mut self, value: &Value) -> Result<ObjectRef, Throw> {
        let prototype = match value {
            Value::Object(object) => return Ok(object.clone()),
            Value::Undefined | Value::Null => {
                return Err(self.type_error("Cannot convert undefined or null to object"))
            }
            Value::Boolean(_) => self.realm().boolean_prototype.clone(),
            Value::Number(_) => self.realm().number_prototype.clone(),
            Value::String(_) => self.realm().string_prototype.clone(),
            Value::Symbol(_) => self.realm().symbol_prototype.clone(),
        };
        Ok(ObjectRef::new(Object::new(
            ObjectKind::Primitive(value.clone()),
            Some(prototype),
        )))
    }

    /// Loose equality (`==`)
    pub fn loose_equals(&mut self, a: &Value, b: &Value) -> Result<bool, Throw> {
        Ok(match (a, b) {
            (Value::Undefined | Value::Null, Value::Undefined | Value::Null) => true,
            (Value::Undefined | Value::Null, _) | (_, Value::Undefined | Value::Null) => false,
            (Value::Number(x), Value::String(s)) | (Value::String(s), Value::Number(x)) => {
                *x == string_to_number(s)
            }
            (Value::Boolean(x), other) | (other, Value::Boolean(x)) => {
                let n = Value::Number(*x as u8 as f64);
                return self.loose_equals(&n, other);
            }
            (Value::Object(_), Value::Object(_)) => a.strict_equals(b),
            (Value::Object(_), _) => {
                let primitive = self.to_primitive(a, Hint::Default)?;
                return self.loose_equals(&primitive, b);
            }
            (_, Value::Object(_)) => {
                let primitive = self.to_primitive(b, Hint::Default)?;
                return self.loose_equals(a, &primitive);
            }
            _ => a.strict_equals(b),
        })
    }

    /// Abstract relational comparison `a < b`; `None` when either side is
    /// NaN
    pub fn less_than(&mut self, a: &Value, b: &Value, left_first: bool) -> Result<Option<bool>, Throw> {
        let (pa, pb) = if left_first {
            let pa = self.to_primitive(a, Hint::Number)?;
            let pb = self.to_primitive(b, Hint::Number)?;
            (pa, pb)
        } else {
            let pb = self.to_primitive(b, Hint::Number)?;
            let pa = self.to_primitive(a, Hint::Number)?;
            (pa, pb)
        };
        if let (Value::String(x), Value::String(y)) = (&pa, &pb) {
            return Ok(Some(compare_strings(x, y) == Ordering::Less));
        }
        let x = self.to_number(&pa)?;
        let y = self.to_number(&pb)?;
        if x.is_nan() || y.is_nan() {
            return Ok(None);
        }
        Ok(Some(x < y))
    }

    /// The `+` operator
    pub fn add(&mut self, a: &Value, b: &Value) -> Result<Value, Throw> {
        if let (Value::Number(x), Value::Number(y)) = (a, b) {
            return Ok(Value::Number(x + y));
        }
        let pa = self.to_primitive(a, Hint::Default)?;
        let pb = self.to_primitive(b, Hint::Default)?;
        if matches!(pa, Value::String(_)) || matches!(pb, Value::String(_)) {
            let x = self.to_string(&pa)?;
            let y = self.to_string(&pb)?;
            let mut joined = String::with_capacity(x.len() + y.len());
            joined.push_str(&x);
            joined.push_str(&y);
            return Ok(Value::from(joined));
        }
        let x = self.to_number(&pa)?;
        let y = self.to_number(&pb)?;
        Ok(Value::Number(x + y))
    }
}
