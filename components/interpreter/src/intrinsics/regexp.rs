//! `RegExp` objects backed by the `regex` crate
//!
//! Patterns are compiled once, when the literal is evaluated or the
//! constructor runs. Syntax the `regex` crate does not support (lookaround,
//! backreferences) is reported as a SyntaxError at that point. Match
//! positions and `lastIndex` count characters, like string indexing.

use std::rc::Rc;

use core_types::ErrorKind;
use regex::{Regex, RegexBuilder};

use crate::completion::Throw;
use crate::context::ExecutionContext;
use crate::conversion::to_boolean;
use crate::object::{Attributes, Object, ObjectKind, ObjectRef};
use crate::realm::Realm;
use crate::value::{PropertyKey, Value};

use super::{argument, define_constructor, define_getter, define_method};

/// Parsed `RegExp` flags
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RegExpFlags {
    /// `d`
    pub has_indices: bool,
    /// `g`
    pub global: bool,
    /// `i`
    pub ignore_case: bool,
    /// `m`
    pub multiline: bool,
    /// `s`
    pub dot_all: bool,
    /// `u`
    pub unicode: bool,
    /// `y`
    pub sticky: bool,
}

impl RegExpFlags {
    /// Parse a flags string; unknown or repeated flags are rejected
    pub fn parse(flags: &str) -> Option<Self> {
        let mut parsed = RegExpFlags::default();
        for c in flags.chars() {
            let slot = match c {
                'd' => &mut parsed.has_indices,
                'g' => &mut parsed.global,
                'i' => &mut parsed.ignore_case,
                'm' => &mut parsed.multiline,
                's' => &mut parsed.dot_all,
                'u' => &mut parsed.unicode,
                'y' => &mut parsed.sticky,
                _ => return None,
            };
            if *slot {
                return None;
            }
            *slot = true;
        }
        Some(parsed)
    }

    /// Canonical flags string, in `dgimsuy` order
    pub fn to_flags_string(self) -> String {
        [
            (self.has_indices, 'd'),
            (self.global, 'g'),
            (self.ignore_case, 'i'),
            (self.multiline, 'm'),
            (self.dot_all, 's'),
            (self.unicode, 'u'),
            (self.sticky, 'y'),
        ]
        .iter()
        .filter(|(on, _)| *on)
        .map(|(_, c)| *c)
        .collect()
    }
}

/// Internal state of a `RegExp` object
#[derive(Debug, Clone)]
pub struct RegExpData {
    /// Pattern text as written
    pub source: Rc<str>,
    /// Flags
    pub flags: RegExpFlags,
    regex: Regex,
}

impl RegExpData {
    /// Compile `pattern`; the error text describes why it was rejected
    pub fn new(pattern: &str, flags: &str) -> Result<Self, String> {
        let parsed = RegExpFlags::parse(flags)
            .ok_or_else(|| format!("Invalid flags supplied to RegExp constructor '{}'", flags))?;
        let regex = RegexBuilder::new(&translate_pattern(pattern))
            .case_insensitive(parsed.ignore_case)
            .multi_line(parsed.multiline)
            .dot_matches_new_line(parsed.dot_all)
            .build()
            .map_err(|e| format!("Invalid regular expression: /{}/: {}", pattern, e))?;
        Ok(Self {
            source: Rc::from(pattern),
            flags: parsed,
            regex,
        })
    }

    /// The compiled expression
    pub fn regex(&self) -> &Regex {
        &self.regex
    }
}

/// Rewrite the few JavaScript spellings the `regex` crate reads differently:
/// `(?<name>` becomes `(?P<name>`, and `\d`, `\w` and `\b` stay ASCII
fn translate_pattern(pattern: &str) -> String {
    let mut out = String::with_capacity(pattern.len() + 8);
    let mut chars = pattern.chars().peekable();
    let mut in_class = false;
    while let Some(c) = chars.next() {
        match c {
            '\\' => match chars.next() {
                // Negated ASCII classes could match invalid UTF-8, so only
                // the positive ones are narrowed
                Some(class @ ('d' | 'w' | 'b')) if !in_class => {
                    out.push_str("(?-u:\\");
                    out.push(class);
                    out.push(')');
                }
                Some('/') => out.push('/'),
                Some(other) => {
                    out.push('\\');
                    out.push(other);
                }
                None => out.push_str("\\\\"),
            },
            '[' if !in_class => {
                in_class = true;
                out.push(c);
            }
            ']' if in_class => {
                in_class = false;
                out.push(c);
            }
            '(' if !in_class && chars.peek() == Some(&'?') => {
                chars.next();
                out.push_str("(?");
                let mut lookahead = chars.clone();
                if lookahead.next() == Some('<')
                    && !matches!(lookahead.next(), Some('=') | Some('!'))
                {
                    out.push('P');
                }
            }
            _ => out.push(c),
        }
    }
    out
}

impl ExecutionContext {
    /// Create a `RegExp` object; an invalid pattern or flag is a SyntaxError
    pub fn create_regexp(&mut self, pattern: &str, flags: &str) -> Result<ObjectRef, Throw> {
        let prototype = self.realm().regexp_prototype.clone();
        self.regexp_with_prototype(pattern, flags, prototype)
    }

    fn regexp_with_prototype(
        &mut self,
        pattern: &str,
        flags: &str,
        prototype: ObjectRef,
    ) -> Result<ObjectRef, Throw> {
        let data = RegExpData::new(pattern, flags)
            .map_err(|message| self.throw_error(ErrorKind::SyntaxError, message))?;
        let regexp = ObjectRef::new(Object::new(ObjectKind::RegExp(data), Some(prototype)));
        let last_index = Attributes {
            writable: true,
            enumerable: false,
            configurable: false,
        };
        regexp.insert("lastIndex", Value::from(0), last_index);
        Ok(regexp)
    }

    /// RegExpBuiltinExec: the match array, or null
    fn regexp_exec(&mut self, regexp: &ObjectRef, input: Rc<str>) -> Result<Value, Throw> {
        let data = match &regexp.borrow().kind {
            ObjectKind::RegExp(data) => data.clone(),
            _ => return Ok(Value::Null),
        };
        let uses_last_index = data.flags.global || data.flags.sticky;
        let last_index_key = PropertyKey::from("lastIndex");
        let start = if uses_last_index {
            let value = self.get(regexp, &last_index_key)?;
            let n = self.to_number(&value)?;
            if n.is_nan() || n < 0.0 { 0 } else { n as usize }
        } else {
            0
        };

        let length = input.chars().count();
        if start > length {
            self.set(regexp, last_index_key, Value::from(0), true)?;
            return Ok(Value::Null);
        }
        let byte_start = input
            .char_indices()
            .nth(start)
            .map_or(input.len(), |(offset, _)| offset);
        let captures = data
            .regex()
            .captures_at(&input, byte_start)
            .filter(|c| !data.flags.sticky || c.get(0).is_some_and(|m| m.start() == byte_start));
        let Some(captures) = captures else {
            if uses_last_index {
                self.set(regexp, last_index_key, Value::from(0), true)?;
            }
            return Ok(Value::Null);
        };

        let whole = captures.get(0).map_or(0..0, |m| m.range());
        let char_index = |byte: usize| input[..byte].chars().count();
        if uses_last_index {
            let end = char_index(whole.end);
            self.set(regexp, last_index_key, Value::from(end), true)?;
        }

        let groups: Vec<Value> = captures
            .iter()
            .map(|group| group.map_or(Value::Undefined, |m| Value::from(m.as_str())))
            .collect();
        let result = self.create_array(groups);
        result.insert("index", Value::from(char_index(whole.start)), Attributes::ALL);
        result.insert("input", Value::String(input.clone()), Attributes::ALL);

        let names: Vec<&str> = data.regex().capture_names().flatten().collect();
        let groups = if names.is_empty() {
            Value::Undefined
        } else {
            let groups = ObjectRef::new(Object::ordinary(None));
            for name in names {
                let value = captures
                    .name(name)
                    .map_or(Value::Undefined, |m| Value::from(m.as_str()));
                groups.insert(name, value, Attributes::ALL);
            }
            Value::Object(groups)
        };
        result.insert("groups", groups, Attributes::ALL);
        Ok(Value::Object(result))
    }
}

fn this_regexp(cx: &mut ExecutionContext, this: &Value, method: &str) -> Result<ObjectRef, Throw> {
    match this {
        Value::Object(object) if matches!(object.borrow().kind, ObjectKind::RegExp(_)) => {
            Ok(object.clone())
        }
        _ => Err(cx.type_error(format!(
            "RegExp.prototype.{} requires that 'this' be a RegExp object",
            method
        ))),
    }
}

fn regexp_data(object: &ObjectRef) -> Option<RegExpData> {
    match &object.borrow().kind {
        ObjectKind::RegExp(data) => Some(data.clone()),
        _ => None,
    }
}

fn flag_getter(realm: &Realm, name: &'static str, read: fn(&RegExpFlags) -> bool) {
    define_getter(realm, &realm.regexp_prototype, name, move |cx, this, _args| {
        if let Value::Object(object) = this {
            if object.ptr_eq(&cx.realm().regexp_prototype) {
                return Ok(Value::Undefined);
            }
        }
        let regexp = this_regexp(cx, this, name)?;
        Ok(Value::Boolean(
            regexp_data(&regexp).is_some_and(|data| read(&data.flags)),
        ))
    });
}

pub(crate) fn install(realm: &Realm) {
    let prototype = &realm.regexp_prototype;
    define_constructor(
        realm,
        "RegExp",
        2,
        prototype,
        |cx, _this, args| {
            let pattern = argument(args, 0);
            // RegExp(re) without new and without flags returns `re` itself
            if let Value::Object(object) = &pattern {
                if regexp_data(object).is_some() && argument(args, 1).is_undefined() {
                    return Ok(pattern);
                }
            }
            let prototype = cx.realm().regexp_prototype.clone();
            construct_regexp(cx, args, prototype)
        },
        |cx, args, new_target| {
            let fallback = cx.realm().regexp_prototype.clone();
            let prototype = cx.prototype_from_constructor(new_target, fallback)?;
            construct_regexp(cx, args, prototype)
        },
    );

    define_method(realm, prototype, "exec", 1, |cx, this, args| {
        let regexp = this_regexp(cx, this, "exec")?;
        let input = cx.to_string(&argument(args, 0))?;
        cx.regexp_exec(&regexp, input)
    });

    define_method(realm, prototype, "test", 1, |cx, this, args| {
        let regexp = this_regexp(cx, this, "test")?;
        let input = cx.to_string(&argument(args, 0))?;
        let matched = cx.regexp_exec(&regexp, input)?;
        Ok(Value::Boolean(!matches!(matched, Value::Null)))
    });

    define_method(realm, prototype, "toString", 0, |cx, this, _args| {
        let Value::Object(object) = this else {
            return Err(cx.type_error("RegExp.prototype.toString requires that 'this' be an Object"));
        };
        let source = cx.get(object, &PropertyKey::from("source"))?;
        let source = cx.to_string(&source)?;
        let flags = cx.get(object, &PropertyKey::from("flags"))?;
        let flags = cx.to_string(&flags)?;
        Ok(Value::from(format!("/{}/{}", source, flags)))
    });

    define_getter(realm, prototype, "source", |cx, this, _args| {
        if let Value::Object(object) = this {
            if object.ptr_eq(&cx.realm().regexp_prototype) {
                return Ok(Value::from("(?:)"));
            }
        }
        let regexp = this_regexp(cx, this, "source")?;
        Ok(regexp_data(&regexp)
            .map(|data| {
                if data.source.is_empty() {
                    Value::from("(?:)")
                } else {
                    Value::String(data.source)
                }
            })
            .unwrap_or_default())
    });

    define_getter(realm, prototype, "flags", |cx, this, _args| {
        let Value::Object(object) = this else {
            return Err(cx.type_error("RegExp.prototype.flags getter called on non-object"));
        };
        let mut flags = String::new();
        for (name, c) in [
            ("hasIndices", 'd'),
            ("global", 'g'),
            ("ignoreCase", 'i'),
            ("multiline", 'm'),
            ("dotAll", 's'),
            ("unicode", 'u'),
            ("sticky", 'y'),
        ] {
            if to_boolean(&cx.get(object, &PropertyKey::from(name))?) {
                flags.push(c);
            }
        }
        Ok(Value::from(flags))
    });

    flag_getter(realm, "hasIndices", |f| f.has_indices);
    flag_getter(realm, "global", |f| f.global);
    flag_getter(realm, "ignoreCase", |f| f.ignore_case);
    flag_getter(realm, "multiline", |f| f.multiline);
    flag_getter(realm, "dotAll", |f| f.dot_all);
    flag_getter(realm, "unicode", |f| f.unicode);
    flag_getter(realm, "sticky", |f| f.sticky);
}

fn construct_regexp(
    cx: &mut ExecutionContext,
    args: &[Value],
    prototype: ObjectRef,
) -> Result<Value, Throw> {
    let (pattern, inherited_flags) = match argument(args, 0) {
        Value::Object(object) => match regexp_data(&object) {
            Some(data) => (data.source.clone(), Some(data.flags.to_flags_string())),
            None => (cx.to_string(&Value::Object(object))?, None),
        },
        Value::Undefined => (Rc::from(""), None),
        other => (cx.to_string(&other)?, None),
    };
    let flags = match argument(args, 1) {
        Value::Undefined => inherited_flags.unwrap_or_default(),
        flags => cx.to_string(&flags)?.to_string(),
    };
    Ok(Value::Object(cx.regexp_with_prototype(&pattern, &flags, prototype)?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::DEFAULT_MAX_CALL_DEPTH;

    #[test]
    fn test_flags_parse_and_render() {
        let flags = RegExpFlags::parse("yig").unwrap();
        assert!(flags.global && flags.ignore_case && flags.sticky);
        assert_eq!(flags.to_flags_string(), "giy");
        assert!(RegExpFlags::parse("gg").is_none());
        assert!(RegExpFlags::parse("x").is_none());
    }

    #[test]
    fn test_named_groups_translate() {
        assert_eq!(translate_pattern("(?<year>\\d+)"), "(?P<year>(?-u:\\d)+)");
        assert_eq!(translate_pattern("(?:a)"), "(?:a)");
        assert_eq!(translate_pattern("[\\d]"), "[\\d]");
        assert_eq!(translate_pattern("a\\/b"), "a/b");
    }

    #[test]
    fn test_invalid_pattern_is_syntax_error() {
        let mut cx = ExecutionContext::new(DEFAULT_MAX_CALL_DEPTH);
        let error = cx.create_regexp("(", "").unwrap_err();
        assert_eq!(cx.to_js_error(&error).kind, ErrorKind::SyntaxError);
        let error = cx.create_regexp("a", "gg").unwrap_err();
        assert_eq!(cx.to_js_error(&error).kind, ErrorKind::SyntaxError);
    }

    #[test]
    fn test_global_exec_advances_last_index() {
        let mut cx = ExecutionContext::new(DEFAULT_MAX_CALL_DEPTH);
        let regexp = cx.create_regexp("o", "g").unwrap();
        let input: Rc<str> = Rc::from("foo");
        let first = cx.regexp_exec(&regexp, input.clone()).unwrap();
        let index = cx.get_value(&first, &PropertyKey::from("index")).unwrap();
        assert_eq!(index, Value::from(1));
        let second = cx.regexp_exec(&regexp, input.clone()).unwrap();
        let index = cx.get_value(&second, &PropertyKey::from("index")).unwrap();
        assert_eq!(index, Value::from(2));
        assert_eq!(cx.regexp_exec(&regexp, input).unwrap(), Value::Null);
        let last_index = cx.get(&regexp, &PropertyKey::from("lastIndex")).unwrap();
        assert_eq!(last_index, Value::from(0));
    }
}
