use std::collections::BTreeMap;
use data_encoding::BASE64;
use rand::Rng;
use sha2::{Digest, Sha256};
use super::types::DeclType;
use super::value::{UrlValue, Value};
use super::ExprError;

/// Source text of the reverse-callback constructor. Only meaningful as a
/// whole `set` entry; the binder allocates the callback before evaluation.
pub const NEW_REVERSE_CALL: &str = "newReverse()";

pub fn function_return_type(name: &str) -> Option<DeclType> {
    Some(match name {
        "newReverse" => DeclType::Reverse,
        "randomInt" | "int" | "size" => DeclType::Int,
        "randomLowercase" | "base64" | "urlencode" | "urldecode" | "hexEncode" | "sha256"
        | "substr" | "string" => DeclType::String,
        "base64Decode" | "bytes" => DeclType::Bytes,
        "urlParse" => DeclType::Url,
        _ => return None,
    })
}

pub fn method_return_type(name: &str) -> Option<DeclType> {
    Some(match name {
        "contains" | "bcontains" | "icontains" | "matches" | "bmatches" | "startsWith"
        | "bstartsWith" | "endsWith" => DeclType::Bool,
        "lower" | "upper" => DeclType::String,
        "submatch" | "bsubmatch" => DeclType::Map,
        "concat" => DeclType::Dyn,
        _ => return None,
    })
}

pub fn call_function(name: &str, args: Vec<Value>) -> Result<Value, ExprError> {
    match name {
        "newReverse" => Err(ExprError::Runtime(format!(
            "{} is only supported as a whole set entry",
            NEW_REVERSE_CALL
        ))),
        "randomInt" => {
            let [lo, hi] = arity::<2>(name, args)?;
            let (lo, hi) = (int_arg(name, &lo)?, int_arg(name, &hi)?);
            if lo >= hi {
                return Err(ExprError::Runtime(format!(
                    "randomInt: empty range {}..{}",
                    lo, hi
                )));
            }
            Ok(Value::Int(rand::thread_rng().gen_range(lo..hi)))
        }
        "randomLowercase" => {
            let [n] = arity::<1>(name, args)?;
            let n = int_arg(name, &n)?;
            if n < 0 {
                return Err(ExprError::Runtime("randomLowercase: negative length".into()));
            }
            let mut rng = rand::thread_rng();
            let s: String = (0..n).map(|_| rng.gen_range(b'a'..=b'z') as char).collect();
            Ok(Value::String(s))
        }
        "base64" => {
            let [v] = arity::<1>(name, args)?;
            Ok(Value::String(BASE64.encode(bytes_arg(name, &v)?)))
        }
        "base64Decode" => {
            let [v] = arity::<1>(name, args)?;
            BASE64.decode(bytes_arg(name, &v)?)
                .map(Value::Bytes)
                .map_err(|e| ExprError::Runtime(format!("base64Decode: {}", e)))
        }
        "urlencode" => {
            let [v] = arity::<1>(name, args)?;
            let encoded = match &v {
                Value::String(s) => urlencoding::encode(s).into_owned(),
                other => urlencoding::encode_binary(bytes_arg(name, other)?).into_owned(),
            };
            Ok(Value::String(encoded))
        }
        "urldecode" => {
            let [v] = arity::<1>(name, args)?;
            let text = String::from_utf8_lossy(bytes_arg(name, &v)?).into_owned();
            urlencoding::decode(&text)
                .map(|s| Value::String(s.into_owned()))
                .map_err(|e| ExprError::Runtime(format!("urldecode: {}", e)))
        }
        "hexEncode" => {
            let [v] = arity::<1>(name, args)?;
            Ok(Value::String(hex::encode(bytes_arg(name, &v)?)))
        }
        "sha256" => {
            let [v] = arity::<1>(name, args)?;
            Ok(Value::String(hex::encode(Sha256::digest(bytes_arg(name, &v)?))))
        }
        "substr" => {
            let [s, start, len] = arity::<3>(name, args)?;
            let s = str_arg(name, &s)?;
            let (start, len) = (int_arg(name, &start)?, int_arg(name, &len)?);
            if start < 0 || len < 0 {
                return Err(ExprError::Runtime("substr: negative index".into()));
            }
            let out: String = s.chars().skip(start as usize).take(len as usize).collect();
            Ok(Value::String(out))
        }
        "string" => {
            let [v] = arity::<1>(name, args)?;
            Ok(Value::String(v.to_string()))
        }
        "int" => {
            let [v] = arity::<1>(name, args)?;
            match v {
                Value::Int(i) => Ok(Value::Int(i)),
                Value::Bool(b) => Ok(Value::Int(b as i64)),
                Value::String(s) => s.trim().parse::<i64>()
                    .map(Value::Int)
                    .map_err(|_| ExprError::Runtime(format!("int: cannot convert '{}'", s))),
                other => Err(no_overload(name, &other)),
            }
        }
        "bytes" => {
            let [v] = arity::<1>(name, args)?;
            Ok(Value::Bytes(bytes_arg(name, &v)?.to_vec()))
        }
        "size" => {
            let [v] = arity::<1>(name, args)?;
            let n = match &v {
                Value::String(s) => s.chars().count(),
                Value::Bytes(b) => b.len(),
                Value::List(l) => l.len(),
                Value::Map(m) => m.len(),
                other => return Err(no_overload(name, other)),
            };
            Ok(Value::Int(n as i64))
        }
        "urlParse" => {
            let [v] = arity::<1>(name, args)?;
            let text = str_arg(name, &v)?;
            UrlValue::parse(text)
                .map(Value::Url)
                .map_err(|e| ExprError::Runtime(format!("urlParse '{}': {}", text, e)))
        }
        _ => Err(ExprError::Runtime(format!("undeclared function '{}'", name))),
    }
}

/// Pattern methods take the regex as the receiver: `"root:.*".bmatches(response.body)`.
pub fn call_method(receiver: Value, name: &str, args: Vec<Value>) -> Result<Value, ExprError> {
    match name {
        "contains" => {
            let [needle] = arity::<1>(name, args)?;
            Ok(Value::Bool(str_arg(name, &receiver)?.contains(str_arg(name, &needle)?)))
        }
        "icontains" => {
            let [needle] = arity::<1>(name, args)?;
            let hay = str_arg(name, &receiver)?.to_lowercase();
            Ok(Value::Bool(hay.contains(&str_arg(name, &needle)?.to_lowercase())))
        }
        "bcontains" => {
            let [needle] = arity::<1>(name, args)?;
            let hay = bytes_arg(name, &receiver)?;
            let needle = bytes_arg(name, &needle)?;
            Ok(Value::Bool(contains_bytes(hay, needle)))
        }
        "matches" | "bmatches" => {
            let [text] = arity::<1>(name, args)?;
            let re = compile_pattern(str_arg(name, &receiver)?)?;
            Ok(Value::Bool(re.is_match(bytes_arg(name, &text)?)))
        }
        "submatch" | "bsubmatch" => {
            let [text] = arity::<1>(name, args)?;
            let re = compile_pattern(str_arg(name, &receiver)?)?;
            let mut out = BTreeMap::new();
            if let Some(caps) = re.captures(bytes_arg(name, &text)?) {
                for group in re.capture_names().flatten() {
                    let captured = caps.name(group)
                        .map(|m| String::from_utf8_lossy(m.as_bytes()).into_owned())
                        .unwrap_or_default();
                    out.insert(group.to_string(), Value::String(captured));
                }
            }
            Ok(Value::Map(out))
        }
        "startsWith" => {
            let [prefix] = arity::<1>(name, args)?;
            Ok(Value::Bool(str_arg(name, &receiver)?.starts_with(str_arg(name, &prefix)?)))
        }
        "endsWith" => {
            let [suffix] = arity::<1>(name, args)?;
            Ok(Value::Bool(str_arg(name, &receiver)?.ends_with(str_arg(name, &suffix)?)))
        }
        "bstartsWith" => {
            let [prefix] = arity::<1>(name, args)?;
            Ok(Value::Bool(bytes_arg(name, &receiver)?.starts_with(bytes_arg(name, &prefix)?)))
        }
        "concat" => match receiver {
            Value::Bytes(mut b) => {
                for arg in &args {
                    b.extend_from_slice(bytes_arg(name, arg)?);
                }
                Ok(Value::Bytes(b))
            }
            Value::String(mut s) => {
                for arg in &args {
                    s.push_str(&arg.to_string());
                }
                Ok(Value::String(s))
            }
            other => Err(no_overload(name, &other)),
        },
        "lower" => {
            arity::<0>(name, args)?;
            Ok(Value::String(str_arg(name, &receiver)?.to_lowercase()))
        }
        "upper" => {
            arity::<0>(name, args)?;
            Ok(Value::String(str_arg(name, &receiver)?.to_uppercase()))
        }
        _ => Err(ExprError::Runtime(format!(
            "no such method '{}' on {}",
            name,
            receiver.type_name()
        ))),
    }
}

fn arity<const N: usize>(name: &str, args: Vec<Value>) -> Result<[Value; N], ExprError> {
    let got = args.len();
    args.try_into().map_err(|_| {
        ExprError::Runtime(format!("{} expects {} argument(s), got {}", name, N, got))
    })
}

fn int_arg(name: &str, v: &Value) -> Result<i64, ExprError> {
    match v {
        Value::Int(i) => Ok(*i),
        other => Err(no_overload(name, other)),
    }
}

fn str_arg<'a>(name: &str, v: &'a Value) -> Result<&'a str, ExprError> {
    match v {
        Value::String(s) => Ok(s),
        other => Err(no_overload(name, other)),
    }
}

fn bytes_arg<'a>(name: &str, v: &'a Value) -> Result<&'a [u8], ExprError> {
    v.as_byte_slice().ok_or_else(|| no_overload(name, v))
}

fn no_overload(name: &str, v: &Value) -> ExprError {
    ExprError::Runtime(format!("no matching overload for {}({})", name, v.type_name()))
}

fn compile_pattern(pattern: &str) -> Result<regex::bytes::Regex, ExprError> {
    regex::bytes::Regex::new(pattern)
        .map_err(|e| ExprError::Runtime(format!("invalid regex '{}': {}", pattern, e)))
}

fn contains_bytes(hay: &[u8], needle: &[u8]) -> bool {
    needle.is_empty() || hay.windows(needle.len()).any(|w| w == needle)
}
