use crate::errors::PocError;
use crate::expr::{RequestValue, ReverseTarget, UrlValue, Value, NEW_REVERSE_CALL};
use crate::poc::PocDefinition;
use super::env::Environment;
use super::params::{ParameterSet, PAYLOAD_VAR, REQUEST_VAR, RESPONSE_VAR};
use super::reverse::ReverseFactory;
use tracing::{debug, warn};

/// Prefix marking `set` entries that read from the base request.
const REQUEST_PREFIX: &str = "request.";

/// Resolves a POC's `set` block into concrete values.
///
/// Three phases:
/// 1. [`prepare`](Self::prepare) allocates reverse callbacks and binds
///    `request`; runs before the environment exists.
/// 2. [`resolve`](Self::resolve) evaluates the remaining entries in
///    lexicographic name order, then
/// 3. evaluates `payload` last.
///
/// Lexicographic order is the only dependency mechanism: an entry can only
/// see entries whose names sort before it (and `payload` sees all).
pub struct ParameterBinder<'a> {
    reverse: &'a dyn ReverseFactory,
}

impl<'a> ParameterBinder<'a> {
    pub fn new(reverse: &'a dyn ReverseFactory) -> Self {
        Self { reverse }
    }

    pub async fn prepare(&self, poc: &PocDefinition, target: &str) -> Result<ParameterSet, PocError> {
        let mut params = ParameterSet::new();

        for name in sorted_names(poc) {
            let source = &poc.set[name];
            if source == NEW_REVERSE_CALL {
                let allocated = self.reverse.allocate().await?;
                let url = UrlValue::parse(&allocated).map_err(|e| {
                    PocError::ReverseAllocation(format!("invalid callback URL '{}': {}", allocated, e))
                })?;
                debug!(variable = %name, url = %url, "Allocated reverse callback");
                params.bind(name.as_str(), Value::Reverse(ReverseTarget { url }));
            }
            if source.starts_with(REQUEST_PREFIX) && !params.contains(REQUEST_VAR) {
                let url = UrlValue::parse(target).map_err(|e| PocError::UrlParse {
                    input: target.to_string(),
                    reason: e.to_string(),
                })?;
                params.bind(REQUEST_VAR, Value::Request(RequestValue { url }));
            }
        }

        Ok(params)
    }

    pub fn resolve(
        &self,
        poc: &PocDefinition,
        env: &Environment,
        params: &mut ParameterSet,
    ) -> Result<(), PocError> {
        for name in sorted_names(poc) {
            let source = &poc.set[name];
            if source == NEW_REVERSE_CALL || name == PAYLOAD_VAR {
                continue;
            }
            if name == RESPONSE_VAR {
                warn!(variable = %name, "Ignoring set entry that shadows the reserved response variable");
                continue;
            }
            let value = env.evaluate(source, params)
                .map_err(|cause| PocError::expression(name.as_str(), cause))?;
            let value = match value {
                Value::Url(url) => Value::String(url.to_string()),
                other => other,
            };
            debug!(variable = %name, value = %value, "Bound variable");
            params.bind(name.as_str(), value);
        }

        if let Some(source) = poc.set.get(PAYLOAD_VAR).filter(|s| *s != NEW_REVERSE_CALL) {
            let value = env.evaluate(source, params)
                .map_err(|cause| PocError::expression(PAYLOAD_VAR, cause))?;
            debug!(value = %value, "Bound payload");
            params.bind(PAYLOAD_VAR, value);
        }

        Ok(())
    }
}

fn sorted_names(poc: &PocDefinition) -> Vec<&String> {
    let mut names: Vec<&String> = poc.set.keys().collect();
    names.sort();
    names
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::bridge::TypeRegistry;
    use crate::engine::reverse::StaticReverseFactory;
    use crate::expr::ExprError;

    fn poc_with(set: &[(&str, &str)]) -> PocDefinition {
        let mut poc = PocDefinition::default();
        for (k, v) in set {
            poc.set.insert(k.to_string(), v.to_string());
        }
        poc
    }

    async fn bind(poc: &PocDefinition, reverse: &StaticReverseFactory) -> Result<ParameterSet, PocError> {
        let binder = ParameterBinder::new(reverse);
        let mut registry = TypeRegistry::for_poc(poc)?;
        let mut params = binder.prepare(poc, "http://target.local:8080").await?;
        for (name, value) in params.iter() {
            registry.declare_value(name, value)?;
        }
        let env = Environment::new(registry);
        binder.resolve(poc, &env, &mut params)?;
        Ok(params)
    }

    fn no_reverse() -> StaticReverseFactory {
        StaticReverseFactory::new(None)
    }

    #[tokio::test]
    async fn test_lexicographic_order_allows_forward_reference() {
        // "a" sorts before "b", so b may read a but not the other way round
        let poc = poc_with(&[("b", "a + 1"), ("a", "2")]);
        let params = bind(&poc, &no_reverse()).await.unwrap();
        assert_eq!(params.get("a"), Some(&Value::Int(2)));
        assert_eq!(params.get("b"), Some(&Value::Int(3)));
    }

    #[tokio::test]
    async fn test_reverse_lexical_dependency_fails() {
        let poc = poc_with(&[("a", "b + 1"), ("b", "2")]);
        match bind(&poc, &no_reverse()).await.unwrap_err() {
            PocError::ExpressionEval { name, cause } => {
                assert_eq!(name, "a");
                assert!(matches!(cause, ExprError::Runtime(_)));
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_payload_resolves_last() {
        let poc = poc_with(&[("payload", "\"x\".concat(token)"), ("token", "\"abc\"")]);
        let params = bind(&poc, &no_reverse()).await.unwrap();
        assert_eq!(params.get("payload"), Some(&Value::from("xabc")));
    }

    #[tokio::test]
    async fn test_reverse_prebound_and_usable() {
        let reverse = StaticReverseFactory::new(Some("http://cb.example.net".into()));
        let poc = poc_with(&[
            ("reverse", "newReverse()"),
            ("reverseURL", "reverse.url"),
            ("payload", "\"curl \".concat(reverseURL)"),
        ]);
        let params = bind(&poc, &reverse).await.unwrap();
        assert!(matches!(params.get("reverse"), Some(Value::Reverse(_))));
        let url = params.get("reverseURL").unwrap();
        assert!(matches!(url, Value::String(s) if s.starts_with("http://cb.example.net/")));
        let payload = params.get("payload").unwrap().to_string();
        assert_eq!(payload, format!("curl {}", url));
    }

    #[tokio::test]
    async fn test_reverse_binds_before_earlier_sorting_consumer() {
        let reverse = StaticReverseFactory::new(Some("http://cb.example.net".into()));
        let poc = poc_with(&[("a", "zz.url"), ("zz", "newReverse()")]);
        let params = bind(&poc, &reverse).await.unwrap();
        let callback = match params.get("zz") {
            Some(Value::Reverse(r)) => r.url.to_string(),
            other => panic!("zz not bound as reverse: {:?}", other),
        };
        assert!(callback.starts_with("http://cb.example.net/"));
        assert_eq!(params.get("a"), Some(&Value::String(callback)));
    }

    #[tokio::test]
    async fn test_reverse_payload_is_not_reevaluated() {
        let reverse = StaticReverseFactory::new(Some("http://cb.example.net".into()));
        let poc = poc_with(&[("payload", "newReverse()")]);
        let params = bind(&poc, &reverse).await.unwrap();
        assert!(matches!(params.get("payload"), Some(Value::Reverse(_))));
    }

    #[tokio::test]
    async fn test_reverse_without_factory_config_fails() {
        let poc = poc_with(&[("reverse", "newReverse()")]);
        let err = bind(&poc, &no_reverse()).await.unwrap_err();
        assert!(matches!(err, PocError::ReverseAllocation(_)));
    }

    #[tokio::test]
    async fn test_request_prefix_binds_request() {
        let poc = poc_with(&[("host", "request.url.host"), ("url", "request.url")]);
        let params = bind(&poc, &no_reverse()).await.unwrap();
        assert!(matches!(params.get("request"), Some(Value::Request(_))));
        assert_eq!(params.get("host"), Some(&Value::from("target.local:8080")));
        // URL results are canonicalized to text
        assert_eq!(params.get("url"), Some(&Value::from("http://target.local:8080/")));
    }

    #[tokio::test]
    async fn test_request_prefix_with_bad_target() {
        let poc = poc_with(&[("u", "request.url")]);
        let binder_factory = no_reverse();
        let binder = ParameterBinder::new(&binder_factory);
        let err = binder.prepare(&poc, "::not a url::").await.unwrap_err();
        assert!(matches!(err, PocError::UrlParse { .. }));
    }

    #[tokio::test]
    async fn test_failure_keeps_earlier_bindings() {
        let poc = poc_with(&[("a", "1"), ("b", "nope("), ("c", "3")]);
        let reverse = no_reverse();
        let binder = ParameterBinder::new(&reverse);
        let registry = TypeRegistry::for_poc(&poc).unwrap();
        let mut params = binder.prepare(&poc, "http://t").await.unwrap();
        let env = Environment::new(registry);
        let err = binder.resolve(&poc, &env, &mut params).unwrap_err();
        assert!(matches!(err, PocError::ExpressionEval { ref name, .. } if name == "b"));
        assert!(params.contains("a"));
        assert!(!params.contains("b"));
        assert!(!params.contains("c"));
    }

    #[tokio::test]
    async fn test_response_entry_is_not_bound() {
        let poc = poc_with(&[("response", "1")]);
        let params = bind(&poc, &no_reverse()).await.unwrap();
        assert!(!params.contains("response"));
    }
}
