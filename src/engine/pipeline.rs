use std::time::Duration;
use serde::{Deserialize, Serialize};
use crate::errors::PocError;
use crate::poc::Rule;
use super::env::Environment;
use super::extract::extract_captures;
use super::params::ParameterSet;
use super::template::{has_unresolved, substitute_rule};
use super::transport::{HttpTransport, ProbeRequest, PROBE_TIMEOUT_SECS};
use tracing::{debug, info, warn};

/// Lifecycle of one verification run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunState {
    Idle,
    Running,
    /// Every rule ran and none evaluated to `false`.
    Confirmed,
    /// Evidence missing or a rule evaluated to `false`. Not an error.
    Rejected,
    /// A transport or expression failure stopped the run.
    Aborted,
}

impl std::fmt::Display for RunState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Idle => write!(f, "idle"),
            Self::Running => write!(f, "running"),
            Self::Confirmed => write!(f, "confirmed"),
            Self::Rejected => write!(f, "rejected"),
            Self::Aborted => write!(f, "aborted"),
        }
    }
}

/// Mutable state owned by a single run: the bindings and the environment
/// they are evaluated in.
pub struct RunContext {
    pub target: String,
    pub params: ParameterSet,
    pub env: Environment,
}

/// Sends the rules of one run in order, chaining state between them.
pub struct ProbePipeline<'a> {
    transport: &'a dyn HttpTransport,
    state: RunState,
    rules_executed: usize,
}

impl<'a> ProbePipeline<'a> {
    pub fn new(transport: &'a dyn HttpTransport) -> Self {
        Self { transport, state: RunState::Idle, rules_executed: 0 }
    }

    pub fn state(&self) -> RunState {
        self.state
    }

    /// Number of rules whose request was sent.
    pub fn rules_executed(&self) -> usize {
        self.rules_executed
    }

    /// Run `rules` against `ctx`. `Ok(false)` is a rejection; on `Err` the
    /// verdict is indeterminate and the state is `Aborted`.
    pub async fn execute(&mut self, ctx: &mut RunContext, mut rules: Vec<Rule>) -> Result<bool, PocError> {
        self.state = RunState::Running;
        let mut verdict = false;

        for (index, rule) in rules.iter_mut().enumerate() {
            substitute_rule(rule, &ctx.params);
            if has_unresolved(rule) {
                warn!(rule = index, path = %rule.path, "Rule still has unresolved placeholders");
            }

            let request = ProbeRequest {
                method: rule.method.clone(),
                url: format!("{}{}", ctx.target, rule.path),
                body: rule.body.clone().into_bytes(),
                headers: rule.headers.clone(),
                no_follow_redirects: !rule.follow_redirects,
                timeout: Duration::from_secs(PROBE_TIMEOUT_SECS),
            };

            let response = match self.transport.perform(request).await {
                Ok(response) => response,
                Err(e) => {
                    self.state = RunState::Aborted;
                    warn!(rule = index, error = %e, "Probe failed");
                    return Err(PocError::ProbeTransport { rule: index, message: e.to_string() });
                }
            };
            self.rules_executed += 1;
            debug!(rule = index, status = response.status, bytes = response.body.len(), "Probe response");

            if let Some(pattern) = rule.search_pattern() {
                let captures = extract_captures(pattern, &response.body);
                ctx.params.set_response(response);
                match captures {
                    Some(captures) => {
                        debug!(rule = index, captured = captures.len(), "Search matched");
                        ctx.params.merge_captures(captures);
                    }
                    None => {
                        info!(rule = index, "Search found no evidence, rejecting");
                        self.state = RunState::Rejected;
                        return Ok(false);
                    }
                }
            } else {
                ctx.params.set_response(response);
            }

            let outcome = match ctx.env.evaluate(&rule.expression, &ctx.params) {
                Ok(outcome) => outcome,
                Err(cause) => {
                    self.state = RunState::Aborted;
                    return Err(PocError::expression(PocError::rule_label(index), cause));
                }
            };
            debug!(rule = index, result = %outcome, "Rule evaluated");

            if outcome.to_string() == "false" {
                self.state = RunState::Rejected;
                return Ok(false);
            }
            verdict = true;
        }

        self.state = if verdict { RunState::Confirmed } else { RunState::Rejected };
        Ok(verdict)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::collections::VecDeque;
    use std::sync::Mutex;
    use async_trait::async_trait;
    use crate::engine::bridge::TypeRegistry;
    use crate::engine::transport::TransportError;
    use crate::expr::{ResponseValue, Value};

    /// Replays canned responses and records every request it receives.
    pub(crate) struct ScriptedTransport {
        responses: Mutex<VecDeque<Result<ResponseValue, String>>>,
        pub sent: Mutex<Vec<ProbeRequest>>,
    }

    impl ScriptedTransport {
        pub(crate) fn new(responses: Vec<Result<ResponseValue, String>>) -> Self {
            Self { responses: Mutex::new(responses.into()), sent: Mutex::new(Vec::new()) }
        }

        pub(crate) fn ok(count: usize, body: &str) -> Self {
            let response = ResponseValue { status: 200, body: body.as_bytes().to_vec(), ..Default::default() };
            Self::new((0..count).map(|_| Ok(response.clone())).collect())
        }

        pub(crate) fn sent_count(&self) -> usize {
            self.sent.lock().unwrap().len()
        }
    }

    #[async_trait]
    impl HttpTransport for ScriptedTransport {
        async fn perform(&self, request: ProbeRequest) -> Result<ResponseValue, TransportError> {
            self.sent.lock().unwrap().push(request);
            match self.responses.lock().unwrap().pop_front() {
                Some(Ok(r)) => Ok(r),
                Some(Err(e)) => Err(TransportError(e)),
                None => Err(TransportError("no scripted response left".into())),
            }
        }
    }

    fn context() -> RunContext {
        RunContext {
            target: "http://target.local".into(),
            params: ParameterSet::new(),
            env: Environment::new(TypeRegistry::new()),
        }
    }

    fn rule(expression: &str) -> Rule {
        Rule { path: "/".into(), expression: expression.into(), follow_redirects: true, ..Default::default() }
    }

    #[tokio::test]
    async fn test_single_rule_true() {
        let transport = ScriptedTransport::ok(1, "hello");
        let mut pipeline = ProbePipeline::new(&transport);
        let mut ctx = context();
        let verdict = pipeline.execute(&mut ctx, vec![rule("response.status == 200")]).await.unwrap();
        assert!(verdict);
        assert_eq!(pipeline.state(), RunState::Confirmed);
        assert_eq!(transport.sent_count(), 1);
    }

    #[tokio::test]
    async fn test_false_stops_remaining_rules() {
        let transport = ScriptedTransport::ok(3, "");
        let mut pipeline = ProbePipeline::new(&transport);
        let mut ctx = context();
        let rules = vec![rule("true"), rule("false"), rule("true")];
        let verdict = pipeline.execute(&mut ctx, rules).await.unwrap();
        assert!(!verdict);
        assert_eq!(pipeline.state(), RunState::Rejected);
        assert_eq!(transport.sent_count(), 2);
    }

    #[tokio::test]
    async fn test_all_true_sends_all() {
        let transport = ScriptedTransport::ok(2, "");
        let mut pipeline = ProbePipeline::new(&transport);
        let mut ctx = context();
        assert!(pipeline.execute(&mut ctx, vec![rule("true"), rule("true")]).await.unwrap());
        assert_eq!(transport.sent_count(), 2);
        assert_eq!(pipeline.rules_executed(), 2);
    }

    #[tokio::test]
    async fn test_non_boolean_result_uses_string_form() {
        let transport = ScriptedTransport::ok(2, "");
        let mut pipeline = ProbePipeline::new(&transport);
        let mut ctx = context();
        // A string "false" rejects just like the boolean; any other value passes.
        assert!(pipeline.execute(&mut ctx, vec![rule("\"yes\"")]).await.unwrap());
        let mut pipeline = ProbePipeline::new(&transport);
        assert!(!pipeline.execute(&mut ctx, vec![rule("\"false\"")]).await.unwrap());
    }

    #[tokio::test]
    async fn test_search_captures_feed_next_rule() {
        let transport = ScriptedTransport::ok(2, "ok resp_ab12 done");
        let mut pipeline = ProbePipeline::new(&transport);
        let mut ctx = context();
        let mut first = rule("token == \"ab12\"");
        first.search = Some(r"resp_(?P<token>[a-z0-9]+)".into());
        let mut second = rule("true");
        second.path = "/check?t={{token}}".into();
        second.headers.insert("X-Token".into(), "{{token}}".into());

        assert!(pipeline.execute(&mut ctx, vec![first, second]).await.unwrap());
        let sent = transport.sent.lock().unwrap();
        assert_eq!(sent[1].url, "http://target.local/check?t=ab12");
        assert_eq!(sent[1].headers["X-Token"], "ab12");
        assert_eq!(ctx.params.get("token"), Some(&Value::from("ab12")));
    }

    #[tokio::test]
    async fn test_search_miss_rejects_without_error() {
        let transport = ScriptedTransport::ok(2, "nothing to see");
        let mut pipeline = ProbePipeline::new(&transport);
        let mut ctx = context();
        let mut first = rule("true");
        first.search = Some(r"resp_(?P<token>[a-z0-9]+)".into());
        let verdict = pipeline.execute(&mut ctx, vec![first, rule("true")]).await.unwrap();
        assert!(!verdict);
        assert_eq!(pipeline.state(), RunState::Rejected);
        assert_eq!(transport.sent_count(), 1);
    }

    #[tokio::test]
    async fn test_malformed_search_rejects_without_error() {
        let transport = ScriptedTransport::ok(1, "resp_ab12");
        let mut pipeline = ProbePipeline::new(&transport);
        let mut ctx = context();
        let mut first = rule("true");
        first.search = Some(r"resp_(?P<token>[a-z".into());
        assert!(!pipeline.execute(&mut ctx, vec![first]).await.unwrap());
        assert_eq!(pipeline.state(), RunState::Rejected);
    }

    #[tokio::test]
    async fn test_transport_error_aborts() {
        let transport = ScriptedTransport::new(vec![
            Ok(ResponseValue { status: 200, ..Default::default() }),
            Err("connection refused".into()),
        ]);
        let mut pipeline = ProbePipeline::new(&transport);
        let mut ctx = context();
        let err = pipeline
            .execute(&mut ctx, vec![rule("true"), rule("true"), rule("true")])
            .await
            .unwrap_err();
        assert!(matches!(err, PocError::ProbeTransport { rule: 1, .. }));
        assert_eq!(pipeline.state(), RunState::Aborted);
        assert_eq!(transport.sent_count(), 2);
    }

    #[tokio::test]
    async fn test_expression_error_aborts_with_rule_index() {
        let transport = ScriptedTransport::ok(1, "");
        let mut pipeline = ProbePipeline::new(&transport);
        let mut ctx = context();
        let err = pipeline.execute(&mut ctx, vec![rule("response.status == ")]).await.unwrap_err();
        match err {
            PocError::ExpressionEval { name, .. } => assert_eq!(name, "rules[0]"),
            other => panic!("unexpected error: {:?}", other),
        }
        assert_eq!(pipeline.state(), RunState::Aborted);
    }

    #[tokio::test]
    async fn test_response_reflects_latest_probe() {
        let transport = ScriptedTransport::new(vec![
            Ok(ResponseValue { status: 302, ..Default::default() }),
            Ok(ResponseValue { status: 200, ..Default::default() }),
        ]);
        let mut pipeline = ProbePipeline::new(&transport);
        let mut ctx = context();
        let rules = vec![rule("response.status == 302"), rule("response.status == 200")];
        assert!(pipeline.execute(&mut ctx, rules).await.unwrap());
        assert_eq!(ctx.params.response().map(|r| r.status), Some(200));
    }

    #[tokio::test]
    async fn test_request_shape() {
        let transport = ScriptedTransport::ok(1, "");
        let mut pipeline = ProbePipeline::new(&transport);
        let mut ctx = context();
        ctx.params.bind("name", Value::from("bob"));
        let mut r = rule("true");
        r.method = "POST".into();
        r.path = " /login ".into();
        r.body = " user={{name}} ".into();
        r.follow_redirects = false;
        pipeline.execute(&mut ctx, vec![r]).await.unwrap();

        let sent = transport.sent.lock().unwrap();
        assert_eq!(sent[0].method, "POST");
        assert_eq!(sent[0].url, "http://target.local/login");
        assert_eq!(sent[0].body, b"user=bob".to_vec());
        assert!(sent[0].no_follow_redirects);
        assert_eq!(sent[0].timeout, Duration::from_secs(10));
    }

    #[tokio::test]
    async fn test_empty_rule_list_is_rejection() {
        let transport = ScriptedTransport::ok(0, "");
        let mut pipeline = ProbePipeline::new(&transport);
        let mut ctx = context();
        assert!(!pipeline.execute(&mut ctx, vec![]).await.unwrap());
        assert_eq!(pipeline.state(), RunState::Rejected);
    }
}
