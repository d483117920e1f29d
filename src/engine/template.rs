use crate::poc::Rule;
use super::params::ParameterSet;

/// Rewrite `{{name}}` placeholders in the rule's path, body and header values
/// with the default string form of each bound value. `path` and `body` are
/// trimmed first. Placeholders for unbound names are left as-is.
pub fn substitute_rule(rule: &mut Rule, params: &ParameterSet) {
    rule.path = rule.path.trim().to_string();
    rule.body = rule.body.trim().to_string();

    for (name, value) in params.iter() {
        let placeholder = format!("{{{{{}}}}}", name);
        let text = value.to_string();
        rule.path = rule.path.replace(&placeholder, &text);
        rule.body = rule.body.replace(&placeholder, &text);
        for header in rule.headers.values_mut() {
            *header = header.replace(&placeholder, &text);
        }
    }
}

/// Returns true if any `{{placeholder}}` survived substitution.
pub fn has_unresolved(rule: &Rule) -> bool {
    let re = regex::Regex::new(r"\{\{[A-Za-z_][A-Za-z0-9_]*\}\}").unwrap();
    re.is_match(&rule.path)
        || re.is_match(&rule.body)
        || rule.headers.values().any(|v| re.is_match(v))
}
