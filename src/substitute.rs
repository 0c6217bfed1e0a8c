//! `$NAME` substitution over already-tokenized words.

use crate::env::Environment;
use crate::vars::LocalVars;
use regex::{Captures, Regex};
use std::borrow::Cow;
use std::sync::LazyLock;

static VAR_REF: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\$([A-Za-z_][A-Za-z0-9_]*)").expect("variable reference pattern is valid")
});

/// Value of `name`: exported variables shadow local ones.
pub fn lookup<'a>(name: &str, env: &'a Environment, locals: &'a LocalVars) -> Option<&'a str> {
    env.get_var(name).or_else(|| locals.get(name))
}

/// Replace every `$NAME` in `word`. Unbound names expand to nothing; a `$`
/// that does not start a name is kept as is.
pub fn substitute<'w>(word: &'w str, env: &Environment, locals: &LocalVars) -> Cow<'w, str> {
    VAR_REF.replace_all(word, |caps: &Captures<'_>| {
        lookup(&caps[1], env, locals).unwrap_or_default().to_string()
    })
}

/// Substitute every word of an argument vector.
///
/// The result of a substitution is one argument, never re-split. A word that
/// referenced a variable and came out empty is dropped entirely.
pub fn expand_words(words: &[String], env: &Environment, locals: &LocalVars) -> Vec<String> {
    words
        .iter()
        .filter_map(|word| {
            let expanded = substitute(word, env, locals);
            match expanded {
                Cow::Borrowed(_) => Some(word.clone()),
                Cow::Owned(s) if s.is_empty() => None,
                Cow::Owned(s) => Some(s),
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fixture() -> (Environment, LocalVars) {
        let mut env = Environment::empty("/");
        env.set_var("HOME", "/home/user");
        env.set_var("SHARED", "from-env");
        let mut locals = LocalVars::new();
        locals.set("x", "/tmp");
        locals.set("SHARED", "from-local");
        (env, locals)
    }

    #[test]
    fn env_shadows_locals() {
        let (env, locals) = fixture();
        assert_eq!(substitute("$SHARED", &env, &locals), "from-env");
        assert_eq!(substitute("$x", &env, &locals), "/tmp");
    }

    #[test]
    fn references_inside_words() {
        let (env, locals) = fixture();
        assert_eq!(substitute("$HOME/bin", &env, &locals), "/home/user/bin");
        assert_eq!(substitute("a$x-b", &env, &locals), "a/tmp-b");
    }

    #[test]
    fn unbound_vanishes_and_bare_dollar_survives() {
        let (env, locals) = fixture();
        assert_eq!(substitute("pre$NOPE.post", &env, &locals), "pre.post");
        assert_eq!(substitute("$", &env, &locals), "$");
        assert_eq!(substitute("cost: $5", &env, &locals), "cost: $5");
    }

    #[test]
    fn values_are_not_resplit() {
        let (env, mut locals) = fixture();
        locals.set("two", "a b");
        let argv = expand_words(&["echo".into(), "$two".into()], &env, &locals);
        assert_eq!(argv, vec!["echo".to_string(), "a b".to_string()]);
    }

    #[test]
    fn empty_expansions_are_dropped() {
        let (env, locals) = fixture();
        let argv = expand_words(&["echo".into(), "$NOPE".into(), "x".into()], &env, &locals);
        assert_eq!(argv, vec!["echo".to_string(), "x".to_string()]);
    }
}
