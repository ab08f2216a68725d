/// Replace `${ENV_VAR}` placeholders in raw config text.
///
/// Unresolvable or unterminated placeholders are kept verbatim.
pub fn substitute_env(input: &str) -> String {
    substitute_env_with(input, |name| std::env::var(name).ok())
}

/// Placeholder substitution against an arbitrary lookup.
pub fn substitute_env_with(input: &str, lookup: impl Fn(&str) -> Option<String>) -> String {
    let mut out = String::with_capacity(input.len());
    let mut rest = input;

    while let Some(start) = rest.find("${") {
        out.push_str(&rest[..start]);
        let after = &rest[start + 2..];
        let Some(end) = after.find('}') else {
            out.push_str(&rest[start..]);
            return out;
        };
        let name = &after[..end];
        match (!name.is_empty()).then(|| lookup(name)).flatten() {
            Some(value) => out.push_str(&value),
            None => out.push_str(&rest[start..start + 2 + end + 1]),
        }
        rest = &after[end + 1..];
    }

    out.push_str(rest);
    out
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use {super::*, rstest::rstest};

    fn lookup(name: &str) -> Option<String> {
        match name {
            "OPENROUTER_API_KEY" => Some("sk-or-1".into()),
            "PORT" => Some("9000".into()),
            _ => None,
        }
    }

    #[rstest]
    #[case("api_key = \"${OPENROUTER_API_KEY}\"", "api_key = \"sk-or-1\"")]
    #[case("${PORT}${PORT}", "90009000")]
    #[case("keep ${CHORUS_MISSING} as is", "keep ${CHORUS_MISSING} as is")]
    #[case("empty ${} stays", "empty ${} stays")]
    #[case("unterminated ${PORT", "unterminated ${PORT")]
    #[case("plain text", "plain text")]
    fn substitutes_placeholders(#[case] input: &str, #[case] expected: &str) {
        assert_eq!(substitute_env_with(input, lookup), expected);
    }
}
