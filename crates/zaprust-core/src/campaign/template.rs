//! Message templating: recipient placeholders and spintax

use chrono::Local;
use rand::Rng;
use regex::Regex;

/// Fill the recipient placeholders in a message template
///
/// `{name}` and `{first_name}` fall back to the phone number when the
/// recipient has no name on file. `{date}` renders the current local
/// day as dd/mm/yyyy.
pub fn render_template(template: &str, phone: &str, name: Option<&str>) -> String {
    let display = name
        .map(str::trim)
        .filter(|n| !n.is_empty())
        .unwrap_or(phone);
    let first = display.split_whitespace().next().unwrap_or(display);
    let date = Local::now().format("%d/%m/%Y").to_string();

    template
        .replace("{name}", display)
        .replace("{first_name}", first)
        .replace("{phone}", phone)
        .replace("{date}", &date)
}

/// Expand `{a|b|c}` alternatives, choosing uniformly at random
///
/// Innermost groups resolve first, so nested spintax reduces one level
/// per pass. A group with a single option just loses its braces.
pub fn resolve_spintax(text: &str) -> String {
    let Ok(group) = Regex::new(r"\{([^{}]+)\}") else {
        return text.to_string();
    };

    let mut current = text.to_string();
    let mut rng = rand::thread_rng();
    loop {
        let (range, replacement) = {
            let Some(caps) = group.captures(&current) else {
                break;
            };
            let whole = match caps.get(0) {
                Some(m) => m,
                None => break,
            };
            let inner = caps.get(1).map_or("", |m| m.as_str());
            let options: Vec<&str> = inner.split('|').collect();
            let choice = options[rng.gen_range(0..options.len())];
            (whole.range(), choice.to_string())
        };
        current.replace_range(range, &replacement);
    }
    current
}

/// Render the outbound message for one recipient
///
/// Placeholders resolve before spintax so `{name}` is never mistaken
/// for a single-option group.
pub fn render_message(template: &str, phone: &str, name: Option<&str>) -> String {
    resolve_spintax(&render_template(template, phone, name))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_placeholders_are_replaced() {
        let rendered = render_template(
            "Hi {name}, or just {first_name}? Reaching you at {phone}.",
            "5511999990000",
            Some("Maria Silva"),
        );
        assert_eq!(
            rendered,
            "Hi Maria Silva, or just Maria? Reaching you at 5511999990000."
        );
    }

    #[test]
    fn test_missing_name_falls_back_to_phone() {
        assert_eq!(
            render_template("{name}", "5511999990000", None),
            "5511999990000"
        );
        assert_eq!(
            render_template("{first_name}", "5511999990000", Some("   ")),
            "5511999990000"
        );
    }

    #[test]
    fn test_date_placeholder_uses_local_day() {
        let expected = Local::now().format("%d/%m/%Y").to_string();
        assert_eq!(render_template("{date}", "1", None), expected);
    }

    #[test]
    fn test_spintax_picks_one_option() {
        for _ in 0..50 {
            let out = resolve_spintax("{hello|hi|hey} there");
            assert!(
                out == "hello there" || out == "hi there" || out == "hey there",
                "unexpected expansion: {}",
                out
            );
        }
    }

    #[test]
    fn test_spintax_single_option_loses_braces() {
        assert_eq!(resolve_spintax("{only}"), "only");
    }

    #[test]
    fn test_spintax_without_groups_is_unchanged() {
        assert_eq!(resolve_spintax("plain text"), "plain text");
    }

    #[test]
    fn test_nested_spintax_reduces_inner_first() {
        for _ in 0..50 {
            let out = resolve_spintax("{a|{b|c}}");
            assert!(out == "a" || out == "b" || out == "c", "got {}", out);
        }
    }

    #[test]
    fn test_spintax_eventually_uses_every_option() {
        let mut seen = std::collections::HashSet::new();
        for _ in 0..200 {
            seen.insert(resolve_spintax("{a|b}"));
        }
        assert!(seen.contains("a") && seen.contains("b"));
    }

    #[test]
    fn test_render_message_keeps_placeholders_out_of_spintax() {
        for _ in 0..20 {
            let out = render_message("{Hi|Hello} {name}", "551199", Some("Ana"));
            assert!(out == "Hi Ana" || out == "Hello Ana", "got {}", out);
        }
    }
}
