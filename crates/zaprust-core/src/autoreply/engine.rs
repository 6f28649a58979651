//! Inbound auto-reply engine

use chrono::{Local, NaiveTime, Timelike};
use regex::RegexBuilder;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};
use zaprust_common::types::Severity;
use zaprust_storage::{MatchType, ReplyRule, ReplyRuleRepository};

use crate::activity::ActivityRecorder;
use crate::dispatch::{DispatchGateway, SendOptions};
use crate::events::InboundMessage;

const REGEX_SIZE_LIMIT: usize = 1 << 20;

/// Matches inbound messages against reply rules and fires responses
#[derive(Clone)]
pub struct ReplyRuleEngine {
    rules: ReplyRuleRepository,
    gateway: DispatchGateway,
    activity: ActivityRecorder,
}

impl ReplyRuleEngine {
    pub fn new(
        rules: ReplyRuleRepository,
        gateway: DispatchGateway,
        activity: ActivityRecorder,
    ) -> Self {
        Self {
            rules,
            gateway,
            activity,
        }
    }

    /// Consume inbound messages until shutdown or the channel closes
    pub async fn run(self, mut inbound: mpsc::Receiver<InboundMessage>, shutdown: CancellationToken) {
        info!("Reply engine started");
        loop {
            tokio::select! {
                _ = shutdown.cancelled() => break,
                message = inbound.recv() => {
                    match message {
                        Some(message) => self.handle_message(message).await,
                        None => break,
                    }
                }
            }
        }
        info!("Reply engine stopped");
    }

    async fn handle_message(&self, message: InboundMessage) {
        if message.chat == "status@broadcast" || message.body.trim().is_empty() {
            return;
        }

        let rules = match self.rules.active_rules(message.account_id).await {
            Ok(rules) => rules,
            Err(e) => {
                error!(account_id = %message.account_id, "Failed to load reply rules: {}", e);
                return;
            }
        };
        if rules.is_empty() {
            return;
        }

        let is_group = message.chat.ends_with("@g.us");
        let Some(rule) = select_rule(&rules, &message.body, is_group, Local::now().time()) else {
            return;
        };
        debug!(rule = %rule.name.as_deref().unwrap_or(""), chat = %message.chat, "Reply rule matched");

        // fire on a separate task so a delayed reply does not hold up
        // the inbound queue
        let engine = self.clone();
        let rule = rule.clone();
        tokio::spawn(async move { engine.fire(rule, message).await });
    }

    async fn fire(&self, rule: ReplyRule, message: InboundMessage) {
        if rule.delay_secs > 0 {
            tokio::time::sleep(Duration::from_secs(rule.delay_secs as u64)).await;
        }

        let options = SendOptions {
            media_path: rule.media_path.clone(),
            skip_typing: false,
        };
        match self
            .gateway
            .send_direct(message.account_id, &message.chat, &rule.response, &options)
            .await
        {
            Ok(()) => {
                self.activity
                    .record(
                        Severity::Info,
                        "auto_reply",
                        format!(
                            "Rule {} replied in {}",
                            rule.name.as_deref().unwrap_or(""),
                            message.chat
                        ),
                        Some(message.account_id),
                        None,
                    )
                    .await;
            }
            Err(e) => {
                warn!(rule = %rule.name.as_deref().unwrap_or(""), chat = %message.chat, "Auto reply failed: {}", e)
            }
        }
    }
}

/// First rule that matches, in stored priority order
pub fn select_rule<'a>(
    rules: &'a [ReplyRule],
    body: &str,
    is_group: bool,
    now: NaiveTime,
) -> Option<&'a ReplyRule> {
    rules.iter().find(|rule| {
        let scope_ok = if is_group {
            rule.apply_group
        } else {
            rule.apply_private
        };
        scope_ok
            && in_time_window(rule.start_time, rule.end_time, now)
            && trigger_matches(
                rule.match_type_enum().unwrap_or(MatchType::Contains),
                &rule.trigger_text,
                body,
            )
    })
}

/// Inclusive minute-of-day window; a start after the end wraps past
/// midnight. Missing bounds leave the rule always active.
pub fn in_time_window(start: Option<NaiveTime>, end: Option<NaiveTime>, now: NaiveTime) -> bool {
    let (Some(start), Some(end)) = (start, end) else {
        return true;
    };
    let cur = now.hour() * 60 + now.minute();
    let start_m = start.hour() * 60 + start.minute();
    let end_m = end.hour() * 60 + end.minute();
    if start_m <= end_m {
        (start_m..=end_m).contains(&cur)
    } else {
        cur >= start_m || cur <= end_m
    }
}

/// Case-insensitive trigger evaluation
///
/// A regex trigger that fails to compile matches nothing.
pub fn trigger_matches(match_type: MatchType, trigger: &str, body: &str) -> bool {
    match match_type {
        MatchType::Exact => body.trim().to_lowercase() == trigger.trim().to_lowercase(),
        MatchType::Contains => body.to_lowercase().contains(&trigger.to_lowercase()),
        MatchType::Regex => match RegexBuilder::new(trigger)
            .case_insensitive(true)
            .size_limit(REGEX_SIZE_LIMIT)
            .build()
        {
            Ok(re) => re.is_match(body),
            Err(e) => {
                warn!(trigger, "Invalid reply rule regex: {}", e);
                false
            }
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use uuid::Uuid;

    fn rule(trigger: &str, match_type: MatchType, priority: i32) -> ReplyRule {
        ReplyRule {
            id: Uuid::new_v4(),
            account_id: Uuid::new_v4(),
            name: Some(format!("rule-{}", trigger)),
            trigger_text: trigger.to_string(),
            match_type: match_type.to_string(),
            response: "auto response".to_string(),
            media_path: None,
            priority,
            delay_secs: 0,
            apply_group: false,
            apply_private: true,
            start_time: None,
            end_time: None,
            is_active: true,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn t(s: &str) -> NaiveTime {
        s.parse().unwrap()
    }

    #[test]
    fn test_contains_is_case_insensitive() {
        assert!(trigger_matches(MatchType::Contains, "Preço", "qual o PREÇO disso?"));
        assert!(!trigger_matches(MatchType::Contains, "preço", "quanto custa?"));
    }

    #[test]
    fn test_exact_trims_and_ignores_case() {
        assert!(trigger_matches(MatchType::Exact, "menu", "  MENU  "));
        assert!(!trigger_matches(MatchType::Exact, "menu", "menu please"));
    }

    #[test]
    fn test_regex_matches_pattern() {
        assert!(trigger_matches(MatchType::Regex, r"or[cç]amento", "quero um orçamento"));
        assert!(!trigger_matches(MatchType::Regex, r"^oi$", "oi tudo bem"));
    }

    #[test]
    fn test_invalid_regex_matches_nothing() {
        assert!(!trigger_matches(MatchType::Regex, "(", "anything ("));
    }

    #[test]
    fn test_window_inclusive_bounds() {
        let (start, end) = (Some(t("09:00:00")), Some(t("18:00:00")));
        assert!(in_time_window(start, end, t("09:00:00")));
        assert!(in_time_window(start, end, t("12:30:00")));
        assert!(in_time_window(start, end, t("18:00:59")));
        assert!(!in_time_window(start, end, t("08:59:00")));
        assert!(!in_time_window(start, end, t("18:01:00")));
    }

    #[test]
    fn test_window_wraps_past_midnight() {
        let (start, end) = (Some(t("22:00:00")), Some(t("06:00:00")));
        assert!(in_time_window(start, end, t("23:30:00")));
        assert!(in_time_window(start, end, t("02:00:00")));
        assert!(!in_time_window(start, end, t("12:00:00")));
    }

    #[test]
    fn test_missing_window_is_always_active() {
        assert!(in_time_window(None, None, t("03:00:00")));
        assert!(in_time_window(Some(t("09:00:00")), None, t("03:00:00")));
    }

    #[test]
    fn test_select_rule_takes_first_match_in_order() {
        // the repository returns rules already sorted by priority
        let rules = vec![
            rule("bom dia", MatchType::Exact, 10),
            rule("dia", MatchType::Contains, 5),
        ];
        let selected = select_rule(&rules, "bom dia", false, t("12:00:00")).unwrap();
        assert_eq!(selected.priority, 10);

        let selected = select_rule(&rules, "que dia lindo", false, t("12:00:00")).unwrap();
        assert_eq!(selected.priority, 5);
    }

    #[test]
    fn test_select_rule_respects_chat_scope() {
        let mut group_only = rule("oi", MatchType::Contains, 0);
        group_only.apply_group = true;
        group_only.apply_private = false;
        let rules = vec![group_only];

        assert!(select_rule(&rules, "oi", true, t("12:00:00")).is_some());
        assert!(select_rule(&rules, "oi", false, t("12:00:00")).is_none());
    }

    #[test]
    fn test_select_rule_respects_time_window() {
        let mut after_hours = rule("oi", MatchType::Contains, 0);
        after_hours.start_time = Some(t("18:00:00"));
        after_hours.end_time = Some(t("08:00:00"));
        let rules = vec![after_hours];

        assert!(select_rule(&rules, "oi", false, t("20:00:00")).is_some());
        assert!(select_rule(&rules, "oi", false, t("12:00:00")).is_none());
    }
}
