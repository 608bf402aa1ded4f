use std::sync::OnceLock;

use regex::Regex;

/// Placeholder shown for missing values, masked or not.
pub const EMPTY_PLACEHOLDER: &str = "—";

const MASK_MARKER: &str = "***";

fn email_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"[a-zA-Z0-9._%+-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,}").expect("email pattern")
    })
}

fn phone_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\+?\d[\d\s-]{8,}\d|\d{10,}").expect("phone pattern"))
}

/// Masks a phone number so only the last 3 digits stay visible. The
/// asterisk run is capped at 8 so long numbers do not stretch the column.
/// `917535834008` becomes `********008`.
pub fn mask_phone(raw: &str) -> String {
    let digits: String = raw.chars().filter(|c| c.is_ascii_digit()).collect();
    if digits.len() < 4 {
        return MASK_MARKER.to_string();
    }
    let visible = &digits[digits.len() - 3..];
    let stars = (digits.len() - 3).min(8);
    format!("{}{}", "*".repeat(stars), visible)
}

/// Masks an email to the first 2 characters of the local part (1 when the
/// local part has at most 2), then `***` and the untouched domain.
/// `user@example.com` becomes `us***@example.com`.
pub fn mask_email(raw: &str) -> String {
    let trimmed = raw.trim();
    let Some(at) = trimmed.find('@') else {
        return format!("{MASK_MARKER}@{MASK_MARKER}");
    };
    if at == 0 {
        return format!("{MASK_MARKER}@{MASK_MARKER}");
    }
    let (local, domain) = trimmed.split_at(at);
    let keep = if local.chars().count() <= 2 { 1 } else { 2 };
    let visible: String = local.chars().take(keep).collect();
    format!("{visible}{MASK_MARKER}{domain}")
}

/// Scrubs free text: email-shaped substrings first, then phone-shaped
/// digit runs, each replaced by its masked form.
pub fn mask_pii_text(raw: &str) -> String {
    let pass_one = email_regex().replace_all(raw, |caps: &regex::Captures<'_>| {
        mask_email(caps.get(0).map_or("", |m| m.as_str()))
    });
    phone_regex()
        .replace_all(&pass_one, |caps: &regex::Captures<'_>| {
            mask_phone(caps.get(0).map_or("", |m| m.as_str()))
        })
        .into_owned()
}

/// Display policy for one resolved user: applies the masking transforms
/// only when the access list says so. Blank input always renders as the
/// em-dash placeholder, never as masked output.
#[derive(Debug, Clone, Copy)]
pub struct MaskedView {
    pub should_mask: bool,
}

impl MaskedView {
    pub fn new(should_mask: bool) -> Self {
        MaskedView { should_mask }
    }

    pub fn phone(&self, raw: &str) -> String {
        if raw.trim().is_empty() {
            return EMPTY_PLACEHOLDER.to_string();
        }
        if self.should_mask {
            mask_phone(raw)
        } else {
            raw.to_string()
        }
    }

    pub fn email(&self, raw: &str) -> String {
        if raw.trim().is_empty() {
            return EMPTY_PLACEHOLDER.to_string();
        }
        if self.should_mask {
            mask_email(raw)
        } else {
            raw.to_string()
        }
    }

    pub fn text(&self, raw: &str) -> String {
        if self.should_mask {
            mask_pii_text(raw)
        } else {
            raw.to_string()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn phone_keeps_last_three_digits_behind_asterisks() {
        let masked = mask_phone("917535834008");
        assert_eq!(masked, "********008");
        assert!(masked.ends_with("008"));
        assert!(masked[..masked.len() - 3].chars().all(|c| c == '*'));
    }

    #[test]
    fn phone_strips_formatting_before_masking() {
        assert_eq!(mask_phone("+91-7376 677 667"), "********667");
    }

    #[test]
    fn short_numbers_collapse_to_the_marker() {
        assert_eq!(mask_phone("911"), "***");
        assert_eq!(mask_phone("no digits"), "***");
    }

    #[test]
    fn asterisk_run_is_capped() {
        let masked = mask_phone("123456789012345678");
        assert_eq!(masked, "********678");
    }

    #[test]
    fn email_keeps_two_chars_and_the_domain() {
        assert_eq!(mask_email("user@example.com"), "us***@example.com");
    }

    #[test]
    fn short_local_part_keeps_one_char() {
        assert_eq!(mask_email("ab@example.com"), "a***@example.com");
        assert_eq!(mask_email("a@example.com"), "a***@example.com");
    }

    #[test]
    fn malformed_email_becomes_fixed_placeholder() {
        assert_eq!(mask_email("not-an-email"), "***@***");
        assert_eq!(mask_email("@example.com"), "***@***");
    }

    #[test]
    fn text_scrub_hits_emails_and_phone_runs() {
        let scrubbed =
            mask_pii_text("Reach kiran@example.com or call 917535834008 before Friday");
        assert_eq!(
            scrubbed,
            "Reach ki***@example.com or call ********008 before Friday"
        );
    }

    #[test]
    fn text_without_pii_is_untouched() {
        let text = "Followed up on course options";
        assert_eq!(mask_pii_text(text), text);
    }

    #[test]
    fn view_masks_only_when_told_to() {
        let masked = MaskedView::new(true);
        let open = MaskedView::new(false);
        assert_eq!(masked.phone("917535834008"), "********008");
        assert_eq!(open.phone("917535834008"), "917535834008");
        assert_eq!(masked.phone("  "), EMPTY_PLACEHOLDER);
        assert_eq!(open.email(""), EMPTY_PLACEHOLDER);
    }
}
