use crate::core::models::{MailboxInfo, SpecialUse};

/// 邮箱角色 - 按 special-use 标记或按名称查找
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MailboxRole {
    SpecialUse(SpecialUse),
    Named(String),
}

impl MailboxRole {
    pub fn label(&self) -> String {
        match self {
            MailboxRole::SpecialUse(tag) => format!("{:?}", tag).to_lowercase(),
            MailboxRole::Named(name) => name.clone(),
        }
    }
}

/// Find the mailbox for a role in a server listing.
///
/// Special-use roles match the server tag exactly. Named roles match the
/// display name case-insensitively, falling back to a contains match.
/// First match wins in listing order; the listing is never sorted.
/// Absence is `None`, not an error — callers decide whether it is fatal.
pub fn resolve<'a>(role: &MailboxRole, listing: &'a [MailboxInfo]) -> Option<&'a MailboxInfo> {
    match role {
        MailboxRole::SpecialUse(tag) => listing.iter().find(|m| m.special_use == Some(*tag)),
        MailboxRole::Named(name) => {
            let wanted = name.to_lowercase();
            listing
                .iter()
                .find(|m| m.name.to_lowercase() == wanted)
                .or_else(|| {
                    listing
                        .iter()
                        .find(|m| m.name.to_lowercase().contains(&wanted))
                })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mailbox(name: &str, special_use: Option<SpecialUse>) -> MailboxInfo {
        MailboxInfo {
            name: name.to_string(),
            special_use,
        }
    }

    #[test]
    fn test_named_case_insensitive_match() {
        let listing = vec![
            mailbox("INBOX", Some(SpecialUse::Inbox)),
            mailbox("Receipts", None),
        ];

        let found = resolve(&MailboxRole::Named("receipts".to_string()), &listing).unwrap();
        assert_eq!(found.name, "Receipts");
    }

    #[test]
    fn test_named_match_ignores_listing_order() {
        let listing = vec![
            mailbox("RECEIPTS", None),
            mailbox("INBOX", Some(SpecialUse::Inbox)),
        ];

        let found = resolve(&MailboxRole::Named("receipts".to_string()), &listing).unwrap();
        assert_eq!(found.name, "RECEIPTS");
    }

    #[test]
    fn test_named_exact_match_beats_contains() {
        let listing = vec![mailbox("Old Receipts", None), mailbox("receipts", None)];

        let found = resolve(&MailboxRole::Named("Receipts".to_string()), &listing).unwrap();
        assert_eq!(found.name, "receipts");
    }

    #[test]
    fn test_named_contains_fallback_first_wins() {
        let listing = vec![
            mailbox("Receipts 2024", None),
            mailbox("Receipts 2025", None),
        ];

        let found = resolve(&MailboxRole::Named("receipts".to_string()), &listing).unwrap();
        assert_eq!(found.name, "Receipts 2024");
    }

    #[test]
    fn test_named_no_match_is_none() {
        let listing = vec![
            mailbox("INBOX", Some(SpecialUse::Inbox)),
            mailbox("Sent", Some(SpecialUse::Sent)),
        ];

        assert!(resolve(&MailboxRole::Named("receipts".to_string()), &listing).is_none());
    }

    #[test]
    fn test_special_use_exact_match() {
        let listing = vec![
            mailbox("All Mail", Some(SpecialUse::Archive)),
            mailbox("Boîte de réception", Some(SpecialUse::Inbox)),
        ];

        let found = resolve(&MailboxRole::SpecialUse(SpecialUse::Inbox), &listing).unwrap();
        assert_eq!(found.name, "Boîte de réception");
    }

    #[test]
    fn test_special_use_no_tag_is_none() {
        let listing = vec![mailbox("INBOX", None)];
        assert!(resolve(&MailboxRole::SpecialUse(SpecialUse::Trash), &listing).is_none());
    }
}
