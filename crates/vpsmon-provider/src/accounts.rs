use lazy_static::lazy_static;
use regex::Regex;
use vpsmon_common::types::Account;

lazy_static! {
    static ref SEGMENT: Regex = Regex::new(r"\[([^=]+)=([^\]]+)\]").unwrap();
}

/// Parses the multi-account credential string into an ordered account list.
///
/// The format is one or more `[Name=Token]` segments; a string with no
/// segments is treated as a single bare token under the account name
/// `"Default"` for backward compatibility. Empty input yields an empty list,
/// not an error. Callers re-parse on every discovery cycle so credential
/// rotation takes effect without a restart.
pub fn parse_accounts(raw: &str) -> Vec<Account> {
    let mut accounts: Vec<Account> = SEGMENT
        .captures_iter(raw)
        .map(|cap| Account {
            name: cap[1].to_string(),
            token: cap[2].to_string(),
        })
        .collect();

    if accounts.is_empty() {
        let bare = raw.trim();
        if !bare.is_empty() {
            accounts.push(Account {
                name: "Default".to_string(),
                token: bare.to_string(),
            });
        }
    }

    accounts
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_multi_account_segments_in_order() {
        let accounts = parse_accounts("[A=tok1],[B=tok2]");
        assert_eq!(accounts.len(), 2);
        assert_eq!(accounts[0].name, "A");
        assert_eq!(accounts[0].token, "tok1");
        assert_eq!(accounts[1].name, "B");
        assert_eq!(accounts[1].token, "tok2");
    }

    #[test]
    fn bare_token_becomes_default_account() {
        let accounts = parse_accounts("  single-token  ");
        assert_eq!(accounts.len(), 1);
        assert_eq!(accounts[0].name, "Default");
        assert_eq!(accounts[0].token, "single-token");
    }

    #[test]
    fn empty_input_yields_empty_list() {
        assert!(parse_accounts("").is_empty());
        assert!(parse_accounts("   ").is_empty());
    }
}
