//! Input checks applied to a reconfiguration request before any git command runs.

use crate::error::ValidationError;
use regex::Regex;
use std::sync::OnceLock;
use url::Url;

/// Accept only absolute URLs that carry both a scheme and a host.
///
/// `url` happily parses things like `mailto:x` or `file:///path`; neither has
/// a network location, so both are refused here.
pub fn check_remote_url(remote: &str) -> Result<(), ValidationError> {
    let ok = match Url::parse(remote) {
        Ok(url) => !url.scheme().is_empty() && url.host_str().is_some_and(|h| !h.is_empty()),
        Err(_) => false,
    };
    if ok {
        Ok(())
    } else {
        Err(ValidationError::InvalidRemote(remote.to_string()))
    }
}

fn branch_rules() -> &'static [(Regex, &'static str)] {
    static RULES: OnceLock<Vec<(Regex, &'static str)>> = OnceLock::new();
    RULES.get_or_init(|| {
        [
            (r"[\x00-\x1f\x7f]", "contains a control character"),
            (r"[~^:?*\[\\]", "contains one of ~ ^ : ? * [ \\"),
            (r"\.\.", "contains '..'"),
            (r"//", "contains '//'"),
            (r"@\{", "contains '@{'"),
            (r"\.$", "ends with '.'"),
            (r"\.lock$", "ends with '.lock'"),
            (r"^/", "starts with '/'"),
            (r"/$", "ends with '/'"),
            (r"^-", "starts with '-'"),
            (r"^@$", "is exactly '@'"),
            (r"\s", "contains whitespace"),
        ]
        .into_iter()
        .map(|(pattern, reason)| (Regex::new(pattern).expect("valid branch rule"), reason))
        .collect()
    })
}

/// Check a branch name against git's reference-name rules.
pub fn check_branch_name(branch: &str) -> Result<(), ValidationError> {
    if branch.is_empty() {
        return Err(ValidationError::InvalidBranch {
            branch: String::new(),
            reason: "is empty",
        });
    }
    for (rule, reason) in branch_rules() {
        if rule.is_match(branch) {
            return Err(ValidationError::InvalidBranch {
                branch: branch.to_string(),
                reason,
            });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_network_urls() {
        assert!(check_remote_url("https://example.com/r.git").is_ok());
        assert!(check_remote_url("http://10.0.0.4:3000/team/robot.git").is_ok());
        assert!(check_remote_url("ssh://git@github.com/org/repo.git").is_ok());
    }

    #[test]
    fn rejects_urls_without_network_location() {
        for bad in ["not-a-url", "/local/path", "", "file:///srv/repo.git", "mailto:ops@example.com"] {
            assert!(check_remote_url(bad).is_err(), "{bad:?} should be rejected");
        }
    }

    #[test]
    fn accepts_ordinary_branches() {
        for ok in ["main", "feature/lidar-fusion", "release-1.2", "v2_fix", "a.b"] {
            assert!(check_branch_name(ok).is_ok(), "{ok:?} should be accepted");
        }
    }

    #[test]
    fn rejects_documented_bad_branches() {
        for bad in [
            "feature/..",
            "-x",
            "-",
            "a..b",
            "bad branch",
            "@",
            "x.lock",
            "../evil",
            "",
            "/lead",
            "trail/",
            "dot.",
            "a//b",
            "ref@{1}",
            "tab\there",
            "bell\x07",
            "what?",
            "star*",
            "col:on",
            "tilde~1",
            "caret^",
            "br[acket",
            "back\\slash",
        ] {
            assert!(check_branch_name(bad).is_err(), "{bad:?} should be rejected");
        }
    }

    #[test]
    fn rejection_names_the_rule() {
        let err = check_branch_name("x.lock").unwrap_err();
        assert_eq!(
            err,
            ValidationError::InvalidBranch {
                branch: "x.lock".into(),
                reason: "ends with '.lock'"
            }
        );
    }
}
