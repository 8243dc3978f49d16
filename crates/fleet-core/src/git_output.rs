//! Reading the handful of facts the dashboard cares about out of porcelain
//! `git status`, `git branch` and `git remote -v` text.

/// Collapse `git status` output into `ahead` / `up-to-date` where possible,
/// otherwise return the trimmed output unchanged.
pub fn summarize_status(output: &str) -> String {
    let output = output.trim();
    if output.contains("Your branch is ahead") {
        "ahead".to_string()
    } else if output.contains("Your branch is up-to-date")
        || output.contains("Your branch is up to date")
    {
        "up-to-date".to_string()
    } else {
        output.to_string()
    }
}

/// The branch `git branch` marks with `*`.
pub fn current_branch(output: &str) -> Option<String> {
    output
        .lines()
        .find_map(|line| line.trim_start().strip_prefix("* "))
        .map(|b| b.trim().to_string())
}

/// Remote alias of the upstream named in `git status`, e.g. `origin` from
/// "Your branch is up to date with 'origin/main'."
pub fn tracking_remote(status_output: &str) -> Option<String> {
    let (_, after) = status_output.split_once("Your branch")?;
    let (_, quoted) = after.split_once('\'')?;
    let upstream = quoted.split('\'').next()?;
    let (remote, _) = upstream.split_once('/')?;
    if remote.is_empty() {
        None
    } else {
        Some(remote.to_string())
    }
}

/// Fetch URL for `remote` in `git remote -v` output: the first
/// whitespace-delimited field after the alias on its `(fetch)` line.
pub fn remote_fetch_url(remote_v_output: &str, remote: &str) -> Option<String> {
    remote_v_output.lines().find_map(|line| {
        let mut fields = line.split_whitespace();
        if fields.next()? != remote {
            return None;
        }
        let url = fields.next()?;
        (fields.next() == Some("(fetch)")).then(|| url.to_string())
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const UP_TO_DATE: &str = "On branch main\nYour branch is up to date with 'origin/main'.\n\nnothing to commit, working tree clean\n";
    const AHEAD: &str = "On branch dev\nYour branch is ahead of 'dashboard/dev' by 2 commits.\n";

    #[test]
    fn summarizes_common_states() {
        assert_eq!(summarize_status(UP_TO_DATE), "up-to-date");
        assert_eq!(
            summarize_status("Your branch is up-to-date with 'origin/main'."),
            "up-to-date"
        );
        assert_eq!(summarize_status(AHEAD), "ahead");
        assert_eq!(
            summarize_status("  HEAD detached at 1a2b3c\n"),
            "HEAD detached at 1a2b3c"
        );
    }

    #[test]
    fn finds_the_starred_branch() {
        let out = "  dev\n* main\n  feature/x\n";
        assert_eq!(current_branch(out).as_deref(), Some("main"));
        assert_eq!(current_branch("  dev\n"), None);
    }

    #[test]
    fn extracts_tracking_remote() {
        assert_eq!(tracking_remote(UP_TO_DATE).as_deref(), Some("origin"));
        assert_eq!(tracking_remote(AHEAD).as_deref(), Some("dashboard"));
        assert_eq!(tracking_remote("On branch main\nnothing to commit"), None);
    }

    #[test]
    fn picks_fetch_url_for_alias() {
        let out = "dashboard\thttps://git.example.com/r.git (fetch)\n\
                   dashboard\thttps://git.example.com/r.git (push)\n\
                   origin\tgit@github.com:org/robot.git (fetch)\n\
                   origin\tgit@github.com:org/robot.git (push)\n";
        assert_eq!(
            remote_fetch_url(out, "origin").as_deref(),
            Some("git@github.com:org/robot.git")
        );
        assert_eq!(
            remote_fetch_url(out, "dashboard").as_deref(),
            Some("https://git.example.com/r.git")
        );
        assert_eq!(remote_fetch_url(out, "upstream"), None);
    }

    #[test]
    fn fetch_url_accepts_space_separated_output() {
        let out = "origin  https://example.com/r.git  (fetch)";
        assert_eq!(
            remote_fetch_url(out, "origin").as_deref(),
            Some("https://example.com/r.git")
        );
    }
}
