//! Suspicious request patterns
//!
//! A fixed denylist checked against the raw request target (path and query).
//! Each entry is an independent [`Rule`] so it can be exercised on its own.

use crate::Result;
use regex::Regex;

/// One denylist entry
#[derive(Debug, Clone)]
pub enum Rule {
    /// Case-sensitive substring
    Literal { name: &'static str, needle: &'static str },
    /// Regular expression searched anywhere in the target
    Pattern { name: &'static str, regex: Regex },
    /// Target ends with `.<ext>` for one of the extensions (ASCII case-insensitive)
    Suffix { name: &'static str, extensions: &'static [&'static str] },
}

impl Rule {
    pub fn literal(name: &'static str, needle: &'static str) -> Self {
        Rule::Literal { name, needle }
    }

    pub fn pattern(name: &'static str, pattern: &str) -> Result<Self> {
        Ok(Rule::Pattern {
            name,
            regex: Regex::new(pattern)?,
        })
    }

    pub fn suffix(name: &'static str, extensions: &'static [&'static str]) -> Self {
        Rule::Suffix { name, extensions }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Rule::Literal { name, .. } | Rule::Pattern { name, .. } | Rule::Suffix { name, .. } => {
                *name
            }
        }
    }

    pub fn matches(&self, target: &str) -> bool {
        match self {
            Rule::Literal { needle, .. } => target.contains(needle),
            Rule::Pattern { regex, .. } => regex.is_match(target),
            Rule::Suffix { extensions, .. } => {
                let Some((_, ext)) = target.rsplit_once('.') else {
                    return false;
                };
                extensions.iter().any(|e| ext.eq_ignore_ascii_case(e))
            }
        }
    }
}

const DANGEROUS_EXTENSIONS: &[&str] = &["asp", "aspx", "jsp", "cgi", "exe", "bat", "cmd", "sh", "pl"];

/// The ordered denylist
#[derive(Debug, Clone)]
pub struct SuspiciousPatternSet {
    rules: Vec<Rule>,
}

impl SuspiciousPatternSet {
    /// Build from explicit rules
    pub fn new(rules: Vec<Rule>) -> Self {
        Self { rules }
    }

    /// The built-in scanner and exploit-probe denylist.
    pub fn standard() -> Result<Self> {
        let rules = vec![
            Rule::pattern(
                "scanner-tool",
                r"(?i)(nmap|nikto|wikto|sf|sqlmap|bsqlbf|w3af|acunetix|havij|appscan)",
            )?,
            Rule::pattern("dotfile", r"/\.[^/]*$")?,
            Rule::suffix("dangerous-extension", DANGEROUS_EXTENSIONS),
            Rule::pattern("etc-passwd", r"(?i)etc/passwd")?,
            Rule::pattern("etc-shadow", r"(?i)etc/shadow")?,
            Rule::pattern("proc-environ", r"(?i)proc/self/environ")?,
            Rule::pattern("traversal-dotdot", r"(?:/\.\.){2,}")?,
            Rule::pattern("admin", r"(?i)admin")?,
            Rule::pattern("password", r"(?i)password")?,
            Rule::pattern("login", r"(?i)login")?,
            Rule::pattern("command-separator", r";&|&&|\|\||;")?,
            Rule::pattern("network-tool", r"\bping\b|\bnetcat\b|\bnc\b|\btelnet\b|\bnetstat\b")?,
            Rule::pattern("fs-mutation", r"\bchmod\b|\bchown\b|\bchgrp\b|\bmkdir\b")?,
            Rule::pattern("code-include", r"(?i)(include|require)(_once)?\s*\(")?,
            Rule::pattern("upload-call", r"(?i)upload\s*\(")?,
            Rule::pattern("script-tag", r"<script.*?>")?,
            Rule::pattern("event-handler", r"(?i)on\w+\s*=")?,
            Rule::pattern("javascript-uri", r"(?i)javascript:")?,
            Rule::literal("phpmyadmin", "phpMyAdmin"),
            Rule::pattern("env-file", r".env")?,
            Rule::literal("cgi", "cgi"),
            Rule::literal("hnap", "HNAP"),
            Rule::pattern("conf-bin", r"conf.bin")?,
            Rule::literal("cgi-bin", "/cgi-bin/"),
            Rule::pattern("setup-cgi", r"setup.cgi")?,
            Rule::pattern("rm-rf", r"cmd=rm+-rf")?,
            Rule::pattern("wget", r"wget+http://")?,
            Rule::pattern("command-substitution", r"\$\(.*\)")?,
            Rule::literal("eval", "eval("),
            Rule::literal("base64-decode", "base64_decode("),
            Rule::pattern("traversal-dotdot-slash", r"(?:\.\./){2,}")?,
        ];
        Ok(Self::new(rules))
    }

    /// First rule that matches `target`, if any.
    pub fn find_match(&self, target: &str) -> Option<&Rule> {
        self.rules.iter().find(|rule| rule.matches(target))
    }

    pub fn is_suspicious(&self, target: &str) -> bool {
        self.find_match(target).is_some()
    }

    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rule(name: &str) -> Rule {
        SuspiciousPatternSet::standard()
            .unwrap()
            .rules()
            .iter()
            .find(|r| r.name() == name)
            .cloned()
            .unwrap_or_else(|| panic!("no rule named {}", name))
    }

    #[test]
    fn test_standard_set_compiles() {
        let set = SuspiciousPatternSet::standard().unwrap();
        assert_eq!(set.rules().len(), 31);
    }

    #[test]
    fn test_scanner_tool_is_case_insensitive() {
        let r = rule("scanner-tool");
        assert!(r.matches("/?ua=SQLMap"));
        assert!(r.matches("/nikto"));
        assert!(!r.matches("/random_image"));
    }

    #[test]
    fn test_dotfile_only_in_last_segment() {
        let r = rule("dotfile");
        assert!(r.matches("/.git"));
        assert!(r.matches("/static/.htaccess"));
        assert!(!r.matches("/.well-known/thing"));
    }

    #[test]
    fn test_dangerous_extension_suffix() {
        let r = rule("dangerous-extension");
        assert!(r.matches("/shell.php.ASPX"));
        assert!(r.matches("/run.sh"));
        assert!(!r.matches("/photo.jpg"));
        assert!(!r.matches("/no-extension"));
    }

    #[test]
    fn test_sensitive_files() {
        assert!(rule("etc-passwd").matches("/../../ETC/PASSWD"));
        assert!(rule("etc-shadow").matches("/x?f=/etc/shadow"));
        assert!(rule("proc-environ").matches("/proc/self/environ"));
    }

    #[test]
    fn test_traversal_needs_two_steps() {
        let r = rule("traversal-dotdot");
        assert!(r.matches("/a/../.."));
        assert!(!r.matches("/a/.."));
        assert!(rule("traversal-dotdot-slash").matches("/../../x"));
        assert!(!rule("traversal-dotdot-slash").matches("/../x"));
    }

    #[test]
    fn test_command_separators() {
        let r = rule("command-separator");
        assert!(r.matches("/x?a=1;ls"));
        assert!(r.matches("/x?a=1&&b"));
        assert!(r.matches("/x?a=1||b"));
        assert!(!r.matches("/x?a=1&b=2"));
    }

    #[test]
    fn test_network_tools_use_word_boundaries() {
        let r = rule("network-tool");
        assert!(r.matches("/x?cmd=ping"));
        assert!(r.matches("/bin/nc"));
        assert!(!r.matches("/sync"));
        assert!(!r.matches("/mapping"));
    }

    #[test]
    fn test_literals_are_case_sensitive() {
        assert!(rule("phpmyadmin").matches("/phpMyAdmin/index"));
        assert!(!rule("phpmyadmin").matches("/phpmyadmin/index"));
        assert!(rule("hnap").matches("/HNAP1/"));
        assert!(!rule("hnap").matches("/hnap1/"));
        assert!(rule("eval").matches("/?q=eval(x)"));
    }

    #[test]
    fn test_env_probe_matches_any_leading_char() {
        let r = rule("env-file");
        assert!(r.matches("/.env"));
        assert!(r.matches("/api/env"));
        assert!(r.matches("/environment"));
        assert!(!r.matches("/venue"));
    }

    #[test]
    fn test_injection_markers() {
        assert!(rule("script-tag").matches("/?q=<script src=x>"));
        assert!(rule("event-handler").matches("/?q=x onload=alert(1)"));
        assert!(rule("javascript-uri").matches("/?u=JavaScript:alert(1)"));
        assert!(rule("command-substitution").matches("/?q=$(id)"));
        assert!(rule("code-include").matches("/?q=require_once ("));
        assert!(rule("upload-call").matches("/?q=upload("));
    }

    #[test]
    fn test_rm_and_wget_probes() {
        assert!(rule("rm-rf").matches("/x?cmd=rm-rf"));
        assert!(rule("wget").matches("/x?c=wgethttp://evil"));
    }

    #[test]
    fn test_application_routes_are_clean() {
        let set = SuspiciousPatternSet::standard().unwrap();
        for target in [
            "/",
            "/favicon.ico",
            "/random_image",
            "/get_comments?image_path=foo.jpg",
            "/get_comments?image_path=unknown.jpg",
            "/add_comment",
            "/minecraft",
            "/download_modpack",
        ] {
            assert!(
                !set.is_suspicious(target),
                "{} matched {:?}",
                target,
                set.find_match(target).map(Rule::name)
            );
        }
    }

    #[test]
    fn test_find_match_reports_rule() {
        let set = SuspiciousPatternSet::standard().unwrap();
        assert_eq!(set.find_match("/wp-admin").map(Rule::name), Some("admin"));
    }
}
