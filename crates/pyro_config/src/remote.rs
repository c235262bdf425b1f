//! Hosted Git repository URLs used as script sources.
//!
//! A folder or import entry may point at a directory in a hosted
//! repository instead of a local path. The fetched files live under the
//! project's temp directory at a path derived from the URL, so the rest of
//! the build treats them as ordinary local folders. Fetching is done
//! outside this crate.

use crate::error::ConfigError;

/// Supported remote hosts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemoteProvider {
    /// `github.com/<owner>/<repo>/tree/<branch>/<path>`
    GitHub,
    /// `api.github.com/repos/<owner>/<repo>/contents/<path>`
    GitHubApi,
    /// `bitbucket.org/<owner>/<repo>/src/<branch>/<path>`
    Bitbucket,
    /// `api.bitbucket.org/2.0/repositories/<owner>/<repo>/src/<branch>/<path>`
    BitbucketApi,
}

/// A parsed remote source URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteUrl {
    /// The host the URL belongs to.
    pub provider: RemoteProvider,
    /// The original URL.
    pub url: String,
    /// Repository owner.
    pub owner: String,
    /// Repository name.
    pub repo: String,
    /// Branch or ref, when the URL names one.
    pub branch: Option<String>,
    /// Path within the repository.
    pub path: Vec<String>,
    query: String,
}

impl RemoteProvider {
    /// Returns `true` if `s` looks like an HTTP(S) URL rather than a local path.
    pub fn is_remote(s: &str) -> bool {
        let lower = s.to_ascii_lowercase();
        lower.starts_with("https://") || lower.starts_with("http://")
    }

    fn from_host(host: &str) -> Option<Self> {
        match host.to_ascii_lowercase().as_str() {
            "github.com" => Some(RemoteProvider::GitHub),
            "api.github.com" => Some(RemoteProvider::GitHubApi),
            "bitbucket.org" => Some(RemoteProvider::Bitbucket),
            "api.bitbucket.org" => Some(RemoteProvider::BitbucketApi),
            _ => None,
        }
    }

    /// Parses a remote source URL.
    pub fn parse(url: &str) -> Result<RemoteUrl, ConfigError> {
        let unsupported = || ConfigError::UnsupportedRemote(url.to_string());

        let rest = url
            .split_once("://")
            .map(|(_, rest)| rest)
            .ok_or_else(unsupported)?;
        let (rest, query) = match rest.split_once('?') {
            Some((r, q)) => (r, q.to_string()),
            None => (rest, String::new()),
        };
        let (host, path) = rest.split_once('/').ok_or_else(unsupported)?;
        let provider = RemoteProvider::from_host(host).ok_or_else(unsupported)?;

        let mut parts: Vec<String> = path
            .split('/')
            .filter(|p| !p.is_empty())
            .map(str::to_string)
            .collect();

        // Strip the host-specific segments that are not part of the repository path.
        let branch = match provider {
            RemoteProvider::GitHub => {
                expect_segment(&parts, 2, "tree").ok_or_else(unsupported)?;
                let branch = parts.get(3).cloned().ok_or_else(unsupported)?;
                parts.remove(3);
                parts.remove(2);
                Some(branch)
            }
            RemoteProvider::GitHubApi => {
                expect_segment(&parts, 0, "repos").ok_or_else(unsupported)?;
                expect_segment(&parts, 3, "contents").ok_or_else(unsupported)?;
                parts.remove(3);
                parts.remove(0);
                None
            }
            RemoteProvider::Bitbucket => {
                expect_segment(&parts, 2, "src").ok_or_else(unsupported)?;
                let branch = parts.get(3).cloned().ok_or_else(unsupported)?;
                parts.remove(3);
                parts.remove(2);
                Some(branch)
            }
            RemoteProvider::BitbucketApi => {
                expect_segment(&parts, 0, "2.0").ok_or_else(unsupported)?;
                expect_segment(&parts, 1, "repositories").ok_or_else(unsupported)?;
                expect_segment(&parts, 4, "src").ok_or_else(unsupported)?;
                let branch = parts.get(5).cloned().ok_or_else(unsupported)?;
                parts.remove(5);
                parts.remove(4);
                parts.remove(1);
                parts.remove(0);
                Some(branch)
            }
        };

        if parts.len() < 2 {
            return Err(unsupported());
        }
        let owner = parts.remove(0);
        let repo = parts.remove(0);

        Ok(RemoteUrl {
            provider,
            url: url.to_string(),
            owner,
            repo,
            branch,
            path: parts,
            query,
        })
    }
}

fn expect_segment(parts: &[String], index: usize, name: &str) -> Option<()> {
    parts
        .get(index)
        .filter(|p| p.eq_ignore_ascii_case(name))
        .map(|_| ())
}

impl RemoteUrl {
    /// Returns the relative local directory the remote folder is fetched into:
    /// `<owner>/<repo>/<path...>`.
    pub fn local_path(&self) -> std::path::PathBuf {
        let mut p = std::path::PathBuf::from(&self.owner);
        p.push(&self.repo);
        for part in &self.path {
            p.push(part);
        }
        p
    }

    /// Returns the API URL a fetcher would request to list the folder.
    pub fn request_url(&self) -> String {
        match self.provider {
            RemoteProvider::GitHubApi | RemoteProvider::BitbucketApi => self.url.clone(),
            RemoteProvider::GitHub => {
                let mut url = format!(
                    "https://api.github.com/repos/{}/{}/contents",
                    self.owner, self.repo
                );
                for part in &self.path {
                    url.push('/');
                    url.push_str(part);
                }
                if let Some(branch) = &self.branch {
                    url.push_str("?ref=");
                    url.push_str(branch);
                }
                url
            }
            RemoteProvider::Bitbucket => {
                let mut url = format!(
                    "https://api.bitbucket.org/2.0/repositories/{}/{}/src",
                    self.owner, self.repo
                );
                if let Some(branch) = &self.branch {
                    url.push('/');
                    url.push_str(branch);
                }
                for part in &self.path {
                    url.push('/');
                    url.push_str(part);
                }
                if !self.query.is_empty() {
                    url.push('?');
                    url.push_str(&self.query);
                }
                url
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn detects_remote_urls() {
        assert!(RemoteProvider::is_remote("https://github.com/a/b"));
        assert!(RemoteProvider::is_remote("HTTP://bitbucket.org/a/b"));
        assert!(!RemoteProvider::is_remote("Scripts/Source"));
        assert!(!RemoteProvider::is_remote("C:\\Games\\Skyrim"));
    }

    #[test]
    fn github_tree_url() {
        let r = RemoteProvider::parse(
            "https://github.com/fireundubh/LibFire/tree/master/Scripts/Source",
        )
        .unwrap();
        assert_eq!(r.provider, RemoteProvider::GitHub);
        assert_eq!(r.owner, "fireundubh");
        assert_eq!(r.repo, "LibFire");
        assert_eq!(r.branch.as_deref(), Some("master"));
        assert_eq!(
            r.local_path(),
            PathBuf::from("fireundubh/LibFire/Scripts/Source")
        );
        assert_eq!(
            r.request_url(),
            "https://api.github.com/repos/fireundubh/LibFire/contents/Scripts/Source?ref=master"
        );
    }

    #[test]
    fn github_api_url() {
        let url = "https://api.github.com/repos/owner/repo/contents/Source/User";
        let r = RemoteProvider::parse(url).unwrap();
        assert_eq!(r.provider, RemoteProvider::GitHubApi);
        assert_eq!(r.local_path(), PathBuf::from("owner/repo/Source/User"));
        assert_eq!(r.request_url(), url);
        assert!(r.branch.is_none());
    }

    #[test]
    fn bitbucket_src_url() {
        let r = RemoteProvider::parse("https://bitbucket.org/owner/repo/src/main/Scripts").unwrap();
        assert_eq!(r.provider, RemoteProvider::Bitbucket);
        assert_eq!(r.local_path(), PathBuf::from("owner/repo/Scripts"));
        assert_eq!(
            r.request_url(),
            "https://api.bitbucket.org/2.0/repositories/owner/repo/src/main/Scripts"
        );
    }

    #[test]
    fn bitbucket_api_url() {
        let url = "https://api.bitbucket.org/2.0/repositories/owner/repo/src/dev/Scripts/Source";
        let r = RemoteProvider::parse(url).unwrap();
        assert_eq!(r.provider, RemoteProvider::BitbucketApi);
        assert_eq!(r.branch.as_deref(), Some("dev"));
        assert_eq!(r.local_path(), PathBuf::from("owner/repo/Scripts/Source"));
        assert_eq!(r.request_url(), url);
    }

    #[test]
    fn unsupported_host() {
        let err = RemoteProvider::parse("https://gitlab.com/owner/repo/-/tree/main").unwrap_err();
        assert!(matches!(err, ConfigError::UnsupportedRemote(_)));
    }

    #[test]
    fn github_url_without_tree_is_unsupported() {
        assert!(RemoteProvider::parse("https://github.com/owner/repo").is_err());
    }

    #[test]
    fn not_a_url() {
        assert!(RemoteProvider::parse("Scripts/Source").is_err());
    }
}
