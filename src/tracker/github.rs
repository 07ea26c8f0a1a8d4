//! GitHub code-scanning implementation of the findings tracker

use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;

use super::FindingsTracker;
use crate::error::{Result, SentinelError};
use crate::http::{bearer, blocking, build_agent, decode};
use crate::{severity_score, ClaimState, Finding, FindingId, Location, RepoRef};

const API_VERSION: &str = "2022-11-28";
const PAGE_SIZE: usize = 100;

/// Code-scanning alerts API client
#[derive(Clone)]
pub struct GitHubTracker {
    base_url: String,
    token: String,
    client: ureq::Agent,
}

impl GitHubTracker {
    pub fn new(base_url: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            token: token.into(),
            client: build_agent(Duration::from_secs(30)),
        }
    }

    fn alerts_url(&self, repo: &RepoRef) -> String {
        format!(
            "{}/repos/{}/{}/code-scanning/alerts",
            self.base_url, repo.owner, repo.name
        )
    }

    fn alert_url(&self, repo: &RepoRef, id: FindingId) -> String {
        format!("{}/{}", self.alerts_url(repo), id)
    }

    fn get(&self, url: &str) -> ureq::Request {
        self.authorize(self.client.get(url))
    }

    fn patch(&self, url: &str) -> ureq::Request {
        self.authorize(self.client.patch(url))
    }

    fn authorize(&self, request: ureq::Request) -> ureq::Request {
        request
            .set("Accept", "application/vnd.github+json")
            .set("Authorization", &bearer(&self.token))
            .set("X-GitHub-Api-Version", API_VERSION)
    }
}

#[derive(Debug, Deserialize)]
struct AlertWire {
    number: FindingId,
    #[serde(default)]
    state: String,
    #[serde(default)]
    assignees: Vec<serde_json::Value>,
    #[serde(default)]
    rule: RuleWire,
    #[serde(default)]
    most_recent_instance: Option<InstanceWire>,
}

#[derive(Debug, Default, Deserialize)]
struct RuleWire {
    id: Option<String>,
    security_severity_level: Option<String>,
    severity: Option<String>,
}

#[derive(Debug, Deserialize)]
struct InstanceWire {
    location: Option<LocationWire>,
}

#[derive(Debug, Deserialize)]
struct LocationWire {
    path: Option<String>,
    start_line: Option<u32>,
}

impl AlertWire {
    fn into_finding(self) -> Option<Finding> {
        let rule_id = self.rule.id?;
        let severity = self
            .rule
            .security_severity_level
            .as_deref()
            .and_then(severity_score)
            .or_else(|| self.rule.severity.as_deref().and_then(severity_score))
            .unwrap_or(0.0);
        let location = self
            .most_recent_instance
            .and_then(|i| i.location)
            .and_then(|l| {
                let path = l.path?;
                Some(Location::new(normalize_path(&path), l.start_line))
            });
        let claim_state = if self.state == "dismissed" {
            ClaimState::Dismissed
        } else if self.assignees.is_empty() {
            ClaimState::Unassigned
        } else {
            ClaimState::Claimed
        };

        Some(Finding {
            id: self.number,
            rule_id,
            location,
            source: None,
            sink: None,
            severity,
            claim_state,
        })
    }
}

/// Strip leading `./` and `/` so tracker and report paths compare equal
fn normalize_path(path: &str) -> String {
    path.trim_start_matches("./").trim_start_matches('/').to_string()
}

#[async_trait]
impl FindingsTracker for GitHubTracker {
    async fn list_open_unassigned(&self, repo: &RepoRef) -> Result<Vec<Finding>> {
        let this = self.clone();
        let url = self.alerts_url(repo);

        blocking(move || {
            let mut findings = Vec::new();
            let mut page = 1usize;
            loop {
                let response = this
                    .get(&url)
                    .query("state", "open")
                    .query("assignees", "none")
                    .query("per_page", &PAGE_SIZE.to_string())
                    .query("page", &page.to_string())
                    .call()?;
                let alerts: Vec<AlertWire> = decode(response)?;
                let fetched = alerts.len();
                findings.extend(alerts.into_iter().filter_map(AlertWire::into_finding));

                if fetched < PAGE_SIZE {
                    break;
                }
                page += 1;
            }
            tracing::debug!("Fetched {} open unassigned findings", findings.len());
            Ok(findings)
        })
        .await
    }

    async fn set_assignees(
        &self,
        repo: &RepoRef,
        id: FindingId,
        assignees: &[String],
    ) -> Result<()> {
        let this = self.clone();
        let url = self.alert_url(repo, id);
        let body = json!({ "assignees": assignees });

        blocking(move || {
            this.patch(&url).send_json(body)?;
            Ok(())
        })
        .await
    }

    async fn dismiss(&self, repo: &RepoRef, id: FindingId, reason: &str) -> Result<()> {
        let this = self.clone();
        let url = self.alert_url(repo, id);
        let body = json!({ "state": "dismissed", "dismissed_reason": reason });

        blocking(move || {
            this.patch(&url).send_json(body)?;
            Ok(())
        })
        .await
    }

    async fn authenticated_login(&self) -> Result<String> {
        let this = self.clone();
        let url = format!("{}/user", self.base_url);

        blocking(move || {
            #[derive(Deserialize)]
            struct Response {
                login: Option<String>,
            }

            let response: Response = decode(this.get(&url).call()?)?;
            response
                .login
                .ok_or_else(|| SentinelError::Decode("'login' field not in response".to_string()))
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn alert_maps_to_finding() {
        let alert: AlertWire = serde_json::from_str(
            r#"{
                "number": 42,
                "state": "open",
                "assignees": [],
                "rule": {"id": "py/sql-injection", "security_severity_level": "critical", "severity": "error"},
                "most_recent_instance": {"location": {"path": "./app/db.py", "start_line": 17}}
            }"#,
        )
        .unwrap();

        let finding = alert.into_finding().unwrap();
        assert_eq!(finding.id, 42);
        assert_eq!(finding.rule_id, "py/sql-injection");
        assert_eq!(finding.severity, 9.0);
        assert_eq!(finding.location, Some(Location::new("app/db.py", Some(17))));
        assert_eq!(finding.claim_state, ClaimState::Unassigned);
    }

    #[test]
    fn assigned_alert_without_security_level_uses_rule_severity() {
        let alert: AlertWire = serde_json::from_str(
            r#"{
                "number": 7,
                "state": "open",
                "assignees": [{"login": "sentinel-bot"}],
                "rule": {"id": "js/xss", "severity": "warning"}
            }"#,
        )
        .unwrap();

        let finding = alert.into_finding().unwrap();
        assert_eq!(finding.severity, 5.0);
        assert_eq!(finding.location, None);
        assert_eq!(finding.claim_state, ClaimState::Claimed);
    }

    #[test]
    fn alert_without_rule_is_dropped() {
        let alert: AlertWire = serde_json::from_str(r#"{"number": 1}"#).unwrap();
        assert!(alert.into_finding().is_none());
    }
}
