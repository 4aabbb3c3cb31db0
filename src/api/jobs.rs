//! Replication jobs (`/api/jobs/replication`).

use anyhow::Result;
use serde::{Deserialize, Serialize};

use super::HarborClient;

/// Status filter values the server understands.
pub const JOB_STATUSES: &[&str] = &[
    "pending", "running", "error", "retrying", "stopped", "finished", "canceled",
];

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Job {
    pub id: i64,
    pub repository: String,
    pub policy_id: i64,
    pub operation: String,
    pub status: String,
    pub tags: Option<String>,
    pub creation_time: String,
    pub update_time: String,
}

impl Job {
    /// Repository as listed: `repo:tag` when the job is for one tag.
    pub fn display_repository(&self) -> String {
        match self.tags.as_deref().filter(|t| !t.is_empty()) {
            Some(tag) => format!("{}:{tag}", self.repository),
            None => self.repository.clone(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct JobFilter {
    pub policy_id: i64,
    pub repository: Option<String>,
    pub status: Option<String>,
    pub page: Option<i64>,
    pub page_size: Option<i64>,
}

impl JobFilter {
    pub fn query(&self) -> Vec<(&'static str, String)> {
        let mut query = vec![("policy_id", self.policy_id.to_string())];
        if let Some(repository) = &self.repository {
            query.push(("repository", repository.clone()));
        }
        if let Some(status) = &self.status {
            query.push(("status", status.clone()));
        }
        if let Some(page) = self.page {
            query.push(("page", page.to_string()));
        }
        if let Some(page_size) = self.page_size {
            query.push(("page_size", page_size.to_string()));
        }
        query
    }
}

pub struct JobManager<'a> {
    client: &'a HarborClient,
}

impl<'a> JobManager<'a> {
    pub fn new(client: &'a HarborClient) -> Self {
        Self { client }
    }

    /// Jobs of one policy, optionally filtered.
    pub fn list(&self, filter: &JobFilter) -> Result<Vec<Job>> {
        // The server answers `null` when nothing matches.
        let jobs: Option<Vec<Job>> = self.client.get_json("jobs/replication", &filter.query())?;
        Ok(jobs.unwrap_or_default())
    }

    pub fn get_log(&self, job_id: i64) -> Result<String> {
        self.client
            .get_text(&format!("jobs/replication/{job_id}/log"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn decodes_partial_records() {
        let jobs: Option<Vec<Job>> = serde_json::from_value(json!([
            {
                "id": 7,
                "repository": "library/nginx",
                "policy_id": 2,
                "operation": "transfer",
                "status": "finished",
                "tags": "1.25",
                "update_time": "2024-03-01T10:00:00Z"
            },
            { "id": 8, "repository": "library/redis", "tags": null }
        ]))
        .unwrap();
        let jobs = jobs.unwrap();
        assert_eq!(jobs[0].display_repository(), "library/nginx:1.25");
        assert_eq!(jobs[1].display_repository(), "library/redis");
        assert_eq!(jobs[1].status, "");

        let none: Option<Vec<Job>> = serde_json::from_value(json!(null)).unwrap();
        assert!(none.is_none());
    }

    #[test]
    fn empty_tag_is_not_appended() {
        let job = Job {
            repository: "library/alpine".into(),
            tags: Some(String::new()),
            ..Default::default()
        };
        assert_eq!(job.display_repository(), "library/alpine");
    }

    #[test]
    fn query_carries_only_given_filters() {
        let filter = JobFilter {
            policy_id: 3,
            status: Some("running".into()),
            page_size: Some(50),
            ..Default::default()
        };
        assert_eq!(
            filter.query(),
            vec![
                ("policy_id", "3".to_string()),
                ("status", "running".to_string()),
                ("page_size", "50".to_string()),
            ]
        );
    }
}
