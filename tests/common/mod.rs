//! Shared fixtures for the integration tests

#![allow(dead_code)]

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use audit_sense::clients::{DocumentFetcher, Stage};
use audit_sense::config::Config;
use audit_sense::fakes::{FakePaymentGateway, MemoryFetcher, ScriptedReasoner};
use audit_sense::models::{Job, JobStatus};
use audit_sense::orchestrator::{JobManager, JobSettings, JobStore, MemoryJobStore};
use audit_sense::workflow::AuditFlow;
use serde_json::json;
use uuid::Uuid;

pub const ISO_URL: &str = "https://standards.example.com/iso27001.txt";
pub const POLICY_URL: &str = "https://docs.example.com/policy.txt";

pub const ISO_TEXT: &str = "A.5.1 Policies for information security\n\nA.6.1 Screening";
pub const POLICY_TEXT: &str = "We maintain a security policy approved by management.";

pub fn fetcher() -> MemoryFetcher {
    MemoryFetcher::new()
        .with(ISO_URL, ISO_TEXT)
        .with(POLICY_URL, POLICY_TEXT)
}

/// Reasoner scripted for a two-control ISO run: one covered, one missing
pub fn reasoner() -> ScriptedReasoner {
    analysis_reasoner().respond(
        Stage::ReportGenerator,
        json!({
            "overall_summary": "Moderate readiness: policies exist but personnel screening is absent.",
            "global_recommendations": [
                "Introduce a documented pre-employment screening process",
                "Assign HR ownership for screening checks",
                "Review the security policy annually"
            ]
        }),
    )
}

/// The extraction and mapping half of `reasoner`, with no narrative scripted
pub fn analysis_reasoner() -> ScriptedReasoner {
    ScriptedReasoner::new()
        .respond(
            Stage::StandardExtractor,
            json!([
                {"id": "A.5.1", "title": "Policies for information security", "description": "Define and approve a security policy", "domain": "A.5"},
                {"id": "A.6.1", "title": "Screening", "description": "Screen candidates before employment", "domain": "A.6"}
            ]),
        )
        .respond(
            Stage::EvidenceMapper,
            json!({"evaluations": [
                {
                    "control_id": "A.5.1",
                    "coverage": "covered",
                    "evidence": [{"doc_id": "policy_doc", "snippet": "We maintain a security policy approved by management.", "score": 0.9}],
                    "missing_elements": [],
                    "notes": "Approved policy exists."
                },
                {
                    "control_id": "A.6.1",
                    "coverage": "not_covered",
                    "evidence": [],
                    "missing_elements": ["No background screening procedure"],
                    "notes": "Nothing about screening."
                }
            ]}),
        )
}

pub fn bag() -> BTreeMap<String, String> {
    BTreeMap::from([
        ("standard_name".to_string(), "ISO 27001".to_string()),
        ("standard_url".to_string(), ISO_URL.to_string()),
        ("source_url".to_string(), POLICY_URL.to_string()),
        ("doc_id".to_string(), "policy_doc".to_string()),
        ("scope".to_string(), "IT Security".to_string()),
    ])
}

pub fn settings(poll_interval: Duration) -> JobSettings {
    JobSettings {
        poll_interval,
        ..JobSettings::from_config(&Config::default())
    }
}

pub struct Harness {
    pub manager: Arc<JobManager>,
    pub store: Arc<MemoryJobStore>,
    pub gateway: Arc<FakePaymentGateway>,
    pub reasoner: Arc<ScriptedReasoner>,
}

impl Harness {
    pub fn new(reasoner: ScriptedReasoner, fetcher: MemoryFetcher, poll_interval: Duration) -> Self {
        Self::with_settings(reasoner, Arc::new(fetcher), settings(poll_interval))
    }

    pub fn with_settings(
        reasoner: ScriptedReasoner,
        fetcher: Arc<dyn DocumentFetcher>,
        settings: JobSettings,
    ) -> Self {
        let reasoner = Arc::new(reasoner);
        let store = Arc::new(MemoryJobStore::new());
        let gateway = Arc::new(FakePaymentGateway::new());
        let flow = Arc::new(AuditFlow::new(reasoner.clone(), fetcher, 24_000));
        let manager = JobManager::start(store.clone(), gateway.clone(), flow, settings);
        Self {
            manager,
            store,
            gateway,
            reasoner,
        }
    }

    /// Happy-path collaborators, with a watch that effectively never polls twice
    pub fn standard() -> Self {
        Self::new(reasoner(), fetcher(), Duration::from_secs(3600))
    }

    pub async fn job(&self, job_id: Uuid) -> Job {
        self.store.get(job_id).await.unwrap().unwrap()
    }

    /// Wait until the job reaches `status` and its watch is gone
    pub async fn settled(&self, job_id: Uuid, status: JobStatus) -> Job {
        tokio::time::timeout(Duration::from_secs(5), async {
            loop {
                let job = self.job(job_id).await;
                if job.status == status && !self.manager.has_watch(job_id) {
                    return job;
                }
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
        })
        .await
        .unwrap_or_else(|_| panic!("job {} never settled as {}", job_id, status))
    }

    /// Wait until the job reaches `status`, watch or not
    pub async fn reaches(&self, job_id: Uuid, status: JobStatus) -> Job {
        tokio::time::timeout(Duration::from_secs(5), async {
            loop {
                let job = self.job(job_id).await;
                if job.status == status {
                    return job;
                }
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .unwrap_or_else(|_| panic!("job {} never reached {}", job_id, status))
    }
}
