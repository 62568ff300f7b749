// Candidate resolution end-to-end:
//  1) static fallback: a 404 on the bare name falls through to the namespaced path
//  2) first success short-circuits the remaining candidates
//  3) exhaustion relays the last upstream answer with every attempt traced
//  4) the inbound query string reaches every candidate unchanged
//  5) resources outside the allow-list and dot-segment ids never touch the network
//  6) discovered entity sets are tried after static ones, deduplicated
//  7) transport failures move on to the next candidate; no answers at all is a 502

#[cfg(test)]
mod test {

    use std::collections::HashMap;
    use std::sync::Arc;

    use bytes::Bytes;
    use http::StatusCode;

    use crate::cache::token_manager::TokenManager;
    use crate::config::resources::{DiscoveryConfig, ResourceConfig};
    use crate::config::vendor::{AuthConfig, VendorConfig};
    use crate::error::{ProxyError, ProxyResult};
    use crate::resolver::discovery::Discovery;
    use crate::resolver::resolver::{Outcome, ResourceResolver};
    use crate::sources::fetch::{Fetch, HttpFetcher, UpstreamRequest, UpstreamResponse};
    use crate::tests::common::{spawn_fake_vendor, FakeVendor};

    fn vendor_config(base_url: &str) -> Arc<VendorConfig> {
        Arc::new(VendorConfig {
            base_url: Some(base_url.to_owned()),
            api_key: Some("key-123".into()),
            username: Some("svc".into()),
            password: Some("hunter2".into()),
            ..Default::default()
        })
    }

    fn job_namespace() -> ResourceConfig {
        ResourceConfig {
            namespaces: vec!["job".into()],
            ..Default::default()
        }
    }

    fn http_stack(
        base_url: &str,
        resources: ResourceConfig,
        discovery: Option<DiscoveryConfig>,
    ) -> (ResourceResolver, TokenManager) {
        let vendor = vendor_config(base_url);
        let fetcher = Arc::new(HttpFetcher::new(&vendor).unwrap());
        let tokens = TokenManager::new(fetcher.clone(), vendor.clone(), AuthConfig::default());
        let discovery = discovery.map(|config| Arc::new(Discovery::new(fetcher.clone(), vendor.clone(), config)));
        let resolver = ResourceResolver::new(fetcher, vendor, resources, discovery);
        (resolver, tokens)
    }

    // =========================
    // 1) static fallback
    // =========================
    #[tokio::test]
    async fn falls_back_to_namespaced_path() {
        let vendor = FakeVendor::new()
            .login("tok-abc", 3600)
            .route("/job/applicants", 200, r#"{"value":[]}"#);
        let (handle, base_url, log) = spawn_fake_vendor(vendor).await;
        let (resolver, tokens) = http_stack(&base_url, job_namespace(), None);

        let resolution = resolver.resolve("applicants", None, None, &tokens).await.unwrap();

        assert_eq!(resolution.outcome, Outcome::Matched);
        assert_eq!(resolution.status, StatusCode::OK);
        assert_eq!(resolution.body, Bytes::from_static(br#"{"value":[]}"#));
        assert_eq!(resolution.attempts.to_string(), "404@/applicants|200@/job/applicants");
        assert_eq!(resolution.candidate.as_deref(), Some("/job/applicants"));
        assert!(resolution.upstream_url.unwrap().ends_with("/job/applicants"));

        // every candidate carries the api key and the bearer token
        for request in log.all().iter().filter(|r| r.path != "/login") {
            assert_eq!(request.api_key.as_deref(), Some("key-123"));
            assert_eq!(request.authorization.as_deref(), Some("Bearer tok-abc"));
        }
        handle.abort();
    }

    // =========================
    // 2) first success wins
    // =========================
    #[tokio::test]
    async fn first_success_short_circuits() {
        let vendor = FakeVendor::new()
            .login("tok", 3600)
            .route("/jobs/42", 200, r#"{"Id":42}"#)
            .route("/job/jobs/42", 200, r#"{"Id":"never"}"#);
        let (handle, base_url, log) = spawn_fake_vendor(vendor).await;
        let (resolver, tokens) = http_stack(&base_url, job_namespace(), None);

        let resolution = resolver.resolve("jobs", Some("42"), None, &tokens).await.unwrap();

        assert_eq!(resolution.outcome, Outcome::Matched);
        assert_eq!(resolution.attempts.to_string(), "200@/jobs/42");
        assert_eq!(log.resource_paths(), vec!["/jobs/42".to_owned()]);
        handle.abort();
    }

    // =========================
    // 3) exhaustion
    // =========================
    #[tokio::test]
    async fn exhaustion_relays_last_answer() {
        let vendor = FakeVendor::new()
            .login("tok", 3600)
            .route("/job/contacts", 404, r#"{"error":"last one"}"#);
        let (handle, base_url, log) = spawn_fake_vendor(vendor).await;
        let (resolver, tokens) = http_stack(&base_url, job_namespace(), None);

        let resolution = resolver.resolve("contacts", None, None, &tokens).await.unwrap();

        assert_eq!(resolution.outcome, Outcome::Exhausted);
        assert_eq!(resolution.status, StatusCode::NOT_FOUND);
        assert_eq!(resolution.body, Bytes::from_static(br#"{"error":"last one"}"#));
        assert_eq!(resolution.attempts.to_string(), "404@/contacts|404@/job/contacts");
        assert_eq!(resolution.candidate.as_deref(), Some("/job/contacts"));
        assert_eq!(log.resource_paths(), vec!["/contacts".to_owned(), "/job/contacts".to_owned()]);
        handle.abort();
    }

    #[tokio::test]
    async fn aliases_are_tried_after_namespaces() {
        let vendor = FakeVendor::new()
            .login("tok", 3600)
            .route("/crm/people", 200, r#"{"value":[{"Id":1}]}"#);
        let (handle, base_url, _log) = spawn_fake_vendor(vendor).await;
        let mut resources = job_namespace();
        resources.aliases = HashMap::from([("contacts".to_owned(), vec!["/crm/people/".to_owned()])]);
        let (resolver, tokens) = http_stack(&base_url, resources, None);

        let resolution = resolver.resolve("contacts", None, None, &tokens).await.unwrap();

        assert_eq!(
            resolution.attempts.to_string(),
            "404@/contacts|404@/job/contacts|200@/crm/people"
        );
        handle.abort();
    }

    // =========================
    // 4) query forwarding
    // =========================
    #[tokio::test]
    async fn query_reaches_every_candidate_unchanged() {
        let vendor = FakeVendor::new()
            .login("tok", 3600)
            .route("/job/applicants", 200, r#"{"value":[]}"#);
        let (handle, base_url, log) = spawn_fake_vendor(vendor).await;
        let (resolver, tokens) = http_stack(&base_url, job_namespace(), None);

        resolver
            .resolve("applicants", None, Some("$top=5&$select=Id,Name"), &tokens)
            .await
            .unwrap();

        let queries: Vec<_> = log
            .all()
            .into_iter()
            .filter(|r| r.path != "/login")
            .map(|r| r.query)
            .collect();
        assert_eq!(queries.len(), 2);
        assert!(queries.iter().all(|q| q.as_deref() == Some("$top=5&$select=Id,Name")));
        handle.abort();
    }

    // =========================
    // 5) allow-list
    // =========================
    #[tokio::test]
    async fn rejected_resource_makes_no_calls() {
        let (handle, base_url, log) = spawn_fake_vendor(FakeVendor::new().login("tok", 3600)).await;
        let (resolver, tokens) = http_stack(&base_url, job_namespace(), None);

        let err = resolver.resolve("payroll", None, None, &tokens).await.unwrap_err();

        assert!(matches!(err, ProxyError::NotPermitted(ref name) if name == "payroll"));
        assert_eq!(err.status_code(), StatusCode::FORBIDDEN);
        assert_eq!(log.total(), 0);
        assert!(tokens.snapshot().await.is_none());
        handle.abort();
    }

    #[tokio::test]
    async fn dot_segment_id_makes_no_calls() {
        let vendor = FakeVendor::new()
            .login("tok", 3600)
            .route("/", 200, r#"{"value":[]}"#)
            .route("/job", 200, r#"{"value":[]}"#);
        let (handle, base_url, log) = spawn_fake_vendor(vendor).await;
        let (resolver, tokens) = http_stack(&base_url, job_namespace(), None);

        for id in ["..", "."] {
            let err = resolver.resolve("jobs", Some(id), None, &tokens).await.unwrap_err();
            assert!(matches!(err, ProxyError::InvalidId(ref rejected) if rejected == id));
            assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
        }
        assert_eq!(log.total(), 0);
        handle.abort();
    }

    #[tokio::test]
    async fn login_failure_stops_resolution() {
        let vendor = FakeVendor::new().route("/login", 401, "bad credentials");
        let (handle, base_url, log) = spawn_fake_vendor(vendor).await;
        let (resolver, tokens) = http_stack(&base_url, job_namespace(), None);

        let err = resolver.resolve("applicants", None, None, &tokens).await.unwrap_err();

        assert_eq!(err.status_code(), StatusCode::BAD_GATEWAY);
        assert!(log.resource_paths().is_empty());
        handle.abort();
    }

    // =========================
    // 6) discovery
    // =========================
    const METADATA: &str = r#"<?xml version="1.0" encoding="utf-8"?>
<edmx:Edmx Version="4.0" xmlns:edmx="http://docs.oasis-open.org/odata/ns/edmx">
  <edmx:DataServices>
    <Schema Namespace="Vendor" xmlns="http://docs.oasis-open.org/odata/ns/edm">
      <EntityContainer Name="Container">
        <!-- <EntitySet Name="RetiredApplicants" EntityType="Vendor.Applicant"/> -->
        <EntitySet Name="Applicants" EntityType="Vendor.Applicant"/>
        <EntitySet Name="JobApplicantRecords" EntityType="Vendor.Applicant"/>
        <EntitySet Name="Invoices" EntityType="Vendor.Invoice"/>
      </EntityContainer>
    </Schema>
  </edmx:DataServices>
</edmx:Edmx>"#;

    fn applicant_discovery() -> DiscoveryConfig {
        DiscoveryConfig {
            enabled: true,
            keywords: HashMap::from([("applicants".to_owned(), vec!["applicant".to_owned()])]),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn discovered_sets_follow_static_candidates() {
        let vendor = FakeVendor::new()
            .login("tok", 3600)
            .route("/$metadata", 200, METADATA)
            .route(
                "/",
                200,
                r#"{"value":[{"name":"Applicants"},{"name":"applicant_view","url":"applicant_view"}]}"#,
            )
            .route("/applicant_view", 200, r#"{"value":[{"Id":9}]}"#);
        let (handle, base_url, log) = spawn_fake_vendor(vendor).await;
        let (resolver, tokens) = http_stack(&base_url, job_namespace(), Some(applicant_discovery()));

        let resolution = resolver.resolve("applicants", None, None, &tokens).await.unwrap();

        // "/Applicants" is listed by both documents but tried once;
        // the commented-out entity set is never a candidate
        assert_eq!(
            resolution.attempts.to_string(),
            "404@/applicants|404@/job/applicants|404@/Applicants|404@/JobApplicantRecords|200@/applicant_view"
        );
        assert_eq!(resolution.outcome, Outcome::Matched);

        // schema documents are cached between resolutions
        resolver.resolve("applicants", None, None, &tokens).await.unwrap();
        assert_eq!(log.requests_to("/$metadata"), 1);
        assert_eq!(log.requests_to("/"), 1);
        handle.abort();
    }

    #[tokio::test]
    async fn discovered_set_differing_only_in_case_is_tried() {
        let vendor = FakeVendor::new()
            .login("tok", 3600)
            .route("/$metadata", 200, r#"<EntityContainer><EntitySet Name="Applicants"/></EntityContainer>"#)
            .route("/Applicants", 200, r#"{"value":[{"Id":3}]}"#);
        let (handle, base_url, _log) = spawn_fake_vendor(vendor).await;
        let (resolver, tokens) = http_stack(&base_url, job_namespace(), Some(applicant_discovery()));

        let resolution = resolver.resolve("applicants", None, None, &tokens).await.unwrap();

        assert_eq!(resolution.outcome, Outcome::Matched);
        assert_eq!(
            resolution.attempts.to_string(),
            "404@/applicants|404@/job/applicants|200@/Applicants"
        );
        handle.abort();
    }

    #[tokio::test]
    async fn resources_without_keywords_skip_discovery() {
        let vendor = FakeVendor::new()
            .login("tok", 3600)
            .route("/$metadata", 200, METADATA)
            .route("/jobs", 200, r#"{"value":[]}"#);
        let (handle, base_url, log) = spawn_fake_vendor(vendor).await;
        let (resolver, tokens) = http_stack(&base_url, job_namespace(), Some(applicant_discovery()));

        resolver.resolve("jobs", None, None, &tokens).await.unwrap();

        assert_eq!(log.requests_to("/$metadata"), 0);
        handle.abort();
    }

    #[tokio::test]
    async fn failed_discovery_keeps_static_candidates() {
        let vendor = FakeVendor::new()
            .login("tok", 3600)
            .route("/$metadata", 500, "boom");
        let (handle, base_url, _log) = spawn_fake_vendor(vendor).await;
        let (resolver, tokens) = http_stack(&base_url, job_namespace(), Some(applicant_discovery()));

        let resolution = resolver.resolve("applicants", None, None, &tokens).await.unwrap();

        assert_eq!(resolution.outcome, Outcome::Exhausted);
        assert_eq!(resolution.attempts.to_string(), "404@/applicants|404@/job/applicants");
        handle.abort();
    }

    // =========================
    // 7) transport failures
    // =========================

    /// In-process vendor: each path either answers or fails at the transport level.
    #[derive(Default)]
    struct ScriptedFetcher {
        answers: HashMap<String, Option<(u16, &'static str)>>,
    }

    impl ScriptedFetcher {
        fn answer(mut self, path: &str, status: u16, body: &'static str) -> Self {
            self.answers.insert(path.to_owned(), Some((status, body)));
            self
        }

        fn fail(mut self, path: &str) -> Self {
            self.answers.insert(path.to_owned(), None);
            self
        }
    }

    impl Fetch for ScriptedFetcher {
        fn fetch(
            &self,
            request: UpstreamRequest,
        ) -> impl std::future::Future<Output = ProxyResult<UpstreamResponse>> + Send {
            let path = request.url.path().to_owned();
            let result = match self.answers.get(&path) {
                Some(Some((status, body))) => Ok(UpstreamResponse {
                    status: StatusCode::from_u16(*status).unwrap(),
                    content_type: Some("application/json".into()),
                    body: Bytes::from(*body),
                }),
                Some(None) => Err(ProxyError::Transport(format!("connection reset on {}", path))),
                None => Ok(UpstreamResponse {
                    status: StatusCode::NOT_FOUND,
                    content_type: None,
                    body: Bytes::new(),
                }),
            };
            async move { result }
        }
    }

    fn scripted_stack(fetcher: ScriptedFetcher) -> (ResourceResolver<ScriptedFetcher>, TokenManager<ScriptedFetcher>) {
        let vendor = vendor_config("https://vendor.example.com");
        let fetcher = Arc::new(fetcher.answer("/login", 200, r#"{"access_token":"tok","expires_in":3600}"#));
        let tokens = TokenManager::new(fetcher.clone(), vendor.clone(), AuthConfig::default());
        let resolver = ResourceResolver::new(fetcher, vendor, job_namespace(), None);
        (resolver, tokens)
    }

    #[tokio::test]
    async fn transport_error_moves_to_next_candidate() {
        let fetcher = ScriptedFetcher::default()
            .fail("/applicants")
            .answer("/job/applicants", 200, r#"{"value":[]}"#);
        let (resolver, tokens) = scripted_stack(fetcher);

        let resolution = resolver.resolve("applicants", None, None, &tokens).await.unwrap();

        assert_eq!(resolution.outcome, Outcome::Matched);
        assert_eq!(resolution.attempts.to_string(), "ERR@/applicants|200@/job/applicants");
    }

    #[tokio::test]
    async fn exhaustion_prefers_last_received_answer_over_errors() {
        let fetcher = ScriptedFetcher::default()
            .answer("/applicants", 410, r#"{"error":"gone"}"#)
            .fail("/job/applicants");
        let (resolver, tokens) = scripted_stack(fetcher);

        let resolution = resolver.resolve("applicants", None, None, &tokens).await.unwrap();

        assert_eq!(resolution.outcome, Outcome::Exhausted);
        assert_eq!(resolution.status, StatusCode::GONE);
        assert_eq!(resolution.candidate.as_deref(), Some("/applicants"));
        assert_eq!(resolution.attempts.to_string(), "410@/applicants|ERR@/job/applicants");
    }

    #[tokio::test]
    async fn no_answer_at_all_is_bad_gateway() {
        let fetcher = ScriptedFetcher::default().fail("/applicants").fail("/job/applicants");
        let (resolver, tokens) = scripted_stack(fetcher);

        let resolution = resolver.resolve("applicants", None, None, &tokens).await.unwrap();

        assert_eq!(resolution.outcome, Outcome::NoUpstream);
        assert_eq!(resolution.status, StatusCode::BAD_GATEWAY);
        assert!(resolution.candidate.is_none());
        let body: serde_json::Value = serde_json::from_slice(&resolution.body).unwrap();
        assert_eq!(body["error"], "no_upstream_matched");
        assert_eq!(body["attempts"], "ERR@/applicants|ERR@/job/applicants");
    }
}
